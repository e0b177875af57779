//! Static Validation Tests
//!
//! The validate-once path:
//! - Fields validate in dependency order with resolved dependency values
//! - All failures aggregate into one terminal error
//! - Cycles and fatal validator failures propagate unchanged
//! - Slow validators become timeout errors instead of hanging the run

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::Regex;
use serde_json::{json, Value};
use valigraph::constraint::{validator, validators, Constraint, ConstraintSet};
use valigraph::graph::GraphError;
use valigraph::validate::{validate, ValidateError, ValidationError, ValidatorError};
use valigraph::value::FieldValue;

// =============================================================================
// Helper Functions
// =============================================================================

fn values(pairs: &[(&str, Value)]) -> HashMap<String, FieldValue> {
    pairs
        .iter()
        .map(|(id, v)| (id.to_string(), FieldValue::ready(v.clone())))
        .collect()
}

fn failing(message: &str) -> valigraph::constraint::ValidatorFn {
    let message = message.to_string();
    validator(move |_, _| {
        let message = message.clone();
        async move { Err(ValidationError::invalid(message).into()) }
    })
}

// =============================================================================
// Baseline
// =============================================================================

#[tokio::test]
async fn test_empty_values_and_constraints_pass() {
    let result = validate(&HashMap::new(), &ConstraintSet::new()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_non_empty_value_without_validators_passes() {
    let constraints = ConstraintSet::new().field("name", Constraint::new().require());
    let result = validate(&values(&[("name", json!("hi"))]), &constraints).await;
    assert!(result.is_ok());
}

// =============================================================================
// Required Fields
// =============================================================================

#[tokio::test]
async fn test_required_fails_on_empty_variants() {
    for empty in [json!(null), json!(""), json!("   ")] {
        let constraints = ConstraintSet::new().field("name", Constraint::new().require());
        let err = validate(&values(&[("name", empty.clone())]), &constraints)
            .await
            .unwrap_err();
        let agg = err.aggregate().expect("expected aggregate");
        assert_eq!(agg.error_count(), 1, "value: {empty}");
        let errors = agg.errors_for("name");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_required());
    }
}

#[tokio::test]
async fn test_required_skips_validators_on_empty_value() {
    let ran = Arc::new(Mutex::new(false));
    let ran_probe = Arc::clone(&ran);
    let constraints = ConstraintSet::new().field(
        "name",
        Constraint::new().require().validate_with(validator(move |_, _| {
            let ran = Arc::clone(&ran_probe);
            async move {
                *ran.lock().unwrap() = true;
                Ok(())
            }
        })),
    );
    let err = validate(&values(&[("name", json!(""))]), &constraints)
        .await
        .unwrap_err();
    assert_eq!(err.aggregate().unwrap().errors_for("name").len(), 1);
    assert!(!*ran.lock().unwrap());
}

// =============================================================================
// Aggregation
// =============================================================================

#[tokio::test]
async fn test_two_failing_validators_in_declaration_order() {
    let constraints = ConstraintSet::new().field(
        "name",
        Constraint::new()
            .validate_with(failing("first"))
            .validate_with(failing("second")),
    );
    let err = validate(&values(&[("name", json!("value"))]), &constraints)
        .await
        .unwrap_err();
    let agg = err.aggregate().unwrap();
    assert_eq!(agg.error_count(), 1);
    assert_eq!(
        agg.errors_for("name"),
        &[
            ValidationError::invalid("first"),
            ValidationError::invalid("second"),
        ]
    );
}

#[tokio::test]
async fn test_signup_form_scenario() {
    let constraints = ConstraintSet::new()
        .field("name", Constraint::new().validate_with(validators::min_length(6)))
        .field(
            "username",
            Constraint::new()
                .validate_with(validators::min_length(7))
                .validate_with(validators::pattern(
                    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap(),
                    "must look like an email address",
                )),
        );
    let err = validate(
        &values(&[("name", json!("hi")), ("username", json!("x"))]),
        &constraints,
    )
    .await
    .unwrap_err();
    let agg = err.aggregate().unwrap();
    assert_eq!(agg.error_count(), 2);
    assert_eq!(agg.errors_for("name").len(), 1);
    assert_eq!(agg.errors_for("username").len(), 2);
}

// =============================================================================
// Dependencies
// =============================================================================

#[tokio::test]
async fn test_validator_receives_resolved_dependency_values() {
    let seen = Arc::new(Mutex::new(Value::Null));
    let seen_probe = Arc::clone(&seen);
    let constraints = ConstraintSet::new().field(
        "confirm",
        Constraint::new()
            .depends_on(["password"])
            .validate_with(validator(move |_, deps| {
                let seen = Arc::clone(&seen_probe);
                async move {
                    *seen.lock().unwrap() = deps.get("password").cloned().unwrap_or(Value::Null);
                    Ok(())
                }
            })),
    );
    validate(
        &values(&[("password", json!("hunter2")), ("confirm", json!("hunter2"))]),
        &constraints,
    )
    .await
    .unwrap();
    assert_eq!(*seen.lock().unwrap(), json!("hunter2"));
}

#[tokio::test]
async fn test_missing_dependency_resolves_to_null() {
    let seen = Arc::new(Mutex::new(json!("untouched")));
    let seen_probe = Arc::clone(&seen);
    let constraints = ConstraintSet::new().field(
        "a",
        Constraint::new()
            .depends_on(["ghost"])
            .validate_with(validator(move |_, deps| {
                let seen = Arc::clone(&seen_probe);
                async move {
                    // Present in the map, mapped to null, not omitted.
                    *seen.lock().unwrap() = deps.get("ghost").cloned().unwrap_or(json!("absent"));
                    Ok(())
                }
            })),
    );
    validate(&values(&[("a", json!("v"))]), &constraints)
        .await
        .unwrap();
    assert_eq!(*seen.lock().unwrap(), Value::Null);
}

#[tokio::test]
async fn test_deferred_values_are_awaited_before_validation() {
    let seen = Arc::new(Mutex::new((Value::Null, Value::Null)));
    let seen_probe = Arc::clone(&seen);

    let mut inputs = HashMap::new();
    inputs.insert(
        "a".to_string(),
        FieldValue::deferred(async { json!("resolved-a") }),
    );
    inputs.insert("b".to_string(), FieldValue::ready(json!("b-value")));

    let constraints = ConstraintSet::new()
        .field(
            "b",
            Constraint::new()
                .depends_on(["a"])
                .validate_with(validator(move |value, deps| {
                    let seen = Arc::clone(&seen_probe);
                    async move {
                        *seen.lock().unwrap() = (
                            value,
                            deps.get("a").cloned().unwrap_or(Value::Null),
                        );
                        Ok(())
                    }
                })),
        );
    validate(&inputs, &constraints).await.unwrap();
    let (own, dep) = seen.lock().unwrap().clone();
    assert_eq!(own, json!("b-value"));
    assert_eq!(dep, json!("resolved-a"));
}

// =============================================================================
// Cycles and Fatal Failures
// =============================================================================

#[tokio::test]
async fn test_cyclic_constraints_propagate_graph_error() {
    let constraints = ConstraintSet::new()
        .field("a", Constraint::new().depends_on(["b"]))
        .field("b", Constraint::new().depends_on(["a"]));
    let err = validate(
        &values(&[("a", json!(1)), ("b", json!(2))]),
        &constraints,
    )
    .await
    .unwrap_err();
    match err {
        ValidateError::Graph(GraphError::CycleDetected(path)) => {
            assert_eq!(path.first(), path.last());
            assert_eq!(path.len(), 3);
        }
        other => panic!("expected cycle, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_fatal_validator_failure_aborts_run() {
    let constraints = ConstraintSet::new()
        .field(
            "a",
            Constraint::new().validate_with(validator(|_, _| async {
                Err(ValidatorError::fatal("validator panicked internally"))
            })),
        )
        .field("b", Constraint::new().validate_with(failing("never aggregated")));
    let err = validate(
        &values(&[("a", json!(1)), ("b", json!(2))]),
        &constraints,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ValidateError::Fatal(_)));
}

// =============================================================================
// Timeouts
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_unsettled_validator_becomes_timeout_error() {
    let constraints = ConstraintSet::new().field(
        "slow",
        Constraint::new().validate_with(validator(|_, _| async {
            std::future::pending::<()>().await;
            Ok(())
        })),
    );
    let err = validate(&values(&[("slow", json!("v"))]), &constraints)
        .await
        .unwrap_err();
    let errors = err.aggregate().unwrap().errors_for("slow");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_unsettled_value_source_becomes_timeout_error() {
    let mut inputs = HashMap::new();
    inputs.insert(
        "slow".to_string(),
        FieldValue::deferred(async {
            std::future::pending::<()>().await;
            Value::Null
        }),
    );
    let constraints = ConstraintSet::new().field(
        "slow",
        Constraint::new().validate_with(failing("never runs")),
    );
    let err = validate(&inputs, &constraints).await.unwrap_err();
    let errors = err.aggregate().unwrap().errors_for("slow");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_timeout());
}

#[tokio::test(start_paused = true)]
async fn test_settled_validators_keep_results_when_sibling_times_out() {
    let constraints = ConstraintSet::new().field(
        "mixed",
        Constraint::new()
            .validate_with(failing("fast failure"))
            .validate_with(validator(|_, _| async {
                std::future::pending::<()>().await;
                Ok(())
            })),
    );
    let err = validate(&values(&[("mixed", json!("v"))]), &constraints)
        .await
        .unwrap_err();
    let errors = err.aggregate().unwrap().errors_for("mixed");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0], ValidationError::invalid("fast failure"));
    assert!(errors[1].is_timeout());
}
