//! # Static Validator
//!
//! Validate-once execution: every constrained field is validated in
//! topological order, all failures are aggregated, and the run settles
//! exactly once.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::empty::is_empty;
use super::errors::{AggregateError, ValidateError, ValidateResult, ValidationError};
use super::{build_graph, run_validators, timeout};
use crate::constraint::{Constraint, ConstraintSet};
use crate::value::{DependencyValues, FieldValue};

/// Validate all fields against the constraint set.
///
/// Resolves field values (sync or deferred) and runs validators in
/// dependency order. Succeeds only when no field produced an error;
/// otherwise fails with the full [`AggregateError`]. A cyclic constraint
/// specification fails with the graph error directly, and a fatal
/// (non-validation) validator failure aborts the run unchanged.
pub async fn validate(
    values: &HashMap<String, FieldValue>,
    constraints: &ConstraintSet,
) -> ValidateResult<()> {
    let field_ids: Vec<String> = values.keys().cloned().collect();
    let graph = build_graph(&field_ids, constraints)?;
    let order = graph.overall_order(false)?;
    debug!(fields = order.len(), "static validation started");

    let mut aggregate = AggregateError::default();
    for field in &order {
        if let Some(constraint) = constraints.get(field) {
            validate_field(field, constraint, values, &mut aggregate).await?;
        }
    }

    if aggregate.is_empty() {
        Ok(())
    } else {
        debug!(failed_fields = aggregate.error_count(), "static validation failed");
        Err(ValidateError::Aggregate(aggregate))
    }
}

/// Validate one field, folding expected failures into the aggregate.
async fn validate_field(
    field: &str,
    constraint: &Constraint,
    values: &HashMap<String, FieldValue>,
    aggregate: &mut AggregateError,
) -> ValidateResult<()> {
    // One deadline per field: value resolution, dependency resolution and
    // all validators share the same budget.
    let deadline = timeout::deadline();

    let value = match values.get(field) {
        Some(source) => match timeout::guard(field, deadline, source.resolve()).await {
            Ok(value) => value,
            Err(timed_out) => {
                aggregate.push(field, timed_out);
                return Ok(());
            }
        },
        None => Value::Null,
    };

    if constraint.required && is_empty(&value) {
        aggregate.push(
            field,
            ValidationError::Required {
                field: field.to_string(),
            },
        );
        return Ok(());
    }

    if !constraint.has_validators() {
        return Ok(());
    }

    let deps = match timeout::guard(
        field,
        deadline,
        resolve_dependencies(&constraint.dependencies, values),
    )
    .await
    {
        Ok(deps) => deps,
        Err(timed_out) => {
            aggregate.push(field, timed_out);
            return Ok(());
        }
    };

    let errors = run_validators(field, &constraint.validators, &value, &deps, deadline)
        .await
        .map_err(ValidateError::Fatal)?;
    for error in errors {
        aggregate.push(field, error);
    }
    Ok(())
}

/// Resolve declared dependency values. Missing inputs are present in the
/// map as `Null` rather than omitted.
async fn resolve_dependencies(
    dependencies: &[String],
    values: &HashMap<String, FieldValue>,
) -> DependencyValues {
    let mut resolved = DependencyValues::with_capacity(dependencies.len());
    for dep in dependencies {
        let value = match values.get(dep) {
            Some(source) => source.resolve().await,
            None => Value::Null,
        };
        resolved.insert(dep.clone(), value);
    }
    resolved
}
