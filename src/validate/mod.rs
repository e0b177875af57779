//! # Validation Module
//!
//! Dependency-aware validation scheduling.
//!
//! Two execution modes share one graph model:
//!
//! - **Static** ([`validate`]): validate every field once in dependency
//!   order, aggregate all failures, succeed or fail terminally.
//! - **Live** ([`live_validate`]): subscribe to value changes and
//!   re-validate the changed field plus its transitive dependants per
//!   change, with cancellation and last-write-wins staleness control.
//!
//! Every asynchronous wait is raced against the timeout guard.

mod batch;
mod empty;
mod errors;
mod live;
mod timeout;

pub use batch::validate;
pub use empty::is_empty;
pub use errors::{
    AggregateError, ValidateError, ValidateResult, ValidationError, ValidatorError,
};
pub use live::{live_validate, ChangeMap, LiveValidator};
pub use timeout::VALIDATION_TIMEOUT;

use futures_util::future::join_all;
use serde_json::Value;
use tokio::time::Instant;

use crate::constraint::{Constraint, ConstraintSet, ValidatorFn};
use crate::graph::{DepGraph, GraphResult};
use crate::value::DependencyValues;

/// Fatal (non-validation) failure surfaced by a validator
type FatalError = Box<dyn std::error::Error + Send + Sync>;

/// Build the validation graph: one node per field id (input keys plus
/// constrained fields plus declared dependencies), the field's constraint
/// as node data, and an edge dependency -> field for every declared
/// dependency.
pub(crate) fn build_graph(
    field_ids: &[String],
    constraints: &ConstraintSet,
) -> GraphResult<DepGraph<String, Constraint>> {
    let mut graph = DepGraph::new();
    for id in field_ids {
        graph.add_node(id.clone(), constraints.get(id).cloned().unwrap_or_default());
    }
    for (field, constraint) in constraints.iter() {
        graph.add_node(field.to_string(), constraint.clone());
        for dep in &constraint.dependencies {
            graph.add_node(dep.clone(), constraints.get(dep).cloned().unwrap_or_default());
            graph.add_dependency(dep, &field.to_string())?;
        }
    }
    Ok(graph)
}

/// Run a field's validators concurrently against one shared deadline.
///
/// Validation errors come back in declaration order; the first fatal
/// error aborts. Validators that settled before the deadline keep their
/// results even when a sibling times out.
pub(crate) async fn run_validators(
    field: &str,
    validators: &[ValidatorFn],
    value: &Value,
    deps: &DependencyValues,
    deadline: Instant,
) -> Result<Vec<ValidationError>, FatalError> {
    let runs = validators.iter().map(|run| {
        let fut = run(value.clone(), deps.clone());
        let field = field.to_string();
        async move {
            match tokio::time::timeout_at(deadline, fut).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ValidatorError::Validation(ValidationError::Timeout {
                    field,
                })),
            }
        }
    });

    let mut errors = Vec::new();
    for outcome in join_all(runs).await {
        match outcome {
            Ok(()) => {}
            Err(ValidatorError::Validation(err)) => errors.push(err),
            Err(ValidatorError::Fatal(err)) => return Err(err),
        }
    }
    Ok(errors)
}
