//! # Validation Errors
//!
//! Error kinds produced by validation runs.
//!
//! [`ValidationError`] kinds are expected user-input failures: they are
//! caught per field and folded into an [`AggregateError`] (static) or a
//! change map (live). Everything else a validator produces is a fatal
//! failure that terminates the run unchanged, which separates bad input
//! from bugs in validator code.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::graph::GraphError;

/// Result type for static validation
pub type ValidateResult<T> = Result<T, ValidateError>;

/// A single per-field validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// A validator rejected the value
    #[error("{message}")]
    Invalid { message: String },

    /// A required field was empty
    #[error("Field is required: {field}")]
    Required { field: String },

    /// An asynchronous validation step exceeded the timeout budget
    #[error("Validation timed out for field: {field}")]
    Timeout { field: String },
}

impl ValidationError {
    /// A plain validation failure with a message
    pub fn invalid(message: impl Into<String>) -> Self {
        ValidationError::Invalid {
            message: message.into(),
        }
    }

    /// Whether this is a timeout failure
    pub fn is_timeout(&self) -> bool {
        matches!(self, ValidationError::Timeout { .. })
    }

    /// Whether this is a required-field failure
    pub fn is_required(&self) -> bool {
        matches!(self, ValidationError::Required { .. })
    }
}

/// What a single validator invocation can produce
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Expected failure; folded into the per-field results
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Unexpected failure; aborts the whole run
    #[error("validator failure: {0}")]
    Fatal(Box<dyn std::error::Error + Send + Sync>),
}

impl ValidatorError {
    /// An unexpected failure that should abort the run
    pub fn fatal(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ValidatorError::Fatal(err.into())
    }
}

/// Per-field validation failures collected during one static run.
///
/// Fields appear in the order they first failed; errors within a field
/// keep validator declaration order. Immutable once surfaced.
#[derive(Debug, Clone, Default)]
pub struct AggregateError {
    fields: HashMap<String, Vec<ValidationError>>,
    order: Vec<String>,
}

impl AggregateError {
    pub(crate) fn push(&mut self, field: &str, error: ValidationError) {
        if !self.fields.contains_key(field) {
            self.order.push(field.to_string());
        }
        self.fields.entry(field.to_string()).or_default().push(error);
    }

    /// Number of fields with at least one error
    pub fn error_count(&self) -> usize {
        self.fields.values().filter(|errs| !errs.is_empty()).count()
    }

    /// Errors for one field; empty slice if the field has none
    pub fn errors_for(&self, field: &str) -> &[ValidationError] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether no field has errors
    pub fn is_empty(&self) -> bool {
        self.error_count() == 0
    }

    /// (field, errors) pairs in first-failure order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.order
            .iter()
            .filter_map(|id| self.fields.get(id).map(|errs| (id.as_str(), errs.as_slice())))
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed for {} field(s):", self.error_count())?;
        for (field, errors) in self.iter() {
            write!(f, " {} ({})", field, errors.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Terminal outcome of a failed static validation run
#[derive(Debug, Error)]
pub enum ValidateError {
    /// One or more fields failed validation
    #[error(transparent)]
    Aggregate(AggregateError),

    /// The constraint specification is unusable (cycle, unknown node);
    /// never wrapped into an aggregate
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A validator failed with a non-validation error
    #[error("validator failure: {0}")]
    Fatal(Box<dyn std::error::Error + Send + Sync>),
}

impl ValidateError {
    /// The aggregate, if this is a per-field validation failure
    pub fn aggregate(&self) -> Option<&AggregateError> {
        match self {
            ValidateError::Aggregate(agg) => Some(agg),
            _ => None,
        }
    }
}
