//! # Constraint Model
//!
//! Declarative per-field validation rules.
//!
//! A constraint names the fields its validators read (`dependencies`),
//! whether an empty value is acceptable (`required`), and an ordered list
//! of validator functions. Constraints are immutable inputs: the
//! validators clone what they need at graph-construction time.

pub mod validators;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::validate::ValidatorError;
use crate::value::DependencyValues;

/// A validator: receives the field's resolved value and the resolved
/// values of its declared dependencies, succeeds or fails asynchronously.
///
/// Per-validator options are captured by the closure itself.
pub type ValidatorFn = Arc<
    dyn Fn(Value, DependencyValues) -> BoxFuture<'static, Result<(), ValidatorError>>
        + Send
        + Sync,
>;

/// Wrap an async closure as a [`ValidatorFn`]
pub fn validator<F, Fut>(f: F) -> ValidatorFn
where
    F: Fn(Value, DependencyValues) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ValidatorError>> + Send + 'static,
{
    Arc::new(move |value, deps| f(value, deps).boxed())
}

/// Validation rules for a single field
#[derive(Clone, Default)]
pub struct Constraint {
    /// Fields whose values this field's validators read, in declaration
    /// order
    pub dependencies: Vec<String>,

    /// Whether an empty value fails validation outright
    pub required: bool,

    /// Validators to run, in declaration order
    pub validators: Vec<ValidatorFn>,
}

impl Constraint {
    /// A constraint with no rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare dependencies on other fields
    pub fn depends_on<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Mark the field as required
    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }

    /// Append a validator
    pub fn validate_with(mut self, f: ValidatorFn) -> Self {
        self.validators.push(f);
        self
    }

    /// Whether this constraint runs any validators
    pub fn has_validators(&self) -> bool {
        !self.validators.is_empty()
    }
}

impl std::fmt::Debug for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constraint")
            .field("dependencies", &self.dependencies)
            .field("required", &self.required)
            .field("validators", &self.validators.len())
            .finish()
    }
}

/// Constraints for a set of fields, iterated in insertion order
#[derive(Clone, Default, Debug)]
pub struct ConstraintSet {
    fields: HashMap<String, Constraint>,
    order: Vec<String>,
}

impl ConstraintSet {
    /// An empty constraint set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn field(mut self, id: impl Into<String>, constraint: Constraint) -> Self {
        self.insert(id, constraint);
        self
    }

    /// Insert or replace the constraint for a field
    pub fn insert(&mut self, id: impl Into<String>, constraint: Constraint) {
        let id = id.into();
        if !self.fields.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.fields.insert(id, constraint);
    }

    /// Constraint for a field, if declared
    pub fn get(&self, id: &str) -> Option<&Constraint> {
        self.fields.get(id)
    }

    /// Number of constrained fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is constrained
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// (field, constraint) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.order
            .iter()
            .filter_map(|id| self.fields.get(id).map(|c| (id.as_str(), c)))
    }
}
