//! valigraph - dependency-aware asynchronous field validation
//!
//! Given named field values (resolved synchronously or asynchronously)
//! and a declarative map of per-field constraints that may read other
//! fields' values, this crate computes every field's validation failures
//! while respecting inter-field dependency order and detecting cycles.
//!
//! Two execution modes are provided: static (validate once, aggregate
//! all errors, settle terminally) and live (re-validate incrementally on
//! value changes with cancellation and staleness suppression).

pub mod constraint;
pub mod graph;
pub mod validate;
pub mod value;
