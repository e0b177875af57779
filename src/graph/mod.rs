//! # Dependency Graph Module
//!
//! Generic directed graph with cycle detection and topological ordering.
//! The validators build one graph per run (static) or per subscription
//! (live) and use `overall_order` / `immediate_dependencies_of` to
//! schedule field validation.

mod dep_graph;
mod errors;

pub use dep_graph::DepGraph;
pub use errors::{GraphError, GraphResult};
