//! # Graph Errors
//!
//! Error types for the dependency graph.
//!
//! Graph errors signal misconfiguration (unknown nodes, cyclic
//! dependencies) and are never folded into per-field validation results.

use thiserror::Error;

/// Result type for graph operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Dependency graph errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Referenced node was never added to the graph
    #[error("Node does not exist: {0}")]
    NoSuchNode(String),

    /// A dependency cycle was found; carries the cyclic path with the
    /// repeated node at both ends, e.g. `[a, b, c, a]`
    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),
}

impl GraphError {
    /// Returns the cyclic path if this is a cycle error
    pub fn cycle_path(&self) -> Option<&[String]> {
        match self {
            GraphError::CycleDetected(path) => Some(path),
            GraphError::NoSuchNode(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_joins_path() {
        let err = GraphError::CycleDetected(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(err.to_string(), "Dependency cycle detected: a -> b -> a");
        assert_eq!(err.cycle_path().unwrap().len(), 3);
    }

    #[test]
    fn test_no_such_node_has_no_path() {
        let err = GraphError::NoSuchNode("x".to_string());
        assert!(err.cycle_path().is_none());
    }
}
