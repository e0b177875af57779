//! # Dependency Graph
//!
//! Generic directed graph used to order field validation.
//!
//! Nodes carry opaque data. Two adjacency maps are maintained: outgoing
//! edges (added via `add_dependency(from, to)`, `to` joins `from`'s
//! outgoing set) and incoming edges (the mirror image). Sibling edges
//! iterate in insertion order, which makes traversal deterministic for a
//! given construction sequence.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use super::errors::{GraphError, GraphResult};

/// Directed graph with opaque node data and insertion-ordered edges.
#[derive(Debug, Clone)]
pub struct DepGraph<N, D> {
    /// Node data by id
    nodes: HashMap<N, D>,

    /// Node ids in insertion order
    insertion: Vec<N>,

    /// Outgoing edges: node -> nodes added via `add_dependency(node, _)`
    outgoing: HashMap<N, Vec<N>>,

    /// Incoming edges: node -> nodes added via `add_dependency(_, node)`
    incoming: HashMap<N, Vec<N>>,
}

impl<N, D> Default for DepGraph<N, D> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
            insertion: Vec::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
        }
    }
}

impl<N, D> DepGraph<N, D>
where
    N: Eq + Hash + Clone + fmt::Display,
{
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the node exists
    pub fn has_node(&self, id: &N) -> bool {
        self.nodes.contains_key(id)
    }

    /// Insert a node with empty edge sets; no-op if the id already exists
    pub fn add_node(&mut self, id: N, data: D) {
        if self.nodes.contains_key(&id) {
            return;
        }
        self.insertion.push(id.clone());
        self.outgoing.insert(id.clone(), Vec::new());
        self.incoming.insert(id.clone(), Vec::new());
        self.nodes.insert(id, data);
    }

    /// Data attached to a node, if present
    pub fn node_data(&self, id: &N) -> Option<&D> {
        self.nodes.get(id)
    }

    /// Replace a node's data
    pub fn set_node_data(&mut self, id: &N, data: D) -> GraphResult<()> {
        match self.nodes.get_mut(id) {
            Some(slot) => {
                *slot = data;
                Ok(())
            }
            None => Err(GraphError::NoSuchNode(id.to_string())),
        }
    }

    /// Add the edge `from -> to`; both nodes must already exist.
    /// Duplicate edges are ignored.
    pub fn add_dependency(&mut self, from: &N, to: &N) -> GraphResult<()> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::NoSuchNode(from.to_string()));
        }
        if !self.nodes.contains_key(to) {
            return Err(GraphError::NoSuchNode(to.to_string()));
        }
        let out = self
            .outgoing
            .get_mut(from)
            .ok_or_else(|| GraphError::NoSuchNode(from.to_string()))?;
        if !out.contains(to) {
            out.push(to.clone());
        }
        let inc = self
            .incoming
            .get_mut(to)
            .ok_or_else(|| GraphError::NoSuchNode(to.to_string()))?;
        if !inc.contains(from) {
            inc.push(from.clone());
        }
        Ok(())
    }

    /// Remove the edge `from -> to`; no-op if the edge is absent.
    pub fn remove_dependency(&mut self, from: &N, to: &N) -> GraphResult<()> {
        if !self.nodes.contains_key(from) {
            return Err(GraphError::NoSuchNode(from.to_string()));
        }
        if !self.nodes.contains_key(to) {
            return Err(GraphError::NoSuchNode(to.to_string()));
        }
        if let Some(out) = self.outgoing.get_mut(from) {
            out.retain(|n| n != to);
        }
        if let Some(inc) = self.incoming.get_mut(to) {
            inc.retain(|n| n != from);
        }
        Ok(())
    }

    /// Direct outgoing edge set of a node, no traversal
    pub fn immediate_dependencies_of(&self, id: &N) -> GraphResult<Vec<N>> {
        self.outgoing
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::NoSuchNode(id.to_string()))
    }

    /// Direct incoming edge set of a node, no traversal
    pub fn immediate_dependants_of(&self, id: &N) -> GraphResult<Vec<N>> {
        self.incoming
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::NoSuchNode(id.to_string()))
    }

    /// All nodes reachable from `id` over outgoing edges, excluding `id`.
    /// With `leaves_only`, keeps only nodes with no further outgoing edges.
    pub fn dependencies_of(&self, id: &N, leaves_only: bool) -> GraphResult<Vec<N>> {
        self.traverse(id, &self.outgoing, leaves_only)
    }

    /// All nodes reachable from `id` over incoming edges, excluding `id`.
    /// With `leaves_only`, keeps only nodes with no further incoming edges.
    pub fn dependants_of(&self, id: &N, leaves_only: bool) -> GraphResult<Vec<N>> {
        self.traverse(id, &self.incoming, leaves_only)
    }

    /// Nodes with no incoming edges, in insertion order
    pub fn entry_nodes(&self) -> Vec<N> {
        self.insertion
            .iter()
            .filter(|id| self.incoming.get(*id).map(Vec::is_empty).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Topological ordering of all nodes, entry nodes first.
    ///
    /// Runs a whole-graph cycle check before producing the order: a cycle
    /// anywhere fails the call, even when unreachable from the entry
    /// nodes. With `leaves_only`, keeps only nodes with no outgoing edges.
    pub fn overall_order(&self, leaves_only: bool) -> GraphResult<Vec<N>> {
        self.assert_acyclic()?;

        let mut visited: HashSet<&N> = HashSet::new();
        let mut post: Vec<N> = Vec::new();
        for id in &self.insertion {
            let is_root = self.incoming.get(id).map(Vec::is_empty).unwrap_or(true);
            if is_root && !visited.contains(id) {
                self.dfs_post_order(id, &mut visited, &mut post);
            }
        }
        // Reverse post-order over outgoing edges yields every node after
        // all nodes it is reachable from.
        post.reverse();
        if leaves_only {
            post.retain(|id| {
                self.outgoing
                    .get(id)
                    .map(Vec::is_empty)
                    .unwrap_or(true)
            });
        }
        Ok(post)
    }

    /// Iterative post-order DFS over outgoing edges. Only called once the
    /// graph is known to be acyclic.
    fn dfs_post_order<'a>(
        &'a self,
        start: &'a N,
        visited: &mut HashSet<&'a N>,
        post: &mut Vec<N>,
    ) {
        if !visited.insert(start) {
            return;
        }
        let mut stack: Vec<(&N, usize)> = vec![(start, 0)];
        while let Some(&(node, idx)) = stack.last() {
            let children: &[N] = self.outgoing.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if idx == children.len() {
                stack.pop();
                post.push(node.clone());
                continue;
            }
            let top = stack.len() - 1;
            stack[top].1 = idx + 1;
            let child = &children[idx];
            if visited.insert(child) {
                stack.push((child, 0));
            }
        }
    }

    /// Iterative depth-first reachability with on-stack cycle detection.
    fn traverse(
        &self,
        start: &N,
        edges: &HashMap<N, Vec<N>>,
        leaves_only: bool,
    ) -> GraphResult<Vec<N>> {
        if !self.nodes.contains_key(start) {
            return Err(GraphError::NoSuchNode(start.to_string()));
        }

        let mut result: Vec<N> = Vec::new();
        let mut visited: HashSet<&N> = HashSet::new();
        let mut on_stack: HashSet<&N> = HashSet::new();
        // Frame: (node, index of the next sibling edge to examine)
        let mut stack: Vec<(&N, usize)> = vec![(start, 0)];
        visited.insert(start);
        on_stack.insert(start);

        while let Some(&(node, idx)) = stack.last() {
            let children: &[N] = edges.get(node).map(Vec::as_slice).unwrap_or(&[]);
            if idx == children.len() {
                stack.pop();
                on_stack.remove(node);
                continue;
            }
            let top = stack.len() - 1;
            stack[top].1 = idx + 1;
            let child = &children[idx];
            if on_stack.contains(child) {
                return Err(Self::cycle_error(&stack, child));
            }
            if visited.insert(child) {
                result.push(child.clone());
                on_stack.insert(child);
                stack.push((child, 0));
            }
        }

        if leaves_only {
            result.retain(|id| edges.get(id).map(Vec::is_empty).unwrap_or(true));
        }
        Ok(result)
    }

    /// Whole-graph cycle check over outgoing edges.
    fn assert_acyclic(&self) -> GraphResult<()> {
        let mut visited: HashSet<&N> = HashSet::new();
        for root in &self.insertion {
            if visited.contains(root) {
                continue;
            }
            let mut on_stack: HashSet<&N> = HashSet::new();
            let mut stack: Vec<(&N, usize)> = vec![(root, 0)];
            visited.insert(root);
            on_stack.insert(root);
            while let Some(&(node, idx)) = stack.last() {
                let children: &[N] =
                    self.outgoing.get(node).map(Vec::as_slice).unwrap_or(&[]);
                if idx == children.len() {
                    stack.pop();
                    on_stack.remove(node);
                    continue;
                }
                let top = stack.len() - 1;
                stack[top].1 = idx + 1;
                let child = &children[idx];
                if on_stack.contains(child) {
                    return Err(Self::cycle_error(&stack, child));
                }
                if visited.insert(child) {
                    on_stack.insert(child);
                    stack.push((child, 0));
                }
            }
        }
        Ok(())
    }

    /// Rebuild the cyclic path from the DFS stack, repeating the offending
    /// node at both ends.
    fn cycle_error(stack: &[(&N, usize)], repeated: &N) -> GraphError {
        let start = stack
            .iter()
            .position(|(node, _)| *node == repeated)
            .unwrap_or(0);
        let mut path: Vec<String> = stack[start..]
            .iter()
            .map(|(node, _)| node.to_string())
            .collect();
        path.push(repeated.to_string());
        GraphError::CycleDetected(path)
    }
}
