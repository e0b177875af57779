//! # Live Validator
//!
//! Incremental re-validation driven by value-change events.
//!
//! `live_validate` builds the dependency graph once, then spawns one
//! change-loop task per field source. Each change event starts a cascade:
//! the changed field is validated, and if it passes, its immediate
//! dependants are validated in turn, following graph edges. A cascade
//! that produced errors for a field stops at that branch.
//!
//! Staleness control is per field: every change event bumps the field's
//! version counter, and a cascade only reports its change map if its
//! version is still current when it settles. Earlier in-flight cascades
//! for the same field are computed but discarded (last write wins).
//! Cancellation detaches all subscriptions permanently; in-flight
//! validator futures run to completion and their results are discarded.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use super::empty::is_empty;
use super::errors::ValidationError;
use super::{build_graph, run_validators, timeout, FatalError};
use crate::constraint::{Constraint, ConstraintSet};
use crate::graph::{DepGraph, GraphResult};
use crate::value::DependencyValues;

/// Per-field outcomes of one cascade: every field the cascade touched,
/// mapped to its errors (empty = touched and passed), in visit order.
#[derive(Debug, Clone, Default)]
pub struct ChangeMap {
    fields: HashMap<String, Vec<ValidationError>>,
    order: Vec<String>,
}

impl ChangeMap {
    fn record(&mut self, field: &str, errors: Vec<ValidationError>) {
        if !self.fields.contains_key(field) {
            self.order.push(field.to_string());
        }
        self.fields.insert(field.to_string(), errors);
    }

    /// Whether any touched field produced errors
    pub fn has_errors(&self) -> bool {
        self.fields.values().any(|errs| !errs.is_empty())
    }

    /// Whether the cascade touched this field
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Errors for a touched field; `None` if the cascade never reached it
    pub fn errors_for(&self, field: &str) -> Option<&[ValidationError]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Number of fields the cascade touched
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the cascade touched no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// (field, errors) pairs in visit order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ValidationError])> {
        self.order
            .iter()
            .filter_map(|id| self.fields.get(id).map(|errs| (id.as_str(), errs.as_slice())))
    }
}

/// Shared state of one live subscription, checked at every suspension
/// point instead of a closure-captured flag.
#[derive(Debug)]
struct SubscriptionState {
    cancelled: AtomicBool,
    /// Monotonic change counter per source field
    versions: HashMap<String, AtomicU64>,
}

impl SubscriptionState {
    fn new(fields: impl IntoIterator<Item = String>) -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            versions: fields
                .into_iter()
                .map(|field| (field, AtomicU64::new(0)))
                .collect(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns true if this call performed the cancellation
    fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    fn bump(&self, field: &str) -> u64 {
        self.versions
            .get(field)
            .map(|v| v.fetch_add(1, Ordering::SeqCst) + 1)
            .unwrap_or(0)
    }

    fn current(&self, field: &str) -> u64 {
        self.versions
            .get(field)
            .map(|v| v.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Whether a cascade started at `version` for `field` no longer
    /// speaks for the field
    fn superseded(&self, field: &str, version: u64) -> bool {
        self.is_cancelled() || self.current(field) != version
    }
}

/// Handle for an active live subscription
#[derive(Debug)]
pub struct LiveValidator {
    state: Arc<SubscriptionState>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveValidator {
    /// Permanently detach all subscriptions. Idempotent: repeated calls
    /// are no-ops. In-flight cascades run to completion but report
    /// nothing.
    pub fn cancel(&self) {
        // The flag may already be set by a fatal validator failure while
        // the change loops are still parked on their sources; abort
        // unconditionally (abort is idempotent).
        for task in &self.tasks {
            task.abort();
        }
        if self.state.cancel() {
            debug!("live validation cancelled");
        }
    }

    /// Whether the subscription has been cancelled
    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }
}

impl Drop for LiveValidator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Attach live validation to a set of value sources.
///
/// Live sources expose their current value synchronously: a cascade
/// reads `rx.borrow()` and never awaits a value. Deferred values
/// ([`crate::value::FieldValue::Deferred`]) belong to the static
/// [`validate`](super::validate) path only; a source that computes its
/// value asynchronously must resolve it before sending it through the
/// channel.
///
/// The graph and dependency map are built once and shared read-only by
/// every cascade. A cyclic constraint specification fails here, at
/// subscription time. `on_change` receives one [`ChangeMap`] per settled,
/// non-superseded cascade.
pub fn live_validate<F>(
    sources: HashMap<String, watch::Receiver<Value>>,
    constraints: ConstraintSet,
    on_change: F,
) -> GraphResult<LiveValidator>
where
    F: Fn(ChangeMap) + Send + Sync + 'static,
{
    let field_ids: Vec<String> = sources.keys().cloned().collect();
    let graph = build_graph(&field_ids, &constraints)?;
    // Cycles are configuration errors; surface them before any event fires.
    graph.overall_order(false)?;

    let graph = Arc::new(graph);
    let sources = Arc::new(sources);
    let on_change: Arc<dyn Fn(ChangeMap) + Send + Sync> = Arc::new(on_change);
    let state = Arc::new(SubscriptionState::new(field_ids.clone()));

    let mut tasks = Vec::with_capacity(field_ids.len());
    for field in field_ids {
        let mut rx = match sources.get(&field) {
            Some(rx) => rx.clone(),
            None => continue,
        };
        let graph = Arc::clone(&graph);
        let sources = Arc::clone(&sources);
        let state = Arc::clone(&state);
        let on_change = Arc::clone(&on_change);
        tasks.push(tokio::spawn(async move {
            loop {
                // Sender dropped: the source is gone for good.
                if rx.changed().await.is_err() {
                    break;
                }
                if state.is_cancelled() {
                    break;
                }
                let version = state.bump(&field);
                trace!(field = %field, version, "change event");
                tokio::spawn(run_and_report(
                    Arc::clone(&graph),
                    Arc::clone(&sources),
                    Arc::clone(&state),
                    Arc::clone(&on_change),
                    field.clone(),
                    version,
                ));
            }
        }));
    }

    Ok(LiveValidator { state, tasks })
}

/// Run one cascade and deliver its change map unless superseded.
async fn run_and_report(
    graph: Arc<DepGraph<String, Constraint>>,
    sources: Arc<HashMap<String, watch::Receiver<Value>>>,
    state: Arc<SubscriptionState>,
    on_change: Arc<dyn Fn(ChangeMap) + Send + Sync>,
    origin: String,
    version: u64,
) {
    match run_cascade(&graph, &sources, &state, &origin, version).await {
        Ok(Some(changes)) => {
            debug!(origin = %origin, fields = changes.len(), "cascade settled");
            on_change(changes);
        }
        Ok(None) => {
            trace!(origin = %origin, version, "cascade superseded or cancelled");
        }
        Err(err) => {
            // A non-validation failure is a bug in caller-supplied
            // validator code; the subscription cannot continue.
            error!(origin = %origin, error = %err, "fatal validator failure, cancelling live validation");
            state.cancel();
        }
    }
}

/// Validate the changed field and, transitively, its dependants.
///
/// Returns `Ok(None)` when the cascade was superseded by a newer change
/// to the origin field or by cancellation.
async fn run_cascade(
    graph: &DepGraph<String, Constraint>,
    sources: &HashMap<String, watch::Receiver<Value>>,
    state: &SubscriptionState,
    origin: &str,
    version: u64,
) -> Result<Option<ChangeMap>, FatalError> {
    let mut changes = ChangeMap::default();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::from([origin.to_string()]);

    while let Some(field) = queue.pop_front() {
        if !visited.insert(field.clone()) {
            continue;
        }
        if state.superseded(origin, version) {
            return Ok(None);
        }

        let constraint = match graph.node_data(&field) {
            Some(constraint) => constraint,
            None => continue,
        };
        let value = current_value(sources, &field);

        // Fields without validators pass through; empty values are
        // skipped silently in live mode (no required-field errors here,
        // unlike the static path).
        let errors = if !constraint.has_validators() || is_empty(&value) {
            Vec::new()
        } else {
            let deadline = timeout::deadline();
            let deps = resolve_dependencies(sources, &constraint.dependencies);
            run_validators(&field, &constraint.validators, &value, &deps, deadline).await?
        };

        let passed = errors.is_empty();
        changes.record(&field, errors);

        // A failing field stops its branch: dependants are not visited
        // and stay out of this cascade's change map.
        if passed {
            for dependant in graph.immediate_dependencies_of(&field)? {
                if !visited.contains(&dependant) {
                    queue.push_back(dependant);
                }
            }
        }
    }

    if state.superseded(origin, version) {
        return Ok(None);
    }
    Ok(Some(changes))
}

/// Current value of a field source; `Null` when the field has no source
fn current_value(sources: &HashMap<String, watch::Receiver<Value>>, field: &str) -> Value {
    sources
        .get(field)
        .map(|rx| rx.borrow().clone())
        .unwrap_or(Value::Null)
}

/// Snapshot the current values of declared dependencies. Missing sources
/// are present as `Null` rather than omitted.
fn resolve_dependencies(
    sources: &HashMap<String, watch::Receiver<Value>>,
    dependencies: &[String],
) -> DependencyValues {
    let mut resolved = DependencyValues::with_capacity(dependencies.len());
    for dep in dependencies {
        resolved.insert(dep.clone(), current_value(sources, dep));
    }
    resolved
}
