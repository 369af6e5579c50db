use std::fmt;

use chrono::DateTime;
use chrono::Utc;

/// A worker node as observed at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeState {
    pub name: String,
    /// Whether the node reports a `Ready` condition.
    pub ready: bool,
    /// Whether the node is cordoned.
    pub unschedulable: bool,
}

impl NodeState {
    /// A node may receive bindings iff it is ready and not cordoned.
    pub fn is_eligible(&self) -> bool {
        self.ready && !self.unschedulable
    }
}

/// Namespaced pod identity, ordered by (namespace, name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PodId {
    pub namespace: String,
    pub name: String,
}

impl PodId {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Pod lifecycle phase as reported by the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

/// A pod as observed at snapshot time, reduced to the fields the scheduling
/// policy reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodState {
    pub id: PodId,
    /// The scheduler this pod asks for (`spec.schedulerName`).
    pub scheduler_name: String,
    /// The node the pod is assigned to, if any.
    pub node_name: Option<String>,
    pub phase: PodPhase,
    /// Scheduling priority; pods without one are priority 0.
    pub priority: i32,
    /// Gang identity, if the pod carries the group-name annotation.
    pub group_name: Option<String>,
    /// Declared gang minimum, if the pod carries a well-formed min-available
    /// annotation.
    pub min_available: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PodState {
    /// Awaiting placement: `Pending` with no node assigned.
    pub fn is_pending_unbound(&self) -> bool {
        self.phase == PodPhase::Pending && self.node_name.is_none()
    }

    /// Occupies its assigned node. `Unknown` pods with a node are treated as
    /// occupying it, so a node whose pod may still be alive is never
    /// double-booked.
    pub fn is_bound_active(&self) -> bool {
        self.node_name.is_some()
            && matches!(
                self.phase,
                PodPhase::Pending | PodPhase::Running | PodPhase::Unknown
            )
    }
}

/// Immutable input for one scheduling pass.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// This scheduler's own name; pods claiming a different scheduler are
    /// invisible to the engine.
    pub scheduler_name: String,
    pub nodes: Vec<NodeState>,
    pub pods: Vec<PodState>,
}
