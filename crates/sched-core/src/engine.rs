//! The scheduling pass.
//!
//! One call to [`schedule`] runs a single deterministic pass over a
//! [`Snapshot`]: filter pods to the ones claiming this scheduler, order the
//! pending ones by entitlement, then greedily bind each onto a free node or
//! preempt a strictly cheaper bound pod. Pods sharing a gang identity are
//! placed together: either enough members fit to satisfy the gang minimum or
//! none are touched at all.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;

use crate::plan::Plan;
use crate::snapshot::PodId;
use crate::snapshot::PodState;
use crate::snapshot::Snapshot;

/// Derived gang state, aggregated over every member observed in the snapshot.
struct GroupState<'a> {
    /// Max priority across members, running or pending.
    priority: i32,
    /// Max min-available declared by a pending member; 1 when none declares,
    /// so undeclared gangs schedule member by member.
    min_available: u32,
    /// Bound-active members. The running total at any point in the pass is
    /// these minus the ones already planned for eviction.
    bound: Vec<&'a PodId>,
}

/// Immutable per-pass context shared by every placement attempt.
struct ClusterView<'a> {
    eligible: BTreeSet<&'a str>,
    /// Node -> the bound-active pod that owns it. When several bound pods
    /// claim one node the smallest `PodId` wins; the others still occupy the
    /// node but are invisible to preemption.
    occupants: BTreeMap<&'a str, &'a PodState>,
    groups: BTreeMap<&'a str, GroupState<'a>>,
}

impl<'a> ClusterView<'a> {
    /// Group priority for gang members, own priority otherwise. Governs both
    /// the scheduling order and preemption entitlement.
    fn effective_priority(&self, pod: &PodState) -> i32 {
        pod.group_name
            .as_deref()
            .and_then(|g| self.groups.get(g))
            .map(|g| g.priority)
            .unwrap_or(pod.priority)
    }
}

/// Mutable placement state for one pass. Cloned wholesale when a gang needs a
/// scratch copy it can abandon.
#[derive(Clone)]
struct WorkingSet<'a> {
    /// Eligible nodes with no bound pod and no planned bind yet.
    available: BTreeSet<&'a str>,
    /// Nodes already targeted by a planned bind.
    targeted: BTreeSet<&'a str>,
    /// Groups with at least one planned bind. Their bound members may not be
    /// evicted for anyone else: the plan is promising this gang its minimum.
    bound_groups: BTreeSet<&'a str>,
    evicted: BTreeSet<&'a PodId>,
    evictions: Vec<&'a PodId>,
    bindings: Vec<(&'a PodId, &'a str)>,
}

impl<'a> WorkingSet<'a> {
    fn bind(&mut self, pod: &'a PodId, node: &'a str, group: Option<&'a str>) {
        self.available.remove(node);
        self.targeted.insert(node);
        if let Some(group) = group {
            self.bound_groups.insert(group);
        }
        self.bindings.push((pod, node));
    }

    fn evict(&mut self, victim: &'a PodId) {
        self.evicted.insert(victim);
        self.evictions.push(victim);
    }
}

/// Compute the bind/evict plan for one snapshot.
///
/// Never fails: malformed or contradictory inputs fall back to conservative
/// defaults, and a snapshot with nothing to do yields an empty plan.
pub fn schedule(snapshot: &Snapshot) -> Plan {
    let mut pending: Vec<&PodState> = Vec::new();
    let mut bound: Vec<&PodState> = Vec::new();
    for pod in &snapshot.pods {
        if pod.scheduler_name != snapshot.scheduler_name {
            continue;
        }
        if pod.is_pending_unbound() {
            pending.push(pod);
        } else if pod.is_bound_active() {
            bound.push(pod);
        }
    }

    let view = build_view(snapshot, &pending, &bound);

    pending.sort_by(|a, b| {
        view.effective_priority(b)
            .cmp(&view.effective_priority(a))
            .then_with(|| cmp_created_earliest(a, b))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut ws = WorkingSet {
        available: view
            .eligible
            .iter()
            .copied()
            .filter(|n| !view.occupants.contains_key(n))
            .collect(),
        targeted: BTreeSet::new(),
        bound_groups: BTreeSet::new(),
        evicted: BTreeSet::new(),
        evictions: Vec::new(),
        bindings: Vec::new(),
    };

    debug!(
        pending = pending.len(),
        bound = bound.len(),
        free = ws.available.len(),
        "Starting scheduling pass"
    );

    // Pending pods consumed by a gang batch, committed or not.
    let mut batched: BTreeSet<&PodId> = BTreeSet::new();
    // Gangs whose minimum is already running; members place individually.
    let mut satisfied_groups: BTreeSet<&str> = BTreeSet::new();

    for pod in &pending {
        if batched.contains(&pod.id) {
            continue;
        }
        match pod.group_name.as_deref() {
            None => {
                try_place(&view, &mut ws, &pod.id, pod.priority, None);
            }
            Some(group) if satisfied_groups.contains(group) => {
                try_place(&view, &mut ws, &pod.id, view.effective_priority(pod), Some(group));
            }
            Some(group) => {
                let Some(state) = view.groups.get(group) else {
                    continue;
                };
                // Count running members net of evictions already planned by
                // higher-entitlement pods this pass.
                let running = state
                    .bound
                    .iter()
                    .filter(|id| !ws.evicted.contains(*id))
                    .count();
                let need = state.min_available as i64 - running as i64;
                if need <= 0 {
                    satisfied_groups.insert(group);
                    try_place(&view, &mut ws, &pod.id, state.priority, Some(group));
                    continue;
                }

                // Place the gang atomically: `need` members must all fit in a
                // scratch copy of the working state or nothing is committed.
                let mut scratch = ws.clone();
                let mut placed: i64 = 0;
                for member in pending.iter().filter(|p| p.group_name.as_deref() == Some(group)) {
                    if placed == need {
                        break;
                    }
                    if try_place(&view, &mut scratch, &member.id, state.priority, Some(group)) {
                        placed += 1;
                    } else {
                        break;
                    }
                }
                if placed >= need {
                    ws = scratch;
                } else {
                    debug!(group, need, placed, "Gang below threshold, discarding placements");
                }
                for member in pending.iter().filter(|p| p.group_name.as_deref() == Some(group)) {
                    batched.insert(&member.id);
                }
            }
        }
    }

    Plan::new(
        ws.evictions.into_iter().cloned().collect(),
        ws.bindings
            .into_iter()
            .map(|(pod, node)| (pod.clone(), node.to_string()))
            .collect(),
    )
}

fn build_view<'a>(
    snapshot: &'a Snapshot,
    pending: &[&'a PodState],
    bound: &[&'a PodState],
) -> ClusterView<'a> {
    let eligible: BTreeSet<&str> = snapshot
        .nodes
        .iter()
        .filter(|n| n.is_eligible())
        .map(|n| n.name.as_str())
        .collect();

    // Smallest PodId claims the node first, so contradictory snapshots
    // resolve the same way every pass.
    let mut claimants: Vec<&PodState> = bound.to_vec();
    claimants.sort_by(|a, b| a.id.cmp(&b.id));
    let mut occupants: BTreeMap<&str, &PodState> = BTreeMap::new();
    for pod in claimants {
        if let Some(node) = pod.node_name.as_deref() {
            occupants.entry(node).or_insert(pod);
        }
    }

    let mut groups: BTreeMap<&str, GroupState<'a>> = BTreeMap::new();
    for pod in bound.iter().chain(pending.iter()) {
        let Some(group) = pod.group_name.as_deref() else {
            continue;
        };
        let state = groups.entry(group).or_insert(GroupState {
            priority: pod.priority,
            min_available: 1,
            bound: Vec::new(),
        });
        state.priority = state.priority.max(pod.priority);
        if pod.is_bound_active() {
            state.bound.push(&pod.id);
        } else if let Some(min) = pod.min_available.filter(|m| *m > 0) {
            state.min_available = state.min_available.max(min);
        }
    }

    ClusterView {
        eligible,
        occupants,
        groups,
    }
}

/// One placement attempt: a free node if any remains (smallest name), else
/// the cheapest strictly-lower-priority victim. Returns whether the pod was
/// placed into `ws`.
fn try_place<'a>(
    view: &ClusterView<'a>,
    ws: &mut WorkingSet<'a>,
    pod: &'a PodId,
    displacer_priority: i32,
    displacer_group: Option<&'a str>,
) -> bool {
    if let Some(node) = ws.available.iter().next().copied() {
        ws.bind(pod, node, displacer_group);
        return true;
    }
    if let Some((node, victim)) = find_victim(view, ws, displacer_priority, displacer_group) {
        ws.evict(&victim.id);
        ws.bind(pod, node, displacer_group);
        return true;
    }
    false
}

/// Pick the cheapest preemptable occupant: lowest priority, then latest
/// creation (an unknown age counts as newest), then smallest id. Only node
/// owners on eligible nodes qualify. Members of a gang this plan binds into
/// are untouchable, and a gang may neither evict its own members nor cut
/// into a gang that is not strictly below it.
fn find_victim<'a>(
    view: &ClusterView<'a>,
    ws: &WorkingSet<'a>,
    displacer_priority: i32,
    displacer_group: Option<&str>,
) -> Option<(&'a str, &'a PodState)> {
    let mut best: Option<(&'a str, &'a PodState)> = None;
    for (&node, &occupant) in &view.occupants {
        if !view.eligible.contains(node) || ws.targeted.contains(node) {
            continue;
        }
        if ws.evicted.contains(&occupant.id) {
            continue;
        }
        if occupant.priority >= displacer_priority {
            continue;
        }
        if let Some(victim_group) = occupant.group_name.as_deref() {
            if ws.bound_groups.contains(victim_group) {
                continue;
            }
            if displacer_group.is_some() {
                if displacer_group == Some(victim_group) {
                    continue;
                }
                let shield = view
                    .groups
                    .get(victim_group)
                    .map(|g| g.priority)
                    .unwrap_or(occupant.priority);
                if shield >= displacer_priority {
                    continue;
                }
            }
        }
        let cheaper = match best {
            None => true,
            Some((_, current)) => victim_cost(occupant, current) == Ordering::Less,
        };
        if cheaper {
            best = Some((node, occupant));
        }
    }
    best
}

fn victim_cost(a: &PodState, b: &PodState) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| cmp_created_latest(a, b))
        .then_with(|| a.id.cmp(&b.id))
}

fn cmp_created_earliest(a: &PodState, b: &PodState) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_created_latest(a: &PodState, b: &PodState) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
