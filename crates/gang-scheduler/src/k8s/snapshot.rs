//! Conversion from Kubernetes API objects to the decision core's snapshot.
//!
//! Conversion never fails: objects missing a name are dropped, everything
//! else falls back to conservative defaults so one malformed pod cannot take
//! down a scheduling pass.

use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Pod;
use sched_core::NodeState;
use sched_core::PodId;
use sched_core::PodPhase;
use sched_core::PodState;
use sched_core::Snapshot;

use crate::k8s::annotations::GangAnnotations;

pub(crate) fn build_snapshot(scheduler_name: &str, nodes: Vec<Node>, pods: Vec<Pod>) -> Snapshot {
    Snapshot {
        scheduler_name: scheduler_name.to_string(),
        nodes: nodes.into_iter().filter_map(node_state).collect(),
        pods: pods.into_iter().filter_map(pod_state).collect(),
    }
}

fn node_state(node: Node) -> Option<NodeState> {
    let name = node.metadata.name?;
    let ready = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false);
    let unschedulable = node
        .spec
        .and_then(|spec| spec.unschedulable)
        .unwrap_or(false);
    Some(NodeState {
        name,
        ready,
        unschedulable,
    })
}

fn pod_state(pod: Pod) -> Option<PodState> {
    let name = pod.metadata.name?;
    let namespace = pod
        .metadata
        .namespace
        .unwrap_or_else(|| "default".to_string());

    let gang =
        GangAnnotations::from_pod_annotations(&pod.metadata.annotations.unwrap_or_default());

    let spec = pod.spec.unwrap_or_default();
    let phase = pod
        .status
        .and_then(|status| status.phase)
        .map(|phase| parse_phase(&phase))
        .unwrap_or(PodPhase::Unknown);

    Some(PodState {
        id: PodId::new(namespace, name),
        scheduler_name: spec.scheduler_name.unwrap_or_default(),
        node_name: spec.node_name,
        phase,
        priority: spec.priority.unwrap_or(0),
        group_name: gang.group_name,
        min_available: gang.min_available,
        created_at: pod.metadata.creation_timestamp.map(|t| t.0),
    })
}

fn parse_phase(phase: &str) -> PodPhase {
    match phase {
        "Pending" => PodPhase::Pending,
        "Running" => PodPhase::Running,
        "Succeeded" => PodPhase::Succeeded,
        "Failed" => PodPhase::Failed,
        _ => PodPhase::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::NodeCondition;
    use k8s_openapi::api::core::v1::NodeSpec;
    use k8s_openapi::api::core::v1::NodeStatus;
    use k8s_openapi::api::core::v1::PodSpec;
    use k8s_openapi::api::core::v1::PodStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use chrono::TimeZone;
    use chrono::Utc;

    use super::*;

    fn test_node(name: &str, ready_status: Option<&str>, unschedulable: Option<bool>) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(NodeSpec {
                unschedulable,
                ..Default::default()
            }),
            status: ready_status.map(|status| NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_string(),
                    status: status.to_string(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
        }
    }

    fn test_pod(
        name: &str,
        scheduler_name: &str,
        phase: Option<&str>,
        node_name: Option<&str>,
        priority: Option<i32>,
        annotations: BTreeMap<String, String>,
    ) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("batch".to_string()),
                annotations: Some(annotations),
                creation_timestamp: Some(Time(Utc.timestamp_opt(1_700_000_000, 0).unwrap())),
                ..Default::default()
            },
            spec: Some(PodSpec {
                scheduler_name: Some(scheduler_name.to_string()),
                node_name: node_name.map(str::to_string),
                priority,
                ..Default::default()
            }),
            status: phase.map(|p| PodStatus {
                phase: Some(p.to_string()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn node_readiness_from_ready_condition() {
        assert!(node_state(test_node("n", Some("True"), None)).unwrap().ready);
        assert!(!node_state(test_node("n", Some("False"), None)).unwrap().ready);
        assert!(!node_state(test_node("n", Some("Unknown"), None)).unwrap().ready);
        assert!(!node_state(test_node("n", None, None)).unwrap().ready);
    }

    #[test]
    fn node_unschedulable_defaults_to_false() {
        assert!(!node_state(test_node("n", Some("True"), None)).unwrap().unschedulable);
        assert!(
            node_state(test_node("n", Some("True"), Some(true)))
                .unwrap()
                .unschedulable
        );
    }

    #[test]
    fn unnamed_node_is_dropped() {
        let node = Node::default();
        assert!(node_state(node).is_none());
    }

    #[test]
    fn pod_fields_are_extracted() {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            "custom-scheduling.k8s.io/group-name".to_string(),
            "g".to_string(),
        );
        annotations.insert(
            "custom-scheduling.k8s.io/min-available".to_string(),
            "2".to_string(),
        );
        let state = pod_state(test_pod(
            "p",
            "gang-scheduler",
            Some("Running"),
            Some("n1"),
            Some(7),
            annotations,
        ))
        .unwrap();

        assert_eq!(state.id, PodId::new("batch", "p"));
        assert_eq!(state.scheduler_name, "gang-scheduler");
        assert_eq!(state.node_name.as_deref(), Some("n1"));
        assert_eq!(state.phase, PodPhase::Running);
        assert_eq!(state.priority, 7);
        assert_eq!(state.group_name.as_deref(), Some("g"));
        assert_eq!(state.min_available, Some(2));
        assert_eq!(
            state.created_at,
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
    }

    #[test]
    fn missing_priority_defaults_to_zero() {
        let state = pod_state(test_pod("p", "s", Some("Pending"), None, None, BTreeMap::new()))
            .unwrap();
        assert_eq!(state.priority, 0);
    }

    #[test]
    fn missing_status_maps_to_unknown_phase() {
        let state =
            pod_state(test_pod("p", "s", None, None, None, BTreeMap::new())).unwrap();
        assert_eq!(state.phase, PodPhase::Unknown);
    }

    #[test]
    fn unrecognized_phase_maps_to_unknown() {
        let state = pod_state(test_pod("p", "s", Some("Evicting"), None, None, BTreeMap::new()))
            .unwrap();
        assert_eq!(state.phase, PodPhase::Unknown);
    }

    #[test]
    fn unnamed_pod_is_dropped() {
        assert!(pod_state(Pod::default()).is_none());
    }

    #[test]
    fn missing_namespace_defaults() {
        let mut pod = test_pod("p", "s", Some("Pending"), None, None, BTreeMap::new());
        pod.metadata.namespace = None;
        assert_eq!(pod_state(pod).unwrap().id, PodId::new("default", "p"));
    }

    #[test]
    fn build_snapshot_drops_malformed_objects() {
        let snapshot = build_snapshot(
            "gs",
            vec![test_node("n1", Some("True"), None), Node::default()],
            vec![
                test_pod("p", "gs", Some("Pending"), None, None, BTreeMap::new()),
                Pod::default(),
            ],
        );
        assert_eq!(snapshot.scheduler_name, "gs");
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.pods.len(), 1);
    }
}
