//! Plan application against the cluster API.

use error_stack::Report;
use error_stack::ResultExt;
use k8s_openapi::api::core::v1::Binding;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::Api;
use kube::api::DeleteParams;
use kube::api::EvictParams;
use kube::api::PostParams;
use kube::Client;
use sched_core::PodId;

use crate::k8s::types::classify_api_error;
use crate::k8s::types::KubernetesError;

/// Assign a pending pod to a node via the pod `binding` subresource.
pub(crate) async fn bind_pod(
    client: &Client,
    pod: &PodId,
    node: &str,
) -> Result<(), Report<KubernetesError>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), &pod.namespace);
    let context = || KubernetesError::BindFailed {
        pod: pod.to_string(),
        node: node.to_string(),
    };

    let data = serde_json::to_vec(&binding_for(pod, node)).change_context_lazy(context)?;
    api.create_subresource::<Binding>("binding", &pod.name, &PostParams::default(), data)
        .await
        .map_err(|err| classify_api_error(err, &format!("bind pod {pod}"), context()))?;
    Ok(())
}

/// Request graceful removal of a bound pod via the eviction subresource.
pub(crate) async fn evict_pod(
    client: &Client,
    pod: &PodId,
) -> Result<(), Report<KubernetesError>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), &pod.namespace);
    // Zero grace period: the next pass should observe the node freed, not a
    // pod stuck terminating.
    let params = EvictParams {
        delete_options: Some(DeleteParams {
            grace_period_seconds: Some(0),
            ..Default::default()
        }),
        ..Default::default()
    };
    api.evict(&pod.name, &params).await.map_err(|err| {
        classify_api_error(
            err,
            &format!("evict pod {pod}"),
            KubernetesError::EvictionFailed {
                pod: pod.to_string(),
            },
        )
    })?;
    Ok(())
}

fn binding_for(pod: &PodId, node: &str) -> Binding {
    Binding {
        metadata: ObjectMeta {
            name: Some(pod.name.clone()),
            ..Default::default()
        },
        target: ObjectReference {
            api_version: Some("v1".to_string()),
            kind: Some("Node".to_string()),
            name: Some(node.to_string()),
            ..Default::default()
        },
    }
}
