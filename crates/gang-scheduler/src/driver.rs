//! The scheduling loop: poll cluster state, run the decision core, apply the
//! plan.

use std::time::Duration;

use error_stack::Report;
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::api::core::v1::Pod;
use kube::api::Api;
use kube::api::ListParams;
use kube::Client;
use sched_core::Action;
use sched_core::Plan;
use sched_core::Snapshot;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use crate::config::Cli;
use crate::k8s;
use crate::k8s::types::classify_api_error;
use crate::k8s::KubernetesError;

pub(crate) struct Driver {
    client: Client,
    scheduler_name: String,
    namespace: Option<String>,
    tick_period: Duration,
}

impl Driver {
    pub(crate) fn new(client: Client, cli: &Cli) -> Self {
        Self {
            client,
            scheduler_name: cli.scheduler_name.clone(),
            namespace: cli.namespace.clone(),
            tick_period: Duration::from_secs(cli.tick_period_secs),
        }
    }

    /// Run scheduling passes until cancelled or the API rejects our
    /// credentials. A transient failure is logged and the loop carries on;
    /// the next tick recomputes from fresh cluster state. A permanent one
    /// ends the loop — retrying a 401/403 every tick gets nowhere.
    pub(crate) async fn run(
        &self,
        token: CancellationToken,
    ) -> Result<(), Report<KubernetesError>> {
        info!(period = ?self.tick_period, "Starting scheduling loop");
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Scheduling loop shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        if e.current_context().is_permanent() {
                            error!("Scheduling pass failed permanently: {e:?}");
                            return Err(e);
                        }
                        error!("Scheduling pass failed, retrying next tick: {e:?}");
                    }
                }
            }
        }
        Ok(())
    }

    /// One pass: snapshot, decide, apply.
    async fn tick(&self) -> Result<(), Report<KubernetesError>> {
        let snapshot = self.fetch_snapshot().await?;
        let plan = sched_core::schedule(&snapshot);

        if plan.is_empty() {
            debug!(
                pods = snapshot.pods.len(),
                nodes = snapshot.nodes.len(),
                "Nothing to schedule"
            );
            return Ok(());
        }

        info!(
            pods = snapshot.pods.len(),
            nodes = snapshot.nodes.len(),
            bindings = plan.binding_count(),
            evictions = plan.eviction_count(),
            "Applying scheduling plan"
        );
        self.apply(&plan).await
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, Report<KubernetesError>> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let node_list = nodes.list(&ListParams::default()).await.map_err(|err| {
            classify_api_error(
                err,
                "list nodes",
                KubernetesError::ListFailed {
                    resource: "nodes".to_string(),
                },
            )
        })?;

        let pods: Api<Pod> = match &self.namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let pod_list = pods.list(&ListParams::default()).await.map_err(|err| {
            classify_api_error(
                err,
                "list pods",
                KubernetesError::ListFailed {
                    resource: "pods".to_string(),
                },
            )
        })?;

        Ok(k8s::snapshot::build_snapshot(
            &self.scheduler_name,
            node_list.items,
            pod_list.items,
        ))
    }

    /// Apply every action in plan order, evictions first. A failed action is
    /// logged and skipped so the rest of the plan still runs; the next pass
    /// re-derives whatever was left outstanding. Only a credential rejection
    /// is reported upward, and only after the whole plan has been attempted.
    async fn apply(&self, plan: &Plan) -> Result<(), Report<KubernetesError>> {
        let mut permanent: Option<Report<KubernetesError>> = None;
        for action in plan {
            let failure = match action {
                Action::Evict { pod } => match k8s::actions::evict_pod(&self.client, pod).await {
                    Ok(()) => {
                        info!(%pod, "Evicted pod");
                        None
                    }
                    Err(e) => {
                        error!(%pod, "Failed to evict pod: {e:?}");
                        Some(e)
                    }
                },
                Action::Bind { pod, node } => {
                    match k8s::actions::bind_pod(&self.client, pod, node).await {
                        Ok(()) => {
                            info!(%pod, %node, "Bound pod to node");
                            None
                        }
                        Err(e) => {
                            error!(%pod, %node, "Failed to bind pod: {e:?}");
                            Some(e)
                        }
                    }
                }
            };
            if let Some(e) = failure {
                if permanent.is_none() && e.current_context().is_permanent() {
                    permanent = Some(e);
                }
            }
        }
        permanent.map_or(Ok(()), Err)
    }
}
