use std::path::PathBuf;

use clap::Parser;

/// Gang-aware custom scheduler for Kubernetes.
///
/// Binds at most one of its pods per node, preempts lower-priority pods for
/// higher-priority pending ones, and places annotated pod groups atomically.
#[derive(Parser, Clone, Debug)]
#[command(about, long_about = None, version)]
pub struct Cli {
    #[arg(
        long,
        env = "SCHEDULER_NAME",
        help = "Scheduler name matched against each pod's spec.schedulerName"
    )]
    pub scheduler_name: String,

    #[arg(
        long,
        env = "POD_NAMESPACE",
        help = "Namespace to schedule pods in (all namespaces when unset)"
    )]
    pub namespace: Option<String>,

    #[arg(
        long,
        env = "KUBECONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to kubeconfig file (defaults to in-cluster config or ~/.kube/config)"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        default_value = "5",
        help = "Seconds between scheduling passes; kept coarse so binds settle before the next read"
    )]
    pub tick_period_secs: u64,
}
