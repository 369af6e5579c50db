pub(crate) mod actions;
pub(crate) mod annotations;
pub(crate) mod client;
pub(crate) mod snapshot;
pub(crate) mod types;

pub(crate) use client::init_kube_client;
pub(crate) use types::KubernetesError;
