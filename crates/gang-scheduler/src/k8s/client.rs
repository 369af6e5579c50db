use std::path::Path;

use error_stack::Report;
use error_stack::ResultExt;
use kube::config::KubeConfigOptions;
use kube::config::Kubeconfig;
use kube::Client;
use kube::Config;

use crate::k8s::types::KubernetesError;

/// Build the API client: from an explicit kubeconfig file when one was
/// given, otherwise whatever the environment provides (in-cluster service
/// account first, then `~/.kube/config`).
pub(crate) async fn init_kube_client(
    kubeconfig: Option<&Path>,
) -> Result<Client, Report<KubernetesError>> {
    let config = match kubeconfig {
        Some(path) => config_from_file(path).await?,
        None => {
            Config::infer()
                .await
                .change_context_lazy(|| KubernetesError::ConnectionFailed {
                    message: "No usable in-cluster or local Kubernetes configuration".to_string(),
                })?
        }
    };

    Client::try_from(config).change_context_lazy(|| KubernetesError::ConnectionFailed {
        message: "Could not construct Kubernetes client".to_string(),
    })
}

async fn config_from_file(path: &Path) -> Result<Config, Report<KubernetesError>> {
    let context = || KubernetesError::ConnectionFailed {
        message: format!("Unusable kubeconfig at {}", path.display()),
    };
    let kubeconfig = Kubeconfig::read_from(path).change_context_lazy(context)?;
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .change_context_lazy(context)
}
