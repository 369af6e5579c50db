use error_stack::Report;
use thiserror::Error;

/// Errors that can occur during Kubernetes operations.
#[derive(Debug, Error)]
pub(crate) enum KubernetesError {
    #[error("Failed to connect to Kubernetes API: {message}")]
    ConnectionFailed { message: String },
    #[error("Failed to list {resource}")]
    ListFailed { resource: String },
    #[error("Failed to bind pod {pod} to node {node}")]
    BindFailed { pod: String, node: String },
    #[error("Failed to evict pod {pod}")]
    EvictionFailed { pod: String },
    #[error("Kubernetes API rejected our credentials while trying to {operation}")]
    PermissionDenied { operation: String },
}

impl KubernetesError {
    /// Retrying a credential rejection on the next tick cannot succeed;
    /// callers treat it as fatal.
    pub(crate) fn is_permanent(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

/// Wrap a failed API call, surfacing credential rejections (HTTP 401/403) as
/// [`KubernetesError::PermissionDenied`] and everything else — timeouts,
/// conflicts, server errors — as the given transient context.
pub(crate) fn classify_api_error(
    err: kube::Error,
    operation: &str,
    transient: KubernetesError,
) -> Report<KubernetesError> {
    let context = match &err {
        kube::Error::Api(response) if response.code == 401 || response.code == 403 => {
            KubernetesError::PermissionDenied {
                operation: operation.to_string(),
            }
        }
        _ => transient,
    };
    Report::new(err).change_context(context)
}

#[cfg(test)]
mod tests {
    use kube::core::ErrorResponse;

    use super::*;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "denied".to_string(),
            reason: "Forbidden".to_string(),
            code,
        })
    }

    fn list_pods_failed() -> KubernetesError {
        KubernetesError::ListFailed {
            resource: "pods".to_string(),
        }
    }

    #[test]
    fn credential_rejections_are_permanent() {
        for code in [401, 403] {
            let report = classify_api_error(api_error(code), "list pods", list_pods_failed());
            assert!(report.current_context().is_permanent(), "code {code}");
        }
    }

    #[test]
    fn other_api_failures_stay_transient() {
        for code in [404, 409, 500, 503] {
            let report = classify_api_error(api_error(code), "list pods", list_pods_failed());
            assert!(
                matches!(report.current_context(), KubernetesError::ListFailed { .. }),
                "code {code}"
            );
        }
    }
}
