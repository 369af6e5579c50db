use std::collections::BTreeMap;

use tracing::debug;

/// Domain prefix for gang-scheduling annotations.
const SCHEDULING_DOMAIN: &str = "custom-scheduling.k8s.io";

/// Gang annotations extracted from a Kubernetes pod.
///
/// Parsing is lenient by contract: an absent or malformed value leaves the
/// field unset rather than failing, so a badly annotated pod simply carries
/// no gang constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GangAnnotations {
    /// Group identity; pods sharing it are scheduled together.
    pub group_name: Option<String>,
    /// Minimum number of group members that must run simultaneously.
    pub min_available: Option<u32>,
}

impl GangAnnotations {
    /// Parse gang annotations from a pod's annotation map. Only annotations
    /// under the custom-scheduling.k8s.io domain are considered.
    pub(crate) fn from_pod_annotations(annotations: &BTreeMap<String, String>) -> Self {
        let mut result = Self::default();

        if let Some(value) = annotations.get(&format!("{SCHEDULING_DOMAIN}/group-name")) {
            if !value.is_empty() {
                result.group_name = Some(value.clone());
            }
        }

        if let Some(value) = annotations.get(&format!("{SCHEDULING_DOMAIN}/min-available")) {
            match value.trim().parse::<u32>() {
                Ok(min) if min > 0 => result.min_available = Some(min),
                _ => debug!("Ignoring malformed min-available annotation: {value}"),
            }
        }

        result
    }
}
