use std::collections::BTreeMap;

use tracing::debug;

use crate::cluster::{ClusterError, ClusterReader, WorkloadKind};

use super::ValidationReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLabel<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl<'a> AppLabel<'a> {
    pub fn parse(selector: &'a str) -> Option<Self> {
        if selector.contains(',') || selector.contains('!') {
            return None;
        }
        let mut parts = selector.split('=').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) if !key.is_empty() && !value.is_empty() => {
                Some(Self { key, value })
            }
            _ => None,
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(self.key).is_some_and(|v| v == self.value)
    }
}

pub async fn resolve_target(
    cluster: &dyn ClusterReader,
    app_kind: &str,
    namespace: &str,
    app_label: &str,
    verify_pod_template_labels: bool,
) -> ValidationReport {
    let Some(kind) = WorkloadKind::parse(app_kind) else {
        return ValidationReport::fail(format!(
            "Unable to validate resourceType: {}, unsupported resource",
            app_kind.to_lowercase()
        ));
    };

    let Some(label) = AppLabel::parse(app_label) else {
        return ValidationReport::fail(format!(
            "appLabel '{app_label}' provided in ChaosEngine must be a single key=value pair"
        ));
    };

    let workloads = match cluster.list_workloads(kind, namespace, app_label).await {
        Ok(w) => w,
        Err(e @ ClusterError::Forbidden { .. }) => {
            return ValidationReport::fail(format!(
                "unable to list {plural}, please provide a suitable RBAC with apiGroup 'apps', \
                 resource '{plural}' and verb 'list', or remove this ChaosEngine: {e}",
                plural = kind.plural(),
            ));
        }
        Err(e) => {
            return ValidationReport::fail(format!(
                "unable to list {} specified in ChaosEngine, please check the following error: {e}",
                kind.plural(),
            ));
        }
    };

    if workloads.is_empty() {
        return ValidationReport::fail(format!("unable to find {kind} specified in ChaosEngine"));
    }

    if verify_pod_template_labels {
        if let Some(w) = workloads.iter().find(|w| !label.matches(&w.template_labels)) {
            debug!(%kind, workload = %w.name, %namespace, app_label, "pod template label mismatch");
            return ValidationReport::fail(format!(
                "unable to find labels in pod template of {kind} provided"
            ));
        }
    }

    ValidationReport::pass()
}
