use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, PodTemplateSpec, Secret};
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::crd::ChaosExperiment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    pub fn parse(app_kind: &str) -> Option<Self> {
        match app_kind.to_lowercase().as_str() {
            "deployment" | "deployments" => Some(WorkloadKind::Deployment),
            "statefulset" | "statefulsets" => Some(WorkloadKind::StatefulSet),
            "daemonset" | "daemonsets" => Some(WorkloadKind::DaemonSet),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::StatefulSet => "statefulset",
            WorkloadKind::DaemonSet => "daemonset",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployments",
            WorkloadKind::StatefulSet => "statefulsets",
            WorkloadKind::DaemonSet => "daemonsets",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub name: String,
    pub template_labels: BTreeMap<String, String>,
}

impl Workload {
    fn from_template(name: Option<String>, template: Option<&PodTemplateSpec>) -> Self {
        Self {
            name: name.unwrap_or_default(),
            template_labels: template
                .and_then(|t| t.metadata.as_ref())
                .and_then(|m| m.labels.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("forbidden to {verb} {resource}: {message}")]
    Forbidden {
        verb: &'static str,
        resource: &'static str,
        message: String,
    },
    #[error("failed to {verb} {resource}: {source}")]
    Api {
        verb: &'static str,
        resource: &'static str,
        #[source]
        source: kube::Error,
    },
}

impl ClusterError {
    fn from_kube(verb: &'static str, resource: &'static str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(e) if e.code == 403 => ClusterError::Forbidden {
                verb,
                resource,
                message: e.message.clone(),
            },
            source => ClusterError::Api {
                verb,
                resource,
                source,
            },
        }
    }
}

#[async_trait]
pub trait ClusterReader: Send + Sync {
    async fn list_workloads(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Workload>, ClusterError>;

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError>;

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, ClusterError>;

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, ClusterError>;

    async fn get_chaos_experiment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ChaosExperiment>, ClusterError>;
}

trait PodTemplated: Resource<DynamicType = (), Scope = k8s_openapi::NamespaceResourceScope>
    + Clone
    + DeserializeOwned
    + fmt::Debug
{
    fn template(&self) -> Option<&PodTemplateSpec>;
}

impl PodTemplated for Deployment {
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
}

impl PodTemplated for StatefulSet {
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
}

impl PodTemplated for DaemonSet {
    fn template(&self) -> Option<&PodTemplateSpec> {
        self.spec.as_ref().map(|s| &s.template)
    }
}

#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn list_templated<K: PodTemplated>(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Workload>, ClusterError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| ClusterError::from_kube("list", kind.plural(), e))?;

        Ok(list
            .items
            .iter()
            .map(|w| Workload::from_template(w.meta().name.clone(), w.template()))
            .collect())
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn list_workloads(
        &self,
        kind: WorkloadKind,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<Workload>, ClusterError> {
        match kind {
            WorkloadKind::Deployment => {
                self.list_templated::<Deployment>(kind, namespace, label_selector)
                    .await
            }
            WorkloadKind::StatefulSet => {
                self.list_templated::<StatefulSet>(kind, namespace, label_selector)
                    .await
            }
            WorkloadKind::DaemonSet => {
                self.list_templated::<DaemonSet>(kind, namespace, label_selector)
                    .await
            }
        }
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, ClusterError> {
        Api::<ConfigMap>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
            .map_err(|e| ClusterError::from_kube("get", "configmaps", e))
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, ClusterError> {
        Api::<Secret>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
            .map_err(|e| ClusterError::from_kube("get", "secrets", e))
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>, ClusterError> {
        Api::<Namespace>::all(self.client.clone())
            .get_opt(name)
            .await
            .map_err(|e| ClusterError::from_kube("get", "namespaces", e))
    }

    async fn get_chaos_experiment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ChaosExperiment>, ClusterError> {
        Api::<ChaosExperiment>::namespaced(self.client.clone(), namespace)
            .get_opt(name)
            .await
            .map_err(|e| ClusterError::from_kube("get", "chaosexperiments", e))
    }
}
