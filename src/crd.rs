use kube::CustomResource;
use serde::{Deserialize, Serialize};

pub const CHAOS_ENGINE_KIND: &str = "ChaosEngine";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize)]
#[kube(
    group = "litmuschaos.io",
    version = "v1alpha1",
    kind = "ChaosEngine",
    namespaced,
    schema = "disabled"
)]
pub struct ChaosEngineSpec {
    #[serde(default)]
    pub appinfo: ApplicationParams,
    #[serde(default)]
    pub experiments: Vec<ExperimentList>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationParams {
    #[serde(default)]
    pub appns: String,
    #[serde(default)]
    pub applabel: String,
    #[serde(default)]
    pub appkind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentList {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub spec: ExperimentAttributes,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperimentAttributes {
    #[serde(default)]
    pub components: ExperimentComponents,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentComponents {
    #[serde(default)]
    pub config_maps: Vec<NamedRef>,
    #[serde(default)]
    pub secrets: Vec<NamedRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: String,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize)]
#[kube(
    group = "litmuschaos.io",
    version = "v1alpha1",
    kind = "ChaosExperiment",
    namespaced,
    schema = "disabled"
)]
pub struct ChaosExperimentSpec {
    #[serde(default)]
    pub definition: serde_json::Value,
}
