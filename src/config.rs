use figment::{Figment, providers::{Env, Format, Yaml}};
use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "0.0.0.0:8443".to_string()
}

fn default_tls_cert_path() -> String {
    "/certs/tls.crt".to_string()
}

fn default_tls_key_path() -> String {
    "/certs/tls.key".to_string()
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ignored_namespaces() -> Vec<String> {
    vec!["kube-system".to_string(), "kube-public".to_string()]
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_tls_cert_path")]
    pub tls_cert_path: String,
    #[serde(default = "default_tls_key_path")]
    pub tls_key_path: String,
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub admission: AdmissionPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionPolicy {
    #[serde(default = "default_ignored_namespaces")]
    pub ignored_namespaces: Vec<String>,
    #[serde(default = "default_true")]
    pub validate_updates: bool,
    #[serde(default = "default_true")]
    pub verify_pod_template_labels: bool,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            ignored_namespaces: default_ignored_namespaces(),
            validate_updates: true,
            verify_pod_template_labels: true,
        }
    }
}

impl AdmissionPolicy {
    pub fn is_ignored(&self, namespace: &str) -> bool {
        self.ignored_namespaces.iter().any(|ns| ns == namespace)
    }
}

impl AdmissionConfig {
    pub fn load(path: &str) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("CHAOS_ADMISSION_").split("__"))
            .extract()
            .map_err(Box::new)
    }
}
