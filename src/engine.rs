use std::fmt;
use std::time::{Duration, Instant};

use crate::checks::{ValidationReport, dependencies, target};
use crate::cluster::ClusterReader;
use crate::crd::ChaosEngineSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckName {
    Target,
    Namespace,
    Experiments,
    ConfigMaps,
    Secrets,
}

impl CheckName {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckName::Target => "target",
            CheckName::Namespace => "namespace",
            CheckName::Experiments => "experiments",
            CheckName::ConfigMaps => "config_maps",
            CheckName::Secrets => "secrets",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct CheckResult {
    pub check: CheckName,
    pub report: ValidationReport,
    pub duration: Duration,
}

pub struct Evaluation {
    pub results: Vec<CheckResult>,
}

impl Evaluation {
    pub fn report(&self) -> ValidationReport {
        let messages: Vec<String> = self
            .results
            .iter()
            .filter(|r| !r.report.allowed)
            .flat_map(|r| r.report.messages.iter().cloned())
            .collect();

        ValidationReport {
            allowed: self.results.iter().all(|r| r.report.allowed),
            messages,
        }
    }
}

pub struct ChaosEngineValidator {
    verify_pod_template_labels: bool,
}

impl ChaosEngineValidator {
    pub fn new(verify_pod_template_labels: bool) -> Self {
        Self {
            verify_pod_template_labels,
        }
    }

    pub async fn validate(
        &self,
        cluster: &dyn ClusterReader,
        spec: &ChaosEngineSpec,
    ) -> Evaluation {
        let app = &spec.appinfo;
        let mut results = Vec::with_capacity(5);

        let start = Instant::now();
        let report = target::resolve_target(
            cluster,
            &app.appkind,
            &app.appns,
            &app.applabel,
            self.verify_pod_template_labels,
        )
        .await;
        if !push(&mut results, CheckName::Target, report, start) {
            return Evaluation { results };
        }

        let start = Instant::now();
        let report = dependencies::check_namespace(cluster, &app.appns).await;
        if !push(&mut results, CheckName::Namespace, report, start) {
            return Evaluation { results };
        }

        let start = Instant::now();
        let report = dependencies::check_experiments(cluster, &spec.experiments, &app.appns).await;
        if !push(&mut results, CheckName::Experiments, report, start) {
            return Evaluation { results };
        }

        let start = Instant::now();
        let failures = dependencies::check_config_maps(cluster, &spec.experiments, &app.appns).await;
        push(
            &mut results,
            CheckName::ConfigMaps,
            ValidationReport::from_failures(failures),
            start,
        );

        let start = Instant::now();
        let failures = dependencies::check_secrets(cluster, &spec.experiments, &app.appns).await;
        push(
            &mut results,
            CheckName::Secrets,
            ValidationReport::from_failures(failures),
            start,
        );

        Evaluation { results }
    }
}

fn push(
    results: &mut Vec<CheckResult>,
    check: CheckName,
    report: ValidationReport,
    start: Instant,
) -> bool {
    let allowed = report.allowed;
    results.push(CheckResult {
        check,
        report,
        duration: start.elapsed(),
    });
    allowed
}
