use crate::cluster::{ClusterError, ClusterReader};
use crate::crd::ExperimentList;

use super::ValidationReport;

pub async fn check_namespace(cluster: &dyn ClusterReader, name: &str) -> ValidationReport {
    match cluster.get_namespace(name).await {
        Ok(Some(_)) => ValidationReport::pass(),
        Ok(None) => ValidationReport::fail(format!(
            "unable to find namespace {name} specified in ChaosEngine"
        )),
        Err(e) => ValidationReport::fail(format!(
            "unable to get namespace {name} specified in ChaosEngine, please check the following error: {e}"
        )),
    }
}

pub async fn check_experiment(
    cluster: &dyn ClusterReader,
    name: &str,
    namespace: &str,
) -> Result<(), String> {
    match cluster.get_chaos_experiment(namespace, name).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(format!(
            "unable to find ChaosExperiment {name} in namespace {namespace}"
        )),
        Err(e) => Err(format!(
            "unable to get ChaosExperiment {name} in namespace {namespace}, please check the following error: {e}"
        )),
    }
}

pub async fn check_experiments(
    cluster: &dyn ClusterReader,
    experiments: &[ExperimentList],
    namespace: &str,
) -> ValidationReport {
    for experiment in experiments {
        if let Err(message) = check_experiment(cluster, &experiment.name, namespace).await {
            return ValidationReport::fail(message);
        }
    }
    ValidationReport::pass()
}

pub async fn check_config_maps(
    cluster: &dyn ClusterReader,
    experiments: &[ExperimentList],
    namespace: &str,
) -> Vec<String> {
    let mut failures = Vec::new();
    for experiment in experiments {
        for config_map in &experiment.spec.components.config_maps {
            let lookup = cluster.get_config_map(namespace, &config_map.name).await;
            if let Some(line) =
                missing_dependency("ConfigMap", &config_map.name, &experiment.name, lookup)
            {
                failures.push(line);
            }
        }
    }
    failures
}

pub async fn check_secrets(
    cluster: &dyn ClusterReader,
    experiments: &[ExperimentList],
    namespace: &str,
) -> Vec<String> {
    let mut failures = Vec::new();
    for experiment in experiments {
        for secret in &experiment.spec.components.secrets {
            let lookup = cluster.get_secret(namespace, &secret.name).await;
            if let Some(line) = missing_dependency("Secret", &secret.name, &experiment.name, lookup)
            {
                failures.push(line);
            }
        }
    }
    failures
}

fn missing_dependency<T>(
    kind: &str,
    name: &str,
    experiment: &str,
    lookup: Result<Option<T>, ClusterError>,
) -> Option<String> {
    match lookup {
        Ok(Some(_)) => None,
        Ok(None) => Some(format!(
            "Unable to find {kind} {name} needed for ChaosExperiment {experiment}"
        )),
        Err(e) => Some(format!(
            "Unable to find {kind} {name} needed for ChaosExperiment {experiment}, please check the following error: {e}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fake::FakeCluster;
    use crate::crd::{ExperimentAttributes, ExperimentComponents, NamedRef};

    const NS: &str = "test-ns";

    fn refs(names: &[&str]) -> Vec<NamedRef> {
        names
            .iter()
            .map(|n| NamedRef {
                name: n.to_string(),
            })
            .collect()
    }

    fn experiment(name: &str, config_maps: &[&str], secrets: &[&str]) -> ExperimentList {
        ExperimentList {
            name: name.to_string(),
            spec: ExperimentAttributes {
                components: ExperimentComponents {
                    config_maps: refs(config_maps),
                    secrets: refs(secrets),
                },
            },
        }
    }

    #[tokio::test]
    async fn config_maps_fail_when_none_exist() {
        let cluster = FakeCluster::new();
        let experiments = vec![experiment("experiment1", &["configmap-1", "configmap-2"], &[])];

        let failures = check_config_maps(&cluster, &experiments, NS).await;
        assert_eq!(
            failures,
            vec![
                "Unable to find ConfigMap configmap-1 needed for ChaosExperiment experiment1",
                "Unable to find ConfigMap configmap-2 needed for ChaosExperiment experiment1",
            ]
        );
    }

    #[tokio::test]
    async fn config_maps_report_only_the_missing_ones() {
        let cluster = FakeCluster::new().with_config_map(NS, "configmap-1");
        let experiments = vec![
            experiment("experiment1", &["configmap-1"], &[]),
            experiment("experiment2", &["configmap-2"], &[]),
        ];

        let failures = check_config_maps(&cluster, &experiments, NS).await;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("configmap-2"));
        assert!(failures[0].contains("experiment2"));
    }

    #[tokio::test]
    async fn config_maps_pass_when_required_set_is_a_subset() {
        let cluster = FakeCluster::new()
            .with_config_map(NS, "configmap-1")
            .with_config_map(NS, "configmap-2")
            .with_config_map(NS, "configmap-3");
        let experiments = vec![
            experiment("experiment1", &["configmap-1", "configmap-2"], &[]),
            experiment("experiment2", &["configmap-3"], &[]),
        ];

        assert!(check_config_maps(&cluster, &experiments, NS).await.is_empty());
    }

    #[tokio::test]
    async fn config_maps_in_other_namespaces_do_not_count() {
        let cluster = FakeCluster::new().with_config_map("elsewhere", "configmap-1");
        let experiments = vec![experiment("experiment1", &["configmap-1"], &[])];

        assert_eq!(check_config_maps(&cluster, &experiments, NS).await.len(), 1);
    }

    #[tokio::test]
    async fn secrets_accumulate_every_failure() {
        let cluster = FakeCluster::new().with_secret(NS, "secret-2");
        let experiments = vec![
            experiment("experiment1", &[], &["secret-1", "secret-2"]),
            experiment("experiment2", &[], &["secret-3"]),
        ];

        let failures = check_secrets(&cluster, &experiments, NS).await;
        assert_eq!(
            failures,
            vec![
                "Unable to find Secret secret-1 needed for ChaosExperiment experiment1",
                "Unable to find Secret secret-3 needed for ChaosExperiment experiment2",
            ]
        );
    }

    #[tokio::test]
    async fn lookup_errors_keep_the_underlying_text() {
        let cluster = FakeCluster::new().forbid("secrets");
        let experiments = vec![experiment("experiment1", &[], &["secret-1"])];

        let failures = check_secrets(&cluster, &experiments, NS).await;
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("please check the following error: forbidden to get secrets"));
    }

    #[tokio::test]
    async fn experiments_fail_when_none_are_installed() {
        let cluster = FakeCluster::new();
        let experiments = vec![experiment("experiment1", &[], &[])];

        let report = check_experiments(&cluster, &experiments, NS).await;
        assert!(!report.allowed);
        assert_eq!(
            report.message(),
            "unable to find ChaosExperiment experiment1 in namespace test-ns"
        );
    }

    #[tokio::test]
    async fn nameless_experiment_is_not_installed() {
        let cluster = FakeCluster::new().with_experiment(NS, "experiment1");
        let experiments = vec![experiment("experiment1", &[], &[]), ExperimentList::default()];

        let report = check_experiments(&cluster, &experiments, NS).await;
        assert!(!report.allowed);
        assert_eq!(
            report.message(),
            "unable to find ChaosExperiment  in namespace test-ns"
        );
    }

    #[tokio::test]
    async fn experiments_report_the_first_missing_one() {
        let cluster = FakeCluster::new().with_experiment(NS, "experiment1");
        let experiments = vec![
            experiment("experiment1", &[], &[]),
            experiment("experiment2", &[], &[]),
            experiment("experiment3", &[], &[]),
        ];

        let report = check_experiments(&cluster, &experiments, NS).await;
        assert!(!report.allowed);
        assert_eq!(report.messages.len(), 1);
        assert!(report.message().contains("experiment2"));
    }

    #[tokio::test]
    async fn experiments_pass_when_all_are_installed() {
        let cluster = FakeCluster::new()
            .with_experiment(NS, "experiment1")
            .with_experiment(NS, "experiment2");
        let experiments = vec![
            experiment("experiment1", &[], &[]),
            experiment("experiment2", &[], &[]),
        ];

        assert!(check_experiments(&cluster, &experiments, NS).await.allowed);
    }

    #[tokio::test]
    async fn namespace_must_exist() {
        let cluster = FakeCluster::new().with_namespace(NS);

        assert!(check_namespace(&cluster, NS).await.allowed);

        let report = check_namespace(&cluster, "missing").await;
        assert!(!report.allowed);
        assert!(report.message().contains("unable to find namespace missing"));
    }

    #[tokio::test]
    async fn namespace_lookup_error_denies() {
        let cluster = FakeCluster::new().with_namespace(NS).forbid("namespaces");

        let report = check_namespace(&cluster, NS).await;
        assert!(!report.allowed);
        assert!(report.message().contains("forbidden to get namespaces"));
    }
}
