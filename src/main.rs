mod checks;
mod cluster;
mod config;
mod crd;
mod engine;
mod handlers;
mod health;
mod metrics;
mod tls;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::routing::get;
use clap::Parser;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as HttpBuilder;
use hyper_util::service::TowerToHyperService;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "chaos-admission",
    about = "Validating admission webhook for ChaosEngine resources"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(
        long,
        default_value = "/etc/chaos-admission/config.yaml",
        env = "CHAOS_ADMISSION_CONFIG"
    )]
    config: String,
}

async fn shutdown_signal(shutdown_tx: watch::Sender<()>) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    error!("failed to install SIGTERM handler: {e}");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("received CTRL+C, starting graceful shutdown"),
            _ = sigterm.recv() => info!("received SIGTERM, starting graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl_c.await {
            error!("failed to listen for ctrl_c: {e}");
            return;
        }
        info!("received CTRL+C, starting graceful shutdown");
    }

    let _ = shutdown_tx.send(());
}

async fn serve_webhook(
    listener: TcpListener,
    tls_acceptor: TlsAcceptor,
    router: Router,
    mut shutdown_rx: watch::Receiver<()>,
) {
    loop {
        let (tcp_stream, remote_addr) = tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("failed to accept TCP connection: {e}");
                        continue;
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                info!("webhook server shutting down");
                break;
            }
        };

        let tls_acceptor = tls_acceptor.clone();
        let router = router.clone();

        tokio::spawn(async move {
            let tls_stream = match tls_acceptor.accept(tcp_stream).await {
                Ok(stream) => stream,
                Err(e) => {
                    error!(%remote_addr, "TLS handshake failed: {e}");
                    return;
                }
            };

            let io = TokioIo::new(tls_stream);
            let service = TowerToHyperService::new(router.into_service());

            if let Err(e) = HttpBuilder::new(hyper_util::rt::TokioExecutor::new())
                .serve_connection(io, service)
                .await
            {
                error!(%remote_addr, "error serving connection: {e}");
            }
        });
    }
}

async fn serve_probes(listener: TcpListener, router: Router, mut shutdown_rx: watch::Receiver<()>) {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            info!("probe server shutting down");
        })
        .await
        .unwrap_or_else(|e| error!("probe server error: {e}"));
}

fn parse_addr(name: &str, value: &str) -> SocketAddr {
    value.parse().unwrap_or_else(|e| {
        eprintln!("Invalid {name} '{value}': {e}");
        std::process::exit(1);
    })
}

#[tokio::main]
async fn main() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("Failed to install default CryptoProvider");
        std::process::exit(1);
    }

    let cli = Cli::parse();

    let config = config::AdmissionConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Failed to load config from {}: {e}", cli.config);
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        listen_addr = %config.listen_addr,
        metrics_addr = %config.metrics_addr,
        namespace = ?config.namespace,
        admission.ignored_namespaces = ?config.admission.ignored_namespaces,
        admission.validate_updates = config.admission.validate_updates,
        admission.verify_pod_template_labels = config.admission.verify_pod_template_labels,
        "chaos-admission starting"
    );

    let tls_acceptor =
        tls::acceptor(&config.tls_cert_path, &config.tls_key_path).unwrap_or_else(|e| {
            eprintln!("Failed to load TLS config: {e}");
            std::process::exit(1);
        });

    let client = kube::Client::try_default().await.unwrap_or_else(|e| {
        eprintln!("Failed to create Kubernetes client: {e}");
        std::process::exit(1);
    });

    let mut registry = Registry::default();
    let admission_metrics = metrics::AdmissionMetrics::new(&mut registry);
    let registry = Arc::new(registry);

    let app_state = Arc::new(handlers::AppState {
        validator: engine::ChaosEngineValidator::new(config.admission.verify_pod_template_labels),
        cluster: Arc::new(cluster::KubeClusterReader::new(client)),
        policy: config.admission.clone(),
        metrics: admission_metrics,
    });
    let webhook_router = handlers::webhook_router(app_state);

    let ready = Arc::new(AtomicBool::new(false));
    let probe_state = Arc::new(health::ProbeState {
        registry,
        ready: ready.clone(),
    });
    let probe_router = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/metrics", get(health::metrics_handler))
        .with_state(probe_state);

    let listen_addr = parse_addr("listen_addr", &config.listen_addr);
    let metrics_addr = parse_addr("metrics_addr", &config.metrics_addr);

    let webhook_listener = TcpListener::bind(listen_addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind HTTPS on {listen_addr}: {e}");
        std::process::exit(1);
    });
    let probe_listener = TcpListener::bind(metrics_addr).await.unwrap_or_else(|e| {
        eprintln!("Failed to bind HTTP on {metrics_addr}: {e}");
        std::process::exit(1);
    });
    info!(%listen_addr, "HTTPS webhook server listening");
    info!(%metrics_addr, "HTTP probe/metrics server listening");
    ready.store(true, Ordering::Relaxed);

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(shutdown_signal(shutdown_tx));

    tokio::join!(
        serve_webhook(webhook_listener, tls_acceptor, webhook_router, shutdown_rx.clone()),
        serve_probes(probe_listener, probe_router, shutdown_rx),
    );

    info!("chaos-admission shut down gracefully");
}
