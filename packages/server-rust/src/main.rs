use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use bob_apiserver::broker::{EntityPublisher, NatsBroker};
use bob_apiserver::config::Cli;
use bob_apiserver::health::{BrokerProbe, HealthAggregator, QueryServiceProbe};
use bob_apiserver::network::{MetricsEndpoint, NetworkModule};
use bob_apiserver::query::QueryForwarder;
use bob_apiserver::service::{build_dispatch_table, Collaborators, Dispatcher};
use bob_apiserver::telemetry;
use bob_apiserver::traits::{BrokerClient, Probe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_format)?;

    if let Err(e) = run(cli).await {
        error!(error = %format!("{e:#}"), "Bob API server failed");
        return Err(e);
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    info!("Starting Bob API server");

    let prometheus = if cli.metrics {
        Some(telemetry::install_metrics()?)
    } else {
        None
    };

    let broker_config = cli.broker();
    let broker = Arc::new(NatsBroker::connect(&broker_config).await?);
    let broker_client: Arc<dyn BrokerClient> = broker.clone();

    let forwarder =
        QueryForwarder::new(&cli.query()).context("failed to build query service client")?;
    let probes: Vec<Arc<dyn Probe>> = vec![
        Arc::new(BrokerProbe::new(Arc::clone(&broker_client))),
        Arc::new(QueryServiceProbe::new(forwarder.clone())),
    ];
    let metrics = prometheus.map(|handle| MetricsEndpoint::new(handle, forwarder.clone()));

    let table = build_dispatch_table(Collaborators {
        publisher: EntityPublisher::new(broker_client, broker_config.subject.as_str())
            .with_publish_timeout(broker_config.publish_timeout),
        forwarder,
        health: HealthAggregator::new(probes, &cli.health()),
        resources: cli.resources(),
    })?;
    let dispatcher = Dispatcher::new(table, &cli.server());

    let mut network = NetworkModule::new(cli.network(), dispatcher, metrics);
    let port = network.start().await?;
    info!(port, query_url = %cli.query_url, subject = %broker_config.subject, "Bob API server ready");

    network.serve(shutdown_signal()).await?;

    broker.flush().await;
    info!("Bob API server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
