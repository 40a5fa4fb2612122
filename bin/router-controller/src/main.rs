use anyhow::Result;
use clap::Parser;
use kube::{Client, CustomResourceExt};
use router_api::Route;
use router_consul::ConsulClient;
use router_core::{ControllerMetrics, RouteController};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod route_controller;
mod server;
mod verify;

use cli::{Cli, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_crd {
        print!("{}", serde_yaml::to_string(&Route::crd())?);
        return Ok(());
    }

    init_tracing(&cli.log_level, cli.log_format);

    info!("Starting prefix-router controller...");

    let client = Client::try_default().await?;
    let consul = Arc::new(ConsulClient::new(cli.consul_config())?);

    if !cli.skip_verify {
        verify::verify_kubernetes_version(&client).await?;
        verify::verify_crds(&client, cli.namespace.as_deref()).await?;
        verify::verify_consul(&consul).await?;
    }

    let metrics = ControllerMetrics::new()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (controller, adapter) =
        RouteController::new(consul.clone(), cli.controller_config(), metrics.clone());

    let server = tokio::spawn(server::listen_and_serve(
        cli.listen_addr(),
        cli.shutdown_timeout(),
        metrics,
        shutdown_rx.clone(),
    ));
    let routes = tokio::spawn(route_controller::run(
        client,
        cli.namespace.clone(),
        adapter,
        shutdown_rx.clone(),
    ));
    let controller = tokio::spawn(controller.run(shutdown_rx));

    shutdown_signal().await;
    info!("Shutdown signal received, exiting...");
    shutdown_tx.send_replace(true);

    if let Err(e) = controller.await? {
        error!("Route controller error: {}", e);
    }
    routes.await?;
    if let Err(e) = server.await? {
        error!("HTTP server error: {}", e);
    }

    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
