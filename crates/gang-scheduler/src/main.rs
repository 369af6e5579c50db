mod config;
mod driver;
mod k8s;
mod logging;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::config::Cli;
use crate::driver::Driver;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_global_hooks();

    let cli = Cli::parse();
    logging::init();

    tracing::info!(
        scheduler_name = %cli.scheduler_name,
        namespace = cli.namespace.as_deref().unwrap_or("<all>"),
        tick_period_secs = cli.tick_period_secs,
        "Starting gang scheduler"
    );

    let client = k8s::init_kube_client(cli.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize Kubernetes client: {:?}", e))?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        signal_token.cancel();
    });

    Driver::new(client, &cli)
        .run(token)
        .await
        .map_err(|e| anyhow::anyhow!("Scheduler terminated: {:?}", e))?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::signal;
        use tokio::signal::unix::SignalKind;

        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                return;
            }
        };
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to install SIGINT handler: {e}");
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            return;
        }
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    }
}
