//! # Echoes Server
//!
//! Loads configuration, connects storage, keeps the hottest pages warm and
//! shuts down cleanly on Ctrl+C or SIGTERM.

use echoes_config::ConfigLoader;
use echoes_core::telemetry::init_logging;
use echoes_core::EchoesResult;
use echoes_server::startup::{install_metrics_exporter, metrics_listen_addr, print_banner, print_startup_info};
use echoes_server::{AppBuilder, CacheWarmer};
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {}", e);
        eprintln!("echoes-server: {e}");
        std::process::exit(1);
    }
}

async fn run() -> EchoesResult<()> {
    let config_loader = ConfigLoader::from_default_location()?;
    let config = config_loader.get().await;

    init_logging(&config.observability.log_level, config.observability.log_format)?;

    print_banner();
    info!("Starting Echoes Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    print_startup_info(&config);

    if let Some(addr) = metrics_listen_addr(&config)? {
        install_metrics_exporter(addr)?;
    }

    let warm_interval = config.cache.warm_interval();
    let app = AppBuilder::new().with_config(config).build().await?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let warmer = match warm_interval {
        Some(interval) => {
            let warmer = CacheWarmer::for_app(&app);
            Some(tokio::spawn(warmer.run(interval, async move {
                let _ = stop_rx.await;
            })))
        }
        None => {
            info!("Cache warm-up disabled");
            None
        }
    };

    info!("Echoes Server ready");
    shutdown_signal().await;

    let _ = stop_tx.send(());
    if let Some(handle) = warmer {
        if let Err(e) = handle.await {
            error!(error = %e, "Cache warmer terminated abnormally");
        }
    }

    app.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        () = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
