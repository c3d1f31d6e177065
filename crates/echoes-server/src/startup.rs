//! Server startup utilities.

use echoes_config::AppConfig;
use echoes_core::{EchoesError, EchoesResult};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
               __
  ___   _____ / /_   ____   ___   _____
 / _ \ / ___// __ \ / __ \ / _ \ / ___/
/  __// /__ / / / // /_/ //  __/(__  )
\___/ \___//_/ /_/ \____/ \___//____/
    "#);
}

/// Prints where the server is reading from and writing to.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    info!("{}", separator);
    info!("Environment: {}", config.app.environment);
    info!("Redis:       {}", if config.redis.enabled { config.redis.url.as_str() } else { "disabled" });
    info!("Key prefix:  {}", config.cache.key_prefix);
    if config.observability.metrics_addr.is_empty() {
        info!("Metrics:     disabled");
    } else {
        info!("Metrics:     http://{}/metrics", config.observability.metrics_addr);
    }
    info!("{}", separator);
}

/// Parses the scrape address. `None` when the exporter is disabled.
pub fn metrics_listen_addr(config: &AppConfig) -> EchoesResult<Option<SocketAddr>> {
    let addr = config.observability.metrics_addr.trim();
    if addr.is_empty() {
        return Ok(None);
    }
    addr.parse().map(Some).map_err(|e| {
        EchoesError::Configuration(format!("observability.metrics_addr {addr:?} is invalid: {e}"))
    })
}

/// Installs the Prometheus recorder and describes every cache metric.
///
/// Must run inside the Tokio runtime, which serves the scrape endpoint.
pub fn install_metrics_exporter(addr: SocketAddr) -> EchoesResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| EchoesError::Internal(format!("Failed to install metrics exporter: {e}")))?;

    echoes_service::register_metrics();
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}
