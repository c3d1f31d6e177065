//! Configuration loader with layered sources.

use crate::AppConfig;
use config::{Config, ConfigError, Environment, File};
use echoes_core::EchoesError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `ECHOES__` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, EchoesError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, EchoesError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), EchoesError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    fn load_config(config_dir: &str) -> Result<AppConfig, EchoesError> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var("ECHOES_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment.as_str(), "local"] {
            let path = format!("{config_dir}/{name}.toml");
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ECHOES")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_echoes_error)?;
        let app_config: AppConfig = config.try_deserialize().map_err(config_error_to_echoes_error)?;

        validate_config(&app_config)?;

        Ok(app_config)
    }
}

/// Validates the configuration.
///
/// Rejects settings the cache cannot work with and warns about settings that
/// work but defeat the versioning scheme.
pub fn validate_config(config: &AppConfig) -> Result<(), EchoesError> {
    if config.database.url.is_empty() {
        return Err(EchoesError::Configuration("Database URL is required".to_string()));
    }

    let cache = &config.cache;
    let ttls = [
        ("version_ttl_secs", cache.version_ttl_secs),
        ("page_ttl_secs", cache.page_ttl_secs),
        ("post_ttl_secs", cache.post_ttl_secs),
        ("comment_ttl_secs", cache.comment_ttl_secs),
        ("link_ttl_secs", cache.link_ttl_secs),
        ("announce_ttl_secs", cache.announce_ttl_secs),
    ];
    if let Some((name, _)) = ttls.iter().find(|(_, secs)| *secs == 0) {
        return Err(EchoesError::Configuration(format!("cache.{name} must be positive")));
    }

    if cache.max_background_tasks == 0 {
        return Err(EchoesError::Configuration(
            "cache.max_background_tasks must be positive".to_string(),
        ));
    }

    if cache.key_prefix.is_empty() {
        return Err(EchoesError::Configuration("cache.key_prefix is required".to_string()));
    }

    if cache.page_ttl_secs <= cache.version_ttl_secs {
        warn!(
            page_ttl_secs = cache.page_ttl_secs,
            version_ttl_secs = cache.version_ttl_secs,
            "Page TTL does not exceed version TTL; pages will expire before their version rolls over"
        );
    }

    Ok(())
}

fn config_error_to_echoes_error(err: ConfigError) -> EchoesError {
    EchoesError::Configuration(err.to_string())
}
