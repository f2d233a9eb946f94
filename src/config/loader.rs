//! Configuration Loader
//!
//! Environment-aware configuration loading. Sources are layered, later ones winning:
//!
//! 1. `{config_dir}/base.yaml`
//! 2. `{config_dir}/{environment}.yaml`
//! 3. Environment variables prefixed with `C2T`, nested keys separated by `__`
//!    (`C2T_BATCH__SIZE=500` sets `batch.size`)
//!
//! Both files are optional; anything left unset falls back to [`ExtractionConfig::default`].

use super::error::{ConfigResult, ConfigurationError};
use super::ExtractionConfig;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const BASE_CONFIG_FILE: &str = "base.yaml";
const ENV_PREFIX: &str = "C2T";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_SEPARATOR: &str = "__";
const LIST_SEPARATOR: &str = ",";
const LIST_PARSE_KEYS: &[&str] = &["levels"];
const KNOWN_ENVIRONMENTS: &[&str] = &["development", "test", "production"];

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: ExtractionConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment.
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        if !KNOWN_ENVIRONMENTS.contains(&environment) {
            return Err(ConfigurationError::environment_config_error(
                environment,
                format!("expected one of {KNOWN_ENVIRONMENTS:?}"),
            ));
        }

        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            "Loading configuration for environment '{}' from directory: {}",
            environment,
            config_directory.display()
        );

        let config = Self::load_layered(&config_directory, environment)?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        info!(
            environment = environment,
            database_host = %config.database.host,
            pool_size = config.database.max_connections,
            batch_size = config.batch.size,
            workers = config.batch.workers,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Configuration as JSON with credentials masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    /// Detect current environment: C2T_ENV || APP_ENVIRONMENT || 'development'
    pub fn detect_environment() -> String {
        env::var("C2T_ENV")
            .or_else(|_| env::var("APP_ENVIRONMENT"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn load_layered(config_directory: &Path, environment: &str) -> ConfigResult<ExtractionConfig> {
        let mut environment_source = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_PREFIX_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .list_separator(LIST_SEPARATOR);

        for key in LIST_PARSE_KEYS {
            environment_source = environment_source.with_list_parse_key(key);
        }

        let settings = config::Config::builder()
            .add_source(
                config::File::from(config_directory.join(BASE_CONFIG_FILE)).required(false),
            )
            .add_source(
                config::File::from(config_directory.join(format!("{environment}.yaml")))
                    .required(false),
            )
            .add_source(environment_source)
            .build()
            .map_err(|e| ConfigurationError::load_error(config_directory, e))?;

        settings
            .try_deserialize::<ExtractionConfig>()
            .map_err(|e| ConfigurationError::load_error(config_directory, e))
    }

    /// Mask credentials so configuration can be logged safely
    fn sanitize_config_for_logging(config: &ExtractionConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);
        let sensitive_patterns = ["password", "secret", "url", "token"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive {
                        match val {
                            serde_json::Value::Null => {}
                            serde_json::Value::String(s) if s.is_empty() => {
                                *val = serde_json::Value::String("[EMPTY]".to_string());
                            }
                            _ => {
                                *val = serde_json::Value::String("[MASKED]".to_string());
                            }
                        }
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(arr) => {
                for item in arr.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}
