//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::chain::NetworkProfile;
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `network.profile`.
pub const PROFILE_ENV_VAR: &str = "CHAIN_CONNECT_PROFILE";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Apply `CHAIN_CONNECT_PROFILE` when set. An unparseable value is logged and ignored.
pub fn apply_env_overrides(config: &mut AppConfig) {
    let Ok(raw) = std::env::var(PROFILE_ENV_VAR) else {
        return;
    };
    match raw.parse::<NetworkProfile>() {
        Ok(profile) => {
            tracing::info!(profile = profile.as_str(), "Network profile overridden from environment");
            config.network.profile = profile;
        }
        Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring {}", PROFILE_ENV_VAR),
    }
}
