//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files; every
//! section has defaults so a minimal (even empty) file is valid.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use crate::chain::{ChainFamily, NetworkConfig, NetworkProfile};
use crate::connection::ConnectionSettings;
use crate::registry::ChainSelection;
use crate::resilience::RetryPolicy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Network profile, enabled families and per-family overrides.
    pub network: NetworkSection,

    /// Wallet connect timeouts and readiness polling.
    pub connection: ConnectionConfig,

    /// Read-path RPC client settings.
    pub rpc: RpcConfig,

    /// Saved-session persistence.
    pub session: SessionConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Which chains to connect to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct NetworkSection {
    pub profile: NetworkProfile,

    pub families: BTreeSet<ChainFamily>,

    /// When set, only these connector ids are offered.
    pub connector_allow_list: Option<BTreeSet<String>>,

    /// Field-level replacements of the profile presets.
    pub overrides: BTreeMap<ChainFamily, NetworkOverride>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            profile: NetworkProfile::default(),
            families: ChainFamily::ALL.into_iter().collect(),
            connector_allow_list: None,
            overrides: BTreeMap::new(),
        }
    }
}

impl NetworkSection {
    /// Preset for `family` with any override applied.
    pub fn resolve(&self, family: ChainFamily) -> NetworkConfig {
        let mut config = self.profile.preset(family);
        if let Some(o) = self.overrides.get(&family) {
            if let Some(network) = &o.network {
                config.network = network.as_str().into();
            }
            if let Some(coin_symbol) = &o.coin_symbol {
                config.coin_symbol = coin_symbol.clone();
            }
            if let Some(rpc_url) = &o.rpc_url {
                config.rpc_url = rpc_url.clone();
            }
            if let Some(api_url) = &o.api_url {
                config.api_url = Some(api_url.clone());
            }
            if let Some(numeric_id) = o.numeric_id {
                config.numeric_id = numeric_id;
            }
        }
        config
    }

    /// Builder input for every enabled family.
    pub fn selection(&self) -> ChainSelection {
        ChainSelection {
            families: self.families.clone(),
            network_configs: self.families.iter().map(|f| (*f, self.resolve(*f))).collect(),
            connector_allow_list: self.connector_allow_list.clone(),
        }
    }
}

/// Optional replacement for individual preset fields.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkOverride {
    pub network: Option<String>,
    pub coin_symbol: Option<String>,
    pub rpc_url: Option<String>,
    pub api_url: Option<String>,
    pub numeric_id: Option<u64>,
}

/// Wallet connection settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Upper bound on a single connector factory call.
    pub connect_timeout_secs: u64,

    /// Delay before reconnecting after the document becomes visible.
    pub reconnect_delay_ms: u64,

    /// Shared-config readiness poll interval.
    pub readiness_interval_ms: u64,

    /// Shared-config readiness poll attempts.
    pub readiness_max_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 60,
            reconnect_delay_ms: 1000,
            readiness_interval_ms: 100,
            readiness_max_attempts: 10,
        }
    }
}

impl ConnectionConfig {
    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            readiness: RetryPolicy::fixed(
                Duration::from_millis(self.readiness_interval_ms),
                self.readiness_max_attempts,
            ),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// Read-path RPC settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RpcConfig {
    /// Build the Cosmos RPC manager at startup.
    pub enabled: bool,

    pub connect_timeout_secs: u64,

    /// Per-request timeout; sized for artifact-class requests.
    pub request_timeout_secs: u64,

    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_timeout_secs: 30,
            request_timeout_secs: 120,
            retry_max_attempts: 3,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 2000,
        }
    }
}

impl RpcConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.retry_base_delay_ms, self.retry_max_delay_ms, self.retry_max_attempts)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// JSON file for saved sessions; in-memory only when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.network.families.len(), 3);
        assert_eq!(config.connection.settings(), ConnectionSettings::default());
        assert_eq!(config.rpc.request_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_overrides_replace_fields() {
        let config: AppConfig = toml::from_str(
            r#"
            [network]
            profile = "devnet"
            families = ["cosmos", "evm"]

            [network.overrides.evm]
            rpc_url = "http://anvil:8545"
            "#,
        )
        .unwrap();

        let evm = config.network.resolve(ChainFamily::Evm);
        assert_eq!(evm.rpc_url, "http://anvil:8545");
        assert_eq!(evm.numeric_id, 31_337);

        let selection = config.network.selection();
        assert_eq!(selection.network_configs.len(), 2);
        assert!(!selection.network_configs.contains_key(&ChainFamily::Utxo));
    }

    #[test]
    fn test_log_format_parsing() {
        let config: AppConfig = toml::from_str("[observability]\nlog_format = \"json\"").unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }
}
