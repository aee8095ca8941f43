//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.network.families.is_empty() {
        errors.push(ValidationError::new("network.families", "at least one family must be enabled"));
    }
    for family in &config.network.families {
        let resolved = config.network.resolve(*family);
        if let Err(e) = url::Url::parse(&resolved.rpc_url) {
            errors.push(ValidationError::new(
                format!("network.overrides.{family}.rpc_url"),
                format!("invalid URL '{}': {e}", resolved.rpc_url),
            ));
        }
        if let Some(api_url) = &resolved.api_url {
            if let Err(e) = url::Url::parse(api_url) {
                errors.push(ValidationError::new(
                    format!("network.overrides.{family}.api_url"),
                    format!("invalid URL '{api_url}': {e}"),
                ));
            }
        }
    }
    if config.network.connector_allow_list.as_ref().is_some_and(|l| l.is_empty()) {
        errors.push(ValidationError::new(
            "network.connector_allow_list",
            "empty allow list would disable every connector; omit it instead",
        ));
    }

    let c = &config.connection;
    if c.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("connection.connect_timeout_secs", "must be greater than 0"));
    }
    if c.readiness_max_attempts == 0 {
        errors.push(ValidationError::new("connection.readiness_max_attempts", "must be greater than 0"));
    }

    let r = &config.rpc;
    if r.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.connect_timeout_secs", "must be greater than 0"));
    }
    if r.request_timeout_secs == 0 {
        errors.push(ValidationError::new("rpc.request_timeout_secs", "must be greater than 0"));
    }
    if r.retry_max_attempts == 0 {
        errors.push(ValidationError::new("rpc.retry_max_attempts", "must be greater than 0"));
    }
    if r.retry_base_delay_ms > r.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "rpc.retry_base_delay_ms",
            "must not exceed rpc.retry_max_delay_ms",
        ));
    }

    let o = &config.observability;
    if o.metrics_enabled && o.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", o.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
