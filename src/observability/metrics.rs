//! Metrics collection and exposition.
//!
//! # Metrics
//! - `chain_connect_attempts_total` (counter): factory invocations by family, connector
//! - `chain_connect_errors_total` (counter): recorded failures by scope, class
//! - `chain_connect_status` (gauge): 0=disconnected, 1=connecting, 2=connected, 3=error
//! - `chain_rpc_status` (gauge): 0=idle, 1=connecting, 2=ready, 3=error
//!
//! Updates are no-ops until a recorder is installed.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::chain::ChainFamily;
use crate::connection::types::{ConnectionStatus, ErrorClass};
use crate::rpc::types::RpcStatus;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connect_attempt(family: ChainFamily, connector_id: &str) {
    ::metrics::counter!(
        "chain_connect_attempts_total",
        "family" => family.as_str(),
        "connector" => connector_id.to_string()
    )
    .increment(1);
}

pub fn record_connection_status(family: ChainFamily, status: ConnectionStatus) {
    let value = match status {
        ConnectionStatus::Disconnected => 0.0,
        ConnectionStatus::Connecting => 1.0,
        ConnectionStatus::Connected => 2.0,
        ConnectionStatus::Error => 3.0,
    };
    ::metrics::gauge!("chain_connect_status", "family" => family.as_str()).set(value);
}

pub fn record_error(scope: &str, class: ErrorClass) {
    ::metrics::counter!(
        "chain_connect_errors_total",
        "scope" => scope.to_string(),
        "class" => class.as_str()
    )
    .increment(1);
}

pub fn record_rpc_status(family: ChainFamily, status: RpcStatus) {
    let value = match status {
        RpcStatus::Idle => 0.0,
        RpcStatus::Connecting => 1.0,
        RpcStatus::Ready => 2.0,
        RpcStatus::Error => 3.0,
    };
    ::metrics::gauge!("chain_rpc_status", "family" => family.as_str()).set(value);
}
