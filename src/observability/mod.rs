//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! ConnectionManager / RpcConnectionManager transitions:
//!     → tracing events (family, connector, generation, status fields)
//!     → metrics.rs (counters, gauges)
//!     → recorder.rs ErrorRecorder (every captured failure)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
pub mod recorder;

pub use recorder::{ErrorRecorder, TracingRecorder};
