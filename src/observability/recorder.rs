//! Error reporting seam.

use crate::connection::types::ErrorDescriptor;
use crate::observability::metrics;

/// Narrow sink for captured failures.
///
/// `scope` names the reporting component (a family label or `"rpc"`).
pub trait ErrorRecorder: Send + Sync {
    fn record(&self, scope: &str, error: &ErrorDescriptor);
}

/// Default recorder: a structured log line plus an error counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl ErrorRecorder for TracingRecorder {
    fn record(&self, scope: &str, error: &ErrorDescriptor) {
        tracing::error!(
            scope,
            class = error.class.as_str(),
            retryable = error.retryable,
            message = %error.message,
            "Recorded error"
        );
        metrics::record_error(scope, error.class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::types::ErrorClass;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collecting(Mutex<Vec<(String, ErrorClass)>>);

    impl ErrorRecorder for Collecting {
        fn record(&self, scope: &str, error: &ErrorDescriptor) {
            self.0.lock().unwrap().push((scope.to_string(), error.class));
        }
    }

    #[test]
    fn test_recorder_is_object_safe() {
        let recorder: Box<dyn ErrorRecorder> = Box::new(Collecting::default());
        recorder.record("evm", &ErrorDescriptor::new(ErrorClass::Timeout, "slow"));

        TracingRecorder.record("cosmos", &ErrorDescriptor::new(ErrorClass::RpcUnavailable, "down"));
    }
}
