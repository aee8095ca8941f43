//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay after failed attempt `attempt` (1-based): `base_ms * 2^(attempt-1)`,
/// capped at `max_ms`, plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let capped = base_ms
        .saturating_mul(2u64.saturating_pow(attempt - 1))
        .min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
