//! Backoff between same-backend retries.

use rand::Rng;
use std::time::Duration;

/// Delay before retry number `retry` (1-based) against the same backend.
///
/// Grows exponentially from `base_ms`, capped at `max_ms`, plus up to 10%
/// jitter. With `base_ms == max_ms` the delay is fixed.
pub fn calculate_backoff(retry: u32, base_ms: u64, max_ms: u64) -> Duration {
    if retry == 0 || base_ms == 0 {
        return Duration::ZERO;
    }

    let factor = 2u64.saturating_pow(retry - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms.max(base_ms));

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
