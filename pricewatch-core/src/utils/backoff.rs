use std::time::Duration;

/// Exponent cap so the shift below can never overflow.
const MAX_EXPONENT: u32 = 16;

/// Delay before the next attempt after `failures` consecutive failures.
///
/// Exponential: `base * 2^failures`, never more than `max`.
pub fn backoff_delay(base: Duration, max: Duration, failures: u32) -> Duration {
    let factor = 1u32 << failures.min(MAX_EXPONENT);
    base.saturating_mul(factor).min(max)
}
