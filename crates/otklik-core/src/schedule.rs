//! Delay computation: human-pace inter-response delays with jitter and
//! time-of-day scaling, plus exponential backoff under sustained failure.

use std::time::Duration;

/// Pacing configuration. Immutable per run.
#[derive(Debug, Clone)]
pub struct DelayConfig {
    /// Base delay between two submissions.
    pub base_delay: Duration,

    /// Fixed delay between processed listing pages.
    pub page_delay: Duration,

    /// Uniform jitter applied to the inter-response delay, as a fraction
    /// of the scaled delay (0.2 = ±20%).
    pub jitter_factor: f64,

    /// Hours `[start, end)` of the reduced-pace daytime window.
    pub daytime_hours: (u8, u8),
    pub daytime_multiplier: f64,

    /// Hours of the increased-pace nighttime window. May wrap midnight.
    pub nighttime_hours: (u8, u8),
    pub nighttime_multiplier: f64,
}

impl Default for DelayConfig {
    /// 3s between responses, 5s between pages, ±20% jitter; slightly
    /// faster during working hours, slower at night.
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            page_delay: Duration::from_secs(5),
            jitter_factor: 0.2,
            daytime_hours: (9, 18),
            daytime_multiplier: 0.8,
            nighttime_hours: (23, 6),
            nighttime_multiplier: 1.5,
        }
    }
}

impl DelayConfig {
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Time-of-day multiplier for the given hour (0-23).
    pub fn hour_multiplier(&self, hour: u8) -> f64 {
        if hour_in_window(hour, self.daytime_hours) {
            self.daytime_multiplier
        } else if hour_in_window(hour, self.nighttime_hours) {
            self.nighttime_multiplier
        } else {
            1.0
        }
    }

    /// Delay before the next submission at the given hour, jittered.
    pub fn inter_response_delay(&self, hour: u8) -> Duration {
        let scaled = self.base_delay.mul_f64(self.hour_multiplier(hour));
        apply_jitter(scaled, self.jitter_factor)
    }
}

/// Retry and backoff configuration. Immutable per run.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first failed one.
    pub max_retries: u32,

    /// Fixed delay between retry attempts for the same vacancy.
    pub retry_delay: Duration,

    /// Base of the exponential backoff under consecutive failures.
    pub base_backoff: Duration,

    /// Ceiling for the exponential backoff. The source behaviour was
    /// uncapped; that is treated here as a latent bug.
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Backoff delay after `consecutive_failures` failed submissions:
    /// `2^(n-1) × base_backoff`, saturating at `max_backoff`. Zero failures
    /// means no backoff.
    pub fn backoff_delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exp = consecutive_failures - 1;
        let factor = 1u64.checked_shl(exp).unwrap_or(u64::MAX);
        let delay = self
            .base_backoff
            .checked_mul(factor.min(u32::MAX as u64) as u32)
            .unwrap_or(Duration::MAX);
        delay.min(self.max_backoff)
    }
}

/// Effective delay before the next submission: the jittered inter-response
/// delay, raised to the backoff floor whenever failures are accumulating.
pub fn next_submission_delay(
    delays: &DelayConfig,
    retry: &RetryConfig,
    hour: u8,
    consecutive_failures: u32,
) -> Duration {
    let base = delays.inter_response_delay(hour);
    if consecutive_failures > 0 {
        base.max(retry.backoff_delay(consecutive_failures))
    } else {
        base
    }
}

fn hour_in_window(hour: u8, (start, end): (u8, u8)) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        // Window wraps midnight, e.g. 23..6.
        hour >= start || hour < end
    }
}

/// Uniform jitter in `[d·(1-f), d·(1+f))`.
fn apply_jitter(d: Duration, factor: f64) -> Duration {
    if factor <= 0.0 || d.is_zero() {
        return d;
    }
    let span_ms = (d.as_millis() as f64 * factor * 2.0) as u64;
    if span_ms == 0 {
        return d;
    }
    let low = d.mul_f64(1.0 - factor);
    low + Duration::from_millis(rand_ms(span_ms))
}

// Deterministic jitter based on std — avoids pulling in the `rand` crate.
// xorshift64 seeded from the high-resolution clock; fine for pacing,
// not crypto.
fn rand_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_failure() {
        let retry = RetryConfig {
            base_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(3600),
            ..Default::default()
        };
        assert_eq!(retry.backoff_delay(0), Duration::ZERO);
        assert_eq!(retry.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(retry.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(retry.backoff_delay(3), Duration::from_millis(4000));
        assert_eq!(retry.backoff_delay(4), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_is_capped() {
        let retry = RetryConfig {
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
            ..Default::default()
        };
        assert_eq!(retry.backoff_delay(20), Duration::from_secs(300));
        // Shift overflow territory must still saturate at the cap.
        assert_eq!(retry.backoff_delay(200), Duration::from_secs(300));
    }

    #[test]
    fn hour_multiplier_windows() {
        let delays = DelayConfig::default();
        assert_eq!(delays.hour_multiplier(10), 0.8);
        assert_eq!(delays.hour_multiplier(20), 1.0);
        assert_eq!(delays.hour_multiplier(23), 1.5);
        assert_eq!(delays.hour_multiplier(2), 1.5);
        assert_eq!(delays.hour_multiplier(6), 1.0);
    }

    #[test]
    fn jitter_is_bounded() {
        let delays = DelayConfig::default()
            .with_base_delay(Duration::from_millis(1000))
            .with_jitter_factor(0.2);
        for _ in 0..100 {
            let d = delays.inter_response_delay(20);
            assert!(d >= Duration::from_millis(800), "too short: {d:?}");
            assert!(d < Duration::from_millis(1200), "too long: {d:?}");
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let delays = DelayConfig::default()
            .with_base_delay(Duration::from_millis(1000))
            .with_jitter_factor(0.0);
        assert_eq!(delays.inter_response_delay(20), Duration::from_millis(1000));
    }

    #[test]
    fn backoff_floor_applies_only_under_failure() {
        let delays = DelayConfig::default()
            .with_base_delay(Duration::from_millis(100))
            .with_jitter_factor(0.0);
        let retry = RetryConfig {
            base_backoff: Duration::from_secs(10),
            ..Default::default()
        };

        let healthy = next_submission_delay(&delays, &retry, 20, 0);
        assert_eq!(healthy, Duration::from_millis(100));

        let failing = next_submission_delay(&delays, &retry, 20, 2);
        assert_eq!(failing, Duration::from_secs(20));
    }
}
