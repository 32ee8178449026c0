//! Capped multiplicative backoff for status polling.

use std::time::Duration;

use crate::config::PollingConfig;

/// Next interval: `min(max_ms, floor(current_ms * factor))`.
pub fn next_interval(current_ms: u64, factor: f64, max_ms: u64) -> u64 {
    let scaled = (current_ms as f64 * factor).floor();
    if scaled >= max_ms as f64 {
        max_ms
    } else {
        scaled as u64
    }
}

/// Interval schedule for one polling run.
///
/// Iterating yields the current interval and then advances it, so the
/// defaults produce 2000, 3000, 4500, 5000, 5000, ...
#[derive(Debug, Clone)]
pub struct Backoff {
    current_ms: u64,
    max_ms: u64,
    factor: f64,
    attempt_cap_ms: u64,
    attempt_slack_ms: u64,
}

impl Backoff {
    pub fn new(config: &PollingConfig) -> Self {
        Self {
            current_ms: config.interval_ms,
            max_ms: config.max_interval_ms,
            factor: config.backoff_factor,
            attempt_cap_ms: config.attempt_timeout_cap_ms,
            attempt_slack_ms: config.attempt_timeout_slack_ms,
        }
    }

    /// The delay to sleep after the current attempt.
    pub fn current(&self) -> Duration {
        Duration::from_millis(self.current_ms)
    }

    /// Timeout for a single status request: `min(cap, current + slack)`.
    pub fn attempt_timeout(&self) -> Duration {
        let ms = self
            .current_ms
            .saturating_add(self.attempt_slack_ms)
            .min(self.attempt_cap_ms);
        Duration::from_millis(ms)
    }

    pub fn advance(&mut self) {
        self.current_ms = next_interval(self.current_ms, self.factor, self.max_ms);
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.current();
        self.advance();
        Some(current)
    }
}
