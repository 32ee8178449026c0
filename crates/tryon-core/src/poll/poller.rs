//! Budgeted status polling.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::PollingConfig;
use crate::provider::{GenerationProvider, StatusResponse};

use super::backoff::Backoff;

/// How a single status request went.
#[derive(Debug)]
enum Attempt {
    /// A recognized status that ends polling
    Terminal(StatusResponse),
    /// A recognized in-progress status
    Pending(StatusResponse),
    /// Transport, HTTP, parse, or contract failure
    Failed(String),
}

/// What the poller knows between attempts.
///
/// A failed attempt never overwrites the last good response.
#[derive(Debug, Default)]
struct PollState {
    last: Option<StatusResponse>,
    last_error: Option<String>,
    attempts: u32,
}

impl PollState {
    /// Fold one attempt in; returns the response when polling should stop.
    fn record(&mut self, attempt: Attempt) -> Option<StatusResponse> {
        self.attempts += 1;
        match attempt {
            Attempt::Terminal(response) => Some(response),
            Attempt::Pending(response) => {
                self.last = Some(response);
                None
            }
            Attempt::Failed(reason) => {
                self.last_error = Some(reason);
                None
            }
        }
    }
}

/// Result of one polling run.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    /// Terminal response, the last in-progress response, or a synthetic timeout
    pub response: StatusResponse,
    /// Status requests issued
    pub attempts: u32,
    /// The budget ran out before a terminal status
    pub budget_exhausted: bool,
    /// Most recent failed-attempt reason, if any
    pub last_error: Option<String>,
}

/// Polls a status URL until a terminal status or the budget runs out.
pub struct StatusPoller {
    provider: Arc<dyn GenerationProvider>,
    config: PollingConfig,
}

impl StatusPoller {
    pub fn new(provider: Arc<dyn GenerationProvider>, config: PollingConfig) -> Self {
        Self { provider, config }
    }

    /// Default budget from the config.
    pub fn default_budget(&self) -> Duration {
        Duration::from_millis(self.config.timeout_ms)
    }

    pub async fn poll(&self, status_url: &str, budget: Duration) -> PollOutcome {
        let start = Instant::now();
        let mut backoff = Backoff::new(&self.config);
        let mut state = PollState::default();

        while start.elapsed() < budget {
            let attempt = self.attempt(status_url, backoff.attempt_timeout()).await;
            if let Some(response) = state.record(attempt) {
                tracing::debug!(
                    "Status {} after {} attempts ({:?})",
                    response.status,
                    state.attempts,
                    start.elapsed()
                );
                return PollOutcome {
                    response,
                    attempts: state.attempts,
                    budget_exhausted: false,
                    last_error: state.last_error,
                };
            }

            tokio::time::sleep(backoff.current()).await;
            backoff.advance();
        }

        tracing::warn!(
            "Polling budget of {:?} exhausted after {} attempts",
            budget,
            state.attempts
        );
        PollOutcome {
            response: state.last.unwrap_or_else(StatusResponse::synthetic_timeout),
            attempts: state.attempts,
            budget_exhausted: true,
            last_error: state.last_error,
        }
    }

    async fn attempt(&self, status_url: &str, attempt_timeout: Duration) -> Attempt {
        let fetched = tokio::time::timeout(
            attempt_timeout,
            self.provider.fetch_status(status_url, attempt_timeout),
        )
        .await;

        match fetched {
            Ok(Ok(response)) if response.status.is_terminal() => Attempt::Terminal(response),
            Ok(Ok(response)) if response.status.is_in_progress() => Attempt::Pending(response),
            Ok(Ok(response)) => Attempt::Failed(format!("unrecognized status '{}'", response.status)),
            Ok(Err(e)) => {
                tracing::debug!("Status attempt failed: {e}");
                Attempt::Failed(e.to_string())
            }
            Err(_) => Attempt::Failed(format!("status request exceeded {attempt_timeout:?}")),
        }
    }
}
