//! Backoff for compute API requests.
//!
//! Transport failures are retried for every request. Throttling and gateway
//! statuses (429, 502, 503, 504) are retried for reads only: a mutating call
//! that reached the server may already have started an operation.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

/// Retry budget: `retries` extra attempts, delays doubling from `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    pub retries: u32,
    pub base: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            retries: 3,
            base: Duration::from_millis(200),
        }
    }
}

impl Backoff {
    fn delay(&self, attempt: u32) -> Duration {
        self.base * 2u32.pow(attempt)
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Run `attempt_fn` until it yields a final outcome or the budget is spent.
/// The last outcome is returned as is; status handling stays with the caller.
pub(crate) async fn send_with_backoff<F, Fut>(
    backoff: Backoff,
    idempotent: bool,
    mut attempt_fn: F,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        let outcome = attempt_fn().await;
        let retry = match &outcome {
            Err(_) => true,
            Ok(resp) => idempotent && is_transient(resp.status()),
        };
        if !retry || attempt >= backoff.retries {
            return outcome;
        }
        let delay = backoff.delay(attempt);
        match &outcome {
            Err(e) => tracing::warn!(attempt = attempt + 1, ?delay, error = %e, "compute API request failed; retrying"),
            Ok(resp) => tracing::warn!(attempt = attempt + 1, ?delay, status = resp.status().as_u16(), "compute API busy; retrying"),
        }
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
