//! Shared HTTP plumbing for the remote backends
//!
//! Both remote providers retry 429/5xx responses and connection errors with
//! exponential backoff (500ms, 1s, 2s, ...). Any other failure returns
//! immediately.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Build the HTTP client for a remote backend.
pub(crate) fn build_client(backend: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::provider_init(backend, format!("failed to build HTTP client: {}", e)))
}

/// Delay before retry `attempt` (1-based).
pub(crate) fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * 2u64.pow(attempt.saturating_sub(1)))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send a request, retrying transient failures up to `max_retries` times.
///
/// `request` is called once per attempt. `describe` turns an error status and
/// body into a message.
pub(crate) async fn send_with_retry<F, D>(
    backend: &str,
    max_retries: u32,
    request: F,
    describe: D,
) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
    D: Fn(StatusCode, String) -> String,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff(attempt);
            debug!(backend, attempt, ?delay, "Retrying after error");
            tokio::time::sleep(delay).await;
        }

        match request().send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let message = format!("{} API error {}: {}", backend, status, describe(status, body));

                if is_retryable(status) {
                    warn!(backend, status = %status, attempt, "Retryable API error");
                    last_error = Some(Error::generation(message));
                } else {
                    return Err(Error::generation(message));
                }
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                warn!(backend, attempt, error = %e, "Retryable connection error");
                last_error = Some(Error::generation(format!("{} connection error: {}", backend, e)));
            }
            Err(e) => {
                return Err(Error::generation(format!("{} request error: {}", backend, e)));
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::generation("All retry attempts exhausted")))
}
