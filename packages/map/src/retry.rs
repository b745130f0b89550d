//! HTTP retry helpers for transient errors.
//!
//! The map endpoint is hit once per mount, usually on election night
//! when the API is under load, so a timeout or 5xx is worth retrying
//! with exponential backoff before giving up and showing the failure.
//!
//! ```ignore
//! let body = retry::send_text(|| client.get(&url), &policy).await?;
//! ```

use std::time::Duration;

use crate::MapError;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16))
    }
}

/// Sends an HTTP request and returns the response body as a `String`.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Retries connection errors, timeouts, HTTP 429 and HTTP 5xx. Any other
/// 4xx is permanent and returned straight away.
///
/// # Errors
///
/// Returns [`MapError`] if the request still fails after all retries,
/// the server returns a non-retryable status, or the body can't be read.
#[allow(clippy::future_not_send)]
pub async fn send_text<F>(build_request: F, policy: &RetryPolicy) -> Result<String, MapError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request, policy).await?;
    Ok(response.text().await?)
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F, policy: &RetryPolicy) -> Result<reqwest::Response, MapError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && can_retry {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(MapError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    if can_retry {
                        log::warn!("  HTTP {status} from {}", response.url());
                        continue;
                    }
                    return Err(MapError::Fetch {
                        message: format!("HTTP {status} after {} retries", policy.max_retries),
                    });
                }

                if status.is_client_error() {
                    return Err(MapError::Fetch {
                        message: format!("HTTP {status}"),
                    });
                }

                return Ok(response);
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
