//! Retry logic for registry calls with error classification.
//!
//! Only a fixed set of status codes is retried (413, 429, 503, 504), with
//! exponential backoff and jitter. Everything else fails immediately: a 404
//! is a missing project or version, not a transient condition.

use anyhow::{Result, anyhow};
use log::{debug, warn};
use reqwest::StatusCode;
use std::time::Duration;

/// Maximum number of attempts for a single registry call.
pub const MAX_ATTEMPTS: usize = 5;

/// Base delay for the exponential backoff schedule, in milliseconds.
const BACKOFF_BASE_MS: u64 = 250;

/// Upper bound on a single backoff sleep, in milliseconds.
const MAX_BACKOFF_MS: u64 = 10_000;

/// Fraction of the backoff applied as +/- jitter.
const JITTER_RATIO: f64 = 0.1;

/// Status codes worth retrying.
const RETRYABLE_STATUS_CODES: [StatusCode; 4] = [
    StatusCode::PAYLOAD_TOO_LARGE,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// A referenced project or version does not exist upstream (HTTP 404).
    NotFound(String),
    /// Any other response status that won't succeed on retry.
    Status(u16, String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::NotFound(msg) => write!(f, "Not found: {}", msg),
            NonRetryableError::Status(code, msg) => write!(f, "HTTP {} error: {}", code, msg),
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// A response status from the retryable set, carried so the retry loop can
/// recognize it.
#[derive(Debug)]
pub struct RetryableStatus(pub u16);

impl std::fmt::Display for RetryableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Retryable HTTP {} response", self.0)
    }
}

impl std::error::Error for RetryableStatus {}

/// Classifies an error from `error_for_status()`.
///
/// Retryable statuses become [`RetryableStatus`]; a 404 becomes
/// [`NonRetryableError::NotFound`]; everything else is a plain
/// [`NonRetryableError`].
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    let Some(status) = error.status() else {
        // No status at all: connection-level failure, worth retrying.
        return anyhow::Error::from(error);
    };

    if RETRYABLE_STATUS_CODES.contains(&status) {
        return anyhow::Error::from(RetryableStatus(status.as_u16()));
    }

    if status == StatusCode::NOT_FOUND {
        return anyhow::Error::from(NonRetryableError::NotFound(
            "the requested resource does not exist".to_string(),
        ));
    }

    anyhow::Error::from(NonRetryableError::Status(status.as_u16(), error.to_string()))
}

/// Checks if an anyhow::Error is worth retrying.
fn is_retryable_error(e: &anyhow::Error) -> bool {
    if e.downcast_ref::<NonRetryableError>().is_some() {
        return false;
    }

    if e.downcast_ref::<RetryableStatus>().is_some() {
        return true;
    }

    // Connection-level failures surface as reqwest errors without a status.
    let error_str = e.to_string();
    error_str.contains("connection")
        || error_str.contains("timeout")
        || error_str.contains("reset")
        || error_str.contains("broken pipe")
        || error_str.contains("dns")
        || error_str.contains("resolve")
}

/// Backoff for the given attempt (1-based), with jitter applied.
fn backoff_delay(attempt: usize) -> Duration {
    let backoff = BACKOFF_BASE_MS.saturating_mul(1 << (attempt - 1).min(16));
    let jitter = (backoff as f64 * JITTER_RATIO) as u64;

    // Cheap jitter source; cryptographic quality is irrelevant here.
    let sign_positive = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() % 2 == 0)
        .unwrap_or(true);

    let delayed = if sign_positive {
        backoff.saturating_add(jitter)
    } else {
        backoff.saturating_sub(jitter)
    };

    Duration::from_millis(delayed.min(MAX_BACKOFF_MS))
}

/// Executes an async operation, retrying on retryable statuses and
/// connection-level failures with exponential backoff.
pub async fn with_retry<F, Fut, T>(operation_name: &str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut last_error = None;

    for attempt in 1..=MAX_ATTEMPTS {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !is_retryable_error(&e) {
                    debug!("{}: non-retryable error: {}", operation_name, e);
                    return Err(e);
                }

                if attempt < MAX_ATTEMPTS {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                        operation_name,
                        attempt,
                        MAX_ATTEMPTS,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| anyhow!("{}: failed after {} attempts", operation_name, MAX_ATTEMPTS)))
}
