//! Retry policy for archive downloads.
//!
//! Transport failures and 5xx statuses are transient and worth retrying.
//! Any 4xx status means the catalog points at a URL that is wrong, gone,
//! or blocked; repeating the request cannot change that.

use reqwest::StatusCode;

/// Maximum number of attempts for network operations.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Responses a retry cannot fix.
#[derive(Debug)]
pub enum NonRetryableError {
    /// The artifact URL does not exist (HTTP 404).
    NotFound,
    /// Any other 4xx client status.
    ClientStatus(u16),
}

impl NonRetryableError {
    /// The HTTP status that produced this error.
    pub fn status(&self) -> u16 {
        match self {
            NonRetryableError::NotFound => 404,
            NonRetryableError::ClientStatus(status) => *status,
        }
    }
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::NotFound => {
                write!(f, "the artifact does not exist (HTTP 404); check the catalog URL")
            }
            NonRetryableError::ClientStatus(status) => {
                write!(f, "server rejected the request (HTTP {})", status)
            }
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classifies an error as retryable or non-retryable.
/// Returns Ok(()) if the error is retryable, Err with the status if not.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    if let Some(status) = error.status() {
        if status == StatusCode::NOT_FOUND {
            return Err(NonRetryableError::NotFound);
        }
        if status.is_client_error() {
            return Err(NonRetryableError::ClientStatus(status.as_u16()));
        }
        // 5xx server errors are transient
    }

    // Connection errors, timeouts, etc. are retryable
    Ok(())
}

/// Checks if an error from `error_for_status()` should be retried.
/// Returns the original error if retryable, or a NonRetryableError if not.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}
