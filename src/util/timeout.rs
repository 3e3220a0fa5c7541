//! Timeout helpers.

use std::future::Future;
use std::time::Duration;

use crate::error::Text2SqlError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, Text2SqlError>>,
) -> Result<T, Text2SqlError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(Text2SqlError::Timeout(duration.as_millis() as u64)),
    }
}

/// Like [`with_timeout`], but a `None` duration waits forever.
pub async fn with_optional_timeout<T>(
    duration: Option<Duration>,
    future: impl Future<Output = Result<T, Text2SqlError>>,
) -> Result<T, Text2SqlError> {
    match duration {
        Some(duration) => with_timeout(duration, future).await,
        None => future.await,
    }
}
