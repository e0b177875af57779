//! # Timeout Guard
//!
//! Races every prospective-blocking validation step against a fixed
//! budget. The timeout is advisory: an expired wait substitutes a
//! `Timeout` error for the field, the underlying future is abandoned,
//! not interrupted.
//!
//! One deadline is taken per field-validation attempt and shared by the
//! field's value resolution, dependency resolution and every validator,
//! so the first wait to exhaust the remaining budget defines the timeout
//! moment; already-settled validators keep their results.

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use super::errors::ValidationError;

/// Budget for a single field-validation attempt
pub const VALIDATION_TIMEOUT: Duration = Duration::from_millis(2000);

/// Deadline for a field-validation attempt starting now
pub(crate) fn deadline() -> Instant {
    Instant::now() + VALIDATION_TIMEOUT
}

/// Race a future against the deadline, converting elapse into a
/// `Timeout` error for `field`
pub(crate) async fn guard<T>(
    field: &str,
    deadline: Instant,
    fut: impl Future<Output = T>,
) -> Result<T, ValidationError> {
    timeout_at(deadline, fut).await.map_err(|_| {
        tracing::debug!(field, "validation step exceeded timeout budget");
        ValidationError::Timeout {
            field: field.to_string(),
        }
    })
}
