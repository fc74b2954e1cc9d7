//! Fixed-interval polling for long-running operations.
//!
//! Training and import run for minutes to hours, so a constant poll interval
//! is responsive enough. The wait is open-ended: only a service-reported
//! terminal state ends it, never elapsed time. Callers who need a bound can
//! wrap the wait in `tokio::time::timeout`.

use std::time::Duration;

use tokio::time::sleep;

use crate::models::operation::Operation;

use super::api::ApiError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Where operations are read from. `AutoMlClient` is the production source;
/// tests script one.
pub trait OperationSource {
    fn operation(
        &self,
        project_id: &str,
        operation_id: &str,
    ) -> impl std::future::Future<Output = Result<Operation, ApiError>> + Send;

    fn active_operations(
        &self,
        project_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Operation>, ApiError>> + Send;
}

pub struct OperationPoller<'a, S> {
    source: &'a S,
    interval: Duration,
}

impl<'a, S: OperationSource> OperationPoller<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self::with_interval(source, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(source: &'a S, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Poll one operation until its `done` flag is set, then return it. An
    /// operation that finished with an error is still a successful wait; the
    /// caller inspects `Operation::error`.
    pub async fn wait_for(
        &self,
        project_id: &str,
        operation_id: &str,
    ) -> Result<Operation, ApiError> {
        loop {
            let operation = self.source.operation(project_id, operation_id).await?;
            if operation.done {
                if let Some(error) = &operation.error {
                    tracing::warn!(
                        operation = operation.short_id(),
                        code = error.code,
                        message = %error.message,
                        "Operation finished with error"
                    );
                }
                return Ok(operation);
            }
            tracing::debug!(operation = operation.short_id(), "Operation still pending");
            sleep(self.interval).await;
        }
    }

    /// Poll the full active-operation set for a project until none remain
    /// pending.
    pub async fn wait_for_all(&self, project_id: &str) -> Result<(), ApiError> {
        loop {
            let operations = self.source.active_operations(project_id).await?;
            let pending = operations.iter().filter(|op| !op.done).count();
            if pending == 0 {
                return Ok(());
            }
            tracing::debug!(pending, "Waiting for active operations");
            sleep(self.interval).await;
        }
    }
}
