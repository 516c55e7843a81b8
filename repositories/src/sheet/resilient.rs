use crate::sheet::{GatewayError, GatewayResult, Row, SheetGateway, Table};
use error_stack::Report;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries per call, the first one included. Never less than one.
    pub attempts: u32,
    pub timeout: Duration,
    /// Wait before the first retry. Doubles on every further retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    fn delay_before(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Whether sending the same request twice is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replay {
    Safe,
    Unsafe,
}

impl Replay {
    fn should_retry(self, error: &GatewayError) -> bool {
        match error {
            GatewayError::Unavailable => true,
            // the first request may already be applied, an append sent again duplicates the row
            GatewayError::TimedOut | GatewayError::Interrupted => self == Replay::Safe,
            GatewayError::Rejected | GatewayError::Malformed => false,
        }
    }
}

/// Wraps a gateway so every call is bounded by a timeout and transient failures are retried.
#[derive(Debug, Clone)]
pub struct ResilientSheet<G> {
    inner: G,
    policy: RetryPolicy,
}

impl<G: SheetGateway> ResilientSheet<G> {
    pub fn new(inner: G, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn call<T, F, Fut>(&self, operation: &str, replay: Replay, f: F) -> GatewayResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.policy.timeout, f()).await {
                Ok(result) => result,
                Err(elapsed) => Err(Report::new(elapsed).change_context(GatewayError::TimedOut)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && replay.should_retry(e.current_context()) => {
                    let delay = self.policy.delay_before(attempt);
                    warn!(
                        "{operation} failed on attempt {attempt}/{attempts} ({}), retrying in {delay:?}",
                        e.current_context()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(e.attach(format!("{operation} gave up after {attempt} attempt(s)")));
                }
            }
        }
    }
}

impl<G: SheetGateway> SheetGateway for ResilientSheet<G> {
    async fn read_rows(&self, table: Table) -> GatewayResult<Vec<Row>> {
        self.call("read rows", Replay::Safe, || self.inner.read_rows(table))
            .await
    }

    async fn append_row(&self, table: Table, row: Row) -> GatewayResult<()> {
        self.call("append row", Replay::Unsafe, || {
            self.inner.append_row(table, row.clone())
        })
        .await
    }

    async fn update_cell(
        &self,
        table: Table,
        row: usize,
        column: usize,
        value: String,
    ) -> GatewayResult<()> {
        self.call("update cell", Replay::Safe, || {
            self.inner.update_cell(table, row, column, value.clone())
        })
        .await
    }

    async fn delete_row(&self, table: Table, row: usize) -> GatewayResult<()> {
        // a repeated delete would remove whichever row shifted into this index
        self.call("delete row", Replay::Unsafe, || self.inner.delete_row(table, row))
            .await
    }
}
