//! Sequential batch reconciliation.
//!
//! Fields of one table are converged strictly one after another, in input
//! order. The remote schema API offers no locking, so concurrent mutations
//! against the same table could race on name uniqueness and on stale cache
//! reads. Per-item failures are recorded and never abort the batch.

use crate::engine::ReconciliationEngine;
use crate::error::{ReconcileError, ReconcileResult};
use fieldsync_types::{
    BatchFailure, BatchResult, BatchSummary, FieldConfiguration, OperationOptions, TableRef,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Runs the reconciliation engine over an ordered list of fields.
pub struct BatchCoordinator<'a> {
    engine: &'a ReconciliationEngine,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(engine: &'a ReconciliationEngine) -> Self {
        Self { engine }
    }

    /// Reconciles every field in `desired`, isolating failures.
    ///
    /// Fails as a whole only when `options` is invalid. Once the engine's
    /// cancellation token fires, remaining items are recorded as failures
    /// without being started.
    #[tracing::instrument(skip_all, fields(table = %table, count = desired.len()))]
    pub async fn ensure_many(
        &self,
        table: &TableRef,
        desired: &[FieldConfiguration],
        options: &OperationOptions,
    ) -> ReconcileResult<BatchResult> {
        options.validate()?;

        let started = Instant::now();
        let cancel = self.engine.cancellation_token();
        let delay = Duration::from_millis(options.operation_delay_ms);

        let mut batch = BatchResult {
            summary: BatchSummary {
                total: desired.len(),
                ..Default::default()
            },
            ..Default::default()
        };

        for (index, config) in desired.iter().enumerate() {
            if cancel.is_cancelled() {
                record_failure(&mut batch, config, &ReconcileError::Cancelled);
                continue;
            }

            match self
                .engine
                .ensure_field_configuration(table, config, options)
                .await
            {
                Ok(result) => {
                    batch.summary.record_success(&result);
                    batch.results.push(result);
                }
                Err(error) => {
                    warn!(field = %config.name, error = %error, "Field reconciliation failed");
                    record_failure(&mut batch, config, &error);
                }
            }

            let is_last = index + 1 == desired.len();
            if !is_last && !delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        batch.summary.finalize();
        batch.total_execution_time_ms = started.elapsed().as_millis() as u64;

        info!(
            created = batch.summary.created,
            updated = batch.summary.updated,
            unchanged = batch.summary.unchanged,
            failed = batch.summary.failed,
            elapsed_ms = batch.total_execution_time_ms,
            "Batch reconciliation finished"
        );
        Ok(batch)
    }
}

fn record_failure(batch: &mut BatchResult, config: &FieldConfiguration, error: &ReconcileError) {
    batch.summary.record_failure();
    batch.failures.push(BatchFailure {
        field_name: config.name.clone(),
        error: error.to_string(),
        retry_count: error.retry_count(),
    });
}
