//! Outcome records for single and batch reconciliations.

use crate::analysis::ConfigurationDifference;
use crate::field::FieldDescriptor;
use serde::{Deserialize, Serialize};

/// Terminal outcome of a successful reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Created,
    Updated,
    Unchanged,
}

/// Bookkeeping about how a result was obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Retries consumed across the lookup and the mutation.
    pub retry_count: u32,
    /// Whether the lookup was served from the field cache.
    pub cache_hit: bool,
    /// Remote calls actually made (retries excluded).
    pub api_call_count: u32,
}

/// Result of one `ensure_field_configuration` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    /// The field as it stands after the call.
    pub field: FieldDescriptor,
    pub operation: OperationKind,
    /// Empty unless updated, or skipped despite a mismatch.
    pub changes: Vec<ConfigurationDifference>,
    pub processing_time_ms: u64,
    pub warnings: Vec<String>,
    pub metadata: OperationMetadata,
}

/// One batch item that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub field_name: String,
    pub error: String,
    pub retry_count: u32,
}

/// Aggregate counters of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Sum of `processing_time_ms` over successful items.
    pub total_processing_time_ms: u64,
    /// `total_processing_time_ms` divided by the number of successes, 0 if none.
    pub average_processing_time_ms: f64,
}

impl BatchSummary {
    /// Counts one successful result into its category.
    pub fn record_success(&mut self, result: &OperationResult) {
        match result.operation {
            OperationKind::Created => self.created += 1,
            OperationKind::Updated => self.updated += 1,
            OperationKind::Unchanged => self.unchanged += 1,
        }
        self.total_processing_time_ms += result.processing_time_ms;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Number of items that succeeded.
    pub fn succeeded(&self) -> usize {
        self.created + self.updated + self.unchanged
    }

    /// Recomputes the average from the running totals.
    pub fn finalize(&mut self) {
        let succeeded = self.succeeded();
        self.average_processing_time_ms = if succeeded == 0 {
            0.0
        } else {
            self.total_processing_time_ms as f64 / succeeded as f64
        };
    }
}

/// Result of an `ensure_many` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Successful items only, in input order.
    pub results: Vec<OperationResult>,
    pub summary: BatchSummary,
    pub failures: Vec<BatchFailure>,
    /// Wall clock from start to finish, including delays and failures.
    pub total_execution_time_ms: u64,
}

impl BatchResult {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}
