//! Per-call reconciliation options and their validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for [`OperationOptions::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 5;
/// Upper bound for [`OperationOptions::operation_delay_ms`].
pub const MAX_OPERATION_DELAY_MS: u64 = 10_000;

/// Which lifecycle transitions a reconciliation may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The field must not exist yet.
    CreateOnly,
    /// The field must already exist.
    UpdateOnly,
    /// Create when absent, converge when present.
    #[default]
    EnsureCorrect,
}

/// What to do once a live/desired mismatch is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    #[default]
    UpdateExisting,
    ThrowError,
    /// Leave the field as is and report what would have changed.
    SkipOperation,
}

/// Rejected option combinations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("max_retries must be between 0 and {MAX_RETRIES_LIMIT}, got {0}")]
    MaxRetriesOutOfRange(u32),

    #[error("operation_delay_ms must be between 0 and {MAX_OPERATION_DELAY_MS}, got {0}")]
    OperationDelayOutOfRange(u64),

    #[error("inconsistent policy: strategy {strategy:?} cannot be combined with {conflict_resolution:?}")]
    InconsistentPolicy {
        strategy: Strategy,
        conflict_resolution: ConflictResolution,
    },
}

/// Options controlling one reconciliation or one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOptions {
    pub strategy: Strategy,
    pub conflict_resolution: ConflictResolution,
    /// Bypass the field cache for the lookup.
    pub skip_cache: bool,
    pub max_retries: u32,
    /// Pause between batch items.
    pub operation_delay_ms: u64,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::EnsureCorrect,
            conflict_resolution: ConflictResolution::UpdateExisting,
            skip_cache: false,
            max_retries: 3,
            operation_delay_ms: 1000,
        }
    }
}

impl OperationOptions {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_conflict_resolution(mut self, conflict_resolution: ConflictResolution) -> Self {
        self.conflict_resolution = conflict_resolution;
        self
    }

    pub fn with_skip_cache(mut self, skip_cache: bool) -> Self {
        self.skip_cache = skip_cache;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_operation_delay_ms(mut self, operation_delay_ms: u64) -> Self {
        self.operation_delay_ms = operation_delay_ms;
        self
    }

    /// Checks ranges and rejects `update_only` paired with `throw_error`.
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(OptionsError::MaxRetriesOutOfRange(self.max_retries));
        }
        if self.operation_delay_ms > MAX_OPERATION_DELAY_MS {
            return Err(OptionsError::OperationDelayOutOfRange(self.operation_delay_ms));
        }
        if self.strategy == Strategy::UpdateOnly
            && self.conflict_resolution == ConflictResolution::ThrowError
        {
            return Err(OptionsError::InconsistentPolicy {
                strategy: self.strategy,
                conflict_resolution: self.conflict_resolution,
            });
        }
        Ok(())
    }
}
