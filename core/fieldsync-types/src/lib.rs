//! Core type definitions for fieldsync.
//!
//! This crate provides the data model shared by the reconciliation engine
//! and its callers:
//! - [`FieldDescriptor`]: a live, remote-owned field snapshot
//! - [`FieldConfiguration`]: the caller's desired field definition
//! - [`MatchAnalysis`]: the scored diff between the two
//! - [`OperationOptions`]: per-call strategy and conflict policy
//! - [`OperationResult`] / [`BatchResult`]: what a reconciliation did

mod analysis;
mod field;
mod options;
mod result;

pub use analysis::{ConfigurationDifference, MatchAnalysis, RecommendedAction, Severity};
pub use field::{FieldConfiguration, FieldDescriptor, FieldType, Properties, TableRef};
pub use options::{
    ConflictResolution, OperationOptions, OptionsError, Strategy, MAX_OPERATION_DELAY_MS,
    MAX_RETRIES_LIMIT,
};
pub use result::{
    BatchFailure, BatchResult, BatchSummary, OperationKind, OperationMetadata, OperationResult,
};
