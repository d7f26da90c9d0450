//! Field reconciliation engine for fieldsync.
//!
//! Keeps caller-declared field definitions converged with a remote table
//! whose schema is owned by an HTTP API.
//!
//! ## Components
//!
//! - **Analyzer**: pure live/desired comparison producing a scored diff
//! - **Retry**: exponential backoff around gateway calls
//! - **Cache**: table-keyed field list snapshots over an injected backend
//! - **Gateway**: the remote field API, behind [`RemoteFieldGateway`]
//! - **Engine**: single-field convergence ([`ReconciliationEngine`])
//! - **Batch**: sequential multi-field convergence ([`BatchCoordinator`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use fieldsync_engine::{BitableConfig, BitableGateway, EngineConfig, ReconciliationEngine};
//! use fieldsync_types::{FieldConfiguration, OperationOptions, TableRef};
//!
//! # async fn run() -> Result<(), fieldsync_engine::ReconcileError> {
//! let gateway = BitableGateway::new(BitableConfig::default());
//! gateway.set_access_token("t-123").await;
//!
//! let engine = ReconciliationEngine::new(Arc::new(gateway), EngineConfig::default());
//! let table = TableRef::new("app_token", "tbl_id");
//! let status = FieldConfiguration::single_select("Status", ["Want", "Read"]);
//!
//! let result = engine
//!     .ensure_field_configuration(&table, &status, &OperationOptions::default())
//!     .await?;
//! println!("{:?}", result.operation);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
mod batch;
pub mod cache;
mod engine;
mod error;
pub mod gateway;
pub mod retry;

pub use analyzer::analyze;
pub use batch::BatchCoordinator;
pub use cache::{CacheError, CacheStats, FieldDescriptorCache, MemoryCache, SharedCache};
pub use engine::{decide, Decision, EngineConfig, ReconciliationEngine};
pub use error::{GatewayError, GatewayResult, ReconcileError, ReconcileResult};
pub use gateway::{BitableConfig, BitableGateway, RemoteFieldGateway};
pub use retry::RetryPolicy;

pub use tokio_util::sync::CancellationToken;
