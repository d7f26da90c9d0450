//! Reconciliation engine: converges one remote field to a desired configuration.
//!
//! Each call runs an explicit state machine:
//!
//! ```text
//! Locating ─┬─ Absent ──────────────► Created | FieldNotFound
//!           └─ Present ─┬─ Matched ─► Unchanged
//!                       └─ Mismatched ─┬─ Updating ─► Updated
//!                                      ├─ SkippedWithWarning ─► Unchanged
//!                                      └─ Rejected ─► ConfigurationMismatch
//! ```
//!
//! The decision itself is the pure [`decide`] function; the engine performs
//! the I/O around it.

use crate::analyzer;
use crate::batch::BatchCoordinator;
use crate::cache::{FieldDescriptorCache, MemoryCache, SharedCache};
use crate::error::{ReconcileError, ReconcileResult};
use crate::gateway::RemoteFieldGateway;
use crate::retry::RetryPolicy;
use fieldsync_types::{
    BatchResult, ConfigurationDifference, ConflictResolution, FieldConfiguration,
    FieldDescriptor, MatchAnalysis, OperationKind, OperationMetadata, OperationOptions,
    OperationResult, Strategy, TableRef,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Configuration for the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backoff before the first retry.
    pub retry_base_delay_ms: u64,
    /// Cap for any single backoff.
    pub retry_max_delay_ms: u64,
    /// Lifetime of a cached field list.
    pub cache_ttl_secs: u64,
    /// Prefix for shared cache keys.
    pub cache_namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
            cache_ttl_secs: 300,
            cache_namespace: "fieldsync".to_string(),
        }
    }
}

/// What the decision tree chose for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Absent and creation is allowed.
    Create,
    /// Present and already matching.
    Unchanged,
    /// Present, mismatched, converge in place.
    Update(MatchAnalysis),
    /// Present, mismatched, leave it and report.
    Skip(MatchAnalysis),
    /// Absent under `update_only`.
    RejectAbsent,
    /// Present under `create_only`.
    RejectExisting,
    /// Mismatched under `throw_error`.
    RejectMismatch(MatchAnalysis),
}

/// Pure decision tree over the lookup result and the caller's policies.
pub fn decide(
    live: Option<&FieldDescriptor>,
    desired: &FieldConfiguration,
    options: &OperationOptions,
) -> Decision {
    let Some(live) = live else {
        return match options.strategy {
            Strategy::UpdateOnly => Decision::RejectAbsent,
            Strategy::CreateOnly | Strategy::EnsureCorrect => Decision::Create,
        };
    };

    if options.strategy == Strategy::CreateOnly {
        return Decision::RejectExisting;
    }

    let analysis = analyzer::analyze(live, desired);
    if analysis.is_full_match {
        return Decision::Unchanged;
    }

    match options.conflict_resolution {
        ConflictResolution::ThrowError => Decision::RejectMismatch(analysis),
        ConflictResolution::SkipOperation => Decision::Skip(analysis),
        ConflictResolution::UpdateExisting => Decision::Update(analysis),
    }
}

/// Per-call bookkeeping.
struct Invocation {
    started: Instant,
    retries: u32,
    api_calls: u32,
    cache_hit: bool,
    warnings: Vec<String>,
}

impl Invocation {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            retries: 0,
            api_calls: 0,
            cache_hit: false,
            warnings: Vec::new(),
        }
    }

    fn finish(
        self,
        field: FieldDescriptor,
        operation: OperationKind,
        changes: Vec<ConfigurationDifference>,
    ) -> OperationResult {
        OperationResult {
            field,
            operation,
            changes,
            processing_time_ms: self.started.elapsed().as_millis() as u64,
            warnings: self.warnings,
            metadata: OperationMetadata {
                retry_count: self.retries,
                cache_hit: self.cache_hit,
                api_call_count: self.api_calls,
            },
        }
    }
}

/// Converges remote fields to desired configurations.
pub struct ReconciliationEngine {
    gateway: Arc<dyn RemoteFieldGateway>,
    cache: FieldDescriptorCache,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl ReconciliationEngine {
    /// Creates an engine backed by an in-process cache.
    pub fn new(gateway: Arc<dyn RemoteFieldGateway>, config: EngineConfig) -> Self {
        Self::with_cache(gateway, Arc::new(MemoryCache::new()), config)
    }

    /// Creates an engine with a caller-supplied cache backend.
    pub fn with_cache(
        gateway: Arc<dyn RemoteFieldGateway>,
        backend: Arc<dyn SharedCache>,
        config: EngineConfig,
    ) -> Self {
        let cache = FieldDescriptorCache::new(
            backend,
            config.cache_namespace.clone(),
            Duration::from_secs(config.cache_ttl_secs),
        );
        Self {
            gateway,
            cache,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses a caller-owned cancellation token for every call on this engine.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &FieldDescriptorCache {
        &self.cache
    }

    pub fn gateway(&self) -> &Arc<dyn RemoteFieldGateway> {
        &self.gateway
    }

    /// Compares a live field against a desired configuration without I/O.
    pub fn analyze(&self, live: &FieldDescriptor, desired: &FieldConfiguration) -> MatchAnalysis {
        analyzer::analyze(live, desired)
    }

    /// `max_retries` bounds total attempts, so 3 means at most three calls.
    fn retry_policy(&self, max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(self.config.retry_base_delay_ms))
            .with_max_delay(Duration::from_millis(self.config.retry_max_delay_ms))
    }

    // ── Lookup ───────────────────────────────────────────────────

    /// Finds a live field by exact name, using the cache when possible.
    pub async fn find_by_name(
        &self,
        table: &TableRef,
        name: &str,
    ) -> ReconcileResult<Option<FieldDescriptor>> {
        let options = OperationOptions::default();
        let mut inv = Invocation::start();
        let fields = self.fetch_fields(table, name, &options, &mut inv).await?;
        Ok(fields.into_iter().find(|f| f.name == name))
    }

    /// Lists the table's live fields, bypassing the cache when asked.
    pub async fn list_fields(
        &self,
        table: &TableRef,
        skip_cache: bool,
    ) -> ReconcileResult<Vec<FieldDescriptor>> {
        let options = OperationOptions::default().with_skip_cache(skip_cache);
        let mut inv = Invocation::start();
        self.fetch_fields(table, "*", &options, &mut inv).await
    }

    async fn fetch_fields(
        &self,
        table: &TableRef,
        field_name: &str,
        options: &OperationOptions,
        inv: &mut Invocation,
    ) -> ReconcileResult<Vec<FieldDescriptor>> {
        if !options.skip_cache
            && let Some(fields) = self.cache.get(table).await
        {
            debug!(table = %table, "Field list served from cache");
            inv.cache_hit = true;
            return Ok(fields);
        }

        inv.api_calls += 1;
        let policy = self.retry_policy(options.max_retries);
        let fields = policy
            .execute("list_fields", &self.cancel, &mut inv.retries, || {
                self.gateway.list_fields(table)
            })
            .await
            .map_err(|e| ReconcileError::gateway("list_fields", field_name, inv.retries, e))?;

        self.cache.put(table, &fields).await;
        Ok(fields)
    }

    // ── Reconciliation ───────────────────────────────────────────

    /// Converges one field: create it, update it, or leave it unchanged.
    #[tracing::instrument(skip(self, table, desired, options), fields(table = %table, field = %desired.name))]
    pub async fn ensure_field_configuration(
        &self,
        table: &TableRef,
        desired: &FieldConfiguration,
        options: &OperationOptions,
    ) -> ReconcileResult<OperationResult> {
        options.validate()?;
        if self.cancel.is_cancelled() {
            return Err(ReconcileError::Cancelled);
        }

        let mut inv = Invocation::start();
        let fields = self.fetch_fields(table, &desired.name, options, &mut inv).await?;
        let live = fields.into_iter().find(|f| f.name == desired.name);

        match decide(live.as_ref(), desired, options) {
            Decision::Create => {
                let field = self.create(table, desired, options, &mut inv).await?;
                Ok(inv.finish(field, OperationKind::Created, Vec::new()))
            }
            Decision::Unchanged => {
                debug!("Field already matches");
                let field = live.ok_or_else(|| missing_live(desired))?;
                Ok(inv.finish(field, OperationKind::Unchanged, Vec::new()))
            }
            Decision::Skip(analysis) => {
                let field = live.ok_or_else(|| missing_live(desired))?;
                warn!(
                    differences = analysis.differences.len(),
                    score = analysis.match_score,
                    "Skipping mismatched field"
                );
                inv.warnings.push(format!(
                    "field '{}' differs from the desired configuration in {} place(s); update skipped by conflict resolution",
                    desired.name,
                    analysis.differences.len()
                ));
                Ok(inv.finish(field, OperationKind::Unchanged, analysis.differences))
            }
            Decision::Update(analysis) => {
                let live = live.ok_or_else(|| missing_live(desired))?;
                if analysis.has_critical() {
                    inv.warnings.push(format!(
                        "type-level change applied in place to '{}' (match score {:.2}); existing values may be converted",
                        desired.name, analysis.match_score
                    ));
                    if live.is_primary && live.type_code != desired.type_code {
                        inv.warnings
                            .push(format!("'{}' is the primary field", desired.name));
                    }
                }
                let field = self.update(table, &live, desired, options, &mut inv).await?;
                Ok(inv.finish(field, OperationKind::Updated, analysis.differences))
            }
            Decision::RejectAbsent => Err(ReconcileError::FieldNotFound {
                field: desired.name.clone(),
                table: table.clone(),
                retries: inv.retries,
            }),
            Decision::RejectExisting => Err(ReconcileError::Operation {
                message: format!(
                    "field '{}' exists, create_only forbids reuse",
                    desired.name
                ),
                operation: "create_field",
                field: Some(desired.name.clone()),
                retries: inv.retries,
                source: None,
            }),
            Decision::RejectMismatch(analysis) => Err(ReconcileError::ConfigurationMismatch {
                field: desired.name.clone(),
                differences: analysis.differences,
                retries: inv.retries,
            }),
        }
    }

    async fn create(
        &self,
        table: &TableRef,
        desired: &FieldConfiguration,
        options: &OperationOptions,
        inv: &mut Invocation,
    ) -> ReconcileResult<FieldDescriptor> {
        inv.api_calls += 1;
        let policy = self.retry_policy(options.max_retries);
        let field = policy
            .execute("create_field", &self.cancel, &mut inv.retries, || {
                self.gateway.create_field(table, desired)
            })
            .await
            .map_err(|e| ReconcileError::gateway("create_field", &desired.name, inv.retries, e))?;

        self.cache.invalidate(table).await;
        info!(id = %field.id, "Field created");
        Ok(field)
    }

    async fn update(
        &self,
        table: &TableRef,
        live: &FieldDescriptor,
        desired: &FieldConfiguration,
        options: &OperationOptions,
        inv: &mut Invocation,
    ) -> ReconcileResult<FieldDescriptor> {
        inv.api_calls += 1;
        let policy = self.retry_policy(options.max_retries);
        let field = policy
            .execute("update_field", &self.cancel, &mut inv.retries, || {
                self.gateway.update_field(table, &live.id, desired)
            })
            .await
            .map_err(|e| ReconcileError::gateway("update_field", &desired.name, inv.retries, e))?;

        self.cache.invalidate(table).await;
        info!(id = %field.id, "Field updated");
        Ok(field)
    }

    /// Reconciles many fields sequentially; see [`BatchCoordinator`].
    pub async fn ensure_many(
        &self,
        table: &TableRef,
        desired: &[FieldConfiguration],
        options: &OperationOptions,
    ) -> ReconcileResult<BatchResult> {
        BatchCoordinator::new(self).ensure_many(table, desired, options).await
    }
}

fn missing_live(desired: &FieldConfiguration) -> ReconcileError {
    ReconcileError::Operation {
        message: format!("live field '{}' vanished during reconciliation", desired.name),
        operation: "locate_field",
        field: Some(desired.name.clone()),
        retries: 0,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(type_code: i32, ui_type: &str) -> FieldDescriptor {
        FieldDescriptor {
            id: "fld1".into(),
            name: "Status".into(),
            type_code,
            ui_type: ui_type.into(),
            is_primary: false,
            properties: Default::default(),
            description: None,
        }
    }

    #[test]
    fn absent_field_is_created_unless_update_only() {
        let desired = FieldConfiguration::text("Status");
        let opts = OperationOptions::default();
        assert_eq!(decide(None, &desired, &opts), Decision::Create);

        let opts = opts.with_strategy(Strategy::UpdateOnly);
        assert_eq!(decide(None, &desired, &opts), Decision::RejectAbsent);
    }

    #[test]
    fn existing_field_rejected_under_create_only() {
        let desired = FieldConfiguration::text("Status");
        let opts = OperationOptions::default().with_strategy(Strategy::CreateOnly);
        assert_eq!(
            decide(Some(&live(1, "Text")), &desired, &opts),
            Decision::RejectExisting
        );
    }

    #[test]
    fn mismatch_follows_conflict_resolution() {
        let desired = FieldConfiguration::text("Status");
        let field = live(3, "SingleSelect");
        let base = OperationOptions::default();

        assert!(matches!(decide(Some(&field), &desired, &base), Decision::Update(_)));
        assert!(matches!(
            decide(
                Some(&field),
                &desired,
                &base.clone().with_conflict_resolution(ConflictResolution::SkipOperation)
            ),
            Decision::Skip(_)
        ));
        assert!(matches!(
            decide(
                Some(&field),
                &desired,
                &base.with_conflict_resolution(ConflictResolution::ThrowError)
            ),
            Decision::RejectMismatch(_)
        ));
    }

    #[test]
    fn matching_field_is_unchanged_under_any_policy() {
        let desired = FieldConfiguration::text("Status");
        let field = live(1, "Text");
        for policy in [
            ConflictResolution::UpdateExisting,
            ConflictResolution::ThrowError,
            ConflictResolution::SkipOperation,
        ] {
            let opts = OperationOptions::default().with_conflict_resolution(policy);
            assert_eq!(decide(Some(&field), &desired, &opts), Decision::Unchanged);
        }
    }
}
