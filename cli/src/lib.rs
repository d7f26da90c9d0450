//! Manifest loading and command runners for the `fieldsync` binary.

use anyhow::{Context, Result, bail};
use fieldsync_engine::{
    BitableConfig, BitableGateway, Decision, EngineConfig, ReconcileResult, ReconciliationEngine,
    decide,
};
use fieldsync_types::{
    BatchResult, FieldConfiguration, MatchAnalysis, OperationOptions, TableRef,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// A table plus the fields it should carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub table: TableRef,
    #[serde(default)]
    pub options: OperationOptions,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub gateway: BitableConfig,
    pub fields: Vec<FieldConfiguration>,
}

/// Reads and validates a JSON manifest.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    parse_manifest(&raw).with_context(|| format!("Invalid manifest {}", path.display()))
}

/// Parses and validates manifest JSON, filling default UI types.
pub fn parse_manifest(raw: &str) -> Result<Manifest> {
    let mut manifest: Manifest = serde_json::from_str(raw).context("Failed to parse manifest")?;

    if manifest.table.app_token.is_empty() || manifest.table.table_id.is_empty() {
        bail!("table.app_token and table.table_id must be set");
    }
    manifest.options.validate()?;

    let mut seen = HashSet::new();
    for field in &manifest.fields {
        if field.name.trim().is_empty() {
            bail!("field names must not be empty");
        }
        if !seen.insert(field.name.as_str()) {
            bail!("field '{}' is declared more than once", field.name);
        }
    }

    manifest.fields = manifest
        .fields
        .into_iter()
        .map(FieldConfiguration::with_default_ui_type)
        .collect();
    Ok(manifest)
}

/// Builds an authenticated HTTP gateway and an engine for the manifest.
pub async fn build_engine(manifest: &Manifest, token: &str) -> ReconciliationEngine {
    let gateway = BitableGateway::new(manifest.gateway.clone());
    gateway.set_access_token(token).await;
    ReconciliationEngine::new(Arc::new(gateway), manifest.engine.clone())
}

/// Converges every manifest field.
pub async fn apply(engine: &ReconciliationEngine, manifest: &Manifest) -> ReconcileResult<BatchResult> {
    engine
        .ensure_many(&manifest.table, &manifest.fields, &manifest.options)
        .await
}

/// What `apply` would do to one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedChange {
    pub field: String,
    pub action: PlannedAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<MatchAnalysis>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Create,
    Unchanged,
    Update,
    Skip,
    Reject,
}

/// Looks up and analyzes every manifest field without mutating anything.
pub async fn plan(engine: &ReconciliationEngine, manifest: &Manifest) -> ReconcileResult<Vec<PlannedChange>> {
    let mut planned = Vec::with_capacity(manifest.fields.len());
    for desired in &manifest.fields {
        let live = engine.find_by_name(&manifest.table, &desired.name).await?;
        let (action, analysis) = match decide(live.as_ref(), desired, &manifest.options) {
            Decision::Create => (PlannedAction::Create, None),
            Decision::Unchanged => (PlannedAction::Unchanged, None),
            Decision::Update(a) => (PlannedAction::Update, Some(a)),
            Decision::Skip(a) => (PlannedAction::Skip, Some(a)),
            Decision::RejectMismatch(a) => (PlannedAction::Reject, Some(a)),
            Decision::RejectAbsent | Decision::RejectExisting => (PlannedAction::Reject, None),
        };
        planned.push(PlannedChange {
            field: desired.name.clone(),
            action,
            analysis,
        });
    }
    Ok(planned)
}
