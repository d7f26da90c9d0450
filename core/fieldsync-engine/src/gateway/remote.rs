//! Remote field gateway abstraction.
//!
//! Defines the narrow interface the reconciliation engine consumes.

use crate::error::GatewayResult;
use async_trait::async_trait;
use fieldsync_types::{FieldConfiguration, FieldDescriptor, TableRef};

/// List, create and update fields of a remote table.
///
/// Implementations classify their failures into [`crate::GatewayError`] so
/// the retry executor can tell transient faults from fatal ones. Credentials
/// are assumed to be applied by the implementation.
#[async_trait]
pub trait RemoteFieldGateway: Send + Sync {
    /// Returns the name of the remote service.
    fn provider_name(&self) -> &'static str;

    /// Lists every field of the table.
    async fn list_fields(&self, table: &TableRef) -> GatewayResult<Vec<FieldDescriptor>>;

    /// Creates a field and returns the live descriptor.
    async fn create_field(
        &self,
        table: &TableRef,
        config: &FieldConfiguration,
    ) -> GatewayResult<FieldDescriptor>;

    /// Replaces a field's configuration and returns the live descriptor.
    async fn update_field(
        &self,
        table: &TableRef,
        field_id: &str,
        config: &FieldConfiguration,
    ) -> GatewayResult<FieldDescriptor>;
}
