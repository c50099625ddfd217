use async_trait::async_trait;

use leadflow_core::{
    AutomationDefinition, AutomationId, AutomationStep, TenantId, TriggerKind,
};

use crate::error::StoreError;

/// Read/manage access to automation definitions and their steps.
///
/// The engine only reads through this trait; the management operations
/// (`insert`, `replace_steps`, `set_active`) exist for the CRM layer
/// and for test fixtures.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Fetch a definition by id, only if it is active.
    ///
    /// Returns `None` for missing *and* for inactive definitions: the
    /// engine treats both the same way (silent abort).
    async fn get_active(&self, id: &AutomationId) -> Result<Option<AutomationDefinition>, StoreError>;

    /// Fetch the step at `(automation, position)`. `None` past the last
    /// step is the executor's normal-termination signal.
    async fn get_step(
        &self,
        automation_id: &AutomationId,
        position: u32,
    ) -> Result<Option<AutomationStep>, StoreError>;

    /// List all active definitions in tenant scope whose trigger kind
    /// matches. An empty result is a normal outcome.
    async fn list_active_by_trigger(
        &self,
        tenant: &TenantId,
        kind: TriggerKind,
    ) -> Result<Vec<AutomationDefinition>, StoreError>;

    /// Insert a definition (with its steps).
    async fn insert(&self, definition: AutomationDefinition) -> Result<(), StoreError>;

    /// Replace a definition's entire step list: delete-all + bulk-insert.
    ///
    /// This is the only step-edit path. In-flight enrollments reference
    /// positions, not step identities, so a replace changes what a
    /// position means for enrollments already past it.
    async fn replace_steps(
        &self,
        automation_id: &AutomationId,
        steps: Vec<AutomationStep>,
    ) -> Result<(), StoreError>;

    /// Toggle a definition's active flag.
    async fn set_active(&self, id: &AutomationId, active: bool) -> Result<(), StoreError>;
}
