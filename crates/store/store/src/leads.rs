use async_trait::async_trait;

use leadflow_core::{Lead, LeadId, LeadUpdate};

use crate::error::StoreError;

/// Read access to leads plus the narrow mutation surface action
/// handlers use. Leads are owned by the external lead-management
/// system; the engine never creates or deletes them.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Fetch a lead by id.
    async fn get(&self, id: &LeadId) -> Result<Option<Lead>, StoreError>;

    /// Apply a sparse update to a lead.
    async fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError>;
}
