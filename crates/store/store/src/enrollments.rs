use async_trait::async_trait;

use leadflow_core::{
    AutomationId, Enrollment, EnrollmentId, EnrollmentUpdate, LeadId, NewEnrollment,
};

use crate::error::StoreError;

/// Durable record of each lead's progress through an automation.
///
/// The engine is the sole writer of enrollment rows.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Insert a new enrollment at position 0 with `Active` status and
    /// return the stored row.
    async fn create(&self, new: NewEnrollment) -> Result<Enrollment, StoreError>;

    /// Fetch an enrollment by id.
    async fn get(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, StoreError>;

    /// Find the `Active` enrollment for `(automation, lead)`, if any.
    ///
    /// This backs the enrollment manager's idempotent re-enrollment
    /// guard; it is an advisory read, not a uniqueness constraint.
    async fn find_active(
        &self,
        automation_id: &AutomationId,
        lead_id: &LeadId,
    ) -> Result<Option<Enrollment>, StoreError>;

    /// Apply a sparse update to an enrollment.
    async fn update(&self, id: &EnrollmentId, update: EnrollmentUpdate) -> Result<(), StoreError>;
}
