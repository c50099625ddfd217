use tracing::{debug, info};

use leadflow_core::{
    AutomationId, Job, JobPayload, LeadId, NewEnrollment, TenantId, TimelineEntry,
    TimelineEntryKind,
};

use crate::engine::AutomationEngine;
use crate::error::EngineError;

impl AutomationEngine {
    /// Enroll a lead into one automation, driven by an enroll job.
    ///
    /// Missing/inactive definitions and already-active enrollments
    /// abort silently — the job counts as successfully processed, which
    /// makes redelivery of the same enroll job a no-op. The guard is
    /// re-checked on every queue retry because the whole function
    /// re-runs.
    ///
    /// Transient storage failures propagate so the queue's retry policy
    /// re-runs the job.
    pub(crate) async fn enroll(
        &self,
        automation_id: &AutomationId,
        lead_id: &LeadId,
        tenant: &TenantId,
    ) -> Result<(), EngineError> {
        let Some(definition) = self.definitions.get_active(automation_id).await? else {
            debug!(%automation_id, "automation missing or inactive, skipping enrollment");
            return Ok(());
        };

        if let Some(existing) = self.enrollments.find_active(automation_id, lead_id).await? {
            debug!(
                %automation_id,
                %lead_id,
                enrollment_id = %existing.id,
                "lead already enrolled, skipping"
            );
            return Ok(());
        }

        let enrollment = self
            .enrollments
            .create(NewEnrollment {
                automation_id: automation_id.clone(),
                lead_id: lead_id.clone(),
                tenant: tenant.clone(),
            })
            .await?;

        self.record_timeline(
            TimelineEntry::new(
                tenant.clone(),
                lead_id.clone(),
                TimelineEntryKind::Automation,
                format!("Enrolled in automation: {}", definition.name),
            )
            .with_metadata(serde_json::json!({ "automation_name": definition.name })),
        )
        .await;

        self.queue
            .enqueue(
                Job::new(JobPayload::ExecuteStep {
                    tenant: tenant.clone(),
                    enrollment_id: enrollment.id.clone(),
                    automation_id: automation_id.clone(),
                    lead_id: lead_id.clone(),
                    step_position: 0,
                }),
                None,
            )
            .await?;

        info!(
            %automation_id,
            %lead_id,
            enrollment_id = %enrollment.id,
            "lead enrolled"
        );
        Ok(())
    }
}
