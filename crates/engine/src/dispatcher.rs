use tracing::{debug, info};

use leadflow_core::{Job, JobPayload, LeadId, TenantId, TriggerKind};

use crate::engine::AutomationEngine;
use crate::error::EngineError;

impl AutomationEngine {
    /// Fan a domain event out to every matching automation.
    ///
    /// The sole public entry point domain code calls when a
    /// lead-affecting event occurs (creation, stage change, status
    /// change, or an explicit manual request). Looks up all active
    /// definitions in tenant scope with a matching trigger kind and
    /// enqueues one enrollment job per match.
    ///
    /// No trigger-config filtering happens here: a `stage_changed`
    /// automation configured for a specific stage is enqueued on every
    /// stage change. Zero matches is a normal outcome.
    ///
    /// Returns the number of enrollment jobs enqueued.
    pub async fn dispatch_trigger(
        &self,
        trigger: TriggerKind,
        lead_id: &LeadId,
        tenant: &TenantId,
    ) -> Result<usize, EngineError> {
        let matches = self
            .definitions
            .list_active_by_trigger(tenant, trigger)
            .await?;

        if matches.is_empty() {
            debug!(%trigger, %lead_id, "no active automations for trigger");
            return Ok(0);
        }

        for definition in &matches {
            self.queue
                .enqueue(
                    Job::new(JobPayload::EnrollLead {
                        tenant: tenant.clone(),
                        automation_id: definition.id.clone(),
                        lead_id: lead_id.clone(),
                    }),
                    None,
                )
                .await?;
        }

        info!(
            %trigger,
            %lead_id,
            count = matches.len(),
            "enqueued enrollment jobs"
        );
        Ok(matches.len())
    }
}
