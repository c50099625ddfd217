use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use leadflow_core::{
    AutomationId, EnrollmentId, EnrollmentStatus, EnrollmentUpdate, Job, JobPayload, LeadId,
    StepDirective, TenantId,
};

use crate::engine::AutomationEngine;
use crate::error::EngineError;

impl AutomationEngine {
    /// Execute one step of one enrollment, driven by an execute-step
    /// job.
    ///
    /// Every invocation re-reads live state rather than trusting the
    /// job payload: an enrollment that is no longer `Active` makes the
    /// job a no-op (that is the cancellation mechanism), and a carried
    /// position that no longer matches the enrollment's live position
    /// means the job is a stale redelivery and is dropped.
    pub(crate) async fn execute_step(
        &self,
        tenant: &TenantId,
        enrollment_id: &EnrollmentId,
        automation_id: &AutomationId,
        lead_id: &LeadId,
        step_position: u32,
    ) -> Result<(), EngineError> {
        let Some(enrollment) = self.enrollments.get(enrollment_id).await? else {
            debug!(%enrollment_id, "enrollment missing, dropping job");
            return Ok(());
        };

        if enrollment.status != EnrollmentStatus::Active {
            debug!(
                %enrollment_id,
                status = %enrollment.status,
                "enrollment no longer active, dropping job"
            );
            return Ok(());
        }

        if enrollment.current_step_position != step_position {
            debug!(
                %enrollment_id,
                live = enrollment.current_step_position,
                carried = step_position,
                "stale step position, dropping job"
            );
            return Ok(());
        }

        // Past the last step: normal termination.
        let Some(step) = self.definitions.get_step(automation_id, step_position).await? else {
            self.enrollments
                .update(
                    enrollment_id,
                    EnrollmentUpdate::terminal(EnrollmentStatus::Completed),
                )
                .await?;
            info!(%enrollment_id, %automation_id, "automation completed");
            return Ok(());
        };

        let Some(lead) = self.leads.get(lead_id).await? else {
            self.enrollments
                .update(enrollment_id, EnrollmentUpdate::errored("lead not found"))
                .await?;
            warn!(%enrollment_id, %lead_id, "lead not found, enrollment errored");
            return Ok(());
        };

        let directive = match self.run_action(&step.action, &lead, tenant).await {
            Ok(directive) => directive,
            Err(handler_error) => {
                warn!(
                    %enrollment_id,
                    action = step.action.name(),
                    position = step_position,
                    error = %handler_error,
                    "action handler failed, enrollment errored"
                );
                self.enrollments
                    .update(
                        enrollment_id,
                        EnrollmentUpdate::errored(handler_error.to_string()),
                    )
                    .await?;
                return Ok(());
            }
        };

        let next_position = step_position + 1;
        match directive {
            StepDirective::Advance => {
                self.enrollments
                    .update(enrollment_id, EnrollmentUpdate::advanced_to(next_position))
                    .await?;
                self.enqueue_next(tenant, enrollment_id, automation_id, lead_id, next_position, None)
                    .await;
            }
            StepDirective::AdvanceAfter { delay_minutes } => {
                let delay = Duration::from_millis(u64::from(delay_minutes) * 60_000);
                let next_action_at =
                    Utc::now() + chrono::Duration::minutes(i64::from(delay_minutes));
                self.enrollments
                    .update(
                        enrollment_id,
                        EnrollmentUpdate::advanced_to(next_position)
                            .with_next_action_at(next_action_at),
                    )
                    .await?;
                self.enqueue_next(
                    tenant,
                    enrollment_id,
                    automation_id,
                    lead_id,
                    next_position,
                    Some(delay),
                )
                .await;
            }
            StepDirective::Stop => {
                self.enrollments
                    .update(
                        enrollment_id,
                        EnrollmentUpdate {
                            current_step_position: Some(next_position),
                            ..EnrollmentUpdate::terminal(EnrollmentStatus::Stopped)
                        },
                    )
                    .await?;
                info!(%enrollment_id, position = next_position, "automation stopped");
            }
        }

        Ok(())
    }

    /// Enqueue the next execute-step job.
    ///
    /// The enrollment's position has already advanced; a failure here
    /// errors the enrollment rather than propagating, because a queue
    /// retry of *this* job would be dropped by the staleness check and
    /// leave the enrollment parked forever.
    async fn enqueue_next(
        &self,
        tenant: &TenantId,
        enrollment_id: &EnrollmentId,
        automation_id: &AutomationId,
        lead_id: &LeadId,
        step_position: u32,
        delay: Option<Duration>,
    ) {
        let job = Job::new(JobPayload::ExecuteStep {
            tenant: tenant.clone(),
            enrollment_id: enrollment_id.clone(),
            automation_id: automation_id.clone(),
            lead_id: lead_id.clone(),
            step_position,
        });

        if let Err(e) = self.queue.enqueue(job, delay).await {
            error!(%enrollment_id, error = %e, "failed to schedule next step");
            let update =
                EnrollmentUpdate::errored(format!("failed to schedule next step: {e}"));
            if let Err(update_error) = self.enrollments.update(enrollment_id, update).await {
                error!(
                    %enrollment_id,
                    error = %update_error,
                    "failed to record scheduling failure"
                );
            }
        }
    }
}
