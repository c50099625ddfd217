use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trigger::TriggerKind;
use crate::types::{AutomationId, EnrollmentId, LeadId, TenantId};

/// Payload of one unit of queued work.
///
/// Jobs are fire-and-forget from the producer's perspective; the queue
/// guarantees eventual delivery with retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Fan a domain event out to matching automations.
    ProcessTrigger {
        tenant: TenantId,
        lead_id: LeadId,
        trigger: TriggerKind,
    },
    /// Enroll a lead into one automation.
    EnrollLead {
        tenant: TenantId,
        automation_id: AutomationId,
        lead_id: LeadId,
    },
    /// Execute the step a scheduled enrollment is parked at.
    ExecuteStep {
        tenant: TenantId,
        enrollment_id: EnrollmentId,
        automation_id: AutomationId,
        lead_id: LeadId,
        step_position: u32,
    },
}

impl JobPayload {
    /// Short name of this payload kind, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ProcessTrigger { .. } => "process_trigger",
            Self::EnrollLead { .. } => "enroll_lead",
            Self::ExecuteStep { .. } => "execute_step",
        }
    }
}

/// A queued unit of work with delivery bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier assigned at enqueue time.
    pub id: String,
    pub payload: JobPayload,
    /// Delivery attempt count, starting at 0 for the first delivery.
    #[serde(default)]
    pub attempt: u32,
}

impl Job {
    /// Wrap a payload in a fresh job.
    #[must_use]
    pub fn new(payload: JobPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            attempt: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serde_tagged() {
        let payload = JobPayload::ExecuteStep {
            tenant: TenantId::new("org"),
            enrollment_id: EnrollmentId::new("e1"),
            automation_id: AutomationId::new("a1"),
            lead_id: LeadId::new("l1"),
            step_position: 2,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "execute_step");
        assert_eq!(json["step_position"], 2);

        let back: JobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn job_roundtrip() {
        let job = Job::new(JobPayload::ProcessTrigger {
            tenant: TenantId::new("org"),
            lead_id: LeadId::new("l1"),
            trigger: TriggerKind::LeadCreated,
        });
        let json = serde_json::to_string(&job).unwrap();
        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
        assert_eq!(back.attempt, 0);
    }

    #[test]
    fn payload_kinds() {
        let payload = JobPayload::EnrollLead {
            tenant: TenantId::new("org"),
            automation_id: AutomationId::new("a1"),
            lead_id: LeadId::new("l1"),
        };
        assert_eq!(payload.kind(), "enroll_lead");
    }
}
