use serde::{Deserialize, Serialize};

use crate::lead::LeadStatus;
use crate::types::StageId;

/// A domain event kind that causes candidate automations to enroll a lead.
///
/// Each variant carries only the configuration that kind uses. The
/// config-free discriminant used for dispatch matching and job payloads
/// is [`TriggerKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires when a lead is created.
    LeadCreated,
    /// Fires when a lead moves to a new pipeline stage.
    ///
    /// `stage_id` narrows the trigger to a target stage. Dispatch does
    /// not filter on it; the configured value is carried for a future
    /// filtering layer.
    StageChanged { stage_id: Option<StageId> },
    /// Fires when a lead's status changes.
    StatusChanged { status: Option<LeadStatus> },
    /// Fires on a fixed delay after some scheduling anchor.
    TimeDelay { delay_minutes: u32 },
    /// Fired only by an explicit manual request.
    Manual,
}

impl Trigger {
    /// The config-free discriminant of this trigger.
    #[must_use]
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::LeadCreated => TriggerKind::LeadCreated,
            Self::StageChanged { .. } => TriggerKind::StageChanged,
            Self::StatusChanged { .. } => TriggerKind::StatusChanged,
            Self::TimeDelay { .. } => TriggerKind::TimeDelay,
            Self::Manual => TriggerKind::Manual,
        }
    }
}

/// Discriminant of [`Trigger`], used for dispatch matching and in job
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    LeadCreated,
    StageChanged,
    StatusChanged,
    TimeDelay,
    Manual,
}

impl TriggerKind {
    /// Return the wire representation of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LeadCreated => "lead_created",
            Self::StageChanged => "stage_changed",
            Self::StatusChanged => "status_changed",
            Self::TimeDelay => "time_delay",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
