use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AutomationId, EnrollmentId, LeadId, TenantId};

/// Lifecycle state of an enrollment.
///
/// `Active` is the only state with outgoing transitions; the other
/// three are terminal sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Stopped,
    Error,
}

impl EnrollmentStatus {
    /// True for the three terminal sink states.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Return the wire/storage representation of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable record of one lead's progress through one automation.
///
/// Created `Active` by the enrollment manager and mutated only by the
/// step executor. At most one `Active` enrollment exists per
/// (automation, lead) pair at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub automation_id: AutomationId,
    pub lead_id: LeadId,
    pub tenant: TenantId,
    /// Position of the next step to execute.
    pub current_step_position: u32,
    pub status: EnrollmentStatus,
    /// Informational: when the next step is expected to run, set when a
    /// wait parks the enrollment.
    pub next_action_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Fields for creating a new enrollment. The store assigns the id and
/// `started_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub automation_id: AutomationId,
    pub lead_id: LeadId,
    pub tenant: TenantId,
}

/// A sparse update applied to an enrollment by the step executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollmentUpdate {
    pub current_step_position: Option<u32>,
    pub status: Option<EnrollmentStatus>,
    /// `Some(None)` clears the field; `None` leaves it untouched.
    pub next_action_at: Option<Option<DateTime<Utc>>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl EnrollmentUpdate {
    /// Update advancing to the given position, clearing any parked
    /// next-action time.
    #[must_use]
    pub fn advanced_to(position: u32) -> Self {
        Self {
            current_step_position: Some(position),
            next_action_at: Some(None),
            ..Self::default()
        }
    }

    /// Update moving the enrollment into a terminal state.
    #[must_use]
    pub fn terminal(status: EnrollmentStatus) -> Self {
        debug_assert!(status.is_terminal());
        Self {
            status: Some(status),
            completed_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Terminal error update with a message.
    #[must_use]
    pub fn errored(message: impl Into<String>) -> Self {
        Self {
            status: Some(EnrollmentStatus::Error),
            completed_at: Some(Utc::now()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Record when the next step is expected to run.
    #[must_use]
    pub fn with_next_action_at(mut self, at: DateTime<Utc>) -> Self {
        self.next_action_at = Some(Some(at));
        self
    }
}
