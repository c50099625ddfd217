use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{LeadId, StageId, TenantId, UserId};

/// Pipeline status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Negotiating,
    Signed,
    Lost,
    Archived,
}

impl LeadStatus {
    /// Return the wire/storage representation of this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Negotiating => "negotiating",
            Self::Signed => "signed",
            Self::Lost => "lost",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sales prospect record tracked through a pipeline.
///
/// Leads are owned by the external lead-management system. The engine
/// reads them and applies only the mutations an action handler
/// specifies, via [`LeadUpdate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub tenant: TenantId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
    pub stage_id: Option<StageId>,
    pub assigned_user_id: Option<UserId>,
    /// Tag set. Handlers maintain set semantics (no duplicates).
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Create a lead with required fields; everything else empty.
    #[must_use]
    pub fn new(
        id: impl Into<LeadId>,
        tenant: impl Into<TenantId>,
        first_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant: tenant.into(),
            first_name: first_name.into(),
            last_name: None,
            email: None,
            phone: None,
            status: LeadStatus::New,
            stage_id: None,
            assigned_user_id: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the current pipeline stage.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<StageId>) -> Self {
        self.stage_id = Some(stage.into());
        self
    }
}

/// A sparse update applied to a lead.
///
/// `None` fields are left untouched. Double-`Option` fields distinguish
/// "don't change" (`None`) from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadUpdate {
    pub status: Option<LeadStatus>,
    pub stage_id: Option<StageId>,
    pub assigned_user_id: Option<UserId>,
    pub tags: Option<Vec<String>>,
}

impl LeadUpdate {
    /// True if the update would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.stage_id.is_none()
            && self.assigned_user_id.is_none()
            && self.tags.is_none()
    }
}
