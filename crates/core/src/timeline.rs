use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{LeadId, TenantId};

/// Kind of a lead timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEntryKind {
    Note,
    EmailSent,
    SmsSent,
    StageChange,
    StatusChange,
    Assignment,
    Automation,
    System,
}

impl TimelineEntryKind {
    /// Return the wire representation of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::EmailSent => "email_sent",
            Self::SmsSent => "sms_sent",
            Self::StageChange => "stage_change",
            Self::StatusChange => "status_change",
            Self::Assignment => "assignment",
            Self::Automation => "automation",
            Self::System => "system",
        }
    }
}

/// One entry in a lead's activity timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: String,
    pub tenant: TenantId,
    pub lead_id: LeadId,
    pub kind: TimelineEntryKind,
    pub content: String,
    /// Kind-dependent structured details (target stage, email subject, …).
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TimelineEntry {
    /// Create an entry with empty metadata, timestamped now.
    #[must_use]
    pub fn new(
        tenant: impl Into<TenantId>,
        lead_id: impl Into<LeadId>,
        kind: TimelineEntryKind,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tenant: tenant.into(),
            lead_id: lead_id.into(),
            kind,
            content: content.into(),
            metadata: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    /// Attach structured metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_creation() {
        let entry = TimelineEntry::new("org", "l1", TimelineEntryKind::Automation, "Enrolled");
        assert_eq!(entry.kind, TimelineEntryKind::Automation);
        assert_eq!(entry.content, "Enrolled");
        assert!(entry.metadata.is_null());
    }

    #[test]
    fn entry_with_metadata() {
        let entry = TimelineEntry::new("org", "l1", TimelineEntryKind::StageChange, "moved")
            .with_metadata(serde_json::json!({"to_stage": "s2"}));
        assert_eq!(entry.metadata["to_stage"], "s2");
    }

    #[test]
    fn kind_serde() {
        let json = serde_json::to_string(&TimelineEntryKind::EmailSent).unwrap();
        assert_eq!(json, "\"email_sent\"");
    }
}
