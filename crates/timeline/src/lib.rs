//! Lead activity timeline.
//!
//! The engine appends here best-effort: a sink failure is logged by the
//! caller and never aborts a step.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use leadflow_core::{LeadId, TimelineEntry};

/// Errors surfaced by timeline backends.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Failed to reach the backend.
    #[error("timeline connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed the append.
    #[error("timeline backend error: {0}")]
    Backend(String),
}

/// Trait for timeline storage backends.
///
/// Implementations must be `Send + Sync` to be shared across async
/// tasks.
#[async_trait]
pub trait TimelineSink: Send + Sync {
    /// Persist a timeline entry.
    async fn append(&self, entry: TimelineEntry) -> Result<(), TimelineError>;

    /// Entries for one lead, oldest first.
    async fn for_lead(&self, lead_id: &LeadId) -> Result<Vec<TimelineEntry>, TimelineError>;
}

/// In-memory timeline, an append-only buffer guarded by a [`Mutex`].
///
/// Suitable for tests and development; production deployments back the
/// sink with the CRM's relational timeline table.
#[derive(Debug, Default)]
pub struct InMemoryTimeline {
    entries: Mutex<Vec<TimelineEntry>>,
}

impl InMemoryTimeline {
    /// Create an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entries across all leads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("timeline mutex poisoned").len()
    }

    /// True if no entries have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TimelineSink for InMemoryTimeline {
    async fn append(&self, entry: TimelineEntry) -> Result<(), TimelineError> {
        self.entries
            .lock()
            .expect("timeline mutex poisoned")
            .push(entry);
        Ok(())
    }

    async fn for_lead(&self, lead_id: &LeadId) -> Result<Vec<TimelineEntry>, TimelineError> {
        Ok(self
            .entries
            .lock()
            .expect("timeline mutex poisoned")
            .iter()
            .filter(|e| &e.lead_id == lead_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use leadflow_core::TimelineEntryKind;

    use super::*;

    #[tokio::test]
    async fn append_and_query_by_lead() {
        let timeline = InMemoryTimeline::new();
        timeline
            .append(TimelineEntry::new(
                "org",
                "l1",
                TimelineEntryKind::Automation,
                "Enrolled in automation: Welcome",
            ))
            .await
            .unwrap();
        timeline
            .append(TimelineEntry::new(
                "org",
                "l2",
                TimelineEntryKind::Note,
                "other lead",
            ))
            .await
            .unwrap();

        let entries = timeline.for_lead(&LeadId::new("l1")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, TimelineEntryKind::Automation);
        assert_eq!(timeline.len(), 2);
    }

    #[tokio::test]
    async fn empty_timeline() {
        let timeline = InMemoryTimeline::new();
        assert!(timeline.is_empty());
        let entries = timeline.for_lead(&LeadId::new("ghost")).await.unwrap();
        assert!(entries.is_empty());
    }
}
