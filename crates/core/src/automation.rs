use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::StepAction;
use crate::trigger::Trigger;
use crate::types::{AutomationId, StepId, TenantId};

/// A named, triggerable, ordered sequence of steps applied to leads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationDefinition {
    pub id: AutomationId,
    pub tenant: TenantId,
    pub name: String,
    pub description: Option<String>,
    /// Inactive definitions never match a trigger and reject enrollment.
    pub active: bool,
    pub trigger: Trigger,
    /// Steps ordered by position. Positions must form a dense 0-based
    /// sequence, unique within the definition.
    pub steps: Vec<AutomationStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One step of an automation definition.
///
/// Steps are immutable once created except via whole-definition replace
/// (delete-all + bulk-insert). Enrollments reference steps by position,
/// not identity, so a replace changes what a position means for leads
/// already past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationStep {
    pub id: StepId,
    pub automation_id: AutomationId,
    pub tenant: TenantId,
    pub position: u32,
    pub action: StepAction,
    pub created_at: DateTime<Utc>,
}

/// Violations of the definition-level invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    /// Step positions are not the dense sequence `0..step_count`.
    #[error("step positions must be dense and 0-based: found {found} at index {index}")]
    SparsePositions { index: usize, found: u32 },

    /// Two steps share a position.
    #[error("duplicate step position {position}")]
    DuplicatePosition { position: u32 },

    /// The definition name is empty.
    #[error("automation name must not be empty")]
    EmptyName,
}

impl AutomationDefinition {
    /// Create an inactive definition with no steps.
    #[must_use]
    pub fn new(
        id: impl Into<AutomationId>,
        tenant: impl Into<TenantId>,
        name: impl Into<String>,
        trigger: Trigger,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            tenant: tenant.into(),
            name: name.into(),
            description: None,
            active: false,
            trigger,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a step at the next dense position.
    #[must_use]
    pub fn with_step(mut self, action: StepAction) -> Self {
        let position = u32::try_from(self.steps.len()).unwrap_or(u32::MAX);
        self.steps.push(AutomationStep {
            id: StepId::generate(),
            automation_id: self.id.clone(),
            tenant: self.tenant.clone(),
            position,
            action,
            created_at: Utc::now(),
        });
        self
    }

    /// Mark the definition active.
    #[must_use]
    pub fn activated(mut self) -> Self {
        self.active = true;
        self
    }

    /// Number of steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Check the definition-level invariants: non-empty name, and step
    /// positions forming a dense 0-based sequence with no duplicates.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }

        let mut positions: Vec<u32> = self.steps.iter().map(|s| s.position).collect();
        positions.sort_unstable();
        for window in positions.windows(2) {
            if window[0] == window[1] {
                return Err(DefinitionError::DuplicatePosition {
                    position: window[0],
                });
            }
        }
        for (index, &position) in positions.iter().enumerate() {
            let expected = u32::try_from(index).unwrap_or(u32::MAX);
            if position != expected {
                return Err(DefinitionError::SparsePositions {
                    index,
                    found: position,
                });
            }
        }
        Ok(())
    }
}
