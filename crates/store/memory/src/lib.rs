//! In-memory storage backend.
//!
//! Backs all four store traits with [`DashMap`]s. Suitable for tests
//! and development; nothing survives process restart.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use leadflow_core::{
    AutomationDefinition, AutomationId, AutomationStep, Enrollment, EnrollmentId,
    EnrollmentStatus, EnrollmentUpdate, Lead, LeadId, LeadUpdate, MessageTemplate, NewEnrollment,
    TemplateId, TenantId, TriggerKind,
};
use leadflow_store::{
    DefinitionStore, EnrollmentStore, LeadStore, StoreError, TemplateStore,
};

/// DashMap-backed implementation of every Leadflow store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    definitions: DashMap<AutomationId, AutomationDefinition>,
    enrollments: DashMap<EnrollmentId, Enrollment>,
    leads: DashMap<LeadId, Lead>,
    templates: DashMap<TemplateId, MessageTemplate>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a lead (test/dev fixture path; leads are externally owned
    /// in production).
    pub fn insert_lead(&self, lead: Lead) {
        self.leads.insert(lead.id.clone(), lead);
    }

    /// Seed a template.
    pub fn insert_template(&self, template: MessageTemplate) {
        self.templates.insert(template.id.clone(), template);
    }

    /// Snapshot a lead by id, bypassing the trait (test convenience).
    #[must_use]
    pub fn lead(&self, id: &LeadId) -> Option<Lead> {
        self.leads.get(id).map(|l| l.clone())
    }

    /// Snapshot an enrollment by id (test convenience).
    #[must_use]
    pub fn enrollment(&self, id: &EnrollmentId) -> Option<Enrollment> {
        self.enrollments.get(id).map(|e| e.clone())
    }

    /// All enrollments for an (automation, lead) pair (test convenience).
    #[must_use]
    pub fn enrollments_for(&self, automation_id: &AutomationId, lead_id: &LeadId) -> Vec<Enrollment> {
        self.enrollments
            .iter()
            .filter(|e| &e.automation_id == automation_id && &e.lead_id == lead_id)
            .map(|e| e.clone())
            .collect()
    }
}

#[async_trait]
impl DefinitionStore for MemoryStore {
    async fn get_active(
        &self,
        id: &AutomationId,
    ) -> Result<Option<AutomationDefinition>, StoreError> {
        Ok(self
            .definitions
            .get(id)
            .filter(|d| d.active)
            .map(|d| d.clone()))
    }

    async fn get_step(
        &self,
        automation_id: &AutomationId,
        position: u32,
    ) -> Result<Option<AutomationStep>, StoreError> {
        Ok(self.definitions.get(automation_id).and_then(|d| {
            d.steps.iter().find(|s| s.position == position).cloned()
        }))
    }

    async fn list_active_by_trigger(
        &self,
        tenant: &TenantId,
        kind: TriggerKind,
    ) -> Result<Vec<AutomationDefinition>, StoreError> {
        Ok(self
            .definitions
            .iter()
            .filter(|d| d.active && &d.tenant == tenant && d.trigger.kind() == kind)
            .map(|d| d.clone())
            .collect())
    }

    async fn insert(&self, definition: AutomationDefinition) -> Result<(), StoreError> {
        self.definitions.insert(definition.id.clone(), definition);
        Ok(())
    }

    async fn replace_steps(
        &self,
        automation_id: &AutomationId,
        steps: Vec<AutomationStep>,
    ) -> Result<(), StoreError> {
        let mut definition = self
            .definitions
            .get_mut(automation_id)
            .ok_or_else(|| StoreError::NotFound(format!("automation {automation_id}")))?;
        definition.steps = steps;
        definition.updated_at = Utc::now();
        Ok(())
    }

    async fn set_active(&self, id: &AutomationId, active: bool) -> Result<(), StoreError> {
        let mut definition = self
            .definitions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("automation {id}")))?;
        definition.active = active;
        definition.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn create(&self, new: NewEnrollment) -> Result<Enrollment, StoreError> {
        let enrollment = Enrollment {
            id: EnrollmentId::generate(),
            automation_id: new.automation_id,
            lead_id: new.lead_id,
            tenant: new.tenant,
            current_step_position: 0,
            status: EnrollmentStatus::Active,
            next_action_at: None,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
        };
        self.enrollments
            .insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    async fn get(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, StoreError> {
        Ok(self.enrollments.get(id).map(|e| e.clone()))
    }

    async fn find_active(
        &self,
        automation_id: &AutomationId,
        lead_id: &LeadId,
    ) -> Result<Option<Enrollment>, StoreError> {
        Ok(self
            .enrollments
            .iter()
            .find(|e| {
                &e.automation_id == automation_id
                    && &e.lead_id == lead_id
                    && e.status == EnrollmentStatus::Active
            })
            .map(|e| e.clone()))
    }

    async fn update(&self, id: &EnrollmentId, update: EnrollmentUpdate) -> Result<(), StoreError> {
        let mut enrollment = self
            .enrollments
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("enrollment {id}")))?;

        if let Some(position) = update.current_step_position {
            enrollment.current_step_position = position;
        }
        if let Some(status) = update.status {
            enrollment.status = status;
        }
        if let Some(next_action_at) = update.next_action_at {
            enrollment.next_action_at = next_action_at;
        }
        if let Some(completed_at) = update.completed_at {
            enrollment.completed_at = Some(completed_at);
        }
        if let Some(message) = update.error_message {
            enrollment.error_message = Some(message);
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn get(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        Ok(self.leads.get(id).map(|l| l.clone()))
    }

    async fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError> {
        let mut lead = self
            .leads
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("lead {id}")))?;

        if let Some(status) = update.status {
            lead.status = status;
        }
        if let Some(stage_id) = update.stage_id {
            lead.stage_id = Some(stage_id);
        }
        if let Some(user_id) = update.assigned_user_id {
            lead.assigned_user_id = Some(user_id);
        }
        if let Some(tags) = update.tags {
            lead.tags = tags;
        }
        lead.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn get(&self, id: &TemplateId) -> Result<Option<MessageTemplate>, StoreError> {
        Ok(self.templates.get(id).map(|t| t.clone()))
    }
}
