pub mod action;
pub mod automation;
pub mod enrollment;
pub mod job;
pub mod lead;
pub mod template;
pub mod timeline;
pub mod trigger;
pub mod types;

pub use action::{AssignmentMethod, MessageChannel, StepAction, StepDirective};
pub use automation::{AutomationDefinition, AutomationStep, DefinitionError};
pub use enrollment::{Enrollment, EnrollmentStatus, EnrollmentUpdate, NewEnrollment};
pub use job::{Job, JobPayload};
pub use lead::{Lead, LeadStatus, LeadUpdate};
pub use template::{MessageTemplate, lead_variables, render_template};
pub use timeline::{TimelineEntry, TimelineEntryKind};
pub use trigger::{Trigger, TriggerKind};
pub use types::{
    AutomationId, EnrollmentId, LeadId, StageId, StepId, TemplateId, TenantId, UserId,
};
