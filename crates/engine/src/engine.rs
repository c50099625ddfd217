use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use leadflow_core::{Job, JobPayload, TimelineEntry};
use leadflow_email::MessageBackend;
use leadflow_queue::{JobHandler, JobQueue};
use leadflow_store::{DefinitionStore, EnrollmentStore, LeadStore, TemplateStore};
use leadflow_timeline::TimelineSink;

use crate::error::EngineError;

/// The automation engine: trigger dispatch, enrollment, and step
/// execution over explicitly injected collaborators.
///
/// Construct with [`EngineBuilder`]. The engine holds no mutable
/// in-process state; every job execution reads current persisted
/// state, acts, and writes new persisted state, so any number of
/// worker processes can run the same engine against shared backends.
pub struct AutomationEngine {
    pub(crate) definitions: Arc<dyn DefinitionStore>,
    pub(crate) enrollments: Arc<dyn EnrollmentStore>,
    pub(crate) leads: Arc<dyn LeadStore>,
    pub(crate) templates: Arc<dyn TemplateStore>,
    pub(crate) timeline: Arc<dyn TimelineSink>,
    pub(crate) messenger: Arc<dyn MessageBackend>,
    pub(crate) queue: Arc<dyn JobQueue>,
}

impl AutomationEngine {
    /// Start building an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Append a timeline entry, best-effort: a sink failure is logged
    /// and never aborts the step that produced it.
    pub(crate) async fn record_timeline(&self, entry: TimelineEntry) {
        if let Err(e) = self.timeline.append(entry).await {
            warn!(error = %e, "timeline append failed, continuing");
        }
    }
}

#[async_trait]
impl JobHandler for AutomationEngine {
    async fn handle(&self, job: &Job) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match &job.payload {
            JobPayload::ProcessTrigger {
                tenant,
                lead_id,
                trigger,
            } => {
                self.dispatch_trigger(*trigger, lead_id, tenant).await?;
            }
            JobPayload::EnrollLead {
                tenant,
                automation_id,
                lead_id,
            } => {
                self.enroll(automation_id, lead_id, tenant).await?;
            }
            JobPayload::ExecuteStep {
                tenant,
                enrollment_id,
                automation_id,
                lead_id,
                step_position,
            } => {
                self.execute_step(tenant, enrollment_id, automation_id, lead_id, *step_position)
                    .await?;
            }
        }
        Ok(())
    }
}

/// Fluent builder for constructing an [`AutomationEngine`].
///
/// Every collaborator is required: the engine takes explicit handles
/// rather than reaching for process-global connections, so lifecycle
/// (connect at startup, drain and close at shutdown) stays with the
/// caller.
pub struct EngineBuilder {
    definitions: Option<Arc<dyn DefinitionStore>>,
    enrollments: Option<Arc<dyn EnrollmentStore>>,
    leads: Option<Arc<dyn LeadStore>>,
    templates: Option<Arc<dyn TemplateStore>>,
    timeline: Option<Arc<dyn TimelineSink>>,
    messenger: Option<Arc<dyn MessageBackend>>,
    queue: Option<Arc<dyn JobQueue>>,
}

impl EngineBuilder {
    /// Create a new builder with no collaborators set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            definitions: None,
            enrollments: None,
            leads: None,
            templates: None,
            timeline: None,
            messenger: None,
            queue: None,
        }
    }

    /// Set the automation definition store.
    #[must_use]
    pub fn definitions(mut self, store: Arc<dyn DefinitionStore>) -> Self {
        self.definitions = Some(store);
        self
    }

    /// Set the enrollment store.
    #[must_use]
    pub fn enrollments(mut self, store: Arc<dyn EnrollmentStore>) -> Self {
        self.enrollments = Some(store);
        self
    }

    /// Set the lead store.
    #[must_use]
    pub fn leads(mut self, store: Arc<dyn LeadStore>) -> Self {
        self.leads = Some(store);
        self
    }

    /// Set the template store.
    #[must_use]
    pub fn templates(mut self, store: Arc<dyn TemplateStore>) -> Self {
        self.templates = Some(store);
        self
    }

    /// Set the timeline sink.
    #[must_use]
    pub fn timeline(mut self, sink: Arc<dyn TimelineSink>) -> Self {
        self.timeline = Some(sink);
        self
    }

    /// Set the outbound message backend.
    #[must_use]
    pub fn messenger(mut self, backend: Arc<dyn MessageBackend>) -> Self {
        self.messenger = Some(backend);
        self
    }

    /// Set the job queue handle.
    #[must_use]
    pub fn queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Consume the builder and produce a configured [`AutomationEngine`].
    ///
    /// Returns [`EngineError::Configuration`] if any collaborator has
    /// not been set.
    pub fn build(self) -> Result<AutomationEngine, EngineError> {
        fn require<T>(value: Option<T>, name: &str) -> Result<T, EngineError> {
            value.ok_or_else(|| EngineError::Configuration(format!("{name} is required")))
        }

        Ok(AutomationEngine {
            definitions: require(self.definitions, "definition store")?,
            enrollments: require(self.enrollments, "enrollment store")?,
            leads: require(self.leads, "lead store")?,
            templates: require(self.templates, "template store")?,
            timeline: require(self.timeline, "timeline sink")?,
            messenger: require(self.messenger, "message backend")?,
            queue: require(self.queue, "job queue")?,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
