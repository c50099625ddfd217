//! End-to-end engine scenarios over the in-memory backends.

use std::sync::Arc;
use std::time::Duration;

use leadflow_core::{
    AutomationDefinition, AutomationId, EnrollmentStatus, EnrollmentUpdate, Job, JobPayload, Lead,
    LeadId, LeadStatus, MessageChannel, MessageTemplate, StageId, StepAction, TemplateId,
    TenantId, Trigger, TriggerKind, UserId,
};
use leadflow_email::MockBackend;
use leadflow_engine::AutomationEngine;
use leadflow_queue::{JobHandler, JobQueue};
use leadflow_queue_memory::MemoryQueue;
use leadflow_store_memory::MemoryStore;
use leadflow_store::{DefinitionStore, EnrollmentStore};
use leadflow_timeline::{InMemoryTimeline, TimelineSink};

const TENANT: &str = "org-1";

struct Harness {
    store: Arc<MemoryStore>,
    queue: Arc<MemoryQueue>,
    timeline: Arc<InMemoryTimeline>,
    messenger: Arc<MockBackend>,
    engine: Arc<AutomationEngine>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let timeline = Arc::new(InMemoryTimeline::new());
    let messenger = Arc::new(MockBackend::new());

    let engine = AutomationEngine::builder()
        .definitions(store.clone())
        .enrollments(store.clone())
        .leads(store.clone())
        .templates(store.clone())
        .timeline(timeline.clone())
        .messenger(messenger.clone())
        .queue(queue.clone())
        .build()
        .expect("engine builds");

    Harness {
        store,
        queue,
        timeline,
        messenger,
        engine: Arc::new(engine),
    }
}

impl Harness {
    fn tenant(&self) -> TenantId {
        TenantId::new(TENANT)
    }

    async fn seed_definition(&self, definition: AutomationDefinition) -> AutomationId {
        let id = definition.id.clone();
        self.store.insert(definition).await.expect("insert");
        id
    }

    fn seed_lead(&self, lead: Lead) -> LeadId {
        let id = lead.id.clone();
        self.store.insert_lead(lead);
        id
    }

    /// Process everything that is ready right now; leave delayed jobs
    /// parked.
    async fn process_ready(&self) {
        while let Some(delivery) = self.queue.dequeue().await.expect("dequeue") {
            match self.engine.handle(&delivery.job).await {
                Ok(()) => self.queue.ack(&delivery).await.expect("ack"),
                Err(e) => {
                    self.queue
                        .nack(&delivery, &e.to_string())
                        .await
                        .expect("nack");
                }
            }
        }
    }

    /// Run the queue to quiescence, waiting out delays (use with a
    /// paused clock).
    async fn drain(&self) {
        leadflow_queue::drain(
            self.queue.as_ref(),
            self.engine.as_ref(),
            Duration::from_secs(3600),
        )
        .await
        .expect("queue quiesces");
    }

    fn sole_enrollment(&self, automation_id: &AutomationId, lead_id: &LeadId) -> leadflow_core::Enrollment {
        let enrollments = self.store.enrollments_for(automation_id, lead_id);
        assert_eq!(enrollments.len(), 1, "expected exactly one enrollment");
        enrollments.into_iter().next().expect("one enrollment")
    }
}

fn lead(id: &str) -> Lead {
    Lead::new(id, TENANT, "Ada").with_email("ada@example.com")
}

#[tokio::test]
async fn happy_path_move_stage_tag_stop() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Onboard", Trigger::LeadCreated)
                .with_step(StepAction::MoveStage {
                    stage_id: Some(StageId::new("stage-b")),
                })
                .with_step(StepAction::AddTag { tag: "vip".into() })
                .with_step(StepAction::Stop)
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1").with_stage("stage-a"));

    let enqueued = h
        .engine
        .dispatch_trigger(TriggerKind::LeadCreated, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    assert_eq!(enqueued, 1);

    h.drain().await;

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.stage_id, Some(StageId::new("stage-b")));
    assert_eq!(lead.tags, vec!["vip"]);

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Stopped);
    assert_eq!(enrollment.current_step_position, 3);
    assert_eq!(h.queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn finite_automation_completes_after_all_steps() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Tagging", Trigger::Manual)
                .with_step(StepAction::AddTag { tag: "one".into() })
                .with_step(StepAction::AddTag { tag: "two".into() })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Completed);
    assert_eq!(enrollment.current_step_position, 2);
    assert!(enrollment.completed_at.is_some());

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.tags, vec!["one", "two"]);
}

#[tokio::test]
async fn stop_step_halts_and_enqueues_nothing() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Stopper", Trigger::Manual)
                .with_step(StepAction::AddTag { tag: "seen".into() })
                .with_step(StepAction::Stop)
                .with_step(StepAction::AddTag {
                    tag: "never".into(),
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Stopped);
    assert_eq!(enrollment.current_step_position, 2);
    assert_eq!(h.queue.pending().await.unwrap(), 0);

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.tags, vec!["seen"], "steps after stop never run");
}

#[tokio::test(start_paused = true)]
async fn wait_step_delays_by_exact_milliseconds() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Nurture", Trigger::Manual)
                .with_step(StepAction::Wait {
                    delay_minutes: Some(5),
                })
                .with_step(StepAction::AddTag {
                    tag: "followed-up".into(),
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.process_ready().await;

    // The wait parked exactly one job, delayed by exactly 5 minutes.
    let delayed = h.queue.delayed_jobs();
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].1, Duration::from_millis(300_000));
    let JobPayload::ExecuteStep { step_position, .. } = &delayed[0].0.payload else {
        panic!("expected an execute_step job");
    };
    assert_eq!(*step_position, 1);

    // The wait step itself mutated nothing.
    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert!(lead.tags.is_empty());

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Active);
    assert_eq!(enrollment.current_step_position, 1);
    assert!(enrollment.next_action_at.is_some());

    // After the delay elapses the automation finishes.
    h.drain().await;
    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.tags, vec!["followed-up"]);
    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Completed);
}

#[tokio::test]
async fn wait_without_delay_advances_immediately() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "NoopWait", Trigger::Manual)
                .with_step(StepAction::Wait {
                    delay_minutes: None,
                })
                .with_step(StepAction::AddTag { tag: "done".into() })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.process_ready().await;

    assert!(h.queue.delayed_jobs().is_empty());
    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.tags, vec!["done"]);
    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Completed);
}

#[tokio::test]
async fn missing_lead_errors_enrollment() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Ghost", Trigger::Manual)
                .with_step(StepAction::AddTag { tag: "t".into() })
                .activated(),
        )
        .await;
    let lead_id = LeadId::new("deleted-lead");

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Error);
    assert_eq!(enrollment.error_message.as_deref(), Some("lead not found"));
    assert_eq!(h.queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn trigger_with_no_matching_automations_is_a_no_op() {
    let h = harness();
    // One inactive definition and one with a different trigger.
    h.seed_definition(
        AutomationDefinition::new("a1", TENANT, "Inactive", Trigger::LeadCreated)
            .with_step(StepAction::Stop),
    )
    .await;
    h.seed_definition(
        AutomationDefinition::new("a2", TENANT, "Other", Trigger::Manual)
            .with_step(StepAction::Stop)
            .activated(),
    )
    .await;

    let enqueued = h
        .engine
        .dispatch_trigger(TriggerKind::LeadCreated, &LeadId::new("l1"), &h.tenant())
        .await
        .expect("dispatch");
    assert_eq!(enqueued, 0);
    assert_eq!(h.queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_enroll_jobs_create_one_enrollment() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Guarded", Trigger::LeadCreated)
                // A long wait keeps the first enrollment active while
                // the duplicate job lands.
                .with_step(StepAction::Wait {
                    delay_minutes: Some(60),
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    for _ in 0..2 {
        h.queue
            .enqueue(
                Job::new(JobPayload::EnrollLead {
                    tenant: h.tenant(),
                    automation_id: automation_id.clone(),
                    lead_id: lead_id.clone(),
                }),
                None,
            )
            .await
            .expect("enqueue");
    }
    h.process_ready().await;

    let enrollments = h.store.enrollments_for(&automation_id, &lead_id);
    assert_eq!(enrollments.len(), 1, "re-enrollment guard held");
}

#[tokio::test]
async fn tag_add_is_idempotent() {
    let h = harness();
    h.seed_definition(
        AutomationDefinition::new("a1", TENANT, "Tagger", Trigger::Manual)
            .with_step(StepAction::AddTag { tag: "vip".into() })
            .activated(),
    )
    .await;
    let mut seeded = lead("l1");
    seeded.tags = vec!["vip".into()];
    let lead_id = h.seed_lead(seeded);

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.tags, vec!["vip"], "no duplicate tag entries");
}

#[tokio::test]
async fn remove_tag_deletes_only_that_tag() {
    let h = harness();
    h.seed_definition(
        AutomationDefinition::new("a1", TENANT, "Untagger", Trigger::Manual)
            .with_step(StepAction::RemoveTag { tag: "cold".into() })
            .activated(),
    )
    .await;
    let mut seeded = lead("l1");
    seeded.tags = vec!["cold".into(), "warm".into()];
    let lead_id = h.seed_lead(seeded);

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.tags, vec!["warm"]);
}

#[tokio::test(start_paused = true)]
async fn stale_execute_step_job_is_dropped() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Stale", Trigger::Manual)
                .with_step(StepAction::AddTag { tag: "first".into() })
                .with_step(StepAction::Wait {
                    delay_minutes: Some(60),
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.process_ready().await;

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.current_step_position, 2);

    // Redeliver the already-executed step 0. The live position no
    // longer matches, so the handler must not run again.
    h.queue
        .enqueue(
            Job::new(JobPayload::ExecuteStep {
                tenant: h.tenant(),
                enrollment_id: enrollment.id.clone(),
                automation_id: automation_id.clone(),
                lead_id: lead_id.clone(),
                step_position: 0,
            }),
            None,
        )
        .await
        .expect("enqueue");
    h.process_ready().await;

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.tags, vec!["first"], "stale job did not re-run the handler");
    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.current_step_position, 2);
    assert_eq!(enrollment.status, EnrollmentStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_enrollment_drops_in_flight_jobs() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Cancelled", Trigger::Manual)
                .with_step(StepAction::Wait {
                    delay_minutes: Some(10),
                })
                .with_step(StepAction::AddTag {
                    tag: "never".into(),
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.process_ready().await;

    // An external actor pauses the automation for this lead.
    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    h.store
        .update(
            &enrollment.id,
            EnrollmentUpdate::terminal(EnrollmentStatus::Stopped),
        )
        .await
        .expect("update");

    // The delayed job fires, sees the terminal status, and no-ops.
    h.drain().await;
    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert!(lead.tags.is_empty());
    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Stopped);
}

#[tokio::test]
async fn send_message_renders_template_and_records_timeline() {
    let h = harness();
    h.store.insert_template(
        MessageTemplate::new(
            "tpl-1",
            TENANT,
            "Welcome",
            "Welcome {{first_name}}!",
            "<p>Hello {{first_name}} {{last_name}}</p>",
        )
        .with_body_text("Hello {{first_name}}"),
    );
    h.seed_definition(
        AutomationDefinition::new("a1", TENANT, "Welcomer", Trigger::LeadCreated)
            .with_step(StepAction::SendMessage {
                template_id: TemplateId::new("tpl-1"),
                channel: MessageChannel::Email,
            })
            .activated(),
    )
    .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::LeadCreated, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let sent = h.messenger.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ada@example.com");
    assert_eq!(sent[0].subject, "Welcome Ada!");
    assert_eq!(sent[0].html, "<p>Hello Ada </p>");
    assert_eq!(sent[0].text.as_deref(), Some("Hello Ada"));

    let entries = h.timeline.for_lead(&lead_id).await.expect("timeline");
    assert!(
        entries
            .iter()
            .any(|e| e.content == "Email sent: Welcome Ada!"),
        "send recorded on the timeline"
    );
}

#[tokio::test]
async fn send_message_without_address_errors_enrollment() {
    let h = harness();
    h.store.insert_template(MessageTemplate::new(
        "tpl-1", TENANT, "Welcome", "Hi", "<p>Hi</p>",
    ));
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Welcomer", Trigger::Manual)
                .with_step(StepAction::SendMessage {
                    template_id: TemplateId::new("tpl-1"),
                    channel: MessageChannel::Email,
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(Lead::new("l1", TENANT, "NoEmail"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Error);
    assert!(
        enrollment
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("no email address")),
        "error message names the missing address"
    );
    assert_eq!(h.messenger.sent_count(), 0);
}

#[tokio::test]
async fn send_failure_marks_enrollment_errored() {
    let h = harness();
    h.store.insert_template(MessageTemplate::new(
        "tpl-1", TENANT, "Welcome", "Hi", "<p>Hi</p>",
    ));
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Welcomer", Trigger::Manual)
                .with_step(StepAction::SendMessage {
                    template_id: TemplateId::new("tpl-1"),
                    channel: MessageChannel::Email,
                })
                .with_step(StepAction::AddTag {
                    tag: "after-send".into(),
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));
    h.messenger.fail_with("550 mailbox unavailable");

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Error);
    assert!(
        enrollment
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("550")),
    );

    // The step after the failure never ran.
    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert!(lead.tags.is_empty());
}

#[tokio::test]
async fn missing_template_errors_enrollment() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Welcomer", Trigger::Manual)
                .with_step(StepAction::SendMessage {
                    template_id: TemplateId::new("no-such-template"),
                    channel: MessageChannel::Email,
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Error);
    assert!(
        enrollment
            .error_message
            .as_deref()
            .is_some_and(|m| m.contains("template")),
    );
}

#[tokio::test]
async fn assign_user_and_change_status_mutate_lead() {
    let h = harness();
    h.seed_definition(
        AutomationDefinition::new("a1", TENANT, "Router", Trigger::Manual)
            .with_step(StepAction::AssignUser {
                user_id: Some(UserId::new("u-9")),
                method: leadflow_core::AssignmentMethod::Specific,
            })
            .with_step(StepAction::ChangeStatus {
                status: Some(LeadStatus::Contacted),
            })
            .activated(),
    )
    .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert_eq!(lead.assigned_user_id, Some(UserId::new("u-9")));
    assert_eq!(lead.status, LeadStatus::Contacted);

    let entries = h.timeline.for_lead(&lead_id).await.expect("timeline");
    assert!(entries.iter().any(|e| e.content == "Lead assigned via automation"));
    assert!(
        entries
            .iter()
            .any(|e| e.content == "Status changed to contacted via automation")
    );
}

#[tokio::test]
async fn assign_user_without_config_is_a_no_op() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Router", Trigger::Manual)
                .with_step(StepAction::AssignUser {
                    user_id: None,
                    method: leadflow_core::AssignmentMethod::RoundRobin,
                })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let lead = h.store.lead(&lead_id).expect("lead exists");
    assert!(lead.assigned_user_id.is_none());
    let enrollment = h.sole_enrollment(&automation_id, &lead_id);
    assert_eq!(enrollment.status, EnrollmentStatus::Completed);
}

#[tokio::test]
async fn enrollment_appends_timeline_entry() {
    let h = harness();
    h.seed_definition(
        AutomationDefinition::new("a1", TENANT, "Welcome flow", Trigger::LeadCreated)
            .with_step(StepAction::Stop)
            .activated(),
    )
    .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::LeadCreated, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let entries = h.timeline.for_lead(&lead_id).await.expect("timeline");
    assert!(
        entries
            .iter()
            .any(|e| e.content == "Enrolled in automation: Welcome flow")
    );
}

#[tokio::test]
async fn inactive_automation_rejects_enrollment() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Dormant", Trigger::Manual)
                .with_step(StepAction::Stop),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    // Direct enroll job for an inactive definition: silently dropped.
    h.queue
        .enqueue(
            Job::new(JobPayload::EnrollLead {
                tenant: h.tenant(),
                automation_id: automation_id.clone(),
                lead_id: lead_id.clone(),
            }),
            None,
        )
        .await
        .expect("enqueue");
    h.process_ready().await;

    assert!(h.store.enrollments_for(&automation_id, &lead_id).is_empty());
    assert_eq!(h.queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn completed_enrollment_allows_re_enrollment() {
    let h = harness();
    let automation_id = h
        .seed_definition(
            AutomationDefinition::new("a1", TENANT, "Repeatable", Trigger::Manual)
                .with_step(StepAction::AddTag { tag: "t".into() })
                .activated(),
        )
        .await;
    let lead_id = h.seed_lead(lead("l1"));

    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    // First run finished; the guard only blocks *active* enrollments.
    h.engine
        .dispatch_trigger(TriggerKind::Manual, &lead_id, &h.tenant())
        .await
        .expect("dispatch");
    h.drain().await;

    let enrollments = h.store.enrollments_for(&automation_id, &lead_id);
    assert_eq!(enrollments.len(), 2);
    assert!(
        enrollments
            .iter()
            .all(|e| e.status == EnrollmentStatus::Completed)
    );
}
