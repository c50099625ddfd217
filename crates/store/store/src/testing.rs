//! Backend conformance suites.
//!
//! Call these from a backend's test module with a fresh store instance
//! to verify it honors the contract the engine relies on.

use leadflow_core::{
    AutomationDefinition, AutomationId, EnrollmentStatus, EnrollmentUpdate, LeadId, NewEnrollment,
    StepAction, TenantId, Trigger, TriggerKind,
};

use crate::definitions::DefinitionStore;
use crate::enrollments::EnrollmentStore;
use crate::error::StoreError;

// Ids are generated fresh so the suite can run repeatedly against a
// durable backend without primary-key collisions.
fn test_definition(active: bool) -> AutomationDefinition {
    let def = AutomationDefinition::new(
        AutomationId::generate(),
        "conformance-org",
        "Conformance flow",
        Trigger::LeadCreated,
    )
    .with_step(StepAction::AddTag { tag: "t".into() })
    .with_step(StepAction::Stop);
    if active { def.activated() } else { def }
}

/// Run the full definition store conformance suite.
///
/// # Errors
///
/// Returns an error if any conformance check fails.
pub async fn run_definition_conformance_tests(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    test_get_active_missing(store).await?;
    test_insert_and_get_active(store).await?;
    test_inactive_hidden(store).await?;
    test_get_step_by_position(store).await?;
    test_list_active_by_trigger(store).await?;
    test_replace_steps(store).await?;
    test_set_active(store).await?;
    Ok(())
}

async fn test_get_active_missing(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    let found = store.get_active(&AutomationId::new("conf-missing")).await?;
    assert!(found.is_none(), "missing definition should be None");
    Ok(())
}

async fn test_insert_and_get_active(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    let def = test_definition(true);
    store.insert(def.clone()).await?;
    let found = store.get_active(&def.id).await?;
    let found = found.expect("active definition should be found");
    assert_eq!(found.name, "Conformance flow");
    assert_eq!(found.steps.len(), 2);
    Ok(())
}

async fn test_inactive_hidden(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    let def = test_definition(false);
    store.insert(def.clone()).await?;
    let found = store.get_active(&def.id).await?;
    assert!(found.is_none(), "inactive definition should read as absent");
    Ok(())
}

async fn test_get_step_by_position(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    let def = test_definition(true);
    store.insert(def.clone()).await?;

    let step = store.get_step(&def.id, 0).await?;
    assert_eq!(step.expect("step 0 exists").position, 0);

    let step = store.get_step(&def.id, 1).await?;
    assert_eq!(step.expect("step 1 exists").position, 1);

    let step = store.get_step(&def.id, 2).await?;
    assert!(step.is_none(), "position past the last step should be None");
    Ok(())
}

async fn test_list_active_by_trigger(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    let def = test_definition(true);
    let tenant = def.tenant.clone();
    store.insert(def.clone()).await?;

    let matches = store
        .list_active_by_trigger(&tenant, TriggerKind::LeadCreated)
        .await?;
    assert!(
        matches.iter().any(|d| d.id == def.id),
        "active lead_created definition should match"
    );

    let matches = store
        .list_active_by_trigger(&tenant, TriggerKind::Manual)
        .await?;
    assert!(
        !matches.iter().any(|d| d.id == def.id),
        "definition should not match a different trigger kind"
    );

    let matches = store
        .list_active_by_trigger(&TenantId::new("conf-other-org"), TriggerKind::LeadCreated)
        .await?;
    assert!(
        !matches.iter().any(|d| d.id == def.id),
        "definition should not leak across tenant scope"
    );
    Ok(())
}

async fn test_replace_steps(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    let def = test_definition(true);
    store.insert(def.clone()).await?;

    let replacement = AutomationDefinition::new(
        def.id.as_str(),
        def.tenant.as_str(),
        "replacement",
        Trigger::LeadCreated,
    )
    .with_step(StepAction::Stop);
    store.replace_steps(&def.id, replacement.steps).await?;

    let step = store.get_step(&def.id, 0).await?;
    assert_eq!(
        step.expect("replaced step 0 exists").action,
        StepAction::Stop
    );
    let step = store.get_step(&def.id, 1).await?;
    assert!(step.is_none(), "old step 1 should be gone after replace");
    Ok(())
}

async fn test_set_active(store: &dyn DefinitionStore) -> Result<(), StoreError> {
    let def = test_definition(true);
    store.insert(def.clone()).await?;

    store.set_active(&def.id, false).await?;
    assert!(store.get_active(&def.id).await?.is_none());

    store.set_active(&def.id, true).await?;
    assert!(store.get_active(&def.id).await?.is_some());
    Ok(())
}

/// Run the full enrollment store conformance suite.
///
/// # Errors
///
/// Returns an error if any conformance check fails.
pub async fn run_enrollment_conformance_tests(store: &dyn EnrollmentStore) -> Result<(), StoreError> {
    test_create_defaults(store).await?;
    test_get_missing(store).await?;
    test_find_active(store).await?;
    test_update_fields(store).await?;
    test_find_active_excludes_terminal(store).await?;
    Ok(())
}

fn new_enrollment() -> NewEnrollment {
    NewEnrollment {
        automation_id: AutomationId::generate(),
        lead_id: LeadId::generate(),
        tenant: TenantId::new("conformance-org"),
    }
}

async fn test_create_defaults(store: &dyn EnrollmentStore) -> Result<(), StoreError> {
    let enrollment = store.create(new_enrollment()).await?;
    assert_eq!(enrollment.current_step_position, 0);
    assert_eq!(enrollment.status, EnrollmentStatus::Active);
    assert!(enrollment.completed_at.is_none());
    assert!(enrollment.error_message.is_none());
    Ok(())
}

async fn test_get_missing(store: &dyn EnrollmentStore) -> Result<(), StoreError> {
    let found = store
        .get(&leadflow_core::EnrollmentId::new("conf-missing"))
        .await?;
    assert!(found.is_none());
    Ok(())
}

async fn test_find_active(store: &dyn EnrollmentStore) -> Result<(), StoreError> {
    let created = store.create(new_enrollment()).await?;
    let found = store
        .find_active(&created.automation_id, &created.lead_id)
        .await?;
    assert_eq!(found.expect("active enrollment found").id, created.id);
    Ok(())
}

async fn test_update_fields(store: &dyn EnrollmentStore) -> Result<(), StoreError> {
    let created = store.create(new_enrollment()).await?;

    store
        .update(&created.id, EnrollmentUpdate::advanced_to(1))
        .await?;
    let fetched = store.get(&created.id).await?.expect("exists");
    assert_eq!(fetched.current_step_position, 1);
    assert_eq!(fetched.status, EnrollmentStatus::Active);

    store
        .update(&created.id, EnrollmentUpdate::errored("boom"))
        .await?;
    let fetched = store.get(&created.id).await?.expect("exists");
    assert_eq!(fetched.status, EnrollmentStatus::Error);
    assert_eq!(fetched.error_message.as_deref(), Some("boom"));
    assert!(fetched.completed_at.is_some());
    Ok(())
}

async fn test_find_active_excludes_terminal(store: &dyn EnrollmentStore) -> Result<(), StoreError> {
    let created = store.create(new_enrollment()).await?;
    store
        .update(
            &created.id,
            EnrollmentUpdate::terminal(EnrollmentStatus::Completed),
        )
        .await?;
    let found = store
        .find_active(&created.automation_id, &created.lead_id)
        .await?;
    assert!(
        found.is_none(),
        "terminal enrollment must not count as active"
    );
    Ok(())
}
