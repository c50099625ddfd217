use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use leadflow_core::{
    AutomationDefinition, AutomationId, AutomationStep, Enrollment, EnrollmentId,
    EnrollmentStatus, EnrollmentUpdate, Lead, LeadId, LeadStatus, LeadUpdate, MessageTemplate,
    NewEnrollment, StepAction, StepId, TemplateId, TenantId, Trigger, TriggerKind, UserId,
};
use leadflow_store::{
    DefinitionStore, EnrollmentStore, LeadStore, StoreError, TemplateStore,
};

use crate::config::PostgresConfig;
use crate::migrations;

/// Build `PgConnectOptions` from a [`PostgresConfig`], applying SSL
/// settings when configured.
pub(crate) fn build_connect_options(
    config: &PostgresConfig,
) -> Result<sqlx::postgres::PgConnectOptions, StoreError> {
    let mut options: sqlx::postgres::PgConnectOptions = config
        .url
        .parse()
        .map_err(|e: sqlx::Error| StoreError::Connection(e.to_string()))?;

    if let Some(ref mode) = config.ssl_mode {
        let ssl_mode = match mode.as_str() {
            "disable" => sqlx::postgres::PgSslMode::Disable,
            "prefer" => sqlx::postgres::PgSslMode::Prefer,
            "require" => sqlx::postgres::PgSslMode::Require,
            "verify-ca" => sqlx::postgres::PgSslMode::VerifyCa,
            "verify-full" => sqlx::postgres::PgSslMode::VerifyFull,
            other => {
                return Err(StoreError::Connection(format!("unknown ssl_mode: {other}")));
            }
        };
        options = options.ssl_mode(ssl_mode);
    }

    Ok(options)
}

/// PostgreSQL-backed implementation of every Leadflow store trait.
///
/// Uses `sqlx::PgPool` for connection pooling. Trigger and action
/// configs are stored as JSON text columns next to a `trigger_kind`
/// discriminant column used for dispatch matching.
pub struct PostgresStore {
    pool: PgPool,
    config: Arc<PostgresConfig>,
}

impl PostgresStore {
    /// Connect to `PostgreSQL`, create the pool, and run migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if pool creation fails, or
    /// [`StoreError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let connect_options = build_connect_options(&config)?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    /// Create a store from an existing pool. Runs migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if migrations fail.
    pub async fn from_pool(pool: PgPool, config: PostgresConfig) -> Result<Self, StoreError> {
        migrations::run_migrations(&pool, &config)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self {
            pool,
            config: Arc::new(config),
        })
    }

    async fn load_steps(&self, automation_id: &AutomationId) -> Result<Vec<AutomationStep>, StoreError> {
        let table = self.config.steps_table();
        let query = format!(
            "SELECT id, automation_id, tenant, position, action, created_at \
             FROM {table} WHERE automation_id = $1 ORDER BY position"
        );

        let rows: Vec<StepRow> = sqlx::query_as(&query)
            .bind(automation_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter().map(StepRow::into_step).collect()
    }

    async fn insert_steps(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        table: &str,
        steps: &[AutomationStep],
    ) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {table} (id, automation_id, tenant, position, action, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)"
        );
        for step in steps {
            let action = serde_json::to_string(&step.action)?;
            sqlx::query(&query)
                .bind(step.id.as_str())
                .bind(step.automation_id.as_str())
                .bind(step.tenant.as_str())
                .bind(i32::try_from(step.position).unwrap_or(i32::MAX))
                .bind(action)
                .bind(step.created_at)
                .execute(&mut **tx)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

type DefinitionRow = (
    String,                // id
    String,                // tenant
    String,                // name
    Option<String>,        // description
    bool,                  // active
    String,                // trigger_config
    DateTime<Utc>,         // created_at
    DateTime<Utc>,         // updated_at
);

fn definition_from_row(row: DefinitionRow, steps: Vec<AutomationStep>) -> Result<AutomationDefinition, StoreError> {
    let (id, tenant, name, description, active, trigger_config, created_at, updated_at) = row;
    let trigger: Trigger = serde_json::from_str(&trigger_config)?;
    Ok(AutomationDefinition {
        id: AutomationId::new(id),
        tenant: TenantId::new(tenant),
        name,
        description,
        active,
        trigger,
        steps,
        created_at,
        updated_at,
    })
}

#[derive(sqlx::FromRow)]
struct StepRow {
    id: String,
    automation_id: String,
    tenant: String,
    position: i32,
    action: String,
    created_at: DateTime<Utc>,
}

impl StepRow {
    fn into_step(self) -> Result<AutomationStep, StoreError> {
        let action: StepAction = serde_json::from_str(&self.action)?;
        Ok(AutomationStep {
            id: StepId::new(self.id),
            automation_id: AutomationId::new(self.automation_id),
            tenant: TenantId::new(self.tenant),
            position: u32::try_from(self.position).unwrap_or(0),
            action,
            created_at: self.created_at,
        })
    }
}

type EnrollmentRow = (
    String,                  // id
    String,                  // automation_id
    String,                  // lead_id
    String,                  // tenant
    i32,                     // current_step_position
    String,                  // status
    Option<DateTime<Utc>>,   // next_action_at
    DateTime<Utc>,           // started_at
    Option<DateTime<Utc>>,   // completed_at
    Option<String>,          // error_message
);

fn parse_enrollment_status(s: &str) -> Result<EnrollmentStatus, StoreError> {
    match s {
        "active" => Ok(EnrollmentStatus::Active),
        "completed" => Ok(EnrollmentStatus::Completed),
        "stopped" => Ok(EnrollmentStatus::Stopped),
        "error" => Ok(EnrollmentStatus::Error),
        other => Err(StoreError::Serialization(format!(
            "unknown enrollment status: {other}"
        ))),
    }
}

fn parse_lead_status(s: &str) -> Result<LeadStatus, StoreError> {
    match s {
        "new" => Ok(LeadStatus::New),
        "contacted" => Ok(LeadStatus::Contacted),
        "qualified" => Ok(LeadStatus::Qualified),
        "negotiating" => Ok(LeadStatus::Negotiating),
        "signed" => Ok(LeadStatus::Signed),
        "lost" => Ok(LeadStatus::Lost),
        "archived" => Ok(LeadStatus::Archived),
        other => Err(StoreError::Serialization(format!(
            "unknown lead status: {other}"
        ))),
    }
}

fn enrollment_from_row(row: EnrollmentRow) -> Result<Enrollment, StoreError> {
    let (
        id,
        automation_id,
        lead_id,
        tenant,
        current_step_position,
        status,
        next_action_at,
        started_at,
        completed_at,
        error_message,
    ) = row;
    Ok(Enrollment {
        id: EnrollmentId::new(id),
        automation_id: AutomationId::new(automation_id),
        lead_id: LeadId::new(lead_id),
        tenant: TenantId::new(tenant),
        current_step_position: u32::try_from(current_step_position).unwrap_or(0),
        status: parse_enrollment_status(&status)?,
        next_action_at,
        started_at,
        completed_at,
        error_message,
    })
}

#[async_trait]
impl DefinitionStore for PostgresStore {
    async fn get_active(
        &self,
        id: &AutomationId,
    ) -> Result<Option<AutomationDefinition>, StoreError> {
        let table = self.config.automations_table();
        let query = format!(
            "SELECT id, tenant, name, description, active, trigger_config, created_at, updated_at \
             FROM {table} WHERE id = $1 AND active"
        );

        let row: Option<DefinitionRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            Some(row) => {
                let steps = self.load_steps(id).await?;
                Ok(Some(definition_from_row(row, steps)?))
            }
            None => Ok(None),
        }
    }

    async fn get_step(
        &self,
        automation_id: &AutomationId,
        position: u32,
    ) -> Result<Option<AutomationStep>, StoreError> {
        let table = self.config.steps_table();
        let query = format!(
            "SELECT id, automation_id, tenant, position, action, created_at \
             FROM {table} WHERE automation_id = $1 AND position = $2"
        );

        let row: Option<StepRow> = sqlx::query_as(&query)
            .bind(automation_id.as_str())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(StepRow::into_step).transpose()
    }

    async fn list_active_by_trigger(
        &self,
        tenant: &TenantId,
        kind: TriggerKind,
    ) -> Result<Vec<AutomationDefinition>, StoreError> {
        let table = self.config.automations_table();
        let query = format!(
            "SELECT id, tenant, name, description, active, trigger_config, created_at, updated_at \
             FROM {table} WHERE tenant = $1 AND trigger_kind = $2 AND active"
        );

        let rows: Vec<DefinitionRow> = sqlx::query_as(&query)
            .bind(tenant.as_str())
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut definitions = Vec::with_capacity(rows.len());
        for row in rows {
            let automation_id = AutomationId::new(row.0.clone());
            let steps = self.load_steps(&automation_id).await?;
            definitions.push(definition_from_row(row, steps)?);
        }
        Ok(definitions)
    }

    async fn insert(&self, definition: AutomationDefinition) -> Result<(), StoreError> {
        let automations = self.config.automations_table();
        let steps_table = self.config.steps_table();
        let trigger_config = serde_json::to_string(&definition.trigger)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let query = format!(
            "INSERT INTO {automations} \
             (id, tenant, name, description, active, trigger_kind, trigger_config, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
        );
        sqlx::query(&query)
            .bind(definition.id.as_str())
            .bind(definition.tenant.as_str())
            .bind(&definition.name)
            .bind(&definition.description)
            .bind(definition.active)
            .bind(definition.trigger.kind().as_str())
            .bind(trigger_config)
            .bind(definition.created_at)
            .bind(definition.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Self::insert_steps(&mut tx, &steps_table, &definition.steps).await?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn replace_steps(
        &self,
        automation_id: &AutomationId,
        steps: Vec<AutomationStep>,
    ) -> Result<(), StoreError> {
        let steps_table = self.config.steps_table();
        let automations = self.config.automations_table();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let delete = format!("DELETE FROM {steps_table} WHERE automation_id = $1");
        sqlx::query(&delete)
            .bind(automation_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Self::insert_steps(&mut tx, &steps_table, &steps).await?;

        let touch = format!("UPDATE {automations} SET updated_at = NOW() WHERE id = $1");
        sqlx::query(&touch)
            .bind(automation_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn set_active(&self, id: &AutomationId, active: bool) -> Result<(), StoreError> {
        let table = self.config.automations_table();
        let query = format!("UPDATE {table} SET active = $2, updated_at = NOW() WHERE id = $1");

        let result = sqlx::query(&query)
            .bind(id.as_str())
            .bind(active)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("automation {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for PostgresStore {
    async fn create(&self, new: NewEnrollment) -> Result<Enrollment, StoreError> {
        let table = self.config.enrollments_table();
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

        let query = format!(
            "INSERT INTO {table} \
             (id, automation_id, lead_id, tenant, current_step_position, status, started_at) \
             VALUES ($1, $2, $3, $4, 0, 'active', $5)"
        );
        sqlx::query(&query)
            .bind(enrollment.id.as_str())
            .bind(enrollment.automation_id.as_str())
            .bind(enrollment.lead_id.as_str())
            .bind(enrollment.tenant.as_str())
            .bind(enrollment.started_at)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(enrollment)
    }

    async fn get(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, StoreError> {
        let table = self.config.enrollments_table();
        let query = format!(
            "SELECT id, automation_id, lead_id, tenant, current_step_position, status, \
                    next_action_at, started_at, completed_at, error_message \
             FROM {table} WHERE id = $1"
        );

        let row: Option<EnrollmentRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(enrollment_from_row).transpose()
    }

    async fn find_active(
        &self,
        automation_id: &AutomationId,
        lead_id: &LeadId,
    ) -> Result<Option<Enrollment>, StoreError> {
        let table = self.config.enrollments_table();
        let query = format!(
            "SELECT id, automation_id, lead_id, tenant, current_step_position, status, \
                    next_action_at, started_at, completed_at, error_message \
             FROM {table} \
             WHERE automation_id = $1 AND lead_id = $2 AND status = 'active' \
             LIMIT 1"
        );

        let row: Option<EnrollmentRow> = sqlx::query_as(&query)
            .bind(automation_id.as_str())
            .bind(lead_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(enrollment_from_row).transpose()
    }

    async fn update(&self, id: &EnrollmentId, update: EnrollmentUpdate) -> Result<(), StoreError> {
        let table = self.config.enrollments_table();

        // next_action_at distinguishes "leave" (None) from "clear"
        // (Some(None)); a flag parameter carries that through SQL.
        let set_next_action = update.next_action_at.is_some();
        let next_action_value = update.next_action_at.flatten();

        let query = format!(
            "UPDATE {table} SET \
                current_step_position = COALESCE($2, current_step_position), \
                status = COALESCE($3, status), \
                next_action_at = CASE WHEN $4 THEN $5 ELSE next_action_at END, \
                completed_at = COALESCE($6, completed_at), \
                error_message = COALESCE($7, error_message) \
             WHERE id = $1"
        );

        let result = sqlx::query(&query)
            .bind(id.as_str())
            .bind(
                update
                    .current_step_position
                    .map(|p| i32::try_from(p).unwrap_or(i32::MAX)),
            )
            .bind(update.status.map(EnrollmentStatus::as_str))
            .bind(set_next_action)
            .bind(next_action_value)
            .bind(update.completed_at)
            .bind(update.error_message)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("enrollment {id}")));
        }
        Ok(())
    }
}

type LeadRow = (
    String,                // id
    String,                // tenant
    String,                // first_name
    Option<String>,        // last_name
    Option<String>,        // email
    Option<String>,        // phone
    String,                // status
    Option<String>,        // stage_id
    Option<String>,        // assigned_user_id
    Vec<String>,           // tags
    DateTime<Utc>,         // created_at
    DateTime<Utc>,         // updated_at
);

fn lead_from_row(row: LeadRow) -> Result<Lead, StoreError> {
    let (
        id,
        tenant,
        first_name,
        last_name,
        email,
        phone,
        status,
        stage_id,
        assigned_user_id,
        tags,
        created_at,
        updated_at,
    ) = row;
    Ok(Lead {
        id: LeadId::new(id),
        tenant: TenantId::new(tenant),
        first_name,
        last_name,
        email,
        phone,
        status: parse_lead_status(&status)?,
        stage_id: stage_id.map(leadflow_core::StageId::new),
        assigned_user_id: assigned_user_id.map(UserId::new),
        tags,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl LeadStore for PostgresStore {
    async fn get(&self, id: &LeadId) -> Result<Option<Lead>, StoreError> {
        let table = self.config.leads_table();
        let query = format!(
            "SELECT id, tenant, first_name, last_name, email, phone, status, stage_id, \
                    assigned_user_id, tags, created_at, updated_at \
             FROM {table} WHERE id = $1"
        );

        let row: Option<LeadRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        row.map(lead_from_row).transpose()
    }

    async fn update(&self, id: &LeadId, update: LeadUpdate) -> Result<(), StoreError> {
        let table = self.config.leads_table();
        let query = format!(
            "UPDATE {table} SET \
                status = COALESCE($2, status), \
                stage_id = COALESCE($3, stage_id), \
                assigned_user_id = COALESCE($4, assigned_user_id), \
                tags = COALESCE($5, tags), \
                updated_at = NOW() \
             WHERE id = $1"
        );

        let result = sqlx::query(&query)
            .bind(id.as_str())
            .bind(update.status.map(LeadStatus::as_str))
            .bind(update.stage_id.as_ref().map(|s| s.as_str().to_owned()))
            .bind(
                update
                    .assigned_user_id
                    .as_ref()
                    .map(|u| u.as_str().to_owned()),
            )
            .bind(update.tags)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("lead {id}")));
        }
        Ok(())
    }
}

type TemplateRow = (
    String,                // id
    String,                // tenant
    String,                // name
    String,                // subject
    String,                // body_html
    Option<String>,        // body_text
    bool,                  // active
    DateTime<Utc>,         // created_at
    DateTime<Utc>,         // updated_at
);

#[async_trait]
impl TemplateStore for PostgresStore {
    async fn get(&self, id: &TemplateId) -> Result<Option<MessageTemplate>, StoreError> {
        let table = self.config.templates_table();
        let query = format!(
            "SELECT id, tenant, name, subject, body_html, body_text, active, created_at, updated_at \
             FROM {table} WHERE id = $1"
        );

        let row: Option<TemplateRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.map(
            |(id, tenant, name, subject, body_html, body_text, active, created_at, updated_at)| {
                MessageTemplate {
                    id: TemplateId::new(id),
                    tenant: TenantId::new(tenant),
                    name,
                    subject,
                    body_html,
                    body_text,
                    active,
                    created_at,
                    updated_at,
                }
            },
        ))
    }
}
