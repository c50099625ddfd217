use sqlx::PgPool;

use crate::config::PostgresConfig;

/// Run database migrations, creating required tables if they do not exist.
///
/// # Errors
///
/// Returns a [`sqlx::Error`] if any DDL statement fails.
pub async fn run_migrations(pool: &PgPool, config: &PostgresConfig) -> Result<(), sqlx::Error> {
    let automations = config.automations_table();
    let steps = config.steps_table();
    let enrollments = config.enrollments_table();
    let leads = config.leads_table();
    let templates = config.templates_table();
    let prefix = &config.table_prefix;

    let create_automations = format!(
        "CREATE TABLE IF NOT EXISTS {automations} (
            id TEXT PRIMARY KEY,
            tenant TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            active BOOLEAN NOT NULL DEFAULT FALSE,
            trigger_kind TEXT NOT NULL,
            trigger_config TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
    );

    // Dispatch matching scans (tenant, active, trigger_kind).
    let create_automations_idx = format!(
        "CREATE INDEX IF NOT EXISTS {prefix}automations_trigger_idx \
         ON {automations} (tenant, trigger_kind) WHERE active"
    );

    let create_steps = format!(
        "CREATE TABLE IF NOT EXISTS {steps} (
            id TEXT PRIMARY KEY,
            automation_id TEXT NOT NULL,
            tenant TEXT NOT NULL,
            position INTEGER NOT NULL,
            action TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (automation_id, position)
        )"
    );

    let create_enrollments = format!(
        "CREATE TABLE IF NOT EXISTS {enrollments} (
            id TEXT PRIMARY KEY,
            automation_id TEXT NOT NULL,
            lead_id TEXT NOT NULL,
            tenant TEXT NOT NULL,
            current_step_position INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'active',
            next_action_at TIMESTAMPTZ,
            started_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            completed_at TIMESTAMPTZ,
            error_message TEXT
        )"
    );

    // The re-enrollment guard reads through this.
    let create_enrollments_idx = format!(
        "CREATE INDEX IF NOT EXISTS {prefix}enrollments_active_idx \
         ON {enrollments} (automation_id, lead_id) WHERE status = 'active'"
    );

    let create_leads = format!(
        "CREATE TABLE IF NOT EXISTS {leads} (
            id TEXT PRIMARY KEY,
            tenant TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            status TEXT NOT NULL DEFAULT 'new',
            stage_id TEXT,
            assigned_user_id TEXT,
            tags TEXT[] NOT NULL DEFAULT '{{}}',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
    );

    let create_templates = format!(
        "CREATE TABLE IF NOT EXISTS {templates} (
            id TEXT PRIMARY KEY,
            tenant TEXT NOT NULL,
            name TEXT NOT NULL,
            subject TEXT NOT NULL,
            body_html TEXT NOT NULL,
            body_text TEXT,
            active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
    );

    sqlx::query(&create_automations).execute(pool).await?;
    sqlx::query(&create_automations_idx).execute(pool).await?;
    sqlx::query(&create_steps).execute(pool).await?;
    sqlx::query(&create_enrollments).execute(pool).await?;
    sqlx::query(&create_enrollments_idx).execute(pool).await?;
    sqlx::query(&create_leads).execute(pool).await?;
    sqlx::query(&create_templates).execute(pool).await?;

    Ok(())
}
