//! Database initialization
//!
//! Creates the connection pool and the check production schema on first
//! run. Table creation is idempotent, so startup is safe to repeat.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// Initialize an in-memory database. Test and tooling use only.
pub async fn init_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

async fn configure_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers with one writer; multiple service
    // instances share this database.
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Create all check production tables (idempotent).
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_check_run_workflows_table(pool).await?;
    create_check_run_steps_table(pool).await?;
    create_profit_share_checks_table(pool).await?;
    create_file_transfer_audits_table(pool).await?;
    create_distributions_table(pool).await?;

    Ok(())
}

async fn create_check_run_workflows_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS check_run_workflows (
            id TEXT PRIMARY KEY,
            profit_year INTEGER NOT NULL,
            check_run_date TEXT NOT NULL,
            starting_check_number INTEGER NOT NULL,
            reprint_count INTEGER NOT NULL DEFAULT 0,
            max_reprints INTEGER NOT NULL,
            last_reprint_at TEXT,
            superseded INTEGER NOT NULL DEFAULT 0,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            modified_by TEXT,
            modified_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Persistence-level guarantee that at most one current run exists per
    // profit year. Concurrent StartNewRun races are decided here, not in
    // application memory.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS ux_check_run_workflows_active
        ON check_run_workflows (profit_year)
        WHERE superseded = 0
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_check_run_steps_table(pool: &SqlitePool) -> Result<()> {
    // Composite primary key makes step completion idempotent: re-completing
    // a step is INSERT OR IGNORE, never a duplicate row.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS check_run_steps (
            run_id TEXT NOT NULL,
            step_number INTEGER NOT NULL,
            completed_by TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            PRIMARY KEY (run_id, step_number),
            FOREIGN KEY (run_id) REFERENCES check_run_workflows(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_profit_share_checks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profit_share_checks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            distribution_id INTEGER NOT NULL,
            check_number INTEGER NOT NULL,
            badge_number TEXT NOT NULL,
            payable_name TEXT NOT NULL,
            amount TEXT NOT NULL,
            check_date TEXT NOT NULL,
            check_run_date TEXT NOT NULL,
            is_voided INTEGER NOT NULL DEFAULT 0,
            void_date TEXT,
            printed_at TEXT NOT NULL,
            FOREIGN KEY (run_id) REFERENCES check_run_workflows(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS ix_profit_share_checks_run_date
        ON profit_share_checks (check_run_date)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_file_transfer_audits_table(pool: &SqlitePool) -> Result<()> {
    // System-of-record for "did this file actually leave the building".
    // Rows are written once and never updated.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS file_transfer_audits (
            id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            file_name TEXT NOT NULL,
            destination TEXT NOT NULL,
            user_name TEXT,
            run_id TEXT,
            is_success INTEGER NOT NULL,
            error_message TEXT,
            file_size INTEGER NOT NULL,
            transfer_duration_ms INTEGER NOT NULL,
            content BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_distributions_table(pool: &SqlitePool) -> Result<()> {
    // Owned by the upstream distribution subsystem; the pipeline only reads
    // from it. Created here so the pipeline is testable end-to-end.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS distributions (
            id INTEGER PRIMARY KEY,
            profit_year INTEGER NOT NULL,
            ssn INTEGER NOT NULL,
            employee_name TEXT NOT NULL,
            payee_name TEXT,
            badge_number TEXT NOT NULL,
            gross_amount TEXT NOT NULL,
            federal_tax_amount TEXT NOT NULL,
            state_tax_amount TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
