//! Check run workflow persistence
//!
//! The workflow table is the durable audit record of every run; rows are
//! marked superseded rather than deleted. Concurrency-sensitive updates
//! (run creation, reprint increments) are decided by the database, not by
//! application-level checks, because multiple service instances share the
//! store.

use chrono::{NaiveDate, Utc};
use profitshare_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{CheckRunWorkflow, StepCompletion};

use super::{parse_date, parse_timestamp};

/// Insert a new workflow row.
///
/// The partial unique index on (profit_year) WHERE superseded = 0 decides
/// races between concurrent run starts: exactly one insert wins, the loser
/// surfaces `Error::Conflict`.
pub async fn insert(pool: &SqlitePool, workflow: &CheckRunWorkflow) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO check_run_workflows (
            id, profit_year, check_run_date, starting_check_number,
            reprint_count, max_reprints, superseded, created_by, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(workflow.id.to_string())
    .bind(workflow.profit_year)
    .bind(workflow.check_run_date.format("%Y-%m-%d").to_string())
    .bind(workflow.starting_check_number)
    .bind(workflow.reprint_count)
    .bind(workflow.max_reprints)
    .bind(&workflow.created_by)
    .bind(workflow.created_at.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(err) if is_unique_violation(&err) => Err(Error::Conflict(format!(
            "An active check run already exists for profit year {}",
            workflow.profit_year
        ))),
        Err(err) => Err(err.into()),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

/// Load the current (non-superseded) workflow for a profit year.
pub async fn get_current(pool: &SqlitePool, profit_year: i32) -> Result<Option<CheckRunWorkflow>> {
    let row = sqlx::query(
        r#"
        SELECT id, profit_year, check_run_date, starting_check_number,
               reprint_count, max_reprints, last_reprint_at, superseded,
               created_by, created_at, modified_by, modified_at
        FROM check_run_workflows
        WHERE profit_year = ? AND superseded = 0
        "#,
    )
    .bind(profit_year)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_workflow(pool, row).await?)),
        None => Ok(None),
    }
}

/// Load a workflow by run id.
pub async fn get_by_id(pool: &SqlitePool, run_id: Uuid) -> Result<Option<CheckRunWorkflow>> {
    let row = sqlx::query(
        r#"
        SELECT id, profit_year, check_run_date, starting_check_number,
               reprint_count, max_reprints, last_reprint_at, superseded,
               created_by, created_at, modified_by, modified_at
        FROM check_run_workflows
        WHERE id = ?
        "#,
    )
    .bind(run_id.to_string())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(map_workflow(pool, row).await?)),
        None => Ok(None),
    }
}

async fn map_workflow(pool: &SqlitePool, row: sqlx::sqlite::SqliteRow) -> Result<CheckRunWorkflow> {
    let id_str: String = row.get("id");
    let id = Uuid::parse_str(&id_str)
        .map_err(|e| Error::Internal(format!("Failed to parse workflow id '{}': {}", id_str, e)))?;

    let check_run_date: String = row.get("check_run_date");
    let created_at: String = row.get("created_at");
    let last_reprint_at: Option<String> = row.get("last_reprint_at");
    let modified_at: Option<String> = row.get("modified_at");

    let steps_completed = load_steps(pool, id).await?;

    Ok(CheckRunWorkflow {
        id,
        profit_year: row.get("profit_year"),
        check_run_date: parse_date("check_run_date", &check_run_date)?,
        starting_check_number: row.get("starting_check_number"),
        reprint_count: row.get("reprint_count"),
        max_reprints: row.get("max_reprints"),
        last_reprint_at: last_reprint_at
            .map(|s| parse_timestamp("last_reprint_at", &s))
            .transpose()?,
        superseded: row.get::<i64, _>("superseded") != 0,
        created_by: row.get("created_by"),
        created_at: parse_timestamp("created_at", &created_at)?,
        modified_by: row.get("modified_by"),
        modified_at: modified_at
            .map(|s| parse_timestamp("modified_at", &s))
            .transpose()?,
        steps_completed,
    })
}

/// Load step completions for a run, ordered by step number.
pub async fn load_steps(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<StepCompletion>> {
    let rows = sqlx::query(
        r#"
        SELECT step_number, completed_by, completed_at
        FROM check_run_steps
        WHERE run_id = ?
        ORDER BY step_number
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let completed_at: String = row.get("completed_at");
            Ok(StepCompletion {
                step_number: row.get("step_number"),
                completed_by: row.get("completed_by"),
                completed_at: parse_timestamp("completed_at", &completed_at)?,
            })
        })
        .collect()
}

/// Record a step completion. Idempotent: the composite primary key turns a
/// re-completion into a no-op instead of a duplicate row.
///
/// Returns true when the step was newly recorded.
pub async fn insert_step(
    pool: &SqlitePool,
    run_id: Uuid,
    step_number: i32,
    user_name: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO check_run_steps (run_id, step_number, completed_by, completed_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(run_id.to_string())
    .bind(step_number)
    .bind(user_name)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Atomically consume one reprint if policy still allows it.
///
/// The guard re-validates the reprint count and date window inside the
/// UPDATE itself, so N concurrent reprint attempts against a run with
/// limit M yield exactly M successes regardless of interleaving. Returns
/// true when the increment applied.
pub async fn try_increment_reprint(
    pool: &SqlitePool,
    run_id: Uuid,
    user_name: &str,
    window_days: i64,
    today: NaiveDate,
) -> Result<bool> {
    let earliest_run_date = today - chrono::Duration::days(window_days);
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE check_run_workflows
        SET reprint_count = reprint_count + 1,
            last_reprint_at = ?,
            modified_by = ?,
            modified_at = ?
        WHERE id = ?
          AND superseded = 0
          AND reprint_count < max_reprints
          AND check_run_date >= ?
          AND check_run_date <= ?
        "#,
    )
    .bind(&now)
    .bind(user_name)
    .bind(&now)
    .bind(run_id.to_string())
    .bind(earliest_run_date.format("%Y-%m-%d").to_string())
    .bind(today.format("%Y-%m-%d").to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Reset the starting check number when a reprint re-issues the run.
pub async fn set_starting_check_number(
    pool: &SqlitePool,
    run_id: Uuid,
    check_number: i32,
    user_name: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE check_run_workflows
        SET starting_check_number = ?, modified_by = ?, modified_at = ?
        WHERE id = ?
        "#,
    )
    .bind(check_number)
    .bind(user_name)
    .bind(Utc::now().to_rfc3339())
    .bind(run_id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Retire a run so a later attempt for the same year may start.
///
/// Returns true when the run existed and was still current.
pub async fn supersede(pool: &SqlitePool, run_id: Uuid, user_name: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE check_run_workflows
        SET superseded = 1, modified_by = ?, modified_at = ?
        WHERE id = ? AND superseded = 0
        "#,
    )
    .bind(user_name)
    .bind(Utc::now().to_rfc3339())
    .bind(run_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
