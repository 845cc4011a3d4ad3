//! File transfer audit persistence
//!
//! Audit rows are written once and never updated; there is deliberately no
//! update or delete surface here.

use profitshare_common::Result;
use sqlx::SqlitePool;

use crate::models::FileTransferAudit;

/// Record a transfer outcome.
pub async fn insert(pool: &SqlitePool, audit: &FileTransferAudit) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO file_transfer_audits (
            id, timestamp, file_name, destination, user_name, run_id,
            is_success, error_message, file_size, transfer_duration_ms, content
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(audit.id.to_string())
    .bind(audit.timestamp.to_rfc3339())
    .bind(&audit.file_name)
    .bind(&audit.destination)
    .bind(&audit.user_name)
    .bind(audit.run_id.map(|id| id.to_string()))
    .bind(audit.is_success as i64)
    .bind(&audit.error_message)
    .bind(audit.file_size)
    .bind(audit.transfer_duration_ms)
    .bind(&audit.content)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count audit rows for a file name. Test and diagnostic use.
pub async fn count_for_file(pool: &SqlitePool, file_name: &str) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM file_transfer_audits WHERE file_name = ?")
            .bind(file_name)
            .fetch_one(pool)
            .await?;

    Ok(count)
}
