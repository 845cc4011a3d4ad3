//! File transfer with bounded retry and a durable audit trail
//!
//! A silently failed transfer of a check file is a financial-control
//! failure, so every transfer outcome, success or failure, leaves exactly
//! one audit row carrying the transferred bytes. The transport protocol
//! (SFTP/FTP) lives behind a trait; the shipped transport writes to the
//! outbound directory convention that the transfer agent sweeps.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use profitshare_common::{Error, Result};
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::audits;
use crate::models::FileTransferAudit;

/// Maximum delivery attempts per transfer. Attempts beyond the first apply
/// exponential backoff of 2^attempt seconds.
const MAX_ATTEMPTS: u32 = 3;

/// The wire seam: performs one whole-file delivery attempt.
///
/// An attempt either lands the complete file at the destination or fails
/// without leaving a partial file behind, so retries never produce an
/// ambiguous remote state.
#[async_trait::async_trait]
pub trait FileTransport: Send + Sync {
    async fn send(&self, destination: &str, file_name: &str, content: &[u8]) -> Result<()>;
}

/// Writes files into the outbound directory swept by the transfer agent.
pub struct OutboxTransport;

#[async_trait::async_trait]
impl FileTransport for OutboxTransport {
    async fn send(&self, destination: &str, file_name: &str, content: &[u8]) -> Result<()> {
        let dir = Path::new(destination);
        tokio::fs::create_dir_all(dir).await?;

        // Write to a temp name, then rename: the sweep never sees a
        // half-written file.
        let temp_path = dir.join(format!(".{}.part", file_name));
        let final_path = dir.join(file_name);
        tokio::fs::write(&temp_path, content).await?;
        tokio::fs::rename(&temp_path, &final_path).await?;

        Ok(())
    }
}

/// Delivers generated files to external systems and records the audit row.
pub struct FileTransferService<T: FileTransport> {
    pool: SqlitePool,
    transport: T,
}

impl<T: FileTransport> FileTransferService<T> {
    pub fn new(pool: SqlitePool, transport: T) -> Self {
        Self { pool, transport }
    }

    /// Transfer a file, retrying transient failures up to three attempts
    /// with exponential backoff.
    ///
    /// The audit row is written for success and failure alike; `user_name`
    /// and `run_id` come from the caller's context. Cancellation is
    /// honored between attempts, never mid-attempt.
    pub async fn transfer(
        &self,
        content: &[u8],
        destination: &str,
        file_name: &str,
        user_name: Option<&str>,
        run_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> Result<FileTransferAudit> {
        let started = Instant::now();
        let file_size = content.len() as i64;

        let mut attempt = 1u32;
        let outcome: std::result::Result<(), Error> = loop {
            info!(
                file_name,
                destination,
                file_size,
                attempt,
                max_attempts = MAX_ATTEMPTS,
                "Transferring file"
            );

            match self.transport.send(destination, file_name, content).await {
                Ok(()) => break Ok(()),
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    warn!(
                        file_name,
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "Transfer attempt failed, retrying after backoff"
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            break Err(Error::Transfer(format!(
                                "Transfer of {} cancelled before retry",
                                file_name
                            )));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }

                    attempt += 1;
                }
                Err(err) => break Err(err),
            }
        };

        let duration_ms = started.elapsed().as_millis() as i64;
        let error_message = outcome.as_ref().err().map(|e| e.to_string());

        let audit = FileTransferAudit {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            file_name: file_name.to_string(),
            destination: destination.to_string(),
            user_name: user_name.map(str::to_string),
            run_id,
            is_success: outcome.is_ok(),
            error_message: error_message.clone(),
            file_size,
            transfer_duration_ms: duration_ms,
            content: content.to_vec(),
        };

        // A failed audit insert must not mask the transfer outcome, but it
        // is loud: the audit trail is the system of record.
        if let Err(audit_err) = audits::insert(&self.pool, &audit).await {
            error!(
                file_name,
                error = %audit_err,
                "Failed to record file transfer audit"
            );
        }

        match outcome {
            Ok(()) => {
                info!(
                    file_name,
                    destination,
                    file_size,
                    duration_ms,
                    "File transfer completed successfully"
                );
                Ok(audit)
            }
            Err(err) => {
                error!(
                    file_name,
                    destination,
                    attempts = attempt,
                    error = %err,
                    "File transfer failed"
                );
                Err(Error::Transfer(format!(
                    "Failed to transfer file {}: {}",
                    file_name, err
                )))
            }
        }
    }
}
