//! File transfer audit record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per transfer attempt outcome (not per retry sub-attempt).
///
/// Written exclusively by the file transfer service, for success and
/// failure alike; immutable once written. Retains the transferred bytes so
/// an auditor can reconstruct exactly what left the building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileTransferAudit {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub file_name: String,
    pub destination: String,
    /// Populated from the caller's context, not by the transfer service.
    pub user_name: Option<String>,
    pub run_id: Option<Uuid>,
    pub is_success: bool,
    pub error_message: Option<String>,
    pub file_size: i64,
    pub transfer_duration_ms: i64,
    #[serde(skip)]
    pub content: Vec<u8>,
}
