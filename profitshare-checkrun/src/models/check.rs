//! Check rendering and tracking types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical output target for a check run print file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrinterType {
    /// Plain document output (preview, PDF conversion)
    Standard,
    /// Continuous-feed Xerox printer requiring inline DJDE directives
    XeroxDjde,
}

impl PrinterType {
    /// Whether this target consumes inline printer control directives.
    pub fn is_directive_aware(self) -> bool {
        matches!(self, PrinterType::XeroxDjde)
    }
}

/// Request to produce a check run print file.
///
/// The distribution id list is explicit; selection of which distributions
/// to pay is an upstream responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRunStartRequest {
    pub profit_year: i32,
    pub check_run_date: NaiveDate,
    pub starting_check_number: i32,
    pub distribution_ids: Vec<i64>,
    pub printer_type: PrinterType,
    pub user_name: String,
    pub is_reprint: bool,
}

/// Render input for one check.
#[derive(Debug, Clone)]
pub struct CheckData {
    pub check_number: i32,
    pub amount: Decimal,
    pub recipient_name: String,
    /// Raw 9-digit SSN; masked at render time.
    pub ssn: String,
    pub badge_number: String,
    pub issue_date: NaiveDate,
}

/// Check tracking record: one row per check produced within a run.
///
/// Never mutated after creation except by a reprint voiding the run's
/// previously printed checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitShareCheck {
    pub run_id: Uuid,
    pub distribution_id: i64,
    pub check_number: i32,
    pub badge_number: String,
    pub payable_name: String,
    pub amount: Decimal,
    pub check_date: NaiveDate,
    pub check_run_date: NaiveDate,
    pub is_voided: bool,
    pub void_date: Option<NaiveDate>,
    pub printed_at: DateTime<Utc>,
}

/// The rendered print file, returned to the caller and transferred
/// externally byte-for-byte. Not persisted as an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRunPrintFileResult {
    pub run_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub content: String,
    pub check_count: usize,
}
