//! Positive pay reconciliation file generation
//!
//! The bank cross-checks presented checks against this file; a check we
//! never issued then fails to clear. Read-only and idempotent: two calls
//! for the same year with no intervening check activity produce identical
//! bytes.

use profitshare_common::config::CheckRunConfig;
use profitshare_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

use crate::db::checks;

/// Generates the positive pay CSV for a profit year.
pub struct PositivePayService {
    pool: SqlitePool,
    account_number: String,
}

impl PositivePayService {
    /// Fails with a configuration error when the bank account number is
    /// not configured; an unattributed positive pay file is useless to the
    /// bank.
    pub fn new(pool: SqlitePool, config: &CheckRunConfig) -> Result<Self> {
        let account_number = config.require_account_number()?.to_string();
        Ok(Self {
            pool,
            account_number,
        })
    }

    /// Render the CSV for all non-voided checks whose run date falls in
    /// the given profit year.
    ///
    /// Zero qualifying checks is a caller-visible failure, not an empty
    /// success: an empty reconciliation file for an active year almost
    /// always means an upstream data problem.
    pub async fn generate(&self, profit_year: i32) -> Result<Vec<u8>> {
        let rows = checks::positive_pay_rows(&self.pool, profit_year).await?;

        if rows.is_empty() {
            return Err(Error::Validation(format!(
                "No positive pay records found for profit year {}",
                profit_year
            )));
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(["CheckNumber", "Amount", "IssueDate", "AccountNumber", "Payee"])
            .map_err(|e| Error::Internal(format!("Failed to write positive pay header: {}", e)))?;

        for row in &rows {
            writer
                .write_record([
                    row.check_number.to_string(),
                    format!("{:.2}", row.amount),
                    row.issue_date.format("%Y-%m-%d").to_string(),
                    self.account_number.clone(),
                    row.payee_reference.clone(),
                ])
                .map_err(|e| Error::Internal(format!("Failed to write positive pay row: {}", e)))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Internal(format!("Failed to finish positive pay file: {}", e)))?;

        info!(profit_year, records = rows.len(), "Generated positive pay file");

        Ok(bytes)
    }
}
