//! Check tracking record persistence

use chrono::NaiveDate;
use profitshare_common::Result;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::ProfitShareCheck;

use super::{parse_date, parse_decimal};

/// One positive pay reconciliation row.
#[derive(Debug, Clone)]
pub struct PositivePayRow {
    pub check_number: i32,
    pub amount: Decimal,
    pub issue_date: NaiveDate,
    /// Badge number, the payee reference the bank cross-checks against.
    pub payee_reference: String,
}

/// Insert the tracking records for a rendered run in one transaction, so a
/// partially recorded check batch can never be observed.
pub async fn insert_many(pool: &SqlitePool, checks: &[ProfitShareCheck]) -> Result<()> {
    let mut tx = pool.begin().await?;

    for check in checks {
        sqlx::query(
            r#"
            INSERT INTO profit_share_checks (
                run_id, distribution_id, check_number, badge_number, payable_name,
                amount, check_date, check_run_date, is_voided, void_date, printed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(check.run_id.to_string())
        .bind(check.distribution_id)
        .bind(check.check_number)
        .bind(&check.badge_number)
        .bind(&check.payable_name)
        .bind(check.amount.to_string())
        .bind(check.check_date.format("%Y-%m-%d").to_string())
        .bind(check.check_run_date.format("%Y-%m-%d").to_string())
        .bind(check.is_voided as i64)
        .bind(check.void_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(check.printed_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Void the run's not-yet-voided checks ahead of a reprint.
///
/// Returns the number of checks voided.
pub async fn void_active_for_run(
    pool: &SqlitePool,
    run_id: Uuid,
    void_date: NaiveDate,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE profit_share_checks
        SET is_voided = 1, void_date = ?
        WHERE run_id = ? AND is_voided = 0
        "#,
    )
    .bind(void_date.format("%Y-%m-%d").to_string())
    .bind(run_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// All non-voided checks whose run date falls within the profit year,
/// ordered by check number.
pub async fn positive_pay_rows(pool: &SqlitePool, profit_year: i32) -> Result<Vec<PositivePayRow>> {
    let rows = sqlx::query(
        r#"
        SELECT check_number, amount, check_run_date, badge_number
        FROM profit_share_checks
        WHERE is_voided = 0
          AND check_run_date >= ?
          AND check_run_date <= ?
        ORDER BY check_number
        "#,
    )
    .bind(format!("{}-01-01", profit_year))
    .bind(format!("{}-12-31", profit_year))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let amount: String = row.get("amount");
            let issue_date: String = row.get("check_run_date");
            Ok(PositivePayRow {
                check_number: row.get("check_number"),
                amount: parse_decimal("amount", &amount)?,
                issue_date: parse_date("check_run_date", &issue_date)?,
                payee_reference: row.get("badge_number"),
            })
        })
        .collect()
}

/// Load a run's tracking records, ordered by check number.
pub async fn for_run(pool: &SqlitePool, run_id: Uuid) -> Result<Vec<ProfitShareCheck>> {
    let rows = sqlx::query(
        r#"
        SELECT run_id, distribution_id, check_number, badge_number, payable_name,
               amount, check_date, check_run_date, is_voided, void_date, printed_at
        FROM profit_share_checks
        WHERE run_id = ?
        ORDER BY check_number
        "#,
    )
    .bind(run_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let amount: String = row.get("amount");
            let check_date: String = row.get("check_date");
            let check_run_date: String = row.get("check_run_date");
            let void_date: Option<String> = row.get("void_date");
            let printed_at: String = row.get("printed_at");
            Ok(ProfitShareCheck {
                run_id,
                distribution_id: row.get("distribution_id"),
                check_number: row.get("check_number"),
                badge_number: row.get("badge_number"),
                payable_name: row.get("payable_name"),
                amount: parse_decimal("amount", &amount)?,
                check_date: parse_date("check_date", &check_date)?,
                check_run_date: parse_date("check_run_date", &check_run_date)?,
                is_voided: row.get::<i64, _>("is_voided") != 0,
                void_date: void_date.map(|d| parse_date("void_date", &d)).transpose()?,
                printed_at: super::parse_timestamp("printed_at", &printed_at)?,
            })
        })
        .collect()
}
