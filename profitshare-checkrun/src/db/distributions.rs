//! Read-only access to upstream distribution rows
//!
//! The distribution table is owned by the selection subsystem; this
//! pipeline only ever reads already-computed amounts from it.

use profitshare_common::Result;
use rust_decimal::Decimal;
use sqlx::{Row, SqlitePool};

use super::parse_decimal;

/// An approved distribution as this pipeline sees it.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub id: i64,
    pub profit_year: i32,
    pub ssn: i64,
    pub employee_name: String,
    pub payee_name: Option<String>,
    pub badge_number: String,
    pub gross_amount: Decimal,
    pub federal_tax_amount: Decimal,
    pub state_tax_amount: Decimal,
}

/// Fetch distributions by explicit id list, ascending id order.
///
/// Ids absent from the result are the caller's error to surface; a missing
/// check in a numbered run is a control gap, never a silent skip.
pub async fn fetch_by_ids(pool: &SqlitePool, ids: &[i64]) -> Result<Vec<Distribution>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        r#"
        SELECT id, profit_year, ssn, employee_name, payee_name, badge_number,
               gross_amount, federal_tax_amount, state_tax_amount
        FROM distributions
        WHERE id IN ({})
        ORDER BY id
        "#,
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await?;

    rows.into_iter()
        .map(|row| {
            let gross: String = row.get("gross_amount");
            let federal: String = row.get("federal_tax_amount");
            let state: String = row.get("state_tax_amount");
            Ok(Distribution {
                id: row.get("id"),
                profit_year: row.get("profit_year"),
                ssn: row.get("ssn"),
                employee_name: row.get("employee_name"),
                payee_name: row.get("payee_name"),
                badge_number: row.get("badge_number"),
                gross_amount: parse_decimal("gross_amount", &gross)?,
                federal_tax_amount: parse_decimal("federal_tax_amount", &federal)?,
                state_tax_amount: parse_decimal("state_tax_amount", &state)?,
            })
        })
        .collect()
}
