//! Shared test utilities for the check production pipeline

use profitshare_common::config::{CheckRunConfig, ReprintPolicy};
use profitshare_common::db::init::init_database;
use profitshare_checkrun::services::{CheckRunWorkflowService, MicrFormatterRegistry};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;
use tempfile::TempDir;

/// Initialize tracing output for a test binary. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Create a temp-dir SQLite database with the pipeline schema applied.
///
/// Returns (TempDir, SqlitePool); the TempDir must stay alive for the
/// duration of the test.
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let db_path = temp_dir.path().join("test_checks.db");
    let pool = init_database(&db_path).await.expect("init database");
    (temp_dir, pool)
}

/// Configuration used by most tests: the production routing number with a
/// known account number.
pub fn test_config() -> CheckRunConfig {
    let mut config = CheckRunConfig::default();
    config.bank.account_number = "0375495656".to_string();
    config
}

pub fn workflow_service(pool: &SqlitePool) -> CheckRunWorkflowService {
    workflow_service_with_policy(pool, ReprintPolicy::default())
}

pub fn workflow_service_with_policy(
    pool: &SqlitePool,
    policy: ReprintPolicy,
) -> CheckRunWorkflowService {
    CheckRunWorkflowService::new(pool.clone(), policy, test_config().workflow.expected_steps)
}

pub fn micr_registry(config: &CheckRunConfig) -> MicrFormatterRegistry {
    MicrFormatterRegistry::for_bank(&config.bank.routing_number, &config.bank.account_number)
        .expect("configured bank account")
}

/// Seed one distribution row the pipeline can resolve.
#[allow(clippy::too_many_arguments)]
pub async fn seed_distribution(
    pool: &SqlitePool,
    id: i64,
    profit_year: i32,
    ssn: i64,
    employee_name: &str,
    payee_name: Option<&str>,
    badge_number: &str,
    gross: &str,
    federal: &str,
    state: &str,
) {
    sqlx::query(
        r#"
        INSERT INTO distributions (
            id, profit_year, ssn, employee_name, payee_name, badge_number,
            gross_amount, federal_tax_amount, state_tax_amount
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(profit_year)
    .bind(ssn)
    .bind(employee_name)
    .bind(payee_name)
    .bind(badge_number)
    .bind(Decimal::from_str(gross).unwrap().to_string())
    .bind(Decimal::from_str(federal).unwrap().to_string())
    .bind(Decimal::from_str(state).unwrap().to_string())
    .execute(pool)
    .await
    .expect("seed distribution");
}
