//! Check run workflow tracking and reprint governance
//!
//! One current run may exist per profit year. Creation is serialized by a
//! database uniqueness constraint, and reprint consumption is a guarded
//! atomic update, because the service may run with multiple concurrent
//! instances and a duplicated run or over-issued reprint is a financial
//! control failure, not just a bug.

use chrono::{NaiveDate, Utc};
use profitshare_common::config::ReprintPolicy;
use profitshare_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::workflows;
use crate::models::{CheckRunWorkflow, RunState};

/// Persisted state machine governing one check run per profit year.
#[derive(Clone)]
pub struct CheckRunWorkflowService {
    pool: SqlitePool,
    policy: ReprintPolicy,
    expected_steps: u32,
}

impl CheckRunWorkflowService {
    pub fn new(pool: SqlitePool, policy: ReprintPolicy, expected_steps: u32) -> Self {
        Self {
            pool,
            policy,
            expected_steps,
        }
    }

    /// The current (non-superseded) run for a profit year.
    pub async fn get_current_run(&self, profit_year: i32) -> Result<CheckRunWorkflow> {
        match workflows::get_current(&self.pool, profit_year).await? {
            Some(workflow) => Ok(workflow),
            None => {
                warn!(profit_year, "No active check run workflow found");
                Err(Error::NotFound(format!(
                    "No active check run found for profit year {}",
                    profit_year
                )))
            }
        }
    }

    /// Create the workflow for a new check run.
    ///
    /// Exactly one of two concurrent starts for the same year succeeds;
    /// the loser receives `Error::Conflict` and must re-fetch the winner
    /// via `get_current_run`.
    pub async fn start_new_run(
        &self,
        profit_year: i32,
        check_run_date: NaiveDate,
        check_number: i32,
        user_name: &str,
    ) -> Result<CheckRunWorkflow> {
        info!(
            profit_year,
            check_number,
            %check_run_date,
            user = user_name,
            "Starting new check run workflow"
        );

        let workflow = CheckRunWorkflow {
            id: Uuid::new_v4(),
            profit_year,
            check_run_date,
            starting_check_number: check_number,
            reprint_count: 0,
            max_reprints: self.policy.max_reprints as i64,
            last_reprint_at: None,
            superseded: false,
            created_by: user_name.to_string(),
            created_at: Utc::now(),
            modified_by: None,
            modified_at: None,
            steps_completed: Vec::new(),
        };

        workflows::insert(&self.pool, &workflow).await?;

        info!(run_id = %workflow.id, profit_year, "Created check run workflow");
        Ok(workflow)
    }

    /// Record completion of an operational step. Idempotent per step:
    /// re-completing an already-completed step does not create a duplicate
    /// record or regress state.
    ///
    /// Returns true when the step was newly recorded.
    pub async fn record_step_completion(
        &self,
        run_id: Uuid,
        step_number: i32,
        user_name: &str,
    ) -> Result<bool> {
        self.require_run(run_id).await?;

        let recorded = workflows::insert_step(&self.pool, run_id, step_number, user_name).await?;

        if recorded {
            info!(%run_id, step_number, user = user_name, "Recorded step completion");
        } else {
            info!(%run_id, step_number, "Step already completed, no-op");
        }

        Ok(recorded)
    }

    /// Whether the run is still eligible for a reprint.
    ///
    /// Pure read, no side effect: callers check before acting, with
    /// `increment_reprint_count` as the separate effectful (and
    /// re-validating) step. Eligibility means the reprint count is below
    /// the run's limit and the run date is within the configured window of
    /// today.
    pub async fn can_reprint(&self, run_id: Uuid) -> Result<bool> {
        let workflow = self.require_run(run_id).await?;
        let today = Utc::now().date_naive();
        let eligible = Self::reprint_allowed(&workflow, self.policy.window_days, today);

        info!(
            %run_id,
            reprint_count = workflow.reprint_count,
            max_reprints = workflow.max_reprints,
            check_run_date = %workflow.check_run_date,
            %today,
            eligible,
            "Reprint eligibility check"
        );

        Ok(eligible)
    }

    /// Consume one reprint.
    ///
    /// Must follow a positive `can_reprint`, but defends against misuse:
    /// the policy is re-validated inside an atomic guarded update, so two
    /// simultaneous reprint attempts can never both succeed past the
    /// limit. Returns false when the policy denied the increment.
    pub async fn increment_reprint_count(&self, run_id: Uuid, user_name: &str) -> Result<bool> {
        self.require_run(run_id).await?;

        let today = Utc::now().date_naive();
        let applied = workflows::try_increment_reprint(
            &self.pool,
            run_id,
            user_name,
            self.policy.window_days,
            today,
        )
        .await?;

        if applied {
            info!(%run_id, user = user_name, "Incremented reprint count");
        } else {
            warn!(%run_id, user = user_name, "Reprint increment denied by policy");
        }

        Ok(applied)
    }

    /// Retire the run so a later attempt for the same year may start. The
    /// row is kept as the durable audit record.
    pub async fn supersede_run(&self, run_id: Uuid, user_name: &str) -> Result<bool> {
        self.require_run(run_id).await?;

        let applied = workflows::supersede(&self.pool, run_id, user_name).await?;
        if applied {
            info!(%run_id, user = user_name, "Superseded check run workflow");
        }

        Ok(applied)
    }

    /// Derived state of a run.
    pub fn run_state(&self, workflow: &CheckRunWorkflow) -> RunState {
        workflow.state(self.expected_steps)
    }

    pub fn expected_steps(&self) -> u32 {
        self.expected_steps
    }

    async fn require_run(&self, run_id: Uuid) -> Result<CheckRunWorkflow> {
        workflows::get_by_id(&self.pool, run_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Check run workflow {} not found", run_id)))
    }

    fn reprint_allowed(workflow: &CheckRunWorkflow, window_days: i64, today: NaiveDate) -> bool {
        if workflow.reprint_count >= workflow.max_reprints {
            return false;
        }
        let age_days = (today - workflow.check_run_date).num_days();
        (0..=window_days).contains(&age_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn workflow(reprints: i64, run_date: NaiveDate) -> CheckRunWorkflow {
        CheckRunWorkflow {
            id: Uuid::new_v4(),
            profit_year: 2024,
            check_run_date: run_date,
            starting_check_number: 10001,
            reprint_count: reprints,
            max_reprints: 2,
            last_reprint_at: None,
            superseded: false,
            created_by: "tester".to_string(),
            created_at: Utc::now(),
            modified_by: None,
            modified_at: None,
            steps_completed: Vec::new(),
        }
    }

    #[test]
    fn same_day_under_limit_is_eligible() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert!(CheckRunWorkflowService::reprint_allowed(&workflow(0, today), 0, today));
        assert!(CheckRunWorkflowService::reprint_allowed(&workflow(1, today), 0, today));
    }

    #[test]
    fn at_limit_is_ineligible() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert!(!CheckRunWorkflowService::reprint_allowed(&workflow(2, today), 0, today));
    }

    #[test]
    fn outside_window_is_ineligible() {
        let run_date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let next_day = NaiveDate::from_ymd_opt(2024, 12, 2).unwrap();
        assert!(!CheckRunWorkflowService::reprint_allowed(&workflow(0, run_date), 0, next_day));
    }

    #[test]
    fn window_days_extends_eligibility() {
        let run_date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let two_days_later = NaiveDate::from_ymd_opt(2024, 12, 3).unwrap();
        assert!(CheckRunWorkflowService::reprint_allowed(&workflow(0, run_date), 2, two_days_later));
        assert!(!CheckRunWorkflowService::reprint_allowed(&workflow(0, run_date), 1, two_days_later));
    }

    #[test]
    fn future_run_date_is_ineligible() {
        let run_date = NaiveDate::from_ymd_opt(2024, 12, 5).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        assert!(!CheckRunWorkflowService::reprint_allowed(&workflow(0, run_date), 0, today));
    }
}
