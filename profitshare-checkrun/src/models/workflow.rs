//! Check run workflow state
//!
//! One workflow row exists per (profit year, run attempt). The run's state
//! is never stored as a flag; it is derived from the recorded step
//! completions, so "is this run done" is a pure query over facts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived progression of a check run.
///
/// `NoRun` (no workflow exists for the year) is represented at the query
/// surface as a `NotFound` error rather than a variant here; a value of
/// this type always describes an existing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    /// Workflow created, zero steps completed
    Started,
    /// At least one, but not all, steps completed
    InProgress,
    /// All expected steps completed
    Complete,
}

/// A recorded step completion. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompletion {
    pub step_number: i32,
    pub completed_by: String,
    pub completed_at: DateTime<Utc>,
}

/// Durable record of one check run. Never physically deleted; a run that
/// is retired is marked superseded so a later attempt may start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRunWorkflow {
    pub id: Uuid,
    pub profit_year: i32,
    pub check_run_date: NaiveDate,
    pub starting_check_number: i32,
    pub reprint_count: i64,
    pub max_reprints: i64,
    pub last_reprint_at: Option<DateTime<Utc>>,
    pub superseded: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub modified_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Step completions recorded so far, ordered by step number.
    pub steps_completed: Vec<StepCompletion>,
}

impl CheckRunWorkflow {
    /// Derive the run's state from recorded step completions.
    pub fn state(&self, expected_steps: u32) -> RunState {
        let completed = self.steps_completed.len() as u32;
        if completed == 0 {
            RunState::Started
        } else if completed < expected_steps {
            RunState::InProgress
        } else {
            RunState::Complete
        }
    }

    /// Whether a given step has already been recorded.
    pub fn has_completed_step(&self, step_number: i32) -> bool {
        self.steps_completed.iter().any(|s| s.step_number == step_number)
    }
}
