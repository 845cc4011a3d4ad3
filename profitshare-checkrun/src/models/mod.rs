//! Domain models for the check production pipeline

pub mod check;
pub mod transfer;
pub mod workflow;

pub use check::{
    CheckData, CheckRunPrintFileResult, CheckRunStartRequest, PrinterType, ProfitShareCheck,
};
pub use transfer::FileTransferAudit;
pub use workflow::{CheckRunWorkflow, RunState, StepCompletion};
