//! # Profit Sharing Check Production Pipeline
//!
//! Turns a batch of approved profit-sharing distributions into bank-ready
//! paper-check output, tracks the operational workflow around producing
//! that output, and ships the resulting files to external systems.
//!
//! - `models` — workflow, check, and transfer-audit types
//! - `db` — query modules over the check production schema
//! - `services` — MICR codec, printer directive injection, print file and
//!   positive pay generation, file transfer with retry, workflow tracking,
//!   and the run orchestrator

pub mod db;
pub mod models;
pub mod services;

pub use profitshare_common::{Error, Result};
