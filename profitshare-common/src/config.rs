//! Configuration loading for the check production pipeline
//!
//! Resolution priority for secrets: environment variable, then TOML file,
//! then compiled default. The bank account number is a secret and is
//! expected to arrive via `PROFITSHARE_BANK_ACCOUNT_NUMBER` in production.
//!
//! Printer directive strings are hardware contracts with the continuous-feed
//! printer. They are loaded verbatim and must never be trimmed, reformatted,
//! or whitespace-normalized.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the configured bank account number.
pub const ENV_BANK_ACCOUNT_NUMBER: &str = "PROFITSHARE_BANK_ACCOUNT_NUMBER";

/// Environment variable overriding the outbound transfer directory.
pub const ENV_OUTBOUND_PATH: &str = "PROFITSHARE_OUTBOUND_PATH";

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckRunConfig {
    pub bank: BankConfig,
    pub transfer: TransferConfig,
    pub reprint: ReprintPolicy,
    pub workflow: WorkflowConfig,
    pub printer: PrinterDirectiveConfig,
}

/// Bank identity used for MICR encoding and positive pay rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// ABA routing number selecting the MICR formatter.
    pub routing_number: String,
    /// Account number substituted into the MICR line. Secret; usually
    /// supplied via environment, empty until configured.
    pub account_number: String,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            routing_number: "026004297".to_string(),
            account_number: String::new(),
        }
    }
}

/// File transfer destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Outbound directory convention on the transfer endpoint.
    pub outbound_path: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            outbound_path: "/production/OutBox/VENUS/".to_string(),
        }
    }
}

/// Reprint governance thresholds.
///
/// These are deployment policy, not fixed business logic. The defaults
/// mirror current operations (two reprints, same day only) but must be
/// confirmed with the plan administrators before being relied on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprintPolicy {
    /// Maximum number of reprints allowed per run.
    pub max_reprints: u32,
    /// Days after the check run date during which reprints stay eligible.
    /// Zero means same-day only.
    pub window_days: i64,
}

impl Default for ReprintPolicy {
    fn default() -> Self {
        Self {
            max_reprints: 2,
            window_days: 0,
        }
    }
}

/// Workflow shape settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Number of operational steps a run must complete to be considered done.
    pub expected_steps: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { expected_steps: 5 }
    }
}

/// Literal printer control strings, namespaced by use-case.
///
/// Exact byte sequences expected by the Xerox printer. The letter headers
/// are consumed by the letter generators outside this core; the check file
/// header and trailer lines are consumed by the print file generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrinterDirectiveConfig {
    /// Header directive opening the profit share check file.
    pub check_file_header: String,
    /// Header directive opening the certificate file.
    pub certificate_header: String,
    /// Header directive opening terminated-member letters.
    pub terminated_letter_header: String,
    /// Header directive opening the "profits over 73" letters.
    pub over_73_header: String,
    /// Ordered printer-control lines appended after the final check.
    pub trailer_lines: Vec<String>,
}

impl Default for PrinterDirectiveConfig {
    fn default() -> Self {
        Self {
            check_file_header: "\u{c}DJDE JDE=PROFNEW,JDL=DFLT5,END,;\r".to_string(),
            certificate_header: "\u{c}DJDE JDE=PROFNEW,JDL=DFLT5,END,;\r".to_string(),
            terminated_letter_header: "DJDE JDE=TERMLTR,JDL=PAYROL,END,;".to_string(),
            over_73_header: "DJDE JDE=QPS073,JDL=PAYROL,END,;".to_string(),
            trailer_lines: Vec::new(),
        }
    }
}

impl CheckRunConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Parse config failed: {}", e)))?
        } else {
            tracing::info!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment variables take priority over the TOML file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(account) = std::env::var(ENV_BANK_ACCOUNT_NUMBER) {
            if !account.trim().is_empty() {
                self.bank.account_number = account;
            }
        }
        if let Ok(path) = std::env::var(ENV_OUTBOUND_PATH) {
            if !path.trim().is_empty() {
                self.transfer.outbound_path = path;
            }
        }
    }

    /// The configured account number, or a configuration error when missing.
    ///
    /// Missing account configuration is fatal and never retried; an
    /// incorrectly encoded MICR line misroutes the physical check.
    pub fn require_account_number(&self) -> Result<&str> {
        let account = self.bank.account_number.trim();
        if account.is_empty() {
            return Err(Error::Config(format!(
                "Bank account number is not configured. Set {} or [bank] account_number in the config file.",
                ENV_BANK_ACCOUNT_NUMBER
            )));
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_match_current_operations() {
        let config = CheckRunConfig::default();
        assert_eq!(config.bank.routing_number, "026004297");
        assert_eq!(config.reprint.max_reprints, 2);
        assert_eq!(config.reprint.window_days, 0);
        assert_eq!(config.workflow.expected_steps, 5);
        assert_eq!(config.transfer.outbound_path, "/production/OutBox/VENUS/");
        assert!(config.printer.check_file_header.starts_with('\u{c}'));
        assert!(config.printer.check_file_header.ends_with('\r'));
    }

    #[test]
    fn directive_strings_survive_toml_round_trip_verbatim() {
        let config = CheckRunConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let parsed: CheckRunConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(
            parsed.printer.check_file_header,
            "\u{c}DJDE JDE=PROFNEW,JDL=DFLT5,END,;\r"
        );
    }

    #[test]
    fn missing_account_number_is_a_config_error() {
        let config = CheckRunConfig::default();
        let err = config.require_account_number().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    #[serial]
    fn env_override_wins_over_file_value() {
        std::env::set_var(ENV_BANK_ACCOUNT_NUMBER, "0375495656");
        let mut config = CheckRunConfig::default();
        config.bank.account_number = "file-value".to_string();
        config.apply_env_overrides();
        assert_eq!(config.bank.account_number, "0375495656");
        std::env::remove_var(ENV_BANK_ACCOUNT_NUMBER);
    }

    #[test]
    #[serial]
    fn blank_env_value_does_not_clobber_file_value() {
        std::env::set_var(ENV_BANK_ACCOUNT_NUMBER, "  ");
        let mut config = CheckRunConfig::default();
        config.bank.account_number = "file-value".to_string();
        config.apply_env_overrides();
        assert_eq!(config.bank.account_number, "file-value");
        std::env::remove_var(ENV_BANK_ACCOUNT_NUMBER);
    }
}
