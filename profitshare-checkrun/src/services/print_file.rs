//! Check run print file generation
//!
//! Renders the full printable output for an explicit set of distributions:
//! header directives, per-check body including the MICR line, and trailer
//! directives. Records one check tracking row per check produced.
//!
//! Output ordering is deterministic (ascending check number over
//! distributions ordered by id), so a reprint of identical inputs is
//! byte-identical to the original file.

use chrono::Utc;
use profitshare_common::config::{CheckRunConfig, PrinterDirectiveConfig};
use profitshare_common::ssn::mask_ssn;
use profitshare_common::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{checks, distributions, workflows};
use crate::models::{
    CheckData, CheckRunPrintFileResult, CheckRunStartRequest, PrinterType, ProfitShareCheck,
};
use crate::services::micr::{MicrFormatter, MicrFormatterRegistry};
use crate::services::printer::{append_header, append_line};
use crate::services::workflow::CheckRunWorkflowService;

const MAX_PAYABLE_NAME_LENGTH: usize = 84;

/// Generates the bank-ready check print file for a run.
pub struct CheckRunPrintFileService {
    pool: SqlitePool,
    workflow: CheckRunWorkflowService,
    registry: MicrFormatterRegistry,
    routing_number: String,
    directives: PrinterDirectiveConfig,
}

impl CheckRunPrintFileService {
    pub fn new(
        pool: SqlitePool,
        workflow: CheckRunWorkflowService,
        registry: MicrFormatterRegistry,
        config: &CheckRunConfig,
    ) -> Self {
        Self {
            pool,
            workflow,
            registry,
            routing_number: config.bank.routing_number.clone(),
            directives: config.printer.clone(),
        }
    }

    /// Render the print file for the requested distributions and record a
    /// check tracking row per check.
    pub async fn generate(&self, request: &CheckRunStartRequest) -> Result<CheckRunPrintFileResult> {
        let mut ids: Vec<i64> = request
            .distribution_ids
            .iter()
            .copied()
            .filter(|id| *id > 0)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Err(Error::Validation(
                "DistributionIds must contain at least one id.".to_string(),
            ));
        }

        // Configuration problems fail before any workflow state is touched.
        let formatter = self.registry.get_formatter(&self.routing_number)?;

        let found = distributions::fetch_by_ids(&self.pool, &ids).await?;
        if found.len() != ids.len() {
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !found.iter().any(|d| d.id == **id))
                .map(|id| id.to_string())
                .collect();
            // A missing check in a numbered check run is a control gap;
            // never silently skip.
            return Err(Error::Validation(format!(
                "One or more distributions were not found: {}",
                missing.join(", ")
            )));
        }

        let run_id = if request.is_reprint {
            self.begin_reprint(request).await?
        } else {
            let workflow = self
                .workflow
                .start_new_run(
                    request.profit_year,
                    request.check_run_date,
                    request.starting_check_number,
                    &request.user_name,
                )
                .await?;
            workflow.id
        };

        let printed_at = Utc::now();
        let mut check_datas = Vec::with_capacity(found.len());
        let mut tracking = Vec::with_capacity(found.len());

        for (index, distribution) in found.iter().enumerate() {
            let check_number = request.starting_check_number + index as i32;
            let payable_name = resolve_payable_name(
                distribution.id,
                distribution.payee_name.as_deref(),
                &distribution.employee_name,
            );
            let amount = (distribution.gross_amount
                - distribution.federal_tax_amount
                - distribution.state_tax_amount)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

            tracking.push(ProfitShareCheck {
                run_id,
                distribution_id: distribution.id,
                check_number,
                badge_number: distribution.badge_number.clone(),
                payable_name: payable_name.clone(),
                amount,
                check_date: request.check_run_date,
                check_run_date: request.check_run_date,
                is_voided: false,
                void_date: None,
                printed_at,
            });

            check_datas.push(CheckData {
                check_number,
                amount,
                recipient_name: payable_name,
                ssn: format!("{:09}", distribution.ssn),
                badge_number: distribution.badge_number.clone(),
                issue_date: request.check_run_date,
            });
        }

        checks::insert_many(&self.pool, &tracking).await?;

        let content = match request.printer_type {
            PrinterType::XeroxDjde => self.render_xerox_djde(&check_datas, formatter),
            PrinterType::Standard => render_standard(&check_datas, formatter),
        };

        let file_name = match request.printer_type {
            PrinterType::XeroxDjde => "PROFCHKS_DJDE.txt",
            PrinterType::Standard => "PROFCHKS.txt",
        };

        info!(
            %run_id,
            profit_year = request.profit_year,
            file_name,
            check_count = check_datas.len(),
            "Generated check run print file"
        );

        Ok(CheckRunPrintFileResult {
            run_id,
            file_name: file_name.to_string(),
            content_type: "text/plain".to_string(),
            content,
            check_count: check_datas.len(),
        })
    }

    /// Validate reprint eligibility, consume a reprint, and void the run's
    /// previously printed checks.
    async fn begin_reprint(&self, request: &CheckRunStartRequest) -> Result<Uuid> {
        let current = self.workflow.get_current_run(request.profit_year).await?;
        let run_id = current.id;

        if !self.workflow.can_reprint(run_id).await? {
            return Err(Error::Validation(
                "This check run cannot be reprinted (limit reached or outside the reprint window)."
                    .to_string(),
            ));
        }

        if !self
            .workflow
            .increment_reprint_count(run_id, &request.user_name)
            .await?
        {
            // can_reprint said yes but the guarded update refused: another
            // reprint won the race in between.
            return Err(Error::Conflict(format!(
                "Reprint for run {} was denied by a concurrent update; re-check eligibility",
                run_id
            )));
        }

        let voided =
            checks::void_active_for_run(&self.pool, run_id, request.check_run_date).await?;
        workflows::set_starting_check_number(
            &self.pool,
            run_id,
            request.starting_check_number,
            &request.user_name,
        )
        .await?;

        info!(
            %run_id,
            profit_year = request.profit_year,
            voided,
            "Reprint: voided previously printed checks"
        );

        Ok(run_id)
    }

    fn render_xerox_djde(&self, checks: &[CheckData], formatter: &dyn MicrFormatter) -> String {
        let mut buffer = String::new();
        append_header(&mut buffer, &self.directives.check_file_header, true);

        for (index, check) in checks.iter().enumerate() {
            if index > 0 {
                append_line(&mut buffer, "", true);
            }
            let micr_line = formatter.format_micr_line(check.check_number, check.amount);
            for line in check_body_lines(check, &micr_line) {
                append_line(&mut buffer, &line, true);
            }
        }

        for trailer in &self.directives.trailer_lines {
            append_line(&mut buffer, trailer, true);
        }

        buffer
    }
}

fn render_standard(checks: &[CheckData], formatter: &dyn MicrFormatter) -> String {
    let blocks: Vec<String> = checks
        .iter()
        .map(|check| {
            let micr_line = formatter.format_micr_line(check.check_number, check.amount);
            check_body_lines(check, &micr_line).join("\n")
        })
        .collect();

    blocks.join("\n\n")
}

fn check_body_lines(check: &CheckData, micr_line: &str) -> Vec<String> {
    vec![
        format!("Check #{}", check.check_number),
        format!("Date: {}", check.issue_date.format("%m/%d/%Y")),
        format!("Pay to: {}", check.recipient_name),
        format!("Amount: ${}", format_currency(check.amount)),
        format!("Badge: {}", check.badge_number),
        format!("SSN: {}", mask_ssn(&check.ssn)),
        String::new(),
        micr_line.to_string(),
    ]
}

fn resolve_payable_name(
    distribution_id: i64,
    payee_name: Option<&str>,
    employee_name: &str,
) -> String {
    let mut name = payee_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or(employee_name)
        .trim()
        .to_string();

    if name.is_empty() {
        warn!(distribution_id, "PayableName was blank; defaulting to placeholder");
        name = "PAYEE".to_string();
    }

    let char_count = name.chars().count();
    if char_count > MAX_PAYABLE_NAME_LENGTH {
        warn!(
            distribution_id,
            length = char_count,
            "PayableName exceeds max length; truncating"
        );
        // Truncate by characters, not bytes: a byte cut can land inside a
        // multi-byte sequence in an accented payee name.
        name = name.chars().take(MAX_PAYABLE_NAME_LENGTH).collect();
    }

    name
}

/// Comma-grouped, two-decimal amount rendering. Culture-invariant: the
/// output never varies with process locale.
fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.2}", rounded);

    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{}", sign, grouped, frac_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(Decimal::from_str("1234567.5").unwrap()), "1,234,567.50");
        assert_eq!(format_currency(Decimal::from_str("999.99").unwrap()), "999.99");
        assert_eq!(format_currency(Decimal::from_str("0").unwrap()), "0.00");
    }

    #[test]
    fn currency_handles_negative_amounts() {
        assert_eq!(format_currency(Decimal::from_str("-1234.5").unwrap()), "-1,234.50");
    }

    #[test]
    fn currency_rounds_midpoint_away_from_zero() {
        assert_eq!(format_currency(Decimal::from_str("10.005").unwrap()), "10.01");
    }

    #[test]
    fn payable_name_falls_back_to_employee() {
        assert_eq!(resolve_payable_name(1, None, "JANE DOE"), "JANE DOE");
        assert_eq!(resolve_payable_name(1, Some("  "), "JANE DOE"), "JANE DOE");
        assert_eq!(resolve_payable_name(1, Some("ESTATE OF J DOE"), "JANE DOE"), "ESTATE OF J DOE");
    }

    #[test]
    fn payable_name_defaults_when_blank() {
        assert_eq!(resolve_payable_name(1, None, "   "), "PAYEE");
    }

    #[test]
    fn payable_name_truncates_at_limit() {
        let long = "X".repeat(120);
        assert_eq!(resolve_payable_name(1, Some(&long), "JANE").len(), MAX_PAYABLE_NAME_LENGTH);
    }

    #[test]
    fn payable_name_truncates_accented_names_on_char_boundaries() {
        let long = format!("ESTATE OF JOSÉ MUÑOZ {}", "É".repeat(100));
        let resolved = resolve_payable_name(1, Some(&long), "JANE");
        assert_eq!(resolved.chars().count(), MAX_PAYABLE_NAME_LENGTH);
        assert!(long.starts_with(&resolved));
    }
}
