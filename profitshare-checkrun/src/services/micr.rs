//! MICR line encoding
//!
//! The magnetic-ink line at the bottom of a check is a hardware contract
//! with the bank's check-reading equipment. Each bank's printer stock has
//! its own literal template with filler glyphs between digit groups; the
//! formatters here are per-digit template substitution, not generic number
//! formatting, and the output must never be "cleaned up".

use profitshare_common::{Error, Result};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Per-bank MICR encoding strategy.
pub trait MicrFormatter: Send + Sync {
    /// Render the magnetic-ink line for one check.
    ///
    /// Pure function of the inputs and the configured account number: no
    /// timestamps, randomness, or locale dependence.
    fn format_micr_line(&self, check_number: i32, amount: Decimal) -> String;
}

/// Formatter for the profit share check stock (routing 026004297).
///
/// Template: `<{check}<!: !{routing digits}:! {account digits}!<`, with the
/// `!` filler glyph between every routing and account digit.
pub struct ProfitShareStockFormatter {
    routing_number: String,
    account_number: String,
}

impl ProfitShareStockFormatter {
    /// Build a formatter for a routing/account pair. Both are sanitized to
    /// digits only, so configured values carrying punctuation still encode
    /// correctly.
    ///
    /// A missing account number is a fatal configuration error: encoding
    /// an empty account field would hand the printer a MICR line the
    /// clearing hardware rejects or misroutes.
    pub fn new(routing_number: &str, account_number: &str) -> Result<Self> {
        let account_number = digits_only(account_number);
        if account_number.is_empty() {
            return Err(Error::Config(
                "Bank account number is required for MICR encoding but is not configured"
                    .to_string(),
            ));
        }

        Ok(Self {
            routing_number: digits_only(routing_number),
            account_number,
        })
    }
}

impl MicrFormatter for ProfitShareStockFormatter {
    fn format_micr_line(&self, check_number: i32, _amount: Decimal) -> String {
        format!(
            "<{}<!: !{}:! {}!<",
            check_number,
            delimit_digits(&self.routing_number),
            delimit_digits(&self.account_number)
        )
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Interleave the MICR filler glyph between digits.
fn delimit_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() * 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 {
            out.push('!');
        }
        out.push(c);
    }
    out
}

/// Registry mapping bank routing numbers to their MICR formatters.
///
/// New banks are added by registration, not by editing a switch. Lookup
/// fails closed: a routing number with no registered formatter is a hard
/// error, never a fallback to some default bank, because a wrong MICR line
/// misroutes the physical check.
#[derive(Default)]
pub struct MicrFormatterRegistry {
    formatters: HashMap<String, Box<dyn MicrFormatter>>,
}

impl MicrFormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a formatter for a routing number.
    pub fn register(&mut self, routing_number: impl Into<String>, formatter: Box<dyn MicrFormatter>) {
        self.formatters.insert(routing_number.into(), formatter);
    }

    /// Build the registry for the configured bank. Fails when the account
    /// number is not configured; retrying cannot fix missing configuration.
    pub fn for_bank(routing_number: &str, account_number: &str) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(
            routing_number.to_string(),
            Box::new(ProfitShareStockFormatter::new(routing_number, account_number)?),
        );
        Ok(registry)
    }

    /// Look up the formatter for a routing number, failing closed.
    pub fn get_formatter(&self, routing_number: &str) -> Result<&dyn MicrFormatter> {
        self.formatters
            .get(routing_number)
            .map(|f| f.as_ref())
            .ok_or_else(|| Error::UnsupportedBank(routing_number.to_string()))
    }
}
