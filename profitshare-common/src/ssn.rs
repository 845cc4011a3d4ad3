//! SSN masking utility
//!
//! Produces the print-safe last-4 form used on check stubs and in log
//! messages. This is a privacy safeguard, not a correctness-critical field,
//! so malformed input degrades to an all-zero placeholder instead of
//! erroring.

/// Mask a raw SSN down to its last four digits.
///
/// Strips all non-digit characters first. Inputs with fewer than four
/// digits yield `"000000000"`. Otherwise the result is nine characters:
/// five zeros followed by the last four digits.
///
/// Total function: never panics, always returns nine numeric characters.
pub fn mask_ssn(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < 4 {
        return "000000000".to_string();
    }

    let last_four: String = digits[digits.len() - 4..].iter().collect();
    format!("00000{}", last_four)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_standard_ssn() {
        assert_eq!(mask_ssn("123456789"), "000006789");
    }

    #[test]
    fn strips_punctuation_before_masking() {
        assert_eq!(mask_ssn("123-45-6789"), "000006789");
    }

    #[test]
    fn short_input_yields_placeholder() {
        assert_eq!(mask_ssn("123"), "000000000");
        assert_eq!(mask_ssn(""), "000000000");
        assert_eq!(mask_ssn("---"), "000000000");
    }

    #[test]
    fn exactly_four_digits_are_preserved() {
        assert_eq!(mask_ssn("6789"), "000006789");
    }

    #[test]
    fn output_is_always_nine_numeric_chars() {
        for input in ["", "x", "12", "987654321", "9-8-7-6-5-4-3-2-1", "abc1234def"] {
            let masked = mask_ssn(input);
            assert_eq!(masked.len(), 9, "input {:?}", input);
            assert!(masked.chars().all(|c| c.is_ascii_digit()), "input {:?}", input);
        }
    }
}
