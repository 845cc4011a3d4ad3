//! Printer directive injection
//!
//! The same letter or check content must be producible either as a plain
//! document or as input to a continuous-feed printer that expects inline
//! DJDE control codes. These two helpers isolate that conditional so the
//! content generators never branch on printer type themselves.
//!
//! Directive strings are exact hardware contracts; they are appended
//! verbatim, never trimmed or re-formatted.

/// Append a header directive when the target printer consumes directives.
///
/// Headers carry their own control characters (form feed, carriage return)
/// and get no trailing newline.
pub fn append_header(buffer: &mut String, header: &str, directive_aware: bool) {
    if directive_aware {
        buffer.push_str(header);
    }
}

/// Append a content or control line, newline-terminated, when the target
/// printer consumes directives.
pub fn append_line(buffer: &mut String, line: &str, directive_aware: bool) {
    if directive_aware {
        buffer.push_str(line);
        buffer.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "\u{c}DJDE JDE=PROFNEW,JDL=DFLT5,END,;\r";

    #[test]
    fn header_is_noop_for_plain_target() {
        let mut buffer = String::from("existing");
        append_header(&mut buffer, HEADER, false);
        assert_eq!(buffer, "existing");
    }

    #[test]
    fn line_is_noop_for_plain_target() {
        let mut buffer = String::from("existing");
        append_line(&mut buffer, "DJDE JDE=QPS073,JDL=PAYROL,END,;", false);
        assert_eq!(buffer, "existing");
    }

    #[test]
    fn header_appends_verbatim_without_newline() {
        let mut buffer = String::new();
        append_header(&mut buffer, HEADER, true);
        assert_eq!(buffer, HEADER);
        assert!(!buffer.ends_with('\n'));
    }

    #[test]
    fn line_appends_verbatim_plus_one_newline() {
        let mut buffer = String::new();
        append_line(&mut buffer, "  padded line \r", true);
        assert_eq!(buffer, "  padded line \r\n");
    }
}
