//! Text primitives seam
//!
//! String sanitization, XSS detection, and date validation are consumed as
//! opaque operations behind a trait, so deployments can supply their own
//! implementations. The default is deliberately conservative.

use chrono::{DateTime, NaiveDate};

/// Opaque text operations consumed by the validator/transform chains.
pub trait TextPrimitives: Send + Sync {
    /// Escapes markup-significant characters out of a string.
    fn sanitize(&self, input: &str) -> String;

    /// Whether a string carries markup that should be rejected outright.
    fn contains_xss(&self, input: &str) -> bool;

    /// Whether a string parses as a date.
    fn is_date(&self, input: &str) -> bool;
}

/// Conservative default primitives.
///
/// Sanitization entity-escapes `& < > " '`; XSS detection flags any angle
/// bracket or `javascript:` scheme; dates accept RFC 3339 timestamps and
/// plain `YYYY-MM-DD`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPrimitives;

impl TextPrimitives for DefaultPrimitives {
    fn sanitize(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        for c in input.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#x27;"),
                c => out.push(c),
            }
        }
        out
    }

    fn contains_xss(&self, input: &str) -> bool {
        input.contains('<')
            || input.contains('>')
            || input.to_ascii_lowercase().contains("javascript:")
    }

    fn is_date(&self, input: &str) -> bool {
        DateTime::parse_from_rfc3339(input).is_ok()
            || NaiveDate::parse_from_str(input, "%Y-%m-%d").is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_escapes_markup() {
        let p = DefaultPrimitives;
        assert_eq!(p.sanitize("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&#x27;");
        assert_eq!(p.sanitize("plain"), "plain");
    }

    #[test]
    fn test_xss_detection() {
        let p = DefaultPrimitives;
        assert!(p.contains_xss("<script>alert(1)</script>"));
        assert!(p.contains_xss("JavaScript:void(0)"));
        assert!(!p.contains_xss("hello world"));
    }

    #[test]
    fn test_date_formats() {
        let p = DefaultPrimitives;
        assert!(p.is_date("2024-01-01T00:00:00Z"));
        assert!(p.is_date("2024-01-01"));
        assert!(!p.is_date("yesterday"));
        assert!(!p.is_date("2024-13-40"));
    }
}
