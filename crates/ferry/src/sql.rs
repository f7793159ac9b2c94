//! SQL text helpers shared by DDL, query composition and inserts.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::input::CellValue;

static PLAIN_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Whether `name` can be emitted without quoting.
pub fn is_plain_identifier(name: &str) -> bool {
    PLAIN_IDENTIFIER.is_match(name)
}

/// Backtick-quote an identifier, escaping backslashes and backticks.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for ch in name.chars() {
        if ch == '`' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('`');
    out
}

/// Emit an identifier raw when plain, quoted otherwise.
pub fn identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        quote_identifier(name)
    }
}

/// Single-quote a string literal, escaping backslashes and single quotes.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Render a number as a SQL literal.
pub fn number_literal(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        n.to_string()
    }
}

/// Render a cell as a SQL literal: `NULL`, a bare number, or a quoted string.
pub fn cell_literal(value: &CellValue) -> String {
    match value {
        CellValue::Null => "NULL".to_string(),
        CellValue::Number(n) => number_literal(*n),
        CellValue::Text(s) => quote_string(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_quoting() {
        assert_eq!(identifier("users"), "users");
        assert_eq!(identifier("_tmp1"), "_tmp1");
        assert_eq!(identifier("1st"), "`1st`");
        assert_eq!(identifier("Price ($)"), "`Price ($)`");
        assert_eq!(quote_identifier("a`b"), "`a\\`b`");
        assert_eq!(quote_identifier("a\\b"), "`a\\\\b`");
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(quote_string("plain"), "'plain'");
        assert_eq!(quote_string("O'Brien"), "'O\\'Brien'");
        assert_eq!(quote_string("C:\\tmp"), "'C:\\\\tmp'");
        assert_eq!(quote_string("'); DROP TABLE t; --"), "'\\'); DROP TABLE t; --'");
    }

    #[test]
    fn test_cell_literals() {
        assert_eq!(cell_literal(&CellValue::Null), "NULL");
        assert_eq!(cell_literal(&CellValue::Number(3.0)), "3");
        assert_eq!(cell_literal(&CellValue::Number(-0.25)), "-0.25");
        assert_eq!(cell_literal(&CellValue::Number(f64::NAN)), "nan");
        assert_eq!(cell_literal(&CellValue::Number(f64::NEG_INFINITY)), "-inf");
        assert_eq!(cell_literal(&CellValue::from("x")), "'x'");
    }
}
