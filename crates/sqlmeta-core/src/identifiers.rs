//! Identifier validation and quoting.

use std::sync::OnceLock;

use regex::Regex;

use crate::connection::Dialect;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid literal")
    })
}

/// True if `name` is a plain SQL identifier (letters, digits, underscore,
/// not starting with a digit).
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

/// Quote an identifier for `dialect`, doubling any embedded quote characters.
pub fn quote_ident(name: &str, dialect: Dialect) -> String {
    let q = dialect.quote_char();
    let mut out = String::with_capacity(name.len() + 2);
    out.push(q);
    for ch in name.chars() {
        if ch == q {
            out.push(q);
        }
        out.push(ch);
    }
    out.push(q);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(is_valid_identifier("user"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("team_id2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("drop table"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a-b"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("user", Dialect::Sqlite), "\"user\"");
        assert_eq!(quote_ident("user", Dialect::MySql), "`user`");
        assert_eq!(quote_ident("we\"ird", Dialect::Postgres), "\"we\"\"ird\"");
    }
}
