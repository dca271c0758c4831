//! Read-only checks for guard predicates.
//!
//! The checks run on the raw text, literals included, so a predicate that
//! merely mentions a forbidden keyword inside a string is still rejected.

use super::markers::has_positional_parameters;
use crate::sql::{starts_with_keyword, strip_sql_prefix};
use regex::Regex;
use std::sync::OnceLock;

fn mutating_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|CREATE|EXEC|EXECUTE|WAITFOR|TRUNCATE|MERGE|GRANT|REVOKE|COPY|CALL|INTO)\b",
        )
        .expect("valid mutating keyword regex")
    })
}

/// Check that `sql` is a single read-only SELECT.
///
/// Returns the rejection reason on failure.
pub fn validate_predicate(sql: &str) -> Result<(), String> {
    let body = strip_sql_prefix(sql);
    if body.is_empty() {
        return Err("predicate is empty".to_string());
    }
    if !starts_with_keyword(body, "SELECT") {
        return Err("predicate must start with SELECT".to_string());
    }
    if sql.contains(';') {
        return Err("statement separators are not allowed".to_string());
    }
    if let Some(m) = mutating_keyword_regex().find(sql) {
        return Err(format!(
            "mutating keyword '{}' is not allowed",
            m.as_str().to_ascii_uppercase()
        ));
    }
    if has_positional_parameters(sql) {
        return Err("positional parameters are not allowed; use @name markers".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        assert!(validate_predicate("SELECT 1 AS CanDelete").is_ok());
        assert!(
            validate_predicate(
                "  -- guard\n/* lot check */ (SELECT CASE WHEN COUNT(*) = 0 THEN 1 ELSE 0 END AS CanDelete \
                 FROM mes.lot WHERE eqp_no = @EQP_NO)"
            )
            .is_ok()
        );
    }

    #[test]
    fn rejects_non_select() {
        assert!(validate_predicate("WITH x AS (SELECT 1) SELECT * FROM x").is_err());
        assert!(validate_predicate("SELECTED").is_err());
        assert!(validate_predicate("   ").is_err());
        assert!(validate_predicate("-- only a comment").is_err());
    }

    #[test]
    fn rejects_separators() {
        let reason = validate_predicate("SELECT 1 AS CanDelete; SELECT 2").unwrap_err();
        assert!(reason.contains("separator"));
    }

    #[test]
    fn rejects_mutating_keywords_as_whole_words() {
        for sql in [
            "SELECT 1 FROM x WHERE EXISTS (DELETE FROM y)",
            "SELECT pg_sleep(1) FROM x WHERE 1 = 1 OR waitfor",
            "SELECT 1 AS CanDelete FROM t WHERE truncate = 1",
            "select 1 from t where x = 'drop'",
            "SELECT 1 AS CanDelete INTO guard_scratch",
            "SELECT * INTO TEMP t FROM mes.lot",
        ] {
            assert!(validate_predicate(sql).is_err(), "accepted {sql:?}");
        }
        // Substrings of identifiers are fine.
        assert!(validate_predicate("SELECT updated_at, created_by, deleted_flag FROM t").is_ok());
        assert!(validate_predicate("SELECT into_line AS CanDelete FROM t").is_ok());
    }

    #[test]
    fn rejects_raw_positional_parameters() {
        assert!(validate_predicate("SELECT $1 AS CanDelete").is_err());
    }
}
