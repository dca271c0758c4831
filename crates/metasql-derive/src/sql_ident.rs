use proc_macro2::Span;
use syn::{Error, LitStr, Result};

/// Same character rule the runtime validator applies: `[A-Za-z0-9_.]`, dots
/// only in qualified names, no empty segments.
pub(crate) fn is_valid_sql_ident(s: &str, qualified: bool) -> bool {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.') {
        return false;
    }
    if qualified {
        !s.split('.').any(str::is_empty)
    } else {
        !s.contains('.')
    }
}

pub(crate) fn parse_table_name(lit: &LitStr) -> Result<String> {
    let s = lit.value();
    if !is_valid_sql_ident(s.trim(), true) {
        return Err(Error::new(
            lit.span(),
            "table must be a valid SQL identifier (expected [A-Za-z0-9_] segments joined by '.')",
        ));
    }
    Ok(s.trim().to_string())
}

pub(crate) fn parse_column_name(lit: &LitStr) -> Result<String> {
    parse_column_name_with_span(lit.value().trim(), lit.span())
}

pub(crate) fn parse_column_name_with_span(s: &str, span: Span) -> Result<String> {
    if !is_valid_sql_ident(s, false) {
        return Err(Error::new(
            span,
            format!("column {s:?} must be a valid SQL identifier (expected [A-Za-z0-9_]+)"),
        ));
    }
    Ok(s.to_string())
}
