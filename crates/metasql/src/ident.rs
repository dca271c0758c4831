//! Safe SQL identifier handling.
//!
//! Every table, column, and function name that reaches emitted SQL goes
//! through [`SafeIdent`]. The only way to obtain one is validation, and the
//! SQL builder only accepts identifiers as `&SafeIdent`, so an unchecked
//! string cannot be spliced into a statement.
//!
//! Accepted characters are `[A-Za-z0-9_.]`. The dot is only legal in
//! qualified names (`schema.table`), never in a bare column name.
//!
//! # Example
//! ```ignore
//! use metasql::SafeIdent;
//!
//! let t = SafeIdent::qualified("mes.work_order")?;
//! let c = SafeIdent::column("QTY")?;
//! assert!(SafeIdent::column("a.b").is_err());
//! # Ok::<(), metasql::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};
use std::fmt;

/// Which kind of name is being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    /// Bare column or parameter name: no dots.
    Column,
    /// Table or function name, optionally schema-qualified.
    Qualified,
}

/// A validated SQL identifier, emitted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SafeIdent(String);

impl SafeIdent {
    /// Validate a bare column name.
    pub fn column(name: &str) -> OrmResult<Self> {
        validate(name, IdentKind::Column)
    }

    /// Validate a table or function name, allowing `schema.name`.
    pub fn qualified(name: &str) -> OrmResult<Self> {
        validate(name, IdentKind::Qualified)
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a qualified name into `(schema, name)`.
    pub fn split_schema(&self) -> (Option<&str>, &str) {
        match self.0.rsplit_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, &self.0),
        }
    }

    /// Case-insensitive comparison against a raw name.
    pub fn eq_ignore_case(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        out.push_str(&self.0);
    }
}

impl fmt::Display for SafeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SafeIdent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate `identifier` for use as the given kind of name.
///
/// Returns [`OrmError::InvalidIdentifier`] for empty input, any character
/// outside `[A-Za-z0-9_.]`, a dot in a column name, or an empty dot segment.
pub fn validate(identifier: &str, kind: IdentKind) -> OrmResult<SafeIdent> {
    if identifier.is_empty() {
        return Err(OrmError::invalid_identifier("identifier cannot be empty"));
    }
    if let Some(c) = identifier
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.'))
    {
        return Err(OrmError::invalid_identifier(format!(
            "invalid character {c:?} in {identifier:?}"
        )));
    }
    match kind {
        IdentKind::Column if identifier.contains('.') => {
            return Err(OrmError::invalid_identifier(format!(
                "column name {identifier:?} cannot be qualified"
            )));
        }
        IdentKind::Qualified if identifier.split('.').any(str::is_empty) => {
            return Err(OrmError::invalid_identifier(format!(
                "empty segment in {identifier:?}"
            )));
        }
        _ => {}
    }
    Ok(SafeIdent(identifier.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_simple() {
        let ident = SafeIdent::column("QTY").unwrap();
        assert_eq!(ident.to_string(), "QTY");
    }

    #[test]
    fn ident_qualified() {
        let ident = SafeIdent::qualified("dbo.WORK_ORDER").unwrap();
        assert_eq!(ident.as_str(), "dbo.WORK_ORDER");
        assert_eq!(ident.split_schema(), (Some("dbo"), "WORK_ORDER"));
    }

    #[test]
    fn ident_digits_allowed() {
        assert!(SafeIdent::column("1st_pass").is_ok());
    }

    #[test]
    fn ident_rejects_dot_in_column() {
        assert!(SafeIdent::column("t.qty").is_err());
    }

    #[test]
    fn ident_rejects_empty() {
        assert!(SafeIdent::column("").is_err());
        assert!(SafeIdent::qualified("").is_err());
    }

    #[test]
    fn ident_rejects_empty_segments() {
        assert!(SafeIdent::qualified("schema..table").is_err());
        assert!(SafeIdent::qualified("schema.").is_err());
        assert!(SafeIdent::qualified(".table").is_err());
    }

    #[test]
    fn ident_rejects_everything_outside_charset() {
        for bad in [
            "qty; drop table x",
            "qty--",
            "\"qty\"",
            "qty name",
            "qty'",
            "qty)",
            "qty\n",
            "qtÿ",
            "a-b",
            "a/*b*/",
        ] {
            assert!(SafeIdent::column(bad).is_err(), "accepted {bad:?}");
            assert!(SafeIdent::qualified(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn ident_preserves_characters_verbatim() {
        for good in ["Qty", "qty_2", "_x", "ABC123", "mixed_Case_9"] {
            let ident = SafeIdent::column(good).unwrap();
            let mut out = String::new();
            ident.write_sql(&mut out);
            assert_eq!(out, good);
        }
    }
}
