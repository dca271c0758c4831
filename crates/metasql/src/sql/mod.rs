//! Placeholder-numbering SQL builder.
//!
//! Every compiler in this crate assembles statements through [`Sql`]:
//! static keywords, validated identifiers, and bound values are the only
//! things it accepts, and `$1, $2, ...` placeholders are numbered when the
//! statement is rendered. Fragments can therefore be composed (a WHERE
//! clause appended after SET assignments) without renumbering by hand.
//!
//! # Example
//!
//! ```ignore
//! use metasql::{SafeIdent, Sql};
//!
//! let table = SafeIdent::qualified("mes.lot")?;
//! let qty = SafeIdent::column("QTY")?;
//! let mut q = Sql::new("SELECT * FROM ");
//! q.push_ident(&table).push(" WHERE ").push_ident(&qty).push(" >= ").push_bind(5);
//!
//! let compiled = q.build();
//! assert_eq!(compiled.sql(), "SELECT * FROM mes.lot WHERE QTY >= $1");
//! ```

mod builder;
mod compiled;

#[cfg(test)]
mod tests;

pub use builder::Sql;
pub use compiled::CompiledQuery;

/// Strip leading whitespace, SQL comments (`--` and `/* */`), and parentheses
/// from a SQL string to find the first meaningful keyword.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            if let Some(pos) = s.find('\n') {
                s = &s[pos + 1..];
                continue;
            }
            return "";
        }
        if s.starts_with("/*") {
            if let Some(pos) = s.find("*/") {
                s = &s[pos + 2..];
                continue;
            }
            return "";
        }
        if s.starts_with('(') {
            s = &s[1..];
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

/// Whether `s` starts with `keyword` as a whole word (case-insensitive).
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    match s.get(0..keyword.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(keyword) => s[keyword.len()..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_')),
        _ => false,
    }
}
