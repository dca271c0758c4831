use super::compiled::CompiledQuery;
use crate::ident::SafeIdent;
use crate::value::SqlValue;

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A parameter-safe dynamic SQL builder.
///
/// `Sql` stores SQL pieces and parameters separately and generates `$1, $2, ...`
/// placeholders automatically in the final SQL string. Text can only enter
/// through `&'static str` keywords or a validated [`SafeIdent`].
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<SqlValue>,
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: &'static str) -> Self {
        let mut sql = Self::empty();
        sql.push(initial_sql);
        sql
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append a static SQL keyword or punctuation.
    pub fn push(&mut self, sql: &'static str) -> &mut Self {
        self.push_text(sql)
    }

    /// Append text that was produced inside this crate from validated input
    /// (e.g. a guard predicate that passed the read-only checks).
    pub(crate) fn push_text(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a validated identifier verbatim.
    pub fn push_ident(&mut self, ident: &SafeIdent) -> &mut Self {
        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => ident.write_sql(last),
            _ => {
                let mut s = String::new();
                ident.write_sql(&mut s);
                self.parts.push(SqlPart::Raw(s));
            }
        }
        self
    }

    /// Append `a, b, c` for a list of identifiers.
    pub fn push_ident_list<'a>(&mut self, idents: impl IntoIterator<Item = &'a SafeIdent>) -> &mut Self {
        for (i, ident) in idents.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.push_ident(ident);
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind(&mut self, value: impl Into<SqlValue>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value.into());
        self
    }

    /// Append a comma-separated list of placeholders and bind all values.
    ///
    /// If `values` is empty, this appends `NULL` (so `IN (NULL)` is valid SQL
    /// but never true).
    pub fn push_bind_list<T: Into<SqlValue>>(
        &mut self,
        values: impl IntoIterator<Item = T>,
    ) -> &mut Self {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return self.push("NULL");
        };

        self.push_bind(first);
        for v in iter {
            self.push(", ");
            self.push_bind(v);
        }
        self
    }

    /// Append another `Sql` fragment, consuming it.
    pub fn push_sql(&mut self, other: Sql) -> &mut Self {
        for part in other.parts {
            match part {
                SqlPart::Raw(s) => {
                    self.push_text(&s);
                }
                SqlPart::Param => self.parts.push(SqlPart::Param),
            }
        }
        self.params.extend(other.params);
        self
    }

    /// Append `fragments` joined by `separator`; empty fragments are skipped.
    pub fn push_joined(&mut self, fragments: Vec<Sql>, separator: &'static str) -> &mut Self {
        let mut first = true;
        for fragment in fragments.into_iter().filter(|f| !f.is_empty()) {
            if !first {
                self.push(separator);
            }
            first = false;
            self.push_sql(fragment);
        }
        self
    }

    /// Append `OFFSET $n ROWS FETCH NEXT $m ROWS ONLY`.
    pub fn push_offset_fetch(&mut self, offset: i64, fetch: i64) -> &mut Self {
        self.push(" OFFSET ")
            .push_bind(offset)
            .push(" ROWS FETCH NEXT ")
            .push_bind(fetch)
            .push(" ROWS ONLY")
    }

    /// Number of bound parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Bound parameter values, in placeholder order.
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let cap = self
            .parts
            .iter()
            .map(|p| match p {
                SqlPart::Raw(s) => s.len(),
                SqlPart::Param => 4,
            })
            .sum();

        let mut out = String::with_capacity(cap);
        let mut idx = 0usize;
        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    out.push('$');
                    out.push_str(&idx.to_string());
                }
            }
        }
        out
    }

    /// Finish the statement.
    pub fn build(self) -> CompiledQuery {
        let sql = self.to_sql();
        CompiledQuery::new(sql, self.params)
    }
}
