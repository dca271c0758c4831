//! `@name` parameter markers in guard predicates.
//!
//! Markers inside string literals, dollar-quoted strings, quoted identifiers
//! and comments are ignored, as are `@@name` system variables.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Text(&'a str),
    Marker(&'a str),
    /// A `$n` placeholder written directly into the predicate.
    Positional,
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Index just past the closing `quote`, honouring doubled-quote escapes.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Block comments nest in PostgreSQL.
fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// `$tag$ ... $tag$`; returns `None` if `start` does not open a dollar quote.
fn skip_dollar_quoted(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && is_ident_char(bytes[i]) && !bytes[i].is_ascii_digit() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'$') {
        return None;
    }
    let tag = &sql[start..=i];
    let body = i + 1;
    Some(
        sql[body..]
            .find(tag)
            .map_or(bytes.len(), |pos| body + pos + tag.len()),
    )
}

fn tokenize(sql: &str) -> Vec<Token<'_>> {
    let bytes = sql.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_quoted(bytes, i, bytes[i]),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |pos| i + pos + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'$' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                tokens.push(Token::Text(&sql[text_start..i]));
                tokens.push(Token::Positional);
                text_start = i;
                i += 1;
            }
            b'$' => i = skip_dollar_quoted(sql, i).unwrap_or(i + 1),
            b'@' if bytes.get(i + 1) == Some(&b'@') => {
                i += 2;
                while i < bytes.len() && is_ident_char(bytes[i]) {
                    i += 1;
                }
            }
            b'@' if bytes.get(i + 1).copied().is_some_and(is_ident_start) => {
                if text_start < i {
                    tokens.push(Token::Text(&sql[text_start..i]));
                }
                let name_start = i + 1;
                let mut end = name_start;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                tokens.push(Token::Marker(&sql[name_start..end]));
                i = end;
                text_start = end;
            }
            _ => i += 1,
        }
    }
    if text_start < bytes.len() {
        tokens.push(Token::Text(&sql[text_start..]));
    }
    tokens
}

/// Distinct marker names in order of first appearance (case-insensitive).
pub fn extract_parameter_names(sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in tokenize(sql) {
        if let Token::Marker(name) = token {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Whether the predicate contains raw `$n` placeholders outside literals.
pub(crate) fn has_positional_parameters(sql: &str) -> bool {
    tokenize(sql).contains(&Token::Positional)
}

/// Replace each marker with `$k`, where `k` is the 1-based position of its
/// name in `names`. Repeated markers share a placeholder.
pub(crate) fn rewrite_markers(sql: &str, names: &[String]) -> String {
    let mut out = String::with_capacity(sql.len());
    for token in tokenize(sql) {
        match token {
            Token::Text(text) => out.push_str(text),
            Token::Positional => {}
            Token::Marker(name) => {
                match names.iter().position(|n| n.eq_ignore_ascii_case(name)) {
                    Some(idx) => {
                        out.push('$');
                        out.push_str(&(idx + 1).to_string());
                    }
                    // Unreachable for names produced by extract_parameter_names.
                    None => {
                        out.push('@');
                        out.push_str(name);
                    }
                }
            }
        }
    }
    out
}
