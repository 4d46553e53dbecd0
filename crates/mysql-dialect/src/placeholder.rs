//! Named placeholder scanning.
//!
//! Finds `:name` placeholders in SQL text while skipping quoted literals,
//! quoted identifiers and comments. A regex cannot tell a `:name` inside a
//! string literal from a real placeholder, so this is a hand-written forward
//! scanner with a resumable cursor.

use crate::core::value::{Params, SqlValue};
use crate::error::{DialectError, Result};

/// Find the first placeholder at or after byte offset `cursor`.
///
/// Returns the placeholder including its colon and its starting offset.
/// Resume with `offset + name.len()` to continue scanning.
pub fn next_placeholder(sql: &str, cursor: usize) -> Option<(&str, usize)> {
    let bytes = sql.as_bytes();
    let mut i = cursor;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line(bytes, i),
            b'#' => i = skip_line(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b':' => {
                let end = bytes[i + 1..]
                    .iter()
                    .position(|b| !is_ident_byte(*b))
                    .map_or(bytes.len(), |n| i + 1 + n);
                if end > i + 1 {
                    return Some((&sql[i..end], i));
                }
                // bare colon, e.g. `:=`
                i += 1;
            }
            _ => i += 1,
        }
    }

    None
}

/// Iterator over every placeholder in a statement.
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    sql: &'a str,
    cursor: usize,
}

impl<'a> Iterator for Placeholders<'a> {
    type Item = (&'a str, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (name, offset) = next_placeholder(self.sql, self.cursor)?;
        self.cursor = offset + name.len();
        Some((name, offset))
    }
}

/// Enumerate placeholders in order of appearance.
pub fn placeholders(sql: &str) -> Placeholders<'_> {
    Placeholders { sql, cursor: 0 }
}

/// Rewrite `:name` placeholders to positional `?` markers.
///
/// Returns the rewritten SQL and the values in marker order. A name used twice
/// is bound twice.
pub fn to_positional(sql: &str, params: &Params) -> Result<(String, Vec<SqlValue>)> {
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut last = 0;

    for (name, offset) in placeholders(sql) {
        let value = params
            .get(name)
            .ok_or_else(|| DialectError::Binding(format!("no value bound for {}", name)))?;
        out.push_str(&sql[last..offset]);
        out.push('?');
        values.push(value.clone());
        last = offset + name.len();
    }
    out.push_str(&sql[last..]);

    Ok((out, values))
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Offset just past the closing quote of the literal opened at `start`.
///
/// Doubled quotes escape in all three styles; backslash escapes only inside
/// string literals.
fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote != b'`' {
            i += 2;
            continue;
        }
        if b == quote {
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

fn skip_line(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |n| start + n + 1)
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |n| start + 2 + n + 2)
}
