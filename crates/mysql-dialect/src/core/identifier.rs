//! Identifier and value quoting for the MySQL/MariaDB dialect.
//!
//! Names are wrapped in backticks with any embedded backtick doubled, so a
//! name can never close its own quoting. String literals use single quotes
//! with `'` and `\` doubled. Checked quoting refuses names longer than 64
//! characters or containing NUL.

use crate::error::{DialectError, Result};

/// Maximum identifier length accepted by MySQL and MariaDB.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Check that MySQL can store `name` as an identifier. Empty names, names
/// with NUL and names over [`MAX_IDENTIFIER_LENGTH`] characters are refused.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DialectError::InvalidArgument(
            "identifier is empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(DialectError::InvalidArgument(format!(
            "identifier {:?} contains NUL, which MySQL does not allow in names",
            name
        )));
    }

    if name.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Err(DialectError::InvalidArgument(format!(
            "identifier {:?} is longer than {} characters",
            name, MAX_IDENTIFIER_LENGTH
        )));
    }

    Ok(())
}

/// Quoting rules for one dialect.
///
/// MySQL quotes identifiers with backticks and string literals with single
/// quotes; both are configurable so the same code serves ANSI_QUOTES setups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quoter {
    column_quote: (char, char),
    table_quote: (char, char),
}

impl Default for Quoter {
    fn default() -> Self {
        Self::new('`', '`')
    }
}

impl Quoter {
    /// Create a quoter using the same quote pair for tables and columns.
    pub fn new(open: char, close: char) -> Self {
        Self {
            column_quote: (open, close),
            table_quote: (open, close),
        }
    }

    /// Quote a single name part, doubling embedded closing quotes.
    ///
    /// Names that are already quoted are returned unchanged.
    pub fn quote_simple_column_name(&self, name: &str) -> String {
        Self::quote_part(name, self.column_quote)
    }

    /// Quote a single table name part.
    pub fn quote_simple_table_name(&self, name: &str) -> String {
        Self::quote_part(name, self.table_quote)
    }

    /// Quote a possibly schema-qualified table name (`db.table`).
    ///
    /// Names containing `(` or `{{` are treated as expressions and left as-is.
    pub fn quote_table_name(&self, name: &str) -> String {
        if name.contains('(') || name.contains("{{") {
            return name.to_string();
        }
        split_name(name)
            .iter()
            .map(|part| self.quote_simple_table_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quote a possibly table-qualified column name (`t.col`).
    ///
    /// `*` is never quoted and expressions containing `(` are left as-is.
    pub fn quote_column_name(&self, name: &str) -> String {
        if name.contains('(') || name.contains("[[") || name.contains("{{") {
            return name.to_string();
        }
        let parts = split_name(name);
        let (column, prefix) = match parts.split_last() {
            Some((column, prefix)) => (column, prefix),
            None => return name.to_string(),
        };
        let mut quoted: Vec<String> = prefix
            .iter()
            .map(|part| self.quote_simple_table_name(part))
            .collect();
        if column == "*" {
            quoted.push("*".to_string());
        } else {
            quoted.push(self.quote_simple_column_name(column));
        }
        quoted.join(".")
    }

    /// Quote a column name after validating it.
    pub fn quote_checked(&self, name: &str) -> Result<String> {
        validate_identifier(name)?;
        Ok(self.quote_column_name(name))
    }

    /// Strip one level of identifier quoting, undoubling embedded quotes.
    pub fn unquote_simple_name(&self, name: &str) -> String {
        let (open, close) = self.column_quote;
        let mut chars = name.chars();
        if name.len() >= 2 && chars.next() == Some(open) && chars.next_back() == Some(close) {
            let inner = &name[open.len_utf8()..name.len() - close.len_utf8()];
            let doubled: String = [close, close].iter().collect();
            inner.replace(&doubled, &close.to_string())
        } else {
            name.to_string()
        }
    }

    /// Quote a string literal.
    ///
    /// Backslashes and single quotes are doubled so the literal survives both
    /// the default SQL mode and `NO_BACKSLASH_ESCAPES`.
    pub fn quote_value(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn quote_part(name: &str, (open, close): (char, char)) -> String {
        if name.starts_with(open) && name.ends_with(close) && name.len() > 1 {
            return name.to_string();
        }
        let doubled: String = [close, close].iter().collect();
        format!("{}{}{}", open, name.replace(close, &doubled), close)
    }
}

/// Split a dotted name, ignoring dots inside quoted parts.
pub(crate) fn split_name(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in name.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None if ch == '`' || ch == '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == '.' => parts.push(std::mem::take(&mut current)),
            None => current.push(ch),
        }
    }
    parts.push(current);
    parts
}
