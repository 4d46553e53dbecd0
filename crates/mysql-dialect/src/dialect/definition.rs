//! Column definition parsing.
//!
//! Splits free-text definitions such as `int(10) unsigned not null` or
//! `enum('a','b') comment 'state'` into a type keyword, its parameter text and
//! the modifier flags that follow it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::{DialectError, Result};

/// Quoted literal inside an `enum(...)` or `set(...)` parameter list.
static ENUM_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'((?:[^'\\]|''|\\.)*)'").unwrap());

static TYPE_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap());

/// Single- or double-quoted literal in modifier text.
static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"'(?:[^'\\]|''|\\.)*'|"(?:[^"\\]|""|\\.)*""#).unwrap()
});

/// Stand-in left where [`QUOTED_RE`] matched: `\x01<index>\x01`.
static MASK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\x01(\d+)\x01").unwrap());

/// `COMMENT` followed by a masked literal.
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcomment\s+\x01(\d+)\x01").unwrap());

static UNSIGNED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bunsigned\b").unwrap());

static NOT_NULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnot\s+null\b").unwrap());

/// `NULL`, unless it is the operand of `DEFAULT`.
static NULL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\bdefault\s+)?\bnull\b").unwrap());

static UNIQUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bunique(\s+key)?\b").unwrap());

static CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:character\s+set|charset)\s+([A-Za-z0-9_]+)").unwrap()
});

static COLLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcollate\s+([A-Za-z0-9_]+)").unwrap());

/// Type keywords whose parameters are `size[, scale]`.
const SIZED_TYPES: &[&str] = &[
    "bit",
    "tinyint",
    "smallint",
    "mediumint",
    "int",
    "integer",
    "bigint",
    "float",
    "double",
    "real",
    "decimal",
    "numeric",
    "dec",
    "fixed",
    "char",
    "varchar",
    "binary",
    "varbinary",
    "text",
    "blob",
    "datetime",
    "timestamp",
    "time",
    "year",
];

/// Structured result of parsing a column definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDefinitionInfo {
    /// Lowercased type keyword, e.g. `varchar`.
    pub type_keyword: String,
    pub size: Option<u32>,
    pub scale: Option<u32>,
    /// Literal list of an `enum(...)` type; empty for every other keyword.
    pub enum_values: Vec<String>,
    /// Member list of a `set(...)` type.
    pub set_values: Vec<String>,
    pub unsigned: bool,
    pub not_null: bool,
    pub unique: bool,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub comment: Option<String>,
    /// Text that matched no known modifier, whitespace-collapsed.
    pub extra: Option<String>,
}

impl ColumnDefinitionInfo {
    /// Whether the type keyword is `enum`.
    pub fn is_enum(&self) -> bool {
        self.type_keyword == "enum"
    }
}

/// Split a definition into `(type keyword, parameter text, remainder)`.
///
/// The keyword is lowercased. Parameter text is the content between the
/// parentheses directly following the keyword, if any.
pub fn split_definition(definition: &str) -> Result<(String, Option<String>, String)> {
    let text = definition.trim();
    if text.is_empty() {
        return Err(DialectError::parse("empty column definition"));
    }

    let keyword = TYPE_KEYWORD_RE
        .find(text)
        .ok_or_else(|| DialectError::parse(format!("missing type keyword in {:?}", text)))?;
    let type_keyword = keyword.as_str().to_lowercase();

    let after = &text[keyword.end()..];
    let trimmed = after.trim_start();
    if !trimmed.starts_with('(') {
        return Ok((type_keyword, None, after.trim().to_string()));
    }

    let open = text.len() - trimmed.len();
    let close = find_closing_paren(text, open).ok_or_else(|| {
        DialectError::parse(format!("unbalanced parentheses in {:?}", text))
    })?;
    let params = text[open + 1..close].to_string();
    let rest = text[close + 1..].trim().to_string();

    Ok((type_keyword, Some(params), rest))
}

/// Parse a column definition.
///
/// Unknown type keywords yield empty parameter info rather than an error.
pub fn parse(definition: &str) -> Result<ColumnDefinitionInfo> {
    let (type_keyword, params, rest) = split_definition(definition)?;
    let mut info = ColumnDefinitionInfo {
        type_keyword,
        ..Default::default()
    };

    if let Some(params) = params.as_deref() {
        match info.type_keyword.as_str() {
            "enum" => {
                info.enum_values = parse_enum_values(params);
                if info.enum_values.is_empty() {
                    return Err(DialectError::parse(format!(
                        "enum definition without values: {:?}",
                        definition
                    )));
                }
            }
            "set" => info.set_values = parse_enum_values(params),
            keyword if SIZED_TYPES.contains(&keyword) => {
                let (size, scale) = parse_size_scale(params)?;
                info.size = size;
                info.scale = scale;
            }
            _ => {}
        }
    } else if info.is_enum() {
        return Err(DialectError::parse(format!(
            "enum definition without values: {:?}",
            definition
        )));
    }

    parse_modifiers(&rest, &mut info);
    Ok(info)
}

/// Extract the quoted literal list of an `enum(...)` parameter text.
pub fn parse_enum_values(params: &str) -> Vec<String> {
    ENUM_VALUE_RE
        .captures_iter(params)
        .map(|c| unescape_literal(&c[1]))
        .collect()
}

/// Undo `''` and backslash escaping inside a single-quoted literal.
pub fn unescape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\'' if chars.peek() == Some(&'\'') => {
                chars.next();
                out.push('\'');
            }
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

/// Index of the parenthesis closing the one at `open`, skipping quoted text.
pub(crate) fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' && q != '`' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_size_scale(params: &str) -> Result<(Option<u32>, Option<u32>)> {
    let mut parts = params.split(',').map(str::trim);
    let size = parse_number(parts.next(), params)?;
    let scale = parse_number(parts.next(), params)?;
    if parts.next().is_some() {
        return Err(DialectError::parse(format!(
            "too many type parameters: ({})",
            params
        )));
    }
    Ok((size, scale))
}

fn parse_number(part: Option<&str>, params: &str) -> Result<Option<u32>> {
    match part {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| {
            DialectError::parse(format!("non-numeric type parameter in ({})", params))
        }),
    }
}

/// Replace every quoted literal with an indexed marker so modifier keywords
/// inside defaults or comments are never matched.
fn mask_literals(text: &str) -> (String, Vec<String>) {
    let mut literals = Vec::new();
    let masked = QUOTED_RE
        .replace_all(text, |c: &Captures| {
            literals.push(c[0].to_string());
            format!("\x01{}\x01", literals.len() - 1)
        })
        .into_owned();
    (masked, literals)
}

fn unmask_literals(text: &str, literals: &[String]) -> String {
    MASK_RE
        .replace_all(text, |c: &Captures| {
            c[1].parse::<usize>()
                .ok()
                .and_then(|i| literals.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

fn parse_modifiers(rest: &str, info: &mut ColumnDefinitionInfo) {
    let (mut text, literals) = mask_literals(rest);

    let comment = COMMENT_RE
        .captures(&text)
        .and_then(|c| c[1].parse::<usize>().ok())
        .and_then(|i| literals.get(i));
    if let Some(literal) = comment {
        info.comment = Some(unescape_literal(&literal[1..literal.len() - 1]));
        text = COMMENT_RE.replace(&text, " ").into_owned();
    }
    if UNSIGNED_RE.is_match(&text) {
        info.unsigned = true;
        text = UNSIGNED_RE.replace_all(&text, " ").into_owned();
    }
    if NOT_NULL_RE.is_match(&text) {
        info.not_null = true;
        text = NOT_NULL_RE.replace_all(&text, " ").into_owned();
    }
    text = NULL_RE
        .replace_all(&text, |c: &Captures| {
            if c.get(1).is_some() {
                c[0].to_string()
            } else {
                " ".to_string()
            }
        })
        .into_owned();
    if UNIQUE_RE.is_match(&text) {
        info.unique = true;
        text = UNIQUE_RE.replace_all(&text, " ").into_owned();
    }
    if let Some(c) = CHARSET_RE.captures(&text) {
        info.charset = Some(c[1].to_string());
        text = CHARSET_RE.replace(&text, " ").into_owned();
    }
    if let Some(c) = COLLATE_RE.captures(&text) {
        info.collation = Some(c[1].to_string());
        text = COLLATE_RE.replace(&text, " ").into_owned();
    }

    let text = unmask_literals(&text, &literals);
    let extra = text.split_whitespace().collect::<Vec<_>>().join(" ");
    info.extra = (!extra.is_empty()).then_some(extra);
}
