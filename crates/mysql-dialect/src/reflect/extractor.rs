//! Metadata recovered from `SHOW CREATE TABLE` text.
//!
//! The catalog views do not expose everything: MariaDB stores JSON as
//! `longtext` with a `json_valid()` check, and the table comment lives only in
//! the generated DDL. These extractors scan that text. Text that does not
//! match yields an empty result, never an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::schema::{ForeignKey, Index, ReferentialAction};
use crate::dialect::definition::unescape_literal;

static JSON_CHECK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)json_valid\(\s*`((?:[^`]|``)+)`\s*\)").unwrap());

static FOREIGN_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)CONSTRAINT\s+`((?:[^`]|``)+)`\s+FOREIGN\s+KEY\s*\(([^)]+)\)\s*REFERENCES\s+((?:`(?:[^`]|``)+`\.)?`(?:[^`]|``)+`)\s*\(([^)]+)\)([^\n]*)$",
    )
    .unwrap()
});

static REFERENTIAL_ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ON\s+(DELETE|UPDATE)\s+(RESTRICT|CASCADE|SET\s+NULL|SET\s+DEFAULT|NO\s+ACTION)")
        .unwrap()
});

static UNIQUE_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*UNIQUE\s+(?:KEY|INDEX)\s+`((?:[^`]|``)+)`\s*\((.+?)\)(?:\s+USING\s+\w+)?[^,\n]*,?\s*$")
        .unwrap()
});

static QUOTED_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`((?:[^`]|``)+)`").unwrap());

static TABLE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\)[^\n]*?\bCOMMENT\s*=\s*'((?:[^'\\]|''|\\.)*)'").unwrap()
});

/// Supplementary metadata scraped from generated DDL text.
pub trait DdlMetadataExtractor: Send + Sync {
    /// Columns guarded by a `json_valid(col)` check.
    fn json_columns(&self, ddl: &str) -> Vec<String>;

    /// Foreign keys declared in the DDL, in declaration order.
    fn foreign_keys(&self, ddl: &str) -> Vec<ForeignKey>;

    /// `UNIQUE KEY` indexes.
    fn unique_indexes(&self, ddl: &str) -> Vec<Index>;

    /// Table-level `COMMENT='...'` option.
    fn table_comment(&self, ddl: &str) -> Option<String>;
}

/// Regex-based extractor for MySQL and MariaDB `SHOW CREATE TABLE` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexExtractor;

impl DdlMetadataExtractor for RegexExtractor {
    fn json_columns(&self, ddl: &str) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for caps in JSON_CHECK_RE.captures_iter(ddl) {
            let name = unquote(&caps[1]);
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
        columns
    }

    fn foreign_keys(&self, ddl: &str) -> Vec<ForeignKey> {
        FOREIGN_KEY_RE
            .captures_iter(ddl)
            .map(|caps| {
                let mut reference = quoted_names(&caps[3]);
                let ref_table = reference.pop().unwrap_or_default();
                let ref_schema = reference.pop();

                let mut on_delete = ReferentialAction::default();
                let mut on_update = ReferentialAction::default();
                for action in REFERENTIAL_ACTION_RE.captures_iter(&caps[5]) {
                    let parsed = ReferentialAction::parse(&action[2].split_whitespace().collect::<Vec<_>>().join(" "));
                    if action[1].eq_ignore_ascii_case("DELETE") {
                        on_delete = parsed;
                    } else {
                        on_update = parsed;
                    }
                }

                ForeignKey {
                    name: unquote(&caps[1]),
                    columns: quoted_names(&caps[2]),
                    ref_schema,
                    ref_table,
                    ref_columns: quoted_names(&caps[4]),
                    on_delete,
                    on_update,
                }
            })
            .collect()
    }

    fn unique_indexes(&self, ddl: &str) -> Vec<Index> {
        UNIQUE_KEY_RE
            .captures_iter(ddl)
            .map(|caps| Index {
                name: Some(unquote(&caps[1])),
                columns: quoted_names(&caps[2]),
                unique: true,
                primary: false,
            })
            .collect()
    }

    fn table_comment(&self, ddl: &str) -> Option<String> {
        TABLE_COMMENT_RE
            .captures(ddl)
            .map(|caps| unescape_literal(&caps[1]))
    }
}

fn unquote(name: &str) -> String {
    name.replace("``", "`")
}

/// Every backtick-quoted name in a list such as `` `a`(10),`b` ``.
fn quoted_names(list: &str) -> Vec<String> {
    QUOTED_NAME_RE
        .captures_iter(list)
        .map(|caps| unquote(&caps[1]))
        .collect()
}
