//! CREATE, ALTER and DROP statements.
//!
//! MySQL has no standalone "comment on column" or "rename column" that keeps
//! the column's type, so those builders re-specify the full column definition
//! taken from `SHOW CREATE TABLE` text.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::schema::{ForeignKey, Table};
use crate::core::traits::CreateTableSource;
use crate::dialect::definition::find_closing_paren;
use crate::error::{DialectError, Result};

use super::column::ColumnSchema;
use super::QueryBuilder;

/// One column line of `SHOW CREATE TABLE` output: quoted name, then definition.
static COLUMN_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^\s*[`"](.*?)[`"]\s+(.*?),?\s*$"#).unwrap());

static COMMENT_CLAUSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\bCOMMENT\s+'(?:[^'\\]|''|\\.)*'").unwrap());

static CHECK_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bCHECK\s*\(").unwrap());

/// Index kind placed before `INDEX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Unique,
    Fulltext,
    Spatial,
}

impl IndexType {
    fn as_sql(&self) -> &'static str {
        match self {
            IndexType::Unique => "UNIQUE",
            IndexType::Fulltext => "FULLTEXT",
            IndexType::Spatial => "SPATIAL",
        }
    }
}

/// Index storage method, rendered as `USING <method>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    Btree,
    Hash,
}

impl IndexMethod {
    fn as_sql(&self) -> &'static str {
        match self {
            IndexMethod::Btree => "BTREE",
            IndexMethod::Hash => "HASH",
        }
    }
}

impl QueryBuilder {
    /// CREATE TABLE with one line per column.
    pub fn create_table(
        &self,
        table: &str,
        columns: &[(&str, ColumnSchema)],
        options: Option<&str>,
    ) -> Result<String> {
        if columns.is_empty() {
            return Err(DialectError::InvalidArgument(format!(
                "table {} needs at least one column",
                table
            )));
        }
        let lines = columns
            .iter()
            .map(|(name, column)| {
                format!("\t{} {}", self.column(name), self.column_definition(column))
            })
            .collect::<Vec<_>>()
            .join(",\n");
        let mut sql = format!("CREATE TABLE {} (\n{}\n)", self.table(table), lines);
        if let Some(options) = options.filter(|o| !o.trim().is_empty()) {
            sql.push(' ');
            sql.push_str(options.trim());
        }
        Ok(sql)
    }

    pub fn drop_table(&self, table: &str, if_exists: bool) -> String {
        format!(
            "DROP TABLE {}{}",
            if if_exists { "IF EXISTS " } else { "" },
            self.table(table)
        )
    }

    pub fn rename_table(&self, old_name: &str, new_name: &str) -> String {
        format!("RENAME TABLE {} TO {}", self.table(old_name), self.table(new_name))
    }

    pub fn truncate_table(&self, table: &str) -> String {
        format!("TRUNCATE TABLE {}", self.table(table))
    }

    pub fn add_column(&self, table: &str, column: &str, schema: &ColumnSchema) -> String {
        format!(
            "ALTER TABLE {} ADD {} {}",
            self.table(table),
            self.column(column),
            self.column_definition(schema)
        )
    }

    pub fn drop_column(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {} DROP COLUMN {}", self.table(table), self.column(column))
    }

    /// Change a column's definition in place.
    pub fn alter_column(&self, table: &str, column: &str, schema: &ColumnSchema) -> String {
        format!(
            "ALTER TABLE {} CHANGE {} {} {}",
            self.table(table),
            self.column(column),
            self.column(column),
            self.column_definition(schema)
        )
    }

    pub fn add_primary_key(&self, name: &str, table: &str, columns: &[&str]) -> Result<String> {
        require_columns(columns, "primary key")?;
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.table(table),
            self.column(name),
            self.column_list(columns)
        ))
    }

    /// The constraint name is accepted for symmetry; MySQL has one primary key.
    pub fn drop_primary_key(&self, _name: &str, table: &str) -> String {
        format!("ALTER TABLE {} DROP PRIMARY KEY", self.table(table))
    }

    pub fn add_foreign_key(&self, table: &str, fk: &ForeignKey) -> Result<String> {
        if fk.columns.is_empty() || fk.columns.len() != fk.ref_columns.len() {
            return Err(DialectError::InvalidArgument(format!(
                "foreign key {} needs matching, non-empty column lists",
                fk.name
            )));
        }
        let ref_table = match &fk.ref_schema {
            Some(schema) => format!("{}.{}", schema, fk.ref_table),
            None => fk.ref_table.clone(),
        };
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {} ON UPDATE {}",
            self.table(table),
            self.column(&fk.name),
            self.column_list(&fk.columns),
            self.table(&ref_table),
            self.column_list(&fk.ref_columns),
            fk.on_delete.as_sql(),
            fk.on_update.as_sql()
        ))
    }

    pub fn drop_foreign_key(&self, name: &str, table: &str) -> String {
        format!(
            "ALTER TABLE {} DROP FOREIGN KEY {}",
            self.table(table),
            self.column(name)
        )
    }

    pub fn add_unique(&self, name: &str, table: &str, columns: &[&str]) -> Result<String> {
        require_columns(columns, "unique constraint")?;
        Ok(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
            self.table(table),
            self.column(name),
            self.column_list(columns)
        ))
    }

    /// Unique constraints are unique indexes in MySQL.
    pub fn drop_unique(&self, name: &str, table: &str) -> String {
        self.drop_index(name, table)
    }

    pub fn create_index(
        &self,
        name: &str,
        table: &str,
        columns: &[&str],
        index_type: Option<IndexType>,
        method: Option<IndexMethod>,
    ) -> Result<String> {
        require_columns(columns, "index")?;
        let mut sql = String::from("CREATE ");
        if let Some(index_type) = index_type {
            sql.push_str(index_type.as_sql());
            sql.push(' ');
        }
        sql.push_str("INDEX ");
        sql.push_str(&self.column(name));
        if let Some(method) = method {
            sql.push_str(" USING ");
            sql.push_str(method.as_sql());
        }
        sql.push_str(&format!(" ON {} ({})", self.table(table), self.column_list(columns)));
        Ok(sql)
    }

    pub fn drop_index(&self, name: &str, table: &str) -> String {
        format!("DROP INDEX {} ON {}", self.column(name), self.table(table))
    }

    pub fn add_check(&self, _name: &str, _table: &str, _expression: &str) -> Result<String> {
        Err(DialectError::unsupported("adding CHECK constraints via ALTER TABLE"))
    }

    pub fn drop_check(&self, _name: &str, _table: &str) -> Result<String> {
        Err(DialectError::unsupported("dropping CHECK constraints via ALTER TABLE"))
    }

    pub fn add_default_value(
        &self,
        _name: &str,
        _table: &str,
        _column: &str,
        _value: &str,
    ) -> Result<String> {
        Err(DialectError::unsupported("named DEFAULT constraints"))
    }

    pub fn drop_default_value(&self, _name: &str, _table: &str) -> Result<String> {
        Err(DialectError::unsupported("named DEFAULT constraints"))
    }

    /// Set a column comment by re-issuing its full definition.
    ///
    /// Any existing comment is replaced and an inline CHECK clause is moved
    /// after the new comment, as MySQL requires.
    pub fn add_comment_on_column(
        &self,
        table: &str,
        column: &str,
        comment: &str,
        source: &mut dyn CreateTableSource,
    ) -> Result<String> {
        let definition = self
            .column_definition_from_ddl(table, column, source)?
            .ok_or_else(|| {
                DialectError::InvalidArgument(format!(
                    "column {} not found in CREATE TABLE text of {}",
                    column, table
                ))
            })?;

        let definition = COMMENT_CLAUSE_RE.replace_all(&definition, "").into_owned();
        let (definition, check) = extract_check(&definition);

        let mut sql = format!(
            "ALTER TABLE {} CHANGE {} {}",
            self.table(table),
            self.column(column),
            self.column(column)
        );
        if !definition.is_empty() {
            sql.push(' ');
            sql.push_str(&definition);
        }
        sql.push_str(" COMMENT ");
        sql.push_str(&self.quoter().quote_value(comment));
        if let Some(check) = check {
            sql.push(' ');
            sql.push_str(&check);
        }
        Ok(sql)
    }

    pub fn drop_comment_from_column(
        &self,
        table: &str,
        column: &str,
        source: &mut dyn CreateTableSource,
    ) -> Result<String> {
        self.add_comment_on_column(table, column, "", source)
    }

    pub fn add_comment_on_table(&self, table: &str, comment: &str) -> String {
        format!(
            "ALTER TABLE {} COMMENT {}",
            self.table(table),
            self.quoter().quote_value(comment)
        )
    }

    pub fn drop_comment_from_table(&self, table: &str) -> String {
        self.add_comment_on_table(table, "")
    }

    /// Rename a column, keeping its definition when it can be found.
    ///
    /// Falls back to `CHANGE old new` without a definition when the table or
    /// column is missing from the CREATE TABLE text.
    pub fn rename_column(
        &self,
        table: &str,
        old_name: &str,
        new_name: &str,
        source: &mut dyn CreateTableSource,
    ) -> Result<String> {
        let mut sql = format!(
            "ALTER TABLE {} CHANGE {} {}",
            self.table(table),
            self.column(old_name),
            self.column(new_name)
        );
        match self.column_definition_from_ddl(table, old_name, source)? {
            Some(definition) if !definition.is_empty() => {
                sql.push(' ');
                sql.push_str(&definition);
            }
            _ => tracing::debug!(
                "No definition found for {}.{}; emitting bare CHANGE",
                table,
                old_name
            ),
        }
        Ok(sql)
    }

    /// Toggle foreign key checks for the session.
    ///
    /// Schema and table are accepted for interface parity; MySQL only has a
    /// session-wide switch.
    pub fn check_integrity(&self, _schema: &str, _table: &str, check: bool) -> String {
        format!("SET FOREIGN_KEY_CHECKS = {}", if check { 1 } else { 0 })
    }

    /// Reset the auto-increment counter.
    ///
    /// Without a value the counter is set to `MAX(pk) + 1`. `ALTER TABLE ...
    /// AUTO_INCREMENT` only takes a literal, so that form is a short script
    /// that prepares the statement from a session variable.
    pub fn reset_sequence(&self, table: &Table, value: Option<u64>) -> Result<String> {
        if !table.sequence.is_present() {
            return Err(DialectError::InvalidArgument(format!(
                "there is no sequence associated with table {}",
                table.full_name()
            )));
        }
        let quoted = self.table(&table.full_name());

        if let Some(value) = value {
            return Ok(format!("ALTER TABLE {} AUTO_INCREMENT={}", quoted, value));
        }

        let pk = table.primary_key.first().ok_or_else(|| {
            DialectError::InvalidArgument(format!(
                "table {} has no primary key to compute the next value from",
                table.full_name()
            ))
        })?;
        let prefix = self
            .quoter()
            .quote_value(&format!("ALTER TABLE {} AUTO_INCREMENT=", quoted));

        Ok([
            format!(
                "SET @new_autoincrement_value := (SELECT COALESCE(MAX({}), 0) + 1 FROM {})",
                self.column(pk),
                quoted
            ),
            format!("SET @sql = CONCAT({}, @new_autoincrement_value)", prefix),
            "PREPARE autoincrement_stmt FROM @sql".to_string(),
            "EXECUTE autoincrement_stmt".to_string(),
            "DEALLOCATE PREPARE autoincrement_stmt".to_string(),
        ]
        .join(";\n"))
    }

    pub fn create_view(&self, name: &str, select_sql: &str) -> String {
        format!("CREATE VIEW {} AS {}", self.table(name), select_sql)
    }

    pub fn drop_view(&self, name: &str) -> String {
        format!("DROP VIEW {}", self.table(name))
    }

    pub fn create_database(&self, name: &str) -> String {
        format!("CREATE DATABASE IF NOT EXISTS {}", self.table(name))
    }

    /// Definition text of `column` from the table's CREATE TABLE statement.
    fn column_definition_from_ddl(
        &self,
        table: &str,
        column: &str,
        source: &mut dyn CreateTableSource,
    ) -> Result<Option<String>> {
        let Some(ddl) = source.create_table_sql(table)? else {
            return Ok(None);
        };
        let wanted = self.quoter().unquote_simple_name(column);
        Ok(COLUMN_LINE_RE
            .captures_iter(&ddl)
            .find(|c| c[1].eq_ignore_ascii_case(&wanted))
            .map(|c| c[2].trim().to_string()))
    }
}

fn require_columns(columns: &[&str], what: &str) -> Result<()> {
    if columns.is_empty() {
        return Err(DialectError::InvalidArgument(format!(
            "{} needs at least one column",
            what
        )));
    }
    Ok(())
}

/// Split an inline `CHECK (...)` clause off a column definition.
fn extract_check(definition: &str) -> (String, Option<String>) {
    let Some(m) = CHECK_KEYWORD_RE.find(definition) else {
        return (definition.trim().to_string(), None);
    };
    let open = m.end() - 1;
    match find_closing_paren(definition, open) {
        Some(close) => {
            let check = definition[m.start()..=close].to_string();
            let rest = format!("{} {}", &definition[..m.start()], &definition[close + 1..]);
            let rest = rest.split_whitespace().collect::<Vec<_>>().join(" ");
            (rest, Some(check))
        }
        None => (definition.trim().to_string(), None),
    }
}
