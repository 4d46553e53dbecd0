//! Schema reflection.
//!
//! [`SchemaReflector`] reads the catalog of a live server back into the
//! engine-independent [`Table`] model. Structured data comes from
//! `SHOW FULL COLUMNS` and the `information_schema` views; anything those do
//! not expose (JSON columns on MariaDB, the table comment, foreign keys of a
//! table that vanished from the catalog) is recovered from the cached
//! `SHOW CREATE TABLE` text through a [`DdlMetadataExtractor`].

pub mod cache;
pub mod extractor;
pub mod queries;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info};

use crate::core::identifier::split_name;
use crate::core::schema::{Column, DefaultValue, ForeignKey, Index, ReferentialAction, SequenceName, Table};
use crate::core::traits::{CacheKey, MetadataCache, QueryExecutor, Row};
use crate::core::value::{Params, SqlValue};
use crate::dialect::definition::{self, unescape_literal};
use crate::dialect::{AbstractType, DialectRules, EngineVariant};
use crate::error::{DialectError, Result};

pub use cache::MemoryCache;
pub use extractor::{DdlMetadataExtractor, RegexExtractor};

use queries::{
    CONSTRAINTS_SQL, ER_BAD_DB_ERROR, ER_NO_SUCH_TABLE, INDEXES_SQL, SQLSTATE_NO_SUCH_TABLE,
    SYSTEM_SCHEMAS,
};

/// `CURRENT_TIMESTAMP` as reported by MySQL, and `current_timestamp()` as
/// reported by MariaDB, with optional fractional precision.
static CURRENT_TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:current_timestamp|now)(?:\(\s*(\d*)\s*\))?$").unwrap()
});

static BIT_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[bB]'([01]*)'$").unwrap());

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").unwrap());

/// Primary key, foreign keys and unique constraints of one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableConstraints {
    pub primary_key: Option<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub uniques: Vec<Index>,
}

/// Reads table metadata from a live server.
///
/// Keeps per-table caches of the raw `CREATE TABLE` text and of the combined
/// constraint query; [`SchemaReflector::refresh`] drops both along with the
/// external cache entry.
pub struct SchemaReflector {
    rules: Arc<DialectRules>,
    extractor: Box<dyn DdlMetadataExtractor>,
    cache: Option<Arc<dyn MetadataCache>>,
    create_sql: HashMap<String, String>,
    constraints: HashMap<String, Arc<TableConstraints>>,
}

impl SchemaReflector {
    pub fn new(rules: Arc<DialectRules>) -> Self {
        Self {
            rules,
            extractor: Box::new(RegexExtractor),
            cache: None,
            create_sql: HashMap::new(),
            constraints: HashMap::new(),
        }
    }

    /// Replace the DDL-text extractor.
    pub fn with_extractor(mut self, extractor: Box<dyn DdlMetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Attach an external table cache.
    pub fn with_cache(mut self, cache: Arc<dyn MetadataCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn rules(&self) -> &DialectRules {
        &self.rules
    }

    /// Reflect one table; `Ok(None)` when it does not exist.
    ///
    /// With `refresh` set, cached data for the table is discarded first.
    pub fn table_schema(
        &mut self,
        exec: &mut dyn QueryExecutor,
        name: &str,
        refresh: bool,
    ) -> Result<Option<Arc<Table>>> {
        let target = exec.target();
        let key = CacheKey::new(self.rules.name(), target.clone(), name);

        if refresh {
            self.refresh(&target, name);
        } else if let Some(table) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!("Metadata cache hit for {}", name);
            return Ok(Some(table));
        }

        let table = match self.load_table(exec, name)? {
            Some(table) => Arc::new(table),
            None => return Ok(None),
        };
        if let Some(cache) = &self.cache {
            cache.set(key, Arc::clone(&table));
        }
        Ok(Some(table))
    }

    /// Drop every cached fact about one table.
    pub fn refresh(&mut self, target: &str, name: &str) {
        self.create_sql.remove(name);
        self.constraints.remove(name);
        if let Some(cache) = &self.cache {
            cache.invalidate(&CacheKey::new(self.rules.name(), target, name));
        }
    }

    /// Drop cached facts about every table of a connection target.
    pub fn refresh_all(&mut self, target: &str) {
        self.create_sql.clear();
        self.constraints.clear();
        if let Some(cache) = &self.cache {
            cache.invalidate_tag(&CacheKey::new(self.rules.name(), target, "").tag());
        }
    }

    /// Raw `SHOW CREATE TABLE` text; `Ok(None)` when the table does not exist.
    pub fn create_table_sql(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Option<String>> {
        if let Some(sql) = self.create_sql.get(name) {
            return Ok(Some(sql.clone()));
        }

        let sql = format!("SHOW CREATE TABLE {}", self.rules.quoter.quote_table_name(name));
        let rows = match exec.query(&sql, &Params::new()) {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => return Ok(None),
            Err(e) => return Err(e),
        };

        let ddl = rows
            .first()
            .and_then(|row| row.at(1))
            .and_then(SqlValue::to_text);
        if let Some(ddl) = &ddl {
            self.create_sql.insert(name.to_string(), ddl.clone());
        }
        Ok(ddl)
    }

    /// Base table names of a schema, or of the current database.
    pub fn table_names(&mut self, exec: &mut dyn QueryExecutor, schema: Option<&str>) -> Result<Vec<String>> {
        self.list_tables(exec, schema, "BASE TABLE")
    }

    /// View names of a schema, or of the current database.
    pub fn view_names(&mut self, exec: &mut dyn QueryExecutor, schema: Option<&str>) -> Result<Vec<String>> {
        self.list_tables(exec, schema, "VIEW")
    }

    fn list_tables(
        &self,
        exec: &mut dyn QueryExecutor,
        schema: Option<&str>,
        table_type: &str,
    ) -> Result<Vec<String>> {
        let sql = match schema {
            Some(schema) => format!(
                "SHOW FULL TABLES FROM {}",
                self.rules.quoter.quote_simple_table_name(schema)
            ),
            None => "SHOW FULL TABLES".to_string(),
        };
        let names = exec
            .query(&sql, &Params::new())?
            .iter()
            .filter(|row| {
                row.at(1)
                    .and_then(SqlValue::as_str)
                    .is_some_and(|t| t.eq_ignore_ascii_case(table_type))
            })
            .filter_map(|row| row.at(0).and_then(SqlValue::to_text))
            .collect();
        Ok(names)
    }

    /// User schema names, excluding the server's system schemas.
    pub fn schema_names(&mut self, exec: &mut dyn QueryExecutor) -> Result<Vec<String>> {
        let names = exec
            .query("SHOW DATABASES", &Params::new())?
            .iter()
            .filter_map(|row| row.at(0).and_then(SqlValue::to_text))
            .filter(|name| !SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(name)))
            .collect();
        Ok(names)
    }

    pub fn table_primary_key(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Option<Index>> {
        Ok(self.load_constraints(exec, name)?.primary_key.clone())
    }

    pub fn table_foreign_keys(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Vec<ForeignKey>> {
        Ok(self.load_constraints(exec, name)?.foreign_keys.clone())
    }

    pub fn table_uniques(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Vec<Index>> {
        Ok(self.load_constraints(exec, name)?.uniques.clone())
    }

    /// Every index of a table, primary key included, from the statistics view.
    pub fn table_indexes(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Vec<Index>> {
        let rows = exec.query(INDEXES_SQL, &self.catalog_params(name))?;

        let mut indexes: Vec<Index> = Vec::new();
        for row in &rows {
            let Some(index_name) = row.text("name") else {
                continue;
            };
            let column = row.text("column_name").unwrap_or_default();
            match indexes
                .iter_mut()
                .find(|i| i.name.as_deref() == Some(index_name.as_str()))
            {
                Some(index) => index.columns.push(column),
                None => indexes.push(Index {
                    name: Some(index_name),
                    columns: vec![column],
                    unique: flag(row, "index_is_unique"),
                    primary: flag(row, "index_is_primary"),
                }),
            }
        }
        Ok(indexes)
    }

    /// Unique indexes declared in the `CREATE TABLE` text.
    pub fn find_unique_indexes(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Vec<Index>> {
        Ok(self
            .create_table_sql(exec, name)?
            .map(|ddl| self.extractor.unique_indexes(&ddl))
            .unwrap_or_default())
    }

    /// Run the combined constraint query once per table and partition it.
    fn load_constraints(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Arc<TableConstraints>> {
        if let Some(constraints) = self.constraints.get(name) {
            return Ok(Arc::clone(constraints));
        }

        let constraints = match exec.query(CONSTRAINTS_SQL, &self.catalog_params(name)) {
            Ok(rows) => partition_constraints(&rows),
            Err(e) if is_missing_table(&e) => {
                debug!("Constraint catalog unavailable for {}, reading CREATE TABLE text", name);
                let ddl = self.create_table_sql(exec, name)?.unwrap_or_default();
                TableConstraints {
                    primary_key: None,
                    foreign_keys: self.extractor.foreign_keys(&ddl),
                    uniques: self.extractor.unique_indexes(&ddl),
                }
            }
            Err(e) => return Err(e),
        };

        let constraints = Arc::new(constraints);
        self.constraints
            .insert(name.to_string(), Arc::clone(&constraints));
        Ok(constraints)
    }

    fn load_table(&mut self, exec: &mut dyn QueryExecutor, name: &str) -> Result<Option<Table>> {
        let (schema, table_name) = self.resolve_name(name);

        let Some(ddl) = self.create_table_sql(exec, name)? else {
            debug!("Table {} does not exist", name);
            return Ok(None);
        };

        let sql = format!("SHOW FULL COLUMNS FROM {}", self.rules.quoter.quote_table_name(name));
        let rows = match exec.query(&sql, &Params::new()) {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => {
                self.create_sql.remove(name);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let json_columns = self.extractor.json_columns(&ddl);
        let mut table = Table::new(schema, table_name);
        for row in &rows {
            let column = self.load_column(row, &json_columns)?;
            if column.primary_key {
                table.primary_key.push(column.name.clone());
            }
            table.columns.push(column);
        }
        if table.columns.iter().any(|c| c.auto_increment) {
            table.sequence = SequenceName::Unresolved;
        }

        let constraints = self.load_constraints(exec, name)?;
        if let Some(pk) = &constraints.primary_key {
            table.primary_key = pk.columns.clone();
        }
        table.foreign_keys = constraints.foreign_keys.clone();

        table.indexes = match self.table_indexes(exec, name) {
            Ok(indexes) => indexes,
            Err(e) if is_missing_table(&e) => self.extractor.unique_indexes(&ddl),
            Err(e) => return Err(e),
        };
        for index in table.indexes.iter().filter(|i| i.unique && i.columns.len() == 1) {
            if let Some(column) = table
                .columns
                .iter_mut()
                .find(|c| c.name.eq_ignore_ascii_case(&index.columns[0]))
            {
                column.unique = true;
            }
        }

        table.comment = self.extractor.table_comment(&ddl);
        table.create_sql = Some(ddl);

        info!(
            "Reflected {}: {} columns, {} foreign keys, {} indexes",
            name,
            table.columns.len(),
            table.foreign_keys.len(),
            table.indexes.len()
        );
        Ok(Some(table))
    }

    /// Build a column from one `SHOW FULL COLUMNS` row.
    fn load_column(&self, row: &Row, json_columns: &[String]) -> Result<Column> {
        let name = row
            .text("Field")
            .ok_or_else(|| DialectError::parse("SHOW FULL COLUMNS row without a Field value"))?;
        let db_type = row.text("Type").unwrap_or_default();
        let info = definition::parse(&db_type)?;

        let mut column = self.rules.type_map.from_db_type(&name, &db_type, &info);
        column.nullable = row
            .get("Null")
            .and_then(SqlValue::as_bool)
            .unwrap_or(true);
        column.primary_key = row.text("Key").is_some_and(|k| k.eq_ignore_ascii_case("PRI"));

        let extra = row.text("Extra").unwrap_or_default();
        let mut generated_default = false;
        let remainder: Vec<&str> = extra
            .split_whitespace()
            .filter(|word| {
                if word.eq_ignore_ascii_case("auto_increment") {
                    column.auto_increment = true;
                    false
                } else if word.eq_ignore_ascii_case("DEFAULT_GENERATED") {
                    generated_default = true;
                    false
                } else {
                    true
                }
            })
            .collect();
        column.extra = (!remainder.is_empty()).then(|| remainder.join(" "));

        column.collation = row.text("Collation").filter(|c| !c.is_empty());
        if let Some(collation) = &column.collation {
            column.charset = collation.split('_').next().map(str::to_string);
        }
        column.comment = row.text("Comment").filter(|c| !c.is_empty());

        if matches!(column.abstract_type, AbstractType::Text | AbstractType::String)
            && json_columns.iter().any(|c| c.eq_ignore_ascii_case(&name))
        {
            column.abstract_type = AbstractType::Json;
        }

        column.default_value = self.normalize_default(&column, row.get("Default"), generated_default);
        Ok(column)
    }

    /// Normalize the catalog's textual default into a literal or expression.
    fn normalize_default(
        &self,
        column: &Column,
        raw: Option<&SqlValue>,
        generated: bool,
    ) -> Option<DefaultValue> {
        let text = raw?.to_text()?;
        let text = text.trim();
        if text.eq_ignore_ascii_case("NULL") {
            return None;
        }

        let temporal = matches!(
            column.abstract_type,
            AbstractType::DateTime | AbstractType::Timestamp | AbstractType::Date | AbstractType::Time
        );
        if temporal {
            if let Some(caps) = CURRENT_TIMESTAMP_RE.captures(text) {
                return Some(match caps.get(1).map(|m| m.as_str()).filter(|p| !p.is_empty()) {
                    Some(precision) => DefaultValue::expression(format!("CURRENT_TIMESTAMP({})", precision)),
                    None => DefaultValue::expression("CURRENT_TIMESTAMP"),
                });
            }
        }

        if let Some(caps) = BIT_LITERAL_RE.captures(text) {
            let bits = &caps[1];
            let value = if bits.is_empty() {
                0
            } else {
                u64::from_str_radix(bits, 2).ok()?
            };
            return Some(DefaultValue::Literal(typed_literal(
                column.abstract_type,
                &value.to_string(),
            )));
        }

        if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') {
            let literal = unescape_literal(&text[1..text.len() - 1]);
            return Some(DefaultValue::Literal(typed_literal(column.abstract_type, &literal)));
        }

        let expression = generated
            || (self.rules.engine == EngineVariant::Mariadb && !NUMERIC_RE.is_match(text));
        if expression {
            return Some(DefaultValue::expression(text));
        }
        Some(DefaultValue::Literal(typed_literal(column.abstract_type, text)))
    }

    fn catalog_params(&self, name: &str) -> Params {
        let (schema, table) = self.resolve_name(name);
        Params::new()
            .with("schemaName", schema)
            .with("tableName", table)
    }

    /// Split `db.table` into its unquoted parts.
    fn resolve_name(&self, name: &str) -> (Option<String>, String) {
        let mut parts: Vec<String> = split_name(name)
            .iter()
            .map(|part| self.rules.quoter.unquote_simple_name(part))
            .collect();
        let table = parts.pop().unwrap_or_default();
        (parts.pop(), table)
    }
}

impl std::fmt::Debug for SchemaReflector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaReflector")
            .field("rules", &self.rules)
            .field("cached_ddl", &self.create_sql.len())
            .field("cached_constraints", &self.constraints.len())
            .field("external_cache", &self.cache.is_some())
            .finish()
    }
}

/// Whether an error means the table (or its database) does not exist.
fn is_missing_table(err: &DialectError) -> bool {
    match err {
        DialectError::Engine { code, state, .. } => {
            *code == ER_NO_SUCH_TABLE || *code == ER_BAD_DB_ERROR || state == SQLSTATE_NO_SUCH_TABLE
        }
        _ => false,
    }
}

fn flag(row: &Row, name: &str) -> bool {
    row.get(name).and_then(SqlValue::as_bool).unwrap_or(false)
}

fn partition_constraints(rows: &[Row]) -> TableConstraints {
    let mut constraints = TableConstraints::default();
    for row in rows {
        let (Some(name), Some(column)) = (row.text("constraint_name"), row.text("column_name")) else {
            continue;
        };
        let kind = row.text("constraint_type").unwrap_or_default().to_uppercase();

        match kind.as_str() {
            "PRIMARY KEY" => {
                let pk = constraints.primary_key.get_or_insert_with(|| Index {
                    name: Some(name.clone()),
                    columns: Vec::new(),
                    unique: true,
                    primary: true,
                });
                pk.columns.push(column);
            }
            "UNIQUE" => match constraints
                .uniques
                .iter_mut()
                .find(|u| u.name.as_deref() == Some(name.as_str()))
            {
                Some(unique) => unique.columns.push(column),
                None => constraints.uniques.push(Index {
                    name: Some(name),
                    columns: vec![column],
                    unique: true,
                    primary: false,
                }),
            },
            "FOREIGN KEY" => {
                let ref_column = row.text("foreign_column_name").unwrap_or_default();
                match constraints.foreign_keys.iter_mut().find(|fk| fk.name == name) {
                    Some(fk) => {
                        fk.columns.push(column);
                        fk.ref_columns.push(ref_column);
                    }
                    None => constraints.foreign_keys.push(ForeignKey {
                        name,
                        columns: vec![column],
                        ref_schema: row.text("foreign_table_schema"),
                        ref_table: row.text("foreign_table_name").unwrap_or_default(),
                        ref_columns: vec![ref_column],
                        on_delete: ReferentialAction::parse(&row.text("on_delete").unwrap_or_default()),
                        on_update: ReferentialAction::parse(&row.text("on_update").unwrap_or_default()),
                    }),
                }
            }
            _ => {}
        }
    }
    constraints
}

/// Literal default typed after the column it belongs to.
fn typed_literal(abstract_type: AbstractType, text: &str) -> SqlValue {
    let fallback = || SqlValue::Text(text.to_string());
    match abstract_type {
        AbstractType::Boolean => text
            .parse::<i64>()
            .map(|v| SqlValue::Bool(v != 0))
            .unwrap_or_else(|_| fallback()),
        t if t.is_integer() || t == AbstractType::Bit => text
            .parse::<i64>()
            .map(SqlValue::Int)
            .or_else(|_| text.parse::<u64>().map(SqlValue::UInt))
            .unwrap_or_else(|_| fallback()),
        AbstractType::Float | AbstractType::Double => text
            .parse::<f64>()
            .map(SqlValue::Double)
            .unwrap_or_else(|_| fallback()),
        AbstractType::Json => serde_json::from_str(text)
            .map(SqlValue::Json)
            .unwrap_or_else(|_| fallback()),
        _ => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::{ColumnSchema, QueryBuilder};
    use crate::testing::ScriptedExecutor;

    const COLUMN_FIELDS: [&str; 9] = [
        "Field", "Type", "Collation", "Null", "Key", "Default", "Extra", "Privileges", "Comment",
    ];

    #[allow(clippy::too_many_arguments)]
    fn column_row(
        field: &str,
        db_type: &str,
        collation: Option<&str>,
        null: &str,
        key: &str,
        default: Option<&str>,
        extra: &str,
        comment: &str,
    ) -> Row {
        Row::new(
            COLUMN_FIELDS.iter().map(|f| f.to_string()).collect(),
            vec![
                field.into(),
                db_type.into(),
                collation.into(),
                null.into(),
                key.into(),
                default.into(),
                extra.into(),
                "select,insert,update,references".into(),
                comment.into(),
            ],
        )
    }

    fn create_row(table: &str, ddl: &str) -> Row {
        Row::from_pairs([("Table", table), ("Create Table", ddl)])
    }

    fn constraint_row(
        name: &str,
        column: &str,
        kind: &str,
        foreign: Option<(&str, &str, &str)>,
        actions: Option<(&str, &str)>,
    ) -> Row {
        let (schema, table, ref_column) = match foreign {
            Some((s, t, c)) => (Some(s), Some(t), Some(c)),
            None => (None, None, None),
        };
        Row::new(
            [
                "constraint_name",
                "column_name",
                "constraint_type",
                "foreign_table_schema",
                "foreign_table_name",
                "foreign_column_name",
                "on_update",
                "on_delete",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            vec![
                name.into(),
                column.into(),
                kind.into(),
                schema.into(),
                table.into(),
                ref_column.into(),
                actions.map(|a| a.0).into(),
                actions.map(|a| a.1).into(),
            ],
        )
    }

    fn index_row(name: &str, column: &str, unique: bool, primary: bool) -> Row {
        Row::from_pairs([
            ("name", SqlValue::from(name)),
            ("column_name", SqlValue::from(column)),
            ("index_is_unique", SqlValue::Int(i64::from(unique))),
            ("index_is_primary", SqlValue::Int(i64::from(primary))),
        ])
    }

    const ORDERS_DDL: &str = "CREATE TABLE `orders` (
  `id` int(10) unsigned NOT NULL AUTO_INCREMENT,
  `customer_id` int(11) NOT NULL,
  `status` enum('new','paid','it''s shipped') NOT NULL DEFAULT 'new',
  `flags` bit(8) NOT NULL DEFAULT b'101',
  `payload` longtext CHARACTER SET utf8mb4 COLLATE utf8mb4_bin DEFAULT NULL CHECK (json_valid(`payload`)),
  `created_at` datetime(3) NOT NULL DEFAULT current_timestamp(3),
  `email` varchar(255) NOT NULL COMMENT 'Contact address',
  PRIMARY KEY (`id`),
  UNIQUE KEY `uq_email` (`email`),
  CONSTRAINT `fk_orders_customer` FOREIGN KEY (`customer_id`) REFERENCES `customer` (`id`) ON DELETE CASCADE
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COMMENT='All orders'";

    fn script_orders(exec: &mut ScriptedExecutor) {
        exec.on_rows("SHOW CREATE TABLE `orders`", vec![create_row("orders", ORDERS_DDL)]);
        exec.on_rows(
            "SHOW FULL COLUMNS FROM `orders`",
            vec![
                column_row("id", "int(10) unsigned", None, "NO", "PRI", None, "auto_increment", ""),
                column_row("customer_id", "int(11)", None, "NO", "MUL", None, "", ""),
                column_row(
                    "status",
                    "enum('new','paid','it''s shipped')",
                    Some("utf8mb4_general_ci"),
                    "NO",
                    "",
                    Some("'new'"),
                    "",
                    "",
                ),
                column_row("flags", "bit(8)", None, "NO", "", Some("b'101'"), "", ""),
                column_row("payload", "longtext", Some("utf8mb4_bin"), "YES", "", Some("NULL"), "", ""),
                column_row("created_at", "datetime(3)", None, "NO", "", Some("current_timestamp(3)"), "", ""),
                column_row(
                    "email",
                    "varchar(255)",
                    Some("utf8mb4_general_ci"),
                    "NO",
                    "UNI",
                    None,
                    "",
                    "Contact address",
                ),
            ],
        );
        exec.on_rows(
            "KEY_COLUMN_USAGE",
            vec![
                constraint_row(
                    "fk_orders_customer",
                    "customer_id",
                    "FOREIGN KEY",
                    Some(("shop", "customer", "id")),
                    Some(("NO ACTION", "CASCADE")),
                ),
                constraint_row("PRIMARY", "id", "PRIMARY KEY", None, None),
                constraint_row("uq_email", "email", "UNIQUE", None, None),
            ],
        );
        exec.on_rows(
            "STATISTICS",
            vec![
                index_row("PRIMARY", "id", true, true),
                index_row("fk_orders_customer", "customer_id", false, false),
                index_row("uq_email", "email", true, false),
            ],
        );
    }

    fn mariadb_reflector() -> SchemaReflector {
        SchemaReflector::new(Arc::new(DialectRules::mariadb()))
    }

    #[test]
    fn test_reflect_table() {
        let mut exec = ScriptedExecutor::new();
        script_orders(&mut exec);
        let mut reflector = mariadb_reflector();

        let table = reflector
            .table_schema(&mut exec, "orders", false)
            .unwrap()
            .unwrap();

        assert_eq!(table.name, "orders");
        assert_eq!(table.schema, None);
        assert_eq!(table.column_names(), vec!["id", "customer_id", "status", "flags", "payload", "created_at", "email"]);
        assert_eq!(table.primary_key, vec!["id"]);
        assert_eq!(table.sequence, SequenceName::Unresolved);
        assert_eq!(table.comment.as_deref(), Some("All orders"));
        assert!(table.create_sql.as_deref().is_some_and(|s| s.starts_with("CREATE TABLE")));

        let id = table.column("id").unwrap();
        assert!(id.primary_key && id.auto_increment && id.unsigned && !id.nullable);
        assert_eq!(id.abstract_type, AbstractType::Integer);
        assert_eq!(id.extra, None);

        let status = table.column("status").unwrap();
        assert_eq!(status.abstract_type, AbstractType::Enum);
        assert_eq!(status.enum_values, vec!["new", "paid", "it's shipped"]);
        assert_eq!(status.default_value, Some(DefaultValue::Literal("new".into())));
        assert_eq!(status.charset.as_deref(), Some("utf8mb4"));

        let flags = table.column("flags").unwrap();
        assert_eq!(flags.default_value, Some(DefaultValue::Literal(SqlValue::Int(5))));

        let payload = table.column("payload").unwrap();
        assert_eq!(payload.abstract_type, AbstractType::Json);
        assert_eq!(payload.default_value, None);
        assert!(payload.nullable);

        let created = table.column("created_at").unwrap();
        assert_eq!(
            created.default_value,
            Some(DefaultValue::expression("CURRENT_TIMESTAMP(3)"))
        );

        let email = table.column("email").unwrap();
        assert!(email.unique);
        assert_eq!(email.comment.as_deref(), Some("Contact address"));

        assert_eq!(table.foreign_keys.len(), 1);
        let fk = &table.foreign_keys[0];
        assert_eq!(fk.ref_schema.as_deref(), Some("shop"));
        assert_eq!(fk.ref_table, "customer");
        assert_eq!(fk.on_delete, ReferentialAction::Cascade);
        assert_eq!(fk.on_update, ReferentialAction::NoAction);

        assert_eq!(table.indexes.len(), 3);
        assert_eq!(table.unique_indexes().count(), 1);
    }

    #[test]
    fn test_missing_table_is_absent() {
        let mut exec = ScriptedExecutor::new();
        exec.on_error(
            "SHOW CREATE TABLE",
            DialectError::engine(1146, "42S02", "Table 'app.ghost' doesn't exist"),
        );
        let mut reflector = SchemaReflector::new(Arc::new(DialectRules::mysql()));
        assert!(reflector.table_schema(&mut exec, "ghost", false).unwrap().is_none());
        assert_eq!(exec.log.len(), 1);
    }

    #[test]
    fn test_other_errors_propagate() {
        let mut exec = ScriptedExecutor::new();
        exec.on_error(
            "SHOW CREATE TABLE",
            DialectError::engine(1142, "42000", "SELECT command denied"),
        );
        let mut reflector = SchemaReflector::new(Arc::new(DialectRules::mysql()));
        let err = reflector.table_schema(&mut exec, "secret", false).unwrap_err();
        assert_eq!(err.engine_code(), Some(1142));
    }

    #[test]
    fn test_qualified_name_binds_schema() {
        let mut exec = ScriptedExecutor::new();
        let mut reflector = SchemaReflector::new(Arc::new(DialectRules::mysql()));
        reflector.table_foreign_keys(&mut exec, "shop.orders").unwrap();

        let params = &exec.params[0];
        assert_eq!(params.get("schemaName"), Some(&SqlValue::from("shop")));
        assert_eq!(params.get("tableName"), Some(&SqlValue::from("orders")));

        reflector.table_indexes(&mut exec, "orders").unwrap();
        assert_eq!(exec.params[1].get("schemaName"), Some(&SqlValue::Null));
    }

    #[test]
    fn test_constraint_kinds_share_one_query() {
        let mut exec = ScriptedExecutor::new();
        script_orders(&mut exec);
        let mut reflector = mariadb_reflector();

        let pk = reflector.table_primary_key(&mut exec, "orders").unwrap().unwrap();
        assert_eq!(pk.columns, vec!["id"]);
        let uniques = reflector.table_uniques(&mut exec, "orders").unwrap();
        assert_eq!(uniques[0].name.as_deref(), Some("uq_email"));
        let fks = reflector.table_foreign_keys(&mut exec, "orders").unwrap();
        assert_eq!(fks.len(), 1);

        let constraint_queries = exec.log.iter().filter(|s| s.contains("KEY_COLUMN_USAGE")).count();
        assert_eq!(constraint_queries, 1);
    }

    #[test]
    fn test_foreign_keys_fall_back_to_ddl_text() {
        let mut exec = ScriptedExecutor::new();
        exec.on_error(
            "KEY_COLUMN_USAGE",
            DialectError::engine(1146, "42S02", "Table 'app.orders' doesn't exist"),
        );
        exec.on_rows("SHOW CREATE TABLE", vec![create_row("orders", ORDERS_DDL)]);
        let mut reflector = mariadb_reflector();

        let fks = reflector.table_foreign_keys(&mut exec, "orders").unwrap();
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].name, "fk_orders_customer");
        assert_eq!(fks[0].ref_table, "customer");
        assert_eq!(fks[0].on_delete, ReferentialAction::Cascade);
    }

    #[test]
    fn test_find_unique_indexes_uses_cached_ddl() {
        let mut exec = ScriptedExecutor::new();
        exec.on_rows("SHOW CREATE TABLE", vec![create_row("orders", ORDERS_DDL)]);
        let mut reflector = mariadb_reflector();

        let uniques = reflector.find_unique_indexes(&mut exec, "orders").unwrap();
        assert_eq!(uniques.len(), 1);
        assert_eq!(uniques[0].columns, vec!["email"]);

        reflector.find_unique_indexes(&mut exec, "orders").unwrap();
        assert_eq!(exec.log.len(), 1);
    }

    #[test]
    fn test_table_and_schema_listing() {
        let mut exec = ScriptedExecutor::new();
        let tables = vec![
            Row::from_pairs([("Tables_in_app", "orders"), ("Table_type", "BASE TABLE")]),
            Row::from_pairs([("Tables_in_app", "order_totals"), ("Table_type", "VIEW")]),
            Row::from_pairs([("Tables_in_app", "customer"), ("Table_type", "BASE TABLE")]),
        ];
        exec.on_rows("SHOW FULL TABLES", tables.clone());
        exec.on_rows("SHOW FULL TABLES", tables);
        exec.on_rows(
            "SHOW DATABASES",
            ["app", "information_schema", "mysql", "performance_schema", "sys", "reporting"]
                .iter()
                .map(|d| Row::from_pairs([("Database", *d)]))
                .collect(),
        );
        let mut reflector = SchemaReflector::new(Arc::new(DialectRules::mysql()));

        assert_eq!(
            reflector.table_names(&mut exec, Some("app")).unwrap(),
            vec!["orders", "customer"]
        );
        assert_eq!(reflector.view_names(&mut exec, None).unwrap(), vec!["order_totals"]);
        assert_eq!(reflector.schema_names(&mut exec).unwrap(), vec!["app", "reporting"]);
        assert_eq!(exec.log[0], "SHOW FULL TABLES FROM `app`");
        assert_eq!(exec.log[1], "SHOW FULL TABLES");
    }

    #[test]
    fn test_external_cache_and_refresh() {
        let cache = Arc::new(MemoryCache::new());
        let mut reflector = mariadb_reflector().with_cache(cache.clone());

        let mut exec = ScriptedExecutor::new();
        script_orders(&mut exec);
        let first = reflector.table_schema(&mut exec, "orders", false).unwrap().unwrap();
        let statements = exec.log.len();

        let second = reflector.table_schema(&mut exec, "orders", false).unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(exec.log.len(), statements);
        assert_eq!(cache.len(), 1);

        script_orders(&mut exec);
        let third = reflector.table_schema(&mut exec, "orders", true).unwrap().unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(exec.log.len() > statements);

        reflector.refresh_all(&exec.target());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_mysql_default_normalization() {
        let reflector = SchemaReflector::new(Arc::new(DialectRules::mysql()));
        let ts = Column::new("ts", AbstractType::Timestamp, "timestamp");
        let uuid = Column::new("uid", AbstractType::String, "varchar(36)");
        let flag = Column::new("active", AbstractType::Boolean, "tinyint(1)");
        let price = Column::new("price", AbstractType::Decimal, "decimal(10,2)");

        assert_eq!(
            reflector.normalize_default(&ts, Some(&"CURRENT_TIMESTAMP".into()), true),
            Some(DefaultValue::expression("CURRENT_TIMESTAMP"))
        );
        assert_eq!(
            reflector.normalize_default(&uuid, Some(&"uuid()".into()), true),
            Some(DefaultValue::expression("uuid()"))
        );
        assert_eq!(
            reflector.normalize_default(&uuid, Some(&"pending".into()), false),
            Some(DefaultValue::Literal("pending".into()))
        );
        assert_eq!(
            reflector.normalize_default(&flag, Some(&"1".into()), false),
            Some(DefaultValue::Literal(SqlValue::Bool(true)))
        );
        assert_eq!(
            reflector.normalize_default(&price, Some(&"9.50".into()), false),
            Some(DefaultValue::Literal("9.50".into()))
        );
        assert_eq!(reflector.normalize_default(&price, Some(&SqlValue::Null), false), None);
    }

    #[test]
    fn test_bit_default_normalization() {
        let reflector = SchemaReflector::new(Arc::new(DialectRules::mysql()));
        let flag = Column::new("flag", AbstractType::Boolean, "bit(1)");
        let mask = Column::new("mask", AbstractType::Bit, "bit(8)");
        let wide = Column::new("wide", AbstractType::BigInt, "bit(64)");

        assert_eq!(
            reflector.normalize_default(&flag, Some(&"b'1'".into()), false),
            Some(DefaultValue::Literal(SqlValue::Bool(true)))
        );
        assert_eq!(
            reflector.normalize_default(&flag, Some(&"b'0'".into()), false),
            Some(DefaultValue::Literal(SqlValue::Bool(false)))
        );
        assert_eq!(
            reflector.normalize_default(&mask, Some(&"b'101'".into()), false),
            Some(DefaultValue::Literal(SqlValue::Int(5)))
        );
        let all_ones = format!("b'{}'", "1".repeat(64));
        assert_eq!(
            reflector.normalize_default(&wide, Some(&all_ones.as_str().into()), false),
            Some(DefaultValue::Literal(SqlValue::UInt(u64::MAX)))
        );
        assert_eq!(
            reflector.normalize_default(&mask, Some(&"b''".into()), false),
            Some(DefaultValue::Literal(SqlValue::Int(0)))
        );
    }

    #[test]
    fn test_mariadb_unquoted_default_is_expression() {
        let reflector = mariadb_reflector();
        let uuid = Column::new("uid", AbstractType::String, "varchar(36)");
        let qty = Column::new("qty", AbstractType::Integer, "int(11)");

        assert_eq!(
            reflector.normalize_default(&uuid, Some(&"uuid()".into()), false),
            Some(DefaultValue::expression("uuid()"))
        );
        assert_eq!(
            reflector.normalize_default(&qty, Some(&"-3".into()), false),
            Some(DefaultValue::Literal(SqlValue::Int(-3)))
        );
    }

    #[test]
    fn test_created_table_reflects_back() {
        let qb = QueryBuilder::new(Arc::new(DialectRules::mariadb()));
        let columns = [
            ("id", ColumnSchema::primary_key_column()),
            ("name", ColumnSchema::string(64).not_null().default_value("anon")),
            ("score", ColumnSchema::decimal(8, 2)),
        ];
        let create = qb.create_table("players", &columns, Some("ENGINE=InnoDB")).unwrap();
        assert!(create.starts_with("CREATE TABLE `players` (\n\t`id` "));

        let mut exec = ScriptedExecutor::new();
        exec.on_rows(
            "SHOW CREATE TABLE",
            vec![create_row(
                "players",
                "CREATE TABLE `players` (\n  `id` int(11) NOT NULL AUTO_INCREMENT,\n  \
                 `name` varchar(64) NOT NULL DEFAULT 'anon',\n  `score` decimal(8,2) DEFAULT NULL,\n  \
                 PRIMARY KEY (`id`)\n) ENGINE=InnoDB",
            )],
        );
        exec.on_rows(
            "SHOW FULL COLUMNS",
            vec![
                column_row("id", "int(11)", None, "NO", "PRI", None, "auto_increment", ""),
                column_row("name", "varchar(64)", Some("utf8mb4_general_ci"), "NO", "", Some("'anon'"), "", ""),
                column_row("score", "decimal(8,2)", None, "YES", "", Some("NULL"), "", ""),
            ],
        );
        let mut reflector = SchemaReflector::new(qb.rules().clone().into());
        let table = reflector.table_schema(&mut exec, "players", false).unwrap().unwrap();

        let name = ColumnSchema::from_column(table.column("name").unwrap());
        let score = ColumnSchema::from_column(table.column("score").unwrap());
        assert_eq!(
            qb.column_definition(&name),
            "varchar(64) CHARACTER SET utf8mb4 COLLATE utf8mb4_general_ci NOT NULL DEFAULT 'anon'"
        );
        assert_eq!(qb.column_definition(&score), "decimal(8,2)");
        assert_eq!(table.primary_key, vec!["id"]);
        assert!(table.column("id").unwrap().auto_increment);

        for (name, requested) in &columns {
            assert_eq!(
                table.column(name).unwrap().abstract_type,
                requested.abstract_type,
                "column {}",
                name
            );
        }
    }

    #[test]
    fn test_created_column_types_reflect_back() {
        let qb = QueryBuilder::new(Arc::new(DialectRules::mysql()));
        let mut requested: Vec<(String, ColumnSchema, AbstractType)> = AbstractType::ALL
            .iter()
            .map(|t| {
                let schema = match t {
                    AbstractType::Enum => ColumnSchema::enumeration(["a", "b"]),
                    other => ColumnSchema::new(*other),
                };
                (format!("c_{}", t.as_str()), schema, *t)
            })
            .collect();
        // Width rules decide the reflected class at the edges.
        requested.push(("bit_1".into(), ColumnSchema::new(AbstractType::Bit).size(1), AbstractType::Boolean));
        requested.push(("bit_31".into(), ColumnSchema::new(AbstractType::Bit).size(31), AbstractType::Bit));
        requested.push(("bit_32".into(), ColumnSchema::new(AbstractType::Bit).size(32), AbstractType::Integer));
        requested.push(("bit_64".into(), ColumnSchema::new(AbstractType::Bit).size(64), AbstractType::BigInt));
        requested.push(("tiny_1".into(), ColumnSchema::new(AbstractType::TinyInt).size(1), AbstractType::Boolean));
        requested.push(("tiny_4".into(), ColumnSchema::new(AbstractType::TinyInt).size(4), AbstractType::TinyInt));

        let columns: Vec<(&str, ColumnSchema)> = requested
            .iter()
            .map(|(name, schema, _)| (name.as_str(), schema.clone()))
            .collect();
        let create = qb.create_table("everything", &columns, None).unwrap();

        let mut exec = ScriptedExecutor::new();
        exec.on_rows("SHOW CREATE TABLE", vec![create_row("everything", &create)]);
        exec.on_rows(
            "SHOW FULL COLUMNS",
            requested
                .iter()
                .map(|(name, schema, _)| {
                    column_row(name, &qb.column_type(schema), None, "YES", "", None, "", "")
                })
                .collect(),
        );
        let mut reflector = SchemaReflector::new(Arc::new(DialectRules::mysql()));
        let table = reflector.table_schema(&mut exec, "everything", false).unwrap().unwrap();

        for (name, schema, expected) in &requested {
            let column = table.column(name).unwrap();
            assert_eq!(
                column.abstract_type,
                *expected,
                "column {} rendered as {}",
                name,
                qb.column_type(schema)
            );
        }
        assert_eq!(table.column("c_enum").unwrap().enum_values, vec!["a", "b"]);
    }
}
