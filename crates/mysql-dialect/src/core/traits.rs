//! Collaborator contracts.
//!
//! - [`QueryExecutor`]: runs SQL text with named parameters on one connection
//! - [`MetadataCache`]: optional external cache for reflected tables
//! - [`CreateTableSource`]: supplies raw `CREATE TABLE` text to DDL builders
//!   that must re-specify a full column definition
//!
//! Everything here is synchronous. One executor serves exactly one caller at a
//! time, so the methods take `&mut self`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;

use super::schema::Table;
use super::value::{Params, SqlValue};

/// One result row: ordered field names and values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Build a row from parallel name and value lists.
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Build a row from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SqlValue>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    /// Value of a field, matched case-insensitively.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|i| self.values.get(i))
    }

    /// Text value of a field; `None` for NULL or a missing field.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(SqlValue::to_text)
    }

    /// Value at a position.
    pub fn at(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Field names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Execute SQL on a single connection.
///
/// Parameter names in `sql` use the `:name` form and are looked up in `params`.
pub trait QueryExecutor {
    /// Run a statement (or a multi-statement script when `params` is empty)
    /// and return the number of affected rows.
    fn execute(&mut self, sql: &str, params: &Params) -> Result<u64>;

    /// Run a query and collect every row.
    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>>;

    /// First column of the first row, `None` when there are no rows.
    fn query_scalar(&mut self, sql: &str, params: &Params) -> Result<Option<SqlValue>> {
        Ok(self
            .query(sql, params)?
            .into_iter()
            .next()
            .and_then(|row| row.at(0).cloned()))
    }

    /// Value produced by `LAST_INSERT_ID()` for the last insert, if any.
    fn last_insert_id(&mut self) -> Result<Option<u64>>;

    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;

    /// Open the connection. Opening an open connection is a no-op.
    fn open(&mut self) -> Result<()>;

    /// Close the connection, discarding any server-side session state.
    fn close(&mut self);

    /// Credential-free description of the connection target, used in cache keys.
    fn target(&self) -> String;
}

/// Supplies the raw `CREATE TABLE` statement for a table.
pub trait CreateTableSource {
    /// `Ok(None)` when the table does not exist.
    fn create_table_sql(&mut self, table: &str) -> Result<Option<String>>;
}

impl CreateTableSource for HashMap<String, String> {
    fn create_table_sql(&mut self, table: &str) -> Result<Option<String>> {
        Ok(self.get(table).cloned())
    }
}

/// Key of a cached table: dialect identity, connection target and table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub dialect: String,
    pub target: String,
    pub table: String,
}

impl CacheKey {
    pub fn new(dialect: impl Into<String>, target: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
            target: target.into(),
            table: table.into(),
        }
    }

    /// Tag shared by every table of one dialect/target pair.
    pub fn tag(&self) -> String {
        format!("{}@{}", self.dialect, self.target)
    }
}

/// External cache for reflected tables.
///
/// Implementations own invalidation and any atomic replacement of shared
/// entries; the reflector only reads, writes and invalidates.
pub trait MetadataCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<Arc<Table>>;

    fn set(&self, key: CacheKey, table: Arc<Table>);

    /// Drop one entry.
    fn invalidate(&self, key: &CacheKey);

    /// Drop every entry carrying `tag` (see [`CacheKey::tag`]).
    fn invalidate_tag(&self, tag: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneRow;

    impl QueryExecutor for OneRow {
        fn execute(&mut self, _sql: &str, _params: &Params) -> Result<u64> {
            Ok(0)
        }

        fn query(&mut self, _sql: &str, _params: &Params) -> Result<Vec<Row>> {
            Ok(vec![Row::from_pairs([("v", 7i64)])])
        }

        fn last_insert_id(&mut self) -> Result<Option<u64>> {
            Ok(None)
        }

        fn is_open(&self) -> bool {
            true
        }

        fn open(&mut self) -> Result<()> {
            Ok(())
        }

        fn close(&mut self) {}

        fn target(&self) -> String {
            "test".to_string()
        }
    }

    #[test]
    fn test_row_lookup_case_insensitive() {
        let row = Row::from_pairs([("Field", "id"), ("Type", "int(11)")]);
        assert_eq!(row.text("field").as_deref(), Some("id"));
        assert_eq!(row.text("TYPE").as_deref(), Some("int(11)"));
        assert!(row.get("missing").is_none());
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_query_scalar_default() {
        let mut exec = OneRow;
        let value = exec.query_scalar("SELECT 7", &Params::new()).unwrap();
        assert_eq!(value, Some(SqlValue::Int(7)));
    }

    #[test]
    fn test_cache_key_tag() {
        let key = CacheKey::new("mysql", "db.local:3306/app", "users");
        assert_eq!(key.tag(), "mysql@db.local:3306/app");
    }
}
