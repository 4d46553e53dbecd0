//! A dialect-aware connection.
//!
//! [`Connection`] wraps one [`QueryExecutor`] with the state that belongs to
//! it: transaction nesting, the disconnect retry policy, a schema reflector
//! and a query builder sharing one [`DialectRules`] instance.

use std::sync::Arc;

use tracing::debug;

use crate::builder::{Expr, QueryBuilder};
use crate::core::schema::Table;
use crate::core::traits::{CreateTableSource, MetadataCache, QueryExecutor, Row};
use crate::core::value::{Params, SqlValue};
use crate::dialect::DialectRules;
use crate::error::{DialectError, Result};
use crate::reflect::SchemaReflector;
use crate::transaction::{with_retry, ErrorClassifier, IsolationLevel, MysqlDisconnectClassifier, TransactionController};

/// Executor plus the transaction state that guards its retries.
struct Session<E> {
    executor: E,
    transaction: TransactionController,
    classifier: Box<dyn ErrorClassifier>,
}

impl<E: QueryExecutor> Session<E> {
    fn ensure_open(&mut self) -> Result<()> {
        if !self.executor.is_open() {
            self.executor.open()?;
        }
        Ok(())
    }
}

impl<E: QueryExecutor> QueryExecutor for Session<E> {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<u64> {
        self.ensure_open()?;
        let level = self.transaction.level();
        with_retry(&mut self.executor, self.classifier.as_ref(), level, |exec| {
            exec.execute(sql, params)
        })
    }

    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        self.ensure_open()?;
        let level = self.transaction.level();
        with_retry(&mut self.executor, self.classifier.as_ref(), level, |exec| {
            exec.query(sql, params)
        })
    }

    fn last_insert_id(&mut self) -> Result<Option<u64>> {
        self.executor.last_insert_id()
    }

    fn is_open(&self) -> bool {
        self.executor.is_open()
    }

    fn open(&mut self) -> Result<()> {
        self.executor.open()
    }

    fn close(&mut self) {
        self.transaction.reset();
        self.executor.close();
    }

    fn target(&self) -> String {
        self.executor.target()
    }
}

/// Supplies `CREATE TABLE` text to DDL builders through the reflector cache.
struct ReflectedDdl<'a, E> {
    reflector: &'a mut SchemaReflector,
    session: &'a mut Session<E>,
}

impl<E: QueryExecutor> CreateTableSource for ReflectedDdl<'_, E> {
    fn create_table_sql(&mut self, table: &str) -> Result<Option<String>> {
        self.reflector.create_table_sql(&mut *self.session, table)
    }
}

/// One connection to a MySQL or MariaDB server.
pub struct Connection<E> {
    session: Session<E>,
    reflector: SchemaReflector,
    builder: QueryBuilder,
}

impl<E: QueryExecutor> Connection<E> {
    pub fn new(executor: E, rules: DialectRules) -> Self {
        let rules = Arc::new(rules);
        Self {
            session: Session {
                executor,
                transaction: TransactionController::new(rules.supports_savepoints),
                classifier: Box::new(MysqlDisconnectClassifier),
            },
            reflector: SchemaReflector::new(Arc::clone(&rules)),
            builder: QueryBuilder::new(rules),
        }
    }

    /// Replace the disconnect classifier used by the retry policy.
    pub fn with_classifier(mut self, classifier: Box<dyn ErrorClassifier>) -> Self {
        self.session.classifier = classifier;
        self
    }

    /// Share reflected tables through an external cache.
    pub fn with_cache(mut self, cache: Arc<dyn MetadataCache>) -> Self {
        self.reflector = self.reflector.with_cache(cache);
        self
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn rules(&self) -> &DialectRules {
        self.builder.rules()
    }

    pub fn reflector(&mut self) -> &mut SchemaReflector {
        &mut self.reflector
    }

    pub fn executor(&self) -> &E {
        &self.session.executor
    }

    pub fn into_inner(self) -> E {
        self.session.executor
    }

    pub fn transaction_level(&self) -> u32 {
        self.session.transaction.level()
    }

    pub fn begin(&mut self, isolation: Option<IsolationLevel>) -> Result<()> {
        let session = &mut self.session;
        session.transaction.begin(&mut session.executor, isolation)
    }

    pub fn commit(&mut self) -> Result<()> {
        let session = &mut self.session;
        session.transaction.commit(&mut session.executor)
    }

    pub fn rollback(&mut self) -> Result<()> {
        let session = &mut self.session;
        session.transaction.rollback(&mut session.executor)
    }

    /// Run `f` inside a (possibly nested) transaction, committing on success
    /// and rolling back on error.
    pub fn transaction<T, F>(&mut self, isolation: Option<IsolationLevel>, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.begin(isolation)?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback() {
                    debug!("Rollback after error failed: {}", rollback_err);
                }
                Err(err)
            }
        }
    }

    /// Reflect a table; `Ok(None)` when it does not exist.
    pub fn table_schema(&mut self, name: &str, refresh: bool) -> Result<Option<Arc<Table>>> {
        self.reflector.table_schema(&mut self.session, name, refresh)
    }

    pub fn table_names(&mut self, schema: Option<&str>) -> Result<Vec<String>> {
        self.reflector.table_names(&mut self.session, schema)
    }

    /// Drop cached metadata for one table.
    pub fn refresh_table(&mut self, name: &str) {
        let target = self.session.target();
        self.reflector.refresh(&target, name);
    }

    /// Insert a row and return its primary key values in key order.
    ///
    /// Each key column takes the value supplied in `values`, else the
    /// auto-increment id of the insert, else the column's literal default.
    /// Returns `Ok(None)` when the server reports no inserted row.
    pub fn insert_returning_pks(
        &mut self,
        table: &str,
        values: &[(&str, Expr)],
    ) -> Result<Option<Vec<(String, SqlValue)>>> {
        let schema = self
            .table_schema(table, false)?
            .ok_or_else(|| DialectError::InvalidArgument(format!("table {} does not exist", table)))?;

        let (sql, params) = self.builder.insert(table, values, Some(&*schema));
        if self.session.execute(&sql, &params)? == 0 {
            return Ok(None);
        }

        let mut keys = Vec::with_capacity(schema.primary_key.len());
        for name in &schema.primary_key {
            let supplied = values
                .iter()
                .find(|(column, _)| column.eq_ignore_ascii_case(name))
                .and_then(|(_, expr)| match expr {
                    Expr::Value(value) => Some(value.clone()),
                    _ => None,
                });
            let column = schema.column(name);

            let value = match supplied {
                Some(value) => value,
                None if column.is_some_and(|c| c.auto_increment) => self
                    .session
                    .last_insert_id()?
                    .map(SqlValue::UInt)
                    .unwrap_or(SqlValue::Null),
                None => column
                    .and_then(|c| c.default_value.as_ref())
                    .and_then(|d| d.literal().cloned())
                    .unwrap_or(SqlValue::Null),
            };
            keys.push((name.clone(), value));
        }
        Ok(Some(keys))
    }

    /// Set a column comment, re-issuing the column's full definition.
    pub fn add_comment_on_column(&mut self, table: &str, column: &str, comment: &str) -> Result<()> {
        let mut source = ReflectedDdl {
            reflector: &mut self.reflector,
            session: &mut self.session,
        };
        let sql = self
            .builder
            .add_comment_on_column(table, column, comment, &mut source)?;
        self.session.execute(&sql, &Params::new())?;
        self.refresh_table(table);
        Ok(())
    }

    /// Rename a column, keeping its definition.
    pub fn rename_column(&mut self, table: &str, old_name: &str, new_name: &str) -> Result<()> {
        let mut source = ReflectedDdl {
            reflector: &mut self.reflector,
            session: &mut self.session,
        };
        let sql = self
            .builder
            .rename_column(table, old_name, new_name, &mut source)?;
        self.session.execute(&sql, &Params::new())?;
        self.refresh_table(table);
        Ok(())
    }

    /// Reset a table's auto-increment counter to `value`, or past the
    /// current maximum key when `value` is `None`.
    pub fn reset_sequence(&mut self, table: &str, value: Option<u64>) -> Result<()> {
        let schema = self
            .table_schema(table, false)?
            .ok_or_else(|| DialectError::InvalidArgument(format!("table {} does not exist", table)))?;
        let sql = self.builder.reset_sequence(&schema, value)?;
        self.session.execute(&sql, &Params::new())?;
        Ok(())
    }
}

impl<E: QueryExecutor> QueryExecutor for Connection<E> {
    fn execute(&mut self, sql: &str, params: &Params) -> Result<u64> {
        self.session.execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        self.session.query(sql, params)
    }

    fn last_insert_id(&mut self) -> Result<Option<u64>> {
        self.session.last_insert_id()
    }

    fn is_open(&self) -> bool {
        self.session.is_open()
    }

    fn open(&mut self) -> Result<()> {
        self.session.open()
    }

    fn close(&mut self) {
        self.session.close()
    }

    fn target(&self) -> String {
        self.session.target()
    }
}
