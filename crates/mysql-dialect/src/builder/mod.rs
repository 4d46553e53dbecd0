//! SQL text builders.
//!
//! [`QueryBuilder`] composes DDL, DML and DQL for one [`DialectRules`]
//! instance. It never executes anything: builders return SQL text, plus a
//! [`Params`](crate::core::Params) set wherever values are bound.
//!
//! - [`column`]: abstract column descriptions and their rendering
//! - [`expr`]: value expressions and condition trees
//! - `ddl`, `dml`, `dql`: statement builders, as `impl QueryBuilder` blocks

pub mod column;
mod ddl;
mod dml;
mod dql;
pub mod expr;

use std::sync::Arc;

use crate::core::identifier::Quoter;
use crate::dialect::DialectRules;

pub use column::ColumnSchema;
pub use ddl::{IndexMethod, IndexType};
pub use dml::UpsertUpdate;
pub use dql::{LimitArg, SelectQuery, SortOrder, MAX_LIMIT_SENTINEL};
pub use expr::{CompareOp, Condition, Expr};

/// Dialect-aware SQL builder.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    rules: Arc<DialectRules>,
}

impl QueryBuilder {
    pub fn new(rules: Arc<DialectRules>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &DialectRules {
        &self.rules
    }

    pub fn quoter(&self) -> &Quoter {
        &self.rules.quoter
    }

    fn table(&self, name: &str) -> String {
        self.rules.quoter.quote_table_name(name)
    }

    fn column(&self, name: &str) -> String {
        self.rules.quoter.quote_column_name(name)
    }

    fn column_list<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|n| self.column(n.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(Arc::new(DialectRules::mysql()))
    }
}
