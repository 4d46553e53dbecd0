//! # mysql-dialect
//!
//! MySQL/MariaDB dialect adapter for a generic relational layer.
//!
//! This library provides:
//!
//! - **Quoting and type mapping** between abstract column types and MySQL
//!   physical types
//! - **SQL generation** for DDL, DML and DQL with bound `:qpN` parameters
//! - **Schema reflection** from `SHOW CREATE TABLE`, `SHOW FULL COLUMNS` and
//!   `INFORMATION_SCHEMA`
//! - **Nested transactions** on savepoints, with one reconnect-and-retry on
//!   transient disconnects
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_dialect::builder::Expr;
//! use mysql_dialect::{Config, Connection, MysqlConnection};
//!
//! fn main() -> mysql_dialect::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let executor = MysqlConnection::connect(&config.connection)?;
//!     let mut conn = Connection::new(executor, config.dialect.rules()?);
//!
//!     let keys = conn.transaction(None, |conn| {
//!         conn.insert_returning_pks("orders", &[("status", Expr::value("new"))])
//!     })?;
//!     println!("Inserted {:?}", keys);
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod connection;
pub mod core;
pub mod dialect;
pub mod drivers;
pub mod error;
pub mod placeholder;
pub mod reflect;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use builder::{ColumnSchema, QueryBuilder};
pub use config::{Config, ConnectionConfig, DialectConfig, EngineKind};
pub use connection::Connection;
pub use crate::core::{
    Column, DefaultValue, ForeignKey, Index, MetadataCache, Params, QueryExecutor, Quoter,
    ReferentialAction, Row, SqlValue, Table,
};
pub use dialect::{AbstractType, DialectRules, EngineVariant, ServerVersion, TypeMap};
pub use drivers::MysqlConnection;
pub use error::{DialectError, Result};
pub use reflect::{MemoryCache, SchemaReflector};
pub use transaction::{IsolationLevel, TransactionController};
