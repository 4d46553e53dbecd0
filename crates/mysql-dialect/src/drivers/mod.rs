//! Database driver implementations.
//!
//! - [`mysql`]: blocking MySQL/MariaDB executor built on `mysql_async`
//!
//! A driver implements [`QueryExecutor`](crate::core::traits::QueryExecutor)
//! and plugs into [`Connection`](crate::connection::Connection).

pub mod mysql;

pub use mysql::MysqlConnection;
