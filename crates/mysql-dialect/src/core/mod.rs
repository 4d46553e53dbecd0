//! Core model and collaborator contracts.
//!
//! - [`schema`]: table, column, and constraint metadata types
//! - [`value`]: SQL values and named statement parameters
//! - [`identifier`]: identifier and literal quoting
//! - [`traits`]: query execution, metadata cache and DDL source contracts

pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use identifier::{validate_identifier, Quoter};
pub use schema::{Column, DefaultValue, ForeignKey, Index, ReferentialAction, SequenceName, Table};
pub use traits::{CacheKey, CreateTableSource, MetadataCache, QueryExecutor, Row};
pub use value::{Params, SqlValue};
