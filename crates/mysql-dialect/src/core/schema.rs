//! Schema and metadata types for tables, columns, indexes, and constraints.
//!
//! These types are the engine-independent model produced by reflection and
//! consumed by the DDL builder. A reflected [`Table`] is never mutated after it
//! is built; refreshing a table builds a new one.

use serde::{Deserialize, Serialize};

use super::value::SqlValue;
use crate::dialect::AbstractType;

/// Column default: a literal value or a raw engine expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DefaultValue {
    /// Literal value, quoted when rendered.
    Literal(SqlValue),
    /// Engine expression such as `CURRENT_TIMESTAMP(3)`, rendered verbatim.
    Expression(String),
}

impl DefaultValue {
    /// Shorthand for an expression default.
    pub fn expression(expr: impl Into<String>) -> Self {
        DefaultValue::Expression(expr.into())
    }

    /// The literal value, if this is not an expression.
    pub fn literal(&self) -> Option<&SqlValue> {
        match self {
            DefaultValue::Literal(v) => Some(v),
            DefaultValue::Expression(_) => None,
        }
    }
}

/// Auto-increment sequence state of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceName {
    /// No auto-increment column.
    #[default]
    Absent,
    /// An auto-increment column exists but the engine exposes no sequence name.
    Unresolved,
    /// Concrete sequence name.
    Named(String),
}

impl SequenceName {
    /// Whether the table has an auto-increment column.
    pub fn is_present(&self) -> bool {
        !matches!(self, SequenceName::Absent)
    }
}

/// ON DELETE / ON UPDATE action of a foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    SetDefault,
    Restrict,
    #[default]
    NoAction,
}

impl ReferentialAction {
    /// Parse an action as spelled by the catalog or in DDL text.
    ///
    /// Unknown spellings fall back to `NO ACTION`, the engine default.
    pub fn parse(action: &str) -> Self {
        match action.trim().to_uppercase().replace('_', " ").as_str() {
            "CASCADE" => ReferentialAction::Cascade,
            "SET NULL" => ReferentialAction::SetNull,
            "SET DEFAULT" => ReferentialAction::SetDefault,
            "RESTRICT" => ReferentialAction::Restrict,
            _ => ReferentialAction::NoAction,
        }
    }

    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::SetDefault => "SET DEFAULT",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
        }
    }
}

/// Table metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Schema (database) name, `None` for the connection's current database.
    pub schema: Option<String>,

    /// Table name.
    pub name: String,

    /// Column definitions in catalog order.
    pub columns: Vec<Column>,

    /// Primary key column names.
    pub primary_key: Vec<String>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,

    /// Indexes, including unique indexes and the primary key.
    pub indexes: Vec<Index>,

    /// Raw `SHOW CREATE TABLE` output.
    pub create_sql: Option<String>,

    /// Table comment.
    pub comment: Option<String>,

    /// Auto-increment sequence state.
    pub sequence: SequenceName,
}

impl Table {
    /// Create an empty table descriptor.
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Look up a column by name (case-insensitive).
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Column names in catalog order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Unique indexes other than the primary key.
    pub fn unique_indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter().filter(|i| i.unique && !i.primary)
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Engine-independent type tag.
    pub abstract_type: AbstractType,

    /// Physical type as reported by the engine (e.g. "int(10) unsigned").
    pub db_type: String,

    /// Whether the column allows NULL.
    pub nullable: bool,

    /// Whether the column is part of the primary key.
    pub primary_key: bool,

    /// Whether the column is auto-increment.
    pub auto_increment: bool,

    /// Whether the column carries a single-column unique index.
    pub unique: bool,

    /// Display size or length.
    pub size: Option<u32>,

    /// Numeric precision.
    pub precision: Option<u32>,

    /// Numeric scale.
    pub scale: Option<u32>,

    /// Enum literal values. Non-empty iff the type is [`AbstractType::Enum`].
    pub enum_values: Vec<String>,

    /// Default value.
    pub default_value: Option<DefaultValue>,

    pub comment: Option<String>,

    pub charset: Option<String>,

    pub collation: Option<String>,

    pub unsigned: bool,

    /// Unparsed definition remainder, e.g. a generated-column expression.
    pub extra: Option<String>,
}

impl Column {
    /// Create a nullable column with no size information.
    pub fn new(name: impl Into<String>, abstract_type: AbstractType, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            abstract_type,
            db_type: db_type.into(),
            nullable: true,
            primary_key: false,
            auto_increment: false,
            unique: false,
            size: None,
            precision: None,
            scale: None,
            enum_values: Vec::new(),
            default_value: None,
            comment: None,
            charset: None,
            collation: None,
            unsigned: false,
            extra: None,
        }
    }
}

/// Index metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name. `None` only for a primary key without a name.
    pub name: Option<String>,

    /// Indexed column names.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub unique: bool,

    /// Whether the index is the primary key.
    pub primary: bool,
}

/// Foreign key metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Owning column names.
    pub columns: Vec<String>,

    /// Referenced schema name.
    pub ref_schema: Option<String>,

    /// Referenced table name.
    pub ref_table: String,

    /// Referenced column names, same length as `columns`.
    pub ref_columns: Vec<String>,

    pub on_delete: ReferentialAction,

    pub on_update: ReferentialAction,
}
