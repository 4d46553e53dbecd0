//! Bidirectional mapping between physical MySQL types and abstract types.
//!
//! The [`TypeMap`] is immutable configuration data owned by one
//! [`DialectRules`](super::DialectRules) instance. It also acts as the column
//! factory: reflected type strings and free-text definitions both become
//! [`Column`] descriptors through it.

use std::collections::HashMap;

use crate::core::schema::Column;
use crate::error::Result;

use super::abstract_type::AbstractType;
use super::definition::{self, ColumnDefinitionInfo};

/// Physical type keyword to abstract type, before width-dependent rules.
const MYSQL_TYPES: &[(&str, AbstractType)] = &[
    ("bool", AbstractType::Boolean),
    ("boolean", AbstractType::Boolean),
    ("bit", AbstractType::Bit),
    ("tinyint", AbstractType::TinyInt),
    ("smallint", AbstractType::SmallInt),
    ("mediumint", AbstractType::Integer),
    ("int", AbstractType::Integer),
    ("integer", AbstractType::Integer),
    ("bigint", AbstractType::BigInt),
    ("float", AbstractType::Float),
    ("double", AbstractType::Double),
    ("real", AbstractType::Double),
    ("decimal", AbstractType::Decimal),
    ("numeric", AbstractType::Decimal),
    ("dec", AbstractType::Decimal),
    ("fixed", AbstractType::Decimal),
    ("char", AbstractType::Char),
    ("varchar", AbstractType::String),
    ("string", AbstractType::String),
    ("tinytext", AbstractType::Text),
    ("text", AbstractType::Text),
    ("mediumtext", AbstractType::Text),
    ("longtext", AbstractType::Text),
    ("binary", AbstractType::Binary),
    ("varbinary", AbstractType::Binary),
    ("tinyblob", AbstractType::Binary),
    ("blob", AbstractType::Binary),
    ("mediumblob", AbstractType::Binary),
    ("longblob", AbstractType::Binary),
    ("year", AbstractType::Date),
    ("date", AbstractType::Date),
    ("time", AbstractType::Time),
    ("datetime", AbstractType::DateTime),
    ("timestamp", AbstractType::Timestamp),
    ("json", AbstractType::Json),
    ("enum", AbstractType::Enum),
    ("set", AbstractType::String),
];

/// Abstract type to the physical type keyword used when creating columns.
const MYSQL_PHYSICAL: &[(AbstractType, &str)] = &[
    (AbstractType::Boolean, "tinyint(1)"),
    (AbstractType::Bit, "bit"),
    (AbstractType::TinyInt, "tinyint"),
    (AbstractType::SmallInt, "smallint"),
    (AbstractType::Integer, "int"),
    (AbstractType::BigInt, "bigint"),
    (AbstractType::Float, "float"),
    (AbstractType::Double, "double"),
    (AbstractType::Decimal, "decimal"),
    (AbstractType::Char, "char"),
    (AbstractType::String, "varchar"),
    (AbstractType::Text, "text"),
    (AbstractType::Binary, "blob"),
    (AbstractType::Date, "date"),
    (AbstractType::Time, "time"),
    (AbstractType::DateTime, "datetime"),
    (AbstractType::Timestamp, "timestamp"),
    (AbstractType::Json, "json"),
    (AbstractType::Enum, "enum"),
];

/// Type map for one dialect instance.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMap {
    to_abstract: HashMap<&'static str, AbstractType>,
    to_physical: HashMap<AbstractType, &'static str>,
}

impl Default for TypeMap {
    fn default() -> Self {
        Self::mysql()
    }
}

impl TypeMap {
    /// Type map shared by MySQL and MariaDB.
    pub fn mysql() -> Self {
        Self {
            to_abstract: MYSQL_TYPES.iter().copied().collect(),
            to_physical: MYSQL_PHYSICAL.iter().copied().collect(),
        }
    }

    /// Abstract type of a physical type keyword, ignoring width rules.
    ///
    /// Unknown keywords map to [`AbstractType::String`].
    pub fn abstract_type(&self, keyword: &str) -> AbstractType {
        self.to_abstract
            .get(keyword.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(AbstractType::String)
    }

    /// Physical type keyword for an abstract type.
    pub fn physical_type(&self, abstract_type: AbstractType) -> &'static str {
        self.to_physical
            .get(&abstract_type)
            .copied()
            .unwrap_or("varchar")
    }

    /// Abstract type for a parsed definition, applying width rules.
    ///
    /// - `bit(1)` and `tinyint(1)` are booleans
    /// - `bit(n)` with `n > 32` is a bigint, exactly 32 an integer
    /// - `enum(...)` is an enum
    pub fn resolve(&self, info: &ColumnDefinitionInfo) -> AbstractType {
        match (info.type_keyword.as_str(), info.size) {
            ("bit", Some(1)) | ("bit", None) => AbstractType::Boolean,
            ("bit", Some(n)) if n > 32 => AbstractType::BigInt,
            ("bit", Some(32)) => AbstractType::Integer,
            ("tinyint", Some(1)) => AbstractType::Boolean,
            (keyword, _) => self.abstract_type(keyword),
        }
    }

    /// Build a column from a physical type string and its parsed info.
    pub fn from_db_type(&self, name: &str, db_type: &str, info: &ColumnDefinitionInfo) -> Column {
        let abstract_type = self.resolve(info);
        let mut column = Column::new(name, abstract_type, db_type);

        column.unsigned = info.unsigned;
        column.nullable = !info.not_null;
        column.unique = info.unique;
        column.charset = info.charset.clone();
        column.collation = info.collation.clone();
        column.comment = info.comment.clone();
        column.extra = info.extra.clone();

        match abstract_type {
            AbstractType::Decimal | AbstractType::Float | AbstractType::Double => {
                column.size = info.size;
                column.precision = info.size;
                column.scale = info.scale;
            }
            AbstractType::Enum => {
                column.enum_values = info.enum_values.clone();
            }
            _ => {
                column.size = info.size;
                column.precision = info.size;
            }
        }

        column
    }

    /// Build a column from free-text definition, e.g. `enum('a','b') not null`.
    pub fn from_definition(&self, name: &str, definition: &str) -> Result<Column> {
        let info = definition::parse(definition)?;
        let db_type = physical_prefix(definition);
        Ok(self.from_db_type(name, &db_type, &info))
    }
}

/// Type keyword plus its parameter list, without modifiers.
fn physical_prefix(definition: &str) -> String {
    match definition::split_definition(definition) {
        Ok((keyword, Some(params), _)) => format!("{}({})", keyword, params),
        Ok((keyword, None, _)) => keyword,
        Err(_) => definition.trim().to_lowercase(),
    }
}
