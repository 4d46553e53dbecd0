//! Engine-independent column type tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Abstract column type used by the generic relational layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbstractType {
    // ===== Boolean / bits =====
    Boolean,
    /// Bit field wider than one bit and at most 31 bits.
    Bit,

    // ===== Integer Types =====
    TinyInt,
    SmallInt,
    Integer,
    BigInt,

    // ===== Floating Point / Exact Numeric =====
    Float,
    Double,
    Decimal,

    // ===== String Types =====
    Char,
    String,
    Text,

    // ===== Binary =====
    Binary,

    // ===== Date/Time Types =====
    Date,
    Time,
    DateTime,
    Timestamp,

    // ===== Special Types =====
    Json,
    /// Enumerated string; the column carries its literal list.
    Enum,
}

impl AbstractType {
    /// Every tag, in declaration order.
    pub const ALL: [AbstractType; 19] = [
        AbstractType::Boolean,
        AbstractType::Bit,
        AbstractType::TinyInt,
        AbstractType::SmallInt,
        AbstractType::Integer,
        AbstractType::BigInt,
        AbstractType::Float,
        AbstractType::Double,
        AbstractType::Decimal,
        AbstractType::Char,
        AbstractType::String,
        AbstractType::Text,
        AbstractType::Binary,
        AbstractType::Date,
        AbstractType::Time,
        AbstractType::DateTime,
        AbstractType::Timestamp,
        AbstractType::Json,
        AbstractType::Enum,
    ];

    /// Lowercase tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            AbstractType::Boolean => "boolean",
            AbstractType::Bit => "bit",
            AbstractType::TinyInt => "tinyint",
            AbstractType::SmallInt => "smallint",
            AbstractType::Integer => "integer",
            AbstractType::BigInt => "bigint",
            AbstractType::Float => "float",
            AbstractType::Double => "double",
            AbstractType::Decimal => "decimal",
            AbstractType::Char => "char",
            AbstractType::String => "string",
            AbstractType::Text => "text",
            AbstractType::Binary => "binary",
            AbstractType::Date => "date",
            AbstractType::Time => "time",
            AbstractType::DateTime => "datetime",
            AbstractType::Timestamp => "timestamp",
            AbstractType::Json => "json",
            AbstractType::Enum => "enum",
        }
    }

    /// Whether values of this type are integers.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            AbstractType::TinyInt
                | AbstractType::SmallInt
                | AbstractType::Integer
                | AbstractType::BigInt
        )
    }
}

impl fmt::Display for AbstractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
