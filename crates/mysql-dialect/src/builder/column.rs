//! Abstract column descriptions and their MySQL rendering.

use crate::core::schema::{Column, DefaultValue};
use crate::core::value::SqlValue;
use crate::dialect::AbstractType;

use super::QueryBuilder;

/// Column to create or alter, described abstractly.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub abstract_type: AbstractType,
    /// Length, display width or precision depending on the type.
    pub size: Option<u32>,
    pub scale: Option<u32>,
    pub enum_values: Vec<String>,
    pub unsigned: bool,
    pub not_null: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
    pub comment: Option<String>,
    /// CHECK expression, rendered as `CHECK (expr)`.
    pub check: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    /// Text appended verbatim after the definition.
    pub append: Option<String>,
}

impl ColumnSchema {
    pub fn new(abstract_type: AbstractType) -> Self {
        Self {
            abstract_type,
            size: None,
            scale: None,
            enum_values: Vec::new(),
            unsigned: false,
            not_null: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default: None,
            comment: None,
            check: None,
            charset: None,
            collation: None,
            append: None,
        }
    }

    /// Auto-increment integer primary key.
    pub fn primary_key_column() -> Self {
        Self::new(AbstractType::Integer)
            .not_null()
            .auto_increment()
            .primary_key()
    }

    pub fn string(size: u32) -> Self {
        Self::new(AbstractType::String).size(size)
    }

    pub fn decimal(precision: u32, scale: u32) -> Self {
        Self::new(AbstractType::Decimal).size(precision).scale(scale)
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_values: values.into_iter().map(Into::into).collect(),
            ..Self::new(AbstractType::Enum)
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<SqlValue>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    pub fn default_expression(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = Some(expr.into());
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.collation = Some(collation.into());
        self
    }

    pub fn append(mut self, text: impl Into<String>) -> Self {
        self.append = Some(text.into());
        self
    }

    /// Describe a reflected column, e.g. to re-create or alter it.
    pub fn from_column(column: &Column) -> Self {
        let size = match column.abstract_type {
            AbstractType::Boolean | AbstractType::Enum => None,
            AbstractType::Decimal => column.precision.or(column.size),
            _ => column.size,
        };
        Self {
            abstract_type: column.abstract_type,
            size,
            scale: column.scale,
            enum_values: column.enum_values.clone(),
            unsigned: column.unsigned,
            not_null: !column.nullable,
            primary_key: false,
            auto_increment: column.auto_increment,
            unique: false,
            default: column.default_value.clone(),
            comment: column.comment.clone().filter(|c| !c.is_empty()),
            check: None,
            charset: column.charset.clone(),
            collation: column.collation.clone(),
            append: None,
        }
    }
}

impl QueryBuilder {
    /// Physical type clause of a column, e.g. `varchar(255)` or `enum('a','b')`.
    pub fn column_type(&self, column: &ColumnSchema) -> String {
        let map = &self.rules().type_map;
        let base = map.physical_type(column.abstract_type);
        let sized = |default: Option<u32>| match column.size.or(default) {
            Some(size) => format!("{}({})", base, size),
            None => base.to_string(),
        };

        let mut sql = match column.abstract_type {
            AbstractType::Boolean | AbstractType::Text | AbstractType::Json | AbstractType::Date => {
                base.to_string()
            }
            AbstractType::Enum => {
                let values = column
                    .enum_values
                    .iter()
                    .map(|v| self.quoter().quote_value(v))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{}({})", base, values)
            }
            AbstractType::String => sized(Some(255)),
            AbstractType::Char => sized(Some(1)),
            AbstractType::Bit => sized(Some(8)),
            AbstractType::Decimal => format!(
                "{}({},{})",
                base,
                column.size.unwrap_or(10),
                column.scale.unwrap_or(0)
            ),
            AbstractType::Float | AbstractType::Double => match (column.size, column.scale) {
                (Some(size), Some(scale)) => format!("{}({},{})", base, size, scale),
                _ => base.to_string(),
            },
            AbstractType::Binary => match column.size {
                Some(size) => format!("varbinary({})", size),
                None => base.to_string(),
            },
            _ => sized(None),
        };

        let numeric = column.abstract_type.is_integer()
            || matches!(
                column.abstract_type,
                AbstractType::Float | AbstractType::Double | AbstractType::Decimal
            );
        if column.unsigned && numeric {
            sql.push_str(" unsigned");
        }
        sql
    }

    /// Full column definition as used in CREATE TABLE and ALTER TABLE.
    pub fn column_definition(&self, column: &ColumnSchema) -> String {
        let mut sql = self.column_type(column);

        if let Some(charset) = &column.charset {
            sql.push_str(&format!(" CHARACTER SET {}", charset));
        }
        if let Some(collation) = &column.collation {
            sql.push_str(&format!(" COLLATE {}", collation));
        }
        if column.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.default_clause(default));
        }
        if column.auto_increment {
            sql.push_str(" AUTO_INCREMENT");
        }
        if column.unique {
            sql.push_str(" UNIQUE");
        }
        if column.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if let Some(comment) = &column.comment {
            sql.push_str(" COMMENT ");
            sql.push_str(&self.quoter().quote_value(comment));
        }
        if let Some(check) = &column.check {
            sql.push_str(&format!(" CHECK ({})", check));
        }
        if let Some(append) = &column.append {
            sql.push(' ');
            sql.push_str(append);
        }
        sql
    }

    fn default_clause(&self, default: &DefaultValue) -> String {
        match default {
            DefaultValue::Expression(expr) => expr.clone(),
            DefaultValue::Literal(value) => self.literal(value),
        }
    }

    /// Inline SQL literal for a value. Used only where the engine forbids
    /// placeholders, such as column defaults.
    pub fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::UInt(v) => v.to_string(),
            SqlValue::Double(v) => v.to_string(),
            SqlValue::Text(s) => self.quoter().quote_value(s),
            SqlValue::Json(v) => self.quoter().quote_value(&v.to_string()),
            SqlValue::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{:02X}", byte)).collect();
                format!("X'{}'", hex)
            }
        }
    }
}
