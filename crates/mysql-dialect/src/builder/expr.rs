//! Value expressions and condition trees.
//!
//! Values are always bound into [`Params`]; only identifiers and raw
//! fragments reach the SQL text directly.

use crate::core::value::{Params, SqlValue};
use crate::dialect::UpsertSyntax;

use super::QueryBuilder;

/// Alias of the inserted row in the row-alias upsert spelling.
pub const UPSERT_ROW_ALIAS: &str = "new";

/// A value position in a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference.
    Column(String),
    /// Bound value.
    Value(SqlValue),
    /// Bound JSON document.
    Json(serde_json::Value),
    /// SQL fragment rendered verbatim.
    Raw(String),
    /// The `DEFAULT` keyword.
    Default,
    /// Value the current `INSERT` supplied for a column, inside
    /// `ON DUPLICATE KEY UPDATE`.
    InsertValue(String),
}

impl Expr {
    pub fn value(value: impl Into<SqlValue>) -> Self {
        Expr::Value(value.into())
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(name.into())
    }

    pub fn raw(sql: impl Into<String>) -> Self {
        Expr::Raw(sql.into())
    }
}

impl From<SqlValue> for Expr {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Json(doc) => Expr::Json(doc),
            other => Expr::Value(other),
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// WHERE/HAVING condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Compare {
        column: String,
        op: CompareOp,
        value: Expr,
    },
    In {
        column: String,
        values: Vec<SqlValue>,
        negated: bool,
    },
    Between {
        column: String,
        low: SqlValue,
        high: SqlValue,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    Like {
        column: String,
        pattern: String,
        case_sensitive: bool,
        negated: bool,
        escape: Option<char>,
    },
    /// `JSON_OVERLAPS(column, value)`.
    JsonOverlaps {
        column: String,
        value: serde_json::Value,
        case_sensitive: bool,
    },
    Raw(String),
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<SqlValue>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: Expr::from(value.into()),
        }
    }

    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Condition::IsNull {
            column: column.into(),
            negated: false,
        }
    }

    /// Case-insensitive LIKE (the column's collation decides).
    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Condition::Like {
            column: column.into(),
            pattern: pattern.into(),
            case_sensitive: false,
            negated: false,
            escape: None,
        }
    }

    /// Combine with another condition using AND, flattening nested ANDs.
    pub fn and(self, other: Condition) -> Self {
        match self {
            Condition::And(mut parts) => {
                parts.push(other);
                Condition::And(parts)
            }
            first => Condition::And(vec![first, other]),
        }
    }

    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }
}

impl QueryBuilder {
    /// Render an expression, binding values into `params`.
    pub fn build_expr(&self, expr: &Expr, params: &mut Params) -> String {
        match expr {
            Expr::Column(name) => self.column(name),
            Expr::Value(value) => params.bind(value.clone()),
            Expr::Json(doc) => self.build_json(doc, params),
            Expr::Raw(sql) => sql.clone(),
            Expr::Default => "DEFAULT".to_string(),
            Expr::InsertValue(name) => match self.rules().upsert_syntax {
                UpsertSyntax::ValuesFunction => format!("VALUES({})", self.column(name)),
                UpsertSyntax::RowAlias => {
                    format!("{}.{}", UPSERT_ROW_ALIAS, self.column(name))
                }
            },
        }
    }

    /// Bind a JSON document; MySQL needs an explicit cast, MariaDB does not.
    fn build_json(&self, doc: &serde_json::Value, params: &mut Params) -> String {
        let placeholder = params.bind(SqlValue::Text(doc.to_string()));
        if self.rules().json_cast {
            format!("CAST({} AS JSON)", placeholder)
        } else {
            placeholder
        }
    }

    /// Render a condition, binding values into `params`.
    pub fn build_condition(&self, condition: &Condition, params: &mut Params) -> String {
        match condition {
            Condition::And(parts) => self.build_junction(parts, "AND", "1 = 1", params),
            Condition::Or(parts) => self.build_junction(parts, "OR", "1 = 0", params),
            Condition::Not(inner) => format!("NOT ({})", self.build_condition(inner, params)),
            Condition::Compare { column, op, value } => match value {
                Expr::Value(SqlValue::Null) if *op == CompareOp::Eq => {
                    format!("{} IS NULL", self.column(column))
                }
                Expr::Value(SqlValue::Null) if *op == CompareOp::Ne => {
                    format!("{} IS NOT NULL", self.column(column))
                }
                _ => format!(
                    "{} {} {}",
                    self.column(column),
                    op.as_sql(),
                    self.build_expr(value, params)
                ),
            },
            Condition::In {
                column,
                values,
                negated,
            } => {
                if values.is_empty() {
                    return if *negated { "1 = 1" } else { "0 = 1" }.to_string();
                }
                let list = values
                    .iter()
                    .map(|v| params.bind(v.clone()))
                    .collect::<Vec<_>>()
                    .join(", ");
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", self.column(column), op, list)
            }
            Condition::Between { column, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.column(column),
                params.bind(low.clone()),
                params.bind(high.clone())
            ),
            Condition::IsNull { column, negated } => {
                let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
                format!("{} {}", self.column(column), op)
            }
            Condition::Like {
                column,
                pattern,
                case_sensitive,
                negated,
                escape,
            } => {
                let op = if *negated { "NOT LIKE" } else { "LIKE" };
                let mut sql = format!(
                    "{} {} {}",
                    self.case_column(column, *case_sensitive),
                    op,
                    params.bind(pattern.clone())
                );
                if let Some(ch) = escape {
                    sql.push_str(" ESCAPE ");
                    sql.push_str(&self.quoter().quote_value(&ch.to_string()));
                }
                sql
            }
            Condition::JsonOverlaps {
                column,
                value,
                case_sensitive,
            } => format!(
                "JSON_OVERLAPS({}, {})",
                self.case_column(column, *case_sensitive),
                self.build_json(value, params)
            ),
            Condition::Raw(sql) => sql.clone(),
        }
    }

    fn build_junction(
        &self,
        parts: &[Condition],
        operator: &str,
        empty: &str,
        params: &mut Params,
    ) -> String {
        match parts {
            [] => empty.to_string(),
            [single] => self.build_condition(single, params),
            _ => parts
                .iter()
                .map(|p| format!("({})", self.build_condition(p, params)))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", operator)),
        }
    }

    /// Column reference with a binary-collation marker when case matters.
    fn case_column(&self, column: &str, case_sensitive: bool) -> String {
        if case_sensitive {
            format!("BINARY {}", self.column(column))
        } else {
            self.column(column)
        }
    }
}
