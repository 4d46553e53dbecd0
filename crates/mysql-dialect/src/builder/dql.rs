//! SELECT statements and LIMIT/OFFSET handling.

use crate::core::value::Params;
use crate::error::{DialectError, Result};

use super::expr::Condition;
use super::QueryBuilder;

/// Limit emitted when only an offset is requested; MySQL has no OFFSET
/// without LIMIT.
pub const MAX_LIMIT_SENTINEL: u64 = u64::MAX;

/// LIMIT or OFFSET operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitArg {
    Count(u64),
    /// Text operand; must consist of decimal digits only.
    Raw(String),
}

impl LimitArg {
    fn render(&self) -> Result<String> {
        match self {
            LimitArg::Count(n) => Ok(n.to_string()),
            LimitArg::Raw(text) => {
                let text = text.trim();
                if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(DialectError::parse(format!(
                        "LIMIT/OFFSET must be a non-negative integer literal, got {:?}",
                        text
                    )));
                }
                Ok(text.to_string())
            }
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            LimitArg::Count(n) => *n == 0,
            LimitArg::Raw(text) => text.trim().bytes().all(|b| b == b'0'),
        }
    }
}

impl From<u64> for LimitArg {
    fn from(n: u64) -> Self {
        LimitArg::Count(n)
    }
}

impl From<&str> for LimitArg {
    fn from(text: &str) -> Self {
        LimitArg::Raw(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// SELECT statement description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// Selected columns; empty selects `*`.
    pub columns: Vec<String>,
    pub distinct: bool,
    pub from: String,
    pub filter: Option<Condition>,
    pub group_by: Vec<String>,
    pub having: Option<Condition>,
    pub order_by: Vec<(String, SortOrder)>,
    pub limit: Option<LimitArg>,
    pub offset: Option<LimitArg>,
}

impl SelectQuery {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            ..Default::default()
        }
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Add a WHERE condition, AND-ed with any existing one.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn having(mut self, condition: Condition) -> Self {
        self.having = Some(condition);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(LimitArg::Count(limit));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(LimitArg::Count(offset));
        self
    }
}

impl QueryBuilder {
    /// Build the LIMIT clause, or an empty string when neither part applies.
    ///
    /// An offset without a limit is spelled `LIMIT offset, 18446744073709551615`.
    /// A zero offset is omitted.
    pub fn build_limit(&self, limit: Option<&LimitArg>, offset: Option<&LimitArg>) -> Result<String> {
        let offset = match offset {
            Some(arg) => {
                let rendered = arg.render()?;
                (!arg.is_zero()).then_some(rendered)
            }
            None => None,
        };

        match (limit, offset) {
            (Some(limit), Some(offset)) => Ok(format!("LIMIT {} OFFSET {}", limit.render()?, offset)),
            (Some(limit), None) => Ok(format!("LIMIT {}", limit.render()?)),
            (None, Some(offset)) => Ok(format!("LIMIT {}, {}", offset, MAX_LIMIT_SENTINEL)),
            (None, None) => Ok(String::new()),
        }
    }

    /// Build a SELECT statement and its bound parameters.
    pub fn build_query(&self, query: &SelectQuery) -> Result<(String, Params)> {
        if query.from.is_empty() {
            return Err(DialectError::InvalidArgument(
                "SELECT without a FROM table".to_string(),
            ));
        }
        let mut params = Params::new();

        let columns = if query.columns.is_empty() {
            "*".to_string()
        } else {
            self.column_list(&query.columns)
        };
        let mut sql = format!(
            "SELECT {}{} FROM {}",
            if query.distinct { "DISTINCT " } else { "" },
            columns,
            self.table(&query.from)
        );

        if let Some(filter) = &query.filter {
            sql.push_str(" WHERE ");
            sql.push_str(&self.build_condition(filter, &mut params));
        }
        if !query.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.column_list(&query.group_by));
        }
        if let Some(having) = &query.having {
            sql.push_str(" HAVING ");
            sql.push_str(&self.build_condition(having, &mut params));
        }
        if !query.order_by.is_empty() {
            let order = query
                .order_by
                .iter()
                .map(|(column, order)| match order {
                    SortOrder::Asc => self.column(column),
                    SortOrder::Desc => format!("{} DESC", self.column(column)),
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&order);
        }

        let limit = self.build_limit(query.limit.as_ref(), query.offset.as_ref())?;
        if !limit.is_empty() {
            sql.push(' ');
            sql.push_str(&limit);
        }

        Ok((sql, params))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builder::expr::CompareOp;

    #[test]
    fn test_build_limit() {
        let qb = QueryBuilder::default();
        assert_eq!(
            qb.build_limit(Some(&LimitArg::Count(10)), Some(&LimitArg::Count(0)))
                .unwrap(),
            "LIMIT 10"
        );
        assert_eq!(
            qb.build_limit(Some(&LimitArg::Count(10)), Some(&LimitArg::Count(20))).unwrap(),
            "LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            qb.build_limit(None, Some(&LimitArg::Count(5))).unwrap(),
            "LIMIT 5, 18446744073709551615"
        );
        assert_eq!(qb.build_limit(None, Some(&LimitArg::Count(0))).unwrap(), "");
        assert_eq!(qb.build_limit(None, None).unwrap(), "");
    }

    #[test]
    fn test_build_limit_raw_operands() {
        let qb = QueryBuilder::default();
        assert_eq!(
            qb.build_limit(Some(&LimitArg::from("25")), Some(&LimitArg::from("000"))).unwrap(),
            "LIMIT 25"
        );
        assert!(matches!(
            qb.build_limit(Some(&LimitArg::from("10; DROP TABLE t")), None),
            Err(DialectError::Parse(_))
        ));
        assert!(qb.build_limit(None, Some(&LimitArg::from("-1"))).is_err());
    }

    #[test]
    fn test_build_query() {
        let qb = QueryBuilder::default();
        let query = SelectQuery::from("shop.orders")
            .select(["id", "total"])
            .distinct()
            .filter(Condition::eq("status", "paid"))
            .filter(Condition::compare("total", CompareOp::Gt, 100))
            .group_by(["id", "total"])
            .order_by("total", SortOrder::Desc)
            .order_by("id", SortOrder::Asc)
            .limit(10)
            .offset(30);
        let (sql, params) = qb.build_query(&query).unwrap();
        assert_eq!(
            sql,
            "SELECT DISTINCT `id`, `total` FROM `shop`.`orders` \
             WHERE (`status` = :qp0) AND (`total` > :qp1) GROUP BY `id`, `total` \
             ORDER BY `total` DESC, `id` LIMIT 10 OFFSET 30"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_build_query_star_and_offset_only() {
        let qb = QueryBuilder::default();
        let (sql, params) = qb.build_query(&SelectQuery::from("t").offset(5)).unwrap();
        assert_eq!(sql, "SELECT * FROM `t` LIMIT 5, 18446744073709551615");
        assert!(params.is_empty());
        assert!(qb.build_query(&SelectQuery::default()).is_err());
    }
}
