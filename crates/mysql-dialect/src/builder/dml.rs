//! INSERT, UPDATE, DELETE and upsert statements.

use std::collections::HashSet;

use crate::core::schema::Table;
use crate::core::value::{Params, SqlValue};
use crate::dialect::UpsertSyntax;
use crate::error::{DialectError, Result};

use super::expr::{Condition, Expr, UPSERT_ROW_ALIAS};
use super::QueryBuilder;

/// What an upsert does when the row already exists.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertUpdate {
    /// Overwrite every inserted column that is not part of the conflicting key.
    All,
    /// Keep the existing row (`INSERT IGNORE`).
    None,
    /// Explicit `column = expression` assignments.
    Columns(Vec<(String, Expr)>),
}

impl QueryBuilder {
    /// Build an INSERT statement.
    ///
    /// With no values, the column list is synthesized from `schema` (primary
    /// key, else first column) with `DEFAULT` markers, since some engine modes
    /// reject `INSERT INTO t () VALUES ()`. Without a schema the empty form is
    /// emitted as-is.
    pub fn insert(
        &self,
        table: &str,
        values: &[(&str, Expr)],
        schema: Option<&Table>,
    ) -> (String, Params) {
        let mut params = Params::new();
        let (columns, placeholders) = self.prepare_insert_values(values, schema, &mut params);
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(table),
            columns,
            placeholders
        );
        (sql, params)
    }

    fn prepare_insert_values(
        &self,
        values: &[(&str, Expr)],
        schema: Option<&Table>,
        params: &mut Params,
    ) -> (String, String) {
        if values.is_empty() {
            let defaults: Vec<&str> = match schema {
                Some(table) if table.has_pk() => table.primary_key.iter().map(String::as_str).collect(),
                Some(table) => table.columns.first().map(|c| c.name.as_str()).into_iter().collect(),
                None => Vec::new(),
            };
            let markers = vec!["DEFAULT"; defaults.len()].join(", ");
            return (self.column_list(&defaults), markers);
        }

        let columns: Vec<&str> = values.iter().map(|(name, _)| *name).collect();
        let placeholders = values
            .iter()
            .map(|(_, expr)| self.build_expr(expr, params))
            .collect::<Vec<_>>()
            .join(", ");
        (self.column_list(&columns), placeholders)
    }

    /// Build a multi-row INSERT.
    pub fn batch_insert(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<SqlValue>],
    ) -> Result<(String, Params)> {
        if rows.is_empty() {
            return Err(DialectError::InvalidArgument(
                "batch insert without rows".to_string(),
            ));
        }
        let mut params = Params::new();
        let mut tuples = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DialectError::InvalidArgument(format!(
                    "batch insert row {} has {} values for {} columns",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            let placeholders = row
                .iter()
                .map(|v| self.build_expr(&Expr::from(v.clone()), &mut params))
                .collect::<Vec<_>>()
                .join(", ");
            tuples.push(format!("({})", placeholders));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.table(table),
            self.column_list(columns),
            tuples.join(", ")
        );
        Ok((sql, params))
    }

    /// Build an UPDATE statement.
    pub fn update(
        &self,
        table: &str,
        values: &[(&str, Expr)],
        condition: Option<&Condition>,
    ) -> Result<(String, Params)> {
        if values.is_empty() {
            return Err(DialectError::InvalidArgument(
                "update without columns".to_string(),
            ));
        }
        let mut params = Params::new();
        let sets = self.assignments(values.iter().map(|(c, e)| (*c, e)), &mut params);
        let mut sql = format!("UPDATE {} SET {}", self.table(table), sets);
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(&self.build_condition(condition, &mut params));
        }
        Ok((sql, params))
    }

    /// Build a DELETE statement.
    pub fn delete(&self, table: &str, condition: Option<&Condition>) -> (String, Params) {
        let mut params = Params::new();
        let mut sql = format!("DELETE FROM {}", self.table(table));
        if let Some(condition) = condition {
            sql.push_str(" WHERE ");
            sql.push_str(&self.build_condition(condition, &mut params));
        }
        (sql, params)
    }

    /// Build an upsert.
    ///
    /// Conflicts are detected on the primary key and unique indexes whose
    /// columns are all inserted. With no such constraint the plain INSERT is
    /// returned. [`UpsertUpdate::None`], or nothing left to update, degrades
    /// to `INSERT IGNORE`.
    pub fn upsert(
        &self,
        table: &Table,
        values: &[(&str, Expr)],
        update: &UpsertUpdate,
    ) -> Result<(String, Params)> {
        let (insert_sql, mut params) = self.insert(&table.full_name(), values, Some(table));
        let inserted: Vec<&str> = values.iter().map(|(name, _)| *name).collect();

        let unique_names = conflict_columns(table, &inserted);
        if unique_names.is_empty() {
            return Ok((insert_sql, params));
        }

        let assignments: Vec<(&str, Expr)> = match update {
            UpsertUpdate::None => Vec::new(),
            UpsertUpdate::All => inserted
                .iter()
                .filter(|name| !unique_names.contains(&name.to_lowercase()))
                .map(|name| (*name, Expr::InsertValue(name.to_string())))
                .collect(),
            UpsertUpdate::Columns(columns) => columns
                .iter()
                .map(|(name, expr)| (name.as_str(), expr.clone()))
                .collect(),
        };

        if assignments.is_empty() {
            let sql = insert_sql.replacen("INSERT INTO", "INSERT IGNORE INTO", 1);
            return Ok((sql, params));
        }

        let sets = self.assignments(assignments.iter().map(|(c, e)| (*c, e)), &mut params);
        let alias = match self.rules().upsert_syntax {
            UpsertSyntax::ValuesFunction => String::new(),
            UpsertSyntax::RowAlias => format!(" AS {}", UPSERT_ROW_ALIAS),
        };
        let sql = format!("{}{} ON DUPLICATE KEY UPDATE {}", insert_sql, alias, sets);
        Ok((sql, params))
    }

    /// MySQL cannot return generated keys from a statement; see
    /// [`Connection::insert_returning_pks`](crate::connection::Connection::insert_returning_pks).
    pub fn insert_returning_pks(&self, _table: &str, _values: &[(&str, Expr)]) -> Result<(String, Params)> {
        Err(DialectError::unsupported(
            "INSERT ... RETURNING is not supported by MySQL",
        ))
    }

    pub fn upsert_returning_pks(
        &self,
        _table: &Table,
        _values: &[(&str, Expr)],
        _update: &UpsertUpdate,
    ) -> Result<(String, Params)> {
        Err(DialectError::unsupported(
            "upsert with RETURNING is not supported by MySQL",
        ))
    }

    fn assignments<'e>(
        &self,
        values: impl Iterator<Item = (&'e str, &'e Expr)>,
        params: &mut Params,
    ) -> String {
        values
            .map(|(column, expr)| format!("{} = {}", self.column(column), self.build_expr(expr, params)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Lowercased columns of every unique constraint fully covered by `inserted`.
fn conflict_columns(table: &Table, inserted: &[&str]) -> HashSet<String> {
    let inserted: HashSet<String> = inserted.iter().map(|c| c.to_lowercase()).collect();
    let mut constraints: Vec<&[String]> = Vec::new();
    if table.has_pk() {
        constraints.push(&table.primary_key);
    }
    constraints.extend(table.unique_indexes().map(|i| i.columns.as_slice()));

    constraints
        .into_iter()
        .filter(|cols| !cols.is_empty() && cols.iter().all(|c| inserted.contains(&c.to_lowercase())))
        .flat_map(|cols| cols.iter().map(|c| c.to_lowercase()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::schema::{Column, Index};
    use crate::dialect::{AbstractType, DialectRules};

    fn customer() -> Table {
        let mut table = Table::new(None, "customer");
        table.columns = vec![
            Column::new("id", AbstractType::Integer, "int"),
            Column::new("email", AbstractType::String, "varchar(255)"),
            Column::new("status", AbstractType::String, "varchar(16)"),
        ];
        table.primary_key = vec!["id".to_string()];
        table.indexes = vec![Index {
            name: Some("uq_email".to_string()),
            columns: vec!["email".to_string()],
            unique: true,
            primary: false,
        }];
        table
    }

    #[test]
    fn test_insert() {
        let qb = QueryBuilder::default();
        let (sql, params) = qb.insert(
            "customer",
            &[("email", Expr::value("a@x.io")), ("status", Expr::Default)],
            None,
        );
        assert_eq!(sql, "INSERT INTO `customer` (`email`, `status`) VALUES (:qp0, DEFAULT)");
        assert_eq!(params.get(":qp0"), Some(&SqlValue::from("a@x.io")));
    }

    #[test]
    fn test_empty_insert_uses_primary_key_defaults() {
        let qb = QueryBuilder::default();
        let table = customer();
        let (sql, _) = qb.insert("customer", &[], Some(&table));
        assert_eq!(sql, "INSERT INTO `customer` (`id`) VALUES (DEFAULT)");

        let mut no_pk = customer();
        no_pk.primary_key.clear();
        let (sql, _) = qb.insert("customer", &[], Some(&no_pk));
        assert_eq!(sql, "INSERT INTO `customer` (`id`) VALUES (DEFAULT)");

        let (sql, _) = qb.insert("customer", &[], None);
        assert_eq!(sql, "INSERT INTO `customer` () VALUES ()");
    }

    #[test]
    fn test_batch_insert() {
        let qb = QueryBuilder::default();
        let rows = vec![
            vec![SqlValue::from(1), SqlValue::from("a")],
            vec![SqlValue::from(2), SqlValue::Null],
        ];
        let (sql, params) = qb.batch_insert("t", &["id", "name"], &rows).unwrap();
        assert_eq!(sql, "INSERT INTO `t` (`id`, `name`) VALUES (:qp0, :qp1), (:qp2, :qp3)");
        assert_eq!(params.get(":qp3"), Some(&SqlValue::Null));

        assert!(qb.batch_insert("t", &["id"], &rows).is_err());
        assert!(qb.batch_insert("t", &["id"], &[]).is_err());
    }

    #[test]
    fn test_update_and_delete() {
        let qb = QueryBuilder::default();
        let (sql, params) = qb
            .update(
                "customer",
                &[("status", Expr::value("gone"))],
                Some(&Condition::eq("id", 7)),
            )
            .unwrap();
        assert_eq!(sql, "UPDATE `customer` SET `status` = :qp0 WHERE `id` = :qp1");
        assert_eq!(params.len(), 2);

        let (sql, _) = qb.delete("customer", None);
        assert_eq!(sql, "DELETE FROM `customer`");
        assert!(qb.update("customer", &[], None).is_err());
    }

    #[test]
    fn test_upsert_update_all_references_insert_values() {
        let qb = QueryBuilder::default();
        let (sql, params) = qb
            .upsert(
                &customer(),
                &[
                    ("id", Expr::value(1)),
                    ("email", Expr::value("a@x.io")),
                    ("status", Expr::value("new")),
                ],
                &UpsertUpdate::All,
            )
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `customer` (`id`, `email`, `status`) VALUES (:qp0, :qp1, :qp2) \
             ON DUPLICATE KEY UPDATE `status` = VALUES(`status`)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_upsert_update_all_covers_every_non_key_column() {
        let qb = QueryBuilder::default();
        let mut table = customer();
        table.indexes.clear();
        let values = [
            ("id", Expr::value(1)),
            ("email", Expr::value("a@x.io")),
            ("status", Expr::value("new")),
        ];
        let (sql, params) = qb.upsert(&table, &values, &UpsertUpdate::All).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `customer` (`id`, `email`, `status`) VALUES (:qp0, :qp1, :qp2) \
             ON DUPLICATE KEY UPDATE `email` = VALUES(`email`), `status` = VALUES(`status`)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_upsert_without_covered_constraint_is_plain_insert() {
        let qb = QueryBuilder::default();
        let (sql, _) = qb
            .upsert(&customer(), &[("status", Expr::value("new"))], &UpsertUpdate::All)
            .unwrap();
        assert_eq!(sql, "INSERT INTO `customer` (`status`) VALUES (:qp0)");
    }

    #[test]
    fn test_upsert_update_none_is_insert_ignore() {
        let qb = QueryBuilder::default();
        let (sql, _) = qb
            .upsert(&customer(), &[("email", Expr::value("a@x.io"))], &UpsertUpdate::None)
            .unwrap();
        assert_eq!(sql, "INSERT IGNORE INTO `customer` (`email`) VALUES (:qp0)");

        let (sql, _) = qb
            .upsert(&customer(), &[("email", Expr::value("a@x.io"))], &UpsertUpdate::All)
            .unwrap();
        assert!(sql.starts_with("INSERT IGNORE INTO"));
    }

    #[test]
    fn test_upsert_explicit_columns_and_row_alias() {
        let rules = DialectRules::mysql().with_row_alias_upsert().unwrap();
        let qb = QueryBuilder::new(Arc::new(rules));
        let update = UpsertUpdate::Columns(vec![(
            "status".to_string(),
            Expr::raw("CONCAT(`status`, '+')"),
        )]);
        let (sql, _) = qb
            .upsert(&customer(), &[("id", Expr::value(1)), ("status", Expr::value("x"))], &update)
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO `customer` (`id`, `status`) VALUES (:qp0, :qp1) AS new \
             ON DUPLICATE KEY UPDATE `status` = CONCAT(`status`, '+')"
        );

        let (sql, _) = qb
            .upsert(&customer(), &[("id", Expr::value(1)), ("status", Expr::value("x"))], &UpsertUpdate::All)
            .unwrap();
        assert!(sql.ends_with("AS new ON DUPLICATE KEY UPDATE `status` = new.`status`"));
    }

    #[test]
    fn test_returning_variants_unsupported() {
        let qb = QueryBuilder::default();
        assert!(matches!(
            qb.insert_returning_pks("t", &[]),
            Err(DialectError::Unsupported(_))
        ));
        assert!(matches!(
            qb.upsert_returning_pks(&customer(), &[], &UpsertUpdate::All),
            Err(DialectError::Unsupported(_))
        ));
    }
}
