//! Catalog queries used by the reflector.
//!
//! `information_schema` columns are CAST to CHAR so results do not depend on
//! the server's catalog collation. Every query takes `:schemaName` (NULL for
//! the current database) and `:tableName`.

/// Primary key, unique and foreign key columns of one table, one row per
/// constraint column.
pub const CONSTRAINTS_SQL: &str = r#"
SELECT
    CAST(kcu.CONSTRAINT_NAME AS CHAR(255)) AS constraint_name,
    CAST(kcu.COLUMN_NAME AS CHAR(255)) AS column_name,
    CAST(tc.CONSTRAINT_TYPE AS CHAR(255)) AS constraint_type,
    CAST(kcu.REFERENCED_TABLE_SCHEMA AS CHAR(255)) AS foreign_table_schema,
    CAST(kcu.REFERENCED_TABLE_NAME AS CHAR(255)) AS foreign_table_name,
    CAST(kcu.REFERENCED_COLUMN_NAME AS CHAR(255)) AS foreign_column_name,
    CAST(rc.UPDATE_RULE AS CHAR(255)) AS on_update,
    CAST(rc.DELETE_RULE AS CHAR(255)) AS on_delete
FROM information_schema.KEY_COLUMN_USAGE AS kcu
JOIN information_schema.TABLE_CONSTRAINTS AS tc
    ON tc.TABLE_SCHEMA = kcu.TABLE_SCHEMA
    AND tc.TABLE_NAME = kcu.TABLE_NAME
    AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
LEFT JOIN information_schema.REFERENTIAL_CONSTRAINTS AS rc
    ON rc.CONSTRAINT_SCHEMA = kcu.TABLE_SCHEMA
    AND rc.TABLE_NAME = kcu.TABLE_NAME
    AND rc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
WHERE kcu.TABLE_SCHEMA = COALESCE(:schemaName, DATABASE())
    AND kcu.TABLE_NAME = :tableName
ORDER BY kcu.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
"#;

/// Index columns from the statistics view, in index order.
pub const INDEXES_SQL: &str = r#"
SELECT
    CAST(s.INDEX_NAME AS CHAR(255)) AS name,
    CAST(s.COLUMN_NAME AS CHAR(255)) AS column_name,
    CAST(s.NON_UNIQUE ^ 1 AS SIGNED) AS index_is_unique,
    CAST(s.INDEX_NAME = 'PRIMARY' AS SIGNED) AS index_is_primary
FROM information_schema.STATISTICS AS s
WHERE s.TABLE_SCHEMA = COALESCE(:schemaName, DATABASE())
    AND s.INDEX_SCHEMA = s.TABLE_SCHEMA
    AND s.TABLE_NAME = :tableName
ORDER BY s.INDEX_NAME, s.SEQ_IN_INDEX
"#;

/// Schemas every server carries that are never user schemas.
pub const SYSTEM_SCHEMAS: &[&str] = &["information_schema", "performance_schema", "mysql", "sys"];

/// Engine error: table does not exist.
pub const ER_NO_SUCH_TABLE: u16 = 1146;

/// Engine error: unknown database.
pub const ER_BAD_DB_ERROR: u16 = 1049;

/// SQLSTATE for "base table or view not found".
pub const SQLSTATE_NO_SUCH_TABLE: &str = "42S02";
