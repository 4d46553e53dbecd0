//! Nested transactions over savepoints.
//!
//! Level 0 means no transaction. The first [`TransactionController::begin`]
//! starts a real transaction; each nested one creates a savepoint named after
//! the level it was opened from (`LEVEL1`, `LEVEL2`, ...). Commit and rollback
//! unwind one level at a time.

pub mod retry;

use std::fmt;

use tracing::debug;

use crate::core::traits::QueryExecutor;
use crate::core::value::Params;
use crate::error::{DialectError, Result};

pub use retry::{with_retry, ErrorClassifier, MysqlDisconnectClassifier};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Savepoint name used for a nested transaction opened at `level`.
pub fn savepoint_name(level: u32) -> String {
    format!("LEVEL{}", level)
}

/// Transaction nesting state of one connection.
#[derive(Debug, Clone)]
pub struct TransactionController {
    level: u32,
    supports_savepoints: bool,
}

impl TransactionController {
    pub fn new(supports_savepoints: bool) -> Self {
        Self {
            level: 0,
            supports_savepoints,
        }
    }

    /// Current nesting level; 0 when no transaction is active.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_active(&self) -> bool {
        self.level > 0
    }

    /// Forget any open transaction, e.g. after the connection was closed.
    pub fn reset(&mut self) {
        if self.level > 0 {
            debug!("Discarding transaction state at level {}", self.level);
        }
        self.level = 0;
    }

    /// Start a transaction, or a savepoint when one is already active.
    ///
    /// The isolation level applies only to the outermost transaction.
    pub fn begin(
        &mut self,
        exec: &mut dyn QueryExecutor,
        isolation: Option<IsolationLevel>,
    ) -> Result<()> {
        if self.level == 0 {
            if !exec.is_open() {
                exec.open()?;
            }
            if let Some(isolation) = isolation {
                exec.execute(
                    &format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.as_sql()),
                    &Params::new(),
                )?;
            }
            exec.execute("START TRANSACTION", &Params::new())?;
            self.level = 1;
            debug!("Begin transaction{}", isolation.map(|i| format!(" ({})", i)).unwrap_or_default());
            return Ok(());
        }

        if !self.supports_savepoints {
            return Err(DialectError::unsupported(
                "nested transactions are not supported without savepoints",
            ));
        }
        if let Some(isolation) = isolation {
            debug!("Ignoring isolation level {} for nested transaction", isolation);
        }
        self.create_savepoint(exec, &savepoint_name(self.level))?;
        self.level += 1;
        Ok(())
    }

    /// Commit the innermost level.
    pub fn commit(&mut self, exec: &mut dyn QueryExecutor) -> Result<()> {
        if self.level == 0 {
            return Err(DialectError::InactiveTransaction(
                "failed to commit transaction: transaction was inactive".to_string(),
            ));
        }

        self.level -= 1;
        if self.level == 0 {
            debug!("Commit transaction");
            exec.execute("COMMIT", &Params::new())?;
        } else if self.supports_savepoints {
            self.release_savepoint(exec, &savepoint_name(self.level))?;
        } else {
            debug!("Transaction not committed: nested transaction not supported");
        }
        Ok(())
    }

    /// Roll back the innermost level. Does nothing when no transaction is
    /// active.
    pub fn rollback(&mut self, exec: &mut dyn QueryExecutor) -> Result<()> {
        if self.level == 0 {
            debug!("Rollback ignored: no active transaction");
            return Ok(());
        }

        self.level -= 1;
        if self.level == 0 {
            debug!("Roll back transaction");
            exec.execute("ROLLBACK", &Params::new())?;
        } else if self.supports_savepoints {
            self.rollback_to_savepoint(exec, &savepoint_name(self.level))?;
        } else {
            debug!("Transaction not rolled back: nested transaction not supported");
        }
        Ok(())
    }

    pub fn create_savepoint(&self, exec: &mut dyn QueryExecutor, name: &str) -> Result<()> {
        self.require_savepoints()?;
        debug!("Set savepoint {}", name);
        exec.execute(&format!("SAVEPOINT {}", savepoint_ident(name)), &Params::new())?;
        Ok(())
    }

    pub fn release_savepoint(&self, exec: &mut dyn QueryExecutor, name: &str) -> Result<()> {
        self.require_savepoints()?;
        debug!("Release savepoint {}", name);
        exec.execute(&format!("RELEASE SAVEPOINT {}", savepoint_ident(name)), &Params::new())?;
        Ok(())
    }

    pub fn rollback_to_savepoint(&self, exec: &mut dyn QueryExecutor, name: &str) -> Result<()> {
        self.require_savepoints()?;
        debug!("Roll back to savepoint {}", name);
        exec.execute(&format!("ROLLBACK TO SAVEPOINT {}", savepoint_ident(name)), &Params::new())?;
        Ok(())
    }

    fn require_savepoints(&self) -> Result<()> {
        if self.supports_savepoints {
            Ok(())
        } else {
            Err(DialectError::unsupported("savepoints"))
        }
    }
}

/// Savepoint names are identifiers; anything outside `[A-Za-z0-9_]` is quoted.
fn savepoint_ident(name: &str) -> String {
    if !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::ScriptedExecutor;

    #[test]
    fn test_nested_begin_commit() {
        let mut exec = ScriptedExecutor::new();
        let mut tx = TransactionController::new(true);

        tx.begin(&mut exec, None).unwrap();
        tx.begin(&mut exec, None).unwrap();
        assert_eq!(tx.level(), 2);
        tx.commit(&mut exec).unwrap();
        tx.commit(&mut exec).unwrap();
        assert_eq!(tx.level(), 0);

        assert_eq!(
            exec.log,
            vec![
                "START TRANSACTION",
                "SAVEPOINT LEVEL1",
                "RELEASE SAVEPOINT LEVEL1",
                "COMMIT"
            ]
        );
    }

    #[test]
    fn test_nested_rollback() {
        let mut exec = ScriptedExecutor::new();
        let mut tx = TransactionController::new(true);

        tx.begin(&mut exec, Some(IsolationLevel::ReadCommitted)).unwrap();
        tx.begin(&mut exec, None).unwrap();
        tx.begin(&mut exec, Some(IsolationLevel::Serializable)).unwrap();
        tx.rollback(&mut exec).unwrap();
        tx.commit(&mut exec).unwrap();
        tx.rollback(&mut exec).unwrap();

        assert_eq!(
            exec.log,
            vec![
                "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
                "START TRANSACTION",
                "SAVEPOINT LEVEL1",
                "SAVEPOINT LEVEL2",
                "ROLLBACK TO SAVEPOINT LEVEL2",
                "RELEASE SAVEPOINT LEVEL1",
                "ROLLBACK"
            ]
        );
    }

    #[test]
    fn test_rollback_when_inactive_is_noop() {
        let mut exec = ScriptedExecutor::new();
        let mut tx = TransactionController::new(true);

        tx.begin(&mut exec, None).unwrap();
        tx.rollback(&mut exec).unwrap();
        tx.rollback(&mut exec).unwrap();
        assert_eq!(exec.log, vec!["START TRANSACTION", "ROLLBACK"]);
        assert!(!tx.is_active());
    }

    #[test]
    fn test_commit_when_inactive_fails() {
        let mut exec = ScriptedExecutor::new();
        let mut tx = TransactionController::new(true);
        assert!(matches!(
            tx.commit(&mut exec),
            Err(DialectError::InactiveTransaction(_))
        ));
        assert!(exec.log.is_empty());
    }

    #[test]
    fn test_nested_begin_without_savepoints() {
        let mut exec = ScriptedExecutor::new();
        let mut tx = TransactionController::new(false);

        tx.begin(&mut exec, None).unwrap();
        let err = tx.begin(&mut exec, None).unwrap_err();
        assert!(matches!(err, DialectError::Unsupported(_)));
        assert_eq!(tx.level(), 1);

        assert!(tx.create_savepoint(&mut exec, "manual").is_err());
        tx.commit(&mut exec).unwrap();
        assert_eq!(exec.log, vec!["START TRANSACTION", "COMMIT"]);
    }

    #[test]
    fn test_begin_opens_closed_connection() {
        let mut exec = ScriptedExecutor::new();
        exec.open = false;
        let mut tx = TransactionController::new(true);

        tx.begin(&mut exec, None).unwrap();
        assert_eq!(exec.opens, 1);
        assert!(tx.is_active());
    }

    #[test]
    fn test_explicit_savepoints() {
        let mut exec = ScriptedExecutor::new();
        let tx = TransactionController::new(true);
        tx.create_savepoint(&mut exec, "before_import").unwrap();
        tx.rollback_to_savepoint(&mut exec, "before_import").unwrap();
        tx.release_savepoint(&mut exec, "odd-name").unwrap();
        assert_eq!(
            exec.log,
            vec![
                "SAVEPOINT before_import",
                "ROLLBACK TO SAVEPOINT before_import",
                "RELEASE SAVEPOINT `odd-name`"
            ]
        );
    }
}
