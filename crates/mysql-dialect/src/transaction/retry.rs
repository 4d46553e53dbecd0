//! Single retry after a transient disconnect.
//!
//! A statement that fails because the server dropped the connection is
//! re-issued once on a fresh connection, but only outside an explicit
//! transaction: reopening inside one would silently discard the work done so
//! far. Any other error, and a second failure, propagate unchanged.

use tracing::warn;

use crate::core::traits::QueryExecutor;
use crate::error::{DialectError, Result};

/// Client error: MySQL server has gone away.
pub const CR_SERVER_GONE_ERROR: u16 = 2006;

/// Client error: lost connection to MySQL server during query.
pub const CR_SERVER_LOST: u16 = 2013;

/// Server error: got a packet bigger than `max_allowed_packet`.
pub const ER_NET_PACKET_TOO_LARGE: u16 = 1153;

/// Decides whether an error is worth one reconnect-and-retry.
pub trait ErrorClassifier: Send + Sync {
    fn is_transient_disconnect(&self, err: &DialectError) -> bool;
}

/// Recognizes the "server has gone away" family of MySQL errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDisconnectClassifier;

impl ErrorClassifier for MysqlDisconnectClassifier {
    fn is_transient_disconnect(&self, err: &DialectError) -> bool {
        match err {
            DialectError::ConnectionLost(_) => true,
            DialectError::Engine { code, message, .. } => {
                matches!(
                    *code,
                    CR_SERVER_GONE_ERROR | CR_SERVER_LOST | ER_NET_PACKET_TOO_LARGE
                ) || mentions_disconnect(message)
            }
            DialectError::Driver(message) => mentions_disconnect(message),
            _ => false,
        }
    }
}

fn mentions_disconnect(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("gone away") || message.contains("max_allowed_packet")
}

/// Run `op`, reconnecting and running it once more after a transient
/// disconnect when `transaction_level` is zero.
pub fn with_retry<E, T, F>(
    exec: &mut E,
    classifier: &dyn ErrorClassifier,
    transaction_level: u32,
    mut op: F,
) -> Result<T>
where
    E: QueryExecutor + ?Sized,
    F: FnMut(&mut E) -> Result<T>,
{
    match op(exec) {
        Ok(value) => Ok(value),
        Err(err) if transaction_level == 0 && classifier.is_transient_disconnect(&err) => {
            warn!(
                "Connection to {} lost ({}), reconnecting and retrying once",
                exec.target(),
                err
            );
            exec.close();
            exec.open()?;
            op(exec)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Params;
    use crate::testing::ScriptedExecutor;

    fn gone_away() -> DialectError {
        DialectError::engine(CR_SERVER_GONE_ERROR, "HY000", "MySQL server has gone away")
    }

    #[test]
    fn test_classifier() {
        let c = MysqlDisconnectClassifier;
        assert!(c.is_transient_disconnect(&gone_away()));
        assert!(c.is_transient_disconnect(&DialectError::engine(2013, "HY000", "Lost connection")));
        assert!(c.is_transient_disconnect(&DialectError::engine(
            1153,
            "08S01",
            "Got a packet bigger than 'max_allowed_packet' bytes"
        )));
        assert!(c.is_transient_disconnect(&DialectError::ConnectionLost("reset".into())));
        assert!(c.is_transient_disconnect(&DialectError::Driver("server has gone away".into())));

        assert!(!c.is_transient_disconnect(&DialectError::engine(1062, "23000", "Duplicate entry")));
        assert!(!c.is_transient_disconnect(&DialectError::parse("bad")));
    }

    #[test]
    fn test_retries_once_outside_transaction() {
        let mut exec = ScriptedExecutor::new();
        exec.on_error("SELECT", gone_away());
        exec.on("SELECT", crate::testing::Reply::Affected(3));

        let affected = with_retry(&mut exec, &MysqlDisconnectClassifier, 0, |e| {
            e.execute("SELECT 1", &Params::new())
        })
        .unwrap();
        assert_eq!(affected, 3);
        assert_eq!(exec.closes, 1);
        assert_eq!(exec.opens, 1);
        assert_eq!(exec.log, vec!["SELECT 1", "SELECT 1"]);
    }

    #[test]
    fn test_second_failure_propagates() {
        let mut exec = ScriptedExecutor::new();
        exec.on_error("SELECT", gone_away());
        exec.on_error("SELECT", gone_away());

        let err = with_retry(&mut exec, &MysqlDisconnectClassifier, 0, |e| {
            e.execute("SELECT 1", &Params::new())
        })
        .unwrap_err();
        assert_eq!(err.engine_code(), Some(CR_SERVER_GONE_ERROR));
        assert_eq!(exec.log.len(), 2);
    }

    #[test]
    fn test_no_retry_inside_transaction() {
        let mut exec = ScriptedExecutor::new();
        exec.on_error("UPDATE", gone_away());

        let result = with_retry(&mut exec, &MysqlDisconnectClassifier, 1, |e| {
            e.execute("UPDATE t SET a = 1", &Params::new())
        });
        assert!(result.is_err());
        assert_eq!(exec.closes, 0);
        assert_eq!(exec.log.len(), 1);
    }

    #[test]
    fn test_other_errors_are_not_retried() {
        let mut exec = ScriptedExecutor::new();
        exec.on_error("INSERT", DialectError::engine(1062, "23000", "Duplicate entry '1'"));

        let err = with_retry(&mut exec, &MysqlDisconnectClassifier, 0, |e| {
            e.execute("INSERT INTO t VALUES (1)", &Params::new())
        })
        .unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(exec.log.len(), 1);
    }
}
