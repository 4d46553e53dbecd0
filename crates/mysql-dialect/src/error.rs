//! Error types for the dialect adapter.

use thiserror::Error;

/// SQLSTATE class reported by the engine for integrity constraint violations.
const CONSTRAINT_VIOLATION_CLASS: &str = "23";

/// Main error type for dialect operations.
#[derive(Error, Debug)]
pub enum DialectError {
    /// Malformed column definition, limit expression or DDL fragment.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The dialect has no way to express the requested operation.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Commit (or savepoint work) requested while no transaction is active.
    #[error("Transaction is not active: {0}")]
    InactiveTransaction(String),

    /// Caller supplied an argument the operation cannot work with.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A placeholder in the SQL text has no bound value.
    #[error("Parameter binding error: {0}")]
    Binding(String),

    /// The connection to the server was lost or is not open.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// Error reported by the server, with its native diagnostics.
    #[error("Engine error {code} ({state}): {message}")]
    Engine {
        code: u16,
        state: String,
        message: String,
    },

    /// Client-side driver failure.
    #[error("Driver error: {0}")]
    Driver(String),

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DialectError {
    /// Create a Parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        DialectError::Parse(message.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        DialectError::Unsupported(message.into())
    }

    /// Create an Engine error from raw server diagnostics.
    pub fn engine(code: u16, state: impl Into<String>, message: impl Into<String>) -> Self {
        DialectError::Engine {
            code,
            state: state.into(),
            message: message.into(),
        }
    }

    /// Native server error code, if this error came from the server.
    pub fn engine_code(&self) -> Option<u16> {
        match self {
            DialectError::Engine { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the server rejected the statement for violating a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DialectError::Engine { state, .. } if state.starts_with(CONSTRAINT_VIOLATION_CLASS))
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl From<mysql_async::Error> for DialectError {
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Server(e) => DialectError::Engine {
                code: e.code,
                state: e.state,
                message: e.message,
            },
            mysql_async::Error::Io(e) => DialectError::ConnectionLost(e.to_string()),
            mysql_async::Error::Driver(mysql_async::DriverError::ConnectionClosed) => {
                DialectError::ConnectionLost("connection closed by server".to_string())
            }
            other => DialectError::Driver(other.to_string()),
        }
    }
}

/// Result type alias for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violation_detection() {
        let dup = DialectError::engine(1062, "23000", "Duplicate entry '1' for key 'PRIMARY'");
        assert!(dup.is_constraint_violation());
        assert_eq!(dup.engine_code(), Some(1062));

        let gone = DialectError::engine(2006, "HY000", "MySQL server has gone away");
        assert!(!gone.is_constraint_violation());
        assert!(!DialectError::parse("x").is_constraint_violation());
    }

    #[test]
    fn test_format_detailed() {
        let err = DialectError::unsupported("CHECK constraints");
        let text = err.format_detailed();
        assert!(text.starts_with("Error: Unsupported operation: CHECK constraints"));
    }
}
