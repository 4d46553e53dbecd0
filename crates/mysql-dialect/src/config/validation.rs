//! Configuration validation.

use super::{Config, EngineKind};
use crate::dialect::ServerVersion;
use crate::error::{DialectError, Result};

const SSL_MODES: &[&str] = &[
    "disable",
    "prefer",
    "require",
    "verify-ca",
    "verify_ca",
    "verify-full",
    "verify_identity",
];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let connection = &config.connection;
    if connection.host.is_empty() {
        return Err(DialectError::Config("connection.host is required".into()));
    }
    if connection.port == 0 {
        return Err(DialectError::Config("connection.port must be non-zero".into()));
    }
    if connection.database.is_empty() {
        return Err(DialectError::Config("connection.database is required".into()));
    }
    if connection.user.is_empty() {
        return Err(DialectError::Config("connection.user is required".into()));
    }
    if !SSL_MODES.contains(&connection.ssl_mode.to_lowercase().as_str()) {
        return Err(DialectError::Config(format!(
            "connection.ssl_mode must be one of {}, got '{}'",
            SSL_MODES.join(", "),
            connection.ssl_mode
        )));
    }

    let dialect = &config.dialect;
    if let Some(version) = &dialect.server_version {
        ServerVersion::parse(version).map_err(|e| {
            DialectError::Config(format!("dialect.server_version is invalid: {}", e))
        })?;
        if dialect.engine == EngineKind::Mariadb && !version.to_lowercase().contains("mariadb") {
            return Err(DialectError::Config(format!(
                "dialect.engine is 'mariadb' but dialect.server_version '{}' is not a MariaDB version",
                version
            )));
        }
    }
    if dialect.upsert_row_alias && dialect.engine == EngineKind::Mariadb {
        return Err(DialectError::Config(
            "dialect.upsert_row_alias is not available on MariaDB".into(),
        ));
    }

    Ok(())
}
