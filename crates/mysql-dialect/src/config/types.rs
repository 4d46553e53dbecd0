//! Configuration type definitions.

use serde::{Deserialize, Serialize};

use crate::dialect::EngineVariant;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server connection.
    pub connection: ConnectionConfig,

    /// Dialect rules.
    #[serde(default)]
    pub dialect: DialectConfig,
}

/// Server connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server host.
    pub host: String,

    /// Server port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Default database.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// TLS mode: disable, prefer, require, verify-ca, verify-full (default: prefer).
    #[serde(default = "default_prefer")]
    pub ssl_mode: String,
}

/// Engine selection and dialect feature switches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialectConfig {
    /// Engine family (default: mysql).
    #[serde(default)]
    pub engine: EngineKind,

    /// Server version string, e.g. "8.0.36" or "10.11.6-MariaDB".
    /// When set, it decides the engine family.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,

    /// Use savepoints for nested transactions (default: true).
    #[serde(default = "default_true")]
    pub savepoints: bool,

    /// Spell upserts with a row alias instead of `VALUES(col)` (default: false).
    #[serde(default)]
    pub upsert_row_alias: bool,
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            server_version: None,
            savepoints: true,
            upsert_row_alias: false,
        }
    }
}

/// Engine family as written in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Mysql,
    Mariadb,
}

impl From<EngineKind> for EngineVariant {
    fn from(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Mysql => EngineVariant::Mysql,
            EngineKind::Mariadb => EngineVariant::Mariadb,
        }
    }
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_prefer() -> String {
    "prefer".to_string()
}

fn default_true() -> bool {
    true
}
