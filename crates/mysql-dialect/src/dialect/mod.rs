//! Dialect rules for the MySQL engine family.
//!
//! One [`DialectRules`] value carries everything that differs between engine
//! generations: quoting, the type map, upsert spelling, JSON binding and
//! feature-support flags. Builders, the reflector and the transaction
//! controller are all parameterized by it instead of being specialized per
//! engine.
//!
//! Compatible with MySQL 5.7+, 8.0+, and MariaDB 10.2+.

pub mod abstract_type;
pub mod definition;
pub mod typemap;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::identifier::Quoter;
use crate::error::{DialectError, Result};

pub use abstract_type::AbstractType;
pub use definition::ColumnDefinitionInfo;
pub use typemap::TypeMap;

/// First MySQL release accepting `INSERT ... AS new ON DUPLICATE KEY UPDATE`.
const ROW_ALIAS_MIN_VERSION: ServerVersion = ServerVersion::new(8, 0, 19);

/// Engine family member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineVariant {
    #[default]
    Mysql,
    Mariadb,
}

impl EngineVariant {
    pub fn name(&self) -> &'static str {
        match self {
            EngineVariant::Mysql => "mysql",
            EngineVariant::Mariadb => "mariadb",
        }
    }
}

/// How `ON DUPLICATE KEY UPDATE` refers to the row being inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UpsertSyntax {
    /// `col = VALUES(col)`.
    #[default]
    ValuesFunction,
    /// `INSERT ... AS new ... col = new.col`.
    RowAlias,
}

/// Parsed `major.minor.patch` server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a `SELECT VERSION()` string.
    ///
    /// Accepts suffixes (`8.0.35-log`, `10.11.6-MariaDB-1`) and the
    /// `5.5.5-` prefix some MariaDB servers report over the wire.
    pub fn parse(version: &str) -> Result<Self> {
        let text = version.trim();
        let text = match text.strip_prefix("5.5.5-") {
            Some(rest) if rest.to_lowercase().contains("mariadb") => rest,
            _ => text,
        };
        let numeric = text
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or_default();

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let mut next = || -> Result<u32> {
            parts.next().map_or(Ok(0), |p| {
                p.parse()
                    .map_err(|_| DialectError::parse(format!("invalid server version: {}", version)))
            })
        };
        let major = next()?;
        let minor = next()?;
        let patch = next()?;
        if numeric.is_empty() {
            return Err(DialectError::parse(format!(
                "invalid server version: {:?}",
                version
            )));
        }
        Ok(Self::new(major, minor, patch))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Per-instance dialect configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DialectRules {
    pub engine: EngineVariant,
    pub version: Option<ServerVersion>,
    pub quoter: Quoter,
    pub type_map: TypeMap,
    pub supports_savepoints: bool,
    /// Bind JSON values as `CAST(:p AS JSON)` instead of a plain placeholder.
    pub json_cast: bool,
    pub upsert_syntax: UpsertSyntax,
    /// Whether `ALTER TABLE` can add or drop CHECK constraints by name.
    pub supports_check_constraints: bool,
}

impl Default for DialectRules {
    fn default() -> Self {
        Self::mysql()
    }
}

impl DialectRules {
    /// Rules for MySQL.
    pub fn mysql() -> Self {
        Self {
            engine: EngineVariant::Mysql,
            version: None,
            quoter: Quoter::default(),
            type_map: TypeMap::mysql(),
            supports_savepoints: true,
            json_cast: true,
            upsert_syntax: UpsertSyntax::ValuesFunction,
            supports_check_constraints: false,
        }
    }

    /// Rules for MariaDB, which stores JSON as checked longtext.
    pub fn mariadb() -> Self {
        Self {
            engine: EngineVariant::Mariadb,
            json_cast: false,
            ..Self::mysql()
        }
    }

    /// Rules for a concrete server, detected from its version string.
    pub fn for_server_version(version: &str) -> Result<Self> {
        let parsed = ServerVersion::parse(version)?;
        let rules = if version.to_lowercase().contains("mariadb") {
            Self::mariadb()
        } else {
            Self::mysql()
        };
        Ok(Self {
            version: Some(parsed),
            ..rules
        })
    }

    /// Switch upserts to the row-alias spelling.
    ///
    /// Fails on MariaDB and on MySQL servers older than 8.0.19.
    pub fn with_row_alias_upsert(mut self) -> Result<Self> {
        if self.engine == EngineVariant::Mariadb {
            return Err(DialectError::unsupported(
                "row alias upsert syntax on MariaDB",
            ));
        }
        if let Some(version) = self.version {
            if version < ROW_ALIAS_MIN_VERSION {
                return Err(DialectError::unsupported(format!(
                    "row alias upsert syntax requires MySQL {} or later, server is {}",
                    ROW_ALIAS_MIN_VERSION, version
                )));
            }
        }
        self.upsert_syntax = UpsertSyntax::RowAlias;
        Ok(self)
    }

    /// Dialect identity used in metadata cache keys.
    pub fn name(&self) -> &'static str {
        self.engine.name()
    }
}
