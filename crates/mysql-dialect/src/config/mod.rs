//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::dialect::DialectRules;
use crate::error::Result;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl ConnectionConfig {
    /// Credential-free description of the server, used in metadata cache keys.
    pub fn target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl DialectConfig {
    /// Build the dialect rules this configuration describes.
    ///
    /// A configured server version takes precedence over `engine`.
    pub fn rules(&self) -> Result<DialectRules> {
        let mut rules = match &self.server_version {
            Some(version) => DialectRules::for_server_version(version)?,
            None => match self.engine {
                EngineKind::Mysql => DialectRules::mysql(),
                EngineKind::Mariadb => DialectRules::mariadb(),
            },
        };
        rules.supports_savepoints = self.savepoints;
        if self.upsert_row_alias {
            rules = rules.with_row_alias_upsert()?;
        }
        Ok(rules)
    }
}
