//! Connection configuration for both backing stores
//!
//! Resolution follows a fixed priority order:
//! 1. Command-line argument / environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! Credentials are supplied here, never validated against the stores. The only
//! check is that an authenticated store actually has credentials to present.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_MYSQL_HOST: &str = "mysql";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_MYSQL_USER: &str = "root";
pub const DEFAULT_MYSQL_PASSWORD: &str = "secret";
pub const DEFAULT_MONGO_HOST: &str = "mongo";
pub const DEFAULT_MONGO_PORT: u16 = 27017;
pub const DEFAULT_DATABASE: &str = "social_hybrid";
pub const DEFAULT_AUTH_SOURCE: &str = "admin";

/// Relational store connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct RelationalConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl RelationalConfig {
    /// Credential-free description used in log lines
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl Default for RelationalConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MYSQL_HOST.to_string(),
            port: DEFAULT_MYSQL_PORT,
            user: DEFAULT_MYSQL_USER.to_string(),
            password: DEFAULT_MYSQL_PASSWORD.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl fmt::Debug for RelationalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}

/// Document store connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct DocumentConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    /// Database the credentials are defined in
    pub auth_source: String,
    /// When false the store is opened without credentials
    pub auth_enabled: bool,
}

impl DocumentConfig {
    /// Credential-free description used in log lines
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MONGO_HOST.to_string(),
            port: DEFAULT_MONGO_PORT,
            username: None,
            password: None,
            database: DEFAULT_DATABASE.to_string(),
            auth_source: DEFAULT_AUTH_SOURCE.to_string(),
            auth_enabled: true,
        }
    }
}

impl fmt::Debug for DocumentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("auth_source", &self.auth_source)
            .field("auth_enabled", &self.auth_enabled)
            .finish()
    }
}

/// Configuration for one federated session: one entry per store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FederationConfig {
    pub relational: RelationalConfig,
    pub document: DocumentConfig,
}

/// Partial relational settings from one configuration source
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelationalLayer {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

/// Partial document settings from one configuration source
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentLayer {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub auth_source: Option<String>,
    pub auth: Option<bool>,
}

/// One configuration source (TOML file, or CLI/environment)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub relational: RelationalLayer,
    #[serde(default)]
    pub document: DocumentLayer,
}

impl ConfigLayer {
    /// Parse a layer from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a layer from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let layer = Self::from_toml_str(&content)?;
        info!("Loaded configuration file: {}", path.display());
        Ok(layer)
    }
}

impl FederationConfig {
    /// Resolve the final configuration and validate it
    ///
    /// `overrides` wins over `file`, which wins over compiled defaults.
    pub fn resolve(file: Option<ConfigLayer>, overrides: ConfigLayer) -> Result<Self> {
        let mut config = FederationConfig::default();
        if let Some(file) = file {
            config.apply(file);
        }
        config.apply(overrides);
        config.validate()?;
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    fn apply(&mut self, layer: ConfigLayer) {
        let rel = &mut self.relational;
        let r = layer.relational;
        if let Some(v) = r.host {
            rel.host = v;
        }
        if let Some(v) = r.port {
            rel.port = v;
        }
        if let Some(v) = r.user {
            rel.user = v;
        }
        if let Some(v) = r.password {
            rel.password = v;
        }
        if let Some(v) = r.database {
            rel.database = v;
        }

        let doc = &mut self.document;
        let d = layer.document;
        if let Some(v) = d.host {
            doc.host = v;
        }
        if let Some(v) = d.port {
            doc.port = v;
        }
        if d.username.is_some() {
            doc.username = d.username;
        }
        if d.password.is_some() {
            doc.password = d.password;
        }
        if let Some(v) = d.database {
            doc.database = v;
        }
        if let Some(v) = d.auth_source {
            doc.auth_source = v;
        }
        if let Some(v) = d.auth {
            doc.auth_enabled = v;
        }
    }

    /// Check that both stores can be addressed and that an authenticated
    /// document store has credentials
    pub fn validate(&self) -> Result<()> {
        let rel = &self.relational;
        require_non_empty("relational host", &rel.host)?;
        require_non_empty("relational database", &rel.database)?;
        require_non_empty("relational user", &rel.user)?;
        if rel.port == 0 {
            return Err(Error::Configuration("relational port must be non-zero".to_string()));
        }

        let doc = &self.document;
        require_non_empty("document host", &doc.host)?;
        require_non_empty("document database", &doc.database)?;
        if doc.port == 0 {
            return Err(Error::Configuration("document port must be non-zero".to_string()));
        }
        if doc.auth_enabled {
            require_non_empty("document auth source", &doc.auth_source)?;
            if doc.username.as_deref().map_or(true, str::is_empty) {
                return Err(Error::Configuration(
                    "document store requires authentication but no username was supplied \
                     (MONGO_INITDB_ROOT_USERNAME)"
                        .to_string(),
                ));
            }
            if doc.password.as_deref().map_or(true, str::is_empty) {
                return Err(Error::Configuration(
                    "document store requires authentication but no password was supplied \
                     (MONGO_INITDB_ROOT_PASSWORD)"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn require_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Configuration(format!("{} must not be empty", name)));
    }
    Ok(())
}

/// Parse a boolean-equivalent flag value (`true/false`, `1/0`, `yes/no`, `on/off`)
pub fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(Error::Configuration(format!(
            "invalid boolean value '{}'",
            other
        ))),
    }
}
