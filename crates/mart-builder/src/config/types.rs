//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::drivers::DEFAULT_INDEX_PREFIX;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Dialect to translate with ("mysql", "oracle" or "postgres").
    ///
    /// When unset, the dialect is chosen by probing `connection`.
    #[serde(default)]
    pub dialect: Option<String>,

    /// Translator behavior.
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Database to probe and sample from.
    #[serde(default)]
    pub connection: Option<ConnectionConfig>,
}

/// Translator behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Precede each action's statements with a descriptive comment.
    #[serde(default)]
    pub include_comments: bool,

    /// Prefix for generated index names (default: "I_").
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            include_comments: false,
            index_prefix: default_index_prefix(),
        }
    }
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type ("postgres" or "mysql").
    #[serde(default = "default_postgres")]
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Schema holding the source tables (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .finish()
    }
}

fn default_index_prefix() -> String {
    DEFAULT_INDEX_PREFIX.to_string()
}

fn default_postgres() -> String {
    "postgres".to_string()
}

fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}
