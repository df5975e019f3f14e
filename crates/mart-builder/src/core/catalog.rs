//! Dialect registry for explicit dependency injection.
//!
//! The [`DialectRegistry`] holds the translators a run may choose from.
//! Unlike a global singleton, it is explicitly constructed once at startup
//! and passed to whatever needs dialect selection.
//!
//! - **No global state**: tests build registries holding fake dialects
//! - **Explicit registration**: probing follows registration order
//! - **Fresh instances**: selection hands out reset copies, never the
//!   registered translator itself, so runs do not share index counters

use tracing::{debug, info};

use crate::drivers::{MysqlDialect, OracleDialect, PostgresDialect, DEFAULT_INDEX_PREFIX};
use crate::error::{MartError, Result};

use super::traits::{DataLink, Dialect};

/// Ordered registry of dialect translators.
///
/// # Example
///
/// ```rust
/// use mart_builder::DialectRegistry;
///
/// let registry = DialectRegistry::with_builtins();
/// assert_eq!(registry.names(), vec!["mysql", "oracle", "postgres"]);
///
/// let postgres = registry.by_name("postgres").unwrap();
/// assert_eq!(postgres.product_name(), "PostgreSQL");
/// ```
#[derive(Default)]
pub struct DialectRegistry {
    dialects: Vec<Box<dyn Dialect>>,
}

impl DialectRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with MySQL, Oracle and PostgreSQL registered, in
    /// that order.
    pub fn with_builtins() -> Self {
        Self::with_builtins_prefixed(DEFAULT_INDEX_PREFIX)
    }

    /// Like [`with_builtins`](Self::with_builtins), with a custom index name prefix.
    pub fn with_builtins_prefixed(index_prefix: &str) -> Self {
        let mut registry = Self::new();
        registry.register(MysqlDialect::with_index_prefix(index_prefix));
        registry.register(OracleDialect::with_index_prefix(index_prefix));
        registry.register(PostgresDialect::with_index_prefix(index_prefix));
        registry
    }

    /// Register a dialect.
    ///
    /// A dialect with the same name replaces the earlier one in place, keeping
    /// its position in the probing order.
    pub fn register(&mut self, dialect: impl Dialect + 'static) {
        self.register_boxed(Box::new(dialect));
    }

    /// Register an already boxed dialect.
    pub fn register_boxed(&mut self, dialect: Box<dyn Dialect>) {
        match self.dialects.iter().position(|d| d.name() == dialect.name()) {
            Some(i) => self.dialects[i] = dialect,
            None => self.dialects.push(dialect),
        }
    }

    /// Get all registered dialect names, in probing order.
    pub fn names(&self) -> Vec<&str> {
        self.dialects.iter().map(|d| d.name()).collect()
    }

    /// Check if a dialect is registered.
    pub fn has_dialect(&self, name: &str) -> bool {
        self.dialects.iter().any(|d| d.name() == name)
    }

    /// Get a fresh instance of a dialect by name, for offline translation.
    pub fn by_name(&self, name: &str) -> Option<Box<dyn Dialect>> {
        self.dialects
            .iter()
            .find(|d| d.name().eq_ignore_ascii_case(name))
            .map(|d| d.fresh())
    }

    /// Get a dialect by name, returning an error if not found.
    pub fn require_by_name(&self, name: &str) -> Result<Box<dyn Dialect>> {
        self.by_name(name)
            .ok_or_else(|| MartError::Config(format!("Unknown dialect: {}", name)))
    }

    /// Return a fresh instance of the first dialect that understands `link`.
    ///
    /// A broken link is an error, not a miss: probing stops at the first
    /// dialect that cannot read the connection metadata.
    pub async fn select(&self, link: &dyn DataLink) -> Result<Option<Box<dyn Dialect>>> {
        for dialect in &self.dialects {
            if dialect.understands_data_link(link).await? {
                info!("Selected dialect {}", dialect.name());
                return Ok(Some(dialect.fresh()));
            }
            debug!("Dialect {} does not understand the link", dialect.name());
        }
        Ok(None)
    }

    /// Like [`select`](Self::select), failing with [`MartError::NoDialect`]
    /// when no dialect matches.
    pub async fn require(&self, link: &dyn DataLink) -> Result<Box<dyn Dialect>> {
        match self.select(link).await? {
            Some(dialect) => Ok(dialect),
            None => {
                let product = link
                    .product_name()
                    .await
                    .unwrap_or_else(|_| "unknown product".to_string());
                Err(MartError::NoDialect(product))
            }
        }
    }
}
