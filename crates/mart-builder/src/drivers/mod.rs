//! Dialect implementations and data links.
//!
//! - [`mysql`]: MySQL translator, plus a `sqlx` data link behind the `mysql` feature
//! - [`oracle`]: Oracle translator
//! - [`postgres`]: PostgreSQL translator and `tokio-postgres` data link
//! - [`common`]: statement fragments shared by the translators
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` (e.g., `drivers/sqlite/`)
//! 2. Implement the `Dialect` trait, matching on every `MartAction` kind
//! 3. Register it in `DialectRegistry::with_builtins()`
//! 4. Gate any data link with a feature flag in `Cargo.toml`

pub mod common;
pub mod mysql;
pub mod oracle;
pub mod postgres;

pub use mysql::MysqlDialect;
#[cfg(feature = "mysql")]
pub use mysql::MysqlLink;
pub use oracle::OracleDialect;
pub use postgres::{PostgresDialect, PostgresLink};

/// Default prefix for generated index names.
pub const DEFAULT_INDEX_PREFIX: &str = "I_";
