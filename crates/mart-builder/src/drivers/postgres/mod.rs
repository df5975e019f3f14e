//! PostgreSQL driver.
//!
//! - [`PostgresDialect`]: SQL syntax strategy for PostgreSQL
//! - [`PostgresLink`]: pooled data link

mod dialect;
mod link;

pub use dialect::PostgresDialect;
pub use link::PostgresLink;
