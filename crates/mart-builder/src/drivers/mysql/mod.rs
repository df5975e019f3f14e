//! MySQL/MariaDB driver.
//!
//! - [`MysqlDialect`]: SQL syntax strategy, always available
//! - [`MysqlLink`]: pooled data link
//!
//! # Feature Flag
//!
//! The data link is only available when the `mysql` feature is enabled:
//!
//! ```toml
//! [dependencies]
//! mart-builder = { version = "0.4", features = ["mysql"] }
//! ```

mod dialect;
#[cfg(feature = "mysql")]
mod link;

pub use dialect::MysqlDialect;
#[cfg(feature = "mysql")]
pub use link::MysqlLink;
