//! Oracle driver.
//!
//! Only the translator is provided; Oracle connections are supplied by the
//! caller through [`DataLink`](crate::core::traits::DataLink).

mod dialect;

pub use dialect::OracleDialect;
