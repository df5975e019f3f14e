//! # mart-builder
//!
//! Dialect-independent core for building denormalized data marts from
//! normalized source schemas.
//!
//! This library provides:
//!
//! - **Schema model** with keys, relations and cascading structural edits
//! - **Mart actions**: twelve kinds of schema-transformation step
//! - **Dialect translators** for MySQL, Oracle and PostgreSQL
//! - **Dialect registry** choosing a translator by probing a live connection
//!
//! ## Example
//!
//! ```rust
//! use mart_builder::action::{Index, MartAction, Rename};
//! use mart_builder::{translate_all, DialectRegistry};
//!
//! let registry = DialectRegistry::with_builtins();
//! let mut mysql = registry.by_name("mysql").unwrap();
//!
//! let plan = vec![
//!     MartAction::Rename(Rename {
//!         dataset_schema: "ds".into(),
//!         table: "temp_0".into(),
//!         to: "gene__main".into(),
//!     }),
//!     MartAction::Index(Index {
//!         dataset_schema: "ds".into(),
//!         table: "gene__main".into(),
//!         columns: vec!["gene_id".into()],
//!     }),
//! ];
//! let statements = translate_all(mysql.as_mut(), &plan, false).unwrap();
//! assert_eq!(statements[0], "rename table ds.temp_0 to ds.gene__main");
//! assert_eq!(statements[1], "create index I_0 on ds.gene__main(gene_id)");
//! ```

pub mod action;
pub mod config;
pub mod core;
pub mod drivers;
pub mod error;

// Re-exports for convenient access
pub use action::MartAction;
pub use config::{Config, ConnectionConfig, TranslatorConfig};
pub use crate::core::catalog::DialectRegistry;
pub use crate::core::schema::SchemaModel;
pub use crate::core::traits::{translate_all, DataLink, Dialect};
pub use crate::core::value::{Row, SqlValue};
pub use error::{MartError, Result};
