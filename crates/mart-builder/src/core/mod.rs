//! Core abstractions for dialect-independent mart construction.
//!
//! - [`schema`]: the schema model (tables, columns, keys, relations) and its cascades
//! - [`value`]: owned SQL values returned by data links
//! - [`traits`]: the [`Dialect`] and [`DataLink`] seams
//! - [`catalog`]: dialect registry for dependency injection
//! - [`identifier`]: name checks and literal quoting
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` provides interchangeable SQL renderings
//! - **Template Method**: default trait methods define the probing and sampling skeletons
//! - **Registry**: `DialectRegistry` is built once and passed explicitly

pub mod catalog;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

// Re-export commonly used types for convenience
pub use catalog::DialectRegistry;
pub use schema::{
    Cardinality, ColumnId, ComponentStatus, KeyId, KeyKind, RelationId, SchemaId, SchemaModel,
    TableId,
};
pub use traits::{translate_all, DataLink, Dialect};
pub use value::{Row, SqlValue};
