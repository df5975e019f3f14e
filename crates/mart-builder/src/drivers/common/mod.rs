//! Common utilities shared across dialect implementations.
//!
//! This module provides shared functionality used by every translator:
//!
//! - [`sql`]: statement fragments (projections, join conditions, restriction
//!   joins, optimiser subqueries)

pub(crate) mod sql;
