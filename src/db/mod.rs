//! Database module: row models and SQL repositories.
//!
//! - `model`: `FromRow` structs mirroring table columns, mapped into API types.
//! - `repo`: SQL-only query functions plus the shared bulk-append helper.
//!
//! Callers import from `tg_cleandata::db`; the repository API is re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{AppendReport, BulkRow};
