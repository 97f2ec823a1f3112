//! Batch repository boundary.
//!
//! This module defines a persistence-agnostic abstraction for loading and storing
//! batches, plus the in-memory (tests/dev) and Postgres backends. Repositories are
//! never constructed directly by callers; a unit of work owns exactly one.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryBatchRepository, InMemoryBatchStore};
pub use postgres::PostgresBatchRepository;
pub use r#trait::{BatchFilter, BatchRepository, RepositoryError};
