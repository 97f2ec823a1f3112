//! Transactional scope around batch repository operations.
//!
//! A unit of work is begun from a factory, exposes one batch repository, and ends
//! either by `commit` (all staged changes become visible atomically) or by
//! `rollback`. Dropping a unit of work without committing rolls it back.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryUnitOfWork, InMemoryUnitOfWorkFactory};
pub use postgres::{PostgresUnitOfWork, PostgresUnitOfWorkFactory};
pub use r#trait::{UnitOfWork, UnitOfWorkFactory};
