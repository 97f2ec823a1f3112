//! Infrastructure layer: storage backends, units of work, configuration and the
//! allocation service that composes them.

pub mod allocation_service;
pub mod config;
pub mod db;
pub mod repository;
pub mod unit_of_work;

mod integration_tests;

pub use allocation_service::{AllocationError, AllocationService};
pub use config::{ConfigError, StorageBackend, StorageConfig};
pub use db::Database;
