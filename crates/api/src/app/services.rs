//! Storage backend selection and service wiring.

use chrono::NaiveDate;
use tracing::info;

use allocation_infra::repository::{InMemoryBatchStore, RepositoryError};
use allocation_infra::unit_of_work::{InMemoryUnitOfWorkFactory, PostgresUnitOfWorkFactory};
use allocation_infra::{AllocationError, AllocationService, Database, StorageBackend, StorageConfig};
use allocation_inventory::Batch;

/// Allocation service wired to the configured backend.
#[derive(Debug, Clone)]
pub enum AppServices {
    InMemory {
        allocation: AllocationService<InMemoryUnitOfWorkFactory>,
    },
    Persistent {
        allocation: AllocationService<PostgresUnitOfWorkFactory>,
        database: Database,
    },
}

impl AppServices {
    pub async fn add_batch(
        &self,
        reference: &str,
        sku: &str,
        qty: u32,
        eta: Option<NaiveDate>,
    ) -> Result<(), AllocationError> {
        match self {
            AppServices::InMemory { allocation } => {
                allocation.add_batch(reference, sku, qty, eta).await
            }
            AppServices::Persistent { allocation, .. } => {
                allocation.add_batch(reference, sku, qty, eta).await
            }
        }
    }

    pub async fn allocate(
        &self,
        order_id: &str,
        sku: &str,
        qty: u32,
    ) -> Result<String, AllocationError> {
        match self {
            AppServices::InMemory { allocation } => allocation.allocate(order_id, sku, qty).await,
            AppServices::Persistent { allocation, .. } => {
                allocation.allocate(order_id, sku, qty).await
            }
        }
    }

    pub async fn list_batches(&self) -> Result<Vec<Batch>, AllocationError> {
        match self {
            AppServices::InMemory { allocation } => allocation.list_batches().await,
            AppServices::Persistent { allocation, .. } => allocation.list_batches().await,
        }
    }

    /// Release storage resources. Idempotent.
    pub async fn shutdown(&self) {
        if let AppServices::Persistent { database, .. } = self {
            database.close().await;
        }
    }
}

/// Build services for the configured backend (connects and migrates Postgres).
pub async fn build_services(config: &StorageConfig) -> Result<AppServices, RepositoryError> {
    match config.backend {
        StorageBackend::InMemory => Ok(build_in_memory_services()),
        StorageBackend::Postgres => build_persistent_services(config).await,
    }
}

pub fn build_in_memory_services() -> AppServices {
    info!("using in-memory batch store");
    let factory = InMemoryUnitOfWorkFactory::new(InMemoryBatchStore::arc());
    AppServices::InMemory {
        allocation: AllocationService::new(factory),
    }
}

async fn build_persistent_services(config: &StorageConfig) -> Result<AppServices, RepositoryError> {
    let database = Database::connect(config).await?;
    database.migrate().await?;
    info!("using postgres batch store");

    Ok(AppServices::Persistent {
        allocation: AllocationService::new(database.unit_of_work_factory()),
        database,
    })
}
