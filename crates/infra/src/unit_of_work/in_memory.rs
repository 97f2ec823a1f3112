use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::repository::{InMemoryBatchRepository, InMemoryBatchStore, RepositoryError};

use super::r#trait::{UnitOfWork, UnitOfWorkFactory};

/// In-memory unit of work.
///
/// Writes are staged in the repository and only reach the shared store on
/// `commit`, which applies them all-or-nothing.
#[derive(Debug)]
pub struct InMemoryUnitOfWork {
    batches: InMemoryBatchRepository,
}

impl InMemoryUnitOfWork {
    pub fn new(store: Arc<InMemoryBatchStore>) -> Self {
        Self {
            batches: InMemoryBatchRepository::new(store),
        }
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Batches = InMemoryBatchRepository;

    fn batches(&mut self) -> &mut Self::Batches {
        &mut self.batches
    }

    async fn commit(mut self) -> Result<(), RepositoryError> {
        let writes = self.batches.take_staged();
        let count = writes.len();
        self.batches.store().apply(writes)?;
        debug!(writes = count, "in-memory unit of work committed");
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), RepositoryError> {
        let discarded = self.batches.take_staged().len();
        debug!(discarded, "in-memory unit of work rolled back");
        Ok(())
    }
}

impl Drop for InMemoryUnitOfWork {
    fn drop(&mut self) {
        let pending = self.batches.pending_writes();
        if pending > 0 {
            debug!(discarded = pending, "in-memory unit of work dropped without commit");
        }
    }
}

/// Hands out [`InMemoryUnitOfWork`]s over one shared store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUnitOfWorkFactory {
    store: Arc<InMemoryBatchStore>,
}

impl InMemoryUnitOfWorkFactory {
    pub fn new(store: Arc<InMemoryBatchStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UnitOfWorkFactory for InMemoryUnitOfWorkFactory {
    type Uow = InMemoryUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow, RepositoryError> {
        Ok(InMemoryUnitOfWork::new(Arc::clone(&self.store)))
    }
}
