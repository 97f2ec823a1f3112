use std::sync::Arc;

use async_trait::async_trait;

use crate::repository::{BatchRepository, RepositoryError};

/// One transactional scope.
///
/// `commit` and `rollback` consume the unit of work, so nothing can be read or
/// written through it once it has ended. Implementations roll back on drop.
#[async_trait]
pub trait UnitOfWork: Send + Sized {
    type Batches: BatchRepository;

    /// The batch repository bound to this scope.
    fn batches(&mut self) -> &mut Self::Batches;

    /// Make every change staged in this scope durable and visible, atomically.
    async fn commit(self) -> Result<(), RepositoryError>;

    /// Discard every change staged in this scope.
    async fn rollback(self) -> Result<(), RepositoryError>;
}

/// Begins fresh units of work against one storage backend.
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    type Uow: UnitOfWork;

    async fn begin(&self) -> Result<Self::Uow, RepositoryError>;
}

#[async_trait]
impl<F> UnitOfWorkFactory for Arc<F>
where
    F: UnitOfWorkFactory + ?Sized,
{
    type Uow = F::Uow;

    async fn begin(&self) -> Result<Self::Uow, RepositoryError> {
        (**self).begin().await
    }
}
