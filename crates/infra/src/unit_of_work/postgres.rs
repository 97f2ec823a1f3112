use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::repository::postgres::map_sqlx_error;
use crate::repository::{PostgresBatchRepository, RepositoryError};

use super::r#trait::{UnitOfWork, UnitOfWorkFactory};

/// Unit of work backed by one Postgres transaction.
///
/// Dropping it without committing drops the transaction, which sqlx rolls back.
#[derive(Debug)]
pub struct PostgresUnitOfWork {
    batches: PostgresBatchRepository,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Batches = PostgresBatchRepository;

    fn batches(&mut self) -> &mut Self::Batches {
        &mut self.batches
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.batches
            .into_transaction()
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        debug!("postgres unit of work committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.batches
            .into_transaction()
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))?;
        debug!("postgres unit of work rolled back");
        Ok(())
    }
}

/// Begins a transaction on the pool per unit of work.
#[derive(Debug, Clone)]
pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    type Uow = PostgresUnitOfWork;

    async fn begin(&self) -> Result<Self::Uow, RepositoryError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(PostgresUnitOfWork {
            batches: PostgresBatchRepository::new(tx),
        })
    }
}
