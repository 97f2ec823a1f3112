//! Allocation use cases.
//!
//! Each operation runs inside exactly one unit of work:
//!
//! ```text
//! begin
//!   ↓
//! load batches (find_all)
//!   ↓
//! no batches?      → NoBatchesAvailable
//! unknown sku?     → InvalidSku
//! already held?    → holder's reference, nothing written
//! nothing fits?    → OutOfStock
//!   ↓
//! update chosen batch (version-checked)
//!   ↓
//! commit
//! ```
//!
//! Every failure path ends the scope without committing, so the store is left exactly
//! as it was before the call.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use allocation_core::DomainError;
use allocation_inventory::{Batch, OrderLine, allocate, is_valid_sku};

use crate::repository::{BatchRepository, RepositoryError};
use crate::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

/// Outcome of a failed service call.
///
/// The first three variants are business outcomes; `Validation` is bad caller input;
/// `Storage` is an infrastructure failure and is never reported as a business outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("No batches available")]
    NoBatchesAvailable,

    #[error("Invalid SKU: {0}")]
    InvalidSku(String),

    #[error("Out of stock")]
    OutOfStock,

    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl AllocationError {
    /// True for the allocation business outcomes (`NoBatchesAvailable`, `InvalidSku`,
    /// `OutOfStock`).
    pub fn is_domain_failure(&self) -> bool {
        matches!(
            self,
            AllocationError::NoBatchesAvailable
                | AllocationError::InvalidSku(_)
                | AllocationError::OutOfStock
        )
    }
}

/// Application service over an injected unit-of-work factory.
#[derive(Debug, Clone)]
pub struct AllocationService<F> {
    uow_factory: F,
}

impl<F: UnitOfWorkFactory> AllocationService<F> {
    pub fn new(uow_factory: F) -> Self {
        Self { uow_factory }
    }

    /// Register a new batch and commit it.
    #[instrument(
        skip(self),
        fields(reference = %reference, sku = %sku, qty = qty, eta = ?eta),
        err
    )]
    pub async fn add_batch(
        &self,
        reference: &str,
        sku: &str,
        qty: u32,
        eta: Option<NaiveDate>,
    ) -> Result<(), AllocationError> {
        let batch = Batch::new(reference, sku, qty, eta)?;

        let mut uow = self.uow_factory.begin().await?;
        match uow.batches().save(batch).await {
            Ok(()) => {
                uow.commit().await?;
                info!("batch added");
                Ok(())
            }
            Err(err) => {
                let err = AllocationError::from(err);
                end_failed_scope(uow, &err).await;
                Err(err)
            }
        }
    }

    /// Allocate an order line to the best batch and commit the change.
    ///
    /// Returns the reference of the batch that received the line.
    #[instrument(skip(self), fields(order_id = %order_id, sku = %sku, qty = qty))]
    pub async fn allocate(
        &self,
        order_id: &str,
        sku: &str,
        qty: u32,
    ) -> Result<String, AllocationError> {
        let line = OrderLine::new(order_id, sku, qty)
            .inspect_err(|e| warn!(error = %e, "invalid order line"))?;

        let mut uow = self
            .uow_factory
            .begin()
            .await
            .inspect_err(|e| error!(error = %e, "failed to begin unit of work"))?;

        match allocate_in_scope(&mut uow, &line).await {
            Ok(reference) => match uow.commit().await {
                Ok(()) => {
                    info!(batch = %reference, "order line allocated");
                    Ok(reference)
                }
                Err(err) => {
                    error!(error = %err, "commit failed");
                    Err(err.into())
                }
            },
            Err(err) => {
                end_failed_scope(uow, &err).await;
                Err(err)
            }
        }
    }

    /// Committed batches, ordered by reference. Read-only; the scope is never committed.
    #[instrument(skip(self), err)]
    pub async fn list_batches(&self) -> Result<Vec<Batch>, AllocationError> {
        let mut uow = self.uow_factory.begin().await?;
        let batches = uow.batches().find_all().await?;
        uow.rollback().await?;
        Ok(batches)
    }
}

async fn allocate_in_scope<U: UnitOfWork>(
    uow: &mut U,
    line: &OrderLine,
) -> Result<String, AllocationError> {
    let mut batches = uow.batches().find_all().await?;

    if batches.is_empty() {
        return Err(AllocationError::NoBatchesAvailable);
    }
    if !is_valid_sku(line.sku(), &batches) {
        return Err(AllocationError::InvalidSku(line.sku().to_string()));
    }

    // A line lives in at most one batch.
    if let Some(holder) = batches.iter().find(|b| b.is_allocated(line)) {
        info!(batch = %holder.reference(), "order line already allocated");
        return Ok(holder.reference().to_string());
    }

    let reference = allocate(line, &mut batches).ok_or(AllocationError::OutOfStock)?;

    let chosen = batches
        .iter()
        .find(|b| b.reference() == reference)
        .ok_or_else(|| RepositoryError::NotFound(reference.clone()))?;
    uow.batches().update(chosen).await?;

    Ok(reference)
}

/// Roll back after a failed operation, logging by failure kind.
///
/// A rollback error is logged and swallowed so it never replaces `err`.
async fn end_failed_scope<U: UnitOfWork>(uow: U, err: &AllocationError) {
    match err {
        AllocationError::Storage(e) => error!(error = %e, "storage failure, rolling back"),
        e if e.is_domain_failure() => info!(outcome = %e, "allocation refused"),
        e => warn!(error = %e, "rejected request"),
    }

    if let Err(rollback_err) = uow.rollback().await {
        warn!(error = %rollback_err, "rollback failed");
    }
}
