use async_trait::async_trait;
use thiserror::Error;

use allocation_inventory::Batch;

/// Repository operation error.
///
/// These are **infrastructure errors** (storage, uniqueness, concurrency) as opposed
/// to domain failures. They must never be reported as "out of stock" or "invalid SKU".
///
/// ## Error Categories
///
/// - **NotFound / MultipleResults**: an exactly-one lookup matched zero or several rows
/// - **Duplicate**: a batch with the same reference already exists
/// - **Concurrency**: the stored batch changed since it was loaded (stale version)
/// - **Corrupt**: a stored row breaks a batch invariant and cannot be rehydrated
/// - **Storage**: driver, connection or lock failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("batch not found: {0}")]
    NotFound(String),

    #[error("expected exactly one batch matching {filter}, found {count}")]
    MultipleResults { filter: String, count: usize },

    #[error("batch already exists: {0}")]
    Duplicate(String),

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("corrupt batch record: {0}")]
    Corrupt(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Field filter for [`BatchRepository::find_by`].
///
/// Every field that is set must match; unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchFilter {
    pub reference: Option<String>,
    pub sku: Option<String>,
}

impl BatchFilter {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn sku(sku: impl Into<String>) -> Self {
        Self {
            sku: Some(sku.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, batch: &Batch) -> bool {
        self.reference.as_deref().is_none_or(|r| r == batch.reference())
            && self.sku.as_deref().is_none_or(|s| s == batch.sku())
    }

    /// Resolve an exactly-one lookup over already-filtered matches.
    pub(crate) fn expect_one(&self, mut matches: Vec<Batch>) -> Result<Batch, RepositoryError> {
        match matches.len() {
            0 => Err(RepositoryError::NotFound(self.to_string())),
            1 => Ok(matches.remove(0)),
            count => Err(RepositoryError::MultipleResults {
                filter: self.to_string(),
                count,
            }),
        }
    }
}

impl core::fmt::Display for BatchFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut parts = Vec::new();
        if let Some(r) = &self.reference {
            parts.push(format!("reference={r}"));
        }
        if let Some(s) = &self.sku {
            parts.push(format!("sku={s}"));
        }
        if parts.is_empty() {
            f.write_str("<any>")
        } else {
            f.write_str(&parts.join(","))
        }
    }
}

/// Batch storage as seen from inside one unit of work.
///
/// ## Semantics
///
/// - Writes are staged in the enclosing unit of work and only become durable on
///   commit; reads inside the same scope see staged writes.
/// - `save` registers a **new** batch; references are unique.
/// - `update` persists a loaded batch's allocation state, guarded by the version the
///   batch was loaded at (a concurrent commit in between yields `Concurrency`).
/// - `find_by` expects exactly one match; `find_by_id` reports absence as `None`.
/// - `find_all` returns batches ordered by reference.
#[async_trait]
pub trait BatchRepository: Send {
    async fn save(&mut self, batch: Batch) -> Result<(), RepositoryError>;

    async fn update(&mut self, batch: &Batch) -> Result<(), RepositoryError>;

    async fn find_by_id(&mut self, reference: &str) -> Result<Option<Batch>, RepositoryError>;

    async fn find_by(&mut self, filter: &BatchFilter) -> Result<Batch, RepositoryError>;

    async fn find_all(&mut self) -> Result<Vec<Batch>, RepositoryError>;
}
