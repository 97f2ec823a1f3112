use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use allocation_core::{DomainError, ExpectedVersion};
use allocation_inventory::Batch;

use super::r#trait::{BatchFilter, BatchRepository, RepositoryError};

/// In-memory committed batch state shared by all units of work.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    batches: RwLock<BTreeMap<String, Batch>>,
    commits: AtomicU64,
}

/// A write staged inside one unit of work.
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    Insert(Batch),
    Update {
        batch: Batch,
        expected: ExpectedVersion,
    },
}

impl StagedWrite {
    fn batch(&self) -> &Batch {
        match self {
            StagedWrite::Insert(batch) => batch,
            StagedWrite::Update { batch, .. } => batch,
        }
    }
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::SeqCst)
    }

    /// Committed batches, ordered by reference.
    pub fn committed(&self) -> Result<Vec<Batch>, RepositoryError> {
        let map = self
            .batches
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        Ok(map.values().cloned().collect())
    }

    fn committed_map(&self) -> Result<BTreeMap<String, Batch>, RepositoryError> {
        let map = self
            .batches
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        Ok(map.clone())
    }

    fn committed_version(&self, reference: &str) -> Result<Option<u64>, RepositoryError> {
        let map = self
            .batches
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;
        Ok(map.get(reference).map(Batch::version))
    }

    /// Apply a unit of work's staged writes atomically.
    ///
    /// Every write is validated against the committed state under the write lock
    /// before any is applied, so either all land or none do.
    pub(crate) fn apply(&self, writes: Vec<StagedWrite>) -> Result<(), RepositoryError> {
        let mut map = self
            .batches
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        for write in &writes {
            match write {
                StagedWrite::Insert(batch) => {
                    if map.contains_key(batch.reference()) {
                        return Err(RepositoryError::Duplicate(batch.reference().to_string()));
                    }
                }
                StagedWrite::Update { batch, expected } => {
                    let current = map
                        .get(batch.reference())
                        .ok_or_else(|| RepositoryError::NotFound(batch.reference().to_string()))?;
                    expected
                        .check(current.version())
                        .map_err(|e| stale(batch.reference(), e))?;
                }
            }
        }

        for write in writes {
            let (batch, version) = match write {
                StagedWrite::Insert(batch) => {
                    let version = batch.version();
                    (batch, version)
                }
                StagedWrite::Update { batch, .. } => {
                    let version = batch.version() + 1;
                    (batch, version)
                }
            };
            let stored = Batch::restore(
                batch.reference(),
                batch.sku(),
                batch.purchased_quantity(),
                batch.eta(),
                batch.allocations().cloned(),
                version,
            )
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
            map.insert(stored.reference().to_string(), stored);
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Repository view owned by one in-memory unit of work.
///
/// Reads see the committed store overlaid with this scope's staged writes.
#[derive(Debug)]
pub struct InMemoryBatchRepository {
    store: Arc<InMemoryBatchStore>,
    staged: BTreeMap<String, StagedWrite>,
}

impl InMemoryBatchRepository {
    pub(crate) fn new(store: Arc<InMemoryBatchStore>) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    pub(crate) fn store(&self) -> &Arc<InMemoryBatchStore> {
        &self.store
    }

    pub(crate) fn pending_writes(&self) -> usize {
        self.staged.len()
    }

    pub(crate) fn take_staged(&mut self) -> Vec<StagedWrite> {
        std::mem::take(&mut self.staged).into_values().collect()
    }

    fn view(&self) -> Result<BTreeMap<String, Batch>, RepositoryError> {
        let mut view = self.store.committed_map()?;
        for (reference, write) in &self.staged {
            view.insert(reference.clone(), write.batch().clone());
        }
        Ok(view)
    }
}

#[async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn save(&mut self, batch: Batch) -> Result<(), RepositoryError> {
        let reference = batch.reference().to_string();
        if self.staged.contains_key(&reference)
            || self.store.committed_version(&reference)?.is_some()
        {
            return Err(RepositoryError::Duplicate(reference));
        }
        self.staged.insert(reference, StagedWrite::Insert(batch));
        Ok(())
    }

    async fn update(&mut self, batch: &Batch) -> Result<(), RepositoryError> {
        let reference = batch.reference().to_string();

        let write = match self.staged.remove(&reference) {
            Some(StagedWrite::Insert(_)) => StagedWrite::Insert(batch.clone()),
            Some(StagedWrite::Update { expected, .. }) => StagedWrite::Update {
                batch: batch.clone(),
                expected,
            },
            None => {
                let current = self
                    .store
                    .committed_version(&reference)?
                    .ok_or_else(|| RepositoryError::NotFound(reference.clone()))?;
                let expected = ExpectedVersion(batch.version());
                expected.check(current).map_err(|e| stale(&reference, e))?;
                StagedWrite::Update {
                    batch: batch.clone(),
                    expected,
                }
            }
        };

        self.staged.insert(reference, write);
        Ok(())
    }

    async fn find_by_id(&mut self, reference: &str) -> Result<Option<Batch>, RepositoryError> {
        Ok(self.view()?.remove(reference))
    }

    async fn find_by(&mut self, filter: &BatchFilter) -> Result<Batch, RepositoryError> {
        let matches = self
            .view()?
            .into_values()
            .filter(|b| filter.matches(b))
            .collect();
        filter.expect_one(matches)
    }

    async fn find_all(&mut self) -> Result<Vec<Batch>, RepositoryError> {
        Ok(self.view()?.into_values().collect())
    }
}

fn stale(reference: &str, err: DomainError) -> RepositoryError {
    RepositoryError::Concurrency(format!("batch {reference}: {err}"))
}
