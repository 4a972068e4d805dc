use reorder_core::{CollectionId, PlanSnapshot, RenamePlan};
use reorder_storage::{PlanStore, SqlitePlanStore, StorageError};

/// In-memory SQLite plan store whose writes can be switched off.
pub struct FlakyStore {
    inner: SqlitePlanStore,
    failing: bool,
    rejected_writes: usize,
}

impl FlakyStore {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::wrap(SqlitePlanStore::open_in_memory()?))
    }

    pub fn wrap(inner: SqlitePlanStore) -> Self {
        Self {
            inner,
            failing: false,
            rejected_writes: 0,
        }
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn rejected_writes(&self) -> usize {
        self.rejected_writes
    }

    pub fn inner(&self) -> &SqlitePlanStore {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut SqlitePlanStore {
        &mut self.inner
    }

    fn check_writable(&mut self) -> Result<(), StorageError> {
        if self.failing {
            self.rejected_writes += 1;
            return Err(StorageError::Unavailable("plan store is offline".into()));
        }
        Ok(())
    }
}

impl PlanStore for FlakyStore {
    fn load(&self, collection: &CollectionId) -> Result<RenamePlan, StorageError> {
        self.inner.load(collection)
    }

    fn save(&mut self, collection: &CollectionId, plan: &RenamePlan) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.save(collection, plan)
    }

    fn clear(&mut self, collection: &CollectionId) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.clear(collection)
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.clear_all()
    }

    fn snapshot(&self) -> Result<PlanSnapshot, StorageError> {
        self.inner.snapshot()
    }
}
