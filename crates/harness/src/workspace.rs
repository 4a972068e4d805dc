use reorder_core::{CollectionId, RenamePlan};
use reorder_engine::{ApplyReport, EngineConfig, EngineError, Session, reconcile};
use reorder_storage::{ListingSource, PlanStore};

use crate::{FlakyStore, MemoryBucket};

/// One collection in a memory bucket with a session editing it.
pub struct TestWorkspace {
    pub collection: CollectionId,
    pub bucket: MemoryBucket,
    pub session: Session<FlakyStore>,
}

impl TestWorkspace {
    pub fn new(collection: &str, files: &[&str]) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_config(collection, files, EngineConfig::default())
    }

    pub fn with_config(
        collection: &str,
        files: &[&str],
        config: EngineConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let collection = CollectionId::new(collection)?;
        let mut bucket = MemoryBucket::new();
        bucket.seed(&collection, files);
        let session = Session::open(collection.clone(), FlakyStore::new()?, &bucket, config)?;
        Ok(Self {
            collection,
            bucket,
            session,
        })
    }

    /// Effective names in display order.
    pub fn names(&self) -> Vec<String> {
        self.session
            .sequence()
            .names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn pending(&self) -> Vec<String> {
        self.session
            .pending_deletion()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Content tags of the visible items, in display order, resolved through
    /// `plan` against the bucket as it stands.
    pub fn contents_under(&self, plan: &RenamePlan) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        let listing = self
            .session
            .config()
            .filter_listing(self.bucket.list(&self.collection)?);
        let reconciliation = reconcile(&self.collection, &listing, plan)?;
        Ok(reconciliation
            .live
            .iter()
            .filter_map(|file| self.bucket.content(&self.collection, &file.original.to_string()))
            .map(str::to_string)
            .collect())
    }

    /// What the user sees, by content.
    pub fn visible_contents(&self) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        self.contents_under(self.session.plan())
    }

    /// The plan as the store currently holds it.
    pub fn stored_plan(&self) -> Result<RenamePlan, Box<dyn std::error::Error>> {
        Ok(self.session.store().load(&self.collection)?)
    }

    pub fn apply(&mut self) -> Result<ApplyReport, EngineError> {
        self.session.apply(&mut self.bucket)
    }

    pub fn normalize(&mut self) -> Result<ApplyReport, EngineError> {
        self.session.normalize(&mut self.bucket)
    }

    /// Drop the session and open a new one over the same store and bucket.
    pub fn reopen(self) -> Result<Self, Box<dyn std::error::Error>> {
        let config = self.session.config().clone();
        let store = self.session.into_store();
        let session = Session::open(self.collection.clone(), store, &self.bucket, config)?;
        Ok(Self {
            collection: self.collection,
            bucket: self.bucket,
            session,
        })
    }
}
