use reorder_core::{CollectionId, PlanSnapshot, RenamePlan, RenameStep, StepOutcome};

use crate::error::StorageError;

/// Durable home of rename plans, keyed by collection.
///
/// `load` of an unknown collection yields an empty plan. Saving an empty plan
/// is equivalent to `clear`.
pub trait PlanStore {
    fn load(&self, collection: &CollectionId) -> Result<RenamePlan, StorageError>;

    fn save(&mut self, collection: &CollectionId, plan: &RenamePlan) -> Result<(), StorageError>;

    fn clear(&mut self, collection: &CollectionId) -> Result<(), StorageError>;

    fn clear_all(&mut self) -> Result<(), StorageError>;

    fn snapshot(&self) -> Result<PlanSnapshot, StorageError>;
}

impl<T: PlanStore + ?Sized> PlanStore for &mut T {
    fn load(&self, collection: &CollectionId) -> Result<RenamePlan, StorageError> {
        (**self).load(collection)
    }

    fn save(&mut self, collection: &CollectionId, plan: &RenamePlan) -> Result<(), StorageError> {
        (**self).save(collection, plan)
    }

    fn clear(&mut self, collection: &CollectionId) -> Result<(), StorageError> {
        (**self).clear(collection)
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        (**self).clear_all()
    }

    fn snapshot(&self) -> Result<PlanSnapshot, StorageError> {
        (**self).snapshot()
    }
}

/// Supplies the raw filenames of a collection, in no particular order.
pub trait ListingSource {
    fn list(&self, collection: &CollectionId) -> Result<Vec<String>, StorageError>;
}

/// Performs physical renames in the order given.
///
/// Returns one outcome per submitted step. Implementations stop at the first
/// failure and report the remaining steps as [`StepOutcome::Skipped`].
pub trait StorageExecutor {
    fn execute(&mut self, collection: &CollectionId, steps: &[RenameStep]) -> Vec<StepOutcome>;
}
