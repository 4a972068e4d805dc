pub mod compile;
pub mod config;
pub mod error;
pub mod linearize;
pub mod merge;
pub mod normalize;
pub mod reconcile;
pub mod recovery;
pub mod undo;

pub use compile::compile;
pub use config::EngineConfig;
pub use error::EngineError;
pub use linearize::{SimulationError, linearize, simulate};
pub use merge::merge;
pub use normalize::normalize;
pub use reconcile::{Reconciliation, ResolvedFile, reconcile};
pub use recovery::{Holdings, Rebased};

use std::collections::BTreeSet;

use reorder_core::{
    CollectionId, Instructions, Operation, PositionalName, RenamePlan, RenameStep, Sequence,
    StepOutcome,
};
use reorder_storage::{ListingSource, PlanStore, StorageError, StorageExecutor};

use crate::undo::{UndoEntry, UndoManager};

/// What came back from a storage executor for one submitted plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub steps: Vec<RenameStep>,
    pub outcomes: Vec<StepOutcome>,
    /// Renames issued after a failure to bring parked files back, with
    /// their outcomes.
    pub recovery: Vec<(RenameStep, StepOutcome)>,
    /// Files left under a temporary name.
    pub stranded: Vec<String>,
}

impl ApplyReport {
    pub fn completed(&self) -> bool {
        self.outcomes.len() == self.steps.len() && self.outcomes.iter().all(StepOutcome::is_done)
    }

    pub fn failures(&self) -> Vec<(&RenameStep, &str)> {
        self.steps
            .iter()
            .zip(&self.outcomes)
            .filter_map(|(step, outcome)| match outcome {
                StepOutcome::Failed(reason) => Some((step, reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// One collection's editing session.
///
/// Holds the effective sequence the user sees and the plan that produces it
/// from storage. Every operation is compiled against the current sequence,
/// merged into the plan, and written to the plan store. The in-memory plan
/// stays authoritative when a write fails; `flush` retries it.
pub struct Session<S: PlanStore> {
    collection: CollectionId,
    store: S,
    config: EngineConfig,
    sequence: Sequence,
    plan: RenamePlan,
    pending_deletion: Vec<PositionalName>,
    listed_originals: BTreeSet<PositionalName>,
    excluded: Vec<String>,
    ignored: Vec<String>,
    undo_manager: UndoManager,
    dirty: bool,
}

impl<S: PlanStore> Session<S> {
    /// Load the stored plan and reconcile it with the current listing.
    pub fn open(
        collection: CollectionId,
        store: S,
        listing: &impl ListingSource,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let plan = load_plan(&store, &collection)?;
        let undo_manager = UndoManager::new(config.undo_depth);
        let mut session = Self {
            collection,
            store,
            config,
            sequence: Sequence::default(),
            plan,
            pending_deletion: Vec::new(),
            listed_originals: BTreeSet::new(),
            excluded: Vec::new(),
            ignored: Vec::new(),
            undo_manager,
            dirty: false,
        };
        session.rebuild(listing)?;
        tracing::info!(
            collection = %session.collection,
            items = session.sequence.len(),
            planned = session.plan.renames.len(),
            pending_deletes = session.pending_deletion.len(),
            "session opened"
        );
        Ok(session)
    }

    pub fn collection(&self) -> &CollectionId {
        &self.collection
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn plan(&self) -> &RenamePlan {
        &self.plan
    }

    /// Effective names of deleted items that are still in storage.
    pub fn pending_deletion(&self) -> &[PositionalName] {
        &self.pending_deletion
    }

    /// Listed files whose extension the config does not allow.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Allowed files without a positional name.
    pub fn ignored(&self) -> &[String] {
        &self.ignored
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// True when the in-memory plan has not reached the store yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_manager.undo_depth()
    }

    pub fn redo_depth(&self) -> usize {
        self.undo_manager.redo_depth()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Compile, merge and persist one operation.
    ///
    /// Invalid operations leave the session untouched. A persistence error is
    /// returned after the in-memory state has already moved on.
    pub fn apply_operation(&mut self, operation: Operation) -> Result<Instructions, EngineError> {
        let (after, instructions) = compile(&self.sequence, operation)?;
        if instructions.is_empty() {
            return Ok(instructions);
        }
        let merged = merge(&self.plan, &instructions)?;
        tracing::debug!(
            collection = %self.collection,
            op = operation.op_type_name(),
            renames = instructions.renames.len(),
            "operation merged"
        );

        let previous = self.replace_state(after, merged);
        self.undo_manager.push_undo(UndoEntry {
            operation,
            sequence: previous.0,
            plan: previous.1,
        });
        self.undo_manager.clear_redo();
        self.persist()?;
        Ok(instructions)
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<Instructions, EngineError> {
        self.apply_operation(Operation::Swap { a, b })
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> Result<Instructions, EngineError> {
        self.apply_operation(Operation::Move { from, to })
    }

    pub fn delete(&mut self, position: usize) -> Result<Instructions, EngineError> {
        self.apply_operation(Operation::DeleteAt { position })
    }

    /// Restore the state before the last operation. Returns false when there
    /// is nothing to undo.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        let Some(entry) = self.undo_manager.pop_undo() else {
            return Ok(false);
        };
        let (sequence, plan) = self.replace_state(entry.sequence, entry.plan);
        self.undo_manager.push_redo(UndoEntry {
            operation: entry.operation,
            sequence,
            plan,
        });
        self.persist()?;
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EngineError> {
        let Some(entry) = self.undo_manager.pop_redo() else {
            return Ok(false);
        };
        let (sequence, plan) = self.replace_state(entry.sequence, entry.plan);
        self.undo_manager.push_undo(UndoEntry {
            operation: entry.operation,
            sequence,
            plan,
        });
        self.persist()?;
        Ok(true)
    }

    /// Retry a write that failed earlier. No-op when nothing is pending.
    pub fn flush(&mut self) -> Result<(), EngineError> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }

    // ========================================================================
    // Physical execution
    // ========================================================================

    /// Collision-free steps that would bring `listing` in line with the plan.
    pub fn rename_steps(&self, listing: &impl ListingSource) -> Result<Vec<RenameStep>, EngineError> {
        let files = self.listed(listing)?;
        linearize(&self.collection, &files, &self.plan, &self.config.temp_prefix)
    }

    /// Hand the linearized plan to a storage backend.
    ///
    /// When every step succeeds the plan is spent and cleared. Otherwise any
    /// file parked under a temporary name is moved back to a positional name,
    /// and the plan is rebased onto where the files now are, so reopening and
    /// applying again finishes the job. Either way history is dropped and the
    /// session reloads from the new listing.
    pub fn apply<B>(&mut self, backend: &mut B) -> Result<ApplyReport, EngineError>
    where
        B: ListingSource + StorageExecutor,
    {
        let files = self.listed(&*backend)?;
        let steps = linearize(&self.collection, &files, &self.plan, &self.config.temp_prefix)?;
        let outcomes = if steps.is_empty() {
            Vec::new()
        } else {
            backend.execute(&self.collection, &steps)
        };
        let mut report = ApplyReport {
            steps,
            outcomes,
            ..ApplyReport::default()
        };

        if report.completed() {
            tracing::info!(collection = %self.collection, steps = report.steps.len(), "plan applied");
            self.plan = RenamePlan::new();
        } else {
            tracing::warn!(
                collection = %self.collection,
                failures = report.failures().len(),
                "plan only partially applied"
            );
            self.plan = self.recover(&mut *backend, &files, &mut report);
        }

        self.undo_manager.clear();
        self.dirty = true;
        let persisted = self.persist();
        self.rebuild(&*backend)?;
        persisted?;
        Ok(report)
    }

    /// Renumber the collection to `1..N` in storage.
    ///
    /// Only runs with an empty plan. Files an interrupted run left under a
    /// temporary name are picked up after the positional ones.
    pub fn normalize<B>(&mut self, backend: &mut B) -> Result<ApplyReport, EngineError>
    where
        B: ListingSource + StorageExecutor,
    {
        if !self.plan.is_empty() {
            return Err(EngineError::InvalidOperation(format!(
                "{} has a pending plan; apply or reset it before renumbering",
                self.collection
            )));
        }
        let files = backend.list(&self.collection)?;
        let steps = normalize(&self.collection, &files, &self.config)?;
        let outcomes = if steps.is_empty() {
            Vec::new()
        } else {
            backend.execute(&self.collection, &steps)
        };
        let mut report = ApplyReport {
            steps,
            outcomes,
            ..ApplyReport::default()
        };
        report.stranded = backend
            .list(&self.collection)?
            .into_iter()
            .filter(|name| name.starts_with(&self.config.temp_prefix))
            .collect();

        if report.completed() {
            tracing::info!(collection = %self.collection, steps = report.steps.len(), "collection renumbered");
        } else {
            tracing::warn!(
                collection = %self.collection,
                failures = report.failures().len(),
                stranded = report.stranded.len(),
                "renumbering stopped early"
            );
        }
        self.undo_manager.clear();
        self.rebuild(&*backend)?;
        Ok(report)
    }

    /// Discard the plan and show storage as it is.
    pub fn reset(&mut self, listing: &impl ListingSource) -> Result<(), EngineError> {
        self.plan = RenamePlan::new();
        self.undo_manager.clear();
        self.dirty = true;
        self.rebuild(listing)?;
        self.persist()
    }

    /// Re-read the listing, keeping the in-memory plan.
    pub fn reload(&mut self, listing: &impl ListingSource) -> Result<(), EngineError> {
        self.rebuild(listing)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn listed(&self, listing: &impl ListingSource) -> Result<Vec<String>, EngineError> {
        let files = listing.list(&self.collection)?;
        Ok(self.config.filter_listing(files))
    }

    /// Move parked files back and rebase the plan on what actually ran.
    fn recover<B>(&self, backend: &mut B, files: &[String], report: &mut ApplyReport) -> RenamePlan
    where
        B: StorageExecutor,
    {
        let mut holdings = Holdings::from_listing(files);
        holdings.record(&report.steps, &report.outcomes);

        let repairs = holdings.repairs(&self.plan);
        if !repairs.is_empty() {
            let outcomes = backend.execute(&self.collection, &repairs);
            holdings.record(&repairs, &outcomes);
            report.recovery = repairs.into_iter().zip(outcomes).collect();
        }

        let rebased = holdings.rebase(&self.plan);
        if !rebased.stranded.is_empty() {
            tracing::warn!(
                collection = %self.collection,
                stranded = ?rebased.stranded,
                "files left under temporary names"
            );
        }
        report.stranded = rebased.stranded;
        rebased.plan
    }

    fn rebuild(&mut self, listing: &impl ListingSource) -> Result<(), EngineError> {
        let (files, excluded) = self.config.partition_listing(listing.list(&self.collection)?);
        let reconciliation = reconcile(&self.collection, &files, &self.plan)?;
        if !excluded.is_empty() {
            tracing::info!(collection = %self.collection, excluded = ?excluded, "files with other extensions skipped");
        }
        if !reconciliation.ignored.is_empty() {
            tracing::debug!(
                collection = %self.collection,
                ignored = ?reconciliation.ignored,
                "non-positional files ignored"
            );
        }
        let parked: Vec<&String> = reconciliation
            .ignored
            .iter()
            .filter(|name| name.starts_with(&self.config.temp_prefix))
            .collect();
        if !parked.is_empty() {
            tracing::warn!(
                collection = %self.collection,
                parked = ?parked,
                "files from an interrupted run; renumber to adopt them"
            );
        }
        self.excluded = excluded;
        self.ignored = reconciliation.ignored.clone();
        self.sequence = reconciliation.to_sequence()?;
        self.listed_originals = reconciliation
            .live
            .iter()
            .chain(&reconciliation.pending_deletion)
            .map(|file| file.original.clone())
            .collect();
        self.pending_deletion = self.pending_for(&self.plan);
        Ok(())
    }

    fn replace_state(&mut self, sequence: Sequence, plan: RenamePlan) -> (Sequence, RenamePlan) {
        self.pending_deletion = self.pending_for(&plan);
        let previous_sequence = std::mem::replace(&mut self.sequence, sequence);
        let previous_plan = std::mem::replace(&mut self.plan, plan);
        (previous_sequence, previous_plan)
    }

    fn pending_for(&self, plan: &RenamePlan) -> Vec<PositionalName> {
        let mut pending: Vec<PositionalName> = plan
            .deleted
            .iter()
            .filter(|original| self.listed_originals.contains(*original))
            .map(|original| plan.resolve(original).clone())
            .collect();
        pending.sort();
        pending
    }

    fn persist(&mut self) -> Result<(), EngineError> {
        match self.store.save(&self.collection, &self.plan) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                self.dirty = true;
                tracing::warn!(collection = %self.collection, error = %e, "plan not persisted");
                Err(EngineError::PersistenceFailure(e))
            }
        }
    }
}

fn load_plan(store: &impl PlanStore, collection: &CollectionId) -> Result<RenamePlan, EngineError> {
    match store.load(collection) {
        Ok(plan) => Ok(plan),
        Err(StorageError::CorruptPlan {
            collection,
            reason,
            plan,
        }) => Err(EngineError::CorruptPlan {
            collection,
            reason,
            plan,
        }),
        Err(e) => Err(EngineError::Storage(e)),
    }
}
