use std::collections::{BTreeMap, VecDeque};

use reorder_core::{CollectionId, PositionalName, RenameStep, StepOutcome};
use reorder_storage::{ListingSource, StorageError, StorageExecutor};

/// Object storage held in memory. Every file carries a content tag (the name
/// it was seeded under) so tests can see which bytes ended up where.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucket {
    collections: BTreeMap<CollectionId, BTreeMap<String, String>>,
    fail_at: VecDeque<Option<usize>>,
    executed: Vec<RenameStep>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add files to a collection; each file's content tag is its name.
    pub fn seed(&mut self, collection: &CollectionId, names: &[&str]) {
        let files = self.collections.entry(collection.clone()).or_default();
        for name in names {
            files.insert(name.to_string(), name.to_string());
        }
    }

    /// Make step `index` of an upcoming `execute` call fail. Each call
    /// consumes one queued failure, oldest first.
    pub fn fail_step(&mut self, index: usize) {
        self.fail_at.push_back(Some(index));
    }

    /// Let the next `execute` call through before a queued failure fires.
    pub fn pass_call(&mut self) {
        self.fail_at.push_back(None);
    }

    /// File names, sorted.
    pub fn files(&self, collection: &CollectionId) -> Vec<String> {
        self.collections
            .get(collection)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn content(&self, collection: &CollectionId, name: &str) -> Option<&str> {
        self.collections.get(collection)?.get(name).map(String::as_str)
    }

    /// Content tags of the positional files, in storage (numeric) order.
    pub fn contents_in_order(&self, collection: &CollectionId) -> Vec<String> {
        let Some(files) = self.collections.get(collection) else {
            return Vec::new();
        };
        let mut positional: Vec<(PositionalName, &String)> = files
            .iter()
            .filter_map(|(name, content)| Some((PositionalName::parse(name).ok()?, content)))
            .collect();
        positional.sort();
        positional.into_iter().map(|(_, content)| content.clone()).collect()
    }

    /// Every step that was carried out successfully, across all calls.
    pub fn executed(&self) -> &[RenameStep] {
        &self.executed
    }

    fn run(files: &mut BTreeMap<String, String>, step: &RenameStep) -> Result<(), String> {
        match step {
            RenameStep::Rename { from, to } => {
                if files.contains_key(to) {
                    return Err(format!("{to} already exists"));
                }
                let content = files.remove(from).ok_or_else(|| format!("{from} not found"))?;
                files.insert(to.clone(), content);
                Ok(())
            }
            RenameStep::Delete { name } => files
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| format!("{name} not found")),
        }
    }
}

impl ListingSource for MemoryBucket {
    fn list(&self, collection: &CollectionId) -> Result<Vec<String>, StorageError> {
        Ok(self.files(collection))
    }
}

impl StorageExecutor for MemoryBucket {
    fn execute(&mut self, collection: &CollectionId, steps: &[RenameStep]) -> Vec<StepOutcome> {
        let fail_at = self.fail_at.pop_front().flatten();
        let files = self.collections.entry(collection.clone()).or_default();
        let mut outcomes = Vec::with_capacity(steps.len());
        let mut failed = false;
        for (index, step) in steps.iter().enumerate() {
            if failed {
                outcomes.push(StepOutcome::Skipped);
                continue;
            }
            let result = if fail_at == Some(index) {
                Err("injected failure".to_string())
            } else {
                Self::run(files, step)
            };
            match result {
                Ok(()) => {
                    self.executed.push(step.clone());
                    outcomes.push(StepOutcome::Done);
                }
                Err(reason) => {
                    failed = true;
                    outcomes.push(StepOutcome::Failed(reason));
                }
            }
        }
        outcomes
    }
}
