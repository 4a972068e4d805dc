use std::fs;
use std::path::PathBuf;

use reorder_core::{CollectionId, RenameStep, StepOutcome};

use crate::error::StorageError;
use crate::traits::{ListingSource, StorageExecutor};

/// Lists `<root>/<collection>/` on the local filesystem and renames files in
/// place. Subdirectories are skipped; a missing collection directory lists as
/// empty.
pub struct DirectoryListing {
    root: PathBuf,
}

impl DirectoryListing {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn collection_dir(&self, collection: &CollectionId) -> PathBuf {
        self.root.join(collection.as_str())
    }
}

impl ListingSource for DirectoryListing {
    fn list(&self, collection: &CollectionId) -> Result<Vec<String>, StorageError> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(raw) => tracing::warn!(?raw, dir = %dir.display(), "skipping non-utf8 filename"),
            }
        }
        Ok(names)
    }
}

impl StorageExecutor for DirectoryListing {
    fn execute(&mut self, collection: &CollectionId, steps: &[RenameStep]) -> Vec<StepOutcome> {
        let dir = self.collection_dir(collection);
        let mut outcomes = Vec::with_capacity(steps.len());
        for step in steps {
            if outcomes.last().is_some_and(|o: &StepOutcome| !o.is_done()) {
                outcomes.push(StepOutcome::Skipped);
                continue;
            }
            let result = match step {
                RenameStep::Rename { from, to } => {
                    let target = dir.join(to);
                    // fs::rename silently replaces an existing target on unix.
                    if target.exists() {
                        Err(format!("{to} already exists"))
                    } else {
                        fs::rename(dir.join(from), target).map_err(|e| e.to_string())
                    }
                }
                RenameStep::Delete { name } => fs::remove_file(dir.join(name)).map_err(|e| e.to_string()),
            };
            match result {
                Ok(()) => outcomes.push(StepOutcome::Done),
                Err(reason) => {
                    tracing::warn!(%collection, %step, %reason, "storage step failed");
                    outcomes.push(StepOutcome::Failed(reason));
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_files_only() {
        let root = tempfile::tempdir().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        let dir = root.path().join("sku-1");
        fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["1.jpg", "2.jpg", "notes.txt"] {
            fs::write(dir.join(name), b"x").unwrap();
        }

        let listing = DirectoryListing::new(root.path());
        let mut names = listing.list(&sku).unwrap();
        names.sort();
        assert_eq!(names, vec!["1.jpg", "2.jpg", "notes.txt"]);

        let missing = CollectionId::new("sku-2").unwrap();
        assert!(listing.list(&missing).unwrap().is_empty());
    }

    #[test]
    fn executes_until_first_failure() {
        let root = tempfile::tempdir().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        let dir = root.path().join("sku-1");
        fs::create_dir_all(&dir).unwrap();
        for name in ["1.jpg", "2.jpg", "3.jpg"] {
            fs::write(dir.join(name), name.as_bytes()).unwrap();
        }

        let steps = vec![
            RenameStep::Delete { name: "1.jpg".into() },
            RenameStep::Rename {
                from: "2.jpg".into(),
                to: "1.jpg".into(),
            },
            RenameStep::Rename {
                from: "3.jpg".into(),
                to: "1.jpg".into(),
            },
            RenameStep::Delete { name: "3.jpg".into() },
        ];
        let mut backend = DirectoryListing::new(root.path());
        let outcomes = backend.execute(&sku, &steps);
        assert_eq!(outcomes[0], StepOutcome::Done);
        assert_eq!(outcomes[1], StepOutcome::Done);
        assert!(matches!(outcomes[2], StepOutcome::Failed(_)));
        assert_eq!(outcomes[3], StepOutcome::Skipped);

        assert_eq!(fs::read(dir.join("1.jpg")).unwrap(), b"2.jpg");
        assert!(dir.join("3.jpg").exists());
    }
}
