//! Exported plan document: every collection's plan as one JSON object,
//! `{"<collection>": {"renames": {...}, "deleted": [...]}}`, for downstream
//! batch-rename tools.

use std::fs;
use std::path::Path;

use reorder_core::PlanSnapshot;

use crate::error::StorageError;
use crate::traits::PlanStore;

pub fn to_json(snapshot: &PlanSnapshot) -> Result<String, StorageError> {
    serde_json::to_string_pretty(snapshot).map_err(|e| StorageError::Serialization(e.to_string()))
}

pub fn from_json(json: &str) -> Result<PlanSnapshot, StorageError> {
    let snapshot: PlanSnapshot =
        serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
    for (collection, plan) in &snapshot {
        plan.validate().map_err(|e| StorageError::CorruptPlan {
            collection: collection.to_string(),
            reason: e.to_string(),
            plan: Some(Box::new(plan.clone())),
        })?;
    }
    Ok(snapshot)
}

pub fn write_plan_document(path: &Path, snapshot: &PlanSnapshot) -> Result<(), StorageError> {
    let contents = to_json(snapshot)?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let temp = tempfile::NamedTempFile::new_in(dir)?;
    fs::write(temp.path(), contents.as_bytes())?;
    temp.persist(path).map_err(|e| StorageError::Io(e.error))?;
    tracing::info!(path = %path.display(), collections = snapshot.len(), "plan document written");
    Ok(())
}

pub fn read_plan_document(path: &Path) -> Result<PlanSnapshot, StorageError> {
    let contents = fs::read_to_string(path)?;
    from_json(&contents)
}

/// Dump the whole store.
pub fn export_store(store: &impl PlanStore, path: &Path) -> Result<(), StorageError> {
    write_plan_document(path, &store.snapshot()?)
}

/// Replace the store's contents with a previously exported document.
pub fn import_store(store: &mut impl PlanStore, path: &Path) -> Result<usize, StorageError> {
    let snapshot = read_plan_document(path)?;
    store.clear_all()?;
    for (collection, plan) in &snapshot {
        store.save(collection, plan)?;
    }
    Ok(snapshot.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::SqlitePlanStore;
    use reorder_core::{CollectionId, RenamePlan};

    fn plan(entries: &[(&str, &str)]) -> RenamePlan {
        let mut plan = RenamePlan::new();
        for (from, to) in entries {
            plan.renames.insert(from.parse().unwrap(), to.parse().unwrap());
        }
        plan
    }

    #[test]
    fn document_is_keyed_by_collection() {
        let mut snapshot = PlanSnapshot::new();
        snapshot.insert(
            CollectionId::new("sku-1").unwrap(),
            plan(&[("1.jpg", "3.jpg"), ("3.jpg", "1.jpg")]),
        );
        let json = to_json(&snapshot).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sku-1"]["renames"]["1.jpg"], "3.jpg");
        assert_eq!(value["sku-1"]["renames"]["3.jpg"], "1.jpg");
        assert_eq!(from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn invalid_document_rejected() {
        let json = r#"{"sku-1": {"renames": {"1.jpg": "3.jpg", "2.jpg": "3.jpg"}}}"#;
        assert!(matches!(from_json(json), Err(StorageError::CorruptPlan { .. })));
        let bad_name = r#"{"sku-1": {"renames": {"cover.jpg": "3.jpg"}}}"#;
        assert!(matches!(from_json(bad_name), Err(StorageError::Serialization(_))));
    }

    #[test]
    fn export_import_between_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("plans.json");

        let mut source = SqlitePlanStore::open_in_memory().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        source.save(&sku, &plan(&[("2.jpg", "1.jpg"), ("1.jpg", "2.jpg")])).unwrap();
        export_store(&source, &path).unwrap();

        let mut target = SqlitePlanStore::open_in_memory().unwrap();
        target.save(&CollectionId::new("stale").unwrap(), &plan(&[("1.jpg", "2.jpg")])).unwrap();
        assert_eq!(import_store(&mut target, &path).unwrap(), 1);
        assert_eq!(target.snapshot().unwrap(), source.snapshot().unwrap());
    }
}
