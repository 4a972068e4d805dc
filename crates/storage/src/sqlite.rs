use rusqlite::{Connection, OptionalExtension};

use reorder_core::{CollectionId, PlanSnapshot, RenamePlan};

use crate::error::StorageError;
use crate::traits::PlanStore;

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

/// Plan store backed by a single SQLite table. Each collection's plan is one
/// msgpack row guarded by a blake3 checksum.
pub struct SqlitePlanStore {
    conn: Connection,
}

impl SqlitePlanStore {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn collection_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM plans", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn decode_plan(
    collection: &str,
    payload: Vec<u8>,
    checksum: Vec<u8>,
) -> Result<RenamePlan, StorageError> {
    let corrupt = |reason: String, plan: Option<&RenamePlan>| StorageError::CorruptPlan {
        collection: collection.to_string(),
        reason,
        plan: plan.map(|p| Box::new(p.clone())),
    };
    let stored = to_array::<32>(checksum, "checksum")?;
    if blake3::hash(&payload).as_bytes() != &stored {
        return Err(corrupt("checksum mismatch".into(), None));
    }
    let plan = RenamePlan::from_msgpack(&payload).map_err(|e| corrupt(e.to_string(), None))?;
    plan.validate().map_err(|e| corrupt(e.to_string(), Some(&plan)))?;
    Ok(plan)
}

impl PlanStore for SqlitePlanStore {
    fn load(&self, collection: &CollectionId) -> Result<RenamePlan, StorageError> {
        let row: Option<(Vec<u8>, Vec<u8>)> = self
            .conn
            .query_row(
                "SELECT payload, checksum FROM plans WHERE collection_id = ?1",
                rusqlite::params![collection.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((payload, checksum)) => decode_plan(collection.as_str(), payload, checksum),
            None => Ok(RenamePlan::new()),
        }
    }

    fn save(&mut self, collection: &CollectionId, plan: &RenamePlan) -> Result<(), StorageError> {
        if plan.is_empty() {
            return self.clear(collection);
        }
        let payload = plan.to_msgpack()?;
        let checksum = blake3::hash(&payload);
        self.conn.execute(
            "INSERT INTO plans (collection_id, payload, checksum, entry_count, pending_deletes) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(collection_id) DO UPDATE SET payload = excluded.payload, checksum = excluded.checksum,
                entry_count = excluded.entry_count, pending_deletes = excluded.pending_deletes,
                updated_at = CAST(unixepoch('now','subsec') * 1000 AS INTEGER)",
            rusqlite::params![
                collection.as_str(),
                payload,
                checksum.as_bytes().as_slice(),
                plan.renames.len() as i64,
                plan.deleted.len() as i64,
            ],
        )?;
        tracing::debug!(
            %collection,
            entries = plan.renames.len(),
            deletes = plan.deleted.len(),
            "plan saved"
        );
        Ok(())
    }

    fn clear(&mut self, collection: &CollectionId) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM plans WHERE collection_id = ?1",
            rusqlite::params![collection.as_str()],
        )?;
        tracing::debug!(%collection, "plan cleared");
        Ok(())
    }

    fn clear_all(&mut self) -> Result<(), StorageError> {
        let removed = self.conn.execute("DELETE FROM plans", [])?;
        tracing::debug!(removed, "all plans cleared");
        Ok(())
    }

    fn snapshot(&self) -> Result<PlanSnapshot, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT collection_id, payload, checksum FROM plans ORDER BY collection_id")?;
        let rows = stmt.query_map([], |row| {
            let collection: String = row.get(0)?;
            let payload: Vec<u8> = row.get(1)?;
            let checksum: Vec<u8> = row.get(2)?;
            Ok((collection, payload, checksum))
        })?;

        let mut snapshot = PlanSnapshot::new();
        for row in rows {
            let (collection, payload, checksum) = row?;
            let plan = decode_plan(&collection, payload, checksum)?;
            snapshot.insert(CollectionId::new(collection)?, plan);
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SCHEMA_VERSION;
    use reorder_core::PositionalName;

    fn name(raw: &str) -> PositionalName {
        raw.parse().unwrap()
    }

    fn swap_plan() -> RenamePlan {
        let mut plan = RenamePlan::new();
        plan.renames.insert(name("1.jpg"), name("3.jpg"));
        plan.renames.insert(name("3.jpg"), name("1.jpg"));
        plan
    }

    #[test]
    fn schema_version_recorded() {
        let store = SqlitePlanStore::open_in_memory().unwrap();
        let version: i32 = store
            .conn()
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn unknown_collection_loads_empty() {
        let store = SqlitePlanStore::open_in_memory().unwrap();
        let sku = CollectionId::new("sku-9").unwrap();
        assert!(store.load(&sku).unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let mut store = SqlitePlanStore::open_in_memory().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        let mut plan = swap_plan();
        plan.deleted.insert(name("2.jpg"));
        store.save(&sku, &plan).unwrap();
        assert_eq!(store.load(&sku).unwrap(), plan);

        // Overwrite replaces, never merges.
        let replacement = swap_plan();
        store.save(&sku, &replacement).unwrap();
        assert_eq!(store.load(&sku).unwrap(), replacement);
        assert_eq!(store.collection_count().unwrap(), 1);
    }

    #[test]
    fn saving_empty_plan_clears_row() {
        let mut store = SqlitePlanStore::open_in_memory().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        store.save(&sku, &swap_plan()).unwrap();
        store.save(&sku, &RenamePlan::new()).unwrap();
        assert_eq!(store.collection_count().unwrap(), 0);
    }

    #[test]
    fn clear_is_scoped_and_clear_all_is_not() {
        let mut store = SqlitePlanStore::open_in_memory().unwrap();
        let a = CollectionId::new("a").unwrap();
        let b = CollectionId::new("b").unwrap();
        store.save(&a, &swap_plan()).unwrap();
        store.save(&b, &swap_plan()).unwrap();

        store.clear(&a).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec![&b]);

        store.clear_all().unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn tampered_payload_is_corrupt() {
        let mut store = SqlitePlanStore::open_in_memory().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        store.save(&sku, &swap_plan()).unwrap();
        store
            .conn()
            .execute("UPDATE plans SET payload = x'80'", [])
            .unwrap();
        match store.load(&sku) {
            Err(StorageError::CorruptPlan {
                collection,
                reason,
                plan,
            }) => {
                assert_eq!(collection, "sku-1");
                assert!(reason.contains("checksum"));
                assert!(plan.is_none());
            }
            other => panic!("expected CorruptPlan, got {other:?}"),
        }
    }

    #[test]
    fn invalid_plan_is_returned_with_the_error() {
        let mut store = SqlitePlanStore::open_in_memory().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        let mut merging = RenamePlan::new();
        merging.renames.insert(name("1.jpg"), name("3.jpg"));
        merging.renames.insert(name("2.jpg"), name("3.jpg"));
        store.save(&sku, &merging).unwrap();

        match store.load(&sku) {
            Err(StorageError::CorruptPlan { plan: Some(plan), .. }) => assert_eq!(*plan, merging),
            other => panic!("expected CorruptPlan with plan, got {other:?}"),
        }
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plans.db");
        let path = path.to_str().unwrap();
        let sku = CollectionId::new("sku-1").unwrap();
        {
            let mut store = SqlitePlanStore::open(path).unwrap();
            store.save(&sku, &swap_plan()).unwrap();
        }
        let store = SqlitePlanStore::open(path).unwrap();
        assert_eq!(store.load(&sku).unwrap(), swap_plan());
    }
}
