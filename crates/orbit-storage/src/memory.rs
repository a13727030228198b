use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use orbit_core::RecordId;
use serde_json::Value as JsonValue;

use crate::store::{Filter, RecordStore, StoreError, StoredRecord};

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    collections: HashMap<String, Vec<StoredRecord>>,
    create_calls: usize,
    delete_calls: usize,
    rejected_collections: HashSet<String>,
    failing_deletes: HashSet<RecordId>,
}

/// In-process `RecordStore` keeping records in insertion order. Counts writes so
/// callers can assert idempotence, and can be told to fail specific operations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a record directly, bypassing the create counter.
    pub fn insert(&self, collection: &str, body: JsonValue) -> RecordId {
        let mut state = self.lock();
        push_record(&mut state, collection, body)
    }

    pub fn records(&self, collection: &str) -> Vec<StoredRecord> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }

    pub fn reject_creates_in(&self, collection: &str) {
        self.lock().rejected_collections.insert(collection.to_string());
    }

    pub fn fail_delete_of(&self, id: &RecordId) {
        self.lock().failing_deletes.insert(id.clone());
    }
}

fn push_record(state: &mut MemoryState, collection: &str, body: JsonValue) -> RecordId {
    state.next_id += 1;
    let id = RecordId::new(format!("rec{:012}", state.next_id));
    let fields = match body {
        JsonValue::Object(map) => map,
        _ => Default::default(),
    };
    state
        .collections
        .entry(collection.to_string())
        .or_default()
        .push(StoredRecord {
            id: id.clone(),
            fields,
        });
    id
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_first(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .lock()
            .collections
            .get(collection)
            .and_then(|records| records.iter().find(|r| filter.matches(&r.fields)))
            .cloned())
    }

    async fn create(&self, collection: &str, body: &JsonValue) -> Result<RecordId, StoreError> {
        let mut state = self.lock();
        state.create_calls += 1;
        if state.rejected_collections.contains(collection) {
            return Err(StoreError::Status {
                status: 400,
                url: format!("memory://{collection}"),
                body: "create rejected".to_string(),
            });
        }
        Ok(push_record(&mut state, collection, body.clone()))
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.delete_calls += 1;
        let url = format!("memory://{collection}/{id}");
        if state.failing_deletes.contains(id) {
            return Err(StoreError::Status {
                status: 500,
                url,
                body: "delete failed".to_string(),
            });
        }
        let records = state.collections.entry(collection.to_string()).or_default();
        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() == before {
            return Err(StoreError::Status {
                status: 404,
                url,
                body: "not found".to_string(),
            });
        }
        Ok(())
    }

    async fn list_page(
        &self,
        collection: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<StoredRecord>, StoreError> {
        let state = self.lock();
        let Some(records) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let skip = page.saturating_sub(1) as usize * per_page as usize;
        Ok(records
            .iter()
            .skip(skip)
            .take(per_page as usize)
            .cloned()
            .collect())
    }
}
