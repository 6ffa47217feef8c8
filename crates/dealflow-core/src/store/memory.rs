use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{DealflowError, Result};
use crate::store::{Filter, RecordStore};

type Collections = HashMap<String, HashMap<Uuid, Value>>;

/// In-memory [`RecordStore`] backed by a mutex-guarded map.
///
/// Every operation runs under one lock, so `update_where` is trivially
/// atomic. Intended for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.collections
            .lock()
            .map_err(|e| DealflowError::Store(format!("Store lock poisoned: {}", e)))
    }
}

fn merge_patch(record: &mut Value, patch: &Value) {
    if let (Value::Object(target), Value::Object(fields)) = (record, patch) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .and_then(|records| records.get(&id))
            .cloned())
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>> {
        let collections = self.lock()?;
        let records = match collections.get(collection) {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };
        Ok(records
            .values()
            .filter(|record| filters.iter().all(|f| f.matches(record)))
            .cloned()
            .collect())
    }

    async fn set(&self, collection: &str, id: Uuid, record: Value) -> Result<()> {
        let mut collections = self.lock()?;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id, record);
        Ok(())
    }

    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<()> {
        let mut collections = self.lock()?;
        let record = collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(&id))
            .ok_or_else(|| {
                DealflowError::NotFound(format!("Record {} in {}", id, collection))
            })?;
        merge_patch(record, &patch);
        Ok(())
    }

    async fn update_where(
        &self,
        collection: &str,
        id: Uuid,
        guard: &[Filter],
        patch: Value,
    ) -> Result<bool> {
        // Guard check and write happen under the same lock.
        let mut collections = self.lock()?;
        let record = match collections
            .get_mut(collection)
            .and_then(|records| records.get_mut(&id))
        {
            Some(record) => record,
            None => return Ok(false),
        };
        if !guard.iter().all(|f| f.matches(record)) {
            return Ok(false);
        }
        merge_patch(record, &patch);
        Ok(true)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<()> {
        let mut collections = self.lock()?;
        if let Some(records) = collections.get_mut(collection) {
            records.remove(&id);
        }
        Ok(())
    }
}
