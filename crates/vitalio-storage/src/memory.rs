//! In-memory record storage backend using papaya's lock-free HashMap.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use crate::error::StorageError;
use crate::traits::RecordStorage;
use crate::types::StoredRecord;

pub type StorageKey = String; // Format: "ResourceType/id"

fn make_key(resource_type: &str, id: &str) -> StorageKey {
    format!("{resource_type}/{id}")
}

/// In-memory storage backend.
///
/// Lock-free concurrent access via papaya::HashMap; every write stamps
/// `meta.versionId` and `meta.lastUpdated` into the record body, which is
/// what downstream consumers of the persisted payload see.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    data: Arc<PapayaHashMap<StorageKey, StoredRecord>>,
    version_counter: AtomicU64,
}

impl InMemoryStorage {
    /// Creates a new empty in-memory storage.
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            version_counter: AtomicU64::new(0),
        }
    }

    /// Number of live records, for tests and diagnostics.
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_version(&self) -> String {
        (self.version_counter.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

/// Stamp server-controlled fields into the record body.
fn stamp_meta(
    body: &mut Value,
    id: &str,
    version_id: &str,
    last_updated: OffsetDateTime,
) -> Result<(), StorageError> {
    let formatted = last_updated
        .format(&Rfc3339)
        .map_err(|e| StorageError::internal(format!("failed to format lastUpdated: {e}")))?;

    let obj = body
        .as_object_mut()
        .ok_or_else(|| StorageError::invalid_record("record payload must be a JSON object"))?;
    obj.insert("id".to_string(), json!(id));

    let meta = obj.entry("meta").or_insert_with(|| json!({}));
    if !meta.is_object() {
        *meta = json!({});
    }
    meta["versionId"] = json!(version_id);
    meta["lastUpdated"] = json!(formatted);
    Ok(())
}

fn require_type(resource: &Value) -> Result<String, StorageError> {
    resource
        .get("resourceType")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| StorageError::invalid_record("record payload is missing resourceType"))
}

#[async_trait]
impl RecordStorage for InMemoryStorage {
    async fn create(&self, resource: &Value) -> Result<StoredRecord, StorageError> {
        let resource_type = require_type(resource)?;
        let id = match resource.get("id").and_then(Value::as_str) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let version_id = self.next_version();
        let now = OffsetDateTime::now_utc();
        let mut body = resource.clone();
        stamp_meta(&mut body, &id, &version_id, now)?;

        let stored = StoredRecord {
            id: id.clone(),
            version_id,
            resource_type: resource_type.clone(),
            resource: body,
            last_updated: now,
        };

        let guard = self.data.pin();
        match guard.try_insert(make_key(&resource_type, &id), stored.clone()) {
            Ok(_) => Ok(stored),
            Err(_) => Err(StorageError::already_exists(resource_type, id)),
        }
    }

    async fn read(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Option<StoredRecord>, StorageError> {
        let guard = self.data.pin();
        Ok(guard.get(&make_key(resource_type, id)).cloned())
    }

    async fn update(&self, resource: &Value) -> Result<StoredRecord, StorageError> {
        let resource_type = require_type(resource)?;
        let id = resource
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| StorageError::invalid_record("record payload is missing id"))?;

        let version_id = self.next_version();
        let now = OffsetDateTime::now_utc();
        let mut body = resource.clone();
        stamp_meta(&mut body, &id, &version_id, now)?;

        let stored = StoredRecord {
            id: id.clone(),
            version_id,
            resource_type: resource_type.clone(),
            resource: body,
            last_updated: now,
        };

        // Update-as-create: a PUT against an absent id writes a first version.
        self.data
            .pin()
            .insert(make_key(&resource_type, &id), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, resource_type: &str, id: &str) -> Result<(), StorageError> {
        self.data.pin().remove(&make_key(resource_type, id));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
