//! Storage traits for the record storage abstraction.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;
use crate::types::StoredRecord;

/// The storage contract the request pipeline persists through.
///
/// Implementations must be thread-safe (`Send + Sync`). The watch pipeline
/// never calls storage directly; it only observes what the handlers return
/// after one of these operations succeeds.
#[async_trait]
pub trait RecordStorage: Send + Sync {
    /// Creates a new record.
    ///
    /// The record must contain a `resourceType` field and may contain an
    /// `id` field; the backend generates an ID when none is provided.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a record with the same type
    /// and ID exists, `StorageError::InvalidRecord` if the payload is
    /// malformed.
    async fn create(&self, resource: &Value) -> Result<StoredRecord, StorageError>;

    /// Reads a record by type and ID. Returns `None` when absent.
    async fn read(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Option<StoredRecord>, StorageError>;

    /// Updates (or creates, update-as-create) the record identified by the
    /// payload's `resourceType` and `id` fields.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRecord` if either field is missing.
    async fn update(&self, resource: &Value) -> Result<StoredRecord, StorageError>;

    /// Deletes a record by type and ID. Idempotent: deleting an absent
    /// record is not an error.
    async fn delete(&self, resource_type: &str, id: &str) -> Result<(), StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that RecordStorage is object-safe
    fn _assert_storage_object_safe(_: &dyn RecordStorage) {}
}
