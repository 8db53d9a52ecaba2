//! Storage data types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

/// A clinical record as stored in the storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The record ID.
    pub id: String,
    /// The version ID of this specific version.
    pub version_id: String,
    /// The record's resource type (e.g., "Patient", "MedicationStatement").
    pub resource_type: String,
    /// The full record content as JSON, including server-stamped metadata.
    pub resource: Value,
    /// When this version was written.
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

impl StoredRecord {
    /// Creates a new `StoredRecord` stamped with the current time.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        version_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource: Value,
    ) -> Self {
        Self {
            id: id.into(),
            version_id: version_id.into(),
            resource_type: resource_type.into(),
            resource,
            last_updated: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_record_serialization() {
        let record = StoredRecord::new(
            "123",
            "1",
            "Patient",
            serde_json::json!({"resourceType": "Patient", "id": "123"}),
        );

        let json = serde_json::to_string(&record).expect("serialization failed");
        let deserialized: StoredRecord = serde_json::from_str(&json).expect("deserialization failed");

        assert_eq!(record.id, deserialized.id);
        assert_eq!(record.version_id, deserialized.version_id);
        assert_eq!(record.resource_type, deserialized.resource_type);
    }
}
