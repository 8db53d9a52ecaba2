//! The update envelope: one observed resource mutation.

use serde::{Deserialize, Serialize};

use crate::time::EventInstant;

/// Which rule produced the envelope's `occurred_at` value.
///
/// Carried on the envelope so a consumer looking at a surprising timestamp
/// can tell whether it came from the record itself, from storage metadata,
/// or from the extraction clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "camelCase")]
pub enum TimestampSource {
    /// A payload field matched one of the rule's timestamp paths.
    Field(String),
    /// Fell back to the record's `meta.lastUpdated`.
    MetaLastUpdated,
    /// Fell back to the clock at extraction time.
    CaptureTime,
}

impl TimestampSource {
    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampSource::Field(_) => "field",
            TimestampSource::MetaLastUpdated => "meta",
            TimestampSource::CaptureTime => "capture",
        }
    }
}

/// Immutable description of one successful mutation of a watched resource.
///
/// Built by the extractor strictly after the persistence handler reports
/// success, then handed to the dispatch channel. Never modified after
/// construction; consumed by exactly one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEnvelope {
    /// Stable identifier of the clinical subject the record refers to.
    pub subject_id: String,
    /// The record's own event time, offset preserved from the wire.
    pub occurred_at: EventInstant,
    /// Configured name of the resource type whose interceptor fired.
    pub resource_type: String,
    /// Where `occurred_at` came from.
    pub timestamp_source: TimestampSource,
}

impl UpdateEnvelope {
    pub fn new(
        subject_id: impl Into<String>,
        occurred_at: EventInstant,
        resource_type: impl Into<String>,
        timestamp_source: TimestampSource,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            occurred_at,
            resource_type: resource_type.into(),
            timestamp_source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_envelope_serialization() {
        let envelope = UpdateEnvelope::new(
            "55c3847267803d2945000003",
            EventInstant::from_str("2015-04-01T00:00:00-04:00").unwrap(),
            "MedicationStatement",
            TimestampSource::Field("effectiveDateTime".to_string()),
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["subjectId"], "55c3847267803d2945000003");
        assert_eq!(json["occurredAt"], "2015-04-01T00:00:00-04:00");
        assert_eq!(json["resourceType"], "MedicationStatement");
        assert_eq!(json["timestampSource"]["kind"], "field");
        assert_eq!(json["timestampSource"]["path"], "effectiveDateTime");
    }

    #[test]
    fn test_envelope_roundtrip() {
        let envelope = UpdateEnvelope::new(
            "abc",
            EventInstant::from_str("2023-05-15T14:30:00Z").unwrap(),
            "Observation",
            TimestampSource::MetaLastUpdated,
        );
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: UpdateEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(TimestampSource::Field("x".into()).as_str(), "field");
        assert_eq!(TimestampSource::MetaLastUpdated.as_str(), "meta");
        assert_eq!(TimestampSource::CaptureTime.as_str(), "capture");
    }
}
