//! Extraction of update envelopes from mutated record payloads.
//!
//! Different resource schemas nest the subject reference and the event
//! timestamp differently, so extraction is driven by a per-type rule table
//! rather than a single generic path. A rule lists candidate paths in
//! priority order; the first one that yields a usable value wins.
//!
//! Extraction is a pure function of the payload: it never touches the
//! dispatch channel or any external store.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::envelope::{TimestampSource, UpdateEnvelope};
use crate::reference::parse_reference;
use crate::time::{EventInstant, now_utc};

/// Errors reported when a payload carries no usable identifying data.
///
/// These are recoverable by design: callers log and skip, and never let
/// extraction failure reach the request's own error path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("no watch rule registered for resource type '{0}'")]
    UnknownType(String),

    #[error("no resolvable subject reference in {resource_type} payload")]
    MissingSubject { resource_type: String },

    #[error("no usable event timestamp in {resource_type} payload")]
    MissingTimestamp { resource_type: String },
}

impl ExtractionError {
    /// The missing piece, as a short label for structured logging.
    pub fn missing(&self) -> &'static str {
        match self {
            ExtractionError::UnknownType(_) => "rule",
            ExtractionError::MissingSubject { .. } => "subject",
            ExtractionError::MissingTimestamp { .. } => "timestamp",
        }
    }
}

/// Policy applied when none of a rule's timestamp paths match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampFallback {
    /// Use `meta.lastUpdated` when present, otherwise the extraction clock.
    #[default]
    MetaThenCapture,
    /// Use `meta.lastUpdated` or fail with `MissingTimestamp`.
    MetaOnly,
    /// Rule paths only; anything else fails with `MissingTimestamp`.
    Strict,
}

/// Field-location rule for one resource type.
#[derive(Debug, Clone)]
pub struct WatchRule {
    /// Candidate subject-reference paths, in priority order. The special
    /// path `id` marks the record itself as the subject (e.g. Patient).
    pub subject_paths: Vec<String>,
    /// Candidate event-timestamp paths, in priority order.
    pub timestamp_paths: Vec<String>,
}

impl WatchRule {
    pub fn new(subject_paths: &[&str], timestamp_paths: &[&str]) -> Self {
        Self {
            subject_paths: subject_paths.iter().map(|s| s.to_string()).collect(),
            timestamp_paths: timestamp_paths.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Rule-table extractor mapping mutated payloads to update envelopes.
#[derive(Debug, Clone)]
pub struct UpdateExtractor {
    rules: HashMap<String, WatchRule>,
    fallback: TimestampFallback,
}

impl UpdateExtractor {
    /// Create an extractor with an empty rule table.
    pub fn new(fallback: TimestampFallback) -> Self {
        Self {
            rules: HashMap::new(),
            fallback,
        }
    }

    /// Create an extractor preloaded with rules for the standard clinical
    /// resource types.
    pub fn with_default_rules(fallback: TimestampFallback) -> Self {
        Self {
            rules: default_rules(),
            fallback,
        }
    }

    /// Insert or replace the rule for a resource type.
    pub fn insert_rule(&mut self, resource_type: impl Into<String>, rule: WatchRule) {
        self.rules.insert(resource_type.into(), rule);
    }

    /// Whether a rule is registered for the given resource type.
    pub fn has_rule(&self, resource_type: &str) -> bool {
        self.rules.contains_key(resource_type)
    }

    /// Extract an update envelope from a mutated record payload.
    ///
    /// `resource_type` is the configured name of the watched type, supplied
    /// by the caller, never read from the payload.
    pub fn extract(
        &self,
        resource_type: &str,
        payload: &Value,
    ) -> Result<UpdateEnvelope, ExtractionError> {
        let rule = self
            .rules
            .get(resource_type)
            .ok_or_else(|| ExtractionError::UnknownType(resource_type.to_string()))?;

        let subject_id = rule
            .subject_paths
            .iter()
            .find_map(|path| resolve_subject(payload, path))
            .ok_or_else(|| ExtractionError::MissingSubject {
                resource_type: resource_type.to_string(),
            })?;

        let (occurred_at, timestamp_source) = self.resolve_timestamp(rule, payload).ok_or_else(
            || ExtractionError::MissingTimestamp {
                resource_type: resource_type.to_string(),
            },
        )?;

        Ok(UpdateEnvelope::new(
            subject_id,
            occurred_at,
            resource_type,
            timestamp_source,
        ))
    }

    fn resolve_timestamp(
        &self,
        rule: &WatchRule,
        payload: &Value,
    ) -> Option<(EventInstant, TimestampSource)> {
        for path in &rule.timestamp_paths {
            // Partial dates ("2015-04-01") are not instants; skip to the
            // next candidate rather than guessing a time of day.
            if let Some(instant) = lookup_instant(payload, path) {
                return Some((instant, TimestampSource::Field(path.clone())));
            }
        }

        match self.fallback {
            TimestampFallback::Strict => None,
            TimestampFallback::MetaOnly => lookup_instant(payload, "meta.lastUpdated")
                .map(|instant| (instant, TimestampSource::MetaLastUpdated)),
            TimestampFallback::MetaThenCapture => lookup_instant(payload, "meta.lastUpdated")
                .map(|instant| (instant, TimestampSource::MetaLastUpdated))
                .or_else(|| Some((now_utc(), TimestampSource::CaptureTime))),
        }
    }
}

/// Rules for the clinical resource types the server registers by default.
///
/// Paths use DSTU2-era field names first with later-revision synonyms as
/// secondary candidates, so payloads from either vintage extract cleanly.
pub fn default_rules() -> HashMap<String, WatchRule> {
    let mut rules = HashMap::new();
    rules.insert(
        "Patient".to_string(),
        WatchRule::new(&["id"], &[]),
    );
    rules.insert(
        "MedicationStatement".to_string(),
        WatchRule::new(
            &["patient.reference", "subject.reference"],
            &["effectiveDateTime", "effectivePeriod.start"],
        ),
    );
    rules.insert(
        "MedicationOrder".to_string(),
        WatchRule::new(&["patient.reference"], &["dateWritten"]),
    );
    rules.insert(
        "Observation".to_string(),
        WatchRule::new(
            &["subject.reference"],
            &["effectiveDateTime", "effectivePeriod.start", "issued"],
        ),
    );
    rules.insert(
        "Condition".to_string(),
        WatchRule::new(
            &["patient.reference", "subject.reference"],
            &["onsetDateTime", "dateRecorded", "recordedDate"],
        ),
    );
    rules.insert(
        "Procedure".to_string(),
        WatchRule::new(
            &["subject.reference"],
            &["performedDateTime", "performedPeriod.start"],
        ),
    );
    rules.insert(
        "Encounter".to_string(),
        WatchRule::new(&["patient.reference", "subject.reference"], &["period.start"]),
    );
    rules.insert(
        "Immunization".to_string(),
        WatchRule::new(&["patient.reference"], &["date", "occurrenceDateTime"]),
    );
    rules.insert(
        "DiagnosticReport".to_string(),
        WatchRule::new(
            &["subject.reference"],
            &["effectiveDateTime", "effectivePeriod.start", "issued"],
        ),
    );
    rules.insert(
        "AllergyIntolerance".to_string(),
        WatchRule::new(&["patient.reference"], &["onset", "recordedDate"]),
    );
    rules
}

/// Walk a dotted path into a JSON value.
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |v, segment| v.get(segment))
}

fn lookup_str<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    lookup(value, path).and_then(Value::as_str)
}

fn lookup_instant(value: &Value, path: &str) -> Option<EventInstant> {
    lookup_str(value, path).and_then(|s| EventInstant::from_str(s).ok())
}

/// Resolve a subject path to a subject identifier.
///
/// The `id` path means the record identifies the subject itself; any other
/// path is expected to hold a local reference string like `Patient/123`.
fn resolve_subject(payload: &Value, path: &str) -> Option<String> {
    let raw = lookup_str(payload, path)?;
    if path == "id" {
        return Some(raw.to_string());
    }
    parse_reference(raw).ok().map(|r| r.id)
}
