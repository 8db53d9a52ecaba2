//! Record reference parsing.
//!
//! Subject references inside clinical payloads come in several shapes:
//! relative (`Patient/123`), versioned (`Patient/123/_history/1`), absolute
//! URLs, contained (`#id`), or URNs. Only relative and versioned references
//! resolve to a local subject; the rest are reported as unresolvable so the
//! extractor can treat them as a missing subject.

use std::fmt;

/// A successfully parsed local record reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordReference {
    /// The resource type (e.g., "Patient")
    pub resource_type: String,
    /// The record ID
    pub id: String,
    /// Optional version ID from a `_history` suffix
    pub version: Option<String>,
}

impl RecordReference {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
            version: None,
        }
    }

    /// Returns the reference as a relative string (Type/id).
    pub fn to_relative(&self) -> String {
        format!("{}/{}", self.resource_type, self.id)
    }
}

impl fmt::Display for RecordReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_relative())
    }
}

/// A reference that cannot be resolved to a local record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvableReference {
    /// A contained reference (starts with `#`)
    Contained(String),
    /// A URN reference (`urn:uuid:xxx` or `urn:oid:xxx`)
    Urn(String),
    /// A reference to another server
    External(String),
    /// A malformed or invalid reference
    Invalid(String),
}

impl fmt::Display for UnresolvableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contained(id) => write!(f, "contained reference: #{id}"),
            Self::Urn(urn) => write!(f, "URN reference: {urn}"),
            Self::External(url) => write!(f, "external reference: {url}"),
            Self::Invalid(reason) => write!(f, "invalid reference: {reason}"),
        }
    }
}

impl std::error::Error for UnresolvableReference {}

/// Parse a reference string into its components.
///
/// Returns `Err(UnresolvableReference)` for contained references, URNs,
/// absolute URLs, and malformed input.
pub fn parse_reference(reference: &str) -> Result<RecordReference, UnresolvableReference> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(UnresolvableReference::Invalid(
            "empty reference".to_string(),
        ));
    }

    if let Some(contained_id) = reference.strip_prefix('#') {
        return Err(UnresolvableReference::Contained(contained_id.to_string()));
    }

    if reference.starts_with("urn:") {
        return Err(UnresolvableReference::Urn(reference.to_string()));
    }

    // Absolute URLs belong to some other server as far as extraction is
    // concerned; subject identity has to be local.
    if reference.contains("://") {
        return Err(UnresolvableReference::External(reference.to_string()));
    }

    // Parse "ResourceType/id" or "ResourceType/id/_history/version"
    let parts: Vec<&str> = reference.split('/').collect();

    if parts.len() < 2 {
        return Err(UnresolvableReference::Invalid(format!(
            "reference must contain at least Type/id: {reference}"
        )));
    }

    let resource_type = parts[0];
    let id = parts[1];

    if !resource_type
        .chars()
        .next()
        .map(|c| c.is_ascii_uppercase())
        .unwrap_or(false)
    {
        return Err(UnresolvableReference::Invalid(format!(
            "resource type must start with uppercase letter: {resource_type}"
        )));
    }

    if id.is_empty() {
        return Err(UnresolvableReference::Invalid(
            "record id cannot be empty".to_string(),
        ));
    }

    let version = if parts.len() >= 4 && parts[2] == "_history" {
        Some(parts[3].to_string())
    } else {
        None
    };

    Ok(RecordReference {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
        version,
    })
}
