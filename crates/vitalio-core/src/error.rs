use thiserror::Error;

/// Core error types for Vitalio operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid event instant: {0}")]
    InvalidInstant(String),

    #[error("Invalid record reference: {0}")]
    InvalidReference(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time parsing error: {0}")]
    TimeError(#[from] time::error::Parse),
}

impl CoreError {
    /// Create a new InvalidInstant error
    pub fn invalid_instant(value: impl Into<String>) -> Self {
        Self::InvalidInstant(value.into())
    }

    /// Create a new InvalidReference error
    pub fn invalid_reference(value: impl Into<String>) -> Self {
        Self::InvalidReference(value.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::invalid_instant("not-a-date");
        assert_eq!(err.to_string(), "Invalid event instant: not-a-date");

        let err = CoreError::invalid_reference("??");
        assert_eq!(err.to_string(), "Invalid record reference: ??");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err: serde_json::Error =
            serde_json::from_str::<serde_json::Value>("{ nope }").unwrap_err();
        let core_err: CoreError = json_err.into();
        assert!(matches!(core_err, CoreError::JsonError(_)));
    }
}
