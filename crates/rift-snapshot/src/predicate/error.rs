//! Errors raised while constructing or decoding patterns.

/// Error types for pattern construction and the pattern codec
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid regex '{pattern}' for {kind}: {source}")]
    InvalidRegex {
        kind: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid JSON for equalToJson: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Pattern must be a JSON object, got: {0}")]
    NotAnObject(String),
    #[error("No known pattern kind among fields [{0}]")]
    UnknownKind(String),
    #[error("Pattern declares more than one kind: '{0}' and '{1}'")]
    AmbiguousKind(&'static str, &'static str),
    #[error("Field '{field}' of {kind} {expected}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

impl PatternError {
    pub(crate) fn invalid_regex(kind: &'static str, pattern: &str, source: regex::Error) -> Self {
        PatternError::InvalidRegex {
            kind,
            pattern: pattern.to_string(),
            source,
        }
    }
}
