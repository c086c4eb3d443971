use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrabError {
    #[error("invalid signature rule '{name}': {source}")]
    InvalidSignatureRule {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid lead-in pattern '{pattern}': {reason}")]
    InvalidLeadIn { pattern: String, reason: String },

    #[error("invalid marker label '{0}': labels must be non-empty and contain no ':'")]
    InvalidMarkerLabel(String),

    #[error("marker label table does not compile: {0}")]
    MarkerTable(#[source] regex::Error),

    #[error("unrecognized payload shape: {0}")]
    UnrecognizedPayload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GrabError>;
