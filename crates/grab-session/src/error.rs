use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use grab_core::ResolvedFile;

// ---------------------------------------------------------------------------
// FailureReason
// ---------------------------------------------------------------------------

/// Wire-stable discriminant for a failed capture session.
///
/// The kebab-case strings are part of the reporting contract; downstream
/// consumers match on them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    /// The producer never came up: spawn failed, endpoint missing.
    ProducerUnreachable,
    /// No input channel existed to put the prompt into.
    InputElementNotFound,
    /// The prompt was staged but could not be submitted.
    SubmitControlNotFound,
    /// The hard session bound elapsed before completion.
    Timeout,
}

impl FailureReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::ProducerUnreachable => "producer-unreachable",
            FailureReason::InputElementNotFound => "input-element-not-found",
            FailureReason::SubmitControlNotFound => "submit-control-not-found",
            FailureReason::Timeout => "timeout",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SurfaceError
// ---------------------------------------------------------------------------

/// Failure reported by a producer adapter while delivering a prompt.
///
/// Adapters keep the human-readable detail; [`SurfaceError::reason`] maps
/// each variant onto the wire discriminant a session reports.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("producer unreachable: {0}")]
    ProducerUnreachable(String),
    #[error("no input element: {0}")]
    MissingInput(String),
    #[error("submit failed: {0}")]
    SubmitFailed(String),
}

impl SurfaceError {
    pub fn reason(&self) -> FailureReason {
        match self {
            SurfaceError::ProducerUnreachable(_) => FailureReason::ProducerUnreachable,
            SurfaceError::MissingInput(_) => FailureReason::InputElementNotFound,
            SurfaceError::SubmitFailed(_) => FailureReason::SubmitControlNotFound,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureFailure
// ---------------------------------------------------------------------------

/// Terminal error of a capture session.
///
/// Timeout failures keep whatever files were extracted before the bound
/// fired so callers can still salvage partial output. Delivery failures
/// carry an empty set; nothing was produced yet.
#[derive(Debug, Error)]
#[error("capture failed: {reason}")]
pub struct CaptureFailure {
    pub reason: FailureReason,
    pub partial: Vec<ResolvedFile>,
}

impl CaptureFailure {
    pub fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            partial: Vec::new(),
        }
    }

    pub fn timeout(partial: Vec<ResolvedFile>) -> Self {
        Self {
            reason: FailureReason::Timeout,
            partial,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_serialize_to_wire_names() {
        for (reason, wire) in [
            (FailureReason::ProducerUnreachable, "\"producer-unreachable\""),
            (
                FailureReason::InputElementNotFound,
                "\"input-element-not-found\"",
            ),
            (
                FailureReason::SubmitControlNotFound,
                "\"submit-control-not-found\"",
            ),
            (FailureReason::Timeout, "\"timeout\""),
        ] {
            assert_eq!(serde_json::to_string(&reason).unwrap(), wire);
            assert_eq!(format!("\"{reason}\""), wire);
        }
    }

    #[test]
    fn surface_errors_map_onto_reasons() {
        assert_eq!(
            SurfaceError::ProducerUnreachable("spawn".into()).reason(),
            FailureReason::ProducerUnreachable
        );
        assert_eq!(
            SurfaceError::MissingInput("stdin".into()).reason(),
            FailureReason::InputElementNotFound
        );
        assert_eq!(
            SurfaceError::SubmitFailed("flush".into()).reason(),
            FailureReason::SubmitControlNotFound
        );
    }

    #[test]
    fn timeout_failure_keeps_partial_files() {
        let failure = CaptureFailure::timeout(vec![ResolvedFile {
            name: "src/main.rs".into(),
            content: "fn main() {}".into(),
        }]);
        assert_eq!(failure.reason, FailureReason::Timeout);
        assert_eq!(failure.partial.len(), 1);
        assert!(CaptureFailure::new(FailureReason::ProducerUnreachable)
            .partial
            .is_empty());
    }
}
