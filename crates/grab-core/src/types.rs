use serde::{Deserialize, Serialize};

/// Filename emitted when no naming evidence exists at all. Downstream
/// consumers must treat it as "ask an external authority for a name" and
/// never persist it as-is.
pub const UNRESOLVED_NAME: &str = "__needs-filename__";

// ---------------------------------------------------------------------------
// RawBlock
// ---------------------------------------------------------------------------

/// One code region discovered in a snapshot of the producer's output.
///
/// Ephemeral: created fresh on every extraction pass and discarded once the
/// pipeline has resolved (or rejected) it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    /// Block content exactly as found, untrimmed.
    pub content: String,
    /// Producer-supplied syntax tag, e.g. the info string of a fence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_hint: Option<String>,
    /// Raw text immediately above the block, used for path inference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preceding_context: Option<String>,
}

impl RawBlock {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            language_hint: None,
            preceding_context: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.language_hint = Some(hint.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.preceding_context = Some(context.into());
        self
    }
}

// ---------------------------------------------------------------------------
// ResolvedFile
// ---------------------------------------------------------------------------

/// Final artifact handed to the downstream workflow: a relative path plus the
/// content to write. `name` is never empty; it may be [`UNRESOLVED_NAME`]
/// when the resolver found no evidence and refuses to invent a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedFile {
    pub name: String,
    pub content: String,
}

impl ResolvedFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// True when the name is the unresolved sentinel and the caller must
    /// obtain a real path before persisting.
    pub fn needs_name(&self) -> bool {
        self.name == UNRESOLVED_NAME
    }

    /// True for names that carry no real information: the unresolved
    /// sentinel, the `file_<n>.<ext>` fallback family, and "untitled"
    /// variants. The normalizer re-infers these from content.
    pub fn has_placeholder_name(&self) -> bool {
        is_placeholder_name(&self.name)
    }
}

pub(crate) fn is_placeholder_name(name: &str) -> bool {
    if name.is_empty() || name == UNRESOLVED_NAME {
        return true;
    }
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("untitled") {
        return true;
    }
    // file_<digits> with an optional extension
    if let Some(rest) = lower.strip_prefix("file_") {
        let stem = rest.split('.').next().unwrap_or("");
        return !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit());
    }
    false
}
