use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Content identity for one block within a capture session.
///
/// Covers the full trimmed content, never a prefix: producers routinely emit
/// blocks that share an identical opening and diverge later, so truncated
/// hashing merges distinct files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.trim().as_bytes());
        let digest = hasher.finalize();
        Fingerprint(u64::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]))
    }
}

/// Set of fingerprints already emitted during one session. Never persisted;
/// dropped when the session resolves.
#[derive(Debug, Default)]
pub struct SeenBlocks {
    seen: HashSet<Fingerprint>,
}

impl SeenBlocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the block and reports whether it was new. Repeated snapshots
    /// of a growing output call this with the same content many times; only
    /// the first call returns true.
    pub fn insert_novel(&mut self, content: &str) -> bool {
        self.seen.insert(Fingerprint::of(content))
    }

    pub fn contains(&self, content: &str) -> bool {
        self.seen.contains(&Fingerprint::of(content))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
