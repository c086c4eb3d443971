//! `grab-core` — producer-agnostic capture pipeline.
//!
//! Turns free-form generated text into a canonical list of named file
//! artifacts: block extraction, intra-session dedup, noise filtering,
//! path resolution and wire-shape normalization. Everything here is
//! synchronous; timing and producer adapters live in `grab-session`.

pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod fingerprint;
pub mod io;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod types;

pub use config::{ConfigWarning, Heuristics, SignatureRule, WarnLevel};
pub use error::{GrabError, Result};
pub use fingerprint::{Fingerprint, SeenBlocks};
pub use normalize::{normalize, parse_payload, Payload};
pub use pipeline::Pipeline;
pub use resolve::{PathEvidence, Resolver};
pub use types::{RawBlock, ResolvedFile, UNRESOLVED_NAME};
