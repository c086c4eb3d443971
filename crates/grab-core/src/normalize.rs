use crate::error::{GrabError, Result};
use crate::fingerprint::SeenBlocks;
use crate::pipeline::Pipeline;
use crate::resolve::PathEvidence;
use crate::types::{is_placeholder_name, RawBlock, ResolvedFile, UNRESOLVED_NAME};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Payload (the three historical wire shapes)
// ---------------------------------------------------------------------------

/// A session result as it may arrive over the wire. Three shapes survive in
/// the field: one inline code object, an array of unresolved blocks, and an
/// array of already-named files. All reduce to canonical `{name, content}`
/// pairs through [`normalize`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Inline(InlinePayload),
    Files(Vec<NamedFilePayload>),
    Blocks(Vec<BlockPayload>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlinePayload {
    pub code: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockPayload {
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedFilePayload {
    pub name: String,
    pub content: String,
}

/// Parses any of the three wire shapes.
pub fn parse_payload(json: &str) -> Result<Payload> {
    serde_json::from_str(json).map_err(|e| GrabError::UnrecognizedPayload(e.to_string()))
}

// ---------------------------------------------------------------------------
// normalize
// ---------------------------------------------------------------------------

/// Reduces a payload to the canonical file list.
///
/// Every shape passes through the snippet filter and fingerprint dedup
/// again, since some shapes arrive partially processed upstream. Named files
/// whose name is a known placeholder get one more shot at content-shape
/// inference before being passed along.
pub fn normalize(payload: Payload, pipeline: &Pipeline) -> Vec<ResolvedFile> {
    let mut seen = SeenBlocks::new();
    match payload {
        Payload::Inline(inline) => {
            let named = inline
                .filename
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty() && !is_placeholder_name(n))
                .map(str::to_string);
            match named {
                Some(name) => named_file(name, inline.code, pipeline, &mut seen)
                    .into_iter()
                    .collect(),
                None => {
                    let mut block = RawBlock::new(inline.code);
                    block.language_hint = inline.language;
                    pipeline.process_blocks(vec![block], &mut seen)
                }
            }
        }
        Payload::Blocks(blocks) => {
            let raw: Vec<RawBlock> = blocks
                .into_iter()
                .map(|b| {
                    let mut block = RawBlock::new(b.code);
                    block.language_hint = b.language;
                    block
                })
                .collect();
            pipeline.process_blocks(raw, &mut seen)
        }
        Payload::Files(files) => files
            .into_iter()
            .filter_map(|f| {
                let name = f.name.trim().to_string();
                let name = if name.is_empty() {
                    UNRESOLVED_NAME.to_string()
                } else {
                    name
                };
                named_file(name, f.content, pipeline, &mut seen)
            })
            .collect(),
    }
}

/// Filter + dedup for a file that already carries a name, re-inferring
/// placeholder names from content where possible.
fn named_file(
    name: String,
    content: String,
    pipeline: &Pipeline,
    seen: &mut SeenBlocks,
) -> Option<ResolvedFile> {
    if !seen.insert_novel(&content) {
        return None;
    }
    let evidence = PathEvidence::InContext { path: name.clone() };
    if pipeline.filter().is_noise(&content, Some(&evidence)) {
        return None;
    }
    let name = if is_placeholder_name(&name) {
        pipeline
            .resolver()
            .infer_name(&content)
            .unwrap_or(name)
    } else {
        name
    };
    let file = ResolvedFile::new(name, content.trim_matches('\n').to_string());
    Some(file)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
