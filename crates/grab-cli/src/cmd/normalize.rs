use std::path::Path;

use anyhow::Context;

use grab_core::{normalize, parse_payload, Pipeline};

use crate::output::print_json;
use crate::tables::resolve_tables;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Reduce a result payload, in any of the historical wire shapes, to the
/// canonical named-file list. Output is always JSON; this is a wire tool.
pub fn run(tables: Option<&Path>, file: Option<&Path>) -> anyhow::Result<()> {
    let heuristics = resolve_tables(tables)?;
    let pipeline = Pipeline::new(&heuristics).context("invalid heuristics tables")?;
    let raw = super::read_input(file)?;

    let payload = parse_payload(&raw)?;
    let files = normalize(payload, &pipeline);
    print_json(&files)
}
