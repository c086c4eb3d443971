use std::path::Path;

use anyhow::Context;

use grab_core::{Pipeline, SeenBlocks};

use crate::output;
use crate::tables::resolve_tables;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the extraction pipeline over one saved snapshot of producer output.
pub fn run(
    tables: Option<&Path>,
    file: Option<&Path>,
    write: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let heuristics = resolve_tables(tables)?;
    let pipeline = Pipeline::new(&heuristics).context("invalid heuristics tables")?;
    let snapshot = super::read_input(file)?;

    let mut seen = SeenBlocks::new();
    let files = pipeline.process_snapshot(&snapshot, &mut seen);

    if let Some(dir) = write {
        let written = output::write_files(dir, &files)?;
        println!(
            "wrote {written} of {} file(s) under {}",
            files.len(),
            dir.display()
        );
        return Ok(());
    }

    if json {
        output::print_json(&files)?;
    } else if files.is_empty() {
        println!("No files found.");
    } else {
        output::file_table(&files);
    }
    Ok(())
}
