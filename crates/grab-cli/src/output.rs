use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use grab_core::io::atomic_write;
use grab_core::ResolvedFile;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    // Calculate column widths
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    // Print header
    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    // Print separator
    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    // Print rows
    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  "));
    }
}

/// Render a file list as a NAME/BYTES table.
pub fn file_table(files: &[ResolvedFile]) {
    let rows = files
        .iter()
        .map(|f| vec![f.name.clone(), f.content.len().to_string()])
        .collect();
    print_table(&["NAME", "BYTES"], rows);
}

/// Materialize extracted files under `dir`, returning how many were written.
///
/// Files still waiting on a name and names that would land outside `dir` are
/// skipped with a warning instead of failing the whole batch.
pub fn write_files(dir: &Path, files: &[ResolvedFile]) -> anyhow::Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = 0usize;
    for file in files {
        if file.needs_name() {
            eprintln!("skipping a file with no resolvable name (use --json to inspect it)");
            continue;
        }
        let Some(rel) = safe_relative(&file.name) else {
            eprintln!(
                "skipping '{}': path would escape the output directory",
                file.name
            );
            continue;
        };
        let target = dir.join(rel);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        atomic_write(&target, file.content.as_bytes())
            .with_context(|| format!("failed to write {}", target.display()))?;
        written += 1;
    }
    Ok(written)
}

/// Reject absolute paths, drive prefixes and parent-directory traversal.
fn safe_relative(name: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        None
    } else {
        Some(clean)
    }
}
