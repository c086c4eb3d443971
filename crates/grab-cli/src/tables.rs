use std::path::{Path, PathBuf};

use anyhow::Context;

use grab_core::Heuristics;

/// Filename looked for in the working directory when `--tables` is not given.
pub const DEFAULT_TABLES_FILE: &str = "codegrab-tables.yaml";

/// Decide which heuristics tables to run with: an explicit path must load,
/// the default file is used when present, anything else falls back to the
/// built-ins.
pub fn resolve_tables(explicit: Option<&Path>) -> anyhow::Result<Heuristics> {
    if let Some(path) = explicit {
        return Heuristics::load(path)
            .with_context(|| format!("failed to load tables from {}", path.display()));
    }
    let default = PathBuf::from(DEFAULT_TABLES_FILE);
    if default.exists() {
        return Heuristics::load(&default)
            .with_context(|| format!("failed to load tables from {}", default.display()));
    }
    Ok(Heuristics::default())
}

/// The file `tables init` writes to.
pub fn tables_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TABLES_FILE))
}
