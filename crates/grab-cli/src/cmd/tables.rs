use std::path::Path;

use anyhow::Context;
use clap::Subcommand;

use grab_core::{Heuristics, WarnLevel};

use crate::output::print_json;
use crate::tables::{resolve_tables, tables_path};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TablesSubcommand {
    /// Write the built-in tables to a file for editing
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check the tables for common mistakes
    Validate,

    /// Print the effective tables as YAML
    Show,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(tables: Option<&Path>, subcmd: TablesSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TablesSubcommand::Init { force } => init(tables, force),
        TablesSubcommand::Validate => validate(tables, json),
        TablesSubcommand::Show => show(tables),
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn init(tables: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = tables_path(tables);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    Heuristics::default()
        .save(&path)
        .context("failed to write tables")?;
    println!("Wrote default tables to {}.", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(tables: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let heuristics = resolve_tables(tables)?;
    let warnings = heuristics.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Tables are valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("tables validation found errors");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(tables: Option<&Path>) -> anyhow::Result<()> {
    let heuristics = resolve_tables(tables)?;
    print!("{}", serde_yaml::to_string(&heuristics)?);
    Ok(())
}
