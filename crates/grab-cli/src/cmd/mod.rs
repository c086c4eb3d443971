pub mod extract;
pub mod normalize;
pub mod run;
pub mod tables;

use std::io::Read;
use std::path::Path;

use anyhow::Context;

/// Read command input from a file, or stdin when no path was given.
pub(crate) fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}
