use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use grab_core::Pipeline;
use grab_session::{capture, CaptureOptions, CaptureReport, ProcessSurface, Prompt};

use crate::output;
use crate::tables::resolve_tables;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

pub struct RunArgs {
    pub prompt: String,
    pub images: Vec<PathBuf>,
    pub start_timeout: u64,
    pub settle: u64,
    pub poll: u64,
    pub hard_timeout: u64,
    pub write: Option<PathBuf>,
    pub producer: Vec<String>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Spawn the producer command, capture its output to completion, and report
/// the extracted files.
pub fn run(tables: Option<&Path>, args: RunArgs, json: bool) -> anyhow::Result<()> {
    let heuristics = resolve_tables(tables)?;
    let pipeline = Pipeline::new(&heuristics).context("invalid heuristics tables")?;

    let opts = CaptureOptions {
        start_timeout: Duration::from_secs(args.start_timeout),
        settle_quiet: Duration::from_millis(args.settle),
        poll_interval: Duration::from_millis(args.poll),
        hard_timeout: Duration::from_secs(args.hard_timeout),
        cancel: CancellationToken::new(),
    };

    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    runtime.block_on(drive(&args, opts, &pipeline, json))
}

async fn drive(
    args: &RunArgs,
    opts: CaptureOptions,
    pipeline: &Pipeline,
    json: bool,
) -> anyhow::Result<()> {
    let (program, producer_args) = args
        .producer
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("no producer command given (pass it after --)"))?;
    let mut surface = ProcessSurface::new(program.clone(), producer_args.to_vec());
    let prompt = Prompt::new(args.prompt.clone()).with_images(args.images.clone());

    // Ctrl-C completes the session early with whatever was captured.
    let cancel = opts.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match capture(&mut surface, &prompt, pipeline, &opts).await {
        Ok(report) => emit_report(&report, args.write.as_deref(), json),
        Err(failure) => {
            let stderr_tail = surface.stderr_output();
            if !stderr_tail.is_empty() {
                eprintln!("producer stderr:\n{stderr_tail}");
            }
            if json {
                output::print_json(&serde_json::json!({
                    "reason": failure.reason,
                    "files": failure.partial,
                }))?;
            } else if !failure.partial.is_empty() {
                println!(
                    "captured {} file(s) before the session failed:",
                    failure.partial.len()
                );
                output::file_table(&failure.partial);
            }
            Err(failure.into())
        }
    }
}

fn emit_report(report: &CaptureReport, write: Option<&Path>, json: bool) -> anyhow::Result<()> {
    if let Some(dir) = write {
        let written = output::write_files(dir, &report.files)?;
        println!(
            "wrote {written} of {} file(s) under {} ({}, {} ms)",
            report.files.len(),
            dir.display(),
            report.completion,
            report.duration_ms
        );
        return Ok(());
    }

    if json {
        output::print_json(report)?;
    } else if report.files.is_empty() {
        println!(
            "No files captured ({}, {} ms).",
            report.completion, report.duration_ms
        );
    } else {
        output::file_table(&report.files);
        println!(
            "{} file(s), {} in {} ms",
            report.files.len(),
            report.completion,
            report.duration_ms
        );
    }
    Ok(())
}
