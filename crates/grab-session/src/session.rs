use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use grab_core::{Pipeline, ResolvedFile, SeenBlocks};

use crate::detector::{self, Completion};
use crate::error::CaptureFailure;
use crate::surface::{Prompt, Surface};

// ---------------------------------------------------------------------------
// CaptureOptions
// ---------------------------------------------------------------------------

/// Timing knobs for one capture session.
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// How long the producer gets to show any sign of life before the
    /// session completes empty. Default 10 s.
    pub start_timeout: Duration,
    /// Quiet period the output must hold before the session settles.
    /// Default 1.5 s.
    pub settle_quiet: Duration,
    /// Cadence of the busy/snapshot poll backing up revision events.
    /// Default 400 ms.
    pub poll_interval: Duration,
    /// Hard bound on the whole session. Hitting it is a failure that still
    /// carries partial results. Default 5 min.
    pub hard_timeout: Duration,
    /// Cooperative cancellation; cancelling completes the session early with
    /// whatever was collected.
    pub cancel: CancellationToken,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            start_timeout: Duration::from_secs(10),
            settle_quiet: Duration::from_millis(1500),
            poll_interval: Duration::from_millis(400),
            hard_timeout: Duration::from_secs(300),
            cancel: CancellationToken::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureReport
// ---------------------------------------------------------------------------

/// Outcome of a completed capture session.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    pub session_id: String,
    pub completion: Completion,
    /// Extracted artifacts in the order they were first seen.
    pub files: Vec<ResolvedFile>,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Drive one prompt through a surface to completion and collect the files
/// its output contained.
///
/// Delivers the prompt, senses the surface until the completion detector
/// fires, then runs a final extraction pass over the last snapshot. The
/// cancellation token and the hard bound cover every phase, delivery
/// included, so the call always resolves. The pipeline deduplicates across
/// the interim and final passes, so a block is reported once no matter how
/// many snapshots it appeared in. The surface is shut down before this
/// returns, on every path.
///
/// A start timeout or cancellation is a normal completion; only delivery
/// failures and the hard session bound surface as [`CaptureFailure`].
///
/// # Example
///
/// ```rust,ignore
/// use grab_core::{Heuristics, Pipeline};
/// use grab_session::{capture, CaptureOptions, ProcessSurface, Prompt};
///
/// let pipeline = Pipeline::new(&Heuristics::default())?;
/// let mut surface = ProcessSurface::new("producer", vec!["--plain".into()]);
/// let prompt = Prompt::new("generate the scaffolding files");
/// let report = capture(&mut surface, &prompt, &pipeline, &CaptureOptions::default()).await?;
/// for file in &report.files {
///     println!("{} ({} bytes)", file.name, file.content.len());
/// }
/// ```
pub async fn capture(
    surface: &mut dyn Surface,
    prompt: &Prompt,
    pipeline: &Pipeline,
    opts: &CaptureOptions,
) -> Result<CaptureReport, CaptureFailure> {
    let session_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    let hard_deadline = started + opts.hard_timeout;
    debug!(session = %session_id, surface = surface.label(), "delivering prompt");

    // Delivery races the same bounds as the sensing loop; a surface that
    // stalls in deliver cannot hold the session open.
    let early = tokio::select! {
        delivered = surface.deliver(prompt) => {
            if let Err(err) = delivered {
                surface.shutdown().await;
                warn!(session = %session_id, %err, "prompt delivery failed");
                return Err(CaptureFailure::new(err.reason()));
            }
            None
        }
        _ = opts.cancel.cancelled() => Some(Completion::Cancelled),
        _ = sleep_until(hard_deadline) => Some(Completion::HardTimeout),
    };

    let mut seen = SeenBlocks::new();
    let mut files: Vec<ResolvedFile> = Vec::new();
    let completion = match early {
        Some(completion) => completion,
        None => {
            let on_settle = |snapshot: &str| {
                files.extend(pipeline.process_snapshot(snapshot, &mut seen));
            };
            detector::await_completion(&*surface, opts, &opts.cancel, hard_deadline, on_settle)
                .await
        }
    };

    // Final pass over whatever the surface shows now. For settled sessions
    // this usually finds nothing new; for timeouts and cancellations it is
    // where the partial results come from.
    let tail = surface.snapshot();
    files.extend(pipeline.process_snapshot(&tail, &mut seen));
    surface.shutdown().await;

    let duration_ms = started.elapsed().as_millis() as u64;
    match completion {
        Completion::HardTimeout => {
            warn!(
                session = %session_id,
                files = files.len(),
                duration_ms,
                "hard timeout, reporting partial results"
            );
            Err(CaptureFailure::timeout(files))
        }
        completion => {
            info!(
                session = %session_id,
                files = files.len(),
                ?completion,
                duration_ms,
                "capture finished"
            );
            Ok(CaptureReport {
                session_id,
                completion,
                files,
                duration_ms,
            })
        }
    }
}
