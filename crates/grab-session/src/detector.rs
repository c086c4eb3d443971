use serde::Serialize;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::session::CaptureOptions;
use crate::surface::Surface;

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Lifecycle of a single capture session, advanced by [`await_completion`].
///
/// Transitions only move forward except for the settle bounce: activity
/// during `Settling` drops the session back to `Generating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Prompt delivered, nothing observed yet.
    WaitingToStart,
    /// Output is growing or the producer reports itself busy.
    Generating,
    /// Output stopped changing; waiting out the quiet period.
    Settling,
    /// Terminal. Reached once per session, no matter how many sensors fire.
    Complete,
}

/// How a session reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Completion {
    /// Output settled and the quiet period elapsed.
    Settled,
    /// The producer never started. Reported as a normal, empty completion
    /// rather than an error.
    StartTimeout,
    /// The caller cancelled the session mid-flight.
    Cancelled,
    /// The hard session bound fired. Sessions surface this to callers as a
    /// timeout failure carrying whatever was collected so far.
    HardTimeout,
}

impl Completion {
    pub fn as_str(self) -> &'static str {
        match self {
            Completion::Settled => "settled",
            Completion::StartTimeout => "start-timeout",
            Completion::Cancelled => "cancelled",
            Completion::HardTimeout => "hard-timeout",
        }
    }
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sensing loop
// ---------------------------------------------------------------------------

/// Drive the completion state machine over a delivered surface.
///
/// Senses two ways at once: revision events from the surface wake the loop
/// immediately, while a steady poll covers producers whose busy flag is the
/// only signal. `hard_deadline` comes from the caller, so the bound spans
/// the whole session rather than restarting here. `on_settle` runs with the
/// current snapshot every time the session enters `Settling`, so callers
/// can extract interim results that might scroll out of view before the
/// final snapshot.
pub(crate) async fn await_completion(
    surface: &dyn Surface,
    opts: &CaptureOptions,
    cancel: &CancellationToken,
    hard_deadline: Instant,
    mut on_settle: impl FnMut(&str),
) -> Completion {
    let started = Instant::now();

    let mut revisions = surface.revisions();
    // interval() panics on a zero period.
    let poll = opts.poll_interval.max(std::time::Duration::from_millis(1));
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut phase = Phase::WaitingToStart;
    let mut last_len = surface.snapshot().len();
    let mut settle_deadline = started;
    let mut events_open = true;

    loop {
        let phase_deadline = match phase {
            Phase::WaitingToStart => Some(started + opts.start_timeout),
            Phase::Settling => Some(settle_deadline),
            _ => None,
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(?phase, "session cancelled");
                return Completion::Cancelled;
            }
            _ = sleep_until(hard_deadline) => {
                debug!(?phase, "hard session bound reached");
                return Completion::HardTimeout;
            }
            changed = revisions.changed(), if events_open => {
                match changed {
                    Ok(()) => {
                        let len = surface.snapshot().len();
                        if len != last_len {
                            last_len = len;
                            note_activity(&mut phase, "revision event");
                        } else if phase == Phase::WaitingToStart && surface.busy() {
                            // A bare nudge with no new content still counts as
                            // a start signal when the producer says it is busy.
                            note_activity(&mut phase, "busy nudge");
                        }
                    }
                    // Sender side gone; polling remains the only sensor.
                    Err(_) => events_open = false,
                }
            }
            _ = ticker.tick() => {
                let len = surface.snapshot().len();
                let grew = len != last_len;
                last_len = len;
                if grew {
                    note_activity(&mut phase, "poll saw new output");
                } else if surface.busy() {
                    note_activity(&mut phase, "producer busy");
                } else if phase == Phase::Generating {
                    phase = Phase::Settling;
                    settle_deadline = Instant::now() + opts.settle_quiet;
                    debug!("output quiet, settling");
                    on_settle(&surface.snapshot());
                }
            }
            _ = deadline_sleep(phase_deadline) => {
                if phase == Phase::WaitingToStart {
                    debug!("no output before the start bound");
                    return Completion::StartTimeout;
                }
                debug!("quiet period held, complete");
                return Completion::Settled;
            }
        }
    }
}

/// Move the phase forward on any sign of producer activity. Busy alone keeps
/// a generating session generating; only quiet output lets it settle.
fn note_activity(phase: &mut Phase, what: &str) {
    match *phase {
        Phase::WaitingToStart => {
            debug!(what, "producer started");
            *phase = Phase::Generating;
        }
        Phase::Settling => {
            debug!(what, "activity while settling, back to generating");
            *phase = Phase::Generating;
        }
        _ => {}
    }
}

/// Sleep until `deadline`, or forever when the current phase has none.
async fn deadline_sleep(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}
