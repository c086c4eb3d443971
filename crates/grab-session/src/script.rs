use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::SurfaceError;
use crate::surface::{Prompt, SharedOutput, Surface};

// ---------------------------------------------------------------------------
// ScriptStep
// ---------------------------------------------------------------------------

/// One step in a scripted producer timeline.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Pause the timeline.
    Wait(Duration),
    /// Append text to the visible output and bump the revision counter.
    Append(String),
    /// Flip the busy flag.
    Busy(bool),
}

// ---------------------------------------------------------------------------
// ScriptedSurface
// ---------------------------------------------------------------------------

/// Deterministic replay adapter: plays a fixed timeline of appends, pauses
/// and busy toggles instead of driving a live producer.
///
/// Playback starts when the prompt is delivered and runs on a background
/// task, so sessions observe the same growing-output behavior a real
/// producer exhibits. Useful for exercising completion timing without any
/// external process.
pub struct ScriptedSurface {
    shared: Arc<SharedOutput>,
    steps: Vec<ScriptStep>,
    fail_delivery: Option<SurfaceError>,
    stall_delivery: bool,
    player: Option<JoinHandle<()>>,
}

impl ScriptedSurface {
    /// Replay `steps` in order once the prompt lands.
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            shared: SharedOutput::new(),
            steps,
            fail_delivery: None,
            stall_delivery: false,
            player: None,
        }
    }

    /// A surface whose delivery fails with `err`, for exercising the error
    /// paths of a session.
    pub fn failing(err: SurfaceError) -> Self {
        Self {
            shared: SharedOutput::new(),
            steps: Vec::new(),
            fail_delivery: Some(err),
            stall_delivery: false,
            player: None,
        }
    }

    /// A surface whose delivery never returns, for exercising the outer
    /// session bounds.
    pub fn stalled() -> Self {
        Self {
            shared: SharedOutput::new(),
            steps: Vec::new(),
            fail_delivery: None,
            stall_delivery: true,
            player: None,
        }
    }
}

#[async_trait]
impl Surface for ScriptedSurface {
    fn label(&self) -> &str {
        "scripted"
    }

    async fn deliver(&mut self, _prompt: &Prompt) -> Result<(), SurfaceError> {
        if self.stall_delivery {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.fail_delivery.take() {
            return Err(err);
        }
        let steps = std::mem::take(&mut self.steps);
        let shared = Arc::clone(&self.shared);
        self.player = Some(tokio::spawn(async move {
            for step in steps {
                match step {
                    ScriptStep::Wait(pause) => tokio::time::sleep(pause).await,
                    ScriptStep::Append(text) => shared.append(&text),
                    ScriptStep::Busy(flag) => {
                        shared.set_busy(flag);
                        shared.nudge();
                    }
                }
            }
        }));
        Ok(())
    }

    fn snapshot(&self) -> String {
        self.shared.snapshot()
    }

    fn busy(&self) -> bool {
        self.shared.busy()
    }

    fn revisions(&self) -> watch::Receiver<u64> {
        self.shared.subscribe()
    }

    async fn shutdown(&mut self) {
        if let Some(player) = self.player.take() {
            player.abort();
        }
        self.shared.set_busy(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_appends_in_order() {
        let mut surface = ScriptedSurface::new(vec![
            ScriptStep::Busy(true),
            ScriptStep::Append("fn main() {\n".into()),
            ScriptStep::Wait(Duration::from_millis(20)),
            ScriptStep::Append("}\n".into()),
            ScriptStep::Busy(false),
        ]);
        assert_eq!(surface.snapshot(), "");
        surface.deliver(&Prompt::new("go")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(surface.snapshot(), "fn main() {\n}\n");
        assert!(!surface.busy());
        surface.shutdown().await;
    }

    #[tokio::test]
    async fn busy_flag_follows_the_script() {
        let mut surface = ScriptedSurface::new(vec![
            ScriptStep::Busy(true),
            ScriptStep::Wait(Duration::from_millis(50)),
            ScriptStep::Busy(false),
        ]);
        surface.deliver(&Prompt::new("go")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(surface.busy());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!surface.busy());
        surface.shutdown().await;
    }

    #[tokio::test]
    async fn stalled_surface_never_finishes_delivery() {
        let mut surface = ScriptedSurface::stalled();
        let prompt = Prompt::new("go");
        let delivery = surface.deliver(&prompt);
        let outcome = tokio::time::timeout(Duration::from_millis(50), delivery).await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn failing_surface_rejects_delivery() {
        let mut surface =
            ScriptedSurface::failing(SurfaceError::MissingInput("no prompt slot".into()));
        let err = surface.deliver(&Prompt::new("go")).await.unwrap_err();
        assert!(matches!(err, SurfaceError::MissingInput(_)));
        // The failure is consumed; a retry on the same surface is a plain
        // empty replay.
        assert!(surface.deliver(&Prompt::new("go")).await.is_ok());
    }
}
