use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::SurfaceError;
use crate::surface::{Prompt, SharedOutput, Surface};

// ---------------------------------------------------------------------------
// ProcessSurface
// ---------------------------------------------------------------------------

/// Live adapter that runs a producer as a child process.
///
/// Delivery spawns the child and returns at once; a background writer feeds
/// the prompt into its stdin and closes the handle so the producer sees end
/// of input as the submit signal. Stdout accumulates line by line into the
/// observable snapshot; the surface reports busy from delivery until stdout
/// reaches end of file. Stderr is drained into a side buffer for
/// diagnostics. Image attachments cannot be forwarded over a pipe and are
/// ignored with a warning.
pub struct ProcessSurface {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
    shared: Arc<SharedOutput>,
    stderr_buf: Arc<Mutex<String>>,
}

impl ProcessSurface {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            child: None,
            shared: SharedOutput::new(),
            stderr_buf: Arc::new(Mutex::new(String::new())),
        }
    }

    /// Everything the producer wrote to stderr so far.
    pub fn stderr_output(&self) -> String {
        self.stderr_buf
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl Surface for ProcessSurface {
    fn label(&self) -> &str {
        "process"
    }

    async fn deliver(&mut self, prompt: &Prompt) -> Result<(), SurfaceError> {
        if !prompt.images.is_empty() {
            warn!(
                count = prompt.images.len(),
                "process surface cannot forward image attachments, ignoring"
            );
        }

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                SurfaceError::ProducerUnreachable(format!(
                    "failed to spawn {}: {err}",
                    self.program
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SurfaceError::MissingInput("child stdin was not captured".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| {
            SurfaceError::ProducerUnreachable("child stdout was not captured".into())
        })?;

        if let Some(stderr) = child.stderr.take() {
            let buf = Arc::clone(&self.stderr_buf);
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let mut guard = buf
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    guard.push_str(&line);
                    guard.push('\n');
                }
            });
        }

        self.shared.set_busy(true);
        // The reader starts before the prompt write so a producer that talks
        // before reading its stdin cannot wedge both pipes at once.
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                shared.append(&line);
                shared.append("\n");
            }
            shared.set_busy(false);
            // Wake any watcher so it re-checks the busy flag promptly.
            shared.nudge();
        });

        // The prompt goes out on its own task; a producer slow to read its
        // stdin must not park delivery while the session clock runs. A failed
        // write shows up downstream as a producer that never speaks.
        let mut text = prompt.text.clone();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(text.as_bytes()).await {
                warn!(%err, "writing prompt to producer stdin failed");
            } else if let Err(err) = stdin.flush().await {
                warn!(%err, "flushing prompt to producer stdin failed");
            }
            // Dropping stdin closes the pipe; end of input is the submit
            // signal.
        });

        self.child = Some(child);
        debug!(program = %self.program, "producer process started");
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
        if let Some(mut child) = self.child.take() {
            // kill() also reaps, so an already-exited child is fine here.
            let _ = child.kill().await;
            debug!(program = %self.program, "producer process stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    async fn wait_until_idle(surface: &ProcessSurface) {
        for _ in 0..200 {
            if !surface.busy() && !surface.snapshot().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("producer never went idle");
    }

    #[tokio::test]
    async fn echoes_stdin_into_the_snapshot() {
        let mut surface = ProcessSurface::new("cat", vec![]);
        surface
            .deliver(&Prompt::new("hello producer"))
            .await
            .unwrap();
        wait_until_idle(&surface).await;
        assert_eq!(surface.snapshot(), "hello producer\n");
        surface.shutdown().await;
    }

    #[tokio::test]
    async fn delivery_returns_before_the_producer_reads_stdin() {
        // A prompt past the OS pipe buffer against a producer that never
        // reads its stdin; delivery must come back anyway.
        let started = Instant::now();
        let mut surface = ProcessSurface::new("sh", vec!["-c".into(), "sleep 5".into()]);
        surface
            .deliver(&Prompt::new("x".repeat(1024 * 1024)))
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(surface.busy());
        surface.shutdown().await;
    }

    #[tokio::test]
    async fn spawn_failure_is_producer_unreachable() {
        let mut surface = ProcessSurface::new("definitely-not-a-real-binary-a3f1", vec![]);
        let err = surface.deliver(&Prompt::new("go")).await.unwrap_err();
        assert!(matches!(err, SurfaceError::ProducerUnreachable(_)));
        surface.shutdown().await;
    }

    #[tokio::test]
    async fn output_bumps_the_revision_counter() {
        let mut surface = ProcessSurface::new(
            "sh",
            vec!["-c".into(), "cat >/dev/null; echo one; echo two".into()],
        );
        let rx = surface.revisions();
        surface.deliver(&Prompt::new("go")).await.unwrap();
        wait_until_idle(&surface).await;
        assert_eq!(surface.snapshot(), "one\ntwo\n");
        assert!(*rx.borrow() >= 2);
        surface.shutdown().await;
    }

    #[tokio::test]
    async fn stderr_lands_in_the_side_buffer() {
        let mut surface = ProcessSurface::new(
            "sh",
            vec!["-c".into(), "cat >/dev/null; echo oops >&2; echo ok".into()],
        );
        surface.deliver(&Prompt::new("go")).await.unwrap();
        wait_until_idle(&surface).await;
        // Stderr is drained by an independent task; give it a beat.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(surface.stderr_output(), "oops\n");
        assert_eq!(surface.snapshot(), "ok\n");
        surface.shutdown().await;
    }
}
