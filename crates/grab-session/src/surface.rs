use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::SurfaceError;

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// One outbound instruction for a producer.
#[derive(Debug, Clone, Default)]
pub struct Prompt {
    pub text: String,
    /// Attachment paths. Adapters that cannot forward images ignore them.
    pub images: Vec<PathBuf>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<PathBuf>) -> Self {
        self.images = images;
        self
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// Capability contract for one producing surface.
///
/// A session holds exactly one surface, delivers a single prompt into it,
/// then senses the surface two ways until completion: by awaiting revision
/// events and by polling [`Surface::snapshot`] / [`Surface::busy`]. The
/// surface never interprets output; extraction happens downstream on whole
/// snapshots, so a surface only has to make the current rendering readable.
#[async_trait]
pub trait Surface: Send {
    /// Short adapter label for logs.
    fn label(&self) -> &str;

    /// Put the prompt in front of the producer and trigger generation.
    /// Called exactly once per session.
    async fn deliver(&mut self, prompt: &Prompt) -> Result<(), SurfaceError>;

    /// Current full rendering of the producer's output.
    fn snapshot(&self) -> String;

    /// Whether the producer currently reports itself working.
    fn busy(&self) -> bool;

    /// Revision counter bumped whenever the observable output changes.
    /// Watchers treat a bump as "re-read the snapshot", nothing more.
    fn revisions(&self) -> watch::Receiver<u64>;

    /// Tear the surface down: kill child processes, close handles. Must be
    /// safe to call after the producer already exited.
    async fn shutdown(&mut self);
}

// ---------------------------------------------------------------------------
// SharedOutput
// ---------------------------------------------------------------------------

/// Observable output state shared between an adapter and its background
/// writer tasks.
pub(crate) struct SharedOutput {
    output: Mutex<String>,
    busy: AtomicBool,
    revision: watch::Sender<u64>,
}

impl SharedOutput {
    pub(crate) fn new() -> Arc<Self> {
        let (revision, _) = watch::channel(0u64);
        Arc::new(Self {
            output: Mutex::new(String::new()),
            busy: AtomicBool::new(false),
            revision,
        })
    }

    pub(crate) fn append(&self, text: &str) {
        self.lock().push_str(text);
        self.revision.send_modify(|rev| *rev += 1);
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    pub(crate) fn busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> String {
        self.lock().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Bump the revision without touching content, waking watchers that need
    /// to re-check the busy flag.
    pub(crate) fn nudge(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        // A poisoned lock only means a writer task panicked mid-append; the
        // text itself is still valid.
        self.output
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
