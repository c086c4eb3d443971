//! Session driving for generative producers.
//!
//! `grab-core` decides *what* a snapshot of producer output contains; this
//! crate decides *when* that output is finished. A session delivers one
//! prompt into a [`Surface`], senses the surface until the completion
//! detector fires (revision events plus busy polling, debounced by a quiet
//! period and bounded by start and hard timeouts), runs the extraction
//! pipeline over the snapshots, and reports the resolved files.
//!
//! Two adapters ship in the box: [`ProcessSurface`] drives a child process
//! over pipes, and [`ScriptedSurface`] replays a canned timeline for tests
//! and demos. Anything that can satisfy the [`Surface`] contract can be
//! captured from.
//!
//! # Example
//!
//! ```rust,ignore
//! use grab_core::{Heuristics, Pipeline};
//! use grab_session::{capture, CaptureOptions, ProcessSurface, Prompt};
//!
//! let pipeline = Pipeline::new(&Heuristics::default())?;
//! let mut surface = ProcessSurface::new("producer", vec![]);
//! let report = capture(
//!     &mut surface,
//!     &Prompt::new("scaffold a vite app"),
//!     &pipeline,
//!     &CaptureOptions::default(),
//! )
//! .await?;
//! println!("{} files in {} ms", report.files.len(), report.duration_ms);
//! ```

mod detector;
mod error;
mod process;
mod script;
mod session;
mod surface;

pub use detector::{Completion, Phase};
pub use error::{CaptureFailure, FailureReason, SurfaceError};
pub use process::ProcessSurface;
pub use script::{ScriptStep, ScriptedSurface};
pub use session::{capture, CaptureOptions, CaptureReport};
pub use surface::{Prompt, Surface};
