//! livecode-session: the stateful half of the live preview.
//!
//! The [`Orchestrator`] owns the one live [`CanonicalSource`], drives the
//! evaluation sandbox on every edit, and feeds results to the
//! [`PreviewRenderer`], which keeps the last good render on screen. The
//! generator client and image encoding are thin collaborators used by hosts.
//!
//! # Public API
//!
//! - [`Orchestrator`] -- session state machine with generation tickets
//! - [`LiveEditor`], [`EditOp`], [`EditorView`] -- editing surface
//! - [`PreviewRenderer`], [`PreviewState`], [`mount()`] -- preview surface
//! - [`CodeGenerator`], [`HttpGenerator`] -- remote generator client
//! - [`ImageInput`] -- image file to data URL
//!
//! [`CanonicalSource`]: livecode_core::CanonicalSource

pub mod editor;
pub mod generator;
pub mod image;
pub mod mount;
pub mod orchestrator;
pub mod preview;

pub use editor::{EditError, EditOp, EditorView, LiveEditor};
pub use generator::{CodeGenerator, GenerationError, HttpGenerator};
pub use image::{ImageError, ImageInput};
pub use mount::{mount, MountError};
pub use orchestrator::{
    Completion, GenerationTicket, Orchestrator, SessionError, SessionSnapshot, SessionState,
};
pub use preview::{PreviewRenderer, PreviewState};
