//! Session state machine.
//!
//! ```text
//! Idle -> Generating -> Ready -> Editing -> Ready ...
//! any  -> Failed ; Failed -> Idle (acknowledge) | Generating (upload)
//! ```
//!
//! The orchestrator never performs I/O. Hosts call [`Orchestrator::upload`]
//! to obtain a [`GenerationTicket`], run the generator request themselves,
//! and hand the outcome back through [`Orchestrator::complete_generation`].
//! Only the most recently issued ticket is honoured.

use livecode_core::{normalize, CanonicalSource, RawGeneration};
use livecode_eval::{evaluate_with, EvaluationResult, SandboxLimits, ScopeBindings};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::editor::{EditError, EditOp, EditorView, LiveEditor};
use crate::generator::GenerationError;
use crate::image::ImageInput;
use crate::preview::{PreviewRenderer, PreviewState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Generating,
    Ready,
    Editing,
    Failed { message: String },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Generating => "generating",
            SessionState::Ready => "ready",
            SessionState::Editing => "editing",
            SessionState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GenerationTicket(u64);

impl GenerationTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GenerationTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Applied,
    /// The ticket was superseded; nothing changed.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Serializable summary of the whole session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub source: Option<String>,
    pub staged: Option<String>,
    pub pending_ticket: Option<GenerationTicket>,
    pub result: Option<EvaluationResult>,
    /// Caret excerpt of the failing line when the latest evaluation failed,
    /// or the mount error when its output could not be shown.
    pub excerpt: Option<String>,
    pub preview: PreviewState,
}

#[derive(Debug)]
pub struct Orchestrator {
    scope: ScopeBindings,
    limits: SandboxLimits,
    state: SessionState,
    source: Option<CanonicalSource>,
    staged: Option<String>,
    last_result: Option<EvaluationResult>,
    preview: PreviewRenderer,
    issued: u64,
    pending: Option<GenerationTicket>,
}

impl Orchestrator {
    pub fn new(scope: ScopeBindings, limits: SandboxLimits) -> Self {
        Orchestrator {
            scope,
            limits,
            state: SessionState::Idle,
            source: None,
            staged: None,
            last_result: None,
            preview: PreviewRenderer::new(),
            issued: 0,
            pending: None,
        }
    }

    /// Start a generation. Any outstanding ticket is superseded.
    pub fn upload(&mut self, image: &ImageInput) -> GenerationTicket {
        self.issued += 1;
        let ticket = GenerationTicket(self.issued);
        if let Some(old) = self.pending.replace(ticket) {
            tracing::info!(superseded = %old, %ticket, "generation superseded");
        }
        self.staged = None;
        tracing::info!(%ticket, mime = image.mime(), "upload accepted");
        self.transition(SessionState::Generating);
        ticket
    }

    /// Feed back the outcome of the request identified by `ticket`.
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: Result<RawGeneration, GenerationError>,
    ) -> Completion {
        if self.pending != Some(ticket) {
            tracing::warn!(
                %ticket,
                pending = ?self.pending.map(GenerationTicket::id),
                "discarding stale generation response"
            );
            return Completion::Discarded;
        }
        self.pending = None;
        self.preview.reset();
        match outcome {
            Ok(raw) => {
                let canonical = normalize(&raw.text);
                tracing::info!(%ticket, bytes = canonical.len(), "generation received");
                let result = self.run(&canonical);
                self.source = Some(canonical);
                self.last_result = Some(result);
                self.transition(SessionState::Ready);
            }
            Err(err) => {
                tracing::warn!(%ticket, error = %err, "generation failed");
                self.source = None;
                self.last_result = None;
                self.transition(SessionState::Failed {
                    message: err.to_string(),
                });
            }
        }
        Completion::Applied
    }

    /// Replace the source with `source`, evaluate it, and update the preview.
    pub fn edit(&mut self, source: String) -> Result<&EvaluationResult, SessionError> {
        self.require_editable("edit")?;
        self.staged = None;
        self.transition(SessionState::Editing);
        Ok(self.apply_edit(source))
    }

    /// Store `source` without evaluating it; [`flush`](Self::flush) applies it.
    pub fn stage_edit(&mut self, source: String) -> Result<(), SessionError> {
        self.require_editable("stage an edit")?;
        self.staged = Some(source);
        self.transition(SessionState::Editing);
        Ok(())
    }

    /// The full text that results from applying `op` to what the editor
    /// currently shows (staged text first, then the committed source).
    pub fn text_after(&self, op: &EditOp) -> Result<String, SessionError> {
        self.require_editable("edit")?;
        let current = self.editor_view().map_or("", |v| v.source);
        Ok(LiveEditor::apply(current, op)?)
    }

    /// Evaluate the staged edit, if any.
    pub fn flush(&mut self) -> Result<Option<&EvaluationResult>, SessionError> {
        self.require_editable("flush")?;
        match self.staged.take() {
            Some(source) => Ok(Some(self.apply_edit(source))),
            None => Ok(None),
        }
    }

    pub fn acknowledge(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, SessionState::Failed { .. }) {
            return Err(SessionError::InvalidState {
                operation: "acknowledge",
                state: self.state.name(),
            });
        }
        self.transition(SessionState::Idle);
        Ok(())
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_ref().map(CanonicalSource::as_str)
    }

    pub fn last_result(&self) -> Option<&EvaluationResult> {
        self.last_result.as_ref()
    }

    pub fn preview(&self) -> &PreviewRenderer {
        &self.preview
    }

    pub fn pending_ticket(&self) -> Option<GenerationTicket> {
        self.pending
    }

    pub fn scope(&self) -> &ScopeBindings {
        &self.scope
    }

    /// What the editor shows. `None` while there is no source to edit.
    /// Staged text is shown without a diagnostic until it is flushed.
    pub fn editor_view(&self) -> Option<EditorView<'_>> {
        if let Some(staged) = &self.staged {
            return Some(EditorView {
                source: staged,
                diagnostic: None,
                mount_error: None,
            });
        }
        let mount_error = match (self.preview.state(), &self.last_result) {
            (PreviewState::MountFailed { message, .. }, Some(EvaluationResult::Success(_))) => {
                Some(message.as_str())
            }
            _ => None,
        };
        Some(EditorView {
            source: self.source()?,
            diagnostic: self.last_result.as_ref().and_then(EvaluationResult::diagnostic),
            mount_error,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            source: self.source().map(str::to_string),
            staged: self.staged.clone(),
            pending_ticket: self.pending,
            result: self.last_result.clone(),
            excerpt: self.editor_view().and_then(|v| v.excerpt()),
            preview: self.preview.state().clone(),
        }
    }

    fn require_editable(&self, operation: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready | SessionState::Editing => Ok(()),
            _ => Err(SessionError::InvalidState {
                operation,
                state: self.state.name(),
            }),
        }
    }

    fn apply_edit(&mut self, source: String) -> &EvaluationResult {
        let canonical = CanonicalSource::from_edit(source);
        let result = self.run(&canonical);
        self.source = Some(canonical);
        self.transition(SessionState::Ready);
        self.last_result.insert(result)
    }

    /// Evaluate and hand the result to the preview.
    fn run(&mut self, source: &CanonicalSource) -> EvaluationResult {
        let started = Instant::now();
        let result = evaluate_with(source.as_str(), &self.scope, &self.limits);
        tracing::debug!(
            outcome = result.outcome(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "evaluated session source"
        );
        self.preview.render(&result);
        result
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::info!(from = self.state.name(), to = next.name(), "session transition");
        }
        self.state = next;
    }
}
