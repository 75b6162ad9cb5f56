//! Shared server state: the one session plus its collaborators.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use livecode_eval::{SandboxLimits, ScopeBindings};
use livecode_session::{CodeGenerator, Orchestrator};
use tokio::sync::Mutex;

/// Application state shared across request handlers.
pub(crate) struct AppState {
    /// The single live session. Locked for the duration of each transition.
    pub(crate) session: Arc<Mutex<Orchestrator>>,
    pub(crate) generator: Arc<dyn CodeGenerator>,
    /// Scope used by the stateless `/evaluate` route.
    pub(crate) scope: ScopeBindings,
    pub(crate) limits: SandboxLimits,
    /// Optional API key for authentication. None = no auth required.
    pub(crate) api_key: Option<String>,
    /// Zero evaluates each edit immediately.
    pub(crate) debounce: Duration,
    edits: AtomicU64,
}

impl AppState {
    pub(crate) fn new(
        generator: Arc<dyn CodeGenerator>,
        scope: ScopeBindings,
        limits: SandboxLimits,
        api_key: Option<String>,
        debounce: Duration,
    ) -> Self {
        AppState {
            session: Arc::new(Mutex::new(Orchestrator::new(scope.clone(), limits))),
            generator,
            scope,
            limits,
            api_key,
            debounce,
            edits: AtomicU64::new(0),
        }
    }

    /// Number the next staged edit.
    pub(crate) fn next_edit(&self) -> u64 {
        self.edits.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// True when no edit was staged after `seq`.
    pub(crate) fn is_latest_edit(&self, seq: u64) -> bool {
        self.edits.load(Ordering::SeqCst) == seq
    }
}
