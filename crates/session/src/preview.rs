//! Preview renderer with sticky last-good output.
//!
//! The preview only changes on a successful evaluation. Compile and runtime
//! errors leave whatever is mounted in place; a mount failure is shown as an
//! error state that still carries the last good HTML.

use livecode_eval::EvaluationResult;
use serde::Serialize;
use std::fmt::Write;

use crate::mount::{escape_text, mount};

/// Shown before the first successful render.
pub const PLACEHOLDER_TEXT: &str = "Upload a design to see the generated component here.";

const DOCUMENT_STYLES: &str = "html,body{margin:0;font-family:ui-sans-serif,system-ui,sans-serif;}\
body{padding:1rem;color:#0f172a;background:#fff;}\
.livecode-placeholder{color:#64748b;text-align:center;padding:3rem 1rem;}\
.livecode-mount-error{border:1px solid #fecaca;background:#fef2f2;color:#b91c1c;padding:.5rem .75rem;margin-bottom:1rem;border-radius:.375rem;font-size:.875rem;}";

/// Content security policy for the preview document: no scripts, no network
/// fetches beyond images.
const DOCUMENT_CSP: &str = "default-src 'none'; style-src 'unsafe-inline'; img-src data: https:; font-src data:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PreviewState {
    Placeholder,
    Mounted { html: String },
    MountFailed {
        message: String,
        last_good: Option<String>,
    },
}

#[derive(Debug)]
pub struct PreviewRenderer {
    state: PreviewState,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        PreviewRenderer::new()
    }
}

impl PreviewRenderer {
    pub fn new() -> Self {
        PreviewRenderer {
            state: PreviewState::Placeholder,
        }
    }

    /// Mount a successful result; error results leave the surface untouched.
    pub fn render(&mut self, result: &EvaluationResult) {
        let EvaluationResult::Success(tree) = result else {
            tracing::debug!(outcome = result.outcome(), "preview kept last good render");
            return;
        };
        match mount(tree) {
            Ok(html) => {
                tracing::debug!(bytes = html.len(), "preview mounted");
                self.state = PreviewState::Mounted { html };
            }
            Err(err) => {
                tracing::warn!(error = %err, "preview mount failed");
                let last_good = self.mounted_html().map(str::to_string);
                self.state = PreviewState::MountFailed {
                    message: err.to_string(),
                    last_good,
                };
            }
        }
    }

    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    /// The HTML currently visible, if any.
    pub fn mounted_html(&self) -> Option<&str> {
        match &self.state {
            PreviewState::Placeholder => None,
            PreviewState::Mounted { html } => Some(html),
            PreviewState::MountFailed { last_good, .. } => last_good.as_deref(),
        }
    }

    /// Drop everything mounted and show the placeholder again.
    pub fn reset(&mut self) {
        self.state = PreviewState::Placeholder;
    }

    /// A standalone document for an iframe `srcdoc`.
    pub fn document(&self) -> String {
        let mut body = String::new();
        if let PreviewState::MountFailed { message, .. } = &self.state {
            let _ = writeln!(
                body,
                "<div class=\"livecode-mount-error\" role=\"alert\">{}</div>",
                escape_text(message)
            );
        }
        match self.mounted_html() {
            Some(html) => body.push_str(html),
            None => {
                let _ = write!(
                    body,
                    "<div class=\"livecode-placeholder\">{}</div>",
                    PLACEHOLDER_TEXT
                );
            }
        }
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta http-equiv="Content-Security-Policy" content="{}">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Preview</title>
<style>{}</style>
</head>
<body>
{}
</body>
</html>
"#,
            DOCUMENT_CSP, DOCUMENT_STYLES, body
        )
    }
}
