//! Live editor surface.
//!
//! The editor stores no text of its own. Hosts read an [`EditorView`] from
//! the orchestrator, turn keystroke-level [`EditOp`]s into the full new
//! source with [`LiveEditor::apply`], and hand that text back to the
//! orchestrator. Every change is forwarded; rate limiting is the host's
//! concern.

use livecode_eval::Diagnostic;
use serde::{Deserialize, Serialize};

/// One editing operation. Offsets count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    /// Replace the whole buffer.
    Replace { text: String },
    Insert { at: usize, text: String },
    /// Remove characters in `start..end`.
    Delete { start: usize, end: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("offset {offset} is past the end of the source ({len} characters)")]
    OutOfRange { offset: usize, len: usize },
    #[error("delete range {start}..{end} is inverted")]
    InvertedRange { start: usize, end: usize },
}

pub struct LiveEditor;

impl LiveEditor {
    /// Apply `op` to `current`, returning the complete new source.
    pub fn apply(current: &str, op: &EditOp) -> Result<String, EditError> {
        match op {
            EditOp::Replace { text } => Ok(text.clone()),
            EditOp::Insert { at, text } => {
                let idx = byte_offset(current, *at)?;
                let mut out = String::with_capacity(current.len() + text.len());
                out.push_str(&current[..idx]);
                out.push_str(text);
                out.push_str(&current[idx..]);
                Ok(out)
            }
            EditOp::Delete { start, end } => {
                if start > end {
                    return Err(EditError::InvertedRange {
                        start: *start,
                        end: *end,
                    });
                }
                let (a, b) = (byte_offset(current, *start)?, byte_offset(current, *end)?);
                Ok(format!("{}{}", &current[..a], &current[b..]))
            }
        }
    }
}

fn byte_offset(s: &str, chars: usize) -> Result<usize, EditError> {
    if chars == 0 {
        return Ok(0);
    }
    match s.char_indices().nth(chars) {
        Some((idx, _)) => Ok(idx),
        None => {
            let len = s.chars().count();
            if chars == len {
                Ok(s.len())
            } else {
                Err(EditError::OutOfRange { offset: chars, len })
            }
        }
    }
}

/// Borrowed snapshot of what the editor shows.
#[derive(Debug, Clone, Copy)]
pub struct EditorView<'a> {
    pub source: &'a str,
    /// Present when the latest evaluation failed.
    pub diagnostic: Option<&'a Diagnostic>,
    /// Set when the source evaluated but its output could not be mounted.
    pub mount_error: Option<&'a str>,
}

impl<'a> EditorView<'a> {
    /// The offending line followed by a caret under the reported column.
    /// A mount failure has no position and is reported as a single line.
    pub fn excerpt(&self) -> Option<String> {
        let Some(diagnostic) = self.diagnostic else {
            return self.mount_error.map(|m| format!("mount error: {}", m));
        };
        let line_no = diagnostic.line? as usize;
        let line = self.source.lines().nth(line_no.checked_sub(1)?)?;
        let column = diagnostic.column.unwrap_or(1).max(1) as usize;
        let gutter = format!("{} | ", line_no);
        let pad: String = line
            .chars()
            .take(column - 1)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        Some(format!(
            "{}{}\n{}{}^",
            gutter,
            line,
            " ".repeat(gutter.len()),
            pad
        ))
    }

    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }
}
