use serde::{Deserialize, Serialize};

/// Which compilation stage rejected the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileStage {
    Lex,
    Parse,
    Resolve,
    Link,
}

/// A compile error: the source does not lex, parse, or resolve against the
/// preview scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (line {line}, column {column})")]
pub struct CompileError {
    pub stage: CompileStage,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl CompileError {
    pub fn new(stage: CompileStage, line: u32, column: u32, message: impl Into<String>) -> Self {
        CompileError {
            stage,
            line,
            column,
            message: message.into(),
        }
    }

    pub fn lex(line: u32, column: u32, message: impl Into<String>) -> Self {
        CompileError::new(CompileStage::Lex, line, column, message)
    }

    pub fn parse(line: u32, column: u32, message: impl Into<String>) -> Self {
        CompileError::new(CompileStage::Parse, line, column, message)
    }

    pub fn resolve(line: u32, column: u32, message: impl Into<String>) -> Self {
        CompileError::new(CompileStage::Resolve, line, column, message)
    }

    pub fn link(line: u32, column: u32, message: impl Into<String>) -> Self {
        CompileError::new(CompileStage::Link, line, column, message)
    }

    /// Serialize with every field present, for CLI and HTTP error bodies.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "column":  self.column,
            "line":    self.line,
            "message": self.message,
            "stage":   self.stage,
        })
    }
}
