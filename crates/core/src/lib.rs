//! livecode-core: source normalizer and component-source front end.
//!
//! Generator output is turned into canonical source by [`normalize()`].
//! Canonical source is compiled by [`compile()`], which lexes, parses, and
//! resolves it against a set of host-provided global names.
//!
//! # Public API
//!
//! - [`normalize()`] -- fence stripping plus harness append
//! - [`compile()`] -- lexer, parser, and resolve pass in one call
//! - [`CompileError`] -- positioned diagnostic from any front-end stage
//! - AST types under [`ast`]

pub mod ast;
pub mod error;
pub mod lexer;
pub mod normalize;
pub mod parser;
pub mod resolve;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::Program;
pub use error::{CompileError, CompileStage};
pub use normalize::{
    body_of, has_harness, normalize, strip_fences, CanonicalSource, RawGeneration, FENCE_MARKERS,
    HARNESS, HARNESS_VERSION, ROOT_COMPONENT,
};
pub use parser::parse;
pub use resolve::{resolve, var_declared_names, Globals, NoGlobals};

/// Parse `source` and check every identifier against `globals`.
pub fn compile(source: &str, globals: &dyn Globals) -> Result<Program, CompileError> {
    let program = parser::parse(source)?;
    resolve::resolve(&program, globals)?;
    tracing::trace!(statements = program.body.len(), "compiled component source");
    Ok(program)
}
