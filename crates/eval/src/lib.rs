//! livecode-eval: scope registry and evaluation sandbox.
//!
//! Canonical source goes in, an [`EvaluationResult`] comes out. The sandbox
//! compiles the source with `livecode-core`, links its imports against the
//! [`ScopeBindings`] module table, runs it in a step-bounded tree-walking
//! interpreter, and performs the initial render pass into a [`RenderTree`].
//!
//! # Public API
//!
//! - [`build_scope()`] / [`ScopeBuilder`] -- the identifier whitelist
//! - [`evaluate()`] / [`evaluate_with()`] -- one sandboxed evaluation
//! - [`EvaluationResult`], [`Diagnostic`], [`SandboxLimits`]
//! - [`RenderTree`] and its node types

pub mod icons;
pub mod primitives;
pub mod sandbox;
pub mod scope;
pub mod tree;

mod interpreter;
mod natives;
mod render;
mod value;

pub use sandbox::{evaluate, evaluate_with, Diagnostic, EvaluationResult, SandboxLimits, INTRINSICS};
pub use scope::{
    build_scope, Binding, BindingSummary, Helper, ImportTarget, ModuleDef, ScopeBindings,
    ScopeBuilder,
};
pub use tree::{Attr, AttrValue, ElementNode, RenderNode, RenderTree, StyleDecl, StyleValue};
