//! Evaluation sandbox: compile, link, execute, and render one source text.
//!
//! Every failure is returned as a value. Compilation and execution run on a
//! dedicated thread with a large stack, inside `catch_unwind`, so neither
//! deep recursion in the front end nor an interpreter bug can take the host
//! down.

use livecode_core::ast::{ImportSpecifier, Program, Stmt};
use livecode_core::{compile, CompileError, Globals};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use crate::interpreter::{Fault, Interpreter};
use crate::scope::{ImportTarget, ScopeBindings};
use crate::tree::RenderTree;
use crate::value::Value;

/// Names the sandbox defines on top of the scope registry.
pub const INTRINSICS: &[&str] = &["Infinity", "NaN", "render", "undefined"];

const SANDBOX_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Bounds on a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    /// Interpreter steps (statements, calls, loop iterations, renders).
    pub max_steps: u64,
    pub max_call_depth: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        SandboxLimits {
            max_steps: 1_000_000,
            max_call_depth: 200,
        }
    }
}

/// A positioned message shown next to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    pub fn at(message: impl Into<String>, line: u32, column: u32) -> Self {
        let position = (line > 0).then_some((line, column));
        Diagnostic {
            message: message.into(),
            line: position.map(|(l, _)| l),
            column: position.map(|(_, c)| c),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "{} (line {}, column {})", self.message, line, column)
            }
            (Some(line), None) => write!(f, "{} (line {})", self.message, line),
            _ => write!(f, "{}", self.message),
        }
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(err: &CompileError) -> Self {
        Diagnostic::at(err.message.clone(), err.line, err.column)
    }
}

/// Outcome of one evaluation; produced fresh each time, never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum EvaluationResult {
    Success(RenderTree),
    CompileError(Diagnostic),
    RuntimeError(Diagnostic),
}

impl EvaluationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, EvaluationResult::Success(_))
    }

    /// `"success"`, `"compile_error"`, or `"runtime_error"`.
    pub fn outcome(&self) -> &'static str {
        match self {
            EvaluationResult::Success(_) => "success",
            EvaluationResult::CompileError(_) => "compile_error",
            EvaluationResult::RuntimeError(_) => "runtime_error",
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            EvaluationResult::Success(_) => None,
            EvaluationResult::CompileError(d) | EvaluationResult::RuntimeError(d) => Some(d),
        }
    }

    pub fn tree(&self) -> Option<&RenderTree> {
        match self {
            EvaluationResult::Success(tree) => Some(tree),
            _ => None,
        }
    }
}

/// Evaluate canonical source against `scope` with default limits.
pub fn evaluate(source: &str, scope: &ScopeBindings) -> EvaluationResult {
    evaluate_with(source, scope, &SandboxLimits::default())
}

pub fn evaluate_with(source: &str, scope: &ScopeBindings, limits: &SandboxLimits) -> EvaluationResult {
    let started = Instant::now();
    let limits = *limits;
    let result = std::thread::scope(|s| {
        let spawned = std::thread::Builder::new()
            .name("livecode-sandbox".to_string())
            .stack_size(SANDBOX_STACK_SIZE)
            .spawn_scoped(s, || guarded(source, scope, limits));
        match spawned {
            Ok(handle) => handle
                .join()
                .unwrap_or_else(|payload| internal_error(payload.as_ref())),
            Err(err) => {
                tracing::warn!(error = %err, "could not spawn sandbox thread; evaluating inline");
                guarded(source, scope, limits)
            }
        }
    });
    tracing::debug!(
        outcome = result.outcome(),
        elapsed_us = started.elapsed().as_micros() as u64,
        bytes = source.len(),
        "evaluated source"
    );
    result
}

fn guarded(source: &str, scope: &ScopeBindings, limits: SandboxLimits) -> EvaluationResult {
    catch_unwind(AssertUnwindSafe(|| run(source, scope, limits)))
        .unwrap_or_else(|payload| internal_error(payload.as_ref()))
}

fn internal_error(payload: &(dyn Any + Send)) -> EvaluationResult {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(%detail, "sandbox panicked");
    EvaluationResult::RuntimeError(Diagnostic::new(format!(
        "internal evaluator error: {}",
        detail
    )))
}

/// Scope names plus the sandbox intrinsics.
struct SandboxGlobals<'a>(&'a ScopeBindings);

impl Globals for SandboxGlobals<'_> {
    fn is_global(&self, name: &str) -> bool {
        self.0.contains(name) || INTRINSICS.contains(&name)
    }
}

fn run(source: &str, scope: &ScopeBindings, limits: SandboxLimits) -> EvaluationResult {
    let program = match compile(source, &SandboxGlobals(scope)) {
        Ok(program) => program,
        Err(err) => return EvaluationResult::CompileError(Diagnostic::from(&err)),
    };
    let imports = match link(&program, scope) {
        Ok(imports) => imports,
        Err(err) => return EvaluationResult::CompileError(Diagnostic::from(&err)),
    };

    let mut interp = Interpreter::new(scope, limits);
    let outcome = interp.run(&program, &imports).and_then(|rendered| match rendered {
        Some(root) => interp.render_root(&root).map(Some),
        None => Ok(None),
    });
    tracing::trace!(steps = interp.steps(), "interpreter finished");
    match outcome {
        Ok(Some(tree)) => EvaluationResult::Success(tree),
        Ok(None) => EvaluationResult::RuntimeError(Diagnostic::new(
            "render was never called; the source must end with render(<CodeComponent />)",
        )),
        Err(fault) => EvaluationResult::RuntimeError(fault_diagnostic(&fault)),
    }
}

/// Resolve every top-level import against the module table.
fn link(program: &Program, scope: &ScopeBindings) -> Result<Vec<(String, ImportTarget)>, CompileError> {
    let mut imports = Vec::new();
    for stmt in &program.body {
        let Stmt::Import(decl) = stmt else { continue };
        let (line, column) = (decl.span.line, decl.span.column);
        let Some(module) = scope.module(&decl.source) else {
            if decl.specifiers.is_empty() && decl.source.ends_with(".css") {
                continue;
            }
            return Err(CompileError::link(
                line,
                column,
                format!(
                    "cannot import '{}': module is not available in the preview",
                    decl.source
                ),
            ));
        };
        for spec in &decl.specifiers {
            let target = match spec {
                ImportSpecifier::Default { .. } => module.default.clone().ok_or_else(|| {
                    CompileError::link(
                        line,
                        column,
                        format!("'{}' has no default export", decl.source),
                    )
                })?,
                ImportSpecifier::Namespace { .. } => module.namespace.clone().ok_or_else(|| {
                    CompileError::link(
                        line,
                        column,
                        format!("'{}' cannot be imported as a namespace", decl.source),
                    )
                })?,
                ImportSpecifier::Named { imported, .. } => {
                    module.exports.get(imported).cloned().ok_or_else(|| {
                        CompileError::link(
                            line,
                            column,
                            format!("'{}' is not exported by '{}'", imported, decl.source),
                        )
                    })?
                }
            };
            imports.push((spec.local().to_string(), target));
        }
    }
    Ok(imports)
}

fn fault_diagnostic(fault: &Fault) -> Diagnostic {
    let (message, span) = match fault {
        Fault::Limit { message, span } => (message.clone(), *span),
        Fault::Throw { value, span } => (thrown_message(value), *span),
    };
    Diagnostic::at(message, span.line, span.column)
}

/// `Name: message` for error objects, `Uncaught <value>` otherwise.
fn thrown_message(value: &Value) -> String {
    if let Value::Object(obj) = value {
        let obj = obj.borrow();
        if let Some(message) = obj.get("message") {
            let name = obj
                .get("name")
                .map_or("Error".to_string(), |n| n.to_js_string());
            let message = message.to_js_string();
            if message.is_empty() {
                return name;
            }
            return format!("{}: {}", name, message);
        }
    }
    format!("Uncaught {}", value.to_js_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::build_scope;
    use crate::tree::{AttrValue, RenderNode, StyleValue};

    fn eval(source: &str) -> EvaluationResult {
        evaluate(source, &build_scope())
    }

    fn tree(source: &str) -> RenderTree {
        match eval(source) {
            EvaluationResult::Success(tree) => tree,
            other => panic!("expected success, got {:?}", other),
        }
    }

    fn runtime_message(source: &str) -> String {
        match eval(source) {
            EvaluationResult::RuntimeError(d) => d.message,
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn renders_host_elements_and_text() {
        let t = tree(r#"render(<div className="p-4">Hello {"world"}{1 + 1}</div>);"#);
        let div = t.find("div").unwrap();
        assert_eq!(div.text_attr("className"), Some("p-4"));
        assert_eq!(div.children, vec![RenderNode::Text { text: "Hello world2".into() }]);
    }

    #[test]
    fn components_hooks_and_lists() {
        let t = tree(
            r#"
            function Item({ label }) { return <li>{label}</li>; }
            const CodeComponent = () => {
              const [items] = React.useState(["a", "b", "c"]);
              const ref = React.useRef(null);
              const total = React.useMemo(() => items.length * 2, [items]);
              React.useEffect(() => { throw new Error("effects never run"); }, []);
              return <ul data-total={total}>{items.map(i => <Item key={i} label={i.toUpperCase()} />)}</ul>;
            };
            render(<React.StrictMode><CodeComponent /></React.StrictMode>);
            "#,
        );
        let ul = t.find("ul").unwrap();
        assert_eq!(ul.attr("data-total"), Some(&AttrValue::Number(6.0)));
        assert_eq!(ul.children.len(), 3);
        assert_eq!(t.text_content(), "ABC");
    }

    #[test]
    fn icons_render_as_svg() {
        let t = tree(r#"render(<Upload className="h-4 w-4" size={16} />);"#);
        let svg = t.find("svg").unwrap();
        assert_eq!(svg.text_attr("className"), Some("lucide lucide-upload h-4 w-4"));
        assert_eq!(svg.attr("width"), Some(&AttrValue::Number(16.0)));
        assert_eq!(svg.text_attr("stroke"), Some("currentColor"));
        assert!(!svg.children.is_empty());
    }

    #[test]
    fn primitives_merge_classes() {
        let t = tree(r#"render(<Button variant="outline" className="w-full" onClick={() => 1}>Go</Button>);"#);
        let button = t.find("button").unwrap();
        let class = button.text_attr("className").unwrap();
        assert!(class.contains("border-input") && class.ends_with("w-full"));
        assert_eq!(button.attr("onClick"), Some(&AttrValue::Handler));
        assert!(button.attr("variant").is_none());
    }

    #[test]
    fn style_objects_become_declarations() {
        let t = tree(r#"render(<div style={{ marginTop: 4, color: "red", display: null }} />);"#);
        match t.find("div").unwrap().attr("style") {
            Some(AttrValue::Style(decls)) => {
                assert_eq!(decls.len(), 2);
                assert_eq!(decls[0].value, StyleValue::Number(4.0));
            }
            other => panic!("unexpected style {:?}", other),
        }
        assert!(runtime_message(r#"render(<div style="color: red" />);"#)
            .contains("The `style` prop expects a mapping"));
    }

    #[test]
    fn object_children_are_rejected() {
        let msg = runtime_message(r#"render(<div>{{ a: 1, b: 2 }}</div>);"#);
        assert!(msg.contains("Objects are not valid as a React child (found: object with keys {a, b})"));
    }

    #[test]
    fn thrown_values_and_property_reads() {
        assert_eq!(
            runtime_message(r#"throw new Error("boom");"#),
            "Error: boom"
        );
        assert_eq!(runtime_message(r#"throw "bare";"#), "Uncaught bare");
        assert_eq!(
            runtime_message(r#"throw new TypeError("wrong kind");"#),
            "TypeError: wrong kind"
        );
        assert_eq!(runtime_message("throw new SyntaxError();"), "SyntaxError");
        let msg = runtime_message("const x = undefined; render(<div>{x.y}</div>);");
        assert!(msg.starts_with("TypeError: Cannot read properties of undefined (reading 'y')"));
    }

    #[test]
    fn for_let_closures_capture_each_iteration() {
        let t = tree(
            r#"
            const fns = [];
            for (let i = 0; i < 3; i++) { fns.push(() => i); }
            let total = 0;
            for (var j = 0; j < 3; j++) { total += j; }
            render(<p>{fns.map(f => f()).join()} {total}</p>);
            "#,
        );
        assert_eq!(t.text_content(), "0,1,2 3");
    }

    #[test]
    fn try_catch_recovers_but_limits_do_not() {
        let t = tree(
            r#"
            let caught = "";
            try { null.x; } catch (e) { caught = e.name; } finally { caught += "!"; }
            render(<p>{caught}</p>);
            "#,
        );
        assert_eq!(t.text_content(), "TypeError!");
        let limits = SandboxLimits { max_steps: 5_000, ..SandboxLimits::default() };
        let result = evaluate_with(
            "try { while (true) {} } catch (e) {} render(<p />);",
            &build_scope(),
            &limits,
        );
        let d = result.diagnostic().unwrap();
        assert!(d.message.contains("step budget of 5000"));
    }

    #[test]
    fn deep_recursion_is_a_runtime_error() {
        let msg = runtime_message("function f(n) { return f(n + 1); } f(0); render(null);");
        assert!(msg.contains("Maximum call stack size exceeded"));
    }

    #[test]
    fn missing_render_and_unknown_modules() {
        assert!(runtime_message("const a = 1;").starts_with("render was never called"));
        match eval(r#"import fs from "fs"; render(null);"#) {
            EvaluationResult::CompileError(d) => {
                assert!(d.message.contains("cannot import 'fs'"));
                assert_eq!(d.line, Some(1));
            }
            other => panic!("expected compile error, got {:?}", other),
        }
        match eval(r#"import { Nope } from "lucide-react"; render(null);"#) {
            EvaluationResult::CompileError(d) => {
                assert_eq!(d.message, "'Nope' is not exported by 'lucide-react'")
            }
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[test]
    fn imports_link_to_scope_bindings() {
        let t = tree(
            r#"
            import React, { useState } from "react";
            import { FileText as Doc } from "lucide-react";
            import * as Icons from "lucide-react";
            import { Card, CardContent } from "@/components/ui/card";
            import "./styles.css";
            const [n] = useState(() => 3);
            render(<Card><CardContent><Doc /><Icons.X />{n}</CardContent></Card>);
            "#,
        );
        assert_eq!(t.elements().iter().filter(|e| e.tag == "svg").count(), 2);
        assert_eq!(t.text_content(), "3");
    }

    #[test]
    fn display_includes_position() {
        let d = Diagnostic::at("bad", 3, 7);
        assert_eq!(d.to_string(), "bad (line 3, column 7)");
        assert_eq!(Diagnostic::at("x", 0, 0).line, None);
    }

    #[test]
    fn result_serializes_with_outcome_tag() {
        let json = serde_json::to_value(eval("render(<br />);")).unwrap();
        assert_eq!(json["outcome"], "success");
        assert_eq!(json["detail"]["nodes"][0]["tag"], "br");
    }
}
