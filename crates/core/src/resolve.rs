//! Resolve pass: lexical scoping over the parsed program.
//!
//! Every identifier reference must name a declaration in the source, an
//! import binding, or a global supplied by the caller. Anything else is
//! rejected before a single statement runs, so code that reaches for names
//! outside the preview scope never executes.

use crate::ast::*;
use crate::error::CompileError;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Names the host makes available to component source.
pub trait Globals {
    fn is_global(&self, name: &str) -> bool;
}

impl Globals for BTreeSet<String> {
    fn is_global(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl Globals for HashSet<String> {
    fn is_global(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl Globals for &[&str] {
    fn is_global(&self, name: &str) -> bool {
        self.contains(&name)
    }
}

/// No globals at all.
pub struct NoGlobals;

impl Globals for NoGlobals {
    fn is_global(&self, _name: &str) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Param,
    Import,
}

impl BindingKind {
    fn lexical(self) -> bool {
        matches!(self, BindingKind::Let | BindingKind::Const | BindingKind::Import)
    }
}

impl From<VarKind> for BindingKind {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Const => BindingKind::Const,
            VarKind::Let => BindingKind::Let,
            VarKind::Var => BindingKind::Var,
        }
    }
}

/// Check every reference in `program` against its lexical scopes and `globals`.
pub fn resolve(program: &Program, globals: &dyn Globals) -> Result<(), CompileError> {
    let mut resolver = Resolver {
        globals,
        scopes: Vec::new(),
    };
    resolver.push();
    resolver.hoist_function_scope(&program.body)?;
    resolver.statements(&program.body)?;
    resolver.pop();
    Ok(())
}

struct Resolver<'g> {
    globals: &'g dyn Globals,
    scopes: Vec<HashMap<String, BindingKind>>,
}

impl<'g> Resolver<'g> {
    fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, kind: BindingKind, span: Span) -> Result<(), CompileError> {
        let Some(scope) = self.scopes.last_mut() else {
            return Ok(());
        };
        if let Some(existing) = scope.get(name) {
            if existing.lexical() || kind.lexical() {
                return Err(CompileError::resolve(
                    span.line,
                    span.column,
                    format!("identifier '{}' has already been declared", name),
                ));
            }
            // `var` after a parameter or function keeps the earlier binding kind.
            return Ok(());
        }
        scope.insert(name.to_string(), kind);
        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<BindingKind> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn reference(&self, name: &str, span: Span) -> Result<(), CompileError> {
        if self.lookup(name).is_some() || self.globals.is_global(name) {
            return Ok(());
        }
        Err(undefined(name, span))
    }

    fn assign_target(&mut self, target: &Expr) -> Result<(), CompileError> {
        match &target.kind {
            ExprKind::Ident(name) => match self.lookup(name) {
                Some(BindingKind::Const) => Err(CompileError::resolve(
                    target.span.line,
                    target.span.column,
                    format!("assignment to constant variable '{}'", name),
                )),
                Some(BindingKind::Import) => Err(CompileError::resolve(
                    target.span.line,
                    target.span.column,
                    format!("cannot assign to import '{}'", name),
                )),
                Some(_) => Ok(()),
                None if self.globals.is_global(name) => Err(CompileError::resolve(
                    target.span.line,
                    target.span.column,
                    format!("cannot assign to preview scope binding '{}'", name),
                )),
                None => Err(undefined(name, target.span)),
            },
            _ => self.expr(target),
        }
    }

    // -- Hoisting ---------------------------------------------

    /// Declarations visible throughout a function body (or the program):
    /// `var` names from any nested block plus the body's own block-level
    /// declarations.
    fn hoist_function_scope(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        for (name, span) in var_declared_names(body) {
            self.declare(&name, BindingKind::Var, span)?;
        }
        self.hoist_block(body)
    }

    fn hoist_block(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        for stmt in body {
            match stmt {
                Stmt::Var(decl) if decl.kind != VarKind::Var => {
                    for d in &decl.declarators {
                        for (name, span) in d.pattern.bound_names() {
                            self.declare(name, decl.kind.into(), span)?;
                        }
                    }
                }
                Stmt::Function(f) => {
                    if let Some(name) = &f.name {
                        self.declare(name, BindingKind::Function, f.span)?;
                    }
                }
                Stmt::Import(import) => {
                    for spec in &import.specifiers {
                        self.declare(spec.local(), BindingKind::Import, import.span)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    // -- Statements -------------------------------------------

    fn statements(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        for stmt in body {
            self.statement(stmt)?;
        }
        Ok(())
    }

    fn block(&mut self, body: &[Stmt]) -> Result<(), CompileError> {
        self.push();
        let result = self
            .hoist_block(body)
            .and_then(|_| self.statements(body));
        self.pop();
        result
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Var(decl) => self.var_decl(decl),
            Stmt::Function(f) => self.function(f),
            Stmt::Return(value, _) => match value {
                Some(e) => self.expr(e),
                None => Ok(()),
            },
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test)?;
                self.nested_statement(consequent)?;
                if let Some(alt) = alternate {
                    self.nested_statement(alt)?;
                }
                Ok(())
            }
            Stmt::Block(body) => self.block(body),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                self.push();
                let result = self.for_loop(init.as_ref(), test.as_ref(), update.as_ref(), body);
                self.pop();
                result
            }
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => {
                self.expr(iterable)?;
                self.push();
                let result = self
                    .bind_pattern(pattern, (*kind).into())
                    .and_then(|_| self.nested_statement(body));
                self.pop();
                result
            }
            Stmt::While { test, body } => {
                self.expr(test)?;
                self.nested_statement(body)
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty | Stmt::Import(_) => Ok(()),
            Stmt::Throw(value, _) => self.expr(value),
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.block(block)?;
                if let Some(h) = handler {
                    self.push();
                    let result = match &h.param {
                        Some(p) => self.bind_pattern(p, BindingKind::Let),
                        None => Ok(()),
                    }
                    .and_then(|_| self.block(&h.body));
                    self.pop();
                    result?;
                }
                if let Some(f) = finalizer {
                    self.block(f)?;
                }
                Ok(())
            }
            Stmt::Expr(e) | Stmt::ExportDefault(e) => self.expr(e),
        }
    }

    /// The body of `if`/`while`/`for`: a lone declaration gets its own scope.
    fn nested_statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Var(_) | Stmt::Function(_) => self.block(std::slice::from_ref(stmt)),
            _ => self.statement(stmt),
        }
    }

    fn for_loop(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), CompileError> {
        match init {
            Some(ForInit::Var(decl)) => {
                if decl.kind != VarKind::Var {
                    for d in &decl.declarators {
                        for (name, span) in d.pattern.bound_names() {
                            self.declare(name, decl.kind.into(), span)?;
                        }
                    }
                }
                self.var_decl(decl)?;
            }
            Some(ForInit::Expr(e)) => self.expr(e)?,
            None => {}
        }
        if let Some(t) = test {
            self.expr(t)?;
        }
        if let Some(u) = update {
            self.expr(u)?;
        }
        self.nested_statement(body)
    }

    fn var_decl(&mut self, decl: &VarDecl) -> Result<(), CompileError> {
        for d in &decl.declarators {
            self.pattern_defaults(&d.pattern)?;
            if let Some(init) = &d.init {
                self.expr(init)?;
            }
        }
        Ok(())
    }

    /// Declare a pattern's names in the current scope and check its defaults.
    fn bind_pattern(&mut self, pattern: &Pattern, kind: BindingKind) -> Result<(), CompileError> {
        for (name, span) in pattern.bound_names() {
            self.declare(name, kind, span)?;
        }
        self.pattern_defaults(pattern)
    }

    fn pattern_defaults(&mut self, pattern: &Pattern) -> Result<(), CompileError> {
        match pattern {
            Pattern::Ident(..) => Ok(()),
            Pattern::Object { props, .. } => {
                for p in props {
                    self.pattern_elem(&p.value)?;
                }
                Ok(())
            }
            Pattern::Array { elems, rest, .. } => {
                for e in elems.iter().flatten() {
                    self.pattern_elem(e)?;
                }
                if let Some(r) = rest {
                    self.pattern_defaults(r)?;
                }
                Ok(())
            }
        }
    }

    fn pattern_elem(&mut self, elem: &PatternElem) -> Result<(), CompileError> {
        if let Some(d) = &elem.default {
            self.expr(d)?;
        }
        self.pattern_defaults(&elem.pattern)
    }

    fn function(&mut self, f: &FunctionDef) -> Result<(), CompileError> {
        self.push();
        let result = self.function_inner(f);
        self.pop();
        result
    }

    fn function_inner(&mut self, f: &FunctionDef) -> Result<(), CompileError> {
        for p in &f.params {
            for (name, span) in p.pattern.bound_names() {
                self.declare(name, BindingKind::Param, span)?;
            }
        }
        if let Some(rest) = &f.rest {
            for (name, span) in rest.bound_names() {
                self.declare(name, BindingKind::Param, span)?;
            }
        }
        for p in &f.params {
            self.pattern_elem(p)?;
        }
        match &f.body {
            FunctionBody::Expr(e) => self.expr(e),
            FunctionBody::Block(body) => {
                self.hoist_function_scope(body)?;
                self.statements(body)
            }
        }
    }

    // -- Expressions ------------------------------------------

    fn expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match &expr.kind {
            ExprKind::Num(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Null => Ok(()),
            ExprKind::Ident(name) => self.reference(name, expr.span),
            ExprKind::Template { exprs, .. } => {
                for e in exprs {
                    self.expr(e)?;
                }
                Ok(())
            }
            ExprKind::Array(elems) => {
                for el in elems {
                    match el {
                        ArrayElem::Item(e) | ArrayElem::Spread(e) => self.expr(e)?,
                        ArrayElem::Hole => {}
                    }
                }
                Ok(())
            }
            ExprKind::Object(props) => {
                for prop in props {
                    match prop {
                        ObjectProp::KeyValue(key, value) => {
                            if let PropKey::Computed(k) = key {
                                self.expr(k)?;
                            }
                            self.expr(value)?;
                        }
                        ObjectProp::Spread(e) => self.expr(e)?,
                    }
                }
                Ok(())
            }
            ExprKind::Function(f) => {
                // A named function expression sees its own name.
                match (&f.name, f.is_arrow) {
                    (Some(name), false) => {
                        self.push();
                        let result = self
                            .declare(name, BindingKind::Function, f.span)
                            .and_then(|_| self.function(f));
                        self.pop();
                        result
                    }
                    _ => self.function(f),
                }
            }
            ExprKind::Unary { arg, .. } => self.expr(arg),
            ExprKind::Update { target, .. } => self.assign_target(target),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.expr(test)?;
                self.expr(consequent)?;
                self.expr(alternate)
            }
            ExprKind::Assign { target, value, .. } => {
                self.assign_target(target)?;
                self.expr(value)
            }
            ExprKind::Member {
                object, property, ..
            } => {
                self.expr(object)?;
                if let MemberProp::Computed(k) = property {
                    self.expr(k)?;
                }
                Ok(())
            }
            ExprKind::Call { callee, args, .. } | ExprKind::New { callee, args } => {
                self.expr(callee)?;
                for a in args {
                    match a {
                        Arg::Expr(e) | Arg::Spread(e) => self.expr(e)?,
                    }
                }
                Ok(())
            }
            ExprKind::Jsx(el) => self.jsx(el),
        }
    }

    fn jsx(&mut self, el: &JsxElement) -> Result<(), CompileError> {
        match &el.name {
            JsxName::Component(name) => self.reference(name, el.span)?,
            JsxName::Member(parts) => {
                if let Some(root) = parts.first() {
                    self.reference(root, el.span)?;
                }
            }
            JsxName::Host(_) | JsxName::Fragment => {}
        }
        for attr in &el.attrs {
            match attr {
                JsxAttr::Named {
                    value: Some(JsxAttrValue::Expr(e)),
                    ..
                }
                | JsxAttr::Spread(e) => self.expr(e)?,
                JsxAttr::Named { .. } => {}
            }
        }
        for child in &el.children {
            match child {
                JsxChild::Text(_) => {}
                JsxChild::Expr(e) => self.expr(e)?,
                JsxChild::Element(child) => self.jsx(child)?,
            }
        }
        Ok(())
    }
}

fn undefined(name: &str, span: Span) -> CompileError {
    CompileError::resolve(
        span.line,
        span.column,
        format!("'{}' is not defined in the preview scope", name),
    )
}

/// `var` names declared anywhere in `body` without crossing a function boundary.
pub fn var_declared_names(body: &[Stmt]) -> Vec<(String, Span)> {
    let mut out = Vec::new();
    collect_vars(body, &mut out);
    out
}

fn collect_vars(body: &[Stmt], out: &mut Vec<(String, Span)>) {
    for stmt in body {
        collect_vars_stmt(stmt, out);
    }
}

fn collect_vars_stmt(stmt: &Stmt, out: &mut Vec<(String, Span)>) {
    match stmt {
        Stmt::Var(decl) if decl.kind == VarKind::Var => push_decl_names(decl, out),
        Stmt::If {
            consequent,
            alternate,
            ..
        } => {
            collect_vars_stmt(consequent, out);
            if let Some(alt) = alternate {
                collect_vars_stmt(alt, out);
            }
        }
        Stmt::Block(body) => collect_vars(body, out),
        Stmt::For { init, body, .. } => {
            if let Some(ForInit::Var(decl)) = init {
                if decl.kind == VarKind::Var {
                    push_decl_names(decl, out);
                }
            }
            collect_vars_stmt(body, out);
        }
        Stmt::ForOf {
            kind,
            pattern,
            body,
            ..
        } => {
            if *kind == VarKind::Var {
                for (name, span) in pattern.bound_names() {
                    out.push((name.to_string(), span));
                }
            }
            collect_vars_stmt(body, out);
        }
        Stmt::While { body, .. } => collect_vars_stmt(body, out),
        Stmt::Try {
            block,
            handler,
            finalizer,
        } => {
            collect_vars(block, out);
            if let Some(h) = handler {
                collect_vars(&h.body, out);
            }
            if let Some(f) = finalizer {
                collect_vars(f, out);
            }
        }
        _ => {}
    }
}

fn push_decl_names(decl: &VarDecl, out: &mut Vec<(String, Span)>) {
    for d in &decl.declarators {
        for (name, span) in d.pattern.bound_names() {
            out.push((name.to_string(), span));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileStage;
    use crate::parser::parse;

    const GLOBALS: &[&str] = &["React", "render", "Card", "Upload", "Math", "console"];

    fn check(src: &str) -> Result<(), CompileError> {
        let program = parse(src).unwrap_or_else(|e| panic!("parse failed: {}", e));
        resolve(&program, &GLOBALS)
    }

    #[test]
    fn accepts_component_using_scope_names() {
        let src = r#"
            const CodeComponent = () => {
              const [open, setOpen] = React.useState(false);
              const total = items().reduce((sum, n) => sum + n, 0);
              function items() { return [1, 2, Math.max(3, 4)]; }
              return <Card onClick={() => setOpen(!open)}><Upload /> {total}</Card>;
            };
            render(<React.StrictMode><CodeComponent /></React.StrictMode>);
        "#;
        check(src).unwrap();
    }

    #[test]
    fn rejects_unknown_component() {
        let err = check("const CodeComponent = () => <Foo />;").unwrap_err();
        assert_eq!(err.stage, CompileStage::Resolve);
        assert_eq!(err.message, "'Foo' is not defined in the preview scope");
        assert_eq!((err.line, err.column), (1, 29));
    }

    #[test]
    fn rejects_unknown_free_identifier() {
        let err = check("const a = window.location;").unwrap_err();
        assert!(err.message.contains("'window'"));
    }

    #[test]
    fn block_scoped_bindings_do_not_leak() {
        let err = check("{ const hidden = 1; }\nconsole.log(hidden);").unwrap_err();
        assert!(err.message.contains("'hidden'"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn var_and_function_declarations_hoist() {
        check("console.log(later(), v);\nfunction later() { return 1; }\nif (true) { var v = 2; }")
            .unwrap();
    }

    #[test]
    fn const_and_import_assignment_rejected() {
        let err = check("const a = 1; a = 2;").unwrap_err();
        assert!(err.message.contains("constant"));
        let err = check("import { Upload as U } from 'lucide-react'; U = null;").unwrap_err();
        assert!(err.message.contains("import"));
        let err = check("Math = null;").unwrap_err();
        assert!(err.message.contains("preview scope binding"));
    }

    #[test]
    fn duplicate_lexical_declaration_rejected() {
        let err = check("let a = 1; let a = 2;").unwrap_err();
        assert!(err.message.contains("already been declared"));
    }

    #[test]
    fn catch_params_and_loop_bindings_are_scoped() {
        check("try { throw 1; } catch (e) { console.log(e); }\nfor (const x of [1]) { console.log(x); }\nfor (let i = 0; i < 2; i++) {}")
            .unwrap();
        let err = check("for (let i = 0; i < 2; i++) {}\nconsole.log(i);").unwrap_err();
        assert!(err.message.contains("'i'"));
    }

    #[test]
    fn named_function_expression_sees_itself() {
        check("const f = function fact(n) { return n < 2 ? 1 : n * fact(n - 1); };").unwrap();
    }
}
