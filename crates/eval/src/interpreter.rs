//! Tree-walking interpreter for compiled component source.
//!
//! Executes a resolved [`Program`] with JavaScript-like semantics inside a
//! single evaluation. Every fault is a value: thrown exceptions and runaway
//! limits come back as [`Fault`] and never unwind through the host.

use livecode_core::ast::*;
use livecode_core::var_declared_names;
use std::rc::Rc;

use crate::natives;
use crate::sandbox::SandboxLimits;
use crate::scope::{Binding, ImportTarget, ScopeBindings};
use crate::value::{
    AssignError, Closure, Element, ElementType, Env, Function, Lookup, Native, Object, Value,
};

/// Longest string the sandbox will build.
pub(crate) const MAX_STRING_LEN: usize = 1 << 24;

/// Largest array the sandbox will build or grow to.
pub(crate) const MAX_ARRAY_LEN: usize = 1 << 20;

/// Why evaluation stopped early.
#[derive(Debug)]
pub(crate) enum Fault {
    /// A thrown value; catchable by `try`.
    Throw { value: Value, span: Span },
    /// A sandbox limit was hit; never catchable.
    Limit { message: String, span: Span },
}

impl Fault {
    pub fn error(name: &str, message: impl Into<String>, span: Span) -> Fault {
        Fault::Throw {
            value: Value::error(name, message),
            span,
        }
    }

    pub fn type_error(message: impl Into<String>, span: Span) -> Fault {
        Fault::error("TypeError", message, span)
    }

    pub fn range_error(message: impl Into<String>, span: Span) -> Fault {
        Fault::error("RangeError", message, span)
    }

    pub fn reference_error(message: impl Into<String>, span: Span) -> Fault {
        Fault::error("ReferenceError", message, span)
    }
}

pub(crate) type Eval<T> = Result<T, Fault>;

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

#[derive(Clone, Copy)]
enum BindMode {
    Var,
    Let,
    Const,
}

impl From<VarKind> for BindMode {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Var => BindMode::Var,
            VarKind::Let => BindMode::Let,
            VarKind::Const => BindMode::Const,
        }
    }
}

/// An assignable location.
enum Place {
    Var(String),
    Prop(Value, String),
}

pub(crate) struct Interpreter<'s> {
    pub(crate) scope: &'s ScopeBindings,
    pub(crate) limits: SandboxLimits,
    steps: u64,
    depth: usize,
    pub(crate) last_span: Span,
    /// The element passed to the most recent `render(...)` call.
    pub(crate) rendered: Option<Value>,
    /// Environments captured by closures, cleared on drop to break cycles.
    captured: Vec<Rc<Env>>,
    pub(crate) rng_state: u64,
}

impl Drop for Interpreter<'_> {
    fn drop(&mut self) {
        for env in &self.captured {
            env.clear();
        }
    }
}

impl<'s> Interpreter<'s> {
    pub fn new(scope: &'s ScopeBindings, limits: SandboxLimits) -> Self {
        Interpreter {
            scope,
            limits,
            steps: 0,
            depth: 0,
            last_span: Span::default(),
            rendered: None,
            captured: Vec::new(),
            rng_state: 0x9E37_79B9_7F4A_7C15,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run the program; returns the element handed to the last `render` call.
    pub fn run(
        &mut self,
        program: &Program,
        imports: &[(String, ImportTarget)],
    ) -> Eval<Option<Value>> {
        let globals = self.global_env();
        let env = Env::new(Some(globals));
        for (local, target) in imports {
            let value = self.import_value(target);
            env.declare(local, Some(value), false);
        }
        self.hoist_function_scope(&program.body, &env);
        self.exec_statements(&program.body, &env)?;
        Ok(self.rendered.take())
    }

    // ── Limits ───────────────────────────────────────────────────────

    pub(crate) fn tick(&mut self) -> Eval<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(Fault::Limit {
                message: format!(
                    "evaluation exceeded the step budget of {} (possible infinite loop)",
                    self.limits.max_steps
                ),
                span: self.last_span,
            });
        }
        Ok(())
    }

    pub(crate) fn enter(&mut self, span: Span) -> Eval<()> {
        if self.depth >= self.limits.max_call_depth {
            return Err(Fault::Limit {
                message: format!(
                    "Maximum call stack size exceeded (depth {})",
                    self.limits.max_call_depth
                ),
                span,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ── Scope ────────────────────────────────────────────────────────

    fn global_env(&mut self) -> Rc<Env> {
        let env = Env::new(None);
        let scope = self.scope;
        for name in scope.names() {
            if let Some(binding) = scope.get(name) {
                let value = self.binding_value(binding);
                env.declare(name, Some(value), false);
            }
        }
        env.declare("undefined", Some(Value::Undefined), false);
        env.declare("NaN", Some(Value::Number(f64::NAN)), false);
        env.declare("Infinity", Some(Value::Number(f64::INFINITY)), false);
        env.declare("render", Some(Value::native(Native::Render)), false);
        env
    }

    fn binding_value(&self, binding: &Binding) -> Value {
        match binding {
            Binding::Icon(icon) => Value::native(Native::Icon(icon)),
            Binding::React => natives::react_value(),
            Binding::Primitive(p) => Value::native(Native::Primitive(*p)),
            Binding::Helper(helper) => natives::helper_value(*helper),
            Binding::Constant(json) => natives::json_to_value(json),
        }
    }

    fn import_value(&self, target: &ImportTarget) -> Value {
        match target {
            ImportTarget::Binding(binding) => self.binding_value(binding),
            ImportTarget::ReactMember(member) => natives::react_member(member),
            ImportTarget::IconNamespace => Value::object(
                crate::icons::ICONS
                    .iter()
                    .map(|icon| (icon.name.to_string(), Value::native(Native::Icon(icon))))
                    .collect(),
            ),
        }
    }

    pub(crate) fn lookup(&self, name: &str, env: &Env, span: Span) -> Eval<Value> {
        match env.lookup(name) {
            Lookup::Found(v) => Ok(v),
            Lookup::Uninitialized => Err(Fault::reference_error(
                format!("Cannot access '{}' before initialization", name),
                span,
            )),
            Lookup::Missing => Err(Fault::reference_error(
                format!("{} is not defined", name),
                span,
            )),
        }
    }

    // ── Hoisting ─────────────────────────────────────────────────────

    fn hoist_function_scope(&mut self, body: &[Stmt], env: &Rc<Env>) {
        for (name, _) in var_declared_names(body) {
            env.declare_var(&name);
        }
        self.hoist_block(body, env);
    }

    /// `let`/`const` enter their temporal dead zone; function declarations
    /// are initialized up front.
    fn hoist_block(&mut self, body: &[Stmt], env: &Rc<Env>) {
        for stmt in body {
            match stmt {
                Stmt::Var(decl) if decl.kind != VarKind::Var => {
                    for d in &decl.declarators {
                        for (name, _) in d.pattern.bound_names() {
                            env.declare(name, None, decl.kind == VarKind::Let);
                        }
                    }
                }
                Stmt::Function(def) => {
                    if let Some(name) = &def.name {
                        let closure = self.make_closure(def, env);
                        env.declare(name, Some(closure), true);
                    }
                }
                _ => {}
            }
        }
    }

    fn make_closure(&mut self, def: &Rc<FunctionDef>, env: &Rc<Env>) -> Value {
        self.captured.push(env.clone());
        Value::Function(Rc::new(Function::Closure(Closure {
            def: def.clone(),
            env: env.clone(),
        })))
    }

    fn function_value(&mut self, def: &Rc<FunctionDef>, env: &Rc<Env>) -> Value {
        match (&def.name, def.is_arrow) {
            (Some(name), false) => {
                let own = Env::new(Some(env.clone()));
                let closure = self.make_closure(def, &own);
                own.declare(name, Some(closure.clone()), false);
                closure
            }
            _ => self.make_closure(def, env),
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn exec_statements(&mut self, body: &[Stmt], env: &Rc<Env>) -> Eval<Flow> {
        for stmt in body {
            match self.exec(stmt, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_block(&mut self, body: &[Stmt], env: &Rc<Env>) -> Eval<Flow> {
        let block_env = Env::new(Some(env.clone()));
        self.hoist_block(body, &block_env);
        self.exec_statements(body, &block_env)
    }

    fn exec(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Eval<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Var(decl) => {
                self.var_decl(decl, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Function(_) | Stmt::Import(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::Return(expr, _) => {
                let value = match expr {
                    Some(e) => self.eval(e, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env)?.truthy() {
                    self.exec(consequent, env)
                } else if let Some(alt) = alternate {
                    self.exec(alt, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(body) => self.exec_block(body, env),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, env),
            Stmt::ForOf {
                kind,
                pattern,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable, env)?;
                let items = self.iter_items(&iterable, pattern.span())?;
                for item in items {
                    self.tick()?;
                    let iter_env = Env::new(Some(env.clone()));
                    self.bind_pattern(pattern, item, &iter_env, (*kind).into())?;
                    match self.exec(body, &iter_env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::While { test, body } => {
                loop {
                    self.tick()?;
                    if !self.eval(test, env)?.truthy() {
                        break;
                    }
                    match self.exec(body, env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break(_) => Ok(Flow::Break),
            Stmt::Continue(_) => Ok(Flow::Continue),
            Stmt::Throw(expr, span) => {
                let value = self.eval(expr, env)?;
                Err(Fault::Throw { value, span: *span })
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.exec_try(block, handler.as_ref(), finalizer.as_deref(), env),
            Stmt::Expr(expr) | Stmt::ExportDefault(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        env: &Rc<Env>,
    ) -> Eval<Flow> {
        let loop_env = Env::new(Some(env.clone()));
        match init {
            Some(ForInit::Var(decl)) => {
                if decl.kind != VarKind::Var {
                    for d in &decl.declarators {
                        for (name, _) in d.pattern.bound_names() {
                            loop_env.declare(name, None, decl.kind == VarKind::Let);
                        }
                    }
                }
                self.var_decl(decl, &loop_env)?;
            }
            Some(ForInit::Expr(e)) => {
                self.eval(e, &loop_env)?;
            }
            None => {}
        }
        // `let` loop variables get a fresh record per iteration so closures
        // created in the body keep that iteration's values.
        let per_iteration = matches!(init, Some(ForInit::Var(d)) if d.kind == VarKind::Let);
        let mut iter_env = if per_iteration {
            loop_env.copy_record()
        } else {
            loop_env
        };
        loop {
            self.tick()?;
            if let Some(test) = test {
                if !self.eval(test, &iter_env)?.truthy() {
                    break;
                }
            }
            match self.exec(body, &iter_env)? {
                Flow::Break => break,
                Flow::Return(v) => return Ok(Flow::Return(v)),
                Flow::Normal | Flow::Continue => {}
            }
            if per_iteration {
                iter_env = iter_env.copy_record();
            }
            if let Some(update) = update {
                self.eval(update, &iter_env)?;
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
        env: &Rc<Env>,
    ) -> Eval<Flow> {
        let mut result = self.exec_block(block, env);
        if let Some(handler) = handler {
            if let Err(Fault::Throw { value, .. }) = result {
                let catch_env = Env::new(Some(env.clone()));
                result = match &handler.param {
                    Some(param) => self
                        .bind_pattern(param, value, &catch_env, BindMode::Let)
                        .and_then(|_| self.exec_block(&handler.body, &catch_env)),
                    None => self.exec_block(&handler.body, &catch_env),
                };
            }
        }
        if let Some(finalizer) = finalizer {
            if matches!(result, Err(Fault::Limit { .. })) {
                return result;
            }
            match self.exec_block(finalizer, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        result
    }

    fn var_decl(&mut self, decl: &VarDecl, env: &Rc<Env>) -> Eval<()> {
        for d in &decl.declarators {
            let value = match &d.init {
                Some(init) => self.eval(init, env)?,
                None if decl.kind == VarKind::Var => continue,
                None => Value::Undefined,
            };
            self.bind_pattern(&d.pattern, value, env, decl.kind.into())?;
        }
        Ok(())
    }

    // ── Patterns ─────────────────────────────────────────────────────

    fn bind_name(&self, name: &str, value: Value, env: &Rc<Env>, mode: BindMode) {
        match mode {
            BindMode::Var => {
                if env.assign(name, value.clone()).is_err() {
                    env.declare(name, Some(value), true);
                }
            }
            BindMode::Let => env.declare(name, Some(value), true),
            BindMode::Const => env.declare(name, Some(value), false),
        }
    }

    fn bind_pattern(&mut self, pattern: &Pattern, value: Value, env: &Rc<Env>, mode: BindMode) -> Eval<()> {
        match pattern {
            Pattern::Ident(name, _) => {
                self.bind_name(name, value, env, mode);
                Ok(())
            }
            Pattern::Object { props, rest, span } => {
                if value.is_nullish() {
                    return Err(Fault::type_error(
                        format!(
                            "Cannot destructure '{}' as it is {}.",
                            value.to_js_string(),
                            value.to_js_string()
                        ),
                        *span,
                    ));
                }
                for prop in props {
                    let v = self.get_property(&value, &prop.key, *span)?;
                    self.bind_elem(&prop.value, v, env, mode)?;
                }
                if let Some(rest) = rest {
                    let taken: Vec<&str> = props.iter().map(|p| p.key.as_str()).collect();
                    let remaining: Object = self
                        .own_entries(&value)
                        .into_iter()
                        .filter(|(k, _)| !taken.contains(&k.as_str()))
                        .collect();
                    self.bind_name(rest, Value::object(remaining), env, mode);
                }
                Ok(())
            }
            Pattern::Array { elems, rest, span } => {
                let items = self.iter_items(&value, *span)?;
                for (i, elem) in elems.iter().enumerate() {
                    if let Some(elem) = elem {
                        let v = items.get(i).cloned().unwrap_or(Value::Undefined);
                        self.bind_elem(elem, v, env, mode)?;
                    }
                }
                if let Some(rest) = rest {
                    let remaining = items.get(elems.len()..).unwrap_or_default().to_vec();
                    self.bind_pattern(rest, Value::array(remaining), env, mode)?;
                }
                Ok(())
            }
        }
    }

    fn bind_elem(&mut self, elem: &PatternElem, value: Value, env: &Rc<Env>, mode: BindMode) -> Eval<()> {
        let value = match (&value, &elem.default) {
            (Value::Undefined, Some(default)) => self.eval(default, env)?,
            _ => value,
        };
        self.bind_pattern(&elem.pattern, value, env, mode)
    }

    // ── Expressions ──────────────────────────────────────────────────

    pub(crate) fn eval(&mut self, expr: &Expr, env: &Rc<Env>) -> Eval<Value> {
        self.last_span = expr.span;
        match &expr.kind {
            ExprKind::Num(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::str(s)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(e) = exprs.get(i) {
                        out.push_str(&self.eval(e, env)?.to_js_string());
                        check_string_len(out.len(), expr.span)?;
                    }
                }
                Ok(Value::str(out))
            }
            ExprKind::Ident(name) => self.lookup(name, env, expr.span),
            ExprKind::Array(elems) => {
                let mut items = Vec::with_capacity(elems.len());
                for elem in elems {
                    match elem {
                        ArrayElem::Item(e) => items.push(self.eval(e, env)?),
                        ArrayElem::Spread(e) => {
                            let v = self.eval(e, env)?;
                            items.extend(self.iter_items(&v, e.span)?);
                        }
                        ArrayElem::Hole => items.push(Value::Undefined),
                    }
                }
                check_array_len(items.len(), expr.span)?;
                Ok(Value::array(items))
            }
            ExprKind::Object(props) => {
                let mut obj = Object::default();
                for prop in props {
                    match prop {
                        ObjectProp::KeyValue(key, value) => {
                            let key = match key {
                                PropKey::Static(k) => k.clone(),
                                PropKey::Computed(e) => self.eval(e, env)?.to_property_key(),
                            };
                            let value = self.eval(value, env)?;
                            obj.set(key, value);
                        }
                        ObjectProp::Spread(e) => {
                            let v = self.eval(e, env)?;
                            for (k, v) in self.own_entries(&v) {
                                obj.set(k, v);
                            }
                        }
                    }
                }
                Ok(Value::object(obj))
            }
            ExprKind::Function(def) => Ok(self.function_value(def, env)),
            ExprKind::Unary { op, arg } => {
                let v = self.eval(arg, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!v.truthy()),
                    UnaryOp::Neg => Value::Number(-v.to_number()),
                    UnaryOp::Plus => Value::Number(v.to_number()),
                    UnaryOp::TypeOf => Value::str(v.type_of()),
                })
            }
            ExprKind::Update {
                increment,
                prefix,
                target,
            } => {
                let place = self.place(target, env)?;
                let old = self.read_place(&place, env, target.span)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write_place(place, Value::Number(new), env, target.span)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Binary { op, left, right } => {
                let l = self.eval(left, env)?;
                let r = self.eval(right, env)?;
                binary(*op, &l, &r, expr.span)
            }
            ExprKind::Logical { op, left, right } => {
                let l = self.eval(left, env)?;
                let short = match op {
                    LogicalOp::And => !l.truthy(),
                    LogicalOp::Or => l.truthy(),
                    LogicalOp::Nullish => !l.is_nullish(),
                };
                if short {
                    Ok(l)
                } else {
                    self.eval(right, env)
                }
            }
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, env)?.truthy() {
                    self.eval(consequent, env)
                } else {
                    self.eval(alternate, env)
                }
            }
            ExprKind::Assign { op, target, value } => self.assign(*op, target, value, env, expr.span),
            ExprKind::Member { .. } | ExprKind::Call { .. } => {
                Ok(self.eval_chain(expr, env)?.unwrap_or(Value::Undefined))
            }
            ExprKind::New { callee, args } => {
                let f = self.eval(callee, env)?;
                let args = self.eval_args(args, env)?;
                self.construct(&f, args, expr.span, || callee_name(callee))
            }
            ExprKind::Jsx(el) => self.jsx(el, env),
        }
    }

    /// Evaluates member/call chains; `None` means an optional link short-circuited.
    fn eval_chain(&mut self, expr: &Expr, env: &Rc<Env>) -> Eval<Option<Value>> {
        match &expr.kind {
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let Some(obj) = self.eval_chain(object, env)? else {
                    return Ok(None);
                };
                if *optional && obj.is_nullish() {
                    return Ok(None);
                }
                let key = self.property_key(property, env)?;
                self.last_span = expr.span;
                Ok(Some(self.get_property(&obj, &key, expr.span)?))
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => {
                let Some(f) = self.eval_chain(callee, env)? else {
                    return Ok(None);
                };
                if *optional && f.is_nullish() {
                    return Ok(None);
                }
                let args = self.eval_args(args, env)?;
                self.last_span = expr.span;
                Ok(Some(self.call_value(&f, args, expr.span, || callee_name(callee))?))
            }
            _ => Ok(Some(self.eval(expr, env)?)),
        }
    }

    fn property_key(&mut self, property: &MemberProp, env: &Rc<Env>) -> Eval<String> {
        Ok(match property {
            MemberProp::Named(name) => name.clone(),
            MemberProp::Computed(e) => self.eval(e, env)?.to_property_key(),
        })
    }

    fn eval_args(&mut self, args: &[Arg], env: &Rc<Env>) -> Eval<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Expr(e) => out.push(self.eval(e, env)?),
                Arg::Spread(e) => {
                    let v = self.eval(e, env)?;
                    out.extend(self.iter_items(&v, e.span)?);
                }
            }
        }
        Ok(out)
    }

    fn assign(&mut self, op: AssignOp, target: &Expr, value: &Expr, env: &Rc<Env>, span: Span) -> Eval<Value> {
        let place = self.place(target, env)?;
        let result = match op {
            AssignOp::Assign => self.eval(value, env)?,
            AssignOp::Or | AssignOp::And | AssignOp::Nullish => {
                let current = self.read_place(&place, env, target.span)?;
                let keep = match op {
                    AssignOp::Or => current.truthy(),
                    AssignOp::And => !current.truthy(),
                    _ => !current.is_nullish(),
                };
                if keep {
                    return Ok(current);
                }
                self.eval(value, env)?
            }
            arith => {
                let current = self.read_place(&place, env, target.span)?;
                let rhs = self.eval(value, env)?;
                let op = match arith {
                    AssignOp::Add => BinaryOp::Add,
                    AssignOp::Sub => BinaryOp::Sub,
                    AssignOp::Mul => BinaryOp::Mul,
                    AssignOp::Div => BinaryOp::Div,
                    _ => BinaryOp::Rem,
                };
                binary(op, &current, &rhs, span)?
            }
        };
        self.write_place(place, result.clone(), env, target.span)?;
        Ok(result)
    }

    fn place(&mut self, target: &Expr, env: &Rc<Env>) -> Eval<Place> {
        match &target.kind {
            ExprKind::Ident(name) => Ok(Place::Var(name.clone())),
            ExprKind::Member {
                object, property, ..
            } => {
                let obj = self.eval(object, env)?;
                let key = self.property_key(property, env)?;
                Ok(Place::Prop(obj, key))
            }
            _ => Err(Fault::error("SyntaxError", "Invalid assignment target", target.span)),
        }
    }

    fn read_place(&mut self, place: &Place, env: &Rc<Env>, span: Span) -> Eval<Value> {
        match place {
            Place::Var(name) => self.lookup(name, env, span),
            Place::Prop(obj, key) => self.get_property(obj, key, span),
        }
    }

    fn write_place(&mut self, place: Place, value: Value, env: &Rc<Env>, span: Span) -> Eval<()> {
        match place {
            Place::Var(name) => env.assign(&name, value).map_err(|e| match e {
                AssignError::Const => Fault::type_error("Assignment to constant variable.", span),
                AssignError::Uninitialized => Fault::reference_error(
                    format!("Cannot access '{}' before initialization", name),
                    span,
                ),
                AssignError::Missing => {
                    Fault::reference_error(format!("{} is not defined", name), span)
                }
            }),
            Place::Prop(obj, key) => self.set_property(&obj, &key, value, span),
        }
    }

    // ── Calls ────────────────────────────────────────────────────────

    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        span: Span,
        name: impl FnOnce() -> String,
    ) -> Eval<Value> {
        match callee {
            Value::Function(f) => self.call(f, args, span),
            _ => Err(Fault::type_error(format!("{} is not a function", name()), span)),
        }
    }

    pub(crate) fn call(&mut self, func: &Rc<Function>, args: Vec<Value>, span: Span) -> Eval<Value> {
        match &**func {
            Function::Closure(closure) => {
                self.enter(span)?;
                self.tick()?;
                let result = self.invoke(closure, args);
                self.leave();
                result
            }
            Function::Native(native) => self.call_native(*native, args, span),
            Function::Method { receiver, name } => self.call_method(receiver, name, args, span),
        }
    }

    fn invoke(&mut self, closure: &Closure, args: Vec<Value>) -> Eval<Value> {
        let def = &closure.def;
        let env = Env::new(Some(closure.env.clone()));
        let mut args = args.into_iter();
        for param in &def.params {
            let value = args.next().unwrap_or(Value::Undefined);
            self.bind_elem(param, value, &env, BindMode::Let)?;
        }
        if let Some(rest) = &def.rest {
            self.bind_pattern(rest, Value::array(args.collect()), &env, BindMode::Let)?;
        }
        match &def.body {
            FunctionBody::Expr(e) => self.eval(e, &env),
            FunctionBody::Block(body) => {
                self.hoist_function_scope(body, &env);
                match self.exec_statements(body, &env)? {
                    Flow::Return(v) => Ok(v),
                    _ => Ok(Value::Undefined),
                }
            }
        }
    }

    fn construct(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        span: Span,
        name: impl FnOnce() -> String,
    ) -> Eval<Value> {
        match callee {
            Value::Function(f) => match &**f {
                Function::Native(
                    native @ (Native::ErrorCtor(_)
                    | Native::ArrayCtor
                    | Native::ObjectCtor
                    | Native::StringCtor
                    | Native::NumberCtor),
                ) => self.call_native(*native, args, span),
                _ => Err(Fault::type_error(format!("{} is not a constructor", name()), span)),
            },
            _ => Err(Fault::type_error(format!("{} is not a constructor", name()), span)),
        }
    }

    // ── Properties ───────────────────────────────────────────────────

    pub(crate) fn get_property(&mut self, obj: &Value, key: &str, span: Span) -> Eval<Value> {
        let method = |name: &str| {
            Value::Function(Rc::new(Function::Method {
                receiver: obj.clone(),
                name: Rc::from(name),
            }))
        };
        Ok(match obj {
            Value::Undefined | Value::Null => {
                return Err(Fault::type_error(
                    format!(
                        "Cannot read properties of {} (reading '{}')",
                        obj.to_js_string(),
                        key
                    ),
                    span,
                ))
            }
            Value::Str(s) => {
                if key == "length" {
                    Value::Number(s.chars().count() as f64)
                } else if let Some(i) = array_index(key) {
                    s.chars().nth(i).map_or(Value::Undefined, |c| Value::str(c.to_string()))
                } else if natives::STRING_METHODS.contains(&key) {
                    method(key)
                } else {
                    Value::Undefined
                }
            }
            Value::Number(_) | Value::Bool(_) => {
                if natives::NUMBER_METHODS.contains(&key) {
                    method(key)
                } else {
                    Value::Undefined
                }
            }
            Value::Array(items) => {
                if key == "length" {
                    Value::Number(items.borrow().len() as f64)
                } else if let Some(i) = array_index(key) {
                    items.borrow().get(i).cloned().unwrap_or(Value::Undefined)
                } else if natives::ARRAY_METHODS.contains(&key) {
                    method(key)
                } else {
                    Value::Undefined
                }
            }
            Value::Object(o) => match o.borrow().get(key) {
                Some(v) => v,
                None if natives::OBJECT_METHODS.contains(&key) => method(key),
                None => Value::Undefined,
            },
            Value::Function(f) => match &**f {
                Function::Native(native) => {
                    natives::static_member(*native, key).unwrap_or(Value::Undefined)
                }
                Function::Closure(c) if key == "name" => {
                    Value::str(c.def.name.as_deref().unwrap_or(""))
                }
                _ => Value::Undefined,
            },
            Value::Element(el) => match key {
                "props" => Value::object(el.props.clone()),
                "key" => el.key.as_deref().map_or(Value::Null, Value::str),
                "type" => match &el.ty {
                    ElementType::Host(tag) => Value::str(tag),
                    ElementType::Fragment => Value::native(Native::Fragment),
                    ElementType::StrictMode => Value::native(Native::StrictMode),
                    ElementType::Component(f) => Value::Function(f.clone()),
                },
                _ => Value::Undefined,
            },
        })
    }

    pub(crate) fn set_property(&mut self, obj: &Value, key: &str, value: Value, span: Span) -> Eval<()> {
        match obj {
            Value::Undefined | Value::Null => Err(Fault::type_error(
                format!(
                    "Cannot set properties of {} (setting '{}')",
                    obj.to_js_string(),
                    key
                ),
                span,
            )),
            Value::Array(items) => {
                if key == "length" {
                    let len = value.to_number();
                    if len < 0.0 || len.fract() != 0.0 || !len.is_finite() {
                        return Err(Fault::range_error("Invalid array length", span));
                    }
                    check_array_len(len as usize, span)?;
                    items.borrow_mut().resize(len as usize, Value::Undefined);
                } else if let Some(i) = array_index(key) {
                    check_array_len(i + 1, span)?;
                    let mut items = items.borrow_mut();
                    if i >= items.len() {
                        items.resize(i + 1, Value::Undefined);
                    }
                    items[i] = value;
                }
                Ok(())
            }
            Value::Object(o) => {
                o.borrow_mut().set(key, value);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Enumerable own entries, as `Object.entries` and object spread see them.
    pub(crate) fn own_entries(&self, value: &Value) -> Vec<(String, Value)> {
        match value {
            Value::Object(o) => o
                .borrow()
                .entries()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
            Value::Str(s) => s
                .chars()
                .enumerate()
                .map(|(i, c)| (i.to_string(), Value::str(c.to_string())))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Snapshot of an iterable's items.
    pub(crate) fn iter_items(&self, value: &Value, span: Span) -> Eval<Vec<Value>> {
        match value {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
            other => Err(Fault::type_error(
                format!("{} is not iterable", other.describe()),
                span,
            )),
        }
    }

    // ── Elements ─────────────────────────────────────────────────────

    fn jsx(&mut self, el: &JsxElement, env: &Rc<Env>) -> Eval<Value> {
        self.tick()?;
        let ty = match &el.name {
            JsxName::Host(tag) => ElementType::Host(tag.clone()),
            JsxName::Fragment => ElementType::Fragment,
            JsxName::Component(name) => {
                let v = self.lookup(name, env, el.span)?;
                element_type(&v, name, el.span)?
            }
            JsxName::Member(parts) => {
                let mut v = self.lookup(&parts[0], env, el.span)?;
                for part in &parts[1..] {
                    v = self.get_property(&v, part, el.span)?;
                }
                element_type(&v, &el.name.display(), el.span)?
            }
        };
        let mut props = Object::default();
        let mut key = None;
        for attr in &el.attrs {
            match attr {
                JsxAttr::Named { name, value } => {
                    let v = match value {
                        None => Value::Bool(true),
                        Some(JsxAttrValue::Str(s)) => Value::str(s),
                        Some(JsxAttrValue::Expr(e)) => self.eval(e, env)?,
                    };
                    set_prop(&mut props, &mut key, name, v);
                }
                JsxAttr::Spread(e) => {
                    let v = self.eval(e, env)?;
                    for (k, v) in self.own_entries(&v) {
                        set_prop(&mut props, &mut key, &k, v);
                    }
                }
            }
        }
        let mut children = Vec::with_capacity(el.children.len());
        for child in &el.children {
            children.push(match child {
                JsxChild::Text(text) => Value::str(text),
                JsxChild::Expr(e) => self.eval(e, env)?,
                JsxChild::Element(child) => self.jsx(child, env)?,
            });
        }
        attach_children(&mut props, children);
        Ok(Value::Element(Rc::new(Element {
            ty,
            props,
            key,
            span: el.span,
        })))
    }

    /// `React.createElement(type, props, ...children)`.
    pub(crate) fn create_element(&mut self, args: Vec<Value>, span: Span) -> Eval<Value> {
        let mut args = args.into_iter();
        let ty_value = args.next().unwrap_or(Value::Undefined);
        let ty = element_type(&ty_value, "createElement", span)?;
        let mut props = Object::default();
        let mut key = None;
        if let Some(config) = args.next() {
            for (k, v) in self.own_entries(&config) {
                set_prop(&mut props, &mut key, &k, v);
            }
        }
        let children: Vec<Value> = args.collect();
        attach_children(&mut props, children);
        Ok(Value::Element(Rc::new(Element {
            ty,
            props,
            key,
            span,
        })))
    }
}

fn set_prop(props: &mut Object, key: &mut Option<String>, name: &str, value: Value) {
    match name {
        "key" => *key = (!value.is_nullish()).then(|| value.to_js_string()),
        "ref" => {}
        _ => props.set(name, value),
    }
}

fn attach_children(props: &mut Object, mut children: Vec<Value>) {
    match children.len() {
        0 => {}
        1 => props.set("children", children.remove(0)),
        _ => props.set("children", Value::array(children)),
    }
}

fn element_type(value: &Value, name: &str, span: Span) -> Eval<ElementType> {
    match value {
        Value::Str(tag) => Ok(ElementType::Host(tag.to_string())),
        Value::Function(f) => Ok(match &**f {
            Function::Native(Native::Fragment) => ElementType::Fragment,
            Function::Native(Native::StrictMode) => ElementType::StrictMode,
            _ => ElementType::Component(f.clone()),
        }),
        other => Err(Fault::type_error(
            format!(
                "Element type is invalid: expected a string or a function but got: {} ({})",
                other.type_of(),
                name
            ),
            span,
        )),
    }
}

/// Canonical array index form: `0`, `1`, ... without leading zeros.
pub(crate) fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse().ok()
}

pub(crate) fn check_string_len(len: usize, span: Span) -> Eval<()> {
    if len > MAX_STRING_LEN {
        return Err(Fault::range_error("Invalid string length", span));
    }
    Ok(())
}

pub(crate) fn check_array_len(len: usize, span: Span) -> Eval<()> {
    if len > MAX_ARRAY_LEN {
        return Err(Fault::range_error("Invalid array length", span));
    }
    Ok(())
}

/// Source-like name of a callee for "is not a function" messages.
fn callee_name(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Member {
            object, property, ..
        } => match property {
            MemberProp::Named(p) => format!("{}.{}", callee_name(object), p),
            MemberProp::Computed(_) => format!("{}[...]", callee_name(object)),
        },
        ExprKind::Call { callee, .. } => format!("{}(...)", callee_name(callee)),
        _ => "expression".to_string(),
    }
}

pub(crate) fn binary(op: BinaryOp, l: &Value, r: &Value, span: Span) -> Eval<Value> {
    Ok(match op {
        BinaryOp::Add => {
            let (lp, rp) = (l.to_primitive(), r.to_primitive());
            if matches!(lp, Value::Str(_)) || matches!(rp, Value::Str(_)) {
                let (a, b) = (lp.to_js_string(), rp.to_js_string());
                check_string_len(a.len() + b.len(), span)?;
                Value::str(a + &b)
            } else {
                Value::Number(lp.to_number() + rp.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Pow => {
            let (base, exp) = (l.to_number(), r.to_number());
            if exp.is_nan() || (base.abs() == 1.0 && exp.is_infinite()) {
                Value::Number(f64::NAN)
            } else {
                Value::Number(base.powf(exp))
            }
        }
        BinaryOp::Eq => Value::Bool(l.loose_equals(r)),
        BinaryOp::Ne => Value::Bool(!l.loose_equals(r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_equals(r)),
        BinaryOp::StrictNe => Value::Bool(!l.strict_equals(r)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ord = compare(l, r);
            Value::Bool(match op {
                BinaryOp::Lt => ord == Some(std::cmp::Ordering::Less),
                BinaryOp::Gt => ord == Some(std::cmp::Ordering::Greater),
                BinaryOp::Le => matches!(ord, Some(o) if o != std::cmp::Ordering::Greater),
                _ => matches!(ord, Some(o) if o != std::cmp::Ordering::Less),
            })
        }
    })
}

fn compare(l: &Value, r: &Value) -> Option<std::cmp::Ordering> {
    match (l.to_primitive(), r.to_primitive()) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(&b)),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}
