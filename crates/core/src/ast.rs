//! AST for component source.
//!
//! Produced by the parser, checked by the resolve pass, and executed by the
//! sandbox interpreter. Function definitions are reference counted so that
//! runtime closures can share them without copying bodies.

use std::rc::Rc;

// ──────────────────────────────────────────────
// Positions
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

// ──────────────────────────────────────────────
// Statements
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<Declarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Var(VarDecl),
    Function(Rc<FunctionDef>),
    Return(Option<Expr>, Span),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        kind: VarKind,
        pattern: Pattern,
        iterable: Expr,
        body: Box<Stmt>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    Break(Span),
    Continue(Span),
    Throw(Expr, Span),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Expr(Expr),
    Import(ImportDecl),
    /// `export default <expr>`; evaluated for its side effects only.
    ExportDefault(Expr),
    Empty,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSpecifier {
    /// `import React from "react"`
    Default { local: String },
    /// `import * as Icons from "lucide-react"`
    Namespace { local: String },
    /// `import { Upload as UploadIcon } from "lucide-react"`
    Named { imported: String, local: String },
}

impl ImportSpecifier {
    pub fn local(&self) -> &str {
        match self {
            ImportSpecifier::Default { local }
            | ImportSpecifier::Namespace { local }
            | ImportSpecifier::Named { local, .. } => local,
        }
    }
}

// ──────────────────────────────────────────────
// Functions and patterns
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<PatternElem>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    /// Concise arrow body: `() => expr`
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

/// A binding target with an optional default, as in `{ a = 1 }` or `(x = 2)`.
#[derive(Debug, Clone)]
pub struct PatternElem {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Ident(String, Span),
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<String>,
        span: Span,
    },
    Array {
        elems: Vec<Option<PatternElem>>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProp {
    pub key: String,
    pub value: PatternElem,
}

impl Pattern {
    /// Every identifier this pattern binds, in source order.
    pub fn bound_names(&self) -> Vec<(&str, Span)> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<(&'a str, Span)>) {
        match self {
            Pattern::Ident(name, span) => out.push((name.as_str(), *span)),
            Pattern::Object { props, rest, span } => {
                for p in props {
                    p.value.pattern.collect_names(out);
                }
                if let Some(r) = rest {
                    out.push((r.as_str(), *span));
                }
            }
            Pattern::Array { elems, rest, .. } => {
                for e in elems.iter().flatten() {
                    e.pattern.collect_names(out);
                }
                if let Some(r) = rest {
                    r.collect_names(out);
                }
            }
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Pattern::Ident(_, span)
            | Pattern::Object { span, .. }
            | Pattern::Array { span, .. } => *span,
        }
    }
}

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Or,
    And,
    Nullish,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Num(f64),
    Str(String),
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Bool(bool),
    Null,
    Ident(String),
    Array(Vec<ArrayElem>),
    Object(Vec<ObjectProp>),
    Function(Rc<FunctionDef>),
    Unary {
        op: UnaryOp,
        arg: Box<Expr>,
    },
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: MemberProp,
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    Jsx(Box<JsxElement>),
}

#[derive(Debug, Clone)]
pub enum ArrayElem {
    Item(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone)]
pub enum ObjectProp {
    KeyValue(PropKey, Expr),
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum PropKey {
    Static(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum MemberProp {
    Named(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone)]
pub enum Arg {
    Expr(Expr),
    Spread(Expr),
}

// ──────────────────────────────────────────────
// JSX
// ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JsxElement {
    pub name: JsxName,
    pub attrs: Vec<JsxAttr>,
    pub children: Vec<JsxChild>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsxName {
    /// Lower-case intrinsic tag such as `div` or `svg`.
    Host(String),
    /// Capitalized identifier resolved in scope, such as `Card`.
    Component(String),
    /// Dotted path such as `React.Fragment`.
    Member(Vec<String>),
    /// `<>...</>`
    Fragment,
}

impl JsxName {
    pub fn display(&self) -> String {
        match self {
            JsxName::Host(n) | JsxName::Component(n) => n.clone(),
            JsxName::Member(parts) => parts.join("."),
            JsxName::Fragment => String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum JsxAttr {
    /// `name`, `name="text"`, or `name={expr}`; `None` means bare `true`.
    Named {
        name: String,
        value: Option<JsxAttrValue>,
    },
    Spread(Expr),
}

#[derive(Debug, Clone)]
pub enum JsxAttrValue {
    Str(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum JsxChild {
    Text(String),
    Expr(Expr),
    Element(JsxElement),
}
