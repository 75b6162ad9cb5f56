/// Recursive-descent parser from component source to `ast::Program`.
/// Every node carries the line/column of its first token.
/// No name resolution happens here; that is the resolve pass's job.
use crate::ast::{Program, Span};
use crate::error::CompileError;
use crate::lexer::{Lexer, Spanned, Token};

mod expressions;
mod jsx;
mod statements;

/// Statement, expression, and JSX nesting beyond this depth is rejected so
/// hostile input cannot exhaust the host stack.
pub const MAX_NESTING: usize = 64;

/// Words that can never be used as binding or reference names.
const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "export", "extends", "false", "finally", "for", "function", "if", "import", "in",
    "instanceof", "let", "new", "null", "return", "super", "switch", "this", "throw", "true",
    "try", "typeof", "var", "void", "while", "with", "yield", "await", "enum",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Parse component source into a program.
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let chars: Vec<char> = source.chars().collect();
    let mut parser = Parser::new(&chars)?;
    parser.parse_program()
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    cur: Spanned,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(chars: &'a [char]) -> Result<Self, CompileError> {
        Parser::starting_at(chars, 1, 1, 0)
    }

    /// A parser over a nested source fragment, such as a template
    /// substitution, positioned at its original line/column.
    fn starting_at(
        chars: &'a [char],
        line: u32,
        column: u32,
        depth: usize,
    ) -> Result<Self, CompileError> {
        let mut lexer = Lexer::starting_at(chars, line, column);
        let cur = lexer.next_token()?;
        Ok(Parser { lexer, cur, depth })
    }

    fn peek(&self) -> &Token {
        &self.cur.token
    }

    fn span(&self) -> Span {
        Span::new(self.cur.line, self.cur.column)
    }

    fn advance(&mut self) -> Result<Spanned, CompileError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.cur, next))
    }

    /// The token after the current one, without consuming anything.
    fn lookahead(&self) -> Option<Spanned> {
        self.lexer.clone().next_token().ok()
    }

    fn eat(&mut self, token: &Token) -> Result<bool, CompileError> {
        if self.peek() == token {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, token: Token) -> Result<Span, CompileError> {
        if self.peek() == &token {
            let span = self.span();
            self.advance()?;
            Ok(span)
        } else {
            Err(self.err(format!(
                "expected {}, got {}",
                describe(&token),
                describe(self.peek())
            )))
        }
    }

    fn err(&self, message: impl Into<String>) -> CompileError {
        CompileError::parse(self.cur.line, self.cur.column, message)
    }

    fn unexpected(&self) -> CompileError {
        self.err(format!("unexpected {}", describe(self.peek())))
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(self.peek(), Token::Ident(x) if x == w)
    }

    fn expect_word(&mut self, w: &str) -> Result<(), CompileError> {
        if self.is_word(w) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.err(format!("expected '{}', got {}", w, describe(self.peek()))))
        }
    }

    /// Take a non-reserved identifier.
    fn take_ident(&mut self) -> Result<(String, Span), CompileError> {
        let span = self.span();
        match self.peek() {
            Token::Ident(w) if !is_reserved(w) => {
                let w = w.clone();
                self.advance()?;
                Ok((w, span))
            }
            Token::Ident(w) => Err(self.err(format!("'{}' is a reserved word", w))),
            other => Err(self.err(format!("expected identifier, got {}", describe(other)))),
        }
    }

    /// Take any identifier-like word, reserved or not (property names).
    fn take_property_name(&mut self) -> Result<String, CompileError> {
        match self.peek() {
            Token::Ident(w) => {
                let w = w.clone();
                self.advance()?;
                Ok(w)
            }
            other => Err(self.err(format!(
                "expected property name, got {}",
                describe(other)
            ))),
        }
    }

    /// Statement terminator with automatic semicolon insertion.
    fn consume_semicolon(&mut self) -> Result<(), CompileError> {
        match self.peek() {
            Token::Semi => {
                self.advance()?;
                Ok(())
            }
            Token::RBrace | Token::Eof => Ok(()),
            _ if self.cur.newline_before => Ok(()),
            other => Err(self.err(format!("expected ';', got {}", describe(other)))),
        }
    }

    fn enter(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(self.err("source is nested too deeply"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn unsupported(&self, construct: &str) -> CompileError {
        self.err(format!("{} is not supported in preview components", construct))
    }
}

/// Human-readable token description for diagnostics.
pub(crate) fn describe(token: &Token) -> String {
    let s = match token {
        Token::Ident(w) => return format!("'{}'", w),
        Token::Str(s) => return format!("string \"{}\"", s),
        Token::Num(n) => return format!("number {}", n),
        Token::Template(_) => "template literal",
        Token::JsxText(_) => "JSX text",
        Token::LBrace => "'{'",
        Token::RBrace => "'}'",
        Token::LParen => "'('",
        Token::RParen => "')'",
        Token::LBracket => "'['",
        Token::RBracket => "']'",
        Token::Semi => "';'",
        Token::Comma => "','",
        Token::Dot => "'.'",
        Token::Ellipsis => "'...'",
        Token::QuestionDot => "'?.'",
        Token::Question => "'?'",
        Token::Colon => "':'",
        Token::Arrow => "'=>'",
        Token::Assign => "'='",
        Token::PlusAssign => "'+='",
        Token::MinusAssign => "'-='",
        Token::StarAssign => "'*='",
        Token::SlashAssign => "'/='",
        Token::PercentAssign => "'%='",
        Token::OrAssign => "'||='",
        Token::AndAssign => "'&&='",
        Token::NullishAssign => "'??='",
        Token::Eq => "'=='",
        Token::StrictEq => "'==='",
        Token::Ne => "'!='",
        Token::StrictNe => "'!=='",
        Token::Lt => "'<'",
        Token::Le => "'<='",
        Token::Gt => "'>'",
        Token::Ge => "'>='",
        Token::Plus => "'+'",
        Token::Minus => "'-'",
        Token::Star => "'*'",
        Token::StarStar => "'**'",
        Token::Slash => "'/'",
        Token::Percent => "'%'",
        Token::PlusPlus => "'++'",
        Token::MinusMinus => "'--'",
        Token::Bang => "'!'",
        Token::AndAnd => "'&&'",
        Token::OrOr => "'||'",
        Token::Nullish => "'??'",
        Token::Eof => "end of input",
    };
    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn parse_ok(src: &str) -> Program {
        match parse(src) {
            Ok(p) => p,
            Err(e) => panic!("parse failed: {}", e),
        }
    }

    fn single_expr(src: &str) -> Expr {
        let program = parse_ok(src);
        match program.body.into_iter().next() {
            Some(Stmt::Expr(e)) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn parses_arrow_component_with_jsx() {
        let program = parse_ok("const CodeComponent = () => <div>Hi</div>;");
        let Stmt::Var(decl) = &program.body[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.kind, VarKind::Const);
        let init = decl.declarators[0].init.as_ref().unwrap();
        let ExprKind::Function(f) = &init.kind else {
            panic!("expected arrow function");
        };
        assert!(f.is_arrow);
        let FunctionBody::Expr(body) = &f.body else {
            panic!("expected concise body");
        };
        let ExprKind::Jsx(el) = &body.kind else {
            panic!("expected JSX body");
        };
        assert_eq!(el.name, JsxName::Host("div".into()));
        assert!(matches!(&el.children[..], [JsxChild::Text(t)] if t == "Hi"));
    }

    #[test]
    fn malformed_jsx_is_a_parse_error() {
        let err = parse("const CodeComponent = () => <div").unwrap_err();
        assert_eq!(err.stage, crate::error::CompileStage::Parse);
        assert!(!err.message.is_empty());
    }

    #[test]
    fn parses_destructured_params_and_defaults() {
        let program = parse_ok("function Card({ title, size = 2, ...rest }, [a, , b]) { return title; }");
        let Stmt::Function(f) = &program.body[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name.as_deref(), Some("Card"));
        assert_eq!(f.params.len(), 2);
        let names: Vec<&str> = f.params[0]
            .pattern
            .bound_names()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["title", "size", "rest"]);
        let names: Vec<&str> = f.params[1]
            .pattern
            .bound_names()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn parenthesized_expression_is_not_an_arrow() {
        let e = single_expr("(a + b) * c;");
        assert!(matches!(
            e.kind,
            ExprKind::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn automatic_semicolons_on_newlines() {
        let program = parse_ok("const a = 1\nconst b = 2\nreturnValue(a)\n");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn return_followed_by_newline_returns_undefined() {
        let program = parse_ok("function f() {\n  return\n  1\n}");
        let Stmt::Function(f) = &program.body[0] else {
            panic!("expected function");
        };
        let FunctionBody::Block(stmts) = &f.body else {
            panic!("expected block");
        };
        assert!(matches!(stmts[0], Stmt::Return(None, _)));
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn precedence_of_logical_and_conditional() {
        let e = single_expr("a || b && c ? d : e;");
        let ExprKind::Conditional { test, .. } = e.kind else {
            panic!("expected conditional");
        };
        let ExprKind::Logical { op, right, .. } = test.kind else {
            panic!("expected logical");
        };
        assert_eq!(op, LogicalOp::Or);
        assert!(matches!(
            right.kind,
            ExprKind::Logical {
                op: LogicalOp::And,
                ..
            }
        ));
    }

    #[test]
    fn parses_imports_and_exports() {
        let program = parse_ok(
            "import React, { useState as useS } from 'react';\nimport * as Icons from 'lucide-react';\nexport default CodeComponent;",
        );
        let Stmt::Import(first) = &program.body[0] else {
            panic!("expected import");
        };
        assert_eq!(first.source, "react");
        assert_eq!(
            first.specifiers,
            vec![
                ImportSpecifier::Default {
                    local: "React".into()
                },
                ImportSpecifier::Named {
                    imported: "useState".into(),
                    local: "useS".into()
                },
            ]
        );
        let Stmt::Import(second) = &program.body[1] else {
            panic!("expected import");
        };
        assert_eq!(
            second.specifiers,
            vec![ImportSpecifier::Namespace {
                local: "Icons".into()
            }]
        );
        assert!(matches!(program.body[2], Stmt::ExportDefault(_)));
    }

    #[test]
    fn template_substitutions_are_parsed() {
        let e = single_expr("`count: ${items.length + 1}`;");
        let ExprKind::Template { quasis, exprs } = e.kind else {
            panic!("expected template");
        };
        assert_eq!(quasis, vec!["count: ".to_string(), String::new()]);
        assert!(matches!(exprs[0].kind, ExprKind::Binary { .. }));
    }

    #[test]
    fn optional_chaining_and_calls() {
        let e = single_expr("user?.profile?.name.toUpperCase();");
        let ExprKind::Call { callee, .. } = e.kind else {
            panic!("expected call");
        };
        assert!(matches!(callee.kind, ExprKind::Member { .. }));
    }

    #[test]
    fn unsupported_constructs_are_named() {
        let err = parse("class A {}").unwrap_err();
        assert!(err.message.contains("class"));
        let err = parse("const r = /ab+c/;").unwrap_err();
        assert!(err.message.contains("regular expression"));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let src = format!("{}1{}", "(".repeat(400), ")".repeat(400));
        let err = parse(&src).unwrap_err();
        assert!(err.message.contains("nested too deeply"));
    }

    #[test]
    fn invalid_assignment_target() {
        let err = parse("a + b = 3;").unwrap_err();
        assert!(err.message.contains("invalid assignment target"));
    }
}
