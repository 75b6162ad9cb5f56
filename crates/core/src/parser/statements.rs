use super::{describe, Parser};
use crate::ast::*;
use crate::error::CompileError;
use crate::lexer::Token;
use std::rc::Rc;

impl<'a> Parser<'a> {
    pub(super) fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut body = Vec::new();
        while self.peek() != &Token::Eof {
            body.push(self.parse_statement(true)?);
        }
        Ok(Program { body })
    }

    fn parse_statement(&mut self, top_level: bool) -> Result<Stmt, CompileError> {
        self.enter()?;
        let stmt = self.parse_statement_inner(top_level);
        self.leave();
        stmt
    }

    fn parse_statement_inner(&mut self, top_level: bool) -> Result<Stmt, CompileError> {
        let word = match self.peek() {
            Token::LBrace => return Ok(Stmt::Block(self.parse_block()?)),
            Token::Semi => {
                self.advance()?;
                return Ok(Stmt::Empty);
            }
            Token::Ident(w) => w.clone(),
            _ => return self.parse_expression_statement(),
        };
        match word.as_str() {
            "const" | "let" | "var" => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon()?;
                Ok(Stmt::Var(decl))
            }
            "function" => {
                let f = self.parse_function()?;
                if f.name.is_none() {
                    return Err(CompileError::parse(
                        f.span.line,
                        f.span.column,
                        "function declarations require a name",
                    ));
                }
                Ok(Stmt::Function(f))
            }
            "return" => self.parse_return(),
            "if" => self.parse_if(),
            "for" => self.parse_for(),
            "while" => {
                self.advance()?;
                self.expect(Token::LParen)?;
                let test = self.parse_expression()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement(false)?);
                Ok(Stmt::While { test, body })
            }
            "break" | "continue" => {
                let span = self.span();
                self.advance()?;
                if matches!(self.peek(), Token::Ident(_)) && !self.cur.newline_before {
                    return Err(self.unsupported("labelled break and continue"));
                }
                self.consume_semicolon()?;
                Ok(if word == "break" {
                    Stmt::Break(span)
                } else {
                    Stmt::Continue(span)
                })
            }
            "throw" => {
                let span = self.span();
                self.advance()?;
                if self.cur.newline_before {
                    return Err(self.err("illegal newline after throw"));
                }
                let value = self.parse_expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(value, span))
            }
            "try" => self.parse_try(),
            "import" if top_level => self.parse_import(),
            "import" => Err(self.err("import declarations may only appear at top level")),
            "export" if top_level => self.parse_export(),
            "export" => Err(self.err("export declarations may only appear at top level")),
            "class" => Err(self.unsupported("class")),
            "switch" => Err(self.unsupported("switch")),
            "do" => Err(self.unsupported("do-while")),
            "async" => Err(self.unsupported("async")),
            "with" => Err(self.unsupported("with")),
            "debugger" => Err(self.unsupported("debugger")),
            "interface" | "enum" | "type"
                if matches!(self.lookahead(), Some(next) if matches!(next.token, Token::Ident(_))) =>
            {
                Err(self.unsupported("TypeScript syntax"))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt, CompileError> {
        let expr = self.parse_expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    pub(super) fn parse_block(&mut self) -> Result<Vec<Stmt>, CompileError> {
        self.expect(Token::LBrace)?;
        let mut body = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.peek() == &Token::Eof {
                return Err(self.err("expected '}', got end of input"));
            }
            body.push(self.parse_statement(false)?);
        }
        self.advance()?;
        Ok(body)
    }

    fn var_kind(&self) -> Option<VarKind> {
        match self.peek() {
            Token::Ident(w) if w == "const" => Some(VarKind::Const),
            Token::Ident(w) if w == "let" => Some(VarKind::Let),
            Token::Ident(w) if w == "var" => Some(VarKind::Var),
            _ => None,
        }
    }

    fn parse_var_decl(&mut self) -> Result<VarDecl, CompileError> {
        let span = self.span();
        let kind = self.var_kind().ok_or_else(|| self.unexpected())?;
        self.advance()?;
        let mut declarators = Vec::new();
        loop {
            let decl = self.parse_declarator(kind)?;
            declarators.push(decl);
            if !self.eat(&Token::Comma)? {
                break;
            }
        }
        Ok(VarDecl {
            kind,
            declarators,
            span,
        })
    }

    fn parse_declarator(&mut self, kind: VarKind) -> Result<Declarator, CompileError> {
        let pattern = self.parse_binding_pattern()?;
        if self.peek() == &Token::Colon {
            return Err(self.unsupported("TypeScript type annotation"));
        }
        let init = if self.eat(&Token::Assign)? {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        if init.is_none() && (kind == VarKind::Const || !matches!(pattern, Pattern::Ident(..))) {
            let at = pattern.span();
            return Err(CompileError::parse(
                at.line,
                at.column,
                "missing initializer in declaration",
            ));
        }
        Ok(Declarator { pattern, init })
    }

    // -- Binding patterns -------------------------------------

    pub(super) fn parse_binding_pattern(&mut self) -> Result<Pattern, CompileError> {
        self.enter()?;
        let pattern = match self.peek() {
            Token::LBrace => self.parse_object_pattern(),
            Token::LBracket => self.parse_array_pattern(),
            _ => {
                let (name, span) = self.take_ident()?;
                Ok(Pattern::Ident(name, span))
            }
        };
        self.leave();
        pattern
    }

    pub(super) fn parse_binding_elem(&mut self) -> Result<PatternElem, CompileError> {
        let pattern = self.parse_binding_pattern()?;
        let default = if self.eat(&Token::Assign)? {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        Ok(PatternElem { pattern, default })
    }

    fn parse_object_pattern(&mut self) -> Result<Pattern, CompileError> {
        let span = self.expect(Token::LBrace)?;
        let mut props = Vec::new();
        let mut rest = None;
        while self.peek() != &Token::RBrace {
            if self.eat(&Token::Ellipsis)? {
                rest = Some(self.take_ident()?.0);
                if self.peek() != &Token::RBrace {
                    return Err(self.err("rest element must be last in an object pattern"));
                }
                break;
            }
            let key_span = self.span();
            let key = match self.peek() {
                Token::Str(s) => {
                    let s = s.clone();
                    self.advance()?;
                    s
                }
                _ => self.take_property_name()?,
            };
            let value = if self.eat(&Token::Colon)? {
                self.parse_binding_elem()?
            } else {
                if super::is_reserved(&key) {
                    return Err(CompileError::parse(
                        key_span.line,
                        key_span.column,
                        format!("'{}' is a reserved word", key),
                    ));
                }
                let default = if self.eat(&Token::Assign)? {
                    Some(self.parse_assignment_expr()?)
                } else {
                    None
                };
                PatternElem {
                    pattern: Pattern::Ident(key.clone(), key_span),
                    default,
                }
            };
            props.push(ObjectPatternProp { key, value });
            if self.peek() != &Token::RBrace {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RBrace)?;
        Ok(Pattern::Object { props, rest, span })
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, CompileError> {
        let span = self.expect(Token::LBracket)?;
        let mut elems = Vec::new();
        let mut rest = None;
        while self.peek() != &Token::RBracket {
            if self.eat(&Token::Comma)? {
                elems.push(None);
                continue;
            }
            if self.eat(&Token::Ellipsis)? {
                rest = Some(Box::new(self.parse_binding_pattern()?));
                if self.peek() != &Token::RBracket {
                    return Err(self.err("rest element must be last in an array pattern"));
                }
                break;
            }
            elems.push(Some(self.parse_binding_elem()?));
            if self.peek() != &Token::RBracket {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RBracket)?;
        Ok(Pattern::Array { elems, rest, span })
    }

    // -- Functions --------------------------------------------

    /// `function name?(params) { body }`, current token at `function`.
    pub(super) fn parse_function(&mut self) -> Result<Rc<FunctionDef>, CompileError> {
        let span = self.span();
        self.expect_word("function")?;
        if self.peek() == &Token::Star {
            return Err(self.unsupported("generator function"));
        }
        let name = match self.peek() {
            Token::Ident(_) => Some(self.take_ident()?.0),
            _ => None,
        };
        let (params, rest) = self.parse_params()?;
        let body = FunctionBody::Block(self.parse_block()?);
        Ok(Rc::new(FunctionDef {
            name,
            params,
            rest,
            body,
            is_arrow: false,
            span,
        }))
    }

    pub(super) fn parse_params(
        &mut self,
    ) -> Result<(Vec<PatternElem>, Option<Pattern>), CompileError> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        let mut rest = None;
        while self.peek() != &Token::RParen {
            if self.eat(&Token::Ellipsis)? {
                rest = Some(self.parse_binding_pattern()?);
                if self.peek() != &Token::RParen {
                    return Err(self.err("rest parameter must be last"));
                }
                break;
            }
            let elem = self.parse_binding_elem()?;
            if self.peek() == &Token::Colon {
                return Err(self.unsupported("TypeScript type annotation"));
            }
            params.push(elem);
            if self.peek() != &Token::RParen {
                self.expect(Token::Comma)?;
            }
        }
        self.expect(Token::RParen)?;
        if self.peek() == &Token::Colon {
            return Err(self.unsupported("TypeScript type annotation"));
        }
        Ok((params, rest))
    }

    // -- Control flow -----------------------------------------

    fn parse_return(&mut self) -> Result<Stmt, CompileError> {
        let span = self.span();
        self.advance()?;
        let ends = matches!(self.peek(), Token::Semi | Token::RBrace | Token::Eof)
            || self.cur.newline_before;
        let value = if ends {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume_semicolon()?;
        Ok(Stmt::Return(value, span))
    }

    fn parse_if(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        self.expect(Token::LParen)?;
        let test = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let consequent = Box::new(self.parse_statement(false)?);
        let alternate = if self.is_word("else") {
            self.advance()?;
            Some(Box::new(self.parse_statement(false)?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        if self.is_word("await") {
            return Err(self.unsupported("for await"));
        }
        self.expect(Token::LParen)?;

        let init = if let Some(kind) = self.var_kind() {
            let span = self.span();
            self.advance()?;
            let pattern = self.parse_binding_pattern()?;
            if self.is_word("of") {
                self.advance()?;
                let iterable = self.parse_assignment_expr()?;
                self.expect(Token::RParen)?;
                let body = Box::new(self.parse_statement(false)?);
                return Ok(Stmt::ForOf {
                    kind,
                    pattern,
                    iterable,
                    body,
                });
            }
            if self.is_word("in") {
                return Err(self.unsupported("for-in"));
            }
            let first_init = if self.eat(&Token::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            let mut declarators = vec![Declarator {
                pattern,
                init: first_init,
            }];
            while self.eat(&Token::Comma)? {
                declarators.push(self.parse_declarator(kind)?);
            }
            Some(ForInit::Var(VarDecl {
                kind,
                declarators,
                span,
            }))
        } else if self.peek() == &Token::Semi {
            None
        } else {
            let expr = self.parse_expression()?;
            if self.is_word("of") || self.is_word("in") {
                return Err(self.err("for-of and for-in loops must declare their variable"));
            }
            Some(ForInit::Expr(expr))
        };
        self.expect(Token::Semi)?;

        let test = if self.peek() == &Token::Semi {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::Semi)?;
        let update = if self.peek() == &Token::RParen {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(Token::RParen)?;
        let body = Box::new(self.parse_statement(false)?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        let block = self.parse_block()?;
        let handler = if self.is_word("catch") {
            self.advance()?;
            let param = if self.eat(&Token::LParen)? {
                let p = self.parse_binding_pattern()?;
                self.expect(Token::RParen)?;
                Some(p)
            } else {
                None
            };
            let body = self.parse_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finalizer = if self.is_word("finally") {
            self.advance()?;
            Some(self.parse_block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.err("missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
        })
    }

    // -- Modules ----------------------------------------------

    fn parse_import(&mut self) -> Result<Stmt, CompileError> {
        let span = self.span();
        self.advance()?;
        let mut specifiers = Vec::new();

        if let Token::Str(source) = self.peek() {
            // Side-effect import such as a stylesheet.
            let source = source.clone();
            self.advance()?;
            self.consume_semicolon()?;
            return Ok(Stmt::Import(ImportDecl {
                specifiers,
                source,
                span,
            }));
        }
        if self.is_word("type") {
            if let Some(next) = self.lookahead() {
                if matches!(next.token, Token::LBrace | Token::Ident(_)) && !matches!(next.token, Token::Ident(ref w) if w == "from")
                {
                    return Err(self.unsupported("TypeScript type import"));
                }
            }
        }

        if matches!(self.peek(), Token::Ident(_)) {
            let (local, _) = self.take_ident()?;
            specifiers.push(ImportSpecifier::Default { local });
            if !self.eat(&Token::Comma)? {
                return self.finish_import(specifiers, span);
            }
        }
        match self.peek() {
            Token::Star => {
                self.advance()?;
                self.expect_word("as")?;
                let (local, _) = self.take_ident()?;
                specifiers.push(ImportSpecifier::Namespace { local });
            }
            Token::LBrace => {
                self.advance()?;
                while self.peek() != &Token::RBrace {
                    let imported = self.take_property_name()?;
                    let local = if self.is_word("as") {
                        self.advance()?;
                        self.take_ident()?.0
                    } else if super::is_reserved(&imported) {
                        return Err(self.err(format!("'{}' is a reserved word", imported)));
                    } else {
                        imported.clone()
                    };
                    specifiers.push(ImportSpecifier::Named { imported, local });
                    if self.peek() != &Token::RBrace {
                        self.expect(Token::Comma)?;
                    }
                }
                self.advance()?;
            }
            other => {
                return Err(self.err(format!(
                    "expected import specifiers, got {}",
                    describe(other)
                )))
            }
        }
        self.finish_import(specifiers, span)
    }

    fn finish_import(
        &mut self,
        specifiers: Vec<ImportSpecifier>,
        span: Span,
    ) -> Result<Stmt, CompileError> {
        self.expect_word("from")?;
        let source = match self.peek() {
            Token::Str(s) => s.clone(),
            other => {
                return Err(self.err(format!(
                    "expected module name, got {}",
                    describe(other)
                )))
            }
        };
        self.advance()?;
        self.consume_semicolon()?;
        Ok(Stmt::Import(ImportDecl {
            specifiers,
            source,
            span,
        }))
    }

    fn parse_export(&mut self) -> Result<Stmt, CompileError> {
        self.advance()?;
        if self.is_word("default") {
            self.advance()?;
            if self.is_word("function") {
                let f = self.parse_function()?;
                if f.name.is_some() {
                    return Ok(Stmt::Function(f));
                }
                let span = f.span;
                return Ok(Stmt::ExportDefault(Expr::new(ExprKind::Function(f), span)));
            }
            let value = self.parse_assignment_expr()?;
            self.consume_semicolon()?;
            return Ok(Stmt::ExportDefault(value));
        }
        if self.var_kind().is_some() || self.is_word("function") {
            return self.parse_statement(false);
        }
        if self.eat(&Token::LBrace)? {
            // `export { A, B as C }` names bindings that already exist.
            while self.peek() != &Token::RBrace {
                self.take_ident()?;
                if self.is_word("as") {
                    self.advance()?;
                    self.take_property_name()?;
                }
                if self.peek() != &Token::RBrace {
                    self.expect(Token::Comma)?;
                }
            }
            self.advance()?;
            self.consume_semicolon()?;
            return Ok(Stmt::Empty);
        }
        Err(self.unexpected())
    }
}
