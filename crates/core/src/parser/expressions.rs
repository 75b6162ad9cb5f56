use super::{describe, is_reserved, Parser};
use crate::ast::*;
use crate::error::CompileError;
use crate::lexer::{Template, Token};
use std::rc::Rc;

impl<'a> Parser<'a> {
    /// Full expression. Comma sequences are not part of the subset.
    pub(super) fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        self.parse_assignment_expr()
    }

    pub(super) fn parse_assignment_expr(&mut self) -> Result<Expr, CompileError> {
        self.enter()?;
        let expr = self.parse_assignment_inner();
        self.leave();
        expr
    }

    fn parse_assignment_inner(&mut self) -> Result<Expr, CompileError> {
        if self.is_word("async") {
            if let Some(next) = self.lookahead() {
                if !next.newline_before
                    && matches!(next.token, Token::LParen | Token::Ident(_))
                {
                    return Err(self.unsupported("async function"));
                }
            }
        }
        if let Token::Ident(w) = self.peek() {
            if !is_reserved(w) && matches!(self.lookahead(), Some(next) if next.token == Token::Arrow)
            {
                let (name, span) = self.take_ident()?;
                let params = vec![PatternElem {
                    pattern: Pattern::Ident(name, span),
                    default: None,
                }];
                return self.parse_arrow_body(params, None, span);
            }
        }
        if self.peek() == &Token::LParen && self.arrow_params_ahead() {
            let span = self.span();
            let (params, rest) = self.parse_params()?;
            return self.parse_arrow_body(params, rest, span);
        }

        let left = self.parse_conditional()?;
        let op = match self.peek() {
            Token::Assign => AssignOp::Assign,
            Token::PlusAssign => AssignOp::Add,
            Token::MinusAssign => AssignOp::Sub,
            Token::StarAssign => AssignOp::Mul,
            Token::SlashAssign => AssignOp::Div,
            Token::PercentAssign => AssignOp::Rem,
            Token::OrAssign => AssignOp::Or,
            Token::AndAssign => AssignOp::And,
            Token::NullishAssign => AssignOp::Nullish,
            _ => return Ok(left),
        };
        if !is_simple_target(&left) {
            return Err(CompileError::parse(
                left.span.line,
                left.span.column,
                "invalid assignment target",
            ));
        }
        self.advance()?;
        let value = self.parse_assignment_expr()?;
        let span = left.span;
        Ok(Expr::new(
            ExprKind::Assign {
                op,
                target: Box::new(left),
                value: Box::new(value),
            },
            span,
        ))
    }

    /// With the current token at `(`, scan to the matching `)` and report
    /// whether `=>` follows on the same line.
    fn arrow_params_ahead(&self) -> bool {
        let mut probe = self.lexer.clone();
        let mut depth = 1usize;
        loop {
            let tok = match probe.next_token() {
                Ok(t) => t,
                Err(_) => return false,
            };
            match tok.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Token::Eof => return false,
                _ => {}
            }
        }
        matches!(probe.next_token(), Ok(next) if next.token == Token::Arrow && !next.newline_before)
    }

    fn parse_arrow_body(
        &mut self,
        params: Vec<PatternElem>,
        rest: Option<Pattern>,
        span: Span,
    ) -> Result<Expr, CompileError> {
        if self.cur.newline_before {
            return Err(self.err("line terminator not permitted before '=>'"));
        }
        self.expect(Token::Arrow)?;
        let body = if self.peek() == &Token::LBrace {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_assignment_expr()?))
        };
        let def = FunctionDef {
            name: None,
            params,
            rest,
            body,
            is_arrow: true,
            span,
        };
        Ok(Expr::new(ExprKind::Function(Rc::new(def)), span))
    }

    // -- Operators by precedence ------------------------------

    fn parse_conditional(&mut self) -> Result<Expr, CompileError> {
        let test = self.parse_logical_or()?;
        if self.peek() != &Token::Question {
            return Ok(test);
        }
        self.advance()?;
        let consequent = self.parse_assignment_expr()?;
        self.expect(Token::Colon)?;
        let alternate = self.parse_assignment_expr()?;
        let span = test.span;
        Ok(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            },
            span,
        ))
    }

    fn parse_logical_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_logical_and()?;
        loop {
            let op = match self.peek() {
                Token::OrOr => LogicalOp::Or,
                Token::Nullish => LogicalOp::Nullish,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_logical_and()?;
            left = logical(op, left, right);
        }
    }

    fn parse_logical_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_equality()?;
        while self.peek() == &Token::AndAnd {
            self.advance()?;
            let right = self.parse_equality()?;
            left = logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::StrictEq => BinaryOp::StrictEq,
                Token::StrictNe => BinaryOp::StrictNe,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
    }

    fn parse_relational(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::Ident(w) if w == "instanceof" || w == "in" => {
                    return Err(self.unsupported(&format!("'{}' operator", w)))
                }
                Token::Ident(w) if w == "as" || w == "satisfies" => {
                    return Err(self.unsupported("TypeScript type assertion"))
                }
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_exponent()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance()?;
            let right = self.parse_exponent()?;
            left = binary(op, left, right);
        }
    }

    fn parse_exponent(&mut self) -> Result<Expr, CompileError> {
        let base = self.parse_unary()?;
        if self.peek() != &Token::StarStar {
            return Ok(base);
        }
        self.advance()?;
        self.enter()?;
        let exponent = self.parse_exponent();
        self.leave();
        Ok(binary(BinaryOp::Pow, base, exponent?))
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        let span = self.span();
        let op = match self.peek() {
            Token::Bang => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            Token::Plus => UnaryOp::Plus,
            Token::Ident(w) if w == "typeof" => UnaryOp::TypeOf,
            Token::Ident(w) if w == "void" || w == "delete" || w == "await" => {
                return Err(self.unsupported(&format!("'{}' operator", w)))
            }
            Token::PlusPlus | Token::MinusMinus => {
                let increment = self.peek() == &Token::PlusPlus;
                self.advance()?;
                let target = self.parse_nested_unary()?;
                return self.update(increment, true, target, span);
            }
            _ => return self.parse_postfix(),
        };
        self.advance()?;
        let arg = self.parse_nested_unary()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                arg: Box::new(arg),
            },
            span,
        ))
    }

    fn parse_nested_unary(&mut self) -> Result<Expr, CompileError> {
        self.enter()?;
        let expr = self.parse_unary();
        self.leave();
        expr
    }

    fn parse_postfix(&mut self) -> Result<Expr, CompileError> {
        let expr = self.parse_call_member()?;
        match self.peek() {
            Token::PlusPlus | Token::MinusMinus if !self.cur.newline_before => {
                let increment = self.peek() == &Token::PlusPlus;
                self.advance()?;
                let span = expr.span;
                self.update(increment, false, expr, span)
            }
            _ => Ok(expr),
        }
    }

    fn update(
        &self,
        increment: bool,
        prefix: bool,
        target: Expr,
        span: Span,
    ) -> Result<Expr, CompileError> {
        if !is_simple_target(&target) {
            return Err(CompileError::parse(
                target.span.line,
                target.span.column,
                "invalid update target",
            ));
        }
        Ok(Expr::new(
            ExprKind::Update {
                increment,
                prefix,
                target: Box::new(target),
            },
            span,
        ))
    }

    // -- Calls and member access ------------------------------

    fn parse_call_member(&mut self) -> Result<Expr, CompileError> {
        let mut expr = if self.is_word("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            let span = expr.span;
            match self.peek() {
                Token::Dot => {
                    self.advance()?;
                    let name = self.take_property_name()?;
                    expr = member(expr, MemberProp::Named(name), false, span);
                }
                Token::QuestionDot => {
                    self.advance()?;
                    match self.peek() {
                        Token::LParen => {
                            let args = self.parse_args()?;
                            expr = call(expr, args, true, span);
                        }
                        Token::LBracket => {
                            self.advance()?;
                            let key = self.parse_expression()?;
                            self.expect(Token::RBracket)?;
                            expr = member(expr, MemberProp::Computed(Box::new(key)), true, span);
                        }
                        _ => {
                            let name = self.take_property_name()?;
                            expr = member(expr, MemberProp::Named(name), true, span);
                        }
                    }
                }
                Token::LBracket => {
                    self.advance()?;
                    let key = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    expr = member(expr, MemberProp::Computed(Box::new(key)), false, span);
                }
                Token::LParen => {
                    let args = self.parse_args()?;
                    expr = call(expr, args, false, span);
                }
                Token::Template(_) => return Err(self.unsupported("tagged template")),
                Token::Bang if !self.cur.newline_before && self.non_null_assertion_ahead() => {
                    return Err(self.unsupported("TypeScript non-null assertion"))
                }
                _ => return Ok(expr),
            }
        }
    }

    /// `x!.y` or `x!)`: a postfix `!` that cannot start a new operand.
    fn non_null_assertion_ahead(&self) -> bool {
        matches!(
            self.lookahead(),
            Some(next) if matches!(next.token, Token::Dot | Token::RParen | Token::Semi | Token::RBracket)
        )
    }

    fn parse_new(&mut self) -> Result<Expr, CompileError> {
        let span = self.span();
        self.advance()?;
        self.enter()?;
        let callee = if self.is_word("new") {
            self.parse_new()
        } else {
            self.parse_primary()
        };
        self.leave();
        let mut callee = callee?;
        loop {
            let at = callee.span;
            match self.peek() {
                Token::Dot => {
                    self.advance()?;
                    let name = self.take_property_name()?;
                    callee = member(callee, MemberProp::Named(name), false, at);
                }
                Token::LBracket => {
                    self.advance()?;
                    let key = self.parse_expression()?;
                    self.expect(Token::RBracket)?;
                    callee = member(callee, MemberProp::Computed(Box::new(key)), false, at);
                }
                _ => break,
            }
        }
        let args = if self.peek() == &Token::LParen {
            self.parse_args()?
        } else {
            Vec::new()
        };
        Ok(Expr::new(
            ExprKind::New {
                callee: Box::new(callee),
                args,
            },
            span,
        ))
    }

    fn parse_args(&mut self) -> Result<Vec<Arg>, CompileError> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        while self.peek() != &Token::RParen {
            if self.eat(&Token::Ellipsis)? {
                args.push(Arg::Spread(self.parse_assignment_expr()?));
            } else {
                args.push(Arg::Expr(self.parse_assignment_expr()?));
            }
            if self.peek() != &Token::RParen {
                self.expect(Token::Comma)?;
            }
        }
        self.advance()?;
        Ok(args)
    }

    // -- Primary expressions ----------------------------------

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        let span = self.span();
        match self.peek().clone() {
            Token::Num(n) => {
                self.advance()?;
                Ok(Expr::new(ExprKind::Num(n), span))
            }
            Token::Str(s) => {
                self.advance()?;
                Ok(Expr::new(ExprKind::Str(s), span))
            }
            Token::Template(t) => {
                self.advance()?;
                self.parse_template(t, span)
            }
            Token::Ident(w) => match w.as_str() {
                "true" | "false" => {
                    self.advance()?;
                    Ok(Expr::new(ExprKind::Bool(w == "true"), span))
                }
                "null" => {
                    self.advance()?;
                    Ok(Expr::new(ExprKind::Null, span))
                }
                "function" => {
                    let f = self.parse_function()?;
                    Ok(Expr::new(ExprKind::Function(f), span))
                }
                "this" | "super" => Err(self.unsupported(&format!("'{}'", w))),
                "class" => Err(self.unsupported("class")),
                "import" => Err(self.unsupported("dynamic import")),
                "async" => Err(self.unsupported("async function")),
                _ => {
                    let (name, span) = self.take_ident()?;
                    Ok(Expr::new(ExprKind::Ident(name), span))
                }
            },
            Token::LParen => {
                self.advance()?;
                let inner = self.parse_expression()?;
                if self.peek() == &Token::Comma {
                    return Err(self.unsupported("comma operator"));
                }
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_object_literal(),
            Token::Lt => self.parse_jsx(),
            Token::Slash | Token::SlashAssign => {
                Err(self.err("regular expression literals are not supported"))
            }
            other => Err(self.err(format!("unexpected {}", describe(&other)))),
        }
    }

    fn parse_template(&mut self, template: Template, span: Span) -> Result<Expr, CompileError> {
        let mut exprs = Vec::with_capacity(template.exprs.len());
        for sub in &template.exprs {
            let chars: Vec<char> = sub.source.chars().collect();
            let mut inner = Parser::starting_at(&chars, sub.line, sub.column, self.depth)?;
            let expr = inner.parse_expression()?;
            if inner.peek() != &Token::Eof {
                return Err(inner.err(format!(
                    "unexpected {} in template substitution",
                    describe(inner.peek())
                )));
            }
            exprs.push(expr);
        }
        Ok(Expr::new(
            ExprKind::Template {
                quasis: template.quasis,
                exprs,
            },
            span,
        ))
    }

    fn parse_array_literal(&mut self) -> Result<Expr, CompileError> {
        let span = self.expect(Token::LBracket)?;
        let mut elems = Vec::new();
        while self.peek() != &Token::RBracket {
            if self.eat(&Token::Comma)? {
                elems.push(ArrayElem::Hole);
                continue;
            }
            if self.eat(&Token::Ellipsis)? {
                elems.push(ArrayElem::Spread(self.parse_assignment_expr()?));
            } else {
                elems.push(ArrayElem::Item(self.parse_assignment_expr()?));
            }
            if self.peek() != &Token::RBracket {
                self.expect(Token::Comma)?;
            }
        }
        self.advance()?;
        Ok(Expr::new(ExprKind::Array(elems), span))
    }

    fn parse_object_literal(&mut self) -> Result<Expr, CompileError> {
        let span = self.expect(Token::LBrace)?;
        let mut props = Vec::new();
        while self.peek() != &Token::RBrace {
            if self.eat(&Token::Ellipsis)? {
                props.push(ObjectProp::Spread(self.parse_assignment_expr()?));
            } else {
                props.push(self.parse_object_prop()?);
            }
            if self.peek() != &Token::RBrace {
                self.expect(Token::Comma)?;
            }
        }
        self.advance()?;
        Ok(Expr::new(ExprKind::Object(props), span))
    }

    fn parse_object_prop(&mut self) -> Result<ObjectProp, CompileError> {
        let key_span = self.span();
        let mut shorthand = None;
        let key = match self.peek().clone() {
            Token::Ident(w) => {
                if (w == "get" || w == "set" || w == "async")
                    && matches!(self.lookahead(), Some(next) if matches!(next.token, Token::Ident(_) | Token::Str(_) | Token::LBracket))
                {
                    return Err(self.unsupported("getter, setter, or async method"));
                }
                self.advance()?;
                shorthand = Some(w.clone());
                PropKey::Static(w)
            }
            Token::Str(s) => {
                self.advance()?;
                PropKey::Static(s)
            }
            Token::Num(n) => {
                self.advance()?;
                PropKey::Static(number_key(n))
            }
            Token::LBracket => {
                self.advance()?;
                let key = self.parse_assignment_expr()?;
                self.expect(Token::RBracket)?;
                PropKey::Computed(Box::new(key))
            }
            other => {
                return Err(self.err(format!(
                    "expected property name, got {}",
                    describe(&other)
                )))
            }
        };

        match self.peek() {
            Token::Colon => {
                self.advance()?;
                Ok(ObjectProp::KeyValue(key, self.parse_assignment_expr()?))
            }
            Token::LParen => {
                let (params, rest) = self.parse_params()?;
                let body = FunctionBody::Block(self.parse_block()?);
                let name = match &key {
                    PropKey::Static(s) => Some(s.clone()),
                    PropKey::Computed(_) => None,
                };
                let def = FunctionDef {
                    name,
                    params,
                    rest,
                    body,
                    is_arrow: false,
                    span: key_span,
                };
                Ok(ObjectProp::KeyValue(
                    key,
                    Expr::new(ExprKind::Function(Rc::new(def)), key_span),
                ))
            }
            _ => match shorthand {
                Some(name) if !is_reserved(&name) => Ok(ObjectProp::KeyValue(
                    key,
                    Expr::new(ExprKind::Ident(name), key_span),
                )),
                _ => Err(self.err(format!("expected ':', got {}", describe(self.peek())))),
            },
        }
    }
}

fn is_simple_target(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Ident(_) => true,
        ExprKind::Member { optional, .. } => !optional,
        _ => false,
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span;
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    let span = left.span;
    Expr::new(
        ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn member(object: Expr, property: MemberProp, optional: bool, span: Span) -> Expr {
    Expr::new(
        ExprKind::Member {
            object: Box::new(object),
            property,
            optional,
        },
        span,
    )
}

fn call(callee: Expr, args: Vec<Arg>, optional: bool, span: Span) -> Expr {
    Expr::new(
        ExprKind::Call {
            callee: Box::new(callee),
            args,
            optional,
        },
        span,
    )
}

/// Property key text for a numeric literal key, as `String(n)` would print it.
fn number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
