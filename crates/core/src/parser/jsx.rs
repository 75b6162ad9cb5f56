use super::{describe, Parser};
use crate::ast::*;
use crate::error::CompileError;
use crate::lexer::Token;

impl<'a> Parser<'a> {
    /// JSX element or fragment in expression position; current token is `<`.
    pub(super) fn parse_jsx(&mut self) -> Result<Expr, CompileError> {
        let span = self.span();
        self.advance()?;
        let element = self.parse_jsx_after_lt(span)?;
        // The lexer sits just past the closing `>`; resume ordinary scanning.
        self.cur = self.lexer.next_token()?;
        Ok(Expr::new(ExprKind::Jsx(Box::new(element)), span))
    }

    /// Parse an element whose `<` has been consumed. On return the lexer is
    /// positioned immediately after the element's final `>` and `self.cur`
    /// is stale.
    fn parse_jsx_after_lt(&mut self, span: Span) -> Result<JsxElement, CompileError> {
        self.enter()?;
        let element = self.parse_jsx_element_inner(span);
        self.leave();
        element
    }

    fn parse_jsx_element_inner(&mut self, span: Span) -> Result<JsxElement, CompileError> {
        if matches!(self.peek(), Token::Gt) {
            self.finish_gt()?;
            let children = self.parse_jsx_children(&JsxName::Fragment, span)?;
            return Ok(JsxElement {
                name: JsxName::Fragment,
                attrs: Vec::new(),
                children,
                span,
            });
        }

        let name = self.parse_jsx_name()?;
        let attrs = self.parse_jsx_attrs()?;

        if self.peek() == &Token::Slash {
            self.advance()?;
            self.finish_gt()?;
            return Ok(JsxElement {
                name,
                attrs,
                children: Vec::new(),
                span,
            });
        }
        self.finish_gt()?;
        let children = self.parse_jsx_children(&name, span)?;
        Ok(JsxElement {
            name,
            attrs,
            children,
            span,
        })
    }

    /// Consume the `>` that ends a tag without scanning past it.
    fn finish_gt(&mut self) -> Result<(), CompileError> {
        match self.peek() {
            Token::Gt | Token::Ge => {
                let (start, line, column) = (self.cur.start, self.cur.line, self.cur.column);
                self.lexer.seek(start + 1, line, column + 1);
                Ok(())
            }
            other => Err(self.err(format!("expected '>' in JSX tag, got {}", describe(other)))),
        }
    }

    /// One name segment, allowing dashes as in `aria-label` or `my-widget`.
    fn jsx_name_segment(&mut self) -> Result<String, CompileError> {
        if !matches!(self.peek(), Token::Ident(_)) {
            return Err(self.err(format!("expected JSX name, got {}", describe(self.peek()))));
        }
        let (start, line, column) = (self.cur.start, self.cur.line, self.cur.column);
        self.lexer.seek(start, line, column);
        let segment = match self.lexer.next_jsx_name()?.token {
            Token::Ident(s) => s,
            _ => return Err(self.err("expected JSX name")),
        };
        self.cur = self.lexer.next_token()?;
        Ok(segment)
    }

    fn parse_jsx_name(&mut self) -> Result<JsxName, CompileError> {
        let first = self.jsx_name_segment()?;
        if self.peek() == &Token::Dot {
            let mut parts = vec![first];
            while self.eat(&Token::Dot)? {
                parts.push(self.take_property_name()?);
            }
            return Ok(JsxName::Member(parts));
        }
        if self.peek() == &Token::Colon {
            return Err(self.unsupported("namespaced JSX tag"));
        }
        let host = first.contains('-') || first.chars().next().is_some_and(|c| c.is_lowercase());
        Ok(if host {
            JsxName::Host(first)
        } else {
            JsxName::Component(first)
        })
    }

    fn parse_jsx_attrs(&mut self) -> Result<Vec<JsxAttr>, CompileError> {
        let mut attrs = Vec::new();
        loop {
            match self.peek() {
                Token::Slash | Token::Gt | Token::Ge => return Ok(attrs),
                Token::LBrace => {
                    self.advance()?;
                    self.expect(Token::Ellipsis)?;
                    let value = self.parse_assignment_expr()?;
                    self.expect(Token::RBrace)?;
                    attrs.push(JsxAttr::Spread(value));
                }
                Token::Ident(_) => {
                    let mut name = self.jsx_name_segment()?;
                    if self.eat(&Token::Colon)? {
                        name.push(':');
                        name.push_str(&self.jsx_name_segment()?);
                    }
                    let value = if self.peek() == &Token::Assign {
                        Some(self.parse_jsx_attr_value()?)
                    } else {
                        None
                    };
                    attrs.push(JsxAttr::Named { name, value });
                }
                Token::Eof => return Err(self.err("unterminated JSX tag")),
                other => {
                    return Err(self.err(format!(
                        "unexpected {} in JSX attributes",
                        describe(other)
                    )))
                }
            }
        }
    }

    /// Current token is `=`; the lexer sits right after it.
    fn parse_jsx_attr_value(&mut self) -> Result<JsxAttrValue, CompileError> {
        match self.lexer.peek_significant() {
            Some('"') | Some('\'') => {
                let text = match self.lexer.next_jsx_string()?.token {
                    Token::Str(s) => s,
                    _ => return Err(self.err("expected JSX attribute string")),
                };
                self.cur = self.lexer.next_token()?;
                Ok(JsxAttrValue::Str(text))
            }
            _ => {
                self.advance()?;
                match self.peek() {
                    Token::LBrace => {
                        self.advance()?;
                        if self.peek() == &Token::RBrace {
                            return Err(self.err("JSX attributes must not be empty expressions"));
                        }
                        let value = self.parse_assignment_expr()?;
                        self.expect(Token::RBrace)?;
                        Ok(JsxAttrValue::Expr(value))
                    }
                    Token::Lt => Ok(JsxAttrValue::Expr(self.parse_jsx()?)),
                    other => Err(self.err(format!(
                        "expected attribute value, got {}",
                        describe(other)
                    ))),
                }
            }
        }
    }

    /// Children up to and including the matching closing tag.
    fn parse_jsx_children(
        &mut self,
        open: &JsxName,
        span: Span,
    ) -> Result<Vec<JsxChild>, CompileError> {
        let mut children = Vec::new();
        loop {
            let tok = self.lexer.next_jsx_child()?;
            match tok.token {
                Token::JsxText(raw) => {
                    let text = clean_jsx_text(&raw);
                    if !text.is_empty() {
                        children.push(JsxChild::Text(text));
                    }
                }
                Token::LBrace => {
                    self.cur = self.lexer.next_token()?;
                    if self.peek() == &Token::RBrace {
                        // `{/* comment */}`
                        continue;
                    }
                    if self.peek() == &Token::Ellipsis {
                        return Err(self.unsupported("spread child"));
                    }
                    let expr = self.parse_assignment_expr()?;
                    if self.peek() != &Token::RBrace {
                        return Err(self.err(format!(
                            "expected '}}' after JSX expression, got {}",
                            describe(self.peek())
                        )));
                    }
                    children.push(JsxChild::Expr(expr));
                }
                Token::Lt => {
                    let child_span = Span::new(tok.line, tok.column);
                    self.cur = self.lexer.next_token()?;
                    if self.peek() == &Token::Slash {
                        self.advance()?;
                        self.parse_closing_tag(open)?;
                        return Ok(children);
                    }
                    let element = self.parse_jsx_after_lt(child_span)?;
                    children.push(JsxChild::Element(element));
                }
                Token::Eof => {
                    return Err(CompileError::parse(
                        span.line,
                        span.column,
                        format!("unterminated JSX element <{}>", open.display()),
                    ))
                }
                _ => return Err(self.err("unexpected token in JSX children")),
            }
        }
    }

    /// After `</`: the name must match the opening tag.
    fn parse_closing_tag(&mut self, open: &JsxName) -> Result<(), CompileError> {
        let name = if matches!(self.peek(), Token::Gt) {
            JsxName::Fragment
        } else {
            self.parse_jsx_name()?
        };
        if &name != open {
            return Err(self.err(format!(
                "expected corresponding closing tag for <{}>, found </{}>",
                open.display(),
                name.display()
            )));
        }
        self.finish_gt()
    }
}

/// Collapse JSX text whitespace the way JSX compilers do: lines are trimmed,
/// blank lines dropped, and the remainder joined with single spaces.
pub(crate) fn clean_jsx_text(raw: &str) -> String {
    let lines: Vec<String> = raw.split('\n').map(|l| l.replace('\t', " ")).collect();
    let last_non_empty = lines
        .iter()
        .rposition(|l| l.chars().any(|c| c != ' ' && c != '\r'));
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let mut trimmed: &str = line;
        if i != 0 {
            trimmed = trimmed.trim_start_matches([' ', '\r']);
        }
        if i != lines.len() - 1 {
            trimmed = trimmed.trim_end_matches([' ', '\r']);
        }
        if trimmed.is_empty() {
            continue;
        }
        out.push_str(trimmed);
        if last_non_empty.is_some_and(|last| i < last) {
            out.push(' ');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::clean_jsx_text;
    use crate::ast::*;
    use crate::parser::parse;

    fn jsx(src: &str) -> JsxElement {
        let program = parse(src).unwrap_or_else(|e| panic!("parse failed: {}", e));
        match program.body.into_iter().next() {
            Some(Stmt::Expr(Expr {
                kind: ExprKind::Jsx(el),
                ..
            })) => *el,
            other => panic!("expected JSX expression statement, got {:?}", other),
        }
    }

    #[test]
    fn whitespace_cleanup_matches_jsx_rules() {
        assert_eq!(clean_jsx_text("\n   Hello\n   world  \n"), "Hello world");
        assert_eq!(clean_jsx_text("  inline  "), "  inline  ");
        assert_eq!(clean_jsx_text("\n   \n"), "");
        assert_eq!(clean_jsx_text("a\n"), "a");
        assert_eq!(clean_jsx_text(" "), " ");
        assert_eq!(clean_jsx_text("   "), "   ");
    }

    #[test]
    fn nested_elements_attributes_and_expressions() {
        let el = jsx(
            r#"<Card className="p-4 text-sm" count={items.length} disabled>
                 <CardTitle>Hello, {name}!</CardTitle>
                 <br/>
               </Card>;"#,
        );
        assert_eq!(el.name, JsxName::Component("Card".into()));
        assert_eq!(el.attrs.len(), 3);
        match &el.attrs[0] {
            JsxAttr::Named {
                name,
                value: Some(JsxAttrValue::Str(s)),
            } => {
                assert_eq!(name, "className");
                assert_eq!(s, "p-4 text-sm");
            }
            other => panic!("unexpected attr {:?}", other),
        }
        assert!(matches!(&el.attrs[2], JsxAttr::Named { value: None, .. }));
        assert_eq!(el.children.len(), 2);
        let JsxChild::Element(title) = &el.children[0] else {
            panic!("expected element child");
        };
        assert_eq!(title.children.len(), 3);
        assert!(matches!(&title.children[0], JsxChild::Text(t) if t == "Hello, "));
        assert!(matches!(&title.children[2], JsxChild::Text(t) if t == "!"));
    }

    #[test]
    fn fragments_members_and_dashed_names() {
        let el = jsx(r#"<><React.StrictMode><my-widget aria-label='x "y"' /></React.StrictMode></>;"#);
        assert_eq!(el.name, JsxName::Fragment);
        let JsxChild::Element(strict) = &el.children[0] else {
            panic!("expected element");
        };
        assert_eq!(
            strict.name,
            JsxName::Member(vec!["React".into(), "StrictMode".into()])
        );
        let JsxChild::Element(widget) = &strict.children[0] else {
            panic!("expected element");
        };
        assert_eq!(widget.name, JsxName::Host("my-widget".into()));
        assert!(matches!(
            &widget.attrs[0],
            JsxAttr::Named { name, value: Some(JsxAttrValue::Str(s)) } if name == "aria-label" && s == "x \"y\""
        ));
    }

    #[test]
    fn apostrophes_in_text_and_comments_in_children() {
        let el = jsx("<p>\n  Don't stop {/* note */}\n</p>;");
        assert!(matches!(&el.children[..], [JsxChild::Text(t)] if t == "Don't stop "));
    }

    #[test]
    fn spread_attributes_and_arrow_children() {
        let el = jsx("<ul {...props}>{items.map((i) => <li key={i}>{i}</li>)}</ul>;");
        assert!(matches!(el.attrs[0], JsxAttr::Spread(_)));
        assert!(matches!(el.children[0], JsxChild::Expr(_)));
    }

    #[test]
    fn mismatched_closing_tag_is_error() {
        let err = parse("<div><span></div></span>;").unwrap_err();
        assert!(err.message.contains("closing tag"), "{}", err.message);
    }

    #[test]
    fn unterminated_element_is_error() {
        let err = parse("const x = <div><p>hi</p>").unwrap_err();
        assert!(err.message.contains("unterminated JSX element"), "{}", err.message);
    }

    #[test]
    fn comparison_after_jsx_still_parses() {
        let program = parse("const ok = a < b && c >= d;").unwrap();
        assert_eq!(program.body.len(), 1);
    }
}
