use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords, distinguished in the parser
    Ident(String),
    /// String literal (content without quotes, escapes resolved)
    Str(String),
    Num(f64),
    /// Template literal: literal chunks interleaved with raw `${}` sources
    Template(Template),
    /// Run of JSX child text, produced only in JSX child mode
    JsxText(String),
    // Punctuation
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Ellipsis,
    QuestionDot,
    Question,
    Colon,
    Arrow,
    // Assignment
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    OrAssign,
    AndAssign,
    NullishAssign,
    // Comparison
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    // Arithmetic
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    // Logical
    Bang,
    AndAnd,
    OrOr,
    Nullish,
    Eof,
}

/// A lexed template literal. `quasis.len() == exprs.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub quasis: Vec<String>,
    pub exprs: Vec<TemplateExpr>,
}

/// Raw source of one `${...}` substitution and where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateExpr {
    pub source: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
    pub column: u32,
    /// Char offset of the first character of the token.
    pub start: usize,
    /// A line terminator appeared between the previous token and this one.
    pub newline_before: bool,
}

/// On-demand scanner over a char slice.
///
/// The parser drives it one token at a time because JSX children need a
/// different scanning mode than ordinary expressions; `seek` lets the parser
/// re-scan from a known offset when it switches modes.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    chars: &'a [char],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(chars: &'a [char]) -> Self {
        Lexer::starting_at(chars, 1, 1)
    }

    /// A lexer whose first character sits at the given source position.
    pub fn starting_at(chars: &'a [char], line: u32, column: u32) -> Self {
        Lexer {
            chars,
            pos: 0,
            line,
            column,
        }
    }

    pub fn seek(&mut self, pos: usize, line: u32, column: u32) {
        self.pos = pos;
        self.line = line;
        self.column = column;
    }

    /// The next character after whitespace and comments, without consuming.
    pub fn peek_significant(&self) -> Option<char> {
        let mut probe = self.clone();
        probe.skip_trivia().ok()?;
        probe.peek_char(0)
    }

    /// Current char offset, line, and column.
    pub fn position(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.column)
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn err(&self, message: impl Into<String>) -> CompileError {
        CompileError::lex(self.line, self.column, message)
    }

    /// Skip whitespace and comments; report whether a newline was crossed.
    fn skip_trivia(&mut self) -> Result<bool, CompileError> {
        let mut newline = false;
        while let Some(c) = self.peek_char(0) {
            if c == '\n' {
                newline = true;
                self.bump();
            } else if c.is_whitespace() {
                self.bump();
            } else if c == '/' && self.peek_char(1) == Some('/') {
                while let Some(c) = self.peek_char(0) {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if c == '/' && self.peek_char(1) == Some('*') {
                let (line, column) = (self.line, self.column);
                self.bump();
                self.bump();
                loop {
                    match self.bump() {
                        None => {
                            return Err(CompileError::lex(
                                line,
                                column,
                                "unterminated block comment",
                            ))
                        }
                        Some('\n') => newline = true,
                        Some('*') if self.peek_char(0) == Some('/') => {
                            self.bump();
                            break;
                        }
                        Some(_) => {}
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    pub fn next_token(&mut self) -> Result<Spanned, CompileError> {
        let newline_before = self.skip_trivia()?;
        let (line, column, start) = (self.line, self.column, self.pos);
        let token = match self.peek_char(0) {
            None => Token::Eof,
            Some(c) => self.scan_token(c)?,
        };
        Ok(Spanned {
            token,
            line,
            column,
            start,
            newline_before,
        })
    }

    fn scan_token(&mut self, c: char) -> Result<Token, CompileError> {
        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }
        if c == '`' {
            return self.scan_template();
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_char(1).is_some_and(|d| d.is_ascii_digit()))
        {
            return self.scan_number();
        }
        if is_ident_start(c) {
            let mut word = String::new();
            while let Some(c) = self.peek_char(0) {
                if !is_ident_part(c) {
                    break;
                }
                word.push(c);
                self.bump();
            }
            return Ok(Token::Ident(word));
        }
        self.scan_punct(c)
    }

    fn scan_punct(&mut self, c: char) -> Result<Token, CompileError> {
        let next = self.peek_char(1);
        let third = self.peek_char(2);
        let (token, width) = match (c, next, third) {
            ('{', _, _) => (Token::LBrace, 1),
            ('}', _, _) => (Token::RBrace, 1),
            ('(', _, _) => (Token::LParen, 1),
            (')', _, _) => (Token::RParen, 1),
            ('[', _, _) => (Token::LBracket, 1),
            (']', _, _) => (Token::RBracket, 1),
            (';', _, _) => (Token::Semi, 1),
            (',', _, _) => (Token::Comma, 1),
            (':', _, _) => (Token::Colon, 1),
            ('.', Some('.'), Some('.')) => (Token::Ellipsis, 3),
            ('.', _, _) => (Token::Dot, 1),
            // `a?.5:b` is a conditional, not optional chaining.
            ('?', Some('.'), t) if !t.is_some_and(|d| d.is_ascii_digit()) => {
                (Token::QuestionDot, 2)
            }
            ('?', Some('?'), Some('=')) => (Token::NullishAssign, 3),
            ('?', Some('?'), _) => (Token::Nullish, 2),
            ('?', _, _) => (Token::Question, 1),
            ('=', Some('='), Some('=')) => (Token::StrictEq, 3),
            ('=', Some('='), _) => (Token::Eq, 2),
            ('=', Some('>'), _) => (Token::Arrow, 2),
            ('=', _, _) => (Token::Assign, 1),
            ('!', Some('='), Some('=')) => (Token::StrictNe, 3),
            ('!', Some('='), _) => (Token::Ne, 2),
            ('!', _, _) => (Token::Bang, 1),
            ('<', Some('='), _) => (Token::Le, 2),
            ('<', _, _) => (Token::Lt, 1),
            ('>', Some('='), _) => (Token::Ge, 2),
            ('>', _, _) => (Token::Gt, 1),
            ('+', Some('+'), _) => (Token::PlusPlus, 2),
            ('+', Some('='), _) => (Token::PlusAssign, 2),
            ('+', _, _) => (Token::Plus, 1),
            ('-', Some('-'), _) => (Token::MinusMinus, 2),
            ('-', Some('='), _) => (Token::MinusAssign, 2),
            ('-', _, _) => (Token::Minus, 1),
            ('*', Some('*'), _) => (Token::StarStar, 2),
            ('*', Some('='), _) => (Token::StarAssign, 2),
            ('*', _, _) => (Token::Star, 1),
            ('/', Some('='), _) => (Token::SlashAssign, 2),
            ('/', _, _) => (Token::Slash, 1),
            ('%', Some('='), _) => (Token::PercentAssign, 2),
            ('%', _, _) => (Token::Percent, 1),
            ('&', Some('&'), Some('=')) => (Token::AndAssign, 3),
            ('&', Some('&'), _) => (Token::AndAnd, 2),
            ('|', Some('|'), Some('=')) => (Token::OrAssign, 3),
            ('|', Some('|'), _) => (Token::OrOr, 2),
            ('&', _, _) | ('|', _, _) | ('^', _, _) | ('~', _, _) => {
                return Err(self.err(format!("bitwise operator '{}' is not supported", c)))
            }
            _ => return Err(self.err(format!("unexpected character '{}'", c))),
        };
        for _ in 0..width {
            self.bump();
        }
        Ok(token)
    }

    fn scan_number(&mut self) -> Result<Token, CompileError> {
        let (line, column) = (self.line, self.column);
        if self.peek_char(0) == Some('0') && matches!(self.peek_char(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(c) = self.peek_char(0) {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                } else if c != '_' {
                    break;
                }
                self.bump();
            }
            return u64::from_str_radix(&digits, 16)
                .map(|n| Token::Num(n as f64))
                .map_err(|_| CompileError::lex(line, column, "invalid hexadecimal literal"));
        }

        let mut text = String::new();
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(c) = self.peek_char(0) {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '_' {
                // numeric separator
            } else if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                text.push(c);
                if matches!(self.peek_char(1), Some('+') | Some('-')) {
                    self.bump();
                    text.push(self.chars[self.pos]);
                }
            } else {
                break;
            }
            self.bump();
        }
        if self.peek_char(0).is_some_and(is_ident_start) {
            return Err(CompileError::lex(
                line,
                column,
                "identifier starts immediately after numeric literal",
            ));
        }
        text.parse::<f64>()
            .map(Token::Num)
            .map_err(|_| CompileError::lex(line, column, format!("invalid number '{}'", text)))
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, CompileError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(CompileError::lex(line, column, "unterminated string literal"))
                }
                Some(c) if c == quote => break,
                Some('\\') => self.scan_escape(&mut s)?,
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }

    fn scan_escape(&mut self, out: &mut String) -> Result<(), CompileError> {
        match self.bump() {
            None => return Err(self.err("unterminated escape sequence")),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('\n') => {}
            Some('u') => {
                let code = if self.peek_char(0) == Some('{') {
                    self.bump();
                    let mut hex = String::new();
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                        hex.push(c);
                    }
                    u32::from_str_radix(&hex, 16).ok()
                } else {
                    let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                    u32::from_str_radix(&hex, 16).ok()
                };
                match code.and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => return Err(self.err("invalid unicode escape")),
                }
            }
            Some('x') => {
                let hex: String = (0..2).filter_map(|_| self.bump()).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(c) => out.push(c),
                    None => return Err(self.err("invalid hexadecimal escape")),
                }
            }
            Some(other) => out.push(other),
        }
        Ok(())
    }

    fn scan_template(&mut self) -> Result<Token, CompileError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        let mut current = String::new();
        loop {
            match self.peek_char(0) {
                None => return Err(CompileError::lex(line, column, "unterminated template literal")),
                Some('`') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.scan_escape(&mut current)?;
                }
                Some('$') if self.peek_char(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    quasis.push(std::mem::take(&mut current));
                    exprs.push(self.scan_substitution()?);
                }
                Some(c) => {
                    current.push(c);
                    self.bump();
                }
            }
        }
        quasis.push(current);
        Ok(Token::Template(Template { quasis, exprs }))
    }

    /// Capture the raw source of a `${...}` substitution up to its closing brace.
    fn scan_substitution(&mut self) -> Result<TemplateExpr, CompileError> {
        let (line, column) = (self.line, self.column);
        let start = self.pos;
        let mut depth = 0usize;
        loop {
            let tok = self.next_token()?;
            match tok.token {
                Token::Eof => {
                    return Err(CompileError::lex(line, column, "unterminated template substitution"))
                }
                Token::LBrace => depth += 1,
                Token::RBrace if depth == 0 => {
                    let source: String = self.chars[start..tok.start].iter().collect();
                    return Ok(TemplateExpr {
                        source,
                        line,
                        column,
                    });
                }
                Token::RBrace => depth -= 1,
                _ => {}
            }
        }
    }

    // -- JSX modes ---------------------------------------------

    /// Scan JSX child content: a text run, or the `<` / `{` that ends it.
    pub fn next_jsx_child(&mut self) -> Result<Spanned, CompileError> {
        let (line, column, start) = (self.line, self.column, self.pos);
        let token = match self.peek_char(0) {
            None => Token::Eof,
            Some('<') => {
                self.bump();
                Token::Lt
            }
            Some('{') => {
                self.bump();
                Token::LBrace
            }
            Some(_) => {
                let mut text = String::new();
                while let Some(c) = self.peek_char(0) {
                    if c == '<' || c == '{' {
                        break;
                    }
                    if c == '>' || c == '}' {
                        return Err(self.err(format!(
                            "unexpected '{}' in JSX text; use {{'{}'}} instead",
                            c, c
                        )));
                    }
                    text.push(c);
                    self.bump();
                }
                Token::JsxText(decode_entities(&text))
            }
        };
        Ok(Spanned {
            token,
            line,
            column,
            start,
            newline_before: false,
        })
    }

    /// Scan a JSX name segment: identifier characters plus `-`.
    pub fn next_jsx_name(&mut self) -> Result<Spanned, CompileError> {
        let newline_before = self.skip_trivia()?;
        let (line, column, start) = (self.line, self.column, self.pos);
        let mut name = String::new();
        while let Some(c) = self.peek_char(0) {
            if is_ident_part(c) || c == '-' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.err("expected JSX name"));
        }
        Ok(Spanned {
            token: Token::Ident(name),
            line,
            column,
            start,
            newline_before,
        })
    }

    /// Scan a JSX attribute string: no escape processing, newlines allowed.
    pub fn next_jsx_string(&mut self) -> Result<Spanned, CompileError> {
        let newline_before = self.skip_trivia()?;
        let (line, column, start) = (self.line, self.column, self.pos);
        let quote = match self.bump() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(CompileError::lex(line, column, "expected JSX attribute string")),
        };
        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(CompileError::lex(
                        line,
                        column,
                        "unterminated JSX attribute string",
                    ))
                }
                Some(c) if c == quote => break,
                Some(c) => text.push(c),
            }
        }
        Ok(Spanned {
            token: Token::Str(decode_entities(&text)),
            line,
            column,
            start,
            newline_before,
        })
    }
}

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Decode the HTML character references that JSX text commonly uses.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('&') {
        out.push_str(&rest[..idx]);
        let tail = &rest[idx..];
        let decoded = tail.find(';').and_then(|end| {
            let name = &tail[1..end];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                "copy" => Some('\u{a9}'),
                "middot" => Some('\u{b7}'),
                "rarr" => Some('\u{2192}'),
                "larr" => Some('\u{2190}'),
                _ => name
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(src: &str) -> Vec<Token> {
        let chars: Vec<char> = src.chars().collect();
        let mut lexer = Lexer::new(&chars);
        let mut out = Vec::new();
        loop {
            let t = lexer.next_token().unwrap();
            if t.token == Token::Eof {
                break;
            }
            out.push(t.token);
        }
        out
    }

    #[test]
    fn lexes_arrow_component() {
        let toks = lex_all("const A = () => x ?? y;");
        assert_eq!(
            toks,
            vec![
                Token::Ident("const".into()),
                Token::Ident("A".into()),
                Token::Assign,
                Token::LParen,
                Token::RParen,
                Token::Arrow,
                Token::Ident("x".into()),
                Token::Nullish,
                Token::Ident("y".into()),
                Token::Semi,
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(
            lex_all("1 2.5 .5 1e3 0xff 1_000"),
            vec![
                Token::Num(1.0),
                Token::Num(2.5),
                Token::Num(0.5),
                Token::Num(1000.0),
                Token::Num(255.0),
                Token::Num(1000.0),
            ]
        );
    }

    #[test]
    fn lexes_strings_with_escapes() {
        assert_eq!(
            lex_all(r#"'it\'s' "a\nb" "A""#),
            vec![
                Token::Str("it's".into()),
                Token::Str("a\nb".into()),
                Token::Str("A".into()),
            ]
        );
    }

    #[test]
    fn optional_chain_versus_conditional_decimal() {
        assert_eq!(
            lex_all("a?.b"),
            vec![
                Token::Ident("a".into()),
                Token::QuestionDot,
                Token::Ident("b".into())
            ]
        );
        assert_eq!(
            lex_all("a?.5:1"),
            vec![
                Token::Ident("a".into()),
                Token::Question,
                Token::Num(0.5),
                Token::Colon,
                Token::Num(1.0)
            ]
        );
    }

    #[test]
    fn template_captures_substitutions() {
        let toks = lex_all("`a ${x + {b: 1}.b} c`");
        match &toks[0] {
            Token::Template(t) => {
                assert_eq!(t.quasis, vec!["a ".to_string(), " c".to_string()]);
                assert_eq!(t.exprs.len(), 1);
                assert_eq!(t.exprs[0].source, "x + {b: 1}.b");
            }
            other => panic!("expected template, got {:?}", other),
        }
    }

    #[test]
    fn tracks_newlines_between_tokens() {
        let chars: Vec<char> = "a\n// note\nb".chars().collect();
        let mut lexer = Lexer::new(&chars);
        let a = lexer.next_token().unwrap();
        let b = lexer.next_token().unwrap();
        assert!(!a.newline_before);
        assert!(b.newline_before);
        assert_eq!(b.line, 3);
        assert_eq!(b.column, 1);
    }

    #[test]
    fn unterminated_string_is_error() {
        let chars: Vec<char> = "'abc".chars().collect();
        let err = Lexer::new(&chars).next_token().unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn jsx_text_decodes_entities() {
        let chars: Vec<char> = "Tom &amp; Jerry &#65;<".chars().collect();
        let mut lexer = Lexer::new(&chars);
        let t = lexer.next_jsx_child().unwrap();
        assert_eq!(t.token, Token::JsxText("Tom & Jerry A".into()));
        assert_eq!(lexer.next_jsx_child().unwrap().token, Token::Lt);
    }

    #[test]
    fn jsx_name_allows_dashes() {
        let chars: Vec<char> = " aria-label=".chars().collect();
        let mut lexer = Lexer::new(&chars);
        assert_eq!(
            lexer.next_jsx_name().unwrap().token,
            Token::Ident("aria-label".into())
        );
    }
}
