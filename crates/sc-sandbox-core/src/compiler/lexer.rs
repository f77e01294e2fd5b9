//! Indentation-aware tokenizer for contract sources.
//!
//! Produces `Newline` at the end of every logical line and `Indent` /
//! `Dedent` pairs around nested blocks. Newlines inside parentheses are
//! ignored, blank and comment-only lines never reach the parser.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Def,
    If,
    Elif,
    Else,
    While,
    Return,
    Pass,
    Not,
    And,
    Or,
    True,
    False,
    None,
    From,
    Import,

    // Literals
    Ident(String),
    Int(i64),
    Str(String),

    // Punctuation
    LParen,
    RParen,
    Comma,
    Colon,
    Dot,
    Assign,
    PlusAssign,
    MinusAssign,
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Structural
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "def" => TokenKind::Def,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "pass" => TokenKind::Pass,
            "not" => TokenKind::Not,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            "from" => TokenKind::From,
            "import" => TokenKind::Import,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Def => write!(f, "def"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Elif => write!(f, "elif"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::Pass => write!(f, "pass"),
            TokenKind::Not => write!(f, "not"),
            TokenKind::And => write!(f, "and"),
            TokenKind::Or => write!(f, "or"),
            TokenKind::True => write!(f, "True"),
            TokenKind::False => write!(f, "False"),
            TokenKind::None => write!(f, "None"),
            TokenKind::From => write!(f, "from"),
            TokenKind::Import => write!(f, "import"),
            TokenKind::Ident(s) => write!(f, "name '{}'", s),
            TokenKind::Int(n) => write!(f, "integer {}", n),
            TokenKind::Str(s) => write!(f, "string {:?}", s),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Assign => write!(f, "="),
            TokenKind::PlusAssign => write!(f, "+="),
            TokenKind::MinusAssign => write!(f, "-="),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::DoubleSlash => write!(f, "//"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Le => write!(f, "<="),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Ge => write!(f, ">="),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}: {}", self.line, self.col, self.message)
    }
}

const TAB_WIDTH: usize = 8;

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    indents: Vec<usize>,
    paren_depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            indents: vec![0],
            paren_depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole source.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        Lexer::new(source).run()
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        loop {
            if self.at_line_start && self.paren_depth == 0 {
                self.handle_indentation()?;
            }

            let Some(c) = self.peek() else { break };
            match c {
                '\n' => {
                    self.advance();
                    if self.paren_depth == 0 {
                        self.push_newline();
                        self.at_line_start = true;
                    }
                }
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '0'..='9' => self.lex_number()?,
                '\'' | '"' => self.lex_string()?,
                c if c.is_alphabetic() || c == '_' => self.lex_word()?,
                _ => self.lex_punct()?,
            }
        }

        self.push_newline();
        let (line, col) = (self.line, self.col);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.tokens.push(Token {
                kind: TokenKind::Dedent,
                line,
                col,
            });
        }
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            line,
            col,
        });
        Ok(self.tokens)
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>, line: usize, col: usize) -> LexError {
        LexError {
            message: message.into(),
            line,
            col,
        }
    }

    fn push(&mut self, kind: TokenKind, line: usize, col: usize) {
        self.tokens.push(Token { kind, line, col });
    }

    fn push_newline(&mut self) {
        let needs_newline = matches!(
            self.tokens.last(),
            Some(t) if !matches!(t.kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
        );
        if needs_newline {
            let (line, col) = (self.line, self.col);
            self.push(TokenKind::Newline, line, col);
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Measure the indentation of the next non-blank line and emit
    /// `Indent`/`Dedent` tokens as needed.
    fn handle_indentation(&mut self) -> Result<(), LexError> {
        loop {
            let mut width = 0;
            while let Some(c) = self.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width += TAB_WIDTH - width % TAB_WIDTH,
                    '\r' | '\x0c' => {}
                    _ => break,
                }
                self.advance();
            }

            match self.peek() {
                None => {
                    self.at_line_start = false;
                    return Ok(());
                }
                Some('\n') => {
                    self.advance();
                }
                Some('#') => self.skip_comment(),
                Some(_) => {
                    let (line, col) = (self.line, self.col);
                    let current = self.indents.last().copied().unwrap_or(0);
                    if width > current {
                        self.indents.push(width);
                        self.push(TokenKind::Indent, line, col);
                    } else {
                        while width < self.indents.last().copied().unwrap_or(0) {
                            self.indents.pop();
                            self.push(TokenKind::Dedent, line, col);
                        }
                        if width != self.indents.last().copied().unwrap_or(0) {
                            return Err(self.error(
                                "unindent does not match any outer indentation level",
                                line,
                                col,
                            ));
                        }
                    }
                    self.at_line_start = false;
                    return Ok(());
                }
            }
        }
    }

    fn lex_number(&mut self) -> Result<(), LexError> {
        let (line, col) = (self.line, self.col);

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.advance();
            self.advance();
            let mut digits = String::new();
            while let Some(c) = self.peek() {
                if c.is_ascii_hexdigit() || c == '_' {
                    if c != '_' {
                        digits.push(c);
                    }
                    self.advance();
                } else {
                    break;
                }
            }
            let value = i64::from_str_radix(&digits, 16)
                .map_err(|_| self.error(format!("invalid hex literal '0x{}'", digits), line, col))?;
            self.push(TokenKind::Int(value), line, col);
            return Ok(());
        }

        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                if c != '_' {
                    digits.push(c);
                }
                self.advance();
            } else {
                break;
            }
        }
        if matches!(self.peek(), Some(c) if c.is_alphabetic() || c == '.') {
            return Err(self.error("invalid numeric literal", line, col));
        }
        let value: i64 = digits
            .parse()
            .map_err(|_| self.error(format!("integer literal {} is too large", digits), line, col))?;
        self.push(TokenKind::Int(value), line, col);
        Ok(())
    }

    fn lex_word(&mut self) -> Result<(), LexError> {
        let (line, col) = (self.line, self.col);
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        // b'...' byte-string prefix
        if word == "b" && matches!(self.peek(), Some('\'') | Some('"')) {
            return self.lex_string_at(line, col);
        }

        let kind = TokenKind::keyword(&word).unwrap_or(TokenKind::Ident(word));
        self.push(kind, line, col);
        Ok(())
    }

    fn lex_string(&mut self) -> Result<(), LexError> {
        let (line, col) = (self.line, self.col);
        self.lex_string_at(line, col)
    }

    fn lex_string_at(&mut self, line: usize, col: usize) -> Result<(), LexError> {
        let Some(quote) = self.advance() else {
            return Err(self.error("expected string literal", line, col));
        };

        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string literal", line, col)),
                Some('\n') if !triple => {
                    return Err(self.error(
                        "unterminated string literal (newline before closing quote)",
                        line,
                        col,
                    ));
                }
                Some('\\') => {
                    self.advance();
                    let escaped = match self.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some(other) => {
                            return Err(self.error(
                                format!("unknown escape sequence '\\{}'", other),
                                self.line,
                                self.col,
                            ))
                        }
                        None => return Err(self.error("unterminated string literal", line, col)),
                    };
                    value.push(escaped);
                }
                Some(c) if c == quote => {
                    if !triple {
                        self.advance();
                        break;
                    }
                    if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                        self.advance();
                        self.advance();
                        self.advance();
                        break;
                    }
                    self.advance();
                    value.push(c);
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        self.push(TokenKind::Str(value), line, col);
        Ok(())
    }

    fn lex_punct(&mut self) -> Result<(), LexError> {
        let (line, col) = (self.line, self.col);
        let Some(c) = self.advance() else {
            return Ok(());
        };
        let next = self.peek();

        let kind = match (c, next) {
            ('(', _) => {
                self.paren_depth += 1;
                TokenKind::LParen
            }
            (')', _) => {
                if self.paren_depth == 0 {
                    return Err(self.error("unmatched ')'", line, col));
                }
                self.paren_depth -= 1;
                TokenKind::RParen
            }
            (',', _) => TokenKind::Comma,
            (':', _) => TokenKind::Colon,
            ('.', _) => TokenKind::Dot,
            ('=', Some('=')) => {
                self.advance();
                TokenKind::EqEq
            }
            ('=', _) => TokenKind::Assign,
            ('!', Some('=')) => {
                self.advance();
                TokenKind::NotEq
            }
            ('<', Some('=')) => {
                self.advance();
                TokenKind::Le
            }
            ('<', _) => TokenKind::Lt,
            ('>', Some('=')) => {
                self.advance();
                TokenKind::Ge
            }
            ('>', _) => TokenKind::Gt,
            ('+', Some('=')) => {
                self.advance();
                TokenKind::PlusAssign
            }
            ('+', _) => TokenKind::Plus,
            ('-', Some('=')) => {
                self.advance();
                TokenKind::MinusAssign
            }
            ('-', _) => TokenKind::Minus,
            ('*', _) => TokenKind::Star,
            ('/', Some('/')) => {
                self.advance();
                TokenKind::DoubleSlash
            }
            ('/', _) => TokenKind::Slash,
            ('%', _) => TokenKind::Percent,
            (other, _) => {
                return Err(self.error(format!("unexpected character '{}'", other), line, col))
            }
        };

        self.push(kind, line, col);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn ident(s: &str) -> TokenKind {
        TokenKind::Ident(s.to_string())
    }

    #[test]
    fn test_function_block_indentation() {
        let source = "def Main(a):\n    return a\n";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Def,
                ident("Main"),
                TokenKind::LParen,
                ident("a"),
                TokenKind::RParen,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Return,
                ident("a"),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_blank_lines_and_comments_are_skipped() {
        let source = "# header\n\ndef f():\n\n    # inside\n    pass  # trailing\n\n";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Def,
                ident("f"),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Pass,
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_nested_dedent_emits_multiple() {
        let source = "def f():\n    if x:\n        pass\nx = 1\n";
        let k = kinds(source);
        let dedents = k.iter().filter(|t| **t == TokenKind::Dedent).count();
        assert_eq!(dedents, 2);
        assert_eq!(k[k.len() - 1], TokenKind::Eof);
    }

    #[test]
    fn test_newlines_inside_parens_are_ignored() {
        let source = "Put(ctx,\n    key,\n    value)\n";
        assert_eq!(
            kinds(source),
            vec![
                ident("Put"),
                TokenKind::LParen,
                ident("ctx"),
                TokenKind::Comma,
                ident("key"),
                TokenKind::Comma,
                ident("value"),
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a == b != c <= d >= e // f += 1"),
            vec![
                ident("a"),
                TokenKind::EqEq,
                ident("b"),
                TokenKind::NotEq,
                ident("c"),
                TokenKind::Le,
                ident("d"),
                TokenKind::Ge,
                ident("e"),
                TokenKind::DoubleSlash,
                ident("f"),
                TokenKind::PlusAssign,
                TokenKind::Int(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds("'add' \"b\\n\" b'raw' 0x10"),
            vec![
                TokenKind::Str("add".into()),
                TokenKind::Str("b\n".into()),
                TokenKind::Str("raw".into()),
                TokenKind::Int(16),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_triple_quoted_docstring_spans_lines() {
        let tokens = Lexer::tokenize("\"\"\"doc\nstring\"\"\"\nx = 1\n").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str("doc\nstring".into()));
        assert_eq!(tokens[1].kind, TokenKind::Newline);
        assert_eq!(tokens[2].kind, ident("x"));
        assert_eq!(tokens[2].line, 3);
    }

    #[test]
    fn test_errors() {
        let err = Lexer::tokenize("x = 'open\n").unwrap_err();
        assert!(err.message.contains("unterminated"));
        assert_eq!(err.line, 1);

        let err = Lexer::tokenize("def f():\n        a\n    b\n").unwrap_err();
        assert!(err.message.contains("unindent"));
        assert_eq!(err.line, 3);

        let err = Lexer::tokenize("x = 1 $ 2\n").unwrap_err();
        assert_eq!(err.col, 7);
    }
}
