//! Recursive-descent parser over the token stream from [`super::lexer`].
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparison, `+ -`,
//! `* / // %`, unary `-`, primary.

use std::fmt;

use super::ast::{BinaryOp, Expr, FunctionDef, Module, Stmt, StmtKind, UnaryOp};
use super::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}: {}", self.line, self.col, self.message)
    }
}

type PResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_module(mut self) -> PResult<Module> {
        let mut functions = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Eof => break,
                TokenKind::Newline => {
                    self.advance();
                }
                TokenKind::Import | TokenKind::From => self.skip_line(),
                TokenKind::Def => functions.push(self.parse_function()?),
                // module docstring
                TokenKind::Str(_) => {
                    self.advance();
                    self.expect(TokenKind::Newline)?;
                }
                other => {
                    let message = format!(
                        "expected a function definition at module level, found {}",
                        other
                    );
                    return Err(self.error(message));
                }
            }
        }
        Ok(Module { functions })
    }

    // ── Token helpers ───────────────────────────────────────────────

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_next(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn line(&self) -> usize {
        self.current().line
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            let message = format!("expected {}, found {}", kind, self.peek());
            Err(self.error(message))
        }
    }

    fn expect_ident(&mut self) -> PResult<String> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error(format!("expected a name, found {}", other))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.current();
        ParseError {
            message: message.into(),
            line: token.line,
            col: token.col,
        }
    }

    /// Skip to the end of the current logical line.
    fn skip_line(&mut self) {
        while !matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
            self.advance();
        }
        self.eat(&TokenKind::Newline);
    }

    // ── Definitions ─────────────────────────────────────────────────

    fn parse_function(&mut self) -> PResult<FunctionDef> {
        let line = self.expect(TokenKind::Def)?.line;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param = self.expect_ident()?;
            if params.contains(&param) {
                return Err(self.error(format!("duplicate parameter '{}' in '{}'", param, name)));
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;

        Ok(FunctionDef {
            name,
            params,
            body,
            line,
        })
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        if !self.check(&TokenKind::Newline) {
            // `def f(): return 1`
            let stmt = self.parse_simple_statement()?;
            self.expect(TokenKind::Newline)?;
            return Ok(vec![stmt]);
        }

        self.expect(TokenKind::Newline)?;
        self.expect(TokenKind::Indent)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.check(&TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement()? {
                body.push(stmt);
            }
        }
        self.expect(TokenKind::Dedent)?;
        Ok(body)
    }

    // ── Statements ──────────────────────────────────────────────────

    fn parse_statement(&mut self) -> PResult<Option<Stmt>> {
        match self.peek() {
            TokenKind::If => self.parse_if().map(Some),
            TokenKind::While => self.parse_while().map(Some),
            TokenKind::Import | TokenKind::From => {
                self.skip_line();
                Ok(None)
            }
            TokenKind::Def => Err(self.error("nested function definitions are not supported")),
            _ => {
                let stmt = self.parse_simple_statement()?;
                self.expect(TokenKind::Newline)?;
                Ok(Some(stmt))
            }
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let line = self.expect(TokenKind::If)?.line;
        let mut branches = Vec::new();

        let cond = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        branches.push((cond, self.parse_block()?));

        while self.eat(&TokenKind::Elif) {
            let cond = self.parse_expr()?;
            self.expect(TokenKind::Colon)?;
            branches.push((cond, self.parse_block()?));
        }

        let orelse = if self.eat(&TokenKind::Else) {
            self.expect(TokenKind::Colon)?;
            self.parse_block()?
        } else {
            Vec::new()
        };

        Ok(Stmt {
            kind: StmtKind::If { branches, orelse },
            line,
        })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let line = self.expect(TokenKind::While)?.line;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Colon)?;
        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::While { cond, body },
            line,
        })
    }

    fn parse_simple_statement(&mut self) -> PResult<Stmt> {
        let line = self.line();

        let kind = match self.peek().clone() {
            TokenKind::Return => {
                self.advance();
                if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr()?))
                }
            }
            TokenKind::Pass => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Ident(target) => match self.peek_next() {
                Some(TokenKind::Assign) => {
                    self.advance();
                    self.advance();
                    let value = self.parse_expr()?;
                    StmtKind::Assign { target, value }
                }
                Some(TokenKind::PlusAssign) | Some(TokenKind::MinusAssign) => {
                    self.advance();
                    let op = if self.advance().kind == TokenKind::PlusAssign {
                        BinaryOp::Add
                    } else {
                        BinaryOp::Sub
                    };
                    let rhs = self.parse_expr()?;
                    let value = Expr::Binary {
                        op,
                        lhs: Box::new(Expr::Name {
                            name: target.clone(),
                            line,
                        }),
                        rhs: Box::new(rhs),
                    };
                    StmtKind::Assign { target, value }
                }
                _ => StmtKind::Expr(self.parse_expr()?),
            },
            _ => StmtKind::Expr(self.parse_expr()?),
        };

        Ok(Stmt { kind, line })
    }

    // ── Expressions ─────────────────────────────────────────────────

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.eat(&TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let lhs = self.parse_arith()?;
        let op = match self.peek() {
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_arith()?;

        if matches!(
            self.peek(),
            TokenKind::EqEq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Le
                | TokenKind::Gt
                | TokenKind::Ge
        ) {
            return Err(self.error("chained comparisons are not supported"));
        }
        Ok(binary(op, lhs, rhs))
    }

    fn parse_arith(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_term()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash | TokenKind::DoubleSlash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            // fold literal negation so `-1` stays a single push
            if let Expr::Int(n) = operand {
                return Ok(Expr::Int(-n));
            }
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.eat(&TokenKind::Plus) {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(n) => Ok(Expr::Int(n)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::None => Ok(Expr::None),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(first) => {
                let mut name = first;
                let mut dotted = false;
                while self.eat(&TokenKind::Dot) {
                    name = self.expect_ident()?;
                    dotted = true;
                }

                if self.eat(&TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    return Ok(Expr::Call {
                        name,
                        args,
                        line: token.line,
                    });
                }
                if dotted {
                    return Err(ParseError {
                        message: "attribute access is only supported on calls".into(),
                        line: token.line,
                        col: token.col,
                    });
                }
                Ok(Expr::Name {
                    name,
                    line: token.line,
                })
            }
            other => Err(ParseError {
                message: format!("expected an expression, found {}", other),
                line: token.line,
                col: token.col,
            }),
        }
    }

    fn parse_call_args(&mut self) -> PResult<Vec<Expr>> {
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::Lexer;

    fn parse(source: &str) -> PResult<Module> {
        let tokens = Lexer::tokenize(source).unwrap();
        Parser::new(tokens).parse_module()
    }

    fn name(n: &str, line: usize) -> Expr {
        Expr::Name {
            name: n.into(),
            line,
        }
    }

    #[test]
    fn test_function_with_imports_and_docstring() {
        let source = "\
from boa.interop.Neo.Storage import Get, Put
import something

def Main(a, b):
    \"\"\"Adds.\"\"\"
    return a + b
";
        let module = parse(source).unwrap();
        assert_eq!(module.functions.len(), 1);
        let main = &module.functions[0];
        assert_eq!(main.name, "Main");
        assert_eq!(main.params, vec!["a", "b"]);
        assert_eq!(main.line, 4);
        assert_eq!(main.body.len(), 2);
        assert_eq!(main.body[0].kind, StmtKind::Expr(Expr::Str("Adds.".into())));
        assert_eq!(
            main.body[1].kind,
            StmtKind::Return(Some(binary(BinaryOp::Add, name("a", 6), name("b", 6))))
        );
    }

    #[test]
    fn test_precedence() {
        let module = parse("def f(a, b, c):\n    return a + b * c == 7 and not a\n").unwrap();
        let StmtKind::Return(Some(expr)) = &module.functions[0].body[0].kind else {
            panic!("expected return");
        };
        let expected = binary(
            BinaryOp::And,
            binary(
                BinaryOp::Eq,
                binary(
                    BinaryOp::Add,
                    name("a", 2),
                    binary(BinaryOp::Mul, name("b", 2), name("c", 2)),
                ),
                Expr::Int(7),
            ),
            Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(name("a", 2)),
            },
        );
        assert_eq!(expr, &expected);
    }

    #[test]
    fn test_if_elif_else_and_while() {
        let source = "\
def f(x):
    if x == 1:
        y = 2
    elif x == 2:
        pass
    else:
        y = 3
    while x > 0:
        x -= 1
    return y
";
        let module = parse(source).unwrap();
        let body = &module.functions[0].body;
        let StmtKind::If { branches, orelse } = &body[0].kind else {
            panic!("expected if");
        };
        assert_eq!(branches.len(), 2);
        assert_eq!(orelse.len(), 1);
        let StmtKind::While { body: loop_body, .. } = &body[1].kind else {
            panic!("expected while");
        };
        assert_eq!(
            loop_body[0].kind,
            StmtKind::Assign {
                target: "x".into(),
                value: binary(BinaryOp::Sub, name("x", 9), Expr::Int(1)),
            }
        );

        let mut names = Vec::new();
        body.iter().for_each(|s| s.assigned_names(&mut names));
        assert_eq!(names, vec!["y", "y", "x"]);
    }

    #[test]
    fn test_dotted_call_uses_last_segment() {
        let module = parse("def f():\n    return Storage.Get(ctx, 'k')\n").unwrap();
        let StmtKind::Return(Some(Expr::Call { name, args, .. })) = &module.functions[0].body[0].kind
        else {
            panic!("expected call");
        };
        assert_eq!(name, "Get");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_single_line_body_and_negative_literal() {
        let module = parse("def f(): return -5\n").unwrap();
        assert_eq!(
            module.functions[0].body[0].kind,
            StmtKind::Return(Some(Expr::Int(-5)))
        );
    }

    #[test]
    fn test_syntax_errors() {
        let err = parse("x = 1\n").unwrap_err();
        assert!(err.message.contains("function definition"));

        let err = parse("def f(:\n    pass\n").unwrap_err();
        assert_eq!(err.line, 1);

        let err = parse("def f():\n    return 1 < 2 < 3\n").unwrap_err();
        assert!(err.message.contains("chained"));

        let err = parse("def f(a, a):\n    pass\n").unwrap_err();
        assert!(err.message.contains("duplicate"));

        let err = parse("def f():\n    return a.b\n").unwrap_err();
        assert!(err.message.contains("attribute"));
    }
}
