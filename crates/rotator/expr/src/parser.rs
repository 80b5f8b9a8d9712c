//! Parser: recursive descent parser for the expression language
//!
//! Consumes tokens from the lexer and produces an [`Expr`] tree.
//! Precedence, lowest first: conditional, `or`, `and`, `not`,
//! comparisons, `+ -`, `* / // %`, unary `- +`, `**`, subscripts.

use crate::ast::{BinaryOp, CompareOp, Expr, ExprKind, Literal, LogicalOp, Span, UnaryOp};
use crate::error::{ExprError, ExprResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// Longest expression text accepted, in characters
pub const MAX_EXPRESSION_LENGTH: usize = 4096;

/// Deepest nesting accepted before parsing is refused; every operator in a
/// left-associative chain and every subscript counts as one level
pub const MAX_NESTING_DEPTH: usize = 64;

/// Parser for the expression language
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Parse expression text into a syntax tree
    pub fn parse(input: &str) -> ExprResult<Expr> {
        if input.chars().count() > MAX_EXPRESSION_LENGTH {
            return Err(ExprError::Syntax {
                line: 1,
                col: 1,
                message: format!(
                    "Expression longer than {} characters",
                    MAX_EXPRESSION_LENGTH
                ),
            });
        }

        let mut lexer = Lexer::new(input);
        let tokens = lexer.tokenize()?;
        let mut parser = Self {
            tokens,
            pos: 0,
            depth: 0,
        };

        if parser.check(TokenKind::Eof) {
            return Err(parser.error_here("Expected an expression"));
        }

        let expr = parser.parse_expression()?;
        if !parser.check(TokenKind::Eof) {
            let tok = parser.peek();
            return Err(ExprError::Syntax {
                line: tok.line,
                col: tok.col,
                message: format!("Unexpected trailing input: '{}'", tok.text),
            });
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> ExprResult<Expr> {
        self.enter()?;
        let result = self.parse_conditional();
        self.depth -= 1;
        result
    }

    fn parse_conditional(&mut self) -> ExprResult<Expr> {
        let then = self.parse_or()?;
        if !self.check(TokenKind::If) {
            return Ok(then);
        }
        self.advance();
        let condition = self.parse_or()?;
        self.expect(TokenKind::Else)?;
        let otherwise = self.parse_expression()?;
        let span = then.span.to(otherwise.span);
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        self.chain(|p| {
            let mut left = p.parse_and()?;
            while p.check(TokenKind::Or) {
                p.advance();
                p.enter()?;
                let right = p.parse_and()?;
                left = logical(LogicalOp::Or, left, right);
            }
            Ok(left)
        })
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        self.chain(|p| {
            let mut left = p.parse_not()?;
            while p.check(TokenKind::And) {
                p.advance();
                p.enter()?;
                let right = p.parse_not()?;
                left = logical(LogicalOp::And, left, right);
            }
            Ok(left)
        })
    }

    fn parse_not(&mut self) -> ExprResult<Expr> {
        if self.check(TokenKind::Not) {
            let start = self.advance().start;
            self.enter()?;
            let operand = self.parse_not();
            self.depth -= 1;
            let operand = operand?;
            let span = Span::new(start, operand.span.end);
            return Ok(Expr::new(ExprKind::Not(Box::new(operand)), span));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let first = self.parse_additive()?;
        let mut rest = Vec::new();

        while let Some(op) = self.comparison_operator() {
            let right = self.parse_additive()?;
            rest.push((op, right));
        }

        if rest.is_empty() {
            return Ok(first);
        }

        let span = match rest.last() {
            Some((_, last)) => first.span.to(last.span),
            None => first.span,
        };
        Ok(Expr::new(
            ExprKind::Compare {
                first: Box::new(first),
                rest,
            },
            span,
        ))
    }

    /// Consume a comparison operator if one is next
    fn comparison_operator(&mut self) -> Option<CompareOp> {
        let op = match self.peek_kind() {
            TokenKind::EqEq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::LtEq => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::GtEq => CompareOp::Ge,
            TokenKind::In => CompareOp::In,
            TokenKind::Not if self.peek_kind_at(1) == TokenKind::In => {
                self.advance();
                CompareOp::NotIn
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_additive(&mut self) -> ExprResult<Expr> {
        self.chain(|p| {
            let mut left = p.parse_term()?;
            loop {
                let op = match p.peek_kind() {
                    TokenKind::Plus => BinaryOp::Add,
                    TokenKind::Minus => BinaryOp::Sub,
                    _ => break,
                };
                p.advance();
                p.enter()?;
                let right = p.parse_term()?;
                left = binary(op, left, right);
            }
            Ok(left)
        })
    }

    fn parse_term(&mut self) -> ExprResult<Expr> {
        self.chain(|p| {
            let mut left = p.parse_unary()?;
            loop {
                let op = match p.peek_kind() {
                    TokenKind::Star => BinaryOp::Mul,
                    TokenKind::Slash => BinaryOp::Div,
                    TokenKind::DoubleSlash => BinaryOp::FloorDiv,
                    TokenKind::Percent => BinaryOp::Mod,
                    _ => break,
                };
                p.advance();
                p.enter()?;
                let right = p.parse_unary()?;
                left = binary(op, left, right);
            }
            Ok(left)
        })
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        let start = self.advance().start;
        self.enter()?;
        let operand = self.parse_unary();
        self.depth -= 1;
        let operand = operand?;
        let span = Span::new(start, operand.span.end);
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_power(&mut self) -> ExprResult<Expr> {
        let base = self.parse_postfix()?;
        if !self.check(TokenKind::DoubleStar) {
            return Ok(base);
        }
        self.advance();
        // Right-associative, binds tighter than unary minus on its left
        self.enter()?;
        let exponent = self.parse_unary();
        self.depth -= 1;
        Ok(binary(BinaryOp::Pow, base, exponent?))
    }

    fn parse_postfix(&mut self) -> ExprResult<Expr> {
        self.chain(Self::parse_subscripts)
    }

    fn parse_subscripts(&mut self) -> ExprResult<Expr> {
        let mut target = self.parse_primary()?;

        while self.check(TokenKind::LBracket) {
            self.advance();
            self.enter()?;

            let start = if self.check(TokenKind::Colon) {
                None
            } else {
                Some(self.parse_expression()?)
            };

            if self.check(TokenKind::Colon) {
                self.advance();
                let end = if self.check(TokenKind::RBracket) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let close = self.expect(TokenKind::RBracket)?.end;
                let span = Span::new(target.span.start, close);
                target = Expr::new(
                    ExprKind::Slice {
                        target: Box::new(target),
                        start: start.map(Box::new),
                        end: end.map(Box::new),
                    },
                    span,
                );
                continue;
            }

            let close = self.expect(TokenKind::RBracket)?.end;
            let index = match start {
                Some(index) => index,
                None => return Err(self.error_here("Expected an index expression")),
            };
            let span = Span::new(target.span.start, close);
            target = Expr::new(
                ExprKind::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                },
                span,
            );
        }

        Ok(target)
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        let tok = self.peek().clone();
        let span = Span::new(tok.start, tok.end);

        match tok.kind {
            TokenKind::IntLiteral => {
                self.advance();
                let value = tok.text.parse::<i64>().map_err(|_| ExprError::Syntax {
                    line: tok.line,
                    col: tok.col,
                    message: format!("Integer literal out of range: {}", tok.text),
                })?;
                Ok(Expr::new(ExprKind::Literal(Literal::Int(value)), span))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                let value = tok.text.parse::<f64>().map_err(|_| ExprError::Syntax {
                    line: tok.line,
                    col: tok.col,
                    message: format!("Invalid float literal: {}", tok.text),
                })?;
                Ok(Expr::new(ExprKind::Literal(Literal::Float(value)), span))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Str(tok.text)), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(true)), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::Bool(false)), span))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::new(ExprKind::Literal(Literal::None), span))
            }
            TokenKind::Name => self.parse_name_or_call(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.expect(TokenKind::RParen)?.end;
                Ok(Expr::new(inner.kind, Span::new(tok.start, close)))
            }
            TokenKind::Eof => Err(ExprError::Syntax {
                line: tok.line,
                col: tok.col,
                message: "Unexpected end of expression".into(),
            }),
            _ => Err(ExprError::Syntax {
                line: tok.line,
                col: tok.col,
                message: format!("Unexpected token: '{}'", tok.text),
            }),
        }
    }

    fn parse_name_or_call(&mut self) -> ExprResult<Expr> {
        let first = self.advance().clone();
        let mut path = first.text.clone();
        let mut end = first.end;

        while self.check(TokenKind::Dot) {
            self.advance();
            let segment = self.expect(TokenKind::Name)?;
            path.push('.');
            path.push_str(&segment.text);
            end = segment.end;
        }

        if !self.check(TokenKind::LParen) {
            return Ok(Expr::new(ExprKind::Name(path), Span::new(first.start, end)));
        }

        if path.contains('.') {
            return Err(ExprError::Syntax {
                line: first.line,
                col: first.col,
                message: format!("Method calls are not supported: '{}(...)'", path),
            });
        }

        self.advance(); // (
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.check(TokenKind::Comma) {
                    break;
                }
                self.advance();
                // Trailing comma
                if self.check(TokenKind::RParen) {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RParen)?.end;

        Ok(Expr::new(
            ExprKind::Call {
                function: path,
                args,
            },
            Span::new(first.start, close),
        ))
    }

    // -- helpers --

    /// Run a left-associative loop; levels it enters are released on return
    fn chain<F>(&mut self, parse: F) -> ExprResult<Expr>
    where
        F: FnOnce(&mut Self) -> ExprResult<Expr>,
    {
        let depth = self.depth;
        let result = parse(self);
        self.depth = depth;
        result
    }

    fn enter(&mut self) -> ExprResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.depth -= 1;
            return Err(self.error_here(&format!(
                "Expression nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }

    fn error_here(&self, message: &str) -> ExprError {
        let tok = self.peek();
        ExprError::Syntax {
            line: tok.line,
            col: tok.col,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> &Token {
        let current = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[current]
    }

    fn expect(&mut self, kind: TokenKind) -> ExprResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            let found = if tok.kind == TokenKind::Eof {
                "end of expression".to_string()
            } else {
                format!("'{}'", tok.text)
            };
            Err(ExprError::Syntax {
                line: tok.line,
                col: tok.col,
                message: format!("Expected '{}', found {}", kind, found),
            })
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = left.span.to(right.span);
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
    let span = left.span.to(right.span);
    Expr::new(
        ExprKind::Logical {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}
