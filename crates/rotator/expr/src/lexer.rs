//! Lexer: tokenizes expression text
//!
//! Produces a stream of tokens that the parser consumes.
//! Handles keywords, names, string and numeric literals,
//! and the fixed operator set.

use crate::error::{ExprError, ExprResult};

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The raw text of the token (unescaped for string literals)
    pub text: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
    /// Character offset of the first character
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
}

/// Token types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    And,
    Or,
    Not,
    In,
    If,
    Else,
    True,
    False,
    None,

    // Names and literals
    Name,
    StringLiteral,
    IntLiteral,
    FloatLiteral,

    // Structural
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // End of input
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Not => write!(f, "not"),
            Self::In => write!(f, "in"),
            Self::If => write!(f, "if"),
            Self::Else => write!(f, "else"),
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::None => write!(f, "None"),
            Self::Name => write!(f, "name"),
            Self::StringLiteral => write!(f, "string literal"),
            Self::IntLiteral => write!(f, "integer"),
            Self::FloatLiteral => write!(f, "float"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBracket => write!(f, "["),
            Self::RBracket => write!(f, "]"),
            Self::Comma => write!(f, ","),
            Self::Dot => write!(f, "."),
            Self::Colon => write!(f, ":"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::DoubleStar => write!(f, "**"),
            Self::Slash => write!(f, "/"),
            Self::DoubleSlash => write!(f, "//"),
            Self::Percent => write!(f, "%"),
            Self::EqEq => write!(f, "=="),
            Self::NotEq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::LtEq => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::GtEq => write!(f, ">="),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// Lexer for the expression language
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    /// Create a new lexer from input text
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> ExprResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.pos >= self.input.len() {
                tokens.push(self.token_from(TokenKind::Eof, "", self.pos, self.line, self.col));
                break;
            }

            let token = self.next_token()?;
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> ExprResult<Token> {
        let ch = self.input[self.pos];
        let start = self.pos;
        let line = self.line;
        let col = self.col;

        let (kind, width) = match ch {
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            '[' => (TokenKind::LBracket, 1),
            ']' => (TokenKind::RBracket, 1),
            ',' => (TokenKind::Comma, 1),
            '.' => (TokenKind::Dot, 1),
            ':' => (TokenKind::Colon, 1),
            '+' => (TokenKind::Plus, 1),
            '-' => (TokenKind::Minus, 1),
            '%' => (TokenKind::Percent, 1),
            '*' if self.peek_at(1) == Some('*') => (TokenKind::DoubleStar, 2),
            '*' => (TokenKind::Star, 1),
            '/' if self.peek_at(1) == Some('/') => (TokenKind::DoubleSlash, 2),
            '/' => (TokenKind::Slash, 1),
            '=' if self.peek_at(1) == Some('=') => (TokenKind::EqEq, 2),
            '!' if self.peek_at(1) == Some('=') => (TokenKind::NotEq, 2),
            '<' if self.peek_at(1) == Some('=') => (TokenKind::LtEq, 2),
            '<' => (TokenKind::Lt, 1),
            '>' if self.peek_at(1) == Some('=') => (TokenKind::GtEq, 2),
            '>' => (TokenKind::Gt, 1),
            '\'' | '"' => return self.read_string_literal(ch),
            c if c.is_ascii_digit() => return self.read_number(),
            c if c.is_alphabetic() || c == '_' => return self.read_name_or_keyword(),
            '=' => {
                return Err(ExprError::Syntax {
                    line,
                    col,
                    message: "Assignment is not supported; use '==' to compare".into(),
                })
            }
            _ => {
                return Err(ExprError::Syntax {
                    line,
                    col,
                    message: format!("Unexpected character: '{}'", ch),
                })
            }
        };

        for _ in 0..width {
            self.advance();
        }
        let text: String = self.input[start..self.pos].iter().collect();
        Ok(self.token_from(kind, text, start, line, col))
    }

    fn read_string_literal(&mut self, quote: char) -> ExprResult<Token> {
        let start = self.pos;
        let line = self.line;
        let col = self.col;
        self.advance(); // skip opening quote

        let mut text = String::new();
        while self.pos < self.input.len() && self.input[self.pos] != quote {
            let ch = self.input[self.pos];
            if ch == '\\' {
                let escaped = match self.peek_at(1) {
                    Some('n') => '\n',
                    Some('t') => '\t',
                    Some('\\') => '\\',
                    Some('\'') => '\'',
                    Some('"') => '"',
                    Some(other) => {
                        return Err(ExprError::Syntax {
                            line: self.line,
                            col: self.col,
                            message: format!("Unknown escape sequence: '\\{}'", other),
                        })
                    }
                    None => {
                        return Err(ExprError::Syntax {
                            line,
                            col,
                            message: "Unterminated string literal".into(),
                        })
                    }
                };
                self.advance();
                text.push(escaped);
            } else {
                text.push(ch);
            }
            self.advance();
        }

        if self.pos >= self.input.len() {
            return Err(ExprError::Syntax {
                line,
                col,
                message: "Unterminated string literal".into(),
            });
        }

        self.advance(); // skip closing quote
        Ok(self.token_from(TokenKind::StringLiteral, text, start, line, col))
    }

    fn read_number(&mut self) -> ExprResult<Token> {
        let start = self.pos;
        let line = self.line;
        let col = self.col;
        let mut text = String::new();
        let mut kind = TokenKind::IntLiteral;

        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            text.push(self.input[self.pos]);
            self.advance();
        }

        // A fractional part needs a digit after the dot
        if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::FloatLiteral;
            text.push('.');
            self.advance();
            while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
                text.push(self.input[self.pos]);
                self.advance();
            }
        }

        if self
            .peek_at(0)
            .is_some_and(|c| c.is_alphabetic() || c == '_')
        {
            return Err(ExprError::Syntax {
                line: self.line,
                col: self.col,
                message: format!("Invalid number literal: '{}{}'", text, self.input[self.pos]),
            });
        }

        Ok(self.token_from(kind, text, start, line, col))
    }

    fn read_name_or_keyword(&mut self) -> ExprResult<Token> {
        let start = self.pos;
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        while self.pos < self.input.len()
            && (self.input[self.pos].is_alphanumeric() || self.input[self.pos] == '_')
        {
            text.push(self.input[self.pos]);
            self.advance();
        }

        let kind = match text.as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "True" | "true" => TokenKind::True,
            "False" | "false" => TokenKind::False,
            "None" => TokenKind::None,
            _ => TokenKind::Name,
        };

        Ok(self.token_from(kind, text, start, line, col))
    }

    fn token_from(
        &self,
        kind: TokenKind,
        text: impl Into<String>,
        start: usize,
        line: usize,
        col: usize,
    ) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
            col,
            start,
            end: self.pos,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && self.input[self.pos].is_whitespace() {
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_call_tokens() {
        let tokens = Lexer::new("datetime_format(now, '%Y%m%d')")
            .tokenize()
            .unwrap();

        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].text, "datetime_format");
        assert_eq!(tokens[1].kind, TokenKind::LParen);
        assert_eq!(tokens[2].text, "now");
        assert_eq!(tokens[3].kind, TokenKind::Comma);
        assert_eq!(tokens[4].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[4].text, "%Y%m%d");
        assert_eq!(tokens[5].kind, TokenKind::RParen);
        assert_eq!(tokens[6].kind, TokenKind::Eof);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("+ - * ** / // % == != < <= > >="),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::DoubleStar,
                TokenKind::Slash,
                TokenKind::DoubleSlash,
                TokenKind::Percent,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::Gt,
                TokenKind::GtEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("and or not in if else True false None"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::In,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::True,
                TokenKind::False,
                TokenKind::None,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 3.25 7.").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[1].kind, TokenKind::FloatLiteral);
        assert_eq!(tokens[1].text, "3.25");
        // "7." lexes as an int followed by a dot
        assert_eq!(tokens[2].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[3].kind, TokenKind::Dot);
    }

    #[test]
    fn test_dotted_name() {
        assert_eq!(
            kinds("filter.name"),
            vec![TokenKind::Name, TokenKind::Dot, TokenKind::Name, TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = Lexer::new(r#"'it\'s' "a\"b" 'x\ny'"#).tokenize().unwrap();
        assert_eq!(tokens[0].text, "it's");
        assert_eq!(tokens[1].text, "a\"b");
        assert_eq!(tokens[2].text, "x\ny");
    }

    #[test]
    fn test_spans() {
        let tokens = Lexer::new("  start(x)").tokenize().unwrap();
        assert_eq!(tokens[0].start, 2);
        assert_eq!(tokens[0].end, 7);
        assert_eq!(tokens[0].col, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let result = Lexer::new("'unterminated").tokenize();
        assert!(matches!(result, Err(ExprError::Syntax { col: 1, .. })));
    }

    #[test]
    fn test_single_equals_rejected() {
        assert!(Lexer::new("a = 1").tokenize().is_err());
    }

    #[test]
    fn test_unexpected_character() {
        assert!(Lexer::new("a @ b").tokenize().is_err());
    }

    #[test]
    fn test_empty_input() {
        let tokens = Lexer::new("   ").tokenize().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }
}
