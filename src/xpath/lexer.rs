//! XPath lexer.
//!
//! Splits an expression into tokens, each tagged with its byte offset so
//! compilation errors can point back into the source text. Keywords are
//! position-sensitive per the XPath 1.0 disambiguation rule: `and`, `or`,
//! `div` and `mod` are operators only where an operator may appear, so
//! paths like `//div` still parse as element names.

use crate::xpath::query::XPathError;

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Dot,         // .
    DoubleDot,   // ..
    At,          // @
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Star,        // *
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,         // and
    Or,          // or
    Mod,         // mod
    Div,         // div

    // Brackets
    LeftParen,    // (
    RightParen,   // )
    LeftBracket,  // [
    RightBracket, // ]

    // Literals
    Number(f64),
    String(String),

    // Names
    Name(String),     // NCName
    NameTest(String), // prefix:* or prefix:local
    NodeType(String), // node(), text(), comment(), processing-instruction()

    // Axis
    Axis(String), // child::, descendant::, etc.

    // Special
    DoubleColon, // ::
    Comma,       // ,
    Dollar,      // $

    // End of input
    Eof,
}

/// True after tokens that complete an operand, which is where the keyword
/// operators may legally appear.
fn is_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Number(_)
            | Token::String(_)
            | Token::Name(_)
            | Token::NameTest(_)
            | Token::RightParen
            | Token::RightBracket
            | Token::Dot
            | Token::DoubleDot
            | Token::Star
    )
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    prev_is_operand: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            prev_is_operand: false,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Get the next token together with its start offset.
    pub fn next_token(&mut self) -> Result<(Token, usize), XPathError> {
        self.skip_whitespace();
        let start = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok((Token::Eof, start)),
        };

        let token = match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '.' => {
                if self.peek_at(1) == Some('.') {
                    self.advance(2);
                    Token::DoubleDot
                } else if self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    self.read_number()
                } else {
                    self.advance(1);
                    Token::Dot
                }
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '|' => {
                self.advance(1);
                Token::Pipe
            }
            '+' => {
                self.advance(1);
                Token::Plus
            }
            '-' => {
                self.advance(1);
                Token::Minus
            }
            '*' => {
                self.advance(1);
                Token::Star
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            '!' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::NotEq
                } else {
                    return Err(XPathError::new("Unrecognized token", start));
                }
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '[' => {
                self.advance(1);
                Token::LeftBracket
            }
            ']' => {
                self.advance(1);
                Token::RightBracket
            }
            ',' => {
                self.advance(1);
                Token::Comma
            }
            '$' => {
                self.advance(1);
                Token::Dollar
            }
            ':' => {
                self.advance(1);
                if self.peek() == Some(':') {
                    self.advance(1);
                    Token::DoubleColon
                } else {
                    return Err(XPathError::new("Unrecognized token", start));
                }
            }
            '"' | '\'' => self.read_string()?,
            '0'..='9' => self.read_number(),
            _ if is_name_start_char(c) => self.read_name_or_keyword(),
            _ => return Err(XPathError::new("Unrecognized token", start)),
        };

        self.prev_is_operand = is_operand(&token);
        Ok((token, start))
    }

    /// Read a number literal: digits with an optional fraction, or a
    /// fraction with no integer part (".5").
    fn read_number(&mut self) -> Token {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance(1);
            } else {
                break;
            }
        }

        if self.peek() == Some('.') && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            self.advance(1);
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    self.advance(1);
                } else {
                    break;
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        Token::Number(num_str.parse().unwrap_or(f64::NAN))
    }

    /// Read a string literal. XPath 1.0 strings have no escapes; the
    /// literal runs to the matching quote character.
    fn read_string(&mut self) -> Result<Token, XPathError> {
        let quote_pos = self.pos;
        let quote = match self.peek() {
            Some(c) => c,
            None => return Err(XPathError::new("Unterminated string literal", quote_pos)),
        };
        self.advance(1);

        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.input[start..self.pos].to_string();
                self.advance(1);
                return Ok(Token::String(value));
            }
            self.advance(c.len_utf8());
        }
        Err(XPathError::new("Unterminated string literal", quote_pos))
    }

    /// Read a name, a keyword operator, an axis, a node type, or a
    /// prefixed name test, depending on position and lookahead.
    fn read_name_or_keyword(&mut self) -> Token {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if is_name_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }

        let name = &self.input[start..self.pos];

        // Keyword operators apply only in operator position.
        if self.prev_is_operand {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        self.skip_whitespace();
        if self.remaining().starts_with("::") {
            return Token::Axis(name.to_string());
        }
        if self.peek() == Some('(') {
            return match name {
                "node" | "text" | "comment" | "processing-instruction" => {
                    Token::NodeType(name.to_string())
                }
                _ => Token::Name(name.to_string()),
            };
        }
        // Namespace prefix: "prefix:*" or "prefix:local".
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            self.advance(1);
            if self.peek() == Some('*') {
                self.advance(1);
                return Token::NameTest(format!("{}:*", name));
            }
            let local_start = self.pos;
            while let Some(c) = self.peek() {
                if is_name_char(c) {
                    self.advance(c.len_utf8());
                } else {
                    break;
                }
            }
            let local = &self.input[local_start..self.pos];
            return Token::NameTest(format!("{}:{}", name, local));
        }
        Token::Name(name.to_string())
    }
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
