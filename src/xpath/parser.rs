//! XPath parser.
//!
//! Recursive descent parser for XPath 1.0 expressions. Precedence follows
//! the specification grammar: `or`, `and`, equality, relational, additive,
//! multiplicative, unary minus, union, then paths and primaries. AST nodes
//! that can fail later checks carry the byte offset of their source token
//! so compilation errors point into the expression text.

use crate::xpath::lexer::{Lexer, Token};
use crate::xpath::query::XPathError;

/// XPath expression AST node
#[derive(Debug, Clone)]
pub enum Expr {
    /// Document root (`/`)
    Root,
    /// Current context node (`.`)
    Context,
    /// Parent of the context node (`..`)
    Parent,
    /// Union of two node-sets; the offset is the `|` position
    Union(Box<Expr>, Box<Expr>, usize),
    /// Path continuation (`base/step`)
    Path(Box<Expr>, Box<Step>),
    /// Predicate applied to a primary; the offset is the `[` position
    Filter(Box<Expr>, Box<Expr>, usize),
    /// Function call at the given offset
    Function(String, Vec<Expr>, usize),
    /// Binary operation
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    /// Unary negation
    Negate(Box<Expr>),
    /// Literal number
    Number(f64),
    /// Literal string
    String(String),
    /// Variable reference at the given offset
    Variable(String, usize),
    /// Standalone location step
    Step(Box<Step>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Location step in a path
#[derive(Debug, Clone)]
pub struct Step {
    pub axis: Axis,
    pub node_test: NodeTest,
    pub predicates: Vec<Expr>,
    pub offset: usize,
}

/// XPath axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Following,
    Preceding,
    Self_,
    Attribute,
    Namespace,
}

impl Axis {
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "child" => Some(Axis::Child),
            "descendant" => Some(Axis::Descendant),
            "descendant-or-self" => Some(Axis::DescendantOrSelf),
            "parent" => Some(Axis::Parent),
            "ancestor" => Some(Axis::Ancestor),
            "ancestor-or-self" => Some(Axis::AncestorOrSelf),
            "following-sibling" => Some(Axis::FollowingSibling),
            "preceding-sibling" => Some(Axis::PrecedingSibling),
            "following" => Some(Axis::Following),
            "preceding" => Some(Axis::Preceding),
            "self" => Some(Axis::Self_),
            "attribute" => Some(Axis::Attribute),
            "namespace" => Some(Axis::Namespace),
            _ => None,
        }
    }
}

/// Node test in a location step. Names are matched as qualified strings,
/// prefix included.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeTest {
    /// `*` - any node of the axis principal type
    All,
    /// Exact (possibly prefixed) name
    Name(String),
    /// `prefix:*` - any name with the given prefix
    Prefixed(String),
    /// `node()`
    Node,
    /// `text()`
    Text,
    /// `comment()`
    Comment,
    /// `processing-instruction()`, optionally with a target name
    Pi(Option<String>),
}

/// True for tokens that can open a location step after a slash.
fn starts_step(token: &Token) -> bool {
    matches!(
        token,
        Token::Name(_)
            | Token::NameTest(_)
            | Token::NodeType(_)
            | Token::Star
            | Token::At
            | Token::Axis(_)
            | Token::Dot
            | Token::DoubleDot
    )
}

/// The `descendant-or-self::node()` step a `//` abbreviates.
fn implicit_step(axis: Axis, offset: usize) -> Step {
    Step {
        axis,
        node_test: NodeTest::Node,
        predicates: Vec::new(),
        offset,
    }
}

/// XPath parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    offset: usize,
    peeked: Option<(Token, usize)>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Result<Self, XPathError> {
        let mut lexer = Lexer::new(input);
        let (current, offset) = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            offset,
            peeked: None,
        })
    }

    /// Parse a complete expression; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, XPathError> {
        let expr = self.parse_expr()?;
        if !matches!(self.current, Token::Eof) {
            return Err(XPathError::new("Expected end of expression", self.offset));
        }
        Ok(expr)
    }

    fn advance(&mut self) -> Result<(), XPathError> {
        let (token, offset) = match self.peeked.take() {
            Some(pair) => pair,
            None => self.lexer.next_token()?,
        };
        self.current = token;
        self.offset = offset;
        Ok(())
    }

    fn peek_is_left_paren(&mut self) -> Result<bool, XPathError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(matches!(self.peeked, Some((Token::LeftParen, _))))
    }

    fn parse_expr(&mut self) -> Result<Expr, XPathError> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_and_expr()?;
        while matches!(self.current, Token::Or) {
            self.advance()?;
            let right = self.parse_and_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::Or, Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_equality_expr()?;
        while matches!(self.current, Token::And) {
            self.advance()?;
            let right = self.parse_equality_expr()?;
            left = Expr::Binary(Box::new(left), BinaryOp::And, Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match &self.current {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match &self.current {
                Token::Lt => BinaryOp::Lt,
                Token::LtEq => BinaryOp::LtEq,
                Token::Gt => BinaryOp::Gt,
                Token::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match &self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match &self.current {
                Token::Star => BinaryOp::Mul,
                Token::Div => BinaryOp::Div,
                Token::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expr()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> Result<Expr, XPathError> {
        if matches!(self.current, Token::Minus) {
            self.advance()?;
            let expr = self.parse_unary_expr()?;
            Ok(Expr::Negate(Box::new(expr)))
        } else {
            self.parse_union_expr()
        }
    }

    fn parse_union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.parse_path_expr()?;
        while matches!(self.current, Token::Pipe) {
            let offset = self.offset;
            self.advance()?;
            let right = self.parse_path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right), offset);
        }
        Ok(left)
    }

    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        let mut expr = match &self.current {
            Token::Slash => {
                self.advance()?;
                if starts_step(&self.current) {
                    let step = self.parse_step()?;
                    Expr::Path(Box::new(Expr::Root), Box::new(step))
                } else {
                    // A lone '/' selects the root itself.
                    return Ok(Expr::Root);
                }
            }
            Token::DoubleSlash => {
                let offset = self.offset;
                self.advance()?;
                let desc = implicit_step(Axis::DescendantOrSelf, offset);
                let step = self.parse_step()?;
                Expr::Path(
                    Box::new(Expr::Path(Box::new(Expr::Root), Box::new(desc))),
                    Box::new(step),
                )
            }
            _ => return self.parse_filter_expr(),
        };

        loop {
            match &self.current {
                Token::Slash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    let offset = self.offset;
                    self.advance()?;
                    let desc = implicit_step(Axis::DescendantOrSelf, offset);
                    let step = self.parse_step()?;
                    expr = Expr::Path(
                        Box::new(Expr::Path(Box::new(expr), Box::new(desc))),
                        Box::new(step),
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Parse a primary expression followed by predicates and path
    /// continuations, e.g. `$var[1]/child` or `(//a)[2]`.
    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let mut expr = self.parse_primary_expr()?;

        loop {
            match &self.current {
                Token::LeftBracket => {
                    let offset = self.offset;
                    self.advance()?;
                    let pred = self.parse_expr()?;
                    if !matches!(self.current, Token::RightBracket) {
                        return Err(XPathError::new(
                            "Expected ']' to match an opening '['",
                            self.offset,
                        ));
                    }
                    self.advance()?;
                    expr = Expr::Filter(Box::new(expr), Box::new(pred), offset);
                }
                Token::Slash => {
                    self.advance()?;
                    let step = self.parse_step()?;
                    expr = Expr::Path(Box::new(expr), Box::new(step));
                }
                Token::DoubleSlash => {
                    let offset = self.offset;
                    self.advance()?;
                    let desc = implicit_step(Axis::DescendantOrSelf, offset);
                    let step = self.parse_step()?;
                    expr = Expr::Path(
                        Box::new(Expr::Path(Box::new(expr), Box::new(desc))),
                        Box::new(step),
                    );
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, XPathError> {
        match &self.current {
            Token::Number(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::String(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expr::String(s))
            }
            Token::Dollar => {
                let offset = self.offset;
                self.advance()?;
                let name = match &self.current {
                    Token::Name(n) => n.clone(),
                    Token::NameTest(n) if !n.ends_with(":*") => n.clone(),
                    _ => {
                        return Err(XPathError::new(
                            "Expected a variable name after '$'",
                            self.offset,
                        ))
                    }
                };
                self.advance()?;
                Ok(Expr::Variable(name, offset))
            }
            Token::LeftParen => {
                self.advance()?;
                let expr = self.parse_expr()?;
                if !matches!(self.current, Token::RightParen) {
                    return Err(XPathError::new(
                        "Expected ')' to match an opening '('",
                        self.offset,
                    ));
                }
                self.advance()?;
                Ok(expr)
            }
            Token::Name(name) => {
                let name = name.clone();
                let offset = self.offset;
                if self.peek_is_left_paren()? {
                    self.advance()?; // name
                    self.advance()?; // '('
                    let args = self.parse_function_args()?;
                    Ok(Expr::Function(name, args, offset))
                } else {
                    Ok(Expr::Step(Box::new(self.parse_step()?)))
                }
            }
            Token::NameTest(_) | Token::NodeType(_) | Token::Star | Token::At | Token::Axis(_) => {
                Ok(Expr::Step(Box::new(self.parse_step()?)))
            }
            Token::Dot => {
                self.advance()?;
                Ok(Expr::Context)
            }
            Token::DoubleDot => {
                self.advance()?;
                Ok(Expr::Parent)
            }
            _ => Err(XPathError::new("Unexpected token in expression", self.offset)),
        }
    }

    /// Parse a location step, including the `.` and `..` abbreviations.
    fn parse_step(&mut self) -> Result<Step, XPathError> {
        let offset = self.offset;
        match self.current {
            Token::Dot => {
                self.advance()?;
                return Ok(implicit_step(Axis::Self_, offset));
            }
            Token::DoubleDot => {
                self.advance()?;
                return Ok(implicit_step(Axis::Parent, offset));
            }
            _ => {}
        }
        self.parse_step_with_axis(Axis::Child, offset)
    }

    fn parse_step_with_axis(&mut self, mut axis: Axis, offset: usize) -> Result<Step, XPathError> {
        if matches!(self.current, Token::At) {
            axis = Axis::Attribute;
            self.advance()?;
        }

        if let Token::Axis(name) = &self.current {
            axis = match Axis::from_name(name) {
                Some(axis) => axis,
                None => return Err(XPathError::new("Unknown axis name", self.offset)),
            };
            self.advance()?;
            if !matches!(self.current, Token::DoubleColon) {
                return Err(XPathError::new(
                    "Expected '::' after an axis name",
                    self.offset,
                ));
            }
            self.advance()?;
        }

        let node_test = match &self.current {
            Token::Star => {
                self.advance()?;
                NodeTest::All
            }
            Token::Name(name) => {
                let name = name.clone();
                self.advance()?;
                NodeTest::Name(name)
            }
            Token::NameTest(qname) => {
                let test = match qname.strip_suffix(":*") {
                    Some(prefix) => NodeTest::Prefixed(prefix.to_string()),
                    None => NodeTest::Name(qname.clone()),
                };
                self.advance()?;
                test
            }
            Token::NodeType(name) => {
                let name = name.clone();
                self.advance()?;
                self.parse_node_type(&name)?
            }
            _ => return Err(XPathError::new("Expected a node test", self.offset)),
        };

        let mut predicates = Vec::new();
        while matches!(self.current, Token::LeftBracket) {
            self.advance()?;
            predicates.push(self.parse_expr()?);
            if !matches!(self.current, Token::RightBracket) {
                return Err(XPathError::new(
                    "Expected ']' to match an opening '['",
                    self.offset,
                ));
            }
            self.advance()?;
        }

        Ok(Step {
            axis,
            node_test,
            predicates,
            offset,
        })
    }

    /// Parse the parenthesized tail of a node type test. Only
    /// `processing-instruction` accepts a target literal.
    fn parse_node_type(&mut self, name: &str) -> Result<NodeTest, XPathError> {
        if !matches!(self.current, Token::LeftParen) {
            return Err(XPathError::new("Expected a node test", self.offset));
        }
        self.advance()?;

        let mut target = None;
        if name == "processing-instruction" {
            if let Token::String(s) = &self.current {
                target = Some(s.clone());
                self.advance()?;
            }
        }

        if !matches!(self.current, Token::RightParen) {
            return Err(XPathError::new(
                "Expected ')' to match an opening '('",
                self.offset,
            ));
        }
        self.advance()?;

        match name {
            "node" => Ok(NodeTest::Node),
            "text" => Ok(NodeTest::Text),
            "comment" => Ok(NodeTest::Comment),
            "processing-instruction" => Ok(NodeTest::Pi(target)),
            _ => Err(XPathError::new("Expected a node test", self.offset)),
        }
    }

    fn parse_function_args(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut args = Vec::new();

        if !matches!(self.current, Token::RightParen) {
            args.push(self.parse_expr()?);
            while matches!(self.current, Token::Comma) {
                self.advance()?;
                args.push(self.parse_expr()?);
            }
        }

        if !matches!(self.current, Token::RightParen) {
            return Err(XPathError::new(
                "Expected ')' to match an opening '('",
                self.offset,
            ));
        }
        self.advance()?;

        Ok(args)
    }
}

/// Parse an XPath expression string
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    Parser::new(input)?.parse()
}
