//! Restricted single-variable arithmetic expressions
//!
//! Expressions are compiled once into a small tree and evaluated many times.
//! Grammar:
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/') unary)*
//! unary := ('-' | '+') unary | power
//! power := atom (('^' | '**') unary)?
//! atom  := number | 'x' | 'pi' | 'e' | func '(' expr ')' | '(' expr ')'
//! func  := sqrt | ln | log10 | exp | abs | sin | cos | tan
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum parenthesis / unary nesting accepted
const MAX_DEPTH: usize = 64;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Expression is empty")]
    Empty,

    #[error("Unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("Invalid number '{text}' at position {pos}")]
    InvalidNumber { text: String, pos: usize },

    #[error("Unknown name '{name}' at position {pos} (only 'x', 'pi', 'e' and sqrt/ln/log10/exp/abs/sin/cos/tan are allowed)")]
    UnknownName { name: String, pos: usize },

    #[error("Expected {expected} at position {pos}")]
    Expected { expected: &'static str, pos: usize },

    #[error("Unexpected input after the expression at position {pos}")]
    Trailing { pos: usize },

    #[error("Expression nests deeper than {max} levels", max = MAX_DEPTH)]
    TooDeep,
}

/// Elementary functions callable from an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Ln,
    Log10,
    Exp,
    Abs,
    Sin,
    Cos,
    Tan,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "sqrt" => Function::Sqrt,
            "ln" => Function::Ln,
            "log10" => Function::Log10,
            "exp" => Function::Exp,
            "abs" => Function::Abs,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            _ => return None,
        })
    }

    fn apply(self, v: f64) -> f64 {
        match self {
            Function::Sqrt => v.sqrt(),
            Function::Ln => v.ln(),
            Function::Log10 => v.log10(),
            Function::Exp => v.exp(),
            Function::Abs => v.abs(),
            Function::Sin => v.sin(),
            Function::Cos => v.cos(),
            Function::Tan => v.tan(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Number(f64),
    Variable,
    Neg(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Function, Box<Node>),
}

impl Node {
    fn eval(&self, x: f64) -> f64 {
        match self {
            Node::Number(v) => *v,
            Node::Variable => x,
            Node::Neg(inner) => -inner.eval(x),
            Node::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(x), rhs.eval(x));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
            Node::Call(func, arg) => func.apply(arg.eval(x)),
        }
    }
}

/// Compiled expression over the single variable `x`
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parse and validate an expression
    pub fn parse(text: &str) -> Result<Self, ExpressionError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            end: text.len(),
            depth: 0,
        };
        let root = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(ExpressionError::Trailing { pos: token.pos });
        }

        Ok(Self {
            source: text.trim().to_string(),
            root,
        })
    }

    /// `x`
    pub fn identity() -> Self {
        Self {
            source: "x".to_string(),
            root: Node::Variable,
        }
    }

    /// `1/x`
    pub fn reciprocal() -> Self {
        Self {
            source: "1/x".to_string(),
            root: Node::Binary(
                BinaryOp::Div,
                Box::new(Node::Number(1.0)),
                Box::new(Node::Variable),
            ),
        }
    }

    /// `1/sqrt(x)`
    pub fn reciprocal_sqrt() -> Self {
        Self {
            source: "1/sqrt(x)".to_string(),
            root: Node::Binary(
                BinaryOp::Div,
                Box::new(Node::Number(1.0)),
                Box::new(Node::Call(Function::Sqrt, Box::new(Node::Variable))),
            ),
        }
    }

    /// Evaluate at `x`; the result may be non-finite
    pub fn eval(&self, x: f64) -> f64 {
        self.root.eval(x)
    }

    /// The text this expression was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl FromStr for Expression {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    pos: usize,
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExpressionError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        let kind = match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                i += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                TokenKind::Caret
            }
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'^' => TokenKind::Caret,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'0'..=b'9' | b'.' => {
                i = scan_number(bytes, i);
                let literal = &text[start..i];
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ExpressionError::InvalidNumber {
                        text: literal.to_string(),
                        pos: start,
                    })?;
                tokens.push(Token {
                    kind: TokenKind::Number(value),
                    pos: start,
                });
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(text[start..i].to_string()),
                    pos: start,
                });
                continue;
            }
            _ => {
                let ch = text[start..].chars().next().unwrap_or('?');
                return Err(ExpressionError::UnexpectedChar { ch, pos: start });
            }
        };

        tokens.push(Token { kind, pos: start });
        i += 1;
    }

    Ok(tokens)
}

/// End index of a decimal literal starting at `i`
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }

    // Exponent only if digits follow
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }

    i
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next_pos(&self) -> usize {
        self.peek().map_or(self.end, |t| t.pos)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExpressionError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Node, ExpressionError> {
        let mut lhs = self.term()?;
        loop {
            let op = if self.eat(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.eat(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(lhs);
            };
            let rhs = self.term()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Node, ExpressionError> {
        let mut lhs = self.unary()?;
        loop {
            let op = if self.eat(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.eat(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                return Ok(lhs);
            };
            let rhs = self.unary()?;
            lhs = Node::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary(&mut self) -> Result<Node, ExpressionError> {
        self.descend()?;
        let node = if self.eat(&TokenKind::Minus) {
            Node::Neg(Box::new(self.unary()?))
        } else if self.eat(&TokenKind::Plus) {
            self.unary()?
        } else {
            self.power()?
        };
        self.depth -= 1;
        Ok(node)
    }

    fn power(&mut self) -> Result<Node, ExpressionError> {
        let base = self.atom()?;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.unary()?;
            return Ok(Node::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Node, ExpressionError> {
        let token = self.peek().ok_or(ExpressionError::Expected {
            expected: "a number, 'x' or '('",
            pos: self.end,
        })?;
        self.pos += 1;

        match &token.kind {
            TokenKind::Number(v) => Ok(Node::Number(*v)),
            TokenKind::LParen => {
                let inner = self.expr()?;
                self.close_paren()?;
                Ok(inner)
            }
            TokenKind::Ident(name) => match name.as_str() {
                "x" => Ok(Node::Variable),
                "pi" => Ok(Node::Number(std::f64::consts::PI)),
                "e" => Ok(Node::Number(std::f64::consts::E)),
                _ => {
                    let func = Function::lookup(name).ok_or_else(|| ExpressionError::UnknownName {
                        name: name.clone(),
                        pos: token.pos,
                    })?;
                    if !self.eat(&TokenKind::LParen) {
                        return Err(ExpressionError::Expected {
                            expected: "'(' after function name",
                            pos: self.next_pos(),
                        });
                    }
                    let arg = self.expr()?;
                    self.close_paren()?;
                    Ok(Node::Call(func, Box::new(arg)))
                }
            },
            _ => Err(ExpressionError::Expected {
                expected: "a number, 'x' or '('",
                pos: token.pos,
            }),
        }
    }

    fn close_paren(&mut self) -> Result<(), ExpressionError> {
        if self.eat(&TokenKind::RParen) {
            Ok(())
        } else {
            Err(ExpressionError::Expected {
                expected: "')'",
                pos: self.next_pos(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str, x: f64) -> f64 {
        Expression::parse(text).unwrap().eval(x)
    }

    #[test]
    fn test_builtin_transforms() {
        assert_eq!(Expression::identity().eval(40.0), 40.0);
        assert_eq!(Expression::reciprocal().eval(40.0), 0.025);
        assert_eq!(Expression::reciprocal_sqrt().eval(4.0), 0.5);

        // Parsed forms agree with the built-in trees
        assert_eq!(Expression::parse("1/x").unwrap(), Expression::reciprocal());
        assert_eq!(Expression::parse("1/sqrt(x)").unwrap(), Expression::reciprocal_sqrt());
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * x", 3.0), 7.0);
        assert_eq!(eval("(1 + 2) * x", 3.0), 9.0);
        assert_eq!(eval("x - 1 - 1", 5.0), 3.0);
        assert_eq!(eval("x / 2 / 2", 8.0), 2.0);
        assert_eq!(eval("-x^2", 3.0), -9.0);
        assert_eq!(eval("2^3^2", 0.0), 512.0);
        assert_eq!(eval("x**-1", 4.0), 0.25);
    }

    #[test]
    fn test_literals_and_constants() {
        assert_eq!(eval(".5 * x", 4.0), 2.0);
        assert_eq!(eval("1e3 / x", 10.0), 100.0);
        assert_eq!(eval("2.5E-1", 0.0), 0.25);
        assert!((eval("pi", 0.0) - std::f64::consts::PI).abs() < 1e-15);
        assert!((eval("ln(e)", 0.0) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_functions() {
        assert_eq!(eval("sqrt(x)", 9.0), 3.0);
        assert_eq!(eval("abs(x)", -2.0), 2.0);
        assert!((eval("log10(x)", 1000.0) - 3.0).abs() < 1e-12);
        assert_eq!(eval("exp(0)", 0.0), 1.0);
    }

    #[test]
    fn test_non_finite_results_do_not_panic() {
        assert!(eval("1/x", 0.0).is_infinite());
        assert!(eval("sqrt(x)", -1.0).is_nan());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Expression::parse(""), Err(ExpressionError::Empty));
        assert_eq!(Expression::parse("   "), Err(ExpressionError::Empty));
        assert!(matches!(Expression::parse("1/"), Err(ExpressionError::Expected { pos: 2, .. })));
        assert!(matches!(Expression::parse("y"), Err(ExpressionError::UnknownName { pos: 0, .. })));
        assert!(matches!(Expression::parse("sqrt(x"), Err(ExpressionError::Expected { pos: 6, .. })));
        assert!(matches!(Expression::parse("sqrt x"), Err(ExpressionError::Expected { .. })));
        assert!(matches!(Expression::parse("x)"), Err(ExpressionError::Trailing { pos: 1 })));
        assert!(matches!(Expression::parse("x;"), Err(ExpressionError::UnexpectedChar { ch: ';', pos: 1 })));
        assert!(matches!(Expression::parse("1..2"), Err(ExpressionError::InvalidNumber { .. })));
        assert!(matches!(Expression::parse("np.sqrt(x)"), Err(ExpressionError::InvalidNumber { pos: 2, .. })));
        assert!(matches!(Expression::parse("__import__"), Err(ExpressionError::UnknownName { .. })));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}x{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(Expression::parse(&deep), Err(ExpressionError::TooDeep));

        let ok = format!("{}x{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(eval(&ok, 2.0), 2.0);
    }

    #[test]
    fn test_display_keeps_source() {
        let expr: Expression = " 1 / sqrt(x) ".parse().unwrap();
        assert_eq!(expr.to_string(), "1 / sqrt(x)");
    }
}
