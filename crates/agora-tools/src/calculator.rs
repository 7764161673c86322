//! Arithmetic evaluation for the `calculator` tool
//!
//! Input is first sanitized down to digits, `.`, parentheses and the
//! operators `+ - * /`; everything else is dropped. The remainder is parsed
//! with Python arithmetic semantics:
//!
//! | Operator | Meaning | Precedence |
//! |---|---|---|
//! | `**` | power, right associative, binds tighter than unary minus on its left | highest |
//! | unary `+` `-` | sign | |
//! | `*` `/` `//` | multiply, true division, floor division | |
//! | `+` `-` | add, subtract | lowest |
//!
//! Integers stay integers until true division or a negative exponent turns
//! them into floats. Integers are 128-bit, so anything past that range is an
//! overflow. Floats print the way Python's `repr` does (`0.5`, `2.0`,
//! `1e+20`, `1e-05`). Any syntax error, division by zero, overflow, or
//! nesting deeper than [`MAX_NESTING`] yields [`INVALID_EXPRESSION`] instead
//! of a fault.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Result text for anything that cannot be evaluated
pub const INVALID_EXPRESSION: &str = "Error: Invalid expression";

/// Deepest chain of parentheses, signs or exponents the parser will follow
pub const MAX_NESTING: usize = 256;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9+\-*/().]").expect("static pattern"));

/// Strip every character the calculator does not understand
pub fn sanitize(expression: &str) -> String {
    DISALLOWED.replace_all(expression, "").into_owned()
}

/// Evaluate `expression` and format the tool result
pub fn evaluate(expression: &str) -> String {
    let sanitized = sanitize(expression);
    match parse(&sanitized) {
        Ok(value) => format!("Output of {sanitized} is {value}"),
        Err(e) => {
            tracing::debug!(expression = %sanitized, error = ?e, "Calculator rejected expression");
            INVALID_EXPRESSION.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i128),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => f.write_str(&float_repr(*x)),
        }
    }
}

/// Shortest round-trip digits, laid out like Python's float `repr`: fixed
/// notation for decimal exponents in `-4..16`, scientific with a signed
/// two-digit exponent otherwise.
fn float_repr(x: f64) -> String {
    let sign = if x.is_sign_negative() { "-" } else { "" };
    let scientific = format!("{:e}", x.abs());
    let Some((mantissa, exp)) = scientific.split_once('e') else {
        return format!("{x:?}");
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return format!("{x:?}");
    };
    if !(-4..16).contains(&exp) {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs());
    }
    let digits = mantissa.replace('.', "");
    if exp < 0 {
        let zeros = "0".repeat((-exp - 1) as usize);
        return format!("{sign}0.{zeros}{digits}");
    }
    let int_len = exp as usize + 1;
    if digits.len() <= int_len {
        let pad = "0".repeat(int_len - digits.len());
        format!("{sign}{digits}{pad}.0")
    } else {
        let (int, frac) = digits.split_at(int_len);
        format!("{sign}{int}.{frac}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    Empty,
    UnexpectedToken(usize),
    UnexpectedEnd,
    InvalidNumber(String),
    DivisionByZero,
    Overflow,
    TooDeep,
}

pub type EvalResult = Result<Number, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, EvalError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        let (token, width) = match c {
            b'+' => (Token::Plus, 1),
            b'-' => (Token::Minus, 1),
            b'*' if bytes.get(i + 1) == Some(&b'*') => (Token::DoubleStar, 2),
            b'*' => (Token::Star, 1),
            b'/' if bytes.get(i + 1) == Some(&b'/') => (Token::DoubleSlash, 2),
            b'/' => (Token::Slash, 1),
            b'(' => (Token::LParen, 1),
            b')' => (Token::RParen, 1),
            b'0'..=b'9' | b'.' => {
                let end = bytes[i..]
                    .iter()
                    .position(|b| !(b.is_ascii_digit() || *b == b'.'))
                    .map_or(bytes.len(), |offset| i + offset);
                (Token::Num(parse_number(&input[i..end])?), end - i)
            }
            _ => return Err(EvalError::UnexpectedToken(i)),
        };
        tokens.push(token);
        i += width;
    }
    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, EvalError> {
    let invalid = || EvalError::InvalidNumber(literal.to_string());
    if literal.contains('.') {
        if literal == "." || literal.matches('.').count() > 1 {
            return Err(invalid());
        }
        return literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| invalid());
    }
    // Python rejects leading zeros on non-zero integer literals
    if literal.len() > 1 && literal.starts_with('0') && literal.bytes().any(|b| b != b'0') {
        return Err(invalid());
    }
    literal
        .parse::<i128>()
        .map(Number::Int)
        .map_err(|_| EvalError::Overflow)
}

/// Parse and evaluate a sanitized expression
pub fn parse(input: &str) -> EvalResult {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvalError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(_) => Err(EvalError::UnexpectedToken(parser.pos)),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Run `inner` one nesting level down, refusing past [`MAX_NESTING`]
    fn nested(&mut self, inner: impl FnOnce(&mut Self) -> EvalResult) -> EvalResult {
        if self.depth >= MAX_NESTING {
            return Err(EvalError::TooDeep);
        }
        self.depth += 1;
        let result = inner(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> EvalResult {
        let mut lhs = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = if op == Token::Plus {
                add(lhs, rhs)?
            } else {
                sub(lhs, rhs)?
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> EvalResult {
        let mut lhs = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::DoubleSlash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = match op {
                Token::Star => mul(lhs, rhs)?,
                Token::Slash => true_div(lhs, rhs)?,
                _ => floor_div(lhs, rhs)?,
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> EvalResult {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                neg(self.nested(Self::unary)?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> EvalResult {
        let base = self.atom()?;
        if self.peek() == Some(Token::DoubleStar) {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> EvalResult {
        match self.advance() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    Some(_) => Err(EvalError::UnexpectedToken(self.pos - 1)),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(_) => Err(EvalError::UnexpectedToken(self.pos - 1)),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

fn finite(x: f64) -> EvalResult {
    if x.is_finite() {
        Ok(Number::Float(x))
    } else {
        Err(EvalError::Overflow)
    }
}

fn add(a: Number, b: Number) -> EvalResult {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_add(y).map(Number::Int).ok_or(EvalError::Overflow),
        _ => finite(a.as_f64() + b.as_f64()),
    }
}

fn sub(a: Number, b: Number) -> EvalResult {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_sub(y).map(Number::Int).ok_or(EvalError::Overflow),
        _ => finite(a.as_f64() - b.as_f64()),
    }
}

fn mul(a: Number, b: Number) -> EvalResult {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.checked_mul(y).map(Number::Int).ok_or(EvalError::Overflow),
        _ => finite(a.as_f64() * b.as_f64()),
    }
}

fn true_div(a: Number, b: Number) -> EvalResult {
    let divisor = b.as_f64();
    if divisor == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    finite(a.as_f64() / divisor)
}

fn floor_div(a: Number, b: Number) -> EvalResult {
    match (a, b) {
        (_, Number::Int(0)) => Err(EvalError::DivisionByZero),
        (Number::Int(x), Number::Int(y)) => {
            let q = x.checked_div(y).ok_or(EvalError::Overflow)?;
            // round toward negative infinity
            let q = if (x % y != 0) && ((x < 0) != (y < 0)) { q - 1 } else { q };
            Ok(Number::Int(q))
        }
        _ => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            finite((a.as_f64() / divisor).floor())
        }
    }
}

fn neg(a: Number) -> EvalResult {
    match a {
        Number::Int(x) => x.checked_neg().map(Number::Int).ok_or(EvalError::Overflow),
        Number::Float(x) => Ok(Number::Float(-x)),
    }
}

fn pow(base: Number, exponent: Number) -> EvalResult {
    match (base, exponent) {
        (Number::Int(b), Number::Int(e)) if e >= 0 => {
            // these bases never overflow, however large the exponent
            match b {
                0 if e > 0 => return Ok(Number::Int(0)),
                1 => return Ok(Number::Int(1)),
                -1 => return Ok(Number::Int(if e % 2 == 0 { 1 } else { -1 })),
                _ => {}
            }
            let e = u32::try_from(e).map_err(|_| EvalError::Overflow)?;
            b.checked_pow(e).map(Number::Int).ok_or(EvalError::Overflow)
        }
        _ => {
            let b = base.as_f64();
            let e = exponent.as_f64();
            if b == 0.0 && e < 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            let result = b.powf(e);
            if result.is_nan() {
                // negative base with fractional exponent is complex in Python
                return Err(EvalError::Overflow);
            }
            finite(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("2+4", "Output of 2+4 is 6")]
    #[case("2 + 3 * 4", "Output of 2+3*4 is 14")]
    #[case("(2+3)*4", "Output of (2+3)*4 is 20")]
    #[case("7/2", "Output of 7/2 is 3.5")]
    #[case("4/2", "Output of 4/2 is 2.0")]
    #[case("7//2", "Output of 7//2 is 3")]
    #[case("-7//2", "Output of -7//2 is -4")]
    #[case("2**10", "Output of 2**10 is 1024")]
    #[case("-2**2", "Output of -2**2 is -4")]
    #[case("2**-1", "Output of 2**-1 is 0.5")]
    #[case("2**3**2", "Output of 2**3**2 is 512")]
    #[case("0.1+0.2", "Output of 0.1+0.2 is 0.30000000000000004")]
    #[case("1999.99 * 0.9", "Output of 1999.99*0.9 is 1799.991")]
    #[case("--3", "Output of --3 is 3")]
    #[case("₹1,200 - 200", "Output of 1200-200 is 1000")]
    #[case("100000000000000000000.0*1", "Output of 100000000000000000000.0*1 is 1e+20")]
    #[case("1/100000", "Output of 1/100000 is 1e-05")]
    #[case("1/10000", "Output of 1/10000 is 0.0001")]
    #[case("-1/8", "Output of -1/8 is -0.125")]
    #[case("1**100000000000", "Output of 1**100000000000 is 1")]
    #[case("(-1)**100000000001", "Output of (-1)**100000000001 is -1")]
    #[case("0**100000000000", "Output of 0**100000000000 is 0")]
    #[case("0**0", "Output of 0**0 is 1")]
    fn evaluates_like_python(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(evaluate(input), expected);
    }

    #[rstest]
    #[case("1/0")]
    #[case("1//0")]
    #[case("DROP TABLE")]
    #[case("")]
    #[case("2+")]
    #[case("(1+2")]
    #[case("1+2)")]
    #[case("1..2")]
    #[case("07")]
    #[case("()")]
    #[case("10**100")]
    #[case("0**-1")]
    fn invalid_expressions_become_error_text(#[case] input: &str) {
        assert_eq!(evaluate(input), INVALID_EXPRESSION);
    }

    #[rstest]
    #[case(format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)))]
    #[case(format!("{}1", "-".repeat(10_000)))]
    #[case(format!("{}1", "+-".repeat(5_000)))]
    #[case(format!("{}2", "2**".repeat(10_000)))]
    fn deep_nesting_is_rejected(#[case] input: String) {
        assert_eq!(parse(&input), Err(EvalError::TooDeep));
        assert_eq!(evaluate(&input), INVALID_EXPRESSION);
    }

    #[test]
    fn nesting_up_to_the_limit_still_evaluates() {
        let depth = MAX_NESTING - 1;
        let input = format!("{}7{}", "(".repeat(depth), ")".repeat(depth));
        assert_eq!(parse(&input), Ok(Number::Int(7)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deep_nesting_on_a_worker_thread_returns_error_text() {
        let input = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        let output = tokio::spawn(async move { evaluate(&input) }).await.unwrap();
        assert_eq!(output, INVALID_EXPRESSION);
    }

    #[test]
    fn sanitize_keeps_only_arithmetic_characters() {
        assert_eq!(sanitize("x = (3 + 4) * 2; rm -rf"), "(3+4)*2-");
    }

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_input(input in ".{0,64}") {
            let _ = evaluate(&input);
        }

        #[test]
        fn integer_addition_matches_native(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
            let expr = format!("{a}+({b})");
            prop_assert_eq!(evaluate(&expr), format!("Output of {expr} is {}", a + b));
        }
    }
}
