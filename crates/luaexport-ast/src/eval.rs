//! Integer constant-expression evaluation for enumerators and constants
//!
//! Supports decimal, hex, octal and binary literals (with `u`/`l` suffixes
//! and `'` digit separators), unary `- + ~`, binary `* / % + - << >> & ^ |`,
//! parentheses and references to names the caller can resolve. Arithmetic is
//! checked; overflow is an evaluation error, not a wrapped value.

use anyhow::{anyhow, bail, Result};

/// Deepest nesting of parentheses and unary operators accepted
pub const MAX_EXPRESSION_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(i64),
    Ident(String),
    Op(&'static str),
    Open,
    Close,
}

/// Evaluate `expr`, resolving identifiers through `lookup`
///
/// Qualified identifiers (`Color::Red`) that `lookup` does not know are
/// retried with their last segment.
pub fn evaluate<F>(expr: &str, lookup: F) -> Result<i64>
where
    F: Fn(&str) -> Option<i64>,
{
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        bail!("empty expression");
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        depth: 0,
        lookup: &lookup,
    };
    let value = parser.expression(0)?;
    if parser.pos != tokens.len() {
        bail!("unexpected trailing input in '{}'", expr.trim());
    }
    Ok(value)
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        if ch.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '\'') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            tokens.push(Token::Number(parse_literal(&literal)?));
            continue;
        }
        if ch.is_alphabetic() || ch == '_' || (ch == ':' && chars.get(i + 1) == Some(&':')) {
            let start = i;
            while i < chars.len() {
                if chars[i].is_alphanumeric() || chars[i] == '_' {
                    i += 1;
                } else if chars[i] == ':' && chars.get(i + 1) == Some(&':') {
                    i += 2;
                } else {
                    break;
                }
            }
            let ident: String = chars[start..i].iter().collect();
            tokens.push(Token::Ident(ident.trim_start_matches("::").to_string()));
            continue;
        }

        let two: String = chars[i..chars.len().min(i + 2)].iter().collect();
        if two == "<<" || two == ">>" {
            tokens.push(Token::Op(if two == "<<" { "<<" } else { ">>" }));
            i += 2;
            continue;
        }
        let token = match ch {
            '(' => Token::Open,
            ')' => Token::Close,
            '+' => Token::Op("+"),
            '-' => Token::Op("-"),
            '*' => Token::Op("*"),
            '/' => Token::Op("/"),
            '%' => Token::Op("%"),
            '&' => Token::Op("&"),
            '^' => Token::Op("^"),
            '|' => Token::Op("|"),
            '~' => Token::Op("~"),
            other => bail!("unsupported character '{}'", other),
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

/// Parse an integer literal with an optional radix prefix and suffix
fn parse_literal(literal: &str) -> Result<i64> {
    let cleaned: String = literal.chars().filter(|c| *c != '\'').collect();
    let lower = cleaned.to_ascii_lowercase();
    let body = lower.trim_end_matches(['u', 'l']);

    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(bin) = body.strip_prefix("0b") {
        (bin, 2)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };

    if digits.is_empty() {
        bail!("invalid integer literal '{}'", literal);
    }
    let value = u64::from_str_radix(digits, radix)
        .map_err(|e| anyhow!("invalid integer literal '{}': {}", literal, e))?;
    i64::try_from(value).map_err(|_| anyhow!("integer literal '{}' does not fit in 64 bits", literal))
}

struct Parser<'t, F> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    lookup: &'t F,
}

/// Binding power of a binary operator, C precedence
fn binding_power(op: &str) -> Option<u8> {
    match op {
        "|" => Some(1),
        "^" => Some(2),
        "&" => Some(3),
        "<<" | ">>" => Some(4),
        "+" | "-" => Some(5),
        "*" | "/" | "%" => Some(6),
        _ => None,
    }
}

impl<F> Parser<'_, F>
where
    F: Fn(&str) -> Option<i64>,
{
    fn expression(&mut self, min_power: u8) -> Result<i64> {
        let mut lhs = self.unary()?;

        while let Some(Token::Op(op)) = self.tokens.get(self.pos) {
            let Some(power) = binding_power(op) else {
                break;
            };
            if power <= min_power {
                break;
            }
            self.pos += 1;
            let rhs = self.expression(power)?;
            lhs = apply(op, lhs, rhs)?;
        }

        Ok(lhs)
    }

    fn unary(&mut self) -> Result<i64> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            bail!("expression nests deeper than {} levels", MAX_EXPRESSION_DEPTH);
        }
        self.depth += 1;
        let value = self.operand();
        self.depth -= 1;
        value
    }

    fn operand(&mut self) -> Result<i64> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| anyhow!("unexpected end of expression"))?;
        self.pos += 1;

        match token {
            Token::Number(value) => Ok(*value),
            Token::Ident(name) => self.resolve(name),
            Token::Open => {
                let value = self.expression(0)?;
                match self.tokens.get(self.pos) {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => bail!("missing closing parenthesis"),
                }
            }
            Token::Op("-") => {
                let value = self.unary()?;
                value.checked_neg().ok_or_else(|| anyhow!("overflow negating {}", value))
            }
            Token::Op("+") => self.unary(),
            Token::Op("~") => Ok(!self.unary()?),
            Token::Op(op) => bail!("unexpected operator '{}'", op),
            Token::Close => bail!("unexpected ')'"),
        }
    }

    fn resolve(&self, name: &str) -> Result<i64> {
        if let Some(value) = (self.lookup)(name) {
            return Ok(value);
        }
        if let Some((_, last)) = name.rsplit_once("::") {
            if let Some(value) = (self.lookup)(last) {
                return Ok(value);
            }
        }
        bail!("unknown identifier '{}'", name)
    }
}

fn apply(op: &str, lhs: i64, rhs: i64) -> Result<i64> {
    let overflow = || anyhow!("overflow evaluating {} {} {}", lhs, op, rhs);
    match op {
        "+" => lhs.checked_add(rhs).ok_or_else(overflow),
        "-" => lhs.checked_sub(rhs).ok_or_else(overflow),
        "*" => lhs.checked_mul(rhs).ok_or_else(overflow),
        "/" | "%" if rhs == 0 => bail!("division by zero"),
        "/" => lhs.checked_div(rhs).ok_or_else(overflow),
        "%" => lhs.checked_rem(rhs).ok_or_else(overflow),
        "<<" | ">>" => {
            let shift = u32::try_from(rhs)
                .ok()
                .filter(|s| *s < 64)
                .ok_or_else(|| anyhow!("invalid shift amount {}", rhs))?;
            if op == "<<" {
                lhs.checked_shl(shift).ok_or_else(overflow)
            } else {
                lhs.checked_shr(shift).ok_or_else(overflow)
            }
        }
        "&" => Ok(lhs & rhs),
        "^" => Ok(lhs ^ rhs),
        "|" => Ok(lhs | rhs),
        other => bail!("unsupported operator '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str) -> Result<i64> {
        evaluate(expr, |_| None)
    }

    #[test]
    fn test_literals() -> Result<()> {
        assert_eq!(eval("42")?, 42);
        assert_eq!(eval("0x1F")?, 31);
        assert_eq!(eval("0b1010")?, 10);
        assert_eq!(eval("017")?, 15);
        assert_eq!(eval("0")?, 0);
        assert_eq!(eval("1'000'000")?, 1_000_000);
        assert_eq!(eval("10uL")?, 10);
        Ok(())
    }

    #[test]
    fn test_operators_follow_c_precedence() -> Result<()> {
        assert_eq!(eval("-1")?, -1);
        assert_eq!(eval("1 + 2 * 3")?, 7);
        assert_eq!(eval("(1 + 2) * 3")?, 9);
        assert_eq!(eval("1 << 4 | 1")?, 17);
        assert_eq!(eval("0xFF & ~0x0F")?, 0xF0);
        assert_eq!(eval("10 - 4 - 3")?, 3);
        assert_eq!(eval("7 % 4 ^ 1")?, 2);
        assert_eq!(eval("-(2 + 3)")?, -5);
        Ok(())
    }

    #[test]
    fn test_identifiers_resolve_through_lookup() -> Result<()> {
        let lookup = |name: &str| match name {
            "FLAG_A" => Some(1),
            "FLAG_B" => Some(2),
            _ => None,
        };
        assert_eq!(evaluate("FLAG_A | FLAG_B", lookup)?, 3);
        assert_eq!(evaluate("Flags::FLAG_B << 2", lookup)?, 8);
        assert!(evaluate("FLAG_C", lookup).is_err());
        Ok(())
    }

    #[test]
    fn test_errors_instead_of_panics() {
        assert!(eval("").is_err());
        assert!(eval("1 / 0").is_err());
        assert!(eval("(1 + 2").is_err());
        assert!(eval("1 +").is_err());
        assert!(eval("1 << 64").is_err());
        assert!(eval("0x").is_err());
        assert!(eval("9223372036854775807 + 1").is_err());
        assert!(eval("sizeof(int)").is_err());
        assert!(eval("1 2").is_err());
        assert!(eval("'a'").is_err());
    }

    #[test]
    fn test_nesting_is_bounded() -> Result<()> {
        let nested = |levels: usize| format!("{}1{}", "(".repeat(levels), ")".repeat(levels));
        assert_eq!(eval(&nested(100))?, 1);
        assert_eq!(eval(&format!("{}5", "- ".repeat(100)))?, 5);

        let deep = eval(&nested(200_000));
        assert!(deep.is_err_and(|e| e.to_string().contains("nests deeper")));
        assert!(eval(&format!("{}1", "~".repeat(200_000))).is_err());
        Ok(())
    }
}
