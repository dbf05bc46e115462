//! Expression evaluator behind the `math()` step
//!
//! Supports `+ - * / % ^`, unary minus, parentheses, numeric literals,
//! variables and the functions `abs`, `ceil`, `floor`, `sqrt`, `exp`, `log`.

use crate::error::{Error, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() {
            pos += 1;
        } else if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).map_or(false, |n| n.is_ascii_digit())) {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_digit() || chars[pos] == '.') {
                pos += 1;
            }
            let text: String = chars[start..pos].iter().collect();
            let number = text
                .parse::<f64>()
                .map_err(|_| Error::ExecutionError(format!("invalid number '{}' in math()", text)))?;
            tokens.push(Token::Number(number));
        } else if c.is_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Ident(chars[start..pos].iter().collect()));
        } else if "+-*/%^".contains(c) {
            tokens.push(Token::Op(c));
            pos += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            pos += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            pos += 1;
        } else {
            return Err(Error::ExecutionError(format!(
                "unexpected character '{}' in math()",
                c
            )));
        }
    }

    Ok(tokens)
}

fn is_function(name: &str) -> bool {
    matches!(name, "abs" | "ceil" | "floor" | "sqrt" | "exp" | "log")
}

/// Variable names in order of first appearance.
pub fn variables(expr: &str) -> Result<Vec<String>> {
    let tokens = tokenize(expr)?;
    let mut names: Vec<String> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if let Token::Ident(name) = token {
            let is_call = is_function(name) && tokens.get(i + 1) == Some(&Token::LParen);
            if !is_call && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    Ok(names)
}

/// Evaluate `expr` with the given variable bindings.
pub fn evaluate(expr: &str, vars: &HashMap<String, f64>) -> Result<f64> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        vars,
    };
    let value = parser.expression()?;
    if parser.pos != tokens.len() {
        return Err(Error::ExecutionError(format!(
            "unexpected trailing input in math('{}')",
            expr
        )));
    }
    Ok(value)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    vars: &'a HashMap<String, f64>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.power()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.power()?;
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.unary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.power()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64> {
        if let Some(Token::Op('-')) = self.peek() {
            self.pos += 1;
            return Ok(-self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<f64> {
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                self.expect_rparen()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if is_function(&name) && self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let arg = self.expression()?;
                    self.expect_rparen()?;
                    return Ok(match name.as_str() {
                        "abs" => arg.abs(),
                        "ceil" => arg.ceil(),
                        "floor" => arg.floor(),
                        "sqrt" => arg.sqrt(),
                        "exp" => arg.exp(),
                        _ => arg.ln(),
                    });
                }
                self.vars.get(&name).copied().ok_or_else(|| {
                    Error::ExecutionError(format!("unbound variable '{}' in math()", name))
                })
            }
            other => Err(Error::ExecutionError(format!(
                "unexpected token {:?} in math()",
                other
            ))),
        }
    }

    fn expect_rparen(&mut self) -> Result<()> {
        match self.advance() {
            Some(Token::RParen) => Ok(()),
            _ => Err(Error::ExecutionError("expected ')' in math()".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &str, vars: &[(&str, f64)]) -> f64 {
        let vars = vars.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        evaluate(expr, &vars).unwrap()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3", &[]), 7.0);
        assert_eq!(eval("(1 + 2) * 3", &[]), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2", &[]), 512.0);
        assert_eq!(eval("-2 + 5 % 3", &[]), 0.0);
    }

    #[test]
    fn test_variables_and_functions() {
        assert_eq!(eval("_ * 2 + abs(a)", &[("_", 4.0), ("a", -1.5)]), 9.5);
        assert_eq!(
            variables("abs(x) + _ - x * y").unwrap(),
            vec!["x".to_string(), "_".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn test_errors() {
        let vars = HashMap::new();
        assert!(evaluate("1 +", &vars).is_err());
        assert!(evaluate("a + 1", &vars).is_err());
        assert!(evaluate("1 $ 2", &vars).is_err());
        assert!(evaluate("(1 + 2", &vars).is_err());
    }
}
