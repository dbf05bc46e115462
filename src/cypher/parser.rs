//! Cypher Parser
//!
//! Hand-written recursive descent parser for the supported Cypher subset.

use super::ast::*;
use crate::error::{Error, Result};
use crate::types::{Parameters, Value};
use indexmap::IndexMap;

/// Words that end an expression and can never be variables.
const RESERVED: &[&str] = &[
    "MATCH", "WHERE", "CREATE", "SET", "DELETE", "DETACH", "RETURN", "ORDER", "BY", "SKIP",
    "LIMIT", "AS", "AND", "OR", "XOR", "NOT", "IN", "IS", "ASC", "DESC", "DISTINCT",
];

/// Cypher Parser
pub struct CypherParser<'a> {
    input: String,
    pos: usize,
    parameters: &'a Parameters,
}

impl<'a> CypherParser<'a> {
    pub fn new(input: &str, parameters: &'a Parameters) -> Self {
        Self {
            input: input.to_string(),
            pos: 0,
            parameters,
        }
    }

    /// Parse one statement
    pub fn parse(&mut self) -> Result<CypherAst> {
        let mut options = StatementOptions::default();
        if self.try_keyword("EXPLAIN") {
            options.insert(StatementOption::Explain);
        }

        let query = self.parse_query()?;

        self.try_char(';');
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(Error::ParseError(format!(
                "Unexpected input at position {}: '{}'",
                self.pos,
                self.remaining_snippet()
            )));
        }

        Ok(CypherAst { query, options })
    }

    // ========================================================================
    // Clauses
    // ========================================================================

    fn parse_query(&mut self) -> Result<Query> {
        let mut query = Query::default();

        while self.try_keyword("MATCH") {
            let patterns = self.parse_pattern_list()?;
            let where_clause = if self.try_keyword("WHERE") {
                Some(self.parse_expression()?)
            } else {
                None
            };
            query.matches.push(MatchClause {
                patterns,
                where_clause,
            });
        }

        if self.try_keyword("CREATE") {
            query.create = self.parse_pattern_list()?;
        }

        if self.try_keyword("SET") {
            query.set = self.parse_set_items()?;
        }

        let detach = self.try_keyword("DETACH");
        if detach {
            self.expect_keyword("DELETE")?;
        }
        if detach || self.try_keyword("DELETE") {
            let mut variables = vec![self.parse_identifier()?];
            while self.try_char(',') {
                variables.push(self.parse_identifier()?);
            }
            query.delete = Some(DeleteClause { detach, variables });
        }

        if self.try_keyword("RETURN") {
            query.return_clause = Some(self.parse_return()?);
        }

        if query.matches.is_empty()
            && query.create.is_empty()
            && query.set.is_empty()
            && query.delete.is_none()
            && query.return_clause.is_none()
        {
            return Err(Error::ParseError(format!(
                "Expected MATCH, CREATE or RETURN, got '{}'",
                self.remaining_snippet()
            )));
        }

        Ok(query)
    }

    fn parse_set_items(&mut self) -> Result<Vec<SetItem>> {
        let mut items = Vec::new();
        loop {
            let variable = self.parse_identifier()?;
            self.expect_char('.')?;
            let key = self.parse_identifier()?;
            self.expect_char('=')?;
            let value = self.parse_expression()?;
            items.push(SetItem {
                variable,
                key,
                value,
            });
            if !self.try_char(',') {
                return Ok(items);
            }
        }
    }

    fn parse_return(&mut self) -> Result<ReturnClause> {
        let distinct = self.try_keyword("DISTINCT");

        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            let start = self.pos;
            let expression = self.parse_expression()?;
            let text = self.input[start..self.pos].trim().to_string();
            let alias = if self.try_keyword("AS") {
                Some(self.parse_identifier()?)
            } else {
                None
            };
            items.push(ReturnItem {
                expression,
                alias,
                text,
            });
            if !self.try_char(',') {
                break;
            }
        }

        let mut order_by = Vec::new();
        if self.try_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                self.skip_whitespace();
                let start = self.pos;
                let expression = self.parse_expression()?;
                let text = self.input[start..self.pos].trim().to_string();
                let descending = if self.try_keyword("DESCENDING") || self.try_keyword("DESC") {
                    true
                } else {
                    let _ = self.try_keyword("ASCENDING") || self.try_keyword("ASC");
                    false
                };
                order_by.push(SortItem {
                    expression,
                    descending,
                    text,
                });
                if !self.try_char(',') {
                    break;
                }
            }
        }

        let skip = if self.try_keyword("SKIP") {
            Some(self.parse_count("SKIP")?)
        } else {
            None
        };
        let limit = if self.try_keyword("LIMIT") {
            Some(self.parse_count("LIMIT")?)
        } else {
            None
        };

        Ok(ReturnClause {
            distinct,
            items,
            order_by,
            skip,
            limit,
        })
    }

    /// SKIP / LIMIT argument: a non-negative integer literal or parameter
    fn parse_count(&mut self, clause: &str) -> Result<i64> {
        match self.parse_primary()? {
            Expression::Literal(Value::Int(n)) if n >= 0 => Ok(n),
            other => Err(Error::ParseError(format!(
                "{} expects a non-negative integer, got {:?}",
                clause, other
            ))),
        }
    }

    // ========================================================================
    // Patterns
    // ========================================================================

    fn parse_pattern_list(&mut self) -> Result<Vec<PathPattern>> {
        let mut patterns = vec![self.parse_path_pattern()?];
        while self.try_char(',') {
            patterns.push(self.parse_path_pattern()?);
        }
        Ok(patterns)
    }

    fn parse_path_pattern(&mut self) -> Result<PathPattern> {
        let start = self.parse_node_pattern()?;
        let mut chain = Vec::new();

        loop {
            self.skip_whitespace();
            if !(self.peek_char_is('-') || self.peek_char_is('<')) {
                break;
            }
            let relationship = self.parse_relationship_pattern()?;
            let node = self.parse_node_pattern()?;
            chain.push((relationship, node));
        }

        Ok(PathPattern { start, chain })
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern> {
        self.expect_char('(')?;
        self.skip_whitespace();

        let mut node = NodePattern::default();
        if self.peek_char_is_alpha() {
            node.variable = Some(self.parse_identifier()?);
        }
        while self.try_char(':') {
            node.labels.push(self.parse_identifier()?);
        }
        if self.try_char('{') {
            node.properties = self.parse_map_entries()?;
        }

        self.expect_char(')')?;
        Ok(node)
    }

    fn parse_relationship_pattern(&mut self) -> Result<RelationshipPattern> {
        let has_left_arrow = self.try_str("<-");
        if !has_left_arrow {
            self.expect_char('-')?;
        }

        let mut variable = None;
        let mut types = Vec::new();
        let mut properties = Vec::new();
        let mut length = None;

        if self.try_char('[') {
            self.skip_whitespace();
            if self.peek_char_is_alpha() {
                variable = Some(self.parse_identifier()?);
            }
            if self.try_char(':') {
                types.push(self.parse_identifier()?);
                while self.try_char('|') {
                    self.try_char(':');
                    types.push(self.parse_identifier()?);
                }
            }
            if self.try_char('*') {
                length = Some(self.parse_var_length()?);
            }
            if self.try_char('{') {
                properties = self.parse_map_entries()?;
            }
            self.expect_char(']')?;
        }

        let has_right_arrow = self.try_str("->");
        if !has_right_arrow {
            self.expect_char('-')?;
        }

        let direction = match (has_left_arrow, has_right_arrow) {
            (false, true) => Direction::Outgoing,
            (true, false) => Direction::Incoming,
            (false, false) => Direction::Both,
            (true, true) => {
                return Err(Error::ParseError(
                    "Relationship cannot point in both directions".to_string(),
                ))
            }
        };

        Ok(RelationshipPattern {
            variable,
            types,
            properties,
            direction,
            length,
        })
    }

    /// After `*`: `` | `n` | `min..max` | `..max` | `min..`
    fn parse_var_length(&mut self) -> Result<VarLength> {
        self.skip_whitespace();
        let min = if self.peek_char_is_digit() {
            Some(self.parse_plain_integer()?)
        } else {
            None
        };

        if self.try_str("..") {
            self.skip_whitespace();
            let max = if self.peek_char_is_digit() {
                Some(self.parse_plain_integer()?)
            } else {
                None
            };
            let min = min.unwrap_or(1);
            if let Some(max) = max {
                if max < min {
                    return Err(Error::ParseError(format!(
                        "Invalid variable length range *{}..{}",
                        min, max
                    )));
                }
            }
            Ok(VarLength { min, max })
        } else {
            match min {
                Some(n) => Ok(VarLength { min: n, max: Some(n) }),
                None => Ok(VarLength { min: 1, max: None }),
            }
        }
    }

    fn parse_map_entries(&mut self) -> Result<Vec<(String, Expression)>> {
        let mut entries = Vec::new();
        if self.try_char('}') {
            return Ok(entries);
        }
        loop {
            self.skip_whitespace();
            let key = if self.peek_char_is('"') || self.peek_char_is('\'') {
                self.parse_string()?
            } else {
                self.parse_identifier()?
            };
            self.expect_char(':')?;
            let value = self.parse_expression()?;
            entries.push((key, value));
            if !self.try_char(',') {
                break;
            }
        }
        self.expect_char('}')?;
        Ok(entries)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or_expression()
    }

    fn parse_or_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_xor_expression()?;
        while self.try_keyword("OR") {
            let right = self.parse_xor_expression()?;
            left = binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_xor_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_and_expression()?;
        while self.try_keyword("XOR") {
            let right = self.parse_and_expression()?;
            left = binary(left, BinaryOperator::Xor, right);
        }
        Ok(left)
    }

    fn parse_and_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_not_expression()?;
        while self.try_keyword("AND") {
            let right = self.parse_not_expression()?;
            left = binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_not_expression(&mut self) -> Result<Expression> {
        if self.try_keyword("NOT") {
            let expr = self.parse_not_expression()?;
            Ok(Expression::Not(Box::new(expr)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let left = self.parse_additive()?;

        if self.try_keyword("IS") {
            let negated = self.try_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(if negated {
                Expression::IsNotNull(Box::new(left))
            } else {
                Expression::IsNull(Box::new(left))
            });
        }

        let op = if self.try_str("<=") {
            Some(BinaryOperator::Le)
        } else if self.try_str(">=") {
            Some(BinaryOperator::Ge)
        } else if self.try_str("<>") || self.try_str("!=") {
            Some(BinaryOperator::Ne)
        } else if self.try_char('<') {
            Some(BinaryOperator::Lt)
        } else if self.try_char('>') {
            Some(BinaryOperator::Gt)
        } else if self.try_char('=') {
            Some(BinaryOperator::Eq)
        } else if self.try_keyword("IN") {
            Some(BinaryOperator::In)
        } else if self.try_keyword("CONTAINS") {
            Some(BinaryOperator::Contains)
        } else if self.try_keyword("STARTS") {
            self.expect_keyword("WITH")?;
            Some(BinaryOperator::StartsWith)
        } else if self.try_keyword("ENDS") {
            self.expect_keyword("WITH")?;
            Some(BinaryOperator::EndsWith)
        } else {
            None
        };

        match op {
            Some(operator) => {
                let right = self.parse_additive()?;
                Ok(binary(left, operator, right))
            }
            None => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            if self.try_char('+') {
                let right = self.parse_multiplicative()?;
                left = binary(left, BinaryOperator::Add, right);
            } else if self.try_char('-') {
                let right = self.parse_multiplicative()?;
                left = binary(left, BinaryOperator::Sub, right);
            } else {
                return Ok(left);
            }
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.try_char('*') {
                BinaryOperator::Mul
            } else if self.try_char('/') {
                BinaryOperator::Div
            } else if self.try_char('%') {
                BinaryOperator::Mod
            } else {
                return Ok(left);
            };
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.try_char('-') {
            return Ok(match self.parse_unary()? {
                Expression::Literal(Value::Int(i)) => Expression::Literal(Value::Int(-i)),
                Expression::Literal(Value::Float(f)) => Expression::Literal(Value::Float(-f)),
                other => Expression::Negate(Box::new(other)),
            });
        }
        if self.try_char('+') {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        self.skip_whitespace();

        if self.try_char('(') {
            let expr = self.parse_expression()?;
            self.expect_char(')')?;
            return Ok(expr);
        }

        if self.try_char('[') {
            let mut items = Vec::new();
            if !self.try_char(']') {
                loop {
                    items.push(self.parse_expression()?);
                    if !self.try_char(',') {
                        break;
                    }
                }
                self.expect_char(']')?;
            }
            return Ok(match literals(&items) {
                Some(values) => Expression::Literal(Value::List(values)),
                None => Expression::List(items),
            });
        }

        if self.try_char('{') {
            let entries = self.parse_map_entries()?;
            let values: Vec<Expression> = entries.iter().map(|(_, e)| e.clone()).collect();
            return Ok(match literals(&values) {
                Some(values) => {
                    let map: IndexMap<Value, Value> = entries
                        .iter()
                        .map(|(k, _)| Value::String(k.clone()))
                        .zip(values)
                        .collect();
                    Expression::Literal(Value::Map(map))
                }
                None => Expression::Map(entries),
            });
        }

        if self.try_char('$') {
            let name = self.parse_identifier()?;
            return self
                .parameters
                .get(&name)
                .map(|v| Expression::Literal(v.clone()))
                .ok_or_else(|| Error::ParseError(format!("Expected parameter(s): {}", name)));
        }

        if self.peek_char_is('"') || self.peek_char_is('\'') {
            return Ok(Expression::Literal(Value::String(self.parse_string()?)));
        }

        if self.peek_char_is_digit() {
            return self.parse_number_literal();
        }

        if self.try_keyword("TRUE") {
            return Ok(Expression::Literal(Value::Bool(true)));
        }
        if self.try_keyword("FALSE") {
            return Ok(Expression::Literal(Value::Bool(false)));
        }
        if self.try_keyword("NULL") {
            return Ok(Expression::Literal(Value::Null));
        }

        if !self.peek_char_is_alpha() {
            return Err(Error::ParseError(format!(
                "Expected expression at position {}, got '{}'",
                self.pos,
                self.remaining_snippet()
            )));
        }

        let name = self.parse_identifier()?;
        if RESERVED.iter().any(|k| k.eq_ignore_ascii_case(&name)) {
            return Err(Error::ParseError(format!(
                "Unexpected keyword '{}' in expression",
                name
            )));
        }

        if self.try_char('(') {
            return self.parse_function_call(name);
        }

        if self.try_char('.') {
            let key = self.parse_identifier()?;
            return Ok(Expression::Property(name, key));
        }

        Ok(Expression::Variable(name))
    }

    fn parse_function_call(&mut self, name: String) -> Result<Expression> {
        let name = name.to_lowercase();

        if name == "count" && self.try_char('*') {
            self.expect_char(')')?;
            return Ok(Expression::CountStar);
        }

        let distinct = self.try_keyword("DISTINCT");
        let mut args = Vec::new();
        if !self.try_char(')') {
            loop {
                args.push(self.parse_expression()?);
                if !self.try_char(',') {
                    break;
                }
            }
            self.expect_char(')')?;
        }

        Ok(Expression::Function {
            name,
            distinct,
            args,
        })
    }

    fn parse_number_literal(&mut self) -> Result<Expression> {
        let start = self.pos;
        let mut is_float = false;

        while self.peek_char_is_digit() {
            self.pos += 1;
        }
        // `1..3` is a range, not a float
        if self.peek_char_is('.') && self.peek_next_char_is_digit() {
            is_float = true;
            self.pos += 1;
            while self.peek_char_is_digit() {
                self.pos += 1;
            }
        }
        if self.peek_char_is('e') || self.peek_char_is('E') {
            is_float = true;
            self.pos += 1;
            if self.peek_char_is('-') || self.peek_char_is('+') {
                self.pos += 1;
            }
            while self.peek_char_is_digit() {
                self.pos += 1;
            }
        }

        let text = &self.input[start..self.pos];
        if is_float {
            text.parse::<f64>()
                .map(|f| Expression::Literal(Value::Float(f)))
                .map_err(|_| Error::ParseError(format!("Invalid number: {}", text)))
        } else {
            text.parse::<i64>()
                .map(|i| Expression::Literal(Value::Int(i)))
                .map_err(|_| Error::ParseError(format!("Invalid integer: {}", text)))
        }
    }

    // ========================================================================
    // Helper Methods
    // ========================================================================

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else if self.peek_str("//") {
                while let Some(c) = self.peek_char() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += c.len_utf8();
                }
            } else if self.peek_str("/*") {
                self.pos += 2;
                while self.pos < self.input.len() && !self.peek_str("*/") {
                    self.pos += self.peek_char().map_or(1, char::len_utf8);
                }
                if self.peek_str("*/") {
                    self.pos += 2;
                }
            } else {
                break;
            }
        }
    }

    fn remaining_snippet(&self) -> String {
        self.input[self.pos..].chars().take(20).collect()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_next_char_is_digit(&self) -> bool {
        self.input[self.pos..]
            .chars()
            .nth(1)
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
    }

    fn peek_char_is(&self, c: char) -> bool {
        self.peek_char() == Some(c)
    }

    fn peek_char_is_alpha(&self) -> bool {
        self.peek_char()
            .map(|c| c.is_alphabetic() || c == '_' || c == '`')
            .unwrap_or(false)
    }

    fn peek_char_is_digit(&self) -> bool {
        self.peek_char()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn try_char(&mut self, c: char) -> bool {
        self.skip_whitespace();
        if self.peek_char() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        if self.try_char(c) {
            Ok(())
        } else {
            Err(Error::ParseError(format!(
                "Expected '{}' at position {}, got {:?}",
                c,
                self.pos,
                self.peek_char()
            )))
        }
    }

    fn try_str(&mut self, s: &str) -> bool {
        self.skip_whitespace();
        if self.peek_str(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let end = self.pos + keyword.len();
        let matches = self
            .input
            .get(self.pos..end)
            .map_or(false, |slice| slice.eq_ignore_ascii_case(keyword));
        if !matches {
            return false;
        }
        let boundary = self.input[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '_');
        if boundary {
            self.pos = end;
        }
        boundary
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.try_keyword(keyword) {
            Ok(())
        } else {
            Err(Error::ParseError(format!(
                "Expected keyword '{}' at position {}",
                keyword, self.pos
            )))
        }
    }

    /// Plain or `` `escaped` `` identifier
    fn parse_identifier(&mut self) -> Result<String> {
        self.skip_whitespace();

        if self.peek_char_is('`') {
            self.pos += 1;
            let start = self.pos;
            while let Some(c) = self.peek_char() {
                if c == '`' {
                    let name = self.input[start..self.pos].to_string();
                    self.pos += 1;
                    return Ok(name);
                }
                self.pos += c.len_utf8();
            }
            return Err(Error::ParseError("Unclosed escaped identifier".to_string()));
        }

        let start = self.pos;
        match self.peek_char() {
            Some(c) if c.is_alphabetic() || c == '_' => self.pos += c.len_utf8(),
            _ => {
                return Err(Error::ParseError(format!(
                    "Expected identifier at position {}",
                    self.pos
                )))
            }
        }
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_string(&mut self) -> Result<String> {
        self.skip_whitespace();
        let quote = self
            .peek_char()
            .ok_or_else(|| Error::ParseError("Expected string".to_string()))?;
        if quote != '"' && quote != '\'' {
            return Err(Error::ParseError("Expected string quote".to_string()));
        }
        self.pos += 1;

        let mut result = String::new();
        while let Some(c) = self.peek_char() {
            if c == quote {
                self.pos += 1;
                return Ok(result);
            } else if c == '\\' {
                self.pos += 1;
                if let Some(escaped) = self.peek_char() {
                    self.pos += escaped.len_utf8();
                    match escaped {
                        'n' => result.push('\n'),
                        't' => result.push('\t'),
                        'r' => result.push('\r'),
                        _ => result.push(escaped),
                    }
                }
            } else {
                self.pos += c.len_utf8();
                result.push(c);
            }
        }

        Err(Error::ParseError("Unclosed string".to_string()))
    }

    fn parse_plain_integer(&mut self) -> Result<u32> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek_char_is_digit() {
            self.pos += 1;
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| Error::ParseError("Expected integer".to_string()))
    }
}

fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Expression {
    Expression::Binary(Box::new(left), op, Box::new(right))
}

/// All items constant: their values.
fn literals(items: &[Expression]) -> Option<Vec<Value>> {
    items.iter().map(|e| e.as_literal().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<CypherAst> {
        CypherAst::parse(text, &Parameters::new())
    }

    #[test]
    fn test_parse_simple_match() {
        let ast = parse("MATCH (n:person) RETURN n.name").unwrap();
        let query = ast.query();
        assert_eq!(query.matches.len(), 1);
        let start = &query.matches[0].patterns[0].start;
        assert_eq!(start.variable.as_deref(), Some("n"));
        assert_eq!(start.labels, vec!["person".to_string()]);

        let ret = query.return_clause.as_ref().unwrap();
        assert_eq!(ret.items[0].name(), "n.name");
        assert_eq!(
            ret.items[0].expression,
            Expression::Property("n".into(), "name".into())
        );
        assert!(!ast.options().is_explain());
    }

    #[test]
    fn test_parse_explain() {
        let ast = parse("explain MATCH (n) RETURN n").unwrap();
        assert!(ast.options().is_explain());
        assert_eq!(ast.options().to_string(), "[EXPLAIN]");
    }

    #[test]
    fn test_parse_relationship_directions() {
        let ast = parse("MATCH (a)-[r:knows]->(b)<-[:created]-(c)-[]-(d)--(e) RETURN a").unwrap();
        let chain = &ast.query().matches[0].patterns[0].chain;
        let directions: Vec<Direction> = chain.iter().map(|(r, _)| r.direction).collect();
        assert_eq!(
            directions,
            vec![
                Direction::Outgoing,
                Direction::Incoming,
                Direction::Both,
                Direction::Both
            ]
        );
        assert_eq!(chain[0].0.variable.as_deref(), Some("r"));
        assert_eq!(chain[1].0.types, vec!["created".to_string()]);
        assert!(parse("MATCH (a)<-[r]->(b) RETURN a").is_err());
    }

    #[test]
    fn test_parse_var_length() {
        let cases = [
            ("*", VarLength { min: 1, max: None }),
            ("*3", VarLength { min: 3, max: Some(3) }),
            ("*1..2", VarLength { min: 1, max: Some(2) }),
            ("*..4", VarLength { min: 1, max: Some(4) }),
            ("*0..", VarLength { min: 0, max: None }),
        ];
        for (range, expected) in cases {
            let text = format!("MATCH (a)-[:knows{}]->(b) RETURN b", range);
            let ast = parse(&text).unwrap();
            let rel = &ast.query().matches[0].patterns[0].chain[0].0;
            assert_eq!(rel.length, Some(expected), "{}", range);
        }
        assert!(parse("MATCH (a)-[*3..1]->(b) RETURN b").is_err());
    }

    #[test]
    fn test_parse_parameters() {
        let mut params = Parameters::new();
        params.insert("name".to_string(), Value::from("Alice"));
        let ast = CypherAst::parse("MATCH (n {name: $name}) RETURN n", &params).unwrap();
        let props = &ast.query().matches[0].patterns[0].start.properties;
        assert_eq!(props[0].1, Expression::Literal(Value::from("Alice")));

        let missing = CypherAst::parse("MATCH (n {name: $other}) RETURN n", &params);
        assert!(matches!(missing, Err(Error::ParseError(_))));
    }

    #[test]
    fn test_parse_expressions() {
        let ast = parse(
            "MATCH (n) WHERE n.age >= 30 AND NOT n.name STARTS WITH 'B' OR n.x IS NULL \
             RETURN -1 AS a, [1, 2.5, 'x'] AS b, {k: n.age} AS c, count(*) AS d",
        )
        .unwrap();
        let query = ast.query();
        assert!(matches!(
            query.matches[0].where_clause,
            Some(Expression::Binary(_, BinaryOperator::Or, _))
        ));
        let items = &query.return_clause.as_ref().unwrap().items;
        assert_eq!(items[0].expression, Expression::Literal(Value::Int(-1)));
        assert_eq!(
            items[1].expression,
            Expression::Literal(Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::from("x")
            ]))
        );
        assert!(matches!(items[2].expression, Expression::Map(_)));
        assert_eq!(items[3].expression, Expression::CountStar);
    }

    #[test]
    fn test_parse_create_set_delete() {
        let ast = parse(
            "MATCH (a:person {name: 'Alice'}) CREATE (a)-[:knows {since: 2020}]->(b:person) \
             SET a.age = 30 DETACH DELETE b RETURN a",
        )
        .unwrap();
        let query = ast.query();
        assert_eq!(query.create.len(), 1);
        assert_eq!(query.set[0].key, "age");
        let delete = query.delete.as_ref().unwrap();
        assert!(delete.detach);
        assert_eq!(delete.variables, vec!["b".to_string()]);
    }

    #[test]
    fn test_parse_return_modifiers() {
        let ast = parse("MATCH (n) RETURN DISTINCT n.name AS name ORDER BY name DESC SKIP 1 LIMIT 2")
            .unwrap();
        let ret = ast.query().return_clause.clone().unwrap();
        assert!(ret.distinct);
        assert_eq!(ret.items[0].name(), "name");
        assert!(ret.order_by[0].descending);
        assert_eq!(ret.order_by[0].text, "name");
        assert_eq!((ret.skip, ret.limit), (Some(1), Some(2)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse("MATCH n RETURN n"), Err(Error::ParseError(_))));
        assert!(matches!(parse("RETURN"), Err(Error::ParseError(_))));
        assert!(matches!(parse("MATCH (n) RETURN n garbage"), Err(Error::ParseError(_))));
        assert!(matches!(parse(""), Err(Error::ParseError(_))));
        assert!(parse("RETURN 'unterminated").is_err());
    }
}
