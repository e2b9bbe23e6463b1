//! Expression Parser
//!
//! Recursive descent over the token stream, one function per precedence
//! level (lowest first): assignment, conditional, `||`, `&&`, equality,
//! comparison, additive, multiplicative, unary, postfix, call/member,
//! primary.

use std::rc::Rc;

use super::ast::*;
use super::lexer::{tokenize, Punct, Token, TokenKind};
use crate::error::ExprError;

/// Parse a declaration body: `key: expr, key2: expr2`, optionally wrapped
/// in one pair of braces.
pub fn parse_object(source: &str) -> Result<ObjectExpr, ExprError> {
    let mut tokens = tokenize(source)?;
    if wrapped_in_braces(&tokens) {
        tokens.pop();
        tokens.remove(0);
    }
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    let object = parser.declaration()?;
    parser.expect_end()?;
    Ok(object)
}

/// Parse a single expression.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser {
        source,
        tokens: tokenize(source)?,
        pos: 0,
    };
    let expr = parser.expression()?;
    parser.expect_end()?;
    Ok(expr)
}

/// True when the first token is `{` and its matching `}` is the last token.
fn wrapped_in_braces(tokens: &[Token]) -> bool {
    if !tokens.first().is_some_and(|t| t.is_punct(Punct::LBrace)) {
        return false;
    }
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_punct(Punct::LBrace) {
            depth += 1;
        } else if token.is_punct(Punct::RBrace) {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return i == tokens.len() - 1;
            }
        }
    }
    false
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at(&self, punct: Punct) -> bool {
        self.peek().is_some_and(|t| t.is_punct(punct))
    }

    fn eat(&mut self, punct: Punct) -> bool {
        if self.at(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> ExprError {
        match self.peek() {
            Some(token) => ExprError::UnexpectedToken {
                found: token.describe(),
                expected,
                offset: token.start,
            },
            None => ExprError::UnexpectedEnd { expected },
        }
    }

    fn expect(&mut self, punct: Punct, expected: &'static str) -> Result<(), ExprError> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_end(&self) -> Result<(), ExprError> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of expression")),
        }
    }

    fn ident(&mut self, expected: &'static str) -> Result<String, ExprError> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn declaration(&mut self) -> Result<ObjectExpr, ExprError> {
        let mut entries = Vec::new();
        while self.peek().is_some() {
            entries.push(self.entry()?);
            if !self.eat(Punct::Comma) {
                break;
            }
        }
        Ok(ObjectExpr { entries })
    }

    /// `key: value`, `"quoted key": value`, `dotted.key.path: value` or the
    /// shorthand `key`.
    fn entry(&mut self) -> Result<Entry, ExprError> {
        let first = self.peek().cloned().ok_or(ExprError::UnexpectedEnd { expected: "key" })?;
        let key = match &first.kind {
            TokenKind::Str(s) => {
                self.pos += 1;
                s.clone()
            }
            TokenKind::Ident(name) => {
                let shorthand = !self.peek_at(1).is_some_and(|t| {
                    t.is_punct(Punct::Colon) || t.is_punct(Punct::Dot) || t.is_punct(Punct::Minus)
                });
                if shorthand {
                    self.pos += 1;
                    return Ok(Entry {
                        key: name.clone(),
                        value: Expr::Ident(name.clone()),
                    });
                }
                self.path_key()?
            }
            TokenKind::Number(n) => {
                self.pos += 1;
                crate::value::format_number(*n)
            }
            TokenKind::Punct(_) => return Err(self.unexpected("key")),
        };
        self.expect(Punct::Colon, "':' after key")?;
        let value = self.expression()?;
        Ok(Entry { key, value })
    }

    /// A key made of identifiers, numbers, dots and dashes, taken verbatim
    /// from the source (`onclick.prevent.debounce300`, `class.is-open`).
    fn path_key(&mut self) -> Result<String, ExprError> {
        let start = self.peek().map(|t| t.start).unwrap_or_default();
        let mut end = start;
        while let Some(token) = self.peek() {
            let part = matches!(token.kind, TokenKind::Ident(_) | TokenKind::Number(_))
                || token.is_punct(Punct::Dot)
                || token.is_punct(Punct::Minus);
            if !part {
                break;
            }
            end = token.end;
            self.pos += 1;
        }
        Ok(self.source[start..end].split_whitespace().collect())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ExprError> {
        if let Some(arrow) = self.arrow()? {
            return Ok(arrow);
        }

        let offset = self.peek().map(|t| t.start).unwrap_or_default();
        let target = self.conditional()?;
        let op = if self.eat(Punct::Assign) {
            AssignOp::Assign
        } else if self.eat(Punct::PlusAssign) {
            AssignOp::Add
        } else if self.eat(Punct::MinusAssign) {
            AssignOp::Sub
        } else {
            return Ok(target);
        };

        if !is_assignable(&target) {
            return Err(ExprError::InvalidAssignment { offset });
        }
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// `x => body` or `(a, b) => body`, if the tokens ahead form one.
    fn arrow(&mut self) -> Result<Option<Expr>, ExprError> {
        let params = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Ident(name)) if self.peek_at(1).is_some_and(|t| t.is_punct(Punct::Arrow)) => {
                let params = vec![name.clone()];
                self.pos += 2;
                params
            }
            Some(TokenKind::Punct(Punct::LParen)) => {
                let Some(close) = self.matching_paren() else {
                    return Ok(None);
                };
                if !self.tokens.get(close + 1).is_some_and(|t| t.is_punct(Punct::Arrow)) {
                    return Ok(None);
                }
                self.pos += 1;
                let mut params = Vec::new();
                while !self.at(Punct::RParen) {
                    params.push(self.ident("parameter name")?);
                    if !self.eat(Punct::Comma) {
                        break;
                    }
                }
                self.expect(Punct::RParen, "')' after parameters")?;
                self.expect(Punct::Arrow, "'=>'")?;
                params
            }
            _ => return Ok(None),
        };

        let body = if self.eat(Punct::LBrace) {
            let mut statements = Vec::new();
            while !self.at(Punct::RBrace) {
                if self.eat(Punct::Semi) {
                    continue;
                }
                statements.push(self.expression()?);
                if !self.eat(Punct::Semi) && !self.at(Punct::RBrace) {
                    return Err(self.unexpected("';' or '}'"));
                }
            }
            self.expect(Punct::RBrace, "'}'")?;
            Body::Block(statements)
        } else {
            Body::Expr(self.assignment()?)
        };

        Ok(Some(Expr::Arrow(Rc::new(ArrowFn { params, body }))))
    }

    fn matching_paren(&self) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(self.pos) {
            if token.is_punct(Punct::LParen) {
                depth += 1;
            } else if token.is_punct(Punct::RParen) {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
        }
        None
    }

    fn conditional(&mut self) -> Result<Expr, ExprError> {
        let test = self.logical_or()?;
        if !self.eat(Punct::Question) {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(Punct::Colon, "':' in conditional")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.logical_and()?;
        while self.eat(Punct::OrOr) {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.equality()?;
        while self.eat(Punct::AndAnd) {
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    /// Parse one left-associative binary level.
    fn binary_level(
        &mut self,
        ops: &[(Punct, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, ExprError>,
    ) -> Result<Expr, ExprError> {
        let mut left = next(self)?;
        'outer: loop {
            for &(punct, op) in ops {
                if self.eat(punct) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[
                (Punct::EqEqEq, BinaryOp::StrictEq),
                (Punct::NotEqEq, BinaryOp::StrictNotEq),
                (Punct::EqEq, BinaryOp::Eq),
                (Punct::NotEq, BinaryOp::NotEq),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[
                (Punct::Le, BinaryOp::Le),
                (Punct::Ge, BinaryOp::Ge),
                (Punct::Lt, BinaryOp::Lt),
                (Punct::Gt, BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[(Punct::Plus, BinaryOp::Add), (Punct::Minus, BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        self.binary_level(
            &[
                (Punct::Star, BinaryOp::Mul),
                (Punct::Slash, BinaryOp::Div),
                (Punct::Percent, BinaryOp::Mod),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        let op = if self.eat(Punct::Bang) {
            Some(UnaryOp::Not)
        } else if self.eat(Punct::Minus) {
            Some(UnaryOp::Neg)
        } else if self.eat(Punct::Plus) {
            Some(UnaryOp::Plus)
        } else {
            None
        };
        if let Some(op) = op {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }

        let update = if self.eat(Punct::PlusPlus) {
            Some(UpdateOp::Increment)
        } else if self.eat(Punct::MinusMinus) {
            Some(UpdateOp::Decrement)
        } else {
            None
        };
        if let Some(op) = update {
            let offset = self.peek().map(|t| t.start).unwrap_or_default();
            let target = self.unary()?;
            if !is_assignable(&target) {
                return Err(ExprError::InvalidAssignment { offset });
            }
            return Ok(Expr::Update {
                op,
                prefix: true,
                target: Box::new(target),
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let offset = self.peek().map(|t| t.start).unwrap_or_default();
        let expr = self.call()?;
        let op = if self.eat(Punct::PlusPlus) {
            UpdateOp::Increment
        } else if self.eat(Punct::MinusMinus) {
            UpdateOp::Decrement
        } else {
            return Ok(expr);
        };
        if !is_assignable(&expr) {
            return Err(ExprError::InvalidAssignment { offset });
        }
        Ok(Expr::Update {
            op,
            prefix: false,
            target: Box::new(expr),
        })
    }

    fn call(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(Punct::Dot) {
                let property = self.ident("property name")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(Punct::LBracket) {
                let index = self.expression()?;
                self.expect(Punct::RBracket, "']'")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat(Punct::LParen) {
                let args = self.list(Punct::RParen, "')' after arguments")?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn list(&mut self, close: Punct, expected: &'static str) -> Result<Vec<Expr>, ExprError> {
        let mut items = Vec::new();
        while !self.at(close) {
            items.push(self.expression()?);
            if !self.eat(Punct::Comma) {
                break;
            }
        }
        self.expect(close, expected)?;
        Ok(items)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.advance() else {
            return Err(ExprError::UnexpectedEnd { expected: "expression" });
        };
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Literal::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Literal::String(s))),
            TokenKind::Ident(name) => Ok(match name.as_str() {
                "true" => Expr::Literal(Literal::Bool(true)),
                "false" => Expr::Literal(Literal::Bool(false)),
                "null" | "undefined" => Expr::Literal(Literal::Null),
                "this" => Expr::This,
                _ => Expr::Ident(name),
            }),
            TokenKind::Punct(Punct::LParen) => {
                let expr = self.expression()?;
                self.expect(Punct::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBracket) => {
                Ok(Expr::Array(self.list(Punct::RBracket, "']' after array items")?))
            }
            TokenKind::Punct(Punct::LBrace) => {
                let mut fields = Vec::new();
                while !self.at(Punct::RBrace) {
                    let entry = self.entry()?;
                    fields.push((entry.key, entry.value));
                    if !self.eat(Punct::Comma) {
                        break;
                    }
                }
                self.expect(Punct::RBrace, "'}' after object fields")?;
                Ok(Expr::Object(fields))
            }
            TokenKind::Punct(_) => {
                self.pos -= 1;
                Err(self.unexpected("expression"))
            }
        }
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. })
}
