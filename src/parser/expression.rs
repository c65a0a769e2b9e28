use crate::ast::{BinOp, Expr, UnOp};
use crate::lexer::TokenKind;
use crate::parser::{ParseError, Parser};

use std::rc::Rc;

impl<'ctx> Parser<'_, 'ctx> {
    /// Parses one arithmetic expression by precedence climbing.
    ///
    /// On error the cursor is left where it was on entry.
    pub fn parse_expression(&mut self) -> Result<Expr<'ctx>, ParseError> {
        let start = self.position();
        let result = self.parse_binary(0);
        if result.is_err() {
            self.reset(start);
        }
        result
    }

    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr<'ctx>, ParseError> {
        let mut lhs = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let Some(prec) = token.kind.precedence() else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let Some(op) = BinOp::from_token(token.kind) else {
                break;
            };
            self.bump();

            // equal precedence on the right would make the chain right-leaning
            let rhs = self.parse_binary(prec + 1)?;
            tracing::trace!(op = op.symbol(), "folded binary node");
            lhs = Expr::binary(op, lhs, rhs, Rc::clone(self.int_type()));
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr<'ctx>, ParseError> {
        let token = self.peek().ok_or(ParseError::EndOfStream)?;

        let Some(op) = UnOp::from_token(token.kind) else {
            return self.parse_primary();
        };
        self.bump();

        self.enter(token)?;
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;

        match op {
            UnOp::Plus => Ok(operand),
            UnOp::Minus => {
                let span = token.span.start..operand.span.end;
                Ok(Expr::unary(UnOp::Minus, operand, Rc::clone(self.int_type())).with_span(span))
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expr<'ctx>, ParseError> {
        let token = self.peek().ok_or(ParseError::EndOfStream)?;

        match token.kind {
            TokenKind::Integer => {
                self.bump();
                let value = token
                    .lexeme()
                    .parse::<i64>()
                    .map_err(|_| ParseError::IntegerOutOfRange {
                        token: token.clone(),
                    })?;
                Ok(Expr::literal(value, Rc::clone(self.int_type())).with_span(token.span.clone()))
            }
            TokenKind::LParen => {
                self.bump();
                self.enter(token)?;
                let inner = self.parse_binary(0);
                self.leave();
                let inner = inner?;

                match self.peek() {
                    Some(close) if close.kind == TokenKind::RParen => {
                        self.bump();
                        Ok(inner.with_span(token.span.start..close.span.end))
                    }
                    Some(found) => Err(ParseError::UnclosedParen {
                        open: token.clone(),
                        found: found.clone(),
                    }),
                    None => Err(ParseError::EndOfStream),
                }
            }
            TokenKind::Unknown => Err(ParseError::UnknownCharacter {
                token: token.clone(),
            }),
            _ => Err(ParseError::ExpectedExpression {
                found: token.clone(),
            }),
        }
    }
}
