pub mod expression;
pub mod grammar;

#[cfg(test)]
pub mod test;

use crate::ast::{Expr, Type};
use crate::lexer::{SourceFile, Token, TokenKind, TokenStream};

use ariadne::{Color, ColorGenerator, Fmt, Label, Report, ReportKind};
use thiserror::Error;

use std::ops::Range;
use std::rc::Rc;

#[derive(Debug, Clone, Error)]
pub enum ParseError {
    #[error("expected an expression, found {}", .found.kind)]
    ExpectedExpression { found: Token },

    #[error("unclosed parenthesis, expected ')' but found {}", .found.kind)]
    UnclosedParen { open: Token, found: Token },

    #[error("integer literal '{}' does not fit in 64 bits", .token.lexeme())]
    IntegerOutOfRange { token: Token },

    #[error("unexpected {} after the expression", .found.kind)]
    TrailingInput { found: Token },

    #[error("unrecognized character '{}'", .token.lexeme())]
    UnknownCharacter { token: Token },

    #[error("expression nested deeper than {} levels", MAX_NESTING)]
    NestingTooDeep { token: Token },

    #[error("ran past the end of the token stream")]
    EndOfStream,
}

/// Unary prefixes and parentheses nest at most this deep.
pub const MAX_NESTING: usize = 2048;

impl ParseError {
    /// Hard errors abort the enclosing expression. The only soft error is a
    /// plain "no expression here", which the rule engine treats as no-match.
    pub fn is_hard(&self) -> bool {
        !matches!(self, ParseError::ExpectedExpression { .. })
    }

    /// The token the error points at.
    pub fn token(&self) -> Option<&Token> {
        match self {
            ParseError::ExpectedExpression { found }
            | ParseError::UnclosedParen { found, .. }
            | ParseError::TrailingInput { found } => Some(found),
            ParseError::IntegerOutOfRange { token }
            | ParseError::UnknownCharacter { token }
            | ParseError::NestingTooDeep { token } => Some(token),
            ParseError::EndOfStream => None,
        }
    }

    pub fn report(&self, file: &SourceFile) -> Report<'static, (String, Range<usize>)> {
        let name = file.name.clone();
        let span = self
            .token()
            .map_or(file.len()..file.len(), |token| token.span.clone());
        let mut colors = ColorGenerator::new();

        let builder = Report::build(ReportKind::Error, (name.clone(), span.clone()))
            .with_code(self.code())
            .with_message(self.to_string());

        let builder = match self {
            ParseError::UnclosedParen { open, found } => builder
                .with_label(
                    Label::new((name.clone(), found.span.clone()))
                        .with_message(format!(
                            "expected {} here",
                            Fmt::fg("')'", Color::Yellow)
                        ))
                        .with_color(colors.next()),
                )
                .with_label(
                    Label::new((name, open.span.clone()))
                        .with_message("parenthesis opened here")
                        .with_color(colors.next()),
                )
                .with_note(format!(
                    "{}:{}: maybe you missed ')'?",
                    found.meta.line + 1,
                    found.meta.start + 1
                )),
            ParseError::UnknownCharacter { .. } => builder
                .with_label(
                    Label::new((name, span))
                        .with_message("lexing stopped at this character")
                        .with_color(colors.next()),
                )
                .with_note("only digits, '+', '-', '*', '/' and parentheses are understood"),
            _ => builder.with_label(
                Label::new((name, span))
                    .with_message(self.to_string())
                    .with_color(colors.next()),
            ),
        };

        builder.finish()
    }

    fn code(&self) -> &'static str {
        match self {
            ParseError::ExpectedExpression { .. } => "Syntax Error",
            ParseError::UnclosedParen { .. } => "Unclosed Parenthesis",
            ParseError::IntegerOutOfRange { .. } => "Integer Overflow",
            ParseError::TrailingInput { .. } => "Syntax Error",
            ParseError::UnknownCharacter { .. } => "Unknown Character",
            ParseError::NestingTooDeep { .. } => "Nesting Limit",
            ParseError::EndOfStream => "EOF",
        }
    }
}

/// Cursor over a token stream. The position is owned by the parser and every
/// failed rule or expression puts it back where it started.
pub struct Parser<'t, 'ctx> {
    tokens: &'t TokenStream,
    pos: usize,
    depth: usize,
    int_type: Rc<Type<'ctx>>,
}

impl<'t, 'ctx> Parser<'t, 'ctx> {
    pub fn new(tokens: &'t TokenStream) -> Self {
        Self::with_int_type(tokens, Type::int(32, true))
    }

    /// Builds a parser that annotates every node with `int_type`.
    pub fn with_int_type(tokens: &'t TokenStream, int_type: Rc<Type<'ctx>>) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            int_type,
        }
    }

    pub fn int_type(&self) -> &Rc<Type<'ctx>> {
        &self.int_type
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    /// Consumes the current token and returns it.
    pub fn bump(&mut self) -> Option<&'t Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    pub(crate) fn enter(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                token: token.clone(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parses the whole stream as a single expression.
    ///
    /// An empty stream is `Ok(None)`; anything left after the expression is an
    /// error.
    #[tracing::instrument(level = "debug", skip_all, fields(file = %self.tokens.file().name))]
    pub fn parse_program(&mut self) -> Result<Option<Expr<'ctx>>, ParseError> {
        match self.peek() {
            None => return Err(ParseError::EndOfStream),
            Some(token) if token.kind == TokenKind::Eof => return Ok(None),
            Some(_) => {}
        }

        let expr = self.parse_expression()?;

        match self.peek() {
            None => Ok(Some(expr)),
            Some(token) => match token.kind {
                TokenKind::Eof => {
                    tracing::debug!(nodes = expr.node_count(), "parsed expression");
                    Ok(Some(expr))
                }
                TokenKind::Unknown => Err(ParseError::UnknownCharacter {
                    token: token.clone(),
                }),
                _ => Err(ParseError::TrailingInput {
                    found: token.clone(),
                }),
            },
        }
    }
}
