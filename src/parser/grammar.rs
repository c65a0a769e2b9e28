//! Declarative grammar rules with transactional backtracking.
//!
//! Rules are plain values composed into trees. `Parser::match_rule` interprets
//! them against the token stream; composite rules restore the cursor when they
//! fail so sibling alternatives start from a clean position. Expressions keep
//! their dedicated precedence parser and plug in through [`Rule::Custom`].

use crate::ast::Expr;
use crate::lexer::TokenKind;
use crate::parser::{ParseError, Parser};

use std::fmt;
use std::ops::Range;

/// Hands control to hand-written parsing code.
pub type CustomRule<'ctx> = for<'p, 't> fn(&'p mut Parser<'t, 'ctx>) -> Result<Expr<'ctx>, ParseError>;

pub enum Rule<'ctx> {
    Terminal(TokenKind),
    Sequence(Vec<Rule<'ctx>>),
    Choice(Vec<Rule<'ctx>>),
    Optional(Box<Rule<'ctx>>),
    Custom(CustomRule<'ctx>),
}

impl<'ctx> Rule<'ctx> {
    pub fn terminal(kind: TokenKind) -> Self {
        Rule::Terminal(kind)
    }

    pub fn sequence(rules: Vec<Rule<'ctx>>) -> Self {
        Rule::Sequence(rules)
    }

    pub fn choice(rules: Vec<Rule<'ctx>>) -> Self {
        Rule::Choice(rules)
    }

    pub fn optional(rule: Rule<'ctx>) -> Self {
        Rule::Optional(Box::new(rule))
    }

    pub fn custom(parse: CustomRule<'ctx>) -> Self {
        Rule::Custom(parse)
    }
}

impl fmt::Debug for Rule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Terminal(kind) => f.debug_tuple("Terminal").field(kind).finish(),
            Rule::Sequence(rules) => f.debug_tuple("Sequence").field(rules).finish(),
            Rule::Choice(rules) => f.debug_tuple("Choice").field(rules).finish(),
            Rule::Optional(rule) => f.debug_tuple("Optional").field(rule).finish(),
            Rule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// What a successful match consumed.
#[derive(Debug)]
pub struct Matched<'ctx> {
    /// Token indices consumed, empty when an optional rule matched nothing.
    pub tokens: Range<usize>,
    /// Nodes produced by custom sub-rules, in match order.
    pub nodes: Vec<Expr<'ctx>>,
}

impl Matched<'_> {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<'ctx> Parser<'_, 'ctx> {
    /// Matches `rule` at the current position.
    ///
    /// `Ok(None)` means no match and the cursor is unchanged. `Err` carries a
    /// hard error from a custom rule; the cursor is restored to where the
    /// outermost failing composite rule started.
    pub fn match_rule(&mut self, rule: &Rule<'ctx>) -> Result<Option<Matched<'ctx>>, ParseError> {
        let start = self.position();

        match rule {
            Rule::Terminal(kind) => match self.peek() {
                Some(token) if token.kind == *kind => {
                    self.bump();
                    Ok(Some(Matched {
                        tokens: start..self.position(),
                        nodes: vec![],
                    }))
                }
                _ => Ok(None),
            },

            Rule::Sequence(rules) => {
                let mut nodes = vec![];
                for rule in rules {
                    match self.match_rule(rule) {
                        Ok(Some(matched)) => nodes.extend(matched.nodes),
                        Ok(None) => {
                            self.reset(start);
                            return Ok(None);
                        }
                        Err(err) => {
                            self.reset(start);
                            return Err(err);
                        }
                    }
                }
                Ok(Some(Matched {
                    tokens: start..self.position(),
                    nodes,
                }))
            }

            Rule::Choice(rules) => {
                for rule in rules {
                    match self.match_rule(rule) {
                        Ok(Some(matched)) => return Ok(Some(matched)),
                        Ok(None) => self.reset(start),
                        Err(err) => {
                            self.reset(start);
                            return Err(err);
                        }
                    }
                }
                Ok(None)
            }

            Rule::Optional(rule) => match self.match_rule(rule)? {
                Some(matched) => Ok(Some(matched)),
                None => {
                    self.reset(start);
                    Ok(Some(Matched {
                        tokens: start..start,
                        nodes: vec![],
                    }))
                }
            },

            Rule::Custom(parse) => match parse(self) {
                Ok(node) => Ok(Some(Matched {
                    tokens: start..self.position(),
                    nodes: vec![node],
                })),
                Err(err) if err.is_hard() => Err(err),
                Err(_) => Ok(None),
            },
        }
    }
}

/// Prebuilt rules for the arithmetic token set.
pub mod rules {
    use super::Rule;
    use crate::lexer::TokenKind;

    pub fn operator<'ctx>() -> Rule<'ctx> {
        Rule::choice(vec![
            Rule::terminal(TokenKind::Plus),
            Rule::terminal(TokenKind::Minus),
            Rule::terminal(TokenKind::Star),
            Rule::terminal(TokenKind::Slash),
        ])
    }

    pub fn term<'ctx>() -> Rule<'ctx> {
        Rule::choice(vec![Rule::terminal(TokenKind::Integer)])
    }

    pub fn arg<'ctx>() -> Rule<'ctx> {
        Rule::choice(vec![term()])
    }

    pub fn expression<'ctx>() -> Rule<'ctx> {
        Rule::custom(|parser| parser.parse_expression())
    }

    /// `( expression )`
    pub fn group<'ctx>() -> Rule<'ctx> {
        Rule::sequence(vec![
            Rule::terminal(TokenKind::LParen),
            expression(),
            Rule::terminal(TokenKind::RParen),
        ])
    }
}
