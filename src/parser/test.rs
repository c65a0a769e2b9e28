use super::*;
use crate::ast::{ExprKind, TypeKind, UnOp};
use crate::parser::grammar::{Rule, rules};

use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn lex_str(input: &str) -> TokenStream {
    TokenStream::lex(SourceFile::new("test", input))
}

// Helper function to parse input straight from a string
fn parse_str(input: &str) -> Result<Option<Expr<'static>>, ParseError> {
    let tokens = lex_str(input);
    let mut parser = Parser::new(&tokens);
    parser.parse_program()
}

fn tree(input: &str) -> String {
    parse_str(input)
        .unwrap_or_else(|err| panic!("failed to parse {input:?}: {err}"))
        .expect("expected an expression")
        .to_string()
}

#[test]
fn test_parse_literal() {
    assert_eq!(tree("42"), "42");
    assert_eq!(tree("007"), "7");
}

#[test]
fn test_mul_binds_tighter_than_add() {
    assert_eq!(tree("3+4*2"), "(+ 3 (* 4 2))");
    assert_eq!(tree("3*4+2"), "(+ (* 3 4) 2)");
    assert_eq!(tree("1+6/3-2"), "(- (+ 1 (/ 6 3)) 2)");
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(tree("(3+4)*2"), "(* (+ 3 4) 2)");
    assert_eq!(tree("2*(3+(4-1))"), "(* 2 (+ 3 (- 4 1)))");
    assert_eq!(tree("((7))"), "7");
}

#[test]
fn test_left_associativity() {
    let expr = parse_str("8-3-2").unwrap().unwrap();
    assert_eq!(expr.to_string(), "(- (- 8 3) 2)");
    assert_eq!(expr.evaluate(), Some(3));

    assert_eq!(tree("16/4/2"), "(/ (/ 16 4) 2)");
    assert_eq!(tree("1+2+3+4"), "(+ (+ (+ 1 2) 3) 4)");
}

#[test]
fn test_unary_operators() {
    assert_eq!(tree("--3"), "(neg (neg 3))");
    assert_eq!(tree("+3"), "3");
    assert_eq!(tree("+-3"), "(neg 3)");
    assert_eq!(tree("-+-3"), "(neg (neg 3))");
    assert_eq!(tree("-3*2"), "(* (neg 3) 2)");
    assert_eq!(tree("2--3"), "(- 2 (neg 3))");
    assert_eq!(tree("-(1+2)"), "(neg (+ 1 2))");
}

#[test]
fn test_unary_plus_is_not_wrapped() {
    let expr = parse_str("+5").unwrap().unwrap();
    assert!(matches!(expr.kind, ExprKind::Literal(5)));
}

#[test]
fn test_unary_minus_node() {
    let expr = parse_str("-5").unwrap().unwrap();
    let ExprKind::Unary { op, operand } = &expr.kind else {
        panic!("expected unary node, got {expr}");
    };
    assert_eq!(*op, UnOp::Minus);
    assert!(matches!(operand.kind, ExprKind::Literal(5)));
}

#[test]
fn test_nodes_share_canonical_type() {
    let tokens = lex_str("1 + -2 * (3 - 4)");
    let mut parser = Parser::new(&tokens);
    let canonical = Rc::clone(parser.int_type());
    let expr = parser.parse_program().unwrap().unwrap();

    fn check(expr: &Expr<'_>, canonical: &Rc<Type<'_>>) {
        assert!(Rc::ptr_eq(&expr.ty, canonical));
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Unary { operand, .. } => check(operand, canonical),
            ExprKind::Binary { lhs, rhs, .. } => {
                check(lhs, canonical);
                check(rhs, canonical);
            }
        }
    }

    check(&expr, &canonical);
    assert!(matches!(
        canonical.kind,
        TypeKind::Int {
            bits: 32,
            signed: true
        }
    ));
}

#[test]
fn test_custom_int_type() {
    let tokens = lex_str("7/2");
    let unsigned = Type::int(32, false);
    let mut parser = Parser::with_int_type(&tokens, Rc::clone(&unsigned));
    let expr = parser.parse_program().unwrap().unwrap();
    assert!(Rc::ptr_eq(&expr.ty, &unsigned));
    assert!(!expr.ty.is_signed());
}

#[test]
fn test_expression_spans() {
    let expr = parse_str("12 + 3").unwrap().unwrap();
    assert_eq!(expr.span, 0..6);

    let expr = parse_str("(1+2) * 3").unwrap().unwrap();
    let ExprKind::Binary { lhs, .. } = &expr.kind else {
        panic!("expected binary node");
    };
    assert_eq!(lhs.span, 0..5);
}

#[test]
fn test_empty_source() {
    assert!(parse_str("").unwrap().is_none());
    assert!(parse_str("   \n\t ").unwrap().is_none());
}

#[test]
fn test_unclosed_parenthesis() {
    let tokens = lex_str("(3+4");
    let mut parser = Parser::new(&tokens);
    let err = parser.parse_program().unwrap_err();

    let ParseError::UnclosedParen { open, found } = &err else {
        panic!("expected unclosed parenthesis, got {err:?}");
    };
    assert_eq!(open.kind, TokenKind::LParen);
    assert_eq!(open.meta.start, 0);
    assert_eq!(found.kind, TokenKind::Eof);
    assert_eq!(found.meta.end, 4);
    assert!(err.is_hard());
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_unclosed_parenthesis_before_other_token() {
    let err = parse_str("(1 2").unwrap_err();
    let ParseError::UnclosedParen { found, .. } = err else {
        panic!("expected unclosed parenthesis");
    };
    assert_eq!(found.lexeme(), "2");
}

#[test]
fn test_missing_operand() {
    let err = parse_str("3 +").unwrap_err();
    let ParseError::ExpectedExpression { found } = &err else {
        panic!("expected missing expression, got {err:?}");
    };
    assert_eq!(found.kind, TokenKind::Eof);
    assert!(!err.is_hard());
}

#[test]
fn test_keywords_are_not_expressions() {
    let err = parse_str("return 1").unwrap_err();
    let ParseError::ExpectedExpression { found } = err else {
        panic!("expected missing expression");
    };
    assert_eq!(found.kind, TokenKind::KeywordReturn);
}

#[test]
fn test_trailing_input() {
    let err = parse_str("3 4").unwrap_err();
    assert!(matches!(err, ParseError::TrailingInput { ref found } if found.lexeme() == "4"));

    let err = parse_str("(1))").unwrap_err();
    assert!(matches!(err, ParseError::TrailingInput { ref found } if found.kind == TokenKind::RParen));
}

#[test]
fn test_unknown_character_is_reported() {
    let err = parse_str("3 @ 4").unwrap_err();
    let ParseError::UnknownCharacter { token } = &err else {
        panic!("expected unknown character, got {err:?}");
    };
    assert_eq!(token.lexeme(), "@");

    let err = parse_str("1 + $").unwrap_err();
    assert!(matches!(err, ParseError::UnknownCharacter { .. }));
}

#[test]
fn test_integer_out_of_range() {
    let err = parse_str("99999999999999999999").unwrap_err();
    assert!(matches!(err, ParseError::IntegerOutOfRange { .. }));
    assert_eq!(
        err.to_string(),
        "integer literal '99999999999999999999' does not fit in 64 bits"
    );
}

#[test]
fn test_deep_unary_chain_teardown() {
    let input = format!("{}1", "-".repeat(1000));
    let expr = parse_str(&input).unwrap().unwrap();
    assert_eq!(expr.node_count(), 1001);
    assert_eq!(expr.depth(), 1001);
    assert_eq!(expr.evaluate(), Some(1));
    drop(expr);
}

// recursion up to the nesting limit needs more than the default test stack
fn on_big_stack(test: impl FnOnce() + Send + 'static) {
    std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(test)
        .unwrap()
        .join()
        .unwrap();
}

#[test]
fn test_unary_nesting_limit() {
    on_big_stack(|| {
        let err = parse_str(&format!("{}1", "-".repeat(1_000_000))).unwrap_err();
        let ParseError::NestingTooDeep { token } = &err else {
            panic!("expected a nesting error, got {err:?}");
        };
        assert_eq!(token.kind, TokenKind::Minus);
        assert_eq!(token.span.start, MAX_NESTING);
        assert!(err.is_hard());

        let expr = parse_str(&format!("{}1", "-".repeat(MAX_NESTING)))
            .unwrap()
            .unwrap();
        assert_eq!(expr.depth(), MAX_NESTING + 1);
    });
}

#[test]
fn test_parenthesis_nesting_limit() {
    on_big_stack(|| {
        let input = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let err = parse_str(&input).unwrap_err();
        assert!(
            matches!(err, ParseError::NestingTooDeep { ref token } if token.kind == TokenKind::LParen)
        );

        // unary and parenthesis levels share one budget
        let half = MAX_NESTING / 2;
        let input = format!(
            "{}{}1{}",
            "-".repeat(half),
            "(".repeat(half + 1),
            ")".repeat(half + 1)
        );
        assert!(matches!(
            parse_str(&input),
            Err(ParseError::NestingTooDeep { .. })
        ));
    });
}

#[test]
fn test_deep_parentheses() {
    let input = format!("{}5{}", "(".repeat(200), ")".repeat(200));
    assert_eq!(tree(&input), "5");
}

#[test]
fn test_node_release_count() {
    let ty = Type::int(32, true);
    let mut expr = Expr::literal(0, Rc::clone(&ty));
    for i in 1..1000 {
        expr = if i % 2 == 0 {
            Expr::unary(UnOp::Minus, expr, Rc::clone(&ty))
        } else {
            Expr::binary(
                crate::ast::BinOp::Add,
                expr,
                Expr::literal(i, Rc::clone(&ty)),
                Rc::clone(&ty),
            )
        };
    }
    // every node holds one reference to the shared descriptor
    assert_eq!(Rc::strong_count(&ty), 1 + expr.node_count());
    drop(expr);
    assert_eq!(Rc::strong_count(&ty), 1);
}

#[test]
fn test_error_report_mentions_missing_paren() {
    let file = SourceFile::new("test.pc", "(3+4");
    let tokens = TokenStream::lex(Rc::clone(&file));
    let err = Parser::new(&tokens).parse_program().unwrap_err();

    let mut out = Vec::new();
    err.report(&file)
        .write(
            (file.name.clone(), ariadne::Source::from(file.src.clone())),
            &mut out,
        )
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("1:5: maybe you missed ')'?"));
    assert!(text.contains("test.pc"));
}

#[test]
fn test_grammar_terminal() {
    let tokens = lex_str("1 +");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);

    assert!(parser.match_rule(&Rule::terminal(TokenKind::Plus)).unwrap().is_none());
    assert_eq!(parser.position(), 0);

    let matched = parser
        .match_rule(&Rule::terminal(TokenKind::Integer))
        .unwrap()
        .unwrap();
    assert_eq!(matched.tokens, 0..1);
    assert_eq!(parser.position(), 1);
}

#[test]
fn test_grammar_sequence_rolls_back() {
    let tokens = lex_str("( 3 +");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);
    let rule = Rule::sequence(vec![
        Rule::terminal(TokenKind::LParen),
        Rule::terminal(TokenKind::Integer),
        Rule::terminal(TokenKind::RParen),
    ]);

    assert!(parser.match_rule(&rule).unwrap().is_none());
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_grammar_choice_rolls_back_between_attempts() {
    let tokens = lex_str("1 * 2");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);
    let rule = Rule::choice(vec![
        Rule::sequence(vec![
            Rule::terminal(TokenKind::Integer),
            Rule::terminal(TokenKind::Plus),
        ]),
        Rule::sequence(vec![
            Rule::terminal(TokenKind::Integer),
            Rule::terminal(TokenKind::Star),
        ]),
    ]);

    let matched = parser.match_rule(&rule).unwrap().unwrap();
    assert_eq!(matched.tokens, 0..2);
    assert_eq!(parser.position(), 2);
}

#[test]
fn test_grammar_choice_failure_leaves_cursor() {
    let tokens = lex_str("1 2");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);
    parser.reset(1);
    let result = parser.match_rule(&rules::operator()).unwrap();
    assert!(result.is_none());
    assert_eq!(parser.position(), 1);
}

#[test]
fn test_grammar_optional_never_fails() {
    let tokens = lex_str("+ 1");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);

    let matched = parser
        .match_rule(&Rule::optional(Rule::sequence(vec![
            Rule::terminal(TokenKind::Plus),
            Rule::terminal(TokenKind::Plus),
        ])))
        .unwrap()
        .unwrap();
    assert!(matched.is_empty());
    assert_eq!(parser.position(), 0);

    let matched = parser
        .match_rule(&Rule::optional(Rule::terminal(TokenKind::Plus)))
        .unwrap()
        .unwrap();
    assert_eq!(matched.tokens, 0..1);
}

#[test]
fn test_grammar_custom_delegates_to_expression_parser() {
    let tokens = lex_str("3+4*2 )");
    let mut parser = Parser::new(&tokens);
    let mut matched = parser.match_rule(&rules::expression()).unwrap().unwrap();

    assert_eq!(matched.tokens, 0..5);
    assert_eq!(matched.nodes.len(), 1);
    let node = matched.nodes.pop().unwrap();
    assert_eq!(node.to_string(), "(+ 3 (* 4 2))");
}

#[test]
fn test_grammar_custom_soft_failure_is_no_match() {
    let tokens = lex_str(")");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);
    assert!(parser.match_rule(&rules::expression()).unwrap().is_none());
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_grammar_custom_hard_failure_propagates() {
    let tokens = lex_str("1 + (2");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);
    let rule = Rule::sequence(vec![
        Rule::terminal(TokenKind::Integer),
        Rule::terminal(TokenKind::Plus),
        rules::expression(),
    ]);

    let err = parser.match_rule(&rule).unwrap_err();
    assert!(matches!(err, ParseError::UnclosedParen { .. }));
    assert_eq!(parser.position(), 0);
}

#[test]
fn test_grammar_group_collects_node() {
    let tokens = lex_str("(1 - 2 - 3)");
    let mut parser = Parser::new(&tokens);
    let matched = parser.match_rule(&rules::group()).unwrap().unwrap();
    assert_eq!(matched.tokens, 0..7);
    assert_eq!(matched.nodes.len(), 1);
    assert_eq!(matched.nodes[0].to_string(), "(- (- 1 2) 3)");
}

#[test]
fn test_grammar_presets() {
    let tokens = lex_str("7 / 7");
    let mut parser: Parser<'_, 'static> = Parser::new(&tokens);
    let rule = Rule::sequence(vec![rules::arg(), rules::operator(), rules::term()]);
    let matched = parser.match_rule(&rule).unwrap().unwrap();
    assert_eq!(matched.tokens, 0..3);
    assert!(matched.nodes.is_empty());
    assert_eq!(parser.peek().unwrap().kind, TokenKind::Eof);
}

/// Reference evaluation of a flat chain with the usual two-level precedence.
fn reference_eval(operands: &[i64], ops: &[TokenKind]) -> Option<i64> {
    fn apply(lhs: i64, op: TokenKind, rhs: i64) -> Option<i64> {
        match op {
            TokenKind::Plus => lhs.checked_add(rhs),
            TokenKind::Minus => lhs.checked_sub(rhs),
            TokenKind::Star => lhs.checked_mul(rhs),
            TokenKind::Slash => lhs.checked_div(rhs),
            _ => None,
        }
    }

    // fold the multiplicative runs first, then the additive chain left to right
    let mut terms = vec![operands[0]];
    let mut additive = vec![];
    for (op, &value) in ops.iter().zip(&operands[1..]) {
        if op.precedence() == Some(2) {
            let last = terms.pop()?;
            terms.push(apply(last, *op, value)?);
        } else {
            additive.push(*op);
            terms.push(value);
        }
    }

    let mut acc = terms[0];
    for (op, &value) in additive.iter().zip(&terms[1..]) {
        acc = apply(acc, *op, value)?;
    }
    Some(acc)
}

fn chain() -> impl Strategy<Value = (Vec<i64>, Vec<TokenKind>)> {
    (1usize..7).prop_flat_map(|len| {
        let op = prop::sample::select(vec![
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Star,
            TokenKind::Slash,
        ]);
        (
            prop::collection::vec(1i64..50, len + 1),
            prop::collection::vec(op, len),
        )
    })
}

proptest! {
    #[test]
    fn test_precedence_matches_reference((operands, ops) in chain()) {
        let mut source = operands[0].to_string();
        for (op, value) in ops.iter().zip(&operands[1..]) {
            let symbol = match op {
                TokenKind::Plus => "+",
                TokenKind::Minus => "-",
                TokenKind::Star => "*",
                _ => "/",
            };
            source.push_str(&format!(" {symbol} {value}"));
        }

        let expr = parse_str(&source).unwrap().unwrap();
        prop_assert_eq!(expr.evaluate(), reference_eval(&operands, &ops));
        prop_assert_eq!(expr.node_count(), operands.len() * 2 - 1);
    }
}
