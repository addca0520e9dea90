//! Parser implementation using chumsky

use std::sync::Arc;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Postfix operations applied left-to-right after an atom
#[derive(Debug, Clone)]
enum Postfix {
    Member(Spanned<Identifier>, bool),
    Index(Spanned<Expr>, bool),
    Call(Vec<Spanned<Expr>>, bool),
}

/// Parse a tag expression into an AST
pub fn parse(input: &str) -> Result<Spanned<Expr>, Vec<crate::ParseError>> {
    let len = input.len();
    let tokens = crate::parser::lexer::lex(input).map_err(|e| vec![e])?;

    if tokens.is_empty() {
        return Err(vec![crate::ParseError::Syntax {
            span: 0..len,
            message: "Empty expression".to_string(),
            expected: vec!["expression".to_string()],
        }]);
    }
    if tokens.len() > MAX_EXPRESSION_TOKENS {
        return Err(vec![crate::ParseError::Syntax {
            span: 0..len,
            message: format!("Expression is longer than {} tokens", MAX_EXPRESSION_TOKENS),
            expected: Vec::new(),
        }]);
    }
    check_nesting(&tokens)?;

    // Turn the token list into a stream that chumsky can use
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Longest token sequence accepted in one expression
pub const MAX_EXPRESSION_TOKENS: usize = 1024;

/// Deepest nesting of brackets, arrow bodies and ternary branches accepted in
/// one expression
pub const MAX_EXPRESSION_NESTING: usize = 32;

/// Reject expressions whose nesting would recurse too deeply in the parser
///
/// Bracket depth is tracked as it opens and closes; every `=>` and `?` adds a
/// level that is never given back, which over-counts sibling ternaries.
fn check_nesting(tokens: &[(Token, std::ops::Range<usize>)]) -> Result<(), Vec<crate::ParseError>> {
    let mut brackets = 0usize;
    let mut branches = 0usize;
    for (token, span) in tokens {
        match token {
            Token::ParenOpen | Token::BracketOpen | Token::BraceOpen => brackets += 1,
            Token::ParenClose | Token::BracketClose | Token::BraceClose => {
                brackets = brackets.saturating_sub(1)
            }
            Token::FatArrow | Token::Question => branches += 1,
            _ => continue,
        }
        if brackets + branches > MAX_EXPRESSION_NESTING {
            return Err(vec![crate::ParseError::Syntax {
                span: span.clone(),
                message: format!(
                    "Expression is nested deeper than {} levels",
                    MAX_EXPRESSION_NESTING
                ),
                expected: Vec::new(),
            }]);
        }
    }
    Ok(())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn fold_binary(left: Spanned<Expr>, (op, right): (BinaryOp, Spanned<Expr>)) -> Spanned<Expr> {
    let span = left.span.start..right.span.end;
    Spanned::new(
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        span,
    )
}

fn fold_postfix(
    target: Spanned<Expr>,
    (op, op_span): (Postfix, std::ops::Range<usize>),
) -> Spanned<Expr> {
    let span = target.span.start..op_span.end;
    let object = Box::new(target);
    let node = match op {
        Postfix::Member(property, optional) => Expr::Member {
            object,
            property,
            optional,
        },
        Postfix::Index(index, optional) => Expr::Index {
            object,
            index: Box::new(index),
            optional,
        },
        Postfix::Call(args, optional) => Expr::Call {
            callee: object,
            args,
            optional,
        },
    };
    Spanned::new(node, span)
}

fn expression_parser<'a, I>(
) -> impl Parser<'a, I, Spanned<Expr>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let identifier = select! {
            Token::Ident(s) => Identifier::new(s),
        }
        .labelled("identifier");

        // Keywords are valid property names after a dot (`row.null` is odd but legal)
        let property_name = select! {
            Token::Ident(s) => Identifier::new(s),
            Token::True => Identifier::new("true"),
            Token::False => Identifier::new("false"),
            Token::Null => Identifier::new("null"),
            Token::Undefined => Identifier::new("undefined"),
            Token::Typeof => Identifier::new("typeof"),
        }
        .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

        let literal = select! {
            Token::Number(n) => Literal::Number(n),
            Token::Str(s) => Literal::String(s),
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Null => Literal::Null,
            Token::Undefined => Literal::Undefined,
        }
        .map(Expr::Literal);

        let items = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let array = items
            .clone()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::Array);

        // Object literal keys: identifiers, keywords, strings or numbers
        let object_key = choice((
            property_name.clone().map(|id| id.node.0),
            select! {
                Token::Str(s) => s,
                Token::Number(n) => crate::eval::value::format_number(n),
            },
        ));

        let object_entry = choice((
            object_key
                .then_ignore(just(Token::Colon))
                .then(expr.clone()),
            // Shorthand `{ name }` binds the variable of the same name
            identifier.clone().map_with(|id, e| {
                let span = span_range(&e.span());
                (id.0.clone(), Spanned::new(Expr::Identifier(id), span))
            }),
        ));

        let object = object_entry
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expr::Object);

        // Arrow functions: `x => body` or `(a, b) => body`
        let arrow_params = choice((
            identifier.clone().map(|id| vec![id]),
            identifier
                .clone()
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        let arrow = arrow_params
            .then_ignore(just(Token::FatArrow))
            .then(expr.clone())
            .map(|(params, body)| Expr::Arrow {
                params,
                body: Arc::new(body),
            });

        // Order matters: arrow functions must be tried before a bare
        // identifier or a parenthesised expression
        let atom = choice((
            arrow,
            literal,
            identifier.clone().map(Expr::Identifier),
            array,
            object,
        ))
        .map_with(|node, e| Spanned::new(node, span_range(&e.span())))
        .or(expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)))
        .labelled("expression");

        let call_args = items
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));
        let index = expr
            .clone()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

        let postfix = choice((
            just(Token::Dot)
                .ignore_then(property_name.clone())
                .map(|p| Postfix::Member(p, false)),
            just(Token::QuestionDot)
                .ignore_then(property_name.clone())
                .map(|p| Postfix::Member(p, true)),
            just(Token::QuestionDot)
                .ignore_then(index.clone())
                .map(|i| Postfix::Index(i, true)),
            just(Token::QuestionDot)
                .ignore_then(call_args.clone())
                .map(|a| Postfix::Call(a, true)),
            index.map(|i| Postfix::Index(i, false)),
            call_args.map(|a| Postfix::Call(a, false)),
        ))
        .map_with(|op, e| (op, span_range(&e.span())));

        let call = atom.foldl(postfix.repeated(), fold_postfix).boxed();

        let unary_op = choice((
            just(Token::Bang).to(UnaryOp::Not),
            just(Token::Minus).to(UnaryOp::Neg),
            just(Token::Plus).to(UnaryOp::Plus),
            just(Token::Typeof).to(UnaryOp::Typeof),
        ))
        .map_with(|op, e| (op, span_range(&e.span())));

        let unary = unary_op
            .repeated()
            .foldr(call, |(op, op_span), operand| {
                let span = op_span.start..operand.span.end;
                Spanned::new(
                    Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                )
            })
            .boxed();

        let product = unary
            .clone()
            .foldl(
                choice((
                    just(Token::Star).to(BinaryOp::Mul),
                    just(Token::Slash).to(BinaryOp::Div),
                    just(Token::Percent).to(BinaryOp::Rem),
                ))
                .then(unary)
                .repeated(),
                fold_binary,
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                choice((
                    just(Token::Plus).to(BinaryOp::Add),
                    just(Token::Minus).to(BinaryOp::Sub),
                ))
                .then(product)
                .repeated(),
                fold_binary,
            )
            .boxed();

        let relational = sum
            .clone()
            .foldl(
                choice((
                    just(Token::LessOrEqual).to(BinaryOp::LessOrEqual),
                    just(Token::GreaterOrEqual).to(BinaryOp::GreaterOrEqual),
                    just(Token::Less).to(BinaryOp::Less),
                    just(Token::Greater).to(BinaryOp::Greater),
                ))
                .then(sum)
                .repeated(),
                fold_binary,
            )
            .boxed();

        let equality = relational
            .clone()
            .foldl(
                choice((
                    just(Token::StrictEq).to(BinaryOp::StrictEq),
                    just(Token::StrictNotEq).to(BinaryOp::StrictNotEq),
                    just(Token::LooseEq).to(BinaryOp::LooseEq),
                    just(Token::LooseNotEq).to(BinaryOp::LooseNotEq),
                ))
                .then(relational)
                .repeated(),
                fold_binary,
            )
            .boxed();

        let and = equality
            .clone()
            .foldl(
                just(Token::And)
                    .to(BinaryOp::And)
                    .then(equality)
                    .repeated(),
                fold_binary,
            )
            .boxed();

        let or = and
            .clone()
            .foldl(
                just(Token::Or).to(BinaryOp::Or).then(and).repeated(),
                fold_binary,
            )
            .boxed();

        let coalesce = or
            .clone()
            .foldl(
                just(Token::Coalesce)
                    .to(BinaryOp::Coalesce)
                    .then(or)
                    .repeated(),
                fold_binary,
            )
            .boxed();

        // Ternary is right-associative through the recursive `expr`
        coalesce
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(test, branches)| match branches {
                Some((consequent, alternate)) => {
                    let span = test.span.start..alternate.span.end;
                    Spanned::new(
                        Expr::Conditional {
                            test: Box::new(test),
                            consequent: Box::new(consequent),
                            alternate: Box::new(alternate),
                        },
                        span,
                    )
                }
                None => test,
            })
            .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Expr {
        parse(input).expect("Should parse").node
    }

    #[test]
    fn test_parse_identifier() {
        assert_eq!(
            parse_ok("user"),
            Expr::Identifier(Identifier::new("user"))
        );
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse_ok("42"), Expr::Literal(Literal::Number(42.0)));
        assert_eq!(
            parse_ok("'hi'"),
            Expr::Literal(Literal::String("hi".to_string()))
        );
        assert_eq!(parse_ok("null"), Expr::Literal(Literal::Null));
        assert_eq!(parse_ok("true"), Expr::Literal(Literal::Bool(true)));
    }

    #[test]
    fn test_parse_member_chain() {
        match parse_ok("user.profile.name") {
            Expr::Member {
                object, property, ..
            } => {
                assert_eq!(property.node.as_str(), "name");
                assert!(matches!(object.node, Expr::Member { .. }));
            }
            other => panic!("Expected member access, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_with_args() {
        match parse_ok("joinFields(item, 'name', ', ')") {
            Expr::Call { callee, args, .. } => {
                assert_eq!(callee.node, Expr::Identifier(Identifier::new("joinFields")));
                assert_eq!(args.len(), 3);
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_method_call() {
        match parse_ok("name.toUpperCase()") {
            Expr::Call { callee, args, .. } => {
                assert!(args.is_empty());
                assert!(matches!(callee.node, Expr::Member { .. }));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence_mul_over_add() {
        match parse_ok("1 + 2 * 3") {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(
                    right.node,
                    Expr::Binary {
                        op: BinaryOp::Mul,
                        ..
                    }
                ));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_subtraction() {
        match parse_ok("10 - 4 - 3") {
            Expr::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Sub);
                assert!(matches!(
                    left.node,
                    Expr::Binary {
                        op: BinaryOp::Sub,
                        ..
                    }
                ));
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_ternary() {
        match parse_ok("a ? 'yes' : 'no'") {
            Expr::Conditional {
                consequent,
                alternate,
                ..
            } => {
                assert_eq!(
                    consequent.node,
                    Expr::Literal(Literal::String("yes".to_string()))
                );
                assert_eq!(
                    alternate.node,
                    Expr::Literal(Literal::String("no".to_string()))
                );
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_ternary() {
        match parse_ok("a ? 1 : b ? 2 : 3") {
            Expr::Conditional { alternate, .. } => {
                assert!(matches!(alternate.node, Expr::Conditional { .. }));
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_array_and_object() {
        assert!(matches!(parse_ok("[1, 2, 3]"), Expr::Array(items) if items.len() == 3));
        match parse_ok("{ a: 1, 'b c': 2, d }") {
            Expr::Object(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["a", "b c", "d"]);
            }
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_arrow_functions() {
        match parse_ok("() => 'later'") {
            Expr::Arrow { params, .. } => assert!(params.is_empty()),
            other => panic!("Expected arrow, got {:?}", other),
        }
        match parse_ok("x => x * 2") {
            Expr::Arrow { params, body } => {
                assert_eq!(params, vec![Identifier::new("x")]);
                assert!(matches!(body.node, Expr::Binary { .. }));
            }
            other => panic!("Expected arrow, got {:?}", other),
        }
        match parse_ok("(a, b) => a + b") {
            Expr::Arrow { params, .. } => assert_eq!(params.len(), 2),
            other => panic!("Expected arrow, got {:?}", other),
        }
    }

    #[test]
    fn test_parenthesised_expression_is_not_arrow() {
        assert!(matches!(
            parse_ok("(1 + 2) * 3"),
            Expr::Binary {
                op: BinaryOp::Mul,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_optional_chaining() {
        match parse_ok("socket?.state") {
            Expr::Member { optional, .. } => assert!(optional),
            other => panic!("Expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_unary_chain() {
        match parse_ok("!!value") {
            Expr::Unary { op, operand } => {
                assert_eq!(op, UnaryOp::Not);
                assert!(matches!(
                    operand.node,
                    Expr::Unary {
                        op: UnaryOp::Not,
                        ..
                    }
                ));
            }
            other => panic!("Expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_spans_cover_source() {
        let expr = parse("a + bc").expect("Should parse");
        assert_eq!(expr.span, 0..6);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("+++").is_err());
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert!(parse("a b").is_err());
        assert!(parse("f(").is_err());
        assert!(parse("a ? b").is_err());
    }

    #[test]
    fn test_long_left_fold_chain_parses() {
        let input = format!("{}1", "1+".repeat(300));
        assert!(parse(&input).is_ok());
    }

    #[test]
    fn test_too_many_tokens_is_rejected() {
        let input = format!("{}1", "1+".repeat(MAX_EXPRESSION_TOKENS));
        let errors = parse(&input).unwrap_err();
        assert!(matches!(
            &errors[0],
            crate::ParseError::Syntax { message, .. } if message.contains("tokens")
        ));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let parens = MAX_EXPRESSION_NESTING + 1;
        let input = format!("{}1{}", "(".repeat(parens), ")".repeat(parens));
        let errors = parse(&input).unwrap_err();
        assert_eq!(errors[0].span(), &(MAX_EXPRESSION_NESTING..MAX_EXPRESSION_NESTING + 1));

        let arrows = "x => ".repeat(MAX_EXPRESSION_NESTING + 1);
        assert!(parse(&format!("{}x", arrows)).is_err());

        let nested = format!("{}1{}", "(".repeat(8), ")".repeat(8));
        assert!(parse(&nested).is_ok());
    }
}
