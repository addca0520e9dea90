//! Lexer for tag expressions using logos

use logos::Logos;

use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Keywords
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("undefined")]
    Undefined,
    #[token("typeof")]
    Typeof,

    // Comparison operators (longer patterns first)
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNotEq,
    #[token("==")]
    LooseEq,
    #[token("!=")]
    LooseNotEq,
    #[token("<=")]
    LessOrEqual,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,

    // Logical operators
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("??")]
    Coalesce,
    #[token("!")]
    Bang,

    // Arrow function
    #[token("=>")]
    FatArrow,

    // Arithmetic
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Optional chaining must win over the ternary question mark
    #[token("?.")]
    QuestionDot,
    #[token("?")]
    Question,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(String),

    #[regex(r"([0-9]+(\.[0-9]*)?|\.[0-9]+)([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
}

/// Strip the surrounding quotes and resolve backslash escapes
fn unquote(slice: &str) -> Option<String> {
    let inner = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            // \\ \' \" and any other escaped character stand for themselves
            other => out.push(other),
        }
    }
    Some(out)
}

/// Lex input string into tokens with spans
///
/// Unlike a plain token stream, an unrecognised character is reported
/// immediately: a tag like `{{ a @ b }}` must fail rather than evaluate `a b`.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(t) => Ok((t, span)),
            Err(()) => Err(ParseError::Syntax {
                message: format!("Unexpected character '{}'", &input[span.clone()]),
                span,
                expected: Vec::new(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokens("true false null undefined typeof"),
            vec![
                Token::True,
                Token::False,
                Token::Null,
                Token::Undefined,
                Token::Typeof
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            tokens("=== !== == != <= >= < >"),
            vec![
                Token::StrictEq,
                Token::StrictNotEq,
                Token::LooseEq,
                Token::LooseNotEq,
                Token::LessOrEqual,
                Token::GreaterOrEqual,
                Token::Less,
                Token::Greater,
            ]
        );
    }

    #[test]
    fn test_logical_and_optional() {
        assert_eq!(
            tokens("a?.b ?? c ? d : !e"),
            vec![
                Token::Ident("a".to_string()),
                Token::QuestionDot,
                Token::Ident("b".to_string()),
                Token::Coalesce,
                Token::Ident("c".to_string()),
                Token::Question,
                Token::Ident("d".to_string()),
                Token::Colon,
                Token::Bang,
                Token::Ident("e".to_string()),
            ]
        );
    }

    #[test]
    fn test_identifiers_with_dollar() {
        assert_eq!(
            tokens("$Product user_name"),
            vec![
                Token::Ident("$Product".to_string()),
                Token::Ident("user_name".to_string())
            ]
        );
    }

    #[test]
    fn test_strings_both_quotes() {
        assert_eq!(
            tokens(r#"'single' "double""#),
            vec![
                Token::Str("single".to_string()),
                Token::Str("double".to_string())
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "a\nb" '\u0041'"#),
            vec![
                Token::Str("it's".to_string()),
                Token::Str("a\nb".to_string()),
                Token::Str("A".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("42 3.14 .5 1e3 -10"),
            vec![
                Token::Number(42.0),
                Token::Number(3.14),
                Token::Number(0.5),
                Token::Number(1000.0),
                Token::Minus,
                Token::Number(10.0)
            ]
        );
    }

    #[test]
    fn test_arrow_function() {
        assert_eq!(
            tokens("(a, b) => a"),
            vec![
                Token::ParenOpen,
                Token::Ident("a".to_string()),
                Token::Comma,
                Token::Ident("b".to_string()),
                Token::ParenClose,
                Token::FatArrow,
                Token::Ident("a".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(
            tokens("nullable truth"),
            vec![
                Token::Ident("nullable".to_string()),
                Token::Ident("truth".to_string())
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_error() {
        let err = lex("a @ b").unwrap_err();
        match err {
            ParseError::Syntax { span, .. } => assert_eq!(span, 2..3),
        }
    }

    #[test]
    fn test_assignment_is_rejected() {
        assert!(lex("a = 1").is_err());
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(lex("'abc").is_err());
    }
}
