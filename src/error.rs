//! Error types for parsing and evaluating tag expressions

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                report(
                    source,
                    filename,
                    span.clone(),
                    message,
                    &format!("{}{}", message, expected_str),
                )
            }
        }
    }
}

/// Build a single-label ariadne report and return it as plain text
pub(crate) fn report(
    source: &str,
    filename: &str,
    span: Span,
    message: &str,
    label: &str,
) -> String {
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);
    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{}: {}", filename, message),
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        // Format the message based on the reason
        #[allow(unreachable_patterns)]
        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of expression".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            RichReason::Custom(msg) => msg.to_string(),
            _ => "Invalid expression".to_string(),
        };

        // Format expected tokens nicely
        #[allow(unreachable_patterns)]
        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of expression".to_string()),
                _ => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string '{}'", s),
        Token::Number(n) => format!("number {}", n),
        Token::True => "keyword 'true'".to_string(),
        Token::False => "keyword 'false'".to_string(),
        Token::Null => "keyword 'null'".to_string(),
        Token::Undefined => "keyword 'undefined'".to_string(),
        Token::Typeof => "keyword 'typeof'".to_string(),
        Token::StrictEq => "'==='".to_string(),
        Token::StrictNotEq => "'!=='".to_string(),
        Token::LooseEq => "'=='".to_string(),
        Token::LooseNotEq => "'!='".to_string(),
        Token::LessOrEqual => "'<='".to_string(),
        Token::GreaterOrEqual => "'>='".to_string(),
        Token::Less => "'<'".to_string(),
        Token::Greater => "'>'".to_string(),
        Token::And => "'&&'".to_string(),
        Token::Or => "'||'".to_string(),
        Token::Coalesce => "'??'".to_string(),
        Token::Bang => "'!'".to_string(),
        Token::FatArrow => "'=>'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::QuestionDot => "'?.'".to_string(),
        Token::Question => "'?'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Dot => "'.'".to_string(),
    }
}

/// Errors raised while evaluating an expression against a render context
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The expression text is not a valid expression
    #[error("syntax error: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Identifier not bound in the render context
    #[error("'{name}' is not defined")]
    UndefinedVariable { name: String, span: Span },

    /// Property access on null or undefined
    #[error("cannot read property '{property}' of {target}")]
    NullProperty {
        property: String,
        target: &'static str,
        span: Span,
    },

    /// Call of a value that is not a function
    #[error("{callee} is not a function")]
    NotCallable { callee: String, span: Span },

    /// A built-in formatter or method rejected its arguments
    #[error("{function}: {message}")]
    InvalidArgument { function: String, message: String },

    /// Nested calls exceeded the configured depth
    #[error("maximum call depth of {limit} exceeded")]
    RecursionLimit { limit: usize, span: Span },

    /// Sub-expressions nested deeper than the evaluator allows
    #[error("expression nested deeper than {limit} levels")]
    NestingLimit { limit: usize, span: Span },

    /// Error raised by a caller-supplied native function
    #[error("{0}")]
    Native(String),
}

impl EvalError {
    /// Create an invalid argument error for a named function
    pub fn invalid_argument(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Get the expression-relative source span if available
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Parse(errors) => errors.first().map(|e| e.span().clone()),
            Self::UndefinedVariable { span, .. }
            | Self::NullProperty { span, .. }
            | Self::NotCallable { span, .. }
            | Self::RecursionLimit { span, .. }
            | Self::NestingLimit { span, .. } => Some(span.clone()),
            Self::InvalidArgument { .. } | Self::Native(_) => None,
        }
    }
}

impl From<Vec<ParseError>> for EvalError {
    fn from(errors: Vec<ParseError>) -> Self {
        EvalError::Parse(errors)
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| match e {
            ParseError::Syntax { message, .. } => message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// An evaluation error located in a template
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{raw}: {error}")]
pub struct TagError {
    /// Literal text of the failing tag
    pub raw: String,
    /// Byte range of the whole tag in the template
    pub tag: Span,
    /// Byte range in the template the error points at
    pub location: Span,
    pub error: EvalError,
}

impl TagError {
    /// Format the error with template context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        report(
            source,
            filename,
            self.location.clone(),
            &format!("could not render {}", self.raw),
            &self.error.to_string(),
        )
    }
}

/// Errors reported by strict rendering
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// One or more tags could not be evaluated
    #[error("{} tag(s) failed: {}", .0.len(), format_tag_errors(.0))]
    Tags(Vec<TagError>),
}

impl RenderError {
    pub fn errors(&self) -> &[TagError] {
        match self {
            RenderError::Tags(errors) => errors,
        }
    }

    /// Format every tag error with template context
    pub fn format(&self, source: &str, filename: &str) -> String {
        self.errors()
            .iter()
            .map(|e| e.format(source, filename))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn format_tag_errors(errors: &[TagError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur when loading render options or socket snapshots
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}
