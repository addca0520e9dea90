//! Tag evaluation and substitution
//!
//! Every tag is evaluated on its own: a failing tag never affects the
//! others. `render` keeps failing and deferred tags as literal text, while
//! `try_render` reports the failures.

use crate::context::RenderContext;
use crate::error::{EvalError, RenderError, TagError};
use crate::escape::{escape_html, unescape_entities};
use crate::eval::{Env, Evaluator, Value};
use crate::parser::parse;
use crate::renderer::config::RenderOptions;
use crate::scanner::{scan_expressions, TagSpan};

/// What happened to a single tag
#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    /// Replacement text, already escaped for `{{ }}` tags
    Substituted(String),
    /// The value is a function and auto-exec is off; the tag stays as is
    Deferred,
    /// Evaluation failed; the tag stays as is
    Failed(EvalError),
}

/// A tag together with its outcome
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTag<'a> {
    pub span: TagSpan<'a>,
    pub outcome: TagOutcome,
}

impl RenderedTag<'_> {
    /// Locate a failure in template coordinates
    fn to_error(&self, error: &EvalError, unescaped: bool) -> TagError {
        // Spans point into the decoded expression; they only line up with
        // the template when decoding changed nothing
        let location = match error.span() {
            Some(span) if !unescaped => {
                let base = self.span.expression_start();
                base + span.start..base + span.end.max(span.start + 1)
            }
            _ => self.span.range(),
        };
        TagError {
            raw: self.span.raw.to_string(),
            tag: self.span.range(),
            location: clamp(location, self.span.end()),
            error: error.clone(),
        }
    }
}

fn clamp(span: std::ops::Range<usize>, max: usize) -> std::ops::Range<usize> {
    span.start.min(max)..span.end.min(max)
}

/// Renders templates against a [`RenderContext`]
///
/// # Example
///
/// ```rust
/// use template_binder::{RenderContext, Renderer, Value};
///
/// let ctx = RenderContext::new().with("v", "<b>");
/// let renderer = Renderer::new();
///
/// assert_eq!(renderer.render("{{v}}", &ctx), "&lt;b&gt;");
/// assert_eq!(renderer.render("{{{v}}}", &ctx), "<b>");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Substitute every tag that evaluates; others are kept verbatim
    pub fn render(&self, template: &str, ctx: &RenderContext) -> String {
        let tags = self.render_tags(template, ctx);
        splice(template, &tags)
    }

    /// Like [`Renderer::render`], but fail if any tag fails
    ///
    /// Deferred function values are not failures.
    pub fn try_render(&self, template: &str, ctx: &RenderContext) -> Result<String, RenderError> {
        let tags = self.render_tags(template, ctx);
        let errors: Vec<TagError> = tags
            .iter()
            .filter_map(|tag| match &tag.outcome {
                TagOutcome::Failed(error) => {
                    let unescaped = self.options.unescape_expressions
                        && unescape_entities(tag.span.expression()) != tag.span.expression();
                    Some(tag.to_error(error, unescaped))
                }
                _ => None,
            })
            .collect();
        if errors.is_empty() {
            Ok(splice(template, &tags))
        } else {
            Err(RenderError::Tags(errors))
        }
    }

    /// Evaluate every tag of `template` in document order
    pub fn render_tags<'a>(&self, template: &'a str, ctx: &RenderContext) -> Vec<RenderedTag<'a>> {
        let env = ctx.env();
        scan_expressions(template)
            .map(|span| {
                let outcome = self.render_tag(&span, &env);
                match &outcome {
                    TagOutcome::Failed(error) => {
                        tracing::debug!(tag = span.raw, start = span.start, %error, "leaving tag unresolved")
                    }
                    TagOutcome::Deferred => {
                        tracing::trace!(tag = span.raw, start = span.start, "deferring function tag")
                    }
                    TagOutcome::Substituted(_) => {}
                }
                RenderedTag { span, outcome }
            })
            .collect()
    }

    fn render_tag(&self, span: &TagSpan<'_>, env: &Env) -> TagOutcome {
        match self.evaluate(span.expression(), env) {
            Ok(Some(value)) => {
                let text = value.to_output_string();
                TagOutcome::Substituted(if span.triple { text } else { escape_html(&text) })
            }
            Ok(None) => TagOutcome::Deferred,
            Err(error) => TagOutcome::Failed(error),
        }
    }

    /// Evaluate one tag body; `None` for a function value left for later
    fn evaluate(&self, expression: &str, env: &Env) -> Result<Option<Value>, EvalError> {
        let source = if self.options.unescape_expressions {
            unescape_entities(expression)
        } else {
            expression.to_string()
        };
        let expr = parse(&source)?;
        let mut evaluator = Evaluator::new(self.options.max_call_depth);
        match evaluator.eval(&expr, env)? {
            Value::Function(f) if self.options.auto_exec_function => {
                evaluator.call_function(&f, &[], &expr.span).map(Some)
            }
            Value::Function(_) => Ok(None),
            value => Ok(Some(value)),
        }
    }
}

/// Replace substituted tags back to front so earlier offsets stay valid
fn splice(template: &str, tags: &[RenderedTag<'_>]) -> String {
    let mut out = template.to_string();
    for tag in tags.iter().rev() {
        if let TagOutcome::Substituted(text) = &tag.outcome {
            out.replace_range(tag.span.range(), text);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext::new()
            .with("a", 1.0)
            .with("b", 2.0)
            .with("v", "<b>")
            .with("greet", Value::function(|_| Ok(Value::from("hi"))))
    }

    #[test]
    fn test_render_in_place() {
        let renderer = Renderer::new();
        assert_eq!(renderer.render("{{a}} and {{b}}", &ctx()), "1 and 2");
        assert_eq!(renderer.render("{{v}}|{{{v}}}", &ctx()), "&lt;b&gt;|<b>");
    }

    #[test]
    fn test_failed_tag_kept_verbatim() {
        let renderer = Renderer::new();
        assert_eq!(
            renderer.render("{{ +++ }} {{a}} {{nobody}}", &ctx()),
            "{{ +++ }} 1 {{nobody}}"
        );
    }

    #[test]
    fn test_function_value_deferred_without_auto_exec() {
        let renderer = Renderer::new();
        assert_eq!(renderer.render("{{greet}}", &ctx()), "{{greet}}");
        let tags = renderer.render_tags("{{greet}}", &ctx());
        assert_eq!(tags[0].outcome, TagOutcome::Deferred);
    }

    #[test]
    fn test_function_value_called_with_auto_exec() {
        let renderer =
            Renderer::with_options(RenderOptions::new().with_auto_exec_function(true));
        assert_eq!(renderer.render("{{greet}}", &ctx()), "hi");
        assert_eq!(renderer.render("{{{() => v}}}", &ctx()), "<b>");
    }

    #[test]
    fn test_entities_in_expression_are_decoded() {
        let renderer = Renderer::new();
        assert_eq!(renderer.render("{{a &lt; b &amp;&amp; b &gt; a}}", &ctx()), "true");

        let literal = Renderer::with_options(RenderOptions::new().with_unescape_expressions(false));
        assert_eq!(
            literal.render("{{a &lt; b}}", &ctx()),
            "{{a &lt; b}}"
        );
    }

    #[test]
    fn test_nullish_renders_empty() {
        let ctx = ctx().with("nothing", Value::Null);
        assert_eq!(Renderer::new().render("[{{nothing}}][{{undefined}}]", &ctx), "[][]");
    }

    #[test]
    fn test_escaped_output_cannot_form_tags() {
        let ctx = ctx().with("t", "{{a}}");
        let once = Renderer::new().render("{{t}}", &ctx);
        assert_eq!(once, "&#123;&#123;a&#125;&#125;");
        assert_eq!(Renderer::new().render(&once, &ctx), once);
    }

    #[test]
    fn test_try_render_reports_failures() {
        let err = Renderer::new()
            .try_render("ok {{a}} {{nobody}}", &ctx())
            .unwrap_err();
        let errors = err.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].raw, "{{nobody}}");
        assert_eq!(errors[0].tag, 9..19);
        assert_eq!(errors[0].location, 11..17);
    }

    #[test]
    fn test_try_render_ignores_deferred() {
        assert_eq!(
            Renderer::new().try_render("{{greet}} {{a}}", &ctx()),
            Ok("{{greet}} 1".to_string())
        );
    }

    #[test]
    fn test_call_depth_option() {
        let renderer = Renderer::with_options(RenderOptions::new().with_max_call_depth(1));
        assert_eq!(renderer.render("{{upperCase('x')}}", &ctx()), "X");
        assert_eq!(
            renderer.render("{{(x => upperCase(x))('x')}}", &ctx()),
            "{{(x => upperCase(x))('x')}}"
        );
    }
}
