//! Template Binder - Data-bound HTML templates with `{{ }}` expression tags
//!
//! This library scans templates for `{{expr}}` (HTML-escaped) and
//! `{{{expr}}}` (raw) tags, evaluates each expression against caller data and
//! an injected socket snapshot, and substitutes the results in place. A tag
//! that fails to evaluate is left in the output as written.
//!
//! # Example
//!
//! ```rust
//! use template_binder::{render, Value};
//!
//! let data = Value::object([("user", Value::object([("name", Value::from("ada"))]))]);
//! let html = render("<b>{{capitalize(user.name)}}</b> {{missing}}", Some(&data), None, false);
//! assert_eq!(html, "<b>Ada</b> {{missing}}");
//! ```

pub mod builtins;
pub mod context;
pub mod error;
pub mod escape;
pub mod eval;
pub mod id;
pub mod parser;
pub mod renderer;
pub mod scanner;

pub use context::{AuthState, ConnectionState, RenderContext, SocketState};
pub use error::{ConfigError, EvalError, ParseError, RenderError, TagError};
pub use escape::{escape_html, safe_record, safe_records, unescape_entities};
pub use eval::{Function, Object, Value};
pub use id::compute_id;
pub use parser::parse;
pub use renderer::{CollectionTemplates, RenderOptions, RenderedTag, Renderer, TagOutcome};
pub use scanner::{scan_expressions, TagScanner, TagSpan};

/// Render a template with optional data and socket snapshot
///
/// Never fails: tags that cannot be evaluated, and function values while
/// `auto_exec_function` is off, are kept verbatim.
///
/// # Example
///
/// ```rust
/// use template_binder::{render, SocketState, Value};
///
/// let socket = SocketState::default();
/// let html = render("{{upperCase(socket.authState)}}", None, Some(&socket), false);
/// assert_eq!(html, "UNAUTHENTICATED");
/// ```
pub fn render(
    template: &str,
    data: Option<&Value>,
    socket: Option<&SocketState>,
    auto_exec_function: bool,
) -> String {
    let mut ctx = RenderContext::new();
    if let Some(data) = data {
        ctx = ctx.with_data(data.clone());
    }
    if let Some(socket) = socket {
        ctx = ctx.with_socket(socket.clone());
    }
    let options = RenderOptions::new().with_auto_exec_function(auto_exec_function);
    Renderer::with_options(options).render(template, &ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_without_data() {
        assert_eq!(render("no tags here", None, None, false), "no tags here");
        assert_eq!(render("{{1 + 1}}", None, None, false), "2");
    }

    #[test]
    fn test_render_with_data() {
        let data = Value::object([("a", Value::from(1.0)), ("b", Value::from(2.0))]);
        assert_eq!(render("{{a}} and {{b}}", Some(&data), None, false), "1 and 2");
    }

    #[test]
    fn test_render_auto_exec_flag() {
        let data = Value::object([("f", Value::function(|_| Ok(Value::from("ran"))))]);
        assert_eq!(render("{{f}}", Some(&data), None, false), "{{f}}");
        assert_eq!(render("{{f}}", Some(&data), None, true), "ran");
    }

    #[test]
    fn test_render_socket_snapshot() {
        let socket = SocketState {
            connect_attempts: 3,
            ..SocketState::default()
        };
        assert_eq!(
            render("{{socket.connectAttempts}}", None, Some(&socket), false),
            "3"
        );
        assert_eq!(
            render("{{socket.state}}", None, None, false),
            "{{socket.state}}"
        );
    }

    #[test]
    fn test_data_shadows_builtins() {
        let data = Value::object([("trim", Value::from("mine"))]);
        assert_eq!(render("{{trim}}", Some(&data), None, false), "mine");
    }
}
