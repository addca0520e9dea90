//! Render context: caller data plus the injected socket snapshot
//!
//! The context is built by the caller right before a render and passed by
//! reference; nothing here is global. Expressions see the data keys as
//! variables, the snapshot under the reserved name `socket`, and the built-in
//! formatters for any name the data does not bind.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::eval::{Env, Object, Value};

/// Name under which the socket snapshot is bound
pub const SOCKET_KEY: &str = "socket";

/// Connection state of the realtime socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Open,
    #[default]
    Closed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        }
    }
}

/// Authentication state of the realtime socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    Authenticated,
    #[default]
    Unauthenticated,
}

impl AuthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthState::Authenticated => "authenticated",
            AuthState::Unauthenticated => "unauthenticated",
        }
    }
}

/// Read-only snapshot of the socket, as seen by templates
///
/// Field names follow the camelCase spelling templates use
/// (`socket.authState`, `socket.connectAttempts`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocketState {
    pub state: ConnectionState,
    pub auth_state: AuthState,
    /// Decoded auth token claims, if signed in
    pub auth_token: Option<serde_json::Value>,
    pub pending_reconnect: bool,
    pub connect_attempts: u32,
}

impl SocketState {
    /// Load a snapshot from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a snapshot from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load a snapshot from a file; `.json` files are read as JSON,
    /// anything else as TOML
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        if has_json_extension(path) {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state == AuthState::Authenticated
    }

    /// The snapshot as a template value
    pub fn to_value(&self) -> Value {
        Value::object([
            ("state", Value::from(self.state.as_str())),
            ("authState", Value::from(self.auth_state.as_str())),
            (
                "authToken",
                self.auth_token.clone().map_or(Value::Null, Value::from),
            ),
            ("pendingReconnect", Value::from(self.pending_reconnect)),
            ("connectAttempts", Value::from(self.connect_attempts)),
        ])
    }
}

/// Whether `path` names a `.json` file
pub fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Variables visible to the expressions of one render
///
/// # Example
///
/// ```rust
/// use template_binder::{RenderContext, Renderer, SocketState, Value};
///
/// let ctx = RenderContext::new()
///     .with("user", Value::object([("name", Value::from("Ada"))]))
///     .with_socket(SocketState::default());
///
/// let html = Renderer::new().render("{{user.name}} is {{socket.state}}", &ctx);
/// assert_eq!(html, "Ada is closed");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    data: Object,
    socket: Option<SocketState>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context over the entries of a data object
    ///
    /// Values other than objects carry no names and give an empty context.
    pub fn from_value(data: Value) -> Self {
        Self::new().with_data(data)
    }

    /// Context over any serialisable data, e.g. a `#[derive(Serialize)]` struct
    pub fn from_serialize<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Value::from_serialize(data).map(Self::from_value)
    }

    /// Merge the entries of a data object; later entries win
    pub fn with_data(mut self, data: Value) -> Self {
        match data {
            Value::Object(entries) => self.data.extend(entries),
            Value::Undefined | Value::Null => {}
            other => tracing::warn!(
                kind = other.type_of(),
                "ignoring render data that is not an object"
            ),
        }
        self
    }

    /// Bind a single variable
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Inject the socket snapshot
    pub fn with_socket(mut self, socket: SocketState) -> Self {
        self.socket = Some(socket);
        self
    }

    /// Bind a single variable, returning the value it replaced
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(name.into(), value.into())
    }

    pub fn data(&self) -> &Object {
        &self.data
    }

    pub fn socket(&self) -> Option<&SocketState> {
        self.socket.as_ref()
    }

    /// Root scope for evaluating tags
    ///
    /// `socket` is bound after the data so a data key of the same name can
    /// never replace the snapshot; it is `undefined` when no snapshot was
    /// injected.
    pub(crate) fn env(&self) -> Env {
        let mut vars = self.data.clone();
        vars.insert(
            SOCKET_KEY.to_string(),
            self.socket
                .as_ref()
                .map_or(Value::Undefined, SocketState::to_value),
        );
        Env::new(vars)
    }
}

impl From<Object> for RenderContext {
    fn from(data: Object) -> Self {
        Self { data, socket: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_state_from_toml() {
        let socket = SocketState::from_toml_str(
            r#"
            state = "open"
            authState = "authenticated"
            connectAttempts = 2

            [authToken]
            username = "ada"
            "#,
        )
        .unwrap();
        assert_eq!(socket.state, ConnectionState::Open);
        assert!(socket.is_authenticated());
        assert_eq!(socket.connect_attempts, 2);
        assert!(!socket.pending_reconnect);
        assert_eq!(
            socket.auth_token,
            Some(serde_json::json!({ "username": "ada" }))
        );
    }

    #[test]
    fn test_socket_state_from_json() {
        let socket =
            SocketState::from_json_str(r#"{"state": "connecting", "pendingReconnect": true}"#)
                .unwrap();
        assert_eq!(socket.state, ConnectionState::Connecting);
        assert_eq!(socket.auth_state, AuthState::Unauthenticated);
        assert!(socket.pending_reconnect);
    }

    #[test]
    fn test_socket_state_rejects_unknown_state() {
        assert!(SocketState::from_json_str(r#"{"state": "sleeping"}"#).is_err());
    }

    #[test]
    fn test_socket_value_uses_camel_case() {
        let value = SocketState::default().to_value();
        let object = value.as_object().unwrap();
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "state",
                "authState",
                "authToken",
                "pendingReconnect",
                "connectAttempts"
            ]
        );
        assert_eq!(object["authToken"], Value::Null);
    }

    #[test]
    fn test_socket_cannot_be_shadowed_by_data() {
        let ctx = RenderContext::new()
            .with(SOCKET_KEY, "fake")
            .with_socket(SocketState::default());
        let socket = ctx.env().lookup(SOCKET_KEY).unwrap();
        assert!(socket.as_object().is_some());
    }

    #[test]
    fn test_missing_socket_is_undefined() {
        let ctx = RenderContext::new().with(SOCKET_KEY, "fake");
        assert_eq!(ctx.env().lookup(SOCKET_KEY), Some(Value::Undefined));
    }

    #[test]
    fn test_with_data_merges_objects_only() {
        let ctx = RenderContext::new()
            .with_data(Value::object([("a", Value::from(1.0))]))
            .with_data(Value::from("ignored"))
            .with_data(Value::object([("b", Value::from(2.0))]));
        assert_eq!(ctx.data().len(), 2);
    }

    #[test]
    fn test_from_serialize() {
        #[derive(Serialize)]
        struct Page {
            title: String,
        }
        let ctx = RenderContext::from_serialize(&Page {
            title: "Home".to_string(),
        })
        .unwrap();
        assert_eq!(ctx.data()["title"], Value::from("Home"));
    }
}
