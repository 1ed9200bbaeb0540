//! JSON Wire Protocol request/response shapes.

use axum::http::Method;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;

use crate::error::{WireError, WireResult};

/// Key under which element references travel on the wire.
pub const ELEMENT_KEY: &str = "ELEMENT";

/// Named path-parameter captures produced by the route matcher.
#[derive(Debug, Default, Clone)]
pub struct PathParams(HashMap<&'static str, String>);

impl PathParams {
    pub fn insert(&mut self, name: &'static str, value: String) {
        self.0.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// One incoming command, already stripped down to what handlers need.
#[derive(Debug)]
pub struct WireRequest {
    pub method: Method,
    pub path: String,
    pub params: PathParams,
    pub body: Vec<u8>,
}

impl WireRequest {
    pub fn new(method: Method, path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method,
            path: path.into(),
            params: PathParams::default(),
            body,
        }
    }

    /// Fetch a named path parameter. Missing captures are a routing bug,
    /// not client error, so they map to the unknown-error kind.
    pub fn param(&self, name: &str) -> WireResult<&str> {
        self.params
            .get(name)
            .ok_or_else(|| WireError::unexpected(format!("missing path parameter :{name}")))
    }

    /// Parse the request body as JSON. Shape problems are the client's:
    /// they surface as `InvalidArgument`.
    pub fn body_json(&self) -> WireResult<Value> {
        if self.body.is_empty() {
            return Err(WireError::InvalidArgument("missing request body".into()));
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| WireError::InvalidArgument(format!("malformed JSON body: {e}")))
    }

    /// Like `body_json`, but an absent body reads as `{}`. Used by commands
    /// whose parameters are all optional.
    pub fn body_json_or_empty(&self) -> WireResult<Value> {
        if self.body.is_empty() {
            return Ok(json!({}));
        }
        self.body_json()
    }
}

/// The `{sessionId, status, value}` envelope every response uses.
#[derive(Debug, Clone, Serialize)]
pub struct WireResponse {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub status: u16,
    pub value: Value,
}

impl WireResponse {
    pub fn success(session_id: Option<String>, value: Value) -> Self {
        Self {
            session_id,
            status: 0,
            value,
        }
    }

    pub fn failure(session_id: Option<String>, err: &WireError) -> Self {
        let mut value = json!({
            "message": err.to_string(),
            "class": err.class(),
        });
        if let Some(trace) = err.stacktrace() {
            value["stacktrace"] = json!(trace);
        }
        Self {
            session_id,
            status: err.status(),
            value,
        }
    }
}

/// Envelope plus the transport status it should ride on.
#[derive(Debug)]
pub struct WireReply {
    pub http_status: u16,
    pub body: WireResponse,
}

impl WireReply {
    pub fn success(session_id: Option<String>, value: Value) -> Self {
        Self {
            http_status: 200,
            body: WireResponse::success(session_id, value),
        }
    }

    pub fn failure(session_id: Option<String>, err: &WireError) -> Self {
        Self {
            http_status: err.http_status(),
            body: WireResponse::failure(session_id, err),
        }
    }
}

/// Wrap an element id in its wire shape.
pub fn element_ref(id: &str) -> Value {
    json!({ ELEMENT_KEY: id })
}

/// Pull an element id out of a wire-shaped reference.
pub fn parse_element_ref(value: &Value) -> Option<&str> {
    value.get(ELEMENT_KEY).and_then(Value::as_str)
}
