//! Ordered route table and request dispatch.
//!
//! Patterns are compiled once at registration into literal/parameter
//! segments and scanned in order per request; the first full match wins.
//! Registration order is therefore significant: a literal pattern must be
//! registered before any parameter pattern that could shadow it at the
//! same depth.

use axum::http::Method;
use log::{debug, error};
use serde_json::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::{WireError, WireResult};
use crate::handlers::AppContext;
use crate::protocol::{PathParams, WireReply, WireRequest};

/// What a handler hands back on success. Most commands leave the session
/// id to the router (it echoes the `:sessionId` capture); session creation
/// sets it explicitly.
#[derive(Debug)]
pub struct HandlerOutput {
    pub session_id: Option<String>,
    pub value: Value,
}

impl HandlerOutput {
    pub fn new(value: Value) -> Self {
        Self {
            session_id: None,
            value,
        }
    }

    pub fn with_session(session_id: impl Into<String>, value: Value) -> Self {
        Self {
            session_id: Some(session_id.into()),
            value,
        }
    }
}

pub type HandlerFn = fn(&AppContext, &WireRequest) -> WireResult<HandlerOutput>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Param(&'static str),
}

/// A URL path pattern compiled into segments.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a pattern like `/session/:sessionId/element/:elementId`.
    /// Parameter segments start with `:`; everything else matches
    /// literally.
    pub fn compile(pattern: &'static str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name),
                None => Segment::Literal(s),
            })
            .collect();
        Self { segments }
    }

    /// Match a concrete path, capturing parameter values. Trailing
    /// slashes are insignificant.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut params = PathParams::default();
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(lit) => {
                    if *lit != part {
                        return None;
                    }
                }
                Segment::Param(name) => params.insert(name, part.to_string()),
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(params)
    }
}

struct Route {
    method: Method,
    pattern: RoutePattern,
    handler: HandlerFn,
}

/// The top-level dispatcher. Also the last line of defense: a handler
/// panic is caught here and answered as an unknown error instead of
/// tearing down the connection.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn register(&mut self, method: Method, pattern: &'static str, handler: HandlerFn) {
        self.routes.push(Route {
            method,
            pattern: RoutePattern::compile(pattern),
            handler,
        });
    }

    pub fn dispatch(&self, ctx: &AppContext, mut req: WireRequest) -> WireReply {
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(&req.path) else {
                continue;
            };
            path_matched = true;
            if route.method != req.method {
                continue;
            }

            req.params = params;
            let session_hint = req.params.get("sessionId").map(str::to_string);
            debug!("{} {}", req.method, req.path);

            return match catch_unwind(AssertUnwindSafe(|| (route.handler)(ctx, &req))) {
                Ok(Ok(output)) => {
                    let session_id = output.session_id.or(session_hint);
                    WireReply::success(session_id, output.value)
                }
                Ok(Err(err)) => {
                    debug!("{} {} failed: {err}", req.method, req.path);
                    WireReply::failure(session_hint, &err)
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!("handler panicked on {} {}: {message}", req.method, req.path);
                    let err = WireError::unexpected(format!("internal handler failure: {message}"));
                    WireReply::failure(session_hint, &err)
                }
            };
        }

        if path_matched {
            let err = WireError::UnsupportedOperation(format!(
                "{} is not supported for {}",
                req.method, req.path
            ));
            WireReply::failure(None, &err)
        } else {
            let err = WireError::UnknownCommand(req.path.clone());
            WireReply::failure(None, &err)
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::NullEngine;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> AppContext {
        AppContext::new(Config::default(), Arc::new(NullEngine))
    }

    fn req(method: Method, path: &str) -> WireRequest {
        WireRequest::new(method, path, Vec::new())
    }

    fn title_handler(_: &AppContext, _: &WireRequest) -> WireResult<HandlerOutput> {
        Ok(HandlerOutput::new(json!("title")))
    }

    fn generic_handler(_: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
        Ok(HandlerOutput::new(json!(req.param("cmd")?)))
    }

    fn panicking_handler(_: &AppContext, _: &WireRequest) -> WireResult<HandlerOutput> {
        panic!("boom");
    }

    #[test]
    fn test_pattern_compile_and_match() {
        let pattern = RoutePattern::compile("/session/:sessionId/element/:elementId/text");
        let params = pattern
            .matches("/session/s-1/element/e-2/text")
            .expect("should match");
        assert_eq!(params.get("sessionId"), Some("s-1"));
        assert_eq!(params.get("elementId"), Some("e-2"));

        assert!(pattern.matches("/session/s-1/element/e-2").is_none());
        assert!(pattern.matches("/session/s-1/element/e-2/text/x").is_none());
        assert!(pattern.matches("/session/s-1/element/e-2/text/").is_some());
    }

    #[test]
    fn test_literal_segment_must_match_exactly() {
        let pattern = RoutePattern::compile("/session/:id/title");
        assert!(pattern.matches("/session/abc/title").is_some());
        assert!(pattern.matches("/session/abc/url").is_none());
        assert!(pattern.matches("/sessions/abc/title").is_none());
    }

    #[test]
    fn test_literal_registered_first_beats_parameter() {
        let mut router = Router::new();
        router.register(Method::GET, "/session/:sessionId/title", title_handler);
        router.register(Method::GET, "/session/:sessionId/:cmd", generic_handler);

        let reply = router.dispatch(&ctx(), req(Method::GET, "/session/s-1/title"));
        assert_eq!(reply.body.status, 0);
        assert_eq!(reply.body.value, json!("title"));

        // The generic route still serves everything else at that depth.
        let reply = router.dispatch(&ctx(), req(Method::GET, "/session/s-1/source"));
        assert_eq!(reply.body.value, json!("source"));
    }

    #[test]
    fn test_unmatched_path_is_unknown_command() {
        let mut router = Router::new();
        router.register(Method::GET, "/status", title_handler);

        let reply = router.dispatch(&ctx(), req(Method::GET, "/nope"));
        assert_eq!(reply.http_status, 404);
        assert_eq!(reply.body.status, 9);
        assert_eq!(reply.body.value["class"], json!("unknown command"));
    }

    #[test]
    fn test_wrong_method_is_unsupported_operation() {
        let mut router = Router::new();
        router.register(Method::GET, "/status", title_handler);

        let reply = router.dispatch(&ctx(), req(Method::DELETE, "/status"));
        assert_eq!(reply.http_status, 405);
        assert_eq!(reply.body.value["class"], json!("unsupported operation"));
    }

    #[test]
    fn test_session_id_echoed_into_envelope() {
        let mut router = Router::new();
        router.register(Method::GET, "/session/:sessionId/title", title_handler);

        let reply = router.dispatch(&ctx(), req(Method::GET, "/session/s-9/title"));
        assert_eq!(reply.body.session_id.as_deref(), Some("s-9"));
    }

    #[test]
    fn test_panic_contained_as_unknown_error() {
        let mut router = Router::new();
        router.register(Method::GET, "/explode", panicking_handler);

        let reply = router.dispatch(&ctx(), req(Method::GET, "/explode"));
        assert_eq!(reply.http_status, 500);
        assert_eq!(reply.body.status, 13);
        assert!(
            reply.body.value["message"]
                .as_str()
                .unwrap()
                .contains("boom")
        );
    }
}
