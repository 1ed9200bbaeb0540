//! Session lifecycle: create, list, inspect, destroy.

use axum::http::Method;
use log::{info, warn};
use serde_json::json;

use crate::error::{WireError, WireResult};
use crate::protocol::WireRequest;
use crate::router::{HandlerOutput, Router};

use super::AppContext;

pub fn register(router: &mut Router) {
    router.register(Method::POST, "/session", post_session);
    router.register(Method::GET, "/sessions", get_sessions);
    router.register(Method::GET, "/session/:sessionId", get_session);
    router.register(Method::DELETE, "/session/:sessionId", delete_session);
}

/// `POST /session` with `{desiredCapabilities, requiredCapabilities?}`.
/// Capability negotiation is the engine's job; this handler enforces the
/// single-active-session constraint and owns the registry slot.
fn post_session(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    if let Some(existing) = ctx.sessions.active() {
        return Err(WireError::SessionNotCreated(format!(
            "session {} is still active; one session per process",
            existing.id()
        )));
    }

    let body = req.body_json()?;
    let desired = body
        .get("desiredCapabilities")
        .ok_or_else(|| WireError::InvalidArgument("missing desiredCapabilities".into()))?;

    let capabilities = ctx.engine.start_session(desired)?;
    let current_window = ctx.engine.current_window()?;
    let session = ctx.sessions.create(capabilities.clone(), current_window)?;

    info!("session {} created", session.id());
    Ok(HandlerOutput::with_session(session.id(), capabilities))
}

/// `GET /sessions`: zero or one entries.
fn get_sessions(ctx: &AppContext, _req: &WireRequest) -> WireResult<HandlerOutput> {
    let sessions = match ctx.sessions.active() {
        Some(session) => json!([{
            "id": session.id(),
            "capabilities": session.capabilities(),
        }]),
        None => json!([]),
    };
    Ok(HandlerOutput::new(sessions))
}

/// `GET /session/:sessionId`: the negotiated capabilities.
fn get_session(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    Ok(HandlerOutput::new(session.capabilities().clone()))
}

/// `DELETE /session/:sessionId`. Deleting an id that is already gone is an
/// ordinary `NoSuchSession`, not a crash.
fn delete_session(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session_id = req.param("sessionId")?;
    let session = ctx
        .sessions
        .remove(session_id)
        .ok_or_else(|| WireError::NoSuchSession(session_id.to_string()))?;

    session.with_input(|input| input.reset());
    if let Err(e) = ctx.engine.end_session() {
        warn!("engine cleanup after session {} failed: {e}", session.id());
    }
    info!("session {} destroyed", session.id());
    Ok(HandlerOutput::new(json!(null)))
}
