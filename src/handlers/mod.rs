//! Request handlers, grouped by the resource they govern.
//!
//! Validation order is part of the contract: session existence is checked
//! before element existence, which is checked before argument shape, so
//! that the same error surfaces no matter how many things are wrong with a
//! request at once.

pub mod element;
pub mod session;
pub mod session_manager;
pub mod shutdown;
pub mod status;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::engine::BrowserEngine;
use crate::error::{WireError, WireResult};
use crate::protocol::WireRequest;
use crate::router::Router;
use crate::session::{Session, SessionRegistry};

/// Everything a handler needs, constructed once at startup and passed by
/// reference at dispatch time. There are no ambient globals.
pub struct AppContext {
    pub config: Config,
    pub engine: Arc<dyn BrowserEngine>,
    pub sessions: SessionRegistry,
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: Config, engine: Arc<dyn BrowserEngine>) -> Self {
        Self {
            config,
            engine,
            sessions: SessionRegistry::default(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Build the full route table. Literal patterns are registered before the
/// parameter patterns that could shadow them; order matters to the
/// matcher.
pub fn register_all(router: &mut Router) {
    status::register(router);
    session_manager::register(router);
    session::register(router);
    element::register(router);
    shutdown::register(router);
}

/// Resolve the `:sessionId` capture to the live session. Always the first
/// check a per-session handler runs.
pub fn require_session(ctx: &AppContext, req: &WireRequest) -> WireResult<Arc<Session>> {
    ctx.sessions.require(req.param("sessionId")?)
}

/// Enforce the window invariant: the session's current handle must name a
/// live engine window or per-window commands fail.
pub fn require_live_window(ctx: &AppContext, session: &Session) -> WireResult<String> {
    let current = session.current_window();
    let handles = ctx.engine.window_handles()?;
    if handles.iter().any(|h| *h == current) {
        Ok(current)
    } else {
        Err(WireError::NoSuchWindow(current))
    }
}

/// Resolve the `:elementId` capture and verify the node is still attached.
/// Runs after session resolution and before any body parsing.
pub fn require_element(ctx: &AppContext, req: &WireRequest) -> WireResult<String> {
    let element_id = req.param("elementId")?;
    ctx.engine.check_element(element_id)?;
    Ok(element_id.to_string())
}
