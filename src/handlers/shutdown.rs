//! `POST /shutdown`: clean process exit, destroying any live session
//! first. The success envelope goes out before the listener stops
//! accepting.

use axum::http::Method;
use log::{info, warn};
use serde_json::json;

use crate::error::WireResult;
use crate::protocol::WireRequest;
use crate::router::{HandlerOutput, Router};

use super::AppContext;

pub fn register(router: &mut Router) {
    router.register(Method::POST, "/shutdown", post_shutdown);
    // Some clients issue the shutdown command as a bare GET.
    router.register(Method::GET, "/shutdown", post_shutdown);
}

fn post_shutdown(ctx: &AppContext, _req: &WireRequest) -> WireResult<HandlerOutput> {
    if let Some(session) = ctx.sessions.clear() {
        info!("shutdown: destroying session {}", session.id());
        if let Err(e) = ctx.engine.end_session() {
            warn!("engine cleanup during shutdown failed: {e}");
        }
    }
    info!("shutdown requested; stopping server");
    ctx.shutdown.cancel();
    Ok(HandlerOutput::new(json!(null)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::engine::NullEngine;
    use std::sync::Arc;

    #[test]
    fn test_shutdown_cancels_token_and_clears_session() {
        let ctx = AppContext::new(Config::default(), Arc::new(NullEngine));
        ctx.sessions
            .create(json!({}), "w-1".into())
            .expect("create session");

        let req = WireRequest::new(Method::POST, "/shutdown", Vec::new());
        let output = post_shutdown(&ctx, &req).unwrap();
        assert_eq!(output.value, json!(null));
        assert!(ctx.shutdown.is_cancelled());
        assert!(ctx.sessions.active().is_none());
    }
}
