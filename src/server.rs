//! HTTP transport glue.
//!
//! axum supplies the listener, keep-alive and request plumbing; every
//! request lands in the fallback below and goes through this crate's own
//! wire router. Engine-driving work happens on the blocking pool so a
//! long page load never stalls the reactor.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, info};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::error::WireError;
use crate::handlers::{self, AppContext};
use crate::protocol::{WireReply, WireRequest};
use crate::router::Router;

/// Largest request body accepted; wire commands are small.
const BODY_LIMIT: usize = 4 * 1024 * 1024;

#[derive(Clone)]
pub struct ServerState {
    pub ctx: Arc<AppContext>,
    pub router: Arc<Router>,
}

/// Compile the full route table once.
pub fn build_router() -> Router {
    let mut router = Router::new();
    handlers::register_all(&mut router);
    router
}

/// The axum application: one fallback that forwards everything to the
/// wire router.
pub fn build_app(state: ServerState) -> axum::Router {
    axum::Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(State(state): State<ServerState>, req: axum::extract::Request) -> Response {
    let (parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    let bytes: Bytes = match axum::body::to_bytes(body, BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let err = WireError::InvalidArgument(format!("unreadable request body: {e}"));
            return reply_response(WireReply::failure(None, &err));
        }
    };

    let wire_req = WireRequest::new(parts.method, path, bytes.to_vec());
    let ctx = state.ctx.clone();
    let router = state.router.clone();

    let reply = tokio::task::spawn_blocking(move || router.dispatch(&ctx, wire_req))
        .await
        .unwrap_or_else(|e| {
            error!("dispatch task failed: {e}");
            WireReply::failure(None, &WireError::unexpected(format!("dispatch task: {e}")))
        });

    reply_response(reply)
}

fn reply_response(reply: WireReply) -> Response {
    let status =
        StatusCode::from_u16(reply.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, axum::Json(reply.body)).into_response()
}

/// Serve until the context's shutdown token fires or Ctrl-C arrives.
pub async fn serve(listener: TcpListener, state: ServerState) -> std::io::Result<()> {
    let token = state.ctx.shutdown.clone();
    let app = build_app(state);

    info!("accepting connections");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        })
        .await
}
