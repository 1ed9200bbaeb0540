//! `GET /status`: process/build metadata, no session required.

use axum::http::Method;
use serde_json::json;

use crate::error::WireResult;
use crate::protocol::WireRequest;
use crate::router::{HandlerOutput, Router};

use super::AppContext;

pub fn register(router: &mut Router) {
    router.register(Method::GET, "/status", get_status);
}

fn get_status(ctx: &AppContext, _req: &WireRequest) -> WireResult<HandlerOutput> {
    Ok(HandlerOutput::new(json!({
        "build": {
            "version": ctx.config.driver_version,
        },
        "os": {
            "name": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        },
    })))
}
