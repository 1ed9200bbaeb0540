//! Per-element commands.
//!
//! Element lookups honor the session's implicit wait by polling the
//! engine until the deadline. An id the engine never issued is
//! `NoSuchElement`; an id whose node has been detached since is
//! `StaleElementReference` — the two never collapse into one another.

use axum::http::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::{EngineError, Locator};
use crate::error::{WireError, WireResult};
use crate::protocol::{WireRequest, element_ref};
use crate::router::{HandlerOutput, Router};
use crate::session::Session;

use super::AppContext;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn register(router: &mut Router) {
    router.register(Method::POST, "/session/:sessionId/element", post_element);
    router.register(Method::POST, "/session/:sessionId/elements", post_elements);
    router.register(
        Method::POST,
        "/session/:sessionId/element/:elementId/element",
        post_child_element,
    );
    router.register(
        Method::POST,
        "/session/:sessionId/element/:elementId/elements",
        post_child_elements,
    );
    router.register(
        Method::POST,
        "/session/:sessionId/element/:elementId/click",
        post_click,
    );
    router.register(
        Method::GET,
        "/session/:sessionId/element/:elementId/text",
        get_text,
    );
    router.register(
        Method::GET,
        "/session/:sessionId/element/:elementId/name",
        get_name,
    );
    router.register(
        Method::GET,
        "/session/:sessionId/element/:elementId/attribute/:name",
        get_attribute,
    );
    router.register(
        Method::POST,
        "/session/:sessionId/element/:elementId/value",
        post_value,
    );
    router.register(
        Method::POST,
        "/session/:sessionId/element/:elementId/clear",
        post_clear,
    );
    router.register(
        Method::GET,
        "/session/:sessionId/element/:elementId/displayed",
        get_displayed,
    );
    router.register(
        Method::GET,
        "/session/:sessionId/element/:elementId/enabled",
        get_enabled,
    );
    router.register(
        Method::GET,
        "/session/:sessionId/element/:elementId/selected",
        get_selected,
    );
}

#[derive(Debug, Deserialize)]
struct FindParams {
    using: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SendKeysParams {
    value: Vec<String>,
}

fn parse_locator(req: &WireRequest) -> WireResult<Locator> {
    let params: FindParams = super::session::decode(req.body_json()?)?;
    Locator::parse(&params.using, &params.value).ok_or_else(|| {
        WireError::InvalidArgument(format!("unknown locator strategy: {}", params.using))
    })
}

/// Poll the engine for matches until something turns up or the implicit
/// wait runs out.
fn find_with_implicit_wait(
    ctx: &AppContext,
    session: &Session,
    root: Option<&str>,
    locator: &Locator,
) -> WireResult<Vec<String>> {
    let deadline = Instant::now() + session.timeouts().implicit();
    loop {
        match ctx.engine.find_elements(root, locator) {
            Ok(ids) if !ids.is_empty() => return Ok(ids),
            Ok(_) | Err(EngineError::NoSuchElement(_)) => {
                if Instant::now() >= deadline {
                    return Ok(Vec::new());
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(other) => return Err(other.into()),
        }
    }
}

fn find_one(
    ctx: &AppContext,
    session: &Session,
    root: Option<&str>,
    locator: &Locator,
) -> WireResult<HandlerOutput> {
    let ids = find_with_implicit_wait(ctx, session, root, locator)?;
    match ids.first() {
        Some(id) => Ok(HandlerOutput::new(element_ref(id))),
        None => Err(WireError::NoSuchElement(format!("{locator:?}"))),
    }
}

fn find_many(
    ctx: &AppContext,
    session: &Session,
    root: Option<&str>,
    locator: &Locator,
) -> WireResult<HandlerOutput> {
    let ids = find_with_implicit_wait(ctx, session, root, locator)?;
    let refs: Vec<Value> = ids.iter().map(|id| element_ref(id)).collect();
    Ok(HandlerOutput::new(json!(refs)))
}

fn post_element(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let locator = parse_locator(req)?;
    find_one(ctx, &session, None, &locator)
}

fn post_elements(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let locator = parse_locator(req)?;
    find_many(ctx, &session, None, &locator)
}

fn post_child_element(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let root = super::require_element(ctx, req)?;
    let locator = parse_locator(req)?;
    find_one(ctx, &session, Some(&root), &locator)
}

fn post_child_elements(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let root = super::require_element(ctx, req)?;
    let locator = parse_locator(req)?;
    find_many(ctx, &session, Some(&root), &locator)
}

fn post_click(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    ctx.engine.click_element(&element_id)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn get_text(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    Ok(HandlerOutput::new(json!(ctx.engine.element_text(&element_id)?)))
}

fn get_name(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    Ok(HandlerOutput::new(json!(
        ctx.engine.element_tag_name(&element_id)?
    )))
}

fn get_attribute(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    let name = req.param("name")?;
    Ok(HandlerOutput::new(json!(
        ctx.engine.element_attribute(&element_id, name)?
    )))
}

/// `POST /session/:id/element/:elementId/value`: send keys to the
/// element, with modifier tracking shared with the session-level keys
/// command.
fn post_value(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    let params: SendKeysParams = super::session::decode(req.body_json()?)?;
    let text = params.value.concat();

    session.with_input(|input| input.scan_keys(&text));
    ctx.engine.element_send_keys(&element_id, &text)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn post_clear(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    ctx.engine.element_clear(&element_id)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn get_displayed(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    Ok(HandlerOutput::new(json!(
        ctx.engine.element_displayed(&element_id)?
    )))
}

fn get_enabled(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    Ok(HandlerOutput::new(json!(
        ctx.engine.element_enabled(&element_id)?
    )))
}

fn get_selected(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let element_id = super::require_element(ctx, req)?;
    Ok(HandlerOutput::new(json!(
        ctx.engine.element_selected(&element_id)?
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_params_to_locator() {
        let req = WireRequest::new(
            Method::POST,
            "/session/s/element",
            serde_json::to_vec(&json!({"using": "css selector", "value": ".go"})).unwrap(),
        );
        assert_eq!(parse_locator(&req).unwrap(), Locator::Css(".go".into()));

        let req = WireRequest::new(
            Method::POST,
            "/session/s/element",
            serde_json::to_vec(&json!({"using": "moonbeam", "value": "x"})).unwrap(),
        );
        assert!(matches!(
            parse_locator(&req),
            Err(WireError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_send_keys_params() {
        let params: SendKeysParams =
            super::super::session::decode(json!({"value": ["hi", " there"]})).unwrap();
        assert_eq!(params.value.concat(), "hi there");
    }
}
