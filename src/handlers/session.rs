//! Per-session commands: navigation, document introspection, script
//! execution, timeouts, windows, frames, cookies, synthesized input and
//! alerts.
//!
//! Every handler resolves the session first, then takes the session's
//! command guard for the duration of the engine call, so commands against
//! one session queue rather than interleave.

use axum::http::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::engine::{Cookie, FrameTarget, MouseButton, MouseEventKind};
use crate::error::{WireError, WireResult};
use crate::protocol::{WireRequest, parse_element_ref};
use crate::router::{HandlerOutput, Router};

use super::AppContext;

pub fn register(router: &mut Router) {
    router.register(Method::POST, "/session/:sessionId/url", post_url);
    router.register(Method::GET, "/session/:sessionId/url", get_url);
    router.register(Method::POST, "/session/:sessionId/back", post_back);
    router.register(Method::POST, "/session/:sessionId/forward", post_forward);
    router.register(Method::POST, "/session/:sessionId/refresh", post_refresh);
    router.register(Method::GET, "/session/:sessionId/title", get_title);
    router.register(Method::GET, "/session/:sessionId/source", get_source);
    router.register(Method::POST, "/session/:sessionId/execute", post_execute);
    router.register(Method::GET, "/session/:sessionId/screenshot", get_screenshot);
    router.register(Method::POST, "/session/:sessionId/timeouts", post_timeouts);
    router.register(Method::GET, "/session/:sessionId/window_handle", get_window_handle);
    router.register(Method::GET, "/session/:sessionId/window_handles", get_window_handles);
    router.register(Method::POST, "/session/:sessionId/window", post_window);
    router.register(Method::DELETE, "/session/:sessionId/window", delete_window);
    router.register(Method::POST, "/session/:sessionId/frame/parent", post_frame_parent);
    router.register(Method::POST, "/session/:sessionId/frame", post_frame);
    router.register(Method::GET, "/session/:sessionId/cookie", get_cookies);
    router.register(Method::POST, "/session/:sessionId/cookie", post_cookie);
    router.register(Method::DELETE, "/session/:sessionId/cookie/:name", delete_cookie);
    router.register(Method::DELETE, "/session/:sessionId/cookie", delete_cookies);
    router.register(Method::POST, "/session/:sessionId/keys", post_keys);
    router.register(Method::POST, "/session/:sessionId/moveto", post_moveto);
    router.register(Method::POST, "/session/:sessionId/click", post_click);
    router.register(Method::POST, "/session/:sessionId/buttondown", post_buttondown);
    router.register(Method::POST, "/session/:sessionId/buttonup", post_buttonup);
    router.register(Method::GET, "/session/:sessionId/alert_text", get_alert_text);
    router.register(Method::POST, "/session/:sessionId/accept_alert", post_accept_alert);
    router.register(Method::POST, "/session/:sessionId/dismiss_alert", post_dismiss_alert);
}

/// Decode a typed parameter struct out of a JSON body, surfacing shape
/// problems as `InvalidArgument`.
pub(crate) fn decode<T: DeserializeOwned>(body: Value) -> WireResult<T> {
    serde_json::from_value(body).map_err(|e| WireError::InvalidArgument(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct NavigateParams {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ExecuteParams {
    script: String,
    #[serde(default)]
    args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct WindowSwitchParams {
    name: Option<String>,
    handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CookieBody {
    cookie: Cookie,
}

#[derive(Debug, Deserialize)]
struct KeysParams {
    value: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MoveToParams {
    element: Option<String>,
    xoffset: Option<f64>,
    yoffset: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ButtonParams {
    #[serde(default)]
    button: u64,
}

fn post_url(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let params: NavigateParams = decode(req.body_json()?)?;

    ctx.engine
        .navigate(&params.url, session.timeouts().page_load())?;
    // Navigation lands in the top-level browsing context.
    session.reset_frames();
    Ok(HandlerOutput::new(json!(null)))
}

fn get_url(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    Ok(HandlerOutput::new(json!(ctx.engine.current_url()?)))
}

fn post_back(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    ctx.engine.go_back()?;
    session.reset_frames();
    Ok(HandlerOutput::new(json!(null)))
}

fn post_forward(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    ctx.engine.go_forward()?;
    session.reset_frames();
    Ok(HandlerOutput::new(json!(null)))
}

fn post_refresh(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    ctx.engine.refresh()?;
    session.reset_frames();
    Ok(HandlerOutput::new(json!(null)))
}

fn get_title(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    super::require_live_window(ctx, &session)?;
    Ok(HandlerOutput::new(json!(ctx.engine.title()?)))
}

fn get_source(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    super::require_live_window(ctx, &session)?;
    Ok(HandlerOutput::new(json!(ctx.engine.page_source()?)))
}

fn post_execute(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let params: ExecuteParams = decode(req.body_json()?)?;

    let value =
        ctx.engine
            .execute_script(&params.script, &params.args, session.timeouts().script())?;
    Ok(HandlerOutput::new(value))
}

fn get_screenshot(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    super::require_live_window(ctx, &session)?;
    Ok(HandlerOutput::new(json!(ctx.engine.screenshot()?)))
}

/// `POST /session/:id/timeouts`. Accepts the legacy `{"type": ..., "ms":
/// ...}` pair as well as bodies that name the timeouts directly
/// (`{"implicit": 500}` etc.).
fn post_timeouts(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let body = req.body_json()?;

    if let Some(kind) = body.get("type").and_then(Value::as_str) {
        let ms = body
            .get("ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| WireError::InvalidArgument("ms must be a non-negative number".into()))?;
        if !session.set_timeout(kind, ms) {
            return Err(WireError::InvalidArgument(format!(
                "unknown timeout type: {kind}"
            )));
        }
        return Ok(HandlerOutput::new(json!(null)));
    }

    let mut any = false;
    for kind in ["implicit", "pageLoad", "script"] {
        if let Some(ms) = body.get(kind).and_then(Value::as_u64) {
            session.set_timeout(kind, ms);
            any = true;
        }
    }
    if !any {
        return Err(WireError::InvalidArgument(
            "no recognized timeout in body".into(),
        ));
    }
    Ok(HandlerOutput::new(json!(null)))
}

fn get_window_handle(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let handle = super::require_live_window(ctx, &session)?;
    Ok(HandlerOutput::new(json!(handle)))
}

fn get_window_handles(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    super::require_session(ctx, req)?;
    Ok(HandlerOutput::new(json!(ctx.engine.window_handles()?)))
}

/// `POST /session/:id/window`: switch. The legacy body uses `name`; newer
/// clients send `handle`.
fn post_window(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let params: WindowSwitchParams = decode(req.body_json()?)?;
    let target = params
        .handle
        .or(params.name)
        .ok_or_else(|| WireError::InvalidArgument("missing window name or handle".into()))?;

    ctx.engine.switch_to_window(&target)?;
    session.set_current_window(target);
    session.reset_frames();
    Ok(HandlerOutput::new(json!(null)))
}

/// `DELETE /session/:id/window`: close the current window. The session
/// survives; until the client switches away, per-window commands fail
/// with no-such-window.
fn delete_window(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let current = super::require_live_window(ctx, &session)?;
    ctx.engine.close_window(&current)?;
    Ok(HandlerOutput::new(json!(null)))
}

/// `POST /session/:id/frame` with `{"id": null | number | name |
/// {"ELEMENT": ...}}`.
fn post_frame(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let body = req.body_json()?;
    let id = body
        .get("id")
        .ok_or_else(|| WireError::InvalidArgument("missing frame id".into()))?;

    let target = match id {
        Value::Null => FrameTarget::Top,
        Value::Number(n) => {
            let index = n
                .as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .ok_or_else(|| WireError::InvalidArgument("frame index out of range".into()))?;
            FrameTarget::Index(index)
        }
        Value::String(name) => FrameTarget::Name(name.clone()),
        other => match parse_element_ref(other) {
            Some(element_id) => FrameTarget::Element(element_id.to_string()),
            None => {
                return Err(WireError::InvalidArgument(
                    "frame id must be null, a number, a name or an element reference".into(),
                ));
            }
        },
    };

    ctx.engine.switch_to_frame(&target)?;
    match target {
        FrameTarget::Top => session.reset_frames(),
        other => session.push_frame(other),
    }
    Ok(HandlerOutput::new(json!(null)))
}

fn post_frame_parent(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    ctx.engine.switch_to_parent_frame()?;
    session.pop_frame();
    Ok(HandlerOutput::new(json!(null)))
}

fn get_cookies(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let cookies = ctx.engine.cookies()?;
    Ok(HandlerOutput::new(serde_json::to_value(cookies).map_err(
        |e| WireError::unexpected(format!("cookie serialization: {e}")),
    )?))
}

fn post_cookie(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let body: CookieBody = decode(req.body_json()?)?;
    if body.cookie.name.is_empty() {
        return Err(WireError::InvalidArgument("cookie name is empty".into()));
    }
    ctx.engine.add_cookie(&body.cookie)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn delete_cookie(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let name = req.param("name")?;
    ctx.engine.delete_cookie(name)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn delete_cookies(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    ctx.engine.delete_all_cookies()?;
    Ok(HandlerOutput::new(json!(null)))
}

/// `POST /session/:id/keys`: type onto the focused element, tracking
/// modifier codepoints so they stay held across commands.
fn post_keys(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let params: KeysParams = decode(req.body_json()?)?;
    let text = params.value.concat();

    session.with_input(|input| input.scan_keys(&text));
    ctx.engine.type_keys(&text)?;
    Ok(HandlerOutput::new(json!(null)))
}

/// `POST /session/:id/moveto`: move the tracked pointer to an element's
/// position plus offsets, or relative to where it already is.
fn post_moveto(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let params: MoveToParams = decode(req.body_json()?)?;

    let (base_x, base_y) = match &params.element {
        Some(element_id) => {
            ctx.engine.check_element(element_id)?;
            ctx.engine.element_location(element_id)?
        }
        None => session.with_input(|input| (input.pointer_x, input.pointer_y)),
    };
    let x = base_x + params.xoffset.unwrap_or(0.0);
    let y = base_y + params.yoffset.unwrap_or(0.0);

    session.with_input(|input| input.move_pointer(x, y));
    ctx.engine
        .dispatch_mouse(MouseEventKind::Move, x, y, MouseButton::Left)?;
    Ok(HandlerOutput::new(json!(null)))
}

/// `POST /session/:id/click`: click at the tracked pointer position.
fn post_click(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let params: ButtonParams = decode(req.body_json_or_empty()?)?;
    let button = MouseButton::from_wire(params.button);

    let (x, y) = session.with_input(|input| (input.pointer_x, input.pointer_y));
    ctx.engine.dispatch_mouse(MouseEventKind::Click, x, y, button)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn post_buttondown(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    let params: ButtonParams = decode(req.body_json_or_empty()?)?;
    let button = MouseButton::from_wire(params.button);

    let (x, y) = session.with_input(|input| {
        input.press_button(button);
        (input.pointer_x, input.pointer_y)
    });
    ctx.engine.dispatch_mouse(MouseEventKind::Down, x, y, button)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn post_buttonup(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    // Release whichever button the tracker saw go down.
    let (x, y, button) = session.with_input(|input| {
        let button = input.release_button();
        (input.pointer_x, input.pointer_y, button)
    });
    ctx.engine.dispatch_mouse(MouseEventKind::Up, x, y, button)?;
    Ok(HandlerOutput::new(json!(null)))
}

fn get_alert_text(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    Ok(HandlerOutput::new(json!(ctx.engine.alert_text()?)))
}

fn post_accept_alert(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    ctx.engine.accept_alert()?;
    Ok(HandlerOutput::new(json!(null)))
}

fn post_dismiss_alert(ctx: &AppContext, req: &WireRequest) -> WireResult<HandlerOutput> {
    let session = super::require_session(ctx, req)?;
    let _guard = session.command_guard();
    ctx.engine.dismiss_alert()?;
    Ok(HandlerOutput::new(json!(null)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_params_decode() {
        let params: NavigateParams = decode(json!({"url": "https://example.com"})).unwrap();
        assert_eq!(params.url, "https://example.com");

        let bad: WireResult<NavigateParams> = decode(json!({"uri": "x"}));
        assert!(matches!(bad, Err(WireError::InvalidArgument(_))));
    }

    #[test]
    fn test_execute_params_default_args() {
        let params: ExecuteParams = decode(json!({"script": "return 1;"})).unwrap();
        assert!(params.args.is_empty());

        let params: ExecuteParams =
            decode(json!({"script": "return arguments[0];", "args": [5]})).unwrap();
        assert_eq!(params.args, vec![json!(5)]);
    }

    #[test]
    fn test_keys_params_concat() {
        let params: KeysParams = decode(json!({"value": ["ab", "c"]})).unwrap();
        assert_eq!(params.value.concat(), "abc");
    }

    #[test]
    fn test_button_params_default_left() {
        let params: ButtonParams = decode(json!({})).unwrap();
        assert_eq!(MouseButton::from_wire(params.button), MouseButton::Left);

        let params: ButtonParams = decode(json!({"button": 2})).unwrap();
        assert_eq!(MouseButton::from_wire(params.button), MouseButton::Right);
    }

    #[test]
    fn test_cookie_body_decode() {
        let body: CookieBody = decode(json!({
            "cookie": {"name": "sid", "value": "abc", "secure": true}
        }))
        .unwrap();
        assert_eq!(body.cookie.name, "sid");
        assert!(body.cookie.secure);
        assert!(!body.cookie.http_only);
    }
}
