//! Browser-engine collaborator seam.
//!
//! The wire server never talks to a browser directly; every command that
//! touches page state goes through [`BrowserEngine`]. The trait is
//! synchronous because engine commands are long-running and serialized per
//! session anyway; the async edge lives in the HTTP glue.

pub mod chrome;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub use chrome::{ChromeEngine, EngineOptions};

/// Errors produced by an engine backend. Handlers re-express these as wire
/// errors; the distinction between absence and staleness must survive the
/// trip.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("stale element reference: {0}")]
    StaleElement(String),

    #[error("no such window: {0}")]
    NoSuchWindow(String),

    #[error("no such frame: {0}")]
    NoSuchFrame(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("unsupported by this engine: {0}")]
    Unsupported(String),

    #[error("{message}")]
    Script {
        message: String,
        stacktrace: Option<String>,
    },

    #[error("engine failure: {0}")]
    Backend(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Element location strategy, as named by the wire protocol's `using`
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
    Id(String),
    Name(String),
    TagName(String),
    LinkText(String),
    PartialLinkText(String),
}

impl Locator {
    /// Build a locator from the protocol's `using`/`value` pair.
    pub fn parse(using: &str, value: &str) -> Option<Self> {
        let value = value.to_string();
        match using {
            "css selector" => Some(Locator::Css(value)),
            "xpath" => Some(Locator::XPath(value)),
            "id" => Some(Locator::Id(value)),
            "name" => Some(Locator::Name(value)),
            "tag name" => Some(Locator::TagName(value)),
            "link text" => Some(Locator::LinkText(value)),
            "partial link text" => Some(Locator::PartialLinkText(value)),
            _ => None,
        }
    }
}

/// Frame switch target. `Parent` is handled by a dedicated trait method;
/// the rest arrive via `POST /session/:id/frame`.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameTarget {
    Top,
    Index(u16),
    Name(String),
    Element(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn from_wire(code: u64) -> Self {
        match code {
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Move,
    Down,
    Up,
    Click,
}

/// Cookie record, in the wire protocol's field casing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(rename = "httpOnly", default)]
    pub http_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

/// The browser engine contract consumed by the request handlers.
///
/// Element references are opaque ids minted by the engine and stay valid
/// until the referenced node is detached (stale) or the document is
/// replaced. `check_element` distinguishes an id the engine never issued
/// (`NoSuchElement`) from one whose node has since been detached
/// (`StaleElement`).
pub trait BrowserEngine: Send + Sync {
    /// Prepare a fresh page for a new session and return the actual
    /// capabilities, given the client's desired set.
    fn start_session(&self, desired: &Value) -> EngineResult<Value>;

    /// Tear down per-session engine state (extra windows, element cache).
    fn end_session(&self) -> EngineResult<()>;

    // Navigation
    fn navigate(&self, url: &str, page_load_timeout: Duration) -> EngineResult<()>;
    fn current_url(&self) -> EngineResult<String>;
    fn go_back(&self) -> EngineResult<()>;
    fn go_forward(&self) -> EngineResult<()>;
    fn refresh(&self) -> EngineResult<()>;

    // Document introspection
    fn title(&self) -> EngineResult<String>;
    fn page_source(&self) -> EngineResult<String>;
    fn execute_script(
        &self,
        script: &str,
        args: &[Value],
        script_timeout: Duration,
    ) -> EngineResult<Value>;
    /// PNG screenshot of the current window, base64-encoded.
    fn screenshot(&self) -> EngineResult<String>;

    // Windows
    fn window_handles(&self) -> EngineResult<Vec<String>>;
    fn current_window(&self) -> EngineResult<String>;
    fn switch_to_window(&self, handle: &str) -> EngineResult<()>;
    fn close_window(&self, handle: &str) -> EngineResult<()>;

    // Frames
    fn switch_to_frame(&self, target: &FrameTarget) -> EngineResult<()>;
    fn switch_to_parent_frame(&self) -> EngineResult<()>;

    // Elements
    fn find_elements(&self, root: Option<&str>, locator: &Locator) -> EngineResult<Vec<String>>;
    fn check_element(&self, element_id: &str) -> EngineResult<()>;
    fn click_element(&self, element_id: &str) -> EngineResult<()>;
    fn element_text(&self, element_id: &str) -> EngineResult<String>;
    fn element_tag_name(&self, element_id: &str) -> EngineResult<String>;
    fn element_attribute(&self, element_id: &str, name: &str) -> EngineResult<Option<String>>;
    fn element_send_keys(&self, element_id: &str, text: &str) -> EngineResult<()>;
    fn element_clear(&self, element_id: &str) -> EngineResult<()>;
    fn element_displayed(&self, element_id: &str) -> EngineResult<bool>;
    fn element_enabled(&self, element_id: &str) -> EngineResult<bool>;
    fn element_selected(&self, element_id: &str) -> EngineResult<bool>;
    /// Top-left in-view coordinates of the element.
    fn element_location(&self, element_id: &str) -> EngineResult<(f64, f64)>;

    // Cookies
    fn cookies(&self) -> EngineResult<Vec<Cookie>>;
    fn add_cookie(&self, cookie: &Cookie) -> EngineResult<()>;
    fn delete_cookie(&self, name: &str) -> EngineResult<()>;
    fn delete_all_cookies(&self) -> EngineResult<()>;

    // Synthesized input
    fn dispatch_mouse(
        &self,
        kind: MouseEventKind,
        x: f64,
        y: f64,
        button: MouseButton,
    ) -> EngineResult<()>;
    /// Type onto whatever currently holds focus.
    fn type_keys(&self, text: &str) -> EngineResult<()>;

    // Alerts
    fn alert_text(&self) -> EngineResult<String>;
    fn accept_alert(&self) -> EngineResult<()>;
    fn dismiss_alert(&self) -> EngineResult<()>;
}

/// Engine that refuses every command. Useful as a placeholder wherever a
/// server must come up without a browser attached.
pub struct NullEngine;

impl NullEngine {
    fn refuse<T>(&self, what: &str) -> EngineResult<T> {
        Err(EngineError::Unsupported(format!(
            "no engine attached: {what}"
        )))
    }
}

impl BrowserEngine for NullEngine {
    fn start_session(&self, _desired: &Value) -> EngineResult<Value> {
        self.refuse("start_session")
    }
    fn end_session(&self) -> EngineResult<()> {
        Ok(())
    }
    fn navigate(&self, _url: &str, _t: Duration) -> EngineResult<()> {
        self.refuse("navigate")
    }
    fn current_url(&self) -> EngineResult<String> {
        self.refuse("current_url")
    }
    fn go_back(&self) -> EngineResult<()> {
        self.refuse("go_back")
    }
    fn go_forward(&self) -> EngineResult<()> {
        self.refuse("go_forward")
    }
    fn refresh(&self) -> EngineResult<()> {
        self.refuse("refresh")
    }
    fn title(&self) -> EngineResult<String> {
        self.refuse("title")
    }
    fn page_source(&self) -> EngineResult<String> {
        self.refuse("page_source")
    }
    fn execute_script(&self, _s: &str, _a: &[Value], _t: Duration) -> EngineResult<Value> {
        self.refuse("execute_script")
    }
    fn screenshot(&self) -> EngineResult<String> {
        self.refuse("screenshot")
    }
    fn window_handles(&self) -> EngineResult<Vec<String>> {
        self.refuse("window_handles")
    }
    fn current_window(&self) -> EngineResult<String> {
        self.refuse("current_window")
    }
    fn switch_to_window(&self, _h: &str) -> EngineResult<()> {
        self.refuse("switch_to_window")
    }
    fn close_window(&self, _h: &str) -> EngineResult<()> {
        self.refuse("close_window")
    }
    fn switch_to_frame(&self, _t: &FrameTarget) -> EngineResult<()> {
        self.refuse("switch_to_frame")
    }
    fn switch_to_parent_frame(&self) -> EngineResult<()> {
        self.refuse("switch_to_parent_frame")
    }
    fn find_elements(&self, _r: Option<&str>, _l: &Locator) -> EngineResult<Vec<String>> {
        self.refuse("find_elements")
    }
    fn check_element(&self, _id: &str) -> EngineResult<()> {
        self.refuse("check_element")
    }
    fn click_element(&self, _id: &str) -> EngineResult<()> {
        self.refuse("click_element")
    }
    fn element_text(&self, _id: &str) -> EngineResult<String> {
        self.refuse("element_text")
    }
    fn element_tag_name(&self, _id: &str) -> EngineResult<String> {
        self.refuse("element_tag_name")
    }
    fn element_attribute(&self, _id: &str, _n: &str) -> EngineResult<Option<String>> {
        self.refuse("element_attribute")
    }
    fn element_send_keys(&self, _id: &str, _t: &str) -> EngineResult<()> {
        self.refuse("element_send_keys")
    }
    fn element_clear(&self, _id: &str) -> EngineResult<()> {
        self.refuse("element_clear")
    }
    fn element_displayed(&self, _id: &str) -> EngineResult<bool> {
        self.refuse("element_displayed")
    }
    fn element_enabled(&self, _id: &str) -> EngineResult<bool> {
        self.refuse("element_enabled")
    }
    fn element_selected(&self, _id: &str) -> EngineResult<bool> {
        self.refuse("element_selected")
    }
    fn element_location(&self, _id: &str) -> EngineResult<(f64, f64)> {
        self.refuse("element_location")
    }
    fn cookies(&self) -> EngineResult<Vec<Cookie>> {
        self.refuse("cookies")
    }
    fn add_cookie(&self, _c: &Cookie) -> EngineResult<()> {
        self.refuse("add_cookie")
    }
    fn delete_cookie(&self, _n: &str) -> EngineResult<()> {
        self.refuse("delete_cookie")
    }
    fn delete_all_cookies(&self) -> EngineResult<()> {
        self.refuse("delete_all_cookies")
    }
    fn dispatch_mouse(
        &self,
        _k: MouseEventKind,
        _x: f64,
        _y: f64,
        _b: MouseButton,
    ) -> EngineResult<()> {
        self.refuse("dispatch_mouse")
    }
    fn type_keys(&self, _t: &str) -> EngineResult<()> {
        self.refuse("type_keys")
    }
    fn alert_text(&self) -> EngineResult<String> {
        self.refuse("alert_text")
    }
    fn accept_alert(&self) -> EngineResult<()> {
        self.refuse("accept_alert")
    }
    fn dismiss_alert(&self) -> EngineResult<()> {
        self.refuse("dismiss_alert")
    }
}
