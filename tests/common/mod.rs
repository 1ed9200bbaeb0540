//! In-memory browser engine for driving the wire server in tests.
//!
//! Pages, elements and frames are declared up front; commands mutate
//! plain state and record what they were asked to do so tests can assert
//! on it.

// Each integration-test binary compiles its own copy; not every helper is
// used from both.
#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;

use ghostwire::engine::{
    BrowserEngine, Cookie, EngineError, EngineResult, FrameTarget, Locator, MouseButton,
    MouseEventKind,
};

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub tag: String,
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub displayed: bool,
    pub enabled: bool,
    pub selected: bool,
    pub attached: bool,
    pub location: (f64, f64),
}

impl Default for FakeElement {
    fn default() -> Self {
        Self {
            tag: "div".into(),
            text: String::new(),
            attributes: HashMap::new(),
            displayed: true,
            enabled: true,
            selected: false,
            attached: true,
            location: (0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MouseRecord {
    pub kind: MouseEventKind,
    pub x: f64,
    pub y: f64,
    pub button: MouseButton,
}

#[derive(Default)]
struct FakeState {
    windows: Vec<String>,
    current_window: Option<String>,
    pages: HashMap<String, (String, String)>, // url -> (title, source)
    current_url: String,
    current_title: String,
    history: Vec<String>,
    history_pos: usize,
    elements: HashMap<String, FakeElement>,
    matches: HashMap<String, Vec<String>>, // locator value -> element ids
    frames: Vec<String>,                   // frame names reachable from top
    frame_depth: usize,
    cookies: Vec<Cookie>,
    script_results: HashMap<String, Value>,
    pub scripts_run: Vec<String>,
    pub typed: Vec<String>,
    pub mouse_events: Vec<MouseRecord>,
    alert: Option<String>,
    navigation_times_out: bool,
    session_live: bool,
}

pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        let mut state = FakeState::default();
        state.windows.push("win-1".to_string());
        state.current_url = "about:blank".to_string();
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn add_page(&self, url: &str, title: &str, source: &str) {
        self.state
            .lock()
            .pages
            .insert(url.into(), (title.into(), source.into()));
    }

    pub fn add_window(&self, handle: &str) {
        self.state.lock().windows.push(handle.into());
    }

    pub fn add_element(&self, id: &str, element: FakeElement) {
        self.state.lock().elements.insert(id.into(), element);
    }

    /// Make a locator value resolve to these element ids.
    pub fn bind_locator(&self, value: &str, ids: &[&str]) {
        self.state
            .lock()
            .matches
            .insert(value.into(), ids.iter().map(|s| s.to_string()).collect());
    }

    pub fn detach_element(&self, id: &str) {
        if let Some(element) = self.state.lock().elements.get_mut(id) {
            element.attached = false;
        }
    }

    pub fn add_frame(&self, name: &str) {
        self.state.lock().frames.push(name.into());
    }

    pub fn set_script_result(&self, script: &str, result: Value) {
        self.state
            .lock()
            .script_results
            .insert(script.into(), result);
    }

    pub fn set_alert(&self, text: &str) {
        self.state.lock().alert = Some(text.into());
    }

    pub fn set_navigation_times_out(&self, times_out: bool) {
        self.state.lock().navigation_times_out = times_out;
    }

    pub fn typed_text(&self) -> String {
        self.state.lock().typed.concat()
    }

    pub fn mouse_events(&self) -> Vec<MouseRecord> {
        self.state.lock().mouse_events.clone()
    }

    pub fn current_url_value(&self) -> String {
        self.state.lock().current_url.clone()
    }

    pub fn session_live(&self) -> bool {
        self.state.lock().session_live
    }

    fn locator_value(locator: &Locator) -> &str {
        match locator {
            Locator::Css(v)
            | Locator::XPath(v)
            | Locator::Id(v)
            | Locator::Name(v)
            | Locator::TagName(v)
            | Locator::LinkText(v)
            | Locator::PartialLinkText(v) => v,
        }
    }
}

impl BrowserEngine for FakeEngine {
    fn start_session(&self, desired: &Value) -> EngineResult<Value> {
        let mut state = self.state.lock();
        state.session_live = true;
        let proxy = desired
            .get("proxy")
            .cloned()
            .unwrap_or_else(|| json!({"proxyType": "direct"}));
        Ok(json!({
            "browserName": "fake",
            "version": "0.0.0",
            "platform": "ANY",
            "javascriptEnabled": true,
            "proxy": proxy,
        }))
    }

    fn end_session(&self) -> EngineResult<()> {
        self.state.lock().session_live = false;
        Ok(())
    }

    fn navigate(&self, url: &str, _page_load_timeout: Duration) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.navigation_times_out {
            return Err(EngineError::Timeout(format!("page load of {url}")));
        }
        let (title, _source) = state
            .pages
            .get(url)
            .cloned()
            .unwrap_or((String::new(), String::new()));
        state.current_url = url.to_string();
        state.current_title = title;
        let pos = state.history_pos;
        state.history.truncate(pos);
        state.history.push(url.to_string());
        state.history_pos = state.history.len();
        Ok(())
    }

    fn current_url(&self) -> EngineResult<String> {
        Ok(self.state.lock().current_url.clone())
    }

    fn go_back(&self) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.history_pos > 1 {
            state.history_pos -= 1;
            state.current_url = state.history[state.history_pos - 1].clone();
        }
        Ok(())
    }

    fn go_forward(&self) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.history_pos < state.history.len() {
            state.history_pos += 1;
            state.current_url = state.history[state.history_pos - 1].clone();
        }
        Ok(())
    }

    fn refresh(&self) -> EngineResult<()> {
        Ok(())
    }

    fn title(&self) -> EngineResult<String> {
        Ok(self.state.lock().current_title.clone())
    }

    fn page_source(&self) -> EngineResult<String> {
        let state = self.state.lock();
        let source = state
            .pages
            .get(&state.current_url)
            .map(|(_, source)| source.clone())
            .unwrap_or_default();
        Ok(source)
    }

    fn execute_script(
        &self,
        script: &str,
        args: &[Value],
        _script_timeout: Duration,
    ) -> EngineResult<Value> {
        let mut state = self.state.lock();
        state.scripts_run.push(script.to_string());
        if let Some(result) = state.script_results.get(script) {
            return Ok(result.clone());
        }
        // Convenient default: echo the first argument back.
        if script == "return arguments[0];" {
            return Ok(args.first().cloned().unwrap_or(Value::Null));
        }
        Ok(Value::Null)
    }

    fn screenshot(&self) -> EngineResult<String> {
        // A 1x1 transparent PNG, already base64.
        Ok("iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==".to_string())
    }

    fn window_handles(&self) -> EngineResult<Vec<String>> {
        Ok(self.state.lock().windows.clone())
    }

    fn current_window(&self) -> EngineResult<String> {
        let state = self.state.lock();
        state
            .current_window
            .clone()
            .or_else(|| state.windows.first().cloned())
            .ok_or_else(|| EngineError::NoSuchWindow("no window open".into()))
    }

    fn switch_to_window(&self, handle: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        if !state.windows.iter().any(|w| w == handle) {
            return Err(EngineError::NoSuchWindow(handle.to_string()));
        }
        state.current_window = Some(handle.to_string());
        Ok(())
    }

    fn close_window(&self, handle: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        let before = state.windows.len();
        state.windows.retain(|w| w != handle);
        if state.windows.len() == before {
            return Err(EngineError::NoSuchWindow(handle.to_string()));
        }
        Ok(())
    }

    fn switch_to_frame(&self, target: &FrameTarget) -> EngineResult<()> {
        let mut state = self.state.lock();
        match target {
            FrameTarget::Top => {
                state.frame_depth = 0;
                Ok(())
            }
            FrameTarget::Index(index) => {
                if usize::from(*index) < state.frames.len() {
                    state.frame_depth += 1;
                    Ok(())
                } else {
                    Err(EngineError::NoSuchFrame(format!("index {index}")))
                }
            }
            FrameTarget::Name(name) => {
                if state.frames.iter().any(|f| f == name) {
                    state.frame_depth += 1;
                    Ok(())
                } else {
                    Err(EngineError::NoSuchFrame(name.clone()))
                }
            }
            FrameTarget::Element(id) => {
                if state.elements.contains_key(id.as_str()) {
                    state.frame_depth += 1;
                    Ok(())
                } else {
                    Err(EngineError::NoSuchFrame(id.clone()))
                }
            }
        }
    }

    fn switch_to_parent_frame(&self) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.frame_depth = state.frame_depth.saturating_sub(1);
        Ok(())
    }

    fn find_elements(&self, root: Option<&str>, locator: &Locator) -> EngineResult<Vec<String>> {
        let state = self.state.lock();
        if let Some(root_id) = root {
            match state.elements.get(root_id) {
                None => return Err(EngineError::NoSuchElement(root_id.to_string())),
                Some(element) if !element.attached => {
                    return Err(EngineError::StaleElement(root_id.to_string()));
                }
                Some(_) => {}
            }
        }
        let ids = state
            .matches
            .get(Self::locator_value(locator))
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter(|id| state.elements.get(id).is_some_and(|e| e.attached))
            .collect())
    }

    fn check_element(&self, element_id: &str) -> EngineResult<()> {
        let state = self.state.lock();
        match state.elements.get(element_id) {
            None => Err(EngineError::NoSuchElement(element_id.to_string())),
            Some(element) if !element.attached => {
                Err(EngineError::StaleElement(element_id.to_string()))
            }
            Some(_) => Ok(()),
        }
    }

    fn click_element(&self, element_id: &str) -> EngineResult<()> {
        self.check_element(element_id)?;
        self.state.lock().mouse_events.push(MouseRecord {
            kind: MouseEventKind::Click,
            x: 0.0,
            y: 0.0,
            button: MouseButton::Left,
        });
        Ok(())
    }

    fn element_text(&self, element_id: &str) -> EngineResult<String> {
        self.check_element(element_id)?;
        Ok(self.state.lock().elements[element_id].text.clone())
    }

    fn element_tag_name(&self, element_id: &str) -> EngineResult<String> {
        self.check_element(element_id)?;
        Ok(self.state.lock().elements[element_id].tag.clone())
    }

    fn element_attribute(&self, element_id: &str, name: &str) -> EngineResult<Option<String>> {
        self.check_element(element_id)?;
        Ok(self.state.lock().elements[element_id]
            .attributes
            .get(name)
            .cloned())
    }

    fn element_send_keys(&self, element_id: &str, text: &str) -> EngineResult<()> {
        self.check_element(element_id)?;
        self.state.lock().typed.push(text.to_string());
        Ok(())
    }

    fn element_clear(&self, element_id: &str) -> EngineResult<()> {
        self.check_element(element_id)?;
        Ok(())
    }

    fn element_displayed(&self, element_id: &str) -> EngineResult<bool> {
        self.check_element(element_id)?;
        Ok(self.state.lock().elements[element_id].displayed)
    }

    fn element_enabled(&self, element_id: &str) -> EngineResult<bool> {
        self.check_element(element_id)?;
        Ok(self.state.lock().elements[element_id].enabled)
    }

    fn element_selected(&self, element_id: &str) -> EngineResult<bool> {
        self.check_element(element_id)?;
        Ok(self.state.lock().elements[element_id].selected)
    }

    fn element_location(&self, element_id: &str) -> EngineResult<(f64, f64)> {
        self.check_element(element_id)?;
        Ok(self.state.lock().elements[element_id].location)
    }

    fn cookies(&self) -> EngineResult<Vec<Cookie>> {
        Ok(self.state.lock().cookies.clone())
    }

    fn add_cookie(&self, cookie: &Cookie) -> EngineResult<()> {
        self.state.lock().cookies.push(cookie.clone());
        Ok(())
    }

    fn delete_cookie(&self, name: &str) -> EngineResult<()> {
        self.state.lock().cookies.retain(|c| c.name != name);
        Ok(())
    }

    fn delete_all_cookies(&self) -> EngineResult<()> {
        self.state.lock().cookies.clear();
        Ok(())
    }

    fn dispatch_mouse(
        &self,
        kind: MouseEventKind,
        x: f64,
        y: f64,
        button: MouseButton,
    ) -> EngineResult<()> {
        self.state.lock().mouse_events.push(MouseRecord {
            kind,
            x,
            y,
            button,
        });
        Ok(())
    }

    fn type_keys(&self, text: &str) -> EngineResult<()> {
        self.state.lock().typed.push(text.to_string());
        Ok(())
    }

    fn alert_text(&self) -> EngineResult<String> {
        self.state
            .lock()
            .alert
            .clone()
            .ok_or_else(|| EngineError::Backend("no alert open".into()))
    }

    fn accept_alert(&self) -> EngineResult<()> {
        self.state.lock().alert = None;
        Ok(())
    }

    fn dismiss_alert(&self) -> EngineResult<()> {
        self.state.lock().alert = None;
        Ok(())
    }
}
