//! Chrome/Chromium engine adapter.
//!
//! Drives a browser over the DevTools protocol via `headless_chrome`.
//! Element references are minted here and resolved through a JS-side
//! registry (`window.__wire_reg`) living on the page; a navigation wipes
//! the registry, which is exactly when references are supposed to go
//! stale. DOM work runs as wrapped page scripts so that one evaluate
//! round-trip carries both the result and any page-side failure.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, Tab};
use indexmap::IndexMap;
use log::debug;
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::{
    BrowserEngine, Cookie, EngineError, EngineResult, FrameTarget, Locator, MouseButton,
    MouseEventKind,
};

/// Options for launching the browser instance behind the engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub chrome_path: Option<PathBuf>,
    pub user_data_dir: Option<PathBuf>,
    pub sandbox: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 800,
            chrome_path: None,
            user_data_dir: None,
            sandbox: true,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn user_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(dir.into());
        self
    }

    pub fn sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }
}

pub struct ChromeEngine {
    browser: Browser,
    /// Target id of the window commands currently address; `None` until a
    /// session picks one.
    current_target: RwLock<Option<String>>,
    /// JS accessor segments locating the current frame under `window`,
    /// e.g. `.frames[0]`. Empty means top-level.
    frame_path: RwLock<Vec<String>>,
    /// Issued element ids and the locator that produced them, in
    /// allocation order.
    elements: RwLock<IndexMap<String, String>>,
    find_seq: AtomicU64,
}

impl ChromeEngine {
    /// Launch a browser with the given options.
    pub fn launch(options: EngineOptions) -> EngineResult<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        launch_opts
            .ignore_default_args
            .push(OsStr::new("--enable-automation"));
        launch_opts
            .args
            .push(OsStr::new("--disable-blink-features=AutomationControlled"));

        // Sessions routinely sit idle between client commands; do not let
        // the browser reap itself in the meantime.
        launch_opts.idle_browser_timeout = Duration::from_secs(60 * 60);
        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.sandbox = options.sandbox;
        if let Some(path) = options.chrome_path {
            launch_opts.path = Some(path);
        }
        if let Some(dir) = options.user_data_dir {
            launch_opts.user_data_dir = Some(dir);
        }

        let browser = Browser::new(launch_opts)
            .map_err(|e| EngineError::Backend(format!("browser launch failed: {e}")))?;
        browser
            .new_tab()
            .map_err(|e| EngineError::Backend(format!("initial tab failed: {e}")))?;

        Ok(Self {
            browser,
            current_target: RwLock::new(None),
            frame_path: RwLock::new(Vec::new()),
            elements: RwLock::new(IndexMap::new()),
            find_seq: AtomicU64::new(0),
        })
    }

    fn tabs(&self) -> EngineResult<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| EngineError::Backend(format!("tab list poisoned: {e}")))?
            .clone();
        Ok(tabs)
    }

    fn tab_by_target(&self, target: &str) -> EngineResult<Arc<Tab>> {
        self.tabs()?
            .into_iter()
            .find(|tab| tab.get_target_id().as_str() == target)
            .ok_or_else(|| EngineError::NoSuchWindow(target.to_string()))
    }

    fn current_tab(&self) -> EngineResult<Arc<Tab>> {
        let current = self.current_target.read().clone();
        match current {
            Some(target) => self.tab_by_target(&target),
            None => self
                .tabs()?
                .into_iter()
                .next()
                .ok_or_else(|| EngineError::NoSuchWindow("no window open".to_string())),
        }
    }

    /// JS expression for the window of the current frame context.
    fn window_expr(&self) -> String {
        let mut expr = String::from("window");
        for segment in self.frame_path.read().iter() {
            expr.push_str(segment);
        }
        expr
    }

    /// Evaluate a wrapped page script. All scripts built here return a
    /// `JSON.stringify`'d object so one round-trip carries result and
    /// error alike.
    fn run_js(&self, script: &str) -> EngineResult<Value> {
        let tab = self.current_tab()?;
        let remote = tab
            .evaluate(script, false)
            .map_err(|e| EngineError::Backend(format!("evaluate failed: {e}")))?;
        match remote.value {
            Some(Value::String(text)) => serde_json::from_str(&text)
                .map_err(|e| EngineError::Backend(format!("malformed script result: {e}"))),
            Some(other) => Ok(other),
            None => Ok(Value::Null),
        }
    }

    /// Decode the `{v}` / `{stale}` / `{missing}` / `{badSelector}` /
    /// `{err}` convention the wrapped scripts use.
    fn decode_outcome(&self, outcome: Value, context: &str) -> EngineResult<Value> {
        if outcome.get("stale").is_some() {
            return Err(EngineError::StaleElement(context.to_string()));
        }
        if outcome.get("missing").is_some() {
            return Err(EngineError::NoSuchElement(context.to_string()));
        }
        if let Some(bad) = outcome.get("badSelector").and_then(Value::as_str) {
            return Err(EngineError::InvalidSelector(bad.to_string()));
        }
        if let Some(err) = outcome.get("err") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("script failure")
                .to_string();
            let stacktrace = err
                .get("stack")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(EngineError::Script {
                message,
                stacktrace,
            });
        }
        Ok(outcome.get("v").cloned().unwrap_or(Value::Null))
    }

    /// Run a body with `el` bound to a registered element. The body's
    /// return value comes back as the outcome's `v`.
    fn eval_on_element(&self, element_id: &str, body: &str) -> EngineResult<Value> {
        if !self.elements.read().contains_key(element_id) {
            return Err(EngineError::NoSuchElement(element_id.to_string()));
        }
        let id_js = js_string(element_id);
        let script = format!(
            "(function(){{\
             var reg = window.__wire_reg = window.__wire_reg || {{}};\
             var el = reg[{id_js}];\
             if (!el || !el.isConnected) return JSON.stringify({{stale: true}});\
             try {{ var r = (function(el){{ {body} }})(el);\
             return JSON.stringify({{v: (r === undefined ? null : r)}}); }}\
             catch (e) {{ return JSON.stringify({{err: {{message: String(e && e.message || e), stack: String(e && e.stack || '')}}}}); }}\
             }})()"
        );
        let outcome = self.run_js(&script)?;
        self.decode_outcome(outcome, element_id)
    }

    /// Page-side collection code for a locator strategy, with `root` and
    /// `doc` in scope, leaving matches in `nodes`.
    fn locator_js(locator: &Locator) -> String {
        match locator {
            Locator::Css(sel) => {
                let sel = js_string(sel);
                format!("nodes = root.querySelectorAll({sel});")
            }
            Locator::XPath(expr) => {
                let expr = js_string(expr);
                format!(
                    "var snap = doc.evaluate({expr}, root, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);\
                     nodes = []; for (var x = 0; x < snap.snapshotLength; x++) nodes.push(snap.snapshotItem(x));"
                )
            }
            Locator::Id(id) => {
                let id = js_string(id);
                format!("nodes = root.querySelectorAll('[id=' + JSON.stringify({id}) + ']');")
            }
            Locator::Name(name) => {
                let name = js_string(name);
                format!("nodes = root.querySelectorAll('[name=' + JSON.stringify({name}) + ']');")
            }
            Locator::TagName(tag) => {
                let tag = js_string(tag);
                format!("nodes = root.getElementsByTagName({tag});")
            }
            Locator::LinkText(text) => {
                let text = js_string(text);
                format!(
                    "nodes = Array.prototype.filter.call(root.querySelectorAll('a'),\
                     function(a) {{ return a.textContent.trim() === {text}; }});"
                )
            }
            Locator::PartialLinkText(text) => {
                let text = js_string(text);
                format!(
                    "nodes = Array.prototype.filter.call(root.querySelectorAll('a'),\
                     function(a) {{ return a.textContent.indexOf({text}) !== -1; }});"
                )
            }
        }
    }
}

/// Safely embed a Rust string as a JS string literal.
fn js_string(s: &str) -> String {
    json!(s).to_string()
}

impl BrowserEngine for ChromeEngine {
    fn start_session(&self, desired: &Value) -> EngineResult<Value> {
        let tab = self.current_tab()?;
        tab.navigate_to("about:blank")
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| EngineError::Backend(format!("session page setup failed: {e}")))?;

        *self.current_target.write() = Some(tab.get_target_id().to_string());
        self.frame_path.write().clear();
        self.elements.write().clear();

        let proxy = desired
            .get("proxy")
            .cloned()
            .unwrap_or_else(|| json!({"proxyType": "direct"}));
        Ok(json!({
            "browserName": "ghostwire",
            "version": env!("CARGO_PKG_VERSION"),
            "platform": std::env::consts::OS.to_uppercase(),
            "javascriptEnabled": true,
            "takesScreenshot": true,
            "handlesAlerts": false,
            "cssSelectorsEnabled": true,
            "webStorageEnabled": true,
            "rotatable": false,
            "acceptSslCerts": false,
            "nativeEvents": true,
            "proxy": proxy,
        }))
    }

    fn end_session(&self) -> EngineResult<()> {
        // Keep one blank tab alive so the browser survives for the next
        // session.
        let tabs = self.tabs()?;
        for tab in tabs.iter().skip(1) {
            let _ = tab.close(false);
        }
        if let Some(first) = tabs.first() {
            let _ = first.navigate_to("about:blank");
        }
        *self.current_target.write() = None;
        self.frame_path.write().clear();
        self.elements.write().clear();
        Ok(())
    }

    fn navigate(&self, url: &str, page_load_timeout: Duration) -> EngineResult<()> {
        let tab = self.current_tab()?;
        tab.set_default_timeout(page_load_timeout);
        debug!("navigate {url}");
        tab.navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| {
                let text = e.to_string();
                if text.to_lowercase().contains("timed out") {
                    EngineError::Timeout(format!("page load of {url}: {text}"))
                } else {
                    EngineError::Backend(format!("navigation to {url} failed: {text}"))
                }
            })?;
        self.frame_path.write().clear();
        Ok(())
    }

    fn current_url(&self) -> EngineResult<String> {
        Ok(self.current_tab()?.get_url())
    }

    fn go_back(&self) -> EngineResult<()> {
        self.run_js("(function(){ window.history.back(); return JSON.stringify({v: null}); })()")?;
        Ok(())
    }

    fn go_forward(&self) -> EngineResult<()> {
        self.run_js(
            "(function(){ window.history.forward(); return JSON.stringify({v: null}); })()",
        )?;
        Ok(())
    }

    fn refresh(&self) -> EngineResult<()> {
        let tab = self.current_tab()?;
        tab.reload(false, None)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| EngineError::Backend(format!("reload failed: {e}")))?;
        self.frame_path.write().clear();
        Ok(())
    }

    fn title(&self) -> EngineResult<String> {
        self.current_tab()?
            .get_title()
            .map_err(|e| EngineError::Backend(format!("title read failed: {e}")))
    }

    fn page_source(&self) -> EngineResult<String> {
        let win = self.window_expr();
        let script = format!(
            "(function(){{ return JSON.stringify({{v: {win}.document.documentElement.outerHTML}}); }})()"
        );
        let outcome = self.run_js(&script)?;
        let value = self.decode_outcome(outcome, "page source")?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| EngineError::Backend("page source was not a string".into()))
    }

    fn execute_script(
        &self,
        script: &str,
        args: &[Value],
        script_timeout: Duration,
    ) -> EngineResult<Value> {
        let tab = self.current_tab()?;
        tab.set_default_timeout(script_timeout);

        let win = self.window_expr();
        let args_js = json!(args).to_string();
        // Element references in the argument list are hydrated back into
        // their registered nodes before the user's body runs.
        let wrapped = format!(
            "(function(){{\
             var reg = window.__wire_reg = window.__wire_reg || {{}};\
             var args = {args_js}.map(function(a) {{\
               return (a && typeof a === 'object' && typeof a.ELEMENT === 'string') ? reg[a.ELEMENT] : a;\
             }});\
             try {{\
               var r = (function(){{ {script} }}).apply({win}, args);\
               return JSON.stringify({{v: (r === undefined ? null : r)}});\
             }} catch (e) {{\
               return JSON.stringify({{err: {{message: String(e && e.message || e), stack: String(e && e.stack || '')}}}});\
             }}\
             }})()"
        );
        let outcome = self.run_js(&wrapped)?;
        self.decode_outcome(outcome, "execute")
    }

    fn screenshot(&self) -> EngineResult<String> {
        let png = self
            .current_tab()?
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| EngineError::Backend(format!("screenshot failed: {e}")))?;
        Ok(BASE64.encode(png))
    }

    fn window_handles(&self) -> EngineResult<Vec<String>> {
        Ok(self
            .tabs()?
            .iter()
            .map(|tab| tab.get_target_id().to_string())
            .collect())
    }

    fn current_window(&self) -> EngineResult<String> {
        Ok(self.current_tab()?.get_target_id().to_string())
    }

    fn switch_to_window(&self, handle: &str) -> EngineResult<()> {
        let tab = self.tab_by_target(handle)?;
        tab.activate()
            .map_err(|e| EngineError::Backend(format!("window activate failed: {e}")))?;
        *self.current_target.write() = Some(handle.to_string());
        self.frame_path.write().clear();
        Ok(())
    }

    fn close_window(&self, handle: &str) -> EngineResult<()> {
        let tab = self.tab_by_target(handle)?;
        tab.close(false)
            .map_err(|e| EngineError::Backend(format!("window close failed: {e}")))?;
        Ok(())
    }

    fn switch_to_frame(&self, target: &FrameTarget) -> EngineResult<()> {
        let win = self.window_expr();
        let segment = match target {
            FrameTarget::Top => {
                self.frame_path.write().clear();
                return Ok(());
            }
            FrameTarget::Index(index) => {
                let outcome = self.run_js(&format!(
                    "(function(){{ return JSON.stringify({{v: {win}.frames.length}}); }})()"
                ))?;
                let count = self
                    .decode_outcome(outcome, "frame")?
                    .as_u64()
                    .unwrap_or(0);
                if u64::from(*index) >= count {
                    return Err(EngineError::NoSuchFrame(format!("index {index}")));
                }
                format!(".frames[{index}]")
            }
            FrameTarget::Name(name) => {
                let name_js = js_string(name);
                let outcome = self.run_js(&format!(
                    "(function(){{ return JSON.stringify({{v: !!{win}.frames[{name_js}]}}); }})()"
                ))?;
                if self.decode_outcome(outcome, "frame")? != json!(true) {
                    return Err(EngineError::NoSuchFrame(name.clone()));
                }
                format!(".frames[{name_js}]")
            }
            FrameTarget::Element(element_id) => {
                // Resolve the iframe node to its index among the current
                // window's frames.
                let index = self.eval_on_element(
                    element_id,
                    &format!(
                        "var frames = {win}.frames;\
                         for (var i = 0; i < frames.length; i++)\
                           if (frames[i] === el.contentWindow) return i;\
                         return -1;"
                    ),
                )?;
                let index = index.as_i64().unwrap_or(-1);
                if index < 0 {
                    return Err(EngineError::NoSuchFrame(element_id.clone()));
                }
                format!(".frames[{index}]")
            }
        };
        self.frame_path.write().push(segment);
        Ok(())
    }

    fn switch_to_parent_frame(&self) -> EngineResult<()> {
        self.frame_path.write().pop();
        Ok(())
    }

    fn find_elements(&self, root: Option<&str>, locator: &Locator) -> EngineResult<Vec<String>> {
        if let Some(root_id) = root
            && !self.elements.read().contains_key(root_id)
        {
            return Err(EngineError::NoSuchElement(root_id.to_string()));
        }

        let win = self.window_expr();
        let root_js = match root {
            Some(id) => js_string(id),
            None => "null".to_string(),
        };
        let prefix = format!("wire-{}-", self.find_seq.fetch_add(1, Ordering::Relaxed));
        let prefix_js = js_string(&prefix);
        let collect = Self::locator_js(locator);

        let script = format!(
            "(function(){{\
             var reg = window.__wire_reg = window.__wire_reg || {{}};\
             var doc = {win}.document;\
             var rootId = {root_js};\
             var root = rootId === null ? doc : reg[rootId];\
             if (rootId !== null && !root) return JSON.stringify({{stale: true}});\
             if (rootId !== null && !root.isConnected) return JSON.stringify({{stale: true}});\
             var nodes = [];\
             try {{ {collect} }} catch (e) {{ return JSON.stringify({{badSelector: String(e)}}); }}\
             var out = [];\
             for (var i = 0; i < nodes.length; i++) {{\
               var id = {prefix_js} + i;\
               reg[id] = nodes[i];\
               out.push(id);\
             }}\
             return JSON.stringify({{v: out}});\
             }})()"
        );

        let outcome = self.run_js(&script)?;
        let ids = self.decode_outcome(outcome, root.unwrap_or("document"))?;
        let ids: Vec<String> = serde_json::from_value(ids)
            .map_err(|e| EngineError::Backend(format!("bad find result: {e}")))?;

        let mut elements = self.elements.write();
        for id in &ids {
            elements.insert(id.clone(), format!("{locator:?}"));
        }
        Ok(ids)
    }

    fn check_element(&self, element_id: &str) -> EngineResult<()> {
        self.eval_on_element(element_id, "return true;").map(|_| ())
    }

    fn click_element(&self, element_id: &str) -> EngineResult<()> {
        self.eval_on_element(
            element_id,
            "el.scrollIntoView({block: 'center'}); el.click(); return null;",
        )?;
        Ok(())
    }

    fn element_text(&self, element_id: &str) -> EngineResult<String> {
        let value = self.eval_on_element(element_id, "return el.innerText;")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn element_tag_name(&self, element_id: &str) -> EngineResult<String> {
        let value = self.eval_on_element(element_id, "return el.tagName.toLowerCase();")?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn element_attribute(&self, element_id: &str, name: &str) -> EngineResult<Option<String>> {
        let name_js = js_string(name);
        let value = self.eval_on_element(
            element_id,
            &format!(
                "var a = el.getAttribute({name_js});\
                 if (a === null && {name_js} in el) a = String(el[{name_js}]);\
                 return a;"
            ),
        )?;
        Ok(value.as_str().map(str::to_string))
    }

    fn element_send_keys(&self, element_id: &str, text: &str) -> EngineResult<()> {
        self.eval_on_element(element_id, "el.focus(); return null;")?;
        self.current_tab()?
            .type_str(text)
            .map_err(|e| EngineError::Backend(format!("typing failed: {e}")))?;
        Ok(())
    }

    fn element_clear(&self, element_id: &str) -> EngineResult<()> {
        self.eval_on_element(
            element_id,
            "el.value = ''; el.dispatchEvent(new Event('input', {bubbles: true})); return null;",
        )?;
        Ok(())
    }

    fn element_displayed(&self, element_id: &str) -> EngineResult<bool> {
        let value = self.eval_on_element(
            element_id,
            "var style = el.ownerDocument.defaultView.getComputedStyle(el);\
             return el.offsetParent !== null && style.visibility !== 'hidden';",
        )?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn element_enabled(&self, element_id: &str) -> EngineResult<bool> {
        let value = self.eval_on_element(element_id, "return !el.disabled;")?;
        Ok(value.as_bool().unwrap_or(true))
    }

    fn element_selected(&self, element_id: &str) -> EngineResult<bool> {
        let value = self.eval_on_element(element_id, "return !!(el.checked || el.selected);")?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn element_location(&self, element_id: &str) -> EngineResult<(f64, f64)> {
        let value = self.eval_on_element(
            element_id,
            "var rect = el.getBoundingClientRect(); return [rect.left, rect.top];",
        )?;
        let pair: Vec<f64> = serde_json::from_value(value)
            .map_err(|e| EngineError::Backend(format!("bad location result: {e}")))?;
        match pair.as_slice() {
            [x, y] => Ok((*x, *y)),
            _ => Err(EngineError::Backend("bad location result".into())),
        }
    }

    fn cookies(&self) -> EngineResult<Vec<Cookie>> {
        let outcome = self.run_js(
            "(function(){ return JSON.stringify({v: document.cookie}); })()",
        )?;
        let raw = self.decode_outcome(outcome, "cookies")?;
        let raw = raw.as_str().unwrap_or_default();

        let cookies = raw
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some(Cookie {
                    name: name.to_string(),
                    value: value.to_string(),
                    path: None,
                    domain: None,
                    secure: false,
                    http_only: false,
                    expiry: None,
                })
            })
            .collect();
        Ok(cookies)
    }

    fn add_cookie(&self, cookie: &Cookie) -> EngineResult<()> {
        let mut parts = vec![format!("{}={}", cookie.name, cookie.value)];
        parts.push(format!(
            "path={}",
            cookie.path.as_deref().unwrap_or("/")
        ));
        if let Some(domain) = &cookie.domain {
            parts.push(format!("domain={domain}"));
        }
        if let Some(expiry) = cookie.expiry {
            // Expiry arrives as absolute epoch seconds; document.cookie
            // wants a relative max-age.
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            parts.push(format!("max-age={}", expiry.saturating_sub(now)));
        }
        if cookie.secure {
            parts.push("secure".to_string());
        }
        let assignment = js_string(&parts.join("; "));
        let outcome = self.run_js(&format!(
            "(function(){{ document.cookie = {assignment}; return JSON.stringify({{v: null}}); }})()"
        ))?;
        self.decode_outcome(outcome, "add cookie")?;
        Ok(())
    }

    fn delete_cookie(&self, name: &str) -> EngineResult<()> {
        let expired = js_string(&format!(
            "{name}=; path=/; expires=Thu, 01 Jan 1970 00:00:00 GMT"
        ));
        let outcome = self.run_js(&format!(
            "(function(){{ document.cookie = {expired}; return JSON.stringify({{v: null}}); }})()"
        ))?;
        self.decode_outcome(outcome, "delete cookie")?;
        Ok(())
    }

    fn delete_all_cookies(&self) -> EngineResult<()> {
        for cookie in self.cookies()? {
            self.delete_cookie(&cookie.name)?;
        }
        Ok(())
    }

    fn dispatch_mouse(
        &self,
        kind: MouseEventKind,
        x: f64,
        y: f64,
        button: MouseButton,
    ) -> EngineResult<()> {
        let event_type = match kind {
            MouseEventKind::Move => "mousemove",
            MouseEventKind::Down => "mousedown",
            MouseEventKind::Up => "mouseup",
            MouseEventKind::Click => "click",
        };
        let button_code = match button {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
        };
        let win = self.window_expr();
        let script = format!(
            "(function(){{\
             var doc = {win}.document;\
             var el = doc.elementFromPoint({x}, {y}) || doc.body;\
             if (!el) return JSON.stringify({{v: null}});\
             if ('{event_type}' === 'click' && {button_code} === 0) {{ el.click(); }}\
             else {{ el.dispatchEvent(new MouseEvent('{event_type}',\
               {{bubbles: true, cancelable: true, clientX: {x}, clientY: {y}, button: {button_code}}})); }}\
             return JSON.stringify({{v: null}});\
             }})()"
        );
        let outcome = self.run_js(&script)?;
        self.decode_outcome(outcome, "mouse event")?;
        Ok(())
    }

    fn type_keys(&self, text: &str) -> EngineResult<()> {
        self.current_tab()?
            .type_str(text)
            .map_err(|e| EngineError::Backend(format!("typing failed: {e}")))?;
        Ok(())
    }

    fn alert_text(&self) -> EngineResult<String> {
        Err(EngineError::Unsupported(
            "alerts are auto-dismissed by the headless backend".into(),
        ))
    }

    fn accept_alert(&self) -> EngineResult<()> {
        Err(EngineError::Unsupported(
            "alerts are auto-dismissed by the headless backend".into(),
        ))
    }

    fn dismiss_alert(&self) -> EngineResult<()> {
        Err(EngineError::Unsupported(
            "alerts are auto-dismissed by the headless backend".into(),
        ))
    }
}
