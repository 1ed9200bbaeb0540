//! Session state and the single-slot session registry.

pub mod input;

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::engine::FrameTarget;
use crate::error::{WireError, WireResult};

pub use input::InputState;

/// Implicit-wait / page-load / script timeouts, in milliseconds. Defaults
/// follow the wire protocol: no implicit wait, five minutes for page
/// loads, thirty seconds for scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub implicit_ms: u64,
    pub page_load_ms: u64,
    pub script_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            implicit_ms: 0,
            page_load_ms: 300_000,
            script_ms: 30_000,
        }
    }
}

impl Timeouts {
    /// Set a timeout by its wire name. Accepts the legacy `type` values
    /// ("implicit", "page load", "script") and the W3C-style key spellings.
    pub fn set(&mut self, kind: &str, ms: u64) -> bool {
        match kind {
            "implicit" => self.implicit_ms = ms,
            "page load" | "pageLoad" => self.page_load_ms = ms,
            "script" => self.script_ms = ms,
            _ => return false,
        }
        true
    }

    pub fn implicit(&self) -> Duration {
        Duration::from_millis(self.implicit_ms)
    }

    pub fn page_load(&self) -> Duration {
        Duration::from_millis(self.page_load_ms)
    }

    pub fn script(&self) -> Duration {
        Duration::from_millis(self.script_ms)
    }
}

/// State of one automation session. Created by the session-manager
/// handler, read and mutated by every per-session command.
pub struct Session {
    id: String,
    capabilities: Value,
    timeouts: RwLock<Timeouts>,
    current_window: RwLock<String>,
    frame_path: RwLock<Vec<FrameTarget>>,
    input: Mutex<InputState>,
    // Serializes engine-driving commands: at most one in flight per
    // session, later arrivals queue behind it.
    command_lock: Mutex<()>,
}

impl Session {
    pub fn new(capabilities: Value, current_window: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            capabilities,
            timeouts: RwLock::new(Timeouts::default()),
            current_window: RwLock::new(current_window),
            frame_path: RwLock::new(Vec::new()),
            input: Mutex::new(InputState::default()),
            command_lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    pub fn timeouts(&self) -> Timeouts {
        *self.timeouts.read()
    }

    pub fn set_timeout(&self, kind: &str, ms: u64) -> bool {
        self.timeouts.write().set(kind, ms)
    }

    pub fn current_window(&self) -> String {
        self.current_window.read().clone()
    }

    pub fn set_current_window(&self, handle: String) {
        *self.current_window.write() = handle;
    }

    pub fn frame_depth(&self) -> usize {
        self.frame_path.read().len()
    }

    pub fn push_frame(&self, target: FrameTarget) {
        self.frame_path.write().push(target);
    }

    pub fn pop_frame(&self) -> Option<FrameTarget> {
        self.frame_path.write().pop()
    }

    /// Back to the top-level browsing context. Called on every navigation.
    pub fn reset_frames(&self) {
        self.frame_path.write().clear();
    }

    pub fn with_input<R>(&self, f: impl FnOnce(&mut InputState) -> R) -> R {
        f(&mut self.input.lock())
    }

    /// Hold for the duration of an engine-driving command.
    pub fn command_guard(&self) -> MutexGuard<'_, ()> {
        self.command_lock.lock()
    }
}

/// Where the one live session lives. The process deliberately supports a
/// single concurrent session; a second create is rejected rather than
/// silently doubling up.
#[derive(Default)]
pub struct SessionRegistry {
    slot: RwLock<Option<Arc<Session>>>,
}

impl SessionRegistry {
    pub fn create(&self, capabilities: Value, current_window: String) -> WireResult<Arc<Session>> {
        let mut slot = self.slot.write();
        if let Some(existing) = slot.as_ref() {
            return Err(WireError::SessionNotCreated(format!(
                "session {} is still active; one session per process",
                existing.id()
            )));
        }
        let session = Arc::new(Session::new(capabilities, current_window));
        *slot = Some(session.clone());
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.slot
            .read()
            .as_ref()
            .filter(|s| s.id() == id)
            .cloned()
    }

    /// Resolve a session by path parameter. This check always runs before
    /// any other validation so that a dead session id wins over a
    /// malformed body.
    pub fn require(&self, id: &str) -> WireResult<Arc<Session>> {
        self.get(id)
            .ok_or_else(|| WireError::NoSuchSession(id.to_string()))
    }

    pub fn active(&self) -> Option<Arc<Session>> {
        self.slot.read().clone()
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let mut slot = self.slot.write();
        if slot.as_ref().is_some_and(|s| s.id() == id) {
            slot.take()
        } else {
            None
        }
    }

    /// Drop whatever session is live, if any. Used by shutdown.
    pub fn clear(&self) -> Option<Arc<Session>> {
        self.slot.write().take()
    }
}
