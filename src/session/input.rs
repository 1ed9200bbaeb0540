//! Tracked keyboard/pointer state.
//!
//! WebDriver clients build gestures out of several commands (press
//! modifier, move, click, release); the session keeps the state between
//! those commands so each synthesized event carries the right modifier
//! bits and coordinates.

use crate::engine::MouseButton;

// Key codepoints from the wire protocol's typing alphabet.
pub const KEY_NULL: char = '\u{E000}';
pub const KEY_SHIFT: char = '\u{E008}';
pub const KEY_CONTROL: char = '\u{E009}';
pub const KEY_ALT: char = '\u{E00A}';
pub const KEY_META: char = '\u{E03D}';

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct InputState {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub meta: bool,
    pub pointer_x: f64,
    pub pointer_y: f64,
    pub button_down: Option<MouseButton>,
}

impl InputState {
    /// Update modifier state from a key sequence. A modifier codepoint
    /// toggles its key (sticky across commands); the NULL codepoint
    /// releases everything held.
    pub fn scan_keys(&mut self, text: &str) {
        for c in text.chars() {
            match c {
                KEY_NULL => {
                    self.shift = false;
                    self.control = false;
                    self.alt = false;
                    self.meta = false;
                }
                KEY_SHIFT => self.shift = !self.shift,
                KEY_CONTROL => self.control = !self.control,
                KEY_ALT => self.alt = !self.alt,
                KEY_META => self.meta = !self.meta,
                _ => {}
            }
        }
    }

    /// Modifier bitmask in DevTools ordering: alt=1, ctrl=2, meta=4,
    /// shift=8.
    pub fn modifier_bits(&self) -> u32 {
        let mut bits = 0;
        if self.alt {
            bits |= 1;
        }
        if self.control {
            bits |= 2;
        }
        if self.meta {
            bits |= 4;
        }
        if self.shift {
            bits |= 8;
        }
        bits
    }

    pub fn move_pointer(&mut self, x: f64, y: f64) {
        self.pointer_x = x;
        self.pointer_y = y;
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.button_down = Some(button);
    }

    /// Release the held button, reporting which one was down. Falls back
    /// to left when no press was tracked.
    pub fn release_button(&mut self) -> MouseButton {
        self.button_down.take().unwrap_or(MouseButton::Left)
    }

    pub fn reset(&mut self) {
        *self = InputState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_toggle() {
        let mut state = InputState::default();
        state.scan_keys(&format!("{KEY_SHIFT}abc"));
        assert!(state.shift);
        assert_eq!(state.modifier_bits(), 8);

        // Second occurrence releases.
        state.scan_keys(&KEY_SHIFT.to_string());
        assert!(!state.shift);
        assert_eq!(state.modifier_bits(), 0);
    }

    #[test]
    fn test_null_releases_all() {
        let mut state = InputState::default();
        state.scan_keys(&format!("{KEY_SHIFT}{KEY_CONTROL}{KEY_ALT}{KEY_META}"));
        assert_eq!(state.modifier_bits(), 1 | 2 | 4 | 8);

        state.scan_keys(&KEY_NULL.to_string());
        assert_eq!(state.modifier_bits(), 0);
    }

    #[test]
    fn test_plain_text_leaves_modifiers_alone() {
        let mut state = InputState::default();
        state.scan_keys("hello, world");
        assert_eq!(state.modifier_bits(), 0);
    }

    #[test]
    fn test_pointer_tracking() {
        let mut state = InputState::default();
        state.move_pointer(120.0, 40.5);
        assert_eq!((state.pointer_x, state.pointer_y), (120.0, 40.5));

        state.press_button(MouseButton::Right);
        assert_eq!(state.release_button(), MouseButton::Right);
        assert_eq!(state.release_button(), MouseButton::Left);
    }

    #[test]
    fn test_reset() {
        let mut state = InputState::default();
        state.scan_keys(&KEY_SHIFT.to_string());
        state.move_pointer(5.0, 5.0);
        state.reset();
        assert_eq!(state, InputState::default());
    }
}
