// SPDX-License-Identifier: MPL-2.0
//! Mouse buttons and the per-window mouse watcher.
use std::collections::HashMap;

/// A mouse button.
///
/// Platforms disagree on numbering; the pumps translate into these names.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Button {
    Left,
    Right,
    /// The middle button, usually the scroll wheel.
    Wheel,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

/// What happened to a button.
///
/// Scroll states are momentary: they are delivered as events but never held.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ButtonState {
    Down,
    #[default]
    Up,
    ScrollForward,
    ScrollBack,
    ScrollLeft,
    ScrollRight,
}

impl ButtonState {
    pub const fn is_scroll(self) -> bool {
        matches!(
            self,
            ButtonState::ScrollForward
                | ButtonState::ScrollBack
                | ButtonState::ScrollLeft
                | ButtonState::ScrollRight
        )
    }
}

impl std::fmt::Display for ButtonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Tracks which buttons are held for one window.
#[derive(Debug, Default, Clone)]
pub struct MouseWatcher {
    buttons: HashMap<Button, ButtonState>,
}

impl MouseWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, button: Button) -> ButtonState {
        self.buttons.get(&button).copied().unwrap_or_default()
    }

    /**
    Records a button transition.

    Returns whether an event should be delivered: scroll states always are, and a `Down` or
    `Up` only when it differs from the held state.
    */
    pub fn update(&mut self, button: Button, state: ButtonState) -> bool {
        if state.is_scroll() {
            return true;
        }
        if self.state(button) == state {
            return false;
        }
        self.buttons.insert(button, state);
        true
    }

    /// Marks every held button as up, returning the ones that were down.
    pub fn release_all(&mut self) -> Vec<Button> {
        let mut released = Vec::new();
        for (button, state) in self.buttons.iter_mut() {
            if *state == ButtonState::Down {
                *state = ButtonState::Up;
                released.push(*button);
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_is_not_held() {
        let mut m = MouseWatcher::new();
        assert!(m.update(Button::Wheel, ButtonState::ScrollForward));
        assert!(m.update(Button::Wheel, ButtonState::ScrollForward));
        assert_eq!(m.state(Button::Wheel), ButtonState::Up);
        assert!(m.release_all().is_empty());
    }

    #[test]
    fn duplicate_press_is_ignored() {
        let mut m = MouseWatcher::new();
        assert!(m.update(Button::Left, ButtonState::Down));
        assert!(!m.update(Button::Left, ButtonState::Down));
        assert_eq!(m.release_all(), vec![Button::Left]);
        assert!(!m.update(Button::Left, ButtonState::Up));
    }
}
