// SPDX-License-Identifier: MPL-2.0

//! Keyboard state tracking.
//!
//! Each window owns a [`KeyboardWatcher`], updated by the platform event pump as key events are
//! decoded.  The watcher remembers the state of every key it has seen, both by [`key::Key`] and
//! by the platform's raw key code, so that:
//!
//! 1. duplicate notifications (key repeat, noisy platforms) produce no duplicate events, and
//! 2. on focus loss every key still held can be released exactly once.
//!
//! # Example
//!
//! ```
//! use gl_window::input::keyboard::{KeyboardWatcher, KeyState, key::Key};
//!
//! let mut watcher = KeyboardWatcher::new();
//! assert!(watcher.update(Key::A, 38, KeyState::Down));
//! // the same state again is not a change
//! assert!(!watcher.update(Key::A, 38, KeyState::Down));
//! assert_eq!(watcher.state(Key::A), KeyState::Down);
//!
//! let released = watcher.release_all();
//! assert_eq!(released, vec![(Key::A, 38)]);
//! assert_eq!(watcher.state(Key::A), KeyState::Up);
//! ```

use std::collections::HashMap;

/// Keyboard key definitions.
pub mod key;

use key::Key;

/// The state of a single key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum KeyState {
    /// Held down.
    Down,
    /// Released.  Keys never seen are up.
    #[default]
    Up,
    /// A lock key whose indicator is lit.
    On,
    /// A lock key whose indicator is dark.
    Off,
}

impl std::fmt::Display for KeyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KeyState::Down => "down",
            KeyState::Up => "up",
            KeyState::On => "on",
            KeyState::Off => "off",
        };
        f.write_str(s)
    }
}

/// Tracks which keys are held for one window.
///
/// Raw code `0` means "no raw code"; [`Key::Invalid`] means "no name".
#[derive(Debug, Default, Clone)]
pub struct KeyboardWatcher {
    keys: HashMap<Key, KeyState>,
    raw: HashMap<u64, (Key, KeyState)>,
}

impl KeyboardWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: Key) -> KeyState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    pub fn raw_state(&self, raw: u64) -> KeyState {
        self.raw.get(&raw).map(|(_, s)| *s).unwrap_or_default()
    }

    /// Records `state` for the key and its raw code.
    ///
    /// Returns `false` (and records nothing) when both are already in `state`.
    pub fn update(&mut self, key: Key, raw: u64, state: KeyState) -> bool {
        let key_same = key == Key::Invalid || self.state(key) == state;
        let raw_same = raw == 0 || self.raw_state(raw) == state;
        if key_same && raw_same {
            return false;
        }
        if key != Key::Invalid {
            self.keys.insert(key, state);
        }
        if raw != 0 {
            self.raw.insert(raw, (key, state));
        } else if key != Key::Invalid {
            //a report without a raw code still speaks for the codes this key was seen with
            for (raw_key, raw_state) in self.raw.values_mut() {
                if *raw_key == key {
                    *raw_state = state;
                }
            }
        }
        logwise::debuginternal_sync!(
            "Key {key} raw {raw} is now {state}",
            key = logwise::privacy::LogIt(&key),
            raw = raw,
            state = logwise::privacy::LogIt(&state)
        );
        true
    }

    /// Marks every held key as up.
    ///
    /// Returns one `(key, raw)` pair per key that was down.  A key seen with a raw code appears
    /// once, with that code; a key only ever seen without one appears with raw `0`.
    pub fn release_all(&mut self) -> Vec<(Key, u64)> {
        let KeyboardWatcher { keys, raw } = self;
        let mut released = Vec::new();
        for (code, (key, state)) in raw.iter_mut() {
            if *state != KeyState::Down {
                continue;
            }
            *state = KeyState::Up;
            if let Some(key_state) = keys.get_mut(key) {
                *key_state = KeyState::Up;
            }
            released.push((*key, *code));
        }
        for (key, state) in keys.iter_mut() {
            if *state == KeyState::Down {
                *state = KeyState::Up;
                released.push((*key, 0));
            }
        }
        released
    }

    /// Keys currently down.
    pub fn down_keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.keys
            .iter()
            .filter(|(_, s)| **s == KeyState::Down)
            .map(|(k, _)| *k)
    }
}
