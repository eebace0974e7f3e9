// SPDX-License-Identifier: MPL-2.0
/*!
Events delivered to window subscribers.

Every event is an immutable value stamped with the instant it was produced.  New kinds may be
added over time, so `match` on [`EventKind`] must keep a wildcard arm.

```
use gl_window::event::{Event, EventKind};
use gl_window::coordinates::Size;

let event = Event::new(EventKind::Resized(Size::new(800, 600)));
match event.kind {
    EventKind::Resized(size) => assert_eq!(size.width(), 800),
    _ => {}
}
```
*/
use std::fmt::Display;
use std::time::Instant;

use crate::coordinates::{Position, Size};
use crate::input::keyboard::KeyState;
use crate::input::keyboard::key::Key;
use crate::input::mouse::{Button, ButtonState};
use crate::screen::Screen;

/// A rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub min: Position,
    pub max: Position,
}

impl Rect {
    pub const fn new(min: Position, max: Position) -> Rect {
        Rect { min, max }
    }

    /// True when `max` is not strictly below and right of `min`.
    pub const fn is_empty(&self) -> bool {
        self.max.x() <= self.min.x() || self.max.y() <= self.min.y()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: Instant,
    pub kind: EventKind,
}

impl Event {
    pub fn new(kind: EventKind) -> Event {
        Event { time: Instant::now(), kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum EventKind {
    /// The window's client area changed size.
    Resized(Size),
    /// The window moved.
    Moved(Position),
    Focused(bool),
    /**
    The cursor moved.

    Absolute window coordinates normally.  While the cursor is grabbed the values are a
    relative delta since the last report.
    */
    CursorPosition { x: f64, y: f64 },
    CursorWithin(bool),
    Minimized(bool),
    Maximized(bool),
    /// The user asked to close the window.  Nothing is closed until the application acts.
    Close,
    Destroyed,
    /// A region needs repainting.
    Paint(Rect),
    /// The window moved onto a different screen.
    ScreenChanged(Screen),
    KeyboardState { key: Key, raw: u64, state: KeyState },
    KeyboardTyped(char),
    MouseButton { button: Button, state: ButtonState },
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Resized(s) => write!(f, "Resized({s})"),
            EventKind::Moved(p) => write!(f, "Moved{p}"),
            EventKind::Focused(b) => write!(f, "Focused({b})"),
            EventKind::CursorPosition { x, y } => write!(f, "CursorPosition({x}, {y})"),
            EventKind::CursorWithin(b) => write!(f, "CursorWithin({b})"),
            EventKind::Minimized(b) => write!(f, "Minimized({b})"),
            EventKind::Maximized(b) => write!(f, "Maximized({b})"),
            EventKind::Close => f.write_str("Close"),
            EventKind::Destroyed => f.write_str("Destroyed"),
            EventKind::Paint(r) => write!(f, "Paint({}, {})", r.min, r.max),
            EventKind::ScreenChanged(s) => write!(f, "ScreenChanged({s})"),
            EventKind::KeyboardState { key, raw, state } => {
                write!(f, "KeyboardState({key}, raw={raw}, {state})")
            }
            EventKind::KeyboardTyped(c) => write!(f, "KeyboardTyped({c:?})"),
            EventKind::MouseButton { button, state } => write!(f, "MouseButton({button:?}, {state})"),
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}
