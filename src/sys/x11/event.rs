// SPDX-License-Identifier: MPL-2.0
//! Decoded X protocol events, as delivered by an [`super::XConnection`].

pub type WindowId = u32;
pub type Atom = u32;

/// Modifier and group state carried by an XKB state notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub base_mods: u32,
    pub latched_mods: u32,
    pub locked_mods: u32,
    pub base_group: u32,
    pub latched_group: u32,
    pub locked_group: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XkbNotify {
    NewKeyboard,
    Map,
    State(ModifierState),
}

/// One event read from the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XEvent {
    KeyPress { window: WindowId, keycode: u8 },
    KeyRelease { window: WindowId, keycode: u8 },
    ButtonPress { window: WindowId, detail: u8 },
    ButtonRelease { window: WindowId, detail: u8 },
    Motion { window: WindowId, x: i16, y: i16 },
    Enter { window: WindowId },
    Leave { window: WindowId },
    FocusIn { window: WindowId },
    FocusOut { window: WindowId },
    Expose { window: WindowId },
    Map { window: WindowId },
    Unmap { window: WindowId },
    Configure { window: WindowId, x: i16, y: i16, width: u16, height: u16 },
    Reparent { window: WindowId },
    ClientMessage { window: WindowId, message_type: Atom, data: [u32; 5] },
    Property { window: WindowId, atom: Atom },
    /// A request failed; response type 0 on the wire.
    Error { code: u8, sequence: u16 },
    /// An event from the XKB extension.
    Xkb { device: i32, notify: XkbNotify },
    /// Anything else, by response type.
    Other { response_type: u8 },
}

impl XEvent {
    /// The window the event is addressed to, if any.
    pub fn window(&self) -> Option<WindowId> {
        match *self {
            XEvent::KeyPress { window, .. }
            | XEvent::KeyRelease { window, .. }
            | XEvent::ButtonPress { window, .. }
            | XEvent::ButtonRelease { window, .. }
            | XEvent::Motion { window, .. }
            | XEvent::Enter { window }
            | XEvent::Leave { window }
            | XEvent::FocusIn { window }
            | XEvent::FocusOut { window }
            | XEvent::Expose { window }
            | XEvent::Map { window }
            | XEvent::Unmap { window }
            | XEvent::Configure { window, .. }
            | XEvent::Reparent { window }
            | XEvent::ClientMessage { window, .. }
            | XEvent::Property { window, .. } => Some(window),
            XEvent::Error { .. } | XEvent::Xkb { .. } | XEvent::Other { .. } => None,
        }
    }
}

/// A core protocol error.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum X11Error {
    #[error("BadRequest")]
    BadRequest,
    #[error("BadValue")]
    BadValue,
    #[error("BadWindow")]
    BadWindow,
    #[error("BadPixmap")]
    BadPixmap,
    #[error("BadAtom")]
    BadAtom,
    #[error("BadCursor")]
    BadCursor,
    #[error("BadFont")]
    BadFont,
    #[error("BadMatch")]
    BadMatch,
    #[error("BadDrawable")]
    BadDrawable,
    #[error("BadAccess")]
    BadAccess,
    #[error("BadAlloc")]
    BadAlloc,
    #[error("BadColor")]
    BadColor,
    #[error("BadGC")]
    BadGC,
    #[error("BadIDChoice")]
    BadIdChoice,
    #[error("BadName")]
    BadName,
    #[error("BadLength")]
    BadLength,
    #[error("BadImplementation")]
    BadImplementation,
    #[error("ErrorCode({0})")]
    Other(u8),
}

impl X11Error {
    pub fn from_code(code: u8) -> X11Error {
        match code {
            1 => X11Error::BadRequest,
            2 => X11Error::BadValue,
            3 => X11Error::BadWindow,
            4 => X11Error::BadPixmap,
            5 => X11Error::BadAtom,
            6 => X11Error::BadCursor,
            7 => X11Error::BadFont,
            8 => X11Error::BadMatch,
            9 => X11Error::BadDrawable,
            10 => X11Error::BadAccess,
            11 => X11Error::BadAlloc,
            12 => X11Error::BadColor,
            13 => X11Error::BadGC,
            14 => X11Error::BadIdChoice,
            15 => X11Error::BadName,
            16 => X11Error::BadLength,
            17 => X11Error::BadImplementation,
            other => X11Error::Other(other),
        }
    }
}

#[cfg(test)] mod test {
    use super::*;

    #[test] fn error_names() {
        assert_eq!(X11Error::from_code(1).to_string(), "BadRequest");
        assert_eq!(X11Error::from_code(14).to_string(), "BadIDChoice");
        assert_eq!(X11Error::from_code(17).to_string(), "BadImplementation");
        assert_eq!(X11Error::from_code(0).to_string(), "ErrorCode(0)");
        assert_eq!(X11Error::from_code(130).to_string(), "ErrorCode(130)");
    }

    #[test] fn addressed_window() {
        assert_eq!(XEvent::Expose { window: 7 }.window(), Some(7));
        assert_eq!(XEvent::Error { code: 3, sequence: 1 }.window(), None);
    }
}
