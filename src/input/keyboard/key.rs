// SPDX-License-Identifier: MPL-2.0
/// A key on the keyboard.
///
/// Variants name *physical* keys, independent of layout.  The `A` variant is the key labelled
/// 'A' on a US layout no matter which character it types.  Platform pumps translate X11 keysyms
/// and Win32 virtual-key codes into this enum; anything they cannot name becomes
/// [`Key::Invalid`] and is tracked by its raw code instead.
///
/// # Examples
///
/// ```
/// use gl_window::input::keyboard::key::Key;
///
/// assert!(Key::CapsLock.is_lock());
/// assert!(!Key::A.is_lock());
/// assert!(Key::RightShift.is_modifier());
/// ```
#[derive(Debug, Hash, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Key {
    /// A key with no name; see the raw code on the event.
    Invalid,

    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,

    F1, F2, F3, F4, F5, F6, F7, F8, F9, F10, F11, F12,
    F13, F14, F15, F16, F17, F18, F19, F20, F21, F22, F23, F24,

    Escape,
    Tab,
    Return,
    Space,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    LeftAlt,
    RightAlt,
    LeftSuper,
    RightSuper,

    CapsLock,
    NumLock,
    ScrollLock,

    PrintScreen,
    Pause,
    Menu,

    Grave,
    Minus,
    Equals,
    LeftBracket,
    RightBracket,
    BackSlash,
    Semicolon,
    Apostrophe,
    Comma,
    Period,
    Slash,

    Keypad0, Keypad1, Keypad2, Keypad3, Keypad4,
    Keypad5, Keypad6, Keypad7, Keypad8, Keypad9,
    KeypadDecimal,
    KeypadDivide,
    KeypadMultiply,
    KeypadSubtract,
    KeypadAdd,
    KeypadEnter,
    KeypadEquals,
}

impl Key {
    /// Lock keys report [`super::KeyState::On`]/[`super::KeyState::Off`] instead of up and down.
    pub const fn is_lock(self) -> bool {
        matches!(self, Key::CapsLock | Key::NumLock | Key::ScrollLock)
    }

    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::LeftShift
                | Key::RightShift
                | Key::LeftCtrl
                | Key::RightCtrl
                | Key::LeftAlt
                | Key::RightAlt
                | Key::LeftSuper
                | Key::RightSuper
        )
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
