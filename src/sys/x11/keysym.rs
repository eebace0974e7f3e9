// SPDX-License-Identifier: MPL-2.0
//! X keysym translation.
use crate::input::keyboard::key::Key;

pub type Keysym = u32;

pub const XK_CAPS_LOCK: Keysym = 0xffe5;
pub const XK_NUM_LOCK: Keysym = 0xff7f;
pub const XK_SCROLL_LOCK: Keysym = 0xff14;

const XK_F1: Keysym = 0xffbe;
const XK_F24: Keysym = 0xffd5;
const XK_KP_0: Keysym = 0xffb0;
const XK_KP_9: Keysym = 0xffb9;

const F_KEYS: [Key; 24] = [
    Key::F1, Key::F2, Key::F3, Key::F4, Key::F5, Key::F6, Key::F7, Key::F8,
    Key::F9, Key::F10, Key::F11, Key::F12, Key::F13, Key::F14, Key::F15, Key::F16,
    Key::F17, Key::F18, Key::F19, Key::F20, Key::F21, Key::F22, Key::F23, Key::F24,
];

const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
    Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
    Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
];

const DIGITS: [Key; 10] = [
    Key::Num0, Key::Num1, Key::Num2, Key::Num3, Key::Num4,
    Key::Num5, Key::Num6, Key::Num7, Key::Num8, Key::Num9,
];

const KEYPAD: [Key; 10] = [
    Key::Keypad0, Key::Keypad1, Key::Keypad2, Key::Keypad3, Key::Keypad4,
    Key::Keypad5, Key::Keypad6, Key::Keypad7, Key::Keypad8, Key::Keypad9,
];

/**
Maps a keysym to the physical key that produces it on a US layout.

Shifted symbols map to their unshifted key (`'!'` is [`Key::Num1`]).  Unknown keysyms are
[`Key::Invalid`].
*/
pub fn to_key(keysym: Keysym) -> Key {
    match keysym {
        0x61..=0x7a => LETTERS[(keysym - 0x61) as usize],
        0x41..=0x5a => LETTERS[(keysym - 0x41) as usize],
        0x30..=0x39 => DIGITS[(keysym - 0x30) as usize],
        XK_F1..=XK_F24 => F_KEYS[(keysym - XK_F1) as usize],
        XK_KP_0..=XK_KP_9 => KEYPAD[(keysym - XK_KP_0) as usize],

        0x29 => Key::Num0, // parenright
        0x21 => Key::Num1, // exclam
        0x40 => Key::Num2, // at
        0x23 => Key::Num3, // numbersign
        0x24 => Key::Num4, // dollar
        0x25 => Key::Num5, // percent
        0x5e => Key::Num6, // asciicircum
        0x26 => Key::Num7, // ampersand
        0x2a => Key::Num8, // asterisk
        0x28 => Key::Num9, // parenleft

        0xff1b => Key::Escape,
        0xff09 | 0xfe20 => Key::Tab,
        0xff0d | 0xff0a => Key::Return,
        0x20 => Key::Space,
        0xff08 => Key::Backspace,
        0xffff => Key::Delete,
        0xff63 => Key::Insert,
        0xff50 => Key::Home,
        0xff57 => Key::End,
        0xff55 => Key::PageUp,
        0xff56 => Key::PageDown,
        0xff52 => Key::ArrowUp,
        0xff54 => Key::ArrowDown,
        0xff51 => Key::ArrowLeft,
        0xff53 => Key::ArrowRight,

        0xffe1 => Key::LeftShift,
        0xffe2 => Key::RightShift,
        0xffe3 => Key::LeftCtrl,
        0xffe4 => Key::RightCtrl,
        0xffe9 => Key::LeftAlt,
        0xffea | 0xfe03 => Key::RightAlt,
        0xffeb => Key::LeftSuper,
        0xffec => Key::RightSuper,

        XK_CAPS_LOCK => Key::CapsLock,
        XK_NUM_LOCK => Key::NumLock,
        XK_SCROLL_LOCK => Key::ScrollLock,
        0xff61 | 0xfd1d => Key::PrintScreen,
        0xff13 => Key::Pause,
        0xff67 => Key::Menu,

        0x60 | 0x7e => Key::Grave,
        0x2d | 0x5f => Key::Minus,
        0x3d | 0x2b => Key::Equals,
        0x5b | 0x7b => Key::LeftBracket,
        0x5d | 0x7d => Key::RightBracket,
        0x5c | 0x7c => Key::BackSlash,
        0x3b | 0x3a => Key::Semicolon,
        0x27 | 0x22 => Key::Apostrophe,
        0x2c | 0x3c => Key::Comma,
        0x2e | 0x3e => Key::Period,
        0x2f | 0x3f => Key::Slash,

        0xffae | 0xff9f => Key::KeypadDecimal,
        0xffaf => Key::KeypadDivide,
        0xffaa => Key::KeypadMultiply,
        0xffad => Key::KeypadSubtract,
        0xffab => Key::KeypadAdd,
        0xff8d => Key::KeypadEnter,
        0xffbd => Key::KeypadEquals,

        _ => Key::Invalid,
    }
}

/// Whether a character produced by a key press should be delivered as typed text.
pub fn is_typed(character: char) -> bool {
    !matches!(character, '\0' | '\u{1b}' | '\u{7f}')
}

#[cfg(test)] mod test {
    use super::*;

    #[test] fn ranges() {
        assert_eq!(to_key(0x61), Key::A);
        assert_eq!(to_key(0x5a), Key::Z);
        assert_eq!(to_key(0x37), Key::Num7);
        assert_eq!(to_key(XK_F1), Key::F1);
        assert_eq!(to_key(XK_F24), Key::F24);
        assert_eq!(to_key(XK_KP_9), Key::Keypad9);
        assert_eq!(to_key(0x1008ff13), Key::Invalid);
    }

    #[test] fn shifted_symbols() {
        assert_eq!(to_key(0x21), Key::Num1);
        assert_eq!(to_key(0x7c), Key::BackSlash);
        assert_eq!(to_key(0xfe20), Key::Tab);
    }

    #[test] fn locks() {
        assert!(to_key(XK_CAPS_LOCK).is_lock());
        assert!(to_key(XK_NUM_LOCK).is_lock());
        assert!(to_key(XK_SCROLL_LOCK).is_lock());
    }

    #[test] fn typed_filter() {
        assert!(is_typed('a'));
        assert!(!is_typed('\u{1b}'));
        assert!(!is_typed('\u{7f}'));
        assert!(!is_typed('\0'));
    }
}
