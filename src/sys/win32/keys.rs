// SPDX-License-Identifier: MPL-2.0
//! Virtual-key translation.
use crate::input::keyboard::key::Key;

pub type VirtualKey = u32;

pub const VK_RETURN: VirtualKey = 0x0d;
pub const VK_SHIFT: VirtualKey = 0x10;
pub const VK_CONTROL: VirtualKey = 0x11;
pub const VK_MENU: VirtualKey = 0x12;
pub const VK_CAPITAL: VirtualKey = 0x14;
pub const VK_F4: VirtualKey = 0x73;
pub const VK_NUMLOCK: VirtualKey = 0x90;
pub const VK_SCROLL: VirtualKey = 0x91;
pub const VK_LSHIFT: VirtualKey = 0xa0;
pub const VK_RSHIFT: VirtualKey = 0xa1;
pub const VK_LCONTROL: VirtualKey = 0xa2;
pub const VK_RCONTROL: VirtualKey = 0xa3;
pub const VK_LMENU: VirtualKey = 0xa4;
pub const VK_RMENU: VirtualKey = 0xa5;

const VK_F1: VirtualKey = 0x70;
const VK_F24: VirtualKey = 0x87;
const VK_NUMPAD0: VirtualKey = 0x60;
const VK_NUMPAD9: VirtualKey = 0x69;

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
Maps a virtual key to a [`Key`].

`extended` is bit 24 of the key message's `lParam`; it tells the keypad Enter from the main one.
The generic modifier codes (`VK_SHIFT`, `VK_CONTROL`, `VK_MENU`) map to the left variant.
*/
pub fn to_key(vk: VirtualKey, extended: bool) -> Key {
    match vk {
        0x41..=0x5a => LETTERS[(vk - 0x41) as usize],
        0x30..=0x39 => DIGITS[(vk - 0x30) as usize],
        VK_F1..=VK_F24 => F_KEYS[(vk - VK_F1) as usize],
        VK_NUMPAD0..=VK_NUMPAD9 => KEYPAD[(vk - VK_NUMPAD0) as usize],

        0x08 => Key::Backspace,
        0x09 => Key::Tab,
        VK_RETURN if extended => Key::KeypadEnter,
        VK_RETURN => Key::Return,
        0x13 => Key::Pause,
        0x1b => Key::Escape,
        0x20 => Key::Space,
        0x21 => Key::PageUp,
        0x22 => Key::PageDown,
        0x23 => Key::End,
        0x24 => Key::Home,
        0x25 => Key::ArrowLeft,
        0x26 => Key::ArrowUp,
        0x27 => Key::ArrowRight,
        0x28 => Key::ArrowDown,
        0x2c => Key::PrintScreen,
        0x2d => Key::Insert,
        0x2e => Key::Delete,

        0x5b => Key::LeftSuper,
        0x5c => Key::RightSuper,
        0x5d => Key::Menu,

        0x6a => Key::KeypadMultiply,
        0x6b => Key::KeypadAdd,
        0x6d => Key::KeypadSubtract,
        0x6e => Key::KeypadDecimal,
        0x6f => Key::KeypadDivide,

        VK_SHIFT | VK_LSHIFT => Key::LeftShift,
        VK_RSHIFT => Key::RightShift,
        VK_CONTROL | VK_LCONTROL => Key::LeftCtrl,
        VK_RCONTROL => Key::RightCtrl,
        VK_MENU | VK_LMENU => Key::LeftAlt,
        VK_RMENU => Key::RightAlt,

        VK_CAPITAL => Key::CapsLock,
        VK_NUMLOCK => Key::NumLock,
        VK_SCROLL => Key::ScrollLock,

        0xba => Key::Semicolon,
        0xbb => Key::Equals,
        0xbc => Key::Comma,
        0xbd => Key::Minus,
        0xbe => Key::Period,
        0xbf => Key::Slash,
        0xc0 => Key::Grave,
        0xdb => Key::LeftBracket,
        0xdc | 0xe2 => Key::BackSlash,
        0xdd => Key::RightBracket,
        0xde => Key::Apostrophe,

        _ => Key::Invalid,
    }
}
