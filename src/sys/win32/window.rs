// SPDX-License-Identifier: MPL-2.0
//! The Win32 native window and its window procedure.
use std::num::NonZeroIsize;
use std::sync::atomic::{AtomicBool, AtomicIsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use raw_window_handle::{RawWindowHandle, Win32WindowHandle};

use super::keys::{self, VK_CAPITAL, VK_CONTROL, VK_F4, VK_LCONTROL, VK_LMENU, VK_LSHIFT, VK_MENU, VK_NUMLOCK, VK_RCONTROL, VK_RMENU, VK_RSHIFT, VK_SCROLL, VK_SHIFT};
use super::*;
use crate::backend::NativeWindow;
use crate::coordinates::{Extents, Position, Size};
use crate::cursor::{Cursor, Icon, ResourceCache};
use crate::event::Rect;
use crate::gl::{GLConfig, GLContextFlags, GlError, NativeContextId, VSyncMode, version_supported};
use crate::input::keyboard::KeyState;
use crate::input::keyboard::key::Key;
use crate::input::mouse::{Button, ButtonState};
use crate::screen::Screen;
use crate::window::{WeakWindow, Window, WindowError};

const REPEAT_BIT: isize = 0x4000_0000;
const EXTENDED_BIT: isize = 0x0100_0000;
const NOTIFY_FLASHES: u32 = 3;

#[derive(Default)]
struct Cursors {
    realized: ResourceCache<usize>,
    arrow: Option<usize>,
    //the handle last given to SetCursor for the window's cursor
    loaded: Option<usize>,
}

/**
One Win32 window.

Everything here runs on the dispatcher thread: the native setters, and the window procedure
through the pump's drain.
*/
pub struct Win32Window<A: Win32Api> {
    me: Weak<Win32Window<A>>,
    shared: Arc<Shared<A>>,
    window: WeakWindow,
    hwnd: AtomicIsize,
    extents: Mutex<Extents>,
    pixel_format: Mutex<Option<u64>>,
    pixel_format_set: AtomicBool,
    double_buffered: AtomicBool,
    //clip rectangle to restore when the grab ends
    saved_clip: Mutex<Option<RectL>>,
    last_sizing: Mutex<RectL>,
    cursors: Mutex<Cursors>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn key_state(down: bool) -> KeyState {
    if down { KeyState::Down } else { KeyState::Up }
}

fn toggle_state(on: bool) -> KeyState {
    if on { KeyState::On } else { KeyState::Off }
}

/// Track sizes for `WM_GETMINMAXINFO`: client limits grown by the frame, then fitted to the ratio.
pub(crate) fn track_sizes(min: Size, max: Size, extents: Extents, ratio: f32) -> MinMaxInfo {
    let mut min_w = min.width() + extents.horizontal();
    let mut max_w = max.width() + extents.horizontal();
    let mut min_h = min.height() + extents.vertical();
    let mut max_h = max.height() + extents.vertical();
    if ratio != 0.0 {
        if ratio > 1.0 {
            min_w = (ratio * min_h as f32) as i32;
            max_w = (ratio * max_h as f32) as i32;
        } else {
            min_h = ((1.0 / ratio) * min_w as f32) as i32;
            max_h = ((1.0 / ratio) * max_w as f32) as i32;
        }
    }
    //zero means unlimited
    MinMaxInfo {
        min_track: ((min.width() > 0).then_some(min_w), (min.height() > 0).then_some(min_h)),
        max_track: ((max.width() > 0).then_some(max_w), (max.height() > 0).then_some(max_h)),
    }
}

/// Corrects a rectangle being dragged by `edge` so it keeps `ratio`.
pub(crate) fn fit_sizing(rect: RectL, edge: usize, ratio: f32) -> RectL {
    let width = rect.right - rect.left;
    let height = rect.bottom - rect.top;
    let new_height = ((1.0 / ratio) * width as f32) as i32;
    let new_width = (ratio * height as f32) as i32;
    let mut fitted = rect;
    match edge {
        WMSZ_LEFT | WMSZ_RIGHT | WMSZ_BOTTOMLEFT | WMSZ_BOTTOMRIGHT => fitted.bottom = rect.top + new_height,
        WMSZ_TOP | WMSZ_BOTTOM => fitted.right = rect.left + new_width,
        WMSZ_TOPLEFT | WMSZ_TOPRIGHT => fitted.top = rect.bottom - new_height,
        _ => {}
    }
    fitted
}

impl<A: Win32Api> Win32Window<A> {
    pub(crate) fn new(shared: Arc<Shared<A>>, window: WeakWindow) -> Arc<Self> {
        Arc::new_cyclic(|me| Win32Window {
            me: me.clone(),
            shared,
            window,
            hwnd: AtomicIsize::new(0),
            extents: Mutex::new(Extents::ZERO),
            pixel_format: Mutex::new(None),
            pixel_format_set: AtomicBool::new(false),
            double_buffered: AtomicBool::new(true),
            saved_clip: Mutex::new(None),
            last_sizing: Mutex::new(RectL::default()),
            cursors: Mutex::new(Cursors::default()),
        })
    }

    /// The window handle, `0` when no window exists.
    pub fn hwnd(&self) -> Hwnd {
        self.hwnd.load(Ordering::Acquire)
    }

    fn api(&self) -> &A {
        &self.shared.api
    }

    fn window(&self) -> Option<Window> {
        self.window.upgrade()
    }

    fn extents(&self) -> Extents {
        *lock(&self.extents)
    }

    fn style(window: &Window) -> Style {
        Style { frame: window.decorated() && !window.fullscreen(), visible: window.visible() }
    }

    // ---- creation ----

    fn rebuild(&self, window: &Window) -> Result<(), WindowError> {
        if self.hwnd() != 0 {
            self.destroy_native();
        }
        self.pixel_format_set.store(false, Ordering::Release);
        let hwnd = self
            .api()
            .create_window(&window.title(), Self::style(window))
            .map_err(|e| WindowError::Create(format!("Unable to open window; {e}")))?;
        self.hwnd.store(hwnd, Ordering::Release);

        self.update_transparency(window.transparent());
        self.place(window);
        self.update_style(window);
        if window.visible() {
            self.api().show_window(hwnd, ShowCommand::ShowDefault);
            if window.minimized() {
                self.api().show_window(hwnd, ShowCommand::Minimize);
            } else if window.maximized() {
                self.api().show_window(hwnd, ShowCommand::Maximize);
            }
        }

        self.shared.register(hwnd, self.me.clone());
        if let Some(icon) = window.icon() {
            self.update_icon(Some(&icon));
        }
        if self.api().supports_raw_input() {
            if let Err(e) = self.api().register_raw_mouse(hwnd) {
                logwise::warn_sync!("Raw mouse input unavailable; {e}", e = e.to_string());
            }
        }
        Ok(())
    }

    fn destroy_native(&self) {
        let hwnd = self.hwnd.swap(0, Ordering::AcqRel);
        if hwnd == 0 {
            return;
        }
        self.shared.unregister(hwnd);
        if let Err(e) = self.api().destroy_window(hwnd) {
            logwise::warn_sync!("Unable to destroy window; {e}", e = e.to_string());
        }
    }

    fn update_transparency(&self, transparent: bool) {
        if let Err(e) = self.api().set_blur_behind(self.hwnd(), transparent) {
            logwise::warn_sync!("Unable to update transparency; {e}", e = e.to_string());
        }
    }

    fn update_icon(&self, icon: Option<&Icon>) {
        if let Err(e) = self.api().set_icon(self.hwnd(), icon.map(Icon::image)) {
            logwise::warn_sync!("Unable to set window icon; {e}", e = e.to_string());
        }
    }

    fn update_style(&self, window: &Window) {
        let hwnd = self.hwnd();
        let style = Self::style(window);
        if self.api().window_style(hwnd) != style {
            self.api().set_window_style(hwnd, style);
            self.place(window);
        }
    }

    /// Lock keys may already be lit when the window opens.
    fn refresh_toggles(&self, window: &Window) {
        for (key, vk) in [(Key::CapsLock, VK_CAPITAL), (Key::NumLock, VK_NUMLOCK), (Key::ScrollLock, VK_SCROLL)] {
            window.try_add_keyboard_state_event(key, u64::from(vk), toggle_state(self.api().key_toggled(vk)));
        }
    }

    // ---- geometry ----

    /**
    `SetWindowPos` for the window's requested state.

    Positions are relative to the screen the window opened on.  A decorated window's outer
    rectangle includes the frame; fullscreen covers the current screen.
    */
    fn place(&self, window: &Window) {
        let extents = self.extents();
        let decorated = window.decorated();
        let origin = window.original_screen().map(|s| s.position()).unwrap_or_default();
        let position = window.position();
        let mut x = origin.x() + position.x();
        let mut y = origin.y() + position.y();
        if decorated {
            x -= extents.left;
            y -= extents.top;
        }

        let client = window.clamped_size();
        let mut width = client.width() as f32;
        let mut height = client.height() as f32;
        if decorated {
            width += extents.horizontal() as f32;
            height += extents.vertical() as f32;
        }
        let ratio = window.aspect_ratio();
        if ratio != 0.0 {
            if ratio > 1.0 {
                width = ratio * height;
            } else {
                height = (1.0 / ratio) * width;
            }
        }

        if window.fullscreen() {
            if let Some(screen) = window.screen() {
                let resolution = screen.resolution();
                x = screen.position().x();
                y = screen.position().y();
                width = resolution.width() as f32;
                height = resolution.height() as f32;
                if window.size() != resolution {
                    window.try_set_size(resolution);
                }
            }
        }

        let placement = Placement {
            topmost: window.always_on_top(),
            position: Position::new(x, y),
            size: Size::new(width as i32, height as i32),
        };
        if let Err(e) = self.api().set_window_pos(self.hwnd(), &placement) {
            logwise::debuginternal_sync!("SetWindowPos failed: {e}", e = e.to_string());
        }
    }

    // ---- pointer ----

    fn save_clip(&self) {
        let mut saved = lock(&self.saved_clip);
        if saved.is_some() {
            return;
        }
        match self.api().clip_rect() {
            Ok(rect) => *saved = Some(rect),
            Err(e) => logwise::warn_sync!("Unable to save cursor clip; {e}", e = e.to_string()),
        }
    }

    fn restore_clip(&self) {
        let Some(rect) = lock(&self.saved_clip).take() else { return };
        if let Err(e) = self.api().clip_cursor(rect) {
            logwise::warn_sync!("Unable to restore cursor clip; {e}", e = e.to_string());
        }
    }

    /// Clips the cursor to the client area.  Skipped when there is nothing to restore later.
    fn update_clip(&self, window: &Window) {
        if lock(&self.saved_clip).is_none() {
            return;
        }
        let hwnd = self.hwnd();
        let size = window.clamped_size();
        let corners = self
            .api()
            .client_to_screen(hwnd, 0, 0)
            .and_then(|tl| self.api().client_to_screen(hwnd, size.width(), size.height()).map(|br| (tl, br)));
        let rect = match corners {
            Ok(((left, top), (right, bottom))) => RectL { left, top, right, bottom },
            Err(e) => {
                logwise::warn_sync!("Unable to set clip cursor; {e}", e = e.to_string());
                return;
            }
        };
        if let Err(e) = self.api().clip_cursor(rect) {
            logwise::warn_sync!("Unable to set clip cursor; {e}", e = e.to_string());
        }
    }

    fn release_pointer(&self) {
        self.restore_clip();
        self.api().release_capture();
    }

    fn realize(&self, cursor: &Cursor) -> Option<usize> {
        let mut cursors = lock(&self.cursors);
        match cursors
            .realized
            .get_or_try_insert(cursor.id(), || self.api().create_cursor(cursor.image(), cursor.hotspot()))
        {
            Ok(handle) => Some(*handle),
            Err(e) => {
                logwise::warn_sync!("Unable to create cursor; {e}", e = e.to_string());
                None
            }
        }
    }

    /// Applies the cursor shape while the pointer is over the window.
    fn apply_cursor(&self, window: &Window) {
        if !window.cursor_within() {
            return;
        }
        if window.cursor_grabbed() {
            self.api().set_cursor(None);
            return;
        }
        let loaded = lock(&self.cursors).loaded;
        let handle = match loaded {
            Some(handle) => Some(handle),
            None => {
                let handle = match window.cursor() {
                    Some(cursor) => self.realize(&cursor),
                    None => self.arrow(),
                };
                lock(&self.cursors).loaded = handle;
                handle
            }
        };
        if let Some(handle) = handle {
            self.api().set_cursor(Some(handle));
        }
    }

    fn arrow(&self) -> Option<usize> {
        let mut cursors = lock(&self.cursors);
        if let Some(arrow) = cursors.arrow {
            return Some(arrow);
        }
        match self.api().arrow_cursor() {
            Ok(arrow) => Some(*cursors.arrow.insert(arrow)),
            Err(e) => {
                logwise::warn_sync!("Unable to load default (IDC_ARROW) cursor; {e}", e = e.to_string());
                None
            }
        }
    }

    /// Moves the pointer to the window's cursor position; the client centre while grabbed.
    fn move_pointer(&self, window: &Window) {
        if window.cursor_grabbed() {
            if !window.cursor_within() {
                return;
            }
            let size = window.clamped_size();
            window.try_set_cursor_position(f64::from(size.width() / 2), f64::from(size.height() / 2));
        }
        let position = window.position();
        let (x, y) = window.cursor_position();
        if let Err(e) = self.api().set_cursor_pos(position.x() + x as i32, position.y() + y as i32) {
            logwise::warn_sync!("Unable to set cursor position; {e}", e = e.to_string());
        }
    }

    fn free_cursors(&self) {
        let mut cursors = lock(&self.cursors);
        cursors.loaded = None;
        for handle in cursors.realized.drain() {
            if let Err(e) = self.api().destroy_cursor(handle) {
                logwise::warn_sync!("Failed to free cursor; {e}", e = e.to_string());
            }
        }
    }

    // ---- window procedure ----

    fn key(&self, window: &Window, message: &Message) -> isize {
        let down = matches!(message.id, WM_KEYDOWN | WM_SYSKEYDOWN);
        if down && message.lparam & REPEAT_BIT != 0 {
            return 0;
        }
        let vk = message.wparam as u32;
        if matches!(message.id, WM_SYSKEYDOWN | WM_SYSKEYUP) && vk == VK_F4 && self.api().async_key_down(VK_MENU) {
            if down {
                window.send_close();
            }
            return 0;
        }

        //the generic modifier codes say nothing about which side changed
        let pair = match vk {
            VK_SHIFT => Some([(Key::LeftShift, VK_LSHIFT), (Key::RightShift, VK_RSHIFT)]),
            VK_CONTROL => Some([(Key::LeftCtrl, VK_LCONTROL), (Key::RightCtrl, VK_RCONTROL)]),
            VK_MENU => Some([(Key::LeftAlt, VK_LMENU), (Key::RightAlt, VK_RMENU)]),
            _ => None,
        };
        if let Some(pair) = pair {
            for (key, side) in pair {
                window.try_add_keyboard_state_event(key, u64::from(side), key_state(self.api().async_key_down(side)));
            }
            return 0;
        }

        let key = keys::to_key(vk, message.lparam & EXTENDED_BIT != 0);
        let state = match vk {
            VK_CAPITAL | VK_NUMLOCK | VK_SCROLL => toggle_state(self.api().key_toggled(vk)),
            _ => key_state(down),
        };
        window.try_add_keyboard_state_event(key, u64::from(vk), state);
        0
    }

    fn mouse_move(&self, window: &Window, lparam: isize) {
        let (x, y) = point_from_lparam(lparam);
        window.try_set_cursor_position(f64::from(x), f64::from(y));

        let size = window.clamped_size();
        let grabbed = window.cursor_grabbed();
        let outside = x >= size.width() || y >= size.height() || x <= 0 || y <= 0 || !window.focused();
        if outside {
            //there is no WM_MOUSEENTER, and WM_MOUSELEAVE needs tracking requests
            if !grabbed && window.try_set_cursor_within(false) {
                self.release_pointer();
            }
        } else if window.try_set_cursor_within(true) {
            if grabbed {
                self.save_clip();
                self.update_clip(window);
            }
            self.api().set_capture(self.hwnd());
        }

        if grabbed {
            let (cx, cy) = (size.width() / 2, size.height() / 2);
            if x != cx || y != cy {
                if !self.api().supports_raw_input() {
                    window.send_relative_cursor(f64::from(x - cx), f64::from(y - cy));
                }
                self.move_pointer(window);
            }
        }
        self.apply_cursor(window);
    }

    fn activate(&self, window: &Window, wparam: usize) {
        if loword(wparam) as usize != WA_INACTIVE && hiword(wparam) == 0 {
            window.try_set_focused(true);
            return;
        }
        if !window.try_set_focused(false) {
            return;
        }
        //no mouse-leave arrives when another window takes the foreground
        if window.try_set_cursor_within(false) {
            self.release_pointer();
        }
        window.release_downed_buttons();
        if window.fullscreen() {
            self.api().show_window(self.hwnd(), ShowCommand::Minimize);
            self.place(window);
            window.try_set_maximized(false);
            window.try_set_minimized(true);
        }
    }

    fn exit_size_move(&self, window: &Window) {
        let name = match self.api().monitor_name(self.hwnd()) {
            Ok(name) => name,
            Err(e) => {
                logwise::warn_sync!("Unable to detect monitor position; {e}", e = e.to_string());
                return;
            }
        };
        if let Some(screen) = self.api().screens().into_iter().find(|s| s.name() == name) {
            window.try_set_screen(screen);
        }
    }

    fn paint(&self, window: &Window) {
        let Some(rect) = self.api().take_update_rect(self.hwnd()) else { return };
        let rect = Rect::new(Position::new(rect.left, rect.top), Position::new(rect.right, rect.bottom));
        if rect.is_empty() {
            logwise::warn_sync!("Got non well-formed WM_PAINT rectangle, ignored!");
            return;
        }
        window.send_paint(rect);
    }

    fn sizing(&self, window: &Window, message: &mut Message) {
        let MessageData::Sizing(rect) = message.data else { return };
        let ratio = window.aspect_ratio();
        let rect = if ratio != 0.0 {
            let fitted = fit_sizing(rect, message.wparam, ratio);
            message.data = MessageData::Sizing(fitted);
            *lock(&self.last_sizing) = fitted;
            fitted
        } else {
            *lock(&self.last_sizing)
        };
        let size = Size::new(rect.right - rect.left, rect.bottom - rect.top);
        if size.width() != 0 && size.height() != 0 && window.try_set_size(size) && window.cursor_grabbed() {
            self.update_clip(window);
        }
    }

    fn size(&self, window: &Window, wparam: usize, lparam: isize) {
        let (minimized, maximized) = match wparam {
            SIZE_MAXIMIZED => (false, true),
            SIZE_MINIMIZED => (true, false),
            _ => (false, false),
        };
        window.try_set_minimized(minimized);
        window.try_set_maximized(maximized);
        if !minimized {
            let lparam = lparam as usize;
            window.try_set_size(Size::new(i32::from(loword(lparam)), i32::from(hiword(lparam))));
        }
    }

    fn button(window: &Window, button: Button, state: ButtonState) {
        window.add_mouse_event(button, state);
    }

    fn wheel(window: &Window, wparam: usize, forward: ButtonState, back: ButtonState) {
        let delta = i32::from(hiword(wparam) as i16);
        let state = if delta > 0 { forward } else { back };
        for _ in 0..(delta.abs() / WHEEL_DELTA) {
            window.add_mouse_event(Button::Wheel, state);
        }
    }

    /// Decodes `message`.  `None` sends it on to `DefWindowProc`.
    pub(crate) fn handle_message(&self, message: &mut Message) -> Option<isize> {
        let window = self.window()?;
        match message.id {
            WM_PAINT => {
                self.paint(&window);
                Some(0)
            }
            WM_ERASEBKGND => Some(1),
            WM_GETMINMAXINFO => {
                let info = track_sizes(window.minimum_size(), window.maximum_size(), window.extents(), window.aspect_ratio());
                message.data = MessageData::MinMaxInfo(info);
                Some(0)
            }
            WM_SIZING => {
                self.sizing(&window, message);
                Some(0)
            }
            WM_SIZE => {
                self.size(&window, message.wparam, message.lparam);
                Some(0)
            }
            WM_MOVE => {
                let (x, y) = point_from_lparam(message.lparam);
                if !self.api().is_iconic(self.hwnd()) {
                    window.try_set_position(Position::new(x, y));
                }
                Some(0)
            }
            WM_EXITSIZEMOVE => {
                self.exit_size_move(&window);
                Some(0)
            }
            WM_ACTIVATE => {
                self.activate(&window, message.wparam);
                Some(0)
            }
            WM_CHAR => {
                match char::from_u32(message.wparam as u32) {
                    Some(character) => window.send_typed(character),
                    None => {
                        logwise::debuginternal_sync!("Ignoring WM_CHAR {code}", code = message.wparam);
                    }
                }
                None
            }
            WM_KEYDOWN | WM_SYSKEYDOWN | WM_KEYUP | WM_SYSKEYUP => Some(self.key(&window, message)),
            WM_MOUSEMOVE => {
                self.mouse_move(&window, message.lparam);
                Some(0)
            }
            WM_INPUT => {
                if window.cursor_within() && window.cursor_grabbed() {
                    if let Some((dx, dy)) = self.api().raw_mouse_delta(message.lparam) {
                        if dx != 0 || dy != 0 {
                            window.send_relative_cursor(f64::from(dx), f64::from(dy));
                        }
                    }
                }
                Some(0)
            }
            WM_LBUTTONDOWN => {
                Self::button(&window, Button::Left, ButtonState::Down);
                Some(0)
            }
            WM_LBUTTONUP => {
                Self::button(&window, Button::Left, ButtonState::Up);
                Some(0)
            }
            WM_RBUTTONDOWN => {
                Self::button(&window, Button::Right, ButtonState::Down);
                Some(0)
            }
            WM_RBUTTONUP => {
                Self::button(&window, Button::Right, ButtonState::Up);
                Some(0)
            }
            WM_MBUTTONDOWN => {
                Self::button(&window, Button::Wheel, ButtonState::Down);
                Some(0)
            }
            WM_MBUTTONUP => {
                Self::button(&window, Button::Wheel, ButtonState::Up);
                Some(0)
            }
            WM_XBUTTONDOWN | WM_XBUTTONUP => {
                let state = if message.id == WM_XBUTTONDOWN { ButtonState::Down } else { ButtonState::Up };
                match hiword(message.wparam) {
                    XBUTTON1 => Self::button(&window, Button::Four, state),
                    XBUTTON2 => Self::button(&window, Button::Five, state),
                    other => {
                        logwise::warn_sync!("Unknown X button {other}", other = other);
                    }
                }
                Some(1)
            }
            WM_MOUSEWHEEL => {
                Self::wheel(&window, message.wparam, ButtonState::ScrollForward, ButtonState::ScrollBack);
                Some(0)
            }
            WM_MOUSEHWHEEL => {
                Self::wheel(&window, message.wparam, ButtonState::ScrollRight, ButtonState::ScrollLeft);
                Some(0)
            }
            WM_CLOSE => {
                window.send_close();
                Some(0)
            }
            _ => None,
        }
    }
}

impl<A: Win32Api> NativeWindow for Win32Window<A> {
    fn open(&self, screen: &Screen) -> Result<(), WindowError> {
        let Some(window) = self.window() else {
            return Err(WindowError::Create("window was dropped while opening".to_string()));
        };
        logwise::debuginternal_sync!("Opening Win32 window on {screen}", screen = screen.to_string());
        let extents = self.api().frame_extents();
        *lock(&self.extents) = extents;
        window.try_set_extents(extents);
        window.try_set_focused(true);
        self.rebuild(&window)?;
        self.refresh_toggles(&window);
        lock(&self.cursors).loaded = None;
        self.apply_cursor(&window);
        Ok(())
    }

    fn destroy(&self) {
        self.restore_clip();
        self.destroy_native();
        self.free_cursors();
    }

    fn notify(&self) {
        self.api().flash_window(self.hwnd(), NOTIFY_FLASHES);
    }

    fn set_title(&self, title: &str) {
        if let Err(e) = self.api().set_window_text(self.hwnd(), title) {
            logwise::warn_sync!("Unable to set window title; {e}", e = e.to_string());
        }
    }

    fn set_icon(&self, icon: Option<&Icon>) {
        self.update_icon(icon);
    }

    fn set_visible(&self, visible: bool) {
        let command = if visible { ShowCommand::Show } else { ShowCommand::Hide };
        self.api().show_window(self.hwnd(), command);
    }

    fn set_decorated(&self, _decorated: bool) {
        if let Some(window) = self.window().filter(Window::visible) {
            self.update_style(&window);
        }
    }

    fn set_transparent(&self, transparent: bool) {
        self.update_transparency(transparent);
    }

    fn set_always_on_top(&self, _always_on_top: bool) {
        if let Some(window) = self.window() {
            self.place(&window);
        }
    }

    fn set_position(&self, _position: Position) {
        if let Some(window) = self.window() {
            self.place(&window);
        }
    }

    fn set_size(&self, _size: Size) {
        if let Some(window) = self.window() {
            self.place(&window);
        }
    }

    fn set_minimum_size(&self, _size: Size) {
        if let Some(window) = self.window() {
            self.place(&window);
        }
    }

    fn set_maximum_size(&self, _size: Size) {
        if let Some(window) = self.window() {
            self.place(&window);
        }
    }

    fn set_aspect_ratio(&self, _ratio: f32) {
        if let Some(window) = self.window() {
            self.place(&window);
        }
    }

    fn set_fullscreen(&self, _fullscreen: bool) {
        if let Some(window) = self.window() {
            self.update_style(&window);
            self.place(&window);
        }
    }

    fn set_minimized(&self, minimized: bool) {
        let command = if minimized { ShowCommand::Minimize } else { ShowCommand::Restore };
        self.api().show_window(self.hwnd(), command);
        if let Some(window) = self.window() {
            self.place(&window);
        }
    }

    fn set_maximized(&self, maximized: bool) {
        let command = if maximized { ShowCommand::Maximize } else { ShowCommand::Restore };
        self.api().show_window(self.hwnd(), command);
    }

    fn set_cursor(&self, _cursor: Option<&Cursor>) {
        lock(&self.cursors).loaded = None;
        if let Some(window) = self.window() {
            self.apply_cursor(&window);
        }
    }

    fn prepare_cursor(&self, cursor: &Cursor) {
        self.realize(cursor);
    }

    fn free_cursor(&self, cursor: &Cursor) {
        let handle = {
            let mut cursors = lock(&self.cursors);
            let handle = cursors.realized.remove(cursor.id());
            if handle.is_some() && cursors.loaded == handle {
                cursors.loaded = None;
            }
            handle
        };
        if let Some(handle) = handle {
            if let Err(e) = self.api().destroy_cursor(handle) {
                logwise::warn_sync!("Failed to free cursor; {e}", e = e.to_string());
            }
        }
    }

    fn set_cursor_grabbed(&self, grabbed: bool) {
        let Some(window) = self.window() else { return };
        if grabbed {
            self.save_clip();
            self.update_clip(&window);
        } else {
            self.restore_clip();
        }
        self.apply_cursor(&window);
        self.move_pointer(&window);
    }

    fn set_cursor_position(&self, _x: f64, _y: f64) {
        if let Some(window) = self.window() {
            self.move_pointer(&window);
        }
    }

    fn raw_window_handle(&self) -> Option<RawWindowHandle> {
        NonZeroIsize::new(self.hwnd()).map(|hwnd| RawWindowHandle::Win32(Win32WindowHandle::new(hwnd)))
    }

    fn gl_configs(&self) -> Vec<GLConfig> {
        self.api().wgl_configs(self.hwnd())
    }

    fn gl_set_config(&self, config: &GLConfig) {
        *lock(&self.pixel_format) = Some(config.backend_id());
        self.double_buffered.store(config.double_buffered, Ordering::Release);
        //SetPixelFormat may only be called once per window
        if self.pixel_format_set.load(Ordering::Acquire) {
            let Some(window) = self.window() else { return };
            if let Err(e) = self.rebuild(&window) {
                logwise::error_sync!("Unable to rebuild window for {config}: {e}", config = config.to_string(), e = e.to_string());
                return;
            }
        }
        if let Err(e) = self.api().wgl_set_pixel_format(self.hwnd(), config.backend_id()) {
            logwise::warn_sync!("GLSetConfig failed; {e}", e = e.to_string());
        }
        self.pixel_format_set.store(true, Ordering::Release);
    }

    fn gl_create_context(
        &self,
        major: u32,
        minor: u32,
        flags: GLContextFlags,
        share: Option<NativeContextId>,
    ) -> Result<NativeContextId, GlError> {
        if lock(&self.pixel_format).is_none() {
            return Err(GlError::NoConfig);
        }
        let hwnd = self.hwnd();
        let context = self
            .api()
            .wgl_create_context(hwnd, major, minor, flags, share.map(|s| s.0))
            .map_err(|e| GlError::Context(e.to_string()))?;
        let version = self.api().gl_version(hwnd, context);
        if !version_supported(&version, major, minor) {
            logwise::warn_sync!(
                "GL_VERSION={version}; no support for OpenGL {major}.{minor} found",
                version = version,
                major = major,
                minor = minor
            );
            if let Err(e) = self.api().wgl_delete_context(context) {
                logwise::warn_sync!("Unable to destroy GL context; {e}", e = e.to_string());
            }
            return Err(GlError::VersionNotSupported { major, minor });
        }
        Ok(NativeContextId(context))
    }

    fn gl_destroy_context(&self, context: NativeContextId) {
        if let Err(e) = self.api().wgl_delete_context(context.0) {
            logwise::warn_sync!("Unable to destroy GL context; {e}", e = e.to_string());
        }
    }

    fn gl_make_current(&self, context: Option<NativeContextId>) {
        if let Err(e) = self.api().wgl_make_current(self.hwnd(), context.map(|c| c.0)) {
            logwise::warn_sync!("Unable to make GL context current; {e}", e = e.to_string());
        }
    }

    fn gl_swap_buffers(&self) {
        if !self.double_buffered.load(Ordering::Acquire) {
            return;
        }
        if let Err(e) = self.api().swap_buffers(self.hwnd()) {
            logwise::warn_sync!("Unable to swap GL buffers; {e}", e = e.to_string());
        }
    }

    fn gl_set_vertical_sync(&self, mode: VSyncMode) {
        let interval = match mode {
            VSyncMode::NoVerticalSync => 0,
            VSyncMode::VerticalSync => 1,
            VSyncMode::AdaptiveVerticalSync => -1,
        };
        if let Err(e) = self.api().wgl_swap_interval(interval) {
            logwise::warn_sync!("Unable to set vertical sync; {e}", e = e.to_string());
        }
    }
}
