// SPDX-License-Identifier: MPL-2.0
//! The X11 native window and its event handling.
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use raw_window_handle::{RawWindowHandle, XcbWindowHandle};

use super::keysym::{self, Keysym, XK_CAPS_LOCK, XK_NUM_LOCK, XK_SCROLL_LOCK};
use super::{ATOM_ATOM, ATOM_CARDINAL, Configure, ContextRequest, CreateWindow, Shared, SizeHints, WindowId, X11Error, XConnection, XEvent};
use crate::backend::NativeWindow;
use crate::coordinates::{Extents, Position, Size};
use crate::cursor::{Cursor, Icon, Image, ResourceCache};
use crate::gl::{GLConfig, GLContextFlags, GlError, NativeContextId, VSyncMode, extension_supported};
use crate::input::keyboard::KeyState;
use crate::input::keyboard::key::Key;
use crate::input::mouse::{Button, ButtonState};
use crate::screen::Screen;
use crate::signal::Signal;
use crate::window::{WeakWindow, Window, WindowError};

//last pointer position is unknown
const UNKNOWN: i32 = -1;
const ICONIC_STATE: u32 = 3;
const MOTIF_HINTS_DECORATIONS: u32 = 2;
const SOURCE_NORMAL_APPLICATION: u32 = 1;
const REDECORATE_STEP: Duration = Duration::from_millis(60);

#[derive(Default)]
struct Cursors {
    realized: ResourceCache<u32>,
    blank: Option<u32>,
}

/**
One X window.

Native setters run on the dispatcher thread.  Events arrive on the pump thread through
`handle_event`, which only touches the [`Window`] through its `try_set_*` family and hands
pointer grabs back to the dispatcher.
*/
pub struct X11Window<C: XConnection> {
    me: Weak<X11Window<C>>,
    shared: Arc<Shared<C>>,
    window: WeakWindow,
    xid: AtomicU32,
    transparent: AtomicBool,
    gl_config: Mutex<Option<u64>>,
    extents: Mutex<Option<Extents>>,
    last_cursor: Mutex<(i32, i32)>,
    cursors: Mutex<Cursors>,

    can_send_position: AtomicBool,
    can_send_size: AtomicBool,
    can_send_relative: AtomicBool,

    mapped: Signal,
    unmapped: Signal,
    frame_extents: Signal,
    motif_hints: Signal,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `_NET_WM_ICON` data: width, height, then ARGB pixels.
pub(crate) fn icon_property(image: &Image) -> Vec<u32> {
    let mut data = Vec::with_capacity(2 + (image.width() * image.height()) as usize);
    data.push(image.width());
    data.push(image.height());
    data.extend(image.rgba().chunks_exact(4).map(|p| {
        u32::from(p[3]) << 24 | u32::from(p[0]) << 16 | u32::from(p[1]) << 8 | u32::from(p[2])
    }));
    data
}

/// Decodes a core button number.  `Ok(None)` is a scroll release, which carries nothing.
fn decode_button(detail: u8, pressed: bool) -> Result<Option<(Button, ButtonState)>, u8> {
    let held = if pressed { ButtonState::Down } else { ButtonState::Up };
    let scroll = match detail {
        1 => return Ok(Some((Button::Left, held))),
        2 => return Ok(Some((Button::Wheel, held))),
        3 => return Ok(Some((Button::Right, held))),
        4 => ButtonState::ScrollForward,
        5 => ButtonState::ScrollBack,
        6 => ButtonState::ScrollLeft,
        7 => ButtonState::ScrollRight,
        other => return Err(other),
    };
    Ok(pressed.then_some((Button::Wheel, scroll)))
}

impl<C: XConnection> X11Window<C> {
    pub(crate) fn new(shared: Arc<Shared<C>>, window: WeakWindow) -> Arc<Self> {
        Arc::new_cyclic(|me| X11Window {
            me: me.clone(),
            shared,
            window,
            xid: AtomicU32::new(0),
            transparent: AtomicBool::new(false),
            gl_config: Mutex::new(None),
            extents: Mutex::new(None),
            last_cursor: Mutex::new((UNKNOWN, UNKNOWN)),
            cursors: Mutex::new(Cursors::default()),
            can_send_position: AtomicBool::new(false),
            can_send_size: AtomicBool::new(false),
            can_send_relative: AtomicBool::new(false),
            mapped: Signal::new(),
            unmapped: Signal::new(),
            frame_extents: Signal::new(),
            motif_hints: Signal::new(),
        })
    }

    /// The X window id, `0` when no window exists.
    pub fn xid(&self) -> WindowId {
        self.xid.load(Ordering::Acquire)
    }

    fn conn(&self) -> &C {
        &self.shared.conn
    }

    fn window(&self) -> Option<Window> {
        self.window.upgrade()
    }

    fn stored_extents(&self) -> Option<Extents> {
        *lock(&self.extents)
    }

    fn set_can_send(&self, can: bool) {
        self.can_send_position.store(can, Ordering::Release);
        self.can_send_size.store(can, Ordering::Release);
    }

    // ---- creation ----

    fn rebuild(&self) -> Result<(), WindowError> {
        if self.xid() != 0 {
            self.destroy_native();
        }
        self.clear_last_cursor();
        let Some(window) = self.window() else {
            return Err(WindowError::Create("window was dropped while opening".to_string()));
        };
        let atoms = self.shared.atoms();
        let root = self.conn().root();
        let size = window.clamped_size();
        let xid = self
            .conn()
            .create_window(&CreateWindow {
                parent: root,
                position: window.position(),
                size,
                transparent: self.transparent.load(Ordering::Acquire),
                gl_config: *lock(&self.gl_config),
            })
            .map_err(|e| WindowError::Create(format!("x11_create_window(): {e}")))?;
        self.xid.store(xid, Ordering::Release);
        self.shared.register(xid, self.me.clone());
        for signal in [&self.mapped, &self.unmapped, &self.frame_extents, &self.motif_hints] {
            signal.clear();
        }
        *lock(&self.extents) = None;

        if let Some(cursor) = window.cursor() {
            self.define(Some(&cursor));
        }
        self.conn().set_title(xid, &window.title());
        //ICCCM window managers read min/max and aspect before mapping
        self.configure_size(&window, size);

        self.conn().send_client_message(root, xid, atoms.net_request_frame_extents, [0; 5]);
        self.conn().flush();
        let extents = self.negotiate_extents(&window);
        window.try_set_extents(extents);

        self.show(&window, window.visible());
        self.refresh_indicators(&window);

        if atoms.wm_protocols != 0 && atoms.wm_delete_window != 0 {
            if let Err(e) = self.conn().change_property(xid, atoms.wm_protocols, ATOM_ATOM, &[atoms.wm_delete_window]) {
                logwise::warn_sync!("ChangeProperty(WM_PROTOCOLS): {e}", e = e.to_string());
            }
        }
        self.conn().flush();
        Ok(())
    }

    /**
    Decoration extents for a window that was just created.

    A nonzero cached answer from an earlier window wins.  Otherwise the window manager gets one
    timeout to answer `_NET_REQUEST_FRAME_EXTENTS`; failing that the window is mapped and gets
    one more.  Zero when it never answers.
    */
    fn negotiate_extents(&self, window: &Window) -> Extents {
        let timeout = self.shared.timeouts.frame_extents;
        let cached = self.shared.cached_extents();
        if !cached.is_zero() {
            *lock(&self.extents) = Some(cached);
        } else if !self.frame_extents.wait(timeout) {
            logwise::warn_sync!("Timed out waiting for _NET_REQUEST_FRAME_EXTENTS request.");
            _ = self.fetch_extents();
        }

        if self.stored_extents().is_none_or(|e| e.is_zero()) {
            self.show(window, true);
            if !self.frame_extents.wait(timeout) {
                logwise::warn_sync!("Timed out waiting for _NET_FRAME_EXTENTS PropertyNotify event.");
            }
        }
        let extents = self.stored_extents().unwrap_or(Extents::ZERO);
        self.shared.cache_extents(extents);
        extents
    }

    /// Reads `_NET_FRAME_EXTENTS` into the stored extents.
    fn fetch_extents(&self) -> Option<Extents> {
        let atoms = self.shared.atoms();
        match self.conn().get_cardinal_property(self.xid(), atoms.net_frame_extents) {
            Ok(values) if values.len() == 4 => {
                //left, right, top, bottom on the wire
                let extents = Extents::new(values[0] as i32, values[1] as i32, values[3] as i32, values[2] as i32);
                *lock(&self.extents) = Some(extents);
                self.shared.cache_extents(extents);
                Some(extents)
            }
            Ok(_) => None,
            Err(e) => {
                logwise::warn_sync!("GetProperty(_NET_FRAME_EXTENTS): {e}", e = e.to_string());
                None
            }
        }
    }

    fn destroy_native(&self) {
        let xid = self.xid.swap(0, Ordering::AcqRel);
        if xid == 0 {
            return;
        }
        self.set_can_send(false);
        self.shared.unregister(xid);
        self.conn().destroy_window(xid);
        self.conn().flush();
    }

    // ---- mapping ----

    fn show(&self, window: &Window, visible: bool) {
        let xid = self.xid();
        let timeouts = self.shared.timeouts;
        if visible {
            //some window managers honor geometry only before mapping, others only after
            let position = window.position();
            let size = window.clamped_size();
            self.configure_position(window, position);
            self.configure_size(window, size);
            self.update_net_wm_state(window);
            self.update_motif_hints(window.decorated());
            if let Some(icon) = window.icon() {
                self.update_icon(&icon);
            }

            self.conn().map_window(xid);
            self.configure_position(window, position);
            self.configure_size(window, size);
            self.conn().flush();
            if !self.mapped.wait(timeouts.map) {
                logwise::warn_sync!("Timed out waiting for MapNotifyEvent.");
            }

            if window.minimized() {
                self.iconify();
            }
            self.define(window.cursor().as_ref());
            if window.cursor_grabbed() {
                self.grab(true, false);
            }
            self.conn().flush();
            self.set_can_send(true);
        } else {
            //configure events after an unmap request are not trustworthy
            self.set_can_send(false);
            if let Err(e) = self.conn().unmap_window(xid) {
                logwise::warn_sync!("UnmapWindow: {e}", e = e.to_string());
            }
            self.conn().flush();
            if !self.unmapped.wait(timeouts.unmap) {
                logwise::warn_sync!("Timed out waiting for UnmapNotifyEvent.");
            }
        }
    }

    fn iconify(&self) {
        let atoms = self.shared.atoms();
        self.conn()
            .send_client_message(self.conn().root(), self.xid(), atoms.wm_change_state, [ICONIC_STATE, 0, 0, 0, 0]);
        self.conn().flush();
    }

    // ---- geometry ----

    fn configure_position(&self, window: &Window, position: Position) {
        let (left, top) = match self.stored_extents() {
            Some(e) if window.decorated() => (e.left, e.top),
            _ => (0, 0),
        };
        self.conn().configure_window(
            self.xid(),
            Configure { position: Some(Position::new(position.x() - left, position.y() - top)), size: None },
        );
    }

    fn configure_size(&self, window: &Window, size: Size) {
        let xid = self.xid();
        //X sizes are client area sizes already
        self.conn().configure_window(xid, Configure { position: None, size: Some(size) });
        let min = window.minimum_size();
        let max = window.maximum_size();
        let ratio = window.aspect_ratio();
        let hints = SizeHints {
            size,
            min: min.is_set().then_some(min),
            max: max.is_set().then_some(max),
            aspect: (ratio != 0.0).then(|| ((ratio * 1000.0) as i32, 1000)),
        };
        self.conn().set_size_hints(xid, &hints);
    }

    // ---- window manager properties ----

    fn update_net_wm_state(&self, window: &Window) {
        let atoms = self.shared.atoms();
        let mut state = Vec::new();
        if window.fullscreen() {
            state.push(atoms.net_wm_state_fullscreen);
        }
        if window.maximized() {
            state.push(atoms.net_wm_state_maximized_vert);
            state.push(atoms.net_wm_state_maximized_horz);
        }
        if window.always_on_top() {
            state.push(atoms.net_wm_state_above);
        }
        if let Err(e) = self.conn().change_property(self.xid(), atoms.net_wm_state, ATOM_ATOM, &state) {
            logwise::warn_sync!("ChangeProperty(_NET_WM_STATE): {e}", e = e.to_string());
        }
    }

    fn net_wm_state(&self, set: bool, first: u32, second: u32) {
        let atoms = self.shared.atoms();
        self.conn().send_client_message(
            self.conn().root(),
            self.xid(),
            atoms.net_wm_state,
            [u32::from(set), first, second, SOURCE_NORMAL_APPLICATION, 0],
        );
        self.conn().flush();
    }

    fn update_motif_hints(&self, decorated: bool) {
        let atoms = self.shared.atoms();
        let hints = [MOTIF_HINTS_DECORATIONS, 0, u32::from(decorated), 0, 0];
        if let Err(e) = self.conn().change_property(self.xid(), atoms.motif_wm_hints, atoms.motif_wm_hints, &hints) {
            logwise::warn_sync!("ChangeProperty(_MOTIF_WM_HINTS): {e}", e = e.to_string());
        }
    }

    fn update_icon(&self, icon: &Icon) {
        let atoms = self.shared.atoms();
        let data = icon_property(icon.image());
        if let Err(e) = self.conn().change_property(self.xid(), atoms.net_wm_icon, ATOM_CARDINAL, &data) {
            logwise::warn_sync!("ChangeProperty(_NET_WM_ICON): {e}", e = e.to_string());
        }
    }

    // ---- pointer ----

    fn clear_last_cursor(&self) {
        *lock(&self.last_cursor) = (UNKNOWN, UNKNOWN);
    }

    fn warp(&self, x: i32, y: i32) {
        *lock(&self.last_cursor) = (x, y);
        self.conn().warp_pointer(self.xid(), x as i16, y as i16);
        self.conn().flush();
    }

    fn realize(&self, cursor: &Cursor) -> Option<u32> {
        let xid = self.xid();
        let mut cursors = lock(&self.cursors);
        match cursors
            .realized
            .get_or_try_insert(cursor.id(), || self.conn().create_cursor(xid, cursor.image(), cursor.hotspot()))
        {
            Ok(id) => Some(*id),
            Err(e) => {
                logwise::warn_sync!("Unable to create cursor: {e}", e = e.to_string());
                None
            }
        }
    }

    fn define(&self, cursor: Option<&Cursor>) {
        let id = match cursor {
            None => 0,
            Some(cursor) => match self.realize(cursor) {
                Some(id) => id,
                None => return,
            },
        };
        self.conn().define_cursor(self.xid(), id);
        self.conn().flush();
    }

    fn define_blank(&self) {
        let xid = self.xid();
        let blank = {
            let mut cursors = lock(&self.cursors);
            match cursors.blank {
                Some(blank) => blank,
                None => {
                    let Ok(image) = Image::new(1, 1, vec![0; 4]) else { return };
                    match self.conn().create_cursor(xid, &image, Position::new(0, 0)) {
                        Ok(blank) => *cursors.blank.insert(blank),
                        Err(e) => {
                            logwise::warn_sync!("Unable to create blank cursor: {e}", e = e.to_string());
                            return;
                        }
                    }
                }
            }
        };
        self.conn().define_cursor(xid, blank);
    }

    fn grab(&self, grabbed: bool, restore_position: bool) {
        if grabbed {
            if let Err(e) = self.conn().grab_pointer(self.xid()) {
                logwise::warn_sync!("GrabPointer: {e}", e = e.to_string());
            }
            self.define_blank();
            self.can_send_relative.store(false, Ordering::Release);
        } else {
            self.conn().ungrab_pointer();
            let window = self.window();
            if restore_position {
                if let Some(window) = &window {
                    let (x, y) = window.cursor_position();
                    if x != 0.0 && y != 0.0 {
                        self.warp(x as i32, y as i32);
                    }
                }
            }
            self.define(window.and_then(|w| w.cursor()).as_ref());
        }
    }

    /// Grabs from the pump thread are carried out on the dispatcher.
    fn submit_grab(&self, grabbed: bool, restore_position: bool) {
        let me = self.me.clone();
        self.shared.submit(move || {
            if let Some(me) = me.upgrade() {
                me.grab(grabbed, restore_position);
                me.conn().flush();
            }
        });
    }

    fn free_cursors(&self) {
        let mut cursors = lock(&self.cursors);
        let blank = cursors.blank.take();
        for id in cursors.realized.drain().chain(blank) {
            self.conn().free_cursor(id);
        }
    }

    // ---- events ----

    fn refresh_indicators(&self, window: &Window) {
        let Some(bits) = self.conn().indicator_state() else { return };
        for (key, sym, mask) in [
            (Key::CapsLock, XK_CAPS_LOCK, 0x01),
            (Key::NumLock, XK_NUM_LOCK, 0x02),
            (Key::ScrollLock, XK_SCROLL_LOCK, 0x04),
        ] {
            let state = if bits & mask != 0 { KeyState::On } else { KeyState::Off };
            window.try_add_keyboard_state_event(key, u64::from(sym), state);
        }
    }

    fn key_transition(&self, window: &Window, sym: Keysym, state: KeyState) {
        let key = keysym::to_key(sym);
        if key.is_lock() {
            self.refresh_indicators(window);
            return;
        }
        if key == Key::Invalid {
            logwise::debuginternal_sync!("Unknown X keysym {sym}", sym = sym);
        }
        window.try_add_keyboard_state_event(key, u64::from(sym), state);
    }

    fn button(&self, window: &Window, detail: u8, pressed: bool) {
        match decode_button(detail, pressed) {
            Ok(Some((button, state))) => {
                window.add_mouse_event(button, state);
            }
            Ok(None) => {}
            Err(detail) => logwise::warn_sync!("Unknown button event; Detail={detail}", detail = detail),
        }
    }

    fn motion(&self, window: &Window, x: i32, y: i32) {
        if !(window.cursor_grabbed() && window.focused()) {
            *lock(&self.last_cursor) = (x, y);
            window.try_set_cursor_position(f64::from(x), f64::from(y));
            return;
        }
        let (dx, dy) = {
            let mut last = lock(&self.last_cursor);
            if last.0 == UNKNOWN || last.1 == UNKNOWN {
                *last = (x, y);
                (0, 0)
            } else {
                (x - last.0, y - last.1)
            }
        };
        if dx == 0 && dy == 0 {
            return;
        }
        //the first delta after a grab is the warp itself
        if self.can_send_relative.swap(true, Ordering::AcqRel) {
            window.send_relative_cursor(f64::from(dx), f64::from(dy));
        }
        //a grabbed pointer still stops at the window edge
        let size = window.size();
        self.warp(size.width() / 2, size.height() / 2);
    }

    pub(crate) fn handle_event(&self, event: &XEvent) {
        let Some(window) = self.window() else { return };
        let atoms = self.shared.atoms();
        match *event {
            XEvent::KeyPress { keycode, .. } => {
                let (sym, character) = self.conn().lookup_key(keycode);
                self.key_transition(&window, sym, KeyState::Down);
                if let Some(character) = character.filter(|c| keysym::is_typed(*c)) {
                    window.send_typed(character);
                }
            }
            XEvent::KeyRelease { keycode, .. } => {
                let (sym, _) = self.conn().lookup_key(keycode);
                self.key_transition(&window, sym, KeyState::Up);
            }
            XEvent::ButtonPress { detail, .. } => self.button(&window, detail, true),
            XEvent::ButtonRelease { detail, .. } => self.button(&window, detail, false),
            XEvent::Motion { x, y, .. } => self.motion(&window, i32::from(x), i32::from(y)),
            XEvent::Enter { .. } => {
                window.try_set_cursor_within(true);
                self.clear_last_cursor();
                if window.cursor_grabbed() && window.focused() {
                    self.submit_grab(true, false);
                }
            }
            XEvent::Leave { .. } => {
                window.try_set_cursor_within(false);
            }
            XEvent::FocusIn { .. } => {
                window.try_set_focused(true);
                if window.cursor_grabbed() {
                    self.submit_grab(window.cursor_within(), false);
                }
            }
            XEvent::FocusOut { .. } => {
                window.try_set_focused(false);
                window.release_downed_buttons();
                if window.cursor_grabbed() {
                    self.submit_grab(false, window.cursor_within());
                }
            }
            XEvent::ClientMessage { data, .. } => {
                if data[0] == atoms.wm_delete_window {
                    window.send_close();
                }
            }
            XEvent::Property { atom, .. } => {
                if atom == atoms.net_frame_extents {
                    if let Some(extents) = self.fetch_extents() {
                        window.try_set_extents(extents);
                    }
                    self.frame_extents.notify();
                } else if atom == atoms.motif_wm_hints {
                    self.motif_hints.notify();
                }
            }
            XEvent::Configure { x, y, width, height, .. } => {
                if width != 0 && height != 0 && self.can_send_size.load(Ordering::Acquire) {
                    window.try_set_size(Size::new(i32::from(width), i32::from(height)));
                }
                if (x != 0 || y != 0) && self.can_send_position.load(Ordering::Acquire) {
                    window.try_set_position(Position::new(i32::from(x), i32::from(y)));
                }
            }
            XEvent::Expose { .. } | XEvent::Map { .. } => self.mapped.notify(),
            XEvent::Unmap { .. } => self.unmapped.notify(),
            XEvent::Reparent { .. } => {}
            XEvent::Error { .. } | XEvent::Xkb { .. } | XEvent::Other { .. } => {}
        }
    }
}

impl<C: XConnection> NativeWindow for X11Window<C> {
    fn open(&self, screen: &Screen) -> Result<(), WindowError> {
        logwise::debuginternal_sync!("Opening X window on {screen}", screen = screen.to_string());
        self.rebuild()
    }

    fn destroy(&self) {
        self.destroy_native();
        self.free_cursors();
        self.conn().flush();
    }

    fn notify(&self) {
        let atoms = self.shared.atoms();
        self.net_wm_state(true, atoms.net_wm_state_demands_attention, 0);
    }

    fn set_title(&self, title: &str) {
        self.conn().set_title(self.xid(), title);
        self.conn().flush();
    }

    fn set_icon(&self, icon: Option<&Icon>) {
        if let Some(icon) = icon {
            self.update_icon(icon);
            self.conn().flush();
        }
    }

    fn set_visible(&self, visible: bool) {
        if let Some(window) = self.window() {
            self.show(&window, visible);
        }
    }

    fn set_decorated(&self, decorated: bool) {
        let Some(window) = self.window() else { return };
        let timeouts = self.shared.timeouts;
        let position = window.position();
        self.set_can_send(false);
        self.motif_hints.clear();
        self.update_motif_hints(decorated);
        self.conn().flush();
        if !self.motif_hints.wait(timeouts.wm_hints) {
            logwise::warn_sync!("Timed out waiting for _MOTIF_WM_HINTS PropertyNotify event.");
        }
        //window managers move the client while re-parenting; keep asking for our position
        let deadline = Instant::now() + timeouts.redecorate;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(REDECORATE_STEP.min(remaining));
            self.configure_position(&window, position);
            self.conn().flush();
        }
        self.set_can_send(true);
    }

    fn set_transparent(&self, transparent: bool) {
        if self.transparent.swap(transparent, Ordering::AcqRel) == transparent {
            return;
        }
        if let Err(e) = self.rebuild() {
            logwise::error_sync!("Unable to rebuild window for transparency: {e}", e = e.to_string());
        }
    }

    fn set_always_on_top(&self, always_on_top: bool) {
        let atoms = self.shared.atoms();
        self.net_wm_state(always_on_top, atoms.net_wm_state_above, 0);
    }

    fn set_position(&self, position: Position) {
        if let Some(window) = self.window() {
            self.configure_position(&window, position);
            self.conn().flush();
        }
    }

    fn set_size(&self, size: Size) {
        if let Some(window) = self.window() {
            self.configure_size(&window, size);
            self.conn().flush();
        }
    }

    fn set_minimum_size(&self, _size: Size) {
        if let Some(window) = self.window() {
            self.configure_size(&window, window.clamped_size());
            self.conn().flush();
        }
    }

    fn set_maximum_size(&self, _size: Size) {
        if let Some(window) = self.window() {
            self.configure_size(&window, window.clamped_size());
            self.conn().flush();
        }
    }

    fn set_aspect_ratio(&self, _ratio: f32) {
        if let Some(window) = self.window() {
            self.configure_size(&window, window.clamped_size());
            self.conn().flush();
        }
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        let atoms = self.shared.atoms();
        self.net_wm_state(fullscreen, atoms.net_wm_state_fullscreen, 0);
    }

    fn set_minimized(&self, minimized: bool) {
        if minimized {
            self.iconify();
        } else if let Some(window) = self.window() {
            //mapping again restores an iconified window
            self.show(&window, window.visible());
        }
    }

    fn set_maximized(&self, maximized: bool) {
        let atoms = self.shared.atoms();
        self.net_wm_state(maximized, atoms.net_wm_state_maximized_vert, atoms.net_wm_state_maximized_horz);
    }

    fn set_cursor(&self, cursor: Option<&Cursor>) {
        self.define(cursor);
    }

    fn prepare_cursor(&self, cursor: &Cursor) {
        self.realize(cursor);
    }

    fn free_cursor(&self, cursor: &Cursor) {
        let removed = lock(&self.cursors).realized.remove(cursor.id());
        if let Some(id) = removed {
            self.conn().free_cursor(id);
            self.conn().flush();
        }
    }

    fn set_cursor_grabbed(&self, grabbed: bool) {
        self.grab(grabbed, true);
        self.conn().flush();
    }

    fn set_cursor_position(&self, x: f64, y: f64) {
        if let Some(window) = self.window() {
            if window.cursor_grabbed() && window.focused() {
                return;
            }
        }
        self.warp(x as i32, y as i32);
    }

    fn raw_window_handle(&self) -> Option<RawWindowHandle> {
        NonZeroU32::new(self.xid()).map(|id| RawWindowHandle::Xcb(XcbWindowHandle::new(id)))
    }

    fn gl_configs(&self) -> Vec<GLConfig> {
        self.conn().glx_configs()
    }

    fn gl_set_config(&self, config: &GLConfig) {
        *lock(&self.gl_config) = Some(config.backend_id());
        self.transparent.store(config.transparent, Ordering::Release);
        //the window must be recreated with the configuration's visual
        if self.xid() != 0 {
            if let Err(e) = self.rebuild() {
                logwise::error_sync!("Unable to rebuild window for {config}: {e}", config = config.to_string(), e = e.to_string());
            }
        }
    }

    fn gl_create_context(
        &self,
        major: u32,
        minor: u32,
        flags: GLContextFlags,
        share: Option<NativeContextId>,
    ) -> Result<NativeContextId, GlError> {
        let Some(config) = *lock(&self.gl_config) else {
            return Err(GlError::NoConfig);
        };
        let extensions = self.conn().glx_extensions();
        if !extension_supported(&extensions, "GLX_ARB_create_context") {
            return Err(GlError::Context("GLX_ARB_create_context is not supported".to_string()));
        }
        let profile = GLContextFlags::CORE_PROFILE | GLContextFlags::COMPATIBILITY_PROFILE;
        if flags.bits() & profile.bits() != 0 && !extension_supported(&extensions, "GLX_ARB_create_context_profile") {
            return Err(GlError::Context("GLX_ARB_create_context_profile is not supported".to_string()));
        }
        let request = ContextRequest { config, major, minor, flags };
        match self.conn().glx_create_context(&request, share.map(|s| s.0)) {
            Ok(id) => Ok(NativeContextId(id)),
            Err(X11Error::BadMatch) => Err(GlError::VersionNotSupported { major, minor }),
            Err(e) => Err(GlError::Context(e.to_string())),
        }
    }

    fn gl_destroy_context(&self, context: NativeContextId) {
        self.conn().glx_destroy_context(context.0);
    }

    fn gl_make_current(&self, context: Option<NativeContextId>) {
        self.conn().glx_make_current(self.xid(), context.map(|c| c.0));
    }

    fn gl_swap_buffers(&self) {
        self.conn().glx_swap_buffers(self.xid());
    }

    fn gl_set_vertical_sync(&self, mode: VSyncMode) {
        let extensions = self.conn().glx_extensions();
        if !extension_supported(&extensions, "GLX_EXT_swap_control") {
            logwise::warn_sync!("GLX_EXT_swap_control is not supported; cannot set {mode}", mode = mode.to_string());
            return;
        }
        let interval = match mode {
            VSyncMode::VerticalSync => 1,
            VSyncMode::NoVerticalSync => 0,
            VSyncMode::AdaptiveVerticalSync if extension_supported(&extensions, "GLX_EXT_swap_control_tear") => -1,
            VSyncMode::AdaptiveVerticalSync => {
                logwise::warn_sync!("GLX_EXT_swap_control_tear is not supported; using VerticalSync");
                1
            }
        };
        self.conn().glx_swap_interval(self.xid(), interval);
    }
}
