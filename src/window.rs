// SPDX-License-Identifier: MPL-2.0
/*!
Windows and their state reconciliation.

A [`Window`] caches every attribute twice over: the value the application *requested* and the
value the OS last *reported*.  Two families of methods keep them consistent.

* Setters (`set_size`, `set_cursor`, ...) run on any thread.  A setter that changes nothing does
  nothing.  Otherwise it stores the value and, if the window is open, queues the native call on
  the dispatcher.  It does not wait for the call.
* `try_set_*` methods are for native event pumps.  They publish an event only when the reported
  value differs from the cached one, and never call back into the native window, so a resize the
  application asked for cannot bounce back and forth between the cache and the OS.

```no_run
use gl_window::{window::Window, coordinates::Size, event::EventKind};

let window = Window::new();
window.set_minimum_size(Size::new(150, 150));
window.open(None).unwrap();
let events = window.events();
window.set_size(Size::new(50, 50));
// the native window receives 150x150; size() still reports what was asked for
assert_eq!(window.size(), Size::new(50, 50));
while let Ok(event) = events.recv() {
    match event.kind {
        EventKind::Close => { window.destroy(); break }
        _ => {}
    }
}
```
*/
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use raw_window_handle::RawWindowHandle;

use crate::application::{DestroyCallbackId, Platform};
use crate::backend::{Backend, NativeWindow};
use crate::coordinates::{Extents, Position, Size};
use crate::cursor::{Cursor, Icon};
use crate::event::{Event, EventKind, Rect};
use crate::fanout::Fanout;
use crate::gl::{GLConfig, GLContext, GLContextFlags, GlError, VSyncMode};
use crate::input::keyboard::key::Key;
use crate::input::keyboard::{KeyState, KeyboardWatcher};
use crate::input::mouse::{Button, ButtonState, MouseWatcher};
use crate::screen::Screen;

pub use crate::fanout::EventReceiver;

pub const DEFAULT_TITLE: &str = "gl_window";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("no screen is available to open the window on")]
    NoScreen,
    #[error("native window creation failed: {0}")]
    Create(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Unopened,
    Opening,
    Open,
    Destroyed,
}

/// Which of minimized, fullscreen and maximized currently governs how the window is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Normal,
    Maximized,
    Fullscreen,
    Minimized,
}

/// A requested value and the last value the OS reported.
#[derive(Debug, Clone, Copy)]
struct Tracked<T> {
    requested: T,
    observed: Option<T>,
}

impl<T: Copy + PartialEq> Tracked<T> {
    fn new(requested: T) -> Self {
        Tracked { requested, observed: None }
    }

    fn differs_from_observed(&self, value: T) -> bool {
        self.observed != Some(value)
    }

    //an OS report also becomes the value getters return
    fn observe(&mut self, value: T) {
        self.observed = Some(value);
        self.requested = value;
    }
}

#[derive(Debug)]
struct State {
    lifecycle: Lifecycle,
    title: String,
    icon: Option<Icon>,

    cursor: Option<Cursor>,
    cursor_grabbed: bool,
    cursor_position: (f64, f64),
    pre_grab_cursor_position: (f64, f64),
    cursor_within: bool,
    focused: bool,

    visible: bool,
    decorated: bool,
    transparent: bool,
    always_on_top: bool,
    fullscreen: bool,
    minimized: Tracked<bool>,
    maximized: Tracked<bool>,

    position: Tracked<Position>,
    size: Tracked<Size>,
    pre_fullscreen: (Position, Size),
    minimum_size: Size,
    maximum_size: Size,
    aspect_ratio: f32,
    extents: Extents,

    screen: Option<Screen>,
    original_screen: Option<Screen>,
    gl_config: Option<GLConfig>,
}

impl State {
    fn new() -> Self {
        State {
            lifecycle: Lifecycle::Unopened,
            title: DEFAULT_TITLE.to_string(),
            icon: None,
            cursor: None,
            cursor_grabbed: false,
            cursor_position: (0.0, 0.0),
            pre_grab_cursor_position: (0.0, 0.0),
            cursor_within: false,
            focused: false,
            visible: true,
            decorated: true,
            transparent: false,
            always_on_top: false,
            fullscreen: false,
            minimized: Tracked::new(false),
            maximized: Tracked::new(false),
            position: Tracked::new(Position::new(100, 100)),
            size: Tracked::new(Size::new(640, 480)),
            pre_fullscreen: (Position::default(), Size::default()),
            minimum_size: Size::new(150, 150),
            maximum_size: Size::default(),
            aspect_ratio: 0.0,
            extents: Extents::ZERO,
            screen: None,
            original_screen: None,
            gl_config: None,
        }
    }

    fn is_open(&self) -> bool {
        self.lifecycle == Lifecycle::Open
    }

    fn clamped_size(&self) -> Size {
        let mut width = self.size.requested.width().max(1);
        let mut height = self.size.requested.height().max(1);
        if self.minimum_size.is_set() {
            width = width.max(self.minimum_size.width());
            height = height.max(self.minimum_size.height());
        }
        if self.maximum_size.is_set() {
            width = width.min(self.maximum_size.width());
            height = height.min(self.maximum_size.height());
        }
        Size::new(width, height)
    }
}

type NativeOp = Box<dyn FnOnce(&dyn NativeWindow) + Send>;

fn native_op<F: FnOnce(&dyn NativeWindow) + Send + 'static>(f: F) -> NativeOp {
    Box::new(f)
}

struct Shared {
    platform: Platform,
    backend: Arc<dyn Backend>,
    state: RwLock<State>,
    native: RwLock<Arc<dyn NativeWindow>>,
    subscribers: Fanout,
    keyboard: Mutex<KeyboardWatcher>,
    mouse: Mutex<MouseWatcher>,
    destroy_callback: Mutex<Option<DestroyCallbackId>>,
}

/**
A window.

Cheap to clone; clones are the same window.  Dropping every clone does not close the native
window; call [`Window::destroy`].
*/
#[derive(Clone)]
pub struct Window {
    shared: Arc<Shared>,
}

/// A non-owning reference to a [`Window`], held by native windows and event pumps.
#[derive(Clone, Default)]
pub struct WeakWindow(Weak<Shared>);

impl WeakWindow {
    pub fn upgrade(&self) -> Option<Window> {
        self.0.upgrade().map(|shared| Window { shared })
    }
}

impl std::fmt::Debug for WeakWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeakWindow({:p})", self.0.as_ptr())
    }
}

impl PartialEq for Window {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}
impl Eq for Window {}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Window")
            .field("title", &state.title)
            .field("lifecycle", &state.lifecycle)
            .field("position", &state.position.requested)
            .field("size", &state.size.requested)
            .finish()
    }
}

impl Default for Window {
    fn default() -> Self {
        Window::new()
    }
}

impl Window {
    /**
    Creates an unopened window on the process-wide platform.

    # Panics

    Panics if [`crate::application::init`] has not succeeded.
    */
    pub fn new() -> Self {
        Window::new_in(crate::application::platform())
    }

    /// Creates an unopened window on `platform`.
    ///
    /// # Panics
    ///
    /// Panics if `platform` is not initialized.
    pub fn new_in(platform: &Platform) -> Self {
        let backend = platform.require_backend();
        let shared = Arc::new_cyclic(|weak| Shared {
            platform: platform.clone(),
            native: RwLock::new(backend.new_native_window(WeakWindow(weak.clone()))),
            backend,
            state: RwLock::new(State::new()),
            subscribers: Fanout::new(),
            keyboard: Mutex::new(KeyboardWatcher::new()),
            mouse: Mutex::new(MouseWatcher::new()),
            destroy_callback: Mutex::new(None),
        });
        Window { shared }
    }

    pub fn downgrade(&self) -> WeakWindow {
        WeakWindow(Arc::downgrade(&self.shared))
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.shared.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.shared.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn keyboard(&self) -> MutexGuard<'_, KeyboardWatcher> {
        self.shared.keyboard.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mouse(&self) -> MutexGuard<'_, MouseWatcher> {
        self.shared.mouse.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn native(&self) -> Arc<dyn NativeWindow> {
        self.shared.native.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn publish(&self, kind: EventKind) {
        self.shared.subscribers.publish(Event::new(kind));
    }

    /// Queues `op` on the dispatcher without waiting.
    fn apply(&self, op: NativeOp) {
        let native = self.native();
        self.shared.platform.dispatcher().submit(move || op(&*native));
    }

    /**
    The caller-driven half of reconciliation.

    `differs` is checked under the read lock, then again under the write lock, where `store`
    records the value and decides whether a native call is needed.
    */
    fn request(
        &self,
        differs: impl Fn(&State) -> bool,
        store: impl FnOnce(&mut State) -> Option<NativeOp>,
    ) {
        if !differs(&*self.read()) {
            return;
        }
        let op = {
            let mut state = self.write();
            if !differs(&*state) {
                return;
            }
            store(&mut *state)
        };
        if let Some(op) = op {
            self.apply(op);
        }
    }

    /// The native-driven half: publishes whatever `update` returns, after the lock is released.
    fn observe(
        &self,
        differs: impl Fn(&State) -> bool,
        update: impl FnOnce(&mut State) -> Option<EventKind>,
    ) -> bool {
        if !differs(&*self.read()) {
            return false;
        }
        let event = {
            let mut state = self.write();
            if !differs(&*state) {
                return false;
            }
            update(&mut *state)
        };
        if let Some(kind) = event {
            self.publish(kind);
        }
        true
    }

    // ---- events ----

    /// Subscribes with the platform's default buffer size (64 unless configured).
    pub fn events(&self) -> EventReceiver {
        self.events_buffer(self.shared.platform.options().event_buffer)
    }

    /// Subscribes with room for `buffer` undelivered events.  Further events are dropped.
    pub fn events_buffer(&self, buffer: usize) -> EventReceiver {
        self.shared.subscribers.subscribe(buffer)
    }

    pub fn close_events(&self, receiver: &EventReceiver) {
        self.shared.subscribers.unsubscribe(receiver.id());
    }

    // ---- lifecycle ----

    /**
    Opens the window on `screen`, or the backend's default screen.

    Does nothing if already open.  A destroyed window gets a fresh native window.
    Blocks until the native window exists.
    */
    pub fn open(&self, screen: Option<&Screen>) -> Result<(), WindowError> {
        let screen = match screen {
            Some(screen) => screen.clone(),
            None => self.shared.backend.default_screen().ok_or(WindowError::NoScreen)?,
        };
        {
            let mut state = self.write();
            match state.lifecycle {
                Lifecycle::Open | Lifecycle::Opening => return Ok(()),
                Lifecycle::Destroyed => {
                    let fresh = self.shared.backend.new_native_window(self.downgrade());
                    *self.shared.native.write().unwrap_or_else(PoisonError::into_inner) = fresh;
                    state.focused = false;
                    state.cursor_within = false;
                    state.size.observed = None;
                    state.position.observed = None;
                }
                Lifecycle::Unopened => {}
            }
            state.lifecycle = Lifecycle::Opening;
            state.screen = Some(screen.clone());
            state.original_screen = Some(screen.clone());
        }
        let native = self.native();
        let opened = self
            .shared
            .platform
            .dispatch(move || native.open(&screen));
        {
            let mut state = self.write();
            if let Err(e) = opened {
                state.lifecycle = Lifecycle::Unopened;
                logwise::error_sync!("Failed to open window: {e}", e = e.to_string());
                return Err(e);
            }
            state.focused = true;
            state.lifecycle = Lifecycle::Open;
        }
        let weak = self.downgrade();
        let id = self.shared.platform.add_destroy_callback(move || {
            if let Some(window) = weak.upgrade() {
                window.destroy();
            }
        });
        *self.shared.destroy_callback.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
        Ok(())
    }

    /// Destroys the native window.  Does nothing unless open.
    pub fn destroy(&self) {
        {
            let mut state = self.write();
            if !state.is_open() {
                return;
            }
            state.lifecycle = Lifecycle::Destroyed;
        }
        self.publish(EventKind::Destroyed);
        if let Some(id) = self.shared.destroy_callback.lock().unwrap_or_else(PoisonError::into_inner).take() {
            self.shared.platform.remove_destroy_callback(id);
        }
        let native = self.native();
        self.shared.platform.dispatch(move || native.destroy());
    }

    pub fn is_open(&self) -> bool {
        self.read().is_open()
    }

    pub fn is_destroyed(&self) -> bool {
        self.read().lifecycle == Lifecycle::Destroyed
    }

    /// Requests the user's attention.
    pub fn notify(&self) {
        if self.is_open() {
            self.apply(native_op(|n| n.notify()));
        }
    }

    pub fn raw_window_handle(&self) -> Option<RawWindowHandle> {
        if !self.is_open() {
            return None;
        }
        self.native().raw_window_handle()
    }

    // ---- getters ----

    pub fn title(&self) -> String {
        self.read().title.clone()
    }
    pub fn icon(&self) -> Option<Icon> {
        self.read().icon.clone()
    }
    pub fn cursor(&self) -> Option<Cursor> {
        self.read().cursor.clone()
    }
    pub fn cursor_grabbed(&self) -> bool {
        self.read().cursor_grabbed
    }
    pub fn cursor_position(&self) -> (f64, f64) {
        self.read().cursor_position
    }
    pub fn cursor_within(&self) -> bool {
        self.read().cursor_within
    }
    pub fn focused(&self) -> bool {
        self.read().focused
    }
    pub fn visible(&self) -> bool {
        self.read().visible
    }
    pub fn decorated(&self) -> bool {
        self.read().decorated
    }
    pub fn transparent(&self) -> bool {
        self.read().transparent
    }
    pub fn always_on_top(&self) -> bool {
        self.read().always_on_top
    }
    pub fn fullscreen(&self) -> bool {
        self.read().fullscreen
    }
    pub fn minimized(&self) -> bool {
        self.read().minimized.requested
    }
    pub fn maximized(&self) -> bool {
        self.read().maximized.requested
    }
    pub fn position(&self) -> Position {
        self.read().position.requested
    }
    /// The last requested (or reported) size, before clamping.
    pub fn size(&self) -> Size {
        self.read().size.requested
    }
    pub fn minimum_size(&self) -> Size {
        self.read().minimum_size
    }
    pub fn maximum_size(&self) -> Size {
        self.read().maximum_size
    }
    pub fn aspect_ratio(&self) -> f32 {
        self.read().aspect_ratio
    }
    pub fn screen(&self) -> Option<Screen> {
        self.read().screen.clone()
    }
    /// The screen the window was opened on.
    pub fn original_screen(&self) -> Option<Screen> {
        self.read().original_screen.clone()
    }

    /**
    The size the native window is given: [`Window::size`] limited to at least 1x1, then to the
    minimum size when both of its components are nonzero, then to the maximum size likewise.
    */
    pub fn clamped_size(&self) -> Size {
        self.read().clamped_size()
    }

    /// Decoration thickness; zero unless open.
    pub fn extents(&self) -> Extents {
        let state = self.read();
        if state.is_open() { state.extents } else { Extents::ZERO }
    }

    pub fn display_state(&self) -> DisplayState {
        let state = self.read();
        if state.minimized.requested {
            DisplayState::Minimized
        } else if state.fullscreen {
            DisplayState::Fullscreen
        } else if state.maximized.requested {
            DisplayState::Maximized
        } else {
            DisplayState::Normal
        }
    }

    pub fn key_state(&self, key: Key) -> KeyState {
        self.keyboard().state(key)
    }

    pub fn raw_key_state(&self, raw: u64) -> KeyState {
        self.keyboard().raw_state(raw)
    }

    pub fn button_state(&self, button: Button) -> ButtonState {
        self.mouse().state(button)
    }

    // ---- caller-driven setters ----

    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        let stored = title.clone();
        self.request(|s| s.title != title, move |s| {
            s.title = stored.clone();
            s.is_open().then(|| native_op(move |n| n.set_title(&stored)))
        });
    }

    pub fn set_icon(&self, icon: Option<Icon>) {
        let stored = icon.clone();
        self.request(|s| s.icon != icon, move |s| {
            s.icon = stored.clone();
            s.is_open().then(|| native_op(move |n| n.set_icon(stored.as_ref())))
        });
    }

    pub fn set_visible(&self, visible: bool) {
        self.request(|s| s.visible != visible, |s| {
            s.visible = visible;
            s.is_open().then(|| native_op(move |n| n.set_visible(visible)))
        });
    }

    pub fn set_decorated(&self, decorated: bool) {
        self.request(|s| s.decorated != decorated, |s| {
            s.decorated = decorated;
            s.is_open().then(|| native_op(move |n| n.set_decorated(decorated)))
        });
    }

    pub fn set_transparent(&self, transparent: bool) {
        self.request(|s| s.transparent != transparent, |s| {
            s.transparent = transparent;
            s.is_open().then(|| native_op(move |n| n.set_transparent(transparent)))
        });
    }

    pub fn set_always_on_top(&self, always_on_top: bool) {
        self.request(|s| s.always_on_top != always_on_top, |s| {
            s.always_on_top = always_on_top;
            s.is_open().then(|| native_op(move |n| n.set_always_on_top(always_on_top)))
        });
    }

    pub fn set_position(&self, position: Position) {
        self.request(|s| s.position.requested != position, |s| {
            s.position.requested = position;
            s.is_open().then(|| native_op(move |n| n.set_position(position)))
        });
    }

    /// Moves the window to the center of `screen`.
    pub fn set_position_center(&self, screen: &Screen) {
        self.set_position(screen.center_of(self.size()));
    }

    /// Stores `size` as requested; the native window receives [`Window::clamped_size`].
    pub fn set_size(&self, size: Size) {
        self.request(|s| s.size.requested != size, |s| {
            s.size.requested = size;
            let clamped = s.clamped_size();
            s.is_open().then(|| native_op(move |n| n.set_size(clamped)))
        });
    }

    /// Zero in either component means no minimum.
    pub fn set_minimum_size(&self, size: Size) {
        self.request(|s| s.minimum_size != size, |s| {
            s.minimum_size = size;
            s.is_open().then(|| native_op(move |n| n.set_minimum_size(size)))
        });
    }

    /// Zero in either component means no maximum.
    pub fn set_maximum_size(&self, size: Size) {
        self.request(|s| s.maximum_size != size, |s| {
            s.maximum_size = size;
            s.is_open().then(|| native_op(move |n| n.set_maximum_size(size)))
        });
    }

    /// Width divided by height to keep while the user resizes; zero for none.
    pub fn set_aspect_ratio(&self, ratio: f32) {
        self.request(|s| s.aspect_ratio != ratio, |s| {
            s.aspect_ratio = ratio;
            s.is_open().then(|| native_op(move |n| n.set_aspect_ratio(ratio)))
        });
    }

    /**
    Enters or leaves fullscreen.

    Entering remembers the position and size; leaving restores them.
    */
    pub fn set_fullscreen(&self, fullscreen: bool) {
        self.request(|s| s.fullscreen != fullscreen, |s| {
            if fullscreen {
                s.pre_fullscreen = (s.position.requested, s.size.requested);
            } else {
                let (position, size) = s.pre_fullscreen;
                s.position.requested = position;
                s.size.requested = size;
            }
            s.fullscreen = fullscreen;
            let size = s.clamped_size();
            let position = s.position.requested;
            s.is_open().then(|| {
                native_op(move |n| {
                    n.set_fullscreen(fullscreen);
                    n.set_size(size);
                    n.set_position(position);
                })
            })
        });
    }

    /// Applied natively only while open and visible.
    pub fn set_minimized(&self, minimized: bool) {
        self.request(|s| s.minimized.requested != minimized, |s| {
            s.minimized.requested = minimized;
            (s.is_open() && s.visible).then(|| native_op(move |n| n.set_minimized(minimized)))
        });
    }

    /// Applied natively only while open and visible.
    pub fn set_maximized(&self, maximized: bool) {
        self.request(|s| s.maximized.requested != maximized, |s| {
            s.maximized.requested = maximized;
            (s.is_open() && s.visible).then(|| native_op(move |n| n.set_maximized(maximized)))
        });
    }

    /// Sets the cursor image; `None` is the platform default.  Compared by identity.
    pub fn set_cursor(&self, cursor: Option<Cursor>) {
        let stored = cursor.clone();
        self.request(|s| s.cursor != cursor, move |s| {
            s.cursor = stored.clone();
            s.is_open().then(|| native_op(move |n| n.set_cursor(stored.as_ref())))
        });
    }

    /// Realizes `cursor` natively ahead of first use.
    pub fn prepare_cursor(&self, cursor: &Cursor) {
        if self.is_open() {
            let cursor = cursor.clone();
            self.apply(native_op(move |n| n.prepare_cursor(&cursor)));
        }
    }

    /// Releases the native resource for `cursor`, first unsetting it if active.
    pub fn free_cursor(&self, cursor: &Cursor) {
        if self.cursor().as_ref() == Some(cursor) {
            self.set_cursor(None);
        }
        if self.is_open() {
            let cursor = cursor.clone();
            self.apply(native_op(move |n| n.free_cursor(&cursor)));
        }
    }

    /**
    Grabs or releases the cursor.

    Grabbing records the cursor position.  Releasing restores exactly that position, whatever
    was reported during the grab.  Applied natively only while open with the cursor inside.
    */
    pub fn set_cursor_grabbed(&self, grabbed: bool) {
        self.request(|s| s.cursor_grabbed != grabbed, |s| {
            s.cursor_grabbed = grabbed;
            if grabbed {
                s.pre_grab_cursor_position = s.cursor_position;
            } else {
                s.cursor_position = s.pre_grab_cursor_position;
                s.pre_grab_cursor_position = (0.0, 0.0);
            }
            (s.is_open() && s.cursor_within)
                .then(|| native_op(move |n| n.set_cursor_grabbed(grabbed)))
        });
    }

    /// Moves the cursor, in window coordinates.
    pub fn set_cursor_position(&self, x: f64, y: f64) {
        self.request(|s| s.cursor_position != (x, y), |s| {
            s.cursor_position = (x, y);
            s.is_open().then(|| native_op(move |n| n.set_cursor_position(x, y)))
        });
    }

    // ---- native-driven updates ----

    /// The OS reports a new client size.
    pub fn try_set_size(&self, size: Size) -> bool {
        self.observe(|s| s.size.differs_from_observed(size), |s| {
            s.size.observe(size);
            Some(EventKind::Resized(size))
        })
    }

    pub fn try_set_position(&self, position: Position) -> bool {
        self.observe(|s| s.position.differs_from_observed(position), |s| {
            s.position.observe(position);
            Some(EventKind::Moved(position))
        })
    }

    pub fn try_set_focused(&self, focused: bool) -> bool {
        self.observe(|s| s.focused != focused, |s| {
            s.focused = focused;
            Some(EventKind::Focused(focused))
        })
    }

    pub fn try_set_cursor_within(&self, within: bool) -> bool {
        self.observe(|s| s.cursor_within != within, |s| {
            s.cursor_within = within;
            Some(EventKind::CursorWithin(within))
        })
    }

    pub fn try_set_minimized(&self, minimized: bool) -> bool {
        self.observe(|s| s.minimized.differs_from_observed(minimized), |s| {
            s.minimized.observe(minimized);
            Some(EventKind::Minimized(minimized))
        })
    }

    pub fn try_set_maximized(&self, maximized: bool) -> bool {
        self.observe(|s| s.maximized.differs_from_observed(maximized), |s| {
            s.maximized.observe(maximized);
            Some(EventKind::Maximized(maximized))
        })
    }

    pub fn try_set_screen(&self, screen: Screen) -> bool {
        self.observe(|s| s.screen.as_ref() != Some(&screen), |s| {
            s.screen = Some(screen.clone());
            Some(EventKind::ScreenChanged(screen.clone()))
        })
    }

    /// Stores the pointer position; an event is published only while the cursor is not grabbed.
    pub fn try_set_cursor_position(&self, x: f64, y: f64) -> bool {
        self.observe(|s| s.cursor_position != (x, y), |s| {
            s.cursor_position = (x, y);
            (!s.cursor_grabbed).then_some(EventKind::CursorPosition { x, y })
        })
    }

    /// Stores decoration extents.  Publishes nothing.
    pub fn try_set_extents(&self, extents: Extents) -> bool {
        self.observe(|s| s.extents != extents, |s| {
            s.extents = extents;
            None
        })
    }

    /// Records a key transition and publishes it, unless both the key and its raw code are
    /// already in `state`.
    pub fn try_add_keyboard_state_event(&self, key: Key, raw: u64, state: KeyState) -> bool {
        let changed = self.keyboard().update(key, raw, state);
        if changed {
            self.publish(EventKind::KeyboardState { key, raw, state });
        }
        changed
    }

    /// Records a button transition and publishes it.  Repeated `Down`/`Up` are ignored.
    pub fn add_mouse_event(&self, button: Button, state: ButtonState) -> bool {
        let changed = self.mouse().update(button, state);
        if changed {
            self.publish(EventKind::MouseButton { button, state });
        }
        changed
    }

    /// Publishes an `Up` for every key and button still down.
    pub fn release_downed_buttons(&self) {
        let keys = self.keyboard().release_all();
        for (key, raw) in keys {
            self.publish(EventKind::KeyboardState { key, raw, state: KeyState::Up });
        }
        let buttons = self.mouse().release_all();
        for button in buttons {
            self.publish(EventKind::MouseButton { button, state: ButtonState::Up });
        }
    }

    /// Publishes a cursor delta while grabbed.
    pub fn send_relative_cursor(&self, dx: f64, dy: f64) {
        self.publish(EventKind::CursorPosition { x: dx, y: dy });
    }

    pub fn send_typed(&self, character: char) {
        self.publish(EventKind::KeyboardTyped(character));
    }

    pub fn send_paint(&self, rect: Rect) {
        self.publish(EventKind::Paint(rect));
    }

    pub fn send_close(&self) {
        self.publish(EventKind::Close);
    }

    // ---- OpenGL ----

    /// Framebuffer configurations the backend offers for this window.
    pub fn gl_configs(&self) -> Vec<GLConfig> {
        let native = self.native();
        self.shared.platform.dispatch(move || native.gl_configs())
    }

    /**
    Chooses the framebuffer configuration.

    # Panics

    Panics if `config` did not come from [`Window::gl_configs`].
    */
    pub fn gl_set_config(&self, config: &GLConfig) {
        config.assert_valid();
        self.write().gl_config = Some(config.clone());
        let native = self.native();
        let config = config.clone();
        self.shared.platform.dispatch(move || native.gl_set_config(&config));
    }

    pub fn gl_config(&self) -> Option<GLConfig> {
        self.read().gl_config.clone()
    }

    /// Creates a context for the chosen configuration, optionally sharing objects with `share`.
    /// Blocks until the native context exists.
    pub fn gl_create_context(
        &self,
        major: u32,
        minor: u32,
        flags: GLContextFlags,
        share: Option<&GLContext>,
    ) -> Result<GLContext, GlError> {
        if self.read().gl_config.is_none() {
            return Err(GlError::NoConfig);
        }
        let share = share.map(|c| {
            assert!(!c.is_destroyed(), "cannot share with a destroyed GLContext");
            c.native_id()
        });
        let native = self.native();
        let id = self
            .shared
            .platform
            .dispatch(move || native.gl_create_context(major, minor, flags, share))?;
        Ok(GLContext::new(id))
    }

    /// # Panics
    ///
    /// Panics if `context` was already destroyed.
    pub fn gl_destroy_context(&self, context: &GLContext) {
        context.mark_destroyed();
        let native = self.native();
        let id = context.native_id();
        self.shared.platform.dispatch(move || native.gl_destroy_context(id));
    }

    /// Makes `context` current on the calling thread, or releases the current context.
    pub fn gl_make_current(&self, context: Option<&GLContext>) {
        let id = context.map(|c| {
            assert!(!c.is_destroyed(), "cannot make a destroyed GLContext current");
            c.native_id()
        });
        self.native().gl_make_current(id);
    }

    pub fn gl_swap_buffers(&self) {
        self.native().gl_swap_buffers();
    }

    pub fn gl_set_vertical_sync(&self, mode: VSyncMode) {
        self.native().gl_set_vertical_sync(mode);
    }
}

#[cfg(test)] mod test {
    use super::*;
    use crate::test_support::{Harness, NativeCall};

    #[test] fn test_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Window>();
        fn assert_sync<T: Sync>() {}
        assert_sync::<Window>();
    }

    #[test] fn setters_before_open_only_cache() {
        let h = Harness::new();
        let w = h.window();
        w.set_size(Size::new(800, 600));
        w.set_title("hello");
        h.settle();
        assert!(h.calls().is_empty());
        assert_eq!(w.size(), Size::new(800, 600));
        assert_eq!(w.title(), "hello");
    }

    #[test] fn identical_set_size_applies_once() {
        let h = Harness::new();
        let w = h.open_window();
        let events = w.events();
        w.set_size(Size::new(300, 200));
        w.set_size(Size::new(300, 200));
        h.settle();
        assert_eq!(h.count(|c| matches!(c, NativeCall::SetSize(_))), 1);
        assert!(events.try_recv().is_err());

        //the OS acknowledges, twice
        assert!(w.try_set_size(Size::new(300, 200)));
        assert!(!w.try_set_size(Size::new(300, 200)));
        let kinds: Vec<_> = events.try_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Resized(Size::new(300, 200))]);
    }

    #[test] fn native_updates_never_apply() {
        let h = Harness::new();
        let w = h.open_window();
        let before = h.calls().len();
        w.try_set_position(Position::new(5, 6));
        w.try_set_size(Size::new(10, 10));
        w.try_set_focused(false);
        w.try_set_cursor_within(true);
        w.try_set_minimized(true);
        w.try_set_maximized(true);
        w.try_set_cursor_position(1.0, 2.0);
        w.try_set_extents(Extents::new(1, 1, 1, 20));
        w.try_add_keyboard_state_event(Key::A, 38, KeyState::Down);
        w.release_downed_buttons();
        h.settle();
        assert_eq!(h.calls().len(), before);
        assert_eq!(w.position(), Position::new(5, 6));
    }

    #[test] fn clamped_size_reaches_native() {
        let h = Harness::new();
        let w = h.open_window();
        w.set_size(Size::new(50, 50));
        h.settle();
        assert_eq!(w.size(), Size::new(50, 50));
        assert_eq!(w.clamped_size(), Size::new(150, 150));
        assert_eq!(h.last(|c| match c {
            NativeCall::SetSize(s) => Some(*s),
            _ => None,
        }), Some(Size::new(150, 150)));
    }

    #[test] fn clamping_rules() {
        let h = Harness::new();
        let w = h.window();
        w.set_size(Size::new(0, -4));
        w.set_minimum_size(Size::new(0, 100));
        assert_eq!(w.clamped_size(), Size::new(1, 1));
        w.set_size(Size::new(5000, 5000));
        w.set_maximum_size(Size::new(800, 600));
        assert_eq!(w.clamped_size(), Size::new(800, 600));
        w.set_maximum_size(Size::new(800, 0));
        assert_eq!(w.clamped_size(), Size::new(5000, 5000));
    }

    #[test] fn grab_release_restores_position() {
        let h = Harness::new();
        let w = h.open_window();
        w.try_set_cursor_within(true);
        w.try_set_cursor_position(120.0, 80.0);
        let events = w.events();
        w.set_cursor_grabbed(true);
        //moves while grabbed are stored but not published as absolute positions
        w.try_set_cursor_position(320.0, 240.0);
        w.send_relative_cursor(4.0, -2.0);
        w.set_cursor_grabbed(false);
        assert_eq!(w.cursor_position(), (120.0, 80.0));
        h.settle();
        assert_eq!(h.count(|c| matches!(c, NativeCall::SetCursorGrabbed(_))), 2);
        let kinds: Vec<_> = events.try_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::CursorPosition { x: 4.0, y: -2.0 }]);
    }

    #[test] fn grab_outside_window_is_not_applied() {
        let h = Harness::new();
        let w = h.open_window();
        w.set_cursor_grabbed(true);
        h.settle();
        assert_eq!(h.count(|c| matches!(c, NativeCall::SetCursorGrabbed(_))), 0);
        assert!(w.cursor_grabbed());
    }

    #[test] fn focus_loss_releases_down_keys_once() {
        let h = Harness::new();
        let w = h.open_window();
        w.try_add_keyboard_state_event(Key::W, 25, KeyState::Down);
        w.try_add_keyboard_state_event(Key::LeftShift, 50, KeyState::Down);
        w.try_add_keyboard_state_event(Key::E, 26, KeyState::Down);
        w.try_add_keyboard_state_event(Key::E, 26, KeyState::Up);
        w.add_mouse_event(Button::Left, ButtonState::Down);
        let events = w.events();
        w.try_set_focused(false);
        w.release_downed_buttons();
        w.release_downed_buttons();
        let mut ups: Vec<String> = events
            .try_iter()
            .filter_map(|e| match e.kind {
                EventKind::KeyboardState { key, state: KeyState::Up, .. } => Some(format!("{key}")),
                EventKind::MouseButton { button, state: ButtonState::Up } => Some(format!("{button:?}")),
                _ => None,
            })
            .collect();
        ups.sort();
        assert_eq!(ups, vec!["Left", "LeftShift", "W"]);
        assert_eq!(w.key_state(Key::W), KeyState::Up);
    }

    #[test] fn duplicate_key_state_is_skipped() {
        let h = Harness::new();
        let w = h.window();
        let events = w.events();
        assert!(w.try_add_keyboard_state_event(Key::A, 38, KeyState::Down));
        assert!(!w.try_add_keyboard_state_event(Key::A, 38, KeyState::Down));
        assert_eq!(events.try_iter().count(), 1);
    }

    #[test] fn fullscreen_restores_geometry() {
        let h = Harness::new();
        let w = h.open_window();
        w.set_position(Position::new(10, 20));
        w.set_size(Size::new(700, 500));
        w.set_fullscreen(true);
        w.try_set_size(Size::new(1920, 1080));
        w.try_set_position(Position::new(0, 0));
        assert_eq!(w.display_state(), DisplayState::Fullscreen);
        w.set_fullscreen(false);
        assert_eq!(w.position(), Position::new(10, 20));
        assert_eq!(w.size(), Size::new(700, 500));
        h.settle();
        let tail: Vec<_> = h.calls().into_iter().rev().take(3).collect();
        assert_eq!(tail, vec![
            NativeCall::SetPosition(Position::new(10, 20)),
            NativeCall::SetSize(Size::new(700, 500)),
            NativeCall::SetFullscreen(false),
        ]);
    }

    #[test] fn minimize_requires_visible() {
        let h = Harness::new();
        let w = h.open_window();
        w.set_visible(false);
        w.set_minimized(true);
        h.settle();
        assert_eq!(h.count(|c| matches!(c, NativeCall::SetMinimized(_))), 0);
        assert_eq!(w.display_state(), DisplayState::Minimized);
    }

    #[test] fn free_active_cursor_unsets_it() {
        let h = Harness::new();
        let w = h.open_window();
        let image = crate::cursor::Image::new(1, 1, vec![0, 0, 0, 255]).unwrap();
        let cursor = Cursor::new(image, Position::new(0, 0));
        w.set_cursor(Some(cursor.clone()));
        w.set_cursor(Some(cursor.clone()));
        w.free_cursor(&cursor);
        h.settle();
        assert_eq!(w.cursor(), None);
        let cursor_calls: Vec<_> = h
            .calls()
            .into_iter()
            .filter(|c| matches!(c, NativeCall::SetCursor(_) | NativeCall::FreeCursor))
            .collect();
        assert_eq!(cursor_calls, vec![
            NativeCall::SetCursor(true),
            NativeCall::SetCursor(false),
            NativeCall::FreeCursor,
        ]);
    }

    #[test] fn lifecycle() {
        let h = Harness::new();
        let w = h.window();
        assert_eq!(w.extents(), Extents::ZERO);
        w.try_set_extents(Extents::new(2, 2, 2, 24));
        assert_eq!(w.extents(), Extents::ZERO);
        w.open(None).unwrap();
        assert!(w.focused());
        assert_eq!(w.extents(), Extents::new(2, 2, 2, 24));
        let events = w.events();
        w.destroy();
        w.destroy();
        assert!(w.is_destroyed());
        assert_eq!(events.try_iter().map(|e| e.kind).collect::<Vec<_>>(), vec![EventKind::Destroyed]);
        assert_eq!(h.count(|c| matches!(c, NativeCall::Destroy)), 1);

        //setters on a destroyed window are cached only
        let before = h.calls().len();
        w.set_title("after");
        h.settle();
        assert_eq!(h.calls().len(), before);

        w.open(None).unwrap();
        assert!(w.is_open());
        assert_eq!(h.backend.windows_created(), 2);
    }

    #[test] fn exit_destroys_open_windows() {
        let h = Harness::new();
        let w = h.open_window();
        let events = w.events();
        h.platform.exit();
        assert!(w.is_destroyed());
        assert_eq!(events.try_iter().map(|e| e.kind).collect::<Vec<_>>(), vec![EventKind::Destroyed]);
    }

    #[test] fn gl_context_roundtrip() {
        let h = Harness::new();
        let w = h.open_window();
        assert_eq!(
            w.gl_create_context(3, 3, GLContextFlags::CORE_PROFILE, None),
            Err(GlError::NoConfig)
        );
        let configs = w.gl_configs();
        w.gl_set_config(&configs[0]);
        assert_eq!(w.gl_config(), Some(configs[0].clone()));
        let ctx = w.gl_create_context(3, 3, GLContextFlags::CORE_PROFILE, None).unwrap();
        w.gl_make_current(Some(&ctx));
        w.gl_swap_buffers();
        w.gl_destroy_context(&ctx);
        assert!(ctx.is_destroyed());
    }

    #[test] #[should_panic(expected = "GLConfig is invalid")] fn manual_gl_config_panics() {
        let h = Harness::new();
        let w = h.open_window();
        w.gl_set_config(&GLConfig::default());
    }

    #[test] #[should_panic(expected = "already destroyed")] fn double_context_destroy_panics() {
        let h = Harness::new();
        let w = h.open_window();
        let configs = w.gl_configs();
        w.gl_set_config(&configs[0]);
        let ctx = w.gl_create_context(2, 1, GLContextFlags::NONE, None).unwrap();
        w.gl_destroy_context(&ctx);
        w.gl_destroy_context(&ctx);
    }

    #[test] #[should_panic(expected = "must be initialized")] fn window_before_init_panics() {
        let platform = Platform::new(crate::application::Options::default());
        let _ = Window::new_in(&platform);
    }
}
