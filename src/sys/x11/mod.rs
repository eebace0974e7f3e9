// SPDX-License-Identifier: MPL-2.0
/*!
The X11 backend: a pump thread that blocks on the connection, and native windows that talk
to the window manager.

The wire is reached through [`XConnection`], which speaks in decoded protocol values (window
ids, atoms, [`XEvent`]s).  An xcb/Xlib/GLX binding implements it; tests implement it in memory.

```no_run
use std::sync::Arc;
use gl_window::application;
use gl_window::sys::x11::{X11Backend, XConnection};

fn run<C: XConnection>(connection: C) {
    application::main(move || {
        application::init(Arc::new(X11Backend::new(connection))).expect("X11 unavailable");
        // ...
        application::exit();
    });
}
```
*/
pub mod event;
pub mod keysym;
mod window;

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, sync_channel};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::application::InitError;
use crate::backend::{Backend, NativeWindow};
use crate::coordinates::{Extents, Position, Size};
use crate::cursor::Image;
use crate::dispatcher::Dispatcher;
use crate::gl::{GLConfig, GLContextFlags};
use crate::screen::Screen;
use crate::window::WeakWindow;

pub use event::{Atom, ModifierState, WindowId, X11Error, XEvent, XkbNotify};
pub use keysym::Keysym;
pub use window::X11Window;

/// Predefined atom `ATOM`.
pub const ATOM_ATOM: Atom = 4;
/// Predefined atom `CARDINAL`.
pub const ATOM_CARDINAL: Atom = 6;

/// Extensions whose versions are checked at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Glx,
    Xkb,
    RandR,
    XInput,
}

impl Extension {
    pub fn name(self) -> &'static str {
        match self {
            Extension::Glx => "GLX",
            Extension::Xkb => "XKB",
            Extension::RandR => "XRandR",
            Extension::XInput => "XInput",
        }
    }

    pub fn minimum_version(self) -> (u32, u32) {
        match self {
            Extension::Glx => (1, 4),
            Extension::Xkb => (1, 0),
            Extension::RandR => (1, 2),
            Extension::XInput => (2, 0),
        }
    }
}

/// Parameters of `CreateWindow`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWindow {
    pub parent: WindowId,
    pub position: Position,
    pub size: Size,
    /// Use a 32-bit visual so alpha composites with the desktop.
    pub transparent: bool,
    /// Backend id of the GLX framebuffer configuration whose visual to use.
    pub gl_config: Option<u64>,
}

/// Fields of `ConfigureWindow`; `None` leaves the value alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Configure {
    pub position: Option<Position>,
    pub size: Option<Size>,
}

/// ICCCM `WM_NORMAL_HINTS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeHints {
    pub size: Size,
    pub min: Option<Size>,
    pub max: Option<Size>,
    /// `(numerator, denominator)` used for both min and max aspect.
    pub aspect: Option<(i32, i32)>,
}

/// What `glXCreateContextAttribsARB` is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextRequest {
    pub config: u64,
    pub major: u32,
    pub minor: u32,
    pub flags: GLContextFlags,
}

/**
A connection to an X server, in decoded protocol terms.

Every method may be called from the pump thread and the dispatcher thread concurrently.
Requests that XCB sends unchecked return nothing; checked requests return [`X11Error`].
*/
pub trait XConnection: Send + Sync + 'static {
    /// The server's version of `extension`, `None` when absent.
    fn extension_version(&self, extension: Extension) -> Option<(u32, u32)>;
    fn intern_atom(&self, name: &str) -> Atom;
    fn root(&self) -> WindowId;
    fn screens(&self) -> Vec<Screen>;

    /// Blocks for the next event.  `None` once the connection is closed.
    fn wait_for_event(&self) -> Option<XEvent>;
    /// Makes a blocked [`XConnection::wait_for_event`] return.
    fn wake(&self);
    fn flush(&self);

    /// The keysym and character a keycode produces under the current XKB state.
    fn lookup_key(&self, keycode: u8) -> (Keysym, Option<char>);
    fn refresh_keymap(&self);
    fn update_modifiers(&self, state: ModifierState);
    /// The XKB core keyboard device id.
    fn xkb_device(&self) -> i32;
    /// `XkbGetIndicatorState` bits, `None` on failure.
    fn indicator_state(&self) -> Option<u32>;

    fn create_window(&self, request: &CreateWindow) -> Result<WindowId, X11Error>;
    fn destroy_window(&self, window: WindowId);
    fn map_window(&self, window: WindowId);
    fn unmap_window(&self, window: WindowId) -> Result<(), X11Error>;
    fn configure_window(&self, window: WindowId, configure: Configure);
    fn set_size_hints(&self, window: WindowId, hints: &SizeHints);
    /// Sets `_NET_WM_NAME` and `WM_NAME`.
    fn set_title(&self, window: WindowId, title: &str);
    /// Replaces a 32-bit property.
    fn change_property(&self, window: WindowId, property: Atom, kind: Atom, data: &[u32]) -> Result<(), X11Error>;
    fn get_cardinal_property(&self, window: WindowId, property: Atom) -> Result<Vec<u32>, X11Error>;
    /// Sends a format-32 client message about `window` to `destination` with substructure
    /// redirect.
    fn send_client_message(&self, destination: WindowId, window: WindowId, message_type: Atom, data: [u32; 5]);

    fn grab_pointer(&self, window: WindowId) -> Result<(), X11Error>;
    fn ungrab_pointer(&self);
    fn warp_pointer(&self, window: WindowId, x: i16, y: i16);
    fn create_cursor(&self, window: WindowId, image: &Image, hotspot: Position) -> Result<u32, X11Error>;
    fn free_cursor(&self, cursor: u32);
    /// Sets the window's cursor; `0` inherits the parent's.
    fn define_cursor(&self, window: WindowId, cursor: u32);

    fn glx_configs(&self) -> Vec<GLConfig>;
    /// `glXQueryExtensionsString`.
    fn glx_extensions(&self) -> String;
    fn glx_create_context(&self, request: &ContextRequest, share: Option<u64>) -> Result<u64, X11Error>;
    fn glx_destroy_context(&self, context: u64);
    fn glx_make_current(&self, window: WindowId, context: Option<u64>);
    fn glx_swap_buffers(&self, window: WindowId);
    fn glx_swap_interval(&self, window: WindowId, interval: i32);
}

/// Bounded waits used while negotiating with the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub frame_extents: Duration,
    pub map: Duration,
    pub unmap: Duration,
    pub wm_hints: Duration,
    /// How long position requests are repeated after decorations change.
    pub redecorate: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            frame_extents: Duration::from_secs(1),
            map: Duration::from_secs(1),
            unmap: Duration::from_secs(5),
            wm_hints: Duration::from_secs(5),
            redecorate: Duration::from_millis(750),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Atoms {
    pub(crate) wm_protocols: Atom,
    pub(crate) wm_delete_window: Atom,
    pub(crate) wm_change_state: Atom,
    pub(crate) net_wm_state: Atom,
    pub(crate) net_wm_state_fullscreen: Atom,
    pub(crate) net_wm_state_maximized_vert: Atom,
    pub(crate) net_wm_state_maximized_horz: Atom,
    pub(crate) net_wm_state_above: Atom,
    pub(crate) net_wm_state_demands_attention: Atom,
    pub(crate) net_wm_icon: Atom,
    pub(crate) net_frame_extents: Atom,
    pub(crate) net_request_frame_extents: Atom,
    pub(crate) motif_wm_hints: Atom,
}

impl Atoms {
    fn intern<C: XConnection>(conn: &C) -> Atoms {
        Atoms {
            wm_protocols: conn.intern_atom("WM_PROTOCOLS"),
            wm_delete_window: conn.intern_atom("WM_DELETE_WINDOW"),
            wm_change_state: conn.intern_atom("WM_CHANGE_STATE"),
            net_wm_state: conn.intern_atom("_NET_WM_STATE"),
            net_wm_state_fullscreen: conn.intern_atom("_NET_WM_STATE_FULLSCREEN"),
            net_wm_state_maximized_vert: conn.intern_atom("_NET_WM_STATE_MAXIMIZED_VERT"),
            net_wm_state_maximized_horz: conn.intern_atom("_NET_WM_STATE_MAXIMIZED_HORZ"),
            net_wm_state_above: conn.intern_atom("_NET_WM_STATE_ABOVE"),
            net_wm_state_demands_attention: conn.intern_atom("_NET_WM_STATE_DEMANDS_ATTENTION"),
            net_wm_icon: conn.intern_atom("_NET_WM_ICON"),
            net_frame_extents: conn.intern_atom("_NET_FRAME_EXTENTS"),
            net_request_frame_extents: conn.intern_atom("_NET_REQUEST_FRAME_EXTENTS"),
            motif_wm_hints: conn.intern_atom("_MOTIF_WM_HINTS"),
        }
    }
}

/// State shared by the backend, its pump and its windows.
pub(crate) struct Shared<C: XConnection> {
    pub(crate) conn: C,
    pub(crate) timeouts: Timeouts,
    atoms: RwLock<Atoms>,
    dispatcher: Mutex<Option<Arc<Dispatcher>>>,
    windows: RwLock<HashMap<WindowId, Weak<X11Window<C>>>>,
    //the last nonzero extents any window received
    extents_cache: RwLock<Extents>,
}

impl<C: XConnection> Shared<C> {
    pub(crate) fn atoms(&self) -> Atoms {
        *self.atoms.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `f` on the dispatcher thread.
    pub(crate) fn submit<F: FnOnce() + Send + 'static>(&self, f: F) {
        let dispatcher = self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match dispatcher {
            Some(dispatcher) => dispatcher.submit(f),
            None => logwise::warn_sync!("X11 backend is not initialized; dropping native request"),
        }
    }

    pub(crate) fn register(&self, id: WindowId, window: Weak<X11Window<C>>) {
        self.windows.write().unwrap_or_else(PoisonError::into_inner).insert(id, window);
    }

    pub(crate) fn unregister(&self, id: WindowId) {
        self.windows.write().unwrap_or_else(PoisonError::into_inner).remove(&id);
    }

    fn find(&self, id: WindowId) -> Option<Arc<X11Window<C>>> {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .and_then(Weak::upgrade)
    }

    pub(crate) fn cached_extents(&self) -> Extents {
        *self.extents_cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn cache_extents(&self, extents: Extents) {
        if !extents.is_zero() {
            *self.extents_cache.write().unwrap_or_else(PoisonError::into_inner) = extents;
        }
    }

    fn handle(&self, event: XEvent) {
        match event {
            XEvent::Error { code, sequence } => {
                logwise::error_sync!(
                    "X Request Error: {name} (sequence {sequence})",
                    name = X11Error::from_code(code).to_string(),
                    sequence = sequence
                );
            }
            XEvent::Xkb { device, notify } => {
                if device != self.conn.xkb_device() {
                    return;
                }
                match notify {
                    XkbNotify::NewKeyboard | XkbNotify::Map => self.conn.refresh_keymap(),
                    XkbNotify::State(state) => self.conn.update_modifiers(state),
                }
            }
            XEvent::Other { response_type } => {
                logwise::debuginternal_sync!(
                    "Ignoring X event with response type {response_type}",
                    response_type = response_type
                );
            }
            event => {
                let Some(id) = event.window() else { return };
                if let Some(window) = self.find(id) {
                    window.handle_event(&event);
                }
            }
        }
    }
}

struct Pump {
    shutdown: SyncSender<()>,
    thread: JoinHandle<()>,
}

/**
The X11 [`Backend`].

`init` checks extension versions, interns atoms and starts the pump thread; `destroy` stops it.
*/
pub struct X11Backend<C: XConnection> {
    shared: Arc<Shared<C>>,
    pump: Mutex<Option<Pump>>,
}

impl<C: XConnection> X11Backend<C> {
    pub fn new(conn: C) -> Self {
        X11Backend::with_timeouts(conn, Timeouts::default())
    }

    pub fn with_timeouts(conn: C, timeouts: Timeouts) -> Self {
        X11Backend {
            shared: Arc::new(Shared {
                conn,
                timeouts,
                atoms: RwLock::new(Atoms::default()),
                dispatcher: Mutex::new(None),
                windows: RwLock::new(HashMap::new()),
                extents_cache: RwLock::new(Extents::ZERO),
            }),
            pump: Mutex::new(None),
        }
    }

    pub fn connection(&self) -> &C {
        &self.shared.conn
    }

    pub fn timeouts(&self) -> Timeouts {
        self.shared.timeouts
    }

    fn check_versions(&self) -> Result<(), InitError> {
        for extension in [Extension::Glx, Extension::Xkb, Extension::RandR, Extension::XInput] {
            let required = extension.minimum_version();
            let Some(found) = self.shared.conn.extension_version(extension) else {
                return Err(InitError::MissingFeature(format!("{} extension", extension.name())));
            };
            if found < required {
                logwise::warn_sync!(
                    "{extension} version {found} exists, we require at least {required}",
                    extension = extension.name().to_string(),
                    found = format!("{}.{}", found.0, found.1),
                    required = format!("{}.{}", required.0, required.1)
                );
                return Err(InitError::UnsupportedVersion { extension: extension.name(), required, found });
            }
        }
        Ok(())
    }
}

fn pump<C: XConnection>(shared: Arc<Shared<C>>, shutdown: Receiver<()>, ready: SyncSender<()>) {
    let mut ready = Some(ready);
    loop {
        match shutdown.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => {}
        }
        if let Some(ready) = ready.take() {
            _ = ready.send(());
        }
        let Some(event) = shared.conn.wait_for_event() else {
            logwise::info_sync!("X connection closed; stopping event pump");
            return;
        };
        shared.handle(event);
    }
}

impl<C: XConnection> Backend for X11Backend<C> {
    fn init(&self, dispatcher: &Arc<Dispatcher>) -> Result<(), InitError> {
        let mut pump_slot = self.pump.lock().unwrap_or_else(PoisonError::into_inner);
        if pump_slot.is_some() {
            return Ok(());
        }
        self.check_versions()?;
        *self.shared.atoms.write().unwrap_or_else(PoisonError::into_inner) = Atoms::intern(&self.shared.conn);
        *self.shared.dispatcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(dispatcher.clone());

        let (shutdown, shutdown_receiver) = sync_channel(1);
        let (ready, ready_receiver) = sync_channel(1);
        let shared = self.shared.clone();
        let thread = std::thread::Builder::new()
            .name("gl_window x11 pump".to_string())
            .spawn(move || pump(shared, shutdown_receiver, ready))
            .map_err(|e| InitError::Backend(e.to_string()))?;
        if ready_receiver.recv().is_err() {
            return Err(InitError::Backend("X11 event pump exited before becoming ready".to_string()));
        }
        *pump_slot = Some(Pump { shutdown, thread });
        Ok(())
    }

    fn destroy(&self) {
        let Some(pump) = self.pump.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };
        _ = pump.shutdown.try_send(());
        self.shared.conn.wake();
        let dispatcher = self.shared.dispatcher.lock().unwrap_or_else(PoisonError::into_inner).take();
        //a pump blocked on a full queue needs this thread to drain it
        if !dispatcher.is_some_and(|d| d.is_dispatcher_thread()) && pump.thread.join().is_err() {
            logwise::error_sync!("X11 event pump panicked");
        }
        self.shared.windows.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn new_native_window(&self, window: WeakWindow) -> Arc<dyn NativeWindow> {
        X11Window::new(self.shared.clone(), window)
    }

    fn screens(&self) -> Vec<Screen> {
        self.shared.conn.screens()
    }
}

impl<C: XConnection> Drop for X11Backend<C> {
    fn drop(&mut self) {
        self.destroy();
    }
}
