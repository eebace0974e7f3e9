// SPDX-License-Identifier: MPL-2.0
/*!
The Win32 backend: a pump thread that polls the message queue through the dispatcher, and a
window procedure that decodes messages into window state.

The system is reached through [`Win32Api`].  A `windows-sys` binding implements it; its
`WNDPROC` forwards to [`Win32Backend::window_proc`] for messages the system sends directly.
*/
pub mod keys;
mod window;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{RecvTimeoutError, sync_channel};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::application::{InitError, Options};
use crate::backend::{Backend, NativeWindow};
use crate::coordinates::{Extents, Position, Size};
use crate::cursor::Image;
use crate::dispatcher::Dispatcher;
use crate::gl::{GLConfig, GLContextFlags};
use crate::screen::Screen;
use crate::window::WeakWindow;

pub use keys::VirtualKey;
pub use window::Win32Window;

/// A window handle; never zero for a live window.
pub type Hwnd = isize;

pub const WM_MOVE: u32 = 0x0003;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_ACTIVATE: u32 = 0x0006;
pub const WM_PAINT: u32 = 0x000f;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_ERASEBKGND: u32 = 0x0014;
pub const WM_GETMINMAXINFO: u32 = 0x0024;
pub const WM_INPUT: u32 = 0x00ff;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MOUSEWHEEL: u32 = 0x020a;
pub const WM_XBUTTONDOWN: u32 = 0x020b;
pub const WM_XBUTTONUP: u32 = 0x020c;
pub const WM_MOUSEHWHEEL: u32 = 0x020e;
pub const WM_SIZING: u32 = 0x0214;
pub const WM_EXITSIZEMOVE: u32 = 0x0232;

pub const SIZE_MINIMIZED: usize = 1;
pub const SIZE_MAXIMIZED: usize = 2;
pub const WA_INACTIVE: usize = 0;
pub const XBUTTON1: u16 = 1;
pub const XBUTTON2: u16 = 2;
pub const WHEEL_DELTA: i32 = 120;

pub const WMSZ_LEFT: usize = 1;
pub const WMSZ_RIGHT: usize = 2;
pub const WMSZ_TOP: usize = 3;
pub const WMSZ_TOPLEFT: usize = 4;
pub const WMSZ_TOPRIGHT: usize = 5;
pub const WMSZ_BOTTOM: usize = 6;
pub const WMSZ_BOTTOMLEFT: usize = 7;
pub const WMSZ_BOTTOMRIGHT: usize = 8;

#[inline] pub const fn loword(value: usize) -> u16 { (value & 0xffff) as u16 }
#[inline] pub const fn hiword(value: usize) -> u16 { ((value >> 16) & 0xffff) as u16 }

/// `GET_X_LPARAM` / `GET_Y_LPARAM`: signed client coordinates packed in an `lParam`.
#[inline] pub const fn point_from_lparam(lparam: isize) -> (i32, i32) {
    ((lparam & 0xffff) as u16 as i16 as i32, ((lparam >> 16) & 0xffff) as u16 as i16 as i32)
}

/// A `RECT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RectL {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// The track sizes of a `MINMAXINFO`; `None` leaves the system's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MinMaxInfo {
    pub min_track: (Option<i32>, Option<i32>),
    pub max_track: (Option<i32>, Option<i32>),
}

/// The structure an `lParam` points at, for messages that carry one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageData {
    #[default]
    None,
    /// `WM_GETMINMAXINFO`; written back after the window procedure returns.
    MinMaxInfo(MinMaxInfo),
    /// `WM_SIZING`; written back after the window procedure returns.
    Sizing(RectL),
}

/// One message, as retrieved by `PeekMessage` or received by the window procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub hwnd: Hwnd,
    pub id: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub data: MessageData,
}

impl Message {
    pub fn new(hwnd: Hwnd, id: u32, wparam: usize, lparam: isize) -> Message {
        Message { hwnd, id, wparam, lparam, data: MessageData::None }
    }
}

/// `ShowWindow` commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    Hide,
    Show,
    ShowDefault,
    Minimize,
    Maximize,
    Restore,
}

/// The parts of `GWL_STYLE` the backend manages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    /// `WS_OVERLAPPEDWINDOW` when set, otherwise a borderless popup.
    pub frame: bool,
    pub visible: bool,
}

/// Arguments of `SetWindowPos`, in screen coordinates of the whole window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub topmost: bool,
    pub position: Position,
    pub size: Size,
}

/// A failed system call and its `GetLastError` text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{function}(): {message}")]
pub struct Win32Error {
    pub function: &'static str,
    pub message: String,
}

impl Win32Error {
    pub fn new(function: &'static str, message: impl Into<String>) -> Win32Error {
        Win32Error { function, message: message.into() }
    }
}

/**
The Win32 and WGL calls the backend makes.

Methods are called on the dispatcher thread, except `wgl_make_current`, `swap_buffers` and
`wgl_swap_interval`, which run on whichever thread owns the GL context.
*/
pub trait Win32Api: Send + Sync + 'static {
    /// `PeekMessage(PM_REMOVE)` followed by `TranslateMessage`.
    fn peek_message(&self) -> Option<Message>;
    fn def_window_proc(&self, message: &Message) -> isize;

    fn screens(&self) -> Vec<Screen>;
    /// The device name of the monitor nearest to `hwnd`.
    fn monitor_name(&self, hwnd: Hwnd) -> Result<String, Win32Error>;
    /// Border and caption sizes of an overlapped window.
    fn frame_extents(&self) -> Extents;
    /// Raw input needs Windows XP or later.
    fn supports_raw_input(&self) -> bool;

    /// Registers a fresh window class and creates a window of it.
    fn create_window(&self, title: &str, style: Style) -> Result<Hwnd, Win32Error>;
    /// Destroys the window and unregisters its class.
    fn destroy_window(&self, hwnd: Hwnd) -> Result<(), Win32Error>;
    fn register_raw_mouse(&self, hwnd: Hwnd) -> Result<(), Win32Error>;
    fn set_window_text(&self, hwnd: Hwnd, text: &str) -> Result<(), Win32Error>;
    fn show_window(&self, hwnd: Hwnd, command: ShowCommand);
    fn window_style(&self, hwnd: Hwnd) -> Style;
    fn set_window_style(&self, hwnd: Hwnd, style: Style);
    fn set_window_pos(&self, hwnd: Hwnd, placement: &Placement) -> Result<(), Win32Error>;
    fn is_iconic(&self, hwnd: Hwnd) -> bool;
    /// `FlashWindowEx` for `count` flashes.
    fn flash_window(&self, hwnd: Hwnd, count: u32);
    /// `DwmEnableBlurBehindWindow` over the whole client area.
    fn set_blur_behind(&self, hwnd: Hwnd, enable: bool) -> Result<(), Win32Error>;
    /// Builds big and small icons from `image` and sends `WM_SETICON`; `None` restores the class icon.
    fn set_icon(&self, hwnd: Hwnd, image: Option<&Image>) -> Result<(), Win32Error>;
    /// `GetUpdateRect` then `ValidateRect`; `None` when nothing needs painting.
    fn take_update_rect(&self, hwnd: Hwnd) -> Option<RectL>;

    /// `GetAsyncKeyState` high bit.
    fn async_key_down(&self, vk: VirtualKey) -> bool;
    /// `GetKeyState` low bit.
    fn key_toggled(&self, vk: VirtualKey) -> bool;
    /// The relative motion of a `WM_INPUT` mouse packet.
    fn raw_mouse_delta(&self, lparam: isize) -> Option<(i32, i32)>;

    fn create_cursor(&self, image: &Image, hotspot: Position) -> Result<usize, Win32Error>;
    fn destroy_cursor(&self, cursor: usize) -> Result<(), Win32Error>;
    /// The shared `IDC_ARROW` cursor.
    fn arrow_cursor(&self) -> Result<usize, Win32Error>;
    /// `SetCursor`; `None` hides the cursor.
    fn set_cursor(&self, cursor: Option<usize>);
    fn set_cursor_pos(&self, x: i32, y: i32) -> Result<(), Win32Error>;
    fn clip_rect(&self) -> Result<RectL, Win32Error>;
    fn clip_cursor(&self, rect: RectL) -> Result<(), Win32Error>;
    fn client_to_screen(&self, hwnd: Hwnd, x: i32, y: i32) -> Result<(i32, i32), Win32Error>;
    fn set_capture(&self, hwnd: Hwnd);
    fn release_capture(&self);

    fn wgl_configs(&self, hwnd: Hwnd) -> Vec<GLConfig>;
    fn wgl_set_pixel_format(&self, hwnd: Hwnd, format: u64) -> Result<(), Win32Error>;
    /// Creates a context through `WGL_ARB_create_context`, falling back to `wglCreateContext`.
    fn wgl_create_context(
        &self,
        hwnd: Hwnd,
        major: u32,
        minor: u32,
        flags: GLContextFlags,
        share: Option<u64>,
    ) -> Result<u64, Win32Error>;
    /// `GL_VERSION` as reported with `context` current.
    fn gl_version(&self, hwnd: Hwnd, context: u64) -> String;
    fn wgl_delete_context(&self, context: u64) -> Result<(), Win32Error>;
    fn wgl_make_current(&self, hwnd: Hwnd, context: Option<u64>) -> Result<(), Win32Error>;
    fn swap_buffers(&self, hwnd: Hwnd) -> Result<(), Win32Error>;
    fn wgl_swap_interval(&self, interval: i32) -> Result<(), Win32Error>;
}

pub(crate) struct Shared<A: Win32Api> {
    pub(crate) api: A,
    windows: RwLock<HashMap<Hwnd, Weak<Win32Window<A>>>>,
    dispatcher: Mutex<Option<Arc<Dispatcher>>>,
}

impl<A: Win32Api> Shared<A> {
    pub(crate) fn register(&self, hwnd: Hwnd, window: Weak<Win32Window<A>>) {
        self.windows.write().unwrap_or_else(PoisonError::into_inner).insert(hwnd, window);
    }

    pub(crate) fn unregister(&self, hwnd: Hwnd) {
        self.windows.write().unwrap_or_else(PoisonError::into_inner).remove(&hwnd);
    }

    fn find(&self, hwnd: Hwnd) -> Option<Arc<Win32Window<A>>> {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&hwnd)
            .and_then(Weak::upgrade)
    }

    fn window_proc(&self, message: &mut Message) -> Option<isize> {
        self.find(message.hwnd)?.handle_message(message)
    }

    /// Routes every queued message; `false` when the queue was already empty.
    fn drain(&self) -> bool {
        let mut any = false;
        while let Some(mut message) = self.api.peek_message() {
            any = true;
            if self.window_proc(&mut message).is_none() {
                self.api.def_window_proc(&message);
            }
        }
        any
    }
}

struct Pump {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/**
The Win32 [`Backend`].

Windows only delivers messages to the thread that created the window, so the queue is drained
on the dispatcher thread.  A pump thread queues a drain, waits for it, and sleeps for the idle
interval when nothing arrived.
*/
pub struct Win32Backend<A: Win32Api> {
    shared: Arc<Shared<A>>,
    idle_poll: Duration,
    pump: Mutex<Option<Pump>>,
}

impl<A: Win32Api> Win32Backend<A> {
    pub fn new(api: A) -> Self {
        Win32Backend::with_idle_poll(api, Options::default().idle_poll)
    }

    pub fn with_idle_poll(api: A, idle_poll: Duration) -> Self {
        Win32Backend {
            shared: Arc::new(Shared {
                api,
                windows: RwLock::new(HashMap::new()),
                dispatcher: Mutex::new(None),
            }),
            idle_poll,
            pump: Mutex::new(None),
        }
    }

    pub fn api(&self) -> &A {
        &self.shared.api
    }

    /**
    The window procedure.

    Returns the message's result, or `None` when it should go to `DefWindowProc`.  Messages that
    carry a structure have it updated in `message.data`.
    */
    pub fn window_proc(&self, message: &mut Message) -> Option<isize> {
        self.shared.window_proc(message)
    }
}

fn pump<A: Win32Api>(shared: Arc<Shared<A>>, dispatcher: Arc<Dispatcher>, stop: Arc<AtomicBool>, idle_poll: Duration) {
    while !stop.load(Ordering::Acquire) {
        let (done, drained) = sync_channel(1);
        let frame_shared = shared.clone();
        dispatcher.submit(move || {
            _ = done.send(frame_shared.drain());
        });
        //the dispatcher may stop before running the drain
        let any = loop {
            match drained.recv_timeout(idle_poll) {
                Ok(any) => break any,
                Err(RecvTimeoutError::Timeout) if stop.load(Ordering::Acquire) => return,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return,
            }
        };
        if !any {
            std::thread::sleep(idle_poll);
        }
    }
}

impl<A: Win32Api> Backend for Win32Backend<A> {
    fn init(&self, dispatcher: &Arc<Dispatcher>) -> Result<(), InitError> {
        let mut pump_slot = self.pump.lock().unwrap_or_else(PoisonError::into_inner);
        if pump_slot.is_some() {
            return Ok(());
        }
        *self.shared.dispatcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(dispatcher.clone());
        let stop = Arc::new(AtomicBool::new(false));
        let shared = self.shared.clone();
        let pump_dispatcher = dispatcher.clone();
        let pump_stop = stop.clone();
        let idle_poll = self.idle_poll;
        let thread = std::thread::Builder::new()
            .name("gl_window win32 pump".to_string())
            .spawn(move || pump(shared, pump_dispatcher, pump_stop, idle_poll))
            .map_err(|e| InitError::Backend(e.to_string()))?;
        *pump_slot = Some(Pump { stop, thread });
        Ok(())
    }

    fn destroy(&self) {
        let Some(pump) = self.pump.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };
        pump.stop.store(true, Ordering::Release);
        let dispatcher = self.shared.dispatcher.lock().unwrap_or_else(PoisonError::into_inner).take();
        //the pump may be waiting for a frame only this thread can run
        if !dispatcher.is_some_and(|d| d.is_dispatcher_thread()) && pump.thread.join().is_err() {
            logwise::error_sync!("Win32 event pump panicked");
        }
        self.shared.windows.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    fn new_native_window(&self, window: WeakWindow) -> Arc<dyn NativeWindow> {
        Win32Window::new(self.shared.clone(), window)
    }

    fn screens(&self) -> Vec<Screen> {
        self.shared.api.screens()
    }
}

impl<A: Win32Api> Drop for Win32Backend<A> {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)] mod test {
    use super::*;

    #[test] fn packed_coordinates_are_signed() {
        assert_eq!(point_from_lparam(0x0014_000a), (10, 20));
        assert_eq!(point_from_lparam(0xfffe_fff6_u32 as isize), (-10, -2));
        assert_eq!(loword(0x0002_0001), 1);
        assert_eq!(hiword(0x0002_0001), 2);
    }
}
