// SPDX-License-Identifier: MPL-2.0
/*!
An in-memory backend that records native calls, for tests and doctests.

[`Harness`] runs a private [`Platform`] on a background thread, so a test can open windows
and inspect exactly which native setters ran without a display server.
*/
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use raw_window_handle::RawWindowHandle;

use crate::application::{InitError, Options, Platform};
use crate::backend::{Backend, NativeWindow};
use crate::coordinates::{Position, Size};
use crate::cursor::{Cursor, Icon};
use crate::dispatcher::Dispatcher;
use crate::gl::{GLConfig, GLContextFlags, GlError, NativeContextId, VSyncMode};
use crate::screen::{Screen, ScreenMode};
use crate::window::{WeakWindow, Window, WindowError};

/// One native call, as seen by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Open(String),
    Destroy,
    Notify,
    SetTitle(String),
    SetIcon(bool),
    SetVisible(bool),
    SetDecorated(bool),
    SetTransparent(bool),
    SetAlwaysOnTop(bool),
    SetPosition(Position),
    SetSize(Size),
    SetMinimumSize(Size),
    SetMaximumSize(Size),
    SetAspectRatio(f32),
    SetFullscreen(bool),
    SetMinimized(bool),
    SetMaximized(bool),
    /// Whether a cursor (rather than the default) was set.
    SetCursor(bool),
    PrepareCursor,
    FreeCursor,
    SetCursorGrabbed(bool),
    SetCursorPosition(f64, f64),
    GlSetConfig(u64),
    GlCreateContext { major: u32, minor: u32, share: Option<NativeContextId> },
    GlDestroyContext(NativeContextId),
    GlMakeCurrent(Option<NativeContextId>),
    GlSwapBuffers,
    GlSetVerticalSync(VSyncMode),
}

type CallLog = Arc<Mutex<Vec<NativeCall>>>;

/// A [`Backend`] with one 1920x1080 screen whose windows record every call.
pub struct RecordingBackend {
    failure: Option<InitError>,
    calls: CallLog,
    inits: AtomicUsize,
    destroys: AtomicUsize,
    windows: AtomicUsize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        RecordingBackend {
            failure: None,
            calls: Arc::default(),
            inits: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            windows: AtomicUsize::new(0),
        }
    }

    /// A backend whose `init` always fails with `error`.
    pub fn failing(error: InitError) -> Self {
        RecordingBackend { failure: Some(error), ..RecordingBackend::new() }
    }

    pub fn screen() -> Screen {
        Screen::new(
            "recording-0",
            Position::new(0, 0),
            ScreenMode { resolution: Size::new(1920, 1080), refresh_rate: 60.0 },
            Size::new(527, 296),
        )
    }

    pub fn init_count(&self) -> usize {
        self.inits.load(Ordering::Relaxed)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroys.load(Ordering::Relaxed)
    }

    pub fn windows_created(&self) -> usize {
        self.windows.load(Ordering::Relaxed)
    }

    /// Every call made on any window of this backend, in order.
    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        RecordingBackend::new()
    }
}

impl Backend for RecordingBackend {
    fn init(&self, _dispatcher: &Arc<Dispatcher>) -> Result<(), InitError> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        self.inits.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn destroy(&self) {
        self.destroys.fetch_add(1, Ordering::Relaxed);
    }

    fn new_native_window(&self, _window: WeakWindow) -> Arc<dyn NativeWindow> {
        self.windows.fetch_add(1, Ordering::Relaxed);
        Arc::new(RecordingWindow { calls: self.calls.clone(), next_context: AtomicU64::new(1) })
    }

    fn screens(&self) -> Vec<Screen> {
        vec![RecordingBackend::screen()]
    }
}

struct RecordingWindow {
    calls: CallLog,
    next_context: AtomicU64,
}

impl RecordingWindow {
    fn record(&self, call: NativeCall) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

impl NativeWindow for RecordingWindow {
    fn open(&self, screen: &Screen) -> Result<(), WindowError> {
        self.record(NativeCall::Open(screen.name().to_string()));
        Ok(())
    }
    fn destroy(&self) {
        self.record(NativeCall::Destroy)
    }
    fn notify(&self) {
        self.record(NativeCall::Notify)
    }
    fn set_title(&self, title: &str) {
        self.record(NativeCall::SetTitle(title.to_string()))
    }
    fn set_icon(&self, icon: Option<&Icon>) {
        self.record(NativeCall::SetIcon(icon.is_some()))
    }
    fn set_visible(&self, visible: bool) {
        self.record(NativeCall::SetVisible(visible))
    }
    fn set_decorated(&self, decorated: bool) {
        self.record(NativeCall::SetDecorated(decorated))
    }
    fn set_transparent(&self, transparent: bool) {
        self.record(NativeCall::SetTransparent(transparent))
    }
    fn set_always_on_top(&self, always_on_top: bool) {
        self.record(NativeCall::SetAlwaysOnTop(always_on_top))
    }
    fn set_position(&self, position: Position) {
        self.record(NativeCall::SetPosition(position))
    }
    fn set_size(&self, size: Size) {
        self.record(NativeCall::SetSize(size))
    }
    fn set_minimum_size(&self, size: Size) {
        self.record(NativeCall::SetMinimumSize(size))
    }
    fn set_maximum_size(&self, size: Size) {
        self.record(NativeCall::SetMaximumSize(size))
    }
    fn set_aspect_ratio(&self, ratio: f32) {
        self.record(NativeCall::SetAspectRatio(ratio))
    }
    fn set_fullscreen(&self, fullscreen: bool) {
        self.record(NativeCall::SetFullscreen(fullscreen))
    }
    fn set_minimized(&self, minimized: bool) {
        self.record(NativeCall::SetMinimized(minimized))
    }
    fn set_maximized(&self, maximized: bool) {
        self.record(NativeCall::SetMaximized(maximized))
    }
    fn set_cursor(&self, cursor: Option<&Cursor>) {
        self.record(NativeCall::SetCursor(cursor.is_some()))
    }
    fn prepare_cursor(&self, _cursor: &Cursor) {
        self.record(NativeCall::PrepareCursor)
    }
    fn free_cursor(&self, _cursor: &Cursor) {
        self.record(NativeCall::FreeCursor)
    }
    fn set_cursor_grabbed(&self, grabbed: bool) {
        self.record(NativeCall::SetCursorGrabbed(grabbed))
    }
    fn set_cursor_position(&self, x: f64, y: f64) {
        self.record(NativeCall::SetCursorPosition(x, y))
    }

    fn raw_window_handle(&self) -> Option<RawWindowHandle> {
        None
    }

    fn gl_configs(&self) -> Vec<GLConfig> {
        let mut base = GLConfig::default();
        base.accelerated = true;
        base.red_bits = 8;
        base.green_bits = 8;
        base.blue_bits = 8;
        base.alpha_bits = 8;
        base.depth_bits = 24;
        base.stencil_bits = 8;
        base.double_buffered = true;
        let mut multisampled = base.clone();
        multisampled.samples = 4;
        vec![GLConfig::from_backend(1, base), GLConfig::from_backend(2, multisampled)]
    }

    fn gl_set_config(&self, config: &GLConfig) {
        self.record(NativeCall::GlSetConfig(config.backend_id()))
    }

    fn gl_create_context(
        &self,
        major: u32,
        minor: u32,
        _flags: GLContextFlags,
        share: Option<NativeContextId>,
    ) -> Result<NativeContextId, GlError> {
        if major > 4 {
            return Err(GlError::VersionNotSupported { major, minor });
        }
        self.record(NativeCall::GlCreateContext { major, minor, share });
        Ok(NativeContextId(self.next_context.fetch_add(1, Ordering::Relaxed)))
    }

    fn gl_destroy_context(&self, context: NativeContextId) {
        self.record(NativeCall::GlDestroyContext(context))
    }
    fn gl_make_current(&self, context: Option<NativeContextId>) {
        self.record(NativeCall::GlMakeCurrent(context))
    }
    fn gl_swap_buffers(&self) {
        self.record(NativeCall::GlSwapBuffers)
    }
    fn gl_set_vertical_sync(&self, mode: VSyncMode) {
        self.record(NativeCall::GlSetVerticalSync(mode))
    }
}

/**
A private initialized platform whose main loop runs on a background thread.

Dropping the harness exits the platform and joins the loop.
*/
pub struct Harness {
    pub platform: Platform,
    pub backend: Arc<RecordingBackend>,
    main_loop: Option<JoinHandle<()>>,
}

impl Harness {
    pub fn new() -> Self {
        Harness::with_options(Options::default())
    }

    pub fn with_options(options: Options) -> Self {
        let platform = Platform::new(options);
        let backend = Arc::new(RecordingBackend::new());
        //init cannot fail for a recording backend
        let _ = platform.init(backend.clone());
        let runner = platform.clone();
        let main_loop = std::thread::Builder::new()
            .name("gl_window test main loop".to_string())
            .spawn(move || runner.main_loop())
            .ok();
        Harness { platform, backend, main_loop }
    }

    pub fn window(&self) -> Window {
        Window::new_in(&self.platform)
    }

    pub fn open_window(&self) -> Window {
        let window = self.window();
        if let Err(e) = window.open(None) {
            panic!("recording window failed to open: {e}");
        }
        window
    }

    /// Waits until every frame queued so far has run.
    pub fn settle(&self) {
        self.platform.dispatch(|| ());
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.backend.calls()
    }

    pub fn count(&self, matches: impl Fn(&NativeCall) -> bool) -> usize {
        self.calls().iter().filter(|c| matches(c)).count()
    }

    /// The last call `pick` maps to `Some`.
    pub fn last<T>(&self, pick: impl Fn(&NativeCall) -> Option<T>) -> Option<T> {
        self.calls().iter().rev().find_map(pick)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Harness::new()
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.platform.exit();
        if let Some(handle) = self.main_loop.take() {
            _ = handle.join();
        }
    }
}
