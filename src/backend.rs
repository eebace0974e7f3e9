// SPDX-License-Identifier: MPL-2.0
/*!
The seam between the platform-independent core and a native windowing stack.

A [`Backend`] owns the process-wide native connection; it creates one [`NativeWindow`] per
[`crate::window::Window`].  The window keeps the requested state and calls the native setters
on the dispatcher thread after its cache changes.  Native setters must not block indefinitely.

Native windows report what the OS actually did back through the window's `try_set_*` family,
which never calls a native setter in turn.
*/
use std::sync::Arc;

use raw_window_handle::RawWindowHandle;

use crate::application::InitError;
use crate::coordinates::{Position, Size};
use crate::cursor::{Cursor, Icon};
use crate::dispatcher::Dispatcher;
use crate::gl::{GLConfig, GLContextFlags, GlError, NativeContextId, VSyncMode};
use crate::screen::Screen;
use crate::window::{WeakWindow, WindowError};

pub trait Backend: Send + Sync {
    /// Connects to the native system.  Called once per successful `init`.
    fn init(&self, dispatcher: &Arc<Dispatcher>) -> Result<(), InitError>;

    /// Stops event pumps and closes the native connection.
    fn destroy(&self);

    /**
    Creates the native half of a window.

    `window` cannot be upgraded yet while this runs.
    */
    fn new_native_window(&self, window: WeakWindow) -> Arc<dyn NativeWindow>;

    fn screens(&self) -> Vec<Screen>;

    fn default_screen(&self) -> Option<Screen> {
        self.screens().into_iter().next()
    }
}

/**
Native operations for one window.

Setters are called on the dispatcher thread, only while the window is open, and only when the
requested value changed.  `set_size` receives the size after minimum/maximum clamping.
*/
pub trait NativeWindow: Send + Sync {
    fn open(&self, screen: &Screen) -> Result<(), WindowError>;
    fn destroy(&self);

    /// Asks the user's attention (urgency hint, taskbar flash).
    fn notify(&self);

    fn set_title(&self, title: &str);
    fn set_icon(&self, icon: Option<&Icon>);
    fn set_visible(&self, visible: bool);
    fn set_decorated(&self, decorated: bool);
    fn set_transparent(&self, transparent: bool);
    fn set_always_on_top(&self, always_on_top: bool);

    fn set_position(&self, position: Position);
    fn set_size(&self, size: Size);
    fn set_minimum_size(&self, size: Size);
    fn set_maximum_size(&self, size: Size);
    fn set_aspect_ratio(&self, ratio: f32);

    fn set_fullscreen(&self, fullscreen: bool);
    fn set_minimized(&self, minimized: bool);
    fn set_maximized(&self, maximized: bool);

    fn set_cursor(&self, cursor: Option<&Cursor>);
    /// Realizes `cursor` into the native cursor cache.
    fn prepare_cursor(&self, cursor: &Cursor);
    /// Releases the cached native resource for `cursor`.
    fn free_cursor(&self, cursor: &Cursor);
    fn set_cursor_grabbed(&self, grabbed: bool);
    fn set_cursor_position(&self, x: f64, y: f64);

    fn raw_window_handle(&self) -> Option<RawWindowHandle>;

    fn gl_configs(&self) -> Vec<GLConfig>;
    fn gl_set_config(&self, config: &GLConfig);
    fn gl_create_context(
        &self,
        major: u32,
        minor: u32,
        flags: GLContextFlags,
        share: Option<NativeContextId>,
    ) -> Result<NativeContextId, GlError>;
    fn gl_destroy_context(&self, context: NativeContextId);
    /// Makes `context` current on the calling thread; `None` releases the current one.
    fn gl_make_current(&self, context: Option<NativeContextId>);
    fn gl_swap_buffers(&self);
    fn gl_set_vertical_sync(&self, mode: VSyncMode);
}
