//SPDX-License-Identifier: MPL-2.0

/*!
A cross-platform window and OpenGL context layer.

Native windowing stacks want every call from one thread, and they report what they actually did
asynchronously.  This crate handles both:

* A bounded [`dispatcher::Dispatcher`] queue feeds one main-loop thread.  Any thread may create
  and configure windows; native calls are queued onto the main loop.
* Each [`window::Window`] keeps the state the application requested next to the state the OS
  reported, and publishes an event only when the reported state actually changes.
* A native event pump per backend decodes platform events into that state: X11 blocks on the
  connection from its own thread, Win32 polls its message queue through the dispatcher.

The native systems are reached through traits ([`sys::x11::XConnection`],
[`sys::win32::Win32Api`]) so the core can be driven without a display server.

# Quick Start

```no_run
# fn backend() -> std::sync::Arc<dyn gl_window::backend::Backend> { unimplemented!() }
use gl_window::{application, window::Window, event::EventKind, coordinates::Size};

application::main(|| {
    application::init(backend()).expect("no display");
    let window = Window::new();
    window.set_size(Size::new(800, 600));
    window.open(None).expect("window failed to open");
    let events = window.events();
    while let Ok(event) = events.recv() {
        if event.kind == EventKind::Close {
            break;
        }
    }
    application::exit();
});
```

# Threading Model

- [`application::main`] runs the main loop on the calling thread and your code on another.
- Setters never wait for the native call; getters read the cache.
- `open`, `destroy` and the GL context calls block until the dispatcher has run them.
- Events are delivered through bounded per-subscriber channels.  A subscriber that does not
  keep up misses events rather than stalling the pump.

# Supported platforms
| Platform | Backend                  |
|----------|--------------------------|
| Linux    | X11 / GLX               |
| Windows  | Win32 / WGL             |

*/

/// Window creation, state reconciliation, and per-window events.
///
/// # Example
/// ```
/// use gl_window::{window::Window, coordinates::Size, test_support::Harness};
///
/// let harness = Harness::new();
/// let window = harness.window();
/// window.set_size(Size::new(800, 600));
/// assert_eq!(window.size(), Size::new(800, 600));
/// ```
pub mod window;

/// Application lifecycle: init, the main loop, dispatch and exit.
///
/// # Example
/// ```no_run
/// # // can't use main thread in doctests
/// use gl_window::application;
///
/// fn main() {
///     application::main(|| {
///         // Application code here
///         application::exit();
///     });
/// }
/// ```
pub mod application;

/// The seam between the core and a native windowing stack.
pub mod backend;

/// Coordinate types for window positioning and sizing.
///
/// All values are integer pixels.
///
/// # Example
/// ```
/// use gl_window::coordinates::{Position, Size};
///
/// let pos = Position::new(100, 200);
/// assert_eq!(pos.x(), 100);
/// assert_eq!(pos.y(), 200);
///
/// let size = Size::new(800, 600);
/// assert_eq!(size.width(), 800);
/// assert_eq!(size.height(), 600);
/// ```
pub mod coordinates;

pub mod cursor;

/// The single-consumer queue behind the main loop.
pub mod dispatcher;

pub mod event;

pub(crate) mod fanout;

pub mod gl;

/// Keyboard and mouse input state.
pub mod input;

pub mod screen;

pub(crate) mod signal;

/// Native backends.
pub mod sys;

#[doc(hidden)]
pub mod test_support;

logwise::declare_logging_domain!();
