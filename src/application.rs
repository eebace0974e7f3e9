// SPDX-License-Identifier: MPL-2.0
/*!
Process lifecycle: initialization, the main loop, and teardown.

A [`Platform`] bundles the dispatcher, the native backend and the destroy callbacks.  The
functions at the top of this module operate on the process-wide platform; tests and embedders
that want several independent platforms can construct their own with [`Platform::new`].

The usual shape of a program:

```no_run
# fn backend() -> std::sync::Arc<dyn gl_window::backend::Backend> { unimplemented!() }
use gl_window::{application, window::Window};

application::main(|| {
    application::init(backend()).expect("no display");
    let window = Window::new();
    window.open(None).expect("can't open window");
    // ...
    application::exit();
});
```
*/
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use crate::backend::Backend;
use crate::dispatcher::{DEFAULT_QUEUE_DEPTH, Dispatcher};

pub(crate) const CALL_INIT: &str =
    "gl_window must be initialized before calling this; call application::init first";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("unable to open display: {0}")]
    MissingDisplay(String),
    #[error("{extension} version {}.{} is required but only {}.{} is available", .required.0, .required.1, .found.0, .found.1)]
    UnsupportedVersion {
        extension: &'static str,
        required: (u32, u32),
        found: (u32, u32),
    },
    #[error("required feature is missing: {0}")]
    MissingFeature(String),
    #[error("backend failed to initialize: {0}")]
    Backend(String),
}

/// Tunables for a [`Platform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Frames the dispatcher queue holds before producers block.
    pub queue_depth: usize,
    /// Buffer size of [`crate::window::Window::events`].
    pub event_buffer: usize,
    /// Sleep between empty polls on polling backends.
    pub idle_poll: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            event_buffer: 64,
            idle_poll: Duration::from_millis(10),
        }
    }
}

/// Identifies a registered destroy callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestroyCallbackId(u64);

type DestroyCallback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct PlatformState {
    backend: Option<Arc<dyn Backend>>,
    destroy_callbacks: Vec<(DestroyCallbackId, DestroyCallback)>,
    next_callback: u64,
}

struct PlatformInner {
    dispatcher: Arc<Dispatcher>,
    options: Options,
    state: Mutex<PlatformState>,
}

/// The dispatcher, backend, and lifecycle state shared by every window.
#[derive(Clone)]
pub struct Platform {
    inner: Arc<PlatformInner>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("options", &self.inner.options)
            .field("is_init", &self.is_init())
            .finish()
    }
}

impl Platform {
    pub fn new(options: Options) -> Platform {
        Platform {
            inner: Arc::new(PlatformInner {
                dispatcher: Arc::new(Dispatcher::new(options.queue_depth)),
                options,
                state: Mutex::new(PlatformState::default()),
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, PlatformState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.inner.dispatcher
    }

    /**
    Initializes `backend`.  Does nothing if already initialized.

    On error nothing is retained and `init` may be called again.
    */
    pub fn init(&self, backend: Arc<dyn Backend>) -> Result<(), InitError> {
        let mut state = self.state();
        if state.backend.is_some() {
            return Ok(());
        }
        if let Err(e) = backend.init(&self.inner.dispatcher) {
            logwise::error_sync!("Backend initialization failed: {e}", e = e.to_string());
            return Err(e);
        }
        state.backend = Some(backend);
        logwise::info_sync!("gl_window initialized");
        Ok(())
    }

    pub fn is_init(&self) -> bool {
        self.state().backend.is_some()
    }

    /// The initialized backend.
    pub fn backend(&self) -> Option<Arc<dyn Backend>> {
        self.state().backend.clone()
    }

    pub(crate) fn require_backend(&self) -> Arc<dyn Backend> {
        self.backend().expect(CALL_INIT)
    }

    /**
    Tears everything down and stops the main loop.

    Does nothing when not initialized.  Otherwise, in order: marks the platform uninitialized,
    runs each destroy callback once in registration order (without holding the platform lock,
    so callbacks may use the platform), destroys the backend, and queues the frame that makes
    [`Platform::main_loop`] return.
    */
    pub fn exit(&self) {
        let (backend, callbacks) = {
            let mut state = self.state();
            let Some(backend) = state.backend.take() else {
                return;
            };
            (backend, std::mem::take(&mut state.destroy_callbacks))
        };
        for (_, callback) in callbacks {
            callback();
        }
        backend.destroy();
        self.state().destroy_callbacks.clear();
        logwise::info_sync!("gl_window exited");
        self.inner.dispatcher.stop();
    }

    /// Runs the dispatcher on this thread until [`Platform::exit`].
    pub fn main_loop(&self) {
        self.inner.dispatcher.run();
    }

    /// Runs one dispatcher frame; `false` once the loop was asked to stop.
    pub fn main_loop_frame(&self) -> bool {
        self.inner.dispatcher.run_frame()
    }

    pub fn dispatch<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.inner.dispatcher.dispatch(f)
    }

    pub async fn dispatch_async<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.inner.dispatcher.dispatch_async(f).await
    }

    /// Registers `callback` to run during [`Platform::exit`], before the backend is destroyed.
    pub fn add_destroy_callback<F: FnOnce() + Send + 'static>(&self, callback: F) -> DestroyCallbackId {
        let mut state = self.state();
        let id = DestroyCallbackId(state.next_callback);
        state.next_callback += 1;
        state.destroy_callbacks.push((id, Box::new(callback)));
        id
    }

    /// Unregisters a callback.  Unknown ids are ignored.
    pub fn remove_destroy_callback(&self, id: DestroyCallbackId) {
        self.state().destroy_callbacks.retain(|(i, _)| *i != id);
    }
}

static OPTIONS: OnceLock<Options> = OnceLock::new();
static PLATFORM: OnceLock<Platform> = OnceLock::new();

/**
Sets options for the process-wide platform.

Must happen before anything else in this module is used; returns `false` (and changes nothing)
afterwards.
*/
pub fn configure(options: Options) -> bool {
    if PLATFORM.get().is_some() {
        logwise::warn_sync!("configure called after the platform was created; ignoring");
        return false;
    }
    OPTIONS.set(options).is_ok()
}

/// The process-wide platform.
pub fn platform() -> &'static Platform {
    PLATFORM.get_or_init(|| Platform::new(OPTIONS.get().cloned().unwrap_or_default()))
}

pub fn init(backend: Arc<dyn Backend>) -> Result<(), InitError> {
    platform().init(backend)
}

pub fn is_init() -> bool {
    platform().is_init()
}

pub fn exit() {
    platform().exit()
}

/// Runs the process-wide dispatcher on this thread until [`exit`].
pub fn main_loop() {
    platform().main_loop()
}

pub fn main_loop_frame() -> bool {
    platform().main_loop_frame()
}

/**
Runs `closure` on a new thread and the main loop on this one.

Call this from the first thread of the program; some native toolkits only accept UI calls from
that thread.  Returns after [`exit`].
*/
pub fn main<F: FnOnce() + Send + 'static>(closure: F) {
    _ = std::thread::Builder::new()
        .name("gl_window main closure".to_string())
        .spawn(closure);
    main_loop();
}

/// Runs `f` on the dispatcher thread and waits for its result.
pub fn dispatch<R, F>(f: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    platform().dispatch(f)
}

pub async fn dispatch_async<R, F>(f: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    platform().dispatch_async(f).await
}

pub fn add_destroy_callback<F: FnOnce() + Send + 'static>(callback: F) -> DestroyCallbackId {
    platform().add_destroy_callback(callback)
}

pub fn remove_destroy_callback(id: DestroyCallbackId) {
    platform().remove_destroy_callback(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingBackend;

    #[test]
    fn init_is_idempotent() {
        let platform = Platform::new(Options::default());
        let backend = Arc::new(RecordingBackend::new());
        platform.init(backend.clone()).unwrap();
        platform.init(backend.clone()).unwrap();
        assert!(platform.is_init());
        assert_eq!(backend.init_count(), 1);
    }

    #[test]
    fn failed_init_retains_nothing() {
        let platform = Platform::new(Options::default());
        let failing = Arc::new(RecordingBackend::failing(InitError::MissingDisplay(":0".into())));
        assert_eq!(
            platform.init(failing),
            Err(InitError::MissingDisplay(":0".into()))
        );
        assert!(!platform.is_init());
        platform.init(Arc::new(RecordingBackend::new())).unwrap();
        assert!(platform.is_init());
    }

    #[test]
    fn exit_runs_callbacks_in_order_then_destroys() {
        let platform = Platform::new(Options::default());
        let backend = Arc::new(RecordingBackend::new());
        platform.init(backend.clone()).unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            let backend = backend.clone();
            let p = platform.clone();
            platform.add_destroy_callback(move || {
                //the platform lock is not held here
                p.add_destroy_callback(|| {});
                assert_eq!(backend.destroy_count(), 0);
                order.lock().unwrap().push(i);
            });
        }
        let removed = platform.add_destroy_callback(|| panic!("removed callback ran"));
        platform.remove_destroy_callback(removed);

        platform.exit();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(backend.destroy_count(), 1);
        assert!(!platform.is_init());
        //the stop frame ends the loop
        platform.main_loop();

        //second exit is a no-op
        platform.exit();
        assert_eq!(backend.destroy_count(), 1);
    }
}
