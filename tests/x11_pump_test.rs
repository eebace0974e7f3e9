//SPDX-License-Identifier: MPL-2.0

//! The X11 backend against an in-memory connection.
//!
//! The fake connection behaves like a cooperative X server: mapping produces MapNotify,
//! unmapping produces UnmapNotify, and (when configured) a `_NET_REQUEST_FRAME_EXTENTS`
//! message is answered with a `_NET_FRAME_EXTENTS` PropertyNotify.

use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::channel;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use gl_window::application::{InitError, Options, Platform};
use gl_window::coordinates::{Extents, Position, Size};
use gl_window::cursor::{Cursor, Image};
use gl_window::event::EventKind;
use gl_window::gl::GLConfig;
use gl_window::input::keyboard::KeyState;
use gl_window::input::keyboard::key::Key;
use gl_window::input::mouse::{Button, ButtonState};
use gl_window::screen::{Screen, ScreenMode};
use gl_window::sys::x11::{
    Atom, Configure, ContextRequest, CreateWindow, Extension, Keysym, ModifierState, SizeHints, Timeouts, WindowId,
    X11Backend, X11Error, XConnection, XEvent, XkbNotify,
};
use gl_window::window::{EventReceiver, Window};

const ROOT: WindowId = 1;
const XKB_DEVICE: i32 = 3;
const KEYCODE_A: u8 = 38;

#[derive(Default)]
struct State {
    queue: VecDeque<XEvent>,
    atoms: HashMap<String, Atom>,
    next_window: WindowId,
    windows: Vec<WindowId>,
    properties: HashMap<(WindowId, Atom), Vec<u32>>,
    keymap_refreshes: usize,
    missing: Option<Extension>,
    grabbed: bool,
    warps: Vec<(i16, i16)>,
    cursors_created: u32,
    defined_cursor: Option<u32>,
}

struct FakeConnection {
    state: Mutex<State>,
    ready: Condvar,
    //left, right, top, bottom as a window manager would answer
    frame_extents: Option<[u32; 4]>,
}

impl FakeConnection {
    fn new(frame_extents: Option<[u32; 4]>) -> Self {
        FakeConnection {
            state: Mutex::new(State { next_window: 0x40_0000, ..State::default() }),
            ready: Condvar::new(),
            frame_extents,
        }
    }

    fn push(&self, event: XEvent) {
        self.state.lock().unwrap().queue.push_back(event);
        self.ready.notify_all();
    }

    fn atom(&self, name: &str) -> Atom {
        self.intern_atom(name)
    }

    fn last_window(&self) -> WindowId {
        *self.state.lock().unwrap().windows.last().expect("no window created")
    }

    fn keymap_refreshes(&self) -> usize {
        self.state.lock().unwrap().keymap_refreshes
    }

    fn warps(&self) -> Vec<(i16, i16)> {
        self.state.lock().unwrap().warps.clone()
    }

    fn grabbed(&self) -> bool {
        self.state.lock().unwrap().grabbed
    }

    fn set_frame_extents(&self, window: WindowId, extents: [u32; 4]) {
        let atom = self.atom("_NET_FRAME_EXTENTS");
        self.state.lock().unwrap().properties.insert((window, atom), extents.to_vec());
        self.push(XEvent::Property { window, atom });
    }
}

impl XConnection for FakeConnection {
    fn extension_version(&self, extension: Extension) -> Option<(u32, u32)> {
        if self.state.lock().unwrap().missing == Some(extension) {
            return None;
        }
        Some(extension.minimum_version())
    }

    fn intern_atom(&self, name: &str) -> Atom {
        let mut state = self.state.lock().unwrap();
        let next = 100 + state.atoms.len() as Atom;
        *state.atoms.entry(name.to_string()).or_insert(next)
    }

    fn root(&self) -> WindowId {
        ROOT
    }

    fn screens(&self) -> Vec<Screen> {
        vec![Screen::new(
            "fake-0",
            Position::new(0, 0),
            ScreenMode { resolution: Size::new(1280, 1024), refresh_rate: 60.0 },
            Size::new(0, 0),
        )]
    }

    fn wait_for_event(&self) -> Option<XEvent> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(event) = state.queue.pop_front() {
                return Some(event);
            }
            state = self.ready.wait(state).unwrap();
        }
    }

    fn wake(&self) {
        self.push(XEvent::Other { response_type: 0xff });
    }

    fn flush(&self) {}

    fn lookup_key(&self, keycode: u8) -> (Keysym, Option<char>) {
        match keycode {
            KEYCODE_A => (0x61, Some('a')),
            _ => (0, None),
        }
    }

    fn refresh_keymap(&self) {
        self.state.lock().unwrap().keymap_refreshes += 1;
    }

    fn update_modifiers(&self, _state: ModifierState) {}

    fn xkb_device(&self) -> i32 {
        XKB_DEVICE
    }

    fn indicator_state(&self) -> Option<u32> {
        None
    }

    fn create_window(&self, _request: &CreateWindow) -> Result<WindowId, X11Error> {
        let mut state = self.state.lock().unwrap();
        state.next_window += 1;
        let id = state.next_window;
        state.windows.push(id);
        Ok(id)
    }

    fn destroy_window(&self, _window: WindowId) {}

    fn map_window(&self, window: WindowId) {
        self.push(XEvent::Map { window });
    }

    fn unmap_window(&self, window: WindowId) -> Result<(), X11Error> {
        self.push(XEvent::Unmap { window });
        Ok(())
    }

    fn configure_window(&self, _window: WindowId, _configure: Configure) {}
    fn set_size_hints(&self, _window: WindowId, _hints: &SizeHints) {}
    fn set_title(&self, _window: WindowId, _title: &str) {}

    fn change_property(&self, window: WindowId, property: Atom, _kind: Atom, data: &[u32]) -> Result<(), X11Error> {
        self.state.lock().unwrap().properties.insert((window, property), data.to_vec());
        Ok(())
    }

    fn get_cardinal_property(&self, window: WindowId, property: Atom) -> Result<Vec<u32>, X11Error> {
        Ok(self.state.lock().unwrap().properties.get(&(window, property)).cloned().unwrap_or_default())
    }

    fn send_client_message(&self, _destination: WindowId, window: WindowId, message_type: Atom, _data: [u32; 5]) {
        if message_type != self.atom("_NET_REQUEST_FRAME_EXTENTS") {
            return;
        }
        if let Some(extents) = self.frame_extents {
            let atom = self.atom("_NET_FRAME_EXTENTS");
            self.state.lock().unwrap().properties.insert((window, atom), extents.to_vec());
            self.push(XEvent::Property { window, atom });
        }
    }

    fn grab_pointer(&self, _window: WindowId) -> Result<(), X11Error> {
        self.state.lock().unwrap().grabbed = true;
        Ok(())
    }
    fn ungrab_pointer(&self) {
        self.state.lock().unwrap().grabbed = false;
    }
    fn warp_pointer(&self, _window: WindowId, x: i16, y: i16) {
        self.state.lock().unwrap().warps.push((x, y));
    }
    fn create_cursor(&self, _window: WindowId, _image: &Image, _hotspot: Position) -> Result<u32, X11Error> {
        let mut state = self.state.lock().unwrap();
        state.cursors_created += 1;
        Ok(state.cursors_created)
    }
    fn free_cursor(&self, _cursor: u32) {}
    fn define_cursor(&self, _window: WindowId, cursor: u32) {
        self.state.lock().unwrap().defined_cursor = Some(cursor);
    }

    fn glx_configs(&self) -> Vec<GLConfig> {
        Vec::new()
    }
    fn glx_extensions(&self) -> String {
        String::new()
    }
    fn glx_create_context(&self, _request: &ContextRequest, _share: Option<u64>) -> Result<u64, X11Error> {
        Err(X11Error::BadMatch)
    }
    fn glx_destroy_context(&self, _context: u64) {}
    fn glx_make_current(&self, _window: WindowId, _context: Option<u64>) {}
    fn glx_swap_buffers(&self, _window: WindowId) {}
    fn glx_swap_interval(&self, _window: WindowId, _interval: i32) {}
}

fn short_timeouts() -> Timeouts {
    Timeouts {
        frame_extents: Duration::from_millis(50),
        map: Duration::from_millis(50),
        unmap: Duration::from_millis(50),
        wm_hints: Duration::from_millis(50),
        redecorate: Duration::from_millis(0),
    }
}

/// A private platform running its main loop on a background thread, initialized over X11.
struct Fixture {
    platform: Platform,
    backend: Arc<X11Backend<FakeConnection>>,
    main_loop: Option<JoinHandle<()>>,
}

impl Fixture {
    fn new(frame_extents: Option<[u32; 4]>) -> Self {
        Fixture::with_options(frame_extents, Options::default())
    }

    fn with_options(frame_extents: Option<[u32; 4]>, options: Options) -> Self {
        let platform = Platform::new(options);
        let runner = platform.clone();
        let main_loop = std::thread::spawn(move || runner.main_loop());
        let backend = Arc::new(X11Backend::with_timeouts(FakeConnection::new(frame_extents), short_timeouts()));
        platform.init(backend.clone()).unwrap();
        Fixture { platform, backend, main_loop: Some(main_loop) }
    }

    fn conn(&self) -> &FakeConnection {
        self.backend.connection()
    }

    fn open_window(&self) -> Window {
        let window = Window::new_in(&self.platform);
        window.open(None).unwrap();
        window
    }

    fn settle(&self) {
        self.platform.dispatch(|| ());
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.platform.exit();
        if let Some(main_loop) = self.main_loop.take() {
            _ = main_loop.join();
        }
    }
}

fn next(events: &EventReceiver) -> Option<EventKind> {
    events.recv_timeout(Duration::from_secs(2)).ok().map(|e| e.kind)
}

/// Round-trips a close request through the pump, so everything queued before it was handled.
fn sync(fixture: &Fixture, events: &EventReceiver) {
    let xid = fixture.conn().last_window();
    let delete = fixture.conn().atom("WM_DELETE_WINDOW");
    fixture.conn().push(XEvent::ClientMessage {
        window: xid,
        message_type: fixture.conn().atom("WM_PROTOCOLS"),
        data: [delete, 0, 0, 0, 0],
    });
    loop {
        match next(events) {
            Some(EventKind::Close) => return,
            Some(_) => continue,
            None => panic!("pump did not deliver close"),
        }
    }
}

#[test]
fn missing_extension_fails_init() {
    let conn = FakeConnection::new(None);
    conn.state.lock().unwrap().missing = Some(Extension::XInput);
    let platform = Platform::new(Options::default());
    let result = platform.init(Arc::new(X11Backend::new(conn)));
    assert_eq!(result, Err(InitError::MissingFeature("XInput extension".to_string())));
    assert!(!platform.is_init());
}

#[test]
fn answered_frame_extents_are_stored() {
    let fixture = Fixture::new(Some([2, 3, 24, 4]));
    let window = fixture.open_window();
    assert_eq!(window.extents(), Extents::new(2, 3, 4, 24));
}

#[test]
fn silent_window_manager_gives_zero_extents_in_bounded_time() {
    let fixture = Fixture::new(None);
    let start = Instant::now();
    let window = fixture.open_window();
    assert!(window.is_open());
    assert_eq!(window.extents(), Extents::ZERO);
    assert!(start.elapsed() < Duration::from_secs(2), "open took {:?}", start.elapsed());
}

#[test]
fn keys_and_buttons_are_routed_to_their_window() {
    let fixture = Fixture::new(Some([1, 1, 1, 1]));
    let window = fixture.open_window();
    let events = window.events();
    let xid = fixture.conn().last_window();

    fixture.conn().push(XEvent::KeyPress { window: xid, keycode: KEYCODE_A });
    fixture.conn().push(XEvent::KeyRelease { window: xid, keycode: KEYCODE_A });
    fixture.conn().push(XEvent::ButtonPress { window: xid, detail: 1 });
    fixture.conn().push(XEvent::ButtonPress { window: xid, detail: 4 });
    //scroll releases carry nothing
    fixture.conn().push(XEvent::ButtonRelease { window: xid, detail: 4 });
    fixture.conn().push(XEvent::ButtonRelease { window: xid, detail: 1 });
    //addressed to a window nobody owns
    fixture.conn().push(XEvent::ButtonPress { window: xid + 100, detail: 3 });

    let expected = [
        EventKind::KeyboardState { key: Key::A, raw: 0x61, state: KeyState::Down },
        EventKind::KeyboardTyped('a'),
        EventKind::KeyboardState { key: Key::A, raw: 0x61, state: KeyState::Up },
        EventKind::MouseButton { button: Button::Left, state: ButtonState::Down },
        EventKind::MouseButton { button: Button::Wheel, state: ButtonState::ScrollForward },
        EventKind::MouseButton { button: Button::Left, state: ButtonState::Up },
    ];
    for kind in expected {
        assert_eq!(next(&events), Some(kind));
    }
    sync(&fixture, &events);
    assert_eq!(window.button_state(Button::Right), ButtonState::Up);
}

#[test]
fn protocol_errors_do_not_stop_the_pump() {
    let fixture = Fixture::new(Some([1, 1, 1, 1]));
    let window = fixture.open_window();
    let events = window.events();

    fixture.conn().push(XEvent::Error { code: 3, sequence: 41 });
    fixture.conn().push(XEvent::Other { response_type: 99 });
    fixture.conn().push(XEvent::Xkb { device: XKB_DEVICE, notify: XkbNotify::Map });
    fixture.conn().push(XEvent::Xkb { device: XKB_DEVICE + 1, notify: XkbNotify::NewKeyboard });
    sync(&fixture, &events);

    assert_eq!(fixture.conn().keymap_refreshes(), 1);
}

#[test]
fn configure_is_ignored_while_hidden() {
    let fixture = Fixture::new(Some([1, 1, 1, 1]));
    let window = Window::new_in(&fixture.platform);
    window.set_visible(false);
    window.open(None).unwrap();
    let events = window.events();
    let xid = fixture.conn().last_window();

    fixture.conn().push(XEvent::Configure { window: xid, x: 40, y: 50, width: 300, height: 200 });
    sync(&fixture, &events);
    assert_eq!(window.size(), Size::new(640, 480));

    window.set_visible(true);
    fixture.settle();
    fixture.conn().push(XEvent::Configure { window: xid, x: 40, y: 50, width: 300, height: 200 });
    assert_eq!(next(&events), Some(EventKind::Resized(Size::new(300, 200))));
    assert_eq!(next(&events), Some(EventKind::Moved(Position::new(40, 50))));
}

#[test]
fn focus_out_releases_held_keys() {
    let fixture = Fixture::new(Some([1, 1, 1, 1]));
    let window = fixture.open_window();
    let events = window.events();
    let xid = fixture.conn().last_window();

    fixture.conn().push(XEvent::KeyPress { window: xid, keycode: KEYCODE_A });
    fixture.conn().push(XEvent::FocusOut { window: xid });

    let mut seen = Vec::new();
    while let Some(kind) = next(&events) {
        seen.push(kind.clone());
        if kind == (EventKind::KeyboardState { key: Key::A, raw: 0x61, state: KeyState::Up }) {
            break;
        }
    }
    assert!(seen.contains(&EventKind::Focused(false)), "saw {seen:?}");
    assert!(!window.focused());
}

#[test]
fn later_frame_changes_reach_the_window() {
    let fixture = Fixture::new(Some([2, 3, 24, 4]));
    let window = fixture.open_window();
    let events = window.events();
    let xid = fixture.conn().last_window();

    //left, right, top, bottom
    fixture.conn().set_frame_extents(xid, [5, 6, 30, 7]);
    sync(&fixture, &events);

    assert_eq!(window.extents(), Extents::new(5, 6, 7, 30));
}

/// Opens a window with the pointer inside at (100, 80).
fn pointer_inside(fixture: &Fixture) -> (Window, EventReceiver, WindowId) {
    let window = fixture.open_window();
    let events = window.events();
    let xid = fixture.conn().last_window();
    fixture.conn().push(XEvent::Enter { window: xid });
    fixture.conn().push(XEvent::Motion { window: xid, x: 100, y: 80 });
    assert_eq!(next(&events), Some(EventKind::CursorWithin(true)));
    assert_eq!(next(&events), Some(EventKind::CursorPosition { x: 100.0, y: 80.0 }));
    (window, events, xid)
}

#[test]
fn grabbed_motion_reports_deltas_and_recentres() {
    let fixture = Fixture::new(Some([1, 1, 1, 1]));
    let (window, events, xid) = pointer_inside(&fixture);
    window.set_cursor_grabbed(true);
    fixture.settle();
    assert!(fixture.conn().grabbed());

    //the jump onto the centre is swallowed
    fixture.conn().push(XEvent::Motion { window: xid, x: 330, y: 250 });
    fixture.conn().push(XEvent::Motion { window: xid, x: 324, y: 238 });
    assert_eq!(next(&events), Some(EventKind::CursorPosition { x: 4.0, y: -2.0 }));
    sync(&fixture, &events);
    assert_eq!(fixture.conn().warps(), vec![(320, 240), (320, 240)]);

    //re-entering forgets the last position and re-grabs
    fixture.conn().push(XEvent::Enter { window: xid });
    sync(&fixture, &events);
    fixture.settle();
    fixture.conn().push(XEvent::Motion { window: xid, x: 500, y: 400 });
    fixture.conn().push(XEvent::Motion { window: xid, x: 503, y: 401 });
    fixture.conn().push(XEvent::Motion { window: xid, x: 321, y: 241 });
    assert_eq!(next(&events), Some(EventKind::CursorPosition { x: 1.0, y: 1.0 }));
    sync(&fixture, &events);
    //no warp for the first sample after entering
    assert_eq!(fixture.conn().warps(), vec![(320, 240); 4]);
    //the cache keeps the pre-grab position
    assert_eq!(window.cursor_position(), (100.0, 80.0));
}

#[test]
fn releasing_a_grab_warps_back_to_where_it_started() {
    let fixture = Fixture::new(Some([1, 1, 1, 1]));
    let (window, events, xid) = pointer_inside(&fixture);
    window.set_cursor_grabbed(true);
    fixture.settle();
    fixture.conn().push(XEvent::Motion { window: xid, x: 330, y: 250 });
    fixture.conn().push(XEvent::Motion { window: xid, x: 350, y: 260 });
    assert_eq!(next(&events), Some(EventKind::CursorPosition { x: 30.0, y: 20.0 }));
    sync(&fixture, &events);

    window.set_cursor_grabbed(false);
    fixture.settle();

    assert!(!fixture.conn().grabbed());
    assert_eq!(fixture.conn().warps().last(), Some(&(100, 80)));
    assert_eq!(window.cursor_position(), (100.0, 80.0));
}

#[test]
fn a_new_cursor_is_realized_after_an_old_one_is_dropped() {
    let fixture = Fixture::new(Some([1, 1, 1, 1]));
    let window = fixture.open_window();

    let red = Cursor::new(Image::new(1, 1, vec![255, 0, 0, 255]).unwrap(), Position::new(0, 0));
    window.set_cursor(Some(red.clone()));
    fixture.settle();
    let red_handle = fixture.conn().state.lock().unwrap().defined_cursor;
    window.set_cursor(None);
    fixture.settle();
    drop(red);

    let blue = Cursor::new(Image::new(1, 1, vec![0, 0, 255, 255]).unwrap(), Position::new(0, 0));
    window.set_cursor(Some(blue));
    fixture.settle();

    let state = fixture.conn().state.lock().unwrap();
    assert_eq!(state.cursors_created, 2);
    assert_ne!(state.defined_cursor, red_handle);
    assert_eq!(state.defined_cursor, Some(2));
}

#[test]
fn exit_from_the_main_loop_does_not_wait_for_a_blocked_pump() {
    let fixture = Fixture::with_options(Some([1, 1, 1, 1]), Options { queue_depth: 1, ..Options::default() });
    let (window, _events, xid) = pointer_inside(&fixture);
    window.set_cursor_grabbed(true);
    fixture.settle();

    let platform = fixture.platform.clone();
    let backend = fixture.backend.clone();
    let (done, finished) = channel();
    std::thread::spawn(move || {
        let inner = platform.clone();
        platform.dispatch(move || {
            //each focus-in asks the main loop to re-grab; the second one cannot be queued
            backend.connection().push(XEvent::FocusIn { window: xid });
            backend.connection().push(XEvent::FocusIn { window: xid });
            std::thread::sleep(Duration::from_millis(100));
            inner.exit();
        });
        _ = done.send(());
    });

    assert!(finished.recv_timeout(Duration::from_secs(5)).is_ok(), "exit deadlocked");
    assert!(!fixture.platform.is_init());
}
