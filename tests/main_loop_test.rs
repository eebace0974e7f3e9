//SPDX-License-Identifier: MPL-2.0

//! Drives the process-wide main loop end to end.
//!
//! `application::main` must run the closure on another thread, serve dispatches from that
//! closure on the main loop, and return once the closure calls `application::exit`.  The
//! destroy callbacks run before the backend goes away, and an open window is destroyed by exit.
//!
//! Run with: `cargo test --test main_loop_test`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use gl_window::application;
use gl_window::event::EventKind;
use gl_window::test_support::{NativeCall, RecordingBackend};
use gl_window::window::Window;

fn main() {
    //a hung main loop fails the test instead of the CI job
    thread::Builder::new()
        .name("main_loop_test watchdog".to_string())
        .spawn(|| {
            thread::sleep(Duration::from_secs(10));
            eprintln!("main_loop_test: timed out");
            std::process::exit(1);
        })
        .unwrap();

    let backend = Arc::new(RecordingBackend::new());
    let order = Arc::new(Mutex::new(Vec::new()));
    let dispatched = Arc::new(AtomicUsize::new(0));
    let opened = Arc::new(Mutex::new(None));

    let closure_backend = backend.clone();
    let closure_order = order.clone();
    let closure_dispatched = dispatched.clone();
    let closure_opened = opened.clone();
    let main_thread = thread::current().id();
    application::main(move || {
        assert_ne!(thread::current().id(), main_thread, "closure must not run on the main loop");
        application::init(closure_backend.clone()).unwrap();
        assert!(application::is_init());

        let ran_on = application::dispatch(|| thread::current().id());
        assert_eq!(ran_on, main_thread, "dispatch must run on the main loop");
        closure_dispatched.fetch_add(1, Ordering::Relaxed);

        let answer = futures::executor::block_on(application::dispatch_async(|| 6 * 7));
        assert_eq!(answer, 42);

        let window = Window::new();
        window.set_title("main loop");
        window.open(None).unwrap();
        assert!(window.is_open());
        let events = window.events();

        let first = closure_order.clone();
        application::add_destroy_callback(move || first.lock().unwrap().push("first"));
        let second = closure_order.clone();
        application::add_destroy_callback(move || second.lock().unwrap().push("second"));

        *closure_opened.lock().unwrap() = Some((window, events));
        //main returns as soon as the loop stops, so nothing may follow exit
        application::exit();
    });

    assert!(!application::is_init());
    let (window, events) = opened.lock().unwrap().take().expect("closure did not finish");
    assert!(window.is_destroyed());
    let destroyed = events.try_iter().any(|e| e.kind == EventKind::Destroyed);
    assert!(destroyed, "exit must destroy open windows");

    assert_eq!(dispatched.load(Ordering::Relaxed), 1);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    assert_eq!(backend.init_count(), 1);
    assert_eq!(backend.destroy_count(), 1);
    let calls = backend.calls();
    assert!(calls.contains(&NativeCall::Open("recording-0".to_string())));
    assert_eq!(calls.last(), Some(&NativeCall::Destroy));
    println!("main_loop_test: ok");
}
