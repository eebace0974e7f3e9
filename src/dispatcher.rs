// SPDX-License-Identifier: MPL-2.0
/*!
A bounded queue of closures consumed by exactly one thread.

Native windowing libraries want every call to come from one thread.  Callers on other threads
hand their work to a [`Dispatcher`] and the thread running [`Dispatcher::run`] executes it in
FIFO order.

```
use std::sync::Arc;
use gl_window::dispatcher::Dispatcher;

let dispatcher = Arc::new(Dispatcher::new(32));
let runner = dispatcher.clone();
let thread = std::thread::spawn(move || runner.run());

let answer = dispatcher.dispatch(|| 6 * 7);
assert_eq!(answer, 42);

dispatcher.stop();
thread.join().unwrap();
```
*/
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, TrySendError, sync_channel};
use std::sync::{Mutex, PoisonError};
use std::thread::ThreadId;

/// One unit of queued work.  Returning `false` stops the loop.
pub type Frame = Box<dyn FnOnce() -> bool + Send>;

/// Queue depth of the process-wide dispatcher.
pub const DEFAULT_QUEUE_DEPTH: usize = 32;

#[derive(Debug)]
pub struct Dispatcher {
    sender: SyncSender<Frame>,
    receiver: Mutex<Receiver<Frame>>,
    running_on: Mutex<Option<ThreadId>>,
    //set when a stop frame had to run inline
    stop_pending: AtomicBool,
}

struct EnterGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for EnterGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Dispatcher {
    /// Creates a dispatcher whose queue holds at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = sync_channel(capacity);
        Dispatcher {
            sender,
            receiver: Mutex::new(receiver),
            running_on: Mutex::new(None),
            stop_pending: AtomicBool::new(false),
        }
    }

    /// Whether the calling thread is the one currently consuming frames.
    pub fn is_dispatcher_thread(&self) -> bool {
        *self.running_on.lock().unwrap_or_else(PoisonError::into_inner)
            == Some(std::thread::current().id())
    }

    fn enter(&self) -> EnterGuard<'_> {
        *self.running_on.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(std::thread::current().id());
        EnterGuard(&self.running_on)
    }

    /**
    Enqueues a frame.

    Blocks while the queue is full.  On the dispatcher thread blocking would never end, so a
    frame that does not fit runs inline instead.
    */
    pub fn enqueue(&self, frame: Frame) {
        if self.is_dispatcher_thread() {
            match self.sender.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(frame)) => {
                    logwise::debuginternal_sync!("Dispatcher queue full; running frame inline");
                    if !frame() {
                        self.stop_pending.store(true, Ordering::Release);
                    }
                }
                //the receiver lives as long as we do
                Err(TrySendError::Disconnected(_)) => unreachable!(),
            }
        } else if self.sender.send(frame).is_err() {
            unreachable!()
        }
    }

    /// Runs `f` on the dispatcher thread without waiting for it.
    pub fn submit<F: FnOnce() + Send + 'static>(&self, f: F) {
        self.enqueue(Box::new(move || {
            f();
            true
        }));
    }

    /**
    Runs `f` on the dispatcher thread and blocks until it has finished, returning its result.

    Calls made on the dispatcher thread itself run `f` immediately.

    # Panics

    Panics if `f` panicked on the dispatcher thread.
    */
    pub fn dispatch<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_dispatcher_thread() {
            return f();
        }
        let (done, wait) = sync_channel(1);
        self.enqueue(Box::new(move || {
            _ = done.send(f());
            true
        }));
        wait.recv().expect("dispatched closure did not complete")
    }

    /// Runs `f` on the dispatcher thread, resolving when it has finished.
    pub async fn dispatch_async<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, fut) = r#continue::continuation();
        self.submit(move || {
            sender.send(f());
        });
        fut.await
    }

    /// Queues a frame that ends [`Dispatcher::run`] once every earlier frame has run.
    pub fn stop(&self) {
        self.enqueue(Box::new(|| false));
    }

    /// Consumes frames on the calling thread until one returns `false`.
    pub fn run(&self) {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self.enter();
        loop {
            if self.stop_pending.swap(false, Ordering::AcqRel) {
                break;
            }
            let Ok(frame) = receiver.recv() else {
                unreachable!()
            };
            if !frame() {
                break;
            }
        }
    }

    /**
    Blocks for and runs exactly one frame, for applications that share the thread with another
    loop.

    Returns `false` when the frame asked the loop to stop.
    */
    pub fn run_frame(&self) -> bool {
        let receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self.enter();
        if self.stop_pending.swap(false, Ordering::AcqRel) {
            return false;
        }
        let Ok(frame) = receiver.recv() else {
            unreachable!()
        };
        frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn spawn_runner(d: &Arc<Dispatcher>) -> std::thread::JoinHandle<()> {
        let d = d.clone();
        std::thread::spawn(move || d.run())
    }

    #[test]
    fn frames_run_in_order() {
        let d = Arc::new(Dispatcher::new(DEFAULT_QUEUE_DEPTH));
        let order = Arc::new(Mutex::new(Vec::new()));
        let t = spawn_runner(&d);
        for i in 0..100 {
            let order = order.clone();
            d.submit(move || order.lock().unwrap().push(i));
        }
        let seen = {
            let order = order.clone();
            d.dispatch(move || order.lock().unwrap().clone())
        };
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
        d.stop();
        t.join().unwrap();
    }

    #[test]
    fn dispatch_returns_after_its_own_closure() {
        let d = Arc::new(Dispatcher::new(4));
        let t = spawn_runner(&d);
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..10 {
            let log2 = log.clone();
            let r = d.dispatch(move || {
                std::thread::sleep(Duration::from_millis(1));
                log2.lock().unwrap().push(i);
                i * 2
            });
            assert_eq!(r, i * 2);
            //our closure finished, and no later one has started
            assert_eq!(*log.lock().unwrap().last().unwrap(), i);
        }
        d.stop();
        t.join().unwrap();
    }

    #[test]
    fn runs_on_dispatcher_thread() {
        let d = Arc::new(Dispatcher::new(4));
        let t = spawn_runner(&d);
        let runner_id = t.thread().id();
        let d2 = d.clone();
        let (id, inline) = d.dispatch(move || {
            //nested dispatch must not deadlock
            let inline = d2.dispatch(|| std::thread::current().id());
            (std::thread::current().id(), inline)
        });
        assert_eq!(id, runner_id);
        assert_eq!(inline, runner_id);
        d.stop();
        t.join().unwrap();
    }

    #[test]
    fn full_queue_applies_backpressure() {
        let d = Arc::new(Dispatcher::new(1));
        d.submit(|| {});
        let d2 = d.clone();
        let producer = std::thread::spawn(move || {
            d2.submit(|| {});
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());
        assert!(d.run_frame());
        producer.join().unwrap();
        assert!(d.run_frame());
    }

    #[test]
    fn full_queue_on_dispatcher_thread_runs_inline() {
        let d = Arc::new(Dispatcher::new(1));
        let t = spawn_runner(&d);
        let d2 = d.clone();
        let ran = d.dispatch(move || {
            let ran = Arc::new(AtomicBool::new(false));
            d2.submit(|| {});
            let r = ran.clone();
            d2.submit(move || r.store(true, Ordering::Relaxed));
            ran.load(Ordering::Relaxed)
        });
        assert!(ran);
        d.stop();
        t.join().unwrap();
    }

    #[test]
    fn stop_waits_for_earlier_frames() {
        let d = Arc::new(Dispatcher::new(8));
        let count = Arc::new(Mutex::new(0));
        for _ in 0..3 {
            let count = count.clone();
            d.submit(move || *count.lock().unwrap() += 1);
        }
        d.stop();
        d.run();
        assert_eq!(*count.lock().unwrap(), 3);
    }

    #[test]
    fn dispatch_async_resolves() {
        let d = Arc::new(Dispatcher::new(8));
        let t = spawn_runner(&d);
        let r = futures::executor::block_on(d.dispatch_async(|| "done"));
        assert_eq!(r, "done");
        d.stop();
        t.join().unwrap();
    }
}
