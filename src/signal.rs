// SPDX-License-Identifier: MPL-2.0
//! Single-slot wakeups for the bounded waits of window-manager negotiation.
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::time::Duration;

/**
A one-slot signal.

`notify` never blocks: a second notification while one is pending is dropped.  A waiter gives
up after its timeout, because window managers are free to never answer.
*/
#[derive(Debug)]
pub(crate) struct Signal {
    sender: SyncSender<()>,
    receiver: Mutex<Receiver<()>>,
}

impl Signal {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = sync_channel(1);
        Signal { sender, receiver: Mutex::new(receiver) }
    }

    pub(crate) fn notify(&self) {
        match self.sender.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            //we own the receiver
            Err(TrySendError::Disconnected(())) => unreachable!(),
        }
    }

    /// Drops a pending notification left over from an earlier exchange.
    pub(crate) fn clear(&self) {
        let receiver = self.receiver.lock().unwrap_or_else(|e| e.into_inner());
        while receiver.try_recv().is_ok() {}
    }

    /// Waits for a notification; `false` on timeout.
    pub(crate) fn wait(&self, timeout: Duration) -> bool {
        let receiver = self.receiver.lock().unwrap_or_else(|e| e.into_inner());
        match receiver.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn times_out() {
        let s = Signal::new();
        let start = Instant::now();
        assert!(!s.wait(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn wakes_from_other_thread() {
        let s = Arc::new(Signal::new());
        let s2 = s.clone();
        let t = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            s2.notify();
        });
        assert!(s.wait(Duration::from_secs(5)));
        t.join().unwrap();
    }

    #[test]
    fn single_slot() {
        let s = Signal::new();
        s.notify();
        s.notify();
        assert!(s.wait(Duration::from_millis(1)));
        assert!(!s.wait(Duration::from_millis(1)));
        s.notify();
        s.clear();
        assert!(!s.wait(Duration::from_millis(1)));
    }
}
