// SPDX-License-Identifier: MPL-2.0
//! Per-window subscriber registry.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, SyncSender, TryIter, TryRecvError, TrySendError, sync_channel};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::event::Event;

struct Subscriber {
    id: u64,
    sender: SyncSender<Event>,
}

/**
Delivers each published event to every subscriber.

Publishing never blocks.  A subscriber whose buffer is full misses the event; one whose
receiver was dropped is removed.
*/
pub(crate) struct Fanout {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl Fanout {
    pub(crate) fn new() -> Self {
        Fanout { subscribers: Mutex::new(Vec::new()), next_id: AtomicU64::new(0) }
    }

    pub(crate) fn subscribe(&self, buffer: usize) -> EventReceiver {
        let (sender, receiver) = sync_channel(buffer);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, sender });
        EventReceiver { id, receiver }
    }

    pub(crate) fn unsubscribe(&self, id: u64) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|s| s.id != id);
    }

    pub(crate) fn publish(&self, event: Event) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|s| match s.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(missed)) => {
                logwise::warn_sync!(
                    "Event buffer full; missed event {event}",
                    event = missed.to_string()
                );
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

/// One subscription to a window's events.
///
/// Dropping the receiver ends the subscription the next time an event is published;
/// [`crate::window::Window::close_events`] ends it at once.
#[derive(Debug)]
pub struct EventReceiver {
    id: u64,
    receiver: Receiver<Event>,
}

impl EventReceiver {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Blocks for the next event.  Errors once unsubscribed and drained.
    pub fn recv(&self) -> Result<Event, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Event, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Events already waiting, without blocking.
    pub fn try_iter(&self) -> TryIter<'_, Event> {
        self.receiver.try_iter()
    }
}
