use std::{collections::VecDeque, sync::{Arc, Mutex}};

use crate::{event::EventKind, handler::EventHandler};

/// An event queue, for handing socket events over to a frame-driven loop.
///
/// Implements [`EventHandler`] by buffering every event it receives. Can be freely cloned, will point to
/// the same underlying buffer: give one clone to the socket and keep another for the UI loop.
#[derive(Default, Clone)]
pub struct EventQueue {
    queue: Arc<Mutex< VecDeque<EventKind> >>,
}

impl EventQueue {
    /// Push an event onto the event queue
    pub fn push(&self, event: EventKind) {
        self.queue
            .lock()
            .expect("Lock should not be poisoned")
            .push_back(event);
    }

    /// Returns all events currently on the event queue, which will now be empty.
    pub fn pop_all(&self) -> Vec<EventKind> {
        self.queue
            .lock()
            .expect("Lock should not be poisoned")
            .drain(..)
            .collect()
    }
}

impl EventHandler for EventQueue {
    fn on_beat(&self) {
        self.push(EventKind::Beat);
    }

    fn on_onset(&self) {
        self.push(EventKind::Onset);
    }

    fn on_tempo(&self, bpm: i16) {
        self.push(EventKind::Tempo(bpm));
    }
}
