use std::sync::Arc;

use crate::event::EventKind;

/// Receives decoded events from an [`EventSocket`](crate::EventSocket).
///
/// Every method is optional and does nothing by default. Methods are called from the socket task,
/// one event at a time, and are expected to return quickly: a blocking handler stalls the connection.
pub trait EventHandler: Send + Sync + 'static {
    fn on_beat(&self) {}

    fn on_onset(&self) {}

    fn on_tempo(&self, _bpm: i16) {}
}

impl<T: EventHandler> EventHandler for Arc<T> {
    fn on_beat(&self) {
        (**self).on_beat()
    }

    fn on_onset(&self) {
        (**self).on_onset()
    }

    fn on_tempo(&self, bpm: i16) {
        (**self).on_tempo(bpm)
    }
}

/// Invoke the handler method matching the event.
pub fn dispatch<H: EventHandler + ?Sized>(handler: &H, event: EventKind) {
    match event {
        EventKind::Beat => handler.on_beat(),
        EventKind::Onset => handler.on_onset(),
        EventKind::Tempo(bpm) => handler.on_tempo(bpm),
    }
}

type Callback = Box<dyn Fn() + Send + Sync>;
type TempoCallback = Box<dyn Fn(i16) + Send + Sync>;

/// A set of closures, each optional. Absent callbacks are skipped.
///
/// ```
/// use beatsocket::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .on_beat(|| println!("beat"))
///     .on_tempo(|bpm| println!("{bpm} bpm"));
/// ```
#[derive(Default)]
pub struct Callbacks {
    beat: Option<Callback>,
    onset: Option<Callback>,
    tempo: Option<TempoCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_beat(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.beat = Some(Box::new(f));
        self
    }

    pub fn on_onset(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.onset = Some(Box::new(f));
        self
    }

    pub fn on_tempo(mut self, f: impl Fn(i16) + Send + Sync + 'static) -> Self {
        self.tempo = Some(Box::new(f));
        self
    }
}

impl EventHandler for Callbacks {
    fn on_beat(&self) {
        if let Some(f) = &self.beat {
            f()
        }
    }

    fn on_onset(&self) {
        if let Some(f) = &self.onset {
            f()
        }
    }

    fn on_tempo(&self, bpm: i16) {
        if let Some(f) = &self.tempo {
            f(bpm)
        }
    }
}
