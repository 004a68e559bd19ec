//! Explicit output channel for produced values.
//!
//! Every window, sum and average pushes what it produces into an [`Output`].
//! Values are delivered in the order of the writes (or timer ticks) that
//! produced them, followed by a single [`Event::End`] when the producer ends.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::trace;

/// One item on an output channel.
#[derive(Clone, Debug, PartialEq)]
pub enum Event<T> {
    /// A produced value.
    Data(T),
    /// The producer has ended; no further values follow.
    End,
}

impl<T> Event<T> {
    /// The carried value, if this is a data event.
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(v) => Some(v),
            Self::End => None,
        }
    }

    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

type Callback<T> = Box<dyn FnMut(Event<T>) + Send>;

enum Sink<T> {
    Discard,
    Channel(Sender<Event<T>>),
    Callback(Callback<T>),
}

/// Destination for produced values.
pub struct Output<T> {
    sink: Sink<T>,
}

impl<T: Send + 'static> Output<T> {
    /// Drop every produced value. Used for windows owned by an adapter that
    /// reads the window directly.
    #[must_use]
    pub const fn discard() -> Self {
        Self { sink: Sink::Discard }
    }

    /// Deliver into an mpsc channel; the returned receiver is the consumer end.
    #[must_use]
    pub fn channel() -> (Self, Receiver<Event<T>>) {
        let (tx, rx) = mpsc::channel();
        (Self::from_sender(tx), rx)
    }

    /// Deliver into an existing channel sender.
    #[must_use]
    pub const fn from_sender(tx: Sender<Event<T>>) -> Self {
        Self { sink: Sink::Channel(tx) }
    }

    /// Deliver by invoking `f` for every event.
    #[must_use]
    pub fn callback<F>(f: F) -> Self
    where
        F: FnMut(Event<T>) + Send + 'static,
    {
        Self { sink: Sink::Callback(Box::new(f)) }
    }

    /// Emit a produced value.
    pub fn data(&mut self, value: T) {
        self.send(Event::Data(value));
    }

    /// Emit the terminal event.
    pub fn end(&mut self) {
        self.send(Event::End);
    }

    #[must_use]
    pub const fn is_discard(&self) -> bool {
        matches!(self.sink, Sink::Discard)
    }

    fn send(&mut self, event: Event<T>) {
        match &mut self.sink {
            Sink::Discard => {}
            Sink::Channel(tx) => {
                if tx.send(event).is_err() {
                    trace!("output receiver dropped; discarding event");
                }
            }
            Sink::Callback(f) => f(event),
        }
    }
}

impl<T: Send + 'static> Default for Output<T> {
    fn default() -> Self {
        Self::discard()
    }
}

impl<T> fmt::Debug for Output<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.sink {
            Sink::Discard => "discard",
            Sink::Channel(_) => "channel",
            Sink::Callback(_) => "callback",
        };
        f.debug_struct("Output").field("sink", &kind).finish()
    }
}

/// Drain every value currently queued on `rx`, stopping at [`Event::End`].
pub fn drain<T>(rx: &Receiver<Event<T>>) -> Vec<T> {
    rx.try_iter().map_while(Event::into_data).collect()
}
