//! Host events and the sources they are polled from.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::model::Point;

/// Pointer gesture step. Positions are `None` outside the image canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press(Option<Point>),
    Drag(Option<Point>),
    Release(Option<Point>),
}

/// Input delivered by the host toolkit.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Key press, named like `"n"` or `"ctrl+z"`.
    Key(String),
    Pointer(PointerEvent),
    /// The window was closed.
    WindowClosed,
}

impl HostEvent {
    pub fn key(name: impl Into<String>) -> Self {
        HostEvent::Key(name.into())
    }

    pub fn press(x: f64, y: f64) -> Self {
        HostEvent::Pointer(PointerEvent::Press(Some(Point::new(x, y))))
    }

    pub fn drag(x: f64, y: f64) -> Self {
        HostEvent::Pointer(PointerEvent::Drag(Some(Point::new(x, y))))
    }

    pub fn release(x: f64, y: f64) -> Self {
        HostEvent::Pointer(PointerEvent::Release(Some(Point::new(x, y))))
    }
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Event(HostEvent),
    /// Nothing arrived within the timeout.
    Idle,
    /// The host is gone; no more events will arrive.
    Disconnected,
}

/// Source of host events for [`Session::run`](super::Session::run).
pub trait EventSource {
    /// Wait up to `timeout` for the next event.
    fn poll(&mut self, timeout: Duration) -> Poll;
}

/// Pre-recorded events, replayed without waiting. Disconnects when empty.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEvents {
    queue: VecDeque<HostEvent>,
}

impl ScriptedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn then(mut self, event: HostEvent) -> Self {
        self.queue.push_back(event);
        self
    }

    /// Append a full press-drag-release gesture.
    pub fn gesture(self, from: (f64, f64), to: (f64, f64)) -> Self {
        self.then(HostEvent::press(from.0, from.1))
            .then(HostEvent::drag(to.0, to.1))
            .then(HostEvent::release(to.0, to.1))
    }

    /// Events not yet polled.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl FromIterator<HostEvent> for ScriptedEvents {
    fn from_iter<I: IntoIterator<Item = HostEvent>>(iter: I) -> Self {
        Self {
            queue: iter.into_iter().collect(),
        }
    }
}

impl EventSource for ScriptedEvents {
    fn poll(&mut self, _timeout: Duration) -> Poll {
        match self.queue.pop_front() {
            Some(event) => Poll::Event(event),
            None => Poll::Disconnected,
        }
    }
}

/// Events sent from another thread over a channel.
#[derive(Debug)]
pub struct ChannelEvents {
    receiver: Receiver<HostEvent>,
}

impl ChannelEvents {
    /// Create a connected sender and event source.
    pub fn channel() -> (Sender<HostEvent>, Self) {
        let (sender, receiver) = mpsc::channel();
        (sender, Self { receiver })
    }
}

impl From<Receiver<HostEvent>> for ChannelEvents {
    fn from(receiver: Receiver<HostEvent>) -> Self {
        Self { receiver }
    }
}

impl EventSource for ChannelEvents {
    fn poll(&mut self, timeout: Duration) -> Poll {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Poll::Event(event),
            Err(RecvTimeoutError::Timeout) => Poll::Idle,
            Err(RecvTimeoutError::Disconnected) => Poll::Disconnected,
        }
    }
}
