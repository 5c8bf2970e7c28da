//! Annotation sessions: configuration, the traversal state machine and its
//! host-facing surfaces.

mod config;
mod controller;
mod events;
mod presenter;

#[cfg(test)]
mod tests;

pub use config::{MarkingsSource, SessionConfig};
pub use controller::{Command, Phase, Session, TerminalReason};
pub use events::{ChannelEvents, EventSource, HostEvent, Poll, PointerEvent, ScriptedEvents};
pub use presenter::{NullPresenter, Presenter};
