//! roimark - Region-of-interest marking sessions
//!
//! Steps through an ordered list of images, turns pointer gestures into box or
//! arrow ROIs, and keeps them in a JSON markings file that later runs resume
//! from. Windowing is left to the host: it feeds [`session::HostEvent`]s in
//! and draws what the [`session::Presenter`] is asked to show.
//!
//! ```rust,ignore
//! use roimark::data::LoaderRegistry;
//! use roimark::session::{ChannelEvents, MarkingsSource, NullPresenter, Session, SessionConfig};
//!
//! let config = SessionConfig::new(images)
//!     .save_to("markings.json")
//!     .markings(MarkingsSource::DefaultLocation);
//! let mut session = Session::new(config, LoaderRegistry::new(), NullPresenter)?;
//!
//! let (sender, mut events) = ChannelEvents::channel();
//! // hand `sender` to the UI thread
//! let markings = session.run(&mut events)?;
//! ```

pub mod brightness;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod format;
pub mod keybindings;
pub mod logging;
pub mod model;
pub mod selection;
pub mod session;

#[cfg(test)]
mod test_utils;

pub use error::{ConfigError, SessionError};
pub use format::{AnnotationMap, FormatError};
pub use model::{Point, Roi, ShapeKind};
pub use session::{Session, SessionConfig};
