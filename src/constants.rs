//! Global constants for roimark

/// Step applied to the upper brightness level per key press
pub const DEFAULT_MAX_LEVEL_STEP: f32 = 0.3;

/// Step applied to the lower brightness level per key press
pub const DEFAULT_MIN_LEVEL_STEP: f32 = 0.2;

/// Interval at which the run loop polls the host for events (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// File name used for markings when none is given
pub const DEFAULT_MARKINGS_FILENAME: &str = "markings.json";
