//! Logger initialisation.

use crate::config::LogLevel;

/// Install `env_logger` at the given level.
///
/// `RUST_LOG`, when set, overrides the level. Returns `false` if a logger was
/// already installed, which leaves that logger in place.
pub fn init(level: LogLevel) -> bool {
    let installed = env_logger::Builder::new()
        .filter_level(level.to_level_filter())
        .parse_default_env()
        .format_timestamp_millis()
        .try_init()
        .is_ok();

    if installed {
        log::debug!("Logging initialised at {}", level.name());
    }
    installed
}
