// guardstream/src/logger.rs
//! Logger setup for the guardstream binary.
//!
//! `--quiet` turns logging off, `--debug` forces debug level, otherwise `RUST_LOG`
//! applies with `warn` as the fallback. Logs always go to stderr.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.target(Target::Stderr).format_timestamp(None);
    // A second init (e.g. from tests) is harmless.
    let _ = builder.try_init();
}

/// Maps the global flags to an explicit level, or `None` to defer to `RUST_LOG`.
pub fn level_from_flags(quiet: bool, debug: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Off)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_wins_over_debug() {
        assert_eq!(level_from_flags(true, true), Some(LevelFilter::Off));
        assert_eq!(level_from_flags(false, true), Some(LevelFilter::Debug));
        assert_eq!(level_from_flags(false, false), None);
    }
}
