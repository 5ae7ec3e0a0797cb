//! Logger setup for the binary and for tests that want to see diagnostics.

use std::sync::Once;

use env_logger::WriteStyle;
use log::LevelFilter;

/// How the global logger is built.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// `env_logger` filter directives, e.g. `"debug"` or
    /// `"hello_triangle=trace"`. Falls back to `RUST_LOG`, then `info`.
    pub filter: Option<String>,
    pub write_style: WriteStyle,
    /// Route output through the test harness capture instead of stderr.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { filter: None, write_style: WriteStyle::Auto, is_test: false }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match config.filter.or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(LevelFilter::Info);
            }
        }
        builder.write_style(config.write_style).is_test(config.is_test);

        // Another logger may already be installed by an embedding program.
        if builder.try_init().is_err() {
            log::debug!("a global logger was already installed");
            return;
        }
        log::debug!("logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_logger_is_left_in_place() {
        crate::test_log::install();
        let config = LoggingConfig { filter: Some("warn".to_string()), is_test: true, ..Default::default() };
        init_logging(config.clone());
        init_logging(config);
        log::warn!("logging still works");
        assert!(crate::test_log::logged(log::Level::Warn, "logging still works"));
    }
}
