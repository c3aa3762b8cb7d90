//! Logging setup for standalone embeddings
//!
//! Library code only emits `tracing` events. Hosts that already install a
//! subscriber should not call [`init`].
//!
//! # Usage
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=word_highlight::registry=debug` - overlay application only
//! - `RUST_LOG=word_highlight::scheduler=debug` - rescan timing
//!
//! # Log Files
//!
//! Logs are written to `~/.config/word-highlight/logs/word-highlight.log` with
//! daily rotation at debug level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE: &str = "word-highlight.log";

/// Install console and file logging
///
/// Returns `false` without touching the file system if a global subscriber
/// was already set.
pub fn init() -> bool {
    if ::tracing::dispatcher::has_been_set() {
        return false;
    }

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_filter(console_filter);

    let logs_dir = crate::config_paths::ensure_logs_dir();
    let file_layer = logs_dir.as_ref().ok().map(|logs_dir| {
        let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE);
        fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .with_filter(EnvFilter::new("debug"))
    });

    let installed = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if let (true, Err(e)) = (installed, &logs_dir) {
        ::tracing::warn!("File logging disabled: {}", e);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_defers_to_existing_subscriber() {
        // Either this installs the global subscriber or another one already did
        let _ = tracing_subscriber::registry().try_init();
        assert!(::tracing::dispatcher::has_been_set());
        assert!(!init());
    }
}
