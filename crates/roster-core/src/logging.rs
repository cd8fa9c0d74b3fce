#![forbid(unsafe_code)]

//! Logging and tracing support.
//!
//! Roster crates log through the `tracing` macros re-exported here. The
//! library never installs a subscriber on its own; hosts either bring their
//! own or, with the `tracing-json` feature, call [`init_subscriber`].

pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

/// Output format for [`init_subscriber`].
#[cfg(feature = "tracing-json")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Install a global subscriber filtered by `RUST_LOG` (falling back to
/// `default_filter`).
///
/// Returns `false` if a global subscriber was already set.
#[cfg(feature = "tracing-json")]
pub fn init_subscriber(format: LogFormat, default_filter: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
