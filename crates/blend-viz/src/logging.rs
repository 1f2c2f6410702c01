//! Console logging via `tracing`.
//!
//! Records emitted through the `log` facade by `blend-order` are forwarded
//! into the same subscriber.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when the settings leave the level empty.
pub const DEFAULT_FILTER: &str = "info";

/// Builds the filter directive for a configured level. `RUST_LOG` wins over
/// both.
pub fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        DEFAULT_FILTER.to_string()
    } else {
        level.to_string()
    }
}

/// Initialize the global tracing subscriber. Returns `false` if one was
/// already installed.
pub fn init_logging(level: &str) -> bool {
    let filter_str = filter_directive(level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_level_falls_back() {
        assert_eq!(filter_directive(""), DEFAULT_FILTER);
        assert_eq!(filter_directive("  "), DEFAULT_FILTER);
    }

    #[test]
    fn level_is_passed_through() {
        assert_eq!(filter_directive("debug"), "debug");
        assert_eq!(
            filter_directive(" warn,blend_order=trace "),
            "warn,blend_order=trace"
        );
    }

    #[test]
    fn second_init_is_rejected() {
        init_logging("info");
        assert!(!init_logging("debug"));
    }
}
