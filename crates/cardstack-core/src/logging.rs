#![forbid(unsafe_code)]

//! Subscriber bootstrap for hosts and demos.
//!
//! Library code only emits `tracing` events under the `cardstack.*` targets:
//!
//! | Target              | Emitted by                                  |
//! |---------------------|---------------------------------------------|
//! | `cardstack.queue`   | navigation queue dispatch, stall watchdog   |
//! | `cardstack.gesture` | pan recognizer and drag-to-pop controller   |
//! | `cardstack.loader`  | paginated loading                           |
//! | `cardstack.card`    | card snapshot refresh and layout moves      |
//! | `cardstack.stack`   | group push/pop, history, root actions       |
//!
//! Installing a subscriber is the host's choice. [`try_init`] installs a
//! compact `fmt` subscriber (or JSON lines with the `tracing-json` feature)
//! filtered by `CARDSTACK_LOG`, falling back to `RUST_LOG`, then `info`.
//!
//! ```bash
//! CARDSTACK_LOG=cardstack.queue=debug,info ./host
//! ```

use tracing_subscriber::EnvFilter;

/// Environment variable checked before `RUST_LOG`.
pub const ENV_VAR: &str = "CARDSTACK_LOG";

/// Default directive when neither variable is set.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Failure to install the global subscriber.
#[derive(Debug, thiserror::Error)]
#[error("failed to install tracing subscriber: {0}")]
pub struct InitError(String);

/// Build the filter from `CARDSTACK_LOG`, `RUST_LOG`, or the default.
///
/// Malformed directives fall back to the default instead of failing.
#[must_use]
pub fn env_filter() -> EnvFilter {
    let directives = std::env::var(ENV_VAR)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| DEFAULT_DIRECTIVE.to_owned());
    filter_from(&directives)
}

fn filter_from(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber.
///
/// Returns an error if a global subscriber is already set.
pub fn try_init() -> Result<(), InitError> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter());

    #[cfg(feature = "tracing-json")]
    let result = builder.json().with_current_span(false).try_init();
    #[cfg(not(feature = "tracing-json"))]
    let result = builder.compact().with_target(true).try_init();

    result.map_err(|e| InitError(e.to_string()))
}

/// Install the global subscriber, ignoring "already installed".
pub fn init() {
    if let Err(err) = try_init() {
        tracing::debug!(target: "cardstack.stack", %err, "subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_directive_falls_back() {
        let filter = filter_from("cardstack.queue=notalevel[");
        assert_eq!(filter.to_string(), DEFAULT_DIRECTIVE);
    }

    #[test]
    fn target_directive_is_kept() {
        let filter = filter_from("cardstack.queue=debug");
        assert!(filter.to_string().contains("cardstack.queue=debug"));
    }

    #[test]
    fn second_install_reports_error() {
        init();
        let err = try_init().expect_err("subscriber already installed");
        assert!(err.to_string().starts_with("failed to install tracing subscriber: "));
    }
}
