//! Global subscriber setup for the `pigpen` binary.
//!
//! Logs always go to stderr: `plan` and `scan` print their results on stdout.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset: PigPenOS crates at `level`,
/// dependencies (reqwest, hyper, rustls) at `warn`.
fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,pigpen_core={level},pigpen={level}")
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let base = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let layer = if json {
        base.json().with_filter(filter).boxed()
    } else {
        base.with_filter(filter).boxed()
    };

    tracing_subscriber::registry().with(layer).try_init().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_quiet_dependencies() {
        assert_eq!(
            default_directives(Level::DEBUG),
            "warn,pigpen_core=debug,pigpen=debug"
        );
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
    }
}
