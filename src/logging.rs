/// Diagnostic logging setup.
///
/// Diagnostics go to stderr through `tracing`; command output stays on
/// stdout so it can be piped. `RUST_LOG`, when set, wins over `-v`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Filter directive for a `-v` count: 0 warn, 1 info, 2 debug, 3+ trace.
/// Only this crate is raised past `warn`; dependencies stay quiet.
pub fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => return "warn".to_string(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,watershed_service={},watershed={}", level, level)
}

/// Installs the global subscriber. Calling it twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "warn,watershed_service=info,watershed=info");
        assert_eq!(default_directive(9), "warn,watershed_service=trace,watershed=trace");
    }

    #[test]
    fn test_default_directive_parses() {
        for v in 0..4 {
            assert!(EnvFilter::try_new(default_directive(v)).is_ok());
        }
    }
}
