use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logs go to stderr so every output format stays machine-readable on
/// stdout. `RUST_LOG` still takes precedence over the verbosity flag.
pub fn init_logging(verbosity: u8) {
    let level = verbosity_level(verbosity);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_verbosity_is_warn() {
        assert_eq!(verbosity_level(0), Level::WARN);
    }

    #[test]
    fn each_flag_raises_the_level() {
        assert_eq!(verbosity_level(1), Level::INFO);
        assert_eq!(verbosity_level(2), Level::DEBUG);
        assert_eq!(verbosity_level(3), Level::TRACE);
        assert_eq!(verbosity_level(10), Level::TRACE);
    }

    #[test]
    fn trace_is_more_verbose_than_warn() {
        assert!(verbosity_level(0) < verbosity_level(3));
    }
}
