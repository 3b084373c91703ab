use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt,
};

/// Install the global fmt subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Returns false when a subscriber was already installed, so hosts and tests
/// can call this more than once.
pub fn setup_logging() -> bool {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    fmt()
        .with_env_filter(env_filter)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_is_idempotent() {
        setup_logging();
        assert!(!setup_logging());
    }
}
