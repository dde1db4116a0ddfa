//! Log output for hosts and demos

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG`, defaulting to `info`
///
/// Returns false when a global subscriber was already installed.
pub fn init() -> bool {
    init_with_level(Level::INFO)
}

/// Like [`init`] with a different default level
pub fn init_with_level(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_with_level(Level::DEBUG);
        assert!(!init());
    }
}
