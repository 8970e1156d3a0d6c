use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "info";

/// Installs the global fmt subscriber; `RUST_LOG` overrides the default level.
///
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    init_with_default(DEFAULT_DIRECTIVE)
}

pub fn init_with_default(directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
