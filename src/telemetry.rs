//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "microservice_core=info";

/// Install the global fmt subscriber. `RUST_LOG` wins over `default_directive` when set. Calling this
/// twice is harmless; the second call leaves the first subscriber in place.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_does_not_panic() {
        init_tracing(DEFAULT_DIRECTIVE);
        init_tracing("debug");
    }
}
