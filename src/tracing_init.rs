//! Tracing initialization for tests and binaries
//!
//! Env-filtered subscriber setup. `RUST_LOG` controls the output:
//! `RUST_LOG=rustyfec=debug` for construction diagnostics,
//! `RUST_LOG=rustyfec::ldpc=trace` to watch belief propagation converge.

use once_cell::sync::Lazy;

/// Initialize tracing once for a test process. Safe to call from every
/// test; output is captured per test.
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("rustyfec=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_test_writer()
            .init();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for a binary. Call early in `main`.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rustyfec=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();
}
