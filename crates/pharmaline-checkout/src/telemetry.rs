//! # Tracing Setup
//!
//! `RUST_LOG` wins; otherwise the configured filter applies.
//!
//! ```bash
//! RUST_LOG=info,pharmaline_checkout=debug,sqlx=warn storefront
//! ```

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber. Call once at startup.
pub fn init_tracing(fallback_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
