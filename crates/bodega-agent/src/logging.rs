// SPDX-FileCopyrightText: 2026 Bodega Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup for embedders.

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to
/// `bodega` targets and everything else logs at `warn`. Call once at
/// startup, before the first turn is processed.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bodega={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
