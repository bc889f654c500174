// SPDX-FileCopyrightText: 2025 Asset Pipeline Maintainers
// SPDX-License-Identifier: MIT

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install a stderr subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_logger(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries command output, so logs go to stderr
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .without_time(),
        )
        .with(filter)
        .try_init();
}
