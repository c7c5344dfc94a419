// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured level. Installing twice is a no-op.

use anyhow::{Context, Result};

use crate::domain::config::LoggingConfig;

/// Initialize tracing subscriber for logging
///
/// Returns `Ok(false)` when a global subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.level))
        .context("Failed to create log filter")?;

    let installed = match config.format.as_str() {
        "json" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .try_init()
            .is_ok(),
        "text" => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .try_init()
            .is_ok(),
        other => anyhow::bail!("Unsupported log format '{}'", other),
    };

    Ok(installed)
}
