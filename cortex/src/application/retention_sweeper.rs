// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Retention Sweeper - Background task that enforces the memory retention window
//!
//! Periodically deletes entries older than `retention_hours`. Capacity
//! eviction runs inline on every write; this loop covers the time bound.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Scheduled retention enforcement for swarm memory

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::{MemoryConfig, SwarmMemory};

#[derive(Debug, Clone)]
pub struct RetentionSweeperConfig {
    /// How often to run the sweep (in seconds)
    pub interval_seconds: u64,

    /// Whether sweeping is enabled
    pub enabled: bool,
}

impl Default for RetentionSweeperConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,
            enabled: true,
        }
    }
}

impl From<&MemoryConfig> for RetentionSweeperConfig {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            interval_seconds: config.sweep_interval_seconds,
            enabled: config.sweep_interval_seconds > 0,
        }
    }
}

pub struct RetentionSweeper {
    memory: Arc<dyn SwarmMemory>,
    config: RetentionSweeperConfig,
    shutdown_token: CancellationToken,
}

impl RetentionSweeper {
    pub fn new(memory: Arc<dyn SwarmMemory>, config: RetentionSweeperConfig) -> Self {
        Self {
            memory,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Memory retention sweeper is disabled");
            return;
        }

        info!(
            interval_seconds = self.config.interval_seconds,
            "Starting memory retention sweeper"
        );

        let mut tick = interval(Duration::from_secs(self.config.interval_seconds.max(1)));

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let removed = self.sweep_cycle().await;
                    debug!(removed, "Memory retention sweep completed");
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping memory retention sweeper");
                    break;
                }
            }
        }

        info!("Memory retention sweeper stopped");
    }

    async fn sweep_cycle(&self) -> usize {
        self.memory.sweep_expired().await
    }
}
