// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Review Timeout Monitor - Background task resolving stale human reviews
//!
//! Runs the orchestrator's timeout sweep every
//! `timeout_check_interval_seconds` so no decision stays `in_review` past its
//! deadline.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Scheduled HITL timeout enforcement

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::hitl_orchestrator::HitlOrchestrator;

/// Shortest sweep period; `tokio::time::interval` rejects zero.
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(10);

pub struct ReviewTimeoutMonitor {
    orchestrator: Arc<HitlOrchestrator>,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl ReviewTimeoutMonitor {
    pub fn new(orchestrator: Arc<HitlOrchestrator>) -> Self {
        let interval = Duration::from_secs(orchestrator.config().timeout_check_interval_seconds);
        Self {
            orchestrator,
            interval: interval.max(MIN_CHECK_INTERVAL),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_CHECK_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
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
        info!(
            interval_ms = self.interval.as_millis() as u64,
            timeout_minutes = self.orchestrator.config().review_timeout_minutes,
            "Starting HITL review timeout monitor"
        );

        let mut tick = interval(self.interval);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let resolved = self.orchestrator.check_timeouts().await;
                    if !resolved.is_empty() {
                        info!(resolved = resolved.len(), "Timed-out reviews resolved");
                    } else {
                        debug!("No timed-out reviews");
                    }
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received, stopping HITL review timeout monitor");
                    break;
                }
            }
        }

        info!("HITL review timeout monitor stopped");
    }
}
