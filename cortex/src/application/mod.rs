// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the swarm memory application services.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Memory service, retention sweeper, event publication seam

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::MemoryEvent;

pub mod retention_sweeper;
pub mod swarm_memory;

pub use retention_sweeper::{RetentionSweeper, RetentionSweeperConfig};
pub use swarm_memory::{
    MemoryConfig, MemoryError, MemoryHealth, MemoryHealthStatus, MemoryStats, StandardSwarmMemory,
    SwarmMemory,
};

/// Event publisher interface (implemented by the orchestrator's event bus)
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, event: MemoryEvent) -> Result<()>;
}
