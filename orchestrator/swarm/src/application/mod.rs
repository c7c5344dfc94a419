// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the swarm coordination use cases.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Registration, routing, messaging, health, load balance, coordination

pub mod coordinator;

pub use coordinator::SwarmCoordinator;

use async_trait::async_trait;
use hivemind_core::domain::decision::DecisionUnit;
use hivemind_core::domain::swarm::SwarmId;
use std::sync::Arc;

use crate::domain::{
    CoordinatedResponse, CoordinationRequest, CoordinationResult, GlobalEmergency,
    InterSwarmMessage, NetworkOptimization, RoutingDecision, SwarmError, SwarmRecord, Task,
};

#[async_trait]
pub trait SwarmService: Send + Sync {
    async fn register_swarm(
        &self,
        id: SwarmId,
        name: &str,
        purpose: &str,
        unit: Arc<dyn DecisionUnit>,
    ) -> Result<SwarmRecord, SwarmError>;

    async fn deregister_swarm(&self, id: &SwarmId) -> Result<SwarmRecord, SwarmError>;

    async fn route_task(&self, task: Task) -> Result<RoutingDecision, SwarmError>;

    /// Enqueue without waiting for delivery
    fn send_message(&self, message: InterSwarmMessage);

    async fn coordinate_swarms(
        &self,
        request: CoordinationRequest,
    ) -> Result<CoordinationResult, SwarmError>;

    async fn handle_global_emergency(
        &self,
        emergency: GlobalEmergency,
    ) -> Result<CoordinatedResponse, SwarmError>;

    async fn optimize_network(&self) -> NetworkOptimization;

    async fn swarm(&self, id: &SwarmId) -> Option<SwarmRecord>;

    /// All swarms in registration order
    async fn swarms(&self) -> Vec<SwarmRecord>;

    fn queue_depth(&self) -> usize;
}
