// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Aggregates
//!
//! Defines the registry record the coordinator keeps per swarm:
//!
//! - [`SwarmRecord`] - aggregate root owned exclusively by the coordinator.
//! - [`SwarmStatus`] / [`SwarmMetrics`] - mutable status and rolling metrics.
//! - [`DecisionTally`] - running counters the metrics are derived from.
//! - [`SwarmError`] - failures surfaced by coordinator operations.

use chrono::{DateTime, Duration, Utc};
use hivemind_core::domain::decision::{Decision, DecisionUnitError};
use hivemind_core::domain::swarm::{AgentId, HealthStatus, SwarmId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwarmState {
    Initializing,
    Active,
    /// Failed over; excluded from routing until it recovers
    Busy,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmStatus {
    pub state: SwarmState,
    pub health: HealthStatus,
    pub last_activity: DateTime<Utc>,
    pub current_tasks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmMetrics {
    /// Decisions made during the trailing hour
    pub decisions_per_hour: f64,
    pub avg_response_time_ms: f64,
    /// Share of decisions reported as legitimate
    pub success_rate: f64,
    pub resource_utilization: f64,
    #[serde(default)]
    pub agent_efficiency: HashMap<AgentId, f64>,
}

impl Default for SwarmMetrics {
    fn default() -> Self {
        Self {
            decisions_per_hour: 0.0,
            avg_response_time_ms: 0.0,
            success_rate: 1.0,
            resource_utilization: 0.0,
            agent_efficiency: HashMap::new(),
        }
    }
}

/// Aggregate root for one registered swarm.
///
/// # Invariants
///
/// - `id` is unique within a coordinator.
/// - Only `Active` swarms whose health is not `Critical` receive routed tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmRecord {
    pub id: SwarmId,
    pub name: String,
    pub purpose: String,
    pub status: SwarmStatus,
    pub metrics: SwarmMetrics,
    pub allocated_resources: u32,
    pub registered_at: DateTime<Utc>,
    /// Set while an automatic failover is in effect
    pub failed_over: bool,
}

impl SwarmRecord {
    pub fn new(id: SwarmId, name: impl Into<String>, purpose: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            purpose: purpose.into(),
            status: SwarmStatus {
                state: SwarmState::Initializing,
                health: HealthStatus::Healthy,
                last_activity: now,
                current_tasks: 0,
            },
            metrics: SwarmMetrics::default(),
            allocated_resources: 0,
            registered_at: now,
            failed_over: false,
        }
    }

    pub fn is_routable(&self) -> bool {
        self.status.state == SwarmState::Active && self.status.health != HealthStatus::Critical
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.status.last_activity {
            self.status.last_activity = now;
        }
    }

    /// Current tasks per allocated resource unit. A swarm with work but no
    /// resources counts as fully utilized.
    pub fn utilization(&self) -> f64 {
        match (self.status.current_tasks, self.allocated_resources) {
            (0, _) => 0.0,
            (_, 0) => 1.0,
            (tasks, resources) => tasks as f64 / resources as f64,
        }
    }

    pub fn refresh_utilization(&mut self) {
        self.metrics.resource_utilization = self.utilization();
    }

    pub fn add_task(&mut self) {
        self.status.current_tasks += 1;
        self.refresh_utilization();
    }

    pub fn finish_task(&mut self) {
        self.status.current_tasks = self.status.current_tasks.saturating_sub(1);
        self.refresh_utilization();
    }
}

/// Running decision counters behind [`SwarmMetrics`].
#[derive(Debug, Clone, Default)]
pub struct DecisionTally {
    recent: VecDeque<DateTime<Utc>>,
    total: u64,
    legitimate: u64,
    response_total_ms: u64,
    response_samples: u64,
}

impl DecisionTally {
    pub fn record(&mut self, decision: &Decision, now: DateTime<Utc>) {
        self.total += 1;
        if decision.legitimate {
            self.legitimate += 1;
        }
        if let Some(ms) = decision.response_time_ms {
            self.response_total_ms += ms;
            self.response_samples += 1;
        }
        self.recent.push_back(decision.made_at.min(now));
        self.prune(now);
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let horizon = now - Duration::hours(1);
        self.recent.retain(|at| *at >= horizon);
    }

    pub fn apply(&mut self, metrics: &mut SwarmMetrics, now: DateTime<Utc>) {
        self.prune(now);
        metrics.decisions_per_hour = self.recent.len() as f64;
        if self.total > 0 {
            metrics.success_rate = self.legitimate as f64 / self.total as f64;
        }
        if self.response_samples > 0 {
            metrics.avg_response_time_ms =
                self.response_total_ms as f64 / self.response_samples as f64;
        }
    }
}

#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("Swarm {0} is already registered")]
    AlreadyRegistered(SwarmId),

    #[error("Swarm {0} not found")]
    NotFound(SwarmId),

    #[error("No capable swarm for task type '{task_type}'")]
    NoCapableSwarm { task_type: String },

    #[error("No healthy swarm available")]
    NoHealthySwarm,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Decision unit of swarm {swarm_id} failed: {source}")]
    DecisionUnit {
        swarm_id: SwarmId,
        #[source]
        source: DecisionUnitError,
    },

    #[error("Decision unit of swarm {0} timed out")]
    Timeout(SwarmId),

    #[error("Coordination failed: {0}")]
    CoordinationFailed(String),
}
