// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Task routing model
//!
//! A [`Task`] is profiled into a [`TaskProfile`] and scored against every
//! candidate swarm:
//!
//! ```text
//! score = 0.3 × (1 − min(load, 1)) + 0.3 × health_bonus + 0.2 × success_rate + 0.2 × purpose_match
//! load  = current_tasks / 10
//! ```
//!
//! Health bonus is 1 for healthy and 0.5 for degraded swarms; purpose match
//! is 1 for an exact (case-insensitive) match and 0.5 for general-purpose
//! swarms.

use chrono::{DateTime, Utc};
use hivemind_core::domain::swarm::{HealthStatus, Priority, SwarmId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tasks per swarm that count as full load.
pub const LOAD_CAPACITY: f64 = 10.0;

/// Load variance above which rebalancing kicks in.
pub const REBALANCE_SEVERITY_THRESHOLD: f64 = 0.3;

const GENERAL_PURPOSES: [&str; 2] = ["general", "general-purpose"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskComplexity {
    Low,
    Medium,
    High,
}

impl TaskComplexity {
    pub fn estimated_minutes(&self) -> u32 {
        match self {
            TaskComplexity::Low => 5,
            TaskComplexity::Medium => 30,
            TaskComplexity::High => 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub description: String,
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    /// Explicit complexity hint; derived from the task when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<TaskComplexity>,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(task_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_type: task_type.into(),
            description: description.into(),
            required_capabilities: Vec::new(),
            complexity: None,
            payload: serde_json::Value::Null,
            priority: Priority::Medium,
            created_at: Utc::now(),
        }
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    pub fn with_complexity(mut self, complexity: TaskComplexity) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn profile(&self) -> TaskProfile {
        let complexity = self.complexity.unwrap_or_else(|| {
            let payload_size = match &self.payload {
                serde_json::Value::Null => 0,
                other => other.to_string().len(),
            };
            match (self.required_capabilities.len(), payload_size) {
                (caps, size) if caps >= 4 || size > 4096 => TaskComplexity::High,
                (caps, size) if caps >= 2 || size > 1024 => TaskComplexity::Medium,
                _ => TaskComplexity::Low,
            }
        });

        let mut required_capabilities = vec![self.task_type.clone()];
        for capability in &self.required_capabilities {
            if !required_capabilities.contains(capability) {
                required_capabilities.push(capability.clone());
            }
        }

        TaskProfile {
            task_type: self.task_type.clone(),
            complexity,
            required_capabilities,
            estimated_duration_minutes: complexity.estimated_minutes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProfile {
    pub task_type: String,
    pub complexity: TaskComplexity,
    pub required_capabilities: Vec<String>,
    pub estimated_duration_minutes: u32,
}

/// Outcome of a successful `route_task`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub task_id: String,
    pub swarm_id: SwarmId,
    pub score: f64,
    pub profile: TaskProfile,
    pub message_id: String,
}

/// Purpose match weight, or `None` when the swarm cannot take the task type.
pub fn purpose_match(purpose: &str, task_type: &str) -> Option<f64> {
    let purpose = purpose.trim();
    if purpose.eq_ignore_ascii_case(task_type.trim()) {
        Some(1.0)
    } else if GENERAL_PURPOSES
        .iter()
        .any(|general| purpose.eq_ignore_ascii_case(general))
    {
        Some(0.5)
    } else {
        None
    }
}

pub fn load_of(current_tasks: u32) -> f64 {
    current_tasks as f64 / LOAD_CAPACITY
}

pub fn health_bonus(health: HealthStatus) -> f64 {
    match health {
        HealthStatus::Healthy => 1.0,
        HealthStatus::Degraded => 0.5,
        HealthStatus::Critical => 0.0,
    }
}

pub fn route_score(
    current_tasks: u32,
    health: HealthStatus,
    success_rate: f64,
    purpose_match: f64,
) -> f64 {
    0.3 * (1.0 - load_of(current_tasks).min(1.0))
        + 0.3 * health_bonus(health)
        + 0.2 * success_rate
        + 0.2 * purpose_match
}

/// Pick the strictly highest score; the first candidate wins ties.
pub fn select_best<I>(scored: I) -> Option<(SwarmId, f64)>
where
    I: IntoIterator<Item = (SwarmId, f64)>,
{
    let mut best: Option<(SwarmId, f64)> = None;
    for (swarm_id, score) in scored {
        match &best {
            Some((_, best_score)) if score <= *best_score => {}
            _ => best = Some((swarm_id, score)),
        }
    }
    best
}

/// Population variance of the given loads; the rebalancing severity.
pub fn load_variance(loads: &[f64]) -> f64 {
    if loads.is_empty() {
        return 0.0;
    }
    let n = loads.len() as f64;
    let mean = loads.iter().sum::<f64>() / n;
    loads.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n
}
