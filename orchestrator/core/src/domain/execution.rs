// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Decision execution sink
//!
//! The HITL orchestrator applies resolved decisions through a
//! [`DecisionExecutor`]. The swarm coordinator is the production
//! implementation; tests substitute their own.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::hitl::HitlDecisionType;
use super::swarm::{DecisionId, SwarmId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionAuthorization {
    HumanApproved {
        approved_by: String,
        #[serde(default)]
        parameters: Option<serde_json::Value>,
        #[serde(default)]
        overrides: Option<serde_json::Value>,
    },
    Automatic {
        confidence: f64,
    },
}

impl ExecutionAuthorization {
    pub fn is_automatic(&self) -> bool {
        matches!(self, ExecutionAuthorization::Automatic { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub decision_id: DecisionId,
    pub source_decision_id: DecisionId,
    pub swarm_id: SwarmId,
    pub decision_type: HitlDecisionType,
    pub authorization: ExecutionAuthorization,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub decision_id: DecisionId,
    pub swarm_id: SwarmId,
    pub summary: String,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionNotice {
    pub decision_id: DecisionId,
    pub source_decision_id: DecisionId,
    pub swarm_id: SwarmId,
    pub reason: String,
    pub rejected_by: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("Swarm {0} not found")]
    SwarmNotFound(SwarmId),

    #[error("Execution rejected: {0}")]
    Rejected(String),

    #[error("Execution failed: {0}")]
    Failed(String),
}

/// Execution sink interface
#[async_trait]
pub trait DecisionExecutor: Send + Sync {
    async fn execute_decision(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError>;

    async fn notify_rejection(&self, notice: RejectionNotice) -> Result<(), ExecutionError>;
}
