// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::hitl::{DecisionStatus, GatingPath, RiskLevel};
use crate::domain::learning::ThresholdRecommendation;
use crate::domain::swarm::{DecisionId, HealthStatus, Priority, SwarmId};

/// Swarm coordination events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SwarmEvent {
    SwarmRegistered {
        swarm_id: SwarmId,
        name: String,
        purpose: String,
        allocated_resources: u32,
        registered_at: DateTime<Utc>,
    },
    SwarmDeregistered {
        swarm_id: SwarmId,
        dropped_messages: usize,
        deregistered_at: DateTime<Utc>,
    },
    TaskRouted {
        task_id: String,
        swarm_id: SwarmId,
        score: f64,
        routed_at: DateTime<Utc>,
    },
    MessageFailed {
        message_id: String,
        from: SwarmId,
        to: Option<SwarmId>,
        error: String,
        failed_at: DateTime<Utc>,
    },
    DecisionRecorded {
        swarm_id: SwarmId,
        decision_id: DecisionId,
        requires_human_judgment: bool,
        recorded_at: DateTime<Utc>,
    },
    EmergencyHandled {
        swarm_id: SwarmId,
        priority: Priority,
        summary: String,
        handled_at: DateTime<Utc>,
    },
    HealthChecked {
        swarm_id: SwarmId,
        status: HealthStatus,
        score: f64,
        checked_at: DateTime<Utc>,
    },
    HealthCheckFailed {
        swarm_id: SwarmId,
        error: String,
        failed_at: DateTime<Utc>,
    },
    FailoverTriggered {
        swarm_id: SwarmId,
        status: HealthStatus,
        redistributed_tasks: usize,
        triggered_at: DateTime<Utc>,
    },
    SwarmRecovered {
        swarm_id: SwarmId,
        recovered_at: DateTime<Utc>,
    },
    LoadRebalanced {
        severity: f64,
        from: SwarmId,
        to: SwarmId,
        moved_tasks: usize,
        rebalanced_at: DateTime<Utc>,
    },
    CoordinationCompleted {
        coordination_id: String,
        coordination_type: String,
        initiator: SwarmId,
        participants: Vec<SwarmId>,
        completed_at: DateTime<Utc>,
    },
    GlobalEmergencyHandled {
        emergency_id: String,
        responders: Vec<SwarmId>,
        failed: Vec<SwarmId>,
        action_count: usize,
        handled_at: DateTime<Utc>,
    },
    NetworkOptimized {
        bottlenecks: usize,
        applied: usize,
        advisory: usize,
        optimized_at: DateTime<Utc>,
    },
    DecisionExecuted {
        decision_id: DecisionId,
        swarm_id: SwarmId,
        automatic: bool,
        executed_at: DateTime<Utc>,
    },
    DecisionRejected {
        decision_id: DecisionId,
        swarm_id: SwarmId,
        reason: String,
        rejected_at: DateTime<Utc>,
    },
}

/// HITL decision lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HitlEvent {
    DecisionCreated {
        decision_id: DecisionId,
        swarm_id: SwarmId,
        risk_level: RiskLevel,
        priority: Priority,
        gating_path: GatingPath,
        created_at: DateTime<Utc>,
    },
    ReviewRequested {
        decision_id: DecisionId,
        priority: Priority,
        escalation_count: u32,
        requested_at: DateTime<Utc>,
    },
    DecisionAutoExecuted {
        decision_id: DecisionId,
        confidence: f64,
        executed_at: DateTime<Utc>,
    },
    AutoExecutionFailed {
        decision_id: DecisionId,
        error: String,
        failed_at: DateTime<Utc>,
    },
    DecisionApproved {
        decision_id: DecisionId,
        approved_by: Option<String>,
        approved_at: DateTime<Utc>,
    },
    DecisionExecuted {
        decision_id: DecisionId,
        executed_at: DateTime<Utc>,
    },
    DecisionRejected {
        decision_id: DecisionId,
        reason: String,
        rejected_at: DateTime<Utc>,
    },
    DecisionModified {
        decision_id: DecisionId,
        risk_level: RiskLevel,
        priority: Priority,
        modified_at: DateTime<Utc>,
    },
    DecisionEscalated {
        decision_id: DecisionId,
        escalation_count: u32,
        reason: String,
        escalated_at: DateTime<Utc>,
    },
    DecisionCancelled {
        decision_id: DecisionId,
        reason: String,
        cancelled_at: DateTime<Utc>,
    },
    ExecutionFailed {
        decision_id: DecisionId,
        error: String,
        failed_at: DateTime<Utc>,
    },
    ReviewTimedOut {
        decision_id: DecisionId,
        waited_minutes: i64,
        resolved_as: DecisionStatus,
        timed_out_at: DateTime<Utc>,
    },
    ThresholdRecommended {
        recommendation: ThresholdRecommendation,
    },
}
