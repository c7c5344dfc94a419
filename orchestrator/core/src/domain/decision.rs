// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Decision Unit - the per-swarm decision-making collaborator
//!
//! Every registered swarm wraps one [`DecisionUnit`] (the swarm's "queen").
//! The coordinator asks it for strategic decisions, emergency responses and
//! health reports, and listens to its [`DecisionUnitEvent`] stream.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** External collaborator interface and decision value types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use super::hitl::HitlDecisionType;
use super::swarm::{AgentId, DecisionId, HealthReport, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Immediate,
    Hours,
    #[default]
    Days,
    Weeks,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionImpact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_impact: Option<f64>,
    #[serde(default)]
    pub client_facing: bool,
    #[serde(default)]
    pub strategic_impact: bool,
    #[serde(default)]
    pub timeframe: Timeframe,
    #[serde(default)]
    pub stakeholders: Vec<String>,
}

/// Strategic decision produced by a swarm's decision unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub agent_id: AgentId,
    pub topic: String,
    /// Domain category used for pattern detection (e.g. "pricing")
    pub decision_type: String,
    pub options: Vec<String>,
    pub winning_option: String,
    pub confidence: f64,
    /// Share of eligible voters that took part
    pub participation_rate: f64,
    pub legitimate: bool,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub impact: DecisionImpact,
    /// Category the HITL orchestrator files the decision under
    #[serde(default)]
    pub review_category: HitlDecisionType,
    #[serde(default)]
    pub requires_human_judgment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    pub made_at: DateTime<Utc>,
}

impl Decision {
    pub fn new(
        agent_id: impl Into<String>,
        topic: impl Into<String>,
        decision_type: impl Into<String>,
        winning_option: impl Into<String>,
        confidence: f64,
    ) -> Self {
        let winning_option = winning_option.into();
        Self {
            id: DecisionId::new(),
            agent_id: AgentId::new(agent_id),
            topic: topic.into(),
            decision_type: decision_type.into(),
            options: vec![winning_option.clone()],
            winning_option,
            confidence: confidence.clamp(0.0, 1.0),
            participation_rate: 1.0,
            legitimate: true,
            recommendations: Vec::new(),
            impact: DecisionImpact::default(),
            review_category: HitlDecisionType::default(),
            requires_human_judgment: false,
            response_time_ms: None,
            made_at: Utc::now(),
        }
    }

    pub fn with_impact(mut self, impact: DecisionImpact) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_review_category(mut self, category: HitlDecisionType) -> Self {
        self.review_category = category;
        self
    }

    pub fn requiring_human_judgment(mut self) -> Self {
        self.requires_human_judgment = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyResponse {
    pub actions: Vec<String>,
    pub priority: Priority,
    pub summary: String,
    pub confidence: f64,
}

/// Events a decision unit emits on its own initiative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionUnitEvent {
    DecisionMade { decision: Decision },
    EmergencyHandled { response: EmergencyResponse },
    HealthReport { report: HealthReport },
}

#[derive(Debug, Clone, Error)]
pub enum DecisionUnitError {
    #[error("Decision unit unavailable: {0}")]
    Unavailable(String),

    #[error("Decision failed: {0}")]
    Failed(String),
}

/// Decision-making unit interface
#[async_trait]
pub trait DecisionUnit: Send + Sync {
    async fn make_strategic_decision(
        &self,
        topic: &str,
        context: &serde_json::Value,
    ) -> Result<Decision, DecisionUnitError>;

    async fn handle_emergency(
        &self,
        kind: &str,
        severity: Priority,
        context: &serde_json::Value,
    ) -> Result<EmergencyResponse, DecisionUnitError>;

    async fn monitor_swarm_health(&self) -> Result<HealthReport, DecisionUnitError>;

    /// Subscribe to unsolicited decision / emergency / health events
    fn subscribe(&self) -> broadcast::Receiver<DecisionUnitEvent>;
}
