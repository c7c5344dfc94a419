// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HITL Decision - state machine entity gating autonomous decisions
//!
//! A [`HitlDecision`] is created for every swarm decision that asks for human
//! judgment. It is scored for risk and urgency, then takes exactly one
//! initial [`GatingPath`]: automatic execution, human review, or escalation.
//!
//! ```text
//! pending ──► in_review ──► approved ──► executed*
//!    │            │    └──► rejected*         └──► failed*
//!    │            ├──► cancelled*
//!    │            ├──► executed*   (timeout or modify → auto-eligible)
//!    │            └──► escalated ──► in_review (priority critical)
//!    ├──► executed*  (auto path)
//!    └──► escalated
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::decision::Timeframe;
use super::swarm::{AgentId, DecisionId, Priority, SwarmId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HitlDecisionType {
    Strategic,
    #[default]
    Approval,
    Validation,
    Override,
    Escalation,
}

impl HitlDecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HitlDecisionType::Strategic => "strategic",
            HitlDecisionType::Approval => "approval",
            HitlDecisionType::Validation => "validation",
            HitlDecisionType::Override => "override",
            HitlDecisionType::Escalation => "escalation",
        }
    }
}

impl fmt::Display for HitlDecisionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 6 => RiskLevel::Critical,
            s if s >= 4 => RiskLevel::High,
            s if s >= 2 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
    Cancelled,
    Executed,
    Escalated,
    /// Execution errored after human approval
    Failed,
}

impl DecisionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DecisionStatus::Rejected
                | DecisionStatus::Cancelled
                | DecisionStatus::Executed
                | DecisionStatus::Failed
        )
    }

    pub fn can_transition_to(&self, next: DecisionStatus) -> bool {
        use DecisionStatus::*;
        matches!(
            (self, next),
            (Pending, InReview)
                | (Pending, Executed)
                | (Pending, Escalated)
                | (InReview, InReview)
                | (InReview, Approved)
                | (InReview, Rejected)
                | (InReview, Cancelled)
                | (InReview, Executed)
                | (InReview, Escalated)
                | (Escalated, InReview)
                | (Escalated, Cancelled)
                | (Approved, Executed)
                | (Approved, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionStatus::Pending => "pending",
            DecisionStatus::InReview => "in_review",
            DecisionStatus::Approved => "approved",
            DecisionStatus::Rejected => "rejected",
            DecisionStatus::Cancelled => "cancelled",
            DecisionStatus::Executed => "executed",
            DecisionStatus::Escalated => "escalated",
            DecisionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single initial route a decision takes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingPath {
    AutoExecute,
    HumanReview,
    Escalate,
}

impl GatingPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatingPath::AutoExecute => "auto_execute",
            GatingPath::HumanReview => "human_review",
            GatingPath::Escalate => "escalate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitlContext {
    pub swarm_id: SwarmId,
    pub agent_id: AgentId,
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub financial_impact: Option<f64>,
    pub timeframe: Timeframe,
    pub stakeholders: Vec<String>,
    pub client_facing: bool,
    pub strategic_impact: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitlMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub source_decision_id: DecisionId,
}

/// Who or what closed the decision, and with which parameters.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_by: Option<String>,
    pub reason: Option<String>,
    pub parameters: Option<serde_json::Value>,
    pub overrides: Option<serde_json::Value>,
    pub execution_summary: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Thresholds that drive the gating evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatingPolicy {
    pub auto_approval_threshold: f64,
    pub financial_impact_threshold: f64,
    pub enable_auto_execution: bool,
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self {
            auto_approval_threshold: 0.8,
            financial_impact_threshold: 10_000.0,
            enable_auto_execution: true,
        }
    }
}

/// Point-scored risk rubric.
///
/// Financial impact >100k +3, >50k +2, >10k +1; confidence <0.5 +3, <0.7 +2,
/// <0.8 +1; client-facing +2; strategic impact +2.
pub fn assess_risk(context: &HitlContext) -> RiskLevel {
    let mut score = 0;

    match context.financial_impact {
        Some(f) if f > 100_000.0 => score += 3,
        Some(f) if f > 50_000.0 => score += 2,
        Some(f) if f > 10_000.0 => score += 1,
        _ => {}
    }

    if context.confidence < 0.5 {
        score += 3;
    } else if context.confidence < 0.7 {
        score += 2;
    } else if context.confidence < 0.8 {
        score += 1;
    }

    if context.client_facing {
        score += 2;
    }
    if context.strategic_impact {
        score += 2;
    }

    RiskLevel::from_score(score)
}

/// Urgency rubric.
///
/// Timeframe immediate +3, hours +2, days +1; client-facing +2; financial
/// impact >50k +2, >10k +1; confidence <0.5 +2, <0.7 +1.
pub fn assess_priority(context: &HitlContext) -> Priority {
    let mut score = match context.timeframe {
        Timeframe::Immediate => 3,
        Timeframe::Hours => 2,
        Timeframe::Days => 1,
        Timeframe::Weeks => 0,
    };

    if context.client_facing {
        score += 2;
    }

    match context.financial_impact {
        Some(f) if f > 50_000.0 => score += 2,
        Some(f) if f > 10_000.0 => score += 1,
        _ => {}
    }

    if context.confidence < 0.5 {
        score += 2;
    } else if context.confidence < 0.7 {
        score += 1;
    }

    Priority::from_score(score)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitlDecision {
    pub id: DecisionId,
    pub decision_type: HitlDecisionType,
    pub context: HitlContext,
    pub metadata: HitlMetadata,
    pub human_review_required: bool,
    pub auto_execution_allowed: bool,
    pub status: DecisionStatus,
    pub gating_path: Option<GatingPath>,
    pub review_requested_at: Option<DateTime<Utc>>,
    pub escalation_count: u32,
    /// Incremented on every status change
    pub revision: u32,
    pub resolution: Option<Resolution>,
}

impl HitlDecision {
    pub fn new(
        decision_type: HitlDecisionType,
        mut context: HitlContext,
        source_decision_id: DecisionId,
        tags: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        context.confidence = context.confidence.clamp(0.0, 1.0);
        context.risk_level = assess_risk(&context);
        let priority = assess_priority(&context);

        Self {
            id: DecisionId::new(),
            decision_type,
            context,
            metadata: HitlMetadata {
                created_at: now,
                updated_at: now,
                priority,
                tags,
                source_decision_id,
            },
            human_review_required: false,
            auto_execution_allowed: false,
            status: DecisionStatus::Pending,
            gating_path: None,
            review_requested_at: None,
            escalation_count: 0,
            revision: 0,
            resolution: None,
        }
    }

    pub fn is_strategic(&self) -> bool {
        self.decision_type == HitlDecisionType::Strategic || self.context.strategic_impact
    }

    /// Recompute `human_review_required` / `auto_execution_allowed` and
    /// return the path they imply.
    pub fn evaluate_gating(&mut self, policy: &GatingPolicy) -> GatingPath {
        let over_ceiling = self
            .context
            .financial_impact
            .is_some_and(|f| f > policy.financial_impact_threshold);

        self.human_review_required = self.context.confidence < policy.auto_approval_threshold
            || over_ceiling
            || self.context.risk_level == RiskLevel::Critical
            || self.is_strategic()
            || self.context.client_facing;

        self.auto_execution_allowed = !self.human_review_required
            && self.context.risk_level <= RiskLevel::Medium
            && policy.enable_auto_execution;

        if self.auto_execution_allowed {
            GatingPath::AutoExecute
        } else if self.human_review_required {
            GatingPath::HumanReview
        } else {
            GatingPath::Escalate
        }
    }

    /// Re-score risk and priority after a context change.
    pub fn reassess(&mut self) {
        self.context.confidence = self.context.confidence.clamp(0.0, 1.0);
        self.context.risk_level = assess_risk(&self.context);
        self.metadata.priority = assess_priority(&self.context);
    }

    pub fn transition(
        &mut self,
        next: DecisionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.metadata.updated_at = now;
        self.revision += 1;
        Ok(())
    }

    pub fn add_tag(&mut self, tag: &str) {
        if !self.metadata.tags.iter().any(|t| t == tag) {
            self.metadata.tags.push(tag.to_string());
        }
    }

    /// Time spent waiting on the current review request.
    pub fn review_age(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.review_requested_at.map(|at| now - at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid decision transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: DecisionStatus,
    pub to: DecisionStatus,
}
