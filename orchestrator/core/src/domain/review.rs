// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Human review interface
//!
//! The orchestrator calls [`HumanReviewGateway::request_review`] and later
//! receives a [`ReviewCompleted`] carrying the reviewer's action. Decisions
//! resolved any other way are withdrawn through [`HumanReviewGateway::withdraw`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::decision::Timeframe;
use super::hitl::{HitlContext, HitlDecisionType};
use super::swarm::{DecisionId, Priority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    Modify,
    Escalate,
    Cancel,
    /// Any action string this build does not understand; handled as escalate
    #[serde(other)]
    Unrecognized,
}

/// Context changes a reviewer may request with a `modify` action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionModifications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financial_impact: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_facing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategic_impact: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakeholders: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub action: ReviewAction,
    #[serde(default)]
    pub approved_by: Option<String>,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
    #[serde(default)]
    pub overrides: Option<serde_json::Value>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub modifications: Option<DecisionModifications>,
}

impl ReviewResponse {
    pub fn new(action: ReviewAction) -> Self {
        Self {
            action,
            approved_by: None,
            parameters: None,
            overrides: None,
            reason: None,
            modifications: None,
        }
    }

    pub fn approve(approved_by: impl Into<String>) -> Self {
        Self {
            approved_by: Some(approved_by.into()),
            ..Self::new(ReviewAction::Approve)
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::new(ReviewAction::Reject)
        }
    }

    pub fn modify(modifications: DecisionModifications) -> Self {
        Self {
            modifications: Some(modifications),
            ..Self::new(ReviewAction::Modify)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub decision_id: DecisionId,
    pub decision_type: HitlDecisionType,
    pub context: HitlContext,
    pub priority: Priority,
    pub options: Vec<ReviewAction>,
    pub escalation_count: u32,
    pub requested_at: DateTime<Utc>,
}

/// Completion notice for one review request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCompleted {
    pub decision_id: DecisionId,
    pub response: ReviewResponse,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
pub enum ReviewError {
    #[error("Review channel unavailable: {0}")]
    Unavailable(String),

    #[error("No pending review for decision {0}")]
    NotFound(DecisionId),
}

/// Human review interface
#[async_trait]
pub trait HumanReviewGateway: Send + Sync {
    async fn request_review(&self, request: ReviewRequest) -> Result<(), ReviewError>;

    /// Drop any outstanding request for a decision that no longer awaits review.
    async fn withdraw(&self, _decision_id: DecisionId) {}
}
