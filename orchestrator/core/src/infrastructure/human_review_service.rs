// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Human Review Service - in-process review queue for HITL decisions
//!
//! Holds outstanding review requests until a reviewer answers, then forwards
//! the answer as a [`ReviewCompleted`] on the completion channel consumed by
//! the HITL orchestrator. Review deadlines are enforced by the orchestrator.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use crate::domain::hitl::{HitlDecisionType, RiskLevel};
use crate::domain::review::{
    HumanReviewGateway, ReviewAction, ReviewCompleted, ReviewError, ReviewRequest, ReviewResponse,
};
use crate::domain::swarm::{DecisionId, Priority, SwarmId};

/// Human Review Service
pub struct HumanReviewService {
    pending_reviews: Arc<RwLock<HashMap<DecisionId, ReviewRequest>>>,
    completions: mpsc::UnboundedSender<ReviewCompleted>,
}

impl HumanReviewService {
    /// Returns the service and the receiving end of its completion channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReviewCompleted>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            pending_reviews: Arc::new(RwLock::new(HashMap::new())),
            completions: tx,
        };
        (service, rx)
    }

    /// Answer a pending review and forward the completion
    pub async fn submit_response(
        &self,
        decision_id: DecisionId,
        response: ReviewResponse,
    ) -> Result<()> {
        let request = self.pending_reviews.write().await.remove(&decision_id);
        let Some(request) = request else {
            anyhow::bail!("Review for decision {} not found or already completed", decision_id)
        };

        info!(
            decision_id = %decision_id,
            action = ?response.action,
            approved_by = ?response.approved_by,
            escalation_count = request.escalation_count,
            "Human review submitted"
        );

        self.completions
            .send(ReviewCompleted {
                decision_id,
                response,
                completed_at: Utc::now(),
            })
            .map_err(|_| anyhow::anyhow!("Review completion channel closed"))
    }

    pub async fn submit_approval(
        &self,
        decision_id: DecisionId,
        approved_by: impl Into<String>,
    ) -> Result<()> {
        self.submit_response(decision_id, ReviewResponse::approve(approved_by))
            .await
    }

    pub async fn submit_rejection(
        &self,
        decision_id: DecisionId,
        reason: impl Into<String>,
        rejected_by: Option<String>,
    ) -> Result<()> {
        let mut response = ReviewResponse::reject(reason);
        response.approved_by = rejected_by;
        self.submit_response(decision_id, response).await
    }

    /// Pending reviews, most urgent first
    pub async fn list_pending(&self) -> Vec<PendingReviewInfo> {
        let reviews = self.pending_reviews.read().await;
        let mut pending: Vec<_> = reviews.values().map(PendingReviewInfo::from).collect();
        pending.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.requested_at.cmp(&b.requested_at))
        });
        pending
    }

    pub async fn get_pending(&self, decision_id: DecisionId) -> Option<PendingReviewInfo> {
        let reviews = self.pending_reviews.read().await;
        reviews.get(&decision_id).map(PendingReviewInfo::from)
    }

    /// Withdraw a pending review; the orchestrator receives a `cancel` action
    pub async fn cancel_request(&self, decision_id: DecisionId) -> Result<()> {
        if self.pending_reviews.write().await.remove(&decision_id).is_none() {
            anyhow::bail!("Review for decision {} not found", decision_id)
        }

        debug!(decision_id = %decision_id, "Human review request cancelled");

        let mut response = ReviewResponse::new(ReviewAction::Cancel);
        response.reason = Some("review request withdrawn".to_string());
        self.completions
            .send(ReviewCompleted {
                decision_id,
                response,
                completed_at: Utc::now(),
            })
            .map_err(|_| anyhow::anyhow!("Review completion channel closed"))
    }
}

#[async_trait]
impl HumanReviewGateway for HumanReviewService {
    async fn request_review(&self, request: ReviewRequest) -> Result<(), ReviewError> {
        if self.completions.is_closed() {
            return Err(ReviewError::Unavailable(
                "review completion channel closed".to_string(),
            ));
        }

        info!(
            decision_id = %request.decision_id,
            priority = ?request.priority,
            escalation_count = request.escalation_count,
            "Human review requested"
        );

        // A re-request (escalation, modify) replaces the outstanding one.
        self.pending_reviews
            .write()
            .await
            .insert(request.decision_id, request);
        Ok(())
    }

    async fn withdraw(&self, decision_id: DecisionId) {
        if self.pending_reviews.write().await.remove(&decision_id).is_some() {
            debug!(decision_id = %decision_id, "Pending review withdrawn");
        }
    }
}

/// Information about a pending review (for serialization/API)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReviewInfo {
    pub decision_id: DecisionId,
    pub decision_type: HitlDecisionType,
    pub swarm_id: SwarmId,
    pub risk_level: RiskLevel,
    pub priority: Priority,
    pub confidence: f64,
    pub options: Vec<ReviewAction>,
    pub escalation_count: u32,
    pub requested_at: DateTime<Utc>,
}

impl From<&ReviewRequest> for PendingReviewInfo {
    fn from(request: &ReviewRequest) -> Self {
        Self {
            decision_id: request.decision_id,
            decision_type: request.decision_type,
            swarm_id: request.context.swarm_id.clone(),
            risk_level: request.context.risk_level,
            priority: request.priority,
            confidence: request.context.confidence,
            options: request.options.clone(),
            escalation_count: request.escalation_count,
            requested_at: request.requested_at,
        }
    }
}
