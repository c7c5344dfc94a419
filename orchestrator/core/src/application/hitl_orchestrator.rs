// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # HitlOrchestrator - Risk-Gated Human-in-the-Loop Decisions
//!
//! Intercepts swarm decisions that ask for human judgment, scores them, and
//! sends each down exactly one initial path:
//!
//! - **auto execute** - confident, cheap, low/medium risk, not strategic or
//!   client-facing. A failed automatic execution falls back to review.
//! - **human review** - anything tripping a review trigger.
//! - **escalate** - neither of the above (e.g. automatic execution disabled).
//!
//! Reviews that sit past `review_timeout_minutes` are either executed (low
//! risk and auto-eligible) or escalated with critical priority. Escalations
//! are bounded by `max_escalations`, after which the decision is cancelled.
//!
//! Every status change is written to swarm memory as a `HitlDecision` entry
//! (`hitl-<id>-<revision>`), giving an append-only audit trail. Only
//! unresolved decisions stay in the registry: a terminal decision is withdrawn
//! from the review gateway and dropped, and later lookups read its latest
//! audited revision.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hivemind_cortex::{EntryId, EntryType, MemoryEntry, MemoryQuery, SwarmMemory};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::learning::LearningTracker;
use crate::domain::config::HitlConfig;
use crate::domain::decision::Decision;
use crate::domain::events::HitlEvent;
use crate::domain::execution::{
    DecisionExecutor, ExecutionAuthorization, ExecutionRequest, RejectionNotice,
};
use crate::domain::hitl::{
    DecisionStatus, GatingPath, HitlContext, HitlDecision, InvalidTransition, Resolution, RiskLevel,
};
use crate::domain::learning::{
    HumanVerdict, LearningKey, LearningPattern, LearningSample, ThresholdRecommendation,
};
use crate::domain::review::{
    DecisionModifications, HumanReviewGateway, ReviewAction, ReviewCompleted, ReviewRequest,
};
use crate::domain::swarm::{DecisionId, Priority, SwarmId};
use crate::infrastructure::event_bus::EventBus;

/// A swarm decision handed over for human judgment.
#[derive(Debug, Clone)]
pub struct HitlSubmission {
    pub swarm_id: SwarmId,
    pub decision: Decision,
}

#[derive(Debug, Error)]
pub enum HitlError {
    #[error("HITL decision {0} not found")]
    NotFound(DecisionId),

    #[error("HITL decision {decision_id} is {status}, not awaiting review")]
    InvalidState {
        decision_id: DecisionId,
        status: DecisionStatus,
    },

    #[error(transparent)]
    Transition(#[from] InvalidTransition),
}

/// Result of one timed-out review.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeoutOutcome {
    pub decision_id: DecisionId,
    pub status: DecisionStatus,
}

pub struct HitlOrchestrator {
    config: HitlConfig,
    decisions: DashMap<DecisionId, Arc<Mutex<HitlDecision>>>,
    learning: LearningTracker,
    memory: Arc<dyn SwarmMemory>,
    executor: Arc<dyn DecisionExecutor>,
    review_gateway: Arc<dyn HumanReviewGateway>,
    event_bus: EventBus,
    shutdown_token: CancellationToken,
}

impl HitlOrchestrator {
    pub fn new(
        config: HitlConfig,
        memory: Arc<dyn SwarmMemory>,
        executor: Arc<dyn DecisionExecutor>,
        review_gateway: Arc<dyn HumanReviewGateway>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            config,
            decisions: DashMap::new(),
            learning: LearningTracker::new(),
            memory,
            executor,
            review_gateway,
            event_bus,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &HitlConfig {
        &self.config
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Create a HITL decision and run its initial gating path.
    pub async fn submit(&self, submission: HitlSubmission) -> Result<HitlDecision, HitlError> {
        let HitlSubmission { swarm_id, decision } = submission;
        let context = HitlContext {
            swarm_id: swarm_id.clone(),
            agent_id: decision.agent_id.clone(),
            confidence: decision.confidence,
            recommendations: decision.recommendations.clone(),
            risk_level: RiskLevel::Low,
            financial_impact: decision.impact.financial_impact,
            timeframe: decision.impact.timeframe,
            stakeholders: decision.impact.stakeholders.clone(),
            client_facing: decision.impact.client_facing,
            strategic_impact: decision.impact.strategic_impact,
        };
        let tags = vec![decision.decision_type.clone(), format!("swarm:{}", swarm_id)];

        let mut hitl = HitlDecision::new(decision.review_category, context, decision.id, tags);
        let path = hitl.evaluate_gating(&self.config.gating_policy());
        hitl.gating_path = Some(path);

        info!(
            decision_id = %hitl.id,
            swarm_id = %swarm_id,
            risk_level = %hitl.context.risk_level,
            priority = ?hitl.metadata.priority,
            path = path.as_str(),
            "HITL decision created"
        );
        metrics::counter!("hivemind_hitl_decisions_total", "path" => path.as_str()).increment(1);

        self.audit(&hitl).await;
        self.event_bus.publish_hitl_event(HitlEvent::DecisionCreated {
            decision_id: hitl.id,
            swarm_id,
            risk_level: hitl.context.risk_level,
            priority: hitl.metadata.priority,
            gating_path: path,
            created_at: hitl.metadata.created_at,
        });

        let decision_id = hitl.id;
        let slot = Arc::new(Mutex::new(hitl));
        self.decisions.insert(decision_id, slot.clone());

        let mut hitl = slot.lock().await;
        match path {
            GatingPath::AutoExecute => self.auto_execute(&mut hitl).await?,
            GatingPath::HumanReview => self.request_review(&mut hitl).await?,
            GatingPath::Escalate => {
                self.escalate(&mut hitl, "not eligible for automatic execution")
                    .await?
            }
        }
        self.retire(&hitl).await;
        Ok(hitl.clone())
    }

    /// Apply a reviewer's answer to a decision awaiting review.
    pub async fn handle_review_completed(
        &self,
        completed: ReviewCompleted,
    ) -> Result<DecisionStatus, HitlError> {
        let Some(slot) = self.live(completed.decision_id) else {
            return Err(match self.audited(completed.decision_id).await {
                Some(resolved) => HitlError::InvalidState {
                    decision_id: resolved.id,
                    status: resolved.status,
                },
                None => HitlError::NotFound(completed.decision_id),
            });
        };
        let mut hitl = slot.lock().await;

        if hitl.status != DecisionStatus::InReview {
            return Err(HitlError::InvalidState {
                decision_id: hitl.id,
                status: hitl.status,
            });
        }

        let response = completed.response;
        let now = completed.completed_at;
        debug!(decision_id = %hitl.id, action = ?response.action, "Review completed");

        match response.action {
            ReviewAction::Approve => {
                let approved_by = response
                    .approved_by
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                hitl.transition(DecisionStatus::Approved, now)?;
                hitl.resolution = Some(Resolution {
                    resolved_by: Some(approved_by.clone()),
                    reason: response.reason.clone(),
                    parameters: response.parameters.clone(),
                    overrides: response.overrides.clone(),
                    execution_summary: None,
                    resolved_at: Some(now),
                });
                self.audit(&hitl).await;
                self.event_bus.publish_hitl_event(HitlEvent::DecisionApproved {
                    decision_id: hitl.id,
                    approved_by: Some(approved_by.clone()),
                    approved_at: now,
                });

                let authorization = ExecutionAuthorization::HumanApproved {
                    approved_by,
                    parameters: response.parameters,
                    overrides: response.overrides,
                };
                match self.executor.execute_decision(self.execution_request(&hitl, authorization)).await {
                    Ok(result) => {
                        hitl.transition(DecisionStatus::Executed, Utc::now())?;
                        if let Some(resolution) = hitl.resolution.as_mut() {
                            resolution.execution_summary = Some(result.summary);
                        }
                        info!(decision_id = %hitl.id, "Approved decision executed");
                        self.event_bus.publish_hitl_event(HitlEvent::DecisionExecuted {
                            decision_id: hitl.id,
                            executed_at: result.executed_at,
                        });
                    }
                    Err(e) => {
                        hitl.transition(DecisionStatus::Failed, Utc::now())?;
                        warn!(decision_id = %hitl.id, "Approved decision failed to execute: {}", e);
                        self.event_bus.publish_hitl_event(HitlEvent::ExecutionFailed {
                            decision_id: hitl.id,
                            error: e.to_string(),
                            failed_at: Utc::now(),
                        });
                    }
                }
                self.audit(&hitl).await;
                self.learn(&hitl, HumanVerdict::Approved);
            }
            ReviewAction::Reject => {
                let reason = response
                    .reason
                    .clone()
                    .unwrap_or_else(|| "no reason given".to_string());
                hitl.transition(DecisionStatus::Rejected, now)?;
                hitl.resolution = Some(Resolution {
                    resolved_by: response.approved_by.clone(),
                    reason: Some(reason.clone()),
                    resolved_at: Some(now),
                    ..Resolution::default()
                });
                self.audit(&hitl).await;

                let notice = RejectionNotice {
                    decision_id: hitl.id,
                    source_decision_id: hitl.metadata.source_decision_id,
                    swarm_id: hitl.context.swarm_id.clone(),
                    reason: reason.clone(),
                    rejected_by: response.approved_by,
                };
                if let Err(e) = self.executor.notify_rejection(notice).await {
                    warn!(decision_id = %hitl.id, "Failed to notify rejection: {}", e);
                }

                info!(decision_id = %hitl.id, reason = %reason, "Decision rejected");
                self.event_bus.publish_hitl_event(HitlEvent::DecisionRejected {
                    decision_id: hitl.id,
                    reason,
                    rejected_at: now,
                });
                self.learn(&hitl, HumanVerdict::Rejected);
            }
            ReviewAction::Modify => {
                apply_modifications(&mut hitl, response.modifications.unwrap_or_default());
                hitl.reassess();
                hitl.metadata.updated_at = now;
                self.event_bus.publish_hitl_event(HitlEvent::DecisionModified {
                    decision_id: hitl.id,
                    risk_level: hitl.context.risk_level,
                    priority: hitl.metadata.priority,
                    modified_at: now,
                });

                match hitl.evaluate_gating(&self.config.gating_policy()) {
                    GatingPath::AutoExecute => self.auto_execute(&mut hitl).await?,
                    _ => self.request_review(&mut hitl).await?,
                }
            }
            ReviewAction::Escalate | ReviewAction::Unrecognized => {
                let reason = response
                    .reason
                    .unwrap_or_else(|| "escalated by reviewer".to_string());
                self.escalate(&mut hitl, &reason).await?;
            }
            ReviewAction::Cancel => {
                let reason = response
                    .reason
                    .unwrap_or_else(|| "cancelled by reviewer".to_string());
                self.cancel(&mut hitl, &reason, now).await?;
            }
        }

        self.retire(&hitl).await;
        Ok(hitl.status)
    }

    pub async fn check_timeouts(&self) -> Vec<TimeoutOutcome> {
        self.check_timeouts_at(Utc::now()).await
    }

    /// Resolve every review older than the configured timeout, as of `now`.
    pub async fn check_timeouts_at(&self, now: DateTime<Utc>) -> Vec<TimeoutOutcome> {
        let timeout = self.config.review_timeout();
        let slots: Vec<_> = self.decisions.iter().map(|e| e.value().clone()).collect();
        let mut outcomes = Vec::new();

        for slot in slots {
            let mut hitl = slot.lock().await;
            if hitl.status != DecisionStatus::InReview {
                continue;
            }
            let Some(age) = hitl.review_age(now) else {
                continue;
            };
            if age <= timeout {
                continue;
            }

            warn!(
                decision_id = %hitl.id,
                waited_minutes = age.num_minutes(),
                "Human review timed out"
            );

            let result = if hitl.context.risk_level == RiskLevel::Low && hitl.auto_execution_allowed {
                self.execute_on_timeout(&mut hitl).await
            } else {
                self.escalate(&mut hitl, "review timed out").await
            };
            if let Err(e) = result {
                warn!(decision_id = %hitl.id, "Failed to resolve timed-out review: {}", e);
                continue;
            }

            self.event_bus.publish_hitl_event(HitlEvent::ReviewTimedOut {
                decision_id: hitl.id,
                waited_minutes: age.num_minutes(),
                resolved_as: hitl.status,
                timed_out_at: now,
            });
            outcomes.push(TimeoutOutcome {
                decision_id: hitl.id,
                status: hitl.status,
            });
            self.retire(&hitl).await;
        }

        outcomes
    }

    /// Current state of a decision, from the registry or, once resolved,
    /// from its audit trail.
    pub async fn decision(&self, decision_id: DecisionId) -> Option<HitlDecision> {
        match self.live(decision_id) {
            Some(slot) => Some(slot.lock().await.clone()),
            None => self.audited(decision_id).await,
        }
    }

    /// Unresolved decisions with the given status, oldest first.
    pub async fn decisions_with_status(&self, status: DecisionStatus) -> Vec<HitlDecision> {
        let slots: Vec<_> = self.decisions.iter().map(|e| e.value().clone()).collect();
        let mut matching = Vec::new();
        for slot in slots {
            let hitl = slot.lock().await;
            if hitl.status == status {
                matching.push(hitl.clone());
            }
        }
        matching.sort_by_key(|d| d.metadata.created_at);
        matching
    }

    /// Decisions not yet in a terminal status.
    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    pub fn learning_patterns(&self) -> Vec<LearningPattern> {
        self.learning.patterns()
    }

    pub fn recommendations(&self) -> Vec<ThresholdRecommendation> {
        self.learning.recommendations()
    }

    /// Consume submissions until the channel closes or shutdown is requested.
    pub fn spawn_intake(
        self: &Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<HitlSubmission>,
    ) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    submission = rx.recv() => {
                        let Some(submission) = submission else { break };
                        if let Err(e) = orchestrator.submit(submission).await {
                            warn!("Failed to process HITL submission: {}", e);
                        }
                    }
                    _ = orchestrator.shutdown_token.cancelled() => break,
                }
            }
            debug!("HITL intake stopped");
        })
    }

    /// Consume review completions until the channel closes or shutdown is requested.
    pub fn spawn_review_listener(
        self: &Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<ReviewCompleted>,
    ) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    completed = rx.recv() => {
                        let Some(completed) = completed else { break };
                        let decision_id = completed.decision_id;
                        if let Err(e) = orchestrator.handle_review_completed(completed).await {
                            warn!(decision_id = %decision_id, "Failed to apply review: {}", e);
                        }
                    }
                    _ = orchestrator.shutdown_token.cancelled() => break,
                }
            }
            debug!("HITL review listener stopped");
        })
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    fn live(&self, decision_id: DecisionId) -> Option<Arc<Mutex<HitlDecision>>> {
        self.decisions.get(&decision_id).map(|e| e.value().clone())
    }

    /// Latest audited revision of a decision.
    async fn audited(&self, decision_id: DecisionId) -> Option<HitlDecision> {
        let query = MemoryQuery::new()
            .of_type(EntryType::HitlDecision)
            .tagged(format!("hitl:{}", decision_id));
        self.memory
            .retrieve(query)
            .await
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<HitlDecision>(entry.content).ok())
            .max_by_key(|hitl| hitl.revision)
    }

    async fn retire(&self, hitl: &HitlDecision) {
        if !hitl.status.is_terminal() {
            return;
        }
        self.review_gateway.withdraw(hitl.id).await;
        self.decisions.remove(&hitl.id);
        debug!(decision_id = %hitl.id, status = %hitl.status, "HITL decision retired");
    }

    fn execution_request(
        &self,
        hitl: &HitlDecision,
        authorization: ExecutionAuthorization,
    ) -> ExecutionRequest {
        ExecutionRequest {
            decision_id: hitl.id,
            source_decision_id: hitl.metadata.source_decision_id,
            swarm_id: hitl.context.swarm_id.clone(),
            decision_type: hitl.decision_type,
            authorization,
        }
    }

    /// Execute without a human; on failure fall back to review.
    async fn auto_execute(&self, hitl: &mut HitlDecision) -> Result<(), HitlError> {
        let authorization = ExecutionAuthorization::Automatic {
            confidence: hitl.context.confidence,
        };
        match self.executor.execute_decision(self.execution_request(hitl, authorization)).await {
            Ok(result) => {
                hitl.transition(DecisionStatus::Executed, Utc::now())?;
                hitl.resolution = Some(Resolution {
                    resolved_by: Some("auto".to_string()),
                    execution_summary: Some(result.summary),
                    resolved_at: Some(result.executed_at),
                    ..Resolution::default()
                });
                info!(decision_id = %hitl.id, "Decision executed automatically");
                self.audit(hitl).await;
                self.event_bus.publish_hitl_event(HitlEvent::DecisionAutoExecuted {
                    decision_id: hitl.id,
                    confidence: hitl.context.confidence,
                    executed_at: result.executed_at,
                });
                Ok(())
            }
            Err(e) => {
                warn!(
                    decision_id = %hitl.id,
                    "Automatic execution failed, requesting human review: {}", e
                );
                self.event_bus.publish_hitl_event(HitlEvent::AutoExecutionFailed {
                    decision_id: hitl.id,
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                self.request_review(hitl).await
            }
        }
    }

    /// Timeout path for auto-eligible reviews; a failure escalates.
    async fn execute_on_timeout(&self, hitl: &mut HitlDecision) -> Result<(), HitlError> {
        let authorization = ExecutionAuthorization::Automatic {
            confidence: hitl.context.confidence,
        };
        match self.executor.execute_decision(self.execution_request(hitl, authorization)).await {
            Ok(result) => {
                hitl.transition(DecisionStatus::Executed, Utc::now())?;
                hitl.resolution = Some(Resolution {
                    resolved_by: Some("auto".to_string()),
                    reason: Some("review timed out".to_string()),
                    execution_summary: Some(result.summary),
                    resolved_at: Some(result.executed_at),
                    ..Resolution::default()
                });
                self.audit(hitl).await;
                self.event_bus.publish_hitl_event(HitlEvent::DecisionAutoExecuted {
                    decision_id: hitl.id,
                    confidence: hitl.context.confidence,
                    executed_at: result.executed_at,
                });
                Ok(())
            }
            Err(e) => {
                self.event_bus.publish_hitl_event(HitlEvent::AutoExecutionFailed {
                    decision_id: hitl.id,
                    error: e.to_string(),
                    failed_at: Utc::now(),
                });
                self.escalate(hitl, "automatic execution failed after review timeout")
                    .await
            }
        }
    }

    async fn request_review(&self, hitl: &mut HitlDecision) -> Result<(), HitlError> {
        let now = Utc::now();
        hitl.transition(DecisionStatus::InReview, now)?;
        hitl.review_requested_at = Some(now);
        self.audit(hitl).await;

        let request = ReviewRequest {
            decision_id: hitl.id,
            decision_type: hitl.decision_type,
            context: hitl.context.clone(),
            priority: hitl.metadata.priority,
            options: vec![
                ReviewAction::Approve,
                ReviewAction::Reject,
                ReviewAction::Modify,
                ReviewAction::Escalate,
            ],
            escalation_count: hitl.escalation_count,
            requested_at: now,
        };

        // A failed request leaves the decision in review; the timeout sweep
        // resolves it.
        match self.review_gateway.request_review(request).await {
            Ok(()) => {
                self.event_bus.publish_hitl_event(HitlEvent::ReviewRequested {
                    decision_id: hitl.id,
                    priority: hitl.metadata.priority,
                    escalation_count: hitl.escalation_count,
                    requested_at: now,
                });
            }
            Err(e) => {
                warn!(decision_id = %hitl.id, "Failed to request human review: {}", e);
            }
        }
        Ok(())
    }

    async fn escalate(&self, hitl: &mut HitlDecision, reason: &str) -> Result<(), HitlError> {
        let now = Utc::now();
        hitl.transition(DecisionStatus::Escalated, now)?;
        hitl.escalation_count += 1;
        metrics::counter!("hivemind_hitl_escalations_total").increment(1);

        if hitl.escalation_count > self.config.max_escalations {
            self.audit(hitl).await;
            let reason = format!(
                "escalation limit of {} reached ({})",
                self.config.max_escalations, reason
            );
            return self.cancel(hitl, &reason, now).await;
        }

        hitl.metadata.priority = Priority::Critical;
        hitl.add_tag("escalated");
        info!(
            decision_id = %hitl.id,
            escalation_count = hitl.escalation_count,
            reason,
            "Decision escalated"
        );
        self.audit(hitl).await;
        self.event_bus.publish_hitl_event(HitlEvent::DecisionEscalated {
            decision_id: hitl.id,
            escalation_count: hitl.escalation_count,
            reason: reason.to_string(),
            escalated_at: now,
        });

        self.request_review(hitl).await
    }

    async fn cancel(
        &self,
        hitl: &mut HitlDecision,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), HitlError> {
        hitl.transition(DecisionStatus::Cancelled, now)?;
        hitl.resolution = Some(Resolution {
            reason: Some(reason.to_string()),
            resolved_at: Some(now),
            ..Resolution::default()
        });
        info!(decision_id = %hitl.id, reason, "Decision cancelled");
        self.audit(hitl).await;
        self.event_bus.publish_hitl_event(HitlEvent::DecisionCancelled {
            decision_id: hitl.id,
            reason: reason.to_string(),
            cancelled_at: now,
        });
        Ok(())
    }

    fn learn(&self, hitl: &HitlDecision, verdict: HumanVerdict) {
        if !self.config.enable_learning {
            return;
        }

        let key = LearningKey {
            decision_type: hitl.decision_type,
            risk_level: hitl.context.risk_level,
        };
        let sample = LearningSample {
            swarm_confidence: hitl.context.confidence,
            human_decision: verdict,
            risk_level: hitl.context.risk_level,
            financial_impact: hitl.context.financial_impact,
            outcome: hitl.status.as_str().to_string(),
            recorded_at: Utc::now(),
        };

        if let Some(recommendation) =
            self.learning
                .record(key, sample, self.config.auto_approval_threshold)
        {
            info!(
                decision_type = %key.decision_type,
                risk_level = %key.risk_level,
                kind = recommendation.kind.as_str(),
                accuracy = recommendation.accuracy,
                suggested_threshold = recommendation.suggested_threshold,
                "Threshold adjustment recommended"
            );
            self.event_bus
                .publish_hitl_event(HitlEvent::ThresholdRecommended { recommendation });
        }
    }

    async fn audit(&self, hitl: &HitlDecision) {
        let content = match serde_json::to_value(hitl) {
            Ok(content) => content,
            Err(e) => {
                warn!(decision_id = %hitl.id, "Failed to encode HITL audit entry: {}", e);
                return;
            }
        };
        let entry = MemoryEntry::new(
            EntryId::new(format!("hitl-{}-{}", hitl.id, hitl.revision)),
            EntryType::HitlDecision,
            content,
        )
        .with_relevance(hitl.context.confidence)
        .with_tags([
            "hitl".to_string(),
            format!("hitl:{}", hitl.id),
            format!("status:{}", hitl.status),
            format!("risk:{}", hitl.context.risk_level),
            format!("swarm:{}", hitl.context.swarm_id),
        ]);

        if let Err(e) = self.memory.store(entry).await {
            warn!(decision_id = %hitl.id, "Failed to write HITL audit entry: {}", e);
        }
    }
}

fn apply_modifications(hitl: &mut HitlDecision, modifications: DecisionModifications) {
    let context = &mut hitl.context;
    if let Some(confidence) = modifications.confidence {
        context.confidence = confidence;
    }
    if let Some(financial_impact) = modifications.financial_impact {
        context.financial_impact = Some(financial_impact);
    }
    if let Some(client_facing) = modifications.client_facing {
        context.client_facing = client_facing;
    }
    if let Some(strategic_impact) = modifications.strategic_impact {
        context.strategic_impact = strategic_impact;
    }
    if let Some(timeframe) = modifications.timeframe {
        context.timeframe = timeframe;
    }
    if let Some(recommendations) = modifications.recommendations {
        context.recommendations = recommendations;
    }
    if let Some(stakeholders) = modifications.stakeholders {
        context.stakeholders = stakeholders;
    }
    for tag in &modifications.tags {
        hitl.add_tag(tag);
    }
}
