// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cross-swarm coordination, global emergencies and network optimization

use chrono::{DateTime, Utc};
use hivemind_core::domain::decision::{Decision, EmergencyResponse};
use hivemind_core::domain::swarm::{Priority, SwarmId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue depth above which the queue is a bottleneck.
pub const QUEUE_DEPTH_THRESHOLD: usize = 100;

/// Utilization above which a swarm is a bottleneck.
pub const UTILIZATION_THRESHOLD: f64 = 0.8;

/// Most swarms that respond to one global emergency.
pub const MAX_EMERGENCY_RESPONDERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationType {
    /// Every participant decides; the results are synthesized
    Collaboration,
    /// The first participant decides on the initiator's behalf
    Delegation,
    /// The first participant advises; nothing is decided
    Consultation,
}

impl CoordinationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinationType::Collaboration => "collaboration",
            CoordinationType::Delegation => "delegation",
            CoordinationType::Consultation => "consultation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationRequest {
    pub id: String,
    pub coordination_type: CoordinationType,
    pub initiator: SwarmId,
    pub participants: Vec<SwarmId>,
    pub topic: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl CoordinationRequest {
    pub fn new(
        coordination_type: CoordinationType,
        initiator: SwarmId,
        participants: Vec<SwarmId>,
        topic: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            coordination_type,
            initiator,
            participants,
            topic: topic.into(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub swarm_id: SwarmId,
    pub decision: Decision,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationResult {
    pub coordination_id: String,
    pub coordination_type: CoordinationType,
    pub contributions: Vec<Contribution>,
    /// Synthesized (collaboration) or single winning option
    pub outcome: Option<String>,
    pub confidence: f64,
    /// Participants whose decision unit failed or timed out
    pub failed: Vec<SwarmId>,
    pub completed_at: DateTime<Utc>,
}

/// Majority winning option across contributions. Equal counts are broken by
/// mean confidence, then by first appearance. Returns the option and the
/// mean confidence of its supporters.
pub fn synthesize(contributions: &[Contribution]) -> Option<(String, f64)> {
    // (option, supporters, confidence sum) in first-seen order
    let mut tallies: Vec<(String, usize, f64)> = Vec::new();
    for contribution in contributions {
        let option = &contribution.decision.winning_option;
        match tallies.iter_mut().find(|(o, _, _)| o == option) {
            Some((_, count, sum)) => {
                *count += 1;
                *sum += contribution.decision.confidence;
            }
            None => tallies.push((option.clone(), 1, contribution.decision.confidence)),
        }
    }

    let mut best: Option<(String, usize, f64)> = None;
    for (option, count, sum) in tallies {
        let mean = sum / count as f64;
        let better = match &best {
            None => true,
            Some((_, best_count, best_mean)) => {
                count > *best_count || (count == *best_count && mean > *best_mean)
            }
        };
        if better {
            best = Some((option, count, mean));
        }
    }
    best.map(|(option, _, mean)| (option, mean))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEmergency {
    pub id: String,
    pub kind: String,
    pub severity: Priority,
    #[serde(default)]
    pub context: serde_json::Value,
    pub raised_at: DateTime<Utc>,
}

impl GlobalEmergency {
    pub fn new(kind: impl Into<String>, severity: Priority) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            severity,
            context: serde_json::Value::Null,
            raised_at: Utc::now(),
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatedResponse {
    pub emergency_id: String,
    pub responders: Vec<SwarmId>,
    pub failed: Vec<SwarmId>,
    /// Ordered union of every responder's actions
    pub actions: Vec<String>,
    /// Always critical
    pub priority: Priority,
    pub summary: String,
    pub confidence: f64,
    pub handled_at: DateTime<Utc>,
}

impl CoordinatedResponse {
    pub fn merge(
        emergency_id: impl Into<String>,
        responses: Vec<(SwarmId, EmergencyResponse)>,
        failed: Vec<SwarmId>,
    ) -> Self {
        let mut actions: Vec<String> = Vec::new();
        let mut summaries = Vec::new();
        let mut confidence_sum = 0.0;
        let mut responders = Vec::with_capacity(responses.len());

        for (swarm_id, response) in &responses {
            for action in &response.actions {
                if !actions.contains(action) {
                    actions.push(action.clone());
                }
            }
            if !response.summary.is_empty() {
                summaries.push(format!("{}: {}", swarm_id, response.summary));
            }
            confidence_sum += response.confidence;
            responders.push(swarm_id.clone());
        }

        let confidence = if responses.is_empty() {
            0.0
        } else {
            confidence_sum / responses.len() as f64
        };

        Self {
            emergency_id: emergency_id.into(),
            responders,
            failed,
            actions,
            priority: Priority::Critical,
            summary: summaries.join("; "),
            confidence,
            handled_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bottleneck {
    QueueBacklog { depth: usize },
    SwarmOverloaded { swarm_id: SwarmId, utilization: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Reorder the queue by priority, most urgent first
    ReprioritizeMessages,
    /// Allocate more resources to an overloaded swarm
    ScaleSwarm {
        swarm_id: SwarmId,
        additional_resources: u32,
    },
    /// Move work off an overloaded swarm; left to operators
    RedistributeLoad { swarm_id: SwarmId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationRisk {
    Low,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub risk: RecommendationRisk,
    pub auto_apply: bool,
    pub rationale: String,
}

impl Recommendation {
    pub fn reprioritize(depth: usize) -> Self {
        Self {
            kind: RecommendationKind::ReprioritizeMessages,
            risk: RecommendationRisk::Low,
            auto_apply: true,
            rationale: format!("{} messages queued", depth),
        }
    }

    pub fn scale(swarm_id: SwarmId, additional_resources: u32, utilization: f64) -> Self {
        Self {
            rationale: format!("swarm {} at {:.0}% utilization", swarm_id, utilization * 100.0),
            kind: RecommendationKind::ScaleSwarm {
                swarm_id,
                additional_resources,
            },
            risk: RecommendationRisk::Low,
            auto_apply: true,
        }
    }

    pub fn redistribute(swarm_id: SwarmId) -> Self {
        Self {
            rationale: format!("shift queued work away from swarm {}", swarm_id),
            kind: RecommendationKind::RedistributeLoad { swarm_id },
            risk: RecommendationRisk::Medium,
            auto_apply: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkOptimization {
    pub bottlenecks: Vec<Bottleneck>,
    pub recommendations: Vec<Recommendation>,
    /// Recommendations that were applied automatically
    pub applied: Vec<Recommendation>,
    pub optimized_at: DateTime<Utc>,
}

/// Outcome of one load-balance pass that moved work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadRebalance {
    pub severity: f64,
    pub from: SwarmId,
    pub to: SwarmId,
    pub moved_tasks: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(swarm: &str, option: &str, confidence: f64) -> Contribution {
        Contribution {
            swarm_id: SwarmId::new(swarm),
            decision: Decision::new("queen", "expansion", "strategy", option, confidence),
        }
    }

    #[test]
    fn test_synthesize_majority() {
        let result = synthesize(&[
            contribution("a", "expand", 0.6),
            contribution("b", "hold", 0.95),
            contribution("c", "expand", 0.8),
        ]);
        let (option, confidence) = result.unwrap();
        assert_eq!(option, "expand");
        assert!((confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_synthesize_tie_breaks_on_confidence() {
        let (option, _) = synthesize(&[
            contribution("a", "expand", 0.6),
            contribution("b", "hold", 0.9),
        ])
        .unwrap();
        assert_eq!(option, "hold");
        assert!(synthesize(&[]).is_none());
    }

    #[test]
    fn test_emergency_merge_unions_actions() {
        let response = |actions: &[&str], confidence| EmergencyResponse {
            actions: actions.iter().map(|a| a.to_string()).collect(),
            priority: Priority::High,
            summary: "contained".to_string(),
            confidence,
        };
        let merged = CoordinatedResponse::merge(
            "em-1",
            vec![
                (SwarmId::new("ops"), response(&["isolate", "notify"], 0.8)),
                (SwarmId::new("support"), response(&["notify", "refund"], 0.6)),
            ],
            vec![SwarmId::new("sales")],
        );

        assert_eq!(merged.actions, vec!["isolate", "notify", "refund"]);
        assert_eq!(merged.priority, Priority::Critical);
        assert!((merged.confidence - 0.7).abs() < 1e-9);
        assert_eq!(merged.failed, vec![SwarmId::new("sales")]);
        assert!(merged.summary.starts_with("ops: contained"));
    }
}
