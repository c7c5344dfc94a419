// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hitl::{HitlDecisionType, RiskLevel};

pub const MIN_SAMPLES_FOR_RECOMMENDATION: usize = 10;
pub const MAX_SAMPLES_PER_PATTERN: usize = 100;
pub const INCREASE_AUTOMATION_ACCURACY: f64 = 0.9;
pub const DECREASE_AUTOMATION_ACCURACY: f64 = 0.6;
pub const THRESHOLD_STEP: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearningKey {
    pub decision_type: HitlDecisionType,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanVerdict {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSample {
    pub swarm_confidence: f64,
    pub human_decision: HumanVerdict,
    pub risk_level: RiskLevel,
    pub financial_impact: Option<f64>,
    /// Final decision status once the verdict was applied
    pub outcome: String,
    pub recorded_at: DateTime<Utc>,
}

impl LearningSample {
    /// A confident swarm (>0.8) met with approval, or an unsure one (<0.5)
    /// met with rejection.
    pub fn agrees(&self) -> bool {
        match self.human_decision {
            HumanVerdict::Approved => self.swarm_confidence > 0.8,
            HumanVerdict::Rejected => self.swarm_confidence < 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPattern {
    pub key: LearningKey,
    pub samples: Vec<LearningSample>,
    pub accuracy: f64,
    pub updated_at: DateTime<Utc>,
}

impl LearningPattern {
    pub fn new(key: LearningKey) -> Self {
        Self {
            key,
            samples: Vec::new(),
            accuracy: 0.0,
            updated_at: Utc::now(),
        }
    }

    /// Append a sample (oldest dropped past the window) and refresh accuracy.
    pub fn record(&mut self, sample: LearningSample) {
        self.updated_at = sample.recorded_at;
        self.samples.push(sample);
        if self.samples.len() > MAX_SAMPLES_PER_PATTERN {
            let excess = self.samples.len() - MAX_SAMPLES_PER_PATTERN;
            self.samples.drain(..excess);
        }
        let agreeing = self.samples.iter().filter(|s| s.agrees()).count();
        self.accuracy = agreeing as f64 / self.samples.len() as f64;
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn adjustment(&self) -> Option<AdjustmentKind> {
        if self.sample_count() < MIN_SAMPLES_FOR_RECOMMENDATION {
            return None;
        }
        if self.accuracy >= INCREASE_AUTOMATION_ACCURACY {
            Some(AdjustmentKind::IncreaseAutomation)
        } else if self.accuracy < DECREASE_AUTOMATION_ACCURACY {
            Some(AdjustmentKind::DecreaseAutomation)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    IncreaseAutomation,
    DecreaseAutomation,
}

impl AdjustmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentKind::IncreaseAutomation => "increase_automation",
            AdjustmentKind::DecreaseAutomation => "decrease_automation",
        }
    }

    /// Lower the auto-approval threshold to automate more, raise it to
    /// automate less.
    pub fn suggest(&self, current_threshold: f64) -> f64 {
        let suggested = match self {
            AdjustmentKind::IncreaseAutomation => current_threshold - THRESHOLD_STEP,
            AdjustmentKind::DecreaseAutomation => current_threshold + THRESHOLD_STEP,
        };
        suggested.clamp(0.0, 1.0)
    }
}

/// Advisory threshold change; never applied automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRecommendation {
    pub key: LearningKey,
    pub kind: AdjustmentKind,
    pub accuracy: f64,
    pub sample_count: usize,
    pub current_threshold: f64,
    pub suggested_threshold: f64,
    pub generated_at: DateTime<Utc>,
}
