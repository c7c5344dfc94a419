// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Learning Tracker
//!
//! Accumulates swarm-confidence / human-verdict pairs per
//! `(decision_type, risk_level)` and derives advisory threshold
//! recommendations. Nothing here changes the live gating policy.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::domain::learning::{LearningKey, LearningPattern, LearningSample, ThresholdRecommendation};

#[derive(Default)]
pub struct LearningTracker {
    patterns: Mutex<HashMap<LearningKey, LearningPattern>>,
    recommendations: Mutex<HashMap<LearningKey, ThresholdRecommendation>>,
}

impl LearningTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one resolved decision.
    ///
    /// Returns a recommendation when one first appears for the key or its
    /// direction changes; the latest recommendation is always kept.
    pub fn record(
        &self,
        key: LearningKey,
        sample: LearningSample,
        current_threshold: f64,
    ) -> Option<ThresholdRecommendation> {
        let (kind, accuracy, sample_count) = {
            let mut patterns = self.patterns.lock();
            let pattern = patterns
                .entry(key)
                .or_insert_with(|| LearningPattern::new(key));
            pattern.record(sample);
            (pattern.adjustment()?, pattern.accuracy, pattern.sample_count())
        };

        let recommendation = ThresholdRecommendation {
            key,
            kind,
            accuracy,
            sample_count,
            current_threshold,
            suggested_threshold: kind.suggest(current_threshold),
            generated_at: Utc::now(),
        };

        let previous = self
            .recommendations
            .lock()
            .insert(key, recommendation.clone());

        match previous {
            Some(prev) if prev.kind == kind => None,
            _ => Some(recommendation),
        }
    }

    pub fn pattern(&self, key: &LearningKey) -> Option<LearningPattern> {
        self.patterns.lock().get(key).cloned()
    }

    pub fn patterns(&self) -> Vec<LearningPattern> {
        self.patterns.lock().values().cloned().collect()
    }

    pub fn recommendations(&self) -> Vec<ThresholdRecommendation> {
        self.recommendations.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hitl::{HitlDecisionType, RiskLevel};
    use crate::domain::learning::{AdjustmentKind, HumanVerdict};

    fn key() -> LearningKey {
        LearningKey {
            decision_type: HitlDecisionType::Approval,
            risk_level: RiskLevel::High,
        }
    }

    fn sample(confidence: f64, verdict: HumanVerdict) -> LearningSample {
        LearningSample {
            swarm_confidence: confidence,
            human_decision: verdict,
            risk_level: RiskLevel::High,
            financial_impact: Some(150_000.0),
            outcome: "executed".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_recommendation_emitted_once_per_direction() {
        let tracker = LearningTracker::new();
        let mut emitted = Vec::new();

        for _ in 0..12 {
            if let Some(rec) = tracker.record(key(), sample(0.95, HumanVerdict::Approved), 0.8) {
                emitted.push(rec);
            }
        }

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind, AdjustmentKind::IncreaseAutomation);
        assert_eq!(emitted[0].sample_count, 10);
        assert_eq!(tracker.recommendations().len(), 1);
        assert_eq!(tracker.recommendations()[0].sample_count, 12);
    }

    #[test]
    fn test_nine_of_ten_agreeing_increases_automation() {
        let tracker = LearningTracker::new();
        tracker.record(key(), sample(0.95, HumanVerdict::Rejected), 0.8);
        let mut last = None;
        for _ in 0..9 {
            last = tracker.record(key(), sample(0.95, HumanVerdict::Approved), 0.8);
        }

        let rec = last.expect("recommendation after ten samples");
        assert_eq!(rec.kind, AdjustmentKind::IncreaseAutomation);
        assert!((rec.accuracy - 0.9).abs() < 1e-9);
        assert!((rec.suggested_threshold - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_keys_are_tracked_separately() {
        let tracker = LearningTracker::new();
        let other = LearningKey {
            decision_type: HitlDecisionType::Strategic,
            risk_level: RiskLevel::Critical,
        };
        tracker.record(key(), sample(0.95, HumanVerdict::Approved), 0.8);
        tracker.record(other, sample(0.3, HumanVerdict::Rejected), 0.8);

        assert_eq!(tracker.patterns().len(), 2);
        assert_eq!(tracker.pattern(&other).map(|p| p.sample_count()), Some(1));
    }
}
