// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entry::DecisionRecord;

/// Decisions are grouped by what was decided and which option won.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternKey {
    pub decision_type: String,
    pub winning_option: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionPattern {
    pub key: PatternKey,
    pub occurrences: u64,
    pub successes: u64,
    pub success_rate: f64,
    pub avg_confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Frequency / success-rate aggregation over a window of decisions.
///
/// Only keys that occur at least `min_occurrences` times are returned, most
/// frequent first (ties broken by most recent).
pub fn detect_patterns<'a, I>(decisions: I, min_occurrences: u64) -> Vec<DecisionPattern>
where
    I: IntoIterator<Item = &'a DecisionRecord>,
{
    let mut groups: HashMap<PatternKey, DecisionPattern> = HashMap::new();

    for record in decisions {
        let key = PatternKey {
            decision_type: record.decision_type.clone(),
            winning_option: record.winning_option.clone(),
        };
        let pattern = groups.entry(key.clone()).or_insert_with(|| DecisionPattern {
            key,
            occurrences: 0,
            successes: 0,
            success_rate: 0.0,
            avg_confidence: 0.0,
            first_seen: record.recorded_at,
            last_seen: record.recorded_at,
        });

        let n = pattern.occurrences as f64;
        pattern.avg_confidence = (pattern.avg_confidence * n + record.confidence) / (n + 1.0);
        pattern.occurrences += 1;
        if record.successful {
            pattern.successes += 1;
        }
        pattern.success_rate = pattern.successes as f64 / pattern.occurrences as f64;
        pattern.first_seen = pattern.first_seen.min(record.recorded_at);
        pattern.last_seen = pattern.last_seen.max(record.recorded_at);
    }

    let mut patterns: Vec<_> = groups
        .into_values()
        .filter(|p| p.occurrences >= min_occurrences)
        .collect();
    patterns.sort_by(|a, b| {
        b.occurrences
            .cmp(&a.occurrences)
            .then(b.last_seen.cmp(&a.last_seen))
    });
    patterns
}
