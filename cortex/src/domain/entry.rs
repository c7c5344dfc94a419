// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random id with a readable prefix, e.g. `decision-2b1f...`.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}-{}", prefix, uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of record held in swarm memory. Drives the type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Decision,
    AgentReport,
    Observation,
    HitlDecision,
    Execution,
    Emergency,
    Coordination,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Decision => "decision",
            EntryType::AgentReport => "agent_report",
            EntryType::Observation => "observation",
            EntryType::HitlDecision => "hitl_decision",
            EntryType::Execution => "execution",
            EntryType::Emergency => "emergency",
            EntryType::Coordination => "coordination",
        }
    }
}

/// A single record in swarm memory.
///
/// Entries are never mutated in place: overwriting an id replaces the whole
/// entry, and the only other way out is eviction or the retention sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: EntryId,
    pub entry_type: EntryType,
    pub content: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    /// Always within `[0.0, 1.0]`.
    pub relevance: f64,
    pub tags: BTreeSet<String>,
}

impl MemoryEntry {
    pub fn new(id: EntryId, entry_type: EntryType, content: serde_json::Value) -> Self {
        Self {
            id,
            entry_type,
            content,
            timestamp: Utc::now(),
            relevance: 0.5,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_relevance(mut self, relevance: f64) -> Self {
        self.relevance = clamp_relevance(relevance);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

fn clamp_relevance(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Retrieval filter. Every field is optional; an empty query returns
/// everything (subject to `limit`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryQuery {
    pub entry_type: Option<EntryType>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub relevance_threshold: Option<f64>,
    pub limit: Option<usize>,
}

impl MemoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end_date = Some(end);
        self
    }

    pub fn min_relevance(mut self, threshold: f64) -> Self {
        self.relevance_threshold = Some(threshold);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A decision outcome as remembered by the swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub swarm_id: String,
    pub decision_type: String,
    pub topic: String,
    pub winning_option: String,
    pub confidence: f64,
    /// Whether the decision was considered legitimate/successful by the
    /// deciding swarm.
    pub successful: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Periodic status report from an agent inside a swarm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub swarm_id: String,
    pub agent_id: String,
    pub summary: String,
    #[serde(default)]
    pub metrics: serde_json::Value,
    pub reported_at: DateTime<Utc>,
}
