// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SwarmMemory - Shared Decision & Observation Store
//!
//! Bounded, indexed key/value memory shared by every swarm in the network.
//! Coordinators write decision records and agent reports, the HITL
//! orchestrator writes its audit trail, and both read back through
//! index-driven queries.
//!
//! ## Bounded Growth
//!
//! Storing a new id while at capacity evicts the oldest 10% of entries by
//! timestamp first (not LRU). Independently, the retention sweep deletes
//! anything older than `retention_hours`. Both paths publish a
//! [`MemoryEvent`] and never fail the write.
//!
//! ## Pattern Detection
//!
//! After each `store_decision` / `store_agent_report`, decisions from the
//! last `pattern_window_days` are grouped by `(decision_type,
//! winning_option)`; groups with at least `min_pattern_occurrences` members
//! become [`DecisionPattern`]s.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::application::EventBus;
use crate::domain::{
    detect_patterns, AgentReport, DecisionPattern, DecisionRecord, EntryId, EntryType, MemoryEntry,
    MemoryEvent, MemoryIndex, MemoryQuery, PatternKey,
};

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Invalid memory entry: {0}")]
    InvalidEntry(String),

    #[error("Failed to encode memory content: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Swarm memory configuration (`spec.memory` in the hivemind manifest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Hard upper bound on stored entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Entries older than this are removed by the retention sweep
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// How often the retention sweep runs (0 disables the sweeper)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// Run pattern detection after decision / report writes
    #[serde(default = "default_true")]
    pub pattern_detection: bool,

    /// Look-back window for pattern detection
    #[serde(default = "default_pattern_window_days")]
    pub pattern_window_days: i64,

    /// Minimum group size before a pattern is reported
    #[serde(default = "default_min_pattern_occurrences")]
    pub min_pattern_occurrences: u64,
}

impl MemoryConfig {
    pub fn retention(&self) -> ChronoDuration {
        ChronoDuration::hours(self.retention_hours as i64)
    }

    /// Number of entries dropped when the store is full: 10%, at least one.
    pub fn eviction_batch(&self) -> usize {
        ((self.max_entries as f64) * 0.1).ceil().max(1.0) as usize
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            retention_hours: default_retention_hours(),
            sweep_interval_seconds: default_sweep_interval(),
            pattern_detection: true,
            pattern_window_days: default_pattern_window_days(),
            min_pattern_occurrences: default_min_pattern_occurrences(),
        }
    }
}

fn default_max_entries() -> usize {
    10_000
}

fn default_retention_hours() -> u64 {
    24 * 30
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_true() -> bool {
    true
}

fn default_pattern_window_days() -> i64 {
    7
}

fn default_min_pattern_occurrences() -> u64 {
    3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryHealthStatus {
    Healthy,
    Degraded,
    Critical,
}

impl MemoryHealthStatus {
    /// healthy < 70% capacity, degraded < 90%, critical otherwise.
    pub fn from_utilization(utilization: f64) -> Self {
        if utilization < 0.7 {
            MemoryHealthStatus::Healthy
        } else if utilization < 0.9 {
            MemoryHealthStatus::Degraded
        } else {
            MemoryHealthStatus::Critical
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryHealth {
    pub status: MemoryHealthStatus,
    pub entry_count: usize,
    pub max_entries: usize,
    pub utilization: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub entry_count: usize,
    pub by_type: HashMap<EntryType, usize>,
    pub pattern_count: usize,
}

/// Swarm memory interface
#[async_trait]
pub trait SwarmMemory: Send + Sync {
    /// Insert or overwrite an entry by id, evicting the oldest 10% first
    /// when a new id would exceed capacity
    async fn store(&self, entry: MemoryEntry) -> Result<(), MemoryError>;

    /// Index-driven query, sorted by relevance then recency
    async fn retrieve(&self, query: MemoryQuery) -> Vec<MemoryEntry>;

    async fn get(&self, id: &EntryId) -> Option<MemoryEntry>;

    async fn remove(&self, id: &EntryId) -> Option<MemoryEntry>;

    async fn entry_count(&self) -> usize;

    /// Store a decision and re-run pattern detection
    async fn store_decision(&self, record: DecisionRecord) -> Result<EntryId, MemoryError>;

    /// Store an agent report and re-run pattern detection
    async fn store_agent_report(&self, report: AgentReport) -> Result<EntryId, MemoryError>;

    /// Currently detected patterns, most frequent first
    async fn patterns(&self) -> Vec<DecisionPattern>;

    /// Delete every entry older than the retention window, measured from `now`
    async fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize;

    async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now()).await
    }

    async fn health(&self) -> MemoryHealth;

    async fn stats(&self) -> MemoryStats;
}

/// Standard in-process implementation of [`SwarmMemory`]
pub struct StandardSwarmMemory {
    config: MemoryConfig,
    index: RwLock<MemoryIndex>,
    patterns: RwLock<HashMap<PatternKey, DecisionPattern>>,
    event_bus: Arc<dyn EventBus>,
}

impl StandardSwarmMemory {
    /// A `max_entries` of zero is raised to one so the bound always holds.
    pub fn new(mut config: MemoryConfig, event_bus: Arc<dyn EventBus>) -> Self {
        if config.max_entries == 0 {
            warn!("Swarm memory configured with max_entries = 0, using 1");
            config.max_entries = 1;
        }
        Self {
            config,
            index: RwLock::new(MemoryIndex::new()),
            patterns: RwLock::new(HashMap::new()),
            event_bus,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    async fn notify(&self, event: MemoryEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.event_bus.publish(event).await {
            warn!(event_type, "Failed to publish memory event: {}", e);
        }
    }

    async fn run_pattern_detection(&self, now: DateTime<Utc>) {
        if !self.config.pattern_detection {
            return;
        }

        let window_start = now - ChronoDuration::days(self.config.pattern_window_days);
        let recent: Vec<DecisionRecord> = {
            let index = self.index.read().await;
            index
                .entries_of_type(EntryType::Decision)
                .filter(|entry| entry.timestamp >= window_start)
                .filter_map(|entry| serde_json::from_value(entry.content.clone()).ok())
                .collect()
        };

        let detected = detect_patterns(&recent, self.config.min_pattern_occurrences);

        let changed: Vec<DecisionPattern> = {
            let mut patterns = self.patterns.write().await;
            let changed = detected
                .iter()
                .filter(|p| {
                    patterns
                        .get(&p.key)
                        .map_or(true, |known| known.occurrences != p.occurrences)
                })
                .cloned()
                .collect();
            *patterns = detected.into_iter().map(|p| (p.key.clone(), p)).collect();
            changed
        };

        for pattern in changed {
            debug!(
                decision_type = %pattern.key.decision_type,
                winning_option = %pattern.key.winning_option,
                occurrences = pattern.occurrences,
                "Decision pattern detected"
            );
            self.notify(MemoryEvent::PatternDetected {
                pattern,
                timestamp: now,
            })
            .await;
        }
    }
}

#[async_trait]
impl SwarmMemory for StandardSwarmMemory {
    async fn store(&self, entry: MemoryEntry) -> Result<(), MemoryError> {
        if entry.id.as_str().is_empty() {
            return Err(MemoryError::InvalidEntry("entry id cannot be empty".to_string()));
        }

        let (evicted, entry_count) = {
            let mut index = self.index.write().await;
            let evicted = if !index.contains(&entry.id) && index.len() >= self.config.max_entries {
                index.evict_oldest(self.config.eviction_batch())
            } else {
                Vec::new()
            };
            index.insert(entry);
            (evicted, index.len())
        };

        metrics::gauge!("hivemind_memory_entries").set(entry_count as f64);

        if !evicted.is_empty() {
            warn!(
                evicted = evicted.len(),
                entry_count,
                max_entries = self.config.max_entries,
                "Swarm memory at capacity, evicted oldest entries"
            );
            metrics::counter!("hivemind_memory_evictions_total").increment(evicted.len() as u64);
            self.notify(MemoryEvent::EntriesEvicted {
                count: evicted.len(),
                evicted_ids: evicted.into_iter().map(|e| e.id).collect(),
                entry_count,
                max_entries: self.config.max_entries,
                timestamp: Utc::now(),
            })
            .await;
        }

        Ok(())
    }

    async fn retrieve(&self, query: MemoryQuery) -> Vec<MemoryEntry> {
        self.index.read().await.query(&query)
    }

    async fn get(&self, id: &EntryId) -> Option<MemoryEntry> {
        self.index.read().await.get(id).cloned()
    }

    async fn remove(&self, id: &EntryId) -> Option<MemoryEntry> {
        self.index.write().await.remove(id)
    }

    async fn entry_count(&self) -> usize {
        self.index.read().await.len()
    }

    async fn store_decision(&self, record: DecisionRecord) -> Result<EntryId, MemoryError> {
        let id = EntryId::new(format!("decision-{}", record.decision_id));
        let timestamp = record.recorded_at;
        let entry = MemoryEntry::new(id.clone(), EntryType::Decision, serde_json::to_value(&record)?)
            .with_timestamp(timestamp)
            .with_relevance(record.confidence)
            .with_tags([
                "decision".to_string(),
                format!("swarm:{}", record.swarm_id),
                format!("type:{}", record.decision_type),
            ]);

        self.store(entry).await?;
        self.run_pattern_detection(Utc::now()).await;
        Ok(id)
    }

    async fn store_agent_report(&self, report: AgentReport) -> Result<EntryId, MemoryError> {
        let id = EntryId::generate("report");
        let timestamp = report.reported_at;
        let entry = MemoryEntry::new(id.clone(), EntryType::AgentReport, serde_json::to_value(&report)?)
            .with_timestamp(timestamp)
            .with_tags([
                "agent-report".to_string(),
                format!("swarm:{}", report.swarm_id),
                format!("agent:{}", report.agent_id),
            ]);

        self.store(entry).await?;
        self.run_pattern_detection(Utc::now()).await;
        Ok(id)
    }

    async fn patterns(&self) -> Vec<DecisionPattern> {
        let mut patterns: Vec<_> = self.patterns.read().await.values().cloned().collect();
        patterns.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then(b.last_seen.cmp(&a.last_seen))
        });
        patterns
    }

    async fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.config.retention();
        let (removed, entry_count) = {
            let mut index = self.index.write().await;
            let removed = index.remove_older_than(cutoff).len();
            (removed, index.len())
        };

        metrics::gauge!("hivemind_memory_entries").set(entry_count as f64);

        if removed > 0 {
            info!(removed, %cutoff, "Retention sweep removed expired entries");
            self.notify(MemoryEvent::RetentionSweep {
                removed,
                cutoff,
                timestamp: now,
            })
            .await;
        }
        removed
    }

    async fn health(&self) -> MemoryHealth {
        let entry_count = self.index.read().await.len();
        let utilization = entry_count as f64 / self.config.max_entries as f64;

        MemoryHealth {
            status: MemoryHealthStatus::from_utilization(utilization),
            entry_count,
            max_entries: self.config.max_entries,
            utilization,
        }
    }

    async fn stats(&self) -> MemoryStats {
        let (entry_count, by_type) = {
            let index = self.index.read().await;
            (index.len(), index.counts_by_type())
        };
        MemoryStats {
            entry_count,
            by_type,
            pattern_count: self.patterns.read().await.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingEventBus {
        events: Mutex<Vec<MemoryEvent>>,
    }

    #[async_trait]
    impl EventBus for RecordingEventBus {
        async fn publish(&self, event: MemoryEvent) -> anyhow::Result<()> {
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    struct FailingEventBus;

    #[async_trait]
    impl EventBus for FailingEventBus {
        async fn publish(&self, _event: MemoryEvent) -> anyhow::Result<()> {
            anyhow::bail!("bus offline")
        }
    }

    fn memory_with(config: MemoryConfig) -> (StandardSwarmMemory, Arc<RecordingEventBus>) {
        let bus = Arc::new(RecordingEventBus::default());
        (StandardSwarmMemory::new(config, bus.clone()), bus)
    }

    fn observation(id: &str, age_minutes: i64) -> MemoryEntry {
        MemoryEntry::new(EntryId::new(id), EntryType::Observation, json!({ "note": id }))
            .with_timestamp(Utc::now() - ChronoDuration::minutes(age_minutes))
    }

    fn decision(decision_type: &str, option: &str, days_ago: i64) -> DecisionRecord {
        DecisionRecord {
            decision_id: uuid::Uuid::new_v4().to_string(),
            swarm_id: "sales".to_string(),
            decision_type: decision_type.to_string(),
            topic: "quarterly pricing".to_string(),
            winning_option: option.to_string(),
            confidence: 0.85,
            successful: true,
            recorded_at: Utc::now() - ChronoDuration::days(days_ago),
        }
    }

    #[tokio::test]
    async fn test_entry_count_never_exceeds_capacity() {
        let config = MemoryConfig {
            max_entries: 20,
            ..MemoryConfig::default()
        };
        let (memory, bus) = memory_with(config);

        for i in 0..75 {
            memory.store(observation(&format!("e{i}"), 100 - i)).await.unwrap();
            assert!(memory.health().await.entry_count <= 20);
        }

        assert!(memory.index.read().await.is_consistent());
        let events = bus.events.lock().await;
        assert!(events
            .iter()
            .any(|e| matches!(e, MemoryEvent::EntriesEvicted { count: 2, .. })));
    }

    #[tokio::test]
    async fn test_eviction_drops_oldest_first() {
        let config = MemoryConfig {
            max_entries: 10,
            ..MemoryConfig::default()
        };
        let (memory, _bus) = memory_with(config);

        // e0 is the oldest entry.
        for i in 0..10 {
            memory.store(observation(&format!("e{i}"), 100 - i)).await.unwrap();
        }
        memory.store(observation("newest", 0)).await.unwrap();

        assert!(memory.get(&EntryId::new("e0")).await.is_none());
        assert!(memory.get(&EntryId::new("e1")).await.is_some());
        assert!(memory.get(&EntryId::new("newest")).await.is_some());
        assert_eq!(memory.health().await.entry_count, 10);
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_does_not_evict() {
        let config = MemoryConfig {
            max_entries: 3,
            ..MemoryConfig::default()
        };
        let (memory, bus) = memory_with(config);
        for i in 0..3 {
            memory.store(observation(&format!("e{i}"), 10 - i)).await.unwrap();
        }

        memory.store(observation("e1", 0)).await.unwrap();

        assert_eq!(memory.health().await.entry_count, 3);
        assert!(bus.events.lock().await.is_empty());
    }

    #[test]
    fn test_empty_id_is_rejected() {
        let (memory, _bus) = memory_with(MemoryConfig::default());
        let result = tokio_test::block_on(memory.store(observation("", 0)));
        assert!(matches!(result, Err(MemoryError::InvalidEntry(_))));
        assert_eq!(tokio_test::block_on(memory.entry_count()), 0);
    }

    #[tokio::test]
    async fn test_retention_sweep_removes_expired_entries() {
        let config = MemoryConfig {
            retention_hours: 1,
            ..MemoryConfig::default()
        };
        let (memory, bus) = memory_with(config);

        memory.store(observation("fresh", 5).with_relevance(0.0)).await.unwrap();
        memory.store(observation("stale", 120).with_relevance(1.0)).await.unwrap();

        let removed = memory.sweep_expired().await;
        assert_eq!(removed, 1);
        assert!(memory.get(&EntryId::new("stale")).await.is_none());
        assert!(memory.get(&EntryId::new("fresh")).await.is_some());

        // Later sweeps keep the invariant relative to their own clock.
        let removed = memory.sweep_expired_at(Utc::now() + ChronoDuration::hours(2)).await;
        assert_eq!(removed, 1);
        assert_eq!(memory.health().await.entry_count, 0);

        let events = bus.events.lock().await;
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MemoryEvent::RetentionSweep { .. }))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_pattern_detected_at_third_occurrence() {
        let (memory, bus) = memory_with(MemoryConfig::default());

        memory.store_decision(decision("pricing", "discount", 0)).await.unwrap();
        memory.store_decision(decision("pricing", "discount", 1)).await.unwrap();
        assert!(memory.patterns().await.is_empty());

        memory.store_decision(decision("pricing", "discount", 2)).await.unwrap();
        let patterns = memory.patterns().await;
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences, 3);
        assert_eq!(patterns[0].key.winning_option, "discount");

        let events = bus.events.lock().await;
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MemoryEvent::PatternDetected { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_pattern_window_ignores_old_decisions() {
        let (memory, _bus) = memory_with(MemoryConfig::default());

        memory.store_decision(decision("pricing", "discount", 0)).await.unwrap();
        memory.store_decision(decision("pricing", "discount", 10)).await.unwrap();
        memory.store_decision(decision("pricing", "discount", 12)).await.unwrap();

        assert!(memory.patterns().await.is_empty());
    }

    #[tokio::test]
    async fn test_pattern_detection_can_be_disabled() {
        let config = MemoryConfig {
            pattern_detection: false,
            ..MemoryConfig::default()
        };
        let (memory, _bus) = memory_with(config);
        for _ in 0..4 {
            memory.store_decision(decision("pricing", "discount", 0)).await.unwrap();
        }
        assert!(memory.patterns().await.is_empty());
    }

    #[tokio::test]
    async fn test_decisions_and_reports_are_indexed() {
        let (memory, _bus) = memory_with(MemoryConfig::default());
        memory.store_decision(decision("pricing", "discount", 0)).await.unwrap();
        memory
            .store_agent_report(AgentReport {
                swarm_id: "sales".to_string(),
                agent_id: "scout-1".to_string(),
                summary: "pipeline reviewed".to_string(),
                metrics: json!({ "leads": 12 }),
                reported_at: Utc::now(),
            })
            .await
            .unwrap();

        let sales = memory.retrieve(MemoryQuery::new().tagged("swarm:sales")).await;
        assert_eq!(sales.len(), 2);

        let reports = memory
            .retrieve(MemoryQuery::new().of_type(EntryType::AgentReport).tagged("agent:scout-1"))
            .await;
        assert_eq!(reports.len(), 1);

        let stats = memory.stats().await;
        assert_eq!(stats.entry_count, 2);
        assert_eq!(stats.by_type.get(&EntryType::Decision), Some(&1));
    }

    #[tokio::test]
    async fn test_health_tiers() {
        assert_eq!(MemoryHealthStatus::from_utilization(0.69), MemoryHealthStatus::Healthy);
        assert_eq!(MemoryHealthStatus::from_utilization(0.7), MemoryHealthStatus::Degraded);
        assert_eq!(MemoryHealthStatus::from_utilization(0.89), MemoryHealthStatus::Degraded);
        assert_eq!(MemoryHealthStatus::from_utilization(0.9), MemoryHealthStatus::Critical);

        let config = MemoryConfig {
            max_entries: 10,
            ..MemoryConfig::default()
        };
        let (memory, _bus) = memory_with(config);
        for i in 0..8 {
            memory.store(observation(&format!("e{i}"), i)).await.unwrap();
        }
        let health = memory.health().await;
        assert_eq!(health.status, MemoryHealthStatus::Degraded);
        assert!((health.utilization - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_publish_failure_is_not_fatal() {
        let config = MemoryConfig {
            max_entries: 1,
            ..MemoryConfig::default()
        };
        let memory = StandardSwarmMemory::new(config, Arc::new(FailingEventBus));
        memory.store(observation("a", 1)).await.unwrap();
        memory.store(observation("b", 0)).await.unwrap();
        assert!(memory.get(&EntryId::new("b")).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let config = MemoryConfig {
            max_entries: 0,
            ..MemoryConfig::default()
        };
        let (memory, _bus) = memory_with(config);
        assert_eq!(memory.config().max_entries, 1);

        memory.store(observation("a", 1)).await.unwrap();
        memory.store(observation("b", 0)).await.unwrap();
        assert_eq!(memory.entry_count().await, 1);
        assert!(memory.get(&EntryId::new("b")).await.is_some());
    }

    #[test]
    fn test_eviction_batch_is_at_least_one() {
        let mut config = MemoryConfig::default();
        assert_eq!(config.eviction_batch(), 1000);
        config.max_entries = 5;
        assert_eq!(config.eviction_batch(), 1);
        config.max_entries = 25;
        assert_eq!(config.eviction_batch(), 3);
    }
}
