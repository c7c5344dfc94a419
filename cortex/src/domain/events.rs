// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for the swarm memory bounded context.
//!
//! Both bounded-growth paths (capacity eviction and the retention sweep) are
//! advisory: they never fail the caller, they only announce what was dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entry::EntryId;
use super::pattern::DecisionPattern;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryEvent {
    /// Capacity was reached; the oldest entries were dropped to make room.
    EntriesEvicted {
        count: usize,
        evicted_ids: Vec<EntryId>,
        entry_count: usize,
        max_entries: usize,
        timestamp: DateTime<Utc>,
    },

    /// Entries older than the retention window were deleted.
    RetentionSweep {
        removed: usize,
        cutoff: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A recurring (decision type, winning option) combination was found.
    PatternDetected {
        pattern: DecisionPattern,
        timestamp: DateTime<Utc>,
    },
}

impl MemoryEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MemoryEvent::EntriesEvicted { timestamp, .. } => *timestamp,
            MemoryEvent::RetentionSweep { timestamp, .. } => *timestamp,
            MemoryEvent::PatternDetected { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            MemoryEvent::EntriesEvicted { .. } => "entries_evicted",
            MemoryEvent::RetentionSweep { .. } => "retention_sweep",
            MemoryEvent::PatternDetected { .. } => "pattern_detected",
        }
    }
}
