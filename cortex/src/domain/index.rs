// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Indexed entry table backing swarm memory.
//!
//! The entry map and its three secondary indices (type, tag, UTC day bucket)
//! are only ever mutated together through [`MemoryIndex::insert`] and
//! [`MemoryIndex::remove`], so an index can never reference a missing entry.
//! Callers serialize access with a single lock around the whole structure.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::entry::{EntryId, EntryType, MemoryEntry, MemoryQuery};

#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: HashMap<EntryId, MemoryEntry>,
    by_type: HashMap<EntryType, HashSet<EntryId>>,
    by_tag: HashMap<String, HashSet<EntryId>>,
    by_day: BTreeMap<NaiveDate, HashSet<EntryId>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &EntryId) -> Option<&MemoryEntry> {
        self.entries.get(id)
    }

    /// Insert or overwrite. Returns the replaced entry, if any.
    pub fn insert(&mut self, entry: MemoryEntry) -> Option<MemoryEntry> {
        let previous = self.remove(&entry.id);

        let id = entry.id.clone();
        self.by_type.entry(entry.entry_type).or_default().insert(id.clone());
        for tag in &entry.tags {
            self.by_tag.entry(tag.clone()).or_default().insert(id.clone());
        }
        self.by_day
            .entry(entry.timestamp.date_naive())
            .or_default()
            .insert(id.clone());
        self.entries.insert(id, entry);

        previous
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<MemoryEntry> {
        let entry = self.entries.remove(id)?;

        detach(&mut self.by_type, &entry.entry_type, id);
        for tag in &entry.tags {
            detach(&mut self.by_tag, tag, id);
        }
        let day = entry.timestamp.date_naive();
        if let Some(bucket) = self.by_day.get_mut(&day) {
            bucket.remove(id);
            if bucket.is_empty() {
                self.by_day.remove(&day);
            }
        }

        Some(entry)
    }

    /// Remove the `count` oldest entries by timestamp (ties by id).
    pub fn evict_oldest(&mut self, count: usize) -> Vec<MemoryEntry> {
        if count == 0 {
            return Vec::new();
        }

        // Walk day buckets oldest-first; every entry older than the cut lives
        // in a fully collected bucket.
        let mut candidates: Vec<(DateTime<Utc>, EntryId)> = Vec::new();
        for bucket in self.by_day.values() {
            candidates.extend(
                bucket
                    .iter()
                    .filter_map(|id| self.entries.get(id).map(|e| (e.timestamp, id.clone()))),
            );
            if candidates.len() >= count {
                break;
            }
        }
        candidates.sort();
        candidates.truncate(count);

        candidates
            .into_iter()
            .filter_map(|(_, id)| self.remove(&id))
            .collect()
    }

    /// Remove every entry strictly older than `cutoff`.
    pub fn remove_older_than(&mut self, cutoff: DateTime<Utc>) -> Vec<MemoryEntry> {
        let expired: Vec<EntryId> = self
            .by_day
            .range(..=cutoff.date_naive())
            .flat_map(|(_, bucket)| bucket.iter())
            .filter(|id| {
                self.entries
                    .get(*id)
                    .map(|e| e.timestamp < cutoff)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        expired.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Entries of one type, unordered.
    pub fn entries_of_type(&self, entry_type: EntryType) -> impl Iterator<Item = &MemoryEntry> {
        self.by_type
            .get(&entry_type)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.entries.get(id))
    }

    pub fn counts_by_type(&self) -> HashMap<EntryType, usize> {
        self.by_type
            .iter()
            .map(|(entry_type, ids)| (*entry_type, ids.len()))
            .collect()
    }

    /// Index-driven retrieval: intersect the matching index sets, then apply
    /// the exact date and relevance filters. Sorted by relevance descending,
    /// then recency descending.
    pub fn query(&self, query: &MemoryQuery) -> Vec<MemoryEntry> {
        let mut results: Vec<&MemoryEntry> = match self.candidate_ids(query) {
            Some(ids) => ids.into_iter().filter_map(|id| self.entries.get(id)).collect(),
            None => self.entries.values().collect(),
        };

        results.retain(|entry| {
            query.start_date.map_or(true, |start| entry.timestamp >= start)
                && query.end_date.map_or(true, |end| entry.timestamp <= end)
                && query
                    .relevance_threshold
                    .map_or(true, |threshold| entry.relevance >= threshold)
        });

        results.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.timestamp.cmp(&a.timestamp))
                .then(a.id.cmp(&b.id))
        });

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }
        results.into_iter().cloned().collect()
    }

    /// `None` means "no index filter applies": every entry is a candidate.
    fn candidate_ids(&self, query: &MemoryQuery) -> Option<HashSet<&EntryId>> {
        let mut sets: Vec<&HashSet<EntryId>> = Vec::new();

        if let Some(entry_type) = &query.entry_type {
            match self.by_type.get(entry_type) {
                Some(set) => sets.push(set),
                None => return Some(HashSet::new()),
            }
        }
        for tag in &query.tags {
            match self.by_tag.get(tag) {
                Some(set) => sets.push(set),
                None => return Some(HashSet::new()),
            }
        }

        let mut candidates: HashSet<&EntryId> = match self.day_range_ids(query) {
            Some(dates) => dates,
            None => {
                sets.sort_by_key(|set| set.len());
                let smallest = sets.first().copied()?;
                smallest.iter().collect()
            }
        };

        for set in &sets {
            candidates.retain(|id| set.contains(*id));
        }
        Some(candidates)
    }

    fn day_range_ids(&self, query: &MemoryQuery) -> Option<HashSet<&EntryId>> {
        let start = query.start_date.map(|d| d.date_naive());
        let end = query.end_date.map(|d| d.date_naive());

        let buckets: Vec<&HashSet<EntryId>> = match (start, end) {
            (None, None) => return None,
            (Some(s), Some(e)) if s > e => Vec::new(),
            (Some(s), Some(e)) => self.by_day.range(s..=e).map(|(_, b)| b).collect(),
            (Some(s), None) => self.by_day.range(s..).map(|(_, b)| b).collect(),
            (None, Some(e)) => self.by_day.range(..=e).map(|(_, b)| b).collect(),
        };

        Some(buckets.into_iter().flat_map(|b| b.iter()).collect())
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        fn indexed<'a>(
            entries: &HashMap<EntryId, MemoryEntry>,
            mut sets: impl Iterator<Item = &'a HashSet<EntryId>>,
        ) -> bool {
            sets.all(|set| !set.is_empty() && set.iter().all(|id| entries.contains_key(id)))
        }

        let every_entry_indexed = self.entries.values().all(|entry| {
            self.by_type
                .get(&entry.entry_type)
                .map_or(false, |s| s.contains(&entry.id))
                && entry
                    .tags
                    .iter()
                    .all(|t| self.by_tag.get(t).map_or(false, |s| s.contains(&entry.id)))
                && self
                    .by_day
                    .get(&entry.timestamp.date_naive())
                    .map_or(false, |s| s.contains(&entry.id))
        });

        indexed(&self.entries, self.by_type.values())
            && indexed(&self.entries, self.by_tag.values())
            && indexed(&self.entries, self.by_day.values())
            && every_entry_indexed
    }
}

fn detach<K>(index: &mut HashMap<K, HashSet<EntryId>>, key: &K, id: &EntryId)
where
    K: std::hash::Hash + Eq,
{
    if let Some(set) = index.get_mut(key) {
        set.remove(id);
        if set.is_empty() {
            index.remove(key);
        }
    }
}
