// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Shared resource pool
//!
//! A lock-free counter enforcing `allocated <= total`. Allocations may be
//! partial: callers get whatever is left, possibly zero.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
pub struct ResourcePool {
    total: u32,
    allocated: AtomicU32,
}

/// Point-in-time view of a [`ResourcePool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub total: u32,
    pub allocated: u32,
    pub available: u32,
}

impl ResourcePool {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            allocated: AtomicU32::new(0),
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn allocated(&self) -> u32 {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn available(&self) -> u32 {
        self.total.saturating_sub(self.allocated())
    }

    /// Allocate up to `requested` units and return how many were granted.
    pub fn allocate(&self, requested: u32) -> u32 {
        let mut current = self.allocated.load(Ordering::Acquire);
        loop {
            let granted = requested.min(self.total.saturating_sub(current));
            if granted == 0 {
                return 0;
            }
            match self.allocated.compare_exchange_weak(
                current,
                current + granted,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return granted,
                Err(actual) => current = actual,
            }
        }
    }

    /// Return units to the pool. Releasing more than is allocated empties it.
    pub fn release(&self, amount: u32) {
        let _ = self
            .allocated
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_sub(amount))
            });
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        let allocated = self.allocated();
        ResourceSnapshot {
            total: self.total,
            allocated,
            available: self.total.saturating_sub(allocated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_partial_allocation() {
        let pool = ResourcePool::new(25);
        assert_eq!(pool.allocate(10), 10);
        assert_eq!(pool.allocate(10), 10);
        assert_eq!(pool.allocate(10), 5);
        assert_eq!(pool.allocate(10), 0);
        assert_eq!(pool.available(), 0);

        pool.release(7);
        assert_eq!(pool.snapshot().available, 7);
        pool.release(100);
        assert_eq!(pool.allocated(), 0);
    }

    #[test]
    fn test_concurrent_allocation_never_oversubscribes() {
        let pool = Arc::new(ResourcePool::new(100));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || (0..50).map(|_| pool.allocate(1)).sum::<u32>())
            })
            .collect();

        let granted: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 100);
        assert_eq!(pool.allocated(), 100);
    }
}
