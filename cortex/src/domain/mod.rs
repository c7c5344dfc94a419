// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the swarm memory domain model.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Entries, queries, the indexed entry table, decision patterns

pub mod entry;
pub mod index;
pub mod pattern;
pub mod events;

pub use entry::*;
pub use index::*;
pub use pattern::*;
pub use events::*;
