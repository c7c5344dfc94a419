// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Swarm Domain Layer
//!
//! Pure domain types for swarm coordination. No I/O dependencies.
//!
//! | Module | Key Types |
//! |--------|-----------|
//! | [`swarm`] | `SwarmRecord`, `SwarmState`, `SwarmMetrics`, `SwarmError` |
//! | [`message`] | `InterSwarmMessage`, `MessageType`, `MessageQueue` |
//! | [`task`] | `Task`, `TaskProfile`, routing score, load variance |
//! | [`resources`] | `ResourcePool` |
//! | [`coordination`] | coordination, emergency and optimization types |

pub mod coordination;
pub mod message;
pub mod resources;
pub mod swarm;
pub mod task;

pub use coordination::*;
pub use message::*;
pub use resources::*;
pub use swarm::*;
pub use task::*;
