// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `hivemind-swarm` - Swarm Coordination Crate
//!
//! Registers swarms, routes tasks to them, carries inter-swarm messages and
//! keeps the network healthy and balanced. Decisions that need a human are
//! handed to the HITL orchestrator in `hivemind-core`, and approved decisions
//! come back here for execution.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `SwarmRecord`, `InterSwarmMessage`, `Task`, `ResourcePool`, coordination types |
//! | [`application`] | Application | `SwarmService` trait, `SwarmCoordinator` |
//! | [`runtime`] | Wiring | `HivemindRuntime` |
//!
//! ## Key Concepts
//!
//! - **Swarm**: a named group of agents behind one `DecisionUnit`, with a
//!   purpose that decides which task types it can take.
//! - **Routing**: the highest-scoring capable swarm wins. The score blends
//!   spare capacity, health, success rate and purpose fit.
//! - **Failover**: a degraded or critical health report moves queued tasks
//!   off the swarm and schedules a recovery probe.

pub mod application;
pub mod domain;
pub mod runtime;

pub use application::{SwarmCoordinator, SwarmService};
pub use domain::*;
pub use runtime::HivemindRuntime;
