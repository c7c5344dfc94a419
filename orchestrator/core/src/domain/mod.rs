// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the shared hivemind domain kernel.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Identifiers, decision units, HITL state machine, configuration, events

pub mod config;
pub mod decision;
pub mod events;
pub mod execution;
pub mod hitl;
pub mod learning;
pub mod review;
pub mod swarm;
