// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Shared swarm memory for the hivemind network.
//!
//! # Architecture
//!
//! - **Layer:** Memory Layer
//! - **Purpose:** Bounded, indexed store of decisions, reports and audit entries

pub mod application;
pub mod domain;

pub use application::*;
pub use domain::*;
