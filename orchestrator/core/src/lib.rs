// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Shared domain kernel and human-in-the-loop decision engine.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Decision unit contracts, HITL orchestration, event bus, configuration

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
