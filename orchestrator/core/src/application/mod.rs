// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the HITL application services.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Decision gating, learning, review timeout enforcement

pub mod hitl_orchestrator;
pub mod learning;
pub mod review_timeout_monitor;

pub use hitl_orchestrator::{HitlError, HitlOrchestrator, HitlSubmission, TimeoutOutcome};
pub use learning::LearningTracker;
pub use review_timeout_monitor::ReviewTimeoutMonitor;
