// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the hivemind infrastructure adapters.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Event bus, review queue, logging setup

pub mod event_bus;
pub mod human_review_service;
pub mod telemetry;

pub use event_bus::{DomainEvent, EventBus, EventBusError, EventReceiver};
pub use human_review_service::{HumanReviewService, PendingReviewInfo};
pub use telemetry::init_logging;
