// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Hivemind Runtime
//!
//! Wires one hivemind node together from a validated [`HivemindConfig`]:
//!
//! ```text
//! DecisionUnit ──► SwarmCoordinator ──(HitlSubmission)──► HitlOrchestrator
//!                        ▲                                   │      ▲
//!                        └──────── DecisionExecutor ◄────────┘      │
//!                                                   HumanReviewGateway ─► ReviewCompleted
//! ```
//!
//! Every component shares the same [`EventBus`] and [`StandardSwarmMemory`].
//! [`HivemindRuntime::start`] launches the background loops; calling it twice
//! is a no-op. [`HivemindRuntime::shutdown`] cancels them all and waits.

use anyhow::{Context, Result};
use hivemind_core::application::{HitlOrchestrator, HitlSubmission, ReviewTimeoutMonitor};
use hivemind_core::domain::config::HivemindConfig;
use hivemind_core::domain::review::{HumanReviewGateway, ReviewCompleted};
use hivemind_core::infrastructure::{EventBus, HumanReviewService};
use hivemind_cortex::{RetentionSweeper, RetentionSweeperConfig, StandardSwarmMemory, SwarmMemory};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::application::SwarmCoordinator;

pub struct HivemindRuntime {
    config: HivemindConfig,
    event_bus: EventBus,
    memory: Arc<StandardSwarmMemory>,
    coordinator: Arc<SwarmCoordinator>,
    orchestrator: Arc<HitlOrchestrator>,
    sweeper: Arc<RetentionSweeper>,
    timeout_monitor: Arc<ReviewTimeoutMonitor>,
    hitl_rx: Mutex<Option<mpsc::UnboundedReceiver<HitlSubmission>>>,
    review_tx: Option<mpsc::UnboundedSender<ReviewCompleted>>,
    review_rx: Mutex<Option<mpsc::UnboundedReceiver<ReviewCompleted>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

impl HivemindRuntime {
    /// Build a runtime around an external review gateway. Review answers are
    /// fed back through [`HivemindRuntime::review_completion_sender`].
    pub fn new(config: HivemindConfig, review_gateway: Arc<dyn HumanReviewGateway>) -> Result<Self> {
        let (review_tx, review_rx) = mpsc::unbounded_channel();
        Self::assemble(config, review_gateway, Some(review_tx), review_rx)
    }

    /// Build a runtime with the in-process [`HumanReviewService`] as its
    /// review gateway.
    pub fn with_review_service(config: HivemindConfig) -> Result<(Self, Arc<HumanReviewService>)> {
        let (service, review_rx) = HumanReviewService::new();
        let service = Arc::new(service);
        let runtime = Self::assemble(config, service.clone(), None, review_rx)?;
        Ok((runtime, service))
    }

    fn assemble(
        config: HivemindConfig,
        review_gateway: Arc<dyn HumanReviewGateway>,
        review_tx: Option<mpsc::UnboundedSender<ReviewCompleted>>,
        review_rx: mpsc::UnboundedReceiver<ReviewCompleted>,
    ) -> Result<Self> {
        config
            .validate()
            .with_context(|| format!("invalid hivemind config '{}'", config.metadata.name))?;
        let spec = &config.spec;

        let event_bus = EventBus::with_default_capacity();
        let memory = Arc::new(StandardSwarmMemory::new(
            spec.memory.clone(),
            Arc::new(event_bus.clone()),
        ));
        let shared_memory: Arc<dyn SwarmMemory> = memory.clone();

        let (hitl_tx, hitl_rx) = mpsc::unbounded_channel();
        let coordinator = Arc::new(
            SwarmCoordinator::new(
                spec.coordinator.clone(),
                shared_memory.clone(),
                event_bus.clone(),
            )
            .with_hitl_intake(hitl_tx),
        );
        let orchestrator = Arc::new(HitlOrchestrator::new(
            spec.hitl.clone(),
            shared_memory.clone(),
            coordinator.clone(),
            review_gateway,
            event_bus.clone(),
        ));

        let sweeper = Arc::new(RetentionSweeper::new(
            shared_memory,
            RetentionSweeperConfig::from(&spec.memory),
        ));
        let timeout_monitor = Arc::new(ReviewTimeoutMonitor::new(orchestrator.clone()));

        debug!(node = %config.metadata.name, "Hivemind runtime assembled");
        Ok(Self {
            config,
            event_bus,
            memory,
            coordinator,
            orchestrator,
            sweeper,
            timeout_monitor,
            hitl_rx: Mutex::new(Some(hitl_rx)),
            review_tx,
            review_rx: Mutex::new(Some(review_rx)),
            handles: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        })
    }

    /// Launch the coordinator loops, the HITL consumers, the retention
    /// sweeper and the review timeout monitor.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Hivemind runtime already started");
            return;
        }

        let mut handles = self.coordinator.start();
        if let Some(rx) = self.hitl_rx.lock().take() {
            handles.push(self.orchestrator.spawn_intake(rx));
        }
        if let Some(rx) = self.review_rx.lock().take() {
            handles.push(self.orchestrator.spawn_review_listener(rx));
        }
        handles.push(self.sweeper.clone().start());
        handles.push(self.timeout_monitor.clone().start());

        info!(
            node = %self.config.metadata.name,
            tasks = handles.len(),
            "Hivemind runtime started"
        );
        self.handles.lock().extend(handles);
    }

    /// Cancel every background task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown();
        self.orchestrator.shutdown();
        self.sweeper.shutdown_token().cancel();
        self.timeout_monitor.shutdown_token().cancel();

        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }
        info!(node = %self.config.metadata.name, "Hivemind runtime stopped");
    }

    pub fn config(&self) -> &HivemindConfig {
        &self.config
    }

    pub fn coordinator(&self) -> Arc<SwarmCoordinator> {
        self.coordinator.clone()
    }

    pub fn orchestrator(&self) -> Arc<HitlOrchestrator> {
        self.orchestrator.clone()
    }

    pub fn memory(&self) -> Arc<StandardSwarmMemory> {
        self.memory.clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Where an external gateway delivers review answers. `None` when the
    /// runtime was built with its own [`HumanReviewService`].
    pub fn review_completion_sender(&self) -> Option<mpsc::UnboundedSender<ReviewCompleted>> {
        self.review_tx.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = HivemindConfig::default();
        config.spec.coordinator.resources_per_swarm = config.spec.coordinator.total_resources + 1;
        assert!(HivemindRuntime::with_review_service(config).is_err());
    }

    #[tokio::test]
    async fn test_start_twice_then_shutdown() {
        let (runtime, _service) = HivemindRuntime::with_review_service(HivemindConfig::default())
            .expect("default config is valid");
        assert!(runtime.review_completion_sender().is_none());

        runtime.start();
        let launched = runtime.handles.lock().len();
        runtime.start();
        assert_eq!(runtime.handles.lock().len(), launched);

        runtime.shutdown().await;
        assert!(runtime.handles.lock().is_empty());
    }
}
