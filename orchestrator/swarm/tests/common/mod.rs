// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Shared fixtures: a scripted decision unit and a coordinator harness.

#![allow(dead_code)]

use async_trait::async_trait;
use hivemind_core::application::HitlSubmission;
use hivemind_core::domain::config::CoordinatorConfig;
use hivemind_core::domain::decision::{
    Decision, DecisionUnit, DecisionUnitError, DecisionUnitEvent, EmergencyResponse,
};
use hivemind_core::domain::events::SwarmEvent;
use hivemind_core::domain::swarm::{HealthReport, Priority};
use hivemind_core::infrastructure::{DomainEvent, EventBus, EventReceiver};
use hivemind_cortex::{MemoryConfig, StandardSwarmMemory};
use hivemind_swarm::application::SwarmCoordinator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub struct ScriptedUnit {
    events: broadcast::Sender<DecisionUnitEvent>,
    option: String,
    confidence: f64,
    health: Mutex<f64>,
    fail: AtomicBool,
    requires_human: bool,
    delay: Option<Duration>,
    actions: Vec<String>,
    calls: AtomicUsize,
}

impl ScriptedUnit {
    pub fn new(option: &str, confidence: f64) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            option: option.to_string(),
            confidence,
            health: Mutex::new(1.0),
            fail: AtomicBool::new(false),
            requires_human: false,
            delay: None,
            actions: vec!["contain".to_string()],
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::SeqCst);
        self
    }

    pub fn requiring_human(mut self) -> Self {
        self.requires_human = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_actions(mut self, actions: &[&str]) -> Self {
        self.actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn set_health(&self, score: f64) {
        *self.health.lock() = score;
    }

    pub fn emit(&self, event: DecisionUnitEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn step(&self) -> Result<(), DecisionUnitError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(DecisionUnitError::Unavailable("queen offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DecisionUnit for ScriptedUnit {
    async fn make_strategic_decision(
        &self,
        topic: &str,
        _context: &serde_json::Value,
    ) -> Result<Decision, DecisionUnitError> {
        self.step().await?;
        let decision = Decision::new("queen", topic, "strategy", &self.option, self.confidence);
        Ok(if self.requires_human {
            decision.requiring_human_judgment()
        } else {
            decision
        })
    }

    async fn handle_emergency(
        &self,
        _kind: &str,
        severity: Priority,
        _context: &serde_json::Value,
    ) -> Result<EmergencyResponse, DecisionUnitError> {
        self.step().await?;
        Ok(EmergencyResponse {
            actions: self.actions.clone(),
            priority: severity,
            summary: "contained".to_string(),
            confidence: self.confidence,
        })
    }

    async fn monitor_swarm_health(&self) -> Result<HealthReport, DecisionUnitError> {
        self.step().await?;
        Ok(HealthReport::new(*self.health.lock()))
    }

    fn subscribe(&self) -> broadcast::Receiver<DecisionUnitEvent> {
        self.events.subscribe()
    }
}

pub struct Harness {
    pub coordinator: Arc<SwarmCoordinator>,
    pub memory: Arc<StandardSwarmMemory>,
    pub events: EventReceiver,
    pub hitl: mpsc::UnboundedReceiver<HitlSubmission>,
}

pub fn harness(config: CoordinatorConfig) -> Harness {
    let event_bus = EventBus::new(4096);
    let events = event_bus.subscribe();
    let memory = Arc::new(StandardSwarmMemory::new(
        MemoryConfig::default(),
        Arc::new(event_bus.clone()),
    ));
    let (hitl_tx, hitl) = mpsc::unbounded_channel();
    let coordinator = Arc::new(
        SwarmCoordinator::new(config, memory.clone(), event_bus).with_hitl_intake(hitl_tx),
    );
    Harness {
        coordinator,
        memory,
        events,
        hitl,
    }
}

pub fn swarm_events(events: &mut EventReceiver) -> Vec<SwarmEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::Swarm(event) = event {
            out.push(event);
        }
    }
    out
}
