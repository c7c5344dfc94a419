// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Domain Events
//
// In-memory event streaming over tokio broadcast channels. Swarm, HITL and
// memory notifications share one typed stream; slow receivers lag rather
// than block publishers.

use async_trait::async_trait;
use hivemind_cortex::MemoryEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::{HitlEvent, SwarmEvent};
use crate::domain::swarm::DecisionId;

/// Unified domain event type for the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum DomainEvent {
    Swarm(SwarmEvent),
    Hitl(HitlEvent),
    Memory(MemoryEvent),
}

/// Event bus for publishing and subscribing to domain events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<DomainEvent>>,
}

impl EventBus {
    /// Capacity is how many events are buffered before the oldest are
    /// dropped for lagging receivers
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    pub fn publish_swarm_event(&self, event: SwarmEvent) {
        self.publish(DomainEvent::Swarm(event));
    }

    pub fn publish_hitl_event(&self, event: HitlEvent) {
        self.publish(DomainEvent::Hitl(event));
    }

    pub fn publish_memory_event(&self, event: MemoryEvent) {
        self.publish(DomainEvent::Memory(event));
    }

    /// Publish a domain event to all subscribers
    pub fn publish(&self, event: DomainEvent) {
        debug!("Publishing event: {:?}", event);

        let receiver_count = self.sender.send(event).unwrap_or(0);
        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe to the HITL events of a single decision
    pub fn subscribe_decision(&self, decision_id: DecisionId) -> DecisionEventReceiver {
        DecisionEventReceiver {
            receiver: self.sender.subscribe(),
            decision_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl hivemind_cortex::EventBus for EventBus {
    async fn publish(&self, event: MemoryEvent) -> anyhow::Result<()> {
        self.publish_memory_event(event);
        Ok(())
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Receiver for all domain events
pub struct EventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until one is available)
    pub async fn recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<DomainEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver filtered to one HITL decision
pub struct DecisionEventReceiver {
    receiver: broadcast::Receiver<DomainEvent>,
    decision_id: DecisionId,
}

impl DecisionEventReceiver {
    pub async fn recv(&mut self) -> Result<HitlEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if let DomainEvent::Hitl(hitl_event) = event {
                if hitl_event_decision(&hitl_event) == Some(self.decision_id) {
                    return Ok(hitl_event);
                }
            }
        }
    }
}

fn hitl_event_decision(event: &HitlEvent) -> Option<DecisionId> {
    match event {
        HitlEvent::DecisionCreated { decision_id, .. }
        | HitlEvent::ReviewRequested { decision_id, .. }
        | HitlEvent::DecisionAutoExecuted { decision_id, .. }
        | HitlEvent::AutoExecutionFailed { decision_id, .. }
        | HitlEvent::DecisionApproved { decision_id, .. }
        | HitlEvent::DecisionExecuted { decision_id, .. }
        | HitlEvent::DecisionRejected { decision_id, .. }
        | HitlEvent::DecisionModified { decision_id, .. }
        | HitlEvent::DecisionEscalated { decision_id, .. }
        | HitlEvent::DecisionCancelled { decision_id, .. }
        | HitlEvent::ExecutionFailed { decision_id, .. }
        | HitlEvent::ReviewTimedOut { decision_id, .. } => Some(*decision_id),
        HitlEvent::ThresholdRecommended { .. } => None,
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}
