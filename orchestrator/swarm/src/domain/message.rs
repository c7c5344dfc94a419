// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Inter-swarm messages and the coordinator's queue
//!
//! Messages are transient: enqueued without blocking the caller and consumed
//! by the drain loop. Delivery is best-effort, at most once.

use chrono::{DateTime, Utc};
use hivemind_core::domain::swarm::{Priority, SwarmId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use super::task::Task;

/// Sender id used for messages the coordinator originates itself.
pub const COORDINATOR_ID: &str = "coordinator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Response,
    Broadcast,
    Coordination,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Request => "request",
            MessageType::Response => "response",
            MessageType::Broadcast => "broadcast",
            MessageType::Coordination => "coordination",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterSwarmMessage {
    pub id: String,
    pub from: SwarmId,
    /// `None` addresses every active swarm except the sender
    pub to: Option<SwarmId>,
    pub message_type: MessageType,
    pub priority: Priority,
    #[serde(default)]
    pub content: serde_json::Value,
    /// Routed task carried by a request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    /// Original target when the task was moved by failover or rebalancing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redistributed_from: Option<SwarmId>,
    pub timestamp: DateTime<Utc>,
}

impl InterSwarmMessage {
    pub fn new(
        from: SwarmId,
        to: Option<SwarmId>,
        message_type: MessageType,
        content: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from,
            to,
            message_type,
            priority: Priority::Medium,
            content,
            task: None,
            redistributed_from: None,
            timestamp: Utc::now(),
        }
    }

    pub fn request(from: SwarmId, to: SwarmId, content: serde_json::Value) -> Self {
        Self::new(from, Some(to), MessageType::Request, content)
    }

    pub fn broadcast(from: SwarmId, content: serde_json::Value) -> Self {
        Self::new(from, None, MessageType::Broadcast, content)
    }

    /// Request carrying a routed task, sent on behalf of the coordinator.
    pub fn for_task(to: SwarmId, task: Task) -> Self {
        let mut message = Self::request(
            SwarmId::new(COORDINATOR_ID),
            to,
            serde_json::json!({
                "topic": task.description,
                "task_type": task.task_type,
                "payload": task.payload,
            }),
        );
        message.priority = task.priority;
        message.task = Some(task);
        message
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_task_for(&self, swarm_id: &SwarmId) -> bool {
        self.task.is_some() && self.to.as_ref() == Some(swarm_id)
    }

    /// Re-address a queued task request to another swarm.
    pub fn redirect(&mut self, to: SwarmId) {
        if self.redistributed_from.is_none() {
            self.redistributed_from = self.to.clone();
        }
        self.to = Some(to);
    }
}

/// FIFO message queue; order changes only through [`MessageQueue::reprioritize`].
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: VecDeque<InterSwarmMessage>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: InterSwarmMessage) {
        self.messages.push_back(message);
    }

    /// Take everything currently queued.
    pub fn drain(&mut self) -> Vec<InterSwarmMessage> {
        self.messages.drain(..).collect()
    }

    /// Put deferred messages back ahead of anything enqueued since the drain.
    pub fn requeue_front(&mut self, deferred: Vec<InterSwarmMessage>) {
        for message in deferred.into_iter().rev() {
            self.messages.push_front(message);
        }
    }

    /// Stable sort by priority, most urgent first.
    pub fn reprioritize(&mut self) {
        self.messages
            .make_contiguous()
            .sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Remove and return every message matching `predicate`, keeping the order
    /// of the rest.
    pub fn take_where(
        &mut self,
        mut predicate: impl FnMut(&InterSwarmMessage) -> bool,
    ) -> Vec<InterSwarmMessage> {
        let mut taken = Vec::new();
        let mut kept = VecDeque::with_capacity(self.messages.len());
        for message in self.messages.drain(..) {
            if predicate(&message) {
                taken.push(message);
            } else {
                kept.push_back(message);
            }
        }
        self.messages = kept;
        taken
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut InterSwarmMessage> {
        self.messages.iter_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterSwarmMessage> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(tag: &str, priority: Priority) -> InterSwarmMessage {
        InterSwarmMessage::broadcast(SwarmId::new("a"), serde_json::json!({ "tag": tag }))
            .with_priority(priority)
    }

    fn tags(queue: &MessageQueue) -> Vec<String> {
        queue
            .iter()
            .map(|m| m.content["tag"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_reprioritize_is_stable() {
        let mut queue = MessageQueue::new();
        queue.push(message("low-1", Priority::Low));
        queue.push(message("crit", Priority::Critical));
        queue.push(message("low-2", Priority::Low));
        queue.push(message("high", Priority::High));

        queue.reprioritize();
        assert_eq!(tags(&queue), vec!["crit", "high", "low-1", "low-2"]);
    }

    #[test]
    fn test_requeue_front_preserves_order() {
        let mut queue = MessageQueue::new();
        queue.push(message("a", Priority::Low));
        queue.push(message("b", Priority::Low));
        let drained = queue.drain();
        queue.push(message("c", Priority::Low));

        queue.requeue_front(drained);
        assert_eq!(tags(&queue), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_take_where_and_redirect() {
        let mut queue = MessageQueue::new();
        let target = SwarmId::new("sales");
        queue.push(InterSwarmMessage::for_task(
            target.clone(),
            Task::new("sales", "follow up lead"),
        ));
        queue.push(message("x", Priority::Medium));

        let mut taken = queue.take_where(|m| m.is_task_for(&target));
        assert_eq!(taken.len(), 1);
        assert_eq!(queue.len(), 1);

        taken[0].redirect(SwarmId::new("ops"));
        taken[0].redirect(SwarmId::new("support"));
        assert_eq!(taken[0].to, Some(SwarmId::new("support")));
        assert_eq!(taken[0].redistributed_from, Some(target));
    }
}
