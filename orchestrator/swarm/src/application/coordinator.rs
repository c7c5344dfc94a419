// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SwarmCoordinator - Registry, Routing and Inter-Swarm Messaging
//!
//! Owns every [`SwarmRecord`], the inter-swarm message queue and the shared
//! resource pool. Four background loops run once [`SwarmCoordinator::start`]
//! is called:
//!
//! | Loop | Interval | Work |
//! |------|----------|------|
//! | messages | `message_interval_ms` | drain the queue, dispatch by type |
//! | health | `health_check_interval_seconds` | probe decision units, fail over / recover |
//! | load balance | `load_balance_interval_seconds` | move queued tasks when load variance > 0.3 |
//! | unit events | on arrival | decisions, emergencies and health reports pushed by units |
//!
//! Every decision-unit call is bounded by `call_timeout_seconds`; a failed or
//! timed-out call marks that swarm `error` / `critical` without touching its
//! siblings. Loops never stop on a bad item: failures become events.
//!
//! The coordinator is also the production [`DecisionExecutor`] for the HITL
//! orchestrator.

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use hivemind_core::application::HitlSubmission;
use hivemind_core::domain::config::{CoordinatorConfig, FailoverStrategy};
use hivemind_core::domain::decision::{Decision, DecisionUnit, DecisionUnitError, DecisionUnitEvent};
use hivemind_core::domain::events::SwarmEvent;
use hivemind_core::domain::execution::{
    DecisionExecutor, ExecutionError, ExecutionRequest, ExecutionResult, RejectionNotice,
};
use hivemind_core::domain::swarm::{HealthReport, HealthStatus, Priority, SwarmId};
use hivemind_core::infrastructure::EventBus;
use hivemind_cortex::{DecisionRecord, EntryId, EntryType, MemoryEntry, SwarmMemory};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::SwarmService;
use crate::domain::{
    load_of, load_variance, purpose_match, route_score, select_best, synthesize, Bottleneck,
    Contribution, CoordinatedResponse, CoordinationRequest, CoordinationResult, CoordinationType,
    DecisionTally, GlobalEmergency, InterSwarmMessage, LoadRebalance, MessageQueue, MessageType,
    NetworkOptimization, Recommendation, RecommendationKind, ResourcePool, ResourceSnapshot,
    RoutingDecision, SwarmError, SwarmRecord, SwarmState, Task, MAX_EMERGENCY_RESPONDERS,
    QUEUE_DEPTH_THRESHOLD, REBALANCE_SEVERITY_THRESHOLD, UTILIZATION_THRESHOLD,
};

type UnitEvent = (SwarmId, DecisionUnitEvent);

struct SwarmEntry {
    record: SwarmRecord,
    unit: Arc<dyn DecisionUnit>,
    forwarder: CancellationToken,
    tally: DecisionTally,
}

#[derive(Default)]
struct Registry {
    order: Vec<SwarmId>,
    swarms: HashMap<SwarmId, SwarmEntry>,
}

impl Registry {
    fn ordered(&self) -> impl Iterator<Item = &SwarmEntry> {
        self.order.iter().filter_map(|id| self.swarms.get(id))
    }

    fn best_candidate(&self, task_type: &str, exclude: Option<&SwarmId>) -> Option<(SwarmId, f64)> {
        let scored = self
            .ordered()
            .map(|entry| &entry.record)
            .filter(|record| record.is_routable() && Some(&record.id) != exclude)
            .filter_map(|record| {
                purpose_match(&record.purpose, task_type).map(|matched| {
                    let score = route_score(
                        record.status.current_tasks,
                        record.status.health,
                        record.metrics.success_rate,
                        matched,
                    );
                    (record.id.clone(), score)
                })
            });
        select_best(scored)
    }
}

enum HealthFollowUp {
    Nothing,
    FailOver(Arc<dyn DecisionUnit>),
    Recovered,
}

pub struct SwarmCoordinator {
    config: CoordinatorConfig,
    registry: RwLock<Registry>,
    queue: Mutex<MessageQueue>,
    resources: ResourcePool,
    memory: Arc<dyn SwarmMemory>,
    event_bus: EventBus,
    hitl_intake: Option<mpsc::UnboundedSender<HitlSubmission>>,
    unit_events_tx: mpsc::UnboundedSender<UnitEvent>,
    unit_events_rx: Mutex<Option<mpsc::UnboundedReceiver<UnitEvent>>>,
    emergency_pauses: AtomicUsize,
    shutdown_token: CancellationToken,
}

impl SwarmCoordinator {
    pub fn new(config: CoordinatorConfig, memory: Arc<dyn SwarmMemory>, event_bus: EventBus) -> Self {
        let (unit_events_tx, unit_events_rx) = mpsc::unbounded_channel();
        Self {
            resources: ResourcePool::new(config.total_resources),
            config,
            registry: RwLock::new(Registry::default()),
            queue: Mutex::new(MessageQueue::new()),
            memory,
            event_bus,
            hitl_intake: None,
            unit_events_tx,
            unit_events_rx: Mutex::new(Some(unit_events_rx)),
            emergency_pauses: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Decisions that require human judgment are sent here.
    pub fn with_hitl_intake(mut self, intake: mpsc::UnboundedSender<HitlSubmission>) -> Self {
        self.hitl_intake = Some(intake);
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn resource_pool(&self) -> ResourceSnapshot {
        self.resources.snapshot()
    }

    /// Copy of the queue in processing order
    pub fn queued_messages(&self) -> Vec<InterSwarmMessage> {
        self.queue.lock().iter().cloned().collect()
    }

    /// True while a global emergency is being handled
    pub fn is_paused(&self) -> bool {
        self.emergency_pauses.load(Ordering::SeqCst) > 0
    }

    /// Launch the message, health, load-balance and unit-event loops.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = vec![
            self.spawn_periodic("message", self.config.message_interval(), |c| async move {
                c.process_messages().await;
            }),
            self.spawn_periodic("health", self.config.health_check_interval(), |c| async move {
                c.run_health_checks().await;
            }),
            self.spawn_periodic(
                "load balance",
                self.config.load_balance_interval(),
                |c| async move {
                    c.rebalance_load().await;
                },
            ),
        ];
        if let Some(handle) = self.spawn_unit_event_loop() {
            handles.push(handle);
        }
        info!(loops = handles.len(), "Swarm coordinator started");
        handles
    }

    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
    }

    fn spawn_periodic<F, Fut>(self: &Arc<Self>, name: &'static str, period: Duration, work: F) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let coordinator = self.clone();
        let token = self.shutdown_token.clone();
        let period = period.max(Duration::from_millis(1));
        tokio::spawn(async move {
            debug!(loop_name = name, period_ms = period.as_millis() as u64, "Starting coordinator loop");
            let mut tick = tokio::time::interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = tick.tick() => work(coordinator.clone()).await,
                    _ = token.cancelled() => break,
                }
            }
            debug!(loop_name = name, "Coordinator loop stopped");
        })
    }

    fn spawn_unit_event_loop(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let Some(mut rx) = self.unit_events_rx.lock().take() else {
            warn!("Unit event loop already running");
            return None;
        };
        let coordinator = self.clone();
        let token = self.shutdown_token.clone();
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        let Some((swarm_id, event)) = event else { break };
                        coordinator.handle_unit_event(&swarm_id, event).await;
                    }
                    _ = token.cancelled() => break,
                }
            }
            debug!("Unit event loop stopped");
        }))
    }

    async fn handle_unit_event(&self, swarm_id: &SwarmId, event: DecisionUnitEvent) {
        match event {
            DecisionUnitEvent::DecisionMade { decision } => {
                if let Err(e) = self.handle_decision_made(swarm_id, decision).await {
                    warn!(swarm_id = %swarm_id, "Dropped decision event: {}", e);
                }
            }
            DecisionUnitEvent::EmergencyHandled { response } => {
                let now = Utc::now();
                self.touch(swarm_id).await;
                self.remember(
                    MemoryEntry::new(
                        EntryId::generate("emergency"),
                        EntryType::Emergency,
                        serde_json::json!({ "swarm_id": swarm_id, "response": response }),
                    )
                    .with_relevance(response.confidence)
                    .with_tags(["emergency".to_string(), format!("swarm:{}", swarm_id)]),
                )
                .await;
                self.event_bus.publish_swarm_event(SwarmEvent::EmergencyHandled {
                    swarm_id: swarm_id.clone(),
                    priority: response.priority,
                    summary: response.summary,
                    handled_at: now,
                });
            }
            DecisionUnitEvent::HealthReport { report } => {
                self.apply_health_report(swarm_id, report).await;
            }
        }
    }

    /// Record a decision, refresh the swarm's metrics and hand it to HITL
    /// when it requires human judgment.
    pub async fn handle_decision_made(
        &self,
        swarm_id: &SwarmId,
        decision: Decision,
    ) -> Result<(), SwarmError> {
        let now = Utc::now();
        {
            let mut registry = self.registry.write().await;
            let entry = registry
                .swarms
                .get_mut(swarm_id)
                .ok_or_else(|| SwarmError::NotFound(swarm_id.clone()))?;
            entry.tally.record(&decision, now);
            entry.tally.apply(&mut entry.record.metrics, now);
            entry.record.touch(now);
        }

        let record = DecisionRecord {
            decision_id: decision.id.to_string(),
            swarm_id: swarm_id.to_string(),
            decision_type: decision.decision_type.clone(),
            topic: decision.topic.clone(),
            winning_option: decision.winning_option.clone(),
            confidence: decision.confidence,
            successful: decision.legitimate,
            recorded_at: now,
        };
        if let Err(e) = self.memory.store_decision(record).await {
            warn!(swarm_id = %swarm_id, decision_id = %decision.id, "Failed to store decision: {}", e);
        }

        debug!(
            swarm_id = %swarm_id,
            decision_id = %decision.id,
            requires_human = decision.requires_human_judgment,
            "Decision recorded"
        );
        self.event_bus.publish_swarm_event(SwarmEvent::DecisionRecorded {
            swarm_id: swarm_id.clone(),
            decision_id: decision.id,
            requires_human_judgment: decision.requires_human_judgment,
            recorded_at: now,
        });

        if decision.requires_human_judgment {
            self.hand_to_hitl(swarm_id, decision);
        }
        Ok(())
    }

    fn hand_to_hitl(&self, swarm_id: &SwarmId, decision: Decision) {
        let Some(intake) = &self.hitl_intake else {
            warn!(swarm_id = %swarm_id, decision_id = %decision.id, "No HITL intake configured");
            return;
        };
        let decision_id = decision.id;
        let submission = HitlSubmission {
            swarm_id: swarm_id.clone(),
            decision,
        };
        if intake.send(submission).is_err() {
            warn!(swarm_id = %swarm_id, decision_id = %decision_id, "HITL intake closed");
        }
    }

    /// Drain everything queued and dispatch it. Returns how many messages
    /// were processed successfully.
    pub async fn process_messages(&self) -> usize {
        let batch = self.queue.lock().drain();
        if batch.is_empty() {
            return 0;
        }

        let batch = if self.is_paused() {
            let (critical, deferred): (Vec<_>, Vec<_>) = batch
                .into_iter()
                .partition(|m| m.priority == Priority::Critical);
            if !deferred.is_empty() {
                debug!(deferred = deferred.len(), "Emergency in progress, deferring messages");
                self.queue.lock().requeue_front(deferred);
            }
            critical
        } else {
            batch
        };

        let mut processed = 0;
        for message in batch {
            let message_id = message.id.clone();
            let from = message.from.clone();
            let to = message.to.clone();
            let message_type = message.message_type;

            match self.dispatch(message).await {
                Ok(()) => {
                    processed += 1;
                    metrics::counter!(
                        "hivemind_messages_processed_total",
                        "type" => message_type.as_str()
                    )
                    .increment(1);
                }
                Err(e) => {
                    metrics::counter!("hivemind_message_failures_total").increment(1);
                    warn!(message_id = %message_id, from = %from, "Message processing failed: {}", e);
                    self.event_bus.publish_swarm_event(SwarmEvent::MessageFailed {
                        message_id,
                        from,
                        to,
                        error: e.to_string(),
                        failed_at: Utc::now(),
                    });
                }
            }
        }
        processed
    }

    async fn dispatch(&self, message: InterSwarmMessage) -> Result<(), SwarmError> {
        match message.message_type {
            MessageType::Request => self.handle_request(message).await,
            MessageType::Response => {
                let to = message.to.clone().ok_or_else(|| {
                    SwarmError::InvalidRequest("response without recipient".to_string())
                })?;
                self.deliver(&message, vec![to]).await
            }
            MessageType::Broadcast | MessageType::Coordination => {
                let recipients = match &message.to {
                    Some(to) => vec![to.clone()],
                    None => self.active_except(&message.from).await,
                };
                self.deliver(&message, recipients).await
            }
        }
    }

    async fn handle_request(&self, message: InterSwarmMessage) -> Result<(), SwarmError> {
        let target = message
            .to
            .clone()
            .ok_or_else(|| SwarmError::InvalidRequest("request without recipient".to_string()))?;
        let unit = self.unit_of(&target).await?;
        let topic = message
            .content
            .get("topic")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .or_else(|| message.task.as_ref().map(|t| t.description.clone()))
            .ok_or_else(|| SwarmError::InvalidRequest("request without topic".to_string()))?;

        let result = self
            .bounded(&target, unit.make_strategic_decision(&topic, &message.content))
            .await;
        if message.task.is_some() {
            self.finish_task(&target).await;
        }
        let decision = match result {
            Ok(decision) => decision,
            Err(e) => {
                self.record_unit_failure(&target, &e).await;
                return Err(e);
            }
        };

        let reply = serde_json::json!({
            "in_reply_to": message.id,
            "decision_id": decision.id,
            "topic": decision.topic,
            "winning_option": decision.winning_option,
            "confidence": decision.confidence,
        });
        self.handle_decision_made(&target, decision).await?;

        if self.is_registered(&message.from).await {
            self.send_message(
                InterSwarmMessage::new(target, Some(message.from), MessageType::Response, reply)
                    .with_priority(message.priority),
            );
        }
        Ok(())
    }

    async fn deliver(
        &self,
        message: &InterSwarmMessage,
        recipients: Vec<SwarmId>,
    ) -> Result<(), SwarmError> {
        let now = Utc::now();
        {
            let mut registry = self.registry.write().await;
            for recipient in &recipients {
                let entry = registry
                    .swarms
                    .get_mut(recipient)
                    .ok_or_else(|| SwarmError::NotFound(recipient.clone()))?;
                entry.record.touch(now);
            }
        }

        let content = match serde_json::to_value(message) {
            Ok(content) => content,
            Err(e) => {
                warn!(message_id = %message.id, "Failed to encode message: {}", e);
                return Ok(());
            }
        };
        let mut tags = vec![
            "message".to_string(),
            format!("type:{}", message.message_type.as_str()),
            format!("from:{}", message.from),
        ];
        tags.extend(recipients.iter().map(|r| format!("to:{}", r)));
        self.remember(
            MemoryEntry::new(
                EntryId::new(format!("message-{}", message.id)),
                EntryType::Coordination,
                content,
            )
            .with_tags(tags),
        )
        .await;
        Ok(())
    }

    /// Poll every registered decision unit for a health report.
    pub async fn run_health_checks(&self) {
        let units = self.units().await;
        let probes = units.into_iter().map(|(swarm_id, unit)| async move {
            let result = self.bounded(&swarm_id, unit.monitor_swarm_health()).await;
            (swarm_id, result)
        });

        for (swarm_id, result) in join_all(probes).await {
            match result {
                Ok(report) => self.apply_health_report(&swarm_id, report).await,
                Err(e) => self.record_unit_failure(&swarm_id, &e).await,
            }
        }
    }

    /// Update a swarm's health, failing it over or promoting it back when
    /// the report calls for it.
    pub async fn apply_health_report(&self, swarm_id: &SwarmId, report: HealthReport) {
        let status = report.status();
        let score = report.score();
        let now = Utc::now();

        let follow_up = {
            let mut registry = self.registry.write().await;
            let Some(entry) = registry.swarms.get_mut(swarm_id) else {
                debug!(swarm_id = %swarm_id, "Health report for unknown swarm");
                return;
            };
            let record = &mut entry.record;
            record.status.health = status;
            record.touch(now);
            for agent in &report.agent_health {
                record
                    .metrics
                    .agent_efficiency
                    .insert(agent.agent_id.clone(), agent.score);
            }

            if status.is_healthy() {
                if record.failed_over || record.status.state == SwarmState::Error {
                    record.failed_over = false;
                    record.status.state = SwarmState::Active;
                    HealthFollowUp::Recovered
                } else {
                    HealthFollowUp::Nothing
                }
            } else if self.config.failover_strategy == FailoverStrategy::Automatic
                && !record.failed_over
                && record.status.state != SwarmState::Initializing
            {
                record.failed_over = true;
                record.status.state = SwarmState::Busy;
                HealthFollowUp::FailOver(entry.unit.clone())
            } else {
                HealthFollowUp::Nothing
            }
        };

        self.event_bus.publish_swarm_event(SwarmEvent::HealthChecked {
            swarm_id: swarm_id.clone(),
            status,
            score,
            checked_at: now,
        });

        match follow_up {
            HealthFollowUp::Nothing => {}
            HealthFollowUp::FailOver(unit) => self.fail_over(swarm_id, status, unit).await,
            HealthFollowUp::Recovered => {
                info!(swarm_id = %swarm_id, "Swarm recovered");
                self.event_bus.publish_swarm_event(SwarmEvent::SwarmRecovered {
                    swarm_id: swarm_id.clone(),
                    recovered_at: now,
                });
            }
        }
    }

    async fn fail_over(&self, swarm_id: &SwarmId, status: HealthStatus, unit: Arc<dyn DecisionUnit>) {
        let redistributed = self.redistribute_tasks_from(swarm_id).await;
        metrics::counter!("hivemind_failovers_total").increment(1);
        warn!(
            swarm_id = %swarm_id,
            health = %status,
            redistributed_tasks = redistributed,
            "Automatic failover triggered"
        );
        self.event_bus.publish_swarm_event(SwarmEvent::FailoverTriggered {
            swarm_id: swarm_id.clone(),
            status,
            redistributed_tasks: redistributed,
            triggered_at: Utc::now(),
        });
        self.schedule_recovery_check(swarm_id.clone(), unit);
    }

    /// Re-route queued task requests addressed to `swarm_id`. Tasks with no
    /// other capable swarm stay where they are.
    async fn redistribute_tasks_from(&self, swarm_id: &SwarmId) -> usize {
        let mut taken = self.queue.lock().take_where(|m| m.is_task_for(swarm_id));
        if taken.is_empty() {
            return 0;
        }

        let mut moved = 0;
        {
            let mut registry = self.registry.write().await;
            for message in taken.iter_mut() {
                let task_type = match &message.task {
                    Some(task) => task.task_type.clone(),
                    None => continue,
                };
                let Some((target, _)) = registry.best_candidate(&task_type, Some(swarm_id)) else {
                    continue;
                };
                if let Some(entry) = registry.swarms.get_mut(swarm_id) {
                    entry.record.finish_task();
                }
                if let Some(entry) = registry.swarms.get_mut(&target) {
                    entry.record.add_task();
                }
                message.redirect(target);
                moved += 1;
            }
        }

        self.queue.lock().requeue_front(taken);
        moved
    }

    /// One delayed probe; the report re-enters through the unit event loop.
    fn schedule_recovery_check(&self, swarm_id: SwarmId, unit: Arc<dyn DecisionUnit>) {
        let tx = self.unit_events_tx.clone();
        let token = self.shutdown_token.child_token();
        let delay = self.config.recovery_delay();
        let call_timeout = self.config.call_timeout();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => return,
            }
            match tokio::time::timeout(call_timeout, unit.monitor_swarm_health()).await {
                Ok(Ok(report)) => {
                    let _ = tx.send((swarm_id, DecisionUnitEvent::HealthReport { report }));
                }
                Ok(Err(e)) => warn!(swarm_id = %swarm_id, "Recovery probe failed: {}", e),
                Err(_) => warn!(swarm_id = %swarm_id, "Recovery probe timed out"),
            }
        });
    }

    /// Move queued task requests from the busiest to the idlest active swarm
    /// when load variance exceeds the severity threshold.
    pub async fn rebalance_load(&self) -> Option<LoadRebalance> {
        let (severity, from, to) = {
            let registry = self.registry.read().await;
            let active: Vec<&SwarmRecord> = registry
                .ordered()
                .map(|entry| &entry.record)
                .filter(|record| record.status.state == SwarmState::Active)
                .collect();
            if active.len() < 2 {
                return None;
            }

            let loads: Vec<f64> = active
                .iter()
                .map(|record| load_of(record.status.current_tasks))
                .collect();
            let severity = load_variance(&loads);
            if severity <= REBALANCE_SEVERITY_THRESHOLD {
                debug!(severity, "Load within tolerance");
                return None;
            }

            let busiest = active.iter().copied().reduce(|best, record| {
                if record.status.current_tasks > best.status.current_tasks {
                    record
                } else {
                    best
                }
            })?;
            let idlest = active.iter().copied().reduce(|best, record| {
                if record.status.current_tasks < best.status.current_tasks {
                    record
                } else {
                    best
                }
            })?;
            (severity, busiest.id.clone(), idlest.id.clone())
        };

        let mut moved = 0;
        {
            let mut registry = self.registry.write().await;
            let mut queue = self.queue.lock();
            loop {
                let tasks_of = |id: &SwarmId| {
                    registry
                        .swarms
                        .get(id)
                        .map(|entry| entry.record.status.current_tasks)
                        .unwrap_or(0)
                };
                if tasks_of(&from) <= tasks_of(&to) + 1 {
                    break;
                }
                let Some(message) = queue.iter_mut().find(|m| m.is_task_for(&from)) else {
                    break;
                };
                message.redirect(to.clone());
                if let Some(entry) = registry.swarms.get_mut(&from) {
                    entry.record.finish_task();
                }
                if let Some(entry) = registry.swarms.get_mut(&to) {
                    entry.record.add_task();
                }
                moved += 1;
            }
        }

        if moved == 0 {
            debug!(severity, from = %from, "Load imbalanced but no queued tasks to move");
            return None;
        }

        info!(severity, from = %from, to = %to, moved_tasks = moved, "Load rebalanced");
        self.event_bus.publish_swarm_event(SwarmEvent::LoadRebalanced {
            severity,
            from: from.clone(),
            to: to.clone(),
            moved_tasks: moved,
            rebalanced_at: Utc::now(),
        });
        Some(LoadRebalance {
            severity,
            from,
            to,
            moved_tasks: moved,
        })
    }

    async fn collaborate(
        &self,
        request: &CoordinationRequest,
    ) -> Result<CoordinationResult, SwarmError> {
        for participant in &request.participants {
            self.send_message(InterSwarmMessage::new(
                request.initiator.clone(),
                Some(participant.clone()),
                MessageType::Coordination,
                serde_json::json!({
                    "coordination_id": request.id,
                    "invite": request.topic,
                }),
            ));
        }

        let units = self.units_for(&request.participants).await?;
        let calls = units.into_iter().map(|(swarm_id, unit)| async move {
            let result = self
                .bounded(&swarm_id, unit.make_strategic_decision(&request.topic, &request.context))
                .await;
            (swarm_id, result)
        });

        let mut contributions = Vec::new();
        let mut failed = Vec::new();
        for (swarm_id, result) in join_all(calls).await {
            match result {
                Ok(decision) => contributions.push(Contribution { swarm_id, decision }),
                Err(e) => {
                    self.record_unit_failure(&swarm_id, &e).await;
                    failed.push(swarm_id);
                }
            }
        }

        let Some((outcome, confidence)) = synthesize(&contributions) else {
            return Err(SwarmError::CoordinationFailed(format!(
                "no participant answered '{}'",
                request.topic
            )));
        };

        for contribution in &contributions {
            if let Err(e) = self
                .handle_decision_made(&contribution.swarm_id, contribution.decision.clone())
                .await
            {
                warn!(swarm_id = %contribution.swarm_id, "Failed to record contribution: {}", e);
            }
        }

        let mut audience = request.participants.clone();
        if !audience.contains(&request.initiator) {
            audience.push(request.initiator.clone());
        }
        for swarm_id in audience {
            self.send_message(InterSwarmMessage::new(
                SwarmId::new(crate::domain::COORDINATOR_ID),
                Some(swarm_id),
                MessageType::Coordination,
                serde_json::json!({
                    "coordination_id": request.id,
                    "outcome": outcome,
                    "confidence": confidence,
                }),
            ));
        }

        Ok(CoordinationResult {
            coordination_id: request.id.clone(),
            coordination_type: request.coordination_type,
            contributions,
            outcome: Some(outcome),
            confidence,
            failed,
            completed_at: Utc::now(),
        })
    }

    /// Delegation and consultation: only the first participant is asked.
    async fn consult_first(
        &self,
        request: &CoordinationRequest,
    ) -> Result<CoordinationResult, SwarmError> {
        let lead = request.participants.first().cloned().ok_or_else(|| {
            SwarmError::InvalidRequest("coordination without participants".to_string())
        })?;
        let unit = self.unit_of(&lead).await?;
        let decision = match self
            .bounded(&lead, unit.make_strategic_decision(&request.topic, &request.context))
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                self.record_unit_failure(&lead, &e).await;
                return Err(e);
            }
        };

        match request.coordination_type {
            CoordinationType::Consultation => {
                self.remember(
                    MemoryEntry::new(
                        EntryId::generate("advice"),
                        EntryType::Observation,
                        serde_json::json!({
                            "coordination_id": request.id,
                            "initiator": request.initiator,
                            "advisor": lead,
                            "decision": decision,
                        }),
                    )
                    .with_relevance(decision.confidence)
                    .with_tags([
                        "consultation".to_string(),
                        format!("swarm:{}", lead),
                        format!("coordination:{}", request.id),
                    ]),
                )
                .await;
            }
            _ => self.handle_decision_made(&lead, decision.clone()).await?,
        }

        self.send_message(InterSwarmMessage::new(
            lead.clone(),
            Some(request.initiator.clone()),
            MessageType::Response,
            serde_json::json!({
                "coordination_id": request.id,
                "coordination_type": request.coordination_type.as_str(),
                "winning_option": decision.winning_option,
                "confidence": decision.confidence,
            }),
        ));

        Ok(CoordinationResult {
            coordination_id: request.id.clone(),
            coordination_type: request.coordination_type,
            outcome: Some(decision.winning_option.clone()),
            confidence: decision.confidence,
            contributions: vec![Contribution {
                swarm_id: lead,
                decision,
            }],
            failed: Vec::new(),
            completed_at: Utc::now(),
        })
    }

    async fn respond_to_emergency(
        &self,
        emergency: &GlobalEmergency,
    ) -> Result<CoordinatedResponse, SwarmError> {
        let responders: Vec<(SwarmId, Arc<dyn DecisionUnit>)> = {
            let registry = self.registry.read().await;
            let mut candidates: Vec<&SwarmEntry> = registry
                .ordered()
                .filter(|entry| {
                    entry.record.status.state == SwarmState::Active
                        && entry.record.status.health == HealthStatus::Healthy
                })
                .collect();
            candidates.sort_by(|a, b| {
                b.record
                    .metrics
                    .success_rate
                    .partial_cmp(&a.record.metrics.success_rate)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.record.status.current_tasks.cmp(&b.record.status.current_tasks))
            });
            candidates
                .into_iter()
                .take(MAX_EMERGENCY_RESPONDERS)
                .map(|entry| (entry.record.id.clone(), entry.unit.clone()))
                .collect()
        };
        if responders.is_empty() {
            return Err(SwarmError::NoHealthySwarm);
        }

        let calls = responders.into_iter().map(|(swarm_id, unit)| async move {
            let result = self
                .bounded(
                    &swarm_id,
                    unit.handle_emergency(&emergency.kind, emergency.severity, &emergency.context),
                )
                .await;
            (swarm_id, result)
        });

        let mut responses = Vec::new();
        let mut failed = Vec::new();
        for (swarm_id, result) in join_all(calls).await {
            match result {
                Ok(response) => responses.push((swarm_id, response)),
                Err(e) => {
                    self.record_unit_failure(&swarm_id, &e).await;
                    failed.push(swarm_id);
                }
            }
        }
        if responses.is_empty() {
            return Err(SwarmError::CoordinationFailed(format!(
                "no swarm answered emergency {}",
                emergency.id
            )));
        }

        Ok(CoordinatedResponse::merge(emergency.id.clone(), responses, failed))
    }

    async fn apply_recommendation(&self, recommendation: &Recommendation) -> bool {
        match &recommendation.kind {
            RecommendationKind::ReprioritizeMessages => {
                self.queue.lock().reprioritize();
                true
            }
            RecommendationKind::ScaleSwarm {
                swarm_id,
                additional_resources,
            } => {
                let granted = self.resources.allocate(*additional_resources);
                if granted == 0 {
                    warn!(swarm_id = %swarm_id, "Resource pool exhausted, cannot scale swarm");
                    return false;
                }
                let mut registry = self.registry.write().await;
                match registry.swarms.get_mut(swarm_id) {
                    Some(entry) => {
                        entry.record.allocated_resources += granted;
                        entry.record.refresh_utilization();
                        info!(swarm_id = %swarm_id, granted, "Swarm scaled");
                        true
                    }
                    None => {
                        self.resources.release(granted);
                        false
                    }
                }
            }
            RecommendationKind::RedistributeLoad { .. } => false,
        }
    }

    async fn bounded<T, F>(&self, swarm_id: &SwarmId, call: F) -> Result<T, SwarmError>
    where
        F: Future<Output = Result<T, DecisionUnitError>> + Send,
        T: Send,
    {
        match tokio::time::timeout(self.config.call_timeout(), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(SwarmError::DecisionUnit {
                swarm_id: swarm_id.clone(),
                source,
            }),
            Err(_) => Err(SwarmError::Timeout(swarm_id.clone())),
        }
    }

    async fn record_unit_failure(&self, swarm_id: &SwarmId, error: &SwarmError) {
        {
            let mut registry = self.registry.write().await;
            if let Some(entry) = registry.swarms.get_mut(swarm_id) {
                entry.record.status.state = SwarmState::Error;
                entry.record.status.health = HealthStatus::Critical;
            }
        }
        warn!(swarm_id = %swarm_id, "Decision unit call failed: {}", error);
        self.event_bus.publish_swarm_event(SwarmEvent::HealthCheckFailed {
            swarm_id: swarm_id.clone(),
            error: error.to_string(),
            failed_at: Utc::now(),
        });
    }

    async fn units(&self) -> Vec<(SwarmId, Arc<dyn DecisionUnit>)> {
        let registry = self.registry.read().await;
        registry
            .ordered()
            .map(|entry| (entry.record.id.clone(), entry.unit.clone()))
            .collect()
    }

    async fn units_for(
        &self,
        swarm_ids: &[SwarmId],
    ) -> Result<Vec<(SwarmId, Arc<dyn DecisionUnit>)>, SwarmError> {
        let registry = self.registry.read().await;
        swarm_ids
            .iter()
            .map(|id| {
                registry
                    .swarms
                    .get(id)
                    .map(|entry| (id.clone(), entry.unit.clone()))
                    .ok_or_else(|| SwarmError::NotFound(id.clone()))
            })
            .collect()
    }

    async fn unit_of(&self, swarm_id: &SwarmId) -> Result<Arc<dyn DecisionUnit>, SwarmError> {
        let registry = self.registry.read().await;
        registry
            .swarms
            .get(swarm_id)
            .map(|entry| entry.unit.clone())
            .ok_or_else(|| SwarmError::NotFound(swarm_id.clone()))
    }

    async fn is_registered(&self, swarm_id: &SwarmId) -> bool {
        self.registry.read().await.swarms.contains_key(swarm_id)
    }

    async fn active_except(&self, sender: &SwarmId) -> Vec<SwarmId> {
        let registry = self.registry.read().await;
        registry
            .ordered()
            .map(|entry| &entry.record)
            .filter(|record| record.status.state == SwarmState::Active && &record.id != sender)
            .map(|record| record.id.clone())
            .collect()
    }

    async fn touch(&self, swarm_id: &SwarmId) {
        if let Some(entry) = self.registry.write().await.swarms.get_mut(swarm_id) {
            entry.record.touch(Utc::now());
        }
    }

    async fn finish_task(&self, swarm_id: &SwarmId) {
        if let Some(entry) = self.registry.write().await.swarms.get_mut(swarm_id) {
            entry.record.finish_task();
        }
    }

    async fn remember(&self, entry: MemoryEntry) {
        let id = entry.id.clone();
        if let Err(e) = self.memory.store(entry).await {
            warn!(entry_id = %id.as_str(), "Failed to write swarm memory: {}", e);
        }
    }
}

fn spawn_forwarder(
    swarm_id: SwarmId,
    mut events: broadcast::Receiver<DecisionUnitEvent>,
    tx: mpsc::UnboundedSender<UnitEvent>,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => {
                        if tx.send((swarm_id.clone(), event)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(swarm_id = %swarm_id, skipped, "Decision unit events lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = token.cancelled() => break,
            }
        }
        debug!(swarm_id = %swarm_id, "Decision unit forwarder stopped");
    });
}

#[async_trait]
impl SwarmService for SwarmCoordinator {
    async fn register_swarm(
        &self,
        id: SwarmId,
        name: &str,
        purpose: &str,
        unit: Arc<dyn DecisionUnit>,
    ) -> Result<SwarmRecord, SwarmError> {
        let record = {
            let mut registry = self.registry.write().await;
            if registry.swarms.contains_key(&id) {
                warn!(swarm_id = %id, "Swarm already registered");
                return Err(SwarmError::AlreadyRegistered(id));
            }

            let mut record = SwarmRecord::new(id.clone(), name, purpose);
            let forwarder = self.shutdown_token.child_token();
            spawn_forwarder(
                id.clone(),
                unit.subscribe(),
                self.unit_events_tx.clone(),
                forwarder.clone(),
            );

            let requested = self.config.resources_per_swarm;
            let granted = self.resources.allocate(requested);
            if granted < requested {
                warn!(swarm_id = %id, requested, granted, "Partial resource allocation");
            }
            record.allocated_resources = granted;
            record.refresh_utilization();
            record.status.state = SwarmState::Active;

            registry.order.push(id.clone());
            registry.swarms.insert(
                id.clone(),
                SwarmEntry {
                    record: record.clone(),
                    unit,
                    forwarder,
                    tally: DecisionTally::default(),
                },
            );
            record
        };

        info!(swarm_id = %id, purpose, resources = record.allocated_resources, "Swarm registered");
        self.event_bus.publish_swarm_event(SwarmEvent::SwarmRegistered {
            swarm_id: id.clone(),
            name: record.name.clone(),
            purpose: record.purpose.clone(),
            allocated_resources: record.allocated_resources,
            registered_at: record.registered_at,
        });
        self.remember(
            MemoryEntry::new(
                EntryId::generate("observation"),
                EntryType::Observation,
                serde_json::json!({
                    "event": "swarm_registered",
                    "swarm_id": id,
                    "name": record.name,
                    "purpose": record.purpose,
                }),
            )
            .with_tags(["swarm-registered".to_string(), format!("swarm:{}", id)]),
        )
        .await;

        Ok(record)
    }

    async fn deregister_swarm(&self, id: &SwarmId) -> Result<SwarmRecord, SwarmError> {
        let entry = {
            let mut registry = self.registry.write().await;
            let entry = registry
                .swarms
                .remove(id)
                .ok_or_else(|| SwarmError::NotFound(id.clone()))?;
            registry.order.retain(|other| other != id);
            entry
        };

        entry.forwarder.cancel();
        self.resources.release(entry.record.allocated_resources);
        let dropped = self
            .queue
            .lock()
            .take_where(|m| m.to.as_ref() == Some(id))
            .len();

        info!(swarm_id = %id, dropped_messages = dropped, "Swarm deregistered");
        self.event_bus.publish_swarm_event(SwarmEvent::SwarmDeregistered {
            swarm_id: id.clone(),
            dropped_messages: dropped,
            deregistered_at: Utc::now(),
        });
        self.remember(
            MemoryEntry::new(
                EntryId::generate("observation"),
                EntryType::Observation,
                serde_json::json!({
                    "event": "swarm_deregistered",
                    "swarm_id": id,
                    "dropped_messages": dropped,
                }),
            )
            .with_tags(["swarm-deregistered".to_string(), format!("swarm:{}", id)]),
        )
        .await;

        Ok(entry.record)
    }

    async fn route_task(&self, task: Task) -> Result<RoutingDecision, SwarmError> {
        let profile = task.profile();
        let (swarm_id, score) = {
            let mut registry = self.registry.write().await;
            let Some((swarm_id, score)) = registry.best_candidate(&profile.task_type, None) else {
                warn!(task_id = %task.id, task_type = %profile.task_type, "No capable swarm");
                return Err(SwarmError::NoCapableSwarm {
                    task_type: profile.task_type,
                });
            };
            if let Some(entry) = registry.swarms.get_mut(&swarm_id) {
                entry.record.add_task();
            }
            (swarm_id, score)
        };

        let task_id = task.id.clone();
        let message = InterSwarmMessage::for_task(swarm_id.clone(), task);
        let message_id = message.id.clone();
        self.send_message(message);

        metrics::counter!("hivemind_tasks_routed_total").increment(1);
        debug!(task_id = %task_id, swarm_id = %swarm_id, score, "Task routed");
        self.event_bus.publish_swarm_event(SwarmEvent::TaskRouted {
            task_id: task_id.clone(),
            swarm_id: swarm_id.clone(),
            score,
            routed_at: Utc::now(),
        });

        Ok(RoutingDecision {
            task_id,
            swarm_id,
            score,
            profile,
            message_id,
        })
    }

    fn send_message(&self, message: InterSwarmMessage) {
        self.queue.lock().push(message);
    }

    async fn coordinate_swarms(
        &self,
        request: CoordinationRequest,
    ) -> Result<CoordinationResult, SwarmError> {
        if request.participants.is_empty() {
            return Err(SwarmError::InvalidRequest(
                "coordination without participants".to_string(),
            ));
        }
        {
            let registry = self.registry.read().await;
            for id in std::iter::once(&request.initiator).chain(request.participants.iter()) {
                if !registry.swarms.contains_key(id) {
                    return Err(SwarmError::NotFound(id.clone()));
                }
            }
        }

        let result = match request.coordination_type {
            CoordinationType::Collaboration => self.collaborate(&request).await?,
            CoordinationType::Delegation | CoordinationType::Consultation => {
                self.consult_first(&request).await?
            }
        };

        info!(
            coordination_id = %request.id,
            coordination_type = request.coordination_type.as_str(),
            outcome = ?result.outcome,
            "Coordination completed"
        );
        match serde_json::to_value(&result) {
            Ok(content) => {
                self.remember(
                    MemoryEntry::new(
                        EntryId::new(format!("coordination-{}", request.id)),
                        EntryType::Coordination,
                        content,
                    )
                    .with_relevance(result.confidence)
                    .with_tags([
                        "coordination".to_string(),
                        format!("type:{}", request.coordination_type.as_str()),
                        format!("swarm:{}", request.initiator),
                    ]),
                )
                .await
            }
            Err(e) => warn!(coordination_id = %request.id, "Failed to encode coordination: {}", e),
        }
        self.event_bus.publish_swarm_event(SwarmEvent::CoordinationCompleted {
            coordination_id: request.id.clone(),
            coordination_type: request.coordination_type.as_str().to_string(),
            initiator: request.initiator.clone(),
            participants: request.participants.clone(),
            completed_at: result.completed_at,
        });
        Ok(result)
    }

    async fn handle_global_emergency(
        &self,
        emergency: GlobalEmergency,
    ) -> Result<CoordinatedResponse, SwarmError> {
        self.emergency_pauses.fetch_add(1, Ordering::SeqCst);
        warn!(
            emergency_id = %emergency.id,
            kind = %emergency.kind,
            severity = ?emergency.severity,
            "Global emergency, pausing non-critical processing"
        );
        let reserved = self.resources.allocate(self.config.resources_per_swarm);

        let outcome = self.respond_to_emergency(&emergency).await;

        self.resources.release(reserved);
        self.emergency_pauses.fetch_sub(1, Ordering::SeqCst);
        let response = outcome?;

        info!(
            emergency_id = %emergency.id,
            responders = response.responders.len(),
            actions = response.actions.len(),
            "Global emergency handled"
        );
        match serde_json::to_value(&response) {
            Ok(content) => {
                self.remember(
                    MemoryEntry::new(
                        EntryId::new(format!("emergency-{}", emergency.id)),
                        EntryType::Emergency,
                        content,
                    )
                    .with_relevance(response.confidence)
                    .with_tags(["emergency".to_string(), format!("kind:{}", emergency.kind)]),
                )
                .await
            }
            Err(e) => warn!(emergency_id = %emergency.id, "Failed to encode emergency: {}", e),
        }
        self.event_bus
            .publish_swarm_event(SwarmEvent::GlobalEmergencyHandled {
                emergency_id: emergency.id,
                responders: response.responders.clone(),
                failed: response.failed.clone(),
                action_count: response.actions.len(),
                handled_at: response.handled_at,
            });
        Ok(response)
    }

    async fn optimize_network(&self) -> NetworkOptimization {
        let mut bottlenecks = Vec::new();
        let mut recommendations = Vec::new();

        let depth = self.queue_depth();
        if depth > QUEUE_DEPTH_THRESHOLD {
            bottlenecks.push(Bottleneck::QueueBacklog { depth });
            recommendations.push(Recommendation::reprioritize(depth));
        }
        {
            let registry = self.registry.read().await;
            for record in registry.ordered().map(|entry| &entry.record) {
                let utilization = record.utilization();
                if utilization > UTILIZATION_THRESHOLD {
                    bottlenecks.push(Bottleneck::SwarmOverloaded {
                        swarm_id: record.id.clone(),
                        utilization,
                    });
                    recommendations.push(Recommendation::scale(
                        record.id.clone(),
                        self.config.resources_per_swarm,
                        utilization,
                    ));
                    recommendations.push(Recommendation::redistribute(record.id.clone()));
                }
            }
        }

        let mut applied = Vec::new();
        for recommendation in recommendations.iter().filter(|r| r.auto_apply) {
            if self.apply_recommendation(recommendation).await {
                applied.push(recommendation.clone());
            }
        }

        info!(
            bottlenecks = bottlenecks.len(),
            recommendations = recommendations.len(),
            applied = applied.len(),
            "Network optimization pass"
        );
        self.event_bus.publish_swarm_event(SwarmEvent::NetworkOptimized {
            bottlenecks: bottlenecks.len(),
            applied: applied.len(),
            advisory: recommendations.len() - applied.len(),
            optimized_at: Utc::now(),
        });

        NetworkOptimization {
            bottlenecks,
            recommendations,
            applied,
            optimized_at: Utc::now(),
        }
    }

    async fn swarm(&self, id: &SwarmId) -> Option<SwarmRecord> {
        self.registry
            .read()
            .await
            .swarms
            .get(id)
            .map(|entry| entry.record.clone())
    }

    async fn swarms(&self) -> Vec<SwarmRecord> {
        let registry = self.registry.read().await;
        registry.ordered().map(|entry| entry.record.clone()).collect()
    }

    fn queue_depth(&self) -> usize {
        self.queue.lock().len()
    }
}

#[async_trait]
impl DecisionExecutor for SwarmCoordinator {
    async fn execute_decision(
        &self,
        request: ExecutionRequest,
    ) -> Result<ExecutionResult, ExecutionError> {
        let now = Utc::now();
        {
            let mut registry = self.registry.write().await;
            let entry = registry
                .swarms
                .get_mut(&request.swarm_id)
                .ok_or_else(|| ExecutionError::SwarmNotFound(request.swarm_id.clone()))?;
            entry.record.touch(now);
        }

        let automatic = request.authorization.is_automatic();
        let content =
            serde_json::to_value(&request).map_err(|e| ExecutionError::Failed(e.to_string()))?;
        self.memory
            .store(
                MemoryEntry::new(
                    EntryId::new(format!("execution-{}", request.decision_id)),
                    EntryType::Execution,
                    content,
                )
                .with_timestamp(now)
                .with_tags([
                    "execution".to_string(),
                    format!("swarm:{}", request.swarm_id),
                    format!("mode:{}", if automatic { "automatic" } else { "human" }),
                ]),
            )
            .await
            .map_err(|e| ExecutionError::Failed(e.to_string()))?;

        info!(
            decision_id = %request.decision_id,
            swarm_id = %request.swarm_id,
            automatic,
            "Decision executed"
        );
        self.event_bus.publish_swarm_event(SwarmEvent::DecisionExecuted {
            decision_id: request.decision_id,
            swarm_id: request.swarm_id.clone(),
            automatic,
            executed_at: now,
        });

        Ok(ExecutionResult {
            decision_id: request.decision_id,
            summary: format!(
                "decision {} applied by swarm {}",
                request.source_decision_id, request.swarm_id
            ),
            swarm_id: request.swarm_id,
            executed_at: now,
        })
    }

    async fn notify_rejection(&self, notice: RejectionNotice) -> Result<(), ExecutionError> {
        if !self.is_registered(&notice.swarm_id).await {
            return Err(ExecutionError::SwarmNotFound(notice.swarm_id));
        }

        let content =
            serde_json::to_value(&notice).map_err(|e| ExecutionError::Failed(e.to_string()))?;
        self.remember(
            MemoryEntry::new(
                EntryId::new(format!("rejection-{}", notice.decision_id)),
                EntryType::Execution,
                content,
            )
            .with_tags(["rejection".to_string(), format!("swarm:{}", notice.swarm_id)]),
        )
        .await;

        info!(
            decision_id = %notice.decision_id,
            swarm_id = %notice.swarm_id,
            reason = %notice.reason,
            "Decision rejected by reviewer"
        );
        self.event_bus.publish_swarm_event(SwarmEvent::DecisionRejected {
            decision_id: notice.decision_id,
            swarm_id: notice.swarm_id,
            reason: notice.reason,
            rejected_at: Utc::now(),
        });
        Ok(())
    }
}
