// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the swarm coordinator.
//!
//! Drives registration, routing, message processing, failover, load
//! balancing, cross-swarm coordination, global emergencies, network
//! optimization and decision execution without the background loops.

mod common;

use common::{harness, swarm_events, ScriptedUnit};
use hivemind_core::domain::config::{CoordinatorConfig, FailoverStrategy};
use hivemind_core::domain::decision::Decision;
use hivemind_core::domain::events::SwarmEvent;
use hivemind_core::domain::execution::{
    DecisionExecutor, ExecutionAuthorization, ExecutionError, ExecutionRequest, RejectionNotice,
};
use hivemind_core::domain::hitl::HitlDecisionType;
use hivemind_core::domain::swarm::{DecisionId, HealthReport, HealthStatus, Priority, SwarmId};
use hivemind_cortex::{EntryId, EntryType, MemoryQuery, SwarmMemory};
use hivemind_swarm::{
    Bottleneck, CoordinationRequest, CoordinationType, GlobalEmergency, InterSwarmMessage,
    MessageType, RecommendationKind, SwarmError, SwarmService, SwarmState, Task,
};
use std::sync::Arc;
use std::time::Duration;

fn id(name: &str) -> SwarmId {
    SwarmId::new(name)
}

async fn register(
    coordinator: &hivemind_swarm::SwarmCoordinator,
    name: &str,
    purpose: &str,
    unit: ScriptedUnit,
) -> Arc<ScriptedUnit> {
    let unit = Arc::new(unit);
    coordinator
        .register_swarm(id(name), name, purpose, unit.clone())
        .await
        .unwrap();
    unit
}

fn decision(legitimate: bool) -> Decision {
    Decision {
        legitimate,
        ..Decision::new("queen", "pipeline review", "strategy", "proceed", 0.9)
    }
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let h = harness(CoordinatorConfig::default());
    let first = h
        .coordinator
        .register_swarm(id("sales"), "Sales", "sales", Arc::new(ScriptedUnit::new("go", 0.9)))
        .await
        .unwrap();
    assert_eq!(first.status.state, SwarmState::Active);
    assert_eq!(first.allocated_resources, 10);

    let second = h
        .coordinator
        .register_swarm(id("sales"), "Sales 2", "support", Arc::new(ScriptedUnit::new("go", 0.9)))
        .await;
    assert!(matches!(second, Err(SwarmError::AlreadyRegistered(ref s)) if s == &id("sales")));

    let swarms = h.coordinator.swarms().await;
    assert_eq!(swarms.len(), 1);
    assert_eq!(swarms[0].name, "Sales");
    assert_eq!(h.coordinator.resource_pool().allocated, 10);
}

#[tokio::test]
async fn test_allocation_is_partial_when_pool_runs_low() {
    let config = CoordinatorConfig {
        total_resources: 15,
        ..CoordinatorConfig::default()
    };
    let h = harness(config);
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "b", "sales", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "c", "sales", ScriptedUnit::new("go", 0.9)).await;

    let allocations: Vec<u32> = h
        .coordinator
        .swarms()
        .await
        .iter()
        .map(|s| s.allocated_resources)
        .collect();
    assert_eq!(allocations, vec![10, 5, 0]);
    assert_eq!(h.coordinator.resource_pool().available, 0);
}

#[tokio::test]
async fn test_routing_prefers_purpose_match_and_track_record() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "b", "general", ScriptedUnit::new("go", 0.9)).await;

    for i in 0..10 {
        h.coordinator
            .handle_decision_made(&id("a"), decision(i != 0))
            .await
            .unwrap();
    }
    for i in 0..2 {
        h.coordinator
            .handle_decision_made(&id("b"), decision(i == 0))
            .await
            .unwrap();
    }

    let first = h.coordinator.route_task(Task::new("sales", "warm lead")).await.unwrap();
    assert_eq!(first.swarm_id, id("a"));

    let second = h.coordinator.route_task(Task::new("sales", "renewal")).await.unwrap();
    assert_eq!(second.swarm_id, id("a"));
    assert!((second.score - 0.95).abs() < 1e-9);

    let a = h.coordinator.swarm(&id("a")).await.unwrap();
    assert_eq!(a.status.current_tasks, 2);
    assert!((a.metrics.success_rate - 0.9).abs() < 1e-9);
    assert_eq!(a.metrics.decisions_per_hour, 10.0);
    assert_eq!(h.coordinator.queue_depth(), 2);

    let queued = h.coordinator.queued_messages();
    assert!(queued.iter().all(|m| m.is_task_for(&id("a"))));
    assert_eq!(queued[1].id, second.message_id);
}

#[tokio::test]
async fn test_general_swarm_takes_unmatched_task_types() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "b", "general", ScriptedUnit::new("go", 0.9)).await;

    let routed = h.coordinator.route_task(Task::new("billing", "refund")).await.unwrap();
    assert_eq!(routed.swarm_id, id("b"));
    assert!((routed.score - 0.9).abs() < 1e-9);
}

#[tokio::test]
async fn test_routing_without_capable_swarm_fails() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;

    let result = h.coordinator.route_task(Task::new("support", "ticket")).await;
    assert!(matches!(
        result,
        Err(SwarmError::NoCapableSwarm { ref task_type }) if task_type == "support"
    ));
    assert_eq!(h.coordinator.queue_depth(), 0);
    assert!(!swarm_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SwarmEvent::TaskRouted { .. })));
}

#[tokio::test]
async fn test_deregistration_drops_messages_and_releases_resources() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    for n in 0..3 {
        h.coordinator
            .route_task(Task::new("sales", format!("lead {}", n)))
            .await
            .unwrap();
    }
    h.coordinator.send_message(InterSwarmMessage::broadcast(
        id("a"),
        serde_json::json!({ "topic": "status" }),
    ));

    let removed = h.coordinator.deregister_swarm(&id("a")).await.unwrap();
    assert_eq!(removed.id, id("a"));
    assert_eq!(h.coordinator.queue_depth(), 1);
    assert_eq!(h.coordinator.resource_pool().allocated, 0);
    assert!(h.coordinator.swarm(&id("a")).await.is_none());

    assert!(swarm_events(&mut h.events).iter().any(|e| matches!(
        e,
        SwarmEvent::SwarmDeregistered { swarm_id, dropped_messages: 3, .. } if swarm_id == &id("a")
    )));
    assert!(matches!(
        h.coordinator.deregister_swarm(&id("a")).await,
        Err(SwarmError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_request_produces_decision_and_response() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "sales", "sales", ScriptedUnit::new("go", 0.9)).await;
    let ops = register(&h.coordinator, "ops", "ops", ScriptedUnit::new("approve", 0.85)).await;

    h.coordinator.send_message(InterSwarmMessage::request(
        id("sales"),
        id("ops"),
        serde_json::json!({ "topic": "refund policy" }),
    ));
    assert_eq!(h.coordinator.process_messages().await, 1);
    assert_eq!(ops.calls(), 1);

    let queued = h.coordinator.queued_messages();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].message_type, MessageType::Response);
    assert_eq!(queued[0].from, id("ops"));
    assert_eq!(queued[0].to, Some(id("sales")));
    assert_eq!(queued[0].content["winning_option"], "approve");

    let decisions = h
        .memory
        .retrieve(MemoryQuery::new().of_type(EntryType::Decision))
        .await;
    assert_eq!(decisions.len(), 1);
    let record = h.coordinator.swarm(&id("ops")).await.unwrap();
    assert_eq!(record.metrics.decisions_per_hour, 1.0);

    assert_eq!(h.coordinator.process_messages().await, 1);
    assert_eq!(h.coordinator.queue_depth(), 0);
    let delivered = h
        .memory
        .retrieve(
            MemoryQuery::new()
                .of_type(EntryType::Coordination)
                .tagged("type:response"),
        )
        .await;
    assert_eq!(delivered.len(), 1);
}

#[tokio::test]
async fn test_routed_task_is_executed_and_released() {
    let h = harness(CoordinatorConfig::default());
    let ops = register(&h.coordinator, "ops", "ops", ScriptedUnit::new("ship", 0.9)).await;

    h.coordinator.route_task(Task::new("ops", "deploy fix")).await.unwrap();
    assert_eq!(h.coordinator.swarm(&id("ops")).await.unwrap().status.current_tasks, 1);

    assert_eq!(h.coordinator.process_messages().await, 1);
    assert_eq!(ops.calls(), 1);
    assert_eq!(h.coordinator.swarm(&id("ops")).await.unwrap().status.current_tasks, 0);
    // coordinator is not a registered swarm, so nothing is sent back
    assert_eq!(h.coordinator.queue_depth(), 0);
}

#[tokio::test]
async fn test_failing_unit_does_not_block_other_messages() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "bad", "ops", ScriptedUnit::new("x", 0.9).failing()).await;
    register(&h.coordinator, "good", "ops", ScriptedUnit::new("y", 0.9)).await;

    let from = id("coordinator");
    h.coordinator.send_message(InterSwarmMessage::request(
        from.clone(),
        id("bad"),
        serde_json::json!({ "topic": "a" }),
    ));
    h.coordinator.send_message(InterSwarmMessage::request(
        from,
        id("good"),
        serde_json::json!({ "topic": "b" }),
    ));

    assert_eq!(h.coordinator.process_messages().await, 1);

    let bad = h.coordinator.swarm(&id("bad")).await.unwrap();
    assert_eq!(bad.status.state, SwarmState::Error);
    assert_eq!(bad.status.health, HealthStatus::Critical);
    let good = h.coordinator.swarm(&id("good")).await.unwrap();
    assert_eq!(good.status.state, SwarmState::Active);

    let events = swarm_events(&mut h.events);
    assert!(events.iter().any(|e| matches!(
        e,
        SwarmEvent::MessageFailed { to: Some(to), .. } if to == &id("bad")
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, SwarmEvent::HealthCheckFailed { swarm_id, .. } if swarm_id == &id("bad"))));
}

#[tokio::test]
async fn test_request_to_unknown_swarm_fails_the_message() {
    let mut h = harness(CoordinatorConfig::default());
    h.coordinator.send_message(InterSwarmMessage::request(
        id("coordinator"),
        id("ghost"),
        serde_json::json!({ "topic": "anyone there" }),
    ));
    assert_eq!(h.coordinator.process_messages().await, 0);
    assert!(swarm_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SwarmEvent::MessageFailed { .. })));
}

#[tokio::test]
async fn test_decision_requiring_human_goes_to_hitl() {
    let mut h = harness(CoordinatorConfig::default());
    register(
        &h.coordinator,
        "sales",
        "sales",
        ScriptedUnit::new("discount", 0.6).requiring_human(),
    )
    .await;

    h.coordinator.send_message(InterSwarmMessage::request(
        id("coordinator"),
        id("sales"),
        serde_json::json!({ "topic": "enterprise discount" }),
    ));
    h.coordinator.process_messages().await;

    let submission = h.hitl.try_recv().unwrap();
    assert_eq!(submission.swarm_id, id("sales"));
    assert!(submission.decision.requires_human_judgment);
    assert_eq!(submission.decision.topic, "enterprise discount");
    assert!(h.hitl.try_recv().is_err());
}

#[tokio::test]
async fn test_degraded_report_fails_over_and_healthy_report_recovers() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "b", "general", ScriptedUnit::new("go", 0.9)).await;
    for n in 0..2 {
        let routed = h
            .coordinator
            .route_task(Task::new("sales", format!("lead {}", n)))
            .await
            .unwrap();
        assert_eq!(routed.swarm_id, id("a"));
    }

    h.coordinator
        .apply_health_report(&id("a"), HealthReport::new(0.6))
        .await;

    let a = h.coordinator.swarm(&id("a")).await.unwrap();
    assert_eq!(a.status.state, SwarmState::Busy);
    assert_eq!(a.status.health, HealthStatus::Degraded);
    assert!(a.failed_over);
    assert_eq!(a.status.current_tasks, 0);
    assert_eq!(h.coordinator.swarm(&id("b")).await.unwrap().status.current_tasks, 2);

    let queued = h.coordinator.queued_messages();
    assert_eq!(queued.len(), 2);
    assert!(queued
        .iter()
        .all(|m| m.to == Some(id("b")) && m.redistributed_from == Some(id("a"))));

    let events = swarm_events(&mut h.events);
    assert!(events.iter().any(|e| matches!(
        e,
        SwarmEvent::FailoverTriggered { swarm_id, redistributed_tasks: 2, .. } if swarm_id == &id("a")
    )));

    // a second degraded report does not fail over again
    h.coordinator
        .apply_health_report(&id("a"), HealthReport::new(0.55))
        .await;
    assert!(!swarm_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SwarmEvent::FailoverTriggered { .. })));

    h.coordinator
        .apply_health_report(&id("a"), HealthReport::new(0.95).with_agent("scout", 0.9))
        .await;
    let a = h.coordinator.swarm(&id("a")).await.unwrap();
    assert_eq!(a.status.state, SwarmState::Active);
    assert!(!a.failed_over);
    assert_eq!(a.metrics.agent_efficiency.len(), 1);
    assert!(swarm_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SwarmEvent::SwarmRecovered { swarm_id, .. } if swarm_id == &id("a"))));
}

#[tokio::test]
async fn test_manual_failover_only_records_health() {
    let config = CoordinatorConfig {
        failover_strategy: FailoverStrategy::Manual,
        ..CoordinatorConfig::default()
    };
    let mut h = harness(config);
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;

    h.coordinator
        .apply_health_report(&id("a"), HealthReport::new(0.6))
        .await;
    let a = h.coordinator.swarm(&id("a")).await.unwrap();
    assert_eq!(a.status.state, SwarmState::Active);
    assert_eq!(a.status.health, HealthStatus::Degraded);
    assert!(!a.failed_over);
    assert!(!swarm_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SwarmEvent::FailoverTriggered { .. })));
}

#[tokio::test]
async fn test_health_probe_failure_marks_swarm_critical() {
    let h = harness(CoordinatorConfig::default());
    let healthy = register(&h.coordinator, "ok", "ops", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "down", "ops", ScriptedUnit::new("go", 0.9).failing()).await;

    h.coordinator.run_health_checks().await;

    let down = h.coordinator.swarm(&id("down")).await.unwrap();
    assert_eq!(down.status.state, SwarmState::Error);
    assert_eq!(down.status.health, HealthStatus::Critical);
    assert!(!down.is_routable());

    let ok = h.coordinator.swarm(&id("ok")).await.unwrap();
    assert_eq!(ok.status.state, SwarmState::Active);
    assert_eq!(healthy.calls(), 1);
}

#[tokio::test]
async fn test_slow_health_probe_times_out() {
    let config = CoordinatorConfig {
        call_timeout_seconds: 1,
        ..CoordinatorConfig::default()
    };
    let mut h = harness(config);
    register(
        &h.coordinator,
        "slow",
        "ops",
        ScriptedUnit::new("go", 0.9).with_delay(Duration::from_secs(3)),
    )
    .await;

    h.coordinator.run_health_checks().await;

    let slow = h.coordinator.swarm(&id("slow")).await.unwrap();
    assert_eq!(slow.status.state, SwarmState::Error);
    assert!(swarm_events(&mut h.events).iter().any(|e| matches!(
        e,
        SwarmEvent::HealthCheckFailed { error, .. } if error.contains("timed out")
    )));
}

#[tokio::test]
async fn test_rebalance_moves_queued_tasks_to_idle_swarm() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "b", "support", ScriptedUnit::new("go", 0.9)).await;
    for n in 0..12 {
        h.coordinator
            .route_task(Task::new("sales", format!("lead {}", n)))
            .await
            .unwrap();
    }

    let rebalance = h.coordinator.rebalance_load().await.unwrap();
    assert_eq!(rebalance.moved_tasks, 6);
    assert_eq!(rebalance.from, id("a"));
    assert_eq!(rebalance.to, id("b"));
    assert!((rebalance.severity - 0.36).abs() < 1e-9);

    assert_eq!(h.coordinator.swarm(&id("a")).await.unwrap().status.current_tasks, 6);
    assert_eq!(h.coordinator.swarm(&id("b")).await.unwrap().status.current_tasks, 6);
    let moved = h
        .coordinator
        .queued_messages()
        .into_iter()
        .filter(|m| m.redistributed_from == Some(id("a")))
        .count();
    assert_eq!(moved, 6);
    assert!(swarm_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SwarmEvent::LoadRebalanced { moved_tasks: 6, .. })));

    assert!(h.coordinator.rebalance_load().await.is_none());
}

#[tokio::test]
async fn test_small_imbalance_is_left_alone() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    register(&h.coordinator, "b", "support", ScriptedUnit::new("go", 0.9)).await;
    for n in 0..5 {
        h.coordinator
            .route_task(Task::new("sales", format!("lead {}", n)))
            .await
            .unwrap();
    }
    // loads 0.5 and 0.0 give a variance of 0.0625
    assert!(h.coordinator.rebalance_load().await.is_none());
    assert_eq!(h.coordinator.swarm(&id("a")).await.unwrap().status.current_tasks, 5);
}

#[tokio::test]
async fn test_collaboration_synthesizes_majority() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("expand", 0.6)).await;
    register(&h.coordinator, "b", "finance", ScriptedUnit::new("hold", 0.95)).await;
    register(&h.coordinator, "c", "ops", ScriptedUnit::new("expand", 0.8)).await;

    let request = CoordinationRequest::new(
        CoordinationType::Collaboration,
        id("a"),
        vec![id("a"), id("b"), id("c")],
        "emea expansion",
    );
    let result = h.coordinator.coordinate_swarms(request).await.unwrap();

    assert_eq!(result.outcome.as_deref(), Some("expand"));
    assert!((result.confidence - 0.7).abs() < 1e-9);
    assert_eq!(result.contributions.len(), 3);
    assert!(result.failed.is_empty());

    // three invitations and three outcome notices
    let queued = h.coordinator.queued_messages();
    assert_eq!(queued.len(), 6);
    assert!(queued.iter().all(|m| m.message_type == MessageType::Coordination));

    let decisions = h
        .memory
        .retrieve(MemoryQuery::new().of_type(EntryType::Decision))
        .await;
    assert_eq!(decisions.len(), 3);
    let stored = h
        .memory
        .get(&EntryId::new(format!("coordination-{}", result.coordination_id)))
        .await;
    assert!(stored.is_some());
    assert!(swarm_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SwarmEvent::CoordinationCompleted { .. })));
}

#[tokio::test]
async fn test_collaboration_survives_failed_participant() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("expand", 0.7)).await;
    register(&h.coordinator, "b", "finance", ScriptedUnit::new("hold", 0.9).failing()).await;

    let request = CoordinationRequest::new(
        CoordinationType::Collaboration,
        id("a"),
        vec![id("a"), id("b")],
        "budget",
    );
    let result = h.coordinator.coordinate_swarms(request).await.unwrap();
    assert_eq!(result.outcome.as_deref(), Some("expand"));
    assert_eq!(result.failed, vec![id("b")]);
    assert_eq!(
        h.coordinator.swarm(&id("b")).await.unwrap().status.state,
        SwarmState::Error
    );
}

#[tokio::test]
async fn test_delegation_decides_for_initiator() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("expand", 0.6)).await;
    let b = register(&h.coordinator, "b", "finance", ScriptedUnit::new("hold", 0.9)).await;
    let c = register(&h.coordinator, "c", "ops", ScriptedUnit::new("defer", 0.9)).await;

    let request = CoordinationRequest::new(
        CoordinationType::Delegation,
        id("a"),
        vec![id("b"), id("c")],
        "pricing freeze",
    );
    let result = h.coordinator.coordinate_swarms(request).await.unwrap();

    assert_eq!(result.outcome.as_deref(), Some("hold"));
    assert_eq!(b.calls(), 1);
    assert_eq!(c.calls(), 0);

    let queued = h.coordinator.queued_messages();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].message_type, MessageType::Response);
    assert_eq!(queued[0].to, Some(id("a")));

    let decisions = h
        .memory
        .retrieve(MemoryQuery::new().of_type(EntryType::Decision))
        .await;
    assert_eq!(decisions.len(), 1);
}

#[tokio::test]
async fn test_consultation_records_advice_only() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("expand", 0.6)).await;
    register(&h.coordinator, "b", "legal", ScriptedUnit::new("add clause", 0.8)).await;

    let request = CoordinationRequest::new(
        CoordinationType::Consultation,
        id("a"),
        vec![id("b")],
        "contract terms",
    );
    let result = h.coordinator.coordinate_swarms(request).await.unwrap();
    assert_eq!(result.outcome.as_deref(), Some("add clause"));

    let decisions = h
        .memory
        .retrieve(MemoryQuery::new().of_type(EntryType::Decision))
        .await;
    assert!(decisions.is_empty());
    let advice = h
        .memory
        .retrieve(MemoryQuery::new().tagged("consultation"))
        .await;
    assert_eq!(advice.len(), 1);
    assert_eq!(h.coordinator.queue_depth(), 1);
}

#[tokio::test]
async fn test_coordination_validates_participants() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("expand", 0.6)).await;

    let empty = CoordinationRequest::new(CoordinationType::Collaboration, id("a"), vec![], "x");
    assert!(matches!(
        h.coordinator.coordinate_swarms(empty).await,
        Err(SwarmError::InvalidRequest(_))
    ));

    let unknown =
        CoordinationRequest::new(CoordinationType::Delegation, id("a"), vec![id("ghost")], "x");
    assert!(matches!(
        h.coordinator.coordinate_swarms(unknown).await,
        Err(SwarmError::NotFound(ref s)) if s == &id("ghost")
    ));
}

#[tokio::test]
async fn test_global_emergency_uses_top_three_healthy_swarms() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "ops", ScriptedUnit::new("go", 0.9)).await;
    register(
        &h.coordinator,
        "b",
        "ops",
        ScriptedUnit::new("go", 0.8).with_actions(&["isolate", "notify"]),
    )
    .await;
    register(
        &h.coordinator,
        "c",
        "ops",
        ScriptedUnit::new("go", 0.6).with_actions(&["notify", "refund"]),
    )
    .await;
    let d = register(&h.coordinator, "d", "ops", ScriptedUnit::new("go", 0.9)).await;
    register(
        &h.coordinator,
        "e",
        "ops",
        ScriptedUnit::new("go", 0.7).with_actions(&["isolate"]),
    )
    .await;

    // a carries a task so it sorts last; d is taken out by failover
    let routed = h.coordinator.route_task(Task::new("ops", "patch")).await.unwrap();
    assert_eq!(routed.swarm_id, id("a"));
    h.coordinator
        .apply_health_report(&id("d"), HealthReport::new(0.6))
        .await;

    let response = h
        .coordinator
        .handle_global_emergency(GlobalEmergency::new("data-breach", Priority::Critical))
        .await
        .unwrap();

    assert_eq!(response.responders, vec![id("b"), id("c"), id("e")]);
    assert_eq!(response.actions, vec!["isolate", "notify", "refund"]);
    assert_eq!(response.priority, Priority::Critical);
    assert!((response.confidence - 0.7).abs() < 1e-9);
    assert_eq!(d.calls(), 0);
    assert!(!h.coordinator.is_paused());
    assert_eq!(h.coordinator.resource_pool().allocated, 50);

    let stored = h
        .memory
        .retrieve(MemoryQuery::new().of_type(EntryType::Emergency))
        .await;
    assert_eq!(stored.len(), 1);
    assert!(swarm_events(&mut h.events).iter().any(|e| matches!(
        e,
        SwarmEvent::GlobalEmergencyHandled { action_count: 3, .. }
    )));
}

#[tokio::test]
async fn test_global_emergency_without_healthy_swarm() {
    let h = harness(CoordinatorConfig::default());
    let result = h
        .coordinator
        .handle_global_emergency(GlobalEmergency::new("outage", Priority::High))
        .await;
    assert!(matches!(result, Err(SwarmError::NoHealthySwarm)));
    assert!(!h.coordinator.is_paused());

    register(&h.coordinator, "a", "ops", ScriptedUnit::new("go", 0.9).failing()).await;
    let result = h
        .coordinator
        .handle_global_emergency(GlobalEmergency::new("outage", Priority::High))
        .await;
    assert!(matches!(result, Err(SwarmError::CoordinationFailed(_))));
    assert_eq!(h.coordinator.resource_pool().allocated, 10);
}

#[tokio::test]
async fn test_emergency_defers_non_critical_messages() {
    let h = harness(CoordinatorConfig::default());
    register(
        &h.coordinator,
        "a",
        "ops",
        ScriptedUnit::new("go", 0.9).with_delay(Duration::from_millis(400)),
    )
    .await;

    let coordinator = h.coordinator.clone();
    let emergency = tokio::spawn(async move {
        coordinator
            .handle_global_emergency(GlobalEmergency::new("outage", Priority::Critical))
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.coordinator.is_paused());

    h.coordinator.send_message(
        InterSwarmMessage::broadcast(id("a"), serde_json::json!({ "topic": "weekly digest" }))
            .with_priority(Priority::Low),
    );
    h.coordinator.send_message(
        InterSwarmMessage::broadcast(id("a"), serde_json::json!({ "topic": "shut it down" }))
            .with_priority(Priority::Critical),
    );
    assert_eq!(h.coordinator.process_messages().await, 1);
    let deferred = h.coordinator.queued_messages();
    assert_eq!(deferred.len(), 1);
    assert_eq!(deferred[0].priority, Priority::Low);

    emergency.await.unwrap().unwrap();
    assert!(!h.coordinator.is_paused());
    assert_eq!(h.coordinator.process_messages().await, 1);
    assert_eq!(h.coordinator.queue_depth(), 0);
}

#[tokio::test]
async fn test_optimization_reprioritizes_backlog() {
    let mut h = harness(CoordinatorConfig::default());
    for n in 0..100 {
        h.coordinator.send_message(
            InterSwarmMessage::broadcast(id("a"), serde_json::json!({ "n": n }))
                .with_priority(Priority::Low),
        );
    }
    h.coordinator.send_message(
        InterSwarmMessage::broadcast(id("a"), serde_json::json!({ "n": "urgent" }))
            .with_priority(Priority::Critical),
    );

    let optimization = h.coordinator.optimize_network().await;
    assert_eq!(
        optimization.bottlenecks,
        vec![Bottleneck::QueueBacklog { depth: 101 }]
    );
    assert_eq!(optimization.applied.len(), 1);
    assert_eq!(
        optimization.applied[0].kind,
        RecommendationKind::ReprioritizeMessages
    );
    assert_eq!(h.coordinator.queued_messages()[0].priority, Priority::Critical);
    assert!(swarm_events(&mut h.events).iter().any(|e| matches!(
        e,
        SwarmEvent::NetworkOptimized { bottlenecks: 1, applied: 1, advisory: 0, .. }
    )));
}

#[tokio::test]
async fn test_optimization_scales_overloaded_swarm() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "a", "sales", ScriptedUnit::new("go", 0.9)).await;
    for n in 0..9 {
        h.coordinator
            .route_task(Task::new("sales", format!("lead {}", n)))
            .await
            .unwrap();
    }

    let optimization = h.coordinator.optimize_network().await;
    assert_eq!(optimization.bottlenecks.len(), 1);
    assert_eq!(optimization.recommendations.len(), 2);
    assert_eq!(optimization.applied.len(), 1);
    assert!(optimization
        .recommendations
        .iter()
        .any(|r| !r.auto_apply && matches!(r.kind, RecommendationKind::RedistributeLoad { .. })));

    let a = h.coordinator.swarm(&id("a")).await.unwrap();
    assert_eq!(a.allocated_resources, 20);
    assert!((a.metrics.resource_utilization - 0.45).abs() < 1e-9);
    assert_eq!(h.coordinator.resource_pool().allocated, 20);

    let quiet = h.coordinator.optimize_network().await;
    assert!(quiet.bottlenecks.is_empty());
}

fn execution_request(swarm: &str) -> ExecutionRequest {
    ExecutionRequest {
        decision_id: DecisionId::new(),
        source_decision_id: DecisionId::new(),
        swarm_id: id(swarm),
        decision_type: HitlDecisionType::Approval,
        authorization: ExecutionAuthorization::Automatic { confidence: 0.92 },
    }
}

#[tokio::test]
async fn test_executor_applies_decision_to_registered_swarm() {
    let mut h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "sales", "sales", ScriptedUnit::new("go", 0.9)).await;

    let request = execution_request("sales");
    let decision_id = request.decision_id;
    let result = h.coordinator.execute_decision(request).await.unwrap();
    assert_eq!(result.decision_id, decision_id);
    assert_eq!(result.swarm_id, id("sales"));

    let entry = h
        .memory
        .get(&EntryId::new(format!("execution-{}", decision_id)))
        .await
        .unwrap();
    assert_eq!(entry.entry_type, EntryType::Execution);
    assert!(entry.has_tag("mode:automatic"));
    assert!(swarm_events(&mut h.events).iter().any(|e| matches!(
        e,
        SwarmEvent::DecisionExecuted { automatic: true, .. }
    )));

    let missing = h.coordinator.execute_decision(execution_request("ghost")).await;
    assert!(matches!(missing, Err(ExecutionError::SwarmNotFound(_))));
}

#[tokio::test]
async fn test_rejection_is_recorded() {
    let h = harness(CoordinatorConfig::default());
    register(&h.coordinator, "sales", "sales", ScriptedUnit::new("go", 0.9)).await;

    let notice = RejectionNotice {
        decision_id: DecisionId::new(),
        source_decision_id: DecisionId::new(),
        swarm_id: id("sales"),
        reason: "margin too thin".to_string(),
        rejected_by: Some("cfo".to_string()),
    };
    let decision_id = notice.decision_id;
    h.coordinator.notify_rejection(notice).await.unwrap();

    let entry = h
        .memory
        .get(&EntryId::new(format!("rejection-{}", decision_id)))
        .await
        .unwrap();
    assert_eq!(entry.content["reason"], "margin too thin");
}
