use std::collections::HashMap;
use std::time::Duration;

use monologue::{Actor, ActorError, Capabilities, CloneSnapshot, DEFAULT_CALL_TIMEOUT};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};

// Helper for an actor that answers every message with its uppercase form
fn uppercase_actor() -> Actor<String, String> {
    Actor::spawn(|caps: Capabilities<String>, message: String| async move {
        caps.emit(message.to_uppercase());
    })
}

// Helper for an actor that never emits anything
fn silent_actor() -> Actor<String, String> {
    Actor::spawn(|_caps: Capabilities<String>, _message: String| async move {})
}

// Helper for an actor that forwards every message it was handed out on a
// side channel, so tests can inspect exactly what the behavior observed
fn recording_actor(seen_tx: mpsc::UnboundedSender<Payload>) -> Actor<Payload, String> {
    Actor::spawn(move |_caps: Capabilities<String>, message: Payload| {
        let seen_tx = seen_tx.clone();
        async move {
            let _ = seen_tx.send(message);
        }
    })
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Payload {
    label: String,
    values: Vec<u32>,
}

#[tokio::test]
async fn test_send_hands_the_behavior_an_independent_copy() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let actor = recording_actor(seen_tx);

    let mut message = Payload {
        label: "original".to_string(),
        values: vec![1, 2, 3],
    };
    actor.send(&message).await.unwrap();

    // Mutations after submission must be invisible to the behavior.
    message.label.push_str("-mutated");
    message.values.push(4);

    let observed = seen_rx.recv().await.unwrap();
    assert_eq!(
        observed,
        Payload {
            label: "original".to_string(),
            values: vec![1, 2, 3],
        }
    );
}

#[tokio::test]
async fn test_send_on_closed_actor_is_rejected() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let actor = recording_actor(seen_tx);
    actor.close();

    let message = Payload {
        label: "late".to_string(),
        values: vec![1],
    };
    let result = actor.send(&message).await;
    assert!(matches!(result, Err(ActorError::Closed(_))));

    // The behavior never ran.
    sleep(Duration::from_millis(20)).await;
    assert!(seen_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_send_returns_before_a_slow_behavior_finishes() {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let actor = Actor::spawn(move |_caps: Capabilities<String>, message: String| {
        let done_tx = done_tx.clone();
        async move {
            sleep(Duration::from_millis(200)).await;
            let _ = done_tx.send(message);
        }
    });

    let started = Instant::now();
    actor.send(&"slow".to_string()).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(150));

    // The invocation still runs to completion on its own task.
    assert_eq!(done_rx.recv().await, Some("slow".to_string()));
}

#[tokio::test]
async fn test_call_resolves_with_first_reply() {
    let actor = uppercase_actor();
    let reply = actor
        .call(&"hi".to_string(), DEFAULT_CALL_TIMEOUT)
        .await
        .unwrap();
    assert_eq!(reply, "HI");
}

#[tokio::test]
async fn test_call_on_closed_actor_resolves_immediately() {
    let actor = uppercase_actor();
    actor.close();

    let started = Instant::now();
    let result = actor.call(&"hi".to_string(), Duration::from_secs(5)).await;
    assert!(matches!(result, Err(ActorError::Closed(_))));
    // No deadline-length wait on a closed actor.
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_call_times_out_when_behavior_stays_silent() {
    let actor = silent_actor();

    let started = Instant::now();
    let result = actor.call(&"x".to_string(), Duration::from_millis(50)).await;
    match result {
        Err(ActorError::Timeout(id, deadline)) => {
            assert_eq!(&id, actor.id());
            assert_eq!(deadline, Duration::from_millis(50));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_zero_deadline_times_out_without_waiting() {
    let actor = silent_actor();

    let started = Instant::now();
    let result = actor.call(&"x".to_string(), Duration::ZERO).await;
    assert!(matches!(result, Err(ActorError::Timeout(_, d)) if d == Duration::ZERO));
    assert!(started.elapsed() < Duration::from_millis(100));
}

#[test_log::test(tokio::test)]
async fn test_racing_reply_and_deadline_settle_exactly_once() {
    // Emission delay and deadline deliberately coincide; each call must
    // settle exactly once, with either outcome valid. Replies may come from
    // any invocation's emission, which is the documented broadcast semantics.
    let actor = Actor::spawn(|caps: Capabilities<String>, message: String| async move {
        sleep(Duration::from_millis(10)).await;
        caps.emit(message);
    });

    for _ in 0..25 {
        let result = actor.call(&"tick".to_string(), Duration::from_millis(10)).await;
        match result {
            Ok(value) => assert_eq!(value, "tick"),
            Err(ActorError::Timeout(_, _)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn test_late_emissions_skip_a_completed_call() {
    let actor = Actor::spawn(|caps: Capabilities<String>, message: String| async move {
        caps.emit(format!("{message}-first"));
        caps.emit(format!("{message}-second"));
    });
    let mut audience = actor.subscribe().await;

    let reply = actor.call(&"x".to_string(), Duration::from_secs(1)).await.unwrap();
    assert_eq!(reply, "x-first");

    // The persistent listener still sees every emission.
    assert_eq!(audience.recv().await, Some("x-first".to_string()));
    assert_eq!(audience.recv().await, Some("x-second".to_string()));
}

#[tokio::test]
async fn test_emissions_after_a_timeout_reach_remaining_listeners_only() {
    let actor = Actor::spawn(|caps: Capabilities<String>, message: String| async move {
        sleep(Duration::from_millis(150)).await;
        caps.emit(message.to_uppercase());
    });
    let mut audience = actor.subscribe().await;

    let result = actor.call(&"late".to_string(), Duration::from_millis(25)).await;
    assert!(matches!(result, Err(ActorError::Timeout(_, _))));

    // The delayed emission lands for the subscriber; the timed-out call's
    // listener is already gone.
    assert_eq!(audience.recv().await, Some("LATE".to_string()));
}

#[tokio::test]
async fn test_every_subscriber_sees_each_emission_once() {
    let actor = uppercase_actor();
    let mut first = actor.subscribe().await;
    let mut second = actor.subscribe().await;
    let mut third = actor.subscribe().await;

    actor.send(&"hi".to_string()).await.unwrap();

    for audience in [&mut first, &mut second, &mut third] {
        assert_eq!(audience.recv().await, Some("HI".to_string()));
        assert!(audience.try_recv().is_none());
    }
}

#[tokio::test]
async fn test_dropping_a_subscription_deregisters_it() {
    let actor = uppercase_actor();
    let first = actor.subscribe().await;
    let mut second = actor.subscribe().await;
    drop(first);

    actor.send(&"hi".to_string()).await.unwrap();

    assert_eq!(second.recv().await, Some("HI".to_string()));
    sleep(Duration::from_millis(10)).await;
    assert!(second.try_recv().is_none());
}

#[tokio::test]
async fn test_close_rejects_pending_calls_eagerly() {
    let actor = silent_actor();

    let started = Instant::now();
    let caller = {
        let actor = actor.clone();
        tokio::spawn(async move { actor.call(&"x".to_string(), Duration::from_secs(30)).await })
    };

    // Let the call register, then close underneath it.
    sleep(Duration::from_millis(20)).await;
    actor.close();

    let result = caller.await.unwrap();
    assert!(matches!(result, Err(ActorError::Closed(_))));
    // Rejected well before the 30s deadline.
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_close_is_idempotent_and_observable() {
    let actor = uppercase_actor();
    assert!(!actor.is_closed().await);

    actor.close();
    actor.close();

    assert!(actor.is_closed().await);
    let result = actor.call(&"hi".to_string(), Duration::from_secs(5)).await;
    assert!(matches!(result, Err(ActorError::Closed(_))));
}

#[test_log::test(tokio::test)]
async fn test_behavior_driven_close_tears_down_and_rejects_followups() {
    let actor = Actor::spawn(|caps: Capabilities<String>, message: String| async move {
        caps.close();
        caps.emit(message);
    });
    let mut audience = actor.subscribe().await;

    actor.send(&"last".to_string()).await.unwrap();

    // The close lands before the trailing emit, so the emission reaches an
    // empty registry and the subscription stream simply ends.
    assert_eq!(audience.recv().await, None);
    assert!(actor.is_closed().await);

    let result = actor.call(&"next".to_string(), Duration::from_secs(5)).await;
    assert!(matches!(result, Err(ActorError::Closed(_))));
}

#[tokio::test]
async fn test_subscribing_to_a_closed_actor_ends_immediately() {
    let actor = uppercase_actor();
    actor.close();

    let mut audience = actor.subscribe().await;
    assert_eq!(audience.recv().await, None);
}

#[tokio::test]
async fn test_clones_address_the_same_actor() {
    let actor = uppercase_actor();
    let clone = actor.clone();
    assert_eq!(actor.id(), clone.id());

    clone.close();
    let result = actor.send(&"hi".to_string()).await;
    assert!(matches!(result, Err(ActorError::Closed(_))));
}

#[tokio::test]
async fn test_unrepresentable_messages_fail_as_snapshot_errors() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let actor = Actor::spawn(
        move |_caps: Capabilities<String>, message: HashMap<(u8, u8), String>| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(message);
            }
        },
    );

    let mut unrepresentable = HashMap::new();
    unrepresentable.insert((1, 2), "tuple keys have no JSON shape".to_string());
    let result = actor.send(&unrepresentable).await;
    assert!(matches!(result, Err(ActorError::Snapshot(_))));

    // Distinct from closed: the actor still accepts representable input.
    assert!(!actor.is_closed().await);
    let empty: HashMap<(u8, u8), String> = HashMap::new();
    actor.send(&empty).await.unwrap();
    let observed = seen_rx.recv().await.unwrap();
    assert!(observed.is_empty());
}

#[tokio::test]
async fn test_clone_snapshot_strategy_is_pluggable() {
    let actor = Actor::spawn_with_snapshot(
        |caps: Capabilities<String>, message: String| async move {
            caps.emit(message);
        },
        CloneSnapshot,
    );

    let reply = actor
        .call(&"plain".to_string(), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(reply, "plain");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_all_settle() {
    let actor = Actor::spawn(|caps: Capabilities<String>, message: String| async move {
        sleep(Duration::from_millis(10)).await;
        caps.emit(message.to_uppercase());
    });

    let mut workers = Vec::new();
    for index in 0..8 {
        let actor = actor.clone();
        workers.push(tokio::spawn(async move {
            actor.call(&format!("msg-{index}"), Duration::from_secs(2)).await
        }));
    }

    // One emission may satisfy several pending calls; every call must still
    // settle Ok, exactly once.
    for worker in workers {
        let reply = worker.await.unwrap().unwrap();
        assert!(reply.starts_with("MSG-"), "unexpected reply: {reply}");
    }
}
