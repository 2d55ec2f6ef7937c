//! Concurrency tests for chatrelay.
//!
//! These tests verify the registry and room invariants under concurrent
//! joins, leaves, and publishes from many tasks.

use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use chatrelay::bridge::InMemoryBus;
use chatrelay::chat::{RoomMember, RoomRegistry};
use chatrelay::protocol::ChatEvent;

fn test_registry() -> Arc<RoomRegistry> {
    Arc::new(RoomRegistry::new(Arc::new(InMemoryBus::new())))
}

fn test_member(name: &str) -> (RoomMember, mpsc::Receiver<ChatEvent>) {
    let (tx, rx) = mpsc::channel(256);
    (RoomMember::new(Uuid::new_v4(), name, tx), rx)
}

/// N sessions joining the same brand-new room id concurrently must end up
/// in a single room.
#[tokio::test]
async fn test_concurrent_joins_to_new_room() {
    let registry = test_registry();

    const NUM_SESSIONS: usize = 20;

    let mut handles = Vec::new();
    for i in 0..NUM_SESSIONS {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let (member, _rx) = test_member(&format!("user{i}"));
            registry.join_or_create("fresh", member).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(registry.room_count().await, 1);
    let room = registry.get("fresh").await.unwrap();
    assert_eq!(room.member_count().await, NUM_SESSIONS);
}

/// Concurrent joins across different room ids each get their own room.
#[tokio::test]
async fn test_concurrent_joins_to_different_rooms() {
    let registry = test_registry();

    const NUM_ROOMS: usize = 10;

    let mut handles = Vec::new();
    for i in 0..NUM_ROOMS {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            let (member, _rx) = test_member(&format!("user{i}"));
            registry.join_or_create(&format!("room-{i}"), member).await
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(registry.room_count().await, NUM_ROOMS);
}

/// Concurrent leaves, including doubled-up leaves for the same session,
/// never leave an empty room behind.
#[tokio::test]
async fn test_concurrent_leaves_destroy_room_once() {
    let registry = test_registry();

    const NUM_SESSIONS: usize = 10;

    let mut session_ids = Vec::new();
    let mut receivers = Vec::new();
    for i in 0..NUM_SESSIONS {
        let (member, rx) = test_member(&format!("user{i}"));
        session_ids.push(member.session_id);
        receivers.push(rx);
        registry.join_or_create("lobby", member).await.unwrap();
    }

    // Each session leaves twice, concurrently
    let mut handles = Vec::new();
    for session_id in session_ids {
        for _ in 0..2 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry.leave("lobby", session_id).await
            }));
        }
    }

    let mut removed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            removed += 1;
        }
    }

    // Each session was removed exactly once; the duplicates were no-ops
    assert_eq!(removed, NUM_SESSIONS);
    assert_eq!(registry.room_count().await, 0);
}

/// Concurrent publishes from every member are each delivered to every
/// member exactly once.
#[tokio::test]
async fn test_concurrent_publishes_reach_all_members() {
    let registry = test_registry();

    const NUM_SESSIONS: usize = 5;
    const MESSAGES_EACH: usize = 10;

    let mut receivers = Vec::new();
    for i in 0..NUM_SESSIONS {
        let (member, rx) = test_member(&format!("user{i}"));
        receivers.push(rx);
        registry.join_or_create("busy", member).await.unwrap();
    }

    let room = registry.get("busy").await.unwrap();

    let mut handles = Vec::new();
    for i in 0..NUM_SESSIONS {
        let room = Arc::clone(&room);
        handles.push(tokio::spawn(async move {
            for n in 0..MESSAGES_EACH {
                room.publish(&ChatEvent::chat(format!("m{n}"), format!("user{i}")))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Every member sees every message exactly once
    let expected = NUM_SESSIONS * MESSAGES_EACH;
    for rx in &mut receivers {
        let mut count = 0;
        while count < expected {
            match tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv()).await {
                Ok(Some(_)) => count += 1,
                other => panic!("delivery stopped early after {count}: {other:?}"),
            }
        }
        assert_eq!(count, expected);
    }
}

/// A member leaving while traffic is in flight neither stalls delivery to
/// the others nor resurrects the room after the last leave.
#[tokio::test]
async fn test_leave_races_with_publishes() {
    let registry = test_registry();

    let (alice, mut alice_rx) = test_member("alice");
    let (bob, _bob_rx) = test_member("bob");
    let alice_id = alice.session_id;
    let bob_id = bob.session_id;

    registry.join_or_create("lobby", alice).await.unwrap();
    let room = registry.join_or_create("lobby", bob).await.unwrap();

    let publisher = {
        let room = Arc::clone(&room);
        tokio::spawn(async move {
            for n in 0..50 {
                if room
                    .publish(&ChatEvent::chat(format!("m{n}"), "alice"))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        })
    };

    registry.leave("lobby", bob_id).await;
    publisher.await.unwrap();

    // Alice is still a member and still receives traffic
    assert_eq!(registry.room_count().await, 1);
    assert!(alice_rx.recv().await.is_some());

    registry.leave("lobby", alice_id).await;
    assert_eq!(registry.room_count().await, 0);
}
