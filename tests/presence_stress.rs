//! Concurrency tests for presence and message ordering.
#![allow(clippy::panic)]

use std::sync::Arc;

use roomcast::domain::{EventBus, PresenceRegistry};
use roomcast::error::ChatError;
use roomcast::service::ChatService;

fn make_service() -> ChatService {
    ChatService::new(Arc::new(PresenceRegistry::new()), EventBus::new(4096))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_concurrent_joins_all_succeed() {
    let service = make_service();
    let handles: Vec<_> = (0..64)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move { service.join(&format!("user{i:02}")).await })
        })
        .collect();
    for handle in handles {
        let Ok(Ok(_)) = handle.await else {
            panic!("join should succeed");
        };
    }

    let users: Vec<String> = service
        .list_users()
        .await
        .into_iter()
        .map(|u| u.to_string())
        .collect();
    let mut sorted = users.clone();
    sorted.sort();
    assert_eq!(users.len(), 64);
    assert_eq!(users, sorted);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_identifier_is_claimed_once() {
    let service = make_service();
    let handles: Vec<_> = (0..32)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.join("alice").await })
        })
        .collect();

    let mut won = 0;
    let mut taken = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(_)) => won += 1,
            Ok(Err(ChatError::AlreadyTaken(_))) => taken += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(taken, 31);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn subscribers_observe_log_order() {
    let service = make_service();
    let mut subscription = service.subscribe().await;
    let senders: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|name| {
            let service = service.clone();
            tokio::spawn(async move {
                let Ok(session) = service.join(name).await else {
                    panic!("join {name}");
                };
                for i in 0..25 {
                    let _ = service.send(session.id, &format!("{name}{i}")).await;
                }
            })
        })
        .collect();
    for sender in senders {
        let _ = sender.await;
    }

    let history = service.history().await;
    assert_eq!(history.len(), 100);

    let mut seen = Vec::new();
    while let Ok(event) = subscription.receiver.try_recv() {
        if let Some(seq) = event.seq() {
            seen.push(seq);
        }
    }
    let logged: Vec<u64> = history.iter().map(|m| m.seq).collect();
    assert_eq!(seen, logged);
}
