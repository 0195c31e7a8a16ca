//! End-to-end tests for the `/ws` push channel.
#![allow(clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: std::net::SocketAddr, session_id: &str) -> Client {
    let Ok((ws, _)) = connect_async(format!("ws://{addr}/ws?session_id={session_id}")).await else {
        panic!("ws connect");
    };
    ws
}

/// Reads frames until a text frame arrives, failing after two seconds.
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let Ok(Some(Ok(frame))) = tokio::time::timeout(Duration::from_secs(2), ws.next()).await
        else {
            panic!("expected a frame");
        };
        if let Message::Text(text) = frame {
            let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("frame is JSON");
            };
            return value;
        }
    }
}

/// Reads envelopes until one of the given `type` arrives.
async fn next_of_type(ws: &mut Client, msg_type: &str) -> Value {
    loop {
        let value = next_json(ws).await;
        if value["type"] == msg_type {
            return value;
        }
    }
}

#[tokio::test]
async fn pushes_presence_and_messages_in_order() {
    let (addr, service) = common::spawn_server().await;
    let Ok(alice) = service.join("alice").await else {
        panic!("join alice");
    };
    let mut ws = connect(addr, &alice.id.to_string()).await;

    let Ok(bob) = service.join("bob").await else {
        panic!("join bob");
    };
    let joined = next_of_type(&mut ws, "event").await;
    assert_eq!(joined["payload"]["event_type"], "user_joined");
    assert_eq!(joined["payload"]["user_id"], "bob");

    for text in ["one", "two", "three"] {
        if service.send(bob.id, text).await.is_err() {
            panic!("send {text}");
        }
    }
    let mut bodies = Vec::new();
    for _ in 0..3 {
        let event = next_of_type(&mut ws, "event").await;
        assert_eq!(event["payload"]["event_type"], "message_posted");
        bodies.push(event["payload"]["message"]["body"].clone());
    }
    assert_eq!(bodies, vec![json!("one"), json!("two"), json!("three")]);
}

#[tokio::test]
async fn send_command_gets_response() {
    let (addr, service) = common::spawn_server().await;
    let Ok(alice) = service.join("alice").await else {
        panic!("join alice");
    };
    let mut ws = connect(addr, &alice.id.to_string()).await;

    let command = json!({
        "id": "req-1",
        "type": "command",
        "payload": { "command": "send", "body": "hello" }
    });
    if ws.send(Message::text(command.to_string())).await.is_err() {
        panic!("ws send");
    }

    let response = next_of_type(&mut ws, "response").await;
    assert_eq!(response["id"], "req-1");
    assert_eq!(response["payload"]["body"], "hello");
    assert_eq!(response["payload"]["sender"], "alice");
    assert_eq!(service.history().await.len(), 1);
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let (addr, _service) = common::spawn_server().await;
    let url = format!("ws://{addr}/ws?session_id={}", uuid::Uuid::new_v4());
    assert!(connect_async(url).await.is_err());
}

#[tokio::test]
async fn second_socket_for_session_is_rejected() {
    let (addr, service) = common::spawn_server().await;
    let Ok(alice) = service.join("alice").await else {
        panic!("join alice");
    };
    let mut first = connect(addr, &alice.id.to_string()).await;

    let url = format!("ws://{addr}/ws?session_id={}", alice.id);
    assert!(connect_async(url).await.is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(service.list_users().await.len(), 1);

    let command = json!({
        "id": "req-2",
        "type": "command",
        "payload": { "command": "list_users" }
    });
    if first.send(Message::text(command.to_string())).await.is_err() {
        panic!("ws send");
    }
    let response = next_of_type(&mut first, "response").await;
    assert_eq!(response["payload"]["users"], json!(["alice"]));
}

#[tokio::test]
async fn evicted_session_socket_is_closed() {
    let (addr, service) = common::spawn_server().await;
    let Ok(alice) = service.join("alice").await else {
        panic!("join alice");
    };
    let mut ws = connect(addr, &alice.id.to_string()).await;

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(service.evict_idle(Duration::from_millis(5)).await.len(), 1);

    let left = next_of_type(&mut ws, "event").await;
    assert_eq!(left["payload"]["event_type"], "user_left");
    assert_eq!(left["payload"]["reason"], "timed_out");
    loop {
        match tokio::time::timeout(Duration::from_secs(2), ws.next()).await {
            Ok(None | Some(Err(_)) | Some(Ok(Message::Close(_)))) => break,
            Ok(Some(Ok(_))) => continue,
            Err(_) => panic!("socket should close after eviction"),
        }
    }
}

#[tokio::test]
async fn closing_socket_leaves_room() {
    let (addr, service) = common::spawn_server().await;
    let Ok(alice) = service.join("alice").await else {
        panic!("join alice");
    };
    let mut ws = connect(addr, &alice.id.to_string()).await;
    let _ = ws.close(None).await;

    for _ in 0..50 {
        if service.list_users().await.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("alice should have left after closing the socket");
}
