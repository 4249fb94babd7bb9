//! Integration tests for the WebSocket client and the transport task.
//!
//! These tests run a local WebSocket server on an ephemeral port and exercise
//! real network I/O.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use makerpass_network::{
    Incoming, TransportCommand, TransportConfig, TransportEvent, WsClient, WsClientConfig,
    WsClientError, spawn_transport,
};
use makerpass_protocol::Outbound;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const STEP: Duration = Duration::from_secs(5);

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn next_event(events: &mut mpsc::Receiver<TransportEvent>) -> TransportEvent {
    timeout(STEP, events.recv())
        .await
        .expect("timed out waiting for transport event")
        .expect("transport stopped")
}

/// Connect, exchange text in both directions, observe a ping and a close.
#[tokio::test]
async fn test_client_full_lifecycle() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let received = ws.next().await.unwrap().unwrap();
        ws.send(Message::Text(r#"{"type":"ping"}"#.to_string()))
            .await
            .unwrap();
        ws.send(Message::Ping(vec![1, 2, 3])).await.unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
        received
    });

    let mut client = WsClient::new(WsClientConfig {
        url,
        timeout: Duration::from_secs(1),
    });
    client.connect().await.unwrap();
    assert!(client.is_connected());

    client
        .send_text(r#"{"type":"pong"}"#.to_string())
        .await
        .unwrap();

    assert_eq!(
        client.recv().await.unwrap(),
        Incoming::Text(r#"{"type":"ping"}"#.to_string())
    );
    assert_eq!(client.recv().await.unwrap(), Incoming::Activity);
    assert_eq!(client.recv().await.unwrap(), Incoming::Closed(None));
    assert!(!client.is_connected());

    let received = server.await.unwrap();
    assert_eq!(received, Message::Text(r#"{"type":"pong"}"#.to_string()));
}

/// Connecting to a port nobody listens on fails without hanging.
#[tokio::test]
async fn test_client_connection_refused() {
    let (listener, url) = bind().await;
    drop(listener);

    let mut client = WsClient::new(WsClientConfig {
        url,
        timeout: Duration::from_secs(1),
    });
    let result = client.connect().await;
    assert!(matches!(
        result,
        Err(WsClientError::WebSocket(_) | WsClientError::ConnectionTimeout(_))
    ));
    assert!(!client.is_connected());
}

/// The transport forwards traffic, reports the loss, and reconnects.
#[tokio::test]
async fn test_transport_reconnects_after_close() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        // First connection: read one message, push one, then close
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let first = ws.next().await.unwrap().unwrap();
        ws.send(Message::Text(r#"{"type":"access_granted","user":"Alice"}"#.to_string()))
            .await
            .unwrap();
        ws.close(None).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}

        // Second connection: read one message
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let second = ws.next().await.unwrap().unwrap();
        (first, second)
    });

    let (handle, task) = spawn_transport(TransportConfig {
        url,
        reconnect_interval: Duration::from_millis(50),
        connect_timeout: Duration::from_secs(1),
    });
    let (commands, mut events) = handle.into_parts();

    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
    commands
        .send(TransportCommand::Send(Outbound::Pong))
        .await
        .unwrap();

    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Text(r#"{"type":"access_granted","user":"Alice"}"#.to_string())
    );
    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Disconnected { .. }
    ));
    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);

    commands
        .send(TransportCommand::Send(Outbound::SessionEnd {
            resource_id: "ERNPTY".into(),
            session_id: "S1".into(),
        }))
        .await
        .unwrap();

    let (first, second) = timeout(STEP, server).await.unwrap().unwrap();
    assert_eq!(first, Message::Text(r#"{"type":"pong"}"#.to_string()));
    assert_eq!(
        second,
        Message::Text(
            r#"{"type":"session_end","resource_id":"ERNPTY","session_id":"S1"}"#.to_string()
        )
    );

    commands.send(TransportCommand::Shutdown).await.unwrap();
    timeout(STEP, task).await.unwrap().unwrap();
}

/// A requested disconnect closes the socket and reports it.
#[tokio::test]
async fn test_transport_disconnect_command() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (handle, task) = spawn_transport(TransportConfig {
        url,
        reconnect_interval: Duration::from_secs(60),
        connect_timeout: Duration::from_secs(1),
    });
    let (commands, mut events) = handle.into_parts();

    assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
    commands
        .send(TransportCommand::Disconnect {
            reason: "keep-alive timeout".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Disconnected {
            reason: "keep-alive timeout".into()
        }
    );

    // Shutdown is honoured while waiting to reconnect
    commands.send(TransportCommand::Shutdown).await.unwrap();
    timeout(STEP, task).await.unwrap().unwrap();
}

/// With no authority reachable the transport stays quiet and still shuts down.
#[tokio::test]
async fn test_transport_unreachable_drops_sends() {
    let (listener, url) = bind().await;
    drop(listener);

    let (handle, task) = spawn_transport(TransportConfig {
        url,
        reconnect_interval: Duration::from_millis(20),
        connect_timeout: Duration::from_millis(200),
    });
    let (commands, mut events) = handle.into_parts();

    commands
        .send(TransportCommand::Send(Outbound::Pong))
        .await
        .unwrap();
    assert!(
        timeout(Duration::from_millis(200), events.recv())
            .await
            .is_err()
    );

    drop(commands);
    timeout(STEP, task).await.unwrap().unwrap();
}
