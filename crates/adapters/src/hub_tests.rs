// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_connector::TestConnector;
use std::sync::Mutex as StdMutex;

#[test]
fn unregistered_protocol_has_no_entry() {
    let hub = ConnectorHub::new();
    assert!(hub.protocols().is_empty());
}

#[test]
fn register_adds_protocol() {
    let hub = ConnectorHub::new();
    hub.register(Arc::new(TestConnector::new("terminal")));
    assert_eq!(hub.protocols(), vec!["terminal".to_string()]);
}

#[tokio::test]
async fn send_routes_to_registered_connector() {
    let hub = ConnectorHub::new();
    let connector = Arc::new(TestConnector::new("terminal"));
    hub.register(connector.clone());

    hub.send("terminal", "general", "hello", MessageFormat::Raw).await.unwrap();
    assert_eq!(connector.sent(), vec![("general".to_string(), "hello".to_string())]);
}

#[tokio::test]
async fn send_to_unknown_protocol_is_channel_not_found() {
    let hub = ConnectorHub::new();
    let err = hub.send("slack", "general", "hi", MessageFormat::Raw).await.unwrap_err();
    assert!(matches!(err, SendError::ChannelNotFound(_)));
}

#[tokio::test]
async fn incoming_message_reaches_installed_dispatch() {
    let hub = ConnectorHub::new();
    let received: Arc<StdMutex<Vec<IncomingMessage>>> = Arc::new(StdMutex::new(Vec::new()));
    let received_clone = received.clone();
    hub.set_dispatch(Arc::new(move |message: IncomingMessage| {
        received_clone.lock().unwrap().push(message);
    }));

    hub.incoming(IncomingMessage {
        protocol: "terminal".into(),
        user: "alice".into(),
        channel: "general".into(),
        direct: false,
        text: "hi".into(),
        raw: "hi".into(),
    })
    .await;

    assert_eq!(received.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn default_dispatch_drops_messages_silently() {
    let hub = ConnectorHub::new();
    hub.incoming(IncomingMessage {
        protocol: "terminal".into(),
        user: "alice".into(),
        channel: "general".into(),
        direct: false,
        text: "hi".into(),
        raw: "hi".into(),
    })
    .await;
}
