// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn records_successful_sends() {
    let connector = TestConnector::new("test");
    connector.send("general", "hello", MessageFormat::Raw).await.unwrap();
    assert_eq!(connector.sent(), vec![("general".to_string(), "hello".to_string())]);
}

#[tokio::test]
async fn refusing_channel_returns_error() {
    let connector = TestConnector::refusing("test", "locked-room");
    let err = connector.send("locked-room", "hi", MessageFormat::Raw).await.unwrap_err();
    assert!(matches!(err, SendError::ChannelNotFound(_)));
    assert!(connector.sent().is_empty());
}

#[tokio::test]
async fn run_exits_when_stop_is_signaled() {
    use std::sync::Arc;
    struct NullHandler;
    #[async_trait]
    impl Handler for NullHandler {
        fn log(&self, _level: tracing::Level, _message: &str) {}
        async fn incoming(&self, _message: crate::connector::IncomingMessage) {}
    }

    let connector = TestConnector::new("test");
    let (tx, rx) = tokio::sync::mpsc::channel(1);
    let handle = tokio::spawn(async move {
        connector.run(Arc::new(NullHandler), rx).await;
    });
    drop(tx);
    tokio::time::timeout(std::time::Duration::from_secs(1), handle).await.unwrap().unwrap();
}
