// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn send_to_wrong_channel_is_refused() {
    let connector = TerminalConnector::new("general", "local");
    let err = connector.send("other", "hi", MessageFormat::Raw).await.unwrap_err();
    assert!(matches!(err, SendError::ChannelNotFound(_)));
}

#[tokio::test]
async fn send_to_configured_channel_succeeds() {
    let connector = TerminalConnector::new("general", "local");
    connector.send("general", "hi", MessageFormat::Raw).await.unwrap();
}

#[test]
fn protocol_is_terminal() {
    let connector = TerminalConnector::new("general", "local");
    assert_eq!(connector.protocol(), "terminal");
}
