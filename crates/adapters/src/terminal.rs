// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A demonstration connector that reads lines from stdin and writes
//! replies to stdout. Useful for local development and manual testing;
//! not meant to run more than one at a time.

use std::sync::Arc;

use async_trait::async_trait;
use murmur_core::MessageFormat;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::connector::{Connector, Handler, IncomingMessage, SendError};

pub struct TerminalConnector {
    channel_name: String,
    user_name: String,
}

impl TerminalConnector {
    pub fn new(channel_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            channel_name: channel_name.into(),
            user_name: user_name.into(),
        }
    }
}

#[async_trait]
impl Connector for TerminalConnector {
    fn protocol(&self) -> &str {
        "terminal"
    }

    async fn run(&self, handler: Arc<dyn Handler>, mut stop: mpsc::Receiver<()>) {
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();
        loop {
            tokio::select! {
                _ = stop.recv() => break,
                line = lines.next_line() => {
                    match line {
                        Ok(Some(text)) => {
                            handler
                                .incoming(IncomingMessage {
                                    protocol: "terminal".to_string(),
                                    user: self.user_name.clone(),
                                    channel: self.channel_name.clone(),
                                    direct: false,
                                    text: text.clone(),
                                    raw: text,
                                })
                                .await;
                        }
                        Ok(None) => break,
                        Err(err) => {
                            handler.log(tracing::Level::WARN, &format!("terminal connector read error: {err}"));
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn send(&self, channel: &str, text: &str, _format: MessageFormat) -> Result<(), SendError> {
        if channel != self.channel_name {
            return Err(SendError::ChannelNotFound(channel.to_string()));
        }
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|err| SendError::Failed(err.to_string()))?;
        stdout.flush().await.map_err(|err| SendError::Failed(err.to_string()))
    }
}

#[cfg(test)]
#[path = "terminal_tests.rs"]
mod tests;
