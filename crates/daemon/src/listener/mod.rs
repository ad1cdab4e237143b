// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP callback listener: binds the port advertised in `HTTP_POST`,
//! accepts connections without blocking the rest of the daemon, and
//! dispatches each decoded directive through a [`CallbackDispatcher`].

use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};

use crate::callback::{CallbackDirective, CallbackDispatcher, CallbackError};
use crate::http_wire::{self, HttpResponse, DEFAULT_TIMEOUT};

const CALLBACK_PATH: &str = "/callback";

pub struct CallbackListener {
    socket: TcpListener,
    dispatcher: Arc<CallbackDispatcher>,
}

impl CallbackListener {
    pub fn new(socket: TcpListener, dispatcher: Arc<CallbackDispatcher>) -> Self {
        Self { socket, dispatcher }
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Accept connections until the process is torn down. Each connection
    /// is handled on its own task so one slow task script cannot stall
    /// another's callback.
    pub async fn run(self) {
        loop {
            match self.socket.accept().await {
                Ok((stream, _)) => {
                    let dispatcher = Arc::clone(&self.dispatcher);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &dispatcher).await {
                            warn!("callback connection error: {}", e);
                        }
                    });
                }
                Err(e) => error!("callback accept error: {}", e),
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, dispatcher: &CallbackDispatcher) -> Result<(), http_wire::HttpError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = http_wire::read_request_with_timeout(&mut reader, DEFAULT_TIMEOUT).await?;
    debug!(method = %request.method, path = %request.path, "received callback request");

    let response = if request.method != "POST" || request.path != CALLBACK_PATH {
        HttpResponse::not_found("unknown route")
    } else {
        handle_callback_body(dispatcher, &request.body).await
    };

    http_wire::write_response(&mut write_half, &response).await
}

async fn handle_callback_body(dispatcher: &CallbackDispatcher, body: &[u8]) -> HttpResponse {
    #[derive(serde::Deserialize)]
    struct Envelope {
        caller_id: String,
        #[serde(flatten)]
        directive: CallbackDirective,
    }

    let envelope: Envelope = match serde_json::from_slice(body) {
        Ok(e) => e,
        Err(e) => return HttpResponse::bad_request(&format!("malformed callback body: {e}")),
    };

    match dispatcher.dispatch(&envelope.caller_id, envelope.directive).await {
        Ok(value) => HttpResponse::ok(value.to_string().into_bytes()),
        Err(CallbackError::UnknownCaller(id)) => HttpResponse::not_found(&format!("unknown caller id: {id}")),
        Err(e) => HttpResponse::bad_request(&e.to_string()),
    }
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
