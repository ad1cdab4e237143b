// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-rolled HTTP/1.1 framing for the callback channel.
//!
//! Parses just enough of the request line, headers, and body to serve
//! task scripts calling back over `HTTP_POST`. Not a general-purpose HTTP
//! server: one route, `POST /callback`, JSON body.

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum request/response body size (16 MB — callback payloads are small
/// directives, not file transfers).
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Default read/write timeout for a callback connection.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("malformed header")]
    MalformedHeader,
    #[error("missing or invalid Content-Length")]
    MissingContentLength,
    #[error("body too large: {size} bytes (max {max})")]
    BodyTooLarge { size: usize, max: usize },
    #[error("connection closed before a complete request arrived")]
    ConnectionClosed,
    #[error("timeout")]
    Timeout,
}

pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct HttpResponse {
    pub status: u16,
    pub reason: &'static str,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, reason: "OK", body }
    }

    pub fn bad_request(message: &str) -> Self {
        Self { status: 400, reason: "Bad Request", body: message.as_bytes().to_vec() }
    }

    pub fn not_found(message: &str) -> Self {
        Self { status: 404, reason: "Not Found", body: message.as_bytes().to_vec() }
    }

    pub fn internal_error(message: &str) -> Self {
        Self { status: 500, reason: "Internal Server Error", body: message.as_bytes().to_vec() }
    }
}

/// Read one line ending in `\r\n` (the terminator is consumed, not returned).
async fn read_line<R: tokio::io::AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<String, HttpError> {
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).await?;
    if bytes_read == 0 {
        return Err(HttpError::ConnectionClosed);
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read and parse a full HTTP request: request line, headers, body.
pub async fn read_request<R: tokio::io::AsyncBufReadExt + Unpin>(reader: &mut R) -> Result<HttpRequest, HttpError> {
    let request_line = read_line(reader).await?;
    let mut parts = request_line.split(' ');
    let method = parts.next().ok_or(HttpError::MalformedRequestLine)?.to_string();
    let path = parts.next().ok_or(HttpError::MalformedRequestLine)?.to_string();
    parts.next().ok_or(HttpError::MalformedRequestLine)?; // HTTP version, ignored

    let mut headers = Vec::new();
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }
        let (name, value) = line.split_once(':').ok_or(HttpError::MalformedHeader)?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let content_length: usize = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse().ok())
        .unwrap_or(0);

    if content_length > MAX_BODY_SIZE {
        return Err(HttpError::BodyTooLarge { size: content_length, max: MAX_BODY_SIZE });
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body).await?;
    }

    Ok(HttpRequest { method, path, headers, body })
}

/// Write an HTTP/1.1 response.
pub async fn write_response<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    response: &HttpResponse,
) -> Result<(), HttpError> {
    let header = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.reason,
        response.body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&response.body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a request with a timeout, mapping elapsed-timeout into [`HttpError::Timeout`].
pub async fn read_request_with_timeout<R: tokio::io::AsyncBufReadExt + Unpin>(
    reader: &mut R,
    timeout: std::time::Duration,
) -> Result<HttpRequest, HttpError> {
    tokio::time::timeout(timeout, read_request(reader)).await.map_err(|_| HttpError::Timeout)?
}

#[cfg(test)]
#[path = "http_wire_tests.rs"]
mod tests;
