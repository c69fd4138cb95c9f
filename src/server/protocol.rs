// src/server/protocol.rs

//! Wire format of the trigger protocol.
//!
//! One request per connection: the client sends a token (no framing beyond
//! EOF or a newline), the server answers with a single line and closes.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{Instant, timeout};

use crate::exec::StartOutcome;

pub const INVALID_MESSAGE_REPLY: &str = "Error: invalid message.\n";

/// Bounds on how much and how long we read from one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub max_bytes: usize,
    /// Total time allowed for the request.
    pub read_timeout: Duration,
    /// Silence tolerated once the first bytes arrived.
    pub idle_timeout: Duration,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_bytes: 1024,
            read_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_millis(250),
        }
    }
}

/// Read one request.
///
/// Stops at EOF, at the first `\n` (excluded), after `max_bytes`, or when a
/// time bound expires; whatever arrived so far is the request.
pub async fn read_request<R>(reader: &mut R, limits: &ReadLimits) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let deadline = Instant::now() + limits.read_timeout;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];

    while buf.len() < limits.max_bytes {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let wait = if buf.is_empty() {
            remaining
        } else {
            remaining.min(limits.idle_timeout)
        };

        let n = match timeout(wait, reader.read(&mut chunk)).await {
            Err(_elapsed) => break,
            Ok(read) => read?,
        };
        if n == 0 {
            break;
        }

        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            buf.truncate(pos);
            break;
        }
    }

    buf.truncate(limits.max_bytes);
    Ok(buf)
}

/// Decode a request into the token to look up.
pub fn parse_token(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).trim().to_string()
}

pub fn acknowledged_reply(file_name: &str) -> String {
    format!("Acknowledged: triggered {file_name}.\n")
}

/// Reply for a recognised token.
///
/// Without `detailed`, every outcome is acknowledged as "triggered", which is
/// what existing clients expect.
pub fn reply_for_outcome(outcome: &StartOutcome, file_name: &str, detailed: bool) -> String {
    if !detailed {
        return acknowledged_reply(file_name);
    }
    match outcome {
        StartOutcome::Started => acknowledged_reply(file_name),
        StartOutcome::AlreadyRunningToggledOff => {
            format!("Acknowledged: stopped {file_name}.\n")
        }
        StartOutcome::NotFound => INVALID_MESSAGE_REPLY.to_string(),
        StartOutcome::LaunchError(message) => {
            format!("Error: failed to launch {file_name}: {}.\n", message.trim_end_matches('.'))
        }
    }
}
