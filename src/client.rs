// src/client.rs

//! One-shot trigger client (`scriptd send`).

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::errors::{Result, ScriptdError};

/// Largest reply we are willing to read.
const MAX_REPLY_BYTES: u64 = 4096;

/// Send `message` to the trigger server at `addr` and return its reply line.
///
/// The write side is shut down after sending so the server sees EOF right
/// away instead of waiting for its idle bound.
pub async fn send_message(addr: &str, message: &str, wait: Duration) -> Result<String> {
    let exchange = async {
        let mut stream = TcpStream::connect(addr).await?;
        stream.write_all(message.as_bytes()).await?;
        stream.shutdown().await?;

        let mut reply = Vec::new();
        (&mut stream)
            .take(MAX_REPLY_BYTES)
            .read_to_end(&mut reply)
            .await?;
        Ok::<_, std::io::Error>(reply)
    };

    let reply = timeout(wait, exchange).await.map_err(|_| {
        ScriptdError::IoError(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!("no reply from {addr} within {wait:?}"),
        ))
    })??;

    let reply = String::from_utf8_lossy(&reply).trim().to_string();
    debug!(%addr, %message, %reply, "trigger exchange complete");
    Ok(reply)
}
