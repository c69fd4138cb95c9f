// src/exec/output.rs

//! Output capture: read a child's pipe in chunks and republish each chunk as
//! a `Log` event.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::exec::events::{EventSender, SupervisorEvent};
use crate::types::ScriptId;

const READ_CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    fn as_str(self) -> &'static str {
        match self {
            OutputStream::Stdout => "stdout",
            OutputStream::Stderr => "stderr",
        }
    }
}

/// Incremental UTF-8 decoder.
///
/// Invalid sequences become U+FFFD. A multi-byte character cut in half by a
/// read boundary is held back and completed by the next chunk instead of
/// being replaced.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            // Truncated sequence at the end of the input.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush whatever is still held back (the stream ended mid-character).
    pub fn finish(&mut self) -> String {
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }
}

/// Forward everything read from `reader` as `Log` events until EOF.
pub async fn pump_output<R>(mut reader: R, id: ScriptId, stream: OutputStream, events: EventSender)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    let mut decoder = Utf8ChunkDecoder::new();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                trace!(script = %id, stream = stream.as_str(), bytes = n, "output chunk");
                let text = decoder.decode(&buf[..n]);
                if !text.is_empty() {
                    let _ = events.send(SupervisorEvent::Log {
                        id: id.clone(),
                        text,
                    });
                }
            }
            Err(e) => {
                debug!(script = %id, stream = stream.as_str(), error = %e, "output read failed");
                break;
            }
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        let _ = events.send(SupervisorEvent::Log { id: id.clone(), text: tail });
    }

    debug!(script = %id, stream = stream.as_str(), "output stream closed");
}
