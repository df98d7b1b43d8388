use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::warn;

const READ_BUF_SIZE: usize = 8192;

/// Decodes a byte stream into UTF-8 text chunk by chunk. A multi-byte
/// sequence split across two reads is held back until the rest arrives;
/// genuinely invalid bytes are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is still held back at end of stream.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

/// Spawn a task that forwards everything read from `reader` to `tx` as text
/// fragments, exactly as the reads return them (no line splitting). The task
/// ends at EOF, on a read error, or when the receiver is gone.
pub fn spawn_fragment_reader<R>(
    reader: R,
    stream: &'static str,
    tx: mpsc::UnboundedSender<String>,
) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = reader;
        let mut buf = vec![0u8; READ_BUF_SIZE];
        let mut carry = Utf8Carry::new();
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    let text = carry.push(&buf[..n]);
                    if !text.is_empty() && tx.send(text).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    warn!(stream, error = %e, "update output read error");
                    break;
                }
            }
        }
        let rest = carry.finish();
        if !rest.is_empty() {
            let _ = tx.send(rest);
        }
    })
}
