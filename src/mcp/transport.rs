//! Line-delimited transports for the MCP server.
//!
//! The stdio transport follows the MCP stdio rules:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! Reads never block: the server loop polls [`Transport::read`] between
//! keepalive checks and signal handling.

use std::collections::VecDeque;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

use crate::error::TransportError;

/// A bidirectional, line-oriented message channel.
pub trait Transport {
    /// Returns the next available line, or `None` when nothing is waiting.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] once the peer has closed the stream
    /// and every buffered line has been consumed.
    fn read(&mut self) -> Result<Option<String>, TransportError>;

    /// Writes one message followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write(&mut self, message: &str) -> Result<(), TransportError>;
}

/// stdio transport.
///
/// A background task reads stdin line by line into a channel; [`read`]
/// drains that channel without waiting. Writes go straight to stdout.
///
/// [`read`]: Transport::read
pub struct StdioTransport {
    lines: UnboundedReceiver<io::Result<String>>,
    stdout: io::Stdout,
}

impl StdioTransport {
    /// Starts the stdin reader task.
    ///
    /// Must be called from within a Tokio runtime. The reader blocks on stdin,
    /// so the runtime should be shut down with `shutdown_background` once the
    /// server loop returns.
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            }
            tracing::debug!("stdin reader finished");
        });

        Self {
            lines: rx,
            stdout: io::stdout(),
        }
    }
}

impl Transport for StdioTransport {
    fn read(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            match self.lines.try_recv() {
                Ok(Ok(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Ok(Some(line.to_string()));
                }
                Ok(Err(e)) => return Err(TransportError::Io(e)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(TransportError::Closed),
            }
        }
    }

    fn write(&mut self, message: &str) -> Result<(), TransportError> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !message.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        let mut out = self.stdout.lock();
        out.write_all(message.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;

        Ok(())
    }
}

/// In-memory transport for tests and embedding.
///
/// Lines pushed with [`push_line`](Self::push_line) are returned by `read`;
/// everything the server writes is collected in [`written`](Self::written).
#[derive(Debug, Default)]
pub struct MemoryTransport {
    input: VecDeque<String>,
    closed: bool,
    written: Vec<String>,
    fail_writes: bool,
}

impl MemoryTransport {
    /// Creates an empty, open transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport preloaded with `lines` that closes once they are read.
    #[must_use]
    pub fn with_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            closed: true,
            ..Self::default()
        }
    }

    /// Queues an incoming line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.input.push_back(line.into());
    }

    /// Marks the input side as closed.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Makes every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Lines written so far.
    #[must_use]
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Removes and returns the lines written so far.
    pub fn take_written(&mut self) -> Vec<String> {
        std::mem::take(&mut self.written)
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self) -> Result<Option<String>, TransportError> {
        while let Some(line) = self.input.pop_front() {
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }

        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(None)
        }
    }

    fn write(&mut self, message: &str) -> Result<(), TransportError> {
        if self.fail_writes {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write failed",
            )));
        }
        self.written.push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{stringify, Message, RequestId, Response};

    #[test]
    fn memory_transport_skips_blank_lines() {
        let mut transport = MemoryTransport::new();
        transport.push_line("  ");
        transport.push_line(" {\"a\":1}\r");

        assert_eq!(transport.read().unwrap(), Some("{\"a\":1}".to_string()));
        assert_eq!(transport.read().unwrap(), None);

        transport.close();
        assert!(matches!(transport.read(), Err(TransportError::Closed)));
    }

    #[test]
    fn memory_transport_collects_writes() {
        let mut transport = MemoryTransport::new();
        transport.write("one").unwrap();
        transport.write("two").unwrap();
        assert_eq!(transport.written(), ["one", "two"]);

        assert_eq!(transport.take_written().len(), 2);
        assert!(transport.written().is_empty());
    }

    #[test]
    fn memory_transport_write_failure() {
        let mut transport = MemoryTransport::new();
        transport.set_fail_writes(true);
        assert!(matches!(transport.write("x"), Err(TransportError::Io(_))));
        assert!(transport.written().is_empty());
    }

    #[test]
    fn serialised_response_has_no_newlines() {
        let response = Response::success(
            RequestId::Number(1),
            serde_json::json!({
                "message": "hello\nworld",
                "nested": {"key": "value"}
            }),
        );

        let json = stringify(&Message::Response(response)).unwrap();
        assert!(!json.contains('\n'), "Serialised JSON should not contain newlines");
    }
}
