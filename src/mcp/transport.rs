use anyhow::Result;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, BufReader, Stdin, Stdout};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, warn};

use super::types::{McpMessage, McpNotification, McpRequest, McpResponse};

/// Newline-delimited JSON-RPC over any byte stream pair.
pub struct LineTransport<R, W> {
    reader: FramedRead<R, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
}

pub type StdioTransport = LineTransport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedRead::new(reader, LinesCodec::new()),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    /// Reads the next message. `Ok(None)` on EOF. Lines that fail to parse
    /// come back as [`McpMessage::Malformed`] so the caller can answer them.
    pub async fn read_message(&mut self) -> Result<Option<McpMessage>> {
        loop {
            let line = match self.reader.next().await {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    error!("Error reading from input: {}", e);
                    return Err(anyhow::anyhow!("Transport error: {}", e));
                }
                None => {
                    debug!("EOF reached");
                    return Ok(None);
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            debug!("Received: {}", line);
            return Ok(Some(parse_message(&line)));
        }
    }

    pub async fn write_response(&mut self, response: McpResponse) -> Result<()> {
        let json = serde_json::to_string(&response)?;
        debug!("Sending: {}", json);

        self.writer.send(json).await?;

        Ok(())
    }
}

fn parse_message(line: &str) -> McpMessage {
    let value = match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => value,
        Err(e) => {
            warn!("Failed to parse JSON: {}", e);
            return McpMessage::Malformed(format!("Invalid JSON: {}", e));
        }
    };

    // Requests carry an id, notifications do not.
    let is_request = match value.as_object() {
        Some(obj) => obj.contains_key("id"),
        None => {
            warn!("Invalid JSON-RPC message structure");
            return McpMessage::Malformed("Invalid JSON-RPC message structure".to_string());
        }
    };

    if is_request {
        match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => McpMessage::Request(request),
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                McpMessage::Malformed(format!("Invalid JSON-RPC request: {}", e))
            }
        }
    } else {
        match serde_json::from_value::<McpNotification>(value) {
            Ok(notification) => McpMessage::Notification(notification),
            Err(e) => {
                warn!("Failed to parse notification: {}", e);
                McpMessage::Malformed(format!("Invalid JSON-RPC notification: {}", e))
            }
        }
    }
}
