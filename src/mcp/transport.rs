use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::mcp::{
    errors::{MCPError, MCPResult, ProtocolError, TransportError},
    protocol::{MCPMessage, MessageParser},
};

/// Abstract transport trait for MCP communication
#[async_trait]
pub trait MCPTransport: Send {
    /// Send a message through the transport
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()>;

    /// Receive the next message. Returns `TransportError::Closed` at end of input
    /// and a protocol error for lines that are not valid UTF-8 JSON-RPC.
    async fn receive(&mut self) -> MCPResult<MCPMessage>;

    /// Close the transport connection
    async fn close(&mut self) -> MCPResult<()>;

    /// Check if the transport is still connected
    fn is_connected(&self) -> bool;
}

/// Newline-delimited JSON-RPC over a reader/writer pair
pub struct LineTransport<R, W> {
    reader: BufReader<R>,
    writer: W,
    connected: bool,
}

/// The transport an agent host launches us with
pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        LineTransport::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            connected: true,
        }
    }
}

#[async_trait]
impl<R, W> MCPTransport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, message: MCPMessage) -> MCPResult<()> {
        if !self.connected {
            return Err(MCPError::Transport(TransportError::Closed));
        }

        let mut data = MessageParser::serialize_message(&message)?;
        data.push(b'\n');

        if let Err(e) = self.write_line(&data).await {
            self.connected = false;
            return Err(MCPError::Transport(TransportError::Io(e)));
        }
        Ok(())
    }

    async fn receive(&mut self) -> MCPResult<MCPMessage> {
        loop {
            let mut buf = Vec::new();
            match self.reader.read_until(b'\n', &mut buf).await {
                Ok(0) => {
                    debug!("Input stream ended");
                    self.connected = false;
                    return Err(MCPError::Transport(TransportError::Closed));
                }
                Ok(_) => {}
                Err(e) => {
                    self.connected = false;
                    return Err(MCPError::Transport(TransportError::Io(e)));
                }
            }

            // A bad line is a parse error for that line only
            let line = std::str::from_utf8(&buf)
                .map_err(|e| MCPError::Protocol(ProtocolError::ParseError(e.to_string())))?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return MessageParser::parse_message(line.as_bytes());
        }
    }

    async fn close(&mut self) -> MCPResult<()> {
        self.connected = false;
        self.writer.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

impl<R, W> LineTransport<R, W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_line(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await
    }
}
