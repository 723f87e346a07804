//! Per-connection read/dispatch loop.
//!
//! A connection owns a growable read buffer. Every pass first drains all
//! complete frames already buffered (clients may pipeline), then reads more
//! bytes. A truncated frame simply waits for the rest; a malformed one ends
//! the connection.
//!
//! The same loop serves ordinary clients and, on a replica, the link to its
//! master. The [`CommandOrigin`] decides which of the two it is.

use std::{net::SocketAddr, sync::Arc};

use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    net::TcpStream,
};
use tracing::{debug, error, info, trace, warn};

use crate::{
    commands::{CommandContext, CommandHandler, CommandOrigin, CommandResult},
    replication::{shared_writer, write_to_stream, ConnectionWriter},
    resp::{decode_array, encode_error, RespError},
    state::ServerState,
};

const INITIAL_BUFFER_SIZE: usize = 4 * 1024;

/// Upper bound for buffered, not yet decodable bytes.
pub const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),
    #[error("connection closed in the middle of a frame")]
    UnexpectedEof,
    #[error("read buffer limit exceeded")]
    BufferFull,
}

pub struct Connection<R> {
    reader: R,
    buffer: BytesMut,
    context: CommandContext,
    state: Arc<ServerState>,
}

impl<R> Connection<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        reader: R,
        writer: ConnectionWriter,
        address: String,
        origin: CommandOrigin,
        state: Arc<ServerState>,
    ) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            context: CommandContext {
                client_address: address,
                origin,
                writer,
            },
            state,
        }
    }

    /// Seeds the read buffer with bytes that were read before the connection
    /// took over the stream, e.g. commands coalesced with the end of the
    /// replication handshake.
    pub fn with_buffered(mut self, bytes: BytesMut) -> Self {
        self.buffer.extend_from_slice(&bytes);
        self
    }

    /// Serves the connection until the peer disconnects or an error occurs.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let address = self.context.client_address.clone();
        let origin = self.context.origin;

        info!(client = %address, ?origin, "connection opened");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %address, ?origin, "connection closed"),
            Err(ConnectionError::Io(e)) if e.kind() == std::io::ErrorKind::ConnectionReset => {
                debug!(client = %address, "connection reset by peer")
            }
            Err(e) => warn!(client = %address, ?origin, error = %e, "connection error"),
        }

        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some((elements, frame)) = self.try_parse_frame().await? {
                self.process_frame(elements, frame).await?;
            }

            if !self.read_more_data().await? {
                return Ok(());
            }
        }
    }

    /// Pulls the next complete array frame out of the buffer, together with
    /// its exact bytes.
    async fn try_parse_frame(&mut self) -> Result<Option<(Vec<String>, Bytes)>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let (elements, consumed) = match decode_array(&self.buffer) {
            Ok((elements, rest)) => (elements, self.buffer.len() - rest.len()),
            Err(e) if e.is_incomplete() => {
                trace!(
                    client = %self.context.client_address,
                    buffered = self.buffer.len(),
                    "incomplete frame, need more data"
                );
                return Ok(None);
            }
            Err(e) => {
                self.report_protocol_error(&e).await;
                return Err(ConnectionError::Protocol(e));
            }
        };

        let frame = self.buffer.split_to(consumed).freeze();
        trace!(
            client = %self.context.client_address,
            consumed,
            remaining = self.buffer.len(),
            "decoded frame"
        );

        Ok(Some((elements, frame)))
    }

    async fn report_protocol_error(&self, e: &RespError) {
        match self.context.origin {
            CommandOrigin::Client => {
                warn!(client = %self.context.client_address, error = %e, "protocol error");

                let reply = encode_error(&format!("ERR Protocol error: {}", e));
                if let Err(write_error) = self.send(reply.as_bytes()).await {
                    debug!(error = %write_error, "could not report protocol error");
                }
            }
            CommandOrigin::Master => {
                error!(master = %self.context.client_address, error = %e, "malformed frame on replication stream");
            }
        }
    }

    /// Reads from the peer into the buffer. Returns `false` on a clean close.
    async fn read_more_data(&mut self) -> Result<bool, ConnectionError> {
        if self.buffer.len() >= MAX_BUFFER_SIZE {
            error!(
                client = %self.context.client_address,
                size = self.buffer.len(),
                "buffer size limit exceeded"
            );
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.reader.read_buf(&mut self.buffer).await?;

        if n == 0 {
            if self.buffer.is_empty() {
                return Ok(false);
            }

            return Err(ConnectionError::UnexpectedEof);
        }

        trace!(client = %self.context.client_address, bytes = n, "read data");

        Ok(true)
    }

    async fn process_frame(
        &mut self,
        elements: Vec<String>,
        frame: Bytes,
    ) -> Result<(), ConnectionError> {
        let frame_length = frame.len();
        let origin = self.context.origin;

        let result = match CommandHandler::new(elements) {
            Ok(handler) => {
                let propagates = handler.is_write_command()
                    && origin == CommandOrigin::Client
                    && self.state.role.is_master();

                // Held until the frame is broadcast.
                let _write_guard = if propagates {
                    Some(self.state.lock_writes().await)
                } else {
                    None
                };

                let result = handler.handle(&self.state, &self.context).await;

                if propagates && result.is_ok() {
                    self.state.propagate(frame).await;
                }

                result
            }
            Err(e) => Err(e),
        };

        if origin == CommandOrigin::Master {
            self.state.advance_ack_offset(frame_length);
        }

        match result {
            Ok(CommandResult::Response(response)) => self.send(&response).await?,
            Ok(CommandResult::NoResponse) => (),
            Err(e) if origin == CommandOrigin::Client => {
                debug!(client = %self.context.client_address, error = %e, "command failed");
                self.send(e.as_string().as_bytes()).await?;
            }
            Err(e) => {
                warn!(master = %self.context.client_address, error = %e, "replicated command failed");
            }
        }

        Ok(())
    }

    async fn send(&self, payload: &[u8]) -> Result<(), ConnectionError> {
        write_to_stream(&self.context.writer, payload).await?;
        trace!(client = %self.context.client_address, bytes = payload.len(), "sent response");

        Ok(())
    }
}

/// Serves one accepted client socket to completion.
pub async fn handle_connection(stream: TcpStream, address: SocketAddr, state: Arc<ServerState>) {
    let (reader, writer) = stream.into_split();

    let connection = Connection::new(
        reader,
        shared_writer(writer),
        address.to_string(),
        CommandOrigin::Client,
        state,
    );

    if let Err(e) = connection.run().await {
        debug!(client = %address, error = %e, "connection ended with error");
    }
}
