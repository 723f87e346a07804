//! Replica side of the replication handshake.
//!
//! ```text
//! replica                          master
//!   PING                       ->
//!                              <-  +PONG
//!   REPLCONF listening-port p  ->
//!                              <-  +OK
//!   REPLCONF capa psync2       ->
//!                              <-  +OK
//!   PSYNC ? -1                 ->
//!                              <-  +FULLRESYNC <replid> <offset>
//!                              <-  $<len>\r\n<snapshot>
//! ```
//!
//! Replies are decoded out of an accumulating buffer, so a reply split over
//! several reads or several replies arriving in one read are both fine. The
//! bytes left over after the snapshot already belong to the replication
//! stream and are handed back to the caller.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::{
    io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::timeout,
};
use tracing::{debug, info};

use crate::{
    resp::{decode_file_payload, decode_simple_string, encode_array, RespError},
    state::ServerState,
};

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] RespError),
    #[error("expected {expected:?} from master, got {received:?}")]
    UnexpectedReply { expected: String, received: String },
    #[error("master closed the connection during the handshake")]
    ConnectionClosed,
    #[error("invalid FULLRESYNC reply {0:?}")]
    InvalidFullResync(String),
    #[error("handshake did not complete within {0:?}")]
    Timeout(Duration),
}

/// Runs the full handshake against the master on `stream`.
///
/// On success the replication id and offset announced by the master are
/// stored in `state`, and the bytes read past the snapshot are returned.
pub async fn handshake<S>(stream: &mut S, state: &ServerState) -> Result<BytesMut, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    timeout(HANDSHAKE_TIMEOUT, perform_handshake(stream, state))
        .await
        .map_err(|_| HandshakeError::Timeout(HANDSHAKE_TIMEOUT))?
}

async fn perform_handshake<S>(
    stream: &mut S,
    state: &ServerState,
) -> Result<BytesMut, HandshakeError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = BytesMut::with_capacity(1024);

    send_command(stream, &["PING"]).await?;
    expect_simple_string(stream, &mut buffer, "PONG").await?;

    send_command(
        stream,
        &["REPLCONF", "listening-port", state.port.to_string().as_str()],
    )
    .await?;
    expect_simple_string(stream, &mut buffer, "OK").await?;

    send_command(stream, &["REPLCONF", "capa", "psync2"]).await?;
    expect_simple_string(stream, &mut buffer, "OK").await?;

    send_command(stream, &["PSYNC", "?", "-1"]).await?;
    let full_resync = read_reply(stream, &mut buffer, decode_simple_string).await?;
    let (repl_id, repl_offset) = parse_full_resync(&full_resync)?;

    let snapshot_length = read_reply(stream, &mut buffer, decode_snapshot_length).await?;

    info!(
        repl_id = %repl_id,
        repl_offset,
        snapshot_length,
        "completed handshake with master"
    );
    state.set_replication_info(repl_id, repl_offset).await;

    Ok(buffer)
}

async fn send_command<S>(stream: &mut S, command: &[&str]) -> Result<(), HandshakeError>
where
    S: AsyncWrite + Unpin,
{
    debug!(command = %command.join(" "), "sending handshake command");

    stream.write_all(encode_array(command).as_bytes()).await?;
    stream.flush().await?;

    Ok(())
}

async fn expect_simple_string<S>(
    stream: &mut S,
    buffer: &mut BytesMut,
    expected: &str,
) -> Result<(), HandshakeError>
where
    S: AsyncRead + Unpin,
{
    let received = read_reply(stream, buffer, decode_simple_string).await?;

    if !received.eq_ignore_ascii_case(expected) {
        return Err(HandshakeError::UnexpectedReply {
            expected: expected.to_string(),
            received,
        });
    }

    Ok(())
}

/// Decodes one reply with `decode`, reading until the buffer holds all of it.
async fn read_reply<S, T, F>(
    stream: &mut S,
    buffer: &mut BytesMut,
    decode: F,
) -> Result<T, HandshakeError>
where
    S: AsyncRead + Unpin,
    F: Fn(&[u8]) -> Result<(T, &[u8]), RespError>,
{
    loop {
        if !buffer.is_empty() {
            match decode(&buffer[..]) {
                Ok((value, rest)) => {
                    let consumed = buffer.len() - rest.len();
                    buffer.advance(consumed);
                    return Ok(value);
                }
                Err(e) if e.is_incomplete() => (),
                Err(e) => return Err(HandshakeError::Protocol(e)),
            }
        }

        if stream.read_buf(buffer).await? == 0 {
            return Err(HandshakeError::ConnectionClosed);
        }
    }
}

/// The snapshot content is not applied, only skipped.
fn decode_snapshot_length(buffer: &[u8]) -> Result<(usize, &[u8]), RespError> {
    let (snapshot, rest) = decode_file_payload(buffer)?;

    Ok((snapshot.len(), rest))
}

/// Parses `FULLRESYNC <replid> <offset>`.
fn parse_full_resync(reply: &str) -> Result<(String, i64), HandshakeError> {
    let invalid = || HandshakeError::InvalidFullResync(reply.to_string());

    let parts: Vec<&str> = reply.split_whitespace().collect();

    let [keyword, repl_id, offset] = parts.as_slice() else {
        return Err(invalid());
    };

    if !keyword.eq_ignore_ascii_case("FULLRESYNC") {
        return Err(invalid());
    }

    let offset = offset.parse::<i64>().map_err(|_| invalid())?;

    Ok((repl_id.to_string(), offset))
}
