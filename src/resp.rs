//! Redis Serialization Protocol (RESP) codec.
//!
//! Pure transforms between protocol values and bytes. Decoders consume a
//! well-formed prefix of the input and hand back the unconsumed remainder, so
//! callers can keep pulling frames out of a buffer that holds several
//! pipelined commands.
//!
//! Every decoder separates two failure causes:
//!
//! - [`RespError::Incomplete`] - the bytes seen so far are a valid prefix of a
//!   frame that has not fully arrived yet. Read more and try again.
//! - any other [`RespError`] - the bytes can never become a valid frame.

use thiserror::Error;

pub const CRLF: &str = "\r\n";

/// Errors produced while encoding or decoding RESP frames.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum RespError {
    #[error("incomplete frame")]
    Incomplete,
    #[error("expected '{expected}' type byte, got {found:?}")]
    UnexpectedTypeByte { expected: char, found: char },
    #[error("invalid length {0:?}")]
    InvalidLength(String),
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("expected CRLF terminator")]
    MissingCrlf,
    #[error("simple string cannot contain CR or LF")]
    InvalidSimpleString,
}

impl RespError {
    /// True when more bytes may turn the input into a valid frame.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, RespError::Incomplete)
    }
}

/// Encodes `+<s>\r\n`. Simple strings cannot span lines.
pub fn encode_simple_string(s: &str) -> Result<String, RespError> {
    if s.contains(['\r', '\n']) {
        return Err(RespError::InvalidSimpleString);
    }

    Ok(format!("+{}{}", s, CRLF))
}

/// Encodes `$<len>\r\n<s>\r\n`.
///
/// The empty string is encoded as the null bulk string `$-1\r\n`, so an empty
/// value and a missing value look the same on the wire.
pub fn encode_bulk_string(s: &str) -> String {
    if s.is_empty() {
        return encode_null();
    }

    format!("${}{}{}{}", s.len(), CRLF, s, CRLF)
}

/// The null bulk string.
pub fn encode_null() -> String {
    format!("$-1{}", CRLF)
}

/// Encodes an array of bulk strings.
pub fn encode_array<S: AsRef<str>>(elements: &[S]) -> String {
    let mut encoded = format!("*{}{}", elements.len(), CRLF);

    for element in elements {
        encoded.push_str(&encode_bulk_string(element.as_ref()));
    }

    encoded
}

pub fn encode_integer(n: i64) -> String {
    format!(":{}{}", n, CRLF)
}

pub fn encode_error(message: &str) -> String {
    format!("-{}{}", message, CRLF)
}

/// Encodes a snapshot transfer frame: `$<len>\r\n<bytes>` without the
/// trailing CRLF a bulk string would carry.
pub fn encode_file_payload(payload: &[u8]) -> Vec<u8> {
    let mut encoded = format!("${}{}", payload.len(), CRLF).into_bytes();
    encoded.extend_from_slice(payload);
    encoded
}

pub fn decode_simple_string(buffer: &[u8]) -> Result<(String, &[u8]), RespError> {
    let rest = expect_type_byte(buffer, '+')?;
    let (line, rest) = read_line(rest)?;

    Ok((to_string(line), rest))
}

pub fn decode_integer(buffer: &[u8]) -> Result<(i64, &[u8]), RespError> {
    let rest = expect_type_byte(buffer, ':')?;
    let (line, rest) = read_line(rest)?;

    let text = to_string(line);
    let n = text
        .parse::<i64>()
        .map_err(|_| RespError::InvalidInteger(text.clone()))?;

    Ok((n, rest))
}

/// Decodes one bulk string. The null bulk string decodes to `""`.
///
/// Bulk strings are binary safe on the wire. Bytes that are not valid UTF-8
/// are replaced with U+FFFD rather than rejecting a well-formed frame.
pub fn decode_bulk_string(buffer: &[u8]) -> Result<(String, &[u8]), RespError> {
    let rest = expect_type_byte(buffer, '$')?;
    let (line, rest) = read_line(rest)?;

    if line == b"-1" {
        return Ok((String::new(), rest));
    }

    let length = parse_length(line)?;
    let (content, rest) = take(rest, length)?;
    let rest = expect_crlf(rest)?;

    Ok((to_string(content), rest))
}

/// Decodes an array whose elements are all bulk strings.
pub fn decode_array(buffer: &[u8]) -> Result<(Vec<String>, &[u8]), RespError> {
    let rest = expect_type_byte(buffer, '*')?;
    let (line, mut rest) = read_line(rest)?;
    let length = parse_length(line)?;

    // The declared length comes from the peer, so it does not size the allocation.
    let mut elements = Vec::new();

    for _ in 0..length {
        let (element, remaining) = decode_bulk_string(rest)?;
        elements.push(element);
        rest = remaining;
    }

    Ok((elements, rest))
}

/// Decodes a snapshot transfer frame (see [`encode_file_payload`]).
pub fn decode_file_payload(buffer: &[u8]) -> Result<(&[u8], &[u8]), RespError> {
    let rest = expect_type_byte(buffer, '$')?;
    let (line, rest) = read_line(rest)?;
    let length = parse_length(line)?;

    take(rest, length)
}

fn expect_type_byte(buffer: &[u8], expected: char) -> Result<&[u8], RespError> {
    match buffer.first() {
        None => Err(RespError::Incomplete),
        Some(&byte) if byte == expected as u8 => Ok(&buffer[1..]),
        Some(&byte) => Err(RespError::UnexpectedTypeByte {
            expected,
            found: byte as char,
        }),
    }
}

/// Scans byte by byte for the CRLF ending the current line.
fn read_line(buffer: &[u8]) -> Result<(&[u8], &[u8]), RespError> {
    for (i, &byte) in buffer.iter().enumerate() {
        match byte {
            b'\r' => {
                return match buffer.get(i + 1) {
                    Some(b'\n') => Ok((&buffer[..i], &buffer[i + 2..])),
                    Some(_) => Err(RespError::MissingCrlf),
                    None => Err(RespError::Incomplete),
                };
            }
            b'\n' => return Err(RespError::MissingCrlf),
            _ => {}
        }
    }

    Err(RespError::Incomplete)
}

fn parse_length(line: &[u8]) -> Result<usize, RespError> {
    let invalid = || RespError::InvalidLength(String::from_utf8_lossy(line).into_owned());

    if line.is_empty() || !line.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }

    std::str::from_utf8(line)
        .map_err(|_| invalid())?
        .parse::<usize>()
        .map_err(|_| invalid())
}

fn take(buffer: &[u8], length: usize) -> Result<(&[u8], &[u8]), RespError> {
    if buffer.len() < length {
        return Err(RespError::Incomplete);
    }

    Ok(buffer.split_at(length))
}

fn expect_crlf(buffer: &[u8]) -> Result<&[u8], RespError> {
    match buffer {
        [b'\r', b'\n', rest @ ..] => Ok(rest),
        [] | [b'\r'] => Err(RespError::Incomplete),
        _ => Err(RespError::MissingCrlf),
    }
}

fn to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
