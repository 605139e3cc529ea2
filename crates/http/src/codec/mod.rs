//! Incremental parsers and serializers for HTTP/1.x messages.
//!
//! The parsers are single-owner state machines: bytes are fed in arbitrary
//! slices (a message split at any byte boundary parses identically) and a
//! complete message pops out once its final payload byte arrives. Leftover
//! bytes stay buffered, so pipelined messages on one connection come out one
//! `parse` call at a time. Any parse error resets the machine: accumulated
//! state and buffered input are discarded and the next feed starts clean.
//!
//! Both parsers also implement [`tokio_util::codec::Decoder`], which is how
//! the read-until-close response body learns about connection shutdown
//! (`decode_eof`).
//!
//! The serializers are the write side: they emit a start line, the header
//! map, cookie lines and the payload through a caller-supplied sink, chunk
//! framing any streamed body.

pub mod body;

mod request_parser;
pub use request_parser::RequestParser;

mod response_parser;
pub use response_parser::ResponseParser;

mod request_serializer;
pub use request_serializer::RequestSerializer;

mod response_serializer;
pub use response_serializer::ResponseSerializer;

use std::io;

use bytes::{Bytes, BytesMut};

use crate::protocol::body::BodyWriter;
use crate::protocol::{BodyError, ParseError};
use crate::utils::ensure;

/// Cap on the start line plus header block of a single message.
pub const MAX_HEADER_SIZE: usize = 8 * 1024;

/// Splits the next line off `src`, consuming through its terminator.
///
/// Lines end at LF; an immediately preceding CR is stripped. `None` means no
/// full line has arrived yet.
pub(crate) fn take_line(src: &mut BytesMut) -> Option<Bytes> {
    let at = src.iter().position(|&byte| byte == b'\n')?;

    let mut line = src.split_to(at + 1);
    line.truncate(at);
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }

    Some(line.freeze())
}

/// Splits a `name: value` header line, trimming optional whitespace around
/// the value. The field name must be non-empty and must touch the colon.
pub(crate) fn split_header_line(line: &str) -> Result<(String, String), ParseError> {
    let (name, value) =
        line.split_once(':').ok_or_else(|| ParseError::malformed_header(format!("missing colon in {line:?}")))?;

    ensure!(
        !name.is_empty() && !name.ends_with([' ', '\t']),
        ParseError::malformed_header(format!("invalid field name in {line:?}"))
    );

    Ok((name.to_string(), value.trim().to_string()))
}

pub(crate) fn ensure_header_cap(size: usize) -> Result<(), ParseError> {
    ensure!(size <= MAX_HEADER_SIZE, ParseError::too_large_header(size, MAX_HEADER_SIZE));
    Ok(())
}

pub(crate) fn unexpected_eof() -> ParseError {
    ParseError::io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed mid-message"))
}

/// Payload framing selected by a finished header block.
pub(crate) enum Framing {
    Length(u64),
    Chunked,
    Unframed,
}

/// Applies the framing rules shared by both sides of the protocol.
///
/// `Transfer-Encoding` and `Content-Length` together are rejected outright
/// rather than letting the two framings disagree. A `Transfer-Encoding`
/// whose final coding is not `chunked` leaves the payload length unknowable
/// and is rejected as well.
pub(crate) fn payload_framing(headers: &crate::protocol::Headers) -> Result<Framing, ParseError> {
    let transfer_encoding = headers.merged("Transfer-Encoding");
    let content_length = headers.get("Content-Length");

    if let Some(encodings) = transfer_encoding.as_deref() {
        if content_length.is_some() {
            return Err(ParseError::malformed_header(
                "message carries both Transfer-Encoding and Content-Length",
            ));
        }

        let last = encodings.rsplit(',').next().unwrap_or_default();
        if last.trim().eq_ignore_ascii_case("chunked") {
            return Ok(Framing::Chunked);
        }

        return Err(ParseError::malformed_header(format!(
            "transfer coding {last:?} does not end in chunked"
        )));
    }

    match content_length {
        Some(value) => {
            let length = value
                .trim()
                .parse()
                .map_err(|_| ParseError::malformed_header(format!("invalid Content-Length {value:?}")))?;
            Ok(Framing::Length(length))
        }
        None => Ok(Framing::Unframed),
    }
}

/// Writes one chunk frame: hex size line, the data, a trailing CRLF.
pub(crate) fn write_chunk<F>(send: &mut F, chunk: &[u8]) -> io::Result<()>
where
    F: FnMut(&[u8]) -> io::Result<()>,
{
    send(format!("{:x}\r\n", chunk.len()).as_bytes())?;
    send(chunk)?;
    send(b"\r\n")
}

/// Adapts a raw sink into a [`BodyWriter`], chunk framing every push.
///
/// A sink failure is stashed in `io_error` so the serializer can surface it
/// as a send abort instead of a generic body failure.
pub(crate) struct ChunkWriter<'a, F> {
    send: &'a mut F,
    pub(crate) io_error: Option<io::Error>,
}

impl<'a, F> ChunkWriter<'a, F> {
    pub(crate) fn new(send: &'a mut F) -> Self {
        Self { send, io_error: None }
    }
}

impl<F> BodyWriter for ChunkWriter<'_, F>
where
    F: FnMut(&[u8]) -> io::Result<()> + Send,
{
    fn send(&mut self, chunk: Bytes) -> Result<(), BodyError> {
        // a zero-size frame would terminate the stream early
        if chunk.is_empty() {
            return Ok(());
        }

        match write_chunk(self.send, &chunk) {
            Ok(()) => Ok(()),
            Err(error) => {
                let reason = error.to_string();
                self.io_error = Some(error);
                Err(BodyError::source(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_line_handles_both_terminators() {
        let mut src = BytesMut::from(&b"one\r\ntwo\nthr"[..]);

        assert_eq!(take_line(&mut src).as_deref(), Some(&b"one"[..]));
        assert_eq!(take_line(&mut src).as_deref(), Some(&b"two"[..]));
        assert_eq!(take_line(&mut src), None);
        assert_eq!(&src[..], b"thr");
    }

    #[test]
    fn take_line_yields_empty_lines() {
        let mut src = BytesMut::from(&b"\r\nrest"[..]);
        assert_eq!(take_line(&mut src).as_deref(), Some(&b""[..]));
    }

    #[test]
    fn split_header_line_trims_value_only() {
        let (name, value) = split_header_line("Host:  example.com  ").unwrap();
        assert_eq!(name, "Host");
        assert_eq!(value, "example.com");
    }

    #[test]
    fn split_header_line_rejects_spaced_names() {
        assert!(split_header_line("Host : example.com").is_err());
        assert!(split_header_line(": value").is_err());
        assert!(split_header_line("no colon here").is_err());
    }
}
