use std::io::{self, ErrorKind};

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadItem;

/// Decodes a `Transfer-Encoding: chunked` payload (RFC 7230 §4.1).
///
/// Each chunk is a hex size line (extensions are skipped), CRLF, the chunk
/// octets and a trailing CRLF; a zero size chunk followed by optional
/// trailer fields and a final CRLF ends the payload. Chunk framing is
/// stripped, only the data octets are emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Size,
    SizeLws,
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    Trailer,
    TrailerLf,
    EndCr,
    EndLf,
    End,
}

fn invalid(reason: &'static str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, reason)
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size, remaining: 0 }
    }

    /// Advances the state machine by one byte (or one run of data bytes).
    ///
    /// `Ok(None)` means the buffer ran dry mid-state.
    fn step(&mut self, src: &mut BytesMut, out: &mut Option<Bytes>) -> io::Result<Option<State>> {
        // the data state consumes a run, every other state a single byte
        if self.state == State::Data {
            return Ok(Some(self.read_data(src, out)));
        }

        if src.is_empty() {
            return Ok(None);
        }
        let byte = src.get_u8();

        let next = match (self.state, byte) {
            (State::Size, b @ b'0'..=b'9') => self.push_size_digit(b - b'0')?,
            (State::Size, b @ b'a'..=b'f') => self.push_size_digit(b - b'a' + 10)?,
            (State::Size, b @ b'A'..=b'F') => self.push_size_digit(b - b'A' + 10)?,
            (State::Size | State::SizeLws, b'\t' | b' ') => State::SizeLws,
            (State::Size | State::SizeLws, b';') => State::Extension,
            (State::Size | State::SizeLws, b'\r') => State::SizeLf,
            (State::Size, _) => return Err(invalid("invalid chunk size")),
            (State::SizeLws, _) => return Err(invalid("invalid chunk size whitespace")),

            // extensions are skipped, but a bare LF inside one is rejected
            (State::Extension, b'\r') => State::SizeLf,
            (State::Extension, b'\n') => return Err(invalid("bare LF in chunk extension")),
            (State::Extension, _) => State::Extension,

            (State::SizeLf, b'\n') if self.remaining == 0 => State::EndCr,
            (State::SizeLf, b'\n') => State::Data,
            (State::SizeLf, _) => return Err(invalid("missing LF after chunk size")),

            (State::DataCr, b'\r') => State::DataLf,
            (State::DataCr, _) => return Err(invalid("missing CR after chunk data")),
            (State::DataLf, b'\n') => State::Size,
            (State::DataLf, _) => return Err(invalid("missing LF after chunk data")),

            // trailer fields are read and dropped
            (State::Trailer, b'\r') => State::TrailerLf,
            (State::Trailer, _) => State::Trailer,
            (State::TrailerLf, b'\n') => State::EndCr,
            (State::TrailerLf, _) => return Err(invalid("missing LF after trailer field")),

            (State::EndCr, b'\r') => State::EndLf,
            (State::EndCr, _) => State::Trailer,
            (State::EndLf, b'\n') => State::End,
            (State::EndLf, _) => return Err(invalid("missing final LF")),

            (State::Data | State::End, _) => unreachable!("handled above"),
        };

        Ok(Some(next))
    }

    fn push_size_digit(&mut self, digit: u8) -> io::Result<State> {
        self.remaining = self
            .remaining
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(digit)))
            .ok_or_else(|| invalid("chunk size overflow"))?;
        Ok(State::Size)
    }

    fn read_data(&mut self, src: &mut BytesMut, out: &mut Option<Bytes>) -> State {
        if self.remaining == 0 {
            return State::DataCr;
        }
        if src.is_empty() {
            return State::Data;
        }

        let len = std::cmp::min(self.remaining, src.len() as u64) as usize;
        self.remaining -= len as u64;
        *out = Some(src.split_to(len).freeze());

        if self.remaining > 0 { State::Data } else { State::DataCr }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == State::End {
                trace!("chunked payload complete");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut out = None;
            match self.step(src, &mut out)? {
                Some(next) => self.state = next,
                None => return Ok(None),
            }

            if let Some(bytes) = out {
                trace!(len = bytes.len(), "decoded chunk data");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(item: Option<PayloadItem>) -> Bytes {
        match item {
            Some(PayloadItem::Chunk(bytes)) => bytes,
            other => panic!("expected a chunk, got {other:?}"),
        }
    }

    #[test]
    fn decodes_a_sequence_of_chunks() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()), "hello");
        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()), ", world");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
        assert!(buffer.is_empty());
    }

    #[test]
    fn emits_partial_data_before_the_chunk_completes() {
        let mut buffer = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()), "hel");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);

        buffer.extend_from_slice(b"lo\r\n0\r\n\r\n");
        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()), "lo");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn skips_extensions_and_trailers() {
        let mut buffer = BytesMut::from(&b"5;ext=1\r\nhello\r\n0\r\nTrailer: v\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()), "hello");
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn accepts_upper_and_lower_hex_sizes() {
        let mut buffer = BytesMut::from(&b"A\r\n0123456789\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()).len(), 10);

        let mut buffer = BytesMut::from(&b"a\r\n0123456789\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()).len(), 10);
    }

    #[test]
    fn rejects_a_garbage_size_line() {
        let mut buffer = BytesMut::from(&b"xyz\r\n"[..]);
        assert!(ChunkedDecoder::new().decode(&mut buffer).is_err());
    }

    #[test]
    fn rejects_missing_crlf_after_data() {
        let mut buffer = BytesMut::from(&b"5\r\nhelloBAD"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(chunk(decoder.decode(&mut buffer).unwrap()), "hello");
        assert!(decoder.decode(&mut buffer).is_err());
    }

    #[test]
    fn zero_chunk_alone_is_eof() {
        let mut buffer = BytesMut::from(&b"0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }
}
