//! Payload framing: turning raw connection bytes into body chunks.

mod chunked_decoder;
mod length_decoder;

pub use chunked_decoder::ChunkedDecoder;
pub use length_decoder::LengthDecoder;

use std::io::{self, ErrorKind};

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::ParseError;

/// One step of a decoded payload: a run of body octets, or its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    Chunk(Bytes),
    Eof,
}

impl PayloadItem {
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }
}

/// Decodes a message payload under whichever framing the headers selected:
/// `Content-Length`, `chunked`, or (for responses) read-until-close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    UntilClose,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self::length(0)
    }

    pub fn length(length: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(length)) }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    /// Everything until the peer closes is payload; only
    /// [`PayloadDecoder::decode_eof`] yields `Eof`.
    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose }
    }

    pub fn is_until_close(&self) -> bool {
        matches!(self.kind, Kind::UntilClose)
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => Ok(decoder.decode(src)?),
            Kind::Chunked(decoder) => Ok(decoder.decode(src)?),
            Kind::UntilClose => {
                if src.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(PayloadItem::Chunk(src.split_to(src.len()).freeze())))
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        match &self.kind {
            Kind::UntilClose => Ok(Some(PayloadItem::Eof)),
            _ => Err(ParseError::io(io::Error::new(
                ErrorKind::UnexpectedEof,
                "connection closed mid-payload",
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn until_close_passes_everything_through() {
        let mut decoder = PayloadDecoder::until_close();

        let mut buffer = BytesMut::from(&b"free-form"[..]);
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"free-form")));

        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);
        assert_eq!(decoder.decode_eof(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn empty_payload_is_immediately_eof() {
        let mut buffer = BytesMut::new();
        let mut decoder = PayloadDecoder::empty();
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn truncated_length_payload_errors_at_eof() {
        let mut buffer = BytesMut::from(&b"abc"[..]);
        let mut decoder = PayloadDecoder::length(10);

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(decoder.decode_eof(&mut buffer).is_err());
    }
}
