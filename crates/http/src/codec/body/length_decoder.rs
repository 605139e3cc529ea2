use std::{cmp, io};

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadItem;

/// Decodes a `Content-Length` framed payload: exactly `length` octets,
/// passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.remaining, src.len() as u64) as usize;
        let bytes: Bytes = src.split_to(len).freeze();

        self.remaining -= len as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_exactly_the_declared_count() {
        let mut buffer = BytesMut::from(&b"0123456789rest"[..]);
        let mut decoder = LengthDecoder::new(10);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"0123456789")));
        assert_eq!(&buffer[..], b"rest");

        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn yields_partial_chunks_as_bytes_arrive() {
        let mut decoder = LengthDecoder::new(5);

        let mut buffer = BytesMut::from(&b"ab"[..]);
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"ab")));

        assert_eq!(decoder.decode(&mut buffer).unwrap(), None);

        let mut buffer = BytesMut::from(&b"cde"[..]);
        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(item, PayloadItem::Chunk(Bytes::from_static(b"cde")));
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }

    #[test]
    fn zero_length_is_immediately_eof() {
        let mut buffer = BytesMut::new();
        let mut decoder = LengthDecoder::new(0);
        assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(PayloadItem::Eof));
    }
}
