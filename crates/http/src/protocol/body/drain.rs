use std::collections::VecDeque;
use std::time::Instant;

use bytes::{Bytes, BytesMut};

use crate::protocol::body::{BodyReader, BodyWriter};
use crate::protocol::BodyError;

/// A chunk recorder that is both a push sink and a pull source.
///
/// `Drain` is the intermediary behind body shape conversions: a sender shape
/// pushes its chunks into one, a receiver shape is drained into one, and the
/// recorded chunks can then be replayed as a pull stream or flattened into a
/// single buffer.
#[derive(Debug, Default)]
pub struct Drain {
    chunks: VecDeque<Bytes>,
}

impl Drain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A drain pre-loaded with one chunk, the single-chunk view of a buffer.
    ///
    /// An empty buffer records no chunk at all, so pulling from it closes
    /// immediately.
    pub fn from_bytes(bytes: Bytes) -> Self {
        let mut chunks = VecDeque::new();
        if !bytes.is_empty() {
            chunks.push_back(bytes);
        }
        Self { chunks }
    }

    /// Drains `reader` to exhaustion, checking `deadline` between chunks.
    ///
    /// Elapsing the deadline before the reader closes fails with
    /// [`BodyError::DrainTimeout`].
    pub fn from_reader(reader: &mut dyn BodyReader, deadline: Option<Instant>) -> Result<Self, BodyError> {
        let mut drain = Self::new();

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(BodyError::DrainTimeout);
                }
            }

            match reader.recv()? {
                Some(chunk) => drain.chunks.push_back(chunk),
                None => return Ok(drain),
            }
        }
    }

    /// Flattens the recorded chunks into one contiguous buffer.
    pub fn into_bytes(self) -> Bytes {
        match self.chunks.len() {
            0 => Bytes::new(),
            1 => self.chunks.into_iter().next().unwrap_or_default(),
            _ => {
                let total = self.chunks.iter().map(Bytes::len).sum();
                let mut buffer = BytesMut::with_capacity(total);
                for chunk in &self.chunks {
                    buffer.extend_from_slice(chunk);
                }
                buffer.freeze()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl BodyReader for Drain {
    fn recv(&mut self) -> Result<Option<Bytes>, BodyError> {
        Ok(self.chunks.pop_front())
    }
}

impl BodyWriter for Drain {
    fn send(&mut self, chunk: Bytes) -> Result<(), BodyError> {
        self.chunks.push_back(chunk);
        Ok(())
    }
}

/// A sink wrapper that enforces an absolute deadline between pushes.
pub(crate) struct DeadlineWriter<'a> {
    inner: &'a mut dyn BodyWriter,
    deadline: Option<Instant>,
}

impl<'a> DeadlineWriter<'a> {
    pub(crate) fn new(inner: &'a mut dyn BodyWriter, deadline: Option<Instant>) -> Self {
        Self { inner, deadline }
    }
}

impl BodyWriter for DeadlineWriter<'_> {
    fn send(&mut self, chunk: Bytes) -> Result<(), BodyError> {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(BodyError::DrainTimeout);
            }
        }
        self.inner.send(chunk)
    }
}
