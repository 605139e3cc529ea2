//! The abstract message body and its shape conversions.
//!
//! A [`Body`] is, at any instant, exactly one of five shapes:
//!
//! - **Buffer**: resident bytes.
//! - **Receiver**: a pull source — the owner repeatedly asks for the next
//!   chunk until the source closes.
//! - **Sender**: a push routine — given a destination sink it pushes all of
//!   its chunks and returns.
//! - **AsyncReceiver** / **AsyncSender**: the same pull/push contracts, but
//!   delivered through futures instead of blocking calls.
//!
//! Conversions between shapes mutate the body in place: the previous
//! representation is consumed and exactly one new representation is
//! installed, so an effectful source is never left with two live readers and
//! a repeated conversion never re-runs an already-drained source. Asking for
//! a conversion when the body has been consumed, or across the sync/async
//! divide, fails with [`BodyError::InconvertibleShape`].
//!
//! The async conversions return futures that complete exactly once, after
//! all bytes are produced or an error occurs; a dropped future simply never
//! fires. Deadlines are absolute: elapsing one mid-drain fails with
//! [`BodyError::DrainTimeout`].

mod drain;

pub use drain::Drain;
use drain::DeadlineWriter;

use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::time::Instant;

use bytes::Bytes;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::future::{self, BoxFuture, Future, FutureExt};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tracing::trace;

use crate::protocol::BodyError;

/// Pull side of a body stream: yields chunks until `Ok(None)` marks closure.
pub trait BodyReader: Send {
    fn recv(&mut self) -> Result<Option<Bytes>, BodyError>;
}

impl<F> BodyReader for F
where
    F: FnMut() -> Result<Option<Bytes>, BodyError> + Send,
{
    fn recv(&mut self) -> Result<Option<Bytes>, BodyError> {
        (self)()
    }
}

/// Push side of a body stream: accepts chunks in order.
pub trait BodyWriter: Send {
    fn send(&mut self, chunk: Bytes) -> Result<(), BodyError>;
}

impl<F> BodyWriter for F
where
    F: FnMut(Bytes) -> Result<(), BodyError> + Send,
{
    fn send(&mut self, chunk: Bytes) -> Result<(), BodyError> {
        (self)(chunk)
    }
}

/// A bidirectional byte stream, as handed to protocol-upgrade continuations.
pub trait Connection: BodyReader + BodyWriter {}

impl<T: BodyReader + BodyWriter> Connection for T {}

/// A push routine: drives all of its chunks into the given sink.
pub type SenderFn = Box<dyn FnOnce(&mut dyn BodyWriter) -> Result<(), BodyError> + Send>;

/// The async push routine: sends chunks through the channel, resolving once
/// every chunk is delivered or an error occurred.
pub type AsyncSenderFn = Box<dyn FnOnce(UnboundedSender<Bytes>) -> BoxFuture<'static, Result<(), BodyError>> + Send>;

/// The async pull source.
pub type ChunkStream = BoxStream<'static, Result<Bytes, BodyError>>;

/// Which shape a [`Body`] currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Buffer,
    Receiver,
    Sender,
    AsyncReceiver,
    AsyncSender,
    /// The source was moved out or exhausted; no conversion can succeed.
    Consumed,
}

enum Shape {
    Buffer(Bytes),
    Receiver(Box<dyn BodyReader>),
    Sender(SenderFn),
    AsyncReceiver(ChunkStream),
    AsyncSender(AsyncSenderFn),
    Consumed,
}

/// An HTTP message body; see the [module docs](self) for the shape contract.
pub struct Body {
    shape: Shape,
}

impl Body {
    /// An empty buffer body.
    pub fn empty() -> Self {
        Self::buffer(Bytes::new())
    }

    pub fn buffer(bytes: impl Into<Bytes>) -> Self {
        Self { shape: Shape::Buffer(bytes.into()) }
    }

    pub fn receiver(reader: impl BodyReader + 'static) -> Self {
        Self { shape: Shape::Receiver(Box::new(reader)) }
    }

    pub fn sender<F>(sender: F) -> Self
    where
        F: FnOnce(&mut dyn BodyWriter) -> Result<(), BodyError> + Send + 'static,
    {
        Self { shape: Shape::Sender(Box::new(sender)) }
    }

    pub fn async_receiver(chunks: impl Stream<Item = Result<Bytes, BodyError>> + Send + 'static) -> Self {
        Self { shape: Shape::AsyncReceiver(chunks.boxed()) }
    }

    pub fn async_sender<F, Fut>(sender: F) -> Self
    where
        F: FnOnce(UnboundedSender<Bytes>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BodyError>> + Send + 'static,
    {
        Self { shape: Shape::AsyncSender(Box::new(move |tx| sender(tx).boxed())) }
    }

    pub fn kind(&self) -> BodyKind {
        match &self.shape {
            Shape::Buffer(_) => BodyKind::Buffer,
            Shape::Receiver(_) => BodyKind::Receiver,
            Shape::Sender(_) => BodyKind::Sender,
            Shape::AsyncReceiver(_) => BodyKind::AsyncReceiver,
            Shape::AsyncSender(_) => BodyKind::AsyncSender,
            Shape::Consumed => BodyKind::Consumed,
        }
    }

    pub fn is_buffer(&self) -> bool {
        self.kind() == BodyKind::Buffer
    }

    /// The resident bytes, when the body is currently a buffer.
    pub fn as_buffer(&self) -> Option<&Bytes> {
        match &self.shape {
            Shape::Buffer(bytes) => Some(bytes),
            _ => None,
        }
    }

    fn take_shape(&mut self) -> Shape {
        mem::replace(&mut self.shape, Shape::Consumed)
    }

    /// Drains the current shape into resident bytes, installing a buffer.
    ///
    /// No-op when already a buffer. `deadline` bounds the whole drain; an
    /// elapsed deadline fails with [`BodyError::DrainTimeout`]. Async shapes
    /// cannot be drained here, use [`Body::to_buffer_async`].
    pub fn to_buffer(&mut self, deadline: Option<Instant>) -> Result<Bytes, BodyError> {
        match self.take_shape() {
            Shape::Buffer(bytes) => {
                self.shape = Shape::Buffer(bytes.clone());
                Ok(bytes)
            }
            Shape::Receiver(mut reader) => {
                let bytes = Drain::from_reader(reader.as_mut(), deadline)?.into_bytes();
                trace!(len = bytes.len(), "drained receiver body into buffer");
                self.shape = Shape::Buffer(bytes.clone());
                Ok(bytes)
            }
            Shape::Sender(sender) => {
                let mut drain = Drain::new();
                sender(&mut DeadlineWriter::new(&mut drain, deadline))?;
                let bytes = drain.into_bytes();
                trace!(len = bytes.len(), "ran sender body into buffer");
                self.shape = Shape::Buffer(bytes.clone());
                Ok(bytes)
            }
            other @ (Shape::AsyncReceiver(_) | Shape::AsyncSender(_)) => {
                self.shape = other;
                Err(BodyError::InconvertibleShape)
            }
            Shape::Consumed => Err(BodyError::InconvertibleShape),
        }
    }

    /// Reshapes the body into a pull source; chunks are then read with
    /// [`Body::recv_chunk`].
    ///
    /// A buffer becomes a single-chunk source; a sender is run to completion
    /// against a recording sink first.
    pub fn to_receiver(&mut self) -> Result<(), BodyError> {
        match self.take_shape() {
            reader @ Shape::Receiver(_) => self.shape = reader,
            Shape::Buffer(bytes) => self.shape = Shape::Receiver(Box::new(Drain::from_bytes(bytes))),
            Shape::Sender(sender) => {
                let mut drain = Drain::new();
                sender(&mut drain)?;
                self.shape = Shape::Receiver(Box::new(drain));
            }
            other @ (Shape::AsyncReceiver(_) | Shape::AsyncSender(_)) => {
                self.shape = other;
                return Err(BodyError::InconvertibleShape);
            }
            Shape::Consumed => return Err(BodyError::InconvertibleShape),
        }

        Ok(())
    }

    /// Pulls the next chunk from a receiver-shaped body.
    pub fn recv_chunk(&mut self) -> Result<Option<Bytes>, BodyError> {
        match &mut self.shape {
            Shape::Receiver(reader) => reader.recv(),
            _ => Err(BodyError::InconvertibleShape),
        }
    }

    /// Reshapes the body into a push routine; [`Body::push_to`] then drives
    /// it into a sink.
    ///
    /// A buffer becomes a single push; a receiver is drained (bounded by
    /// `deadline`) and pushed as one chunk when the routine later runs.
    pub fn to_sender(&mut self, deadline: Option<Instant>) -> Result<(), BodyError> {
        match self.take_shape() {
            sender @ Shape::Sender(_) => self.shape = sender,
            Shape::Buffer(bytes) => {
                self.shape = Shape::Sender(Box::new(move |writer| {
                    if bytes.is_empty() { Ok(()) } else { writer.send(bytes) }
                }));
            }
            Shape::Receiver(mut reader) => {
                self.shape = Shape::Sender(Box::new(move |writer| {
                    let bytes = Drain::from_reader(reader.as_mut(), deadline)?.into_bytes();
                    if bytes.is_empty() { Ok(()) } else { writer.send(bytes) }
                }));
            }
            other @ (Shape::AsyncReceiver(_) | Shape::AsyncSender(_)) => {
                self.shape = other;
                return Err(BodyError::InconvertibleShape);
            }
            Shape::Consumed => return Err(BodyError::InconvertibleShape),
        }

        Ok(())
    }

    /// Runs a sender-shaped body to completion against `writer`.
    ///
    /// The push routine is consumed: afterwards the body holds no
    /// representation and further conversions fail.
    pub fn push_to(&mut self, writer: &mut dyn BodyWriter) -> Result<(), BodyError> {
        match self.take_shape() {
            Shape::Sender(sender) => sender(writer),
            other => {
                self.shape = other;
                Err(BodyError::InconvertibleShape)
            }
        }
    }

    /// Async mirror of [`Body::to_buffer`].
    ///
    /// Drains an async receiver or runs an async sender to completion;
    /// no-op for a buffer. The returned future resolves exactly once.
    pub async fn to_buffer_async(&mut self, deadline: Option<tokio::time::Instant>) -> Result<Bytes, BodyError> {
        match self.take_shape() {
            Shape::Buffer(bytes) => {
                self.shape = Shape::Buffer(bytes.clone());
                Ok(bytes)
            }
            Shape::AsyncReceiver(chunks) => {
                let bytes = with_deadline(deadline, collect_stream(chunks)).await?;
                trace!(len = bytes.len(), "drained async receiver body into buffer");
                self.shape = Shape::Buffer(bytes.clone());
                Ok(bytes)
            }
            Shape::AsyncSender(sender) => {
                let bytes = with_deadline(deadline, run_async_sender(sender)).await?;
                trace!(len = bytes.len(), "ran async sender body into buffer");
                self.shape = Shape::Buffer(bytes.clone());
                Ok(bytes)
            }
            other @ (Shape::Receiver(_) | Shape::Sender(_)) => {
                self.shape = other;
                Err(BodyError::InconvertibleShape)
            }
            Shape::Consumed => Err(BodyError::InconvertibleShape),
        }
    }

    /// Async mirror of [`Body::to_receiver`]; chunks are then read with
    /// [`Body::recv_chunk_async`].
    pub async fn to_async_receiver(&mut self) -> Result<(), BodyError> {
        match self.take_shape() {
            chunks @ Shape::AsyncReceiver(_) => self.shape = chunks,
            Shape::Buffer(bytes) => {
                let chunks = if bytes.is_empty() { Vec::new() } else { vec![Ok(bytes)] };
                self.shape = Shape::AsyncReceiver(stream::iter(chunks).boxed());
            }
            Shape::AsyncSender(sender) => {
                let bytes = run_async_sender(sender).await?;
                let chunks = if bytes.is_empty() { Vec::new() } else { vec![Ok(bytes)] };
                self.shape = Shape::AsyncReceiver(stream::iter(chunks).boxed());
            }
            other @ (Shape::Receiver(_) | Shape::Sender(_)) => {
                self.shape = other;
                return Err(BodyError::InconvertibleShape);
            }
            Shape::Consumed => return Err(BodyError::InconvertibleShape),
        }

        Ok(())
    }

    /// Pulls the next chunk from an async-receiver-shaped body.
    pub async fn recv_chunk_async(&mut self) -> Result<Option<Bytes>, BodyError> {
        match &mut self.shape {
            Shape::AsyncReceiver(chunks) => chunks.next().await.transpose(),
            _ => Err(BodyError::InconvertibleShape),
        }
    }

    /// Async mirror of [`Body::to_sender`]; [`Body::push_to_async`] then
    /// drives the routine into a channel.
    pub async fn to_async_sender(&mut self, deadline: Option<tokio::time::Instant>) -> Result<(), BodyError> {
        match self.take_shape() {
            sender @ Shape::AsyncSender(_) => self.shape = sender,
            Shape::Buffer(bytes) => {
                self.shape = Shape::AsyncSender(Box::new(move |tx| {
                    async move {
                        if !bytes.is_empty() {
                            tx.unbounded_send(bytes).map_err(BodyError::source)?;
                        }
                        Ok(())
                    }
                    .boxed()
                }));
            }
            Shape::AsyncReceiver(chunks) => {
                self.shape = Shape::AsyncSender(Box::new(move |tx| {
                    async move {
                        let bytes = with_deadline(deadline, collect_stream(chunks)).await?;
                        if !bytes.is_empty() {
                            tx.unbounded_send(bytes).map_err(BodyError::source)?;
                        }
                        Ok(())
                    }
                    .boxed()
                }));
            }
            other @ (Shape::Receiver(_) | Shape::Sender(_)) => {
                self.shape = other;
                return Err(BodyError::InconvertibleShape);
            }
            Shape::Consumed => return Err(BodyError::InconvertibleShape),
        }

        Ok(())
    }

    /// Runs an async-sender-shaped body, pushing its chunks through `tx`.
    ///
    /// Like [`Body::push_to`], the routine is consumed.
    pub async fn push_to_async(&mut self, tx: UnboundedSender<Bytes>) -> Result<(), BodyError> {
        match self.take_shape() {
            Shape::AsyncSender(sender) => sender(tx).await,
            other => {
                self.shape = other;
                Err(BodyError::InconvertibleShape)
            }
        }
    }
}

async fn with_deadline<T>(
    deadline: Option<tokio::time::Instant>,
    fut: impl Future<Output = Result<T, BodyError>>,
) -> Result<T, BodyError> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.map_err(|_| BodyError::DrainTimeout)?,
        None => fut.await,
    }
}

async fn collect_stream(mut chunks: ChunkStream) -> Result<Bytes, BodyError> {
    let mut drain = Drain::new();
    while let Some(chunk) = chunks.next().await {
        drain.send(chunk?)?;
    }
    Ok(drain.into_bytes())
}

async fn run_async_sender(sender: AsyncSenderFn) -> Result<Bytes, BodyError> {
    let (tx, rx) = mpsc::unbounded();
    let produce = sender(tx);
    let collect = rx.collect::<Vec<Bytes>>();

    let (result, chunks) = future::join(produce, collect).await;
    result?;

    let mut drain = Drain::new();
    for chunk in chunks {
        drain.send(chunk)?;
    }
    Ok(drain.into_bytes())
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Body").field(&self.kind()).finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::buffer(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::buffer(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::buffer(Bytes::from(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn chunked_reader(chunks: Vec<&'static [u8]>) -> impl BodyReader {
        let mut iter = chunks.into_iter();
        move || Ok(iter.next().map(Bytes::from_static))
    }

    #[test]
    fn buffer_to_buffer_is_noop() {
        let mut body = Body::buffer("hello");
        assert_eq!(body.to_buffer(None).unwrap(), Bytes::from_static(b"hello"));
        assert!(body.is_buffer());
    }

    #[test]
    fn receiver_round_trip_preserves_bytes() {
        // Buffer -> Receiver -> Buffer must be byte-identical
        let mut body = Body::buffer("some payload");
        body.to_receiver().unwrap();
        assert_eq!(body.kind(), BodyKind::Receiver);

        let bytes = body.to_buffer(None).unwrap();
        assert_eq!(bytes, Bytes::from_static(b"some payload"));
        assert!(body.is_buffer());
    }

    #[test]
    fn receiver_drains_chunk_by_chunk() {
        let mut body = Body::receiver(chunked_reader(vec![b"ab", b"cd", b"e"]));
        assert_eq!(body.to_buffer(None).unwrap(), Bytes::from_static(b"abcde"));
    }

    #[test]
    fn sender_records_into_receiver() {
        let mut body = Body::sender(|writer| {
            writer.send(Bytes::from_static(b"one"))?;
            writer.send(Bytes::from_static(b"two"))
        });

        body.to_receiver().unwrap();
        assert_eq!(body.recv_chunk().unwrap(), Some(Bytes::from_static(b"one")));
        assert_eq!(body.recv_chunk().unwrap(), Some(Bytes::from_static(b"two")));
        assert_eq!(body.recv_chunk().unwrap(), None);
    }

    #[test]
    fn endless_receiver_hits_drain_timeout() {
        let mut body = Body::receiver(|| Ok(Some(Bytes::from_static(b"more"))));

        let deadline = Instant::now() + Duration::from_millis(10);
        let result = body.to_buffer(Some(deadline));
        assert!(matches!(result, Err(BodyError::DrainTimeout)));
    }

    #[test]
    fn consumed_body_is_inconvertible() {
        let mut body = Body::buffer("x");
        body.to_sender(None).unwrap();

        let mut drain = Drain::new();
        body.push_to(&mut drain).unwrap();
        assert_eq!(body.kind(), BodyKind::Consumed);

        assert!(matches!(body.to_buffer(None), Err(BodyError::InconvertibleShape)));
        assert!(matches!(body.to_receiver(), Err(BodyError::InconvertibleShape)));
    }

    #[test]
    fn sync_conversion_rejects_async_shapes() {
        let mut body = Body::async_receiver(stream::iter(vec![Ok(Bytes::from_static(b"x"))]));
        assert!(matches!(body.to_buffer(None), Err(BodyError::InconvertibleShape)));
        // the shape must survive the failed conversion
        assert_eq!(body.kind(), BodyKind::AsyncReceiver);
    }

    #[tokio::test]
    async fn async_receiver_drains_to_buffer() {
        let chunks = stream::iter(vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))]);
        let mut body = Body::async_receiver(chunks);

        let bytes = body.to_buffer_async(None).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"abcd"));
        assert!(body.is_buffer());
    }

    #[tokio::test]
    async fn async_sender_drains_to_buffer() {
        let mut body = Body::async_sender(|tx| async move {
            tx.unbounded_send(Bytes::from_static(b"one ")).map_err(BodyError::source)?;
            tx.unbounded_send(Bytes::from_static(b"two")).map_err(BodyError::source)?;
            Ok(())
        });

        let bytes = body.to_buffer_async(None).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"one two"));
    }

    #[tokio::test]
    async fn async_buffer_round_trip() {
        let mut body = Body::buffer("roundabout");
        body.to_async_receiver().await.unwrap();
        assert_eq!(body.kind(), BodyKind::AsyncReceiver);

        let bytes = body.to_buffer_async(None).await.unwrap();
        assert_eq!(bytes, Bytes::from_static(b"roundabout"));
    }

    #[tokio::test]
    async fn pending_async_receiver_hits_drain_timeout() {
        let mut body = Body::async_receiver(stream::pending());

        let deadline = tokio::time::Instant::now() + Duration::from_millis(10);
        let result = body.to_buffer_async(Some(deadline)).await;
        assert!(matches!(result, Err(BodyError::DrainTimeout)));
    }

    #[tokio::test]
    async fn async_conversion_rejects_sync_shapes() {
        let mut body = Body::receiver(chunked_reader(vec![b"x"]));
        assert!(matches!(body.to_buffer_async(None).await, Err(BodyError::InconvertibleShape)));
        assert_eq!(body.kind(), BodyKind::Receiver);
    }

    #[tokio::test]
    async fn async_sender_pushes_through_channel() {
        let mut body = Body::buffer("payload");
        body.to_async_sender(None).await.unwrap();

        let (tx, rx) = mpsc::unbounded();
        body.push_to_async(tx).await.unwrap();

        let chunks: Vec<Bytes> = rx.collect().await;
        assert_eq!(chunks, vec![Bytes::from_static(b"payload")]);
        assert_eq!(body.kind(), BodyKind::Consumed);
    }
}
