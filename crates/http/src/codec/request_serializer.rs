use std::io;

use futures::channel::mpsc;
use futures::future;
use futures::StreamExt;
use tracing::trace;

use crate::codec::{write_chunk, ChunkWriter};
use crate::protocol::body::BodyKind;
use crate::protocol::{BodyError, Request, SendError};

/// Serializes requests onto a caller-supplied sink.
///
/// The sink is any `FnMut(&[u8]) -> io::Result<()>`; a failed call aborts
/// the transmission immediately, leaving already-written bytes on the wire.
/// Buffer bodies go out verbatim under their `Content-Length`; receiver and
/// sender bodies are chunk framed as they stream. [`serialize`] handles the
/// sync shapes, [`serialize_async`] the async ones; handing either the other
/// domain's shape fails with [`BodyError::InconvertibleShape`].
///
/// [`serialize`]: RequestSerializer::serialize
/// [`serialize_async`]: RequestSerializer::serialize_async
#[derive(Debug, Default)]
pub struct RequestSerializer;

impl RequestSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize<F>(&self, mut request: Request, send: &mut F) -> Result<(), SendError>
    where
        F: FnMut(&[u8]) -> io::Result<()> + Send,
    {
        send(head(&request).as_bytes())?;

        match request.body.kind() {
            BodyKind::Buffer => {
                let bytes = request.body.to_buffer(None)?;
                if !bytes.is_empty() {
                    send(&bytes)?;
                }
            }
            BodyKind::Receiver => {
                while let Some(chunk) = request.body.recv_chunk()? {
                    if !chunk.is_empty() {
                        write_chunk(send, &chunk)?;
                    }
                }
                send(b"0\r\n\r\n")?;
            }
            BodyKind::Sender => {
                let mut writer = ChunkWriter::new(send);
                let result = request.body.push_to(&mut writer);
                if let Some(error) = writer.io_error.take() {
                    return Err(SendError::aborted(error));
                }
                result?;
                send(b"0\r\n\r\n")?;
            }
            BodyKind::AsyncReceiver | BodyKind::AsyncSender | BodyKind::Consumed => {
                return Err(BodyError::InconvertibleShape.into());
            }
        }

        trace!(method = %request.method, uri = %request.uri, "request serialized");
        Ok(())
    }

    /// Async mirror of [`RequestSerializer::serialize`]: buffer bodies plus
    /// the two async shapes.
    pub async fn serialize_async<F>(&self, mut request: Request, send: &mut F) -> Result<(), SendError>
    where
        F: FnMut(&[u8]) -> io::Result<()> + Send,
    {
        send(head(&request).as_bytes())?;

        match request.body.kind() {
            BodyKind::Buffer => {
                let bytes = request.body.to_buffer(None)?;
                if !bytes.is_empty() {
                    send(&bytes)?;
                }
            }
            BodyKind::AsyncReceiver => {
                while let Some(chunk) = request.body.recv_chunk_async().await? {
                    if !chunk.is_empty() {
                        write_chunk(send, &chunk)?;
                    }
                }
                send(b"0\r\n\r\n")?;
            }
            BodyKind::AsyncSender => {
                stream_async_sender(&mut request.body, send).await?;
                send(b"0\r\n\r\n")?;
            }
            BodyKind::Receiver | BodyKind::Sender | BodyKind::Consumed => {
                return Err(BodyError::InconvertibleShape.into());
            }
        }

        trace!(method = %request.method, uri = %request.uri, "request serialized");
        Ok(())
    }
}

/// Runs an async-sender body, chunk framing its output as it arrives.
pub(crate) async fn stream_async_sender<F>(
    body: &mut crate::protocol::body::Body,
    send: &mut F,
) -> Result<(), SendError>
where
    F: FnMut(&[u8]) -> io::Result<()> + Send,
{
    let (tx, mut rx) = mpsc::unbounded();
    let produce = body.push_to_async(tx);
    let consume = async move {
        while let Some(chunk) = rx.next().await {
            if !chunk.is_empty() {
                write_chunk(send, &chunk)?;
            }
        }
        Ok::<(), SendError>(())
    };

    let (produced, consumed) = future::join(produce, consume).await;
    produced?;
    consumed
}

fn head(request: &Request) -> String {
    let mut head = format!("{} {} {}\r\n", request.method, request.uri, request.version);

    for (name, value) in request.headers.iter() {
        head.push_str(&format!("{name}: {value}\r\n"));
    }

    if !request.cookies.is_empty() {
        let cookies: Vec<String> = request.cookies.iter().map(|cookie| cookie.to_string()).collect();
        head.push_str(&format!("Cookie: {}\r\n", cookies.join("; ")));
    }

    head.push_str("\r\n");
    head
}
