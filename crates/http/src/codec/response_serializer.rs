use std::io;

use tracing::trace;

use crate::codec::request_serializer::stream_async_sender;
use crate::codec::{write_chunk, ChunkWriter};
use crate::protocol::body::BodyKind;
use crate::protocol::{BodyError, Response, SendError};

/// Serializes responses onto a caller-supplied sink; same contract as
/// [`RequestSerializer`](crate::codec::RequestSerializer), with each cookie
/// going out on its own `Set-Cookie` line.
#[derive(Debug, Default)]
pub struct ResponseSerializer;

impl ResponseSerializer {
    pub fn new() -> Self {
        Self
    }

    pub fn serialize<F>(&self, mut response: Response, send: &mut F) -> Result<(), SendError>
    where
        F: FnMut(&[u8]) -> io::Result<()> + Send,
    {
        send(head(&response).as_bytes())?;

        match response.body.kind() {
            BodyKind::Buffer => {
                let bytes = response.body.to_buffer(None)?;
                if !bytes.is_empty() {
                    send(&bytes)?;
                }
            }
            BodyKind::Receiver => {
                while let Some(chunk) = response.body.recv_chunk()? {
                    if !chunk.is_empty() {
                        write_chunk(send, &chunk)?;
                    }
                }
                send(b"0\r\n\r\n")?;
            }
            BodyKind::Sender => {
                let mut writer = ChunkWriter::new(send);
                let result = response.body.push_to(&mut writer);
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

        trace!(status = response.status.code, "response serialized");
        Ok(())
    }

    /// Async mirror of [`ResponseSerializer::serialize`].
    pub async fn serialize_async<F>(&self, mut response: Response, send: &mut F) -> Result<(), SendError>
    where
        F: FnMut(&[u8]) -> io::Result<()> + Send,
    {
        send(head(&response).as_bytes())?;

        match response.body.kind() {
            BodyKind::Buffer => {
                let bytes = response.body.to_buffer(None)?;
                if !bytes.is_empty() {
                    send(&bytes)?;
                }
            }
            BodyKind::AsyncReceiver => {
                while let Some(chunk) = response.body.recv_chunk_async().await? {
                    if !chunk.is_empty() {
                        write_chunk(send, &chunk)?;
                    }
                }
                send(b"0\r\n\r\n")?;
            }
            BodyKind::AsyncSender => {
                stream_async_sender(&mut response.body, send).await?;
                send(b"0\r\n\r\n")?;
            }
            BodyKind::Receiver | BodyKind::Sender | BodyKind::Consumed => {
                return Err(BodyError::InconvertibleShape.into());
            }
        }

        trace!(status = response.status.code, "response serialized");
        Ok(())
    }
}

fn head(response: &Response) -> String {
    let mut head = format!("{} {}\r\n", response.version, response.status);

    for (name, value) in response.headers.iter() {
        head.push_str(&format!("{name}: {value}\r\n"));
    }

    for cookie in &response.cookies {
        head.push_str(&format!("Set-Cookie: {cookie}\r\n"));
    }

    head.push_str("\r\n");
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ResponseParser;
    use crate::protocol::body::Body;
    use crate::protocol::AttributedCookie;
    use bytes::Bytes;

    #[test]
    fn buffer_response_serializes_in_one_piece() {
        let response = Response::ok(Body::buffer("hello"));

        let mut out = Vec::new();
        let mut send = |bytes: &[u8]| {
            out.extend_from_slice(bytes);
            io::Result::Ok(())
        };
        ResponseSerializer::new().serialize(response, &mut send).unwrap();

        assert_eq!(out, b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
    }

    #[test]
    fn each_cookie_gets_its_own_set_cookie_line() {
        let mut secure = AttributedCookie::new("sid", "1");
        secure.set_attribute("Path", "/");
        secure.set_attribute("Secure", "");

        let response = Response::ok(Body::empty())
            .with_cookie(secure)
            .with_cookie(AttributedCookie::new("theme", "dark"));

        let mut out = Vec::new();
        let mut send = |bytes: &[u8]| {
            out.extend_from_slice(bytes);
            io::Result::Ok(())
        };
        ResponseSerializer::new().serialize(response, &mut send).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Set-Cookie: sid=1; Path=/; Secure\r\n"));
        assert!(text.contains("Set-Cookie: theme=dark\r\n"));
    }

    #[test]
    fn streamed_response_is_chunk_framed() {
        let body = Body::sender(|writer| {
            writer.send(Bytes::from_static(b"abc"))?;
            writer.send(Bytes::from_static(b"de"))
        });
        let response = Response::ok(body);

        let mut out = Vec::new();
        let mut send = |bytes: &[u8]| {
            out.extend_from_slice(bytes);
            io::Result::Ok(())
        };
        ResponseSerializer::new().serialize(response, &mut send).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n"));
        assert!(text.ends_with("3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"));
    }

    #[tokio::test]
    async fn async_receiver_response_streams_chunks() {
        let chunks = futures::stream::iter(vec![Ok(Bytes::from_static(b"abc")), Ok(Bytes::from_static(b"de"))]);
        let response = Response::ok(Body::async_receiver(chunks));

        let mut out = Vec::new();
        let mut send = |bytes: &[u8]| {
            out.extend_from_slice(bytes);
            io::Result::Ok(())
        };
        ResponseSerializer::new().serialize_async(response, &mut send).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n"));
    }

    #[test]
    fn serialized_response_parses_back_unchanged() {
        let mut cookie = AttributedCookie::new("sid", "99");
        cookie.set_attribute("HttpOnly", "");

        let response = Response::ok(Body::buffer("body bytes")).with_cookie(cookie);

        let mut out = Vec::new();
        let mut send = |bytes: &[u8]| {
            out.extend_from_slice(bytes);
            io::Result::Ok(())
        };
        ResponseSerializer::new().serialize(response, &mut send).unwrap();

        let mut parser = ResponseParser::new();
        let parsed = parser.parse(&out).unwrap().unwrap();

        assert_eq!(parsed.status.code, 200);
        assert_eq!(parsed.cookies.len(), 1);
        assert_eq!(parsed.cookies[0].name, "sid");
        assert!(parsed.cookies[0].http_only());
        assert_eq!(parsed.body.as_buffer().unwrap(), &Bytes::from_static(b"body bytes"));
    }
}
