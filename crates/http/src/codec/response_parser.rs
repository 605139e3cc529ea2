use std::mem;
use std::str;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, trace};

use crate::codec::body::{PayloadDecoder, PayloadItem};
use crate::codec::{ensure_header_cap, payload_framing, split_header_line, take_line, unexpected_eof, Framing};
use crate::protocol::body::Body;
use crate::protocol::{parse_set_cookie, AttributedCookie, Extensions, Headers, ParseError, Response, Status, Version};

/// Incremental HTTP/1.x response parser.
///
/// Mirrors [`RequestParser`](crate::codec::RequestParser), with the response
/// side's extra wrinkle: a response with neither `Content-Length` nor
/// `chunked` framing runs until the peer closes the connection, so such a
/// message only completes through [`ResponseParser::finish`] (or
/// `decode_eof` when driven as a [`Decoder`]).
#[derive(Debug)]
pub struct ResponseParser {
    buffer: BytesMut,
    state: State,
    context: Context,
}

#[derive(Debug)]
enum State {
    StartLine,
    Headers(StatusLine),
    Payload { line: StatusLine, decoder: PayloadDecoder },
}

#[derive(Debug)]
struct StatusLine {
    version: Version,
    status: Status,
}

#[derive(Debug, Default)]
struct Context {
    headers: Headers,
    pending: Option<(String, String)>,
    cookies: Vec<AttributedCookie>,
    header_size: usize,
    body: BytesMut,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self { buffer: BytesMut::new(), state: State::StartLine, context: Context::default() }
    }

    /// Feeds more bytes, returning the next complete response if one just
    /// finished. Same contract as
    /// [`RequestParser::parse`](crate::codec::RequestParser::parse).
    pub fn parse(&mut self, bytes: &[u8]) -> Result<Option<Response>, ParseError> {
        self.buffer.extend_from_slice(bytes);

        let mut buffer = mem::take(&mut self.buffer);
        let result = self.decode(&mut buffer);
        self.buffer = buffer;
        result
    }

    /// Signals connection close, completing an in-flight read-until-close
    /// response. Erring when the close lands mid-message.
    pub fn finish(&mut self) -> Result<Option<Response>, ParseError> {
        let mut buffer = mem::take(&mut self.buffer);
        let result = self.decode_eof(&mut buffer);
        self.buffer = buffer;
        result
    }

    fn reset(&mut self) {
        self.state = State::StartLine;
        self.context = Context::default();
        self.buffer.clear();
    }

    fn step(&mut self, src: &mut BytesMut) -> Result<Option<Response>, ParseError> {
        loop {
            match mem::replace(&mut self.state, State::StartLine) {
                State::StartLine => {
                    let Some(line) = take_line(src) else {
                        ensure_header_cap(src.len())?;
                        return Ok(None);
                    };
                    if line.is_empty() {
                        continue;
                    }

                    let text = str::from_utf8(&line)
                        .map_err(|_| ParseError::malformed_start_line("status line is not UTF-8"))?;
                    self.state = State::Headers(parse_status_line(text)?);
                }

                State::Headers(status_line) => {
                    let Some(line) = take_line(src) else {
                        self.state = State::Headers(status_line);
                        ensure_header_cap(self.context.header_size + src.len())?;
                        return Ok(None);
                    };

                    let text = str::from_utf8(&line)
                        .map_err(|_| ParseError::malformed_header("header line is not UTF-8"))?;

                    if text.is_empty() {
                        self.commit_pending();
                        let decoder = self.select_payload(&status_line.status)?;

                        trace!(status = status_line.status.code, "response head complete");
                        self.state = State::Payload { line: status_line, decoder };
                        continue;
                    }

                    self.context.header_size += text.len();
                    ensure_header_cap(self.context.header_size)?;
                    self.read_header_line(text)?;
                    self.state = State::Headers(status_line);
                }

                State::Payload { line, mut decoder } => match decoder.decode(src)? {
                    Some(PayloadItem::Chunk(chunk)) => {
                        self.context.body.extend_from_slice(&chunk);
                        self.state = State::Payload { line, decoder };
                    }
                    Some(PayloadItem::Eof) => return Ok(Some(self.complete(line))),
                    None => {
                        self.state = State::Payload { line, decoder };
                        return Ok(None);
                    }
                },
            }
        }
    }

    fn step_eof(&mut self, src: &mut BytesMut) -> Result<Option<Response>, ParseError> {
        if let Some(response) = self.step(src)? {
            return Ok(Some(response));
        }

        match mem::replace(&mut self.state, State::StartLine) {
            State::StartLine if src.is_empty() => Ok(None),
            State::Payload { line, mut decoder } => loop {
                match decoder.decode_eof(src)? {
                    Some(PayloadItem::Chunk(chunk)) => self.context.body.extend_from_slice(&chunk),
                    Some(PayloadItem::Eof) => return Ok(Some(self.complete(line))),
                    None => return Err(unexpected_eof()),
                }
            },
            _ => Err(unexpected_eof()),
        }
    }

    fn read_header_line(&mut self, line: &str) -> Result<(), ParseError> {
        if line.starts_with([' ', '\t']) {
            let Some((_, value)) = self.context.pending.as_mut() else {
                return Err(ParseError::malformed_header("continuation line without a field"));
            };
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(line.trim());
            return Ok(());
        }

        self.commit_pending();
        self.context.pending = Some(split_header_line(line)?);
        Ok(())
    }

    /// Routes the held-back field. A malformed `Set-Cookie` line is dropped
    /// here and parsing continues; the rest of the message is unaffected.
    fn commit_pending(&mut self) {
        let Some((name, value)) = self.context.pending.take() else { return };

        if name.eq_ignore_ascii_case("set-cookie") {
            match parse_set_cookie(&value) {
                Ok(cookie) => self.context.cookies.push(cookie),
                Err(error) => debug!(%error, value, "dropping malformed Set-Cookie header"),
            }
        } else {
            self.context.headers.append(name, value);
        }
    }

    fn select_payload(&self, status: &Status) -> Result<PayloadDecoder, ParseError> {
        // these statuses never carry a payload, whatever the headers say
        if status.is_informational() || status.code == Status::NO_CONTENT || status.code == Status::NOT_MODIFIED {
            return Ok(PayloadDecoder::empty());
        }

        Ok(match payload_framing(&self.context.headers)? {
            Framing::Length(length) => PayloadDecoder::length(length),
            Framing::Chunked => PayloadDecoder::chunked(),
            Framing::Unframed => PayloadDecoder::until_close(),
        })
    }

    fn complete(&mut self, line: StatusLine) -> Response {
        let context = mem::take(&mut self.context);

        Response {
            status: line.status,
            version: line.version,
            headers: context.headers,
            cookies: context.cookies,
            body: Body::buffer(context.body.freeze()),
            upgrade: None,
            extensions: Extensions::new(),
        }
    }
}

fn parse_status_line(line: &str) -> Result<StatusLine, ParseError> {
    let mut parts = line.splitn(3, ' ');
    let (Some(version), Some(code)) = (parts.next(), parts.next()) else {
        return Err(ParseError::malformed_start_line(line));
    };

    let version = Version::parse(version)?;
    let code: u16 = code.parse().map_err(|_| ParseError::malformed_start_line(line))?;

    // the reason phrase is free text and may be absent entirely
    let status = match parts.next().map(str::trim).filter(|reason| !reason.is_empty()) {
        Some(reason) => Status::with_reason(code, reason),
        None => Status::new(code),
    };

    Ok(StatusLine { version, status })
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ResponseParser {
    type Item = Response;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.step(src) {
            Ok(item) => Ok(item),
            Err(error) => {
                src.clear();
                self.reset();
                Err(error)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.step_eof(src) {
            Ok(item) => Ok(item),
            Err(error) => {
                src.clear();
                self.reset();
                Err(error)
            }
        }
    }
}
