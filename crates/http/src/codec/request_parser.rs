use std::mem;
use std::str;

use bytes::BytesMut;
use http::Uri;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::{PayloadDecoder, PayloadItem};
use crate::codec::{ensure_header_cap, payload_framing, split_header_line, take_line, unexpected_eof, Framing};
use crate::protocol::body::Body;
use crate::protocol::{parse_cookie_header, Cookie, Extensions, Headers, Method, ParseError, Request, Version};

/// Incremental HTTP/1.x request parser; see the [module docs](crate::codec)
/// for the feeding contract.
#[derive(Debug)]
pub struct RequestParser {
    buffer: BytesMut,
    state: State,
    context: Context,
}

#[derive(Debug)]
enum State {
    StartLine,
    Headers(RequestLine),
    Payload { line: RequestLine, decoder: PayloadDecoder },
}

#[derive(Debug)]
struct RequestLine {
    method: Method,
    uri: Uri,
    version: Version,
}

#[derive(Debug, Default)]
struct Context {
    headers: Headers,
    pending: Option<(String, String)>,
    cookie_value: String,
    cookies: Vec<Cookie>,
    header_size: usize,
    body: BytesMut,
}

impl RequestParser {
    pub fn new() -> Self {
        Self { buffer: BytesMut::new(), state: State::StartLine, context: Context::default() }
    }

    /// Feeds more bytes, returning the next complete request if one just
    /// finished.
    ///
    /// Unconsumed bytes stay buffered, so pipelined requests come out one
    /// call at a time; feed an empty slice to pull the next one. An error
    /// discards the buffered input along with the partial message.
    pub fn parse(&mut self, bytes: &[u8]) -> Result<Option<Request>, ParseError> {
        self.buffer.extend_from_slice(bytes);

        let mut buffer = mem::take(&mut self.buffer);
        let result = self.decode(&mut buffer);
        self.buffer = buffer;
        result
    }

    fn reset(&mut self) {
        self.state = State::StartLine;
        self.context = Context::default();
        self.buffer.clear();
    }

    fn step(&mut self, src: &mut BytesMut) -> Result<Option<Request>, ParseError> {
        loop {
            match mem::replace(&mut self.state, State::StartLine) {
                State::StartLine => {
                    let Some(line) = take_line(src) else {
                        ensure_header_cap(src.len())?;
                        return Ok(None);
                    };
                    // tolerate blank lines ahead of the request line
                    if line.is_empty() {
                        continue;
                    }

                    let text = str::from_utf8(&line)
                        .map_err(|_| ParseError::malformed_start_line("request line is not UTF-8"))?;
                    self.state = State::Headers(parse_request_line(text)?);
                }

                State::Headers(request_line) => {
                    let Some(line) = take_line(src) else {
                        self.state = State::Headers(request_line);
                        ensure_header_cap(self.context.header_size + src.len())?;
                        return Ok(None);
                    };

                    let text = str::from_utf8(&line)
                        .map_err(|_| ParseError::malformed_header("header line is not UTF-8"))?;

                    if text.is_empty() {
                        self.commit_pending();
                        self.context.cookies = self.take_cookies()?;
                        let decoder = self.select_payload()?;

                        trace!(method = %request_line.method, uri = %request_line.uri, "request head complete");
                        self.state = State::Payload { line: request_line, decoder };
                        continue;
                    }

                    self.context.header_size += text.len();
                    ensure_header_cap(self.context.header_size)?;
                    self.read_header_line(text)?;
                    self.state = State::Headers(request_line);
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

    fn step_eof(&mut self, src: &mut BytesMut) -> Result<Option<Request>, ParseError> {
        if let Some(request) = self.step(src)? {
            return Ok(Some(request));
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

    /// Accumulates one header line, holding it back until the next line
    /// shows it is not continued by obsolete folding.
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

    /// Routes the held-back field: `Cookie` values accumulate separately,
    /// everything else lands in the header map.
    fn commit_pending(&mut self) {
        let Some((name, value)) = self.context.pending.take() else { return };

        if name.eq_ignore_ascii_case("cookie") {
            if !self.context.cookie_value.is_empty() {
                self.context.cookie_value.push_str("; ");
            }
            self.context.cookie_value.push_str(&value);
        } else {
            self.context.headers.append(name, value);
        }
    }

    /// Parses the accumulated `Cookie` value; one malformed pair fails the
    /// whole message.
    fn take_cookies(&mut self) -> Result<Vec<Cookie>, ParseError> {
        let value = mem::take(&mut self.context.cookie_value);
        if value.is_empty() {
            return Ok(Vec::new());
        }
        parse_cookie_header(&value)
    }

    fn select_payload(&self) -> Result<PayloadDecoder, ParseError> {
        Ok(match payload_framing(&self.context.headers)? {
            Framing::Length(length) => PayloadDecoder::length(length),
            Framing::Chunked => PayloadDecoder::chunked(),
            // a request without framing headers has no body
            Framing::Unframed => PayloadDecoder::empty(),
        })
    }

    fn complete(&mut self, line: RequestLine) -> Request {
        let context = mem::take(&mut self.context);

        Request {
            method: line.method,
            uri: line.uri,
            version: line.version,
            headers: context.headers,
            cookies: context.cookies,
            body: Body::buffer(context.body.freeze()),
            upgrade: None,
            extensions: Extensions::new(),
        }
    }
}

fn parse_request_line(line: &str) -> Result<RequestLine, ParseError> {
    let mut parts = line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ParseError::malformed_start_line(line));
    };

    Ok(RequestLine {
        method: Method::parse(method)?,
        uri: target.parse().map_err(ParseError::malformed_uri)?,
        version: Version::parse(version)?,
    })
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestParser {
    type Item = Request;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;

    const SIMPLE: &[u8] = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";

    fn parse_all(parser: &mut RequestParser, bytes: &[u8]) -> Request {
        parser.parse(bytes).unwrap().expect("expected a complete request")
    }

    #[test]
    fn parses_a_simple_get() {
        let mut parser = RequestParser::new();
        let request = parse_all(&mut parser, SIMPLE);

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.uri.path(), "/index.html");
        assert_eq!(request.version, Version::HTTP_11);
        assert_eq!(request.headers.get("host"), Some("example.com"));
        assert_eq!(request.body.as_buffer().map(|bytes| bytes.len()), Some(0));
    }

    #[test]
    fn split_points_do_not_change_the_result() {
        let raw = b"POST /submit HTTP/1.1\r\nHost: h\r\nContent-Length: 11\r\nCookie: theme=light; sessionToken=abc123\r\n\r\nhello world";

        // byte-at-a-time must agree with one-shot parsing
        let mut parser = RequestParser::new();
        let mut piecewise = None;
        for byte in raw.iter() {
            if let Some(request) = parser.parse(std::slice::from_ref(byte)).unwrap() {
                piecewise = Some(request);
            }
        }
        let piecewise = piecewise.expect("byte-wise feed never completed");

        let mut parser = RequestParser::new();
        let oneshot = parse_all(&mut parser, raw);

        assert_eq!(piecewise.method, oneshot.method);
        assert_eq!(piecewise.uri, oneshot.uri);
        assert_eq!(piecewise.headers, oneshot.headers);
        assert_eq!(piecewise.cookies, oneshot.cookies);
        assert_eq!(piecewise.body.as_buffer(), oneshot.body.as_buffer());
        assert_eq!(oneshot.body.as_buffer().unwrap(), &bytes::Bytes::from_static(b"hello world"));
    }

    #[test]
    fn cookie_header_is_parsed_into_pairs() {
        let raw = b"GET / HTTP/1.1\r\nCookie: theme=light; sessionToken=abc123\r\n\r\n";
        let mut parser = RequestParser::new();
        let request = parse_all(&mut parser, raw);

        assert_eq!(
            request.cookies,
            vec![Cookie::new("theme", "light"), Cookie::new("sessionToken", "abc123")]
        );
        assert!(!request.headers.contains("Cookie"));
    }

    #[test]
    fn multiple_cookie_lines_accumulate() {
        let raw = b"GET / HTTP/1.1\r\nCookie: a=1\r\nCookie: b=2\r\n\r\n";
        let mut parser = RequestParser::new();
        let request = parse_all(&mut parser, raw);

        assert_eq!(request.cookies, vec![Cookie::new("a", "1"), Cookie::new("b", "2")]);
    }

    #[test]
    fn malformed_cookie_fails_the_message() {
        let raw = b"GET / HTTP/1.1\r\nCookie: no-equals-here\r\n\r\n";
        let mut parser = RequestParser::new();

        let error = parser.parse(raw).unwrap_err();
        assert!(matches!(error, ParseError::MalformedCookie { .. }));
    }

    #[test]
    fn errors_reset_the_parser_for_the_next_message() {
        let mut parser = RequestParser::new();

        assert!(parser.parse(b"NOT A REQUEST\r\n\r\n").is_err());

        // buffered garbage is gone; a fresh request parses cleanly
        let request = parse_all(&mut parser, SIMPLE);
        assert_eq!(request.method, Method::Get);
    }

    #[test]
    fn pipelined_requests_come_out_one_at_a_time() {
        let raw = b"GET /first HTTP/1.1\r\n\r\nGET /second HTTP/1.1\r\n\r\n";
        let mut parser = RequestParser::new();

        let first = parser.parse(raw).unwrap().unwrap();
        assert_eq!(first.uri.path(), "/first");

        let second = parser.parse(b"").unwrap().unwrap();
        assert_eq!(second.uri.path(), "/second");

        assert!(parser.parse(b"").unwrap().is_none());
    }

    #[test]
    fn chunked_request_body_is_unframed() {
        let raw = b"POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n";
        let mut parser = RequestParser::new();
        let request = parse_all(&mut parser, raw);

        assert!(request.is_chunk_encoded());
        assert_eq!(request.body.as_buffer().unwrap(), &bytes::Bytes::from_static(b"hello world"));
    }

    #[test]
    fn conflicting_framing_headers_are_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 3\r\nTransfer-Encoding: chunked\r\n\r\n";
        let mut parser = RequestParser::new();

        let error = parser.parse(raw).unwrap_err();
        assert!(matches!(error, ParseError::MalformedHeader { .. }));
    }

    #[test]
    fn folded_header_lines_join_the_previous_field() {
        let raw = b"GET / HTTP/1.1\r\nX-Long: first\r\n second\r\nHost: h\r\n\r\n";
        let mut parser = RequestParser::new();
        let request = parse_all(&mut parser, raw);

        assert_eq!(request.headers.get("x-long"), Some("first second"));
        assert_eq!(request.headers.get("host"), Some("h"));
    }

    #[test]
    fn oversized_header_block_is_rejected() {
        let mut parser = RequestParser::new();
        parser.parse(b"GET / HTTP/1.1\r\n").unwrap();

        let long_value = "v".repeat(16 * 1024);
        let error = parser.parse(format!("X-Big: {long_value}\r\n").as_bytes()).unwrap_err();
        assert!(matches!(error, ParseError::TooLargeHeader { .. }));
    }

    #[test]
    fn bare_lf_line_endings_are_tolerated() {
        let raw = indoc::indoc! {"
            GET /lenient HTTP/1.1
            Host: example.com

        "};
        let mut parser = RequestParser::new();
        let request = parse_all(&mut parser, raw.as_bytes());

        assert_eq!(request.uri.path(), "/lenient");
        assert_eq!(request.headers.get("Host"), Some("example.com"));
    }

    #[test]
    fn eof_mid_message_is_an_error() {
        let mut parser = RequestParser::new();
        let mut buffer = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc"[..]);

        assert!(parser.decode(&mut buffer).unwrap().is_none());
        assert!(parser.decode_eof(&mut buffer).is_err());
    }
}
