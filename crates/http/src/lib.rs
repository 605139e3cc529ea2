//! Incremental HTTP/1.x message parsing, serialization and streaming bodies.
//!
//! This crate is the protocol core of rivet: it turns raw connection bytes
//! into typed [`Request`](protocol::Request) / [`Response`](protocol::Response)
//! values and back, without owning any sockets itself. Feed the parsers byte
//! slices as they arrive; hand the serializers any `FnMut(&[u8])` sink.
//!
//! # Features
//!
//! - Incremental, split-point-insensitive request and response parsing
//! - `Content-Length`, `chunked` and read-until-close payload framing
//! - Case-insensitive, order-preserving, multi-valued header map
//! - Cookie handling on both sides of the protocol (`Cookie` / `Set-Cookie`)
//! - A five-shape [`Body`](protocol::body::Body): resident buffer, sync
//!   pull/push streams, async pull/push streams, with in-place conversions
//! - Pipelining: parsers yield one message at a time and keep the rest
//!   buffered
//!
//! # Example
//!
//! ```
//! use rivet_http::codec::{RequestParser, ResponseSerializer};
//! use rivet_http::protocol::body::Body;
//! use rivet_http::protocol::Response;
//!
//! # fn main() -> Result<(), rivet_http::protocol::HttpError> {
//! let mut parser = RequestParser::new();
//! let request = parser
//!     .parse(b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n")?
//!     .expect("a complete request");
//! assert_eq!(request.uri.path(), "/hello");
//!
//! let response = Response::ok(Body::buffer("hello!"));
//! let mut wire = Vec::new();
//! let mut sink = |bytes: &[u8]| {
//!     wire.extend_from_slice(bytes);
//!     Ok(())
//! };
//! ResponseSerializer::new().serialize(response, &mut sink)?;
//! assert!(wire.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: message model — header map, methods, statuses, cookies,
//!   bodies, errors
//! - [`codec`]: the wire side — incremental parsers and serializers
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - No TLS, no connection management; callers own the transport
//! - Maximum start line plus header block size: 8KB

pub mod codec;
pub mod protocol;

mod utils;
