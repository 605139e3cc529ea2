use mime::Mime;

use crate::protocol::body::Body;
use crate::protocol::headers::Headers;
use crate::protocol::version::Version;

/// Shared surface of [`Request`](crate::protocol::Request) and
/// [`Response`](crate::protocol::Response).
///
/// Beyond the raw accessors, this trait provides the small set of framing
/// conveniences both sides of the protocol need over a finished header map:
/// content length, chunking, keep-alive and upgrade inspection. Anything
/// richer (typed `Accept`, `Cache-Control`, …) belongs to layers above this
/// crate.
pub trait Message {
    fn version(&self) -> Version;
    fn headers(&self) -> &Headers;
    fn headers_mut(&mut self) -> &mut Headers;
    fn body(&self) -> &Body;
    fn body_mut(&mut self) -> &mut Body;

    fn content_length(&self) -> Option<u64> {
        self.headers().get("Content-Length").and_then(|value| value.trim().parse().ok())
    }

    fn set_content_length(&mut self, length: u64) {
        self.headers_mut().set("Content-Length", length.to_string());
    }

    fn content_type(&self) -> Option<Mime> {
        self.headers().get("Content-Type").and_then(|value| value.parse().ok())
    }

    fn set_content_type(&mut self, mime: &Mime) {
        self.headers_mut().set("Content-Type", mime.to_string());
    }

    fn transfer_encoding(&self) -> Option<String> {
        self.headers().merged("Transfer-Encoding")
    }

    /// True when the final transfer coding is `chunked`.
    fn is_chunk_encoded(&self) -> bool {
        self.transfer_encoding()
            .as_deref()
            .and_then(|encodings| encodings.rsplit(',').next())
            .map(|last| last.trim().eq_ignore_ascii_case("chunked"))
            .unwrap_or(false)
    }

    fn connection(&self) -> Option<String> {
        self.headers().merged("Connection")
    }

    fn is_keep_alive(&self) -> bool {
        if self.version().minor == 0 {
            return self.connection_has("keep-alive");
        }

        !self.connection_has("close")
    }

    fn is_upgrade(&self) -> bool {
        self.connection_has("upgrade")
    }

    /// The protocol named by the `Upgrade` header, if any.
    fn upgrade_protocol(&self) -> Option<&str> {
        self.headers().get("Upgrade")
    }

    /// True when the `Connection` header lists `token` (case-insensitively).
    fn connection_has(&self, token: &str) -> bool {
        self.connection()
            .as_deref()
            .map(|value| value.split(',').any(|item| item.trim().eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Method, Request};

    fn request_with(name: &str, value: &str) -> Request {
        let mut request = Request::new(Method::Get, "/".parse().unwrap(), Body::empty());
        request.headers.set(name, value);
        request
    }

    #[test]
    fn chunk_encoding_requires_chunked_last() {
        assert!(request_with("Transfer-Encoding", "chunked").is_chunk_encoded());
        assert!(request_with("Transfer-Encoding", "gzip, chunked").is_chunk_encoded());
        assert!(!request_with("Transfer-Encoding", "chunked, gzip").is_chunk_encoded());
        assert!(!request_with("Transfer-Encoding", "gzip").is_chunk_encoded());
    }

    #[test]
    fn keep_alive_defaults_by_version() {
        let mut request = Request::new(Method::Get, "/".parse().unwrap(), Body::empty());
        assert!(request.is_keep_alive());

        request.headers.set("Connection", "close");
        assert!(!request.is_keep_alive());

        request.version = Version::HTTP_10;
        request.headers.set("Connection", "keep-alive");
        assert!(request.is_keep_alive());

        request.headers.remove("Connection");
        assert!(!request.is_keep_alive());
    }

    #[test]
    fn upgrade_detection() {
        let mut request = request_with("Connection", "keep-alive, Upgrade");
        request.headers.set("Upgrade", "websocket");

        assert!(request.is_upgrade());
        assert_eq!(request.upgrade_protocol(), Some("websocket"));
    }

    #[test]
    fn content_framing_accessors() {
        let request = request_with("Content-Length", "42");
        assert_eq!(request.content_length(), Some(42));

        let request = request_with("Content-Type", "application/json");
        assert_eq!(request.content_type(), Some(mime::APPLICATION_JSON));
    }
}
