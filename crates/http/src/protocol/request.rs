use std::fmt::{self, Debug, Formatter};

use http::Uri;

use crate::protocol::body::{Body, Connection};
use crate::protocol::cookie::Cookie;
use crate::protocol::extensions::Extensions;
use crate::protocol::headers::Headers;
use crate::protocol::message::Message;
use crate::protocol::method::Method;
use crate::protocol::version::Version;
use crate::protocol::BodyError;

/// Continuation invoked after a successful protocol upgrade, owning the raw
/// connection from then on.
pub type UpgradeFn = Box<dyn FnOnce(&mut dyn Connection) -> Result<(), BodyError> + Send>;

/// An HTTP request.
///
/// Cookies parsed from the `Cookie` header live in `cookies`, not in the
/// header map; `extensions` carries typed pipeline-local values that never
/// touch the wire.
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: Headers,
    pub cookies: Vec<Cookie>,
    pub body: Body,
    pub upgrade: Option<UpgradeFn>,
    pub extensions: Extensions,
}

impl Request {
    /// Builds a request, framing the body: buffer bodies get a
    /// `Content-Length` header, streamed bodies get
    /// `Transfer-Encoding: chunked`.
    pub fn new(method: Method, uri: Uri, body: Body) -> Self {
        let mut request = Self {
            method,
            uri,
            version: Version::HTTP_11,
            headers: Headers::new(),
            cookies: Vec::new(),
            body,
            upgrade: None,
            extensions: Extensions::new(),
        };

        match request.body.as_buffer() {
            Some(bytes) => {
                let length = bytes.len() as u64;
                request.set_content_length(length);
            }
            None => request.headers.set("Transfer-Encoding", "chunked"),
        }

        request
    }

    pub fn get(uri: Uri) -> Self {
        Self::new(Method::Get, uri, Body::empty())
    }

    pub fn post(uri: Uri, body: Body) -> Self {
        Self::new(Method::Post, uri, body)
    }

    /// Adds a header line (appending, never overwriting) and returns `self`.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }
}

impl Message for Request {
    fn version(&self) -> Version {
        self.version
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    fn body(&self) -> &Body {
        &self.body
    }

    fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body", &self.body)
            .field("upgrade", &self.upgrade.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_body_sets_content_length() {
        let request = Request::post("/submit".parse().unwrap(), Body::buffer("hello"));

        assert_eq!(request.headers.get("content-length"), Some("5"));
        assert!(!request.headers.contains("Transfer-Encoding"));
    }

    #[test]
    fn streamed_body_sets_chunked() {
        let body = Body::sender(|writer| writer.send(bytes::Bytes::from_static(b"x")));
        let request = Request::post("/stream".parse().unwrap(), body);

        assert_eq!(request.headers.get("transfer-encoding"), Some("chunked"));
        assert!(!request.headers.contains("Content-Length"));
    }

    #[test]
    fn builder_helpers() {
        let request = Request::get("/".parse().unwrap())
            .with_header("Accept", "*/*")
            .with_cookie(Cookie::new("theme", "dark"));

        assert_eq!(request.method, Method::Get);
        assert_eq!(request.headers.get("accept"), Some("*/*"));
        assert_eq!(request.cookies.len(), 1);
    }
}
