use std::fmt::{self, Debug, Formatter};

use crate::protocol::body::Body;
use crate::protocol::cookie::AttributedCookie;
use crate::protocol::extensions::Extensions;
use crate::protocol::headers::Headers;
use crate::protocol::message::Message;
use crate::protocol::request::UpgradeFn;
use crate::protocol::status::Status;
use crate::protocol::version::Version;

/// An HTTP response.
///
/// Each element of `cookies` serializes as its own `Set-Cookie` line; the
/// header map never holds cookie headers.
pub struct Response {
    pub status: Status,
    pub version: Version,
    pub headers: Headers,
    pub cookies: Vec<AttributedCookie>,
    pub body: Body,
    pub upgrade: Option<UpgradeFn>,
    pub extensions: Extensions,
}

impl Response {
    /// Builds a response, framing the body the same way
    /// [`Request::new`](crate::protocol::Request::new) does.
    pub fn new(status: Status, body: Body) -> Self {
        let mut response = Self {
            status,
            version: Version::HTTP_11,
            headers: Headers::new(),
            cookies: Vec::new(),
            body,
            upgrade: None,
            extensions: Extensions::new(),
        };

        match response.body.as_buffer() {
            Some(bytes) => {
                let length = bytes.len() as u64;
                response.set_content_length(length);
            }
            None => response.headers.set("Transfer-Encoding", "chunked"),
        }

        response
    }

    pub fn ok(body: Body) -> Self {
        Self::new(Status::ok(), body)
    }

    pub fn not_found() -> Self {
        Self::new(Status::not_found(), Body::empty())
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_cookie(mut self, cookie: AttributedCookie) -> Self {
        self.cookies.push(cookie);
        self
    }
}

impl Message for Response {
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

impl Debug for Response {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body", &self.body)
            .field("upgrade", &self.upgrade.is_some())
            .finish()
    }
}
