//! Cookie parsing and rendering.
//!
//! Two grammars live here. The request side (`Cookie:` header) is a flat
//! `name=value; name2=value2` list parsed as one unit. The response side
//! (`Set-Cookie:` header) carries one cookie per header line, where the first
//! token is the cookie identity and every following token is an attribute:
//! `key=value`, or a bare flag such as `Secure` stored with an empty value.

use std::fmt::{self, Display, Formatter};

use crate::protocol::headers::HeaderName;
use crate::protocol::ParseError;

/// A request-side cookie: plain name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

impl Display for Cookie {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// A response-side cookie: identity plus an ordered attribute map.
///
/// Attribute keys (`Path`, `Domain`, `Expires`, `Max-Age`, …) are matched
/// case-insensitively; flag attributes (`Secure`, `HttpOnly`) are stored with
/// an empty value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributedCookie {
    pub name: String,
    pub value: String,
    attributes: Vec<(HeaderName, String)>,
}

impl AttributedCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), attributes: Vec::new() }
    }

    /// Appends an attribute, keeping wire order.
    pub fn set_attribute(&mut self, key: impl Into<HeaderName>, value: impl Into<String>) {
        self.attributes.push((key.into(), value.into()));
    }

    /// Looks up an attribute by key, ignoring case. Flags yield `Some("")`.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.iter().find(|(name, _)| *name == *key).map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&HeaderName, &str)> {
        self.attributes.iter().map(|(key, value)| (key, value.as_str()))
    }

    pub fn path(&self) -> Option<&str> {
        self.attribute("Path")
    }

    pub fn domain(&self) -> Option<&str> {
        self.attribute("Domain")
    }

    pub fn expires(&self) -> Option<&str> {
        self.attribute("Expires")
    }

    pub fn max_age(&self) -> Option<i64> {
        self.attribute("Max-Age").and_then(|value| value.parse().ok())
    }

    pub fn secure(&self) -> bool {
        self.attribute("Secure").is_some()
    }

    pub fn http_only(&self) -> bool {
        self.attribute("HttpOnly").is_some()
    }
}

impl Display for AttributedCookie {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        for (key, value) in &self.attributes {
            if value.is_empty() {
                write!(f, "; {key}")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}

/// Parses a request `Cookie` header value into its cookies, in order.
///
/// Tokens are split on `;`, trimmed, and split on the first `=` only. A token
/// containing zero or more than one `=` makes the whole header malformed.
pub fn parse_cookie_header(value: &str) -> Result<Vec<Cookie>, ParseError> {
    let mut cookies = Vec::new();

    for token in value.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        if token.bytes().filter(|byte| *byte == b'=').count() != 1 {
            return Err(ParseError::malformed_cookie(token));
        }

        // the filter above guarantees the split succeeds
        let (name, value) = token.split_once('=').ok_or_else(|| ParseError::malformed_cookie(token))?;

        cookies.push(Cookie::new(name.trim(), value.trim()));
    }

    Ok(cookies)
}

/// Parses one `Set-Cookie` header value into a single attributed cookie.
///
/// The first `;`-separated token must be `name=value`; each later token
/// becomes a `key=value` attribute, or a bare flag stored with an empty value.
pub fn parse_set_cookie(value: &str) -> Result<AttributedCookie, ParseError> {
    let mut tokens = value.split(';');

    let identity = tokens.next().unwrap_or("").trim();
    if identity.bytes().filter(|byte| *byte == b'=').count() != 1 {
        return Err(ParseError::malformed_cookie(identity));
    }

    let (name, cookie_value) = identity.split_once('=').ok_or_else(|| ParseError::malformed_cookie(identity))?;
    if name.trim().is_empty() {
        return Err(ParseError::malformed_cookie(identity));
    }

    let mut cookie = AttributedCookie::new(name.trim(), cookie_value.trim());

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.split_once('=') {
            Some((key, value)) => cookie.set_attribute(key.trim(), value.trim()),
            None => cookie.set_attribute(token, ""),
        }
    }

    Ok(cookie)
}
