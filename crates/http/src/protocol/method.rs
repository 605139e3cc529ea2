use std::fmt::{self, Display, Formatter};

use crate::protocol::ParseError;

/// An HTTP request method.
///
/// The common token set is enumerated; anything else that is a valid token
/// is carried through as [`Method::Custom`] so extension methods survive a
/// parse/serialize round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    Custom(String),
}

impl Method {
    /// Parses a method token from a request start line.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let method = match token {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "CONNECT" => Method::Connect,
            "OPTIONS" => Method::Options,
            "TRACE" => Method::Trace,
            "PATCH" => Method::Patch,
            custom => {
                if custom.is_empty() || !custom.bytes().all(is_token_byte) {
                    return Err(ParseError::malformed_start_line(token));
                }
                Method::Custom(custom.to_string())
            }
        };

        Ok(method)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Patch => "PATCH",
            Method::Custom(token) => token,
        }
    }
}

// RFC7230 token characters
fn is_token_byte(byte: u8) -> bool {
    matches!(byte,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_tokens() {
        assert_eq!(Method::parse("GET").unwrap(), Method::Get);
        assert_eq!(Method::parse("PATCH").unwrap(), Method::Patch);
    }

    #[test]
    fn carries_custom_tokens() {
        assert_eq!(Method::parse("PURGE").unwrap(), Method::Custom("PURGE".to_string()));
        assert_eq!(Method::parse("PURGE").unwrap().as_str(), "PURGE");
    }

    #[test]
    fn rejects_non_token_bytes() {
        assert!(Method::parse("").is_err());
        assert!(Method::parse("GE T").is_err());
        assert!(Method::parse("GET/").is_err());
    }
}
