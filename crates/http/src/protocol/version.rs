use std::fmt::{self, Display, Formatter};

use crate::protocol::ParseError;

/// An HTTP protocol version as a `(major, minor)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parses the `HTTP/major.minor` production of a start line.
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let digits = token.strip_prefix("HTTP/").ok_or_else(|| ParseError::malformed_start_line(token))?;

        let (major, minor) = digits.split_once('.').ok_or_else(|| ParseError::malformed_start_line(token))?;

        let major = major.parse().map_err(|_| ParseError::malformed_start_line(token))?;
        let minor = minor.parse().map_err(|_| ParseError::malformed_start_line(token))?;

        Ok(Self { major, minor })
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::HTTP_11
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}
