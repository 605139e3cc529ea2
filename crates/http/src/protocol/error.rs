use std::io;
use thiserror::Error;

/// Umbrella error for everything this crate can fail with.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("parse error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("body error: {source}")]
    Body {
        #[from]
        source: BodyError,
    },

    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },
}

/// Errors surfaced by the incremental parsers.
///
/// Every variant resets the parser that produced it: accumulated message
/// state is discarded and the next feed starts a fresh message.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("malformed start line: {reason}")]
    MalformedStartLine { reason: String },

    #[error("malformed header: {reason}")]
    MalformedHeader { reason: String },

    #[error("malformed uri: {reason}")]
    MalformedUri { reason: String },

    #[error("malformed cookie: {reason}")]
    MalformedCookie { reason: String },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn malformed_start_line<S: ToString>(reason: S) -> Self {
        Self::MalformedStartLine { reason: reason.to_string() }
    }

    pub fn malformed_header<S: ToString>(reason: S) -> Self {
        Self::MalformedHeader { reason: reason.to_string() }
    }

    pub fn malformed_uri<S: ToString>(reason: S) -> Self {
        Self::MalformedUri { reason: reason.to_string() }
    }

    pub fn malformed_cookie<S: ToString>(reason: S) -> Self {
        Self::MalformedCookie { reason: reason.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn io(source: io::Error) -> Self {
        Self::Io { source }
    }
}

/// Errors from body shape conversion and draining.
#[derive(Error, Debug)]
pub enum BodyError {
    /// The requested conversion has no source to run against: the body was
    /// already consumed, or the shape lives in the other (sync/async) domain.
    #[error("inconvertible body shape")]
    InconvertibleShape,

    /// A drain deadline elapsed before the source finished.
    #[error("drain timed out before the body completed")]
    DrainTimeout,

    #[error("body source failed: {reason}")]
    Source { reason: String },
}

impl BodyError {
    pub fn source<S: ToString>(reason: S) -> Self {
        Self::Source { reason: reason.to_string() }
    }
}

/// Errors from serialization.
///
/// A failed sink aborts the transmission immediately; bytes already written
/// stay on the wire, so the caller must treat the connection as poisoned.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("send aborted by sink failure: {source}")]
    SendAborted {
        #[from]
        source: io::Error,
    },

    #[error("body error while serializing: {source}")]
    Body {
        #[from]
        source: BodyError,
    },
}

impl SendError {
    pub fn aborted<E: Into<io::Error>>(e: E) -> Self {
        Self::SendAborted { source: e.into() }
    }
}
