//! Core protocol types: header map, message model, bodies and errors.
//!
//! Everything the codec layer produces or consumes is defined here:
//!
//! - [`Headers`] / [`HeaderName`]: case-insensitive, order-preserving,
//!   multi-valued header map
//! - [`Request`] / [`Response`] with the shared [`Message`] trait
//! - [`Cookie`] / [`AttributedCookie`] and the two cookie grammars
//! - [`Body`](body::Body): the five-shape streaming body
//! - [`Extensions`]: typed per-message side channel
//! - the error types ([`HttpError`], [`ParseError`], [`BodyError`],
//!   [`SendError`])

mod headers;
pub use headers::HeaderName;
pub use headers::Headers;

mod version;
pub use version::Version;

mod method;
pub use method::Method;

mod status;
pub use status::Status;

mod cookie;
pub use cookie::parse_cookie_header;
pub use cookie::parse_set_cookie;
pub use cookie::AttributedCookie;
pub use cookie::Cookie;

mod extensions;
pub use extensions::Extensions;

mod message;
pub use message::Message;

mod request;
pub use request::Request;
pub use request::UpgradeFn;

mod response;
pub use response::Response;

mod error;
pub use error::BodyError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

pub mod body;
