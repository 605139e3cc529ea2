//! Responder, route, router and middleware composition over
//! [`rivet_http`]'s message model.
//!
//! Everything here is ordinary synchronous composition: a [`Responder`]
//! turns a request into a response, a [`Route`] dispatches by method, a
//! [`Router`] dispatches by exact path, and a [`Middleware`] wraps any
//! responder. How requests arrive and responses leave is the caller's
//! business — pair this crate with `rivet_http`'s parsers and serializers.
//!
//! ```
//! use rivet_http::protocol::body::Body;
//! use rivet_http::protocol::{HttpError, Request, Response};
//! use rivet_web::{Responder, Route, Router};
//!
//! let router = Router::new().route(Route::new("/hello").get(
//!     |_request: Request| -> Result<Response, HttpError> { Ok(Response::ok(Body::buffer("hi"))) },
//! ));
//!
//! let response = router.respond(Request::get("/hello".parse().unwrap())).unwrap();
//! assert_eq!(response.status.code, 200);
//! ```

mod responder;
pub use responder::Responder;

mod route;
pub use route::Route;

mod router;
pub use router::Router;

mod middleware;
pub use middleware::chain;
pub use middleware::intercept;
pub use middleware::Chained;
pub use middleware::Intercepted;
pub use middleware::Middleware;
