use rivet_http::protocol::{HttpError, Request, Response};

use crate::responder::Responder;

/// A processing step wrapped around a responder.
///
/// A middleware receives the request and the `next` responder; it may edit
/// the request before delegating, edit the response afterwards, or
/// short-circuit without delegating at all.
pub trait Middleware: Send + Sync {
    fn respond(&self, request: Request, next: &dyn Responder) -> Result<Response, HttpError>;
}

impl<F> Middleware for F
where
    F: Fn(Request, &dyn Responder) -> Result<Response, HttpError> + Send + Sync,
{
    fn respond(&self, request: Request, next: &dyn Responder) -> Result<Response, HttpError> {
        (self)(request, next)
    }
}

/// Binds a middleware in front of a responder, yielding a responder.
pub fn intercept<M, R>(middleware: M, inner: R) -> Intercepted<M, R>
where
    M: Middleware,
    R: Responder,
{
    Intercepted { middleware, inner }
}

/// Fuses two middleware into one; `outer` sees the request first and the
/// response last.
pub fn chain<A, B>(outer: A, inner: B) -> Chained<A, B>
where
    A: Middleware,
    B: Middleware,
{
    Chained { outer, inner }
}

/// The responder produced by [`intercept`].
pub struct Intercepted<M, R> {
    middleware: M,
    inner: R,
}

impl<M, R> Responder for Intercepted<M, R>
where
    M: Middleware,
    R: Responder,
{
    fn respond(&self, request: Request) -> Result<Response, HttpError> {
        self.middleware.respond(request, &self.inner)
    }
}

/// The middleware produced by [`chain`].
pub struct Chained<A, B> {
    outer: A,
    inner: B,
}

impl<A, B> Middleware for Chained<A, B>
where
    A: Middleware,
    B: Middleware,
{
    fn respond(&self, request: Request, next: &dyn Responder) -> Result<Response, HttpError> {
        let tail = Tail { middleware: &self.inner, next };
        self.outer.respond(request, &tail)
    }
}

/// The rest of a chain, viewed as a responder by the step before it.
struct Tail<'a> {
    middleware: &'a dyn Middleware,
    next: &'a dyn Responder,
}

impl Responder for Tail<'_> {
    fn respond(&self, request: Request) -> Result<Response, HttpError> {
        self.middleware.respond(request, self.next)
    }
}
