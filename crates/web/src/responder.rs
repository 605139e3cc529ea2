use rivet_http::protocol::{HttpError, Request, Response};

/// Anything that can turn a request into a response.
///
/// This is the composition seam of the crate: routes, routers and
/// middleware-wrapped stacks all implement it, and plain closures do too
/// through the blanket impl.
pub trait Responder: Send + Sync {
    fn respond(&self, request: Request) -> Result<Response, HttpError>;
}

impl<F> Responder for F
where
    F: Fn(Request) -> Result<Response, HttpError> + Send + Sync,
{
    fn respond(&self, request: Request) -> Result<Response, HttpError> {
        (self)(request)
    }
}

impl Responder for Box<dyn Responder> {
    fn respond(&self, request: Request) -> Result<Response, HttpError> {
        self.as_ref().respond(request)
    }
}
