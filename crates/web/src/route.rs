use rivet_http::protocol::body::Body;
use rivet_http::protocol::{HttpError, Method, Request, Response, Status};
use tracing::debug;

use crate::responder::Responder;

/// A single path with one responder per method.
///
/// A request for the route's path with an unregistered method falls through
/// to the method-not-allowed responder, which defaults to a bare 405.
pub struct Route {
    path: String,
    actions: Vec<(Method, Box<dyn Responder>)>,
    method_not_allowed: Box<dyn Responder>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            actions: Vec::new(),
            method_not_allowed: Box::new(|_request: Request| -> Result<Response, HttpError> {
                Ok(Response::new(Status::method_not_allowed(), Body::empty()))
            }),
        }
    }

    /// Registers `responder` for `method`, replacing any previous one.
    pub fn on(mut self, method: Method, responder: impl Responder + 'static) -> Self {
        self.actions.retain(|(registered, _)| *registered != method);
        self.actions.push((method, Box::new(responder)));
        self
    }

    pub fn get(self, responder: impl Responder + 'static) -> Self {
        self.on(Method::Get, responder)
    }

    pub fn post(self, responder: impl Responder + 'static) -> Self {
        self.on(Method::Post, responder)
    }

    pub fn put(self, responder: impl Responder + 'static) -> Self {
        self.on(Method::Put, responder)
    }

    pub fn delete(self, responder: impl Responder + 'static) -> Self {
        self.on(Method::Delete, responder)
    }

    /// Replaces the 405 fallback.
    pub fn method_not_allowed(mut self, responder: impl Responder + 'static) -> Self {
        self.method_not_allowed = Box::new(responder);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Responder for Route {
    fn respond(&self, request: Request) -> Result<Response, HttpError> {
        match self.actions.iter().find(|(method, _)| *method == request.method) {
            Some((_, responder)) => responder.respond(request),
            None => {
                debug!(path = %self.path, method = %request.method, "no responder for method");
                self.method_not_allowed.respond(request)
            }
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let methods: Vec<&Method> = self.actions.iter().map(|(method, _)| method).collect();
        f.debug_struct("Route").field("path", &self.path).field("methods", &methods).finish()
    }
}
