use rivet_http::protocol::{HttpError, Request, Response};
use tracing::debug;

use crate::responder::Responder;
use crate::route::Route;

/// Dispatches requests to routes by exact path match.
///
/// The first route whose path equals the request path wins; anything else
/// falls through to the not-found responder (a bare 404 by default). The
/// router is itself a [`Responder`], so routers nest behind middleware like
/// any other responder.
pub struct Router {
    routes: Vec<Route>,
    not_found: Box<dyn Responder>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            not_found: Box::new(|_request: Request| -> Result<Response, HttpError> { Ok(Response::not_found()) }),
        }
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Replaces the 404 fallback.
    pub fn not_found(mut self, responder: impl Responder + 'static) -> Self {
        self.not_found = Box::new(responder);
        self
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Responder for Router {
    fn respond(&self, request: Request) -> Result<Response, HttpError> {
        match self.routes.iter().find(|route| route.path() == request.uri.path()) {
            Some(route) => route.respond(request),
            None => {
                debug!(path = request.uri.path(), "no route matched");
                self.not_found.respond(request)
            }
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router").field("routes", &self.routes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_http::protocol::body::Body;

    fn ok_with(text: &'static str) -> impl Responder {
        move |_request: Request| -> Result<Response, HttpError> { Ok(Response::ok(Body::buffer(text))) }
    }

    fn router() -> Router {
        Router::new()
            .route(Route::new("/").get(ok_with("home")))
            .route(Route::new("/about").get(ok_with("about")))
    }

    #[test]
    fn exact_paths_dispatch_to_their_route() {
        let response = router().respond(Request::get("/about".parse().unwrap())).unwrap();
        assert_eq!(&response.body.as_buffer().unwrap()[..], b"about");
    }

    #[test]
    fn unknown_path_is_404() {
        let response = router().respond(Request::get("/missing".parse().unwrap())).unwrap();
        assert_eq!(response.status.code, 404);
    }

    #[test]
    fn prefixes_do_not_match() {
        let response = router().respond(Request::get("/about/team".parse().unwrap())).unwrap();
        assert_eq!(response.status.code, 404);
    }

    #[test]
    fn not_found_fallback_is_replaceable() {
        let router = router()
            .not_found(|_request: Request| -> Result<Response, HttpError> { Ok(Response::ok(Body::buffer("custom"))) });

        let response = router.respond(Request::get("/missing".parse().unwrap())).unwrap();
        assert_eq!(&response.body.as_buffer().unwrap()[..], b"custom");
    }
}
