//! Wires a router behind the wire codec: parses a raw request, dispatches
//! it, serializes the response back to bytes.

use rivet_http::codec::{RequestParser, ResponseSerializer};
use rivet_http::protocol::body::Body;
use rivet_http::protocol::{HttpError, Request, Response};
use rivet_web::{intercept, Responder, Route, Router};
use tracing::{info, Level};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let router = Router::new()
        .route(Route::new("/hello").get(|_request: Request| -> Result<Response, HttpError> {
            Ok(Response::ok(Body::buffer("Hello World!\r\n")))
        }))
        .route(Route::new("/echo").post(|mut request: Request| -> Result<Response, HttpError> {
            let bytes = request.body.to_buffer(None)?;
            Ok(Response::ok(Body::buffer(bytes)))
        }));

    let logged = intercept(
        |request: Request, next: &dyn Responder| -> Result<Response, HttpError> {
            info!(method = %request.method, path = request.uri.path(), "dispatching");
            next.respond(request)
        },
        router,
    );

    let mut parser = RequestParser::new();
    let request = parser
        .parse(b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nrivet")?
        .expect("a complete request");

    let response = logged.respond(request)?;

    let mut wire = Vec::new();
    let mut sink = |bytes: &[u8]| {
        wire.extend_from_slice(bytes);
        Ok(())
    };
    ResponseSerializer::new().serialize(response, &mut sink)?;

    info!(response = %String::from_utf8_lossy(&wire), "serialized");
    Ok(())
}
