//! # bulwark
//!
//! A panic-recovering middleware for HTTP handlers, together with the small
//! hyper-based host it runs in.
//!
//! ## The contract
//!
//! A panic in one request handler must never take the server down and must
//! always leave a trace. [`middleware::Recover`] wraps any [`Handler`]; when
//! the wrapped handler panics, the panic is caught, logged once at `WARN`
//! with the request's URL, method and client address, and swallowed.
//!
//! Nothing is written to the client on that path. A response that had not
//! started is never sent and the connection is closed; a response that had
//! started is cut short. Ordinary error responses (a handler writing a 500)
//! are not faults and pass through untouched.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bulwark::middleware::Recover;
//! use bulwark::{Request, Response, ResponseWriter, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), bulwark::Error> {
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .post("/users", create_user);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(Recover::new(app)).await
//! }
//!
//! async fn get_user(req: Request, mut w: ResponseWriter) {
//!     let id = req.param("id").unwrap_or("unknown").to_owned();
//!     w.send(Response::json(format!(r#"{{"id":"{id}"}}"#))).await.ok();
//! }
//!
//! async fn create_user(req: Request, mut w: ResponseWriter) {
//!     if req.body().is_empty() {
//!         w.write_header(StatusCode::BAD_REQUEST);
//!         return;
//!     }
//!     let resp = Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(r#"{"id":"99"}"#);
//!     w.send(resp).await.ok();
//! }
//! ```
//!
//! ## Logging
//!
//! Everything is reported through [`tracing`]. Install a subscriber (for
//! example `tracing_subscriber::fmt::init()`) to see it.

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod writer;

#[cfg(test)]
mod testing;

pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, Handler};
pub use http::{Method, StatusCode, Uri};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use writer::ResponseWriter;
