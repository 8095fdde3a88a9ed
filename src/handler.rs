//! The request-handling capability.
//!
//! # One shape for everything
//!
//! A handler takes one [`Request`] and one [`ResponseWriter`] and produces
//! side effects on the writer. Route functions, the [`Router`](crate::Router)
//! and every middleware share that shape, which is what lets middleware wrap
//! anything, including other middleware:
//!
//! ```text
//! async fn hello(req: Request, w: ResponseWriter) { … }   ← user writes this
//!        ↓ Handler blanket impl
//! hello.handle(req, w)                                   ← BoxFuture
//!        ↓ Recover::new(router)
//! recover.handle(req, w)  →  router.handle(req, w)  →  hello.handle(req, w)
//! ```
//!
//! Routers store handlers of different concrete types side by side, so they
//! are kept as [`BoxedHandler`] (`Arc<dyn Handler>`). The per-request cost is
//! one Arc clone and one virtual call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::writer::ResponseWriter;

/// A heap-allocated, type-erased handler future.
///
/// `Send + 'static` lets the server run it on its own tokio task.
pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A type-erased handler shared across concurrent requests.
pub type BoxedHandler = Arc<dyn Handler>;

/// Anything that can process one request and write one response.
///
/// Implemented automatically for every `async fn` (or closure returning a
/// future) with the signature:
///
/// ```text
/// async fn name(req: Request, w: ResponseWriter)
/// ```
///
/// Implement it by hand for handlers that carry state, such as middleware.
///
/// ```rust
/// use bulwark::{BoxFuture, Handler, Request, ResponseWriter};
///
/// struct Tagged<H> {
///     next: H,
/// }
///
/// impl<H: Handler> Handler for Tagged<H> {
///     fn handle(&self, req: Request, mut w: ResponseWriter) -> BoxFuture {
///         w.header("x-tagged", "1");
///         self.next.handle(req, w)
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Request, w: ResponseWriter) -> BoxFuture;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request, ResponseWriter) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn handle(&self, req: Request, w: ResponseWriter) -> BoxFuture {
        Box::pin((self)(req, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::tests::{collect, finish, request};
    use http::StatusCode;

    async fn hello(_req: Request, mut w: ResponseWriter) {
        w.send("hello").await.ok();
    }

    #[tokio::test]
    async fn async_fn_is_a_handler() {
        let (w, head) = ResponseWriter::channel();
        hello.handle(request("GET", "/"), w).await;

        let (status, body) = collect(finish(head).await.unwrap()).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn boxed_handlers_dispatch_dynamically() {
        let boxed: BoxedHandler = Arc::new(|_req: Request, mut w: ResponseWriter| async move {
            w.write_header(StatusCode::ACCEPTED);
        });

        let (w, head) = ResponseWriter::channel();
        boxed.handle(request("POST", "/jobs"), w).await;

        let (status, body) = collect(finish(head).await.unwrap()).await.unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body.is_empty());
    }
}
