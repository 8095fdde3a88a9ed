//! Panic recovery for API handlers.
//!
//! [`Recover`] wraps a handler so that a panic raised while it serves a
//! request is caught, logged with the request's URL, method and client
//! address, and absorbed. The server keeps running and the connection task
//! that carried the request is not torn down by the unwind.
//!
//! Nothing is written to the client on the panic path. Whatever the inner
//! handler had sent stays as it was: an uncommitted response is never sent
//! (the connection closes with no response), and a body that had started is
//! cut short. See [`ResponseWriter`](crate::ResponseWriter) for the mechanics.
//!
//! Only unwinding panics can be caught. A binary built with `panic = "abort"`
//! still terminates on the first panic.
//!
//! Catching a panic does not silence the process panic hook, which runs
//! before unwinding starts. With the default hook every recovered panic also
//! prints a plain `thread '…' panicked at …` line to stderr next to the
//! structured `WARN` event. Install a hook with [`std::panic::set_hook`] to
//! route or drop that line.

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use tracing::warn;

use crate::handler::{BoxFuture, Handler};
use crate::request::Request;
use crate::writer::ResponseWriter;

/// Recovers from panics in the wrapped handler and logs them.
///
/// Place it outermost so it covers everything nested inside:
///
/// ```rust,no_run
/// use bulwark::middleware::Recover;
/// use bulwark::{Request, ResponseWriter, Router, Server};
///
/// # async fn run() -> Result<(), bulwark::Error> {
/// let app = Router::new().get("/v1/endpoints", endpoints);
/// Server::bind("0.0.0.0:3000")?.serve(Recover::new(app)).await
/// # }
/// async fn endpoints(_req: Request, mut w: ResponseWriter) {
///     w.send("[]").await.ok();
/// }
/// ```
///
/// Each intercepted panic produces one `WARN` event with the fields
/// `panic_message`, `url`, `method` and `client`. Requests that complete
/// normally produce no events, including ones whose handler wrote an error
/// status.
pub struct Recover<H> {
    next: H,
}

impl<H: Handler> Recover<H> {
    pub fn new(next: H) -> Self {
        Self { next }
    }
}

impl<H: Handler> Handler for Recover<H> {
    fn handle(&self, req: Request, w: ResponseWriter) -> BoxFuture {
        let url = req.url();
        let method = req.method().clone();
        let client = req.remote_addr();
        // Marks the run as faulted on the panic path. It writes nothing; it
        // only stops the server from answering `200 OK` for a handler that
        // let go of its writer before panicking.
        let abort = w.abort_token();

        // Both the synchronous call and every poll of the returned future
        // belong to this request's recovery scope.
        let next = panic::catch_unwind(AssertUnwindSafe(|| self.next.handle(req, w)));

        Box::pin(async move {
            let outcome = match next {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            };

            if let Err(payload) = outcome {
                abort.abort();
                warn!(
                    panic_message = %panic_message(payload.as_ref()),
                    url = %url,
                    method = %method,
                    client = %client,
                    "API handler panicked"
                );
            }
        })
    }
}

/// Renders a panic payload. `panic!` produces `&'static str` or `String`;
/// `panic_any` can carry anything, so common displayable types are tried
/// before falling back to the type-erased name.
fn panic_message(payload: &(dyn Any + Send)) -> Cow<'_, str> {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return Cow::Borrowed(*s);
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return Cow::Borrowed(s.as_str());
    }
    if let Some(e) = payload.downcast_ref::<Box<dyn StdError + Send + Sync>>() {
        return Cow::Owned(e.to_string());
    }

    macro_rules! display {
        ($($ty:ty),+ $(,)?) => {
            $(
                if let Some(v) = payload.downcast_ref::<$ty>() {
                    return Cow::Owned(v.to_string());
                }
            )+
        };
    }
    display!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);

    Cow::Borrowed("Box<dyn Any>")
}
