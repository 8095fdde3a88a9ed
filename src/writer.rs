//! The response-writing capability handed to every handler.
//!
//! # How a response reaches hyper
//!
//! The server runs each handler on its own task and waits for the response
//! *head*. The writer sends the head over a oneshot channel the moment it is
//! committed (first body write or [`write_header`](ResponseWriter::write_header)),
//! and streams body chunks over a bounded mpsc channel afterwards:
//!
//! ```text
//! handler task                         connection task (hyper)
//! ───────────────────────────────     ───────────────────────────────
//! w.write_header(200)  ── head ──▶     service future resolves
//! w.write("chunk")     ── data ──▶     ResponseBody::poll_frame
//! drop(w)              ── close ─▶     end of body
//! ```
//!
//! Dropping a writer never commits anything. A handler may let go of its
//! writer long before it finishes (a closure that ignores the writer drops
//! it before its future is even polled), so the `200 OK` for a handler that
//! wrote nothing is decided by [`Pending::resolve`] once the handler run is
//! over, not by the writer.
//!
//! # Panics
//!
//! A run counts as faulted if the writer was dropped while its thread
//! unwound, or if a recovering middleware flagged it through an
//! [`AbortToken`]. A faulted run with no head gets no response at all, so
//! the server closes the connection. A body that had already started ends
//! with an error frame, so the client sees a truncated response rather than
//! a complete one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::thread;

use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, HeaderValue, StatusCode};
use hyper::body::{Body, Frame};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::Error;
use crate::response::{IntoResponse, append_header};

/// Body chunks buffered between the handler and the connection before
/// [`ResponseWriter::write`] starts waiting.
const BODY_CHANNEL_CAPACITY: usize = 16;

/// The server's half of a [`ResponseWriter`]: waits for the head and decides
/// what to send when none was committed.
pub(crate) struct Pending {
    head: oneshot::Receiver<http::Response<ResponseBody>>,
    aborted: Arc<AtomicBool>,
}

impl Pending {
    /// Resolves with the committed head. If the writer went away without
    /// committing, waits for `finished` (whether the handler run returned
    /// rather than unwound) and answers `200 OK` with an empty body only
    /// for a run that finished without a fault.
    pub(crate) async fn resolve(
        self,
        finished: impl Future<Output = bool>,
    ) -> Result<http::Response<ResponseBody>, Error> {
        if let Ok(resp) = self.head.await {
            return Ok(resp);
        }
        if finished.await && !self.aborted.load(Ordering::Acquire) {
            Ok(http::Response::new(ResponseBody::empty()))
        } else {
            Err(Error::Abandoned)
        }
    }
}

/// Flags a handler run as faulted without writing anything.
#[derive(Clone)]
pub(crate) struct AbortToken(Arc<AtomicBool>);

impl AbortToken {
    pub(crate) fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Writes one HTTP response, head first, then the body in chunks.
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    pending: Option<(oneshot::Sender<http::Response<ResponseBody>>, ResponseBody)>,
    chunks: mpsc::Sender<Bytes>,
    aborted: Arc<AtomicBool>,
}

impl ResponseWriter {
    pub(crate) fn channel() -> (Self, Pending) {
        let (head_tx, head_rx) = oneshot::channel();
        let (chunk_tx, chunk_rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
        let aborted = Arc::new(AtomicBool::new(false));

        let body = ResponseBody { chunks: chunk_rx, aborted: Arc::clone(&aborted) };
        let writer = Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            pending: Some((head_tx, body)),
            chunks: chunk_tx,
            aborted: Arc::clone(&aborted),
        };
        (writer, Pending { head: head_rx, aborted })
    }

    /// A token that marks this response's run as faulted.
    pub(crate) fn abort_token(&self) -> AbortToken {
        AbortToken(Arc::clone(&self.aborted))
    }

    /// Sets the status for the head. Ignored once the head is committed.
    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        if self.is_committed() {
            debug!(status = %code, "status set after response head was sent");
        } else {
            self.status = code;
        }
        self
    }

    /// Appends a header to the head. Ignored once the head is committed.
    pub fn header(&mut self, name: &str, value: &str) -> &mut Self {
        if self.is_committed() {
            debug!(header = name, "header set after response head was sent");
        } else {
            append_header(&mut self.headers, name, value);
        }
        self
    }

    /// `true` once the head has been handed to the server.
    pub fn is_committed(&self) -> bool {
        self.pending.is_none()
    }

    /// Commits the head with `code`. The body, if any, follows via [`write`](Self::write).
    pub fn write_header(&mut self, code: StatusCode) {
        self.status(code);
        self.commit();
    }

    /// Streams one body chunk, committing a `200 OK` head first if needed.
    ///
    /// Returns [`Error::Closed`] if the client is gone.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<(), Error> {
        self.commit();
        let chunk = chunk.into();
        if chunk.is_empty() {
            return Ok(());
        }
        self.chunks.send(chunk).await.map_err(|_| Error::Closed)
    }

    /// Writes a whole response. Status and headers apply only if the head is
    /// not committed yet; the body is written either way.
    pub async fn send(&mut self, resp: impl IntoResponse) -> Result<(), Error> {
        let resp = resp.into_response();
        if self.is_committed() {
            debug!("response head already sent, writing body only");
        } else {
            self.status = resp.status;
            self.headers.extend(resp.headers);
            if !resp.body.is_empty() {
                self.headers.insert(CONTENT_LENGTH, HeaderValue::from(resp.body.len()));
            }
        }
        self.write(resp.body).await
    }

    fn commit(&mut self) {
        let Some((head, body)) = self.pending.take() else { return };

        let mut resp = http::Response::new(body);
        *resp.status_mut() = self.status;
        *resp.headers_mut() = std::mem::take(&mut self.headers);

        // A closed receiver means the connection is gone; the body receiver
        // is dropped with `resp` and later writes report `Error::Closed`.
        let _ = head.send(resp);
    }
}

impl Drop for ResponseWriter {
    fn drop(&mut self) {
        // Same signal std's `MutexGuard` uses to poison on unwind.
        if thread::panicking() {
            self.aborted.store(true, Ordering::Release);
        }
    }
}

// ── ResponseBody ──────────────────────────────────────────────────────────────

/// The hyper body fed by a [`ResponseWriter`].
pub(crate) struct ResponseBody {
    chunks: mpsc::Receiver<Bytes>,
    aborted: Arc<AtomicBool>,
}

impl ResponseBody {
    fn empty() -> Self {
        // The sender is dropped here, so the first poll reports end of body.
        let (_, chunks) = mpsc::channel(1);
        Self { chunks, aborted: Arc::new(AtomicBool::new(false)) }
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Error>>> {
        match self.chunks.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => Poll::Ready(Some(Ok(Frame::data(chunk)))),
            Poll::Ready(None) if self.aborted.load(Ordering::Acquire) => {
                Poll::Ready(Some(Err(Error::Aborted)))
            }
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
