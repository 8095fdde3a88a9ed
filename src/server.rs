//! HTTP server and graceful shutdown.
//!
//! # One task per request
//!
//! hyper drives each connection on its own task. For every request the
//! server spawns one more task that runs the handler, then waits only for
//! the response head; the body keeps streaming from the handler task while
//! hyper writes it out. A handler that returns without writing gets an empty
//! `200 OK`. A handler that panicked before committing a response leaves the
//! service future with an error and hyper closes the connection without
//! answering.
//!
//! # Graceful shutdown
//!
//! On SIGTERM or Ctrl-C (or when the future given to
//! [`Server::serve_with_shutdown`] resolves) the server:
//! 1. Immediately stops `listener.accept()`.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from `serve`, which lets `main` exit cleanly.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::writer::{ResponseBody, ResponseWriter};

enum Listen {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The HTTP server.
pub struct Server {
    listen: Listen,
}

impl Server {
    /// Configures the server to bind to `addr` when it starts serving.
    ///
    /// ```rust,no_run
    /// use bulwark::Server;
    /// let server = Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), bulwark::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { listen: Listen::Addr(addr.parse()?) })
    }

    /// Serves on an already bound listener.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { listen: Listen::Listener(listener) }
    }

    /// The configured address, or the bound one for [`from_listener`](Self::from_listener).
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        match &self.listen {
            Listen::Addr(addr) => Ok(*addr),
            Listen::Listener(listener) => Ok(listener.local_addr()?),
        }
    }

    /// Serves `handler` until SIGTERM or Ctrl-C, then drains in-flight
    /// connections.
    pub async fn serve(self, handler: impl Handler) -> Result<(), Error> {
        self.serve_with_shutdown(handler, shutdown_signal()).await
    }

    /// Serves `handler` until `signal` resolves, then drains in-flight
    /// connections.
    pub async fn serve_with_shutdown(
        self,
        handler: impl Handler,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.listen {
            Listen::Addr(addr) => TcpListener::bind(addr).await?,
            Listen::Listener(listener) => listener,
        };
        let addr = listener.local_addr()?;
        // One handler for the whole server; each connection clones the Arc,
        // not the routing table behind it.
        let handler: BoxedHandler = Arc::new(handler);

        info!(%addr, "bulwark listening");

        // Owns every connection task, so shutdown can wait for exactly the
        // connections that are still open.
        let mut tasks = tokio::task::JoinSet::new();
        // `select!` polls the signal by `&mut` on every turn of the loop, and a
        // future polled through a reference has to stay put in memory from
        // its first poll on. `tokio::pin!` fixes it on this stack frame.
        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Without `biased` the arms are polled in random order. Check
                // shutdown first so a signal stops accepting at once, even
                // with connections queued behind it.
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let handler = Arc::clone(&handler);
                    // hyper has its own IO traits; TokioIo bridges tokio's
                    // AsyncRead/AsyncWrite onto them.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // `service_fn` makes a hyper `Service` out of a closure.
                        // It runs once per request, and a keep-alive connection
                        // carries many of those.
                        let svc = service_fn(move |req| {
                            dispatch(Arc::clone(&handler), req, remote_addr)
                        });

                        // The auto builder speaks HTTP/1.1 or HTTP/2, whichever
                        // the client opens with.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            // Abandoned and aborted responses end up here too,
                            // after `Recover` has already reported them.
                            debug!(peer = %remote_addr, "connection closed with error: {e}");
                        }
                    });
                }

                // Reap finished connections as we go, or the set keeps one
                // entry per connection ever accepted.
                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("connection task failed: {e}");
                    }
                }
            }
        }

        // Drain. Nothing new is accepted past this point.
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!("connection task failed: {e}");
            }
        }

        info!("bulwark stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through `handler` on its own task and resolves with the
/// response head as soon as the handler commits it, or with an empty
/// `200 OK` once a handler that wrote nothing returns without a fault.
async fn dispatch(
    handler: BoxedHandler,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<ResponseBody>, Error> {
    let req = Request::from_hyper(req, remote_addr).await?;
    debug!(method = %req.method(), url = %req.uri(), peer = %remote_addr, "dispatch");

    let (writer, pending) = ResponseWriter::channel();
    // The handler keeps running on its own task after the head goes out, so
    // the body can stream while hyper writes it. The JoinHandle only matters
    // when the handler never commits: a run that unwound gets no response.
    let run = tokio::spawn(async move { handler.handle(req, writer).await });

    pending.resolve(async move { run.await.is_ok() }).await
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C). On Windows only Ctrl-C
/// is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
