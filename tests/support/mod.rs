//! Shared helpers for the integration tests: a log-capturing subscriber, a
//! server started on an ephemeral port, and a raw HTTP/1.1 client.

#![allow(dead_code)]

use std::net::SocketAddr;

use bulwark::{Error, Handler, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[path = "../../src/testing.rs"]
mod capture;

pub(crate) use capture::capture_logs;

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<Result<(), Error>>,
}

impl TestServer {
    pub async fn start(handler: impl Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::from_listener(listener);
        let addr = server.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve_with_shutdown(handler, async {
            let _ = signal.await;
        }));
        Self { addr, shutdown, task }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        self.task.await.unwrap().unwrap();
    }

    /// Sends one `Connection: close` request and returns every byte the
    /// server wrote before closing.
    pub async fn get(&self, path: &str) -> String {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(raw.as_bytes()).await.unwrap();

        let mut buf = Vec::new();
        // A reset after a panic is as good as a clean close here.
        let _ = stream.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    }
}
