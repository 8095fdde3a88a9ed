//! Minimal bulwark example: a few JSON endpoints, one of which panics.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -N http://localhost:3000/stream
//!   curl -v http://localhost:3000/v1/endpoints   ← panics, logged at WARN,
//!                                                  connection closed, server lives on

use bulwark::middleware::Recover;
use bulwark::{Request, Response, ResponseWriter, Router, Server, StatusCode};

#[tokio::main]
async fn main() -> Result<(), bulwark::Error> {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("/users/{id}",    get_user)
        .post("/users",        create_user)
        .delete("/users/{id}", delete_user)
        .get("/stream",        stream)
        .get("/v1/endpoints",  endpoints);

    Server::bind("0.0.0.0:3000")?
        .serve(Recover::new(app))
        .await
}

// GET /users/{id}
async fn get_user(req: Request, mut w: ResponseWriter) {
    let id = req.param("id").unwrap_or("unknown").to_owned();
    let _ = w.send(Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))).await;
}

// POST /users
async fn create_user(req: Request, mut w: ResponseWriter) {
    if req.body().is_empty() {
        w.write_header(StatusCode::BAD_REQUEST);
        return;
    }

    let resp = Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#);
    let _ = w.send(resp).await;
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request, mut w: ResponseWriter) {
    w.write_header(StatusCode::NO_CONTENT);
}

// GET /stream: chunked body written piece by piece
async fn stream(_req: Request, mut w: ResponseWriter) {
    w.header("content-type", "text/plain; charset=utf-8");
    for i in 0..5 {
        if w.write(format!("tick {i}\n")).await.is_err() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
}

// GET /v1/endpoints: a bug
async fn endpoints(_req: Request, _w: ResponseWriter) {
    let endpoints: Vec<&str> = Vec::new();
    let first = endpoints[0];
    println!("{first}");
}
