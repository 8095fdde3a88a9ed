//! Middleware layer.
//!
//! Middleware are handlers that own another handler and decide how to call
//! it. They implement [`Handler`](crate::Handler) themselves, so they stack in
//! any order and in any number:
//!
//! ```rust
//! use bulwark::middleware::Recover;
//! use bulwark::Router;
//!
//! let app = Recover::new(Router::new());
//! ```
//!
//! Built-in middleware:
//! - [`Recover`]: catches handler panics and logs them at `WARN`

mod recover;

pub use recover::Recover;
