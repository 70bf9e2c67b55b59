//! # botgauge-hello
//!
//! A minimal HTTP service with a single static endpoint: any request to
//! `/hello` is answered with `200` and the body `Hello from Botgauge`.
//! Every other path gets the server's default `404`.
//!
//! The crate carries its own small HTTP/1.1 layer on top of `tokio`'s
//! `TcpListener`: an accept loop spawning one task per connection, an
//! exact-path route table, and async closures as handlers.
//!
//! ## Quick start
//!
//! ```no_run
//! use botgauge_hello::http::Response;
//! use botgauge_hello::server::Server;
//!
//! let mut server = Server::new();
//!
//! server.route("/hello", |_req| async { Ok(Response::text("Hello from Botgauge")) });
//!
//! server.listen("0.0.0.0:8080").unwrap();
//! ```

pub mod error;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod router;
pub mod server;
pub mod trace;

pub use error::{ServerError, ServerResult};
pub use http::{Request, Response};
pub use server::Server;
