//! The HTTP server: listener, accept loop, and per-connection protocol
//! handling.
//!
//! The server speaks enough HTTP/1.1 to serve this service: it reads one
//! request per connection (request line, headers, body sized by
//! `Content-Length`), dispatches it through the route table, and writes
//! the encoded response back before closing the connection.
//!
//! # Examples
//!
//! ```no_run
//! use botgauge_hello::http::Response;
//! use botgauge_hello::server::Server;
//!
//! let mut server = Server::new();
//! server.route("/hello", |_req| async { Ok(Response::text("Hello from Botgauge")) });
//! server.listen("0.0.0.0:8080").unwrap();
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;

use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerResult, IntoResponse};
use crate::http::{Body, Method, Request, Response};
use crate::middleware::Middleware;
use crate::router::Router;

pub struct Server {
    pub max_connections: usize,
    router: Router,
}

impl Server {
    pub fn new() -> Self {
        Self {
            max_connections: 256,
            router: Router::new(),
        }
    }

    pub fn max_connections(&mut self, max_connections: usize) -> &mut Self {
        self.max_connections = max_connections;
        self
    }

    /// Registers a handler for requests whose path equals `path` exactly;
    /// the request method is ignored. Routes must be registered before
    /// the server starts, which `listen(self)` enforces by taking
    /// ownership.
    pub fn route<F, R>(&mut self, path: &str, handler: F)
    where
        F: Fn(Request) -> R + Send + Sync + Clone + 'static,
        R: IntoResponse + 'static,
    {
        self.router.route(path, handler);
    }

    /// Adds a middleware. Only routes registered after this call run it.
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) {
        self.router.middleware(middleware);
    }

    /// Binds `addr`, prints the startup line, and serves until the
    /// process is killed.
    ///
    /// A bind failure (port taken, permission denied) is returned to the
    /// caller; there is no retry and no fallback port.
    pub fn listen(self, addr: &str) -> ServerResult<()> {
        let runtime = Runtime::new()?;
        runtime.block_on(async {
            let listener = TcpListener::bind(addr).await.map_err(ServerError::Bind)?;
            let port = listener.local_addr()?.port();

            println!("Server started. Listening on port {port}...");

            self.serve(listener).await
        })
    }

    /// The accept loop over an already-bound listener. Never returns
    /// under normal operation; callers who want an ephemeral port can
    /// bind the listener themselves and hand it in.
    pub async fn serve(self, listener: TcpListener) -> ServerResult<()> {
        let server = Arc::new(self);
        let connections = Arc::new(AtomicUsize::new(0));

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    if connections.load(Ordering::Relaxed) >= server.max_connections {
                        tracing::warn!(%peer, "connection limit reached, shedding connection");
                        continue;
                    }
                    connections.fetch_add(1, Ordering::Relaxed);

                    let server = Arc::clone(&server);
                    let connections = Arc::clone(&connections);
                    tokio::spawn(async move {
                        if let Err(err) = server.handle_connection(stream).await {
                            tracing::warn!(%peer, error = %err, "connection error");
                        }
                        connections.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                Err(err) => tracing::warn!(error = %err, "accept failed"),
            }
        }
    }

    async fn handle_connection<S>(&self, mut stream: S) -> ServerResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(&mut stream);

        let request = match self.read_request(&mut reader).await {
            Ok(Some(request)) => request,
            // Peer closed without sending anything.
            Ok(None) => return Ok(()),
            Err(err) => {
                stream.write_all(&Response::error(err).encode()).await?;
                return Ok(());
            }
        };

        let handled = AssertUnwindSafe(self.dispatch(request)).catch_unwind().await;
        let response = match handled {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => Response::error(err),
            Err(panic) => Response::error(ServerError::Panic(panic_message(panic))),
        };

        stream.write_all(&response.encode()).await?;
        Ok(())
    }

    /// Reads and parses one request. `Ok(None)` means the peer closed the
    /// connection before sending a request line.
    async fn read_request<S>(
        &self,
        reader: &mut BufReader<&mut S>,
    ) -> ServerResult<Option<Request>>
    where
        S: AsyncRead + Unpin,
    {
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;
        if request_line.is_empty() {
            return Ok(None);
        }

        let mut parts = request_line.trim().split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| ServerError::InvalidRequest("empty request line".to_string()))?;
        let method = Method::parse(method)?;
        let target = parts
            .next()
            .ok_or_else(|| ServerError::InvalidRequest("missing request target".to_string()))?;

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Self::parse_query(query)),
            None => (target, HashMap::new()),
        };
        let path = if path.is_empty() { "/" } else { path };

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).await?;
            if line.trim().is_empty() {
                break;
            }
            if let Some((name, value)) = line.trim().split_once(':') {
                headers.insert(name.trim().to_lowercase(), value.trim().to_string());
            }
        }

        let mut data = Vec::new();
        if let Some(length) = headers
            .get("content-length")
            .and_then(|value| value.parse::<usize>().ok())
        {
            data.reserve(length);
            let mut limited = (&mut *reader).take(length as u64);
            limited.read_to_end(&mut data).await?;
        }
        let content_type = headers.get("content-type").cloned().unwrap_or_default();

        Ok(Some(Request {
            method,
            path: path.to_string(),
            query,
            headers,
            body: Body::from_bytes(content_type, data),
        }))
    }

    async fn dispatch(&self, req: Request) -> HandlerResult {
        match self.router.lookup(&req.path) {
            Some(route) => route.handle(req).await,
            None => {
                tracing::debug!(method = %req.method, path = %req.path, "no route matched");
                Err(ServerError::NotFound)
            }
        }
    }

    fn parse_query(query: &str) -> HashMap<String, String> {
        query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let mut parts = pair.split('=');
                Some((
                    parts.next()?.to_string(),
                    parts.next().unwrap_or("").to_string(),
                ))
            })
            .collect()
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_server() -> Server {
        let mut server = Server::new();
        server.route("/hello", |_req| async {
            Ok(Response::text("Hello from Botgauge"))
        });
        server
    }

    async fn roundtrip(server: &Server, raw: &str) -> String {
        let (mut client, peer) = tokio::io::duplex(4096);
        client.write_all(raw.as_bytes()).await.unwrap();

        server.handle_connection(peer).await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn serves_the_greeting() {
        let server = hello_server();
        let out = roundtrip(&server, "GET /hello HTTP/1.1\r\nhost: localhost\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("Hello from Botgauge"));
    }

    #[tokio::test]
    async fn method_is_ignored_for_dispatch() {
        let server = hello_server();
        let out = roundtrip(
            &server,
            "DELETE /hello HTTP/1.1\r\nhost: localhost\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("Hello from Botgauge"));
    }

    #[tokio::test]
    async fn body_is_read_and_ignored() {
        let server = hello_server();
        let out = roundtrip(
            &server,
            "POST /hello HTTP/1.1\r\ncontent-type: text/plain\r\ncontent-length: 5\r\n\r\nhello",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.ends_with("Hello from Botgauge"));
    }

    #[tokio::test]
    async fn query_string_is_stripped_before_matching() {
        let server = hello_server();
        let out = roundtrip(
            &server,
            "GET /hello?name=world HTTP/1.1\r\nhost: localhost\r\n\r\n",
        )
        .await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let server = hello_server();
        let out = roundtrip(&server, "GET /missing HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn unknown_method_token_is_400() {
        let server = hello_server();
        let out = roundtrip(&server, "BREW /hello HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        let mut server = Server::new();
        server.route("/boom", |_req| async { panic!("kaboom") });
        let out = roundtrip(&server, "GET /boom HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(out.contains("kaboom"));
    }

    #[tokio::test]
    async fn eof_before_request_line_is_not_an_error() {
        let server = hello_server();
        let (mut client, peer) = tokio::io::duplex(64);
        client.shutdown().await.unwrap();

        server.handle_connection(peer).await.unwrap();

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn connection_cap_is_configurable() {
        let mut server = Server::new();
        server.max_connections(8);
        assert_eq!(server.max_connections, 8);
    }

    #[test]
    fn parse_query_splits_pairs() {
        let query = Server::parse_query("name=world&flag");
        assert_eq!(query.get("name").map(String::as_str), Some("world"));
        assert_eq!(query.get("flag").map(String::as_str), Some(""));
    }
}
