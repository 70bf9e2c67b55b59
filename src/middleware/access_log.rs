use std::time::Instant;

use crate::http::Request;
use crate::middleware::{Middleware, MiddlewareFuture, Next};

/// Emits one tracing event per handled request: method, path, resulting
/// status, and elapsed time.
#[derive(Clone, Default)]
pub struct AccessLog;

impl AccessLog {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for AccessLog {
    fn call(&self, req: Request, next: Next) -> MiddlewareFuture {
        Box::pin(async move {
            let method = req.method;
            let path = req.path.clone();
            let started = Instant::now();

            let result = next.handle(req).await;

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(response) => {
                    tracing::info!(%method, %path, status = response.status, elapsed_ms, "request handled");
                }
                Err(err) => {
                    tracing::warn!(%method, %path, status = err.status_code(), elapsed_ms, error = %err, "request failed");
                }
            }
            result
        })
    }

    fn clone_box(&self) -> Box<dyn Middleware> {
        Box::new(self.clone())
    }
}
