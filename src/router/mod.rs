use std::collections::HashMap;

use crate::handler::{Handler, HandlerResult, IntoResponse};
use crate::http::Request;
use crate::middleware::{Middleware, MiddlewareManager, Next};

/// A registered route: its handler plus the middleware chain that was in
/// place when it was registered.
#[derive(Clone)]
pub(crate) struct Route {
    middlewares: MiddlewareManager,
    handler: Box<dyn Handler>,
}

impl Route {
    pub async fn handle(&self, req: Request) -> HandlerResult {
        self.middlewares
            .call(req, Next::from_handler(self.handler.clone()))
            .await
    }
}

/// Exact-path route table. Routes match any method; paths match byte for
/// byte, so `/hello/` is not `/hello`. Written once before the server
/// starts, read-only afterwards.
pub struct Router {
    middlewares: MiddlewareManager,
    routes: HashMap<String, Route>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            middlewares: MiddlewareManager::new(),
            routes: HashMap::new(),
        }
    }

    /// Registers `handler` for requests whose path equals `path` exactly,
    /// regardless of method. Registering the same path again replaces the
    /// earlier handler.
    pub fn route<F, R>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(Request) -> R + Send + Sync + Clone + 'static,
        R: IntoResponse + 'static,
    {
        self.routes.insert(
            path.to_owned(),
            Route {
                middlewares: self.middlewares.clone(),
                handler: Box::new(handler),
            },
        );
        self
    }

    /// Adds a middleware. Only routes registered after this call run it.
    pub fn middleware(&mut self, middleware: impl Middleware + 'static) {
        self.middlewares.add(middleware);
    }

    pub(crate) fn lookup(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Response;

    fn greeting_router() -> Router {
        let mut router = Router::new();
        router.route("/hello", |_req| async { Ok(Response::text("hi")) });
        router
    }

    #[test]
    fn lookup_is_exact() {
        let router = greeting_router();
        assert!(router.lookup("/hello").is_some());
        assert!(router.lookup("/hello/").is_none());
        assert!(router.lookup("/").is_none());
        assert!(router.lookup("/hell").is_none());
    }

    #[test]
    fn reregistering_a_path_replaces_the_route() {
        let mut router = greeting_router();
        router.route("/hello", |_req| async { Ok(Response::text("replaced")) });
        assert!(router.lookup("/hello").is_some());
    }
}
