mod access_log;

pub use access_log::AccessLog;

use futures::future::BoxFuture;

use crate::handler::{Handler, HandlerResult};
use crate::http::Request;

/// The rest of the chain from a middleware's point of view: the next
/// middleware, or the route handler itself at the end.
#[derive(Clone)]
pub struct Next {
    handler: Box<dyn Handler>,
}

impl Next {
    pub(crate) fn from_handler(handler: Box<dyn Handler>) -> Self {
        Self { handler }
    }

    pub async fn handle(&self, req: Request) -> HandlerResult {
        self.handler.handle(req).await
    }
}

pub type MiddlewareFuture = BoxFuture<'static, HandlerResult>;

pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> MiddlewareFuture;
    fn clone_box(&self) -> Box<dyn Middleware>;
}

impl Clone for Box<dyn Middleware> {
    fn clone(&self) -> Box<dyn Middleware> {
        self.clone_box()
    }
}

/// An ordered middleware stack, folded around a handler at call time so
/// the first middleware added is the outermost.
#[derive(Clone)]
pub(crate) struct MiddlewareManager {
    middlewares: Vec<Box<dyn Middleware>>,
}

impl MiddlewareManager {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
    }

    pub async fn call(&self, req: Request, next: Next) -> HandlerResult {
        let mut next = next;
        let mut index = self.middlewares.len();
        while index > 0 {
            index -= 1;
            let middleware = self.middlewares[index].clone();
            next = Next::from_handler(Box::new(move |req| middleware.call(req, next.clone())));
        }
        next.handle(req).await
    }
}
