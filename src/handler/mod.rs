use std::future::Future;

use futures::future::BoxFuture;

use crate::error::ServerResult;
use crate::http::{Request, Response};

pub type HandlerResult = ServerResult<Response>;

/// Anything a handler may return; blanket-implemented for any future
/// resolving to a [`HandlerResult`], so plain async closures qualify.
pub trait IntoResponse {
    fn into_response_future(self) -> BoxFuture<'static, HandlerResult>;
}

impl<F: Future<Output = HandlerResult> + Send + 'static> IntoResponse for F {
    fn into_response_future(self) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self)
    }
}

/// Object-safe form of a route handler, clonable behind a `Box` so the
/// route table can hand each connection its own copy.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Request) -> BoxFuture<'static, HandlerResult>;

    fn dyn_clone<'s>(&self) -> Box<dyn Handler + 's>
    where
        Self: 's;
}

impl Clone for Box<dyn Handler> {
    fn clone(&self) -> Box<dyn Handler> {
        self.dyn_clone()
    }
}

impl<F, R> Handler for F
where
    F: Fn(Request) -> R + Send + Sync + Clone + 'static,
    R: IntoResponse,
{
    fn handle(&self, req: Request) -> BoxFuture<'static, HandlerResult> {
        (self)(req).into_response_future()
    }

    fn dyn_clone<'s>(&self) -> Box<dyn Handler + 's>
    where
        Self: 's,
    {
        Box::new((*self).clone())
    }
}
