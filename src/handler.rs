//! # Service Handlers
//!
//! The seam at which business logic plugs into the engine. A handler
//! receives the invocation's [`Context`] as its only argument and settles
//! it via `result`, `error`, or `transfer`. Returning `Err` from the
//! handler future is equivalent to `ctx.error(..)` on an unsettled
//! context; a panic is caught at the manager boundary and becomes a
//! normal failed outcome.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::CallError;

/// Outcome of a handler future. `Ok(())` means the handler either settled
/// the context or handed it off (e.g. to a spawned task or a transfer).
pub type HandlerResult = Result<(), CallError>;

/// The unit of business logic registered under a service name.
#[async_trait]
pub trait ServiceHandler: Send + Sync + 'static {
    async fn call(&self, ctx: Context) -> HandlerResult;
}

/// Adapter so plain async closures can be registered without a manual
/// trait impl. See [`Manager::register_fn`](crate::Manager::register_fn).
pub struct FnHandler<F>(F);

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F, Fut> ServiceHandler for FnHandler<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, ctx: Context) -> HandlerResult {
        (self.0)(ctx).await
    }
}

/// A registered service: its name and the handler invoked for it.
#[derive(Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub handler: Arc<dyn ServiceHandler>,
}
