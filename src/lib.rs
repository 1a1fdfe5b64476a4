//! # micromesh
//!
//! An in-process "microservice simulator": a registry of named handlers
//! that call each other through a mediated context object, with built-in
//! structured logging of each call's lifecycle.
//!
//! ## Core pieces
//!
//! - [`Manager`] - validated configuration, the service registry, and the
//!   factory for top-level [`Context`]s. Every cross-service invocation is
//!   mediated by it.
//! - [`Context`] - one per invocation. The only API handlers use to log,
//!   call other services ([`Context::call`]), redirect
//!   ([`Context::transfer`]), and terminate ([`Context::result`] /
//!   [`Context::error`]). Settles exactly once; the outcome is delivered
//!   both to an optional error-first callback and to the returned
//!   [`CallFuture`].
//! - [`LogRecorder`] - the capability the engine depends on for making
//!   call-lifecycle records visible. Ships with [`StreamRecorder`]
//!   (template-rendered lines into any `Write` sink), [`ConsoleRecorder`]
//!   (routes through `tracing`), and the discarding [`NullRecorder`]
//!   default.
//!
//! ## Example
//!
//! ```
//! use micromesh::Manager;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = Manager::new();
//!
//!     manager
//!         .register_fn("user.get", |ctx| async move {
//!             ctx.debug("looking up phone=%s", &[&ctx.params()["phone"]]);
//!             ctx.result(json!({ "id": 1, "name": "Alice" }))?;
//!             Ok(())
//!         })
//!         .unwrap();
//!
//!     let user = manager
//!         .call("user.get", json!({ "phone": 123456 }))
//!         .await
//!         .unwrap();
//!     assert_eq!(user["name"], "Alice");
//! }
//! ```
//!
//! ## Chains
//!
//! All invocations triggered by one external call share a chain `id`:
//! `ctx.call` creates a child context inheriting the id, `ctx.transfer`
//! reuses the very same context (tail-call semantics). Log records carry
//! the id, the emitting service, and the context's uptime, so interleaved
//! chains can always be pulled apart by id rather than arrival order.
//!
//! ## Failure model
//!
//! Invocation-time failures (unknown service, handler error, handler
//! panic, handler that never settles) all arrive through the same
//! callback/future channel as success. Configuration mistakes (unknown
//! option names, empty service names) fail fast at the call site. A
//! second settlement of one context is rejected loudly with
//! [`AlreadySettled`]. Recorder malfunctions never affect call outcomes.

pub mod context;
pub mod error;
pub mod handler;
pub mod manager;
pub mod record;
pub mod recorder;
pub mod tracing;
mod util;

pub use context::{CallFuture, Callback, Context, Outcome};
pub use error::{AlreadySettled, CallError, ConfigError};
pub use handler::{FnHandler, HandlerResult, ServiceEntry, ServiceHandler};
pub use manager::{Manager, OptionKind, OptionValue};
pub use record::{LogRecord, RecordKind, RecordTemplate};
pub use recorder::{ConsoleRecorder, LogRecorder, NullRecorder, StreamRecorder};
