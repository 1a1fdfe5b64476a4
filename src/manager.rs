//! # Manager
//!
//! The manager owns the validated configuration, the service registry
//! (name → handler), and is the only component that constructs fresh
//! top-level contexts. Every cross-service invocation goes through it.
//!
//! Configuration is a closed schema: a static table of option
//! descriptors checked uniformly by the constructor path and
//! [`Manager::set_option`]. Unknown names fail fast so typos surface
//! instead of being silently ignored.
//!
//! The manager is a cheap `Clone` handle over shared state, safe to use
//! from multiple tasks: registry and option mutation sit behind mutexes,
//! so a recorder set before a call is visible to that call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

use crate::context::{Callback, CallFuture, Context, Outcome};
use crate::error::{CallError, ConfigError};
use crate::handler::{FnHandler, HandlerResult, ServiceEntry, ServiceHandler};
use crate::recorder::{LogRecorder, NullRecorder};
use crate::util;

/// Kind tag for each configurable option, used to validate that a
/// supplied value matches its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    LogRecorder,
}

impl OptionKind {
    fn as_str(self) -> &'static str {
        match self {
            OptionKind::LogRecorder => "LogRecorder",
        }
    }
}

/// A configuration value. One variant per option kind the schema knows.
#[derive(Clone)]
pub enum OptionValue {
    LogRecorder(Arc<dyn LogRecorder>),
}

impl OptionValue {
    fn kind(&self) -> OptionKind {
        match self {
            OptionValue::LogRecorder(_) => OptionKind::LogRecorder,
        }
    }
}

struct OptionDescriptor {
    name: &'static str,
    kind: OptionKind,
}

/// The closed set of recognized options. Setting anything else is a
/// configuration error.
const OPTION_SCHEMA: &[OptionDescriptor] = &[OptionDescriptor {
    name: "logRecorder",
    kind: OptionKind::LogRecorder,
}];

struct ManagerInner {
    recorder: Mutex<Arc<dyn LogRecorder>>,
    services: Mutex<HashMap<String, ServiceEntry>>,
}

/// Service registry, configuration holder, and invocation mediator.
#[derive(Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager").finish_non_exhaustive()
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

impl Manager {
    /// Manager with default configuration: records are discarded until a
    /// recorder is configured.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                recorder: Mutex::new(Arc::new(NullRecorder)),
                services: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Manager validated against the option schema at construction time.
    /// The first unrecognized name or mismatched value fails the whole
    /// construction.
    pub fn with_options<S>(
        options: impl IntoIterator<Item = (S, OptionValue)>,
    ) -> Result<Self, ConfigError>
    where
        S: AsRef<str>,
    {
        let manager = Self::new();
        for (name, value) in options {
            manager.set_option(name.as_ref(), value)?;
        }
        Ok(manager)
    }

    /// Sets one option, validated against the schema. Contexts created
    /// before this call keep the recorder they captured.
    pub fn set_option(&self, name: &str, value: OptionValue) -> Result<(), ConfigError> {
        let descriptor = OPTION_SCHEMA
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
        if value.kind() != descriptor.kind {
            return Err(ConfigError::InvalidOptionValue {
                option: name.to_string(),
                expected: descriptor.kind.as_str(),
            });
        }
        match value {
            OptionValue::LogRecorder(recorder) => {
                *self.inner.recorder.lock() = recorder;
            }
        }
        Ok(())
    }

    /// Reads one option back. Unknown names are rejected just like in
    /// [`Manager::set_option`].
    pub fn get_option(&self, name: &str) -> Result<OptionValue, ConfigError> {
        let descriptor = OPTION_SCHEMA
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
        match descriptor.kind {
            OptionKind::LogRecorder => Ok(OptionValue::LogRecorder(self.current_recorder())),
        }
    }

    pub(crate) fn current_recorder(&self) -> Arc<dyn LogRecorder> {
        self.inner.recorder.lock().clone()
    }

    /// Registers `handler` under `name`. Re-registering an existing name
    /// replaces the previous handler (last registration wins) with a
    /// warning, which keeps hot-reload style test setups working.
    pub fn register(&self, name: &str, handler: Arc<dyn ServiceHandler>) -> Result<(), ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::EmptyServiceName);
        }
        let entry = ServiceEntry {
            name: name.to_string(),
            handler,
        };
        let replaced = self.inner.services.lock().insert(name.to_string(), entry);
        if replaced.is_some() {
            warn!(service = name, "service re-registered, previous handler replaced");
        }
        Ok(())
    }

    /// Convenience registration for async closures.
    pub fn register_fn<F, Fut>(&self, name: &str, handler: F) -> Result<(), ConfigError>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(name, Arc::new(FnHandler::new(handler)))
    }

    /// Looks up the stored registration entry. Primarily introspection
    /// and test support.
    pub fn get_service(&self, name: &str) -> Option<ServiceEntry> {
        self.inner.services.lock().get(name).cloned()
    }

    /// Starts a new top-level call chain: fresh chain id, handler looked
    /// up and invoked, outcome delivered through the returned future.
    ///
    /// This never fails synchronously. An unregistered name resolves the
    /// future with [`CallError::ServiceNotFound`]; a handler that returns
    /// `Err` or panics resolves it with the corresponding failure.
    pub fn call(&self, name: &str, params: Value) -> CallFuture {
        self.dispatch(util::chain_id(), name, params, None)
    }

    /// Like [`Manager::call`], additionally delivering the outcome to an
    /// error-first `callback`. Callback and future observe the identical
    /// once-only settlement.
    pub fn call_with_callback(
        &self,
        name: &str,
        params: Value,
        callback: impl FnOnce(Outcome) + Send + 'static,
    ) -> CallFuture {
        self.dispatch(util::chain_id(), name, params, Some(Box::new(callback)))
    }

    /// Constructs a bare top-level context without invoking any handler,
    /// for callers composing several `ctx.call`s manually under one
    /// chain id.
    pub fn new_context(&self) -> Context {
        self.new_context_with_params(Value::Null)
    }

    /// Bare context carrying caller-supplied params.
    pub fn new_context_with_params(&self, params: Value) -> Context {
        Context::detached(
            self.clone(),
            util::chain_id(),
            String::new(),
            params,
            self.current_recorder(),
        )
    }

    /// Shared invocation path for top-level calls and `ctx.call`. The
    /// chain id is minted by the former and inherited by the latter.
    pub(crate) fn dispatch(
        &self,
        id: String,
        name: &str,
        params: Value,
        callback: Option<Callback>,
    ) -> CallFuture {
        let (ctx, future) = Context::pending(
            self.clone(),
            id,
            name.to_string(),
            params,
            self.current_recorder(),
            callback,
        );
        match self.get_service(name) {
            Some(entry) => self.spawn_handler(entry, ctx),
            None => {
                // Not-found still goes through the normal async channel;
                // callers never see a synchronous failure.
                let name = name.to_string();
                tokio::spawn(async move {
                    let _ = ctx.error(CallError::ServiceNotFound(name));
                });
            }
        }
        future
    }

    /// Runs a handler on the runtime and watches its task so that a
    /// returned `Err` or a panic settles the context instead of crashing
    /// anything.
    pub(crate) fn spawn_handler(&self, entry: ServiceEntry, ctx: Context) {
        let service = entry.name.clone();
        let handler_ctx = ctx.clone();
        let task = tokio::spawn(async move { entry.handler.call(handler_ctx).await });
        tokio::spawn(async move {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    if ctx.error(err).is_err() {
                        warn!(service, "handler returned an error after settling, dropped");
                    }
                }
                Err(join_err) if join_err.is_panic() => {
                    if ctx.error(CallError::HandlerPanic { service: service.clone() }).is_err() {
                        warn!(service, "handler panicked after settling");
                    }
                }
                Err(_) => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder() -> OptionValue {
        OptionValue::LogRecorder(Arc::new(NullRecorder))
    }

    #[test]
    fn unknown_options_are_rejected_at_construction() {
        let err = Manager::with_options([("aaaa", recorder())]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption(name) if name == "aaaa"));

        let err = Manager::with_options([("bbbb", recorder())]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOption(_)));
    }

    #[test]
    fn unknown_options_are_rejected_by_set_option() {
        let manager = Manager::new();
        assert!(matches!(
            manager.set_option("cccc", recorder()),
            Err(ConfigError::UnknownOption(_))
        ));
        assert!(matches!(
            manager.get_option("dddd"),
            Err(ConfigError::UnknownOption(_))
        ));
    }

    #[test]
    fn recorder_round_trips_and_updates() {
        let first: Arc<dyn LogRecorder> = Arc::new(NullRecorder);
        let manager =
            Manager::with_options([("logRecorder", OptionValue::LogRecorder(first.clone()))])
                .unwrap();

        let OptionValue::LogRecorder(stored) = manager.get_option("logRecorder").unwrap();
        assert!(Arc::ptr_eq(&stored, &first));

        let second: Arc<dyn LogRecorder> = Arc::new(NullRecorder);
        manager
            .set_option("logRecorder", OptionValue::LogRecorder(second.clone()))
            .unwrap();
        let OptionValue::LogRecorder(stored) = manager.get_option("logRecorder").unwrap();
        assert!(Arc::ptr_eq(&stored, &second));
        assert!(!Arc::ptr_eq(&stored, &first));
    }

    #[test]
    fn registration_round_trips() {
        let manager = Manager::new();
        let handler: Arc<dyn ServiceHandler> =
            Arc::new(FnHandler::new(|ctx: Context| async move {
                ctx.result(Value::Null)?;
                Ok::<(), CallError>(())
            }));

        manager.register("test", handler.clone()).unwrap();

        let entry = manager.get_service("test").expect("service missing");
        assert_eq!(entry.name, "test");
        assert!(Arc::ptr_eq(&entry.handler, &handler));
        assert!(manager.get_service("other").is_none());
    }

    #[test]
    fn empty_service_names_are_rejected() {
        let manager = Manager::new();
        let handler: Arc<dyn ServiceHandler> =
            Arc::new(FnHandler::new(|_ctx: Context| async move { Ok::<(), CallError>(()) }));
        assert!(matches!(
            manager.register("", handler),
            Err(ConfigError::EmptyServiceName)
        ));
    }

    #[test]
    fn duplicate_registration_last_wins() {
        let manager = Manager::new();
        let first: Arc<dyn ServiceHandler> =
            Arc::new(FnHandler::new(|_ctx: Context| async move { Ok::<(), CallError>(()) }));
        let second: Arc<dyn ServiceHandler> =
            Arc::new(FnHandler::new(|_ctx: Context| async move { Ok::<(), CallError>(()) }));

        manager.register("dup", first).unwrap();
        manager.register("dup", second.clone()).unwrap();

        let entry = manager.get_service("dup").unwrap();
        assert!(Arc::ptr_eq(&entry.handler, &second));
    }

    #[tokio::test]
    async fn new_context_carries_params_and_recorder() {
        let manager = Manager::new();
        let params = json!({ "a": 123, "b": 456 });
        let ctx = manager.new_context_with_params(params.clone());
        assert_eq!(ctx.params(), params);
        assert!(!ctx.id().is_empty());
    }
}
