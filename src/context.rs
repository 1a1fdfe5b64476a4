//! # Invocation Context
//!
//! One [`Context`] exists per top-level or nested invocation. It is the
//! only API handlers use to log, call other services, redirect via
//! transfer, and terminate. A context settles exactly once: the first
//! `result`/`error` wins, a second attempt returns [`AlreadySettled`].
//!
//! The completion slot feeds two views of the same settlement: an
//! optional error-first callback and the [`CallFuture`] returned by
//! `call`. Both observe the identical outcome.
//!
//! `transfer` reuses the same context object (true tail-call semantics):
//! the chain `id`, start time and completion slot are untouched, only the
//! current service name and params are swapped before the target handler
//! runs.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;
use std::time::Instant;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::{AlreadySettled, CallError};
use crate::manager::Manager;
use crate::record::{LogRecord, RecordKind};
use crate::recorder::LogRecorder;
use crate::util;

/// Terminal outcome of one invocation.
pub type Outcome = Result<Value, CallError>;

/// Error-first style completion callback.
pub type Callback = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// The single-use completion slot. `Pending` holds whichever delivery
/// mechanisms the caller asked for; both are taken on the first settle.
enum CompletionState {
    Pending {
        callback: Option<Callback>,
        tx: Option<oneshot::Sender<Outcome>>,
    },
    Settled,
}

/// The mutable part of a context: which service is currently executing
/// and with what params. Swapped in place by `transfer`.
struct Frame {
    service: String,
    params: Value,
}

struct ContextInner {
    manager: Manager,
    recorder: Arc<dyn LogRecorder>,
    id: String,
    start: Instant,
    frame: Mutex<Frame>,
    completion: Mutex<CompletionState>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        // Every handle is gone. If the handler finished without settling,
        // deliver that as a failure instead of leaving the caller hanging.
        let state = std::mem::replace(self.completion.get_mut(), CompletionState::Settled);
        if let CompletionState::Pending { callback, tx } = state {
            let outcome = Err(CallError::Abandoned {
                service: self.frame.get_mut().service.clone(),
            });
            if let Some(cb) = callback {
                cb(outcome.clone());
            }
            if let Some(tx) = tx {
                let _ = tx.send(outcome);
            }
        }
    }
}

/// Per-invocation execution state and the handler-facing API.
///
/// Cloning is cheap (an `Arc` bump); all clones share the same identity,
/// frame and completion slot.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    /// Context wired to a pending completion: the returned future (and
    /// the optional callback) resolve when the context settles.
    pub(crate) fn pending(
        manager: Manager,
        id: String,
        service: String,
        params: Value,
        recorder: Arc<dyn LogRecorder>,
        callback: Option<Callback>,
    ) -> (Self, CallFuture) {
        let (tx, rx) = oneshot::channel();
        let ctx = Self {
            inner: Arc::new(ContextInner {
                manager,
                recorder,
                id,
                start: Instant::now(),
                frame: Mutex::new(Frame {
                    service: service.clone(),
                    params,
                }),
                completion: Mutex::new(CompletionState::Pending {
                    callback,
                    tx: Some(tx),
                }),
            }),
        };
        (ctx, CallFuture { rx, service })
    }

    /// Bare context with no completion consumer, used by
    /// [`Manager::new_context`] for manually driven chains. Settle-once
    /// semantics still apply.
    pub(crate) fn detached(
        manager: Manager,
        id: String,
        service: String,
        params: Value,
        recorder: Arc<dyn LogRecorder>,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                manager,
                recorder,
                id,
                start: Instant::now(),
                frame: Mutex::new(Frame { service, params }),
                completion: Mutex::new(CompletionState::Pending {
                    callback: None,
                    tx: None,
                }),
            }),
        }
    }

    /// Chain id shared by every invocation of one external call.
    pub fn id(&self) -> String {
        self.inner.id.clone()
    }

    /// Name of the service currently executing in this context.
    pub fn service(&self) -> String {
        self.inner.frame.lock().service.clone()
    }

    /// Params of the current invocation.
    pub fn params(&self) -> Value {
        self.inner.frame.lock().params.clone()
    }

    /// Milliseconds since this context (not the chain) started.
    pub fn uptime_ms(&self) -> u64 {
        self.inner.start.elapsed().as_millis() as u64
    }

    /// Invokes another service as a child of this invocation. The child
    /// context inherits the chain id (so its log records correlate with
    /// this chain) but has its own start time and completion slot.
    pub fn call(&self, name: &str, params: Value) -> CallFuture {
        self.inner
            .manager
            .dispatch(self.inner.id.clone(), name, params, None)
    }

    /// Like [`Context::call`], additionally invoking `callback` with the
    /// same outcome the returned future resolves to.
    pub fn call_with_callback(
        &self,
        name: &str,
        params: Value,
        callback: impl FnOnce(Outcome) + Send + 'static,
    ) -> CallFuture {
        self.inner
            .manager
            .dispatch(self.inner.id.clone(), name, params, Some(Box::new(callback)))
    }

    /// Redirects the current invocation to `name` without creating a new
    /// externally observable call. The same context object is reused, so
    /// whichever of `result`/`error` the target handler eventually calls
    /// settles the original caller's completion. There is no cycle
    /// guard; avoiding infinite transfer loops is the caller's job.
    pub fn transfer(&self, name: &str, params: Value) {
        {
            let mut frame = self.inner.frame.lock();
            frame.service = name.to_string();
            frame.params = params;
        }
        match self.inner.manager.get_service(name) {
            Some(entry) => self.inner.manager.spawn_handler(entry, self.clone()),
            None => {
                if self
                    .error(CallError::ServiceNotFound(name.to_string()))
                    .is_err()
                {
                    warn!(service = name, "transfer target missing on settled context");
                }
            }
        }
    }

    /// Settles this invocation successfully. Emits one `debug` record
    /// carrying the result value. The record lands before the outcome is
    /// delivered, so observers woken by the settlement see the full
    /// per-context record sequence.
    pub fn result(&self, value: Value) -> Result<(), AlreadySettled> {
        let (callback, tx) = self.take_pending()?;
        self.emit(
            RecordKind::Debug,
            &format!("result: {}", render_value(&value)),
            &[],
        );
        deliver(callback, tx, Ok(value));
        Ok(())
    }

    /// Settles this invocation as failed. Plain strings and boxed errors
    /// are normalized into [`CallError::Handler`] so consumers always see
    /// a consistent failure shape. Emits one `error` record, before
    /// delivery like [`Context::result`].
    pub fn error(&self, err: impl Into<CallError>) -> Result<(), AlreadySettled> {
        let err = err.into();
        let (callback, tx) = self.take_pending()?;
        self.emit(RecordKind::Error, &err.to_string(), &[]);
        deliver(callback, tx, Err(err));
        Ok(())
    }

    /// Claims the completion slot, enforcing exactly-once settlement.
    fn take_pending(
        &self,
    ) -> Result<(Option<Callback>, Option<oneshot::Sender<Outcome>>), AlreadySettled> {
        let state = {
            let mut slot = self.inner.completion.lock();
            std::mem::replace(&mut *slot, CompletionState::Settled)
        };
        match state {
            CompletionState::Pending { callback, tx } => Ok((callback, tx)),
            CompletionState::Settled => Err(AlreadySettled {
                service: self.service(),
            }),
        }
    }

    /// Emits a `log` record.
    pub fn log(&self, fmt: &str, args: &[&dyn Display]) {
        self.emit(RecordKind::Log, fmt, args);
    }

    /// Emits an `info` record.
    pub fn info(&self, fmt: &str, args: &[&dyn Display]) {
        self.emit(RecordKind::Info, fmt, args);
    }

    /// Emits a `debug` record.
    pub fn debug(&self, fmt: &str, args: &[&dyn Display]) {
        self.emit(RecordKind::Debug, fmt, args);
    }

    /// Emits an `error`-level record. This is pure logging; it does not
    /// settle the context (that is [`Context::error`]).
    pub fn log_error(&self, fmt: &str, args: &[&dyn Display]) {
        self.emit(RecordKind::Error, fmt, args);
    }

    fn emit(&self, kind: RecordKind, fmt: &str, args: &[&dyn Display]) {
        let record = LogRecord {
            time: util::isotime(),
            id: self.inner.id.clone(),
            kind,
            service: self.service(),
            uptime: self.uptime_ms(),
            content: util::interpolate(fmt, args),
        };
        self.inner.recorder.record(&record);
    }
}

/// Runs outside the completion lock; the callback may re-enter the
/// manager or issue further calls. The oneshot send may fail when the
/// caller dropped the future and relied on the callback alone.
fn deliver(callback: Option<Callback>, tx: Option<oneshot::Sender<Outcome>>, outcome: Outcome) {
    if let Some(cb) = callback {
        cb(outcome.clone());
    }
    if let Some(tx) = tx {
        let _ = tx.send(outcome);
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Future view of one invocation's settlement.
///
/// Resolves with the outcome the handler settled; if the context is
/// dropped unsettled the error is [`CallError::Abandoned`].
pub struct CallFuture {
    rx: oneshot::Receiver<Outcome>,
    service: String,
}

impl Future for CallFuture {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(CallError::Abandoned {
                service: self.service.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::LogRecorder;
    use serde_json::json;

    #[derive(Clone, Default)]
    struct CaptureRecorder {
        records: Arc<Mutex<Vec<LogRecord>>>,
    }

    impl CaptureRecorder {
        fn records(&self) -> Vec<LogRecord> {
            self.records.lock().clone()
        }
    }

    impl LogRecorder for CaptureRecorder {
        fn record(&self, record: &LogRecord) {
            self.records.lock().push(record.clone());
        }
    }

    fn capture_manager() -> (Manager, CaptureRecorder) {
        let capture = CaptureRecorder::default();
        let manager = Manager::new();
        manager
            .set_option(
                "logRecorder",
                crate::manager::OptionValue::LogRecorder(Arc::new(capture.clone())),
            )
            .unwrap();
        (manager, capture)
    }

    #[tokio::test]
    async fn second_settlement_is_rejected_and_outcome_unchanged() {
        let (manager, _) = capture_manager();
        let (ctx, future) = Context::pending(
            manager,
            "chain1".to_string(),
            "svc".to_string(),
            Value::Null,
            Arc::new(crate::recorder::NullRecorder),
            None,
        );

        ctx.result(json!("first")).unwrap();
        assert!(ctx.result(json!("second")).is_err());
        assert!(ctx.error("late failure").is_err());

        assert_eq!(future.await.unwrap(), json!("first"));
    }

    #[tokio::test]
    async fn bare_context_still_enforces_settle_once() {
        let (manager, _) = capture_manager();
        let ctx = manager.new_context();
        ctx.result(json!(1)).unwrap();
        let err = ctx.error("again").unwrap_err();
        assert!(err.to_string().contains("already settled"));
    }

    #[tokio::test]
    async fn uptime_is_monotonic_within_one_context() {
        let (manager, capture) = capture_manager();
        let ctx = manager.new_context();

        ctx.debug("one", &[]);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        ctx.debug("two", &[]);
        ctx.info("three", &[]);

        let records = capture.records();
        assert_eq!(records.len(), 3);
        assert!(records[1].uptime >= records[0].uptime);
        assert!(records[2].uptime >= records[1].uptime);
    }

    #[tokio::test]
    async fn records_carry_chain_id_service_and_interpolated_content() {
        let (manager, capture) = capture_manager();
        let ctx = manager.new_context_with_params(json!({ "phone": 123456 }));

        ctx.log("upload image, uuid=%s", &[&"abc"]);
        ctx.log_error("compare fail, score=%s", &[&12]);

        let records = capture.records();
        assert_eq!(records[0].kind, RecordKind::Log);
        assert_eq!(records[0].id, ctx.id());
        assert_eq!(records[0].content, "upload image, uuid=abc");
        assert_eq!(records[1].kind, RecordKind::Error);
        assert_eq!(records[1].content, "compare fail, score=12");
        // Emission order is preserved within one context.
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].time).is_ok());
    }

    #[tokio::test]
    async fn live_context_keeps_the_recorder_it_was_created_with() {
        let (manager, first) = capture_manager();
        let ctx = manager.new_context();

        let second = CaptureRecorder::default();
        manager
            .set_option(
                "logRecorder",
                crate::manager::OptionValue::LogRecorder(Arc::new(second.clone())),
            )
            .unwrap();

        ctx.debug("emitted after the swap", &[]);
        ctx.result(json!("done")).unwrap();

        let old = first.records();
        assert_eq!(old.len(), 2);
        assert_eq!(old[0].content, "emitted after the swap");
        assert!(second.records().is_empty());

        // Contexts created after the swap pick up the new recorder.
        let fresh = manager.new_context();
        fresh.info("fresh context", &[]);
        assert_eq!(second.records().len(), 1);
        assert_eq!(first.records().len(), 2);
    }

    #[tokio::test]
    async fn dropping_all_handles_delivers_abandoned() {
        let (manager, _) = capture_manager();
        let (ctx, future) = Context::pending(
            manager,
            "chain2".to_string(),
            "svc".to_string(),
            Value::Null,
            Arc::new(crate::recorder::NullRecorder),
            None,
        );

        drop(ctx);
        match future.await {
            Err(CallError::Abandoned { service }) => assert_eq!(service, "svc"),
            other => panic!("expected Abandoned, got {other:?}"),
        }
    }
}
