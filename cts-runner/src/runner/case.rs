// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    catalog::CaseFn,
    expectations::{Expectation, find_expected},
    helpers::panic_message,
    host::HostConfig,
    list::TestCaseLeaf,
    recorder::CaseRecorder,
    time::stopwatch,
};
use cts_metadata::{Status, TestResult};
use cts_query::{CaseParams, ParamValue};
use futures::FutureExt;
use std::{
    any::Any,
    error::Error,
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;

/// The error a test body (or an eventual expectation) ends with.
///
/// Returning [`CaseError::Skip`] marks the case as skipped. Anything else fails it.
#[derive(Debug, Error)]
pub enum CaseError {
    /// The case was skipped.
    #[error("skipped: {reason}")]
    Skip {
        /// Why the case was skipped.
        reason: String,
    },

    /// The body failed.
    #[error("{message}")]
    Failure {
        /// A one-line description of the failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl CaseError {
    /// Creates a new skip.
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    /// Creates a new failure without an underlying error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new failure caused by `error`.
    pub fn from_error<E>(message: impl Into<String>, error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self::Failure {
            message: message.into(),
            source: Some(Box::new(error)),
        }
    }

    /// Returns true if this is a skip.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::failure(format!("panicked: {}", panic_message(&*payload)))
    }
}

impl From<String> for CaseError {
    fn from(message: String) -> Self {
        Self::failure(message)
    }
}

impl From<&str> for CaseError {
    fn from(message: &str) -> Self {
        Self::failure(message)
    }
}

type EventualHandle = JoinHandle<Result<(), CaseError>>;

/// The handle a test body receives.
///
/// Cloning is cheap. All clones log into the same case.
#[derive(Clone, Debug)]
pub struct CaseContext {
    name: Arc<str>,
    params: Arc<CaseParams>,
    host: Arc<HostConfig>,
    recorder: Arc<Mutex<CaseRecorder>>,
    eventuals: Arc<Mutex<Vec<EventualHandle>>>,
}

impl CaseContext {
    /// Returns the name of the case being run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the params of this case, including private params and the current subcase.
    pub fn params(&self) -> &CaseParams {
        &self.params
    }

    /// Returns a single param.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// Returns the host configuration.
    pub fn host(&self) -> &HostConfig {
        &self.host
    }

    /// Returns true if debug messages are recorded.
    pub fn is_debugging(&self) -> bool {
        lock(&self.recorder).is_debugging()
    }

    /// Records a debug message. Ignored unless debugging is enabled.
    pub fn debug(&self, message: impl Into<String>) {
        lock(&self.recorder).debug(message);
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        lock(&self.recorder).info(message);
    }

    /// Records a warning. The case ends with `warn` unless something worse happens.
    pub fn warn(&self, message: impl Into<String>) {
        lock(&self.recorder).warn(message, None);
    }

    /// Records a failed expectation. The case fails, but the body keeps running.
    pub fn fail(&self, message: impl Into<String>) {
        lock(&self.recorder).expectation_failed(message, None);
    }

    /// Records a failed expectation with extra detail.
    pub fn fail_with_detail(&self, message: impl Into<String>, detail: impl Into<String>) {
        lock(&self.recorder).expectation_failed(message, Some(detail.into()));
    }

    /// Records a validation failure reported by the device.
    pub fn validation_failed(&self, message: impl Into<String>) {
        lock(&self.recorder).validation_failed(message, None);
    }

    /// Records a failed expectation if `cond` is false. Returns `cond`.
    pub fn expect(&self, cond: bool, message: impl Into<String>) -> bool {
        if !cond {
            self.fail(message);
        }
        cond
    }

    /// Returns an error that skips the case when returned from the body.
    pub fn skip(&self, reason: impl Into<String>) -> CaseError {
        CaseError::skip(reason)
    }

    /// Starts an eventual expectation.
    ///
    /// The future starts running immediately. The case doesn't finish until it completes, and its
    /// error or panic is recorded like one from the body.
    pub fn eventual<F>(&self, future: F)
    where
        F: Future<Output = Result<(), CaseError>> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        lock(&self.eventuals).push(handle);
    }
}

/// Runs a single case and returns its result.
///
/// The body (once per subcase, if the test has subcases) and every eventual expectation it starts
/// are awaited before the result is produced. Errors and panics are recorded, never propagated.
pub async fn run_case(
    leaf: &TestCaseLeaf<'_>,
    expectations: &[Expectation],
    host: &HostConfig,
) -> TestResult {
    let name = leaf.name();
    let expected = find_expected(expectations, leaf.query());
    let stopwatch = stopwatch();
    let recorder = Arc::new(Mutex::new(CaseRecorder::new(host.debug())));
    let host = Arc::new(host.clone());
    let context = |params: CaseParams| CaseContext {
        name: Arc::from(name.as_str()),
        params: Arc::new(params),
        host: host.clone(),
        recorder: recorder.clone(),
        eventuals: Arc::new(Mutex::new(Vec::new())),
    };

    let node = leaf.node();
    if expected == Some(Status::Skip) {
        debug!(%name, "not running case expected to skip");
        lock(&recorder).skipped("expected skip");
    } else if let Some(subcases) = node.subcases() {
        let subcases: Vec<_> = subcases.cases().collect();
        for subcase in subcases {
            let params = subcase.and_then(|subcase| {
                let merged = leaf.params().merge(&subcase)?;
                Ok((subcase, merged))
            });
            match params {
                Ok((subcase, params)) => {
                    lock(&recorder).begin_subcase(&subcase);
                    run_body(node.body(), context(params)).await;
                }
                Err(error) => lock(&recorder)
                    .threw(CaseError::from_error("failed to generate subcase", error)),
            }
        }
    } else {
        run_body(node.body(), context(leaf.params().clone())).await;
    }

    let (status, logs) = lock(&recorder).finish();
    TestResult {
        name,
        status,
        timems: stopwatch.snapshot().timems(),
        logs,
        expected,
    }
}

async fn run_body(body: &CaseFn, ctx: CaseContext) {
    let recorder = ctx.recorder.clone();
    let eventuals = ctx.eventuals.clone();

    // Bodies can panic both while creating the future and while polling it.
    match std::panic::catch_unwind(AssertUnwindSafe(|| body(ctx))) {
        Ok(future) => match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => lock(&recorder).threw(error),
            Err(payload) => lock(&recorder).threw(CaseError::from_panic(payload)),
        },
        Err(payload) => lock(&recorder).threw(CaseError::from_panic(payload)),
    }

    // Eventual expectations can start more eventual expectations.
    loop {
        let pending = std::mem::take(&mut *lock(&eventuals));
        if pending.is_empty() {
            break;
        }
        for handle in pending {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => lock(&recorder).threw(error),
                Err(error) if error.is_panic() => {
                    lock(&recorder).threw(CaseError::from_panic(error.into_panic()))
                }
                Err(error) => lock(&recorder)
                    .threw(CaseError::from_error("eventual expectation didn't finish", error)),
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
