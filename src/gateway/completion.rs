//! Completion unifier.
//!
//! # Responsibilities
//! - Represent a service result as one sum type over immediate values
//!   and deferred computations
//! - Drive any result to exactly one terminal outcome
//! - Invoke exactly one of the success/error continuations exactly once
//!
//! # Design Decisions
//! - A not-yet-started computation is a boxed lazy future; resolving it
//!   spawns it onto the runtime, which is the "begin execution" step
//! - An already-started computation is a tokio task handle; its JoinError
//!   distinguishes cancellation from a panic, giving the three-way
//!   terminal state natively
//! - Cancellation surfaces as a distinguished error to `on_error`, never
//!   as a silently dropped request
//! - A panic inside the deferred work is captured by the task handle and
//!   routed to `on_error` as a fault; it never unwinds the caller

use std::future::Future;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::task::{JoinError, JoinHandle};

use crate::gateway::error::GatewayError;

/// A deferred service computation: either not yet started, or already
/// running as a spawned task.
pub struct DeferredCall<T = Value> {
    inner: Inner<T>,
}

enum Inner<T> {
    Pending(BoxFuture<'static, Result<T, GatewayError>>),
    Running(JoinHandle<Result<T, GatewayError>>),
}

impl<T: Send + 'static> DeferredCall<T> {
    /// Wrap a computation that has not begun executing.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, GatewayError>> + Send + 'static,
    {
        Self {
            inner: Inner::Pending(Box::pin(future)),
        }
    }

    /// Wrap a computation that is already running.
    pub fn running(handle: JoinHandle<Result<T, GatewayError>>) -> Self {
        Self {
            inner: Inner::Running(handle),
        }
    }

    /// Drive the computation to its terminal state.
    ///
    /// No thread blocks while waiting; control returns to the scheduler and
    /// resumes via continuation. The resumed path must not assume it runs on
    /// the worker that started the computation.
    pub async fn resolve(self) -> CompletionResult<T> {
        let handle = match self.inner {
            Inner::Pending(future) => tokio::spawn(future),
            Inner::Running(handle) => handle,
        };

        match handle.await {
            Ok(Ok(value)) => CompletionResult::Completed(value),
            Ok(Err(error)) => CompletionResult::Faulted(error),
            Err(join_error) if join_error.is_cancelled() => CompletionResult::Cancelled,
            Err(join_error) => CompletionResult::Faulted(GatewayError::Fault {
                message: panic_message(join_error),
            }),
        }
    }
}

fn panic_message(error: JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => {
            if let Some(message) = payload.downcast_ref::<&str>() {
                format!("service task panicked: {message}")
            } else if let Some(message) = payload.downcast_ref::<String>() {
                format!("service task panicked: {message}")
            } else {
                "service task panicked".to_string()
            }
        }
        Err(_) => "service task aborted".to_string(),
    }
}

/// Result of one service call: an immediate value or a deferred computation.
///
/// Callers never branch on "is this async"; `handle_completion` normalizes
/// both shapes into the same continuation contract.
pub enum ServiceResult<T = Value> {
    Immediate(T),
    Deferred(DeferredCall<T>),
}

impl<T: Send + 'static> ServiceResult<T> {
    pub fn immediate(value: T) -> Self {
        ServiceResult::Immediate(value)
    }

    /// A computation that will begin executing when the result is resolved.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, GatewayError>> + Send + 'static,
    {
        ServiceResult::Deferred(DeferredCall::pending(future))
    }

    /// A computation that is already running.
    pub fn spawned(handle: JoinHandle<Result<T, GatewayError>>) -> Self {
        ServiceResult::Deferred(DeferredCall::running(handle))
    }

    /// Normalize to the three-way terminal outcome.
    pub async fn resolve(self) -> CompletionResult<T> {
        match self {
            ServiceResult::Immediate(value) => CompletionResult::Completed(value),
            ServiceResult::Deferred(call) => call.resolve().await,
        }
    }
}

/// Terminal outcome of driving a service call to completion.
///
/// Exactly one is produced per request.
#[derive(Debug)]
pub enum CompletionResult<T = Value> {
    Completed(T),
    Faulted(GatewayError),
    Cancelled,
}

/// Which terminal state a completion reached, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Completed,
    Faulted,
    Cancelled,
}

impl CompletionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CompletionKind::Completed => "completed",
            CompletionKind::Faulted => "faulted",
            CompletionKind::Cancelled => "cancelled",
        }
    }
}

/// Drive a service result to completion and invoke exactly one of the two
/// continuations exactly once.
///
/// An immediate value invokes `on_success` without suspending. Cancellation
/// invokes `on_error` with [`GatewayError::Cancelled`]. The returned future
/// resolves only after the selected continuation's own async work finishes,
/// preserving ordering with whatever finalizes the request.
pub async fn handle_completion<T, R, S, SF, E, EF>(
    result: ServiceResult<T>,
    on_success: S,
    on_error: E,
) -> (CompletionKind, R)
where
    T: Send + 'static,
    S: FnOnce(T) -> SF,
    SF: Future<Output = R>,
    E: FnOnce(GatewayError) -> EF,
    EF: Future<Output = R>,
{
    match result.resolve().await {
        CompletionResult::Completed(value) => (CompletionKind::Completed, on_success(value).await),
        CompletionResult::Faulted(error) => (CompletionKind::Faulted, on_error(error).await),
        CompletionResult::Cancelled => {
            (CompletionKind::Cancelled, on_error(GatewayError::Cancelled).await)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Counters {
        success: AtomicUsize,
        error: AtomicUsize,
    }

    impl Counters {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                success: AtomicUsize::new(0),
                error: AtomicUsize::new(0),
            })
        }
    }

    async fn drive(result: ServiceResult<i32>, counters: &Counters) -> CompletionKind {
        let (kind, ()) = handle_completion(
            result,
            |_value| async {
                counters.success.fetch_add(1, Ordering::SeqCst);
            },
            |_error| async {
                counters.error.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        kind
    }

    fn assert_exactly_once(counters: &Counters, success: usize, error: usize) {
        assert_eq!(counters.success.load(Ordering::SeqCst), success);
        assert_eq!(counters.error.load(Ordering::SeqCst), error);
        assert_eq!(
            counters.success.load(Ordering::SeqCst) + counters.error.load(Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn immediate_value_invokes_success_once() {
        let counters = Counters::new();
        let kind = drive(ServiceResult::immediate(1), &counters).await;
        assert_eq!(kind, CompletionKind::Completed);
        assert_exactly_once(&counters, 1, 0);
    }

    #[tokio::test]
    async fn pending_deferred_is_started_and_completes() {
        let counters = Counters::new();
        let kind = drive(ServiceResult::deferred(async { Ok(2) }), &counters).await;
        assert_eq!(kind, CompletionKind::Completed);
        assert_exactly_once(&counters, 1, 0);
    }

    #[tokio::test]
    async fn running_deferred_completes() {
        let counters = Counters::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(3)
        });
        let kind = drive(ServiceResult::spawned(handle), &counters).await;
        assert_eq!(kind, CompletionKind::Completed);
        assert_exactly_once(&counters, 1, 0);
    }

    #[tokio::test]
    async fn faulted_deferred_invokes_error_once() {
        let counters = Counters::new();
        let kind = drive(
            ServiceResult::deferred(async { Err(GatewayError::fault("boom")) }),
            &counters,
        )
        .await;
        assert_eq!(kind, CompletionKind::Faulted);
        assert_exactly_once(&counters, 0, 1);
    }

    #[tokio::test]
    async fn cancelled_deferred_invokes_error_once_with_cancelled() {
        let counters = Counters::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(4)
        });
        handle.abort();
        // Let the abort land before resolving.
        tokio::time::sleep(Duration::from_millis(10)).await;

        let success_counters = counters.clone();
        let error_counters = counters.clone();
        let (kind, ()) = handle_completion(
            ServiceResult::spawned(handle),
            move |_value: i32| async move {
                success_counters.success.fetch_add(1, Ordering::SeqCst);
            },
            move |error| async move {
                assert!(matches!(error, GatewayError::Cancelled));
                error_counters.error.fetch_add(1, Ordering::SeqCst);
            },
        )
        .await;
        assert_eq!(kind, CompletionKind::Cancelled);
        assert_exactly_once(&counters, 0, 1);
    }

    #[tokio::test]
    async fn panicking_deferred_is_a_fault_not_an_unwind() {
        let counters = Counters::new();
        let kind = drive(
            ServiceResult::deferred(async { panic!("unexpected") }),
            &counters,
        )
        .await;
        assert_eq!(kind, CompletionKind::Faulted);
        assert_exactly_once(&counters, 0, 1);
    }

    #[tokio::test]
    async fn continuation_async_work_finishes_before_return() {
        let flag = Arc::new(AtomicUsize::new(0));
        let inner = flag.clone();
        let (kind, ()) = handle_completion(
            ServiceResult::immediate(5),
            move |_value| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                inner.store(1, Ordering::SeqCst);
            },
            |_error| async {},
        )
        .await;
        assert_eq!(kind, CompletionKind::Completed);
        assert_eq!(flag.load(Ordering::SeqCst), 1);
    }
}
