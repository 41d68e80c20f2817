//! Deadline-protected calls.
//!
//! A native unit can hang or panic through an unwinding boundary. Running
//! the call on a worker thread lets the host give up after a deadline. The
//! worker cannot be cancelled: it keeps the handle locked until the unit
//! returns, so later calls on the same handle wait behind it.

use crate::config::DispatchConfig;
use crate::dispatch::UnitHandle;
use crate::error::{FmiError, FmiResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Workers still running after their caller gave up on them.
static ABANDONED_WORKERS: AtomicUsize = AtomicUsize::new(0);

/// Refuse new protected calls once this many workers are abandoned.
const MAX_ABANDONED_WORKERS: usize = 10;

/// Number of workers currently running past their deadline.
pub fn abandoned_workers() -> usize {
    ABANDONED_WORKERS.load(Ordering::SeqCst)
}

/// Run `f` on the handle from a worker thread, waiting at most `deadline`.
///
/// The unit's answer is returned as `f` produced it. A panic inside `f`
/// becomes [`FmiError::WorkerPanicked`]; missing the deadline becomes
/// [`FmiError::DeadlineExceeded`] and leaves the worker running.
pub fn call_with_deadline<F, R>(handle: &Arc<Mutex<UnitHandle>>, deadline: Duration, f: F) -> FmiResult<R>
where
    F: FnOnce(&mut UnitHandle) -> R + Send + 'static,
    R: Send + 'static,
{
    let abandoned = ABANDONED_WORKERS.load(Ordering::SeqCst);
    if abandoned >= MAX_ABANDONED_WORKERS {
        return Err(FmiError::TooManyAbandonedWorkers {
            count: abandoned,
            max: MAX_ABANDONED_WORKERS,
        });
    }

    let (tx, rx) = crossbeam::channel::bounded(1);
    // Set under the lock by the caller when it gives up, read under the
    // lock by the worker when it finishes.
    let given_up = Arc::new(Mutex::new(false));

    let worker_handle = Arc::clone(handle);
    let worker_given_up = Arc::clone(&given_up);
    std::thread::spawn(move || {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut unit = worker_handle.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut *unit)
        }));

        let given_up = worker_given_up.lock().unwrap_or_else(PoisonError::into_inner);
        if *given_up {
            ABANDONED_WORKERS.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!("Abandoned worker finished");
        } else {
            let _ = tx.send(result);
        }
    });

    let outcome = match rx.recv_timeout(deadline) {
        Ok(outcome) => outcome,
        Err(_) => {
            let mut flag = given_up.lock().unwrap_or_else(PoisonError::into_inner);
            // The worker may have finished between the timeout and the lock.
            match rx.try_recv() {
                Ok(outcome) => outcome,
                Err(_) => {
                    *flag = true;
                    let count = ABANDONED_WORKERS.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::warn!(
                        abandoned_workers = count,
                        deadline_ms = deadline.as_millis(),
                        "FMI call missed its deadline, worker abandoned"
                    );
                    return Err(FmiError::DeadlineExceeded(deadline));
                }
            }
        }
    };

    outcome.map_err(panic_error)
}

/// Run `f` under the deadline configured in `config`.
///
/// Without a configured deadline the call runs on the calling thread and
/// a panic propagates as usual.
pub fn call_protected<F, R>(handle: &Arc<Mutex<UnitHandle>>, config: &DispatchConfig, f: F) -> FmiResult<R>
where
    F: FnOnce(&mut UnitHandle) -> R + Send + 'static,
    R: Send + 'static,
{
    match config.deadline() {
        Some(deadline) => call_with_deadline(handle, deadline, f),
        None => {
            let mut unit = handle.lock().unwrap_or_else(PoisonError::into_inner);
            Ok(f(&mut *unit))
        }
    }
}

fn panic_error(panic_info: Box<dyn std::any::Any + Send>) -> FmiError {
    let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    };
    tracing::error!(message = %message, "FMI call panicked");
    FmiError::WorkerPanicked(message)
}
