//! Single-flight coordination of session renewal.
//!
//! At most one renewal runs per coordinator. Callers that observe an expired
//! credential while a renewal is running queue a continuation instead of
//! starting their own. When the renewal settles, the in-flight flag is
//! cleared first and the queued continuations are then invoked in arrival
//! order, each with a clone of the shared outcome.
//!
//! The renewal itself runs on a spawned task, so a caller that gives up (drops
//! its future or times out) never cancels it for the others.

use std::{
    collections::VecDeque,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::{sync::oneshot, task::AbortHandle};

pub type Continuation<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joined {
    /// The caller found the coordinator idle and started a renewal.
    Started,
    /// A renewal was already running; the continuation waits for it.
    Queued,
}

struct Waiter<T, E> {
    stamp: u64,
    continuation: Continuation<T, E>,
}

struct FlightState<T, E> {
    in_flight: bool,
    // Bumped on every start and on reset; a settle from an older epoch is stale.
    epoch: u64,
    next_stamp: u64,
    waiters: VecDeque<Waiter<T, E>>,
    task: Option<AbortHandle>,
}

pub struct SingleFlight<T, E> {
    state: Arc<Mutex<FlightState<T, E>>>,
    interrupted: E,
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// `interrupted` is the failure handed to waiters whose renewal was reset,
    /// aborted or panicked.
    pub fn new(interrupted: E) -> Self {
        Self {
            state: Arc::new(Mutex::new(FlightState {
                in_flight: false,
                epoch: 0,
                next_stamp: 0,
                waiters: VecDeque::new(),
                task: None,
            })),
            interrupted,
        }
    }

    /// Hands out a monotonically increasing arrival stamp. Take it as soon as
    /// the expired credential is observed; queue order follows it.
    pub fn arrive(&self) -> u64 {
        let mut state = lock(&self.state);
        let stamp = state.next_stamp;
        state.next_stamp += 1;
        stamp
    }

    pub fn is_in_flight(&self) -> bool {
        lock(&self.state).in_flight
    }

    pub fn pending(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Enqueues `continuation` and, if no renewal is running, spawns the one
    /// produced by `start`. Must be called from within a tokio runtime.
    pub fn join<C, F, Fut>(&self, stamp: u64, continuation: C, start: F) -> Joined
    where
        C: FnOnce(Result<T, E>) + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let epoch = {
            let mut state = lock(&self.state);
            enqueue(
                &mut state.waiters,
                Waiter {
                    stamp,
                    continuation: Box::new(continuation),
                },
            );
            if state.in_flight {
                return Joined::Queued;
            }
            state.in_flight = true;
            state.epoch += 1;
            state.epoch
        };

        let mut guard = SettleGuard {
            state: Arc::clone(&self.state),
            epoch,
            interrupted: self.interrupted.clone(),
            outcome: None,
        };
        let renewal = start();
        let handle = tokio::spawn(async move {
            let outcome = renewal.await;
            guard.outcome = Some(outcome);
            drop(guard);
        });

        let mut state = lock(&self.state);
        if state.in_flight && state.epoch == epoch {
            state.task = Some(handle.abort_handle());
        }
        Joined::Started
    }

    /// Joins the current renewal (starting one if idle) and waits for its
    /// outcome.
    pub async fn run<F, Fut>(&self, start: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let stamp = self.arrive();
        let (tx, rx) = oneshot::channel();
        self.join(
            stamp,
            move |outcome| {
                let _ = tx.send(outcome);
            },
            start,
        );
        rx.await.unwrap_or_else(|_| Err(self.interrupted.clone()))
    }

    /// Aborts a running renewal and fails every waiter with the interrupted
    /// error. A renewal that still manages to settle afterwards is ignored.
    pub fn reset(&self) {
        let (waiters, task) = {
            let mut state = lock(&self.state);
            state.epoch += 1;
            state.in_flight = false;
            (std::mem::take(&mut state.waiters), state.task.take())
        };
        if let Some(task) = task {
            task.abort();
        }
        for waiter in waiters {
            (waiter.continuation)(Err(self.interrupted.clone()));
        }
    }
}

/// Settles the renewal exactly once: with the real outcome on completion, or
/// with the interrupted error when the task unwinds or is aborted.
struct SettleGuard<T: Clone, E: Clone> {
    state: Arc<Mutex<FlightState<T, E>>>,
    epoch: u64,
    interrupted: E,
    outcome: Option<Result<T, E>>,
}

impl<T: Clone, E: Clone> Drop for SettleGuard<T, E> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .take()
            .unwrap_or_else(|| Err(self.interrupted.clone()));

        let waiters = {
            let mut state = lock(&self.state);
            if !state.in_flight || state.epoch != self.epoch {
                return;
            }
            state.in_flight = false;
            state.task = None;
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            (waiter.continuation)(outcome.clone());
        }
    }
}

fn enqueue<T, E>(waiters: &mut VecDeque<Waiter<T, E>>, waiter: Waiter<T, E>) {
    let at = waiters.partition_point(|queued| queued.stamp <= waiter.stamp);
    waiters.insert(at, waiter);
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
