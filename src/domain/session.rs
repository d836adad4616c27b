//! Keeps the login session alive. When requests start failing because the session expired, the
//! [RefreshCoordinator] makes sure only one refresh goes out no matter how many requests failed,
//! and hands its outcome to everybody who was waiting on it.

use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info};

pub mod driven_ports {
    /// Renews the session with the server (e.g. by exchanging a refresh cookie)
    pub trait SessionRefresher {
        async fn refresh_session(&self) -> Result<(), anyhow::Error>;
    }
}

/// Whether the client currently believes it has a usable session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    /// The last refresh failed. The user has to log in again.
    Expired { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("refreshing the session failed: {0}")]
    RefreshFailed(String),
    #[error("the session refresh was abandoned before it finished")]
    Abandoned,
}

type Waiter = oneshot::Sender<Result<(), SessionError>>;

struct RefreshState {
    /// Bumped after every successful refresh or login
    generation: u64,
    in_flight: bool,
    waiters: Vec<Waiter>,
    /// Set when the refresh for the current generation failed. Cleared by the next login.
    failure: Option<SessionError>,
}

/// Serializes session refreshes for one API client.
///
/// Callers read [RefreshCoordinator::generation] before sending a request. If the request comes back
/// with an auth failure they call [RefreshCoordinator::refresh_after] with that generation:
///
/// * a refresh finished since the request went out: returns immediately, just replay the request
/// * the last refresh failed and nobody logged in since: returns that failure
/// * a refresh is in flight: waits for it and returns its outcome
/// * otherwise: this caller runs the refresh and shares the outcome with everyone who queued up
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    status: watch::Sender<SessionStatus>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus::Active);
        RefreshCoordinator {
            state: Mutex::new(RefreshState {
                generation: 0,
                in_flight: false,
                waiters: Vec::new(),
                failure: None,
            }),
            status,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn generation(&self) -> u64 {
        self.lock_state().generation
    }

    /// Number of requests parked behind the in-flight refresh
    pub fn queued(&self) -> usize {
        self.lock_state().waiters.len()
    }

    /// Watches the session status. Flips to [SessionStatus::Expired] when a refresh fails.
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    /// Records a fresh login. Requests that were sent before it are treated as already refreshed.
    pub fn mark_logged_in(&self) {
        {
            let mut state = self.lock_state();
            state.generation += 1;
            state.failure = None;
        }
        self.status.send_replace(SessionStatus::Active);
    }

    /// Makes sure the session has been refreshed since [seen_generation], running the refresh if
    /// nobody else is.
    pub async fn refresh_after(
        &self,
        seen_generation: u64,
        refresher: &impl driven_ports::SessionRefresher,
    ) -> Result<(), SessionError> {
        let parked = {
            let mut state = self.lock_state();
            if state.generation > seen_generation {
                return Ok(());
            }
            if let Some(failure) = &state.failure {
                return Err(failure.clone());
            }

            if state.in_flight {
                let (sender, receiver) = oneshot::channel();
                state.waiters.push(sender);
                Some(receiver)
            } else {
                state.in_flight = true;
                None
            }
        };

        if let Some(receiver) = parked {
            debug!("Waiting on the in-flight session refresh");
            return receiver.await.unwrap_or(Err(SessionError::Abandoned));
        }

        let mut leader = LeaderGuard {
            coordinator: self,
            finished: false,
        };
        info!("Session expired, refreshing");
        let outcome = refresher
            .refresh_session()
            .await
            .map_err(|err| SessionError::RefreshFailed(format!("{err:#}")));
        leader.finish(&outcome);

        outcome
    }

    fn settle(&self, outcome: &Result<(), SessionError>) {
        let waiters = {
            let mut state = self.lock_state();
            state.in_flight = false;
            match outcome {
                Ok(()) => state.generation += 1,
                Err(err) => state.failure = Some(err.clone()),
            }
            std::mem::take(&mut state.waiters)
        };

        match outcome {
            Ok(()) => {
                self.status.send_replace(SessionStatus::Active);
            }
            Err(err) => {
                error!("Session refresh failed, {} queued requests rejected: {err}", waiters.len());
                self.status.send_replace(SessionStatus::Expired {
                    reason: err.to_string(),
                });
            }
        }

        for waiter in waiters {
            // The waiting request may have been dropped already
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Clears the in-flight flag if the refreshing future is dropped before the refresh finishes, so
/// the coordinator doesn't stay stuck. Parked waiters see [SessionError::Abandoned].
struct LeaderGuard<'coord> {
    coordinator: &'coord RefreshCoordinator,
    finished: bool,
}

impl LeaderGuard<'_> {
    fn finish(&mut self, outcome: &Result<(), SessionError>) {
        self.finished = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let mut state = self.coordinator.lock_state();
        state.in_flight = false;
        state.waiters.clear();
    }
}


#[cfg(test)]
pub(crate) mod test_util {
    use super::driven_ports::SessionRefresher;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Refresher that counts its calls and can be held open until [FakeRefresher::release]
    pub struct FakeRefresher {
        calls: AtomicUsize,
        result: Result<(), String>,
        gate: Option<Notify>,
    }

    impl FakeRefresher {
        pub fn new(result: Result<(), String>) -> FakeRefresher {
            FakeRefresher {
                calls: AtomicUsize::new(0),
                result,
                gate: None,
            }
        }

        pub fn gated(result: Result<(), String>) -> FakeRefresher {
            FakeRefresher {
                gate: Some(Notify::new()),
                ..Self::new(result)
            }
        }

        pub fn release(&self) {
            if let Some(gate) = &self.gate {
                gate.notify_one();
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl SessionRefresher for FakeRefresher {
        async fn refresh_session(&self) -> Result<(), anyhow::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            self.result.clone().map_err(|msg| anyhow!(msg))
        }
    }
}
