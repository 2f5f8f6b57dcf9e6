//! # Request Lifecycle Controller
//!
//! Tracks loading, data and error for one kind of action (fetch a page,
//! delete a row, grant a permission).
//!
//! ## Invocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  controller.run(api.delete(kind, id))                                  │
//! │       │                                                                 │
//! │       ├── seq = 7, state.begin()          loading=true, error=None     │
//! │       │                                                                 │
//! │       ├── await the call (one network request)                         │
//! │       │                                                                 │
//! │       ├── newer invocation started meanwhile?                          │
//! │       │      yes ──► outcome returned, state untouched                 │
//! │       │      no  ──► state.succeed(data) / state.fail(message)         │
//! │       │                                                                 │
//! │       └── outcome returned to the caller                               │
//! │                                                                         │
//! │  The controller never writes the ResourceStore. The caller does,       │
//! │  on success, after looking at the returned outcome.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use stockroom_core::RequestState;

use crate::error::ClientResult;

pub struct RequestController<T> {
    label: String,
    state: watch::Sender<RequestState<T>>,
    seq: AtomicU64,
}

impl<T> RequestController<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an idle controller. Nothing is sent until [`run`](Self::run).
    pub fn new(label: impl Into<String>) -> Self {
        let (state, _) = watch::channel(RequestState::default());
        RequestController {
            label: label.into(),
            state,
            seq: AtomicU64::new(0),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> RequestState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.state.subscribe()
    }

    /// Runs one invocation and records its outcome.
    pub async fn run<F>(&self, call: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        self.state.send_modify(|s| s.begin());
        debug!(%request_id, label = %self.label, seq, "Request started");

        let outcome = call.await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if self.seq.load(Ordering::SeqCst) != seq {
            debug!(%request_id, label = %self.label, seq, "Discarding superseded outcome");
            return outcome;
        }

        match &outcome {
            Ok(data) => {
                info!(%request_id, label = %self.label, elapsed_ms, "Request succeeded");
                let data = data.clone();
                self.state.send_modify(move |s| s.succeed(data));
            }
            Err(e) => {
                warn!(%request_id, label = %self.label, elapsed_ms, error = %e, "Request failed");
                let message = e.user_message();
                self.state.send_modify(move |s| s.fail(message));
            }
        }
        outcome
    }

    /// Back to idle. An in-flight invocation still lands when it completes.
    pub fn reset(&self) {
        self.state.send_modify(|s| s.reset());
    }
}
