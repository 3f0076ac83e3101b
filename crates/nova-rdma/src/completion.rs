use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::operation::TransportError;
use crate::request_id::RequestId;

#[derive(Debug, Clone)]
enum CompletionState {
    Pending,
    Done(Result<(), TransportError>),
}

/// Tracks which requests have completed and lets callers block on "one more request finished",
/// per the Design Notes' completion-queue sketch: a per-thread poller would drain completions
/// off the transport and call [`CompletionQueue::complete`]. Every [`StoCTransport`]
/// (`crate::StoCTransport`) impl in this crate runs synchronously and calls `complete` itself
/// before the new request's id is returned to the caller, so no separate poller thread is
/// needed to observe completions.
#[derive(Debug)]
pub(crate) struct CompletionQueue {
    states:      Mutex<HashMap<RequestId, CompletionState>>,
    done_tx:     Sender<RequestId>,
    done_rx:     Receiver<RequestId>,
}

impl Default for CompletionQueue {
    fn default() -> Self {
        let (done_tx, done_rx) = unbounded();
        Self { states: Mutex::new(HashMap::new()), done_tx, done_rx }
    }
}

impl CompletionQueue {
    pub(crate) fn register_pending(&self, id: RequestId) {
        self.states.lock().insert(id, CompletionState::Pending);
    }

    /// Marks `id` done, transitioning `is_done(id)` false -> true exactly once.
    pub(crate) fn complete(&self, id: RequestId, result: Result<(), TransportError>) {
        self.states.lock().insert(id, CompletionState::Done(result));
        // Unbounded and never closed (this struct owns both ends), so this cannot fail.
        let _ = self.done_tx.send(id);
    }

    #[must_use]
    pub(crate) fn is_done(&self, id: RequestId) -> bool {
        matches!(self.states.lock().get(&id), Some(CompletionState::Done(_)))
    }

    /// Removes and returns the result of a completed request. Returns `None` if the id is
    /// unknown or still pending.
    pub(crate) fn take_result(&self, id: RequestId) -> Option<Result<(), TransportError>> {
        let mut states = self.states.lock();
        match states.get(&id) {
            Some(CompletionState::Done(_)) => {}
            _ => return None,
        }
        match states.remove(&id) {
            Some(CompletionState::Done(result)) => Some(result),
            _ => unreachable!("checked Done above under the same lock"),
        }
    }

    /// Blocks until at least one outstanding request completes, returning its id. By the time
    /// this returns, `is_done(id)` for the returned id is already true.
    pub(crate) fn wait_any(&self) -> RequestId {
        self.done_rx.recv().expect("self owns the sending half, so the channel never closes")
    }
}
