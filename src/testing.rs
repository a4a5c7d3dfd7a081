use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::handle::{HandleId, PlayError, VideoHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Play(HandleId),
    Pause(HandleId),
}

// Shared between fake handles so ordering across handles can be asserted.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, call: Call) {
        self.0.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    pub fn plays_of(&self, id: HandleId) -> usize {
        self.count(Call::Play(id))
    }

    pub fn pauses_of(&self, id: HandleId) -> usize {
        self.count(Call::Pause(id))
    }

    fn count(&self, call: Call) -> usize {
        self.0.lock().iter().filter(|c| **c == call).count()
    }
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Resolve,
    Reject(PlayError),
    Defer,
}

#[derive(Debug)]
pub struct RecordingHandle {
    id: HandleId,
    log: CallLog,
    outcome: Outcome,
    pending: Mutex<Vec<oneshot::Sender<Result<(), PlayError>>>>,
}

impl RecordingHandle {
    pub fn new(log: &CallLog) -> Arc<Self> {
        Self::with_outcome(log, Outcome::Resolve)
    }

    pub fn with_outcome(log: &CallLog, outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            id: HandleId::new(),
            log: log.clone(),
            outcome,
            pending: Mutex::new(Vec::new()),
        })
    }

    pub fn settle(&self, result: Result<(), PlayError>) {
        for tx in self.pending.lock().drain(..) {
            let _ = tx.send(result.clone());
        }
    }
}

impl VideoHandle for RecordingHandle {
    fn id(&self) -> HandleId {
        self.id
    }

    fn play(&self) -> BoxFuture<'static, Result<(), PlayError>> {
        self.log.push(Call::Play(self.id));
        match &self.outcome {
            Outcome::Resolve => future::ready(Ok(())).boxed(),
            Outcome::Reject(err) => future::ready(Err(err.clone())).boxed(),
            Outcome::Defer => {
                let (tx, rx) = oneshot::channel();
                self.pending.lock().push(tx);
                async move { rx.await.unwrap_or(Err(PlayError::Detached)) }.boxed()
            }
        }
    }

    fn pause(&self) {
        self.log.push(Call::Pause(self.id));
    }
}
