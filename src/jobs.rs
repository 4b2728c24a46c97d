//! Cancellable simulated jobs.
//!
//! Every simulated call (fetch, script, prompts, clip render) runs as a tokio
//! task that sleeps for its latency and then applies one update. Each task is
//! registered under a [`JobKey`]; starting a new job for a key cancels the one
//! before it, so a stale callback never writes over newer state.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::pipeline::model::Stage;

/// Identifies one logical job slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JobKey {
    /// The single in-flight generation of a stage.
    Stage(Stage),
    /// The pending render of one clip.
    Clip(String),
}

impl JobKey {
    /// The stage a job belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            JobKey::Stage(stage) => *stage,
            JobKey::Clip(_) => Stage::VideoGeneration,
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKey::Stage(stage) => write!(f, "stage:{}", stage),
            JobKey::Clip(id) => write!(f, "clip:{}", id),
        }
    }
}

/// Proof of registration handed to a task.
#[derive(Debug, Clone)]
pub struct JobTicket {
    key: JobKey,
    generation: u64,
    token: CancellationToken,
}

impl JobTicket {
    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Live cancellation tokens, one per key.
#[derive(Debug, Default)]
pub struct JobRegistry {
    next_generation: u64,
    active: HashMap<JobKey, (u64, CancellationToken)>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new job for `key`, cancelling any previous one.
    pub fn start(&mut self, key: JobKey) -> JobTicket {
        self.start_with(key, CancellationToken::new())
    }

    /// Like [`start`](Self::start), but the token is also cancelled with `parent`.
    pub fn start_child(&mut self, key: JobKey, parent: &CancellationToken) -> JobTicket {
        self.start_with(key, parent.child_token())
    }

    fn start_with(&mut self, key: JobKey, token: CancellationToken) -> JobTicket {
        self.cancel(&key);
        self.next_generation += 1;
        let generation = self.next_generation;
        self.active.insert(key.clone(), (generation, token.clone()));
        JobTicket {
            key,
            generation,
            token,
        }
    }

    /// Cancels the job registered for `key`. Returns whether one existed.
    pub fn cancel(&mut self, key: &JobKey) -> bool {
        match self.active.remove(key) {
            Some((_, token)) => {
                token.cancel();
                tracing::debug!(job = %key, "Cancelled job");
                true
            }
            None => false,
        }
    }

    /// Cancels every job belonging to `stage`. Returns how many were cancelled.
    pub fn cancel_stage(&mut self, stage: Stage) -> usize {
        let keys: Vec<JobKey> = self
            .active
            .keys()
            .filter(|key| key.stage() == stage)
            .cloned()
            .collect();
        keys.iter().filter(|key| self.cancel(key)).count()
    }

    /// Cancels everything.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.active.len();
        for (_, (_, token)) in self.active.drain() {
            token.cancel();
        }
        count
    }

    /// Drops the registration of a job that has run to completion.
    ///
    /// A newer job registered under the same key is left alone.
    pub fn finish(&mut self, ticket: &JobTicket) {
        let current = self
            .active
            .get(&ticket.key)
            .is_some_and(|(generation, _)| *generation == ticket.generation);
        if current {
            self.active.remove(&ticket.key);
        }
    }

    pub fn is_active(&self, key: &JobKey) -> bool {
        self.active
            .get(key)
            .is_some_and(|(_, token)| !token.is_cancelled())
    }

    /// True while any job of `stage` is pending.
    pub fn has_active(&self, stage: Stage) -> bool {
        self.active
            .iter()
            .any(|(key, (_, token))| key.stage() == stage && !token.is_cancelled())
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
}

/// Handle to the tasks started by one operation.
pub struct Job {
    key: JobKey,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Job {
    pub(crate) fn new(key: JobKey, token: CancellationToken) -> Self {
        Self {
            key,
            token,
            tracker: TaskTracker::new(),
        }
    }

    pub(crate) fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tracker.spawn(task);
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    /// Cancels all tasks of this job that have not applied their update yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for every task of this job to finish or bail out.
    pub async fn join(self) -> JobOutcome {
        self.tracker.close();
        self.tracker.wait().await;
        if self.token.is_cancelled() {
            JobOutcome::Cancelled
        } else {
            JobOutcome::Completed
        }
    }
}

/// Sleeps for `delay`. Returns false if `token` was cancelled first.
pub async fn wait_for(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
