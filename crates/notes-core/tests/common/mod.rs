//! Shared helpers for scheduler integration tests.
//!
//! All tests run on tokio's paused clock, so every recorded offset is exact.

#![allow(dead_code)]

use async_trait::async_trait;
use notes_core::store::Result;
use notes_core::{
    InMemoryStore, Note, NoteId, NoteStore, NoteSummary, SaveEvent, SaveScheduler, SaveStatus,
    StoreError, Subscription,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Which collaborator operation was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Update(NoteId),
}

/// One store call, stamped with its offset from the test start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: Op,
    pub at: Duration,
    pub content: String,
}

/// Store that records every create/update, can be slowed down and can be
/// told to fail.
pub struct RecordingStore {
    inner: InMemoryStore,
    start: Instant,
    calls: Mutex<Vec<Call>>,
    delay: Mutex<Duration>,
    failures: Mutex<VecDeque<StoreError>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            start: Instant::now(),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
            failures: Mutex::new(VecDeque::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    /// Backing store, for setting up or tampering with records directly.
    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    /// Make every subsequent create/update take `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Fail the next create/update with `error`.
    pub fn fail_next(&self, error: StoreError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_offsets(&self) -> Vec<Duration> {
        self.calls().into_iter().map(|c| c.at).collect()
    }

    /// Highest number of create/update calls that were running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    async fn record(&self, op: Op, content: &str) -> Result<()> {
        self.calls.lock().unwrap().push(Call {
            op,
            at: self.start.elapsed(),
            content: content.to_string(),
        });

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        match self.failures.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NoteStore for RecordingStore {
    async fn create(&self, title: &str, content: &str) -> Result<Note> {
        self.record(Op::Create, content).await?;
        self.inner.create(title, content).await
    }

    async fn update(&self, id: NoteId, title: &str, content: &str) -> Result<Note> {
        self.record(Op::Update(id), content).await?;
        self.inner.update(id, title, content).await
    }

    async fn get(&self, id: NoteId) -> Result<Note> {
        self.inner.get(id).await
    }

    async fn delete(&self, id: NoteId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> Result<Vec<NoteSummary>> {
        self.inner.list().await
    }
}

/// Collects every event a scheduler emits, with offsets from `start`.
pub struct EventLog {
    entries: Arc<Mutex<Vec<(SaveEvent, Duration)>>>,
    _subscription: Subscription,
}

impl EventLog {
    pub fn attach(scheduler: &SaveScheduler, start: Instant) -> Self {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&entries);
        let subscription = scheduler.subscribe(move |event| {
            sink.lock().unwrap().push((event, start.elapsed()));
        });
        Self {
            entries,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<SaveEvent> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(event, _)| event.clone())
            .collect()
    }

    /// Status transitions in order, with the offset each happened at.
    pub fn statuses(&self) -> Vec<(SaveStatus, Duration)> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(event, at)| match event {
                SaveEvent::StatusChanged { status } => Some((*status, *at)),
                _ => None,
            })
            .collect()
    }
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Sleep on the paused clock.
pub async fn advance(millis: u64) {
    tokio::time::sleep(ms(millis)).await;
}
