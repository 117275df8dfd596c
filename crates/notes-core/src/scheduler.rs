//! SaveScheduler: decides when the editor's draft is persisted.
//!
//! The scheduler runs as a single tokio task that owns the `EditorSession`,
//! every timer and the in-flight save. Callers talk to it through the
//! `SaveScheduler` handle, which only sends commands. Because one task
//! processes commands, timer expiries and save completions in turn:
//!
//! 1. At most one save is in flight. Triggers that arrive meanwhile are
//!    coalesced into one queued attempt that runs when the save succeeds.
//! 2. Snapshot and identity are updated in the same step that observes the
//!    save result, before any other trigger is looked at.
//! 3. A save issued before `new_document`/`load` finishes normally but its
//!    result is dropped (the session generation no longer matches).

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::AutosaveConfig;
use crate::error::SaveError;
use crate::events::{EventBus, SaveEvent, SaveStatus, SaveTrigger, Subscription};
use crate::note::Note;
use crate::resolver::IdentityResolver;
use crate::session::{Draft, EditorSession, SaveRequest, SessionState};
use crate::store::NoteStore;

/// Result of a save that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The store accepted the save and the session adopted the result.
    Saved { note: Note, created: bool },
    /// The session was reset before the save finished; the result was dropped.
    Discarded,
}

type Reply = oneshot::Sender<Result<SaveOutcome, SaveError>>;
type SaveFuture = BoxFuture<'static, (SaveRequest, Result<Note, SaveError>)>;

enum Command {
    ValueChanged(String),
    TitleChanged(String),
    Start,
    Stop,
    NewDocument,
    Load(Note),
    SaveNow(Reply),
    State(oneshot::Sender<SessionState>),
    Shutdown,
}

/// Handle to a running save scheduler.
///
/// Dropping the handle ends the scheduler the same way `shutdown` does,
/// without waiting for it.
pub struct SaveScheduler {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    events: Arc<EventBus>,
    task: JoinHandle<()>,
}

impl SaveScheduler {
    /// Spawn a scheduler for `draft` on the current tokio runtime.
    ///
    /// The scheduler starts stopped; call `start` to arm its timers. The
    /// initial content counts as saved.
    pub fn spawn<S>(store: Arc<S>, config: AutosaveConfig, draft: Draft) -> Self
    where
        S: NoteStore + ?Sized + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let events = Arc::new(EventBus::new());

        let worker = Worker {
            config,
            session: EditorSession::new(draft),
            resolver: IdentityResolver::new(store),
            events: Arc::clone(&events),
            status: status_tx,
            started: false,
            debounce_at: None,
            revert_at: None,
            periodic: None,
            in_flight: None,
            queued: None,
        };
        let task = tokio::spawn(worker.run(command_rx));

        Self {
            commands,
            status,
            events,
            task,
        }
    }

    /// Enable autosave. Timers are armed whenever the document can be saved
    /// (non-blank title and some content).
    pub fn start(&self) {
        self.send(Command::Start);
    }

    /// Disable autosave and cancel every pending timer. An in-flight save
    /// still completes and is adopted.
    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    /// Deliver the editor's new content.
    pub fn on_value_changed(&self, content: impl Into<String>) {
        self.send(Command::ValueChanged(content.into()));
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.send(Command::TitleChanged(title.into()));
    }

    /// Start a fresh, unsaved document. The next save creates a new note.
    pub fn new_document(&self) {
        self.send(Command::NewDocument);
    }

    /// Switch the session to a stored note.
    pub fn load(&self, note: Note) {
        self.send(Command::Load(note));
    }

    /// Save immediately, skipping the debounce wait and redundancy check.
    ///
    /// Still subject to the enablement check and to the single in-flight
    /// rule: if a save is running, this one is queued behind it.
    pub async fn save_now(&self) -> Result<SaveOutcome, SaveError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::SaveNow(reply))
            .map_err(|_| SaveError::Closed)?;
        rx.await.map_err(|_| SaveError::Closed)?
    }

    /// Current session state, or `None` if the scheduler has stopped running.
    pub async fn session(&self) -> Option<SessionState> {
        let (reply, rx) = oneshot::channel();
        self.commands.send(Command::State(reply)).ok()?;
        rx.await.ok()
    }

    pub fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }

    /// Receiver that observes the latest status.
    pub fn watch_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Receive every `SaveEvent` until the returned handle is dropped.
    pub fn subscribe(&self, callback: impl Fn(SaveEvent) + Send + Sync + 'static) -> Subscription {
        self.events.subscribe(callback)
    }

    /// Cancel timers, wait for an in-flight save and stop the task.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            error!("Save scheduler task failed: {}", e);
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("Save scheduler is not running, command dropped");
        }
    }
}

/// A save that has been handed to the store.
struct Attempt {
    trigger: SaveTrigger,
    waiters: Vec<Reply>,
    future: SaveFuture,
}

/// Triggers coalesced while a save was in flight.
struct Queued {
    trigger: SaveTrigger,
    force: bool,
    waiters: Vec<Reply>,
}

struct Worker<S: ?Sized> {
    config: AutosaveConfig,
    session: EditorSession,
    resolver: IdentityResolver<S>,
    events: Arc<EventBus>,
    status: watch::Sender<SaveStatus>,
    started: bool,
    debounce_at: Option<Instant>,
    revert_at: Option<Instant>,
    periodic: Option<Interval>,
    in_flight: Option<Attempt>,
    queued: Option<Queued>,
}

impl<S> Worker<S>
where
    S: NoteStore + ?Sized + 'static,
{
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                (request, result) = settle(&mut self.in_flight) => {
                    self.finish(request, result);
                }
                _ = wait_until(self.debounce_at) => {
                    self.debounce_at = None;
                    self.trigger(SaveTrigger::Debounce, None);
                }
                _ = next_tick(&mut self.periodic) => {
                    self.trigger(SaveTrigger::Interval, None);
                }
                _ = wait_until(self.revert_at) => {
                    self.revert_at = None;
                    self.set_status(SaveStatus::Idle);
                }
            }
        }

        self.teardown().await;
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::ValueChanged(content) => {
                let was_enabled = self.session.is_enabled();
                if self.session.set_content(content) {
                    self.rearm_debounce();
                    self.enablement_changed(was_enabled);
                }
            }
            Command::TitleChanged(title) => {
                let was_enabled = self.session.is_enabled();
                self.session.set_title(title);
                if !self.session.is_enabled() {
                    self.debounce_at = None;
                } else if !was_enabled {
                    self.rearm_debounce();
                }
                self.enablement_changed(was_enabled);
            }
            Command::Start => {
                if self.started {
                    return;
                }
                self.started = true;
                self.rearm_periodic();
                self.rearm_debounce();
                info!(
                    "Autosave started (debounce {:?}, interval {:?})",
                    self.config.debounce, self.config.interval
                );
            }
            Command::Stop => {
                self.started = false;
                self.cancel_timers();
                if self.queued.as_ref().is_some_and(|q| q.waiters.is_empty()) {
                    self.queued = None;
                }
                info!("Autosave stopped");
            }
            Command::NewDocument => {
                let title = self.config.default_title.clone();
                self.session.new_document(&title);
                self.reset();
                info!("Started new document '{}'", title);
            }
            Command::Load(note) => {
                self.session.load(&note);
                self.reset();
                info!("Loaded note {} ('{}')", note.id, note.title);
            }
            Command::SaveNow(reply) => self.trigger(SaveTrigger::Manual, Some(reply)),
            Command::State(reply) => {
                let _ = reply.send(self.session.state());
            }
            Command::Shutdown => {}
        }
    }

    /// Request a save attempt. Manual requests carry a reply and force the save.
    fn trigger(&mut self, trigger: SaveTrigger, reply: Option<Reply>) {
        let force = reply.is_some();

        if self.in_flight.is_some() {
            let queued = self.queued.get_or_insert_with(|| Queued {
                trigger,
                force: false,
                waiters: Vec::new(),
            });
            queued.force |= force;
            queued.waiters.extend(reply);
            debug!("Save in flight, queued {:?} trigger", trigger);
            self.events.emit(SaveEvent::Coalesced { trigger });
            return;
        }

        match self.session.prepare(force) {
            Ok(request) => self.launch(request, trigger, reply.into_iter().collect()),
            Err(skip) => {
                debug!("Skipping {:?} save: {}", trigger, skip);
                if let Some(reply) = reply {
                    let _ = reply.send(Err(skip));
                }
            }
        }
    }

    fn launch(&mut self, request: SaveRequest, trigger: SaveTrigger, waiters: Vec<Reply>) {
        self.revert_at = None;
        self.set_status(SaveStatus::Saving);
        debug!(
            "Saving '{}' ({} bytes, {:?} trigger)",
            request.title,
            request.content.len(),
            trigger
        );

        let resolver = self.resolver.clone();
        let future = async move {
            let result = resolver.persist(&request).await;
            (request, result)
        }
        .boxed();

        self.in_flight = Some(Attempt {
            trigger,
            waiters,
            future,
        });
    }

    fn finish(&mut self, request: SaveRequest, result: Result<Note, SaveError>) {
        let Some(attempt) = self.in_flight.take() else {
            return;
        };

        if !self.session.is_current(&request) {
            let note_id = match &result {
                Ok(note) => Some(note.id),
                Err(e) => {
                    warn!("Save for a previous document failed: {}", e);
                    None
                }
            };
            info!("Discarding save result for a previous document");
            self.events.emit(SaveEvent::Discarded { note_id });
            reply_all(attempt.waiters, Ok(SaveOutcome::Discarded));
            self.run_queued();
            return;
        }

        match result {
            Ok(note) => {
                let created = self.session.record_saved(&request, &note);
                if created {
                    info!("Created note {} ('{}')", note.id, note.title);
                } else {
                    debug!("Updated note {}", note.id);
                }

                self.set_status(SaveStatus::Saved);
                if self.started {
                    self.revert_at = Some(Instant::now() + self.config.status_revert);
                } else {
                    self.set_status(SaveStatus::Idle);
                }

                self.events.emit(SaveEvent::Saved {
                    id: note.id,
                    created,
                    trigger: attempt.trigger,
                });
                reply_all(attempt.waiters, Ok(SaveOutcome::Saved { note, created }));
                self.run_queued();
            }
            Err(e) => {
                error!("Auto-save failed: {}", e);
                self.set_status(SaveStatus::Idle);
                self.events.emit(SaveEvent::Failed {
                    error: e.clone(),
                    trigger: attempt.trigger,
                });
                reply_all(attempt.waiters, Err(e.clone()));

                // No immediate retry: the next debounce or tick will try again.
                if let Some(queued) = self.queued.take() {
                    reply_all(queued.waiters, Err(e));
                }
            }
        }
    }

    fn run_queued(&mut self) {
        let Some(queued) = self.queued.take() else {
            return;
        };

        match self.session.prepare(queued.force) {
            Ok(request) => {
                debug!("Running queued {:?} save", queued.trigger);
                self.launch(request, queued.trigger, queued.waiters);
            }
            Err(skip) => {
                debug!("Queued {:?} save not needed: {}", queued.trigger, skip);
                reply_all(queued.waiters, Err(skip));
            }
        }
    }

    fn rearm_debounce(&mut self) {
        self.debounce_at = if self.started && self.session.is_enabled() {
            Some(Instant::now() + self.config.debounce)
        } else {
            None
        };
    }

    /// The periodic timer only runs while saving is enabled. It restarts a
    /// full period after enablement comes back.
    fn enablement_changed(&mut self, was_enabled: bool) {
        if self.session.is_enabled() != was_enabled {
            self.rearm_periodic();
        }
    }

    fn rearm_periodic(&mut self) {
        self.periodic = if self.started && self.session.is_enabled() {
            periodic(self.config.interval)
        } else {
            None
        };
    }

    fn cancel_timers(&mut self) {
        self.debounce_at = None;
        self.periodic = None;
        if self.revert_at.take().is_some() {
            self.set_status(SaveStatus::Idle);
        }
    }

    /// Common part of `new_document` and `load`.
    fn reset(&mut self) {
        self.debounce_at = None;
        self.revert_at = None;
        if let Some(queued) = self.queued.take() {
            reply_all(queued.waiters, Ok(SaveOutcome::Discarded));
        }
        self.rearm_periodic();
        self.set_status(SaveStatus::Idle);
    }

    async fn teardown(&mut self) {
        self.started = false;
        self.cancel_timers();
        if let Some(queued) = self.queued.take() {
            reply_all(queued.waiters, Ok(SaveOutcome::Discarded));
        }

        if self.in_flight.is_some() {
            debug!("Waiting for in-flight save before shutdown");
            let (request, result) = settle(&mut self.in_flight).await;
            self.finish(request, result);
        }
        debug!("Save scheduler stopped");
    }

    fn set_status(&mut self, status: SaveStatus) {
        if *self.status.borrow() == status {
            return;
        }
        self.status.send_replace(status);
        self.events.emit(SaveEvent::StatusChanged { status });
    }
}

/// Periodic backstop timer. The first tick is one full period away; a zero
/// period disables it.
fn periodic(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(interval)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn settle(attempt: &mut Option<Attempt>) -> (SaveRequest, Result<Note, SaveError>) {
    match attempt {
        Some(attempt) => (&mut attempt.future).await,
        None => pending().await,
    }
}

fn reply_all(waiters: Vec<Reply>, result: Result<SaveOutcome, SaveError>) {
    for waiter in waiters {
        let _ = waiter.send(result.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_period_disables_periodic() {
        assert!(periodic(Duration::ZERO).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_first_tick_is_one_period_away() {
        let start = Instant::now();
        let mut interval = periodic(Duration::from_secs(30)).unwrap();

        interval.tick().await;

        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_none_never_completes() {
        let result = time::timeout(Duration::from_secs(60), wait_until(None)).await;
        assert!(result.is_err());
    }
}
