//! Playback driver - runs a [`StoryRuntime`] against the tokio clock.
//!
//! The runtime itself only knows virtual time. The driver owns it behind a
//! mutex, advances it by the real time elapsed since the last pump, and
//! publishes what changed: snapshots on a `watch` channel and events on a
//! `broadcast` channel. Actions from the UI go through the same mutex, so
//! they always see a runtime that is caught up to the present.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use story_graph::{GraphStore, NodeId};
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::events::RuntimeEvent;
use crate::runtime::{ChoiceOutcome, RuntimeSnapshot, StoryRuntime};

/// Events a slow subscriber may fall behind by before it starts lagging.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

struct Clocked<G> {
    runtime: StoryRuntime<G>,
    last_pump: Instant,
}

impl<G: GraphStore> Clocked<G> {
    /// Advance the runtime by the wall time since the previous call.
    fn catch_up(&mut self) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_pump);
        self.last_pump = now;
        self.runtime.advance(elapsed);
    }
}

struct Shared<G> {
    clocked: Mutex<Clocked<G>>,
    snapshot_tx: watch::Sender<RuntimeSnapshot>,
    events_tx: broadcast::Sender<RuntimeEvent>,
    wake: Notify,
}

impl<G: GraphStore> Shared<G> {
    fn lock(&self) -> MutexGuard<'_, Clocked<G>> {
        self.clocked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, runtime: &mut StoryRuntime<G>) {
        for event in runtime.drain_events() {
            tracing::trace!(event = event.name(), "publishing runtime event");
            // No subscribers is fine
            let _ = self.events_tx.send(event);
        }

        let snapshot = runtime.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn pump(&self) {
        let mut clocked = self.lock();
        clocked.catch_up();
        self.publish(&mut clocked.runtime);
    }
}

/// A runtime driven in the background by a tokio task.
///
/// Dropping the handle stops the driver.
pub struct Playback<G> {
    shared: Arc<Shared<G>>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<G: GraphStore + Send + 'static> Playback<G> {
    /// Take ownership of a runtime and start driving its clock.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(runtime: StoryRuntime<G>) -> Self {
        let tick = runtime.config().tick_interval();
        let (snapshot_tx, _) = watch::channel(runtime.snapshot());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let shared = Arc::new(Shared {
            clocked: Mutex::new(Clocked {
                runtime,
                last_pump: Instant::now(),
            }),
            snapshot_tx,
            events_tx,
            wake: Notify::new(),
        });

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(drive(Arc::clone(&shared), tick, shutdown_rx));

        Self {
            shared,
            shutdown,
            task: Some(task),
        }
    }

    /// Begin a playthrough.
    pub fn start(&self, start_node_id: impl Into<NodeId>) {
        let start = start_node_id.into();
        self.with_runtime(|runtime| runtime.start(start));
    }

    /// Leave play mode.
    pub fn stop(&self) {
        self.with_runtime(StoryRuntime::stop);
    }

    /// Replay from scratch.
    pub fn reset(&self, start_node_id: impl Into<NodeId>) {
        let start = start_node_id.into();
        self.with_runtime(|runtime| runtime.reset(start));
    }

    /// Resolve a player choice.
    pub fn resolve_choice(&self, choice_id: impl Into<NodeId>) -> ChoiceOutcome {
        let choice = choice_id.into();
        self.with_runtime(|runtime| runtime.resolve_choice(choice))
    }

    /// Run `f` against the caught-up runtime, then publish its changes.
    ///
    /// This is also the editor's way in: graph edits made here are seen by
    /// the next timer dispatch.
    pub fn with_runtime<R>(&self, f: impl FnOnce(&mut StoryRuntime<G>) -> R) -> R {
        let result = {
            let mut clocked = self.shared.lock();
            clocked.catch_up();
            let result = f(&mut clocked.runtime);
            self.shared.publish(&mut clocked.runtime);
            result
        };
        // Immediate scenes run on the driver, not inside the action
        self.shared.wake.notify_one();
        result
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> RuntimeSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<RuntimeSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RuntimeEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Stop the driver and wait for it to finish.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "playback driver ended abnormally");
            }
        }
    }
}

impl<G> Drop for Playback<G> {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

async fn drive<G: GraphStore>(
    shared: Arc<Shared<G>>,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(tick_ms = tick.as_millis() as u64, "playback driver started");

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shared.wake.notified() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }

        shared.pump();
    }

    tracing::info!("playback driver stopped");
}
