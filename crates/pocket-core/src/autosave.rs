//! Periodic draft saving
//!
//! While a capsule is being edited, a background task re-saves the draft on
//! a fixed interval. A manual save goes through [`save_draft`] on the same
//! shared store, so whichever `put` runs last wins.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::models::Capsule;
use crate::storage::KvStore;
use crate::store::Store;

/// Store shared between the autosave task and the editor
pub type SharedStore<K> = Arc<Mutex<Store<K>>>;

/// Draft shared between the autosave task and the editor
pub type SharedDraft = Arc<Mutex<Capsule>>;

/// Handle to a running autosave task
///
/// Dropping the handle cancels the task.
pub struct AutosaveHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    saves: Arc<AtomicUsize>,
}

impl AutosaveHandle {
    /// Number of ticks that saved successfully
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Stop the task and wait for it to finish
    ///
    /// A save already in progress completes first.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Autosave task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Touch the draft and save a snapshot of it
pub async fn save_draft<K: KvStore>(store: &SharedStore<K>, draft: &SharedDraft) -> Result<()> {
    let snapshot = {
        let mut draft = draft.lock().await;
        draft.touch();
        draft.clone()
    };
    store.lock().await.put(&snapshot)
}

/// Spawn a task that saves `draft` every `interval`
///
/// The first save happens one interval after the call.
pub fn spawn_autosave<K>(
    store: SharedStore<K>,
    draft: SharedDraft,
    interval: Duration,
) -> AutosaveHandle
where
    K: KvStore + 'static,
{
    let (stop_tx, stop_rx) = oneshot::channel();
    let saves = Arc::new(AtomicUsize::new(0));

    let task = tokio::spawn(autosave_loop(
        store,
        draft,
        interval,
        stop_rx,
        Arc::clone(&saves),
    ));

    AutosaveHandle {
        stop_tx: Some(stop_tx),
        task: Some(task),
        saves,
    }
}

async fn autosave_loop<K: KvStore>(
    store: SharedStore<K>,
    draft: SharedDraft,
    period: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    saves: Arc<AtomicUsize>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                match save_draft(&store, &draft).await {
                    Ok(()) => {
                        let count = saves.fetch_add(1, Ordering::SeqCst) + 1;
                        debug!("Autosaved draft ({} saves)", count);
                    }
                    Err(e) => warn!("Autosave failed: {:#}", e),
                }
            }
        }
    }
    debug!("Autosave stopped");
}
