//! Debounced, single-flight persistence
//!
//! [`SaveQueue::save`] follows a value source (a `watch` channel carrying the
//! caller's in-memory state) and persists it under a storage key:
//!
//! - consecutive identical values are ignored
//! - a value is written once no newer value arrived for the debounce interval
//! - writes for one key never overlap; a value that stabilises while a write
//!   is in flight waits in a single slot and is written next, and a newer
//!   stabilised value replaces it if the write has not started yet
//! - write failures are logged and notified, never propagated or retried
//!
//! Per key the queue moves `Idle -> Pending -> Saving -> Idle`; a new value
//! while `Pending` restarts the timer. Debouncing and writing run
//! concurrently inside one task per key, so a key can be debouncing its next
//! value while the previous one is being written.

use crate::error::Error;
use crate::platform::{NotificationLevel, Notifier};
use crate::storage::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, error};

/// Observable state of one storage key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Nothing to write
    Idle,
    /// A value is waiting for its debounce timer or for the running write
    Pending,
    /// A write is in flight
    Saving,
}

/// Per-key bookkeeping: the latest pending value and the in-flight flag
#[derive(Debug, Default)]
struct SaveEntry {
    debouncing: bool,
    queued: Option<Value>,
    in_flight: bool,
}

impl SaveEntry {
    fn is_busy(&self) -> bool {
        self.debouncing || self.queued.is_some() || self.in_flight
    }

    fn state(&self) -> SaveState {
        if self.in_flight {
            SaveState::Saving
        } else if self.debouncing || self.queued.is_some() {
            SaveState::Pending
        } else {
            SaveState::Idle
        }
    }
}

struct Shared {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    entries: Mutex<HashMap<String, SaveEntry>>,
    saving: watch::Sender<bool>,
}

impl Shared {
    /// Mutate the entry of `key`, then publish the global saving flag if it flipped
    fn with_entry<R>(&self, key: &str, f: impl FnOnce(&mut SaveEntry) -> R) -> R {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(entries.entry(key.to_string()).or_default());
        let busy = entries.values().any(SaveEntry::is_busy);
        drop(entries);

        self.saving.send_if_modified(|saving| {
            let flipped = *saving != busy;
            *saving = busy;
            flipped
        });
        result
    }

    fn forget(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| !entry.is_busy()) {
            entries.remove(key);
        }
    }

    fn report(&self, err: Error, advice: &str) {
        match std::error::Error::source(&err) {
            Some(source) => error!("[SAVE-QUEUE] {}: {}", err, source),
            None => error!("[SAVE-QUEUE] {}", err),
        }
        self.notifier
            .notify(NotificationLevel::Error, &format!("{}. {}", err, advice));
    }

    async fn write(&self, key: &str, value: Value) {
        debug!("[SAVE-QUEUE] Writing {}", key);
        match self.store.write(key, &value).await {
            Ok(()) => debug!("[SAVE-QUEUE] Saved {}", key),
            Err(source) => self.report(
                Error::StoreWrite {
                    key: key.to_string(),
                    source,
                },
                "If the problem persists please restart the application.",
            ),
        }
    }
}

/// Persists named documents through a [`KeyValueStore`]
#[derive(Clone)]
pub struct SaveQueue {
    shared: Arc<Shared>,
}

impl SaveQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        let (saving, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                store,
                notifier,
                entries: Mutex::new(HashMap::new()),
                saving,
            }),
        }
    }

    /// Whether any key has a value pending or a write in flight
    pub fn is_saving(&self) -> bool {
        *self.shared.saving.borrow()
    }

    /// Subscribe to the saving flag; only actual transitions are published
    pub fn saving(&self) -> watch::Receiver<bool> {
        self.shared.saving.subscribe()
    }

    /// Current state of `key`
    pub fn state(&self, key: &str) -> SaveState {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map_or(SaveState::Idle, SaveEntry::state)
    }

    /// Read the document stored under `key`
    ///
    /// # Returns
    /// `None` when nothing is stored or when reading fails; failures are
    /// logged and notified, and the caller falls back to defaults.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let result = match self.shared.store.read(key).await {
            Ok(Some(value)) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(data)) => Some(data),
            Ok(None) => {
                debug!("[SAVE-QUEUE] Nothing stored under {}", key);
                None
            }
            Err(source) => {
                self.shared.report(
                    Error::StoreRead {
                        key: key.to_string(),
                        source,
                    },
                    "Please restart the application.",
                );
                None
            }
        }
    }

    /// Persist every stable value of `source` under `key`
    ///
    /// The value held by `source` when this is called is the baseline and is
    /// not written. The returned task runs until the source's sender is
    /// dropped or [`SaveTask::finish`] is called; either way a pending value
    /// is flushed and queued writes complete first.
    pub fn save<T>(
        &self,
        key: impl Into<String>,
        mut source: watch::Receiver<T>,
        interval: Duration,
    ) -> SaveTask
    where
        T: Serialize + Send + Sync + 'static,
    {
        let key = key.into();
        let stop = Arc::new(Notify::new());
        // Taken before spawning: values sent after this call must be written
        let baseline = to_json(&key, &*source.borrow_and_update());

        let shared = Arc::clone(&self.shared);
        let task_key = key.clone();
        let task_stop = Arc::clone(&stop);
        let handle = tokio::spawn(async move {
            let handoff = Handoff::default();

            tokio::join!(
                debounce(&shared, &task_key, source, baseline, interval, &task_stop, &handoff),
                drain(&shared, &task_key, &handoff),
            );

            shared.forget(&task_key);
            debug!("[SAVE-QUEUE] Stopped saving {}", task_key);
        });

        SaveTask { key, stop, handle }
    }
}

/// Handle on a running [`SaveQueue::save`] loop
pub struct SaveTask {
    key: String,
    stop: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl SaveTask {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Flush the pending value without waiting for its timer, let queued
    /// writes complete, then stop
    pub async fn finish(self) {
        self.stop.notify_one();
        if let Err(e) = self.handle.await {
            error!("[SAVE-QUEUE] Save task for {} ended abnormally: {}", self.key, e);
        }
    }
}

fn to_json<T: Serialize>(key: &str, value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            error!("[SAVE-QUEUE] Cannot serialize {}: {}", key, e);
            None
        }
    }
}

/// Signals from the debouncer to the writer of one key
#[derive(Default)]
struct Handoff {
    /// A value was placed in the slot, or the debouncer finished
    wake: Notify,
    /// The debouncer will place no more values
    closed: AtomicBool,
}

/// Take the latest source value if it differs from the previous one
fn distinct<T: Serialize>(
    key: &str,
    source: &mut watch::Receiver<T>,
    last: &mut Option<Value>,
) -> Option<Value> {
    let value = to_json(key, &*source.borrow_and_update())?;
    if last.as_ref() == Some(&value) {
        return None;
    }
    *last = Some(value.clone());
    Some(value)
}

/// Turn the source into stabilised values placed in the key's slot
async fn debounce<T: Serialize>(
    shared: &Shared,
    key: &str,
    mut source: watch::Receiver<T>,
    mut last: Option<Value>,
    interval: Duration,
    stop: &Notify,
    handoff: &Handoff,
) {
    loop {
        tokio::select! {
            biased;
            changed = source.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = stop.notified() => break,
        }

        let Some(mut pending) = distinct(key, &mut source, &mut last) else {
            continue;
        };
        shared.with_entry(key, |entry| entry.debouncing = true);

        let timer = sleep(interval);
        tokio::pin!(timer);
        let finished = loop {
            tokio::select! {
                biased;
                changed = source.changed() => {
                    if changed.is_err() {
                        break true;
                    }
                    if let Some(value) = distinct(key, &mut source, &mut last) {
                        pending = value;
                        timer.as_mut().reset(Instant::now() + interval);
                    }
                }
                _ = stop.notified() => break true,
                _ = &mut timer => break false,
            }
        };

        shared.with_entry(key, |entry| {
            entry.debouncing = false;
            entry.queued = Some(pending);
        });
        handoff.wake.notify_one();

        if finished {
            break;
        }
    }

    handoff.closed.store(true, Ordering::Release);
    handoff.wake.notify_one();
}

/// Write slot values one at a time until the debouncer is done and the slot is empty
async fn drain(shared: &Shared, key: &str, handoff: &Handoff) {
    loop {
        let next = shared.with_entry(key, |entry| {
            let next = entry.queued.take();
            entry.in_flight = next.is_some();
            next
        });

        match next {
            Some(value) => {
                shared.write(key, value).await;
                shared.with_entry(key, |entry| entry.in_flight = false);
            }
            None if handoff.closed.load(Ordering::Acquire) => break,
            None => handoff.wake.notified().await,
        }
    }
}
