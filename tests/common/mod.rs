//! Common test utilities for integration tests
//!
//! In-memory stand-ins for the storage backend and the host collaborators,
//! each recording what it was asked to do.

#![allow(dead_code)]

use async_trait::async_trait;
use envport::environment::{Environment, Method, Route, RouteResponse};
use envport::platform::{Clipboard, Dialogs, FileFilter, Files, NotificationLevel, Notifier};
use envport::{KeyValueStore, Platform};
use serde_json::Value;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Notifier keeping every notification
#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<(NotificationLevel, String)>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<(NotificationLevel, String)> {
        self.notes.lock().unwrap().clone()
    }

    pub fn messages(&self, level: NotificationLevel) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        self.notes.lock().unwrap().push((level, message.to_string()));
    }
}

/// Key/value store with a configurable write delay and injectable failures
#[derive(Default)]
pub struct ScriptedStore {
    data: Mutex<HashMap<String, Value>>,
    writes: Mutex<Vec<(String, Value)>>,
    attempts: AtomicUsize,
    delay: Duration,
    fail_next_writes: AtomicUsize,
    fail_reads: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write takes `delay` to complete
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn seed(&self, key: &str, value: Value) {
        self.data.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.fail_next_writes.store(count, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Values successfully written under `key`, oldest first
    pub fn writes(&self, key: &str) -> Vec<Value> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, value)| value.clone())
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap().get(key).cloned()
    }

    /// Number of writes started, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for ScriptedStore {
    async fn read(&self, key: &str) -> io::Result<Option<Value>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read refused"));
        }
        Ok(self.get(key))
    }

    async fn write(&self, key: &str, data: &Value) -> io::Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let fail = self
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(io::Error::other("disk full"));
        }

        self.data.lock().unwrap().insert(key.to_string(), data.clone());
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), data.clone()));
        Ok(())
    }
}

/// Files kept in memory
#[derive(Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<PathBuf, String>>,
    fail_writes: AtomicBool,
}

impl MemoryFiles {
    pub fn put(&self, path: impl Into<PathBuf>, contents: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), contents.to_string());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Files for MemoryFiles {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        self.get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        self.put(path, contents);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<String>,
}

impl MemoryClipboard {
    pub fn set(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap().clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn read_text(&self) -> io::Result<String> {
        Ok(self.text())
    }

    async fn write_text(&self, text: &str) -> io::Result<()> {
        self.set(text);
        Ok(())
    }
}

/// Dialogs answering with preset paths; `None` means cancel
#[derive(Default)]
pub struct ScriptedDialogs {
    open_path: Mutex<Option<PathBuf>>,
    save_path: Mutex<Option<PathBuf>>,
    titles: Mutex<Vec<String>>,
}

impl ScriptedDialogs {
    pub fn answer_open(&self, path: Option<&str>) {
        *self.open_path.lock().unwrap() = path.map(PathBuf::from);
    }

    pub fn answer_save(&self, path: Option<&str>) {
        *self.save_path.lock().unwrap() = path.map(PathBuf::from);
    }

    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialogs for ScriptedDialogs {
    async fn open_file(&self, _filter: &FileFilter, title: &str) -> Option<PathBuf> {
        self.titles.lock().unwrap().push(title.to_string());
        self.open_path.lock().unwrap().clone()
    }

    async fn save_file(&self, _filter: &FileFilter, title: &str) -> Option<PathBuf> {
        self.titles.lock().unwrap().push(title.to_string());
        self.save_path.lock().unwrap().clone()
    }
}

/// Test doubles bundled into a [`Platform`]
#[derive(Default)]
pub struct TestHost {
    pub dialogs: Arc<ScriptedDialogs>,
    pub files: Arc<MemoryFiles>,
    pub clipboard: Arc<MemoryClipboard>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestHost {
    pub fn platform(&self) -> Platform {
        Platform {
            dialogs: self.dialogs.clone(),
            files: self.files.clone(),
            clipboard: self.clipboard.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

/// Create a test environment with one route per `(method, endpoint)`
pub fn create_test_environment(uuid: &str, port: u16, routes: &[(Method, &str)]) -> Environment {
    Environment {
        uuid: uuid.to_string(),
        last_migration: envport::migration::HIGHEST_MIGRATION_ID,
        name: format!("Environment {}", uuid),
        port,
        routes: routes
            .iter()
            .enumerate()
            .map(|(index, (method, endpoint))| {
                create_test_route(&format!("{}-route-{}", uuid, index), *method, endpoint)
            })
            .collect(),
        ..Default::default()
    }
}

/// Create a test route with a single 200 response
pub fn create_test_route(uuid: &str, method: Method, endpoint: &str) -> Route {
    Route {
        uuid: uuid.to_string(),
        method,
        endpoint: endpoint.to_string(),
        responses: vec![RouteResponse {
            uuid: format!("{}-response", uuid),
            body: format!("{{\"endpoint\": \"{}\"}}", endpoint),
            ..Default::default()
        }],
        ..Default::default()
    }
}
