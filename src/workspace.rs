//! Application wiring
//!
//! [`Workspace`] owns the environment store, the settings document and the
//! save tasks persisting both, plus the import/export engine operating on
//! the store.

use crate::config::AppConfig;
use crate::environment::Environment;
use crate::import_export::{ImportExport, OpenApiConverter};
use crate::migration::migrate_environments;
use crate::platform::Platform;
use crate::save_queue::{SaveQueue, SaveTask};
use crate::settings::Settings;
use crate::storage::KeyValueStore;
use crate::store::EnvironmentStore;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Storage key of the environment list
pub const ENVIRONMENTS_KEY: &str = "environments";
/// Storage key of the settings document
pub const SETTINGS_KEY: &str = "settings";

pub struct Workspace {
    store: Arc<EnvironmentStore>,
    settings: watch::Sender<Settings>,
    save_tasks: Vec<SaveTask>,
    engine: ImportExport,
}

impl Workspace {
    /// Load persisted data and start saving every later change
    ///
    /// # Arguments
    /// * `config` - application identity and debounce intervals
    /// * `storage` - key/value backend holding the documents
    /// * `platform` - host collaborators used for notifications and import/export
    ///
    /// Stored environments are migrated to the current schema; a document
    /// that cannot be read falls back to an empty list or default settings
    /// after notifying the user.
    pub async fn open(
        config: &AppConfig,
        storage: Arc<dyn KeyValueStore>,
        platform: Platform,
    ) -> Self {
        let save_queue = SaveQueue::new(storage, Arc::clone(&platform.notifier));

        let stored: Vec<Value> = save_queue.load(ENVIRONMENTS_KEY).await.unwrap_or_default();
        let environments = migrate_environments(stored);
        info!("Loaded {} environment(s)", environments.len());
        let store = Arc::new(EnvironmentStore::new(environments));

        let settings: Settings = save_queue.load(SETTINGS_KEY).await.unwrap_or_default();
        let (settings, settings_rx) = watch::channel(settings);

        let save_tasks = vec![
            save_queue.save(
                ENVIRONMENTS_KEY,
                store.subscribe(),
                config.save.environments_debounce(),
            ),
            save_queue.save(SETTINGS_KEY, settings_rx, config.save.settings_debounce()),
        ];

        let engine = ImportExport::new(config.identity(), Arc::clone(&store), platform);

        Self {
            store,
            settings,
            save_tasks,
            engine,
        }
    }

    pub fn with_openapi(mut self, converter: Arc<dyn OpenApiConverter>) -> Self {
        self.engine = self.engine.with_openapi(converter);
        self
    }

    pub fn store(&self) -> &Arc<EnvironmentStore> {
        &self.store
    }

    pub fn engine(&self) -> &ImportExport {
        &self.engine
    }

    pub fn environments(&self) -> Vec<Environment> {
        self.store.environments()
    }

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Change the settings; the document is saved after its debounce interval
    pub fn update_settings(&self, f: impl FnOnce(&mut Settings)) {
        self.settings.send_modify(f);
    }

    /// Write pending changes immediately and stop saving
    pub async fn close(self) {
        for task in self.save_tasks {
            info!("Flushing {}", task.key());
            task.finish().await;
        }
    }
}
