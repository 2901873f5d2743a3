//! envport Library
//!
//! Persistence and data exchange for collections of mock API environments:
//! debounced saving of in-memory documents, import/export of environments and
//! routes as JSON bundles (including bundles from older releases), schema
//! migration of stored data, and detection of conflicting ports and routes.
//!
//! # Architecture
//!
//! The library follows a 3-layer architecture:
//! - **Application Layer**: `Workspace` and `ImportExport` - wire the store to
//!   persistence and to the host (files, clipboard, dialogs, notifications)
//! - **Domain Layer**: `environment`, `store`, `duplicates` and `migration`
//!   modules - data model, mutations and schema upgrades
//! - **Persistence Layer**: `storage` and `save_queue` modules - key/value
//!   documents written through a debounced single-flight queue
//!
//! # Example
//!
//! ```no_run
//! use envport::{AppConfig, JsonFileStore, Platform, Workspace};
//! use envport::platform::{ConsoleNotifier, NativeFiles, PresetDialogs, StdioClipboard};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let platform = Platform {
//!         dialogs: Arc::new(PresetDialogs::default()),
//!         files: Arc::new(NativeFiles),
//!         clipboard: Arc::new(StdioClipboard),
//!         notifier: Arc::new(ConsoleNotifier),
//!     };
//!     let storage = Arc::new(JsonFileStore::new(&config.data_dir));
//!     let workspace = Workspace::open(&config, storage, platform).await;
//!     workspace.engine().import_from_clipboard().await;
//!     workspace.close().await;
//! }
//! ```

pub mod bundle;
pub mod config;
pub mod duplicates;
pub mod environment;
pub mod error;
pub mod import_export;
pub mod migration;
pub mod platform;
pub mod save_queue;
pub mod settings;
pub mod storage;
pub mod store;
pub mod workspace;

// Re-export commonly used types
pub use bundle::{Bundle, BundleItem, ItemKind};
pub use config::{AppConfig, AppIdentity, SaveConfig};
pub use duplicates::{list_duplicated_environments, list_duplicated_routes};
pub use environment::{Environment, Method, Route, RouteResponse};
pub use error::{Error, Result};
pub use import_export::{ExportOutcome, ImportExport, ImportReport, OpenApiConverter};
pub use platform::{NotificationLevel, Notifier, Platform};
pub use save_queue::{SaveQueue, SaveState, SaveTask};
pub use settings::Settings;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use store::{EnvironmentStore, StoreAction, StoreState};
pub use workspace::{ENVIRONMENTS_KEY, SETTINGS_KEY, Workspace};
