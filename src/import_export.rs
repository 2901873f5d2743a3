//! Import and export of environments and routes
//!
//! Exports wrap copies of the data in a [`Bundle`] stamped with the running
//! application's identity; every uuid in the copy is regenerated so the
//! exported data never collides with the live data it came from.
//!
//! Imports accept current bundles and legacy bundles. Each environment goes
//! through the migration pipeline and gets fresh uuids before it is merged
//! into the store. Routes carry no migration stamp, so they are only
//! accepted from bundles produced by the exact same application version.

use crate::bundle::{Bundle, ItemKind};
use crate::config::AppIdentity;
use crate::environment::{
    DefaultEnvironmentBuilder, Environment, EnvironmentBuilder, Route, renew_environment_uuids,
    renew_route_uuids,
};
use crate::error::{Error, Result};
use crate::migration::{into_current_bundle, migrate_environment};
use crate::platform::{FileFilter, NotificationLevel, Platform};
use crate::store::{EnvironmentStore, StoreAction};
use async_trait::async_trait;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Result of an export operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The bundle was written to its destination
    Exported,
    /// The user cancelled the save dialog
    Cancelled,
    /// There was nothing matching to export
    NothingToExport,
    /// Writing failed; the user has been notified
    Failed,
}

/// What an import merged into the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// New uuids of the imported environments, in completion order
    pub environments: Vec<String>,
    /// New uuids of the imported routes
    pub routes: Vec<String>,
    /// Routes refused because they come from another application version
    pub rejected_routes: usize,
    /// Items that could not be migrated or parsed
    pub failed: usize,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.environments.len() + self.routes.len()
    }
}

/// Conversion between environments and OpenAPI documents
#[async_trait]
pub trait OpenApiConverter: Send + Sync {
    /// Build an environment from the specification file at `path`
    async fn import(&self, path: &Path) -> Option<Environment>;

    /// Render an environment as an OpenAPI v3 document
    fn export(&self, environment: &Environment) -> io::Result<String>;
}

pub struct ImportExport {
    identity: AppIdentity,
    store: Arc<EnvironmentStore>,
    platform: Platform,
    builder: Arc<dyn EnvironmentBuilder>,
    openapi: Option<Arc<dyn OpenApiConverter>>,
}

impl ImportExport {
    pub fn new(identity: AppIdentity, store: Arc<EnvironmentStore>, platform: Platform) -> Self {
        Self {
            identity,
            store,
            platform,
            builder: Arc::new(DefaultEnvironmentBuilder),
            openapi: None,
        }
    }

    /// Use `builder` for environments created to host routes imported with no active environment
    pub fn with_builder(mut self, builder: Arc<dyn EnvironmentBuilder>) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_openapi(mut self, converter: Arc<dyn OpenApiConverter>) -> Self {
        self.openapi = Some(converter);
        self
    }

    /// Export every environment to a file chosen by the user
    pub async fn export_all_environments(&self) -> ExportOutcome {
        let environments = self.store.environments();
        if environments.is_empty() {
            debug!("[IMPORT-EXPORT] No environment to export");
            return ExportOutcome::NothingToExport;
        }

        let Some(path) = self.ask_save_path("Export all environments to JSON").await else {
            return ExportOutcome::Cancelled;
        };
        info!("[IMPORT-EXPORT] Exporting all environments to {}", path.display());

        self.finish_export(
            self.write_bundle_file(&path, &environments).await,
            "Environments have been successfully exported",
        )
    }

    /// Export the active environment to a file chosen by the user
    pub async fn export_active_environment(&self) -> ExportOutcome {
        let Some(environment) = self.store.active_environment() else {
            debug!("[IMPORT-EXPORT] No active environment to export");
            return ExportOutcome::NothingToExport;
        };

        let Some(path) = self.ask_save_path("Export current environment to JSON").await else {
            return ExportOutcome::Cancelled;
        };
        info!(
            "[IMPORT-EXPORT] Exporting environment {} to {}",
            environment.uuid,
            path.display()
        );

        self.finish_export(
            self.write_bundle_file(&path, std::slice::from_ref(&environment))
                .await,
            "Environment has been successfully exported",
        )
    }

    /// Copy one environment to the clipboard as a bundle
    pub async fn export_environment_to_clipboard(&self, environment_uuid: &str) -> ExportOutcome {
        let Some(environment) = self.store.environment_by_uuid(environment_uuid) else {
            warn!(
                "[IMPORT-EXPORT] Environment {} not found, nothing copied",
                environment_uuid
            );
            return ExportOutcome::NothingToExport;
        };
        info!(
            "[IMPORT-EXPORT] Copying environment {} to the clipboard",
            environment_uuid
        );

        let result = match self.environments_export(std::slice::from_ref(&environment)) {
            Ok(text) => self.write_clipboard(&text).await,
            Err(e) => Err(e),
        };
        self.finish_export(result, "Environment has been successfully copied to the clipboard")
    }

    /// Copy one route of the active environment to the clipboard as a bundle
    pub async fn export_route_to_clipboard(&self, route_uuid: &str) -> ExportOutcome {
        let route = self
            .store
            .active_environment()
            .and_then(|environment| environment.find_route(route_uuid).cloned());
        let Some(route) = route else {
            warn!(
                "[IMPORT-EXPORT] Route {} not found in the active environment, nothing copied",
                route_uuid
            );
            return ExportOutcome::NothingToExport;
        };
        info!("[IMPORT-EXPORT] Copying route {} to the clipboard", route_uuid);

        let result = match self.route_export(&route) {
            Ok(text) => self.write_clipboard(&text).await,
            Err(e) => Err(e),
        };
        self.finish_export(result, "Route has been successfully copied to the clipboard")
    }

    /// Import a bundle from a file chosen by the user
    ///
    /// # Returns
    /// `None` when the user cancelled or the file could not be read or
    /// parsed, in which case the store is untouched.
    pub async fn import_from_file(&self) -> Option<ImportReport> {
        let path = self
            .platform
            .dialogs
            .open_file(&FileFilter::json(), "Import from file (JSON)")
            .await?;
        info!("[IMPORT-EXPORT] Importing from {}", path.display());

        match self.platform.files.read_file(&path).await {
            Ok(text) => self.import_text(&text).await,
            Err(e) => {
                self.report(NotificationLevel::Error, &Error::ImportIo(e));
                None
            }
        }
    }

    /// Import a bundle from the clipboard text
    pub async fn import_from_clipboard(&self) -> Option<ImportReport> {
        info!("[IMPORT-EXPORT] Importing from the clipboard");

        match self.platform.clipboard.read_text().await {
            Ok(text) => self.import_text(&text).await,
            Err(e) => {
                self.report(NotificationLevel::Error, &Error::ImportIo(e));
                None
            }
        }
    }

    /// Parse bundle text (current or legacy format) and import it
    pub async fn import_text(&self, text: &str) -> Option<ImportReport> {
        let parsed = serde_json::from_str::<Value>(text)
            .and_then(|value| into_current_bundle(value, &self.identity.name));

        match parsed {
            Ok(bundle) => Some(self.import_bundle(bundle).await),
            Err(e) => {
                self.report(NotificationLevel::Error, &Error::ImportParse(e));
                None
            }
        }
    }

    /// Merge every item of a current-format bundle into the store
    ///
    /// Environments are migrated and merged concurrently, so their order in
    /// the store may differ from their order in the bundle.
    pub async fn import_bundle(&self, bundle: Bundle) -> ImportReport {
        let version = bundle.source_version().to_string();
        let mut report = ImportReport::default();
        let mut environments = JoinSet::new();

        for entry in bundle.data {
            match entry.kind {
                ItemKind::Environment => {
                    let store = Arc::clone(&self.store);
                    environments.spawn(async move { import_environment(&store, entry.item) });
                }
                ItemKind::Route if version == self.identity.version => {
                    match self.import_route(entry.item) {
                        Ok(uuid) => report.routes.push(uuid),
                        Err(e) => {
                            self.report(NotificationLevel::Error, &e);
                            report.failed += 1;
                        }
                    }
                }
                ItemKind::Route => {
                    info!(
                        "[IMPORT-EXPORT] Route {} has version {} instead of {} and cannot be imported",
                        item_uuid(&entry.item),
                        version,
                        self.identity.version
                    );
                    self.report(
                        NotificationLevel::Warning,
                        &Error::ImportVersionMismatch {
                            version: version.clone(),
                        },
                    );
                    report.rejected_routes += 1;
                }
                ItemKind::Unknown => {
                    debug!("[IMPORT-EXPORT] Skipping bundle entry of unknown type");
                }
            }
        }

        while let Some(joined) = environments.join_next().await {
            match joined {
                Ok(Ok(uuid)) => report.environments.push(uuid),
                Ok(Err(e)) => {
                    self.report(NotificationLevel::Error, &e);
                    report.failed += 1;
                }
                Err(e) => {
                    error!("[IMPORT-EXPORT] Environment import task failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "[IMPORT-EXPORT] Imported {} environment(s) and {} route(s), rejected {} route(s)",
            report.environments.len(),
            report.routes.len(),
            report.rejected_routes
        );
        report
    }

    /// Import an OpenAPI specification file chosen by the user as a new environment
    pub async fn import_openapi_file(&self) -> Option<String> {
        let converter = self.openapi_converter()?;
        let path = self
            .platform
            .dialogs
            .open_file(&FileFilter::openapi(), "Import OpenAPI specification file")
            .await?;
        info!("[IMPORT-EXPORT] Importing OpenAPI file {}", path.display());

        let Some(environment) = converter.import(&path).await else {
            self.platform.notifier.notify(
                NotificationLevel::Error,
                "Import failed: the file is not a valid OpenAPI specification",
            );
            return None;
        };

        let uuid = environment.uuid.clone();
        self.store.update(StoreAction::AddEnvironment(environment));
        Some(uuid)
    }

    /// Export the active environment as an OpenAPI v3 file chosen by the user
    pub async fn export_openapi_file(&self) -> ExportOutcome {
        let Some(converter) = self.openapi_converter() else {
            return ExportOutcome::NothingToExport;
        };
        let Some(environment) = self.store.active_environment() else {
            return ExportOutcome::NothingToExport;
        };

        let path = self
            .platform
            .dialogs
            .save_file(&FileFilter::json(), "Export current environment to OpenAPI v3")
            .await;
        let Some(path) = path else {
            return ExportOutcome::Cancelled;
        };
        info!(
            "[IMPORT-EXPORT] Exporting environment {} as OpenAPI to {}",
            environment.uuid,
            path.display()
        );

        let result = match converter.export(&environment) {
            Ok(text) => self.write_file(&path, &text).await,
            Err(e) => Err(Error::ExportIo(e)),
        };
        self.finish_export(result, "Environment has been successfully exported")
    }

    fn openapi_converter(&self) -> Option<&Arc<dyn OpenApiConverter>> {
        if self.openapi.is_none() {
            self.platform.notifier.notify(
                NotificationLevel::Warning,
                "OpenAPI conversion is not available",
            );
        }
        self.openapi.as_ref()
    }

    fn import_route(&self, item: Value) -> Result<String> {
        let route: Route = serde_json::from_value(item)?;
        let route = renew_route_uuids(route);
        let uuid = route.uuid.clone();
        info!("[IMPORT-EXPORT] Importing route {}", uuid);

        let added = self.store.active_environment_uuid().is_some()
            && self.store.update(StoreAction::AddRoute(route.clone()));
        if !added {
            let mut environment = self.builder.build_environment();
            debug!(
                "[IMPORT-EXPORT] No active environment, creating {} for route {}",
                environment.uuid, uuid
            );
            environment.routes = vec![route];
            self.store.update(StoreAction::AddEnvironment(environment));
        }
        Ok(uuid)
    }

    fn environments_export(&self, environments: &[Environment]) -> Result<String> {
        let renewed: Vec<Environment> = environments
            .iter()
            .cloned()
            .map(renew_environment_uuids)
            .collect();
        Bundle::from_environments(self.identity.source(), &renewed)?.to_json_pretty()
    }

    fn route_export(&self, route: &Route) -> Result<String> {
        let renewed = renew_route_uuids(route.clone());
        Bundle::from_route(self.identity.source(), &renewed)?.to_json_pretty()
    }

    async fn ask_save_path(&self, title: &str) -> Option<PathBuf> {
        let path = self
            .platform
            .dialogs
            .save_file(&FileFilter::json(), title)
            .await;
        if path.is_none() {
            debug!("[IMPORT-EXPORT] Export cancelled");
        }
        path
    }

    async fn write_bundle_file(&self, path: &Path, environments: &[Environment]) -> Result<()> {
        let text = self.environments_export(environments)?;
        self.write_file(path, &text).await
    }

    async fn write_file(&self, path: &Path, text: &str) -> Result<()> {
        self.platform
            .files
            .write_file(path, text)
            .await
            .map_err(Error::ExportIo)
    }

    async fn write_clipboard(&self, text: &str) -> Result<()> {
        self.platform
            .clipboard
            .write_text(text)
            .await
            .map_err(Error::ExportIo)
    }

    fn finish_export(&self, result: Result<()>, success: &str) -> ExportOutcome {
        match result {
            Ok(()) => {
                self.platform
                    .notifier
                    .notify(NotificationLevel::Info, success);
                ExportOutcome::Exported
            }
            Err(e) => {
                self.report(NotificationLevel::Error, &e);
                ExportOutcome::Failed
            }
        }
    }

    /// Log an error with its cause and show its message to the user
    fn report(&self, level: NotificationLevel, err: &Error) {
        match (level, std::error::Error::source(err)) {
            (NotificationLevel::Error, Some(source)) => {
                error!("[IMPORT-EXPORT] {}: {}", err, source)
            }
            (NotificationLevel::Error, None) => error!("[IMPORT-EXPORT] {}", err),
            _ => warn!("[IMPORT-EXPORT] {}", err),
        }
        self.platform.notifier.notify(level, &err.to_string());
    }
}

/// Migrate one bundle environment, give it fresh uuids and merge it
fn import_environment(store: &EnvironmentStore, item: Value) -> Result<String> {
    let environment = renew_environment_uuids(migrate_environment(item)?);
    let uuid = environment.uuid.clone();
    info!("[IMPORT-EXPORT] Importing environment {}", uuid);

    store.update(StoreAction::AddEnvironment(environment));
    Ok(uuid)
}

fn item_uuid(item: &Value) -> &str {
    item.get("uuid").and_then(Value::as_str).unwrap_or("<unknown>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleItem;
    use crate::platform::{NativeFiles, Notifier, PresetDialogs, StdioClipboard};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Notes(Mutex<Vec<(NotificationLevel, String)>>);

    impl Notifier for Notes {
        fn notify(&self, level: NotificationLevel, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    fn engine(store: Arc<EnvironmentStore>, notes: Arc<Notes>) -> ImportExport {
        let platform = Platform {
            dialogs: Arc::new(PresetDialogs::default()),
            files: Arc::new(NativeFiles),
            clipboard: Arc::new(StdioClipboard),
            notifier: notes,
        };
        ImportExport::new(AppIdentity::new("envport", "1.1.0"), store, platform)
    }

    fn route_item(uuid: &str) -> Value {
        json!({ "uuid": uuid, "method": "get", "endpoint": "users", "responses": [] })
    }

    #[tokio::test]
    async fn test_route_from_other_version_is_rejected() {
        let store = Arc::new(EnvironmentStore::default());
        let notes = Arc::new(Notes::default());
        let engine = engine(Arc::clone(&store), Arc::clone(&notes));

        let bundle = Bundle {
            source: "envport:1.0.0".to_string(),
            data: vec![BundleItem::route(route_item("r1"))],
        };
        let report = engine.import_bundle(bundle).await;

        assert_eq!(report.rejected_routes, 1);
        assert_eq!(report.imported(), 0);
        assert!(store.environments().is_empty());

        let notes = notes.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].0, NotificationLevel::Warning);
        assert!(notes[0].1.contains("1.0.0"));
    }

    #[tokio::test]
    async fn test_route_without_active_environment_creates_one() {
        let store = Arc::new(EnvironmentStore::default());
        let engine = engine(Arc::clone(&store), Arc::new(Notes::default()));

        let bundle = Bundle {
            source: "envport:1.1.0".to_string(),
            data: vec![BundleItem::route(route_item("r1"))],
        };
        let report = engine.import_bundle(bundle).await;

        let environments = store.environments();
        assert_eq!(environments.len(), 1);
        assert_eq!(environments[0].routes.len(), 1);
        assert_eq!(environments[0].routes[0].uuid, report.routes[0]);
        assert_ne!(report.routes[0], "r1");
        assert_eq!(store.active_environment_uuid(), Some(environments[0].uuid.clone()));
    }

    #[tokio::test]
    async fn test_route_goes_to_active_environment() {
        let store = Arc::new(EnvironmentStore::new(vec![Environment {
            uuid: "env".to_string(),
            ..Default::default()
        }]));
        let engine = engine(Arc::clone(&store), Arc::new(Notes::default()));

        let bundle = Bundle {
            source: "envport:1.1.0".to_string(),
            data: vec![BundleItem::route(route_item("r1"))],
        };
        engine.import_bundle(bundle).await;

        assert_eq!(store.environments().len(), 1);
        assert_eq!(store.active_environment().unwrap().routes.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_items_are_skipped() {
        let store = Arc::new(EnvironmentStore::default());
        let engine = engine(Arc::clone(&store), Arc::new(Notes::default()));

        let bundle: Bundle = serde_json::from_value(json!({
            "source": "envport:1.1.0",
            "data": [{ "type": "folder", "item": {} }]
        }))
        .unwrap();
        let report = engine.import_bundle(bundle).await;

        assert_eq!(report, ImportReport::default());
        assert!(store.environments().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_text_changes_nothing() {
        let store = Arc::new(EnvironmentStore::default());
        let notes = Arc::new(Notes::default());
        let engine = engine(Arc::clone(&store), Arc::clone(&notes));

        assert!(engine.import_text("{ not json").await.is_none());
        assert!(engine.import_text(r#"{"source": 1}"#).await.is_none());

        assert!(store.environments().is_empty());
        let notes = notes.0.lock().unwrap();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|(level, _)| *level == NotificationLevel::Error));
    }

    #[tokio::test]
    async fn test_openapi_without_converter_warns() {
        let store = Arc::new(EnvironmentStore::new(vec![Environment::default()]));
        let notes = Arc::new(Notes::default());
        let engine = engine(Arc::clone(&store), Arc::clone(&notes));

        assert_eq!(engine.export_openapi_file().await, ExportOutcome::NothingToExport);
        assert!(engine.import_openapi_file().await.is_none());
        assert_eq!(store.environments().len(), 1);

        let notes = notes.0.lock().unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].0, NotificationLevel::Warning);
    }
}
