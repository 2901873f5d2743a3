//! Boundary with the host environment
//!
//! The import/export engine and the save queue never touch files, the
//! clipboard or the user directly. They receive these collaborators at
//! construction time:
//! - [`Dialogs`]: open/save file pickers (cancellation is `None`)
//! - [`Files`]: read and write whole text files
//! - [`Clipboard`]: read and write clipboard text
//! - [`Notifier`]: one-way user notification sink
//!
//! Native implementations for a terminal host are provided alongside.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{error, info, warn};

/// Severity of a user notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// One-way sink for messages shown to the user
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotificationLevel, message: &str);
}

/// File type filter offered by file pickers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn json() -> Self {
        Self {
            name: "JSON".to_string(),
            extensions: vec!["json".to_string()],
        }
    }

    pub fn openapi() -> Self {
        Self {
            name: "OpenAPI v2/v3".to_string(),
            extensions: vec!["yaml".to_string(), "json".to_string()],
        }
    }
}

/// File pickers
#[async_trait]
pub trait Dialogs: Send + Sync {
    /// Ask for a file to read; `None` when the user cancels
    async fn open_file(&self, filter: &FileFilter, title: &str) -> Option<PathBuf>;

    /// Ask for a file to write; `None` when the user cancels
    async fn save_file(&self, filter: &FileFilter, title: &str) -> Option<PathBuf>;
}

/// Whole-file text access
#[async_trait]
pub trait Files: Send + Sync {
    async fn read_file(&self, path: &Path) -> io::Result<String>;
    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;
}

/// Clipboard text access
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn read_text(&self) -> io::Result<String>;
    async fn write_text(&self, text: &str) -> io::Result<()>;
}

/// The full set of host collaborators
#[derive(Clone)]
pub struct Platform {
    pub dialogs: Arc<dyn Dialogs>,
    pub files: Arc<dyn Files>,
    pub clipboard: Arc<dyn Clipboard>,
    pub notifier: Arc<dyn Notifier>,
}

/// Files on the local file system
#[derive(Debug, Clone, Default)]
pub struct NativeFiles;

#[async_trait]
impl Files for NativeFiles {
    async fn read_file(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }
}

/// Clipboard backed by standard input and output
///
/// Lets a terminal user pipe bundles in and out: reading consumes stdin to
/// the end, writing prints the text to stdout.
#[derive(Debug, Clone, Default)]
pub struct StdioClipboard;

#[async_trait]
impl Clipboard for StdioClipboard {
    async fn read_text(&self) -> io::Result<String> {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        Ok(text)
    }

    async fn write_text(&self, text: &str) -> io::Result<()> {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(text.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await
    }
}

/// Pickers answering with paths chosen up front (for example on the command line)
///
/// A missing path behaves like a cancelled dialog.
#[derive(Debug, Clone, Default)]
pub struct PresetDialogs {
    pub open_path: Option<PathBuf>,
    pub save_path: Option<PathBuf>,
}

#[async_trait]
impl Dialogs for PresetDialogs {
    async fn open_file(&self, _filter: &FileFilter, title: &str) -> Option<PathBuf> {
        info!("{}: {:?}", title, self.open_path);
        self.open_path.clone()
    }

    async fn save_file(&self, _filter: &FileFilter, title: &str) -> Option<PathBuf> {
        info!("{}: {:?}", title, self.save_path);
        self.save_path.clone()
    }
}

/// Notifier printing to standard error
#[derive(Debug, Clone, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info => info!("notification: {}", message),
            NotificationLevel::Warning => warn!("notification: {}", message),
            NotificationLevel::Error => error!("notification: {}", message),
        }
        eprintln!("[{}] {}", level, message);
    }
}
