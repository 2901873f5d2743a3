//! Error types for envport
//!
//! The `Display` text of every variant doubles as the message shown to the user
//! through the notification sink, so each one names the offending key, version
//! or environment.

use std::io;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by persistence, migration and import/export
#[derive(Error, Debug)]
pub enum Error {
    /// Reading a key from the key/value store failed
    #[error("Error while loading {key}")]
    StoreRead {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Writing a key to the key/value store failed
    #[error("Error while saving {key}")]
    StoreWrite {
        key: String,
        #[source]
        source: io::Error,
    },

    /// Imported text is not valid JSON or not a bundle
    #[error("Import failed: the data is not a valid export ({0})")]
    ImportParse(#[from] serde_json::Error),

    /// Reading the import source (file or clipboard) failed
    #[error("Import failed: the data could not be read")]
    ImportIo(#[source] io::Error),

    /// A route bundle was produced by a different application version
    #[error(
        "The route was exported with version {version} and cannot be imported in the current version"
    )]
    ImportVersionMismatch { version: String },

    /// Writing an export to a file or the clipboard failed
    #[error("Export failed: the data could not be written")]
    ExportIo(#[source] io::Error),

    /// An environment could not be brought to the current schema
    #[error("Environment {uuid} could not be migrated: {reason}")]
    Migration { uuid: String, reason: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A document could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}
