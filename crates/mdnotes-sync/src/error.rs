use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on settings file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file '{}' is not valid TOML: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    #[error("settings store has no file to save to")]
    NoFile,
}

/// Errors from enumerating the resource root.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("resource directory '{}' does not exist", .0.display())]
    MissingResourceRoot(PathBuf),
    #[error("cannot list '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors from reading or changing the local note tree.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid note name '{0}'")]
    InvalidName(String),
    #[error("note '{0}' does not exist")]
    MissingNote(String),
    #[error("'{}' is not a file", .0.display())]
    NotAFile(PathBuf),
}

/// Errors from the HTTP layer that prevent a request from producing a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid WebDAV URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
}

/// Whole-run errors, reported before a run starts.
///
/// Failures of individual directories or uploads never show up here: they are counted in the
/// run's [`SyncReport`](crate::SyncReport).
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sync is not configured: WebDAV URL, username and password are required")]
    NotConfigured,
    #[error("a sync is already in progress")]
    AlreadySyncing,
    #[error("no files to sync")]
    NothingToSync,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("sync stalled with requests still unanswered")]
    Stalled,
}

impl SyncError {
    /// Whether this is an actual failure rather than the "nothing to do" signal.
    pub fn is_failure(&self) -> bool {
        !matches!(self, SyncError::NothingToSync)
    }
}
