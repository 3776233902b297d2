//! Persisted sync settings.
//!
//! Settings live in a small key-value store backed by a TOML file. Keys are `/`-separated paths
//! that map onto nested tables, so `webdav/url` is the `url` entry of the `[webdav]` table.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use strum_macros::{EnumIter, IntoStaticStr};
use toml::{Table, Value};
use tracing::debug;

use crate::error::SettingsError;

/// Remote base path used when none is stored.
pub const DEFAULT_REMOTE_PATH: &str = "MarkdownNotes/";

const SETTINGS_FILE: &str = "settings.toml";

/// The keys the sync client reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumIter)]
pub enum SettingKey {
    #[strum(serialize = "webdav/url")]
    Url,
    #[strum(serialize = "webdav/username")]
    Username,
    #[strum(serialize = "webdav/password")]
    Password,
    #[strum(serialize = "webdav/remote_path")]
    RemotePath,
}

impl SettingKey {
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A key-value settings store, optionally tied to a file.
#[derive(Debug, Default, Clone)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    table: Table,
}

impl SettingsStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`. A missing file yields an empty store that will be created on
    /// [`save`](Self::save).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let table = match fs::read_to_string(&path) {
            Ok(content) => content
                .parse::<Table>()
                .map_err(|source| SettingsError::Parse {
                    path: path.clone(),
                    source,
                })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, starting empty");
                Table::new()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        Ok(Self {
            path: Some(path),
            table,
        })
    }

    /// Open the store in the platform's configuration directory.
    pub fn open_default() -> Result<Self, SettingsError> {
        Self::open(default_path()?)
    }

    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up a string value.
    pub fn value(&self, key: &str) -> Option<&str> {
        let mut parts = key.split('/');
        let last = parts.next_back()?;
        let mut table = &self.table;
        for part in parts {
            table = table.get(part)?.as_table()?;
        }
        table.get(last)?.as_str()
    }

    /// Look up a string value, falling back to `default`.
    pub fn value_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.value(key).unwrap_or(default)
    }

    /// Set a string value, creating intermediate tables as needed.
    ///
    /// A non-table value in the way of the key path is replaced by a table.
    pub fn set_value(&mut self, key: &str, value: impl Into<String>) {
        let mut parts = key.split('/');
        let Some(last) = parts.next_back() else {
            return;
        };
        let mut table = &mut self.table;
        for part in parts {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            let Value::Table(inner) = entry else {
                unreachable!("just made sure this is a table");
            };
            table = inner;
        }
        table.insert(last.to_string(), Value::String(value.into()));
    }

    /// Write the store back to its file, creating parent directories.
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = self.path.as_ref().ok_or(SettingsError::NoFile)?;
        let content = toml::to_string(&self.table)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "settings saved");
        Ok(())
    }
}

/// `settings.toml` in the platform configuration directory for the app.
pub fn default_path() -> Result<PathBuf, SettingsError> {
    let dirs = ProjectDirs::from("", "MarkdownNotes", "SyncConfig").ok_or(SettingsError::NoConfigDir)?;
    Ok(dirs.config_dir().join(SETTINGS_FILE))
}

/// WebDAV connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Server URL, always ending in `/` unless empty.
    pub url: String,
    pub username: String,
    pub password: String,
    /// Remote base directory, relative to `url`, ending in `/` unless empty.
    pub remote_path: String,
}

impl std::fmt::Debug for SyncSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSettings")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("remote_path", &self.remote_path)
            .finish()
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            remote_path: DEFAULT_REMOTE_PATH.to_string(),
        }
    }
}

impl SyncSettings {
    /// Build normalized settings.
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            url: normalize_url(&url.into()),
            username: username.into(),
            password: password.into(),
            remote_path: normalize_remote_path(&remote_path.into()),
        }
    }

    /// Read the settings from a store, applying defaults and normalization.
    pub fn load(store: &SettingsStore) -> Self {
        Self::new(
            store.value_or(SettingKey::Url.as_str(), ""),
            store.value_or(SettingKey::Username.as_str(), ""),
            store.value_or(SettingKey::Password.as_str(), ""),
            store.value_or(SettingKey::RemotePath.as_str(), DEFAULT_REMOTE_PATH),
        )
    }

    /// Write every key into the store. The store itself is not saved.
    pub fn store(&self, store: &mut SettingsStore) {
        store.set_value(SettingKey::Url.as_str(), normalize_url(&self.url));
        store.set_value(SettingKey::Username.as_str(), self.username.as_str());
        store.set_value(SettingKey::Password.as_str(), self.password.as_str());
        store.set_value(
            SettingKey::RemotePath.as_str(),
            normalize_remote_path(&self.remote_path),
        );
    }

    /// The value stored under `key`.
    pub fn get(&self, key: SettingKey) -> &str {
        match key {
            SettingKey::Url => &self.url,
            SettingKey::Username => &self.username,
            SettingKey::Password => &self.password,
            SettingKey::RemotePath => &self.remote_path,
        }
    }

    /// Whether URL, username and password are all present.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Append a trailing `/` to a non-empty URL.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

/// Strip leading `/` and append a trailing `/` to a non-empty remote path.
pub fn normalize_remote_path(path: &str) -> String {
    let path = path.trim().trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}
