//! Turning a local resource tree into the work of one sync run.
//!
//! The resource root holds one folder per note. Every regular file directly inside a note folder
//! is uploaded, as is every file in the note's `assets/` folder. Deeper folders are not synced.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PlanError;

pub(crate) const ASSETS_DIR: &str = "assets";

/// A remote directory to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryTask {
    /// Path relative to the server URL, ending in `/`.
    pub remote_path: String,
}

/// A local file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub local_path: PathBuf,
    /// Path relative to the server URL.
    pub remote_path: String,
}

/// The directories and uploads of one sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    directories: Vec<DirectoryTask>,
    uploads: Vec<UploadTask>,
}

impl SyncPlan {
    pub fn new(directories: Vec<DirectoryTask>, uploads: Vec<UploadTask>) -> Self {
        Self {
            directories,
            uploads,
        }
    }

    /// Directories, shortest remote path first.
    #[inline]
    pub fn directories(&self) -> &[DirectoryTask] {
        &self.directories
    }

    #[inline]
    pub fn uploads(&self) -> &[UploadTask] {
        &self.uploads
    }

    /// Whether there is nothing to upload. Directories alone do not make a run.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }

    pub fn into_parts(self) -> (Vec<DirectoryTask>, Vec<UploadTask>) {
        (self.directories, self.uploads)
    }
}

/// Enumerate `resource_root` into a [`SyncPlan`].
///
/// `remote_base` is expected in normalized form (no leading `/`, trailing `/` unless empty), as
/// produced by [`normalize_remote_path`](crate::settings::normalize_remote_path).
///
/// Directories are ordered by the length of their remote path, so that a parent is always created
/// before its children. This relies on a child's path being longer than its parent's, which holds
/// because every child path extends its parent path.
pub fn plan(resource_root: &Path, remote_base: &str) -> Result<SyncPlan, PlanError> {
    if !resource_root.is_dir() {
        return Err(PlanError::MissingResourceRoot(resource_root.to_path_buf()));
    }

    let mut directories = BTreeSet::new();
    let mut uploads = Vec::new();
    if !remote_base.is_empty() {
        directories.insert(remote_base.to_string());
    }

    let list_dir = |dir: &Path, kind: EntryKind| {
        list(dir, kind).map_err(|source| PlanError::Io {
            path: dir.to_path_buf(),
            source,
        })
    };

    for (note, note_path) in list_dir(resource_root, EntryKind::Dir)? {
        let remote_note = format!("{remote_base}{note}/");
        directories.insert(remote_note.clone());

        let assets_path = note_path.join(ASSETS_DIR);
        if assets_path.is_dir() {
            let remote_assets = format!("{remote_note}{ASSETS_DIR}/");
            directories.insert(remote_assets.clone());
            for (file, local_path) in list_dir(&assets_path, EntryKind::File)? {
                push_upload(&mut uploads, local_path, format!("{remote_assets}{file}"));
            }
        }

        for (file, local_path) in list_dir(&note_path, EntryKind::File)? {
            push_upload(&mut uploads, local_path, format!("{remote_note}{file}"));
        }
    }

    // Stable sort: equal lengths keep the set's lexical order.
    let mut directories: Vec<String> = directories.into_iter().collect();
    directories.sort_by_key(String::len);

    debug!(
        directories = directories.len(),
        uploads = uploads.len(),
        "planned sync of '{}'",
        resource_root.display()
    );
    Ok(SyncPlan {
        directories: directories
            .into_iter()
            .map(|remote_path| DirectoryTask { remote_path })
            .collect(),
        uploads,
    })
}

fn push_upload(uploads: &mut Vec<UploadTask>, local_path: PathBuf, remote_path: String) {
    debug!(local = %local_path.display(), remote = %remote_path, "queued upload");
    uploads.push(UploadTask {
        local_path,
        remote_path,
    });
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Dir,
    File,
}

/// Visible entries of `dir` of the given kind, sorted by name.
pub(crate) fn list(dir: &Path, kind: EntryKind) -> io::Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = match kind {
            EntryKind::Dir => path.is_dir(),
            EntryKind::File => path.is_file(),
        };
        if !matches {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            warn!(path = %path.display(), "skipping entry with a non UTF-8 name");
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        entries.push((name, path));
    }
    entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
    Ok(entries)
}
