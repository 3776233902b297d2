//! The local note tree.
//!
//! Every folder directly below the resource root is a note. A note's main file is
//! `<note>/<note>.md`; next to it may live further markdown and PDF documents and an `assets/`
//! folder with images referenced from the markdown.

use std::fs;
use std::path::{Path, PathBuf};

use strum_macros::IntoStaticStr;
use tracing::{debug, info};

use crate::error::NoteError;
use crate::plan::{ASSETS_DIR, EntryKind, list};

/// What a document inside a note folder is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum DocumentKind {
    Markdown,
    Pdf,
}

impl DocumentKind {
    /// Classify a file by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "md" | "markdown" => Some(DocumentKind::Markdown),
            "pdf" => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A markdown or PDF file of a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub path: PathBuf,
    pub kind: DocumentKind,
}

/// An image copied into a note's `assets/` folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedImage {
    /// Where the copy was written.
    pub path: PathBuf,
    /// Markdown that embeds the copy, relative to the markdown file.
    pub link: String,
}

/// The resource root and the notes below it.
#[derive(Debug, Clone)]
pub struct NoteStore {
    root: PathBuf,
}

impl NoteStore {
    /// Open the resource root, creating it if it does not exist yet.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, NoteError> {
        let root = root.into();
        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|source| NoteError::Io {
                path: root.clone(),
                source,
            })?;
            info!(root = %root.display(), "created resource directory");
        }
        Ok(Self { root })
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Names of all notes, sorted. Hidden folders are not notes.
    pub fn notes(&self) -> Result<Vec<String>, NoteError> {
        let entries = list(&self.root, EntryKind::Dir).map_err(|source| NoteError::Io {
            path: self.root.clone(),
            source,
        })?;
        Ok(entries.into_iter().map(|(name, _)| name).collect())
    }

    /// The markdown and PDF documents of `note`, sorted by name.
    ///
    /// A note without a folder has no documents.
    pub fn documents(&self, note: &str) -> Result<Vec<Document>, NoteError> {
        let dir = self.note_dir(note)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = list(&dir, EntryKind::File).map_err(|source| NoteError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(entries
            .into_iter()
            .filter_map(|(name, path)| {
                let kind = DocumentKind::from_path(&path)?;
                Some(Document { name, path, kind })
            })
            .collect())
    }

    /// Path of the main markdown file of `note`, whether it exists or not.
    pub fn note_path(&self, note: &str) -> Result<PathBuf, NoteError> {
        Ok(self.note_dir(note)?.join(format!("{note}.md")))
    }

    /// Read the main markdown file of `note`.
    pub fn load_note(&self, note: &str) -> Result<String, NoteError> {
        let path = self.note_path(note)?;
        if !path.is_file() {
            return Err(NoteError::MissingNote(note.to_string()));
        }
        fs::read_to_string(&path).map_err(|source| NoteError::Io { path, source })
    }

    fn note_dir(&self, note: &str) -> Result<PathBuf, NoteError> {
        if note.is_empty() || note.starts_with('.') || note.contains(['/', '\\']) {
            return Err(NoteError::InvalidName(note.to_string()));
        }
        Ok(self.root.join(note))
    }
}

/// Copy the image at `source` into the `assets/` folder next to `markdown_file`.
///
/// An existing file of the same name is never overwritten: the copy is renamed to
/// `<stem>_<n>.<extension>` with the smallest free `n`, starting at 1. The returned link has the
/// form `![<stem>](assets/<file>)`.
pub fn import_image(markdown_file: &Path, source: &Path) -> Result<ImportedImage, NoteError> {
    if !markdown_file.is_file() {
        return Err(NoteError::NotAFile(markdown_file.to_path_buf()));
    }
    if !source.is_file() {
        return Err(NoteError::NotAFile(source.to_path_buf()));
    }
    let Some(file_name) = source.file_name().and_then(|name| name.to_str()) else {
        return Err(NoteError::InvalidName(source.display().to_string()));
    };

    let assets = markdown_file
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(ASSETS_DIR);
    fs::create_dir_all(&assets).map_err(|source| NoteError::Io {
        path: assets.clone(),
        source,
    })?;

    let file_name = free_name(&assets, file_name);
    let path = assets.join(&file_name);
    fs::copy(source, &path).map_err(|e| NoteError::Io {
        path: path.clone(),
        source: e,
    })?;
    debug!(from = %source.display(), to = %path.display(), "imported image");

    let stem = Path::new(&file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(&file_name);
    let link = format!("![{stem}]({})", link_target(&format!("{ASSETS_DIR}/{file_name}")));
    Ok(ImportedImage { path, link })
}

/// `file_name`, or the first `<stem>_<n>.<extension>` that does not exist in `dir`.
fn free_name(dir: &Path, file_name: &str) -> String {
    if !dir.join(file_name).exists() {
        return file_name.to_string();
    }
    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    let extension = name.extension().and_then(|ext| ext.to_str());
    let mut counter = 1;
    loop {
        let candidate = match extension {
            Some(extension) => format!("{stem}_{counter}.{extension}"),
            None => format!("{stem}_{counter}"),
        };
        if !dir.join(&candidate).exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Link destinations with spaces or parentheses need angle brackets in CommonMark.
fn link_target(path: &str) -> String {
    if path.contains([' ', '(', ')']) {
        format!("<{path}>")
    } else {
        path.to_string()
    }
}
