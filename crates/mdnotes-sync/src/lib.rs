//! Keep a directory of notes and upload it to a WebDAV server.
//!
//! The resource directory holds one folder per note, each with its markdown files and an optional
//! `assets/` folder. A sync run creates the matching remote directories and then uploads every
//! file, one at a time. Individual failures are counted, never fatal.
//!
//! # Usage
//!
//! ```rust,no_run
//! use mdnotes_sync::{SettingsStore, SyncSettings, Syncer};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SettingsStore::open_default()?;
//! let settings = SyncSettings::load(&store);
//! let mut syncer = Syncer::from_settings(settings, "resources")?;
//! let report = syncer.sync().await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
//!
//! The pieces can also be used on their own: [`plan`] enumerates the local tree, [`SyncSession`]
//! is the transport-agnostic state machine, and [`run_sync`] drives a session with any
//! [`Transport`].
//!
//! [`NoteStore`] gives access to the notes themselves, and [`import_image`] copies an image into a
//! note's `assets/` folder.
//!
mod driver;
mod error;
mod notes;
mod pipeline;
mod plan;
pub mod settings;
mod transport;

pub use self::driver::{Syncer, run_sync};
pub use self::error::{NoteError, PlanError, SettingsError, SyncError, TransportError};
pub use self::notes::{Document, DocumentKind, ImportedImage, NoteStore, import_image};
pub use self::pipeline::{
    Completion, Operation, Progress, Request, RequestId, RunPhase, Step, SyncReport, SyncSession,
    TaskOutcome, UploadFailure,
};
pub use self::plan::{DirectoryTask, SyncPlan, UploadTask, plan};
pub use self::settings::{SettingKey, SettingsStore, SyncSettings};
pub use self::transport::{Response, Transport, WebDavClient};
