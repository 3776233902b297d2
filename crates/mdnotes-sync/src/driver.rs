//! Driving a [`SyncSession`] with a [`Transport`].

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tracing::{error, info};

use crate::SyncError;
use crate::pipeline::{Completion, Operation, Request, Step, SyncReport, SyncSession, TaskOutcome};
use crate::plan::{SyncPlan, plan};
use crate::settings::SyncSettings;
use crate::transport::{Transport, WebDavClient};

/// Run `plan` to completion on `session`.
///
/// Requests handed out by the session are performed concurrently; the session itself makes sure
/// that uploads only come one at a time. An upload's file is read right before it is sent.
///
/// If the returned future is dropped before it finishes, the run is aborted and `session` is idle
/// again.
pub async fn run_sync<T>(
    session: &mut SyncSession,
    transport: &T,
    plan: SyncPlan,
) -> Result<SyncReport, SyncError>
where
    T: Transport + ?Sized,
{
    let requests = session.start(plan)?;
    let mut run = RunGuard(session);
    let mut pending: FuturesUnordered<_> = requests
        .into_iter()
        .map(|request| perform(transport, request))
        .collect();

    while let Some(completion) = pending.next().await {
        match run.0.on_complete(completion) {
            Step::Dispatch(requests) => {
                pending.extend(requests.into_iter().map(|request| perform(transport, request)));
            }
            Step::Wait => {}
            Step::Finished(report) => return Ok(report),
        }
    }

    error!("no requests left but the sync did not finish");
    Err(SyncError::Stalled)
}

/// Aborts a session that is still running when the run ends early.
struct RunGuard<'a>(&'a mut SyncSession);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.0.is_syncing() {
            self.0.abort();
        }
    }
}

async fn perform<T>(transport: &T, request: Request) -> Completion
where
    T: Transport + ?Sized,
{
    let response = match &request.operation {
        Operation::CreateDirectory(task) => transport.create_directory(&task.remote_path).await,
        Operation::Upload(task) => match tokio::fs::read(&task.local_path).await {
            Ok(body) => transport.upload(&task.remote_path, body).await,
            Err(e) => return Completion::new(request.id, TaskOutcome::LocalIo(e.to_string())),
        },
    };
    let outcome = match response {
        Ok(response) => response.into(),
        Err(e) => TaskOutcome::Transport(e.to_string()),
    };
    Completion::new(request.id, outcome)
}

/// Syncs a resource directory using stored settings.
pub struct Syncer<T = WebDavClient> {
    settings: SyncSettings,
    resource_root: PathBuf,
    transport: T,
    session: SyncSession,
}

impl Syncer<WebDavClient> {
    /// Create a syncer talking WebDAV over HTTP.
    ///
    /// Fails with [`SyncError::NotConfigured`] before touching the network or the disk when URL,
    /// username or password is missing.
    pub fn from_settings(
        settings: SyncSettings,
        resource_root: impl Into<PathBuf>,
    ) -> Result<Self, SyncError> {
        if !settings.is_configured() {
            return Err(SyncError::NotConfigured);
        }
        let transport = WebDavClient::new(&settings)?;
        Ok(Self::with_transport(settings, resource_root, transport))
    }
}

impl<T: Transport> Syncer<T> {
    pub fn with_transport(
        settings: SyncSettings,
        resource_root: impl Into<PathBuf>,
        transport: T,
    ) -> Self {
        Self {
            settings,
            resource_root: resource_root.into(),
            transport,
            session: SyncSession::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    #[inline]
    pub fn resource_root(&self) -> &Path {
        &self.resource_root
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Enumerate the resource root without syncing anything.
    pub fn plan(&self) -> Result<SyncPlan, SyncError> {
        Ok(plan(&self.resource_root, &self.settings.remote_path)?)
    }

    /// Plan and run a whole sync.
    pub async fn sync(&mut self) -> Result<SyncReport, SyncError> {
        if !self.settings.is_configured() {
            return Err(SyncError::NotConfigured);
        }
        if self.session.is_syncing() {
            return Err(SyncError::AlreadySyncing);
        }
        let plan = self.plan()?;
        info!(
            root = %self.resource_root.display(),
            remote = %self.settings.remote_path,
            "syncing"
        );
        run_sync(&mut self.session, &self.transport, plan).await
    }
}
