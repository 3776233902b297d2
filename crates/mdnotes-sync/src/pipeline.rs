//! The upload pipeline of a sync run, as a state machine.
//!
//! A run first creates every remote directory, with all requests in flight at once. Once every
//! directory request has completed, files are uploaded strictly one after another. The session
//! never performs I/O itself: it hands out [`Request`]s and advances only when it is told about a
//! [`Completion`] through [`SyncSession::on_complete`].

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use rustc_hash::FxHashMap;
use strum_macros::IntoStaticStr;
use tracing::{debug, info, warn};

use crate::SyncError;
use crate::plan::{DirectoryTask, SyncPlan, UploadTask};

/// Status code a WebDAV server answers `MKCOL` with when the collection already exists.
const ALREADY_EXISTS: u16 = 409;

/// Identifies one dispatched request within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a request should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    CreateDirectory(DirectoryTask),
    Upload(UploadTask),
}

impl Operation {
    pub fn remote_path(&self) -> &str {
        match self {
            Operation::CreateDirectory(DirectoryTask { remote_path })
            | Operation::Upload(UploadTask { remote_path, .. }) => remote_path,
        }
    }
}

/// A request the caller must carry out and later report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: RequestId,
    pub operation: Operation,
}

/// The terminal event of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub id: RequestId,
    pub outcome: TaskOutcome,
}

impl Completion {
    pub fn new(id: RequestId, outcome: TaskOutcome) -> Self {
        Self { id, outcome }
    }
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The server answered.
    Status { code: u16, reason: String },
    /// The request never got an answer.
    Transport(String),
    /// The upload payload could not be read.
    LocalIo(String),
}

impl TaskOutcome {
    pub fn status(code: u16, reason: impl Into<String>) -> Self {
        TaskOutcome::Status {
            code,
            reason: reason.into(),
        }
    }

    /// Whether the server answered with a 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Status { code, .. } if (200..300).contains(code))
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Status { code, reason } => write!(f, "{code} {reason}"),
            TaskOutcome::Transport(msg) => write!(f, "transport error: {msg}"),
            TaskOutcome::LocalIo(msg) => write!(f, "cannot read file: {msg}"),
        }
    }
}

/// The phase of a running sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum RunPhase {
    CreatingDirectories,
    UploadingFiles,
}

impl RunPhase {
    #[inline]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// What the caller has to do after a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Carry out these requests.
    Dispatch(Vec<Request>),
    /// Wait for more completions.
    Wait,
    /// The run is over and the session is idle again.
    Finished(SyncReport),
}

/// An upload that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub outcome: TaskOutcome,
}

/// Counters of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub directories_total: usize,
    pub directories_created: usize,
    /// Directories the server reported as already present.
    pub directories_existing: usize,
    pub directories_failed: usize,
    pub successful_uploads: usize,
    pub failed_uploads: usize,
    pub failures: Vec<UploadFailure>,
}

impl SyncReport {
    /// Whether every upload succeeded. Failed directories alone do not count against a run.
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failed_uploads == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            write!(f, "Sync finished: {} files uploaded", self.successful_uploads)
        } else {
            write!(
                f,
                "Sync finished with errors: {} succeeded, {} failed",
                self.successful_uploads, self.failed_uploads
            )
        }
    }
}

/// Progress of a running sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: RunPhase,
    pub directories_done: usize,
    pub directories_total: usize,
    pub uploads_done: usize,
    pub uploads_total: usize,
}

/// Owns at most one running sync.
///
/// ```rust
/// use mdnotes_sync::{Completion, Step, SyncPlan, SyncSession, TaskOutcome, UploadTask};
///
/// let plan = SyncPlan::new(
///     vec![],
///     vec![UploadTask { local_path: "a.md".into(), remote_path: "a.md".into() }],
/// );
/// let mut session = SyncSession::new();
/// let requests = session.start(plan).unwrap();
/// let step = session.on_complete(Completion::new(requests[0].id, TaskOutcome::status(201, "Created")));
/// let Step::Finished(report) = step else { panic!() };
/// assert_eq!(report.successful_uploads, 1);
/// assert!(!session.is_syncing());
/// ```
#[derive(Debug, Default)]
pub struct SyncSession {
    state: SessionState,
    next_id: u64,
}

#[derive(Debug, Default)]
enum SessionState {
    #[default]
    Idle,
    Running(SyncRun),
}

#[derive(Debug)]
struct SyncRun {
    phase: RunPhase,
    in_flight: FxHashMap<RequestId, Operation>,
    directories_done: usize,
    uploads: VecDeque<UploadTask>,
    uploads_total: usize,
    report: SyncReport,
}

impl SyncRun {
    fn uploads_done(&self) -> usize {
        self.report.successful_uploads + self.report.failed_uploads
    }
}

impl SyncSession {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_syncing(&self) -> bool {
        matches!(self.state, SessionState::Running(_))
    }

    /// The phase of the running sync, if any.
    pub fn phase(&self) -> Option<RunPhase> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Running(run) => Some(run.phase),
        }
    }

    pub fn progress(&self) -> Option<Progress> {
        let SessionState::Running(run) = &self.state else {
            return None;
        };
        Some(Progress {
            phase: run.phase,
            directories_done: run.directories_done,
            directories_total: run.report.directories_total,
            uploads_done: run.uploads_done(),
            uploads_total: run.uploads_total,
        })
    }

    /// Start a run and return its first requests.
    ///
    /// A session that is already syncing rejects the call and leaves its run untouched. A plan
    /// without uploads is rejected with [`SyncError::NothingToSync`].
    pub fn start(&mut self, plan: SyncPlan) -> Result<Vec<Request>, SyncError> {
        if self.is_syncing() {
            warn!("sync requested while another one is running");
            return Err(SyncError::AlreadySyncing);
        }
        if plan.is_empty() {
            return Err(SyncError::NothingToSync);
        }

        let (directories, uploads) = plan.into_parts();
        let mut run = SyncRun {
            phase: RunPhase::CreatingDirectories,
            in_flight: FxHashMap::default(),
            directories_done: 0,
            uploads_total: uploads.len(),
            uploads: uploads.into(),
            report: SyncReport {
                directories_total: directories.len(),
                ..Default::default()
            },
        };

        if directories.is_empty() {
            run.phase = RunPhase::UploadingFiles;
        }
        info!(
            directories = directories.len(),
            files = run.uploads_total,
            phase = run.phase.as_str(),
            "starting sync"
        );

        let requests = if directories.is_empty() {
            self.next_upload(&mut run).into_iter().collect()
        } else {
            directories
                .into_iter()
                .map(|task| self.dispatch(&mut run, Operation::CreateDirectory(task)))
                .collect()
        };
        self.state = SessionState::Running(run);
        Ok(requests)
    }

    /// Drop the running sync, returning its counters so far.
    pub fn abort(&mut self) -> Option<SyncReport> {
        match std::mem::take(&mut self.state) {
            SessionState::Idle => None,
            SessionState::Running(run) => {
                warn!(in_flight = run.in_flight.len(), "sync aborted");
                Some(run.report)
            }
        }
    }

    /// Record the outcome of a request and advance the run.
    pub fn on_complete(&mut self, completion: Completion) -> Step {
        let SessionState::Running(run) = &mut self.state else {
            warn!(id = %completion.id, "completion while no sync is running");
            return Step::Wait;
        };
        let Some(operation) = run.in_flight.remove(&completion.id) else {
            warn!(id = %completion.id, "completion for an unknown request");
            return Step::Wait;
        };

        let outcome = completion.outcome;
        match operation {
            Operation::CreateDirectory(task) => {
                record_directory(&mut run.report, &task, &outcome);
                run.directories_done += 1;
                if run.directories_done < run.report.directories_total {
                    return Step::Wait;
                }
                run.phase = RunPhase::UploadingFiles;
                debug!(phase = run.phase.as_str(), "all directories handled");
            }
            Operation::Upload(task) => record_upload(&mut run.report, task, outcome),
        }
        self.advance()
    }

    /// Dispatch the next upload, or finish the run when none are left.
    fn advance(&mut self) -> Step {
        let SessionState::Running(mut run) = std::mem::take(&mut self.state) else {
            return Step::Wait;
        };
        match self.next_upload(&mut run) {
            Some(request) => {
                self.state = SessionState::Running(run);
                Step::Dispatch(vec![request])
            }
            None => {
                let report = run.report;
                info!(
                    succeeded = report.successful_uploads,
                    failed = report.failed_uploads,
                    "sync finished"
                );
                Step::Finished(report)
            }
        }
    }

    fn next_upload(&mut self, run: &mut SyncRun) -> Option<Request> {
        let task = run.uploads.pop_front()?;
        Some(self.dispatch(run, Operation::Upload(task)))
    }

    fn dispatch(&mut self, run: &mut SyncRun, operation: Operation) -> Request {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        run.in_flight.insert(id, operation.clone());
        Request { id, operation }
    }
}

fn record_directory(report: &mut SyncReport, task: &DirectoryTask, outcome: &TaskOutcome) {
    match outcome {
        _ if outcome.is_success() => {
            debug!(path = %task.remote_path, %outcome, "created directory");
            report.directories_created += 1;
        }
        TaskOutcome::Status {
            code: ALREADY_EXISTS,
            ..
        } => {
            debug!(path = %task.remote_path, "directory already exists");
            report.directories_existing += 1;
        }
        _ => {
            warn!(path = %task.remote_path, %outcome, "failed to create directory");
            report.directories_failed += 1;
        }
    }
}

fn record_upload(report: &mut SyncReport, task: UploadTask, outcome: TaskOutcome) {
    if outcome.is_success() {
        debug!(local = %task.local_path.display(), remote = %task.remote_path, %outcome, "uploaded");
        report.successful_uploads += 1;
    } else {
        warn!(local = %task.local_path.display(), remote = %task.remote_path, %outcome, "upload failed");
        report.failed_uploads += 1;
        report.failures.push(UploadFailure {
            local_path: task.local_path,
            remote_path: task.remote_path,
            outcome,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir(path: &str) -> DirectoryTask {
        DirectoryTask {
            remote_path: path.to_string(),
        }
    }

    fn upload(path: &str) -> UploadTask {
        UploadTask {
            local_path: PathBuf::from("/local").join(path),
            remote_path: path.to_string(),
        }
    }

    fn ok() -> TaskOutcome {
        TaskOutcome::status(201, "Created")
    }

    fn dispatched(step: Step) -> Vec<Request> {
        match step {
            Step::Dispatch(requests) => requests,
            other => panic!("expected dispatch, got {other:?}"),
        }
    }

    #[test]
    fn mixed_outcomes() {
        let plan = SyncPlan::new(
            vec![dir("r/"), dir("r/n/")],
            vec![upload("r/n/a"), upload("r/n/b"), upload("r/n/c")],
        );
        let mut session = SyncSession::new();
        let dirs = session.start(plan).unwrap();
        assert_eq!(dirs.len(), 2);
        assert_eq!(session.phase(), Some(RunPhase::CreatingDirectories));

        assert_eq!(session.on_complete(Completion::new(dirs[0].id, ok())), Step::Wait);
        let first = dispatched(session.on_complete(Completion::new(
            dirs[1].id,
            TaskOutcome::status(409, "Conflict"),
        )));
        assert_eq!(session.phase(), Some(RunPhase::UploadingFiles));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].operation.remote_path(), "r/n/a");

        let second = dispatched(session.on_complete(Completion::new(first[0].id, ok())));
        let third = dispatched(session.on_complete(Completion::new(
            second[0].id,
            TaskOutcome::Transport("connection reset".into()),
        )));
        let Step::Finished(report) = session.on_complete(Completion::new(third[0].id, ok())) else {
            panic!("run should be finished");
        };

        assert_eq!(report.successful_uploads, 2);
        assert_eq!(report.failed_uploads, 1);
        assert_eq!(report.directories_created, 1);
        assert_eq!(report.directories_existing, 1);
        assert_eq!(report.directories_failed, 0);
        assert_eq!(report.failures[0].remote_path, "r/n/b");
        assert_eq!(
            report.to_string(),
            "Sync finished with errors: 2 succeeded, 1 failed"
        );
        assert!(!session.is_syncing());
        assert!(session.start(SyncPlan::new(vec![], vec![upload("x")])).is_ok());
    }

    #[test]
    fn second_start_is_rejected() {
        let mut session = SyncSession::new();
        let requests = session
            .start(SyncPlan::new(vec![dir("r/")], vec![upload("r/a")]))
            .unwrap();
        let before = session.progress();

        let err = session
            .start(SyncPlan::new(vec![], vec![upload("other")]))
            .unwrap_err();
        assert!(matches!(err, SyncError::AlreadySyncing));
        assert_eq!(session.progress(), before);

        let next = dispatched(session.on_complete(Completion::new(requests[0].id, ok())));
        assert_eq!(next[0].operation.remote_path(), "r/a");
    }

    #[test]
    fn empty_plan() {
        let mut session = SyncSession::new();
        let err = session.start(SyncPlan::new(vec![dir("r/")], vec![])).unwrap_err();
        assert!(matches!(err, SyncError::NothingToSync));
        assert!(!err.is_failure());
        assert!(!session.is_syncing());
    }

    #[test]
    fn without_directories_starts_uploading() {
        let mut session = SyncSession::new();
        let requests = session
            .start(SyncPlan::new(vec![], vec![upload("a"), upload("b")]))
            .unwrap();
        assert_eq!(session.phase(), Some(RunPhase::UploadingFiles));
        assert_eq!(requests.len(), 1);
        assert!(matches!(requests[0].operation, Operation::Upload(_)));
    }

    #[test]
    fn failed_directory_does_not_stop_uploads() {
        let mut session = SyncSession::new();
        let requests = session
            .start(SyncPlan::new(vec![dir("r/")], vec![upload("r/a")]))
            .unwrap();
        let next = dispatched(session.on_complete(Completion::new(
            requests[0].id,
            TaskOutcome::status(403, "Forbidden"),
        )));
        let Step::Finished(report) = session.on_complete(Completion::new(next[0].id, ok())) else {
            panic!("run should be finished");
        };
        assert_eq!(report.directories_failed, 1);
        assert!(report.is_clean());
        assert_eq!(report.to_string(), "Sync finished: 1 files uploaded");
    }

    #[test]
    fn unknown_and_duplicate_completions_are_ignored() {
        let mut session = SyncSession::new();
        let requests = session
            .start(SyncPlan::new(vec![dir("r/"), dir("r/n/")], vec![upload("r/n/a")]))
            .unwrap();
        assert_eq!(
            session.on_complete(Completion::new(RequestId(999), ok())),
            Step::Wait
        );
        assert_eq!(session.on_complete(Completion::new(requests[0].id, ok())), Step::Wait);
        assert_eq!(session.on_complete(Completion::new(requests[0].id, ok())), Step::Wait);
        assert_eq!(session.phase(), Some(RunPhase::CreatingDirectories));
        assert_eq!(session.progress().unwrap().directories_done, 1);
    }

    #[test]
    fn idle_session_ignores_completions() {
        let mut session = SyncSession::new();
        assert_eq!(session.on_complete(Completion::new(RequestId(0), ok())), Step::Wait);
    }

    #[test]
    fn local_io_failure_is_a_failed_upload() {
        let mut session = SyncSession::new();
        let requests = session.start(SyncPlan::new(vec![], vec![upload("a")])).unwrap();
        let Step::Finished(report) = session.on_complete(Completion::new(
            requests[0].id,
            TaskOutcome::LocalIo("permission denied".into()),
        )) else {
            panic!("run should be finished");
        };
        assert_eq!(report.failed_uploads, 1);
        assert_eq!(
            report.failures[0].outcome.to_string(),
            "cannot read file: permission denied"
        );
    }

    #[test]
    fn abort_returns_to_idle() {
        let mut session = SyncSession::new();
        assert_eq!(session.abort(), None);
        session.start(SyncPlan::new(vec![], vec![upload("a")])).unwrap();
        let report = session.abort().unwrap();
        assert_eq!(report.successful_uploads, 0);
        assert!(!session.is_syncing());
    }

    #[test]
    fn phase_names() {
        assert_eq!(RunPhase::CreatingDirectories.as_str(), "creating-directories");
        assert_eq!(RunPhase::UploadingFiles.as_str(), "uploading-files");
    }
}
