use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mdnotes_sync::{
    DirectoryTask, Response, SyncError, SyncPlan, SyncSession, SyncSettings, Syncer, Transport,
    TransportError, UploadTask, run_sync,
};

/// Answers from a fixed script and records every call.
#[derive(Default)]
struct ScriptedTransport {
    directory_status: Vec<(&'static str, u16)>,
    failing_uploads: Vec<&'static str>,
    calls: Mutex<Vec<String>>,
    uploads_in_flight: AtomicUsize,
    max_uploads_in_flight: AtomicUsize,
    /// Uploads never answer while set.
    stuck: AtomicBool,
}

impl ScriptedTransport {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn create_directory(&self, remote_path: &str) -> Result<Response, TransportError> {
        self.calls.lock().unwrap().push(format!("MKCOL {remote_path}"));
        let status = self
            .directory_status
            .iter()
            .find(|(path, _)| *path == remote_path)
            .map_or(201, |(_, status)| *status);
        Ok(Response::new(status, ""))
    }

    async fn upload(&self, remote_path: &str, body: Vec<u8>) -> Result<Response, TransportError> {
        if self.stuck.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let now = self.uploads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_uploads_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.calls
            .lock()
            .unwrap()
            .push(format!("PUT {remote_path} ({} bytes)", body.len()));
        self.uploads_in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing_uploads.iter().any(|path| *path == remote_path) {
            Ok(Response::new(507, "Insufficient Storage"))
        } else {
            Ok(Response::new(201, "Created"))
        }
    }
}

fn write(root: &Path, file: &str, content: &str) {
    let path = root.join(file);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn settings() -> SyncSettings {
    SyncSettings::new("https://dav.example.com/dav", "user", "pass", "Notes")
}

#[tokio::test]
async fn partial_failures_are_counted() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let plan = SyncPlan::new(
        vec![
            DirectoryTask {
                remote_path: "Notes/".into(),
            },
            DirectoryTask {
                remote_path: "Notes/n/".into(),
            },
        ],
        ["a.md", "b.md", "c.md"]
            .into_iter()
            .map(|name| {
                write(root, name, name);
                UploadTask {
                    local_path: root.join(name),
                    remote_path: format!("Notes/n/{name}"),
                }
            })
            .collect(),
    );
    let transport = ScriptedTransport {
        directory_status: vec![("Notes/n/", 409)],
        failing_uploads: vec!["Notes/n/b.md"],
        ..Default::default()
    };

    let mut session = SyncSession::new();
    let report = run_sync(&mut session, &transport, plan).await.unwrap();

    assert_eq!(report.successful_uploads, 2);
    assert_eq!(report.failed_uploads, 1);
    assert_eq!(report.directories_created, 1);
    assert_eq!(report.directories_existing, 1);
    assert_eq!(report.failures[0].remote_path, "Notes/n/b.md");
    assert_eq!(
        report.failures[0].outcome.to_string(),
        "507 Insufficient Storage"
    );
    assert!(!session.is_syncing());
}

#[tokio::test]
async fn directories_first_then_one_upload_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "note1/note1.md", "# one");
    write(dir.path(), "note1/assets/img.png", "png");
    write(dir.path(), "note2/note2.md", "# two");

    let mut syncer = Syncer::with_transport(settings(), dir.path(), ScriptedTransport::default());
    let report = syncer.sync().await.unwrap();
    assert_eq!(report.to_string(), "Sync finished: 3 files uploaded");
    assert_eq!(report.directories_total, 4);

    let transport = syncer.transport();
    let calls = transport.calls();
    let first_put = calls.iter().position(|c| c.starts_with("PUT")).unwrap();
    assert_eq!(first_put, 4);
    assert!(calls[first_put..].iter().all(|c| c.starts_with("PUT")));
    assert_eq!(
        calls[first_put..],
        [
            "PUT Notes/note1/assets/img.png (3 bytes)",
            "PUT Notes/note1/note1.md (5 bytes)",
            "PUT Notes/note2/note2.md (5 bytes)",
        ]
    );
    assert_eq!(transport.max_uploads_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unreadable_file_is_a_failed_upload() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "there.md", "x");
    let plan = SyncPlan::new(
        vec![],
        vec![
            UploadTask {
                local_path: dir.path().join("gone.md"),
                remote_path: "gone.md".into(),
            },
            UploadTask {
                local_path: dir.path().join("there.md"),
                remote_path: "there.md".into(),
            },
        ],
    );
    let transport = ScriptedTransport::default();
    let report = run_sync(&mut SyncSession::new(), &transport, plan)
        .await
        .unwrap();

    assert_eq!(report.failed_uploads, 1);
    assert_eq!(report.successful_uploads, 1);
    assert!(
        report.failures[0]
            .outcome
            .to_string()
            .starts_with("cannot read file")
    );
    assert_eq!(transport.calls(), ["PUT there.md (1 bytes)"]);
}

#[tokio::test]
async fn unconfigured_sync_does_no_io() {
    let dir = tempfile::tempdir().unwrap();
    let settings = SyncSettings::new("https://dav.example.com/", "user", "", "Notes");
    let mut syncer = Syncer::with_transport(
        settings,
        dir.path().join("missing"),
        ScriptedTransport::default(),
    );
    assert!(matches!(syncer.sync().await, Err(SyncError::NotConfigured)));
    assert!(syncer.transport().calls().is_empty());
}

#[tokio::test]
async fn missing_resource_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut syncer = Syncer::with_transport(
        settings(),
        dir.path().join("resources"),
        ScriptedTransport::default(),
    );
    let err = syncer.sync().await.unwrap_err();
    assert!(matches!(err, SyncError::Plan(_)));
    assert!(err.is_failure());
}

#[tokio::test]
async fn nothing_to_sync() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("empty-note")).unwrap();
    let mut syncer = Syncer::with_transport(settings(), dir.path(), ScriptedTransport::default());
    let err = syncer.sync().await.unwrap_err();
    assert!(matches!(err, SyncError::NothingToSync));
    assert!(!err.is_failure());
    assert!(syncer.transport().calls().is_empty());
}

#[tokio::test]
async fn session_accepts_a_new_run_after_finishing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "n/n.md", "text");
    let mut syncer = Syncer::with_transport(settings(), dir.path(), ScriptedTransport::default());
    syncer.sync().await.unwrap();
    let report = syncer.sync().await.unwrap();
    assert_eq!(report.successful_uploads, 1);
}

#[tokio::test]
async fn dropped_sync_leaves_the_session_idle() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "n/n.md", "text");
    let transport = ScriptedTransport::default();
    transport.stuck.store(true, Ordering::SeqCst);
    let mut syncer = Syncer::with_transport(settings(), dir.path(), transport);

    let timed_out = tokio::time::timeout(Duration::from_millis(50), syncer.sync()).await;
    assert!(timed_out.is_err());

    syncer.transport().stuck.store(false, Ordering::SeqCst);
    let report = syncer.sync().await.unwrap();
    assert_eq!(report.successful_uploads, 1);
}

#[tokio::test]
async fn dropped_run_aborts_the_session() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "n/n.md", "text");
    let transport = ScriptedTransport::default();
    transport.stuck.store(true, Ordering::SeqCst);
    let plan = mdnotes_sync::plan(dir.path(), "Notes/").unwrap();
    let mut session = SyncSession::new();

    let timed_out =
        tokio::time::timeout(Duration::from_millis(50), run_sync(&mut session, &transport, plan))
            .await;
    assert!(timed_out.is_err());
    assert!(!session.is_syncing());
}

#[tokio::test]
async fn rejected_start_keeps_the_running_session() {
    let mut session = SyncSession::new();
    let upload = UploadTask {
        local_path: "a.md".into(),
        remote_path: "a.md".to_string(),
    };
    session
        .start(SyncPlan::new(vec![], vec![upload.clone()]))
        .unwrap();

    let transport = ScriptedTransport::default();
    let err = run_sync(&mut session, &transport, SyncPlan::new(vec![], vec![upload]))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::AlreadySyncing));
    assert!(session.is_syncing());
}
