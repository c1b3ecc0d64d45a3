mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{builder, calls, clear, engine, methods, new_log};
use strata_core::{ErrorKind, FileDescriptor, Method, OperationOptions, UploadFile, VfsError};
use strata_hooks::Notification;
use strata_ops::{BusyIndicator, Fetcher, UploadRequest, UploadStatus, UploadTransport};

/// Completes, cancels, or fails depending on the file name.
struct ScriptedTransport {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl UploadTransport for ScriptedTransport {
    async fn upload(
        &self,
        file: &UploadFile,
        _destination: &FileDescriptor,
        _options: &OperationOptions,
    ) -> UploadStatus {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match file.filename.as_str() {
            "cancel.txt" => UploadStatus::Canceled,
            "broken.txt" => UploadStatus::Failed("connection reset".into()),
            name => UploadStatus::Completed {
                filename: name.to_string(),
                mime: file.mime.clone(),
                size: file.size(),
            },
        }
    }
}

struct RecordingFetcher {
    urls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(b"fetched".to_vec())
    }
}

#[derive(Clone, Default)]
struct CountingBusy {
    shown: Arc<AtomicUsize>,
    hidden: Arc<AtomicUsize>,
}

impl BusyIndicator for CountingBusy {
    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.hidden.fetch_add(1, Ordering::SeqCst);
    }
}

fn request(destination: &str, names: &[&str]) -> UploadRequest {
    UploadRequest {
        files: names
            .iter()
            .map(|name| UploadFile::new(*name, "text/plain", name.as_bytes().to_vec()))
            .collect(),
        destination: destination.into(),
    }
}

#[tokio::test]
async fn test_upload_to_pluggable_module() {
    let log = new_log();
    let vfs = engine(&log);
    let mut events = vfs.subscribe();
    let options = OperationOptions::default();

    let batch = vfs
        .upload(request("a:///inbox", &["one.txt", "two.txt"]), &options)
        .unwrap();
    assert_eq!(batch.len(), 2);

    let mut outcomes = batch.join().await;
    outcomes.sort_by(|a, b| a.filename.cmp(&b.filename));
    let stored: Vec<_> = outcomes
        .into_iter()
        .map(|o| o.result.unwrap().path)
        .collect();
    assert_eq!(stored, vec!["a:///inbox/one.txt", "a:///inbox/two.txt"]);

    assert!(vfs.exists("a:///inbox/two.txt", &options).await.unwrap());
    assert_eq!(
        methods(&log)
            .iter()
            .filter(|m| **m == Method::Upload)
            .count(),
        2
    );

    let uploaded = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e.notification, Notification::Uploaded { .. }))
        .count();
    assert_eq!(uploaded, 2);
}

#[tokio::test]
async fn test_upload_arguments_checked_up_front() {
    let log = new_log();
    let vfs = engine(&log);
    let options = OperationOptions::default();

    let err = vfs.upload(request("a:///inbox", &[]), &options).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentError);
    assert!(err.to_string().ends_with("Missing files"));

    let err = vfs
        .upload(request("", &["one.txt"]), &options)
        .unwrap_err();
    assert!(err.to_string().ends_with("Missing destination"));

    let err = vfs
        .upload(request("ro:///inbox", &["one.txt"]), &options)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);

    let err = vfs
        .upload(request("nowhere:///inbox", &["one.txt"]), &options)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModuleNotFound);

    assert!(calls(&log).is_empty());
}

#[tokio::test]
async fn test_internal_upload_reports_each_file() {
    let log = new_log();
    let transport_calls = Arc::new(AtomicUsize::new(0));
    let vfs = builder(&log)
        .upload_transport(ScriptedTransport {
            calls: Arc::clone(&transport_calls),
        })
        .build();

    let batch = vfs
        .upload(
            request("home:///uploads", &["ok.txt", "cancel.txt", "broken.txt"]),
            &OperationOptions::default(),
        )
        .unwrap();

    for outcome in batch.join().await {
        match outcome.filename.as_str() {
            "ok.txt" => {
                let stored = outcome.result.unwrap();
                assert_eq!(stored.path, "home:///uploads/ok.txt");
                assert_eq!(stored.size, Some(6));
            }
            "cancel.txt" => {
                let err = outcome.result.unwrap_err();
                assert_eq!(err.kind(), ErrorKind::UploadCanceled);
            }
            "broken.txt" => {
                let err = outcome.result.unwrap_err();
                assert!(matches!(
                    err,
                    VfsError::UploadFailed { ref message, .. } if message == "connection reset"
                ));
            }
            other => panic!("unexpected file: {other}"),
        }
    }

    assert_eq!(transport_calls.load(Ordering::SeqCst), 3);
    // Only existence checks reach the backend; the bytes go through the transport.
    assert!(methods(&log).iter().all(|m| *m == Method::Exists));
}

#[tokio::test]
async fn test_internal_upload_name_clash() {
    let log = new_log();
    let transport_calls = Arc::new(AtomicUsize::new(0));
    let vfs = builder(&log)
        .upload_transport(ScriptedTransport {
            calls: Arc::clone(&transport_calls),
        })
        .build();
    let options = OperationOptions::default();

    vfs.write("home:///uploads/ok.txt", "old", &options)
        .await
        .unwrap();

    let outcomes = vfs
        .upload(request("home:///uploads", &["ok.txt"]), &options)
        .unwrap()
        .join()
        .await;
    assert_eq!(outcomes.len(), 1);
    let err = outcomes.into_iter().next().unwrap().result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(transport_calls.load(Ordering::SeqCst), 0);

    let outcomes = vfs
        .upload(
            request("home:///uploads", &["ok.txt"]),
            &OperationOptions::overwriting(),
        )
        .unwrap()
        .join()
        .await;
    assert!(outcomes[0].result.is_ok());
    assert_eq!(transport_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_internal_upload_without_transport_uses_backend() {
    let log = new_log();
    let vfs = engine(&log);
    let options = OperationOptions::default();

    let mut batch = vfs
        .upload(request("home:///uploads", &["a.txt"]), &options)
        .unwrap();
    let outcome = batch.recv().await.unwrap();
    assert_eq!(outcome.result.unwrap().path, "home:///uploads/a.txt");
    assert!(batch.recv().await.is_none());

    assert_eq!(methods(&log), vec![Method::Exists, Method::Upload]);
}

#[tokio::test]
async fn test_download_pluggable_reads_backend() {
    let log = new_log();
    let busy = CountingBusy::default();
    let urls = Arc::new(Mutex::new(Vec::new()));
    let vfs = builder(&log)
        .busy_indicator(busy.clone())
        .fetcher(RecordingFetcher {
            urls: Arc::clone(&urls),
        })
        .build();
    let options = OperationOptions::default();

    vfs.write("a:///report.csv", "a,b", &options).await.unwrap();
    clear(&log);

    let bytes = vfs.download("a:///report.csv", &options).await.unwrap();
    assert_eq!(bytes, b"a,b");
    assert_eq!(methods(&log), vec![Method::Read]);
    assert!(urls.lock().unwrap().is_empty());

    assert_eq!(busy.shown.load(Ordering::SeqCst), 1);
    assert_eq!(busy.hidden.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_download_internal_fetches_url() {
    let log = new_log();
    let busy = CountingBusy::default();
    let urls = Arc::new(Mutex::new(Vec::new()));
    let vfs = builder(&log)
        .busy_indicator(busy.clone())
        .fetcher(RecordingFetcher {
            urls: Arc::clone(&urls),
        })
        .build();
    let options = OperationOptions::default();

    vfs.write("home:///photo.png", "png", &options).await.unwrap();
    clear(&log);

    let bytes = vfs.download("home:///photo.png", &options).await.unwrap();
    assert_eq!(bytes, b"fetched");
    assert_eq!(methods(&log), vec![Method::Url]);
    assert_eq!(urls.lock().unwrap().len(), 1);
    assert!(urls.lock().unwrap()[0].starts_with("data:image/png;base64,"));

    // The indicator is hidden even when the download fails.
    let err = vfs.download("home:///missing.png", &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendException);
    assert_eq!(busy.shown.load(Ordering::SeqCst), 2);
    assert_eq!(busy.hidden.load(Ordering::SeqCst), 2);

    let err = vfs.download("", &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArgumentError);
    assert!(err.to_string().ends_with("Missing path"));
}

#[test]
#[should_panic]
fn test_upload_outside_runtime_panics() {
    let log = new_log();
    let vfs = engine(&log);
    let _ = vfs.upload(
        request("a:///inbox", &["one.txt"]),
        &OperationOptions::default(),
    );
}
