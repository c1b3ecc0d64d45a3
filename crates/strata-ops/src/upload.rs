//! Upload and download orchestration.
//!
//! Uploads to a pluggable module go straight to its backend. Uploads to the
//! internal module are checked for name clashes and then handed to the
//! configured [`UploadTransport`]. Each file is uploaded by its own task and
//! reports its outcome independently on an [`UploadBatch`].

use std::sync::Arc;

use async_trait::async_trait;
use strata_core::{
    BackendError, EngineConfig, FileArg, FileDescriptor, Method, OperationOptions, Reply, Request,
    UploadFile, VfsError, VfsResult, join_path,
};
use strata_hooks::{Notification, NotificationBus};
use tokio::sync::mpsc;

use crate::UPLOAD_CHANNEL_SIZE;
use crate::dispatcher::{Dispatcher, reply_error, unexpected};
use crate::registry::ModuleRegistry;
use crate::resolver::MetadataResolver;

/// Files to upload and where to put them.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Files, started in this order.
    pub files: Vec<UploadFile>,
    /// Destination directory.
    pub destination: FileArg,
}

/// Completion signal of an upload transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// The file was stored under `filename`.
    Completed {
        filename: String,
        mime: String,
        size: u64,
    },
    /// The user or the transport canceled the upload.
    Canceled,
    /// The upload failed.
    Failed(String),
}

/// Moves file bytes into the internal module.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Upload one file into `destination`.
    async fn upload(
        &self,
        file: &UploadFile,
        destination: &FileDescriptor,
        options: &OperationOptions,
    ) -> UploadStatus;
}

/// Retrieves raw bytes from a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, String>;
}

/// Shown while a download is in flight.
pub trait BusyIndicator: Send + Sync {
    /// Called when a download starts.
    fn show(&self);
    /// Called when the download finishes, whether or not it succeeded.
    fn hide(&self);
}

/// External services upload and download rely on.
#[derive(Clone, Default)]
pub struct Collaborators {
    /// Transport for uploads into the internal module.
    pub upload_transport: Option<Arc<dyn UploadTransport>>,
    /// Fetcher for downloads from the internal module.
    pub fetcher: Option<Arc<dyn Fetcher>>,
    /// Busy indicator for downloads.
    pub busy: Option<Arc<dyn BusyIndicator>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("upload_transport", &self.upload_transport.is_some())
            .field("fetcher", &self.fetcher.is_some())
            .field("busy", &self.busy.is_some())
            .finish()
    }
}

/// Outcome of one file of an upload.
#[derive(Debug)]
pub struct UploadOutcome {
    /// Name of the file as submitted.
    pub filename: String,
    /// The stored file, or why it was not stored.
    pub result: VfsResult<FileDescriptor>,
}

/// Per-file outcomes of an upload, in completion order.
///
/// Outcomes arrive independently; nothing waits for the whole batch unless
/// the caller asks for it with [`join`](Self::join).
#[derive(Debug)]
pub struct UploadBatch {
    rx: mpsc::Receiver<UploadOutcome>,
    total: usize,
}

impl UploadBatch {
    /// Number of files submitted.
    pub fn len(&self) -> usize {
        self.total
    }

    /// Check if the batch holds no files.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Receive the next outcome, or `None` once every file has reported.
    pub async fn recv(&mut self) -> Option<UploadOutcome> {
        self.rx.recv().await
    }

    /// Wait for every file and collect the outcomes.
    pub async fn join(mut self) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(self.total);
        while let Some(outcome) = self.rx.recv().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}

struct BusyGuard(Option<Arc<dyn BusyIndicator>>);

impl BusyGuard {
    fn show(busy: Option<Arc<dyn BusyIndicator>>) -> Self {
        if let Some(busy) = &busy {
            busy.show();
        }
        Self(busy)
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if let Some(busy) = &self.0 {
            busy.hide();
        }
    }
}

/// Implements upload and download.
#[derive(Debug, Clone)]
pub struct UploadOrchestrator {
    registry: Arc<ModuleRegistry>,
    resolver: MetadataResolver,
    dispatcher: Dispatcher,
    bus: NotificationBus,
    config: Arc<EngineConfig>,
    collaborators: Collaborators,
}

impl UploadOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        dispatcher: Dispatcher,
        bus: NotificationBus,
        config: Arc<EngineConfig>,
        collaborators: Collaborators,
    ) -> Self {
        let registry = Arc::clone(dispatcher.registry());
        Self {
            resolver: MetadataResolver::new(Arc::clone(&registry)),
            registry,
            dispatcher,
            bus,
            config,
            collaborators,
        }
    }

    /// Start uploading every file of `request`.
    ///
    /// Argument, module, and read-only errors are returned before any upload
    /// starts.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn upload(
        &self,
        request: UploadRequest,
        options: &OperationOptions,
    ) -> VfsResult<UploadBatch> {
        if request.files.is_empty() {
            return Err(VfsError::argument("Missing files"));
        }
        let destination = self
            .resolver
            .normalize_writable(request.destination, Some("Missing destination"))?;

        let total = request.files.len();
        let (tx, rx) = mpsc::channel(UPLOAD_CHANNEL_SIZE);

        for file in request.files {
            let this = self.clone();
            let tx = tx.clone();
            let destination = destination.clone();
            let options = options.clone();

            tokio::spawn(async move {
                let filename = file.filename.clone();
                let result = this.upload_file(file, &destination, &options).await;
                if let Err(e) = &result {
                    tracing::debug!(%filename, error = %e, "upload failed");
                }
                let _ = tx.send(UploadOutcome { filename, result }).await;
            });
        }

        Ok(UploadBatch { rx, total })
    }

    async fn upload_file(
        &self,
        file: UploadFile,
        destination: &FileDescriptor,
        options: &OperationOptions,
    ) -> VfsResult<FileDescriptor> {
        let stored = if self.registry.is_internal(&destination.path) {
            self.upload_internal(file, destination, options).await?
        } else {
            self.dispatch_upload(file, destination, options).await?
        };

        self.bus.emit(Notification::Uploaded {
            file: stored.clone(),
            actor: self.config.actor.clone(),
        });
        Ok(stored)
    }

    async fn upload_internal(
        &self,
        file: UploadFile,
        destination: &FileDescriptor,
        options: &OperationOptions,
    ) -> VfsResult<FileDescriptor> {
        let target = FileDescriptor::file(join_path(&destination.path, &file.filename), &file.mime);
        if !options.overwrite && self.dispatcher.exists(&target, options).await? {
            return Err(VfsError::already_exists(target.path));
        }

        let Some(transport) = &self.collaborators.upload_transport else {
            return self.dispatch_upload(file, destination, options).await;
        };

        match transport.upload(&file, destination, options).await {
            UploadStatus::Completed {
                filename,
                mime,
                size,
            } => Ok(
                FileDescriptor::file(join_path(&destination.path, &filename), mime).with_size(size),
            ),
            UploadStatus::Canceled => Err(VfsError::UploadCanceled {
                filename: file.filename,
            }),
            UploadStatus::Failed(message) => Err(VfsError::UploadFailed {
                filename: file.filename,
                message,
            }),
        }
    }

    async fn dispatch_upload(
        &self,
        file: UploadFile,
        destination: &FileDescriptor,
        options: &OperationOptions,
    ) -> VfsResult<FileDescriptor> {
        let fallback = FileDescriptor::file(join_path(&destination.path, &file.filename), &file.mime)
            .with_size(file.size());

        let reply = self
            .dispatcher
            .dispatch(
                Request::Upload {
                    file,
                    destination: destination.clone(),
                },
                options,
            )
            .await?;

        match reply {
            Reply::Info(stored) => Ok(stored),
            Reply::Done => Ok(fallback),
            other => Err(unexpected(Method::Upload, &destination.path, &other)),
        }
    }

    /// Download the raw bytes of a file.
    ///
    /// Files of the internal module are fetched through their URL when a
    /// fetcher is configured; everything else is read from the backend.
    pub async fn download(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> VfsResult<Vec<u8>> {
        let file = self.resolver.normalize(file, Some("Missing path"))?;
        let _busy = BusyGuard::show(self.collaborators.busy.clone());

        match &self.collaborators.fetcher {
            Some(fetcher) if self.registry.is_internal(&file.path) => {
                let url = match self
                    .dispatcher
                    .dispatch(Request::Url { file: file.clone() }, options)
                    .await?
                {
                    Reply::Url(url) => url,
                    other => return Err(unexpected(Method::Url, &file.path, &other)),
                };
                fetcher
                    .fetch(&url)
                    .await
                    .map_err(|e| reply_error(Method::Download, &file.path, BackendError::Other(e)))
            }
            _ => self.dispatcher.read_bytes(&file, options).await,
        }
    }
}
