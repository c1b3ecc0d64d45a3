//! The operation surface.

use std::sync::Arc;

use strata_core::{
    Content, DIRECTORY_MIME, EngineConfig, FileArg, FileDescriptor, FileKind, Method,
    ModuleDescriptor, OperationOptions, Reply, Request, VfsError, VfsResult,
};
use strata_hooks::{
    Interceptor, InterceptorChain, Notification, NotificationBus, NotificationEvent,
};
use tokio::sync::broadcast;

use crate::backend::Backend;
use crate::dispatcher::{Dispatcher, unexpected};
use crate::registry::ModuleRegistry;
use crate::resolver::MetadataResolver;
use crate::transfer::{TransferOrchestrator, TransferPlan};
use crate::translate::{ErrorTranslator, OperationError};
use crate::upload::{
    BusyIndicator, Collaborators, Fetcher, UploadBatch, UploadOrchestrator, UploadRequest,
    UploadTransport,
};

/// Result type of the operation surface.
pub type OperationResult<T> = Result<T, OperationError>;

/// Builder for [`Vfs`].
#[derive(Default)]
pub struct VfsBuilder {
    registry: ModuleRegistry,
    interceptors: InterceptorChain,
    config: EngineConfig,
    collaborators: Collaborators,
}

impl VfsBuilder {
    /// Create a builder with no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a backend under a module descriptor.
    pub fn mount(
        mut self,
        descriptor: ModuleDescriptor,
        backend: impl Backend + 'static,
    ) -> VfsResult<Self> {
        self.registry.mount(descriptor, backend)?;
        Ok(self)
    }

    /// Mount a shared backend under a module descriptor.
    pub fn mount_arc(
        mut self,
        descriptor: ModuleDescriptor,
        backend: Arc<dyn Backend>,
    ) -> VfsResult<Self> {
        self.registry.mount_arc(descriptor, backend)?;
        Ok(self)
    }

    /// Use an already assembled registry, replacing any mounts made so far.
    pub fn registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Append an interceptor to the pipeline.
    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Set the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the transport for uploads into the internal module.
    pub fn upload_transport(mut self, transport: impl UploadTransport + 'static) -> Self {
        self.collaborators.upload_transport = Some(Arc::new(transport));
        self
    }

    /// Set the fetcher for downloads from the internal module.
    pub fn fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.collaborators.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Set the busy indicator shown during downloads.
    pub fn busy_indicator(mut self, busy: impl BusyIndicator + 'static) -> Self {
        self.collaborators.busy = Some(Arc::new(busy));
        self
    }

    /// Build the engine.
    pub fn build(self) -> Vfs {
        let registry = Arc::new(self.registry);
        let config = Arc::new(self.config);
        let bus = NotificationBus::new(config.notification_capacity);
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::new(self.interceptors));

        Vfs {
            resolver: MetadataResolver::new(Arc::clone(&registry)),
            transfers: TransferOrchestrator::new(
                dispatcher.clone(),
                bus.clone(),
                Arc::clone(&config),
            ),
            uploads: UploadOrchestrator::new(
                dispatcher.clone(),
                bus.clone(),
                Arc::clone(&config),
                self.collaborators,
            ),
            registry,
            dispatcher,
            bus,
            config,
        }
    }
}

/// Uniform asynchronous file operations over every mounted module.
///
/// Argument and module errors are reported before any backend is called.
/// Failures come back as [`OperationError`], whose message names the
/// operation and whose [`kind`](OperationError::kind) is the kind of the
/// underlying failure.
#[derive(Debug, Clone)]
pub struct Vfs {
    registry: Arc<ModuleRegistry>,
    resolver: MetadataResolver,
    dispatcher: Dispatcher,
    transfers: TransferOrchestrator,
    uploads: UploadOrchestrator,
    bus: NotificationBus,
    config: Arc<EngineConfig>,
}

/// The file an operation is about, for error messages.
struct Subject(Option<String>);

impl Subject {
    fn of(arg: &FileArg) -> Self {
        Self(arg.path().map(str::to_string))
    }

    fn fail(self, method: Method) -> impl FnOnce(VfsError) -> OperationError {
        move |e| ErrorTranslator::translate(method, self.0.as_deref(), e)
    }
}

impl Vfs {
    /// Create a builder.
    pub fn builder() -> VfsBuilder {
        VfsBuilder::new()
    }

    /// The mounted modules.
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.bus.subscribe()
    }

    /// Search below `root` for entries whose name matches `query`.
    pub async fn find(
        &self,
        root: impl Into<FileArg>,
        query: &str,
        limit: Option<usize>,
        options: &OperationOptions,
    ) -> OperationResult<Vec<FileDescriptor>> {
        let root = root.into();
        let subject = Subject::of(&root);
        async {
            let root = self.resolver.normalize(root, None)?;
            let path = root.path.clone();
            let request = Request::Find {
                root,
                query: query.to_string(),
                limit,
            };
            match self.dispatcher.dispatch(request, options).await? {
                Reply::Entries(found) => Ok(found),
                other => Err(unexpected(Method::Find, &path, &other)),
            }
        }
        .await
        .map_err(subject.fail(Method::Find))
    }

    /// List a directory, filtered and sorted per `options.scandir`.
    pub async fn scandir(
        &self,
        dir: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<Vec<FileDescriptor>> {
        let dir = dir.into();
        let subject = Subject::of(&dir);
        async {
            let dir = self.resolver.normalize(dir, None)?;
            let path = dir.path.clone();
            match self
                .dispatcher
                .dispatch(Request::Scandir { dir }, options)
                .await?
            {
                Reply::Entries(entries) => Ok(options.scandir.apply(entries)),
                other => Err(unexpected(Method::Scandir, &path, &other)),
            }
        }
        .await
        .map_err(subject.fail(Method::Scandir))
    }

    /// Write `data` to a file, replacing its contents.
    pub async fn write(
        &self,
        file: impl Into<FileArg>,
        data: impl Into<Content>,
        options: &OperationOptions,
    ) -> OperationResult<()> {
        let file = file.into();
        let subject = Subject::of(&file);
        async {
            let file = self.resolver.normalize_writable(file, None)?;
            let path = file.path.clone();
            self.dispatcher
                .dispatch(
                    Request::Write {
                        file,
                        data: data.into(),
                    },
                    options,
                )
                .await?;
            self.bus.emit(Notification::Written { path });
            Ok::<_, VfsError>(())
        }
        .await
        .map_err(subject.fail(Method::Write))
    }

    /// Read a file in the representation `options.read_type` asks for.
    pub async fn read(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<Content> {
        let file = file.into();
        let subject = Subject::of(&file);
        async {
            let file = self.resolver.normalize(file, None)?;
            let path = file.path.clone();
            match self
                .dispatcher
                .dispatch(Request::Read { file }, options)
                .await?
            {
                Reply::Content(content) => Ok(content),
                other => Err(unexpected(Method::Read, &path, &other)),
            }
        }
        .await
        .map_err(subject.fail(Method::Read))
    }

    /// Copy `source` to `destination`.
    pub async fn copy(
        &self,
        source: impl Into<FileArg>,
        destination: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<TransferPlan> {
        let source = source.into();
        let subject = Subject::of(&source);
        self.transfers
            .copy(source, destination, options)
            .await
            .map_err(subject.fail(Method::Copy))
    }

    /// Move `source` to `destination`.
    pub async fn move_to(
        &self,
        source: impl Into<FileArg>,
        destination: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<TransferPlan> {
        let source = source.into();
        let subject = Subject::of(&source);
        self.transfers
            .move_to(source, destination, options)
            .await
            .map_err(subject.fail(Method::Move))
    }

    /// Alias of [`move_to`](Self::move_to).
    pub async fn rename(
        &self,
        source: impl Into<FileArg>,
        destination: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<TransferPlan> {
        self.move_to(source, destination, options).await
    }

    /// Delete a file or directory.
    pub async fn unlink(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<()> {
        let file = file.into();
        let subject = Subject::of(&file);
        self.transfers
            .unlink(file, options)
            .await
            .map(|_| ())
            .map_err(subject.fail(Method::Unlink))
    }

    /// Alias of [`unlink`](Self::unlink).
    pub async fn delete(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<()> {
        self.unlink(file, options).await
    }

    /// Create a directory.
    ///
    /// Fails with `AlreadyExists` if the path exists, unless
    /// `options.overwrite` is set.
    pub async fn mkdir(
        &self,
        dir: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<()> {
        let dir = dir.into();
        let subject = Subject::of(&dir);
        async {
            let mut dir = self.resolver.normalize_writable(dir, None)?;
            dir.kind = FileKind::Dir;
            dir.mime = DIRECTORY_MIME.to_string();

            if !options.overwrite && self.dispatcher.exists(&dir, options).await? {
                return Err(VfsError::already_exists(dir.path));
            }
            let path = dir.path.clone();
            self.dispatcher
                .dispatch(Request::Mkdir { dir }, options)
                .await?;
            self.bus.emit(Notification::DirectoryCreated { path });
            Ok(())
        }
        .await
        .map_err(subject.fail(Method::Mkdir))
    }

    /// Check if a file or directory exists.
    pub async fn exists(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<bool> {
        let file = file.into();
        let subject = Subject::of(&file);
        async {
            let file = self.resolver.normalize(file, None)?;
            self.dispatcher.exists(&file, options).await
        }
        .await
        .map_err(subject.fail(Method::Exists))
    }

    /// Get the backend's description of a file.
    pub async fn fileinfo(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<FileDescriptor> {
        let file = file.into();
        let subject = Subject::of(&file);
        async {
            let file = self.resolver.normalize(file, None)?;
            let path = file.path.clone();
            match self
                .dispatcher
                .dispatch(Request::Fileinfo { file }, options)
                .await?
            {
                Reply::Info(info) => Ok(info),
                other => Err(unexpected(Method::Fileinfo, &path, &other)),
            }
        }
        .await
        .map_err(subject.fail(Method::Fileinfo))
    }

    /// Get a URL the file can be retrieved from.
    pub async fn url(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<String> {
        let file = file.into();
        let subject = Subject::of(&file);
        async {
            let file = self.resolver.normalize(file, None)?;
            let path = file.path.clone();
            match self
                .dispatcher
                .dispatch(Request::Url { file }, options)
                .await?
            {
                Reply::Url(url) => Ok(url),
                other => Err(unexpected(Method::Url, &path, &other)),
            }
        }
        .await
        .map_err(subject.fail(Method::Url))
    }

    /// Start uploading files; see [`UploadOrchestrator::upload`].
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, since each file is
    /// uploaded on a spawned task.
    pub fn upload(
        &self,
        request: UploadRequest,
        options: &OperationOptions,
    ) -> OperationResult<UploadBatch> {
        let subject = Subject::of(&request.destination);
        self.uploads
            .upload(request, options)
            .map_err(subject.fail(Method::Upload))
    }

    /// Download the raw bytes of a file.
    pub async fn download(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<Vec<u8>> {
        let file = file.into();
        let subject = Subject::of(&file);
        self.uploads
            .download(file, options)
            .await
            .map_err(subject.fail(Method::Download))
    }

    /// Move a file or directory to the module's trash.
    pub async fn trash(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<()> {
        let file = file.into();
        let subject = Subject::of(&file);
        async {
            let file = self.resolver.normalize_writable(file, None)?;
            let path = file.path.clone();
            self.dispatcher
                .dispatch(Request::Trash { file }, options)
                .await?;
            self.bus.emit(Notification::Trashed { path });
            Ok::<_, VfsError>(())
        }
        .await
        .map_err(subject.fail(Method::Trash))
    }

    /// Restore a trashed file or directory to its original path.
    pub async fn untrash(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<()> {
        let file = file.into();
        let subject = Subject::of(&file);
        async {
            let file = self.resolver.normalize_writable(file, None)?;
            let path = file.path.clone();
            self.dispatcher
                .dispatch(Request::Untrash { file }, options)
                .await?;
            self.bus.emit(Notification::Restored { path });
            Ok::<_, VfsError>(())
        }
        .await
        .map_err(subject.fail(Method::Untrash))
    }

    /// Empty the trash of the internal module.
    pub async fn empty_trash(&self, options: &OperationOptions) -> OperationResult<()> {
        let root = self
            .registry
            .internal_module()
            .map(|m| m.descriptor.root.clone());
        match root {
            Some(root) => self.empty_trash_in(root, options).await,
            None => Err(ErrorTranslator::translate(
                Method::EmptyTrash,
                None,
                VfsError::argument("No internal module is mounted"),
            )),
        }
    }

    /// Empty the trash of the module serving `root`.
    pub async fn empty_trash_in(
        &self,
        root: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<()> {
        let root = root.into();
        let subject = Subject::of(&root);
        async {
            let root = self.resolver.normalize_writable(root, None)?;
            let module = self.registry.resolve(&root.path)?.name().to_string();
            self.dispatcher
                .dispatch(Request::EmptyTrash { root }, options)
                .await?;
            self.bus.emit(Notification::TrashEmptied { module });
            Ok::<_, VfsError>(())
        }
        .await
        .map_err(subject.fail(Method::EmptyTrash))
    }

    /// Free space of the module serving `root`, if the backend can tell.
    pub async fn free_space(
        &self,
        root: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> OperationResult<Option<u64>> {
        let root = root.into();
        let subject = Subject::of(&root);
        async {
            let root = self.resolver.normalize(root, None)?;
            let path = root.path.clone();
            match self
                .dispatcher
                .dispatch(Request::FreeSpace { root }, options)
                .await?
            {
                Reply::FreeSpace(space) => Ok(space),
                other => Err(unexpected(Method::FreeSpace, &path, &other)),
            }
        }
        .await
        .map_err(subject.fail(Method::FreeSpace))
    }
}
