//! Copy, move, and delete.
//!
//! Transfers between modules that share a transport go to the backend as a
//! single native call. Anything else is emulated: the source is read in
//! binary form, written to the destination, and (for a move) unlinked.
//! Each emulated stage aborts the remaining ones on failure.

use std::sync::Arc;

use strata_core::{
    Content, EngineConfig, FileArg, FileDescriptor, OperationOptions, Request, TransferKind,
    TransferProgress, TransferStage, VfsError, VfsResult, parent_path, same_path,
};
use strata_hooks::{Notification, NotificationBus};

use crate::dispatcher::Dispatcher;
use crate::registry::ModuleRegistry;
use crate::resolver::MetadataResolver;

/// State of one copy or move, discarded when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// What is transferred.
    pub source: FileDescriptor,
    /// Where it goes.
    pub destination: FileDescriptor,
    /// Whether a single native call performs the transfer.
    pub same_transport: bool,
    /// Last reported completion percentage.
    pub progress: u8,
}

impl TransferPlan {
    fn advance(&mut self, kind: TransferKind, percent: u8, options: &OperationOptions) {
        self.progress = percent;
        options.report_progress(TransferProgress {
            kind,
            source: self.source.path.clone(),
            destination: self.destination.path.clone(),
            percent,
        });
    }
}

/// Implements copy, move, rename, and unlink on top of the dispatcher.
#[derive(Debug, Clone)]
pub struct TransferOrchestrator {
    registry: Arc<ModuleRegistry>,
    resolver: MetadataResolver,
    dispatcher: Dispatcher,
    bus: NotificationBus,
    config: Arc<EngineConfig>,
}

impl TransferOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        dispatcher: Dispatcher,
        bus: NotificationBus,
        config: Arc<EngineConfig>,
    ) -> Self {
        let registry = Arc::clone(dispatcher.registry());
        Self {
            resolver: MetadataResolver::new(Arc::clone(&registry)),
            registry,
            dispatcher,
            bus,
            config,
        }
    }

    /// Copy `source` to `destination`.
    ///
    /// Checks run in this order, each before any data moves: argument
    /// shapes, destination read-only, module resolution, destination
    /// existence (skipped with `overwrite`).
    pub async fn copy(
        &self,
        source: impl Into<FileArg>,
        destination: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> VfsResult<TransferPlan> {
        let plan = self.prepare(source.into(), destination.into(), options).await?;
        let plan = self.run_copy(plan, TransferKind::Copy, options).await?;

        self.bus.emit(Notification::Copied {
            source: plan.source.path.clone(),
            destination: plan.destination.path.clone(),
            actor: self.config.actor.clone(),
        });
        Ok(plan)
    }

    /// Move `source` to `destination`.
    ///
    /// Between transports this is a full copy (including its own existence
    /// check) followed by an unlink of the source. The source is only
    /// unlinked after the copy succeeded.
    pub async fn move_to(
        &self,
        source: impl Into<FileArg>,
        destination: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> VfsResult<TransferPlan> {
        let mut plan = self.prepare(source.into(), destination.into(), options).await?;

        let plan = if plan.same_transport {
            self.dispatcher
                .dispatch(
                    Request::Move {
                        source: plan.source.clone(),
                        destination: plan.destination.clone(),
                    },
                    options,
                )
                .await?;
            plan.advance(TransferKind::Move, 100, options);
            plan
        } else {
            let source = plan.source.clone();
            let copied = self
                .copy_for_move(plan.source, plan.destination, options)
                .await
                .map_err(|e| VfsError::transfer(TransferStage::Copying, &source.path, e))?;

            self.dispatcher
                .dispatch(
                    Request::Unlink {
                        file: source.clone(),
                    },
                    options,
                )
                .await
                .map_err(|e| VfsError::transfer(TransferStage::Unlinking, &source.path, e))?;
            copied
        };

        self.bus.emit(Notification::Moved {
            source: plan.source.path.clone(),
            destination: plan.destination.path.clone(),
            actor: self.config.actor.clone(),
        });
        Ok(plan)
    }

    /// Alias of [`move_to`](Self::move_to).
    pub async fn rename(
        &self,
        source: impl Into<FileArg>,
        destination: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> VfsResult<TransferPlan> {
        self.move_to(source, destination, options).await
    }

    /// Delete a file or directory.
    ///
    /// Deleting an entry of the user package directory also announces that
    /// package metadata needs regenerating.
    pub async fn unlink(
        &self,
        file: impl Into<FileArg>,
        options: &OperationOptions,
    ) -> VfsResult<FileDescriptor> {
        let file = self.resolver.normalize_writable(file, None)?;
        self.dispatcher
            .dispatch(Request::Unlink { file: file.clone() }, options)
            .await?;

        self.bus.emit(Notification::Deleted {
            path: file.path.clone(),
        });

        let parent = parent_path(&file.path);
        if same_path(&parent, &self.config.package_dir) {
            tracing::debug!(path = %file.path, "package directory changed");
            self.bus.emit(Notification::PackagesChanged { directory: parent });
        }
        Ok(file)
    }

    async fn prepare(
        &self,
        source: FileArg,
        destination: FileArg,
        options: &OperationOptions,
    ) -> VfsResult<TransferPlan> {
        let source = self.resolver.descriptor(source, Some("Missing source"))?;
        let destination = self
            .resolver
            .descriptor(destination, Some("Missing destination"))?;

        self.registry.ensure_writable(&destination.path)?;
        self.resolver.check(&source)?;
        self.resolver.check(&destination)?;

        if !options.overwrite && self.dispatcher.exists(&destination, options).await? {
            return Err(VfsError::already_exists(&destination.path));
        }

        let same_transport = self.registry.same_transport(&source, &destination);
        tracing::debug!(
            source = %source.path,
            destination = %destination.path,
            same_transport,
            "transfer planned"
        );
        Ok(TransferPlan {
            source,
            destination,
            same_transport,
            progress: 0,
        })
    }

    async fn copy_for_move(
        &self,
        source: FileDescriptor,
        destination: FileDescriptor,
        options: &OperationOptions,
    ) -> VfsResult<TransferPlan> {
        let plan = self
            .prepare(source.into(), destination.into(), options)
            .await?;
        self.run_copy(plan, TransferKind::Move, options).await
    }

    async fn run_copy(
        &self,
        mut plan: TransferPlan,
        kind: TransferKind,
        options: &OperationOptions,
    ) -> VfsResult<TransferPlan> {
        if plan.same_transport {
            self.dispatcher
                .dispatch(
                    Request::Copy {
                        source: plan.source.clone(),
                        destination: plan.destination.clone(),
                    },
                    options,
                )
                .await?;
            plan.advance(kind, 100, options);
            return Ok(plan);
        }

        if plan.source.is_dir() {
            return Err(VfsError::UnsupportedTransfer {
                path: plan.source.path.clone(),
            });
        }
        plan.destination.mime = plan.source.mime.clone();

        let bytes = self
            .dispatcher
            .read_bytes(&plan.source, options)
            .await
            .map_err(|e| VfsError::transfer(TransferStage::Reading, &plan.source.path, e))?;
        plan.advance(kind, 50, options);

        self.dispatcher
            .dispatch(
                Request::Write {
                    file: plan.destination.clone(),
                    data: Content::Binary(bytes),
                },
                options,
            )
            .await
            .map_err(|e| VfsError::transfer(TransferStage::Writing, &plan.destination.path, e))?;
        plan.advance(kind, 100, options);

        Ok(plan)
    }
}
