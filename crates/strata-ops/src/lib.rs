//! Dispatch engine for strata.
//!
//! This crate routes a uniform, asynchronous file-operation API over any
//! number of mounted storage backends:
//!
//! - [`ModuleRegistry`] holds the mounted modules and resolves a path to one.
//! - [`MetadataResolver`] turns caller input into a validated [`FileDescriptor`].
//! - [`Dispatcher`] sends a request through the interceptor chain to its backend.
//! - [`TransferOrchestrator`] implements copy/move/delete, emulating transfers
//!   between modules that do not share a transport.
//! - [`UploadOrchestrator`] implements upload/download.
//! - [`ErrorTranslator`] formats failures for callers without losing their kind.
//!
//! [`Vfs`] ties these together behind the full operation surface.
//!
//! [`FileDescriptor`]: strata_core::FileDescriptor

mod backend;
pub mod backends;
mod dispatcher;
mod registry;
mod resolver;
mod transfer;
mod translate;
mod upload;
mod vfs;

pub use backend::Backend;
pub use backends::{LocalBackend, MemoryBackend};
pub use dispatcher::Dispatcher;
pub use registry::{ModuleRegistry, MountedModule};
pub use resolver::MetadataResolver;
pub use transfer::{TransferOrchestrator, TransferPlan};
pub use translate::{ErrorTranslator, OperationError};
pub use upload::{
    BusyIndicator, Collaborators, Fetcher, UploadBatch, UploadOrchestrator, UploadOutcome,
    UploadRequest, UploadStatus, UploadTransport,
};
pub use vfs::{OperationResult, Vfs, VfsBuilder};

/// Default channel buffer size for upload outcomes.
pub const UPLOAD_CHANNEL_SIZE: usize = 100;
