//! Core types for strata.
//!
//! This crate provides the data model shared by every strata crate: file and
//! module descriptors, the fixed request/reply surface, operation options,
//! engine configuration, and the error taxonomy.

mod config;
mod content;
mod descriptor;
mod error;
mod module;
mod options;
mod path;
mod request;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use content::Content;
pub use descriptor::{FileArg, FileDescriptor, FileKind, DEFAULT_MIME, DIRECTORY_MIME};
pub use error::{BackendError, BackendResult, ErrorKind, TransferStage, VfsError, VfsResult};
pub use module::{ModuleConfig, ModuleDescriptor};
pub use options::{
    OperationOptions, OperationOptionsBuilder, ProgressSink, ReadType, ScandirFilter,
    TransferKind, TransferProgress,
};
pub use path::{filename_of, join_path, parent_path, same_path, split_scheme};
pub use request::{Method, Reply, Request, UploadFile};
