//! Error types for virtual filesystem operations.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::request::Method;

/// Result type for engine operations.
pub type VfsResult<T> = Result<T, VfsError>;

/// Result type for backend implementations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors a storage backend reports.
#[derive(Debug, Error)]
pub enum BackendError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Path is malformed or escapes the module root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The backend does not implement this method.
    #[error("operation '{method}' is not supported")]
    Unsupported { method: Method },

    /// The backend panicked while serving the request.
    #[error("backend panicked: {0}")]
    Panicked(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create an Unsupported error.
    pub fn unsupported(method: Method) -> Self {
        Self::Unsupported { method }
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an error from an I/O error for the given path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.into()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.into()),
            std::io::ErrorKind::NotADirectory => Self::NotADirectory(path.into()),
            std::io::ErrorKind::IsADirectory => Self::IsADirectory(path.into()),
            std::io::ErrorKind::DirectoryNotEmpty => Self::DirectoryNotEmpty(path.into()),
            _ => Self::Io(source),
        }
    }
}

/// Stage of an emulated transfer at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransferStage {
    /// Reading the source.
    Reading,
    /// Writing the destination.
    Writing,
    /// Copying as the first half of a move.
    Copying,
    /// Removing the source after a copy.
    Unlinking,
}

/// Discriminant of [`VfsError`], stable for callers that branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ErrorKind {
    ArgumentError,
    ModuleNotFound,
    ReadOnlyViolation,
    AlreadyExists,
    UnsupportedTransfer,
    TransferError,
    UploadCanceled,
    UploadFailed,
    BackendException,
}

/// Errors raised by the dispatch engine.
#[derive(Debug, Error)]
pub enum VfsError {
    /// A call's inputs have the wrong shape.
    #[error("{message}")]
    Argument { message: String },

    /// No mounted module matches the path.
    #[error("No module found for path: {path}")]
    ModuleNotFound { path: String },

    /// Mutating operation against a read-only module.
    #[error("Module '{module}' is read-only")]
    ReadOnly { module: CompactString },

    /// Destination exists and overwrite was not requested.
    #[error("Target already exists: {path}")]
    AlreadyExists { path: String },

    /// Directory copy between modules that do not share a transport.
    #[error("Cannot copy directory '{path}' between different transports")]
    UnsupportedTransfer { path: String },

    /// Failure during a stage of an emulated copy or move.
    #[error("Transfer failed while {stage} '{path}': {source}")]
    Transfer {
        stage: TransferStage,
        path: String,
        #[source]
        source: Box<VfsError>,
    },

    /// The upload transport reported cancellation.
    #[error("Upload of '{filename}' was canceled")]
    UploadCanceled { filename: String },

    /// The upload transport reported a failure.
    #[error("Upload of '{filename}' failed: {message}")]
    UploadFailed { filename: String, message: String },

    /// The backend failed or panicked.
    #[error("{module}: {method} failed: {source}")]
    Backend {
        module: CompactString,
        method: Method,
        #[source]
        source: BackendError,
    },
}

impl VfsError {
    /// Create an Argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    /// Create a ModuleNotFound error.
    pub fn module_not_found(path: impl Into<String>) -> Self {
        Self::ModuleNotFound { path: path.into() }
    }

    /// Create a ReadOnly error.
    pub fn read_only(module: impl Into<CompactString>) -> Self {
        Self::ReadOnly {
            module: module.into(),
        }
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Create a Backend error.
    pub fn backend(module: impl Into<CompactString>, method: Method, source: BackendError) -> Self {
        Self::Backend {
            module: module.into(),
            method,
            source,
        }
    }

    /// Wrap an error as a failed transfer stage.
    ///
    /// An error that already is a transfer failure is returned unchanged so
    /// nested stages (move -> copy -> write) report the innermost stage.
    pub fn transfer(stage: TransferStage, path: impl Into<String>, source: VfsError) -> Self {
        match source {
            err @ VfsError::Transfer { .. } => err,
            other => Self::Transfer {
                stage,
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument { .. } => ErrorKind::ArgumentError,
            Self::ModuleNotFound { .. } => ErrorKind::ModuleNotFound,
            Self::ReadOnly { .. } => ErrorKind::ReadOnlyViolation,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::UnsupportedTransfer { .. } => ErrorKind::UnsupportedTransfer,
            Self::Transfer { .. } => ErrorKind::TransferError,
            Self::UploadCanceled { .. } => ErrorKind::UploadCanceled,
            Self::UploadFailed { .. } => ErrorKind::UploadFailed,
            Self::Backend { .. } => ErrorKind::BackendException,
        }
    }

    /// The error a transfer failure wraps, or `self` for any other error.
    pub fn root_cause(&self) -> &VfsError {
        match self {
            Self::Transfer { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(VfsError::argument("x").kind(), ErrorKind::ArgumentError);
        assert_eq!(
            VfsError::read_only("home").kind(),
            ErrorKind::ReadOnlyViolation
        );
        assert_eq!(ErrorKind::ModuleNotFound.to_string(), "ModuleNotFound");
    }

    #[test]
    fn test_transfer_wrapping_is_not_nested() {
        let inner = VfsError::backend("b", Method::Write, BackendError::other("disk full"));
        let wrapped = VfsError::transfer(TransferStage::Writing, "b:///y", inner);
        let rewrapped = VfsError::transfer(TransferStage::Copying, "a:///x", wrapped);

        match &rewrapped {
            VfsError::Transfer { stage, path, .. } => {
                assert_eq!(*stage, TransferStage::Writing);
                assert_eq!(path, "b:///y");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(rewrapped.root_cause().kind(), ErrorKind::BackendException);
    }

    #[test]
    fn test_io_error_mapping() {
        let err = BackendError::io(
            "home:///a",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, BackendError::NotFound(ref p) if p == "home:///a"));

        let err = BackendError::io(
            "home:///a",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
        );
        assert!(matches!(err, BackendError::Io(_)));
    }

    #[test]
    fn test_messages() {
        let err = VfsError::read_only("archive");
        assert_eq!(err.to_string(), "Module 'archive' is read-only");

        let err = VfsError::backend("home", Method::Read, BackendError::not_found("x"));
        assert_eq!(err.to_string(), "home: read failed: not found: x");
    }
}
