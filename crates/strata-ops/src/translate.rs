//! Caller-facing error formatting.

use strata_core::{ErrorKind, Method, VfsError};
use thiserror::Error;

/// A failed operation, formatted for display.
///
/// The message prefixes the cause with an operation-specific template; the
/// cause itself is kept intact so callers can branch on [`kind`](Self::kind).
#[derive(Debug, Error)]
#[error("{message}")]
pub struct OperationError {
    /// The operation that failed.
    pub method: Method,
    /// Formatted message.
    pub message: String,
    /// The underlying error.
    #[source]
    pub cause: VfsError,
}

impl OperationError {
    /// Kind of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }
}

/// Formats engine errors per operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Wrap `cause` with the template for `method`.
    ///
    /// `subject` names the file the operation was about, when known.
    pub fn translate(method: Method, subject: Option<&str>, cause: VfsError) -> OperationError {
        let verb = verb(method);
        let message = match subject {
            Some(subject) if !subject.is_empty() => {
                format!("An error occurred while {verb} '{subject}': {cause}")
            }
            _ => format!("An error occurred while {verb}: {cause}"),
        };
        OperationError {
            method,
            message,
            cause,
        }
    }
}

fn verb(method: Method) -> &'static str {
    match method {
        Method::Find => "searching",
        Method::Scandir => "reading directory",
        Method::Write => "writing",
        Method::Read => "reading",
        Method::Copy => "copying",
        Method::Move => "moving",
        Method::Unlink => "deleting",
        Method::Mkdir => "creating directory",
        Method::Exists => "checking existence of",
        Method::Fileinfo => "getting info for",
        Method::Url => "getting URL for",
        Method::Upload => "uploading",
        Method::Download => "downloading",
        Method::Trash => "trashing",
        Method::Untrash => "restoring",
        Method::EmptyTrash => "emptying trash",
        Method::FreeSpace => "checking free space",
    }
}
