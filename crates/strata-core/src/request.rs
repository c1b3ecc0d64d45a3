//! The fixed request/reply surface every backend serves.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::content::Content;
use crate::descriptor::FileDescriptor;

/// Names of the operations dispatched to backends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Method {
    Find,
    Scandir,
    Write,
    Read,
    Copy,
    Move,
    Unlink,
    Mkdir,
    Exists,
    Fileinfo,
    Url,
    Upload,
    Download,
    Trash,
    Untrash,
    EmptyTrash,
    FreeSpace,
}

impl Method {
    /// Check if the method changes backend state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Write
                | Self::Copy
                | Self::Move
                | Self::Unlink
                | Self::Mkdir
                | Self::Upload
                | Self::Trash
                | Self::Untrash
                | Self::EmptyTrash
        )
    }
}

/// A file handed to a backend's `upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFile {
    /// Name the file should have at the destination.
    pub filename: String,
    /// MIME type reported by the uploader.
    pub mime: String,
    /// File bytes.
    pub data: Vec<u8>,
}

impl UploadFile {
    /// Create a new upload payload.
    pub fn new(filename: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime: mime.into(),
            data,
        }
    }

    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// A request for a backend, with its method-specific arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Request {
    Find {
        root: FileDescriptor,
        query: String,
        limit: Option<usize>,
    },
    Scandir {
        dir: FileDescriptor,
    },
    Write {
        file: FileDescriptor,
        data: Content,
    },
    Read {
        file: FileDescriptor,
    },
    Copy {
        source: FileDescriptor,
        destination: FileDescriptor,
    },
    Move {
        source: FileDescriptor,
        destination: FileDescriptor,
    },
    Unlink {
        file: FileDescriptor,
    },
    Mkdir {
        dir: FileDescriptor,
    },
    Exists {
        file: FileDescriptor,
    },
    Fileinfo {
        file: FileDescriptor,
    },
    Url {
        file: FileDescriptor,
    },
    Upload {
        file: UploadFile,
        destination: FileDescriptor,
    },
    Trash {
        file: FileDescriptor,
    },
    Untrash {
        file: FileDescriptor,
    },
    EmptyTrash {
        root: FileDescriptor,
    },
    FreeSpace {
        root: FileDescriptor,
    },
}

impl Request {
    /// The method this request invokes.
    pub fn method(&self) -> Method {
        match self {
            Self::Find { .. } => Method::Find,
            Self::Scandir { .. } => Method::Scandir,
            Self::Write { .. } => Method::Write,
            Self::Read { .. } => Method::Read,
            Self::Copy { .. } => Method::Copy,
            Self::Move { .. } => Method::Move,
            Self::Unlink { .. } => Method::Unlink,
            Self::Mkdir { .. } => Method::Mkdir,
            Self::Exists { .. } => Method::Exists,
            Self::Fileinfo { .. } => Method::Fileinfo,
            Self::Url { .. } => Method::Url,
            Self::Upload { .. } => Method::Upload,
            Self::Trash { .. } => Method::Trash,
            Self::Untrash { .. } => Method::Untrash,
            Self::EmptyTrash { .. } => Method::EmptyTrash,
            Self::FreeSpace { .. } => Method::FreeSpace,
        }
    }

    /// The descriptor whose path selects the serving module.
    pub fn target(&self) -> &FileDescriptor {
        match self {
            Self::Find { root, .. } | Self::EmptyTrash { root } | Self::FreeSpace { root } => root,
            Self::Scandir { dir } | Self::Mkdir { dir } => dir,
            Self::Copy { source, .. } | Self::Move { source, .. } => source,
            Self::Upload { destination, .. } => destination,
            Self::Write { file, .. }
            | Self::Read { file }
            | Self::Unlink { file }
            | Self::Exists { file }
            | Self::Fileinfo { file }
            | Self::Url { file }
            | Self::Trash { file }
            | Self::Untrash { file } => file,
        }
    }
}

/// What a backend returns for a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Reply {
    /// The operation completed with nothing to return.
    Done,
    /// Result of `exists`.
    Exists(bool),
    /// Result of `read`.
    Content(Content),
    /// Result of `scandir` and `find`.
    Entries(Vec<FileDescriptor>),
    /// Result of `fileinfo` and `upload`.
    Info(FileDescriptor),
    /// Result of `url`.
    Url(String),
    /// Result of `freeSpace`; `None` when the backend cannot tell.
    FreeSpace(Option<u64>),
}

impl Reply {
    /// Short name of the variant, for diagnostics.
    pub fn variant(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Exists(_) => "exists",
            Self::Content(_) => "content",
            Self::Entries(_) => "entries",
            Self::Info(_) => "info",
            Self::Url(_) => "url",
            Self::FreeSpace(_) => "freeSpace",
        }
    }
}
