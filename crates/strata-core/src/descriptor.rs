//! File descriptor types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::path::filename_of;

/// MIME type used when nothing better is known.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// MIME type reported for directories.
pub const DIRECTORY_MIME: &str = "inode/directory";

/// Whether a descriptor names a file or a directory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileKind {
    /// Regular file.
    #[default]
    File,
    /// Directory.
    Dir,
}

impl FileKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileKind::Dir)
    }
}

/// The canonical reference to a file or directory.
///
/// Built once per call from caller input and not modified for the rest of
/// the operation, except for the destination MIME type during a
/// cross-transport copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Module-qualified path.
    pub path: String,
    /// Backend-specific identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Entry name.
    pub filename: String,
    /// MIME type.
    pub mime: String,
    /// Size in bytes, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// File or directory.
    #[serde(rename = "type", default)]
    pub kind: FileKind,
}

impl FileDescriptor {
    /// Build a descriptor from a bare path.
    ///
    /// A trailing slash marks a directory. The filename is the last path
    /// segment and the MIME type is guessed from its extension.
    pub fn from_path(path: impl Into<String>) -> Self {
        let path = path.into();
        let kind = if path.ends_with('/') {
            FileKind::Dir
        } else {
            FileKind::File
        };
        let filename = filename_of(&path).to_string();
        let mime = match kind {
            FileKind::Dir => DIRECTORY_MIME.to_string(),
            FileKind::File => guess_mime(&filename).to_string(),
        };
        Self {
            path,
            id: None,
            filename,
            mime,
            size: None,
            kind,
        }
    }

    /// Build a file descriptor with an explicit MIME type.
    pub fn file(path: impl Into<String>, mime: impl Into<String>) -> Self {
        let mut desc = Self::from_path(path);
        desc.kind = FileKind::File;
        desc.mime = mime.into();
        desc
    }

    /// Build a directory descriptor.
    pub fn directory(path: impl Into<String>) -> Self {
        let mut desc = Self::from_path(path);
        desc.kind = FileKind::Dir;
        desc.mime = DIRECTORY_MIME.to_string();
        desc
    }

    /// Set the size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Check if this descriptor names a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if the entry is hidden (dot-prefixed name).
    pub fn is_hidden(&self) -> bool {
        self.filename.starts_with('.')
    }
}

/// Loosely-typed file argument accepted at the public boundary.
///
/// Every public operation converts its file arguments through this type so
/// that a plain path, a JSON-like object with a `path` field, and an existing
/// descriptor are all accepted.
#[derive(Debug, Clone)]
pub enum FileArg {
    /// A bare path string.
    Path(String),
    /// An object expected to carry at least a `path` string.
    Object(serde_json::Value),
    /// An already canonical descriptor.
    Descriptor(FileDescriptor),
}

impl FileArg {
    /// The path the argument names, if it has one.
    pub fn path(&self) -> Option<&str> {
        match self {
            FileArg::Path(path) => Some(path.as_str()),
            FileArg::Descriptor(desc) => Some(desc.path.as_str()),
            FileArg::Object(serde_json::Value::String(path)) => Some(path.as_str()),
            FileArg::Object(value) => value.get("path").and_then(|p| p.as_str()),
        }
        .filter(|p| !p.is_empty())
    }

    /// Convert into a descriptor, or `None` when the shape is not usable.
    pub fn into_descriptor(self) -> Option<FileDescriptor> {
        match self {
            FileArg::Path(path) if !path.is_empty() => Some(FileDescriptor::from_path(path)),
            FileArg::Path(_) => None,
            FileArg::Descriptor(desc) if !desc.path.is_empty() => Some(desc),
            FileArg::Descriptor(_) => None,
            FileArg::Object(serde_json::Value::String(path)) => FileArg::Path(path).into_descriptor(),
            FileArg::Object(value) => descriptor_from_object(&value),
        }
    }
}

/// Read the known fields of an object; anything missing is inferred from the path.
fn descriptor_from_object(value: &serde_json::Value) -> Option<FileDescriptor> {
    let object = value.as_object()?;
    let path = object.get("path")?.as_str()?;
    if path.is_empty() {
        return None;
    }

    let mut desc = FileDescriptor::from_path(path);
    if let Some(kind) = object
        .get("type")
        .and_then(|v| v.as_str())
        .and_then(|s| s.parse::<FileKind>().ok())
    {
        desc.kind = kind;
        if kind.is_dir() {
            desc.mime = DIRECTORY_MIME.to_string();
        }
    }
    if let Some(id) = object.get("id").and_then(|v| v.as_str()) {
        desc.id = Some(id.to_string());
    }
    if let Some(filename) = object.get("filename").and_then(|v| v.as_str()) {
        desc.filename = filename.to_string();
    }
    if let Some(mime) = object.get("mime").and_then(|v| v.as_str()) {
        desc.mime = mime.to_string();
    }
    if let Some(size) = object.get("size").and_then(|v| v.as_u64()) {
        desc.size = Some(size);
    }
    Some(desc)
}

impl From<&str> for FileArg {
    fn from(path: &str) -> Self {
        FileArg::Path(path.to_string())
    }
}

impl From<String> for FileArg {
    fn from(path: String) -> Self {
        FileArg::Path(path)
    }
}

impl From<FileDescriptor> for FileArg {
    fn from(desc: FileDescriptor) -> Self {
        FileArg::Descriptor(desc)
    }
}

impl From<&FileDescriptor> for FileArg {
    fn from(desc: &FileDescriptor) -> Self {
        FileArg::Descriptor(desc.clone())
    }
}

impl From<serde_json::Value> for FileArg {
    fn from(value: serde_json::Value) -> Self {
        FileArg::Object(value)
    }
}

/// Guess a MIME type from a file name's extension.
fn guess_mime(filename: &str) -> &'static str {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return DEFAULT_MIME;
    };
    match ext.to_ascii_lowercase().as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        _ => DEFAULT_MIME,
    }
}
