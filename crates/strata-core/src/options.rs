//! Operation options and transfer progress reporting.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::sync::mpsc;

use crate::descriptor::FileDescriptor;

/// Representation requested from `read`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReadType {
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    #[default]
    Binary,
    /// A base64 `data:` URL.
    DataSource,
    /// Bytes tagged with the file's MIME type.
    Blob,
}

/// Listing filter applied to `scandir` results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScandirFilter {
    /// Include dot-prefixed entries.
    #[serde(default = "default_true")]
    pub show_hidden: bool,
    /// Keep only files whose MIME type starts with one of these prefixes.
    /// Directories are always kept. Empty means no filtering.
    #[serde(default)]
    pub mime_filter: Vec<String>,
    /// Sort directories first, then by file name.
    #[serde(default = "default_true")]
    pub sort: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ScandirFilter {
    fn default() -> Self {
        Self {
            show_hidden: true,
            mime_filter: Vec::new(),
            sort: true,
        }
    }
}

impl ScandirFilter {
    /// Filter and order a directory listing.
    pub fn apply(&self, mut entries: Vec<FileDescriptor>) -> Vec<FileDescriptor> {
        entries.retain(|entry| {
            (self.show_hidden || !entry.is_hidden())
                && (entry.is_dir()
                    || self.mime_filter.is_empty()
                    || self
                        .mime_filter
                        .iter()
                        .any(|prefix| entry.mime.starts_with(prefix.as_str())))
        });
        if self.sort {
            entries.sort_by(|a, b| {
                b.is_dir()
                    .cmp(&a.is_dir())
                    .then_with(|| a.filename.to_lowercase().cmp(&b.filename.to_lowercase()))
            });
        }
        entries
    }
}

/// Which transfer a progress update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum TransferKind {
    Copy,
    Move,
}

/// A single progress update for a copy or move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferProgress {
    /// The transfer being reported.
    pub kind: TransferKind,
    /// Source path.
    pub source: String,
    /// Destination path.
    pub destination: String,
    /// Completion percentage (0 to 100).
    pub percent: u8,
}

/// Receiving end for transfer progress, usually a progress dialog.
///
/// Sends never block and a dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<TransferProgress>,
}

impl ProgressSink {
    /// Create a sink and the receiver that observes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransferProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report a progress update.
    pub fn report(&self, progress: TransferProgress) {
        let _ = self.tx.send(progress);
    }
}

/// Options recognized across the operation surface.
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into), default)]
pub struct OperationOptions {
    /// Replace an existing destination instead of failing.
    pub overwrite: bool,
    /// Representation returned by `read`.
    pub read_type: ReadType,
    /// Where copy/move progress is reported.
    #[builder(setter(strip_option))]
    pub progress: Option<ProgressSink>,
    /// Listing filter for `scandir`.
    pub scandir: ScandirFilter,
}

impl OperationOptions {
    /// Create an options builder.
    pub fn builder() -> OperationOptionsBuilder {
        OperationOptionsBuilder::default()
    }

    /// Options that allow overwriting the destination.
    pub fn overwriting() -> Self {
        Self {
            overwrite: true,
            ..Default::default()
        }
    }

    /// Options that read with the given representation.
    pub fn reading(read_type: ReadType) -> Self {
        Self {
            read_type,
            ..Default::default()
        }
    }

    /// Copy of these options with a different read representation.
    pub fn with_read_type(&self, read_type: ReadType) -> Self {
        Self {
            read_type,
            ..self.clone()
        }
    }

    /// Report progress to the configured sink, if any.
    pub fn report_progress(&self, progress: TransferProgress) {
        if let Some(sink) = &self.progress {
            sink.report(progress);
        }
    }
}
