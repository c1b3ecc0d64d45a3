//! File content in the shapes a caller can ask for.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::options::ReadType;

/// File content as produced by `read` or consumed by `write`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Content {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// A `data:` URL with base64 payload.
    DataSource(String),
    /// Raw bytes tagged with a MIME type.
    Blob { mime: String, bytes: Vec<u8> },
}

impl Content {
    /// Shape raw bytes into the requested representation.
    ///
    /// Text conversion is lossy for invalid UTF-8.
    pub fn from_bytes(bytes: Vec<u8>, read_type: ReadType, mime: &str) -> Self {
        match read_type {
            ReadType::Text => Content::Text(String::from_utf8_lossy(&bytes).into_owned()),
            ReadType::Binary => Content::Binary(bytes),
            ReadType::DataSource => {
                Content::DataSource(format!("data:{mime};base64,{}", STANDARD.encode(&bytes)))
            }
            ReadType::Blob => Content::Blob {
                mime: mime.to_string(),
                bytes,
            },
        }
    }

    /// Recover the raw bytes.
    ///
    /// Fails only for a malformed data URL.
    pub fn into_bytes(self) -> Result<Vec<u8>, String> {
        match self {
            Content::Text(text) => Ok(text.into_bytes()),
            Content::Binary(bytes) | Content::Blob { bytes, .. } => Ok(bytes),
            Content::DataSource(url) => {
                let (_, payload) = url
                    .split_once(";base64,")
                    .ok_or_else(|| "data URL is not base64 encoded".to_string())?;
                STANDARD
                    .decode(payload)
                    .map_err(|e| format!("invalid data URL payload: {e}"))
            }
        }
    }

    /// Length of the content in its current representation.
    pub fn len(&self) -> usize {
        match self {
            Content::Text(text) => text.len(),
            Content::Binary(bytes) | Content::Blob { bytes, .. } => bytes.len(),
            Content::DataSource(url) => url.len(),
        }
    }

    /// Check if the content is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Content::Binary(bytes)
    }
}

impl From<&[u8]> for Content {
    fn from(bytes: &[u8]) -> Self {
        Content::Binary(bytes.to_vec())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}
