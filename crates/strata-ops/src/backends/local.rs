//! Local filesystem backend.
//!
//! Maps module paths onto a directory of the host filesystem, with path
//! security to prevent escaping the root directory.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use strata_core::{
    BackendError, BackendResult, Content, FileDescriptor, Method, ModuleDescriptor,
    OperationOptions, Reply, Request, join_path, split_scheme,
};

use super::query_matcher;
use crate::backend::Backend;

/// Local filesystem backend.
///
/// All paths are relative to `root`, whatever module they arrive through.
/// For example, if `root` is `/srv/files`, then `home:///docs/a.txt` is
/// `/srv/files/docs/a.txt`. Modules sharing one `LocalBackend` therefore
/// share one tree, which makes native copy and move between them possible.
///
/// `..` components that would climb above the root are rejected.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    /// Create a backend rooted at the given directory.
    ///
    /// The root is canonicalized at construction time to handle symlinks
    /// (e.g. macOS `/tmp` -> `/private/tmp`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    /// Get the root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a module path to a host path under the root.
    fn resolve(&self, path: &str) -> BackendResult<PathBuf> {
        let (_, rest) = split_scheme(path);
        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if depth == 0 {
                        return Err(BackendError::invalid_path(path));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                s => {
                    resolved.push(s);
                    depth += 1;
                }
            }
        }
        Ok(resolved)
    }

    /// Module path of a host path under the root, using the scheme of `like`.
    fn module_path(&self, host: &Path, like: &str) -> String {
        let (scheme, _) = split_scheme(like);
        let relative = host
            .strip_prefix(&self.root)
            .unwrap_or(host)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        format!("{scheme}/{relative}")
    }

    async fn serve(&self, request: &Request, options: &OperationOptions) -> BackendResult<Reply> {
        match request {
            Request::Find { root, query, limit } => {
                let base = self.resolve(&root.path)?;
                let matcher = query_matcher(query)?;
                let limit = limit.unwrap_or(usize::MAX);
                let this = self.clone();
                let like = root.path.clone();

                let found = tokio::task::spawn_blocking(move || {
                    jwalk::WalkDir::new(&base)
                        .skip_hidden(false)
                        .min_depth(1)
                        .into_iter()
                        .filter_map(Result::ok)
                        .filter(|entry| matcher.is_match(entry.file_name()))
                        .take(limit)
                        .filter_map(|entry| {
                            let path = entry.path();
                            let meta = fs::symlink_metadata(&path).ok()?;
                            Some(describe(this.module_path(&path, &like), &meta))
                        })
                        .collect::<Vec<_>>()
                })
                .await
                .map_err(|e| BackendError::other(format!("Task failed: {e}")))?;
                Ok(Reply::Entries(found))
            }

            Request::Scandir { dir } => {
                let host = self.resolve(&dir.path)?;
                let mut reader = tokio::fs::read_dir(&host)
                    .await
                    .map_err(|e| BackendError::io(&dir.path, e))?;

                let mut entries = Vec::new();
                while let Some(entry) = reader
                    .next_entry()
                    .await
                    .map_err(|e| BackendError::io(&dir.path, e))?
                {
                    let Ok(meta) = entry.metadata().await else {
                        continue;
                    };
                    let name = entry.file_name().to_string_lossy().into_owned();
                    entries.push(describe(join_path(&dir.path, &name), &meta));
                }
                Ok(Reply::Entries(entries))
            }

            Request::Write { file, data } => {
                let host = self.resolve(&file.path)?;
                let bytes = data.clone().into_bytes().map_err(BackendError::Other)?;
                if let Some(parent) = host.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| BackendError::io(&file.path, e))?;
                }
                tokio::fs::write(&host, bytes)
                    .await
                    .map_err(|e| BackendError::io(&file.path, e))?;
                Ok(Reply::Done)
            }

            Request::Read { file } => {
                let host = self.resolve(&file.path)?;
                let meta = tokio::fs::metadata(&host)
                    .await
                    .map_err(|e| BackendError::io(&file.path, e))?;
                if meta.is_dir() {
                    return Err(BackendError::is_a_directory(&file.path));
                }
                let bytes = tokio::fs::read(&host)
                    .await
                    .map_err(|e| BackendError::io(&file.path, e))?;
                Ok(Reply::Content(Content::from_bytes(
                    bytes,
                    options.read_type,
                    &file.mime,
                )))
            }

            Request::Copy {
                source,
                destination,
            } => {
                let from = self.resolve(&source.path)?;
                let to = self.resolve(&destination.path)?;
                if to.starts_with(&from) {
                    return Err(BackendError::invalid_path(&destination.path));
                }
                let path = source.path.clone();
                tokio::task::spawn_blocking(move || copy_item(&from, &to))
                    .await
                    .map_err(|e| BackendError::other(format!("Task failed: {e}")))?
                    .map_err(|e| BackendError::io(path, e))?;
                Ok(Reply::Done)
            }

            Request::Move {
                source,
                destination,
            } => {
                let from = self.resolve(&source.path)?;
                let to = self.resolve(&destination.path)?;
                if from == self.root || to.starts_with(&from) {
                    return Err(BackendError::invalid_path(&destination.path));
                }
                let path = source.path.clone();
                tokio::task::spawn_blocking(move || move_item(&from, &to))
                    .await
                    .map_err(|e| BackendError::other(format!("Task failed: {e}")))?
                    .map_err(|e| BackendError::io(path, e))?;
                Ok(Reply::Done)
            }

            Request::Unlink { file } => {
                let host = self.resolve(&file.path)?;
                if host == self.root {
                    return Err(BackendError::invalid_path(&file.path));
                }
                let meta = tokio::fs::symlink_metadata(&host)
                    .await
                    .map_err(|e| BackendError::io(&file.path, e))?;
                let result = if meta.is_dir() {
                    tokio::fs::remove_dir_all(&host).await
                } else {
                    tokio::fs::remove_file(&host).await
                };
                result.map_err(|e| BackendError::io(&file.path, e))?;
                Ok(Reply::Done)
            }

            Request::Mkdir { dir } => {
                let host = self.resolve(&dir.path)?;
                tokio::fs::create_dir_all(&host)
                    .await
                    .map_err(|e| BackendError::io(&dir.path, e))?;
                Ok(Reply::Done)
            }

            Request::Exists { file } => {
                let host = self.resolve(&file.path)?;
                let exists = tokio::fs::try_exists(&host)
                    .await
                    .map_err(|e| BackendError::io(&file.path, e))?;
                Ok(Reply::Exists(exists))
            }

            Request::Fileinfo { file } => {
                let host = self.resolve(&file.path)?;
                let meta = tokio::fs::metadata(&host)
                    .await
                    .map_err(|e| BackendError::io(&file.path, e))?;
                Ok(Reply::Info(describe(file.path.clone(), &meta)))
            }

            Request::Url { file } => {
                let host = self.resolve(&file.path)?;
                Ok(Reply::Url(format!("file://{}", host.display())))
            }

            Request::Upload { file, destination } => {
                let dir = self.resolve(&destination.path)?;
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| BackendError::io(&destination.path, e))?;
                let path = join_path(&destination.path, &file.filename);
                let host = self.resolve(&path)?;
                tokio::fs::write(&host, &file.data)
                    .await
                    .map_err(|e| BackendError::io(&path, e))?;
                Ok(Reply::Info(
                    FileDescriptor::file(path, file.mime.as_str()).with_size(file.size()),
                ))
            }

            Request::Trash { file } => {
                let host = self.resolve(&file.path)?;
                if host == self.root {
                    return Err(BackendError::invalid_path(&file.path));
                }
                tokio::task::spawn_blocking(move || trash::delete(&host))
                    .await
                    .map_err(|e| BackendError::other(format!("Task failed: {e}")))?
                    .map_err(|e| BackendError::other(format!("Failed to move to trash: {e}")))?;
                Ok(Reply::Done)
            }

            Request::Untrash { .. } => Err(BackendError::unsupported(Method::Untrash)),
            Request::EmptyTrash { .. } => Err(BackendError::unsupported(Method::EmptyTrash)),
            Request::FreeSpace { .. } => Ok(Reply::FreeSpace(None)),
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn handle(
        &self,
        _module: &ModuleDescriptor,
        request: &Request,
        options: &OperationOptions,
    ) -> BackendResult<Reply> {
        self.serve(request, options).await
    }
}

fn describe(path: String, meta: &fs::Metadata) -> FileDescriptor {
    if meta.is_dir() {
        FileDescriptor::directory(path)
    } else {
        FileDescriptor::from_path(path).with_size(meta.len())
    }
}

/// Copy a file or directory, replacing the destination.
fn copy_item(source: &Path, dest: &Path) -> std::io::Result<u64> {
    if !source.exists() {
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
    }
    if dest.exists() {
        remove_item(dest)?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if source.is_dir() {
        copy_dir_recursive(source, dest)
    } else {
        fs::copy(source, dest)
    }
}

/// Move a file or directory, replacing the destination.
fn move_item(source: &Path, dest: &Path) -> std::io::Result<()> {
    if !source.exists() {
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound));
    }
    if dest.exists() {
        remove_item(dest)?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    // Try rename first (fast path for same filesystem)
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }

    // Fall back to copy + delete for cross-filesystem moves
    if source.is_dir() {
        copy_dir_recursive(source, dest)?;
        fs::remove_dir_all(source)
    } else {
        fs::copy(source, dest)?;
        fs::remove_file(source)
    }
}

fn remove_item(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Recursively copy a directory.
fn copy_dir_recursive(source: &Path, dest: &Path) -> std::io::Result<u64> {
    fs::create_dir_all(dest)?;

    let mut total_bytes = 0u64;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if path.is_dir() {
            total_bytes += copy_dir_recursive(&path, &dest_path)?;
        } else {
            total_bytes += fs::copy(&path, &dest_path)?;
        }
    }

    Ok(total_bytes)
}
