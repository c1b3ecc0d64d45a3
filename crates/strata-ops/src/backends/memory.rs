//! In-memory storage backend.
//!
//! Used for scratch modules and testing. All data is ephemeral.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use strata_core::{
    BackendError, BackendResult, Content, FileDescriptor, ModuleDescriptor, OperationOptions,
    ReadType, Reply, Request, UploadFile, filename_of, join_path, parent_path, split_scheme,
};

use super::query_matcher;
use crate::backend::Backend;

/// Entry in the memory filesystem.
#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, mime: String },
    Directory,
}

impl Entry {
    fn size(&self) -> u64 {
        match self {
            Entry::File { data, .. } => data.len() as u64,
            Entry::Directory => 0,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, Entry>,
    /// Trashed subtrees keyed by their original path.
    trash: BTreeMap<String, Vec<(String, Entry)>>,
}

/// In-memory storage backend.
///
/// Entries are keyed by their full path, scheme included, so one instance
/// can serve several modules and copy or move between them natively. Module
/// roots always exist.
///
/// Thread-safe via internal `RwLock`. All data is lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
    capacity: Option<u64>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that reports free space against `capacity` bytes.
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            state: RwLock::default(),
            capacity: Some(capacity),
        }
    }

    fn read_state(&self) -> BackendResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| BackendError::other("lock poisoned"))
    }

    fn write_state(&self) -> BackendResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| BackendError::other("lock poisoned"))
    }

    fn serve(&self, request: &Request, options: &OperationOptions) -> BackendResult<Reply> {
        match request {
            Request::Find { root, query, limit } => {
                let root = key(&root.path)?;
                let matcher = query_matcher(query)?;
                let state = self.read_state()?;
                let found = descendants(&state.entries, &root)
                    .filter(|(k, _)| matcher.is_match(filename_of(k)))
                    .take(limit.unwrap_or(usize::MAX))
                    .map(|(k, e)| describe(k, e))
                    .collect();
                Ok(Reply::Entries(found))
            }

            Request::Scandir { dir } => {
                let dir = key(&dir.path)?;
                let state = self.read_state()?;
                match lookup(&state.entries, &dir) {
                    Some(Entry::Directory) => {}
                    Some(Entry::File { .. }) => return Err(BackendError::not_a_directory(dir)),
                    None => return Err(BackendError::not_found(dir)),
                }
                let entries = descendants(&state.entries, &dir)
                    .filter(|(k, _)| parent_path(k) == dir)
                    .map(|(k, e)| describe(k, e))
                    .collect();
                Ok(Reply::Entries(entries))
            }

            Request::Write { file, data } => {
                let path = key(&file.path)?;
                let data = data.clone().into_bytes().map_err(BackendError::Other)?;
                let mut state = self.write_state()?;
                put_file(&mut state.entries, &path, data, &file.mime)?;
                Ok(Reply::Done)
            }

            Request::Read { file } => {
                let path = key(&file.path)?;
                let state = self.read_state()?;
                match lookup(&state.entries, &path) {
                    Some(Entry::File { data, mime }) => Ok(Reply::Content(Content::from_bytes(
                        data.clone(),
                        options.read_type,
                        mime,
                    ))),
                    Some(Entry::Directory) => Err(BackendError::is_a_directory(path)),
                    None => Err(BackendError::not_found(path)),
                }
            }

            Request::Copy {
                source,
                destination,
            } => {
                let (from, to) = (key(&source.path)?, key(&destination.path)?);
                let mut state = self.write_state()?;
                let subtree = take_subtree(&state.entries, &from)?;
                transplant(&mut state.entries, &from, &to, subtree)?;
                Ok(Reply::Done)
            }

            Request::Move {
                source,
                destination,
            } => {
                let (from, to) = (key(&source.path)?, key(&destination.path)?);
                if is_root(&from) {
                    return Err(BackendError::invalid_path(from));
                }
                if to.starts_with(&join_path(&from, "")) {
                    return Err(BackendError::invalid_path(format!(
                        "cannot move {from} into itself"
                    )));
                }
                let mut state = self.write_state()?;
                let subtree = take_subtree(&state.entries, &from)?;
                remove_subtree(&mut state.entries, &from);
                transplant(&mut state.entries, &from, &to, subtree)?;
                Ok(Reply::Done)
            }

            Request::Unlink { file } => {
                let path = key(&file.path)?;
                if is_root(&path) {
                    return Err(BackendError::invalid_path(path));
                }
                let mut state = self.write_state()?;
                if remove_subtree(&mut state.entries, &path).is_empty() {
                    return Err(BackendError::not_found(path));
                }
                Ok(Reply::Done)
            }

            Request::Mkdir { dir } => {
                let path = key(&dir.path)?;
                let mut state = self.write_state()?;
                match lookup(&state.entries, &path) {
                    Some(Entry::Directory) => Ok(Reply::Done),
                    Some(Entry::File { .. }) => Err(BackendError::already_exists(path)),
                    None => {
                        ensure_parents(&mut state.entries, &path)?;
                        state.entries.insert(path, Entry::Directory);
                        Ok(Reply::Done)
                    }
                }
            }

            Request::Exists { file } => {
                let path = key(&file.path)?;
                let state = self.read_state()?;
                Ok(Reply::Exists(lookup(&state.entries, &path).is_some()))
            }

            Request::Fileinfo { file } => {
                let path = key(&file.path)?;
                let state = self.read_state()?;
                lookup(&state.entries, &path)
                    .map(|e| Reply::Info(describe(&path, e)))
                    .ok_or_else(|| BackendError::not_found(path))
            }

            Request::Url { file } => {
                let path = key(&file.path)?;
                let state = self.read_state()?;
                match lookup(&state.entries, &path) {
                    Some(Entry::File { data, mime }) => {
                        match Content::from_bytes(data.clone(), ReadType::DataSource, mime) {
                            Content::DataSource(url) => Ok(Reply::Url(url)),
                            _ => Err(BackendError::other("failed to encode data URL")),
                        }
                    }
                    Some(Entry::Directory) => Err(BackendError::is_a_directory(path)),
                    None => Err(BackendError::not_found(path)),
                }
            }

            Request::Upload { file, destination } => {
                let UploadFile {
                    filename,
                    mime,
                    data,
                } = file;
                let dir = key(&destination.path)?;
                let path = join_path(&dir, filename);
                let mut state = self.write_state()?;
                if let Some(Entry::File { .. }) = lookup(&state.entries, &dir) {
                    return Err(BackendError::not_a_directory(dir));
                }
                put_file(&mut state.entries, &path, data.clone(), mime)?;
                Ok(Reply::Info(
                    FileDescriptor::file(path, mime.as_str()).with_size(file.size()),
                ))
            }

            Request::Trash { file } => {
                let path = key(&file.path)?;
                if is_root(&path) {
                    return Err(BackendError::invalid_path(path));
                }
                let mut state = self.write_state()?;
                let subtree = remove_subtree(&mut state.entries, &path);
                if subtree.is_empty() {
                    return Err(BackendError::not_found(path));
                }
                state.trash.insert(path, subtree);
                Ok(Reply::Done)
            }

            Request::Untrash { file } => {
                let path = key(&file.path)?;
                let mut state = self.write_state()?;
                if lookup(&state.entries, &path).is_some() {
                    return Err(BackendError::already_exists(path));
                }
                let subtree = state
                    .trash
                    .remove(&path)
                    .ok_or_else(|| BackendError::not_found(path.clone()))?;
                ensure_parents(&mut state.entries, &path)?;
                state.entries.extend(subtree);
                Ok(Reply::Done)
            }

            Request::EmptyTrash { root } => {
                let (scheme, _) = split_scheme(&root.path);
                let mut state = self.write_state()?;
                state.trash.retain(|k, _| !k.starts_with(scheme));
                Ok(Reply::Done)
            }

            Request::FreeSpace { .. } => {
                let Some(capacity) = self.capacity else {
                    return Ok(Reply::FreeSpace(None));
                };
                let state = self.read_state()?;
                let used: u64 = state.entries.values().map(Entry::size).sum();
                Ok(Reply::FreeSpace(Some(capacity.saturating_sub(used))))
            }
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn handle(
        &self,
        _module: &ModuleDescriptor,
        request: &Request,
        options: &OperationOptions,
    ) -> BackendResult<Reply> {
        self.serve(request, options)
    }
}

/// Canonical key of a path: scheme plus `/`-joined segments.
///
/// Resolves `.` and `..`; climbing above the module root is an error.
fn key(path: &str) -> BackendResult<String> {
    let (scheme, rest) = split_scheme(path);
    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(BackendError::invalid_path(path));
                }
            }
            s => segments.push(s),
        }
    }
    Ok(format!("{scheme}/{}", segments.join("/")))
}

fn is_root(key: &str) -> bool {
    split_scheme(key).1 == "/"
}

static ROOT: Entry = Entry::Directory;

fn lookup<'a>(entries: &'a BTreeMap<String, Entry>, key: &str) -> Option<&'a Entry> {
    if is_root(key) {
        return Some(&ROOT);
    }
    entries.get(key)
}

/// Every entry strictly below `dir`.
fn descendants<'a>(
    entries: &'a BTreeMap<String, Entry>,
    dir: &str,
) -> impl Iterator<Item = (&'a String, &'a Entry)> {
    let prefix = join_path(dir, "");
    entries
        .range(prefix.clone()..)
        .take_while(move |(k, _)| k.starts_with(&prefix))
}

fn describe(key: &str, entry: &Entry) -> FileDescriptor {
    match entry {
        Entry::File { data, mime } => {
            FileDescriptor::file(key, mime.as_str()).with_size(data.len() as u64)
        }
        Entry::Directory => FileDescriptor::directory(key),
    }
}

fn ensure_parents(entries: &mut BTreeMap<String, Entry>, key: &str) -> BackendResult<()> {
    let mut missing = Vec::new();
    let mut parent = parent_path(key);
    while !is_root(&parent) {
        match entries.get(&parent) {
            Some(Entry::Directory) => break,
            Some(Entry::File { .. }) => return Err(BackendError::not_a_directory(parent)),
            None => {
                let next = parent_path(&parent);
                missing.push(parent);
                parent = next;
            }
        }
    }
    for dir in missing {
        entries.insert(dir, Entry::Directory);
    }
    Ok(())
}

fn put_file(
    entries: &mut BTreeMap<String, Entry>,
    key: &str,
    data: Vec<u8>,
    mime: &str,
) -> BackendResult<()> {
    match lookup(entries, key) {
        Some(Entry::Directory) => return Err(BackendError::is_a_directory(key)),
        Some(Entry::File { .. }) | None => {}
    }
    ensure_parents(entries, key)?;
    entries.insert(
        key.to_string(),
        Entry::File {
            data,
            mime: mime.to_string(),
        },
    );
    Ok(())
}

/// Clone `key` and everything below it, with keys relative to `key`.
fn take_subtree(
    entries: &BTreeMap<String, Entry>,
    key: &str,
) -> BackendResult<Vec<(String, Entry)>> {
    let root = lookup(entries, key).ok_or_else(|| BackendError::not_found(key))?;
    let mut subtree = Vec::new();
    if !is_root(key) {
        subtree.push((String::new(), root.clone()));
    }
    let prefix = join_path(key, "");
    for (k, e) in descendants(entries, key) {
        subtree.push((k[prefix.len()..].to_string(), e.clone()));
    }
    Ok(subtree)
}

/// Remove `key` and everything below it, returning the removed entries.
fn remove_subtree(entries: &mut BTreeMap<String, Entry>, key: &str) -> Vec<(String, Entry)> {
    let mut doomed: Vec<String> = descendants(entries, key).map(|(k, _)| k.clone()).collect();
    doomed.push(key.to_string());
    doomed
        .into_iter()
        .filter_map(|k| entries.remove(&k).map(|e| (k, e)))
        .collect()
}

/// Insert a subtree taken from `from` under `to`, replacing whatever is there.
fn transplant(
    entries: &mut BTreeMap<String, Entry>,
    from: &str,
    to: &str,
    subtree: Vec<(String, Entry)>,
) -> BackendResult<()> {
    if is_root(to) {
        return Err(BackendError::invalid_path(to));
    }
    tracing::trace!(from, to, entries = subtree.len(), "memory transplant");
    remove_subtree(entries, to);
    ensure_parents(entries, to)?;
    for (rel, entry) in subtree {
        let target = if rel.is_empty() {
            to.to_string()
        } else {
            join_path(to, &rel)
        };
        entries.insert(target, entry);
    }
    Ok(())
}
