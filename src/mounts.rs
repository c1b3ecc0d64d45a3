//! Mount file loading.
//!
//! A mount file is TOML with an optional `[engine]` table and one
//! `[[mount]]` table per module:
//!
//! ```toml
//! [engine]
//! actor = "alice"
//!
//! [[mount]]
//! name = "home"
//! internal = true
//! backend = "local"
//! path = "~"
//!
//! [[mount]]
//! name = "scratch"
//! backend = "memory"
//! capacity = 1048576
//! ```

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use strata_core::{EngineConfig, ModuleConfig};
use strata_ops::{LocalBackend, MemoryBackend, Vfs, VfsBuilder};

/// Storage behind a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process, lost on exit.
    #[default]
    Memory,
    /// A directory on the host.
    Local,
}

/// One `[[mount]]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountEntry {
    #[serde(flatten)]
    pub module: ModuleConfig,
    #[serde(default)]
    pub backend: BackendKind,
    /// Host directory of a local mount.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Capacity in bytes of a memory mount.
    #[serde(default)]
    pub capacity: Option<u64>,
}

/// Parsed mount file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountFile {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default, rename = "mount")]
    pub mounts: Vec<MountEntry>,
}

impl Default for MountFile {
    fn default() -> Self {
        let home = MountEntry {
            module: ModuleConfig {
                name: "home".into(),
                pattern: None,
                transport: None,
                read_only: false,
                internal: true,
                root: None,
            },
            backend: BackendKind::Local,
            path: Some(PathBuf::from("~")),
            capacity: None,
        };
        let scratch = MountEntry {
            module: ModuleConfig {
                name: "scratch".into(),
                pattern: None,
                transport: None,
                read_only: false,
                internal: false,
                root: None,
            },
            backend: BackendKind::Memory,
            path: None,
            capacity: None,
        };
        Self {
            engine: EngineConfig::default(),
            mounts: vec![home, scratch],
        }
    }
}

impl MountFile {
    /// Default mount file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("strata").join("mounts.toml"))
    }

    /// Load `path`, or the default location when `None`.
    ///
    /// A missing default file yields the built-in mounts; a missing explicit
    /// file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            tracing::debug!(path = %path.display(), "no mount file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read mount file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid mount file {}", path.display()))
    }

    /// Parse mount file content.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Mount every entry and build the engine.
    pub fn into_vfs(self) -> Result<Vfs> {
        let mut builder: VfsBuilder = Vfs::builder().config(self.engine);
        for entry in self.mounts {
            let name = entry.module.name.clone();
            let descriptor = entry
                .module
                .into_descriptor()
                .with_context(|| format!("Invalid mount '{name}'"))?;

            builder = match entry.backend {
                BackendKind::Memory => {
                    let backend = match entry.capacity {
                        Some(capacity) => MemoryBackend::with_capacity(capacity),
                        None => MemoryBackend::new(),
                    };
                    builder.mount(descriptor, backend)
                }
                BackendKind::Local => {
                    let path = entry
                        .path
                        .ok_or_else(|| eyre!("Local mount '{name}' needs a path"))?;
                    builder.mount(descriptor, LocalBackend::new(expand_home(&path)))
                }
            }
            .with_context(|| format!("Cannot mount '{name}'"))?;
            tracing::debug!(module = %name, backend = ?entry.backend, "mounted");
        }
        Ok(builder.build())
    }
}

/// Expand a leading `~` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
