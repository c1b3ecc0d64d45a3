//! The set of mounted modules.

use std::sync::Arc;

use compact_str::CompactString;
use indexmap::IndexMap;
use strata_core::{FileDescriptor, ModuleDescriptor, VfsError, VfsResult};

use crate::backend::Backend;

/// A module together with the backend serving it.
#[derive(Clone)]
pub struct MountedModule {
    /// The module's descriptor.
    pub descriptor: Arc<ModuleDescriptor>,
    /// The backend serving the module.
    pub backend: Arc<dyn Backend>,
}

impl std::fmt::Debug for MountedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedModule")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

impl MountedModule {
    /// The module's name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Mounted modules in registration order.
///
/// The registry is assembled before the engine starts and shared read-only
/// afterwards; mounting and unmounting need exclusive access.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<CompactString, MountedModule>,
}

impl ModuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a backend under a module descriptor.
    ///
    /// Fails if a module with the same name is already mounted.
    pub fn mount(
        &mut self,
        descriptor: ModuleDescriptor,
        backend: impl Backend + 'static,
    ) -> VfsResult<()> {
        self.mount_arc(descriptor, Arc::new(backend))
    }

    /// Mount a backend (already wrapped in Arc) under a module descriptor.
    pub fn mount_arc(
        &mut self,
        descriptor: ModuleDescriptor,
        backend: Arc<dyn Backend>,
    ) -> VfsResult<()> {
        if self.modules.contains_key(&descriptor.name) {
            return Err(VfsError::argument(format!(
                "Module '{}' is already mounted",
                descriptor.name
            )));
        }
        tracing::debug!(module = %descriptor.name, pattern = %descriptor.pattern, "mounted module");
        self.modules.insert(
            descriptor.name.clone(),
            MountedModule {
                descriptor: Arc::new(descriptor),
                backend,
            },
        );
        Ok(())
    }

    /// Unmount a module by name.
    ///
    /// Returns `true` if a module was removed.
    pub fn unmount(&mut self, name: &str) -> bool {
        self.modules.shift_remove(name).is_some()
    }

    /// Look up a module by name.
    pub fn get(&self, name: &str) -> Option<&MountedModule> {
        self.modules.get(name)
    }

    /// Iterate over mounted modules in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &MountedModule> {
        self.modules.values()
    }

    /// Number of mounted modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Check if no module is mounted.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Resolve the module serving `path`, or `None` when nothing matches.
    ///
    /// Patterns are expected not to overlap; if several match, the first
    /// registered wins.
    pub fn resolve_optional(&self, path: &str) -> Option<&MountedModule> {
        let mut matches = self.modules.values().filter(|m| m.descriptor.matches(path));
        let first = matches.next()?;
        if let Some(other) = matches.next() {
            tracing::warn!(
                path,
                chosen = first.name(),
                also = other.name(),
                "multiple modules match path"
            );
        }
        Some(first)
    }

    /// Resolve the module serving `path`, failing with `ModuleNotFound`.
    pub fn resolve(&self, path: &str) -> VfsResult<MountedModule> {
        self.resolve_optional(path)
            .cloned()
            .ok_or_else(|| VfsError::module_not_found(path))
    }

    /// Check if `path` resolves to the internal module.
    pub fn is_internal(&self, path: &str) -> bool {
        self.resolve_optional(path)
            .is_some_and(|m| m.descriptor.internal)
    }

    /// The first module flagged internal.
    pub fn internal_module(&self) -> Option<&MountedModule> {
        self.modules.values().find(|m| m.descriptor.internal)
    }

    /// Check if two descriptors can be transferred with a single native call.
    ///
    /// True when both resolve to internal modules, when both modules declare
    /// the same non-empty transport, or when both resolve to the same module.
    pub fn same_transport(&self, a: &FileDescriptor, b: &FileDescriptor) -> bool {
        let (Some(ma), Some(mb)) = (
            self.resolve_optional(&a.path),
            self.resolve_optional(&b.path),
        ) else {
            return false;
        };
        let (da, db) = (&ma.descriptor, &mb.descriptor);

        if da.internal && db.internal {
            return true;
        }
        if let (Some(ta), Some(tb)) = (da.transport_id(), db.transport_id()) {
            if ta == tb {
                return true;
            }
        }
        da.name == db.name
    }

    /// Fail with `ReadOnly` if `path` resolves to a read-only module.
    ///
    /// A path that resolves to nothing passes; resolution errors are reported
    /// by the resolver.
    pub fn ensure_writable(&self, path: &str) -> VfsResult<()> {
        match self.resolve_optional(path) {
            Some(m) if m.descriptor.read_only => Err(VfsError::read_only(m.descriptor.name.clone())),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use strata_core::ErrorKind;

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        registry
            .mount(
                ModuleDescriptor::new("home").unwrap().internal(true),
                MemoryBackend::new(),
            )
            .unwrap();
        registry
            .mount(
                ModuleDescriptor::new("osjs").unwrap().internal(true).read_only(true),
                MemoryBackend::new(),
            )
            .unwrap();
        registry
            .mount(
                ModuleDescriptor::new("dav").unwrap().transport("webdav"),
                MemoryBackend::new(),
            )
            .unwrap();
        registry
            .mount(
                ModuleDescriptor::new("dav2").unwrap().transport("webdav"),
                MemoryBackend::new(),
            )
            .unwrap();
        registry
            .mount(ModuleDescriptor::new("drive").unwrap(), MemoryBackend::new())
            .unwrap();
        registry
    }

    #[test]
    fn test_resolve() {
        let registry = registry();
        assert_eq!(registry.resolve("home:///a.txt").unwrap().name(), "home");
        assert!(registry.resolve_optional("ftp:///a.txt").is_none());

        let err = registry.resolve("ftp:///a.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModuleNotFound);
    }

    #[test]
    fn test_duplicate_mount_rejected() {
        let mut registry = registry();
        let err = registry
            .mount(ModuleDescriptor::new("home").unwrap(), MemoryBackend::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentError);
    }

    #[test]
    fn test_unmount_keeps_order() {
        let mut registry = registry();
        assert!(registry.unmount("osjs"));
        assert!(!registry.unmount("osjs"));
        let names: Vec<_> = registry.modules().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["home", "dav", "dav2", "drive"]);
    }

    #[test]
    fn test_same_transport_rules() {
        let registry = registry();
        let d = FileDescriptor::from_path;

        // Both internal
        assert!(registry.same_transport(&d("home:///a"), &d("osjs:///b")));
        // Shared transport id
        assert!(registry.same_transport(&d("dav:///a"), &d("dav2:///b")));
        // Same module
        assert!(registry.same_transport(&d("drive:///a"), &d("drive:///b")));
        // Different modules, no shared transport
        assert!(!registry.same_transport(&d("home:///a"), &d("drive:///b")));
        assert!(!registry.same_transport(&d("dav:///a"), &d("drive:///b")));
        // Unresolvable
        assert!(!registry.same_transport(&d("ftp:///a"), &d("drive:///b")));
    }

    #[test]
    fn test_is_internal_and_writable() {
        let registry = registry();
        assert!(registry.is_internal("home:///x"));
        assert!(!registry.is_internal("dav:///x"));
        assert!(!registry.is_internal("ftp:///x"));

        assert!(registry.ensure_writable("home:///x").is_ok());
        let err = registry.ensure_writable("osjs:///x").unwrap_err();
        assert_eq!(err.to_string(), "Module 'osjs' is read-only");
        assert!(registry.ensure_writable("ftp:///x").is_ok());
    }
}
