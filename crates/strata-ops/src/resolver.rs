//! Caller input normalization.

use std::sync::Arc;

use strata_core::{FileArg, FileDescriptor, VfsError, VfsResult};

use crate::registry::ModuleRegistry;

const DEFAULT_MESSAGE: &str = "Invalid file argument";

/// Turns loosely shaped file arguments into canonical descriptors.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    registry: Arc<ModuleRegistry>,
}

impl MetadataResolver {
    /// Create a resolver over a registry.
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self { registry }
    }

    /// Convert an argument to a descriptor without checking its module.
    ///
    /// Fails with `Argument` (using `message`, or a default) when the input
    /// carries no usable path.
    pub fn descriptor(
        &self,
        arg: impl Into<FileArg>,
        message: Option<&str>,
    ) -> VfsResult<FileDescriptor> {
        arg.into()
            .into_descriptor()
            .ok_or_else(|| VfsError::argument(message.unwrap_or(DEFAULT_MESSAGE)))
    }

    /// Convert an argument to a descriptor whose path resolves to a mounted module.
    ///
    /// Shape errors fail with `Argument`; a path no module serves fails with
    /// `ModuleNotFound`.
    pub fn normalize(
        &self,
        arg: impl Into<FileArg>,
        message: Option<&str>,
    ) -> VfsResult<FileDescriptor> {
        let desc = self.descriptor(arg, message)?;
        self.check(&desc)?;
        Ok(desc)
    }

    /// Like [`normalize`](Self::normalize), for the target of a mutating operation.
    ///
    /// The read-only check runs between the shape check and module
    /// resolution, so a read-only module is reported before anything else.
    pub fn normalize_writable(
        &self,
        arg: impl Into<FileArg>,
        message: Option<&str>,
    ) -> VfsResult<FileDescriptor> {
        let desc = self.descriptor(arg, message)?;
        self.registry.ensure_writable(&desc.path)?;
        self.check(&desc)?;
        Ok(desc)
    }

    /// Fail with `ModuleNotFound` if no module serves the descriptor's path.
    pub fn check(&self, desc: &FileDescriptor) -> VfsResult<()> {
        self.registry.resolve(&desc.path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MemoryBackend;
    use serde_json::json;
    use strata_core::{ErrorKind, ModuleDescriptor};

    fn resolver() -> MetadataResolver {
        let mut registry = ModuleRegistry::new();
        registry
            .mount(ModuleDescriptor::new("home").unwrap(), MemoryBackend::new())
            .unwrap();
        registry
            .mount(
                ModuleDescriptor::new("osjs").unwrap().read_only(true),
                MemoryBackend::new(),
            )
            .unwrap();
        MetadataResolver::new(Arc::new(registry))
    }

    #[test]
    fn test_normalize_writable() {
        let resolver = resolver();
        assert!(resolver.normalize_writable("home:///a", None).is_ok());

        let err = resolver.normalize_writable("osjs:///a", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnlyViolation);

        let err = resolver.normalize_writable("ftp:///a", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModuleNotFound);
    }

    #[test]
    fn test_normalize_shapes() {
        let resolver = resolver();

        let desc = resolver.normalize("home:///a.txt", None).unwrap();
        assert_eq!(desc.filename, "a.txt");

        let desc = resolver
            .normalize(json!({ "path": "home:///b", "type": "dir" }), None)
            .unwrap();
        assert!(desc.is_dir());

        let original = FileDescriptor::file("home:///c", "text/plain");
        let desc = resolver.normalize(&original, None).unwrap();
        assert_eq!(desc, original);
    }

    #[test]
    fn test_bad_shape_uses_message() {
        let resolver = resolver();

        let err = resolver.normalize(json!(42), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentError);
        assert_eq!(err.to_string(), "Invalid file argument");

        let err = resolver
            .normalize(json!({ "name": "x" }), Some("Missing source"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing source");
    }

    #[test]
    fn test_unmounted_path() {
        let resolver = resolver();
        let err = resolver.normalize("ftp:///a", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModuleNotFound);

        // Shape conversion alone does not consult the registry
        assert!(resolver.descriptor("ftp:///a", None).is_ok());
    }
}
