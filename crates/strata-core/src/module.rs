//! Module (mounted backend) descriptors.

use compact_str::CompactString;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{VfsError, VfsResult};

/// A mounted storage module.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    /// Unique module name.
    pub name: CompactString,
    /// Pattern every path served by this module satisfies.
    pub pattern: Regex,
    /// Transport identifier; modules sharing one can copy natively.
    pub transport: Option<CompactString>,
    /// Reject mutating operations.
    pub read_only: bool,
    /// Backend-specific root reference.
    pub root: String,
    /// The default first-party transport.
    pub internal: bool,
}

impl ModuleDescriptor {
    /// Create a module that serves `name://` paths.
    pub fn new(name: impl Into<CompactString>) -> VfsResult<Self> {
        let name = name.into();
        let pattern = format!("^{}://", regex::escape(&name));
        Self::with_pattern(name, &pattern)
    }

    /// Create a module with an explicit path pattern.
    pub fn with_pattern(name: impl Into<CompactString>, pattern: &str) -> VfsResult<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern).map_err(|e| {
            VfsError::argument(format!("Invalid pattern for module '{name}': {e}"))
        })?;
        Ok(Self {
            root: format!("{name}:///"),
            name,
            pattern,
            transport: None,
            read_only: false,
            internal: false,
        })
    }

    /// Set the transport identifier.
    pub fn transport(mut self, transport: impl Into<CompactString>) -> Self {
        self.transport = Some(transport.into());
        self
    }

    /// Set the read-only flag.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the internal flag.
    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    /// Set the root reference.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    /// Check if a path belongs to this module.
    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }

    /// The transport identifier, when set and non-empty.
    pub fn transport_id(&self) -> Option<&str> {
        self.transport.as_deref().filter(|t| !t.is_empty())
    }
}

/// Serializable module definition, as found in a mount file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Unique module name.
    pub name: String,
    /// Path pattern (regex). Defaults to `^<name>://`.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Transport identifier.
    #[serde(default)]
    pub transport: Option<String>,
    /// Reject mutating operations.
    #[serde(default)]
    pub read_only: bool,
    /// The default first-party transport.
    #[serde(default)]
    pub internal: bool,
    /// Root reference. Defaults to `<name>:///`.
    #[serde(default)]
    pub root: Option<String>,
}

impl ModuleConfig {
    /// Validate the definition and build a descriptor.
    pub fn into_descriptor(self) -> VfsResult<ModuleDescriptor> {
        if self.name.is_empty() {
            return Err(VfsError::argument("Module name cannot be empty"));
        }
        let mut desc = match &self.pattern {
            Some(pattern) => ModuleDescriptor::with_pattern(self.name.as_str(), pattern)?,
            None => ModuleDescriptor::new(self.name.as_str())?,
        };
        desc.transport = self.transport.map(CompactString::from);
        desc.read_only = self.read_only;
        desc.internal = self.internal;
        if let Some(root) = self.root {
            desc.root = root;
        }
        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pattern() {
        let module = ModuleDescriptor::new("home").unwrap();
        assert!(module.matches("home:///docs/a.txt"));
        assert!(!module.matches("homework:///a.txt"));
        assert!(!module.matches("osjs:///home"));
        assert_eq!(module.root, "home:///");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = ModuleDescriptor::with_pattern("bad", "(").unwrap_err();
        assert!(err.to_string().contains("Invalid pattern"));
    }

    #[test]
    fn test_empty_transport_is_none() {
        let module = ModuleDescriptor::new("a").unwrap().transport("");
        assert!(module.transport_id().is_none());
    }

    #[test]
    fn test_config_into_descriptor() {
        let config = ModuleConfig {
            name: "dav".to_string(),
            pattern: Some("^https?://dav\\.".to_string()),
            transport: Some("webdav".to_string()),
            read_only: true,
            internal: false,
            root: None,
        };
        let module = config.into_descriptor().unwrap();
        assert!(module.matches("https://dav.example.org/x"));
        assert_eq!(module.transport_id(), Some("webdav"));
        assert!(module.read_only);
        assert_eq!(module.root, "dav:///");
    }
}
