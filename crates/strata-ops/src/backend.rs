//! Storage backend trait.

use async_trait::async_trait;
use strata_core::{BackendResult, ModuleDescriptor, OperationOptions, Reply, Request};

/// A storage provider serving the fixed operation surface.
///
/// Requests carry full module-qualified paths (`home:///docs/a.txt`); a
/// backend maps them onto its own storage. A backend may be mounted under
/// several modules, in which case `module` tells which mount the request
/// arrived through.
///
/// A backend that does not implement a method returns
/// [`BackendError::Unsupported`](strata_core::BackendError::Unsupported).
#[async_trait]
pub trait Backend: Send + Sync {
    /// Serve one request.
    async fn handle(
        &self,
        module: &ModuleDescriptor,
        request: &Request,
        options: &OperationOptions,
    ) -> BackendResult<Reply>;
}
