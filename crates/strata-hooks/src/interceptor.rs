//! Two-stage request interception.

use std::sync::Arc;

use async_trait::async_trait;
use strata_core::{ModuleDescriptor, OperationOptions, Reply, Request, VfsResult};

/// Everything an interceptor can see about a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// The module serving the request.
    pub module: &'a ModuleDescriptor,
    /// The request itself.
    pub request: &'a Request,
    /// Options the caller passed.
    pub options: &'a OperationOptions,
}

/// What an interceptor wants the pipeline to do.
#[derive(Debug)]
pub enum Decision {
    /// Proceed normally.
    Continue,
    /// Short-circuit with this outcome.
    Override(VfsResult<Reply>),
}

impl Decision {
    /// Check if this decision replaces the pipeline's outcome.
    pub fn is_override(&self) -> bool {
        matches!(self, Self::Override(_))
    }
}

/// Observes or overrides requests on their way to and from a backend.
///
/// Both stages default to [`Decision::Continue`], so an implementation only
/// overrides the stage it cares about.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Called before the backend is invoked.
    async fn before(&self, ctx: &RequestContext<'_>) -> Decision {
        let _ = ctx;
        Decision::Continue
    }

    /// Called with the backend's outcome.
    async fn after(&self, ctx: &RequestContext<'_>, outcome: &VfsResult<Reply>) -> Decision {
        let _ = (ctx, outcome);
        Decision::Continue
    }
}

/// Ordered list of interceptors.
///
/// Interceptors run in registration order; the first override wins and the
/// remaining interceptors of that stage are skipped.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.interceptors.iter().map(|i| i.name().to_string()))
            .finish()
    }
}

impl InterceptorChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an interceptor.
    pub fn push(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Number of registered interceptors.
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    /// Check if no interceptor is registered.
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Run the pre-dispatch stage.
    ///
    /// Returns the name of the overriding interceptor along with its decision.
    pub async fn before(&self, ctx: &RequestContext<'_>) -> (Option<&str>, Decision) {
        for interceptor in &self.interceptors {
            let decision = interceptor.before(ctx).await;
            if decision.is_override() {
                return (Some(interceptor.name()), decision);
            }
        }
        (None, Decision::Continue)
    }

    /// Run the post-dispatch stage.
    pub async fn after(
        &self,
        ctx: &RequestContext<'_>,
        outcome: &VfsResult<Reply>,
    ) -> (Option<&str>, Decision) {
        for interceptor in &self.interceptors {
            let decision = interceptor.after(ctx, outcome).await;
            if decision.is_override() {
                return (Some(interceptor.name()), decision);
            }
        }
        (None, Decision::Continue)
    }
}
