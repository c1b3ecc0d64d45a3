//! Request dispatch through the interceptor pipeline.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use strata_core::{
    BackendError, FileDescriptor, Method, OperationOptions, ReadType, Reply, Request, VfsError,
    VfsResult, split_scheme,
};
use strata_hooks::{Decision, InterceptorChain, RequestContext};

use crate::registry::ModuleRegistry;

/// Routes requests to the backend that serves them.
///
/// Every request passes the `before` interceptors, the backend, and the
/// `after` interceptors, in that order. An interceptor override at either
/// stage replaces the outcome; a `before` override skips the backend
/// entirely. The dispatcher itself performs no I/O.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ModuleRegistry>,
    interceptors: Arc<InterceptorChain>,
}

impl Dispatcher {
    /// Create a dispatcher over a registry and interceptor chain.
    pub fn new(registry: Arc<ModuleRegistry>, interceptors: Arc<InterceptorChain>) -> Self {
        Self {
            registry,
            interceptors,
        }
    }

    /// The registry requests are resolved against.
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Dispatch a request to the module serving its target path.
    ///
    /// Backend errors and panics come back as `VfsError::Backend`; nothing
    /// the backend does escapes this call.
    pub async fn dispatch(&self, request: Request, options: &OperationOptions) -> VfsResult<Reply> {
        let method = request.method();
        let mounted = self.registry.resolve(&request.target().path)?;
        validate(&request)?;

        let module = mounted.descriptor.as_ref();
        let ctx = RequestContext {
            module,
            request: &request,
            options,
        };

        if let (Some(name), Decision::Override(outcome)) = self.interceptors.before(&ctx).await {
            tracing::debug!(
                interceptor = name,
                module = %module.name,
                %method,
                "request overridden before dispatch"
            );
            return outcome;
        }

        tracing::debug!(module = %module.name, %method, path = %request.target().path, "dispatching");

        let outcome = match AssertUnwindSafe(mounted.backend.handle(module, &request, options))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(payload) => Err(BackendError::Panicked(panic_message(payload.as_ref()))),
        }
        .map_err(|e| VfsError::backend(module.name.clone(), method, e));

        if let Err(e) = &outcome {
            tracing::debug!(module = %module.name, %method, error = %e, "backend failed");
        }

        match self.interceptors.after(&ctx, &outcome).await {
            (Some(name), Decision::Override(replaced)) => {
                tracing::warn!(
                    interceptor = name,
                    module = %module.name,
                    %method,
                    "backend result overridden"
                );
                replaced
            }
            _ => outcome,
        }
    }

    /// Dispatch `exists` for a descriptor.
    pub async fn exists(&self, file: &FileDescriptor, options: &OperationOptions) -> VfsResult<bool> {
        match self
            .dispatch(Request::Exists { file: file.clone() }, options)
            .await?
        {
            Reply::Exists(exists) => Ok(exists),
            other => Err(unexpected(Method::Exists, &file.path, &other)),
        }
    }

    /// Dispatch `read` for a descriptor and return its raw bytes.
    pub async fn read_bytes(
        &self,
        file: &FileDescriptor,
        options: &OperationOptions,
    ) -> VfsResult<Vec<u8>> {
        let options = options.with_read_type(ReadType::Binary);
        match self
            .dispatch(Request::Read { file: file.clone() }, &options)
            .await?
        {
            Reply::Content(content) => content
                .into_bytes()
                .map_err(|e| reply_error(Method::Read, &file.path, BackendError::Other(e))),
            other => Err(unexpected(Method::Read, &file.path, &other)),
        }
    }
}

/// Error for a reply the engine cannot use, attributed to the scheme of `path`.
pub(crate) fn reply_error(method: Method, path: &str, source: BackendError) -> VfsError {
    let (scheme, _) = split_scheme(path);
    VfsError::backend(scheme.trim_end_matches("://"), method, source)
}

/// Error for a backend that answered with the wrong reply shape.
pub(crate) fn unexpected(method: Method, path: &str, reply: &Reply) -> VfsError {
    reply_error(
        method,
        path,
        BackendError::other(format!("unexpected '{}' reply", reply.variant())),
    )
}

/// Reject descriptors that carry no path.
fn validate(request: &Request) -> VfsResult<()> {
    let check = |name: &str, desc: &FileDescriptor| {
        if desc.path.is_empty() {
            Err(VfsError::argument(format!(
                "Argument '{name}' must have a path"
            )))
        } else {
            Ok(())
        }
    };

    match request {
        Request::Copy {
            source,
            destination,
        }
        | Request::Move {
            source,
            destination,
        } => {
            check("source", source)?;
            check("destination", destination)
        }
        Request::Upload { file, destination } => {
            if file.filename.is_empty() {
                return Err(VfsError::argument("Argument 'file' must have a filename"));
            }
            check("destination", destination)
        }
        other => check("file", other.target()),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use async_trait::async_trait;
    use strata_core::{BackendResult, ErrorKind, ModuleDescriptor};

    struct Panicky;

    #[async_trait]
    impl Backend for Panicky {
        async fn handle(
            &self,
            _module: &ModuleDescriptor,
            request: &Request,
            _options: &OperationOptions,
        ) -> BackendResult<Reply> {
            match request {
                Request::Read { .. } => panic!("disk on fire"),
                Request::Exists { .. } => Ok(Reply::Url("nope".to_string())),
                other => Err(BackendError::unsupported(other.method())),
            }
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ModuleRegistry::new();
        registry
            .mount(ModuleDescriptor::new("p").unwrap(), Panicky)
            .unwrap();
        Dispatcher::new(Arc::new(registry), Arc::new(InterceptorChain::new()))
    }

    #[tokio::test]
    async fn test_panic_becomes_backend_error() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .dispatch(
                Request::Read {
                    file: FileDescriptor::from_path("p:///a"),
                },
                &OperationOptions::default(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BackendException);
        assert!(err.to_string().contains("disk on fire"));
    }

    #[tokio::test]
    async fn test_unsupported_is_backend_error() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .dispatch(
                Request::Mkdir {
                    dir: FileDescriptor::directory("p:///d/"),
                },
                &OperationOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "p: mkdir failed: operation 'mkdir' is not supported");
    }

    #[tokio::test]
    async fn test_wrong_reply_shape() {
        let dispatcher = dispatcher();
        let err = dispatcher
            .exists(&FileDescriptor::from_path("p:///a"), &OperationOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unexpected 'url' reply"));
    }

    #[tokio::test]
    async fn test_empty_destination_path() {
        let dispatcher = dispatcher();
        let mut destination = FileDescriptor::from_path("p:///b");
        destination.path.clear();

        let err = dispatcher
            .dispatch(
                Request::Copy {
                    source: FileDescriptor::from_path("p:///a"),
                    destination,
                },
                &OperationOptions::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentError);
        assert!(err.to_string().contains("destination"));
    }
}
