use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use strata_core::{
    BackendError, ErrorKind, FileDescriptor, Method, ModuleDescriptor, OperationOptions, Reply,
    Request, VfsError, VfsResult,
};
use strata_hooks::{
    Decision, Interceptor, InterceptorChain, Notification, NotificationBus, RequestContext,
};

/// Counts calls and rewrites backend failures into an empty listing.
struct Auditor {
    before_calls: AtomicUsize,
    after_calls: AtomicUsize,
}

#[async_trait]
impl Interceptor for Auditor {
    fn name(&self) -> &str {
        "auditor"
    }

    async fn before(&self, _ctx: &RequestContext<'_>) -> Decision {
        self.before_calls.fetch_add(1, Ordering::SeqCst);
        Decision::Continue
    }

    async fn after(&self, ctx: &RequestContext<'_>, outcome: &VfsResult<Reply>) -> Decision {
        self.after_calls.fetch_add(1, Ordering::SeqCst);
        if ctx.request.method() == Method::Scandir && outcome.is_err() {
            Decision::Override(Ok(Reply::Entries(vec![])))
        } else {
            Decision::Continue
        }
    }
}

#[tokio::test]
async fn test_chain_runs_every_interceptor_until_override() {
    let auditor = Arc::new(Auditor {
        before_calls: AtomicUsize::new(0),
        after_calls: AtomicUsize::new(0),
    });
    let mut chain = InterceptorChain::new();
    chain.push(auditor.clone());
    assert_eq!(chain.len(), 1);

    let module = ModuleDescriptor::new("home").unwrap();
    let request = Request::Scandir {
        dir: FileDescriptor::directory("home:///docs/"),
    };
    let options = OperationOptions::default();
    let ctx = RequestContext {
        module: &module,
        request: &request,
        options: &options,
    };

    let (_, decision) = chain.before(&ctx).await;
    assert!(!decision.is_override());

    let failed: VfsResult<Reply> = Err(VfsError::backend(
        "home",
        Method::Scandir,
        BackendError::not_found("docs"),
    ));
    let (name, decision) = chain.after(&ctx, &failed).await;
    assert_eq!(name, Some("auditor"));
    match decision {
        Decision::Override(Ok(Reply::Entries(entries))) => assert!(entries.is_empty()),
        other => panic!("unexpected decision: {other:?}"),
    }

    assert_eq!(auditor.before_calls.load(Ordering::SeqCst), 1);
    assert_eq!(auditor.after_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_override_can_carry_an_error() {
    struct Quota;

    #[async_trait]
    impl Interceptor for Quota {
        fn name(&self) -> &str {
            "quota"
        }

        async fn before(&self, ctx: &RequestContext<'_>) -> Decision {
            if ctx.request.method().is_mutating() {
                Decision::Override(Err(VfsError::argument("quota exceeded")))
            } else {
                Decision::Continue
            }
        }
    }

    let mut chain = InterceptorChain::new();
    chain.push(Arc::new(Quota));

    let module = ModuleDescriptor::new("home").unwrap();
    let request = Request::Mkdir {
        dir: FileDescriptor::directory("home:///new/"),
    };
    let options = OperationOptions::default();
    let ctx = RequestContext {
        module: &module,
        request: &request,
        options: &options,
    };

    match chain.before(&ctx).await {
        (Some("quota"), Decision::Override(Err(err))) => {
            assert_eq!(err.kind(), ErrorKind::ArgumentError);
        }
        other => panic!("unexpected decision: {other:?}"),
    }
}

#[tokio::test]
async fn test_bus_delivers_to_subscribers() {
    let bus = NotificationBus::new(8);
    let mut rx = bus.subscribe();

    bus.emit(Notification::PackagesChanged {
        directory: "home:///.packages".to_string(),
    });

    let event = rx.recv().await.unwrap();
    assert_eq!(event.notification.name(), "packages_changed");
}
