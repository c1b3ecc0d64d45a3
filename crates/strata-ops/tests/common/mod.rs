#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use strata_core::{
    BackendError, BackendResult, EngineConfig, Method, ModuleDescriptor, OperationOptions, Reply,
    Request,
};
use strata_ops::{Backend, MemoryBackend, Vfs, VfsBuilder};

/// Shared log of `(module, method)` pairs in call order.
pub type CallLog = Arc<Mutex<Vec<(String, Method)>>>;

/// A memory backend that records every call and can be told to fail one method.
pub struct Recording {
    inner: MemoryBackend,
    log: CallLog,
    fail: Option<Method>,
}

impl Recording {
    pub fn new(log: &CallLog) -> Self {
        Self {
            inner: MemoryBackend::new(),
            log: Arc::clone(log),
            fail: None,
        }
    }

    pub fn failing(log: &CallLog, method: Method) -> Self {
        Self {
            fail: Some(method),
            ..Self::new(log)
        }
    }
}

#[async_trait]
impl Backend for Recording {
    async fn handle(
        &self,
        module: &ModuleDescriptor,
        request: &Request,
        options: &OperationOptions,
    ) -> BackendResult<Reply> {
        let method = request.method();
        self.log
            .lock()
            .unwrap()
            .push((module.name.to_string(), method));
        if self.fail == Some(method) {
            return Err(BackendError::other("disk full"));
        }
        self.inner.handle(module, request, options).await
    }
}

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<(String, Method)> {
    log.lock().unwrap().clone()
}

pub fn methods(log: &CallLog) -> Vec<Method> {
    calls(log).into_iter().map(|(_, m)| m).collect()
}

pub fn clear(log: &CallLog) {
    log.lock().unwrap().clear();
}

/// Modules `a` and `b` on different transports, `ro` read-only, `home` internal.
pub fn builder(log: &CallLog) -> VfsBuilder {
    builder_with(log, Recording::new(log))
}

/// Like [`builder`], with a custom backend for module `b`.
pub fn builder_with(log: &CallLog, b: Recording) -> VfsBuilder {
    Vfs::builder()
        .config(EngineConfig::default())
        .mount(
            ModuleDescriptor::new("a").unwrap().transport("alpha"),
            Recording::new(log),
        )
        .unwrap()
        .mount(ModuleDescriptor::new("b").unwrap().transport("beta"), b)
        .unwrap()
        .mount(
            ModuleDescriptor::new("ro").unwrap().read_only(true),
            Recording::new(log),
        )
        .unwrap()
        .mount(
            ModuleDescriptor::new("home").unwrap().internal(true),
            Recording::new(log),
        )
        .unwrap()
}

pub fn engine(log: &CallLog) -> Vfs {
    builder(log).build()
}
