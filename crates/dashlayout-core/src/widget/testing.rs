//! Test fixtures: contexts over in-memory backends and a remote store whose
//! queries stay pending until released.

use super::LayoutContext;
use crate::clock::ManualClock;
use crate::defaults::SmartDefaults;
use crate::settings::EngineConfig;
use crate::storage::{
    BoxFuture, LayoutFields, MemoryCache, MemoryRemoteStore, PersistedRecord, RemoteResult, RemoteStore,
};
use futures::task::noop_waker_ref;
use kurbo::Size;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};

pub(crate) fn poll_once<F: Future + ?Sized>(future: Pin<&mut F>) -> Poll<F::Output> {
    let mut cx = Context::from_waker(noop_waker_ref());
    future.poll(&mut cx)
}

fn build<R: RemoteStore>(remote: R) -> (Rc<LayoutContext<R, MemoryCache>>, ManualClock) {
    let _ = env_logger::builder().is_test(true).try_init();
    let clock = ManualClock::new();
    let ctx = LayoutContext::with_parts(
        EngineConfig::default(),
        Arc::new(remote),
        Arc::new(MemoryCache::new()),
        SmartDefaults::default(),
        clock.clone(),
    );
    ctx.set_viewport(Size::new(800.0, 600.0));
    ctx.set_edit_mode(true);
    (Rc::new(ctx), clock)
}

/// Context over in-memory backends, 800×600 viewport, edit mode on.
pub(crate) fn context() -> Rc<LayoutContext<MemoryRemoteStore, MemoryCache>> {
    build(MemoryRemoteStore::new()).0
}

pub(crate) fn gated_context() -> (Rc<LayoutContext<GatedRemote, MemoryCache>>, Gate) {
    let (ctx, gate, _) = gated_context_with_clock();
    (ctx, gate)
}

pub(crate) fn gated_context_with_clock() -> (Rc<LayoutContext<GatedRemote, MemoryCache>>, Gate, ManualClock) {
    let gate = Gate::default();
    let (ctx, clock) = build(GatedRemote::new(gate.clone()));
    (ctx, gate, clock)
}

/// Releases pending queries by ticket, in the order they were issued.
#[derive(Clone, Default)]
pub(crate) struct Gate {
    open: Arc<RwLock<HashSet<usize>>>,
}

impl Gate {
    /// Let query number `ticket` complete.
    pub(crate) fn open(&self, ticket: usize) {
        if let Ok(mut open) = self.open.write() {
            open.insert(ticket);
        }
    }

    /// Let the first `count` queries complete.
    pub(crate) fn release(&self, count: usize) {
        (0..count).for_each(|ticket| self.open(ticket));
    }

    fn is_open(&self, ticket: usize) -> bool {
        self.open.read().map(|open| open.contains(&ticket)).unwrap_or(false)
    }
}

struct Wait {
    gate: Gate,
    ticket: usize,
}

impl Future for Wait {
    type Output = ();

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.gate.is_open(self.ticket) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// Remote store whose queries wait for their ticket to open. Writes pass straight through.
pub(crate) struct GatedRemote {
    inner: MemoryRemoteStore,
    gate: Gate,
    issued: AtomicUsize,
}

impl GatedRemote {
    fn new(gate: Gate) -> Self {
        Self {
            inner: MemoryRemoteStore::new(),
            gate,
            issued: AtomicUsize::new(0),
        }
    }

    pub(crate) fn inner(&self) -> &MemoryRemoteStore {
        &self.inner
    }

    /// Queries issued so far, completed or not.
    pub(crate) fn query_count(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }
}

impl RemoteStore for GatedRemote {
    fn query(&self, component_id: &str, breakpoint: Option<&str>) -> BoxFuture<'_, RemoteResult<Vec<PersistedRecord>>> {
        let wait = Wait {
            gate: self.gate.clone(),
            ticket: self.issued.fetch_add(1, Ordering::SeqCst),
        };
        let component_id = component_id.to_string();
        let breakpoint = breakpoint.map(str::to_string);
        Box::pin(async move {
            wait.await;
            self.inner.query(&component_id, breakpoint.as_deref()).await
        })
    }

    fn create(&self, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>> {
        self.inner.create(fields)
    }

    fn update(&self, document_id: &str, fields: &LayoutFields) -> BoxFuture<'_, RemoteResult<PersistedRecord>> {
        self.inner.update(document_id, fields)
    }

    fn delete(&self, document_id: &str) -> BoxFuture<'_, RemoteResult<()>> {
        self.inner.delete(document_id)
    }
}
