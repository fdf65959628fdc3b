//! One-shot initialization of a mounted widget.
//!
//! The starting config set is found through an explicit fallback chain,
//! `NotTried → Remote → Cache → Default → Resolved`, with every transition
//! logged. The first resolution wins: a peer broadcast adopted while the
//! remote load is in flight resolves the widget, and the remote result is
//! dropped when it finally arrives.

use super::state::{InitState, WidgetSlot};
use super::LayoutContext;
use crate::config::ConfigSet;
use crate::events::LayoutEvent;
use crate::storage::{LoadOutcome, LocalCache, RemoteStore};
use std::rc::Rc;

/// Where a widget's starting config set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Remote,
    Cache,
    Default,
    /// Adopted from another instance of the same identity.
    Peer,
}

/// Position in the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    NotTried,
    Remote,
    Cache,
    Default,
    Resolved(Source),
}

impl Resolution {
    pub fn is_resolved(self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn source(self) -> Option<Source> {
        match self {
            Resolution::Resolved(source) => Some(source),
            _ => None,
        }
    }
}

/// Runs the initialization sequence of one instance, at most once.
pub struct InitSequencer<R, C> {
    ctx: Rc<LayoutContext<R, C>>,
    slot: Rc<WidgetSlot>,
}

impl<R: RemoteStore, C: LocalCache> InitSequencer<R, C> {
    pub(super) fn new(ctx: Rc<LayoutContext<R, C>>, slot: Rc<WidgetSlot>) -> Self {
        Self { ctx, slot }
    }

    /// Run the sequence. Returns `false` without doing anything if it already ran
    /// or is running for this instance.
    pub async fn run(&self) -> bool {
        let slot = &self.slot;
        if slot.started.replace(true) {
            log::trace!("Initialization of {} already started", slot.identity());
            return false;
        }
        let identity = slot.identity();
        slot.state.set(InitState::Loading);
        self.ctx
            .coordinator()
            .borrow_mut()
            .register(identity, slot.priority());

        self.step(Resolution::Remote);
        let outcome = self
            .ctx
            .gateway()
            .fetch_with_defaults(identity, slot.defaults())
            .await;
        if slot.resolution().is_resolved() {
            if matches!(outcome, LoadOutcome::Found(_)) {
                log::debug!("Dropping late remote layout of {identity}");
            }
            return true;
        }
        if let LoadOutcome::Found(configs) = outcome {
            if let Err(e) = self.ctx.gateway().cache_write(identity, &configs) {
                log::warn!("Could not cache remote layout of {identity}: {e}");
            }
            resolve(&self.ctx, slot, Source::Remote, configs);
            return true;
        }

        self.step(Resolution::Cache);
        if let Some(configs) = self.ctx.gateway().cache_read(identity) {
            resolve(&self.ctx, slot, Source::Cache, configs);
            return true;
        }

        self.step(Resolution::Default);
        let configs = slot.defaults().clone();
        if let Err(e) = self.ctx.gateway().cache_write(identity, &configs) {
            log::warn!("Could not cache default layout of {identity}: {e}");
        }
        self.ctx.bus().publish(LayoutEvent::ConfigChanged {
            identity: identity.clone(),
            origin: slot.instance(),
            breakpoint: None,
            configs: configs.clone(),
        });
        resolve(&self.ctx, slot, Source::Default, configs);
        true
    }

    fn step(&self, to: Resolution) {
        let from = self.slot.resolution.replace(to);
        log::debug!("{}: {from:?} -> {to:?}", self.slot.identity());
    }
}

fn resolve<R: RemoteStore, C: LocalCache>(ctx: &LayoutContext<R, C>, slot: &WidgetSlot, source: Source, configs: ConfigSet) {
    slot.replace_configs(configs);
    let from = slot.resolution.replace(Resolution::Resolved(source));
    slot.state.set(InitState::Ready);
    log::info!("{} ready ({from:?} -> resolved from {source:?})", slot.identity());
    ctx.coordinator().borrow_mut().mark_ready(slot.identity());
}

/// Apply a config set broadcast by another instance of the same identity.
pub(super) fn adopt_peer<R: RemoteStore, C: LocalCache>(ctx: &LayoutContext<R, C>, slot: &WidgetSlot, configs: &ConfigSet) {
    match slot.state() {
        InitState::Loading if !slot.resolution().is_resolved() => {
            log::info!("{} adopting layout broadcast by a peer", slot.identity());
            resolve(ctx, slot, Source::Peer, configs.clone());
        }
        InitState::Ready => slot.replace_configs(configs.clone()),
        _ => {}
    }
}
