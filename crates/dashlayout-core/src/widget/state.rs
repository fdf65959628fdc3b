//! Per-instance widget state shared by the sequencer, the controller and the bus listener.

use super::sequencer::Resolution;
use crate::breakpoint::Breakpoint;
use crate::config::{ConfigSet, WidgetConfig};
use crate::defaults::Priority;
use crate::identity::{InstanceId, WidgetId};
use std::cell::{Cell, RefCell};

/// Lifecycle of one mounted instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// State of one mounted widget instance.
pub struct WidgetSlot {
    identity: WidgetId,
    instance: InstanceId,
    priority: Priority,
    /// Smart defaults with the caller's overrides applied.
    defaults: ConfigSet,
    pub(super) started: Cell<bool>,
    pub(super) state: Cell<InitState>,
    pub(super) resolution: Cell<Resolution>,
    pub(super) selected: Cell<bool>,
    configs: RefCell<ConfigSet>,
}

impl WidgetSlot {
    pub(super) fn new(identity: WidgetId, priority: Priority, defaults: ConfigSet) -> Self {
        Self {
            identity,
            instance: InstanceId::new(),
            priority,
            configs: RefCell::new(defaults.clone()),
            defaults,
            started: Cell::new(false),
            state: Cell::new(InitState::Uninitialized),
            resolution: Cell::new(Resolution::NotTried),
            selected: Cell::new(false),
        }
    }

    pub fn identity(&self) -> &WidgetId {
        &self.identity
    }

    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn defaults(&self) -> &ConfigSet {
        &self.defaults
    }

    pub fn state(&self) -> InitState {
        self.state.get()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution.get()
    }

    pub fn is_selected(&self) -> bool {
        self.selected.get()
    }

    /// Snapshot of the config set.
    pub fn configs(&self) -> ConfigSet {
        self.configs.borrow().clone()
    }

    /// Config at `breakpoint`.
    pub fn current(&self, breakpoint: Breakpoint) -> WidgetConfig {
        self.configs.borrow().resolve(breakpoint)
    }

    pub(super) fn replace_configs(&self, configs: ConfigSet) {
        *self.configs.borrow_mut() = configs;
    }

    /// Store `config` at `breakpoint` and return the updated set.
    pub(super) fn update(&self, breakpoint: Breakpoint, config: WidgetConfig) -> ConfigSet {
        let mut configs = self.configs.borrow_mut();
        configs.set(breakpoint, config);
        configs.clone()
    }
}
