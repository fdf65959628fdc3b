//! Staged visibility of widgets by priority tier.
//!
//! Widgets register with a [`Priority`] before fetching anything. The global
//! [`Phase`] walks `Initializing → Background → Large → Medium → Ready`, leaving a
//! tier phase once every registered widget of that tier is ready (or failed).
//! Advancement is re-evaluated synchronously after every mutation and never
//! goes backwards. A safety timer armed at the first registration forces
//! `Ready` so one stuck widget cannot hide the dashboard.

use crate::clock::{Clock, SafetyTimer, SystemClock};
use crate::defaults::Priority;
use crate::identity::WidgetId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Global loading phase, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Initializing,
    Background,
    Large,
    Medium,
    Ready,
}

impl Phase {
    /// Phase from which widgets of `priority` may render.
    ///
    /// Normal and high tiers show only once their own phase has been left, so
    /// a tier appears as a batch.
    pub fn for_priority(priority: Priority) -> Phase {
        match priority {
            Priority::Low => Phase::Background,
            Priority::Normal => Phase::Medium,
            Priority::High => Phase::Ready,
        }
    }

    /// Tier whose widgets hold this phase.
    pub fn tier(self) -> Option<Priority> {
        match self {
            Phase::Background => Some(Priority::Low),
            Phase::Large => Some(Priority::Normal),
            Phase::Medium => Some(Priority::High),
            Phase::Initializing | Phase::Ready => None,
        }
    }

    fn next(self) -> Phase {
        match self {
            Phase::Initializing => Phase::Background,
            Phase::Background => Phase::Large,
            Phase::Large => Phase::Medium,
            Phase::Medium | Phase::Ready => Phase::Ready,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initializing => "initializing",
            Phase::Background => "background",
            Phase::Large => "large",
            Phase::Medium => "medium",
            Phase::Ready => "ready",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    priority: Priority,
    status: Status,
}

/// Per-tier counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierStats {
    pub total: usize,
    pub ready: usize,
}

/// Snapshot of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingStats {
    pub phase: Phase,
    pub total: usize,
    pub ready: usize,
    pub failed: usize,
    pub by_priority: BTreeMap<Priority, TierStats>,
    /// Whether `Ready` was forced by the safety timer.
    pub timed_out: bool,
    /// Time since the first registration.
    pub elapsed: Duration,
}

type PhaseObserver = Box<dyn FnMut(Phase, Phase)>;

/// Gates widget visibility on the global loading phase.
pub struct LoadingCoordinator {
    clock: Box<dyn Clock>,
    timeout: Duration,
    timer: SafetyTimer,
    started_at: Option<Duration>,
    phase: Phase,
    timed_out: bool,
    widgets: HashMap<WidgetId, Entry>,
    observers: Vec<PhaseObserver>,
}

impl LoadingCoordinator {
    /// Coordinator on the system clock.
    pub fn new(timeout: Duration) -> Self {
        Self::with_clock(timeout, SystemClock::new())
    }

    pub fn with_clock(timeout: Duration, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            timeout,
            timer: SafetyTimer::default(),
            started_at: None,
            phase: Phase::Initializing,
            timed_out: false,
            widgets: HashMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Observe phase transitions as `(from, to)`.
    ///
    /// Observers run while the coordinator is being mutated and must not call back into it.
    pub fn on_phase_change(&mut self, observer: impl FnMut(Phase, Phase) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Register a widget. Registering a known identity again changes nothing.
    pub fn register(&mut self, identity: &WidgetId, priority: Priority) {
        if self.widgets.contains_key(identity) {
            return;
        }
        let now = self.clock.now();
        if self.started_at.is_none() {
            self.started_at = Some(now);
            self.timer.arm(now, self.timeout);
        }
        log::debug!("Registered {identity} with {priority:?} priority");
        self.widgets.insert(
            identity.clone(),
            Entry {
                priority,
                status: Status::Loading,
            },
        );
        self.advance();
    }

    /// Record that a widget finished initializing.
    pub fn mark_ready(&mut self, identity: &WidgetId) {
        self.set_status(identity, Status::Ready);
    }

    /// Record that a widget failed; it stops blocking advancement and never renders.
    pub fn report_error(&mut self, identity: &WidgetId, reason: &str) {
        log::error!("Widget {identity} failed to load: {reason}");
        self.set_status(identity, Status::Failed);
    }

    /// Check the safety timer. Call from the host's frame or timer callback.
    pub fn tick(&mut self) {
        self.advance();
    }

    pub fn is_registered(&self, identity: &WidgetId) -> bool {
        self.widgets.contains_key(identity)
    }

    pub fn is_ready(&self, identity: &WidgetId) -> bool {
        self.widgets
            .get(identity)
            .is_some_and(|e| e.status == Status::Ready)
    }

    /// Whether the widget is ready and the phase admits its tier.
    pub fn should_render(&self, identity: &WidgetId) -> bool {
        self.widgets.get(identity).is_some_and(|e| {
            e.status == Status::Ready && self.phase >= Phase::for_priority(e.priority)
        })
    }

    pub fn stats(&self) -> LoadingStats {
        let mut by_priority: BTreeMap<Priority, TierStats> =
            Priority::ALL.iter().map(|p| (*p, TierStats::default())).collect();
        let mut ready = 0;
        let mut failed = 0;
        for entry in self.widgets.values() {
            let tier = by_priority.entry(entry.priority).or_default();
            tier.total += 1;
            match entry.status {
                Status::Ready => {
                    tier.ready += 1;
                    ready += 1;
                }
                Status::Failed => failed += 1,
                Status::Loading => {}
            }
        }
        let elapsed = self
            .started_at
            .map(|start| self.clock.now().saturating_sub(start))
            .unwrap_or_default();
        LoadingStats {
            phase: self.phase,
            total: self.widgets.len(),
            ready,
            failed,
            by_priority,
            timed_out: self.timed_out,
            elapsed,
        }
    }

    fn set_status(&mut self, identity: &WidgetId, status: Status) {
        match self.widgets.get_mut(identity) {
            Some(entry) if entry.status != Status::Failed => entry.status = status,
            Some(_) => log::debug!("Ignoring status change of failed widget {identity}"),
            None => {
                log::warn!("Status change for unregistered widget {identity}");
                return;
            }
        }
        self.advance();
    }

    fn tier_settled(&self, tier: Priority) -> bool {
        self.widgets
            .values()
            .filter(|e| e.priority == tier)
            .all(|e| e.status != Status::Loading)
    }

    fn advance(&mut self) {
        if self.phase == Phase::Ready {
            return;
        }
        if self.timer.expired(self.clock.now()) {
            log::warn!(
                "Loading timed out after {:?} in phase {}, forcing ready",
                self.timeout,
                self.phase
            );
            self.timed_out = true;
            self.transition(Phase::Ready);
            return;
        }
        loop {
            let can_leave = match self.phase {
                Phase::Initializing => !self.widgets.is_empty(),
                Phase::Ready => false,
                phase => phase.tier().is_none_or(|tier| self.tier_settled(tier)),
            };
            if !can_leave {
                break;
            }
            let next = self.phase.next();
            self.transition(next);
        }
    }

    fn transition(&mut self, to: Phase) {
        let from = self.phase;
        if to <= from {
            return;
        }
        self.phase = to;
        log::info!("Loading phase {from} -> {to}");
        if to == Phase::Ready {
            self.timer.cancel();
        }
        for observer in &mut self.observers {
            observer(from, to);
        }
    }
}
