//! Mounted widgets and the dashboard-wide context they share.

mod handles;
mod interaction;
mod sequencer;
mod state;

#[cfg(test)]
mod testing;

pub use handles::{Corner, Edge, ResizeHandle};
pub use interaction::{Gesture, InteractionController, ResizeState};
pub use sequencer::{InitSequencer, Resolution, Source};
pub use state::{InitState, WidgetSlot};

use crate::breakpoint::Breakpoint;
use crate::clock::{Clock, SystemClock};
use crate::config::{PartialConfigSet, WidgetConfig};
use crate::defaults::SmartDefaults;
use crate::events::{EventBus, LayoutEvent, Subscription};
use crate::identity::WidgetId;
use crate::loading::LoadingCoordinator;
use crate::settings::EngineConfig;
use crate::storage::{LocalCache, PersistenceGateway, RemoteStore};
use kurbo::{Rect, Size};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

/// Viewport assumed until the host reports one.
const DEFAULT_VIEWPORT: Size = Size::new(1024.0, 768.0);

/// Services shared by every widget of one dashboard.
///
/// Create one per page, wrap it in an `Rc` and hand it to
/// [`LayoutWidget::mount`].
pub struct LayoutContext<R, C> {
    config: EngineConfig,
    bus: EventBus,
    coordinator: RefCell<LoadingCoordinator>,
    gateway: PersistenceGateway<R, C>,
    viewport: Cell<Size>,
    edit_mode: Cell<bool>,
}

impl<R: RemoteStore, C: LocalCache> LayoutContext<R, C> {
    /// Context with the standard category table and the system clock.
    pub fn new(config: EngineConfig, remote: Arc<R>, cache: Arc<C>) -> Self {
        Self::with_parts(config, remote, cache, SmartDefaults::default(), SystemClock::new())
    }

    pub fn with_parts(
        config: EngineConfig,
        remote: Arc<R>,
        cache: Arc<C>,
        defaults: SmartDefaults,
        clock: impl Clock + 'static,
    ) -> Self {
        let coordinator = LoadingCoordinator::with_clock(config.phase_timeout(), clock);
        let gateway = PersistenceGateway::new(remote, cache, defaults, config.cache_key_prefix.clone());
        Self {
            config,
            bus: EventBus::new(),
            coordinator: RefCell::new(coordinator),
            gateway,
            viewport: Cell::new(DEFAULT_VIEWPORT),
            edit_mode: Cell::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn coordinator(&self) -> &RefCell<LoadingCoordinator> {
        &self.coordinator
    }

    pub fn gateway(&self) -> &PersistenceGateway<R, C> {
        &self.gateway
    }

    pub fn viewport(&self) -> Size {
        self.viewport.get()
    }

    pub fn set_viewport(&self, size: Size) {
        let before = self.breakpoint();
        self.viewport.set(size);
        let after = self.breakpoint();
        if before != after {
            log::debug!("Breakpoint {before} -> {after}");
        }
    }

    /// Breakpoint of the current viewport.
    pub fn breakpoint(&self) -> Breakpoint {
        Breakpoint::from_viewport_width(self.viewport.get().width)
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode.get()
    }

    /// Toggle edit mode. Leaving it clears the selection.
    pub fn set_edit_mode(&self, enabled: bool) {
        if self.edit_mode.replace(enabled) && !enabled {
            self.bus.publish(LayoutEvent::DeselectAll);
        }
    }

    /// Drive the loading coordinator's safety timer.
    pub fn tick(&self) {
        self.coordinator.borrow_mut().tick();
    }
}

/// What a renderer needs to draw one widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetFrame {
    pub breakpoint: Breakpoint,
    pub config: WidgetConfig,
    /// Stacking order after the edit-selected floor.
    pub z_index: i32,
    /// Pointer hit area.
    pub selection_bounds: Rect,
    pub selected: bool,
    /// Whether edit chrome (outline, handles) should show.
    pub show_controls: bool,
    /// Whether the content may be shown yet.
    pub visible: bool,
}

/// One mounted widget instance.
///
/// Dropping it unsubscribes from the bus. The coordinator keeps its
/// registration; the safety timer covers widgets that vanish mid-load.
pub struct LayoutWidget<R, C> {
    ctx: Rc<LayoutContext<R, C>>,
    slot: Rc<WidgetSlot>,
    sequencer: InitSequencer<R, C>,
    controller: InteractionController<R, C>,
    _subscription: Subscription,
}

impl<R: RemoteStore + 'static, C: LocalCache + 'static> LayoutWidget<R, C> {
    /// Mount an instance. Nothing is fetched until [`initialize`](Self::initialize).
    pub fn mount(ctx: &Rc<LayoutContext<R, C>>, identity: WidgetId, overrides: Option<&PartialConfigSet>) -> Self {
        let defaults = ctx.gateway().defaults();
        let priority = defaults.priority(&identity);
        let initial = defaults.resolve(&identity, overrides);
        let slot = Rc::new(WidgetSlot::new(identity, priority, initial));

        let subscription = {
            let weak = Rc::downgrade(ctx);
            let slot = slot.clone();
            ctx.bus().subscribe(move |event| {
                if let Some(ctx) = weak.upgrade() {
                    handle_event(&ctx, &slot, event);
                }
            })
        };

        Self {
            sequencer: InitSequencer::new(ctx.clone(), slot.clone()),
            controller: InteractionController::new(ctx.clone(), slot.clone()),
            ctx: ctx.clone(),
            slot,
            _subscription: subscription,
        }
    }

    /// Resolve the starting config set. Only the first call does any work.
    pub async fn initialize(&self) -> bool {
        self.sequencer.run().await
    }

    pub fn identity(&self) -> &WidgetId {
        self.slot.identity()
    }

    pub fn slot(&self) -> &WidgetSlot {
        &self.slot
    }

    pub fn controller(&self) -> &InteractionController<R, C> {
        &self.controller
    }

    /// Whether this instance is ready and its loading phase has been reached.
    ///
    /// The coordinator tracks identities, so a twin being ready is not enough.
    pub fn is_visible(&self) -> bool {
        self.slot.state() == InitState::Ready
            && self.ctx.coordinator().borrow().should_render(self.slot.identity())
    }

    /// Report a render failure so the widget stops holding back its tier.
    pub fn report_error(&self, reason: &str) {
        self.ctx
            .coordinator()
            .borrow_mut()
            .report_error(self.slot.identity(), reason);
    }

    pub fn frame(&self) -> WidgetFrame {
        let settings = self.ctx.config();
        let breakpoint = self.ctx.breakpoint();
        let config = self.slot.current(breakpoint);
        let editing = self.ctx.edit_mode() && self.slot.state() == InitState::Ready;
        let selected = self.slot.is_selected();
        WidgetFrame {
            breakpoint,
            config,
            z_index: config.effective_z_index(editing && selected, settings.edit_selected_z_floor),
            selection_bounds: config.selection_bounds(settings.min_selection_size),
            selected,
            show_controls: editing && selected,
            visible: self.is_visible(),
        }
    }
}

fn handle_event<R: RemoteStore, C: LocalCache>(ctx: &LayoutContext<R, C>, slot: &WidgetSlot, event: &LayoutEvent) {
    match event {
        LayoutEvent::Select(identity) => slot.selected.set(identity == slot.identity()),
        LayoutEvent::DeselectAll => slot.selected.set(false),
        LayoutEvent::ConfigChanged {
            identity,
            origin,
            configs,
            ..
        } => {
            if identity == slot.identity() && *origin != slot.instance() {
                sequencer::adopt_peer(ctx, slot, configs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{context, gated_context, gated_context_with_clock, poll_once};
    use super::*;
    use crate::config::ConfigSet;
    use crate::defaults::Category;
    use crate::loading::Phase;
    use crate::storage::{LayoutFields, LoadOutcome};
    use futures::executor::block_on;
    use kurbo::Point;
    use std::task::Poll;
    use std::time::Duration;

    #[test]
    fn test_valve_without_stored_layout() {
        let ctx = context();
        let id = WidgetId::new("valve-X00");
        let defaults = ctx.gateway().defaults();
        assert_eq!(defaults.category(&id), Category::Valve);
        assert_eq!(block_on(ctx.gateway().load(&id)), LoadOutcome::NotFound);

        let widget = LayoutWidget::mount(&ctx, id.clone(), None);
        assert_eq!(ctx.breakpoint(), Breakpoint::Lg);
        block_on(widget.initialize());

        assert_eq!(widget.slot().state(), InitState::Ready);
        assert_eq!(widget.slot().resolution(), Resolution::Resolved(Source::Default));
        assert!(ctx.gateway().cache().read("component-valve-X00").is_some());

        let z = widget.frame().config.z_index;
        assert!(z > Category::Structural.z_index() && z < Category::Actuator.z_index());
        assert!(widget.is_visible());
    }

    #[test]
    fn test_peer_broadcast_wins_over_second_synthesis() {
        let (ctx, gate) = gated_context();
        let id = WidgetId::new("semaforo-1");
        let a = LayoutWidget::mount(&ctx, id.clone(), None);
        let b = LayoutWidget::mount(&ctx, id.clone(), None);

        let mut load_a = Box::pin(a.initialize());
        let mut load_b = Box::pin(b.initialize());
        assert!(poll_once(load_a.as_mut()).is_pending());
        assert!(poll_once(load_b.as_mut()).is_pending());

        gate.release(1);
        assert_eq!(poll_once(load_a.as_mut()), Poll::Ready(true));
        assert_eq!(a.slot().resolution().source(), Some(Source::Default));
        assert_eq!(b.slot().state(), InitState::Ready);
        assert_eq!(b.slot().resolution().source(), Some(Source::Peer));
        assert_eq!(b.slot().configs(), a.slot().configs());

        // B's own load now finds a record someone else saved; it arrives too late.
        let stray = WidgetConfig {
            x: 999.0,
            ..WidgetConfig::FALLBACK
        };
        block_on(ctx.gateway().remote().inner().create(&LayoutFields::new(&id, Breakpoint::Lg, &stray))).unwrap();
        gate.release(2);
        assert_eq!(poll_once(load_b.as_mut()), Poll::Ready(true));
        assert_eq!(b.slot().resolution().source(), Some(Source::Peer));
        assert_eq!(b.slot().configs(), a.slot().configs());
        assert_eq!(ctx.gateway().cache_read(&id), Some(a.slot().configs()));
    }

    #[test]
    fn test_twin_hidden_until_its_own_init() {
        let ctx = context();
        let id = WidgetId::new("semaforo-1");
        let a = LayoutWidget::mount(&ctx, id.clone(), None);
        block_on(a.initialize());
        assert!(a.is_visible());

        let b = LayoutWidget::mount(&ctx, id, None);
        assert_eq!(b.slot().state(), InitState::Uninitialized);
        assert!(!b.is_visible());
        assert!(!b.frame().visible);

        block_on(b.initialize());
        assert_eq!(b.slot().resolution().source(), Some(Source::Cache));
        assert!(b.is_visible());
    }

    #[test]
    fn test_other_identity_changes_are_ignored() {
        let ctx = context();
        let widget = LayoutWidget::mount(&ctx, WidgetId::new("valve-1"), None);
        block_on(widget.initialize());
        let before = widget.slot().configs();

        let foreign = ConfigSet::default().with(
            Breakpoint::Lg,
            WidgetConfig {
                x: 777.0,
                ..WidgetConfig::FALLBACK
            },
        );
        ctx.bus().publish(LayoutEvent::ConfigChanged {
            identity: WidgetId::new("valve-2"),
            origin: crate::identity::InstanceId::new(),
            breakpoint: Some(Breakpoint::Lg),
            configs: foreign.clone(),
        });
        assert_eq!(widget.slot().configs(), before);

        ctx.bus().publish(LayoutEvent::ConfigChanged {
            identity: WidgetId::new("valve-1"),
            origin: crate::identity::InstanceId::new(),
            breakpoint: Some(Breakpoint::Lg),
            configs: foreign.clone(),
        });
        assert_eq!(widget.slot().configs(), foreign);
    }

    #[test]
    fn test_visibility_follows_phases() {
        let (ctx, gate) = gated_context();
        let pipe = LayoutWidget::mount(&ctx, WidgetId::new("pipe-1"), None);
        let valve = LayoutWidget::mount(&ctx, WidgetId::new("valve-1"), None);

        let mut load_pipe = Box::pin(pipe.initialize());
        let mut load_valve = Box::pin(valve.initialize());
        assert!(poll_once(load_pipe.as_mut()).is_pending());
        assert!(poll_once(load_valve.as_mut()).is_pending());
        assert_eq!(ctx.coordinator().borrow().phase(), Phase::Background);

        gate.release(2);
        assert!(poll_once(load_valve.as_mut()).is_ready());
        assert!(!valve.is_visible());

        assert!(poll_once(load_pipe.as_mut()).is_ready());
        assert!(pipe.is_visible());
        assert!(valve.is_visible());
        assert_eq!(ctx.coordinator().borrow().phase(), Phase::Ready);
    }

    #[test]
    fn test_stuck_widget_times_out() {
        let (ctx, gate, clock) = gated_context_with_clock();
        let valve = LayoutWidget::mount(&ctx, WidgetId::new("valve-1"), None);
        let pipe = LayoutWidget::mount(&ctx, WidgetId::new("pipe-1"), None);

        let mut load_pipe = Box::pin(pipe.initialize());
        let mut load_valve = Box::pin(valve.initialize());
        assert!(poll_once(load_pipe.as_mut()).is_pending());
        assert!(poll_once(load_valve.as_mut()).is_pending());

        gate.open(1);
        assert!(poll_once(load_valve.as_mut()).is_ready());
        assert!(!valve.is_visible());

        clock.advance(Duration::from_millis(5000));
        ctx.tick();
        assert!(valve.is_visible());
        assert!(!pipe.is_visible());
    }

    #[test]
    fn test_frame_in_edit_mode() {
        let ctx = context();
        let widget = LayoutWidget::mount(&ctx, WidgetId::new("tiny-led"), None);
        block_on(widget.initialize());
        widget.controller().save_config(WidgetConfig {
            x: 100.0,
            y: 100.0,
            width: 20.0,
            height: 20.0,
            ..WidgetConfig::FALLBACK
        });

        let frame = widget.frame();
        assert!(!frame.selected);
        assert_eq!(frame.z_index, 1);
        assert_eq!(frame.selection_bounds.width(), 60.0);

        widget.controller().pointer_down(Point::new(105.0, 105.0));
        let frame = widget.frame();
        assert!(frame.show_controls);
        assert_eq!(frame.z_index, 9998);

        ctx.set_edit_mode(false);
        let frame = widget.frame();
        assert!(!frame.selected);
        assert!(!frame.show_controls);
        assert_eq!(frame.z_index, 1);
    }

    #[test]
    fn test_dropped_widget_stops_listening() {
        let ctx = context();
        let widget = LayoutWidget::mount(&ctx, WidgetId::new("gauge-1"), None);
        assert_eq!(ctx.bus().subscriber_count(), 1);
        drop(widget);
        assert_eq!(ctx.bus().subscriber_count(), 0);
    }

    #[test]
    fn test_overrides_seed_defaults() {
        let ctx = context();
        let mut overrides = PartialConfigSet::new();
        overrides.insert(
            Breakpoint::Lg,
            crate::config::PartialWidgetConfig {
                width: Some(640.0),
                ..Default::default()
            },
        );
        let widget = LayoutWidget::mount(&ctx, WidgetId::new("chart-1"), Some(&overrides));
        block_on(widget.initialize());
        assert_eq!(widget.frame().config.width, 640.0);
    }
}
