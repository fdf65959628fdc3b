//! Pointer and keyboard editing of a widget's geometry.
//!
//! Everything here is inert outside edit mode and before the widget is
//! ready. Each mutation goes through [`InteractionController::save_config`],
//! which updates the in-memory set, writes the local cache and broadcasts the
//! change. The remote store is only written by
//! [`InteractionController::save_remote`].

use super::handles::ResizeHandle;
use super::state::{InitState, WidgetSlot};
use super::LayoutContext;
use crate::config::WidgetConfig;
use crate::events::LayoutEvent;
use crate::input::{Key, Modifiers};
use crate::storage::{LocalCache, PersistError, RemoteStore};
use kurbo::{Point, Vec2};
use std::cell::RefCell;
use std::rc::Rc;

/// Smallest width reachable with keyboard resizing.
const KEY_RESIZE_MIN_WIDTH: f64 = 50.0;
/// Smallest height reachable with keyboard resizing.
const KEY_RESIZE_MIN_HEIGHT: f64 = 30.0;

/// Active pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Moving the widget; `offset` is the cursor position relative to its top-left corner.
    Drag { offset: Vec2 },
    /// Dragging a resize handle.
    Resize(ResizeState),
}

/// State of a handle drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeState {
    pub handle: ResizeHandle,
    pub start_point: Point,
    pub current_point: Point,
    /// Config when the gesture started.
    pub original: WidgetConfig,
}

impl ResizeState {
    pub fn delta(&self) -> Vec2 {
        self.current_point - self.start_point
    }
}

/// Turns input on one widget instance into config mutations.
pub struct InteractionController<R, C> {
    ctx: Rc<LayoutContext<R, C>>,
    slot: Rc<WidgetSlot>,
    gesture: RefCell<Option<Gesture>>,
}

impl<R: RemoteStore, C: LocalCache> InteractionController<R, C> {
    pub(super) fn new(ctx: Rc<LayoutContext<R, C>>, slot: Rc<WidgetSlot>) -> Self {
        Self {
            ctx,
            slot,
            gesture: RefCell::new(None),
        }
    }

    /// Whether input is currently accepted.
    pub fn is_active(&self) -> bool {
        self.ctx.edit_mode() && self.slot.state() == InitState::Ready
    }

    pub fn gesture(&self) -> Option<Gesture> {
        *self.gesture.borrow()
    }

    /// Select the widget and start dragging it.
    pub fn pointer_down(&self, position: Point) -> bool {
        if !self.is_active() {
            return false;
        }
        let bus = self.ctx.bus();
        bus.publish(LayoutEvent::DeselectAll);
        bus.publish(LayoutEvent::Select(self.slot.identity().clone()));

        let config = self.current();
        *self.gesture.borrow_mut() = Some(Gesture::Drag {
            offset: position - config.position(),
        });
        true
    }

    /// Start dragging `handle` of the selected widget.
    pub fn begin_resize(&self, handle: ResizeHandle, position: Point) -> bool {
        if !self.is_active() || !self.slot.is_selected() {
            return false;
        }
        *self.gesture.borrow_mut() = Some(Gesture::Resize(ResizeState {
            handle,
            start_point: position,
            current_point: position,
            original: self.current(),
        }));
        true
    }

    /// Continue the active gesture. Returns whether the config changed.
    pub fn pointer_move(&self, position: Point) -> bool {
        if !self.is_active() {
            return false;
        }
        let settings = self.ctx.config();
        let viewport = self.ctx.viewport();
        let next = {
            let mut gesture = self.gesture.borrow_mut();
            match gesture.as_mut() {
                None => return false,
                Some(Gesture::Drag { offset }) => self
                    .current()
                    .with_position(position - *offset)
                    .clamp_to(viewport, settings.viewport_margin),
                Some(Gesture::Resize(state)) => {
                    state.current_point = position;
                    state.handle.apply(
                        &state.original,
                        state.delta(),
                        viewport,
                        settings.viewport_margin,
                        settings.min_resize_extent,
                    )
                }
            }
        };
        if next == self.current() {
            return false;
        }
        self.save_config(next);
        true
    }

    /// End the active gesture.
    pub fn pointer_up(&self) {
        self.gesture.borrow_mut().take();
    }

    /// Handle a key press. Only the focused, selected widget reacts.
    ///
    /// Arrows nudge, Alt+arrows resize, `r` rotates, `c` centres and `]`/`[`
    /// raise or lower the stacking order. Returns whether the key was consumed.
    pub fn key_down(&self, key: Key, modifiers: Modifiers, focused: bool) -> bool {
        if !focused || !self.is_active() || !self.slot.is_selected() {
            return false;
        }
        let settings = self.ctx.config();
        let viewport = self.ctx.viewport();
        let mut c = self.current();

        if let Some((dx, dy)) = key.arrow_direction() {
            if modifiers.alt {
                let step = if modifiers.shift {
                    settings.resize_key_shift_step
                } else {
                    settings.resize_key_step
                };
                if dx != 0.0 {
                    c.width = (c.width + dx * step).max(KEY_RESIZE_MIN_WIDTH);
                }
                if dy != 0.0 {
                    c.height = (c.height + dy * step).max(KEY_RESIZE_MIN_HEIGHT);
                }
            } else {
                let mut step = settings.nudge_step;
                if modifiers.shift {
                    step *= settings.nudge_shift_multiplier;
                }
                if modifiers.command() {
                    step *= settings.nudge_ctrl_multiplier;
                }
                c.x += dx * step;
                c.y += dy * step;
            }
        } else {
            match key {
                Key::Character('r' | 'R') => {
                    c.rotation += if modifiers.shift {
                        settings.rotate_shift_step
                    } else {
                        settings.rotate_step
                    };
                }
                Key::Character('c' | 'C') if !modifiers.command() => {
                    c.x = (viewport.width - c.width) / 2.0;
                    c.y = (viewport.height - c.height) / 2.0;
                }
                Key::Character(']') => c.z_index = (c.z_index + 1).min(settings.max_z_index),
                Key::Character('[') => c.z_index = (c.z_index - 1).max(1),
                _ => return false,
            }
        }

        self.save_config(c.clamp_to(viewport, settings.viewport_margin));
        true
    }

    /// Store `config` at the active breakpoint, write the local cache and broadcast it.
    pub fn save_config(&self, config: WidgetConfig) {
        let identity = self.slot.identity();
        let breakpoint = self.ctx.breakpoint();
        let configs = self.slot.update(breakpoint, config);
        if let Err(e) = self.ctx.gateway().cache_write(identity, &configs) {
            log::warn!("Could not cache layout of {identity}: {e}");
        }
        self.ctx.bus().publish(LayoutEvent::ConfigChanged {
            identity: identity.clone(),
            origin: self.slot.instance(),
            breakpoint: Some(breakpoint),
            configs,
        });
    }

    /// Save the active breakpoint's config to the remote store.
    pub async fn save_remote(&self) -> Result<(), PersistError> {
        let breakpoint = self.ctx.breakpoint();
        let config = self.slot.current(breakpoint);
        self.ctx
            .gateway()
            .save(self.slot.identity(), breakpoint, &config)
            .await
    }

    fn current(&self) -> WidgetConfig {
        self.slot.current(self.ctx.breakpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::Breakpoint;
    use crate::identity::WidgetId;
    use crate::widget::handles::Corner;
    use crate::widget::testing::context;
    use crate::widget::LayoutWidget;
    use futures::executor::block_on;
    use kurbo::Size;

    type Widget = LayoutWidget<crate::storage::MemoryRemoteStore, crate::storage::MemoryCache>;

    fn ready_widget(ctx: &Rc<LayoutContext<crate::storage::MemoryRemoteStore, crate::storage::MemoryCache>>, name: &str) -> Widget {
        let widget = LayoutWidget::mount(ctx, WidgetId::new(name), None);
        block_on(widget.initialize());
        widget
    }

    fn place(widget: &Widget, x: f64, y: f64, width: f64, height: f64) {
        widget.controller().save_config(WidgetConfig {
            x,
            y,
            width,
            height,
            ..WidgetConfig::FALLBACK
        });
    }

    #[test]
    fn test_inert_outside_edit_mode() {
        let ctx = context();
        let widget = ready_widget(&ctx, "gauge-1");
        ctx.set_edit_mode(false);
        assert!(!widget.controller().pointer_down(Point::new(100.0, 100.0)));
        assert!(!widget.slot().is_selected());
    }

    #[test]
    fn test_inert_before_ready() {
        let ctx = context();
        let widget = LayoutWidget::mount(&ctx, WidgetId::new("gauge-1"), None);
        assert!(!widget.controller().pointer_down(Point::new(100.0, 100.0)));
    }

    #[test]
    fn test_pointer_down_selects_exclusively() {
        let ctx = context();
        let a = ready_widget(&ctx, "gauge-a");
        let b = ready_widget(&ctx, "gauge-b");

        assert!(a.controller().pointer_down(Point::new(0.0, 0.0)));
        assert!(a.slot().is_selected());
        assert!(b.controller().pointer_down(Point::new(0.0, 0.0)));
        assert!(!a.slot().is_selected());
        assert!(b.slot().is_selected());
    }

    #[test]
    fn test_drag_keeps_offset_and_clamps() {
        let ctx = context();
        let widget = ready_widget(&ctx, "gauge-1");
        place(&widget, 100.0, 100.0, 200.0, 100.0);
        let controller = widget.controller();

        controller.pointer_down(Point::new(110.0, 130.0));
        assert!(controller.pointer_move(Point::new(160.0, 180.0)));
        let c = widget.slot().current(ctx.breakpoint());
        assert_eq!((c.x, c.y), (150.0, 150.0));

        controller.pointer_move(Point::new(-500.0, 5000.0));
        let c = widget.slot().current(ctx.breakpoint());
        assert_eq!(c.x, 20.0);
        assert_eq!(c.y, 600.0 - 100.0 - 20.0);

        controller.pointer_up();
        assert!(!controller.pointer_move(Point::new(300.0, 300.0)));
    }

    #[test]
    fn test_drag_writes_cache_and_broadcasts() {
        let ctx = context();
        let widget = ready_widget(&ctx, "gauge-1");
        let twin = ready_widget(&ctx, "gauge-1");
        place(&widget, 100.0, 100.0, 200.0, 100.0);

        widget.controller().pointer_down(Point::new(100.0, 100.0));
        widget.controller().pointer_move(Point::new(140.0, 100.0));

        let cached = ctx.gateway().cache_read(&WidgetId::new("gauge-1")).unwrap();
        assert_eq!(cached.get(Breakpoint::Lg).unwrap().x, 140.0);
        assert_eq!(twin.slot().current(Breakpoint::Lg).x, 140.0);
        assert_eq!(ctx.gateway().remote().write_count(), 0);
    }

    #[test]
    fn test_resize_from_corner() {
        let ctx = context();
        let widget = ready_widget(&ctx, "gauge-1");
        place(&widget, 100.0, 100.0, 200.0, 100.0);
        let controller = widget.controller();

        assert!(!controller.begin_resize(ResizeHandle::Corner(Corner::BottomRight), Point::new(300.0, 200.0)));
        controller.pointer_down(Point::new(150.0, 150.0));
        controller.pointer_up();
        assert!(controller.begin_resize(ResizeHandle::Corner(Corner::BottomRight), Point::new(300.0, 200.0)));
        controller.pointer_move(Point::new(350.0, 260.0));
        let c = widget.slot().current(ctx.breakpoint());
        assert_eq!((c.x, c.y, c.width, c.height), (100.0, 100.0, 250.0, 160.0));
    }

    #[test]
    fn test_keyboard_nudge_steps() {
        let ctx = context();
        let widget = ready_widget(&ctx, "gauge-1");
        place(&widget, 100.0, 100.0, 200.0, 100.0);
        let controller = widget.controller();
        controller.pointer_down(Point::new(100.0, 100.0));
        controller.pointer_up();

        assert!(!controller.key_down(Key::ArrowRight, Modifiers::NONE, false));
        assert!(controller.key_down(Key::ArrowRight, Modifiers::NONE, true));
        assert!(controller.key_down(Key::ArrowDown, Modifiers::shift(), true));
        let ctrl = Modifiers { ctrl: true, ..Modifiers::NONE };
        assert!(controller.key_down(Key::ArrowLeft, ctrl, true));
        let shift_cmd = Modifiers { shift: true, meta: true, ..Modifiers::NONE };
        assert!(controller.key_down(Key::ArrowUp, shift_cmd, true));

        let c = widget.slot().current(ctx.breakpoint());
        assert_eq!(c.x, 100.0 + 1.0 - 5.0);
        assert_eq!(c.y, 100.0 + 10.0 - 50.0);

        for _ in 0..20 {
            controller.key_down(Key::ArrowLeft, Modifiers::shift(), true);
        }
        assert_eq!(widget.slot().current(ctx.breakpoint()).x, 20.0);
    }

    #[test]
    fn test_keyboard_resize_rotate_center_and_z() {
        let ctx = context();
        let widget = ready_widget(&ctx, "gauge-1");
        place(&widget, 100.0, 100.0, 60.0, 40.0);
        let controller = widget.controller();
        controller.pointer_down(Point::new(100.0, 100.0));
        controller.pointer_up();

        let alt = Modifiers { alt: true, ..Modifiers::NONE };
        controller.key_down(Key::ArrowLeft, alt, true);
        controller.key_down(Key::ArrowLeft, alt, true);
        controller.key_down(Key::ArrowLeft, alt, true);
        controller.key_down(Key::ArrowDown, Modifiers { shift: true, ..alt }, true);
        let c = widget.slot().current(ctx.breakpoint());
        assert_eq!((c.width, c.height), (50.0, 60.0));

        controller.key_down(Key::Character('r'), Modifiers::NONE, true);
        controller.key_down(Key::Character('R'), Modifiers::shift(), true);
        assert_eq!(widget.slot().current(ctx.breakpoint()).rotation, 60.0);

        controller.key_down(Key::Character('c'), Modifiers::NONE, true);
        let c = widget.slot().current(ctx.breakpoint());
        assert_eq!((c.x, c.y), ((800.0 - 50.0) / 2.0, (600.0 - 60.0) / 2.0));

        controller.key_down(Key::Character('['), Modifiers::NONE, true);
        assert_eq!(widget.slot().current(ctx.breakpoint()).z_index, 1);
        controller.key_down(Key::Character(']'), Modifiers::NONE, true);
        assert_eq!(widget.slot().current(ctx.breakpoint()).z_index, 2);

        assert!(!controller.key_down(Key::Character('x'), Modifiers::NONE, true));
    }

    #[test]
    fn test_edits_target_active_breakpoint() {
        let ctx = context();
        let widget = ready_widget(&ctx, "gauge-1");
        let before_xs = widget.slot().current(Breakpoint::Xs);
        ctx.set_viewport(Size::new(1440.0, 900.0));
        place(&widget, 300.0, 300.0, 100.0, 100.0);
        assert_eq!(widget.slot().current(Breakpoint::Xxxl).x, 300.0);
        assert_eq!(widget.slot().current(Breakpoint::Xs), before_xs);
    }

    #[test]
    fn test_save_remote_writes_active_breakpoint() {
        let ctx = context();
        let widget = ready_widget(&ctx, "valve-X00");
        place(&widget, 111.0, 222.0, 80.0, 80.0);
        block_on(widget.controller().save_remote()).unwrap();

        let records = ctx.gateway().remote().records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.breakpoint, "lg");
        assert_eq!(records[0].fields.x, 111.0);
    }

    #[test]
    fn test_save_remote_failure_is_returned() {
        let ctx = context();
        let widget = ready_widget(&ctx, "valve-X00");
        ctx.gateway()
            .remote()
            .set_failure(Some(crate::storage::RemoteError::Transport("down".into())));
        let err = block_on(widget.controller().save_remote()).unwrap_err();
        assert!(matches!(err, PersistError::RemoteUnavailable(_)));
    }
}
