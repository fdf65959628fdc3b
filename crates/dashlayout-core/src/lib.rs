//! Dashlayout Core Library
//!
//! Per-breakpoint geometry, persistence and load coordination for the widgets
//! of a monitoring dashboard. Runs natively and on `wasm32`; the host supplies
//! pointer/keyboard input and a viewport size, and draws whatever
//! [`WidgetFrame`] says.

pub mod breakpoint;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod events;
pub mod identity;
pub mod input;
pub mod loading;
pub mod settings;
pub mod storage;
pub mod widget;

pub use breakpoint::Breakpoint;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigSet, PartialConfigSet, PartialWidgetConfig, WidgetConfig, clamp, resolve};
pub use defaults::{Category, CategoryTable, Priority, SmartDefaults};
pub use events::{EventBus, LayoutEvent, Subscription};
pub use identity::{InstanceId, WidgetId};
pub use input::{Key, Modifiers};
pub use loading::{LoadingCoordinator, LoadingStats, Phase};
pub use settings::{ConfigError, EngineConfig, RemoteConfig};
pub use storage::{LoadOutcome, LocalCache, PersistError, PersistenceGateway, RemoteStore};
pub use widget::{InteractionController, LayoutContext, LayoutWidget, ResizeHandle, WidgetFrame};
