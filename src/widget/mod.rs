// Module widget : cycle de vie du graphique externe
pub mod library;
pub mod lifecycle;
pub mod manager;
pub mod state;

pub use library::{
    ChartLibrary, ReadyNotifier, ScriptLoad, ScriptStatus, Theme, WidgetHandle, WidgetOptions,
};
pub use lifecycle::{WidgetCommand, WidgetLifecycle};
pub use manager::ChartWidgetManager;
pub use state::{LifecycleConfig, LifecycleState, WidgetError, WidgetStatus};
