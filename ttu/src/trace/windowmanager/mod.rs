pub mod models;
pub use models::{
    ContainerKind, KeyguardState, Rect, WindowContainer, WindowManagerPolicy, WindowManagerState,
    WindowManagerTrace,
};

pub mod builder;
pub use builder::{parse_trace, WindowManagerStateBuilder};
