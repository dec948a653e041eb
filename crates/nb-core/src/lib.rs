pub mod id;
pub mod model;
pub mod snap;
pub mod viewport;

pub use id::{CardId, IdAllocator};
pub use model::*;
pub use snap::{SnapResult, resolve_snap};
pub use viewport::{GridStyle, Tick, ViewState, Viewport, ViewportConfig, ViewportSize, WheelDelta};
