//! Meld Runtime - frame-loop building blocks
//!
//! Provides what a host window needs between frames:
//! - `AnimationClock` - maps frame timestamps to animation progress
//! - `SceneEvent` / `EventQueue` - parameter changes from the UI
//! - `Scene` - sources, lights, lattice parameters, and rebuild/redraw requests
//! - `BackgroundRebuild` - one-at-a-time off-thread isosurface builds

mod clock;
mod event;
mod rebuild;
mod scene;

pub use clock::{AnimationClock, AnimationState};
pub use event::{EventQueue, SceneEvent};
pub use rebuild::BackgroundRebuild;
pub use scene::Scene;
