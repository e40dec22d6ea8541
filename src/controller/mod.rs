//! Controller subsystem for gamepad input
//!
//! ```text
//! Gamepad ──► Collector ──► GamepadSnapshot ──► mapping engine
//! ```
//!
//! Every gilrs event from the active pad produces a full pressed-state
//! snapshot; nothing is diffed here.

pub mod controller_handle;
pub mod event_collector;
pub mod snapshot;

pub use controller_handle::{ControllerHandle, ControllerSettings};
pub use snapshot::{Directions, GamepadSnapshot};
