//! Gamepad to keyboard translation.
//!
//! ```text
//! GamepadSnapshot ──► translator ──► KeyIntent ──► ContentBridge
//!                        ▲
//!                  watch<Settings>
//! ```
//!
//! [`keycodes`] holds the static key tables, [`translator`] the pure
//! snapshot → intent function and [`engine`] the tokio task that wires a
//! snapshot channel to the bridge.

pub mod engine;
pub mod error;
pub mod keycodes;
pub mod translator;

pub use engine::{MappingEngine, MappingEngineHandle, MappingEngineState};
pub use error::MappingError;
pub use keycodes::key_code;
pub use translator::{translate, KeyIntent, KeyPhase};
