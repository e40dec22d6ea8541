//! # UI Common Components
//!
//! Shared navigation state, the dark palette and small layout helpers used by
//! every area of the shell.

use eframe::egui::{Color32, Frame, Stroke};

/// Area of the shell currently shown in the central panel.
///
/// Any area can be reached from any other through the top bar, so this is a
/// plain enum rather than a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    /// Page URL, loaded file and on-screen controls
    Player,
    /// Grid of imported files
    Library,
    /// Bindings, control options and credits
    Settings,
}

impl MenuState {
    pub const ALL: [MenuState; 3] = [MenuState::Player, MenuState::Library, MenuState::Settings];

    pub fn title(&self) -> &'static str {
        match self {
            MenuState::Player => "Player",
            MenuState::Library => "Library",
            MenuState::Settings => "Settings",
        }
    }
}

/// Dark theme palette.
pub struct UiColors;

impl UiColors {
    /// Primary background for section frames (RGB: 30, 30, 30)
    pub const MAIN_BG: Color32 = Color32::from_rgb(30, 30, 30);

    /// Background for tiles and nested frames (RGB: 20, 20, 20)
    pub const EXTREME_BG: Color32 = Color32::from_rgb(20, 20, 20);

    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Selected tiles and held virtual buttons
    pub const ACTIVE: Color32 = Color32::from_rgb(40, 110, 220);

    /// Destructive actions
    pub const INACTIVE: Color32 = Color32::from_rgb(200, 50, 20);
}

/// Bordered section frame used by every menu.
pub fn section_frame() -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, UiColors::BORDER))
        .fill(UiColors::MAIN_BG)
        .inner_margin(8.0)
        .outer_margin(2.0)
}

/// Library grid column count for the available width.
pub fn grid_columns(width: f32) -> usize {
    if width > 1200.0 {
        8
    } else if width > 1000.0 {
        6
    } else if width > 800.0 {
        5
    } else if width > 600.0 {
        4
    } else {
        3
    }
}
