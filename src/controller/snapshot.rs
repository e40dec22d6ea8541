/// Pressed state of the four directions of a d-pad or thumbstick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Directions {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Directions {
    /// Directions in emission order: up, down, left, right.
    pub fn as_array(&self) -> [bool; 4] {
        [self.up, self.down, self.left, self.right]
    }

    /// Derives pressed directions from analog axes (y points up).
    pub fn from_axes(x: f32, y: f32, threshold: f32) -> Self {
        Self {
            up: y >= threshold,
            down: y <= -threshold,
            left: x <= -threshold,
            right: x >= threshold,
        }
    }
}

/// One sample of everything the translator looks at.
///
/// Physical gamepads and the on-screen controller both produce these.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GamepadSnapshot {
    pub dpad: Directions,
    pub thumbstick: Directions,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
}
