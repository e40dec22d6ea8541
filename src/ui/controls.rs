//! On-screen controls: a virtual gamepad and the space bar button.
//!
//! The virtual gamepad produces the same [`GamepadSnapshot`]s as a physical
//! pad and only reports one when its state changed. The space bar bypasses
//! the snapshot path and yields key phases for the `space` binding directly.

use eframe::egui::{self, vec2, Button, Pos2, Sense, Stroke, Ui, Vec2};

use super::common::UiColors;
use crate::controller::{Directions, GamepadSnapshot};
use crate::mapping::KeyPhase;

const BUTTON_SIZE: f32 = 48.0;
const STICK_SIZE: f32 = 140.0;

pub struct VirtualController {
    last_sent: GamepadSnapshot,
    stick_press_threshold: f32,
}

impl VirtualController {
    pub fn new(stick_press_threshold: f32) -> Self {
        Self {
            last_sent: GamepadSnapshot::default(),
            stick_press_threshold,
        }
    }

    /// Draws the pad and face buttons. Returns a snapshot when anything changed.
    pub fn render(&mut self, ui: &mut Ui, use_direction_pad: bool) -> Option<GamepadSnapshot> {
        let mut next = GamepadSnapshot::default();

        ui.horizontal(|ui| {
            if use_direction_pad {
                next.dpad = direction_pad(ui);
            } else {
                next.thumbstick = thumbstick_pad(ui, self.stick_press_threshold);
            }

            ui.add_space((ui.available_width() - 3.0 * BUTTON_SIZE - 24.0).max(16.0));

            let [a, b, x, y] = face_buttons(ui);
            next.a = a;
            next.b = b;
            next.x = x;
            next.y = y;
        });

        self.update(next)
    }

    /// Lets go of everything, e.g. when the controls are hidden.
    pub fn release(&mut self) -> Option<GamepadSnapshot> {
        self.update(GamepadSnapshot::default())
    }

    fn update(&mut self, next: GamepadSnapshot) -> Option<GamepadSnapshot> {
        if next == self.last_sent {
            return None;
        }
        self.last_sent = next;
        Some(next)
    }
}

/// Held state of one button this frame.
fn held_button(ui: &mut Ui, label: &str) -> bool {
    let response = ui.add_sized(
        [BUTTON_SIZE, BUTTON_SIZE],
        Button::new(label).corner_radius(BUTTON_SIZE / 2.0),
    );
    response.is_pointer_button_down_on()
}

fn direction_pad(ui: &mut Ui) -> Directions {
    let mut directions = Directions::default();
    egui::Grid::new("virtual_dpad")
        .spacing(vec2(2.0, 2.0))
        .show(ui, |ui| {
            ui.label("");
            directions.up = held_button(ui, "⬆");
            ui.end_row();

            directions.left = held_button(ui, "⬅");
            ui.label("");
            directions.right = held_button(ui, "➡");
            ui.end_row();

            ui.label("");
            directions.down = held_button(ui, "⬇");
            ui.end_row();
        });
    directions
}

fn thumbstick_pad(ui: &mut Ui, threshold: f32) -> Directions {
    let (rect, response) = ui.allocate_exact_size(Vec2::splat(STICK_SIZE), Sense::drag());
    let radius = STICK_SIZE / 2.0;
    let center = rect.center();

    let knob = if response.is_pointer_button_down_on() {
        response
            .interact_pointer_pos()
            .map(|pos| clamp_to_radius(pos, center, radius))
    } else {
        None
    };

    let painter = ui.painter();
    painter.circle_filled(center, radius, UiColors::EXTREME_BG);
    painter.circle_stroke(center, radius, Stroke::new(1.0, UiColors::BORDER));
    painter.circle_filled(knob.unwrap_or(center), radius / 3.0, UiColors::ACTIVE);

    match knob {
        Some(pos) => stick_directions(pos - center, radius, threshold),
        None => Directions::default(),
    }
}

fn clamp_to_radius(pos: Pos2, center: Pos2, radius: f32) -> Pos2 {
    let offset = pos - center;
    if offset.length() > radius {
        center + offset.normalized() * radius
    } else {
        pos
    }
}

/// Screen offset from the stick center → directions. Screen y grows downwards.
fn stick_directions(offset: Vec2, radius: f32, threshold: f32) -> Directions {
    Directions::from_axes(offset.x / radius, -offset.y / radius, threshold)
}

/// A, B, X, Y in the usual diamond.
fn face_buttons(ui: &mut Ui) -> [bool; 4] {
    let mut pressed = [false; 4];
    egui::Grid::new("virtual_face_buttons")
        .spacing(vec2(2.0, 2.0))
        .show(ui, |ui| {
            ui.label("");
            pressed[3] = held_button(ui, "Y");
            ui.end_row();

            pressed[2] = held_button(ui, "X");
            ui.label("");
            pressed[1] = held_button(ui, "B");
            ui.end_row();

            ui.label("");
            pressed[0] = held_button(ui, "A");
            ui.end_row();
        });
    pressed
}

/// Space bar button; reports press on pointer down and release on pointer up.
#[derive(Default)]
pub struct SpaceBar {
    held: bool,
}

impl SpaceBar {
    pub fn render(&mut self, ui: &mut Ui, binding: &str) -> Option<KeyPhase> {
        let response = ui.add_sized(
            [120.0, 60.0],
            Button::new(format!("Space ({binding})"))
                .fill(UiColors::ACTIVE)
                .corner_radius(10.0),
        );
        self.update(response.is_pointer_button_down_on())
    }

    /// Release edge if the bar is still held.
    pub fn release(&mut self) -> Option<KeyPhase> {
        self.update(false)
    }

    fn update(&mut self, down: bool) -> Option<KeyPhase> {
        if down == self.held {
            return None;
        }
        self.held = down;
        Some(KeyPhase::from_pressed(down))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_controller_reports_only_changes() {
        let mut pad = VirtualController::new(0.5);
        assert_eq!(pad.update(GamepadSnapshot::default()), None);

        let held = GamepadSnapshot {
            a: true,
            ..Default::default()
        };
        assert_eq!(pad.update(held), Some(held));
        assert_eq!(pad.update(held), None);
        assert_eq!(pad.release(), Some(GamepadSnapshot::default()));
        assert_eq!(pad.release(), None);
    }

    #[test]
    fn stick_offset_uses_screen_coordinates() {
        let up_left = stick_directions(vec2(-60.0, -60.0), 70.0, 0.5);
        assert_eq!(up_left.as_array(), [true, false, true, false]);

        let barely = stick_directions(vec2(10.0, 10.0), 70.0, 0.5);
        assert_eq!(barely, Directions::default());
    }

    #[test]
    fn knob_stays_inside_the_pad() {
        let center = Pos2::new(100.0, 100.0);
        let clamped = clamp_to_radius(Pos2::new(400.0, 100.0), center, 70.0);
        assert_eq!(clamped, Pos2::new(170.0, 100.0));

        let inside = Pos2::new(120.0, 90.0);
        assert_eq!(clamp_to_radius(inside, center, 70.0), inside);
    }

    #[test]
    fn space_bar_emits_edges_only() {
        let mut bar = SpaceBar::default();
        assert_eq!(bar.update(false), None);
        assert_eq!(bar.update(true), Some(KeyPhase::Down));
        assert!(bar.held);
        assert_eq!(bar.update(true), None);
        assert_eq!(bar.update(false), Some(KeyPhase::Up));

        bar.update(true);
        assert_eq!(bar.release(), Some(KeyPhase::Up));
        assert_eq!(bar.release(), None);
    }
}
