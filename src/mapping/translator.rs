//! Gamepad snapshot → synthetic key intents.
//!
//! Level-triggered: every sample re-emits one down or up intent for each of
//! the eight signals, whether or not it changed since the previous sample.
//! Consumers see redundant ups and downs; that volume is expected.

use std::fmt;

use super::keycodes::{direction_keys, key_code};
use crate::controller::GamepadSnapshot;
use crate::persistence::{KeyBindings, LogicalControl, Settings};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    Down,
    Up,
}

impl KeyPhase {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            KeyPhase::Down
        } else {
            KeyPhase::Up
        }
    }

    /// DOM event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            KeyPhase::Down => "keydown",
            KeyPhase::Up => "keyup",
        }
    }
}

impl fmt::Display for KeyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.event_type())
    }
}

/// A key event to synthesize inside the hosted content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyIntent {
    pub phase: KeyPhase,
    pub key: String,
    pub key_code: u32,
    pub code: String,
}

impl KeyIntent {
    /// Intent for a bound symbolic key, where `key` and `code` are the same name.
    pub fn for_binding(phase: KeyPhase, binding: &str) -> Self {
        Self {
            phase,
            key: binding.to_string(),
            key_code: key_code(binding),
            code: binding.to_string(),
        }
    }
}

/// Translates one sample into intents.
///
/// Order: up, down, left, right, then the `space`, `buttonB`, `buttonX`
/// and `buttonY` bindings (buttons A, B, X, Y). Unbound buttons are skipped.
pub fn translate(snapshot: &GamepadSnapshot, settings: &Settings) -> Vec<KeyIntent> {
    let directions = if settings.use_direction_pad {
        snapshot.dpad
    } else {
        snapshot.thumbstick
    };

    let mut intents: Vec<KeyIntent> = direction_keys(settings.thumbstick_mapping)
        .iter()
        .zip(directions.as_array())
        .map(|(entry, pressed)| KeyIntent {
            phase: KeyPhase::from_pressed(pressed),
            key: entry.key.to_string(),
            key_code: entry.key_code,
            code: entry.code.to_string(),
        })
        .collect();

    let buttons = [
        (LogicalControl::Space, snapshot.a),
        (LogicalControl::ButtonB, snapshot.b),
        (LogicalControl::ButtonX, snapshot.x),
        (LogicalControl::ButtonY, snapshot.y),
    ];
    intents.extend(
        buttons
            .into_iter()
            .filter_map(|(control, pressed)| {
                button_intent(&settings.key_bindings, control, KeyPhase::from_pressed(pressed))
            }),
    );

    intents
}

/// Single intent for one logical control, if it is bound.
pub fn button_intent(
    bindings: &KeyBindings,
    control: LogicalControl,
    phase: KeyPhase,
) -> Option<KeyIntent> {
    bindings
        .binding(control)
        .map(|binding| KeyIntent::for_binding(phase, binding))
}

pub fn press(bindings: &KeyBindings, control: LogicalControl) -> Option<KeyIntent> {
    button_intent(bindings, control, KeyPhase::Down)
}

pub fn release(bindings: &KeyBindings, control: LogicalControl) -> Option<KeyIntent> {
    button_intent(bindings, control, KeyPhase::Up)
}

/// Up intents for every key the current settings can produce.
pub fn release_all(settings: &Settings) -> Vec<KeyIntent> {
    translate(&GamepadSnapshot::default(), settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Directions;
    use crate::persistence::ThumbstickMapping;
    use std::collections::HashSet;

    fn keys(intents: &[KeyIntent], phase: KeyPhase) -> Vec<&str> {
        intents
            .iter()
            .filter(|i| i.phase == phase)
            .map(|i| i.key.as_str())
            .collect()
    }

    #[test]
    fn released_sample_emits_eight_ups() {
        let intents = translate(&GamepadSnapshot::default(), &Settings::default());

        assert_eq!(intents.len(), 8);
        assert!(intents.iter().all(|i| i.phase == KeyPhase::Up));
        assert_eq!(
            keys(&intents, KeyPhase::Up),
            ["ArrowUp", "ArrowDown", "ArrowLeft", "ArrowRight", "Space", "KeyB", "KeyX", "KeyY"]
        );
    }

    #[test]
    fn repeated_samples_re_emit_every_time() {
        let settings = Settings::default();
        let held = GamepadSnapshot {
            a: true,
            ..Default::default()
        };

        for _ in 0..3 {
            let intents = translate(&held, &settings);
            assert_eq!(keys(&intents, KeyPhase::Down), ["Space"]);
            assert_eq!(keys(&intents, KeyPhase::Up).len(), 7);
        }
    }

    #[test]
    fn each_button_gets_exactly_one_intent_per_sample() {
        let settings = Settings::default();
        for (snapshot, expected_down) in [
            (GamepadSnapshot { b: true, ..Default::default() }, "KeyB"),
            (GamepadSnapshot { x: true, ..Default::default() }, "KeyX"),
            (GamepadSnapshot { y: true, ..Default::default() }, "KeyY"),
        ] {
            let intents = translate(&snapshot, &settings);
            for binding in ["Space", "KeyB", "KeyX", "KeyY"] {
                let count = intents.iter().filter(|i| i.key == binding).count();
                assert_eq!(count, 1, "{binding}");
            }
            assert_eq!(keys(&intents, KeyPhase::Down), [expected_down]);
        }
    }

    #[test]
    fn button_intents_use_binding_as_key_and_code() {
        let mut settings = Settings::default();
        settings.key_bindings.set(LogicalControl::ButtonY, "ArrowLeft");
        let snapshot = GamepadSnapshot {
            y: true,
            ..Default::default()
        };

        let intents = translate(&snapshot, &settings);
        let y = intents.last().unwrap();
        assert_eq!(
            *y,
            KeyIntent {
                phase: KeyPhase::Down,
                key: "ArrowLeft".to_string(),
                key_code: 37,
                code: "ArrowLeft".to_string(),
            }
        );
    }

    #[test]
    fn unknown_binding_still_emits_with_zero_code() {
        let mut settings = Settings::default();
        settings.key_bindings.set(LogicalControl::Space, "Enter");

        let intent = press(&settings.key_bindings, LogicalControl::Space).unwrap();
        assert_eq!(intent.key_code, 0);
        assert_eq!(intent.code, "Enter");
    }

    #[test]
    fn unbound_button_is_silently_skipped() {
        let mut settings = Settings::default();
        settings.key_bindings.unbind(LogicalControl::ButtonB);
        let snapshot = GamepadSnapshot {
            b: true,
            ..Default::default()
        };

        let intents = translate(&snapshot, &settings);
        assert_eq!(intents.len(), 7);
        assert!(keys(&intents, KeyPhase::Down).is_empty());
        assert!(press(&settings.key_bindings, LogicalControl::ButtonB).is_none());
    }

    #[test]
    fn direction_source_follows_direction_pad_setting() {
        let snapshot = GamepadSnapshot {
            dpad: Directions {
                up: true,
                ..Default::default()
            },
            thumbstick: Directions {
                left: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut settings = Settings::default();
        assert_eq!(keys(&translate(&snapshot, &settings), KeyPhase::Down), ["ArrowLeft"]);

        settings.use_direction_pad = true;
        assert_eq!(keys(&translate(&snapshot, &settings), KeyPhase::Down), ["ArrowUp"]);
    }

    #[test]
    fn wasd_and_arrow_keys_share_nothing() {
        let snapshot = GamepadSnapshot {
            thumbstick: Directions {
                up: true,
                down: true,
                left: true,
                right: true,
            },
            ..Default::default()
        };

        let mut settings = Settings::default();
        let arrows: HashSet<String> = translate(&snapshot, &settings)
            .into_iter()
            .take(4)
            .map(|i| i.code)
            .collect();

        settings.thumbstick_mapping = ThumbstickMapping::Wasd;
        let wasd = translate(&snapshot, &settings);
        assert_eq!(keys(&wasd[..4], KeyPhase::Down), ["w", "s", "a", "d"]);
        let wasd: HashSet<String> = wasd.into_iter().take(4).map(|i| i.code).collect();

        assert_eq!(arrows.len(), 4);
        assert_eq!(wasd.len(), 4);
        assert!(arrows.is_disjoint(&wasd));
    }

    #[test]
    fn release_all_covers_every_key() {
        let mut settings = Settings::default();
        settings.thumbstick_mapping = ThumbstickMapping::Wasd;

        let intents = release_all(&settings);
        assert_eq!(intents.len(), 8);
        assert!(intents.iter().all(|i| i.phase == KeyPhase::Up));
        assert_eq!(intents[0].code, "KeyW");
    }
}
