//! Static key tables: symbolic key name → DOM `keyCode`, and the two sets of
//! direction keys.

use crate::persistence::ThumbstickMapping;

/// Legacy DOM `keyCode` for a symbolic key. Unknown names give `0`.
pub fn key_code(symbolic_key: &str) -> u32 {
    match symbolic_key {
        "Space" => 32,
        "KeyA" | "a" => 65,
        "KeyB" => 66,
        "KeyX" => 88,
        "KeyY" => 89,
        "KeyW" | "w" => 87,
        "KeyS" | "s" => 83,
        "KeyD" | "d" => 68,
        "ArrowUp" => 38,
        "ArrowDown" => 40,
        "ArrowLeft" => 37,
        "ArrowRight" => 39,
        _ => 0,
    }
}

/// One direction's synthetic key: `key`, `keyCode` and `code` of the DOM event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectionKey {
    pub key: &'static str,
    pub key_code: u32,
    pub code: &'static str,
}

/// Up, down, left, right.
pub const ARROW_KEYS: [DirectionKey; 4] = [
    DirectionKey {
        key: "ArrowUp",
        key_code: 38,
        code: "ArrowUp",
    },
    DirectionKey {
        key: "ArrowDown",
        key_code: 40,
        code: "ArrowDown",
    },
    DirectionKey {
        key: "ArrowLeft",
        key_code: 37,
        code: "ArrowLeft",
    },
    DirectionKey {
        key: "ArrowRight",
        key_code: 39,
        code: "ArrowRight",
    },
];

/// Up, down, left, right.
pub const WASD_KEYS: [DirectionKey; 4] = [
    DirectionKey {
        key: "w",
        key_code: 87,
        code: "KeyW",
    },
    DirectionKey {
        key: "s",
        key_code: 83,
        code: "KeyS",
    },
    DirectionKey {
        key: "a",
        key_code: 65,
        code: "KeyA",
    },
    DirectionKey {
        key: "d",
        key_code: 68,
        code: "KeyD",
    },
];

pub fn direction_keys(mapping: ThumbstickMapping) -> &'static [DirectionKey; 4] {
    match mapping {
        ThumbstickMapping::ArrowKeys => &ARROW_KEYS,
        ThumbstickMapping::Wasd => &WASD_KEYS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::KEY_OPTIONS;

    #[test]
    fn unknown_keys_resolve_to_zero() {
        for name in ["", "KeyQ", "Enter", "space", "ARROWUP", "F1"] {
            assert_eq!(key_code(name), 0, "{name}");
        }
    }

    #[test]
    fn every_selectable_key_has_a_code() {
        for name in KEY_OPTIONS {
            assert_ne!(key_code(name), 0, "{name}");
        }
    }

    #[test]
    fn direction_tables_agree_with_lookup() {
        for entry in ARROW_KEYS.iter().chain(WASD_KEYS.iter()) {
            assert_eq!(key_code(entry.key), entry.key_code);
            assert_eq!(key_code(entry.code), entry.key_code);
        }
    }

    #[test]
    fn direction_tables_do_not_overlap() {
        for arrow in ARROW_KEYS {
            for wasd in WASD_KEYS {
                assert_ne!(arrow.key, wasd.key);
                assert_ne!(arrow.code, wasd.code);
                assert_ne!(arrow.key_code, wasd.key_code);
            }
        }
    }
}
