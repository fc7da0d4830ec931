use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Keys the session reacts to. Names follow the lowercase convention used in
/// configuration files (`space`, `escape`, `f7`...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Space,
    Escape,
    Return,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl Key {
    const NAMES: [(Key, &'static str); 15] = [
        (Key::Space, "space"),
        (Key::Escape, "escape"),
        (Key::Return, "return"),
        (Key::F1, "f1"),
        (Key::F2, "f2"),
        (Key::F3, "f3"),
        (Key::F4, "f4"),
        (Key::F5, "f5"),
        (Key::F6, "f6"),
        (Key::F7, "f7"),
        (Key::F8, "f8"),
        (Key::F9, "f9"),
        (Key::F10, "f10"),
        (Key::F11, "f11"),
        (Key::F12, "f12"),
    ];

    pub fn name(self) -> &'static str {
        Self::NAMES
            .iter()
            .find(|(k, _)| *k == self)
            .map(|(_, n)| *n)
            .unwrap_or("?")
    }
}

impl Default for Key {
    /// Default abort key.
    fn default() -> Self {
        Key::F7
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key name `{0}`")]
pub struct ParseKeyError(pub String);

impl FromStr for Key {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let lower = match lower.as_str() {
            "esc" => "escape",
            "enter" => "return",
            other => other,
        };
        Self::NAMES
            .iter()
            .find(|(_, n)| *n == lower)
            .map(|(k, _)| *k)
            .ok_or_else(|| ParseKeyError(s.to_string()))
    }
}

impl TryFrom<String> for Key {
    type Error = ParseKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Key> for String {
    fn from(k: Key) -> Self {
        k.name().to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input state captured once at the start of a frame.
///
/// Every check made during that frame reads from the same snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Pointer position in layout centimetres.
    pub pointer: Point,
    /// Left button is held.
    pub pointer_down: bool,
    /// Left button went down since the previous snapshot.
    pub pointer_pressed: bool,
    /// Keys pressed since the previous snapshot, in arrival order.
    pub keys: Vec<Key>,
}

impl InputSnapshot {
    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys.contains(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_round_trip() {
        for (key, name) in Key::NAMES {
            assert_eq!(name.parse::<Key>().unwrap(), key);
            assert_eq!(key.to_string(), name);
        }
        assert_eq!("ESC".parse::<Key>().unwrap(), Key::Escape);
        assert!("f13".parse::<Key>().is_err());
    }

    #[test]
    fn default_abort_key_is_f7() {
        assert_eq!(Key::default(), Key::F7);
    }
}
