//! Game events published on the [`EventBus`](crate::ecs::EventBus)

use std::str::FromStr;

use thiserror::Error;

use crate::ecs::{Entity, Event};

/// Two colliders overlap this frame. `a` came first in the collision system's
/// entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub a: Entity,
    pub b: Entity,
}

impl Event for CollisionEvent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPressedEvent {
    pub key: Key,
    /// Game clock when the key went down.
    pub at_ms: u64,
}

impl Event for KeyPressedEvent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Right,
    Down,
    Left,
    W,
    A,
    S,
    D,
    Z,
    Space,
    F1,
    Escape,
}

/// Steering direction, in sprite-sheet row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn sheet_row(self) -> i32 {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }
}

impl Key {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Key::Up | Key::W => Some(Direction::Up),
            Key::Right | Key::D => Some(Direction::Right),
            Key::Down | Key::S => Some(Direction::Down),
            Key::Left | Key::A => Some(Direction::Left),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key `{0}`")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.to_ascii_lowercase().as_str() {
            "up" => Key::Up,
            "right" => Key::Right,
            "down" => Key::Down,
            "left" => Key::Left,
            "w" => Key::W,
            "a" => Key::A,
            "s" => Key::S,
            "d" => Key::D,
            "z" => Key::Z,
            "space" => Key::Space,
            "f1" => Key::F1,
            "escape" | "esc" => Key::Escape,
            _ => return Err(UnknownKey(s.to_owned())),
        };
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parsing_and_directions() {
        assert_eq!("Z".parse::<Key>(), Ok(Key::Z));
        assert_eq!("esc".parse::<Key>(), Ok(Key::Escape));
        assert!("q".parse::<Key>().is_err());

        assert_eq!(Key::W.direction(), Some(Direction::Up));
        assert_eq!(Key::Left.direction(), Some(Direction::Left));
        assert_eq!(Key::Z.direction(), None);
        assert_eq!(Direction::Down.sheet_row(), 2);
    }
}
