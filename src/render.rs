//! Rendering seam: camera, map bounds and the draw-command canvas
//!
//! Systems never talk to a graphics API. They push [`DrawCommand`]s into a
//! [`Canvas`]; the headless runner and the tests use the recording [`DrawList`].

use serde::{Deserialize, Serialize};

pub const DEFAULT_WINDOW_WIDTH: u32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 600;

/// Integer screen rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "opaque")]
    pub a: u8,
}

fn opaque() -> u8 {
    255
}

impl Color {
    pub const BACKGROUND: Color = Color::rgb(21, 21, 21);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flip {
    #[default]
    None,
    Horizontal,
    Vertical,
}

impl Flip {
    /// Toggles between `self` and `None`.
    pub fn toggled(self, axis: Flip) -> Flip {
        if self == Flip::None {
            axis
        } else {
            Flip::None
        }
    }
}

/// The visible window into the map, in world pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width: width as i32,
            height: height as i32,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT)
    }
}

/// Size of the playable map in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub width: f64,
    pub height: f64,
}

impl MapBounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for MapBounds {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WIDTH as f64, DEFAULT_WINDOW_HEIGHT as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Sprite {
        asset_id: String,
        src: Rect,
        dst: Rect,
        rotation: f64,
        flip: Flip,
    },
    Rect {
        rect: Rect,
        color: Color,
        filled: bool,
    },
    Text {
        font_id: String,
        text: String,
        x: i32,
        y: i32,
        color: Color,
    },
}

/// A render target.
pub trait Canvas {
    /// Starts a new frame.
    fn clear(&mut self, color: Color);
    fn draw(&mut self, command: DrawCommand);
}

/// Canvas that records every command of the current frame.
#[derive(Debug, Default)]
pub struct DrawList {
    background: Option<Color>,
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn background(&self) -> Option<Color> {
        self.background
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Asset ids of the sprites drawn this frame, in draw order.
    pub fn sprite_ids(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Sprite { asset_id, .. } => Some(asset_id.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Canvas for DrawList {
    fn clear(&mut self, color: Color) {
        self.background = Some(color);
        self.commands.clear();
    }

    fn draw(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_list_records_one_frame() {
        let mut list = DrawList::new();
        list.draw(DrawCommand::Text {
            font_id: "font".into(),
            text: "stale".into(),
            x: 0,
            y: 0,
            color: Color::WHITE,
        });

        list.clear(Color::BACKGROUND);
        list.draw(DrawCommand::Sprite {
            asset_id: "tank".into(),
            src: Rect::new(0, 0, 32, 32),
            dst: Rect::new(10, 10, 32, 32),
            rotation: 0.0,
            flip: Flip::None,
        });

        assert_eq!(list.background(), Some(Color::BACKGROUND));
        assert_eq!(list.sprite_ids(), vec!["tank"]);
        assert!(list.texts().is_empty());
    }

    #[test]
    fn test_flip_toggle() {
        assert_eq!(Flip::None.toggled(Flip::Horizontal), Flip::Horizontal);
        assert_eq!(Flip::Horizontal.toggled(Flip::Horizontal), Flip::None);
        assert_eq!(Flip::Vertical.toggled(Flip::Horizontal), Flip::None);
    }
}
