use serde::{Deserialize, Serialize};

/// Cardinal facing of a character. Doubles as the row index into a
/// 4x4 walk-cycle sprite sheet.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    /// Order in which held directions are applied each tick. A later entry
    /// overrides the facing chosen by an earlier one.
    pub const APPLY_ORDER: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Sheet rows top to bottom.
    pub const SHEET_ORDER: [Direction; 4] = [
        Direction::Down,
        Direction::Left,
        Direction::Right,
        Direction::Up,
    ];

    pub fn sheet_row(self) -> u32 {
        match self {
            Self::Down => 0,
            Self::Left => 1,
            Self::Right => 2,
            Self::Up => 3,
        }
    }

    pub fn animation_name(self) -> &'static str {
        match self {
            Self::Up => "walk_up",
            Self::Down => "walk_down",
            Self::Left => "walk_left",
            Self::Right => "walk_right",
        }
    }

    /// Unit step in screen space (y grows downward).
    pub fn delta(self) -> (f32, f32) {
        match self {
            Self::Up => (0.0, -1.0),
            Self::Down => (0.0, 1.0),
            Self::Left => (-1.0, 0.0),
            Self::Right => (1.0, 0.0),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}
