use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod map;
pub mod puzzle;
pub mod world;

/// Represents a 2D coordinate. `x` grows to the east, `y` grows to the north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single-step move on the grid.
///
/// `Stay` is the absence of movement; in a puzzle move vector it marks a slot
/// whose entity does not move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    #[default]
    Stay,
}

impl Direction {
    /// The four moves that change position.
    pub const MOVES: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit delta `(dx, dy)` for this direction.
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
            Direction::Stay => (0, 0),
        }
    }

    #[inline]
    pub fn is_stay(self) -> bool {
        self == Direction::Stay
    }

    /// Converts a move between two adjacent positions into a Direction.
    ///
    /// The x axis is compared before the y axis, so for positions that are not
    /// adjacent the result points along x whenever the x coordinates differ.
    pub fn between(from: Position, to: Position) -> Direction {
        if to.x > from.x {
            Direction::East
        } else if to.x < from.x {
            Direction::West
        } else if to.y > from.y {
            Direction::North
        } else if to.y < from.y {
            Direction::South
        } else {
            Direction::Stay
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "NORTH",
            Direction::South => "SOUTH",
            Direction::East => "EAST",
            Direction::West => "WEST",
            Direction::Stay => "STAY",
        };
        f.write_str(name)
    }
}
