use serde::{Deserialize, Serialize};

use crate::map::Bounds;

/// Dimensions and entity counts for a randomly generated dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
    pub wumpus_count: usize,
    pub pit_count: usize,
    pub gold_count: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
            wumpus_count: 1,
            pit_count: 2,
            gold_count: 1,
        }
    }
}

impl WorldConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    /// Cells needed to place every entity on its own cell, Link included.
    pub fn entity_count(&self) -> usize {
        self.wumpus_count + self.pit_count + self.gold_count + 1
    }
}

/// Dimensions and Wumpus count for the puzzle variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleConfig {
    pub width: usize,
    pub height: usize,
    pub wumpus_count: usize,
}

impl Default for PuzzleConfig {
    fn default() -> Self {
        Self {
            width: 4,
            height: 4,
            wumpus_count: 2,
        }
    }
}

impl PuzzleConfig {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }
}
