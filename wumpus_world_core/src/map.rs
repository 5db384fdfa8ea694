use serde::{Deserialize, Serialize};

use crate::{Direction, Position};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({x}, {y}) are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// The rectangle `[0, width - 1] × [0, height - 1]` that every search state lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    width: usize,
    height: usize,
}

impl Bounds {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Largest valid x coordinate.
    #[inline]
    pub fn max_x(&self) -> usize {
        self.width.saturating_sub(1)
    }

    /// Largest valid y coordinate.
    #[inline]
    pub fn max_y(&self) -> usize {
        self.height.saturating_sub(1)
    }

    /// Number of cells inside the bounds.
    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    /// Returns the axis-aligned neighbors of `position` that lie inside the bounds.
    ///
    /// The order is always west, east, south, north. Depth-first callers push
    /// them in that order, so north is expanded first.
    pub fn neighbors(&self, position: Position) -> Vec<Position> {
        let Position { x, y } = position;
        let mut neighbors = Vec::with_capacity(4);
        if x > 0 {
            neighbors.push(Position::new(x - 1, y));
        }
        if x + 1 < self.width {
            neighbors.push(Position::new(x + 1, y));
        }
        if y > 0 {
            neighbors.push(Position::new(x, y - 1));
        }
        if y + 1 < self.height {
            neighbors.push(Position::new(x, y + 1));
        }
        neighbors
    }

    /// Moves `position` one step in `direction`.
    ///
    /// A step that would leave the bounds leaves that axis unchanged.
    pub fn step_clamped(&self, position: Position, direction: Direction) -> Position {
        let Position { mut x, mut y } = position;
        match direction {
            Direction::North if y < self.max_y() => y += 1,
            Direction::South if y > 0 => y -= 1,
            Direction::East if x < self.max_x() => x += 1,
            Direction::West if x > 0 => x -= 1,
            _ => {}
        }
        Position { x, y }
    }
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order, with
/// row 0 being the southern edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    /// Converts (x, y) coordinates to a flat vector index.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    #[inline]
    pub fn coords_to_index(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            None
        }
    }

    /// Gets an immutable reference to the cell at the given coordinates.
    ///
    /// Returns `None` if the coordinates are out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&T> {
        let index = self.coords_to_index(x, y)?;
        self.cells.get(index)
    }

    /// Sets the value of the cell at the given coordinates.
    ///
    /// Returns `Err(GridError::OutOfBounds)` if the coordinates are invalid.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> Result<(), GridError> {
        let index = self.coords_to_index(x, y).ok_or(GridError::OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_follow_west_east_south_north() {
        let bounds = Bounds::new(3, 3);
        assert_eq!(
            bounds.neighbors(Position::new(1, 1)),
            vec![
                Position::new(0, 1),
                Position::new(2, 1),
                Position::new(1, 0),
                Position::new(1, 2),
            ]
        );
    }

    #[test]
    fn neighbors_are_filtered_at_corners() {
        let bounds = Bounds::new(4, 3);
        assert_eq!(
            bounds.neighbors(Position::new(0, 0)),
            vec![Position::new(1, 0), Position::new(0, 1)]
        );
        assert_eq!(
            bounds.neighbors(Position::new(3, 2)),
            vec![Position::new(2, 2), Position::new(3, 1)]
        );
        assert!(Bounds::new(1, 1).neighbors(Position::new(0, 0)).is_empty());
    }

    #[test]
    fn step_clamped_stops_at_edges() {
        let bounds = Bounds::new(3, 3);
        let corner = Position::new(0, 0);
        assert_eq!(bounds.step_clamped(corner, Direction::West), corner);
        assert_eq!(bounds.step_clamped(corner, Direction::South), corner);
        assert_eq!(
            bounds.step_clamped(corner, Direction::North),
            Position::new(0, 1)
        );
        let far = Position::new(2, 2);
        assert_eq!(bounds.step_clamped(far, Direction::East), far);
        assert_eq!(bounds.step_clamped(far, Direction::North), far);
        assert_eq!(bounds.step_clamped(far, Direction::Stay), far);
    }

    #[test]
    fn grid_set_rejects_out_of_bounds() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        assert!(grid.set(1, 1, 7).is_ok());
        assert_eq!(grid.get(1, 1), Some(&7));
        assert_eq!(
            grid.set(2, 0, 1),
            Err(GridError::OutOfBounds {
                x: 2,
                y: 0,
                width: 2,
                height: 2
            })
        );
        assert_eq!(grid.get(0, 2), None);
    }
}
