//! Toroidal halite grid and per-turn navigation reservations.

use harvester_core::{Direction, MapQuery, Position};

use crate::ProtocolError;

/// Dense wraparound grid holding the halite of every cell.
///
/// Alongside the halite the map keeps one occupancy bit per cell. The world
/// seeds it with every ship's position when a frame arrives, and
/// [`MapQuery::navigate`] adds the cells ships have committed to moving onto,
/// so two friendly ships never pick the same destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameMap {
    width: u32,
    height: u32,
    halite: Vec<u32>,
    occupied: Vec<bool>,
}

impl GameMap {
    /// Creates a map from row-major halite values.
    pub fn new(width: u32, height: u32, halite: Vec<u32>) -> Result<Self, ProtocolError> {
        let expected = cell_count(width, height);
        if width == 0 || height == 0 || halite.len() != expected {
            return Err(ProtocolError::GridSize {
                width,
                height,
                cells: halite.len(),
            });
        }

        Ok(Self {
            width,
            height,
            occupied: vec![false; expected],
            halite,
        })
    }

    /// Creates a map where every cell holds `halite`.
    pub fn filled(width: u32, height: u32, halite: u32) -> Result<Self, ProtocolError> {
        Self::new(width, height, vec![halite; cell_count(width, height)])
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Overwrites the halite stored on a cell.
    pub fn set_halite(&mut self, position: Position, amount: u32) {
        let index = self.index(position);
        self.halite[index] = amount;
    }

    /// Halite summed over the whole map.
    #[must_use]
    pub fn total_halite(&self) -> u64 {
        self.halite.iter().map(|&amount| u64::from(amount)).sum()
    }

    /// Drops every reservation and occupancy mark.
    pub fn clear_reservations(&mut self) {
        self.occupied.fill(false);
    }

    fn index(&self, position: Position) -> usize {
        let wrapped = self.normalize(position);
        // Normalized coordinates are non-negative and inside the grid.
        wrapped.y() as usize * self.width as usize + wrapped.x() as usize
    }
}

impl MapQuery for GameMap {
    fn normalize(&self, position: Position) -> Position {
        Position::new(
            position.x().rem_euclid(self.width as i32),
            position.y().rem_euclid(self.height as i32),
        )
    }

    fn distance(&self, source: Position, target: Position) -> u32 {
        let source = self.normalize(source);
        let target = self.normalize(target);
        let dx = source.x().abs_diff(target.x());
        let dy = source.y().abs_diff(target.y());
        dx.min(self.width - dx) + dy.min(self.height - dy)
    }

    fn halite_at(&self, position: Position) -> u32 {
        self.halite[self.index(position)]
    }

    fn is_occupied(&self, position: Position) -> bool {
        self.occupied[self.index(position)]
    }

    fn mark_unsafe(&mut self, position: Position) {
        let index = self.index(position);
        self.occupied[index] = true;
    }

    fn unsafe_moves(&self, source: Position, destination: Position) -> Vec<Direction> {
        let source = self.normalize(source);
        let destination = self.normalize(destination);
        let mut moves = Vec::with_capacity(2);

        let dx = source.x().abs_diff(destination.x());
        if dx != 0 {
            let toward = if destination.x() > source.x() {
                Direction::East
            } else {
                Direction::West
            };
            // Going the other way round is shorter past the half-way mark.
            moves.push(if 2 * dx < self.width {
                toward
            } else {
                toward.invert()
            });
        }

        let dy = source.y().abs_diff(destination.y());
        if dy != 0 {
            let toward = if destination.y() > source.y() {
                Direction::South
            } else {
                Direction::North
            };
            moves.push(if 2 * dy < self.height {
                toward
            } else {
                toward.invert()
            });
        }

        moves
    }
}

fn cell_count(width: u32, height: u32) -> usize {
    let count = u64::from(width) * u64::from(height);
    usize::try_from(count).unwrap_or(0)
}
