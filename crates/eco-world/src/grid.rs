//! 2D tile grid and occupancy index.
//!
//! Every position-taking method is total: out-of-bounds input yields `None`,
//! `false` or an empty list, never a panic.

use eco_core::{CreatureId, Direction, Position, TileType};
use serde::{Deserialize, Serialize};

/// Emitted whenever a tile is written, for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileChange {
    pub position: Position,
    pub tile: TileType,
}

/// A bounded, non-wrapping grid
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    tiles: Vec<TileType>,
    occupants: Vec<Option<CreatureId>>,
    changes: Vec<TileChange>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        let mut grid = Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
            occupants: Vec::new(),
            changes: Vec::new(),
        };
        grid.initialize(width, height);
        grid
    }

    /// (Re)allocate the tile array with every tile `Empty`.
    ///
    /// Negative dimensions produce an empty grid. Pending change
    /// notifications from the previous level are discarded.
    pub(crate) fn initialize(&mut self, width: i32, height: i32) {
        self.width = width.max(0);
        self.height = height.max(0);
        let size = (self.width as usize) * (self.height as usize);
        self.tiles = vec![TileType::Empty; size];
        self.occupants = vec![None; size];
        self.changes.clear();
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    /// Tile type at position, `None` if out of bounds
    pub fn get_tile(&self, pos: Position) -> Option<TileType> {
        self.index(pos).map(|i| self.tiles[i])
    }

    /// Set tile at position; no-op when out of bounds
    pub fn set_tile(&mut self, pos: Position, tile: TileType) -> bool {
        match self.index(pos) {
            Some(i) => {
                self.tiles[i] = tile;
                self.changes.push(TileChange { position: pos, tile });
                true
            }
            None => false,
        }
    }

    /// Anything but an obstacle. Water counts as walkable here; callers that
    /// need dry land use [`Grid::is_passable`].
    pub fn is_walkable(&self, pos: Position) -> bool {
        matches!(self.get_tile(pos), Some(tile) if tile != TileType::Obstacle)
    }

    /// Walkable and not water, as used for the pathfinding graph
    pub fn is_passable(&self, pos: Position) -> bool {
        matches!(
            self.get_tile(pos),
            Some(TileType::Empty) | Some(TileType::Grass)
        )
    }

    /// In-bounds orthogonal neighbors, north first, clockwise
    pub fn neighbors4(&self, pos: Position) -> Vec<Position> {
        Direction::cardinal()
            .iter()
            .map(|dir| pos.step(*dir))
            .filter(|p| self.in_bounds(*p))
            .collect()
    }

    /// In-bounds neighbors including diagonals
    pub fn neighbors8(&self, pos: Position) -> Vec<Position> {
        Direction::all()
            .iter()
            .map(|dir| pos.step(*dir))
            .filter(|p| self.in_bounds(*p))
            .collect()
    }

    pub fn occupant(&self, pos: Position) -> Option<CreatureId> {
        self.index(pos).and_then(|i| self.occupants[i])
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.occupant(pos).is_some()
    }

    /// Record `id` as the tracked occupant. Fails if the tile is out of
    /// bounds or already tracks someone else.
    pub fn set_occupant(&mut self, pos: Position, id: CreatureId) -> bool {
        match self.index(pos) {
            Some(i) => match self.occupants[i] {
                Some(existing) if existing != id => false,
                _ => {
                    self.occupants[i] = Some(id);
                    true
                }
            },
            None => false,
        }
    }

    pub fn clear_occupant(&mut self, pos: Position) -> Option<CreatureId> {
        self.index(pos).and_then(|i| self.occupants[i].take())
    }

    /// Clear only if `id` is the tracked occupant
    pub fn clear_occupant_if(&mut self, pos: Position, id: CreatureId) -> bool {
        match self.index(pos) {
            Some(i) if self.occupants[i] == Some(id) => {
                self.occupants[i] = None;
                true
            }
            _ => false,
        }
    }

    /// Drain pending tile change notifications
    pub fn take_changes(&mut self) -> Vec<TileChange> {
        std::mem::take(&mut self.changes)
    }

    pub fn count(&self, tile: TileType) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if self.in_bounds(pos) {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.tiles.len()).map(move |i| self.index_to_pos(i))
    }

    /// Iterator over all tiles with positions
    pub fn iter(&self) -> impl Iterator<Item = (Position, TileType)> + '_ {
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, tile)| (self.index_to_pos(i), *tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10, 8);
        assert_eq!(grid.width, 10);
        assert_eq!(grid.height, 8);
        assert_eq!(grid.tiles.len(), 80);
        assert_eq!(grid.count(TileType::Empty), 80);
    }

    #[test]
    fn test_out_of_bounds_is_absent() {
        let mut grid = Grid::new(10, 10);

        assert_eq!(grid.get_tile(Position::new(-1, 0)), None);
        assert_eq!(grid.get_tile(Position::new(10, 3)), None);
        assert!(!grid.is_walkable(Position::new(3, 10)));
        assert!(!grid.set_tile(Position::new(10, 10), TileType::Water));
        assert!(grid.take_changes().is_empty());
    }

    #[test]
    fn test_set_tile_emits_change() {
        let mut grid = Grid::new(5, 5);
        assert!(grid.set_tile(Position::new(2, 3), TileType::Grass));

        assert_eq!(grid.get_tile(Position::new(2, 3)), Some(TileType::Grass));
        let changes = grid.take_changes();
        assert_eq!(
            changes,
            vec![TileChange {
                position: Position::new(2, 3),
                tile: TileType::Grass
            }]
        );
        assert!(grid.take_changes().is_empty());
    }

    #[test]
    fn test_walkable_and_passable() {
        let mut grid = Grid::new(5, 5);
        grid.set_tile(Position::new(0, 0), TileType::Obstacle);
        grid.set_tile(Position::new(1, 0), TileType::Water);
        grid.set_tile(Position::new(2, 0), TileType::Grass);

        assert!(!grid.is_walkable(Position::new(0, 0)));
        assert!(grid.is_walkable(Position::new(1, 0)));
        assert!(!grid.is_passable(Position::new(1, 0)));
        assert!(grid.is_passable(Position::new(2, 0)));
        assert!(grid.is_passable(Position::new(3, 0)));
    }

    #[test]
    fn test_neighbors_at_corner_and_center() {
        let grid = Grid::new(10, 10);

        assert_eq!(grid.neighbors4(Position::new(5, 5)).len(), 4);
        assert_eq!(grid.neighbors8(Position::new(5, 5)).len(), 8);

        let corner = grid.neighbors4(Position::new(0, 0));
        assert_eq!(corner, vec![Position::new(1, 0), Position::new(0, 1)]);
        assert_eq!(grid.neighbors8(Position::new(9, 9)).len(), 3);
        assert!(grid.neighbors8(Position::new(-5, -5)).is_empty());
    }

    #[test]
    fn test_occupancy_tracking() {
        let mut grid = Grid::new(4, 4);
        let pos = Position::new(1, 1);
        let a = CreatureId(1);
        let b = CreatureId(2);

        assert!(grid.set_occupant(pos, a));
        assert!(!grid.set_occupant(pos, b));
        assert!(grid.set_occupant(pos, a));
        assert!(!grid.clear_occupant_if(pos, b));
        assert_eq!(grid.occupant(pos), Some(a));

        assert!(grid.clear_occupant_if(pos, a));
        assert!(!grid.is_occupied(pos));
        assert!(grid.set_occupant(pos, b));
        assert_eq!(grid.clear_occupant(pos), Some(b));
        assert_eq!(grid.occupant(pos), None);
        assert!(!grid.set_occupant(Position::new(4, 0), a));
    }

    #[test]
    fn test_reinitialize_resets_tiles() {
        let mut grid = Grid::new(3, 3);
        grid.set_tile(Position::new(1, 1), TileType::Obstacle);
        grid.set_occupant(Position::new(0, 0), CreatureId(7));

        grid.initialize(6, 2);
        assert_eq!(grid.width, 6);
        assert_eq!(grid.height, 2);
        assert_eq!(grid.count(TileType::Empty), 12);
        assert!(!grid.is_occupied(Position::new(0, 0)));
        assert!(grid.take_changes().is_empty());
        assert_eq!(grid.get_tile(Position::new(1, 2)), None);
    }

    #[test]
    fn test_negative_dimensions_give_empty_grid() {
        let grid = Grid::new(-3, 4);
        assert_eq!(grid.width, 0);
        assert_eq!(grid.positions().count(), 0);
        assert_eq!(grid.get_tile(Position::new(0, 0)), None);
    }

    proptest! {
        #[test]
        fn prop_queries_outside_bounds_are_absent(
            width in 1i32..20,
            height in 1i32..20,
            x in -40i32..40,
            y in -40i32..40,
        ) {
            let mut grid = Grid::new(width, height);
            let pos = Position::new(x, y);
            let inside = x >= 0 && y >= 0 && x < width && y < height;

            prop_assert_eq!(grid.get_tile(pos).is_some(), inside);
            prop_assert_eq!(grid.set_tile(pos, TileType::Grass), inside);
            prop_assert_eq!(grid.set_occupant(pos, CreatureId(1)), inside);
            for neighbor in grid.neighbors8(pos) {
                prop_assert!(grid.in_bounds(neighbor));
            }
        }
    }
}
