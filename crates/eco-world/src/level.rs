//! Level layouts: terrain plus simulator placements, hand-built or generated.

use crate::simulators::PatchState;
use eco_core::{EcosystemConfig, Position, TileType};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlacementKind {
    Vegetation { state: PatchState },
    PreySpawner,
    WormSpawner,
    StickSpawner,
    PredatorDen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Position,
    pub kind: PlacementKind,
}

/// Everything needed to (re)load a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub width: i32,
    pub height: i32,
    /// Row-major terrain, `width * height` entries
    pub tiles: Vec<TileType>,
    pub placements: Vec<Placement>,
    /// Starting tiles for controllable creatures
    pub observers: Vec<Position>,
}

impl LevelLayout {
    /// All-empty terrain with nothing placed
    pub fn blank(width: i32, height: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        Self {
            width,
            height,
            tiles: vec![TileType::Empty; (width as usize) * (height as usize)],
            placements: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    pub fn tile(&self, pos: Position) -> Option<TileType> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.tiles.get((pos.y * self.width + pos.x) as usize).copied()
    }

    pub fn set_tile(&mut self, pos: Position, tile: TileType) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        match self.tiles.get_mut((pos.y * self.width + pos.x) as usize) {
            Some(slot) => {
                *slot = tile;
                true
            }
            None => false,
        }
    }

    pub fn place(&mut self, position: Position, kind: PlacementKind) -> &mut Self {
        self.placements.push(Placement { position, kind });
        self
    }

    pub fn add_observer(&mut self, position: Position) -> &mut Self {
        self.observers.push(position);
        self
    }

    /// Random terrain from the configured densities, then spawners, patches
    /// and observers on distinct passable tiles.
    pub fn generate(config: &EcosystemConfig, rng: &mut ChaCha8Rng) -> Self {
        let world = &config.world;
        let densities = &config.generation;
        let mut layout = Self::blank(world.width, world.height);

        for y in 0..layout.height {
            for x in 0..layout.width {
                let roll = rng.gen::<f32>();
                let tile = if roll < densities.water_density {
                    TileType::Water
                } else if roll < densities.water_density + densities.obstacle_density {
                    TileType::Obstacle
                } else if roll
                    < densities.water_density + densities.obstacle_density + densities.grass_density
                {
                    TileType::Grass
                } else {
                    TileType::Empty
                };
                layout.set_tile(Position::new(x, y), tile);
            }
        }

        let mut free: Vec<Position> = (0..layout.height)
            .flat_map(|y| (0..layout.width).map(move |x| Position::new(x, y)))
            .filter(|pos| matches!(layout.tile(*pos), Some(TileType::Empty | TileType::Grass)))
            .collect();
        free.shuffle(rng);

        let fixed = [
            (densities.prey_spawners, PlacementKind::PreySpawner),
            (densities.worm_spawners, PlacementKind::WormSpawner),
            (densities.stick_spawners, PlacementKind::StickSpawner),
            (densities.predator_dens, PlacementKind::PredatorDen),
        ];
        for (count, kind) in fixed {
            for _ in 0..count {
                if let Some(pos) = free.pop() {
                    layout.place(pos, kind);
                }
            }
        }

        for _ in 0..densities.vegetation_patches {
            let Some(pos) = free.pop() else { break };
            let state = if rng.gen_bool(0.5) {
                PatchState::Full
            } else {
                PatchState::Growing
            };
            layout.set_tile(pos, TileType::Grass);
            layout.place(pos, PlacementKind::Vegetation { state });
        }

        for _ in 0..densities.observers {
            if let Some(pos) = free.pop() {
                layout.add_observer(pos);
            }
        }

        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_blank_layout() {
        let layout = LevelLayout::blank(4, 3);
        assert_eq!(layout.tiles.len(), 12);
        assert_eq!(layout.tile(Position::new(3, 2)), Some(TileType::Empty));
        assert_eq!(layout.tile(Position::new(4, 0)), None);

        let empty = LevelLayout::blank(-2, 5);
        assert!(empty.tiles.is_empty());
    }

    #[test]
    fn test_generate_places_on_distinct_passable_tiles() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let config = EcosystemConfig::default();
        let layout = LevelLayout::generate(&config, &mut rng);

        let generation = &config.generation;
        let expected = generation.prey_spawners
            + generation.worm_spawners
            + generation.stick_spawners
            + generation.predator_dens
            + generation.vegetation_patches;
        assert_eq!(layout.placements.len(), expected);
        assert_eq!(layout.observers.len(), generation.observers);

        let mut seen = HashSet::new();
        for placement in &layout.placements {
            assert!(seen.insert(placement.position));
            assert!(matches!(
                layout.tile(placement.position),
                Some(TileType::Empty | TileType::Grass)
            ));
            if let PlacementKind::Vegetation { .. } = placement.kind {
                assert_eq!(layout.tile(placement.position), Some(TileType::Grass));
            }
        }
        for observer in &layout.observers {
            assert!(!seen.contains(observer));
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        let config = EcosystemConfig::default();
        let a = LevelLayout::generate(&config, &mut ChaCha8Rng::seed_from_u64(9));
        let b = LevelLayout::generate(&config, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_tile_mix() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut config = EcosystemConfig::default();
        config.generation.water_density = 0.2;
        config.generation.obstacle_density = 0.2;
        config.generation.grass_density = 0.3;
        let layout = LevelLayout::generate(&config, &mut rng);

        let count = |t: TileType| layout.tiles.iter().filter(|x| **x == t).count();
        let total = layout.tiles.len() as f32;
        assert!(count(TileType::Water) as f32 / total > 0.1);
        assert!(count(TileType::Obstacle) as f32 / total > 0.1);
        assert!(count(TileType::Grass) as f32 / total > 0.2);
    }
}
