//! Predator dens keep at least one predator alive and pick roaming targets.

use super::{Effect, TurnView};
use crate::grid::Grid;
use eco_core::{CreatureId, CreatureKind, Position, PredatorDenConfig};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;
use std::f64::consts::TAU;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq)]
pub struct PredatorDen {
    position: Position,
    kind: Option<CreatureKind>,
    config: PredatorDenConfig,
    attached: BTreeSet<CreatureId>,
    count: usize,
    rng: ChaCha8Rng,
}

impl PredatorDen {
    pub fn new(
        position: Position,
        kind: Option<CreatureKind>,
        config: PredatorDenConfig,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            position,
            kind,
            config,
            attached: BTreeSet::new(),
            count: 0,
            rng,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn kind(&self) -> Option<CreatureKind> {
        self.kind
    }

    /// Live predators as of the last prune
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn territory_radius(&self) -> i32 {
        self.config.territory_radius
    }

    pub fn attach(&mut self, id: CreatureId) {
        self.attached.insert(id);
        self.count = self.attached.len();
    }

    pub(crate) fn reset(&mut self) {
        self.attached.clear();
        self.count = 0;
    }

    pub(crate) fn advance(&mut self, view: &TurnView<'_>) -> Vec<Effect> {
        self.attached.retain(|id| view.creatures.exists(*id));
        self.count = self.attached.len();
        if self.count > 0 {
            return Vec::new();
        }

        let Some(kind) = self.kind else {
            return Vec::new();
        };
        if !view.grid.is_walkable(self.position) {
            trace!(x = self.position.x, y = self.position.y, "Den tile blocked");
            return Vec::new();
        }
        debug!(x = self.position.x, y = self.position.y, turn = view.turn, "Den empty, spawning predator");
        vec![Effect::SpawnCreatures {
            kind,
            position: self.position,
            count: 1,
            hide: false,
        }]
    }

    /// Random passable tile within the territory, or `None` once both
    /// sampling strategies run out of attempts.
    pub fn random_position_in_territory(&mut self, grid: &Grid) -> Option<Position> {
        if grid.width <= 0 || grid.height <= 0 {
            return None;
        }
        let radius = self.config.territory_radius.max(0);

        for _ in 0..self.config.polar_attempts {
            let angle = self.rng.gen_range(0.0..TAU);
            let distance = self.rng.gen_range(0.0..=radius as f64);
            let x = self.position.x + (angle.cos() * distance).round() as i32;
            let y = self.position.y + (angle.sin() * distance).round() as i32;
            let pos = Position::new(x.clamp(0, grid.width - 1), y.clamp(0, grid.height - 1));
            if grid.is_passable(pos) {
                return Some(pos);
            }
        }

        for _ in 0..self.config.offset_attempts {
            let dx = self.rng.gen_range(-radius..=radius);
            let dy = self.rng.gen_range(-radius..=radius);
            if dx.abs() + dy.abs() > radius {
                continue;
            }
            let pos = self.position.add(dx, dy);
            if grid.is_passable(pos) {
                return Some(pos);
            }
        }

        trace!(x = self.position.x, y = self.position.y, "No territory position found");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::services::CreatureRegistry;
    use eco_core::{Season, TileType};
    use rand::SeedableRng;

    fn den(fx: &Fixture, pos: Position) -> PredatorDen {
        let kind = fx.kinds.creature("fox").ok();
        PredatorDen::new(pos, kind, PredatorDenConfig::default(), ChaCha8Rng::seed_from_u64(8))
    }

    #[test]
    fn test_empty_den_requests_one_predator() {
        let mut fx = Fixture::new(5, 5);
        fx.reveal_all();
        let mut d = den(&fx, Position::new(2, 2));

        let effects = d.advance(&fx.view(1, Season::Fall));
        assert_eq!(
            effects,
            vec![Effect::SpawnCreatures {
                kind: fx.kinds.creature("fox").unwrap(),
                position: Position::new(2, 2),
                count: 1,
                hide: false,
            }]
        );
    }

    #[test]
    fn test_count_tracks_live_predators() {
        let mut fx = Fixture::new(5, 5);
        fx.reveal_all();
        let mut d = den(&fx, Position::new(2, 2));
        let fox = fx.kinds.creature("fox").unwrap();
        let id = fx.creatures.spawn(fox, Position::new(2, 2), 1).unwrap();
        d.attach(id);
        assert_eq!(d.count(), 1);

        assert!(d.advance(&fx.view(1, Season::Fall)).is_empty());
        assert_eq!(d.count(), 1);

        fx.creatures.kill(id);
        assert_eq!(d.advance(&fx.view(2, Season::Fall)).len(), 1);
        assert_eq!(d.count(), 0);
    }

    #[test]
    fn test_blocked_den_does_not_spawn() {
        let mut fx = Fixture::new(5, 5);
        fx.reveal_all();
        fx.grid.set_tile(Position::new(2, 2), TileType::Obstacle);
        let mut d = den(&fx, Position::new(2, 2));
        assert!(d.advance(&fx.view(1, Season::Fall)).is_empty());
    }

    #[test]
    fn test_territory_positions_are_passable_and_nearby() {
        let mut fx = Fixture::new(20, 20);
        fx.grid.set_tile(Position::new(10, 11), TileType::Water);
        let mut d = den(&fx, Position::new(10, 10));

        for _ in 0..200 {
            let pos = d.random_position_in_territory(&fx.grid).unwrap();
            assert!(fx.grid.is_passable(pos));
            assert!(pos.distance_squared(&Position::new(10, 10)) <= 7 * 7);
        }
    }

    #[test]
    fn test_offset_sampling_finds_tile_without_polar_attempts() {
        let mut fx = Fixture::new(5, 5);
        for pos in fx.grid.positions().collect::<Vec<_>>() {
            fx.grid.set_tile(pos, TileType::Water);
        }
        let open = Position::new(3, 2);
        fx.grid.set_tile(open, TileType::Empty);

        let config = PredatorDenConfig {
            territory_radius: 2,
            polar_attempts: 0,
            offset_attempts: 500,
            ..PredatorDenConfig::default()
        };
        let kind = fx.kinds.creature("fox").ok();
        let mut d = PredatorDen::new(Position::new(2, 2), kind, config, ChaCha8Rng::seed_from_u64(4));

        assert_eq!(d.random_position_in_territory(&fx.grid), Some(open));
    }

    #[test]
    fn test_territory_gives_up_when_nothing_is_passable() {
        let mut fx = Fixture::new(3, 3);
        for pos in fx.grid.positions().collect::<Vec<_>>() {
            fx.grid.set_tile(pos, TileType::Water);
        }
        let mut d = den(&fx, Position::new(1, 1));
        assert_eq!(d.random_position_in_territory(&fx.grid), None);
    }
}
