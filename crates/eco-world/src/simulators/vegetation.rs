//! Grass patches that mature, spread and get thinned.

use super::{patch_site_is_free, seasonal_threshold, Effect, TurnView};
use eco_core::{Position, Season, VegetationConfig};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PatchState {
    #[default]
    Growing,
    Full,
}

/// Result of removing one level of growth from a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarvestOutcome {
    /// Full patch dropped back to growing
    Thinned,
    /// Growing patch is gone; the caller unregisters it
    Depleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VegetationPatch {
    position: Position,
    state: PatchState,
    turns_since_growth: u32,
    turns_until_growth: u32,
    turns_since_spread: u32,
    turns_until_spread: u32,
    config: VegetationConfig,
    rng: ChaCha8Rng,
}

impl VegetationPatch {
    pub fn new(
        position: Position,
        state: PatchState,
        config: VegetationConfig,
        rng: ChaCha8Rng,
        season: Season,
    ) -> Self {
        let mut patch = Self {
            position,
            state,
            turns_since_growth: 0,
            turns_until_growth: 1,
            turns_since_spread: 0,
            turns_until_spread: 1,
            config,
            rng,
        };
        patch.reset(season);
        patch
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> PatchState {
        self.state
    }

    pub fn turns_since_growth(&self) -> u32 {
        self.turns_since_growth
    }

    pub fn turns_until_growth(&self) -> u32 {
        self.turns_until_growth
    }

    pub fn turns_until_spread(&self) -> u32 {
        self.turns_until_spread
    }

    pub(crate) fn reset(&mut self, season: Season) {
        self.restart_growth(season);
        self.restart_spread(season);
    }

    pub(crate) fn advance(&mut self, view: &TurnView<'_>) -> Vec<Effect> {
        match self.state {
            PatchState::Growing => {
                self.turns_since_growth += 1;
                if self.turns_since_growth >= self.turns_until_growth {
                    self.state = PatchState::Full;
                    self.restart_growth(view.season);
                    self.restart_spread(view.season);
                    trace!(x = self.position.x, y = self.position.y, turn = view.turn, "Patch matured");
                }
                Vec::new()
            }
            PatchState::Full => {
                self.turns_since_spread += 1;
                if self.turns_since_spread < self.turns_until_spread {
                    return Vec::new();
                }
                self.restart_spread(view.season);

                let mut candidates: Vec<Position> = view
                    .grid
                    .neighbors4(self.position)
                    .into_iter()
                    .filter(|pos| patch_site_is_free(view.grid, view.placements, *pos))
                    .collect();
                if candidates.is_empty() {
                    trace!(x = self.position.x, y = self.position.y, "No room to spread");
                    return Vec::new();
                }
                candidates.shuffle(&mut self.rng);
                vec![Effect::SpawnPatch { candidates }]
            }
        }
    }

    /// Remove one level of growth. Harvesting and the winter pass share this.
    pub fn harvest(&mut self, season: Season) -> HarvestOutcome {
        match self.state {
            PatchState::Full => {
                self.state = PatchState::Growing;
                self.restart_growth(season);
                HarvestOutcome::Thinned
            }
            PatchState::Growing => HarvestOutcome::Depleted,
        }
    }

    fn restart_growth(&mut self, season: Season) {
        self.turns_since_growth = 0;
        self.turns_until_growth = seasonal_threshold(
            self.config.growth_turns,
            self.config.growth_variance,
            self.config.seasons.multiplier(season),
            &mut self.rng,
        );
    }

    fn restart_spread(&mut self, season: Season) {
        self.turns_since_spread = 0;
        self.turns_until_spread = seasonal_threshold(
            self.config.spread_turns,
            self.config.spread_variance,
            self.config.seasons.multiplier(season),
            &mut self.rng,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::super::Simulator;
    use super::*;
    use eco_core::{SimulatorId, TileType};
    use rand::SeedableRng;

    fn flat_config() -> VegetationConfig {
        VegetationConfig {
            growth_turns: 4.0,
            growth_variance: 0.0,
            spread_turns: 3.0,
            spread_variance: 0.0,
            seasons: eco_core::SeasonalMultipliers::uniform(1.0),
            ..VegetationConfig::default()
        }
    }

    fn patch(pos: Position, state: PatchState) -> Simulator {
        Simulator::Vegetation(VegetationPatch::new(
            pos,
            state,
            flat_config(),
            ChaCha8Rng::seed_from_u64(3),
            Season::Spring,
        ))
    }

    fn as_patch(sim: &Simulator) -> &VegetationPatch {
        match sim {
            Simulator::Vegetation(p) => p,
            other => panic!("expected patch, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_growing_matures_after_threshold() {
        let mut fx = Fixture::new(6, 6);
        fx.reveal_all();
        let mut sim = patch(Position::new(2, 2), PatchState::Growing);

        for turn in 1..4 {
            assert!(sim.on_turn_advanced(&fx.view(turn, Season::Spring)).is_empty());
            assert_eq!(as_patch(&sim).state(), PatchState::Growing);
        }
        sim.on_turn_advanced(&fx.view(4, Season::Spring));
        assert_eq!(as_patch(&sim).state(), PatchState::Full);
    }

    #[test]
    fn test_full_spreads_to_free_neighbor_only() {
        let mut fx = Fixture::new(3, 3);
        fx.reveal_all();
        let center = Position::new(1, 1);
        fx.grid.set_tile(Position::new(1, 0), TileType::Water);
        fx.grid.set_tile(Position::new(0, 1), TileType::Obstacle);
        fx.placements.insert(Position::new(2, 1), SimulatorId(9));

        let mut sim = patch(center, PatchState::Full);
        let mut effects = Vec::new();
        for turn in 1..=3 {
            effects = sim.on_turn_advanced(&fx.view(turn, Season::Spring));
        }
        assert_eq!(
            effects,
            vec![Effect::SpawnPatch {
                candidates: vec![Position::new(1, 2)]
            }]
        );
    }

    #[test]
    fn test_spread_skipped_when_boxed_in() {
        let mut fx = Fixture::new(1, 1);
        fx.reveal_all();
        let mut sim = patch(Position::new(0, 0), PatchState::Full);
        for turn in 1..=10 {
            assert!(sim.on_turn_advanced(&fx.view(turn, Season::Spring)).is_empty());
        }
        assert_eq!(as_patch(&sim).state(), PatchState::Full);
    }

    #[test]
    fn test_harvest_steps_down() {
        let mut p = VegetationPatch::new(
            Position::new(0, 0),
            PatchState::Full,
            flat_config(),
            ChaCha8Rng::seed_from_u64(1),
            Season::Summer,
        );
        assert_eq!(p.harvest(Season::Summer), HarvestOutcome::Thinned);
        assert_eq!(p.state(), PatchState::Growing);
        assert_eq!(p.turns_since_growth(), 0);
        assert_eq!(p.harvest(Season::Summer), HarvestOutcome::Depleted);
    }

    #[test]
    fn test_hidden_patch_is_frozen() {
        let fx = Fixture::new(4, 4);
        let mut sim = patch(Position::new(1, 1), PatchState::Growing);
        let before = sim.clone();
        for turn in 1..=1000 {
            assert!(sim.on_turn_advanced(&fx.view(turn, Season::Spring)).is_empty());
        }
        assert_eq!(sim, before);
    }
}
