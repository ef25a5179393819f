//! Turn counter and season cycle.

use crate::services::SeasonProvider;
use eco_core::{Season, WorldConfig};

/// Maps turn numbers to seasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonCycle {
    turns_per_season: u64,
    starting: Season,
}

impl SeasonCycle {
    pub fn new(turns_per_season: u64, starting: Season) -> Self {
        Self {
            turns_per_season: turns_per_season.max(1),
            starting,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.turns_per_season, config.starting_season)
    }

    pub fn season_at(&self, turn: u64) -> Season {
        let steps = (turn / self.turns_per_season) % 4;
        (0..steps).fold(self.starting, |season, _| season.next())
    }
}

/// Monotonic turn counter. Turn 0 is the freshly loaded level.
#[derive(Debug, Clone)]
pub struct TurnClock {
    turn: u64,
    seasons: SeasonCycle,
}

impl TurnClock {
    pub fn new(seasons: SeasonCycle) -> Self {
        Self { turn: 0, seasons }
    }

    /// Advance the clock by one turn. Returns the new turn number.
    pub fn advance(&mut self) -> u64 {
        self.turn += 1;
        self.turn
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Back to turn 0, as on level reload
    pub fn reset(&mut self) {
        self.turn = 0;
    }
}

impl SeasonProvider for TurnClock {
    fn current_season(&self) -> Season {
        self.seasons.season_at(self.turn)
    }
}
