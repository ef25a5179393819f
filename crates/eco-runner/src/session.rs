//! One headless run: a generated level, the turn clock, and simple stand-in
//! creature behaviour so the ecosystem has something to react to.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use eco_core::{Direction, Position, RunId, RunnerConfig, Season};
use eco_world::{
    Census, CreatureInfo, CreatureRegistry, CreatureStore, Ecosystem, ItemStore, LevelLayout,
    PatchState, PreySpawner, SeasonCycle, SeasonProvider, Services, SimulatorKind, TurnClock,
    TurnReport, VegetationPatch,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

/// Creature kind used for the generated observers
const OBSERVER_KIND: &str = "player";

/// Per-turn chance that a fed creature gets hungry again
const HUNGER_CHANCE: f64 = 0.15;

/// Written to disk when the run ends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub turns_completed: u64,
    pub season: Season,
    pub creatures: usize,
    pub individuals: u32,
    pub items_on_map: usize,
    pub harvests: u64,
    pub predations: u64,
    pub pickups: u64,
    pub census: Census,
}

#[derive(Debug, Clone, Copy, Default)]
struct Activity {
    harvests: u64,
    predations: u64,
    pickups: u64,
}

pub struct Session {
    run_id: RunId,
    config: RunnerConfig,
    started_at: DateTime<Utc>,
    ecosystem: Ecosystem,
    creatures: CreatureStore,
    items: ItemStore,
    clock: TurnClock,
    rng: ChaCha8Rng,
    activity: Activity,
    turns_completed: u64,
}

impl Session {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        let eco_config = config.ecosystem.clone();
        let mut ecosystem =
            Ecosystem::new(eco_config.clone()).context("invalid ecosystem configuration")?;

        let mut rng = ChaCha8Rng::seed_from_u64(eco_config.world.seed);
        let layout = LevelLayout::generate(&eco_config, &mut rng);
        ecosystem.load_level(&layout).context("generated level rejected")?;

        let mut creatures = CreatureStore::new(ecosystem.kinds());
        match ecosystem.kinds().creature(OBSERVER_KIND) {
            Ok(kind) => {
                for pos in &layout.observers {
                    creatures.add_observer(kind, *pos);
                }
            }
            Err(e) => warn!(error = %e, "No observer kind configured, the map stays hidden"),
        }

        Ok(Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            clock: TurnClock::new(SeasonCycle::from_config(&eco_config.world)),
            items: ItemStore::new(),
            activity: Activity::default(),
            turns_completed: 0,
            config,
            ecosystem,
            creatures,
            rng,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn ecosystem(&self) -> &Ecosystem {
        &self.ecosystem
    }

    pub fn turns_completed(&self) -> u64 {
        self.turns_completed
    }

    /// Advance the configured number of turns, pacing them if asked to
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub async fn run(&mut self) -> Result<()> {
        let pace = self.config.turn_interval_ms;
        let mut ticker = interval(Duration::from_millis(pace.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let gauge_every = self.config.gauge_interval_turns.max(1);

        info!(turns = self.config.turns, pace_ms = pace, "Run started");

        for _ in 0..self.config.turns {
            if pace > 0 {
                ticker.tick().await;
            } else {
                tokio::task::yield_now().await;
            }

            let report = self.step();
            if let Some(die_off) = report.die_off {
                record_counter!(
                    "vegetation_die_off",
                    die_off.thinned + die_off.destroyed,
                    turn = report.turn
                );
            }
            if report.turn % gauge_every == 0 {
                self.emit_gauges();
            }
        }

        info!(turns = self.turns_completed, "Run finished");
        Ok(())
    }

    /// One turn: the ecosystem reacts, then creatures act
    pub fn step(&mut self) -> TurnReport {
        let turn = self.clock.turn();
        let report = {
            let mut services = Services::new(&mut self.creatures, &mut self.items, &self.clock);
            self.ecosystem.on_turn_advanced(turn, &mut services)
        };
        self.simulate_creatures();
        self.clock.advance();
        self.turns_completed += 1;
        report
    }

    fn emit_gauges(&self) {
        let census = self.ecosystem.census();
        let turn = census.turn;
        record_gauge!("patches_full", census.patches_full, turn = turn);
        record_gauge!("patches_growing", census.patches_growing, turn = turn);
        record_gauge!("prey_attached", census.prey_attached, turn = turn);
        record_gauge!("prey_hiding", census.prey_hiding, turn = turn);
        record_gauge!("predators_attached", census.predators_attached, turn = turn);
        record_gauge!("items_tracked", census.items_tracked, turn = turn);
        record_gauge!("revealed_tiles", census.revealed_tiles, turn = turn);
        record_gauge!("individuals", self.creatures.individuals(), turn = turn);
    }

    fn simulate_creatures(&mut self) {
        for snapshot in self.creatures.all_creatures() {
            // Earlier creatures may have eaten this one
            let Some(info) = self.creatures.creature(snapshot.id) else {
                continue;
            };
            if info.controllable {
                self.move_observer(&info);
            } else if info.predator {
                self.move_predator(&info);
            } else {
                self.move_prey(&info);
            }
        }
    }

    fn move_observer(&mut self, info: &CreatureInfo) {
        let Some(next) = self.random_step(info.position) else {
            return;
        };
        self.creatures.move_creature(info.id, next);
        if self.items.pick_up(next).is_some() {
            self.activity.pickups += 1;
        }
        self.forage(next);
    }

    fn move_predator(&mut self, info: &CreatureInfo) {
        let destination = match info.destination {
            Some(dest) if dest != info.position => Some(dest),
            _ => {
                let dest = self
                    .nearest_den(info.position)
                    .and_then(|den| self.ecosystem.territory_destination(den));
                self.creatures.set_destination(info.id, dest);
                dest
            }
        };
        let Some(next) = destination.and_then(|dest| self.step_toward(info.position, dest)) else {
            return;
        };
        self.creatures.move_creature(info.id, next);

        // Prey inside a warren are safe
        if self.ecosystem.registry().of_kind::<PreySpawner>(next).is_some() {
            return;
        }
        let victims: Vec<_> = self
            .creatures
            .iter()
            .filter(|c| c.position == next && !c.predator && !c.controllable)
            .map(|c| c.id)
            .collect();
        for victim in victims {
            self.creatures.kill(victim);
            self.activity.predations += 1;
            debug!(predator = %info.id, victim = %victim, x = next.x, y = next.y, "Prey caught");
        }
    }

    fn move_prey(&mut self, info: &CreatureInfo) {
        // The warren decides when hiding prey come out
        if self
            .ecosystem
            .registry()
            .of_kind::<PreySpawner>(info.position)
            .is_some()
        {
            return;
        }

        if info.hungry {
            if self.forage(info.position) {
                self.creatures.set_hungry(info.id, false);
                return;
            }
        } else if self.rng.gen_bool(HUNGER_CHANCE) {
            self.creatures.set_hungry(info.id, true);
        }

        if let Some(next) = self.random_step(info.position) {
            self.creatures.move_creature(info.id, next);
        }
    }

    /// Eat the full patch at `pos`, if any
    fn forage(&mut self, pos: Position) -> bool {
        let full = self
            .ecosystem
            .registry()
            .of_kind::<VegetationPatch>(pos)
            .map(|patch| patch.state() == PatchState::Full)
            .unwrap_or(false);
        if !full {
            return false;
        }
        if self.ecosystem.harvest(pos).is_none() {
            return false;
        }
        self.activity.harvests += 1;
        true
    }

    fn nearest_den(&self, from: Position) -> Option<Position> {
        self.ecosystem
            .registry()
            .iter()
            .filter(|(_, sim)| sim.kind() == SimulatorKind::PredatorDen)
            .map(|(_, sim)| sim.position())
            .min_by_key(|den| den.manhattan_distance(&from))
    }

    fn random_step(&mut self, from: Position) -> Option<Position> {
        let mut directions = Direction::cardinal();
        directions.shuffle(&mut self.rng);
        let grid = self.ecosystem.grid();
        directions
            .into_iter()
            .map(|d| from.step(d))
            .find(|pos| grid.is_passable(*pos))
    }

    fn step_toward(&self, from: Position, to: Position) -> Option<Position> {
        let dx = (to.x - from.x).signum();
        let dy = (to.y - from.y).signum();
        let candidates = if (to.x - from.x).abs() >= (to.y - from.y).abs() {
            [from.add(dx, 0), from.add(0, dy)]
        } else {
            [from.add(0, dy), from.add(dx, 0)]
        };
        let grid = self.ecosystem.grid();
        candidates
            .into_iter()
            .find(|pos| *pos != from && grid.is_passable(*pos))
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            turns_completed: self.turns_completed,
            season: self.clock.current_season(),
            creatures: self.creatures.len(),
            individuals: self.creatures.individuals(),
            items_on_map: self.items.len(),
            harvests: self.activity.harvests,
            predations: self.activity.predations,
            pickups: self.activity.pickups,
            census: self.ecosystem.census(),
        }
    }

    pub async fn write_report(&self, path: &Path) -> Result<RunReport> {
        let report = self.report();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing report to {}", path.display()))?;

        info!(path = %path.display(), "Report written");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::{CreatureKindConfig, EcosystemConfig};

    fn small_config(turns: u64) -> RunnerConfig {
        let mut ecosystem = EcosystemConfig::default();
        ecosystem.world.width = 20;
        ecosystem.world.height = 16;
        ecosystem.world.seed = 5;
        ecosystem.world.turns_per_season = 10;
        ecosystem.generation.vegetation_patches = 8;
        RunnerConfig {
            turns,
            turn_interval_ms: 0,
            report_path: None,
            ecosystem,
            ..RunnerConfig::default()
        }
    }

    #[test]
    fn test_step_advances_clock() {
        let mut session = Session::new(small_config(10)).unwrap();
        let first = session.step();
        let second = session.step();
        assert_eq!(first.turn, 0);
        assert_eq!(second.turn, 1);
        assert_eq!(session.turns_completed(), 2);
        assert!(session.ecosystem().fog().revealed_count() > 0);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let mut a = Session::new(small_config(40)).unwrap();
        let mut b = Session::new(small_config(40)).unwrap();
        for _ in 0..40 {
            assert_eq!(a.step(), b.step());
        }
        assert_eq!(a.ecosystem().census(), b.ecosystem().census());
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn test_without_observers_map_stays_hidden() {
        let mut config = small_config(20);
        config.ecosystem.kinds.creatures = vec![
            CreatureKindConfig::prey("rabbit"),
            CreatureKindConfig::predator("fox"),
        ];
        let mut session = Session::new(config).unwrap();
        for _ in 0..20 {
            session.step();
        }
        let census = session.ecosystem().census();
        assert_eq!(census.revealed_tiles, 0);
        assert_eq!(census.predators_attached, 0);
    }

    #[tokio::test]
    async fn test_run_writes_report() {
        let mut session = Session::new(small_config(60)).unwrap();
        session.run().await.unwrap();
        assert_eq!(session.turns_completed(), 60);

        let path = std::env::temp_dir()
            .join(format!("eco-runner-{}", session.run_id()))
            .join("report.json");
        let written = session.write_report(&path).await.unwrap();
        assert_eq!(written.census.turn, 59);

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: RunReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.run_id, session.run_id());
        assert_eq!(parsed.turns_completed, 60);

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }
}
