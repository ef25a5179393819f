//! Prey warrens: initial population, periodic spawns, extinction recovery
//! and hiding behaviour.

use super::{Effect, TurnView};
use eco_core::{CreatureId, CreatureKind, Direction, Position, PreySpawnerConfig};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// How a den is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenAppearance {
    Occupied,
    Unoccupied,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreySpawner {
    position: Position,
    kind: Option<CreatureKind>,
    config: PreySpawnerConfig,
    attached: BTreeSet<CreatureId>,
    hiding: BTreeSet<CreatureId>,
    turns_since_periodic_spawn: u32,
    turns_since_extinction: u32,
    rng: ChaCha8Rng,
}

impl PreySpawner {
    pub fn new(
        position: Position,
        kind: Option<CreatureKind>,
        config: PreySpawnerConfig,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            position,
            kind,
            config,
            attached: BTreeSet::new(),
            hiding: BTreeSet::new(),
            turns_since_periodic_spawn: 0,
            turns_since_extinction: 0,
            rng,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn kind(&self) -> Option<CreatureKind> {
        self.kind
    }

    pub fn attached(&self) -> impl Iterator<Item = CreatureId> + '_ {
        self.attached.iter().copied()
    }

    pub fn attached_count(&self) -> usize {
        self.attached.len()
    }

    pub fn hiding_count(&self) -> usize {
        self.hiding.len()
    }

    pub fn is_hiding(&self, id: CreatureId) -> bool {
        self.hiding.contains(&id)
    }

    pub fn turns_since_extinction(&self) -> u32 {
        self.turns_since_extinction
    }

    pub fn turns_since_periodic_spawn(&self) -> u32 {
        self.turns_since_periodic_spawn
    }

    pub fn appearance(&self) -> DenAppearance {
        if self.hiding.is_empty() {
            DenAppearance::Unoccupied
        } else {
            DenAppearance::Occupied
        }
    }

    /// Attach a creature to this warren. A non-empty population ends any
    /// extinction countdown.
    pub fn attach(&mut self, id: CreatureId, hide: bool) {
        self.attached.insert(id);
        if hide {
            self.hiding.insert(id);
        }
        self.turns_since_extinction = 0;
    }

    /// The creature left the den but still belongs to it
    pub fn release(&mut self, id: CreatureId) -> bool {
        self.hiding.remove(&id)
    }

    /// Fresh level: forget everyone and seed the initial population
    pub(crate) fn reset(&mut self) -> Vec<Effect> {
        self.attached.clear();
        self.hiding.clear();
        self.turns_since_periodic_spawn = 0;
        self.turns_since_extinction = 0;

        let Some(kind) = self.kind else {
            return Vec::new();
        };
        let (min, max) = (self.config.initial_min, self.config.initial_max.max(self.config.initial_min));
        let mut remaining = self.rng.gen_range(min..=max);
        let mut effects = Vec::new();
        while remaining > 0 {
            let size = self.group_size().min(remaining);
            remaining -= size;
            effects.push(self.spawn(kind, size));
        }
        debug!(x = self.position.x, y = self.position.y, groups = effects.len(), "Warren seeded");
        effects
    }

    pub(crate) fn advance(&mut self, view: &TurnView<'_>) -> Vec<Effect> {
        self.attached.retain(|id| view.creatures.exists(*id));
        self.hiding.retain(|id| view.creatures.exists(*id));

        let Some(kind) = self.kind else {
            return Vec::new();
        };
        let mut effects = Vec::new();

        if self.attached.is_empty() {
            self.turns_since_extinction += 1;
            if self.turns_since_extinction >= self.config.extinction_delay
                && view.season.is_breeding_season()
            {
                debug!(
                    x = self.position.x,
                    y = self.position.y,
                    turn = view.turn,
                    event = "extinction_recovery",
                    "Replacing extinct population"
                );
                effects.push(self.spawn(kind, 1));
                self.turns_since_extinction = 0;
            }
        } else {
            self.turns_since_extinction = 0;
        }

        if !self.hiding.is_empty() {
            self.turns_since_periodic_spawn += 1;
            if self.turns_since_periodic_spawn >= self.config.periodic_spawn_interval {
                self.turns_since_periodic_spawn = 0;
                let size = self.group_size();
                effects.push(self.spawn(kind, size));
            }
            effects.extend(self.plan_emergence(view));
        }

        effects
    }

    fn plan_emergence(&mut self, view: &TurnView<'_>) -> Vec<Effect> {
        let threatened = view
            .predators
            .iter()
            .any(|p| p.manhattan_distance(&self.position) <= self.config.detection_radius);
        if threatened {
            trace!(x = self.position.x, y = self.position.y, "Predator nearby, prey stay hidden");
            return Vec::new();
        }

        let hiding: Vec<CreatureId> = self.hiding.iter().copied().collect();
        let mut effects = Vec::new();
        for id in hiding {
            let Some(info) = view.creatures.creature(id) else {
                continue;
            };
            if !info.hungry {
                continue;
            }
            let target = info.destination.unwrap_or(self.position);
            let steps = self.greedy_steps(target, id, view);
            if steps.is_empty() {
                trace!(creature = %id, "No open step out of the den");
                continue;
            }
            effects.push(Effect::LeaveDen { creature: id, steps });
        }
        effects
    }

    /// Candidate first steps toward `target`: the longer axis, then the
    /// perpendicular one, then any other open cardinal neighbor.
    fn greedy_steps(&mut self, target: Position, id: CreatureId, view: &TurnView<'_>) -> Vec<Position> {
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let horizontal = match dx.signum() {
            1 => Some(Direction::East),
            -1 => Some(Direction::West),
            _ => None,
        };
        let vertical = match dy.signum() {
            1 => Some(Direction::South),
            -1 => Some(Direction::North),
            _ => None,
        };
        let preferred = if dx.abs() >= dy.abs() {
            [horizontal, vertical]
        } else {
            [vertical, horizontal]
        };

        let mut order: Vec<Direction> = preferred.into_iter().flatten().collect();
        let mut rest: Vec<Direction> = Direction::cardinal()
            .into_iter()
            .filter(|d| !order.contains(d))
            .collect();
        rest.shuffle(&mut self.rng);
        order.extend(rest);

        order
            .into_iter()
            .map(|d| self.position.step(d))
            .filter(|pos| view.grid.is_passable(*pos) && !view.creatures.has_other_creature_at(id, *pos))
            .collect()
    }

    fn group_size(&mut self) -> u32 {
        let min = self.config.group_min.max(1);
        let max = self.config.group_max.max(min);
        self.rng.gen_range(min..=max)
    }

    fn spawn(&self, kind: CreatureKind, count: u32) -> Effect {
        Effect::SpawnCreatures {
            kind,
            position: self.position,
            count,
            hide: true,
        }
    }
}
