//! Ecosystem engine: grid, fog of war and every resource simulator,
//! advanced together one turn at a time.

use crate::grid::{Grid, TileChange};
use crate::level::{LevelLayout, PlacementKind};
use crate::registry::EcosystemRegistry;
use crate::services::{CreatureInfo, Services};
use crate::simulators::{
    item_site_is_free, patch_site_is_free, simulator_rng, Effect, HarvestOutcome, ItemSpawner,
    PatchState, PredatorDen, PreySpawner, Simulator, SimulatorKind, TurnView, VegetationPatch,
};
use crate::visibility::{FogOfWar, VisibilityChange};
use eco_core::{
    CreatureId, CreatureKind, EcosystemConfig, Error, ItemKind, KindTable, Position, Result,
    Season, SimulatorId, TileType,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument, trace, warn};

/// Outcome of one winter thinning pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieOffReport {
    pub thinned: usize,
    pub destroyed: usize,
}

/// What happened during one turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    pub turn: u64,
    pub season: Season,
    pub simulators: usize,
    pub newly_revealed: usize,
    pub patches_spawned: usize,
    /// Individuals, not groups
    pub creatures_spawned: u32,
    pub items_spawned: usize,
    pub prey_emerged: usize,
    pub die_off: Option<DieOffReport>,
}

/// Population summary across every simulator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub turn: u64,
    pub season: Season,
    pub patches_growing: usize,
    pub patches_full: usize,
    pub prey_spawners: usize,
    pub prey_attached: usize,
    pub prey_hiding: usize,
    pub item_spawners: usize,
    pub items_tracked: usize,
    pub predator_dens: usize,
    pub predators_attached: usize,
    pub revealed_tiles: usize,
}

/// Pending change notifications for renderers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notifications {
    pub tiles: Vec<TileChange>,
    pub visibility: Vec<VisibilityChange>,
}

impl Notifications {
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.visibility.is_empty()
    }
}

/// Configured kind names resolved against the kind table
#[derive(Debug, Clone, Copy, Default)]
struct ResolvedKinds {
    prey: Option<CreatureKind>,
    predator: Option<CreatureKind>,
    worm: Option<ItemKind>,
    stick: Option<ItemKind>,
}

impl ResolvedKinds {
    fn resolve(kinds: &KindTable, config: &EcosystemConfig) -> Self {
        let creature = |role: &str, name: &str| match kinds.creature(name) {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!(role, name, error = %e, "Creature kind not configured, spawner disabled");
                None
            }
        };
        let item = |role: &str, name: &str| match kinds.item(name) {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!(role, name, error = %e, "Item kind not configured, spawner disabled");
                None
            }
        };
        Self {
            prey: creature("prey", &config.prey.creature),
            predator: creature("den", &config.den.creature),
            worm: item("worm", &config.worm.item),
            stick: item("stick", &config.stick.item),
        }
    }
}

struct PlannedEffect {
    owner: SimulatorId,
    origin: Position,
    effect: Effect,
}

pub struct Ecosystem {
    config: EcosystemConfig,
    kinds: KindTable,
    resolved: ResolvedKinds,
    grid: Grid,
    fog: FogOfWar,
    registry: EcosystemRegistry,
    /// Stream for bulk passes; simulators carry their own
    rng: ChaCha8Rng,
    turn: u64,
    season: Option<Season>,
}

impl Ecosystem {
    pub fn new(config: EcosystemConfig) -> Result<Self> {
        config.validate()?;
        let kinds = KindTable::from_config(&config.kinds)?;
        let resolved = ResolvedKinds::resolve(&kinds, &config);
        let (width, height) = (config.world.width, config.world.height);

        info!(width, height, seed = config.world.seed, "Ecosystem created");

        Ok(Self {
            grid: Grid::new(width, height),
            fog: FogOfWar::new(width, height),
            registry: EcosystemRegistry::new(),
            rng: ChaCha8Rng::seed_from_u64(config.world.seed),
            turn: 0,
            season: None,
            kinds,
            resolved,
            config,
        })
    }

    /// Replace the current level. Grid, fog and registry start over.
    #[instrument(skip(self, layout), fields(width = layout.width, height = layout.height))]
    pub fn load_level(&mut self, layout: &LevelLayout) -> Result<()> {
        if layout.width <= 0 || layout.height <= 0 {
            return Err(Error::InvalidState(format!(
                "level dimensions must be positive, got {}x{}",
                layout.width, layout.height
            )));
        }
        let expected = (layout.width as usize) * (layout.height as usize);
        if layout.tiles.len() != expected {
            return Err(Error::InvalidState(format!(
                "level has {} tiles, expected {}",
                layout.tiles.len(),
                expected
            )));
        }

        let cleared = self.registry.clear_all();
        self.grid.initialize(layout.width, layout.height);
        self.fog.reset(layout.width, layout.height);
        for (i, tile) in layout.tiles.iter().enumerate() {
            if *tile != TileType::Empty {
                let pos = self.grid.index_to_pos(i);
                self.grid.set_tile(pos, *tile);
            }
        }
        self.turn = 0;
        self.season = None;

        let mut placed = 0;
        for placement in &layout.placements {
            if self.place(placement.kind, placement.position).is_some() {
                placed += 1;
            } else {
                debug!(
                    x = placement.position.x,
                    y = placement.position.y,
                    kind = ?placement.kind,
                    "Placement skipped"
                );
            }
        }

        info!(
            placed,
            cleared,
            requested = layout.placements.len(),
            "Level loaded"
        );
        Ok(())
    }

    /// Create and register one simulator
    pub fn place(&mut self, kind: PlacementKind, position: Position) -> Option<SimulatorId> {
        if !self.grid.in_bounds(position) {
            return None;
        }
        let rng = simulator_rng(self.config.world.seed, position);
        let season = self.current_season();
        let simulator = match kind {
            PlacementKind::Vegetation { state } => Simulator::Vegetation(VegetationPatch::new(
                position,
                state,
                self.config.vegetation.clone(),
                rng,
                season,
            )),
            PlacementKind::PreySpawner => Simulator::Prey(PreySpawner::new(
                position,
                self.resolved.prey,
                self.config.prey.clone(),
                rng,
            )),
            PlacementKind::WormSpawner => Simulator::Items(ItemSpawner::new(
                position,
                self.resolved.worm,
                self.config.worm.clone(),
                rng,
                season,
            )),
            PlacementKind::StickSpawner => Simulator::Items(ItemSpawner::new(
                position,
                self.resolved.stick,
                self.config.stick.clone(),
                rng,
                season,
            )),
            PlacementKind::PredatorDen => Simulator::Den(PredatorDen::new(
                position,
                self.resolved.predator,
                self.config.den.clone(),
                rng,
            )),
        };
        self.registry.register(simulator)
    }

    /// Destroy one simulator. Unknown ids are ignored.
    pub fn destroy_simulator(&mut self, id: SimulatorId) -> bool {
        self.registry.unregister(id).is_some()
    }

    /// React to the turn clock, visiting simulators in registry order
    pub fn on_turn_advanced(&mut self, turn: u64, services: &mut Services<'_>) -> TurnReport {
        let order = self.registry.ids();
        self.run_turn_in_order(turn, services, &order)
    }

    /// Same as [`Ecosystem::on_turn_advanced`] with an explicit visiting
    /// order. The result does not depend on it; repeated ids are visited once.
    #[instrument(skip(self, services, order), fields(simulators = order.len()))]
    pub fn run_turn_in_order(
        &mut self,
        turn: u64,
        services: &mut Services<'_>,
        order: &[SimulatorId],
    ) -> TurnReport {
        let season = services.seasons.current_season();
        let previous = self.season.replace(season);
        self.turn = turn;

        let mut report = TurnReport {
            turn,
            season,
            ..TurnReport::default()
        };

        if turn > 0 && season == Season::Winter && matches!(previous, Some(s) if s != Season::Winter) {
            report.die_off = Some(self.winter_die_off());
        }

        let creatures = services.creatures.all_creatures();
        self.sync_occupancy(&creatures);
        let radius = self.config.world.reveal_radius;
        for observer in creatures.iter().filter(|c| c.controllable) {
            report.newly_revealed += self.fog.reveal_radius(observer.position, radius);
        }
        let predators: Vec<Position> = creatures
            .iter()
            .filter(|c| c.predator)
            .map(|c| c.position)
            .collect();

        let mut planned = Vec::new();
        {
            let (placements, instances) = self.registry.split_mut();
            let view = TurnView {
                turn,
                season,
                grid: &self.grid,
                fog: &self.fog,
                placements,
                creatures: &*services.creatures,
                items: &*services.items,
                predators: &predators,
            };
            let mut visited = HashSet::new();
            for id in order {
                if !visited.insert(*id) {
                    continue;
                }
                let Some(simulator) = instances.get_mut(id) else {
                    continue;
                };
                report.simulators += 1;
                let origin = simulator.position();
                planned.extend(simulator.on_turn_advanced(&view).into_iter().map(|effect| {
                    PlannedEffect {
                        owner: *id,
                        origin,
                        effect,
                    }
                }));
            }
        }

        // Stable, so one owner's effects keep their planned order
        planned.sort_by_key(|p| p.origin.row_major());
        for effect in planned {
            self.apply(effect, services, &mut report);
        }

        debug!(
            turn,
            season = %season,
            patches_spawned = report.patches_spawned,
            creatures_spawned = report.creatures_spawned,
            items_spawned = report.items_spawned,
            prey_emerged = report.prey_emerged,
            "Turn processed"
        );
        report
    }

    fn apply(&mut self, planned: PlannedEffect, services: &mut Services<'_>, report: &mut TurnReport) {
        let PlannedEffect {
            owner,
            origin,
            effect,
        } = planned;

        match effect {
            Effect::SpawnPatch { candidates } => {
                let site = candidates
                    .into_iter()
                    .find(|pos| patch_site_is_free(&self.grid, self.registry.placements(), *pos));
                let Some(pos) = site else {
                    trace!(simulator = %owner, "Spread target taken");
                    return;
                };
                if self.grid.get_tile(pos) == Some(TileType::Empty) {
                    self.grid.set_tile(pos, TileType::Grass);
                }
                if self
                    .place(PlacementKind::Vegetation { state: PatchState::Full }, pos)
                    .is_some()
                {
                    report.patches_spawned += 1;
                }
            }
            Effect::SpawnCreatures {
                kind,
                position,
                count,
                hide,
            } => {
                if !self.registry.contains(owner) || !self.grid.is_walkable(position) {
                    return;
                }
                let Some(id) = services.creatures.spawn(kind, position, count) else {
                    trace!(simulator = %owner, "Creature registry refused spawn");
                    return;
                };
                report.creatures_spawned += count;
                match self.registry.get_mut(owner) {
                    Some(Simulator::Prey(spawner)) => spawner.attach(id, hide),
                    Some(Simulator::Den(den)) => den.attach(id),
                    _ => {}
                }
                if !hide {
                    self.grid.set_occupant(position, id);
                }
            }
            Effect::SpawnItem {
                kind,
                candidates,
                grass_only,
            } => {
                let has_capacity = matches!(
                    self.registry.get(owner),
                    Some(Simulator::Items(spawner)) if spawner.has_capacity()
                );
                if !has_capacity {
                    return;
                }
                let site = candidates.into_iter().find(|pos| {
                    item_site_is_free(
                        &self.grid,
                        self.registry.placements(),
                        &*services.items,
                        *pos,
                        grass_only,
                    )
                });
                let Some(pos) = site else {
                    trace!(simulator = %owner, "Item site taken");
                    return;
                };
                let Some(item) = services.items.spawn_item(kind, pos) else {
                    return;
                };
                if let Some(spawner) = self.registry.get_as_mut::<ItemSpawner>(owner) {
                    spawner.track(item, pos);
                }
                report.items_spawned += 1;
            }
            Effect::LeaveDen { creature, steps } => {
                if !services.creatures.exists(creature) {
                    return;
                }
                let step = steps.into_iter().find(|pos| {
                    self.grid.is_passable(*pos)
                        && !services.creatures.has_other_creature_at(creature, *pos)
                });
                let Some(step) = step else {
                    return;
                };
                if !services.creatures.move_creature(creature, step) {
                    return;
                }
                if let Some(spawner) = self.registry.get_as_mut::<PreySpawner>(owner) {
                    spawner.release(creature);
                }
                self.grid.clear_occupant_if(origin, creature);
                self.grid.set_occupant(step, creature);
                report.prey_emerged += 1;
            }
        }
    }

    /// Drop occupancy hints for creatures that died or moved away
    fn sync_occupancy(&mut self, creatures: &[CreatureInfo]) {
        let live: HashMap<CreatureId, Position> =
            creatures.iter().map(|c| (c.id, c.position)).collect();
        let stale: Vec<Position> = self
            .grid
            .positions()
            .filter(|pos| match self.grid.occupant(*pos) {
                Some(id) => live.get(&id) != Some(pos),
                None => false,
            })
            .collect();
        for pos in stale {
            self.grid.clear_occupant(pos);
        }
    }

    /// Harvest the patch at `position`. A growing patch is destroyed.
    pub fn harvest(&mut self, position: Position) -> Option<HarvestOutcome> {
        let season = self.current_season();
        let outcome = self
            .registry
            .of_kind_mut::<VegetationPatch>(position)?
            .harvest(season);
        if outcome == HarvestOutcome::Depleted {
            self.registry.unregister_at(position);
        }
        debug!(x = position.x, y = position.y, ?outcome, "Patch harvested");
        Some(outcome)
    }

    /// Thin every patch with the configured probability
    pub fn winter_die_off(&mut self) -> DieOffReport {
        let chance = self.config.vegetation.winter_die_off_chance.clamp(0.0, 1.0);
        let season = self.current_season();
        let mut report = DieOffReport::default();

        for id in self.registry.ids_of(SimulatorKind::Vegetation) {
            if !self.rng.gen_bool(chance) {
                continue;
            }
            let Some(patch) = self.registry.get_as_mut::<VegetationPatch>(id) else {
                continue;
            };
            match patch.harvest(season) {
                HarvestOutcome::Thinned => report.thinned += 1,
                HarvestOutcome::Depleted => {
                    self.registry.unregister(id);
                    report.destroyed += 1;
                }
            }
        }

        info!(
            event = "winter_die_off",
            thinned = report.thinned,
            destroyed = report.destroyed,
            "Winter thinned vegetation"
        );
        report
    }

    /// Roaming target for a predator belonging to the den at `den`
    pub fn territory_destination(&mut self, den: Position) -> Option<Position> {
        let grid = &self.grid;
        self.registry
            .of_kind_mut::<PredatorDen>(den)?
            .random_position_in_territory(grid)
    }

    pub fn census(&self) -> Census {
        let mut census = Census {
            turn: self.turn,
            season: self.current_season(),
            revealed_tiles: self.fog.revealed_count(),
            ..Census::default()
        };
        for (_, simulator) in self.registry.iter() {
            match simulator {
                Simulator::Vegetation(patch) => match patch.state() {
                    PatchState::Growing => census.patches_growing += 1,
                    PatchState::Full => census.patches_full += 1,
                },
                Simulator::Prey(spawner) => {
                    census.prey_spawners += 1;
                    census.prey_attached += spawner.attached_count();
                    census.prey_hiding += spawner.hiding_count();
                }
                Simulator::Items(spawner) => {
                    census.item_spawners += 1;
                    census.items_tracked += spawner.tracked_items().len();
                }
                Simulator::Den(den) => {
                    census.predator_dens += 1;
                    census.predators_attached += den.count();
                }
            }
        }
        census
    }

    /// Drain tile and visibility notifications queued since the last call
    pub fn take_notifications(&mut self) -> Notifications {
        Notifications {
            tiles: self.grid.take_changes(),
            visibility: self.fog.take_changes(),
        }
    }

    /// Season seen on the last turn, or the configured starting season
    pub fn current_season(&self) -> Season {
        self.season.unwrap_or(self.config.world.starting_season)
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn config(&self) -> &EcosystemConfig {
        &self.config
    }

    pub fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Terrain edit from gameplay code; the change is queued as a notification.
    /// Out-of-bounds positions are ignored.
    pub fn set_tile(&mut self, position: Position, tile: TileType) -> bool {
        self.grid.set_tile(position, tile)
    }

    pub fn fog(&self) -> &FogOfWar {
        &self.fog
    }

    /// Scripted reveal and hide
    pub fn fog_mut(&mut self) -> &mut FogOfWar {
        &mut self.fog
    }

    pub fn registry(&self) -> &EcosystemRegistry {
        &self.registry
    }
}
