//! Capacity-limited item spawners (worms, sticks).

use super::{item_site_is_free, seasonal_threshold, Effect, TurnView};
use crate::grid::Grid;
use crate::services::ItemRegistry;
use crate::visibility::clip_offsets;
use eco_core::{ItemId, ItemKind, ItemSpawnerConfig, Position, Season, SpawnArea};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// An item this spawner placed, and where
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: ItemId,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemSpawner {
    position: Position,
    kind: Option<ItemKind>,
    config: ItemSpawnerConfig,
    tracked: Vec<TrackedItem>,
    turns_since_spawn: u32,
    turns_until_spawn: u32,
    rng: ChaCha8Rng,
}

impl ItemSpawner {
    pub fn new(
        position: Position,
        kind: Option<ItemKind>,
        config: ItemSpawnerConfig,
        rng: ChaCha8Rng,
        season: Season,
    ) -> Self {
        let mut spawner = Self {
            position,
            kind,
            config,
            tracked: Vec::new(),
            turns_since_spawn: 0,
            turns_until_spawn: 1,
            rng,
        };
        spawner.reset(season);
        spawner
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn kind(&self) -> Option<ItemKind> {
        self.kind
    }

    pub fn max_items(&self) -> usize {
        self.config.max_items
    }

    pub fn tracked_items(&self) -> &[TrackedItem] {
        &self.tracked
    }

    pub fn has_capacity(&self) -> bool {
        self.tracked.len() < self.config.max_items
    }

    /// Record a freshly spawned item. Refused when already at capacity.
    pub fn track(&mut self, id: ItemId, position: Position) -> bool {
        if !self.has_capacity() {
            return false;
        }
        self.tracked.push(TrackedItem { id, position });
        true
    }

    /// Forget items that were picked up or replaced
    pub fn prune(&mut self, items: &dyn ItemRegistry) {
        self.tracked
            .retain(|item| items.item_at(item.position) == Some(item.id));
    }

    pub(crate) fn reset(&mut self, season: Season) {
        self.tracked.clear();
        self.restart(season);
    }

    pub(crate) fn advance(&mut self, view: &TurnView<'_>) -> Vec<Effect> {
        self.turns_since_spawn += 1;
        if self.turns_since_spawn < self.turns_until_spawn {
            return Vec::new();
        }
        self.restart(view.season);

        let Some(kind) = self.kind else {
            return Vec::new();
        };
        self.prune(view.items);
        if !self.has_capacity() {
            trace!(x = self.position.x, y = self.position.y, tracked = self.tracked.len(), "Spawner at capacity");
            return Vec::new();
        }

        let grass_only = self.config.grass_only;
        let mut candidates: Vec<Position> = self
            .area(view.grid)
            .into_iter()
            .filter(|pos| item_site_is_free(view.grid, view.placements, view.items, *pos, grass_only))
            .collect();
        if candidates.is_empty() {
            trace!(x = self.position.x, y = self.position.y, "No free tile for item");
            return Vec::new();
        }
        candidates.shuffle(&mut self.rng);
        vec![Effect::SpawnItem {
            kind,
            candidates,
            grass_only,
        }]
    }

    /// Every in-bounds position in the configured area, excluding the
    /// spawner itself
    fn area(&self, grid: &Grid) -> Vec<Position> {
        let (inner, outer, square) = match self.config.area {
            SpawnArea::Radius { radius } => (0, radius.max(0), true),
            SpawnArea::Annulus { min, max } => (min.max(0), max.max(0), false),
        };
        let inner_sq = (inner as i64) * (inner as i64);
        let outer_sq = (outer as i64) * (outer as i64);

        let (dx_min, dx_max) = clip_offsets(self.position.x, outer, grid.width);
        let (dy_min, dy_max) = clip_offsets(self.position.y, outer, grid.height);
        let mut positions = Vec::new();
        for dy in dy_min..=dy_max {
            for dx in dx_min..=dx_max {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let pos = self.position.add(dx, dy);
                let d = self.position.distance_squared(&pos);
                if square || (d >= inner_sq && d <= outer_sq) {
                    positions.push(pos);
                }
            }
        }
        positions
    }

    fn restart(&mut self, season: Season) {
        self.turns_since_spawn = 0;
        self.turns_until_spawn = seasonal_threshold(
            self.config.spawn_turns,
            self.config.spawn_variance,
            self.config.seasons.multiplier(season),
            &mut self.rng,
        );
    }
}
