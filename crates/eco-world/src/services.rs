//! Interfaces to the collaborators the ecosystem calls into.
//!
//! Creatures and items live outside the ecosystem. Simulators only hold
//! their ids and look them up again whenever they need an accurate count.

use eco_core::{CreatureId, CreatureKind, ItemId, ItemKind, Position, Season};
use serde::{Deserialize, Serialize};

/// What the ecosystem needs to know about one creature (or creature group)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureInfo {
    pub id: CreatureId,
    pub kind: CreatureKind,
    pub position: Position,
    /// Individuals represented by this entry
    pub count: u32,
    pub hungry: bool,
    pub controllable: bool,
    pub predator: bool,
    /// Where the creature's own AI wants to go next
    pub destination: Option<Position>,
}

pub trait CreatureRegistry {
    fn all_creatures(&self) -> Vec<CreatureInfo>;

    fn creature(&self, id: CreatureId) -> Option<CreatureInfo>;

    fn exists(&self, id: CreatureId) -> bool {
        self.creature(id).is_some()
    }

    /// Spawn `count` individuals of `kind` as one unit at `position`
    fn spawn(&mut self, kind: CreatureKind, position: Position, count: u32) -> Option<CreatureId>;

    fn has_other_creature_at(&self, excluding: CreatureId, position: Position) -> bool;

    fn move_creature(&mut self, id: CreatureId, position: Position) -> bool;
}

pub trait ItemRegistry {
    fn spawn_item(&mut self, kind: ItemKind, position: Position) -> Option<ItemId>;

    fn item_at(&self, position: Position) -> Option<ItemId>;
}

pub trait SeasonProvider {
    fn current_season(&self) -> Season;
}

impl SeasonProvider for Season {
    fn current_season(&self) -> Season {
        *self
    }
}

/// Collaborators handed to the ecosystem for one turn
pub struct Services<'a> {
    pub creatures: &'a mut dyn CreatureRegistry,
    pub items: &'a mut dyn ItemRegistry,
    pub seasons: &'a dyn SeasonProvider,
}

impl<'a> Services<'a> {
    pub fn new(
        creatures: &'a mut dyn CreatureRegistry,
        items: &'a mut dyn ItemRegistry,
        seasons: &'a dyn SeasonProvider,
    ) -> Self {
        Self {
            creatures,
            items,
            seasons,
        }
    }
}
