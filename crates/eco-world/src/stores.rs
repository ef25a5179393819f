//! In-memory creature and item registries.
//!
//! Used by the headless runner and by tests; a game embeds its own.

use crate::services::{CreatureInfo, CreatureRegistry, ItemRegistry};
use eco_core::{CreatureId, CreatureKind, ItemId, ItemKind, KindTable, Position};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreatureStore {
    creatures: BTreeMap<CreatureId, CreatureInfo>,
    predator_kinds: Vec<CreatureKind>,
    next_id: u64,
}

impl CreatureStore {
    pub fn new(kinds: &KindTable) -> Self {
        Self {
            creatures: BTreeMap::new(),
            predator_kinds: kinds.predators(),
            next_id: 1,
        }
    }

    /// Add a controllable creature whose surroundings are revealed each turn
    pub fn add_observer(&mut self, kind: CreatureKind, position: Position) -> CreatureId {
        let id = self.insert(kind, position, 1);
        if let Some(info) = self.creatures.get_mut(&id) {
            info.controllable = true;
            info.hungry = false;
        }
        id
    }

    pub fn kill(&mut self, id: CreatureId) -> bool {
        self.creatures.remove(&id).is_some()
    }

    pub fn set_hungry(&mut self, id: CreatureId, hungry: bool) {
        if let Some(info) = self.creatures.get_mut(&id) {
            info.hungry = hungry;
        }
    }

    pub fn set_destination(&mut self, id: CreatureId, destination: Option<Position>) {
        if let Some(info) = self.creatures.get_mut(&id) {
            info.destination = destination;
        }
    }

    pub fn get(&self, id: CreatureId) -> Option<&CreatureInfo> {
        self.creatures.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CreatureInfo> + '_ {
        self.creatures.values()
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }

    /// Total individuals across all groups
    pub fn individuals(&self) -> u32 {
        self.creatures.values().map(|c| c.count).sum()
    }

    fn insert(&mut self, kind: CreatureKind, position: Position, count: u32) -> CreatureId {
        let id = CreatureId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        self.creatures.insert(
            id,
            CreatureInfo {
                id,
                kind,
                position,
                count,
                hungry: true,
                controllable: false,
                predator: self.predator_kinds.contains(&kind),
                destination: None,
            },
        );
        id
    }
}

impl CreatureRegistry for CreatureStore {
    fn all_creatures(&self) -> Vec<CreatureInfo> {
        self.creatures.values().cloned().collect()
    }

    fn creature(&self, id: CreatureId) -> Option<CreatureInfo> {
        self.creatures.get(&id).cloned()
    }

    fn exists(&self, id: CreatureId) -> bool {
        self.creatures.contains_key(&id)
    }

    fn spawn(&mut self, kind: CreatureKind, position: Position, count: u32) -> Option<CreatureId> {
        if count == 0 {
            return None;
        }
        let id = self.insert(kind, position, count);
        trace!(creature = %id, x = position.x, y = position.y, count, "Creature spawned");
        Some(id)
    }

    fn has_other_creature_at(&self, excluding: CreatureId, position: Position) -> bool {
        self.creatures
            .values()
            .any(|c| c.id != excluding && c.position == position)
    }

    fn move_creature(&mut self, id: CreatureId, position: Position) -> bool {
        match self.creatures.get_mut(&id) {
            Some(info) => {
                info.position = position;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: ItemId,
    pub kind: ItemKind,
}

/// At most one item per tile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemStore {
    items: BTreeMap<Position, ItemRecord>,
    next_id: u64,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove whatever item lies at `position`
    pub fn pick_up(&mut self, position: Position) -> Option<ItemRecord> {
        self.items.remove(&position)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, ItemRecord)> + '_ {
        self.items.iter().map(|(pos, record)| (*pos, *record))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ItemRegistry for ItemStore {
    fn spawn_item(&mut self, kind: ItemKind, position: Position) -> Option<ItemId> {
        if self.items.contains_key(&position) {
            return None;
        }
        self.next_id += 1;
        let id = ItemId(self.next_id);
        self.items.insert(position, ItemRecord { id, kind });
        trace!(item = %id, x = position.x, y = position.y, "Item spawned");
        Some(id)
    }

    fn item_at(&self, position: Position) -> Option<ItemId> {
        self.items.get(&position).map(|record| record.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eco_core::KindsConfig;

    fn kinds() -> KindTable {
        KindTable::from_config(&KindsConfig::default()).unwrap()
    }

    #[test]
    fn test_spawn_marks_predators() {
        let table = kinds();
        let mut store = CreatureStore::new(&table);

        let rabbit = store
            .spawn(table.creature("rabbit").unwrap(), Position::new(1, 1), 3)
            .unwrap();
        let fox = store
            .spawn(table.creature("fox").unwrap(), Position::new(2, 2), 1)
            .unwrap();

        assert!(!store.get(rabbit).unwrap().predator);
        assert!(store.get(fox).unwrap().predator);
        assert_eq!(store.individuals(), 4);
        assert_eq!(store.spawn(table.creature("fox").unwrap(), Position::new(0, 0), 0), None);
    }

    #[test]
    fn test_other_creature_check_excludes_self() {
        let table = kinds();
        let mut store = CreatureStore::new(&table);
        let kind = table.creature("rabbit").unwrap();
        let a = store.spawn(kind, Position::new(1, 1), 1).unwrap();

        assert!(!store.has_other_creature_at(a, Position::new(1, 1)));
        let b = store.spawn(kind, Position::new(1, 1), 1).unwrap();
        assert!(store.has_other_creature_at(a, Position::new(1, 1)));

        assert!(store.kill(b));
        assert!(!store.exists(b));
        assert!(!store.kill(b));
    }

    #[test]
    fn test_observer_is_controllable() {
        let table = kinds();
        let mut store = CreatureStore::new(&table);
        let id = store.add_observer(table.creature("player").unwrap(), Position::new(4, 4));
        let info = store.get(id).unwrap();
        assert!(info.controllable);
        assert!(!info.hungry);
    }

    #[test]
    fn test_item_store_one_per_tile() {
        let table = kinds();
        let worm = table.item("worm").unwrap();
        let mut store = ItemStore::new();

        let id = store.spawn_item(worm, Position::new(3, 3)).unwrap();
        assert_eq!(store.spawn_item(worm, Position::new(3, 3)), None);
        assert_eq!(store.item_at(Position::new(3, 3)), Some(id));

        let record = store.pick_up(Position::new(3, 3)).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(store.item_at(Position::new(3, 3)), None);
        assert!(store.is_empty());
    }
}
