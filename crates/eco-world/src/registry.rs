//! Position index over every live simulator.

use crate::simulators::{Simulator, SimulatorKind, SimulatorVariant};
use eco_core::{Position, SimulatorId};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Which simulator stands on which tile. At most one per tile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placements {
    by_position: HashMap<Position, SimulatorId>,
}

impl Placements {
    pub fn contains(&self, pos: Position) -> bool {
        self.by_position.contains_key(&pos)
    }

    pub fn get(&self, pos: Position) -> Option<SimulatorId> {
        self.by_position.get(&pos).copied()
    }

    pub fn len(&self) -> usize {
        self.by_position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_position.is_empty()
    }

    pub(crate) fn insert(&mut self, pos: Position, id: SimulatorId) {
        self.by_position.insert(pos, id);
    }

    fn remove_if(&mut self, pos: Position, id: SimulatorId) {
        if self.by_position.get(&pos) == Some(&id) {
            self.by_position.remove(&pos);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EcosystemRegistry {
    instances: BTreeMap<SimulatorId, Simulator>,
    placements: Placements,
    next_id: u64,
}

impl EcosystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a simulator. Refused when its tile already hosts one.
    pub fn register(&mut self, simulator: Simulator) -> Option<SimulatorId> {
        let pos = simulator.position();
        if let Some(existing) = self.placements.get(pos) {
            debug!(x = pos.x, y = pos.y, existing = %existing, "Tile already hosts a simulator");
            return None;
        }
        self.next_id += 1;
        let id = SimulatorId(self.next_id);
        trace!(simulator = %id, kind = ?simulator.kind(), x = pos.x, y = pos.y, "Simulator registered");
        self.placements.insert(pos, id);
        self.instances.insert(id, simulator);
        Some(id)
    }

    /// Stop tracking a simulator. Unknown ids are ignored.
    pub fn unregister(&mut self, id: SimulatorId) -> Option<Simulator> {
        let simulator = self.instances.remove(&id)?;
        self.placements.remove_if(simulator.position(), id);
        trace!(simulator = %id, "Simulator unregistered");
        Some(simulator)
    }

    pub fn unregister_at(&mut self, pos: Position) -> Option<Simulator> {
        let id = self.placements.get(pos)?;
        self.unregister(id)
    }

    pub fn at(&self, pos: Position) -> Option<&Simulator> {
        self.placements.get(pos).and_then(|id| self.instances.get(&id))
    }

    pub fn at_mut(&mut self, pos: Position) -> Option<&mut Simulator> {
        let id = self.placements.get(pos)?;
        self.instances.get_mut(&id)
    }

    pub fn id_at(&self, pos: Position) -> Option<SimulatorId> {
        self.placements.get(pos)
    }

    /// The simulator at `pos`, if it is a `T`
    pub fn of_kind<T: SimulatorVariant>(&self, pos: Position) -> Option<&T> {
        self.at(pos).and_then(T::from_simulator)
    }

    pub fn of_kind_mut<T: SimulatorVariant>(&mut self, pos: Position) -> Option<&mut T> {
        self.at_mut(pos).and_then(T::from_simulator_mut)
    }

    pub fn get(&self, id: SimulatorId) -> Option<&Simulator> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: SimulatorId) -> Option<&mut Simulator> {
        self.instances.get_mut(&id)
    }

    pub fn get_as_mut<T: SimulatorVariant>(&mut self, id: SimulatorId) -> Option<&mut T> {
        self.instances.get_mut(&id).and_then(T::from_simulator_mut)
    }

    pub fn contains(&self, id: SimulatorId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Snapshot of live ids, safe to iterate while simulators come and go
    pub fn ids(&self) -> Vec<SimulatorId> {
        self.instances.keys().copied().collect()
    }

    pub fn ids_of(&self, kind: SimulatorKind) -> Vec<SimulatorId> {
        self.instances
            .iter()
            .filter(|(_, sim)| sim.kind() == kind)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SimulatorId, &Simulator)> + '_ {
        self.instances.iter().map(|(id, sim)| (*id, sim))
    }

    pub fn placements(&self) -> &Placements {
        &self.placements
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Destroy every tracked simulator, as on level reload
    pub fn clear_all(&mut self) -> usize {
        let removed = self.instances.len();
        self.instances.clear();
        self.placements = Placements::default();
        self.next_id = 0;
        removed
    }

    /// Read-only placements alongside mutable instances, for turn planning
    pub(crate) fn split_mut(&mut self) -> (&Placements, &mut BTreeMap<SimulatorId, Simulator>) {
        (&self.placements, &mut self.instances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulators::{PatchState, PredatorDen, VegetationPatch};
    use eco_core::{PredatorDenConfig, Season, VegetationConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn patch(x: i32, y: i32) -> Simulator {
        Simulator::Vegetation(VegetationPatch::new(
            Position::new(x, y),
            PatchState::Full,
            VegetationConfig::default(),
            ChaCha8Rng::seed_from_u64(0),
            Season::Spring,
        ))
    }

    fn den(x: i32, y: i32) -> Simulator {
        Simulator::Den(PredatorDen::new(
            Position::new(x, y),
            None,
            PredatorDenConfig::default(),
            ChaCha8Rng::seed_from_u64(0),
        ))
    }

    #[test]
    fn test_register_refuses_double_placement() {
        let mut registry = EcosystemRegistry::new();
        let id = registry.register(patch(1, 1)).unwrap();
        assert_eq!(registry.register(den(1, 1)), None);
        assert_eq!(registry.id_at(Position::new(1, 1)), Some(id));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = EcosystemRegistry::new();
        let id = registry.register(patch(1, 1)).unwrap();

        assert!(registry.unregister(id).is_some());
        assert!(registry.unregister(id).is_none());
        assert!(registry.at(Position::new(1, 1)).is_none());
        assert!(registry.placements().is_empty());

        // Tile is free again
        assert!(registry.register(den(1, 1)).is_some());
    }

    #[test]
    fn test_of_kind_filters_variant() {
        let mut registry = EcosystemRegistry::new();
        registry.register(patch(0, 0));
        registry.register(den(3, 3));

        assert!(registry.of_kind::<VegetationPatch>(Position::new(0, 0)).is_some());
        assert!(registry.of_kind::<PredatorDen>(Position::new(0, 0)).is_none());
        assert!(registry.of_kind::<PredatorDen>(Position::new(3, 3)).is_some());
        assert!(registry.of_kind_mut::<VegetationPatch>(Position::new(9, 9)).is_none());
        assert_eq!(registry.ids_of(SimulatorKind::PredatorDen).len(), 1);
    }

    #[test]
    fn test_clear_all() {
        let mut registry = EcosystemRegistry::new();
        registry.register(patch(0, 0));
        registry.register(patch(0, 1));
        registry.register(den(5, 5));

        assert_eq!(registry.clear_all(), 3);
        assert!(registry.is_empty());
        assert!(registry.at(Position::new(5, 5)).is_none());
        assert_eq!(registry.clear_all(), 0);
    }
}
