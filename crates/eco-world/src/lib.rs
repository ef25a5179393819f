//! Turn-scheduled grid ecosystem.
//!
//! This crate owns the tile grid and the fog of war, and runs the renewable
//! resource simulators (grass patches, prey warrens, item spawners and
//! predator dens) that react to every turn advance.

pub mod clock;
pub mod ecosystem;
pub mod grid;
pub mod level;
pub mod registry;
pub mod services;
pub mod simulators;
pub mod stores;
pub mod visibility;

pub use clock::{SeasonCycle, TurnClock};
pub use ecosystem::{Census, DieOffReport, Ecosystem, Notifications, TurnReport};
pub use grid::{Grid, TileChange};
pub use level::{LevelLayout, Placement, PlacementKind};
pub use registry::{EcosystemRegistry, Placements};
pub use services::{CreatureInfo, CreatureRegistry, ItemRegistry, SeasonProvider, Services};
pub use simulators::{
    DenAppearance, HarvestOutcome, ItemSpawner, PatchState, PredatorDen, PreySpawner, Simulator,
    SimulatorKind, SimulatorVariant, VegetationPatch,
};
pub use stores::{CreatureStore, ItemRecord, ItemStore};
pub use visibility::{FogOfWar, VisibilityChange};
