//! Configuration types for the ecosystem.

use crate::error::{Error, Result};
use crate::types::Season;
use serde::{Deserialize, Serialize};

/// Upper bound for every configured radius, in tiles
pub const MAX_RADIUS: i32 = 1024;

/// World configuration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the world grid
    pub width: i32,
    /// Height of the world grid
    pub height: i32,
    /// Root seed; every simulator derives its own stream from it
    pub seed: u64,
    /// Reveal radius around each controllable creature, in tiles
    pub reveal_radius: i32,
    /// Turns spent in each season before the next one starts
    pub turns_per_season: u64,
    /// Season at turn 0
    pub starting_season: Season,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 48,
            height: 32,
            seed: 0,
            reveal_radius: 5,
            turns_per_season: 40,
            starting_season: Season::Spring,
        }
    }
}

/// Procedural level generation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Water density (0.0 to 1.0)
    pub water_density: f32,
    /// Obstacle density (0.0 to 1.0)
    pub obstacle_density: f32,
    /// Grass terrain density (0.0 to 1.0)
    pub grass_density: f32,
    pub vegetation_patches: usize,
    pub prey_spawners: usize,
    pub worm_spawners: usize,
    pub stick_spawners: usize,
    pub predator_dens: usize,
    /// Controllable observers placed at generation time
    pub observers: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            water_density: 0.06,
            obstacle_density: 0.08,
            grass_density: 0.35,
            vegetation_patches: 24,
            prey_spawners: 4,
            worm_spawners: 3,
            stick_spawners: 3,
            predator_dens: 2,
            observers: 1,
        }
    }
}

/// Per-season rate multipliers. Higher means faster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalMultipliers {
    pub spring: f32,
    pub summer: f32,
    pub fall: f32,
    pub winter: f32,
}

impl SeasonalMultipliers {
    pub fn uniform(value: f32) -> Self {
        Self {
            spring: value,
            summer: value,
            fall: value,
            winter: value,
        }
    }

    pub fn multiplier(&self, season: Season) -> f32 {
        match season {
            Season::Spring => self.spring,
            Season::Summer => self.summer,
            Season::Fall => self.fall,
            Season::Winter => self.winter,
        }
    }
}

impl Default for SeasonalMultipliers {
    fn default() -> Self {
        Self {
            spring: 1.5,
            summer: 1.2,
            fall: 0.8,
            winter: 0.4,
        }
    }
}

/// Grass growth and spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    /// Base turns for a growing patch to mature
    pub growth_turns: f32,
    pub growth_variance: f32,
    /// Base turns between spread attempts of a full patch
    pub spread_turns: f32,
    pub spread_variance: f32,
    pub seasons: SeasonalMultipliers,
    /// Probability that the winter pass thins a given patch
    pub winter_die_off_chance: f64,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            growth_turns: 10.0,
            growth_variance: 0.25,
            spread_turns: 16.0,
            spread_variance: 0.25,
            seasons: SeasonalMultipliers::default(),
            winter_die_off_chance: 0.5,
        }
    }
}

/// Rabbit-style warren
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreySpawnerConfig {
    /// Creature kind name, resolved at level load
    pub creature: String,
    pub initial_min: u32,
    pub initial_max: u32,
    pub group_min: u32,
    pub group_max: u32,
    /// Manhattan radius in which a predator keeps hiding prey inside
    pub detection_radius: i32,
    /// Turns between group spawns while prey are hiding
    pub periodic_spawn_interval: u32,
    /// Idle turns at zero population before a replacement spawns
    pub extinction_delay: u32,
}

impl Default for PreySpawnerConfig {
    fn default() -> Self {
        Self {
            creature: "rabbit".to_string(),
            initial_min: 2,
            initial_max: 5,
            group_min: 1,
            group_max: 3,
            detection_radius: 4,
            periodic_spawn_interval: 20,
            extinction_delay: 30,
        }
    }
}

/// Candidate area scanned by an item spawner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum SpawnArea {
    /// Every tile of the square box around the spawner
    Radius { radius: i32 },
    /// Tiles whose Euclidean distance lies in `[min, max]`
    Annulus { min: i32, max: i32 },
}

/// Capacity-limited item spawner (worms, sticks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemSpawnerConfig {
    /// Item kind name, resolved at level load
    pub item: String,
    pub max_items: usize,
    pub spawn_turns: f32,
    pub spawn_variance: f32,
    pub seasons: SeasonalMultipliers,
    pub area: SpawnArea,
    /// Only grass tiles are candidates
    pub grass_only: bool,
}

impl ItemSpawnerConfig {
    pub fn worm() -> Self {
        Self {
            item: "worm".to_string(),
            max_items: 3,
            spawn_turns: 8.0,
            spawn_variance: 0.3,
            seasons: SeasonalMultipliers {
                spring: 1.4,
                summer: 1.0,
                fall: 1.1,
                winter: 0.3,
            },
            area: SpawnArea::Radius { radius: 3 },
            grass_only: true,
        }
    }

    pub fn stick() -> Self {
        Self {
            item: "stick".to_string(),
            max_items: 2,
            spawn_turns: 12.0,
            spawn_variance: 0.3,
            seasons: SeasonalMultipliers {
                spring: 0.8,
                summer: 0.9,
                fall: 1.5,
                winter: 1.0,
            },
            area: SpawnArea::Annulus { min: 2, max: 5 },
            grass_only: false,
        }
    }
}

impl Default for ItemSpawnerConfig {
    fn default() -> Self {
        Self::worm()
    }
}

/// Predator den population maintenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredatorDenConfig {
    pub creature: String,
    pub territory_radius: i32,
    pub polar_attempts: u32,
    pub offset_attempts: u32,
}

impl Default for PredatorDenConfig {
    fn default() -> Self {
        Self {
            creature: "fox".to_string(),
            territory_radius: 6,
            polar_attempts: 50,
            offset_attempts: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatureKindConfig {
    pub name: String,
    #[serde(default)]
    pub predator: bool,
}

impl CreatureKindConfig {
    pub fn prey(name: &str) -> Self {
        Self {
            name: name.to_string(),
            predator: false,
        }
    }

    pub fn predator(name: &str) -> Self {
        Self {
            name: name.to_string(),
            predator: true,
        }
    }
}

/// Names of every creature and item kind the level may spawn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KindsConfig {
    pub creatures: Vec<CreatureKindConfig>,
    pub items: Vec<String>,
}

impl Default for KindsConfig {
    fn default() -> Self {
        Self {
            creatures: vec![
                CreatureKindConfig::prey("rabbit"),
                CreatureKindConfig::predator("fox"),
                CreatureKindConfig::predator("wolf"),
                CreatureKindConfig::prey("player"),
            ],
            items: vec!["worm".to_string(), "stick".to_string()],
        }
    }
}

/// Everything the ecosystem needs to load a level
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EcosystemConfig {
    pub world: WorldConfig,
    pub generation: GenerationConfig,
    pub vegetation: VegetationConfig,
    pub prey: PreySpawnerConfig,
    pub worm: ItemSpawnerConfig,
    pub stick: ItemSpawnerConfig,
    pub den: PredatorDenConfig,
    pub kinds: KindsConfig,
}

impl Default for EcosystemConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            generation: GenerationConfig::default(),
            vegetation: VegetationConfig::default(),
            prey: PreySpawnerConfig::default(),
            worm: ItemSpawnerConfig::worm(),
            stick: ItemSpawnerConfig::stick(),
            den: PredatorDenConfig::default(),
            kinds: KindsConfig::default(),
        }
    }
}

impl EcosystemConfig {
    /// Range checks; kind names are resolved separately at level load
    pub fn validate(&self) -> Result<()> {
        let world = &self.world;
        if world.width <= 0 || world.height <= 0 {
            return Err(Error::Validation(format!(
                "world dimensions must be positive, got {}x{}",
                world.width, world.height
            )));
        }
        check_radius("reveal_radius", world.reveal_radius)?;
        if world.turns_per_season == 0 {
            return Err(Error::Validation("turns_per_season must be at least 1".into()));
        }

        check_rate("vegetation.growth", self.vegetation.growth_turns, self.vegetation.growth_variance)?;
        check_rate("vegetation.spread", self.vegetation.spread_turns, self.vegetation.spread_variance)?;
        if !(0.0..=1.0).contains(&self.vegetation.winter_die_off_chance) {
            return Err(Error::Validation(
                "vegetation.winter_die_off_chance must be within [0, 1]".into(),
            ));
        }

        let prey = &self.prey;
        if prey.initial_min > prey.initial_max {
            return Err(Error::Validation(format!(
                "prey.initial_min ({}) exceeds prey.initial_max ({})",
                prey.initial_min, prey.initial_max
            )));
        }
        if prey.group_min == 0 || prey.group_min > prey.group_max {
            return Err(Error::Validation(format!(
                "prey group range {}..={} is invalid",
                prey.group_min, prey.group_max
            )));
        }
        if prey.periodic_spawn_interval == 0 {
            return Err(Error::Validation("prey.periodic_spawn_interval must be at least 1".into()));
        }

        for (name, spawner) in [("worm", &self.worm), ("stick", &self.stick)] {
            check_rate(name, spawner.spawn_turns, spawner.spawn_variance)?;
            match spawner.area {
                SpawnArea::Radius { radius } => {
                    check_radius(&format!("{}.area radius", name), radius)?;
                }
                SpawnArea::Annulus { min, max } => {
                    if min < 0 || min > max {
                        return Err(Error::Validation(format!(
                            "{}.area annulus {}..={} is invalid",
                            name, min, max
                        )));
                    }
                    check_radius(&format!("{}.area annulus max", name), max)?;
                }
            }
        }

        check_radius("den.territory_radius", self.den.territory_radius)?;

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

fn check_radius(name: &str, radius: i32) -> Result<()> {
    if !(0..=MAX_RADIUS).contains(&radius) {
        return Err(Error::Validation(format!(
            "{} must be within 0..={}, got {}",
            name, MAX_RADIUS, radius
        )));
    }
    Ok(())
}

fn check_rate(name: &str, base_turns: f32, variance: f32) -> Result<()> {
    if !(base_turns > 0.0) {
        return Err(Error::Validation(format!("{} base turns must be positive", name)));
    }
    if !(0.0..1.0).contains(&variance) {
        return Err(Error::Validation(format!("{} variance must be within [0, 1)", name)));
    }
    Ok(())
}

/// Headless runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Number of turns to advance before stopping
    pub turns: u64,
    /// Pause between turns (milliseconds); 0 runs flat out
    pub turn_interval_ms: u64,
    /// Turns between population gauge emissions
    pub gauge_interval_turns: u64,
    /// Where to write the JSON run report, if anywhere
    pub report_path: Option<String>,
    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,
    pub ecosystem: EcosystemConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            turns: 400,
            turn_interval_ms: 0,
            gauge_interval_turns: 20,
            report_path: Some("./data/ecosystem_report.json".to_string()),
            json_logs: false,
            ecosystem: EcosystemConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.ecosystem.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = EcosystemConfig::default();
        assert_eq!(config.world.width, 48);
        assert_eq!(config.world.height, 32);
        assert_eq!(config.worm.item, "worm");
        assert_eq!(config.stick.item, "stick");
        assert!(config.validate().is_ok());

        let runner = RunnerConfig::default();
        assert_eq!(runner.turns, 400);
    }

    #[test]
    fn test_default_season_ordering() {
        let seasons = SeasonalMultipliers::default();
        assert!(seasons.spring > seasons.summer);
        assert!(seasons.summer > seasons.fall);
        assert!(seasons.fall > seasons.winter);
        assert_eq!(seasons.multiplier(Season::Winter), seasons.winter);
    }

    #[test]
    fn test_validation_rejects_bad_ranges() {
        let mut config = EcosystemConfig::default();
        config.prey.initial_min = 9;
        config.prey.initial_max = 3;
        assert!(matches!(config.validate(), Err(Error::Validation(_))));

        let mut config = EcosystemConfig::default();
        config.world.width = 0;
        assert!(config.validate().is_err());

        let mut config = EcosystemConfig::default();
        config.stick.area = SpawnArea::Annulus { min: 4, max: 2 };
        assert!(config.validate().is_err());

        let mut config = EcosystemConfig::default();
        config.vegetation.growth_variance = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "world": { "width": 10, "height": 10 }, "prey": { "extinction_delay": 3 } }"#;
        let config = EcosystemConfig::from_json(json).unwrap();
        assert_eq!(config.world.width, 10);
        assert_eq!(config.world.reveal_radius, 5);
        assert_eq!(config.prey.creature, "rabbit");
        assert_eq!(config.prey.extinction_delay, 3);
        assert_eq!(config.stick.item, "stick");
    }

    #[test]
    fn test_radii_are_bounded() {
        let mut config = EcosystemConfig::default();
        config.world.width = 10;
        config.world.height = 10;
        assert!(config.validate().is_ok());

        config.world.reveal_radius = 20_000;
        assert!(matches!(config.validate(), Err(Error::Validation(_))));
        config.world.reveal_radius = MAX_RADIUS;
        assert!(config.validate().is_ok());

        config.worm.area = SpawnArea::Radius { radius: 8_000 };
        assert!(config.validate().is_err());
        config.worm.area = SpawnArea::Radius { radius: 3 };
        config.stick.area = SpawnArea::Annulus { min: 2, max: MAX_RADIUS + 1 };
        assert!(config.validate().is_err());
        config.stick.area = SpawnArea::Annulus { min: 2, max: 5 };
        config.den.territory_radius = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_item_spawner_json() {
        let json = r#"{ "worm": { "max_items": 4 }, "stick": { "item": "stick", "grass_only": true } }"#;
        let config = EcosystemConfig::from_json(json).unwrap();
        assert_eq!(config.worm.max_items, 4);
        assert_eq!(config.worm.item, "worm");
        assert_eq!(config.worm.area, ItemSpawnerConfig::worm().area);
        assert_eq!(config.stick.item, "stick");
        assert!(config.stick.grass_only);
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        assert!(matches!(
            EcosystemConfig::from_json("{ not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_spawn_area_serialization() {
        let area = SpawnArea::Annulus { min: 2, max: 5 };
        let json = serde_json::to_string(&area).unwrap();
        assert_eq!(json, r#"{"shape":"annulus","min":2,"max":5}"#);
    }
}
