//! Dense kind tables.
//!
//! Creature and item kinds are configured by name and resolved once, at level
//! load, into small integer ids. Nothing downstream dispatches on strings.

use crate::config::KindsConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CreatureKind(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKind(pub u16);

#[derive(Debug, Clone)]
struct CreatureEntry {
    name: String,
    predator: bool,
}

/// Resolved kind tables for one level
#[derive(Debug, Clone, Default)]
pub struct KindTable {
    creatures: Vec<CreatureEntry>,
    items: Vec<String>,
    creature_index: HashMap<String, CreatureKind>,
    item_index: HashMap<String, ItemKind>,
}

impl KindTable {
    pub fn from_config(config: &KindsConfig) -> Result<Self> {
        let mut table = Self::default();

        for creature in &config.creatures {
            if table.creature_index.contains_key(&creature.name) {
                return Err(Error::Config(format!(
                    "duplicate creature kind '{}'",
                    creature.name
                )));
            }
            let kind = CreatureKind(table.creatures.len() as u16);
            table.creature_index.insert(creature.name.clone(), kind);
            table.creatures.push(CreatureEntry {
                name: creature.name.clone(),
                predator: creature.predator,
            });
        }

        for item in &config.items {
            if table.item_index.contains_key(item) {
                return Err(Error::Config(format!("duplicate item kind '{}'", item)));
            }
            let kind = ItemKind(table.items.len() as u16);
            table.item_index.insert(item.clone(), kind);
            table.items.push(item.clone());
        }

        debug!(
            creatures = table.creatures.len(),
            items = table.items.len(),
            "Kind table resolved"
        );
        Ok(table)
    }

    pub fn creature(&self, name: &str) -> Result<CreatureKind> {
        self.creature_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("creature kind '{}'", name)))
    }

    pub fn item(&self, name: &str) -> Result<ItemKind> {
        self.item_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("item kind '{}'", name)))
    }

    pub fn is_predator(&self, kind: CreatureKind) -> bool {
        self.creatures
            .get(kind.0 as usize)
            .map(|entry| entry.predator)
            .unwrap_or(false)
    }

    pub fn creature_name(&self, kind: CreatureKind) -> Option<&str> {
        self.creatures.get(kind.0 as usize).map(|entry| entry.name.as_str())
    }

    pub fn item_name(&self, kind: ItemKind) -> Option<&str> {
        self.items.get(kind.0 as usize).map(String::as_str)
    }

    /// All kinds flagged as predators
    pub fn predators(&self) -> Vec<CreatureKind> {
        self.creatures
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.predator)
            .map(|(i, _)| CreatureKind(i as u16))
            .collect()
    }
}
