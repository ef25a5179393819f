//! Core types and utilities for the turn-scheduled ecosystem simulation.

pub mod types;
pub mod config;
pub mod error;
pub mod kinds;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use kinds::{CreatureKind, ItemKind, KindTable};
