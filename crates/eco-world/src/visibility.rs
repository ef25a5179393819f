//! Fog of war.
//!
//! Tiles start hidden and stay revealed once uncovered, until an explicit
//! [`FogOfWar::hide`]. Simulators on hidden tiles are frozen.

use eco_core::Position;
use serde::{Deserialize, Serialize};

/// Emitted whenever a tile flips between hidden and revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityChange {
    pub position: Position,
    pub revealed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FogOfWar {
    width: i32,
    height: i32,
    revealed: Vec<bool>,
    changes: Vec<VisibilityChange>,
}

impl FogOfWar {
    pub fn new(width: i32, height: i32) -> Self {
        let mut fog = Self {
            width: 0,
            height: 0,
            revealed: Vec::new(),
            changes: Vec::new(),
        };
        fog.reset(width, height);
        fog
    }

    /// Hide everything and resize to the new grid dimensions
    pub(crate) fn reset(&mut self, width: i32, height: i32) {
        self.width = width.max(0);
        self.height = height.max(0);
        self.revealed = vec![false; (self.width as usize) * (self.height as usize)];
        self.changes.clear();
    }

    pub fn is_revealed(&self, pos: Position) -> bool {
        self.index(pos).map(|i| self.revealed[i]).unwrap_or(false)
    }

    /// Reveal every in-bounds tile whose true Euclidean distance from
    /// `center` is at most `radius`. Returns the number of newly revealed tiles.
    pub fn reveal_radius(&mut self, center: Position, radius: i32) -> usize {
        if radius < 0 {
            return 0;
        }
        let limit = (radius as i64) * (radius as i64);
        let mut newly_revealed = 0;

        // Offsets clipped to the grid so the scan never exceeds its area
        let (dx_min, dx_max) = clip_offsets(center.x, radius, self.width);
        let (dy_min, dy_max) = clip_offsets(center.y, radius, self.height);
        for dy in dy_min..=dy_max {
            for dx in dx_min..=dx_max {
                let pos = center.add(dx, dy);
                if center.distance_squared(&pos) <= limit && self.reveal(pos) {
                    newly_revealed += 1;
                }
            }
        }

        newly_revealed
    }

    /// Reveal one tile; returns true if it was hidden before
    pub fn reveal(&mut self, pos: Position) -> bool {
        self.set(pos, true)
    }

    /// Hide one tile; returns true if it was revealed before
    pub fn hide(&mut self, pos: Position) -> bool {
        self.set(pos, false)
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|r| **r).count()
    }

    /// Drain pending visibility notifications
    pub fn take_changes(&mut self) -> Vec<VisibilityChange> {
        std::mem::take(&mut self.changes)
    }

    fn set(&mut self, pos: Position, revealed: bool) -> bool {
        let Some(i) = self.index(pos) else {
            return false;
        };
        if self.revealed[i] == revealed {
            return false;
        }
        self.revealed[i] = revealed;
        self.changes.push(VisibilityChange {
            position: pos,
            revealed,
        });
        true
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height {
            Some((pos.y * self.width + pos.x) as usize)
        } else {
            None
        }
    }
}

/// Offsets in `[-radius, radius]` that keep `center + offset` inside
/// `[0, extent)`. Empty (min > max) when nothing does.
pub(crate) fn clip_offsets(center: i32, radius: i32, extent: i32) -> (i32, i32) {
    let low = (-(radius as i64)).max(-(center as i64));
    let high = (radius as i64).min(extent as i64 - 1 - center as i64);
    if low > high {
        return (1, 0);
    }
    (low as i32, high as i32)
}
