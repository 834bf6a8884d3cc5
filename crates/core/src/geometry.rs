//! Positions and navigation goals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in the world. No orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Straight-line distance.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Distance on the XZ plane, ignoring height.
    pub fn horizontal_distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        (dx * dx + dz * dz).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Position {
        Position::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Block-granular key, e.g. `"12,64,-3"`.
    ///
    /// Two positions inside the same block share a key. Used for visited
    /// sets, stall detection, and team claims.
    pub fn key(&self) -> String {
        format!(
            "{},{},{}",
            self.x.floor() as i64,
            self.y.floor() as i64,
            self.z.floor() as i64
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// A navigation target plus acceptance radius, handed to the motion collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub target: Position,
    pub range: f64,
    /// Accept any height within `range` on the XZ plane.
    pub ignore_y: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 12.0);
        assert!((a.distance_to(&b) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn horizontal_distance_ignores_height() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 100.0, 4.0);
        assert!((a.horizontal_distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn key_floors_each_axis() {
        assert_eq!(Position::new(1.9, 64.2, -0.5).key(), "1,64,-1");
        assert_eq!(
            Position::new(1.1, 64.9, -0.1).key(),
            Position::new(1.8, 64.0, -0.9).key()
        );
    }
}
