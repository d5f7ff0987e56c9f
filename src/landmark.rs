//! Landmark sets produced by the hand landmark regressor.

use std::ops::Index;

use crate::hand::landmark::LandmarkIdx;
use crate::num;

/// Number of landmarks in a [`Landmarks`] set.
pub const NUM_LANDMARKS: usize = 21;

type Position = [f32; 3];

/// An ordered set of exactly [`NUM_LANDMARKS`] 3D points.
///
/// Depending on where it came from, the X and Y coordinates are either normalized to the
/// region of interest the regressor looked at, or to the full (square) input image. Z is a
/// relative depth and uses the same scale as X.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmarks {
    positions: [Position; NUM_LANDMARKS],
}

impl Landmarks {
    pub fn new(positions: [Position; NUM_LANDMARKS]) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[Position; NUM_LANDMARKS] {
        &self.positions
    }

    /// Euclidean distance between two landmarks, using all 3 coordinates.
    pub fn distance(&self, a: LandmarkIdx, b: LandmarkIdx) -> f32 {
        num::distance(self[a], self[b])
    }

    /// Angle in degrees at landmark `b`, between the segments towards `a` and `c`.
    pub fn angle_degrees(&self, a: LandmarkIdx, b: LandmarkIdx, c: LandmarkIdx) -> f32 {
        num::angle_degrees(self[a], self[b], self[c])
    }

    /// Returns a copy of `self` with `f` applied to every position.
    #[must_use]
    pub fn map_positions(&self, f: impl FnMut(Position) -> Position) -> Self {
        Self {
            positions: self.positions.map(f),
        }
    }
}

impl Index<LandmarkIdx> for Landmarks {
    type Output = Position;

    fn index(&self, idx: LandmarkIdx) -> &Position {
        &self.positions[idx as usize]
    }
}
