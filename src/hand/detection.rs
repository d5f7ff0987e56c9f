//! Palm detection results.
//!
//! The palm detector runs on the full (square) frame and reports its single best candidate. Its
//! box and two of its keypoints seed the region of interest when no hand is being tracked.

use std::f32::consts::FRAC_PI_2;

use serde::Deserialize;

use crate::roi::Roi;

/// Ratio between the side of the hand ROI and the side of the detected palm box.
pub const PALM_TO_HAND_SCALE: f32 = 2.9;

/// A keypoint of a [`PalmDetection`], normalized to the detector's input.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The best palm candidate found by the palm detector in a frame.
///
/// All coordinates are normalized to the square detector input.
#[derive(Debug, Clone, Deserialize)]
pub struct PalmDetection {
    pub score: f32,
    pub x_center: f32,
    pub y_center: f32,
    /// Side of the (square) palm box.
    pub size: f32,
    /// Keypoint located at the wrist.
    pub wrist: Keypoint,
    /// Keypoint located at the middle finger's knuckle.
    pub middle_finger: Keypoint,
}

impl PalmDetection {
    /// A detection result that reports no palm.
    pub fn absent() -> Self {
        Self {
            score: 0.0,
            x_center: 0.0,
            y_center: 0.0,
            size: 0.0,
            wrist: Keypoint::new(0.0, 0.0),
            middle_finger: Keypoint::new(0.0, 0.0),
        }
    }

    /// Computes the clockwise rotation of the palm compared to an upright position.
    ///
    /// A rotation of 0° means that the wrist is directly below the middle finger.
    pub fn rotation_radians(&self) -> f32 {
        let dx = self.middle_finger.x - self.wrist.x;
        let dy = self.middle_finger.y - self.wrist.y;
        FRAC_PI_2 - (-dy).atan2(dx)
    }

    /// Computes the region of interest that should contain the whole hand.
    ///
    /// The palm box is scaled up by [`PALM_TO_HAND_SCALE`] and its center is moved by half a box
    /// towards the fingers.
    pub fn hand_roi(&self) -> Roi {
        let rotation = self.rotation_radians();
        let (sin, cos) = rotation.sin_cos();
        Roi::new(
            self.x_center + 0.5 * self.size * sin,
            self.y_center - 0.5 * self.size * cos,
            PALM_TO_HAND_SCALE * self.size,
            rotation,
        )
    }
}
