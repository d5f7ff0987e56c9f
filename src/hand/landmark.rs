//! Hand landmark regression results.

use itertools::Itertools;
use serde::Deserialize;

use crate::landmark::{Landmarks, NUM_LANDMARKS};

/// Raw output of the landmark regressor for one region of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLandmarks {
    /// Presence score of a hand inside the region of interest.
    pub score: f32,
    /// Raw handedness score. Values above 0.5 indicate a right hand.
    pub handedness: f32,
    /// `21 * 3` coordinates, in pixels of the regressor's (square) input image.
    pub values: Vec<f32>,
}

impl RawLandmarks {
    /// A result that reports no hand.
    pub fn absent() -> Self {
        Self {
            score: 0.0,
            handedness: 0.0,
            values: vec![0.0; NUM_LANDMARKS * 3],
        }
    }

    /// Returns the estimated handedness of the hand.
    ///
    /// This assumes that the camera image is passed in as-is, and the returned value should only be
    /// relied on when the `score` is over some threshold.
    pub fn hand(&self) -> Handedness {
        Handedness::from_score(self.handedness)
    }

    /// Scales the raw values down by `input_size` to obtain coordinates normalized to the region
    /// of interest.
    ///
    /// Returns [`None`] if the regressor did not produce exactly 63 values.
    pub fn normalized(&self, input_size: f32) -> Option<Landmarks> {
        if self.values.len() != NUM_LANDMARKS * 3 {
            return None;
        }

        let mut positions = [[0.0; 3]; NUM_LANDMARKS];
        for (out, (x, y, z)) in positions.iter_mut().zip_eq(self.values.iter().tuples()) {
            *out = [x / input_size, y / input_size, z / input_size];
        }
        Some(Landmarks::new(positions))
    }
}

/// Which hand is visible in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn from_score(raw: f32) -> Self {
        if raw > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Landmarks whose bounding box determines the next region of interest.
///
/// The fingertips and the upper thumb are left out, since they move a lot more than the palm.
pub const ROI_LANDMARKS: &[LandmarkIdx] = {
    use LandmarkIdx::*;
    &[
        Wrist,
        ThumbCmc,
        ThumbMcp,
        ThumbIp,
        IndexFingerMcp,
        IndexFingerPip,
        MiddleFingerMcp,
        MiddleFingerPip,
        RingFingerMcp,
        RingFingerPip,
        PinkyMcp,
        PinkyPip,
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_raw_values() {
        let raw = RawLandmarks {
            score: 1.0,
            handedness: 0.9,
            values: (0..63).map(|i| i as f32).collect(),
        };
        let lms = raw.normalized(2.0).unwrap();
        assert_eq!(lms[LandmarkIdx::Wrist], [0.0, 0.5, 1.0]);
        assert_eq!(lms[LandmarkIdx::PinkyTip], [30.0, 30.5, 31.0]);
        assert_eq!(raw.hand(), Handedness::Right);
    }

    #[test]
    fn wrong_length() {
        let raw = RawLandmarks {
            score: 1.0,
            handedness: 0.0,
            values: vec![0.0; 62],
        };
        assert!(raw.normalized(224.0).is_none());
        assert_eq!(raw.hand(), Handedness::Left);
    }

    #[test]
    fn handedness_threshold() {
        assert_eq!(Handedness::from_score(0.5), Handedness::Left);
        assert_eq!(Handedness::from_score(0.51), Handedness::Right);
    }

    #[test]
    fn roi_landmark_indices() {
        let indices: Vec<usize> = ROI_LANDMARKS.iter().map(|&lm| lm as usize).collect();
        assert_eq!(indices, [0, 1, 2, 3, 5, 6, 9, 10, 13, 14, 17, 18]);
    }
}
