//! Static hand gesture recognition.
//!
//! Gestures are recognized from a single set of landmarks, without any history. Every finger is
//! first classified as open or closed, and the resulting combination is looked up in a fixed
//! table.
//!
//! The landmarks are expected in the region of interest's local coordinate system. Since the
//! region is rotated to keep the hand upright, "up" (smaller Y) is always towards the fingertips
//! of an extended finger.

use std::{fmt, str::FromStr};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::landmark::Landmarks;

use super::landmark::LandmarkIdx::{self, *};

/// State of a single finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum FingerState {
    Unknown = -1,
    Closed = 0,
    Open = 1,
}

/// Open/closed state of all 5 fingers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FingerStates {
    pub thumb: FingerState,
    pub index: FingerState,
    pub middle: FingerState,
    pub ring: FingerState,
    pub little: FingerState,
}

impl FingerStates {
    /// Returns the states as a `(thumb, index, middle, ring, little)` tuple.
    pub fn as_tuple(
        &self,
    ) -> (
        FingerState,
        FingerState,
        FingerState,
        FingerState,
        FingerState,
    ) {
        (self.thumb, self.index, self.middle, self.ring, self.little)
    }
}

/// A recognized hand gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Fist,
    Ok,
    Track,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Aloha,
    Wakeup,
    /// Four fingers pressed together, thumb folded.
    Back,
}

impl Gesture {
    pub const ALL: [Gesture; 12] = [
        Gesture::Fist,
        Gesture::Ok,
        Gesture::Track,
        Gesture::One,
        Gesture::Two,
        Gesture::Three,
        Gesture::Four,
        Gesture::Five,
        Gesture::Six,
        Gesture::Aloha,
        Gesture::Wakeup,
        Gesture::Back,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fist => "FIST",
            Self::Ok => "OK",
            Self::Track => "TRACK",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Three => "THREE",
            Self::Four => "FOUR",
            Self::Five => "FIVE",
            Self::Six => "SIX",
            Self::Aloha => "ALOHA",
            Self::Wakeup => "WAKEUP",
            Self::Back => "BACK",
        }
    }

    /// Looks up the gesture formed by a combination of finger states.
    ///
    /// Any [`FingerState::Unknown`] makes the lookup fail.
    pub fn from_fingers(fingers: FingerStates) -> Option<Gesture> {
        use FingerState::{Closed as C, Open as O};

        let gesture = match fingers.as_tuple() {
            (O, O, O, O, O) => Gesture::Five,
            (C, C, C, C, C) => Gesture::Fist,
            (O, C, C, C, C) => Gesture::Ok,
            (C, O, O, C, C) => Gesture::Two,
            (C, O, C, C, C) => Gesture::One,
            (O, O, C, C, C) => Gesture::Track,
            (O, O, O, C, C) => Gesture::Three,
            (C, O, O, O, O) => Gesture::Four,
            (C, O, O, O, C) => Gesture::Six,
            (O, C, C, C, O) => Gesture::Aloha,
            (C, O, C, C, O) => Gesture::Wakeup,
            _ => return None,
        };
        Some(gesture)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gesture {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gesture::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownGesture(s.to_string()))
    }
}

/// Thresholds used by the [`GestureClassifier`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GestureConfig {
    /// Minimum sum (in degrees) of the three thumb joint angles for an open thumb.
    pub thumb_angle_sum: f32,
    /// Minimum ratio `d(thumb IP, index MCP) / d(thumb MCP, thumb IP)` for an open thumb.
    pub thumb_distance_ratio: f32,
    /// Maximum distance between index and ring fingertip for [`Gesture::Back`].
    pub back_index_ring: f32,
    /// Maximum distance between index and middle fingertip for [`Gesture::Back`].
    pub back_index_middle: f32,
    /// Maximum distance between middle and ring fingertip for [`Gesture::Back`].
    pub back_middle_ring: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            thumb_angle_sum: 460.0,
            thumb_distance_ratio: 1.2,
            back_index_ring: 0.21,
            back_index_middle: 0.12,
            back_middle_ring: 0.12,
        }
    }
}

/// Result of classifying one set of landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub fingers: FingerStates,
    /// Sum of the thumb's joint angles, in degrees.
    pub thumb_angle: f32,
    pub gesture: Option<Gesture>,
    /// Distance between thumb tip and index fingertip.
    ///
    /// Only computed when a gesture was recognized. Can be used as an analog input, for example
    /// to drive a slider while the hand holds [`Gesture::Track`].
    pub thumb_index_distance: Option<f32>,
}

/// Stateless gesture classifier.
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    config: GestureConfig,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Classifies a set of landmarks in ROI-local coordinates.
    pub fn classify(&self, lms: &Landmarks) -> Classification {
        let thumb_angle = lms.angle_degrees(Wrist, ThumbCmc, ThumbMcp)
            + lms.angle_degrees(ThumbCmc, ThumbMcp, ThumbIp)
            + lms.angle_degrees(ThumbMcp, ThumbIp, ThumbTip);
        let thumb_ratio =
            lms.distance(ThumbIp, IndexFingerMcp) / lms.distance(ThumbMcp, ThumbIp);
        // A NaN ratio (coinciding landmarks) fails the comparison and yields a closed thumb.
        let thumb = if thumb_angle > self.config.thumb_angle_sum
            && thumb_ratio > self.config.thumb_distance_ratio
        {
            FingerState::Open
        } else {
            FingerState::Closed
        };

        let fingers = FingerStates {
            thumb,
            index: finger_state(lms, IndexFingerPip, IndexFingerDip, IndexFingerTip),
            middle: finger_state(lms, MiddleFingerPip, MiddleFingerDip, MiddleFingerTip),
            ring: finger_state(lms, RingFingerPip, RingFingerDip, RingFingerTip),
            little: finger_state(lms, PinkyPip, PinkyDip, PinkyTip),
        };

        let gesture = match Gesture::from_fingers(fingers) {
            Some(Gesture::Four) if self.fingertips_together(lms) => Some(Gesture::Back),
            other => other,
        };

        Classification {
            fingers,
            thumb_angle,
            gesture,
            thumb_index_distance: gesture.map(|_| lms.distance(ThumbTip, IndexFingerTip)),
        }
    }

    fn fingertips_together(&self, lms: &Landmarks) -> bool {
        lms.distance(IndexFingerTip, RingFingerTip) < self.config.back_index_ring
            && lms.distance(IndexFingerTip, MiddleFingerTip) < self.config.back_index_middle
            && lms.distance(MiddleFingerTip, RingFingerTip) < self.config.back_middle_ring
    }
}

fn finger_state(
    lms: &Landmarks,
    pip: LandmarkIdx,
    dip: LandmarkIdx,
    tip: LandmarkIdx,
) -> FingerState {
    let [pip, dip, tip] = [pip, dip, tip].map(|idx| lms[idx][1]);
    if tip < dip && dip < pip {
        FingerState::Open
    } else if pip < tip {
        FingerState::Closed
    } else {
        FingerState::Unknown
    }
}
