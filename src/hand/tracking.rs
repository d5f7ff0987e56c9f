//! Single-hand tracking.
//!
//! [`HandTracker`] alternates between two states. In [`TrackerState::Search`], the palm detector
//! is run on the whole frame, and a sufficiently confident detection seeds a region of interest.
//! In [`TrackerState::Track`], only the landmark regressor is run, on a region of interest that is
//! recomputed from the previous frame's landmarks. Tracking is lost (and the palm detector is run
//! again) as soon as the regressor no longer reports a hand.

use std::f32::consts::FRAC_PI_2;

use serde::Deserialize;

use crate::backend::{InferenceBackend, UpstreamError};
use crate::error::ConfigError;
use crate::landmark::Landmarks;
use crate::num::normalize_radians;
use crate::roi::{Roi, RotatedBounds, MIN_ROI_SIZE};

use super::detection::PalmDetection;
use super::gesture::{Classification, FingerStates, Gesture, GestureClassifier};
use super::landmark::{Handedness, LandmarkIdx, RawLandmarks, ROI_LANDMARKS};

/// Thresholds and network parameters used by a [`HandTracker`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Palm detections scoring below this value are ignored.
    pub pd_score_thresh: f32,
    /// Tracking is lost when the landmark score is at or below this value.
    pub lm_score_thresh: f32,
    /// Side length of the landmark regressor's input, in pixels.
    pub lm_input_size: f32,
}

impl TrackerConfig {
    pub const DEFAULT_PD_SCORE_THRESH: f32 = 0.5;
    pub const DEFAULT_LM_SCORE_THRESH: f32 = 0.5;
    pub const DEFAULT_LM_INPUT_SIZE: f32 = 224.0;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.pd_score_thresh.is_finite() {
            return Err(ConfigError::InvalidSetting {
                field: "pd_score_thresh",
                reason: "must be a finite number",
            });
        }
        if !self.lm_score_thresh.is_finite() {
            return Err(ConfigError::InvalidSetting {
                field: "lm_score_thresh",
                reason: "must be a finite number",
            });
        }
        if !(self.lm_input_size.is_finite() && self.lm_input_size > 0.0) {
            return Err(ConfigError::InvalidSetting {
                field: "lm_input_size",
                reason: "must be a positive number",
            });
        }
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            pd_score_thresh: Self::DEFAULT_PD_SCORE_THRESH,
            lm_score_thresh: Self::DEFAULT_LM_SCORE_THRESH,
            lm_input_size: Self::DEFAULT_LM_INPUT_SIZE,
        }
    }
}

/// The state of a [`HandTracker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerState {
    /// No hand is tracked. The palm detector has to find one.
    Search,
    /// A hand is expected inside the contained region of interest.
    Track(Roi),
}

/// Where the region of interest of a [`HandObservation`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoiSource {
    /// The region was derived from a palm detection in the same frame.
    Detection,
    /// The region was derived from the previous frame's landmarks.
    Landmarks,
}

/// The result of one tracking cycle.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    NoHand,
    Hand(HandObservation),
}

impl CycleOutcome {
    pub fn observation(&self) -> Option<&HandObservation> {
        match self {
            CycleOutcome::NoHand => None,
            CycleOutcome::Hand(obs) => Some(obs),
        }
    }

    pub fn into_observation(self) -> Option<HandObservation> {
        match self {
            CycleOutcome::NoHand => None,
            CycleOutcome::Hand(obs) => Some(obs),
        }
    }
}

/// A hand found by the landmark regressor.
#[derive(Debug, Clone)]
pub struct HandObservation {
    confidence: f32,
    handedness: f32,
    local: Landmarks,
    landmarks: Landmarks,
    roi: Roi,
    roi_source: RoiSource,
    classification: Classification,
}

impl HandObservation {
    /// Presence score reported by the landmark regressor.
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Raw handedness score. Values above 0.5 indicate a right hand.
    pub fn handedness_score(&self) -> f32 {
        self.handedness
    }

    pub fn hand(&self) -> Handedness {
        Handedness::from_score(self.handedness)
    }

    /// Landmarks normalized to the region of interest the regressor looked at.
    pub fn local_landmarks(&self) -> &Landmarks {
        &self.local
    }

    /// Landmarks normalized to the full (square) frame.
    ///
    /// Z is scaled by the ROI size, so that it stays commensurate with X and Y.
    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    /// The region of interest the regressor was run on.
    pub fn roi(&self) -> Roi {
        self.roi
    }

    pub fn roi_source(&self) -> RoiSource {
        self.roi_source
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn fingers(&self) -> FingerStates {
        self.classification.fingers
    }

    pub fn gesture(&self) -> Option<Gesture> {
        self.classification.gesture
    }

    /// Distance between thumb tip and index finger tip, in ROI-local units.
    ///
    /// Only available when a gesture was recognized.
    pub fn thumb_index_distance(&self) -> Option<f32> {
        self.classification.thumb_index_distance
    }
}

/// Counters describing how a [`HandTracker`] spent its cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    /// Number of cycles run.
    pub frames: u64,
    /// Number of cycles that did not produce a hand.
    pub frames_without_hand: u64,
    /// Number of palm detections processed.
    pub palm_detections: u64,
    /// Number of landmark regressions processed.
    pub landmark_regressions: u64,
    /// Number of landmark regressions run on a region derived from previous landmarks.
    pub landmark_roi_regressions: u64,
}

/// Search/Track state machine following a single hand.
pub struct HandTracker {
    config: TrackerConfig,
    classifier: GestureClassifier,
    state: TrackerState,
    roi_source: RoiSource,
    stats: TrackerStats,
}

impl HandTracker {
    pub fn new(config: TrackerConfig, classifier: GestureClassifier) -> Self {
        Self {
            config,
            classifier,
            state: TrackerState::Search,
            roi_source: RoiSource::Detection,
            stats: TrackerStats::default(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Returns the region of interest the landmark regressor will be run on next, if a hand is
    /// being tracked.
    pub fn roi(&self) -> Option<Roi> {
        match self.state {
            TrackerState::Search => None,
            TrackerState::Track(roi) => Some(roi),
        }
    }

    pub fn stats(&self) -> &TrackerStats {
        &self.stats
    }

    /// Forgets the tracked hand.
    pub fn reset(&mut self) {
        self.state = TrackerState::Search;
    }

    /// Runs one tracking cycle on the backend's current frame.
    ///
    /// In the search state, this runs the palm detector and, if it finds a palm, the landmark
    /// regressor on the derived region, all in the same cycle. Otherwise only the landmark
    /// regressor is run.
    ///
    /// Backend errors are passed through. The tracker's state is restored to what it was before
    /// the cycle, so a palm found in a failed cycle is not tracked.
    pub fn cycle<B: InferenceBackend>(
        &mut self,
        backend: &mut B,
    ) -> Result<CycleOutcome, UpstreamError> {
        self.stats.frames += 1;
        let (prev_state, prev_source) = (self.state, self.roi_source);

        let roi = match self.state {
            TrackerState::Track(roi) => roi,
            TrackerState::Search => {
                let detection = backend.detect_palm()?;
                match self.process_detection(&detection) {
                    Some(roi) => roi,
                    None => {
                        self.stats.frames_without_hand += 1;
                        return Ok(CycleOutcome::NoHand);
                    }
                }
            }
        };

        let raw = match backend.regress_landmarks(&roi) {
            Ok(raw) => raw,
            Err(e) => {
                self.state = prev_state;
                self.roi_source = prev_source;
                return Err(e);
            }
        };
        let outcome = self.process_landmarks(&raw);
        if let CycleOutcome::NoHand = outcome {
            self.stats.frames_without_hand += 1;
        }
        Ok(outcome)
    }

    /// Feeds a palm detection result to the tracker.
    ///
    /// If the detection is confident enough, switches to the track state and returns the region
    /// of interest to run the landmark regressor on. Otherwise, switches to the search state.
    pub fn process_detection(&mut self, detection: &PalmDetection) -> Option<Roi> {
        self.stats.palm_detections += 1;

        if detection.score < self.config.pd_score_thresh {
            log::trace!(
                "palm score {} below threshold {}",
                detection.score,
                self.config.pd_score_thresh,
            );
            self.state = TrackerState::Search;
            return None;
        }

        let roi = detection.hand_roi();
        log::trace!("palm detected (score {}), tracking {:?}", detection.score, roi);
        self.state = TrackerState::Track(roi);
        self.roi_source = RoiSource::Detection;
        Some(roi)
    }

    /// Feeds the landmark regressor's result for the current region of interest to the tracker.
    ///
    /// If the regressor reports a hand, the observation is returned and the region of interest is
    /// updated to follow the hand. Otherwise, tracking is lost and the tracker returns to the
    /// search state.
    ///
    /// In the search state, there is no region the result could belong to, so it is ignored.
    pub fn process_landmarks(&mut self, raw: &RawLandmarks) -> CycleOutcome {
        let roi = match self.state {
            TrackerState::Track(roi) => roi,
            TrackerState::Search => {
                log::debug!("ignoring landmarks received while searching");
                return CycleOutcome::NoHand;
            }
        };

        self.stats.landmark_regressions += 1;
        if self.roi_source == RoiSource::Landmarks {
            self.stats.landmark_roi_regressions += 1;
        }

        if raw.score <= self.config.lm_score_thresh {
            log::trace!(
                "landmark score {}, loss threshold {} -> LOST",
                raw.score,
                self.config.lm_score_thresh,
            );
            self.state = TrackerState::Search;
            return CycleOutcome::NoHand;
        }

        let local = match raw.normalized(self.config.lm_input_size) {
            Some(local) => local,
            None => {
                log::warn!(
                    "landmark regressor returned {} values, expected 63",
                    raw.values.len()
                );
                self.state = TrackerState::Search;
                return CycleOutcome::NoHand;
            }
        };

        let landmarks = local.map_positions(|[x, y, z]| {
            let [x, y] = roi.to_image([x, y]);
            [x, y, z * roi.size()]
        });
        let classification = self.classifier.classify(&local);

        let next = next_roi(&landmarks);
        self.state = TrackerState::Track(next);
        let roi_source = std::mem::replace(&mut self.roi_source, RoiSource::Landmarks);

        CycleOutcome::Hand(HandObservation {
            confidence: raw.score,
            handedness: raw.handedness,
            local,
            landmarks,
            roi,
            roi_source,
            classification,
        })
    }
}

/// Computes the region of interest for the next frame from a hand's image-space landmarks.
///
/// The region is rotated so that the hand points up, and is centered on the palm, leaving room
/// for the fingers to move.
pub fn next_roi(landmarks: &Landmarks) -> Roi {
    use LandmarkIdx::*;

    let [x_wrist, y_wrist, _] = landmarks[Wrist];
    let [x_index, y_index, _] = landmarks[IndexFingerMcp];
    let [x_middle, y_middle, _] = landmarks[MiddleFingerMcp];
    let [x_ring, y_ring, _] = landmarks[RingFingerMcp];
    let x_mcp = 0.25 * x_index + 0.5 * x_middle + 0.25 * x_ring;
    let y_mcp = 0.25 * y_index + 0.5 * y_middle + 0.25 * y_ring;
    let rotation = normalize_radians(FRAC_PI_2 - (y_wrist - y_mcp).atan2(x_mcp - x_wrist));

    let points = ROI_LANDMARKS.iter().map(|&idx| {
        let [x, y, _] = landmarks[idx];
        [x, y]
    });
    let Some(bounds) = RotatedBounds::bounding(rotation, points) else {
        return Roi::new(x_wrist, y_wrist, MIN_ROI_SIZE, rotation);
    };

    let (sin, cos) = rotation.sin_cos();
    Roi::new(
        bounds.center.x + 0.1 * bounds.height * sin,
        bounds.center.y - 0.1 * bounds.height * cos,
        2.0 * bounds.width.max(bounds.height),
        rotation,
    )
}

/// Describes how a non-square camera frame was padded to the square frame the networks see.
///
/// The shorter side is padded symmetrically, so all normalized coordinates produced by the tracker
/// are relative to a square of side `max(width, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquareFrame {
    width: u32,
    height: u32,
}

impl SquareFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Side length of the padded square frame, in pixels.
    pub fn size(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Padding added to the left of the frame.
    pub fn pad_x(&self) -> u32 {
        self.height.saturating_sub(self.width) / 2
    }

    /// Padding added to the top of the frame.
    pub fn pad_y(&self) -> u32 {
        self.width.saturating_sub(self.height) / 2
    }

    /// Converts normalized square-frame coordinates to pixel coordinates in the camera frame.
    pub fn to_pixels(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let size = self.size() as f32;
        [
            x * size - self.pad_x() as f32,
            y * size - self.pad_y() as f32,
        ]
    }

    /// Returns the corners of `roi` in pixel coordinates of the camera frame.
    pub fn roi_corners(&self, roi: &Roi) -> [[f32; 2]; 4] {
        roi.corners().map(|p| self.to_pixels(p))
    }
}
