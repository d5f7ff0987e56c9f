//! Tracking and pose recognition of a single human hand.
//!
//! The pipeline consists of a palm detector that is only run when no hand is being tracked, and a
//! landmark regressor that runs on a rotated region of interest. The region is derived from the
//! previous frame's landmarks as long as the regressor reports a hand in it.

pub mod detection;
pub mod gesture;
pub mod landmark;
pub mod tracking;
