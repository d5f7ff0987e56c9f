//! Single-hand tracking and gesture control.
//!
//! This crate turns the output of a two-stage hand pipeline (a palm detector and a landmark
//! regressor, run by an external [`InferenceBackend`][backend::InferenceBackend]) into a stream
//! of gesture events:
//!
//! - [`hand::tracking`] keeps a rotated region of interest locked on a single hand, and falls back
//!   to palm detection when the hand is lost.
//! - [`hand::gesture`] classifies the hand's 21 landmarks into one of a fixed set of gestures.
//! - [`action`] debounces and times recognized gestures according to configurable rules, and
//!   routes the resulting events to named callbacks.
//!
//! [`pipeline::Session`] runs all of these once per frame.
//!
//! # Coordinates
//!
//! All 2D coordinates are normalized to the square input of the networks: X points right, Y points
//! *down*, and `(1, 1)` is the bottom right corner. Non-square camera frames are padded to a
//! square, see [`SquareFrame`][hand::tracking::SquareFrame].

use log::LevelFilter;

pub mod action;
pub mod backend;
pub mod config;
pub mod error;
pub mod hand;
pub mod landmark;
pub mod num;
pub mod pipeline;
pub mod roi;
pub mod timer;

pub type Error = Box<dyn std::error::Error + Sync + Send>;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and this library will log at *trace*
/// level. Otherwise, they will log at *debug* level. `RUST_LOG` overrides these defaults.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
