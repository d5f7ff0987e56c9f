//! JSON configuration of the tracker, the gesture classifier and the pose-action rules.
//!
//! Every section and field is optional, and defaults to the values the networks were tuned for:
//!
//! ```json
//! {
//!     "tracker": {"pd_score_thresh": 0.5, "lm_score_thresh": 0.5, "lm_input_size": 224},
//!     "gesture": {"back_index_ring": 0.21},
//!     "pose_actions": [
//!         {"name": "wake", "pose": "WAKEUP", "callback": "wake_up", "first_trigger_delay": 1}
//!     ]
//! }
//! ```

use std::{fs, path::Path, str::FromStr};

use serde::Deserialize;

use crate::action::{PoseActionEngine, PoseActionRule, RuleConfig};
use crate::error::ConfigError;
use crate::hand::gesture::{GestureClassifier, GestureConfig};
use crate::hand::tracking::{HandTracker, TrackerConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub gesture: GestureConfig,
    pub pose_actions: Vec<RuleConfig>,
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = json.parse()?;
        log::debug!(
            "loaded {} with {} pose actions",
            path.display(),
            config.pose_actions.len()
        );
        Ok(config)
    }

    /// Checks all settings and returns the validated rules.
    pub fn rules(&self) -> Result<Vec<PoseActionRule>, ConfigError> {
        self.tracker.validate()?;
        self.pose_actions.iter().map(RuleConfig::validate).collect()
    }

    pub fn tracker(&self) -> HandTracker {
        HandTracker::new(
            self.tracker.clone(),
            GestureClassifier::new(self.gesture.clone()),
        )
    }

    pub fn engine(&self) -> Result<PoseActionEngine, ConfigError> {
        PoseActionEngine::new(self.rules()?)
    }
}

/// Parses and validates a configuration.
impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(json: &str) -> Result<Self, Self::Err> {
        let config: Config = serde_json::from_str(json)?;
        config.engine()?;
        Ok(config)
    }
}
