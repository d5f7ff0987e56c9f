//! Pose-action rules and their configuration format.

use std::{fmt, str::FromStr, time::Duration};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::hand::gesture::Gesture;
use crate::hand::landmark::Handedness;

/// Which hand a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandSide {
    Left,
    Right,
    Any,
}

impl HandSide {
    pub fn matches(&self, hand: Handedness) -> bool {
        match self {
            HandSide::Any => true,
            HandSide::Left => hand == Handedness::Left,
            HandSide::Right => hand == Handedness::Right,
        }
    }
}

impl FromStr for HandSide {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(HandSide::Left),
            "right" => Ok(HandSide::Right),
            "any" => Ok(HandSide::Any),
            _ => Err(ConfigError::UnknownHand(s.to_string())),
        }
    }
}

/// When a rule produces events while its pose is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerMode {
    /// Once, after the pose has been held for the first trigger delay.
    Immediate,
    /// Like [`TriggerMode::Immediate`], plus once more when the pose ends.
    EnterLeave,
    /// After the first trigger delay, then repeatedly every `next_trigger_delay`.
    Periodic,
    /// On every frame the pose is held.
    Continuous,
}

impl FromStr for TriggerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enter" | "immediate" => Ok(TriggerMode::Immediate),
            "enter_leave" => Ok(TriggerMode::EnterLeave),
            "periodic" => Ok(TriggerMode::Periodic),
            "continuous" => Ok(TriggerMode::Continuous),
            _ => Err(ConfigError::UnknownTrigger(s.to_string())),
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerMode::Immediate => "enter",
            TriggerMode::EnterLeave => "enter_leave",
            TriggerMode::Periodic => "periodic",
            TriggerMode::Continuous => "continuous",
        })
    }
}

fn default_hand() -> String {
    "any".into()
}

fn default_trigger() -> String {
    "enter".into()
}

/// A pose-action rule as written in a configuration file.
///
/// ```json
/// {"name": "trackbar", "pose": "TRACK", "hand": "right", "callback": "trackbar",
///  "trigger": "periodic", "first_trigger_delay": 0.5, "next_trigger_delay": 0.3}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub name: String,
    pub pose: String,
    #[serde(default = "default_hand")]
    pub hand: String,
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(default = "default_trigger")]
    pub trigger: String,
    /// Seconds.
    #[serde(default)]
    pub first_trigger_delay: f64,
    /// Seconds.
    #[serde(default)]
    pub next_trigger_delay: Option<f64>,
    #[serde(default)]
    pub max_missing_frames: u32,
}

impl RuleConfig {
    /// Checks the rule and converts it into a [`PoseActionRule`].
    pub fn validate(&self) -> Result<PoseActionRule, ConfigError> {
        let gesture: Gesture = self.pose.parse()?;
        let hand: HandSide = self.hand.parse()?;
        let trigger: TriggerMode = self.trigger.parse()?;
        let first_trigger_delay = self.seconds("first_trigger_delay", self.first_trigger_delay)?;
        let next_trigger_delay = match self.next_trigger_delay {
            Some(secs) => self.seconds("next_trigger_delay", secs)?,
            None => Duration::ZERO,
        };

        let rule = PoseActionRule {
            name: self.name.clone(),
            gesture,
            hand,
            trigger,
            first_trigger_delay,
            next_trigger_delay,
            callback: self.callback.clone(),
            max_missing_frames: self.max_missing_frames,
        };
        rule.check_interval()?;
        Ok(rule)
    }

    fn seconds(&self, field: &'static str, value: f64) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(value).map_err(|_| ConfigError::InvalidDelay {
            rule: self.name.clone(),
            field,
            value,
        })
    }
}

/// A validated pose-action rule.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseActionRule {
    name: String,
    gesture: Gesture,
    hand: HandSide,
    trigger: TriggerMode,
    first_trigger_delay: Duration,
    next_trigger_delay: Duration,
    callback: Option<String>,
    max_missing_frames: u32,
}

impl PoseActionRule {
    /// Creates a rule that applies to any hand, without delays or callback.
    pub fn new<N: Into<String>>(name: N, gesture: Gesture, trigger: TriggerMode) -> Self {
        Self {
            name: name.into(),
            gesture,
            hand: HandSide::Any,
            trigger,
            first_trigger_delay: Duration::ZERO,
            next_trigger_delay: Duration::ZERO,
            callback: None,
            max_missing_frames: 0,
        }
    }

    pub fn with_hand(mut self, hand: HandSide) -> Self {
        self.hand = hand;
        self
    }

    /// Sets how long the pose has to be held before the first event.
    pub fn with_first_trigger_delay(mut self, delay: Duration) -> Self {
        self.first_trigger_delay = delay;
        self
    }

    /// Sets the interval between events of a [`TriggerMode::Periodic`] rule.
    pub fn with_next_trigger_delay(mut self, delay: Duration) -> Self {
        self.next_trigger_delay = delay;
        self
    }

    pub fn with_callback<C: Into<String>>(mut self, callback: C) -> Self {
        self.callback = Some(callback.into());
        self
    }

    /// Sets how many consecutive frames the pose may be missing before the rule considers it
    /// ended.
    pub fn with_max_missing_frames(mut self, frames: u32) -> Self {
        self.max_missing_frames = frames;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gesture(&self) -> Gesture {
        self.gesture
    }

    pub fn hand(&self) -> HandSide {
        self.hand
    }

    pub fn trigger(&self) -> TriggerMode {
        self.trigger
    }

    pub fn first_trigger_delay(&self) -> Duration {
        self.first_trigger_delay
    }

    pub fn next_trigger_delay(&self) -> Duration {
        self.next_trigger_delay
    }

    pub fn callback(&self) -> Option<&str> {
        self.callback.as_deref()
    }

    pub fn max_missing_frames(&self) -> u32 {
        self.max_missing_frames
    }

    /// Returns whether a pose satisfies this rule's condition.
    pub fn matches(&self, gesture: Gesture, hand: Handedness) -> bool {
        self.gesture == gesture && self.hand.matches(hand)
    }

    pub(crate) fn check_interval(&self) -> Result<(), ConfigError> {
        if self.trigger == TriggerMode::Periodic && self.next_trigger_delay.is_zero() {
            return Err(ConfigError::MissingInterval(self.name.clone()));
        }
        Ok(())
    }
}
