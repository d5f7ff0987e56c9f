//! Turning recognized gestures into timed events.
//!
//! A [`PoseActionEngine`] holds a list of [`PoseActionRule`]s. Every rule names a gesture, the
//! hand it must be made with, and a [`TriggerMode`] that decides when events are emitted while
//! the gesture is held. Gesture recognition is noisy, so rules can require the gesture to be held
//! for a while before the first event fires, and can tolerate a few frames where it is missing.
//!
//! The engine is fed once per frame, and returns the events that fired in that frame. It does not
//! resolve conflicts between rules: if several rules match, all of them fire.

use std::{
    collections::HashSet,
    fmt,
    time::{Duration, Instant},
};

use crate::error::ConfigError;
use crate::hand::gesture::Gesture;
use crate::hand::landmark::Handedness;
use crate::hand::tracking::HandObservation;

pub mod dispatch;
pub mod rule;

pub use rule::{HandSide, PoseActionRule, RuleConfig, TriggerMode};

/// The kind of a [`PoseEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// The pose has been held for the rule's first trigger delay.
    Enter,
    /// A pose that caused an [`TriggerKind::Enter`] event has ended.
    Leave,
    /// Emitted repeatedly while a [`TriggerMode::Periodic`] rule's pose is held.
    Periodic,
    /// Emitted on every frame while a [`TriggerMode::Continuous`] rule's pose is held.
    Continuous,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TriggerKind::Enter => "enter",
            TriggerKind::Leave => "leave",
            TriggerKind::Periodic => "periodic",
            TriggerKind::Continuous => "continuous",
        })
    }
}

/// An event emitted by a [`PoseActionEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct PoseEvent {
    /// Name of the rule that fired.
    pub rule: String,
    /// Name of the callback configured on the rule.
    pub callback: Option<String>,
    pub gesture: Gesture,
    pub hand: Handedness,
    pub trigger: TriggerKind,
    pub timestamp: Instant,
    /// Thumb tip to index fingertip distance of the frame that caused the event.
    ///
    /// Not available for [`TriggerKind::Leave`] events.
    pub thumb_index_distance: Option<f32>,
}

/// The part of a [`HandObservation`] that pose-action rules look at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub gesture: Gesture,
    pub hand: Handedness,
    pub thumb_index_distance: Option<f32>,
}

impl Pose {
    pub fn new(gesture: Gesture, hand: Handedness) -> Self {
        Self {
            gesture,
            hand,
            thumb_index_distance: None,
        }
    }

    /// Extracts the pose from an observation. Returns [`None`] if no gesture was recognized.
    pub fn from_observation(obs: &HandObservation) -> Option<Self> {
        obs.gesture().map(|gesture| Self {
            gesture,
            hand: obs.hand(),
            thumb_index_distance: obs.thumb_index_distance(),
        })
    }
}

/// Tracks how long a rule's condition has been standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerTimer {
    start: Instant,
    last_fired: Option<Instant>,
    missed_frames: u32,
    hand: Handedness,
}

impl TriggerTimer {
    fn new(start: Instant, hand: Handedness) -> Self {
        Self {
            start,
            last_fired: None,
            missed_frames: 0,
            hand,
        }
    }

    /// The instant the rule's condition started standing.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// The instant of the last event fired by the rule, if any.
    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    pub fn has_fired(&self) -> bool {
        self.last_fired.is_some()
    }

    /// Number of consecutive frames the condition has not held.
    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    /// The hand of the last matching pose.
    pub fn hand(&self) -> Handedness {
        self.hand
    }

    /// Time the condition has been standing, at `now`.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.start)
    }
}

/// Evaluates [`PoseActionRule`]s against the stream of recognized poses.
#[derive(Debug)]
pub struct PoseActionEngine {
    rules: Vec<PoseActionRule>,
    timers: Vec<Option<TriggerTimer>>,
}

impl PoseActionEngine {
    /// Creates an engine evaluating `rules`.
    ///
    /// Fails if two rules share a name, or if a periodic rule has no repeat interval.
    pub fn new(rules: Vec<PoseActionRule>) -> Result<Self, ConfigError> {
        {
            let mut names = HashSet::new();
            for rule in &rules {
                rule.check_interval()?;
                if !names.insert(rule.name()) {
                    return Err(ConfigError::DuplicateRule(rule.name().to_string()));
                }
            }
        }

        let timers = vec![None; rules.len()];
        Ok(Self { rules, timers })
    }

    /// Validates rule configurations and creates an engine from them.
    pub fn from_configs(configs: &[RuleConfig]) -> Result<Self, ConfigError> {
        let rules = configs
            .iter()
            .map(RuleConfig::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[PoseActionRule] {
        &self.rules
    }

    /// Returns the timers of all rules whose condition currently stands.
    pub fn active_timers(&self) -> impl Iterator<Item = (&PoseActionRule, &TriggerTimer)> {
        self.rules
            .iter()
            .zip(&self.timers)
            .filter_map(|(rule, timer)| timer.as_ref().map(|timer| (rule, timer)))
    }

    /// Feeds the result of one frame to the engine.
    ///
    /// `obs` is [`None`] when no hand was found in the frame.
    pub fn update(&mut self, now: Instant, obs: Option<&HandObservation>) -> Vec<PoseEvent> {
        self.process(now, obs.and_then(Pose::from_observation))
    }

    /// Feeds the pose recognized in one frame to the engine, and returns the fired events.
    ///
    /// `pose` is [`None`] when no hand or no gesture was recognized. Frames must be passed in
    /// chronological order.
    pub fn process(&mut self, now: Instant, pose: Option<Pose>) -> Vec<PoseEvent> {
        let mut events = Vec::new();

        for (rule, slot) in self.rules.iter().zip(&mut self.timers) {
            let pose = pose.filter(|pose| rule.matches(pose.gesture, pose.hand));
            match pose {
                Some(pose) => {
                    let timer = slot.get_or_insert_with(|| {
                        log::trace!("rule `{}`: {} pose entered", rule.name(), rule.gesture());
                        TriggerTimer::new(now, pose.hand)
                    });
                    timer.missed_frames = 0;
                    timer.hand = pose.hand;
                    if let Some(trigger) = evaluate(rule, timer, now) {
                        timer.last_fired = Some(now);
                        let distance = pose.thumb_index_distance;
                        events.push(event(rule, trigger, pose.hand, now, distance));
                    }
                }
                None => {
                    let Some(timer) = slot.as_mut() else {
                        continue;
                    };
                    timer.missed_frames += 1;
                    if timer.missed_frames <= rule.max_missing_frames() {
                        continue;
                    }

                    log::trace!("rule `{}`: {} pose left", rule.name(), rule.gesture());
                    if rule.trigger() == TriggerMode::EnterLeave && timer.has_fired() {
                        events.push(event(rule, TriggerKind::Leave, timer.hand, now, None));
                    }
                    *slot = None;
                }
            }
        }

        events
    }
}

/// Decides whether a rule whose condition holds at `now` fires.
fn evaluate(rule: &PoseActionRule, timer: &TriggerTimer, now: Instant) -> Option<TriggerKind> {
    let held = timer.elapsed(now) >= rule.first_trigger_delay();
    match rule.trigger() {
        TriggerMode::Immediate | TriggerMode::EnterLeave => {
            (held && !timer.has_fired()).then_some(TriggerKind::Enter)
        }
        TriggerMode::Periodic => {
            let due = match timer.last_fired {
                None => held,
                Some(last) => now.saturating_duration_since(last) >= rule.next_trigger_delay(),
            };
            due.then_some(TriggerKind::Periodic)
        }
        TriggerMode::Continuous => Some(TriggerKind::Continuous),
    }
}

fn event(
    rule: &PoseActionRule,
    trigger: TriggerKind,
    hand: Handedness,
    timestamp: Instant,
    thumb_index_distance: Option<f32>,
) -> PoseEvent {
    log::debug!("rule `{}` fired: {} {}", rule.name(), rule.gesture(), trigger);
    PoseEvent {
        rule: rule.name().to_string(),
        callback: rule.callback().map(str::to_string),
        gesture: rule.gesture(),
        hand,
        trigger,
        timestamp,
        thumb_index_distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Clock(Instant);

    impl Clock {
        fn at(&self, millis: u64) -> Instant {
            self.0 + Duration::from_millis(millis)
        }
    }

    fn right(gesture: Gesture) -> Option<Pose> {
        Some(Pose::new(gesture, Handedness::Right))
    }

    /// Feeds `pose` to the engine every 100 ms in `[from, to)`, returning `(millis, trigger)` of
    /// all fired events.
    fn hold(
        engine: &mut PoseActionEngine,
        clock: &Clock,
        from: u64,
        to: u64,
        pose: Option<Pose>,
    ) -> Vec<(u64, TriggerKind)> {
        (from..to)
            .step_by(100)
            .flat_map(|ms| {
                engine
                    .process(clock.at(ms), pose)
                    .into_iter()
                    .map(move |ev| (ms, ev.trigger))
            })
            .collect()
    }

    #[test]
    fn immediate_fires_once() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("one", Gesture::One, TriggerMode::Immediate)
            .with_first_trigger_delay(Duration::from_millis(300));
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let events = hold(&mut engine, &clock, 0, 1000, right(Gesture::One));
        assert_eq!(events, [(300, TriggerKind::Enter)]);
    }

    #[test]
    fn immediate_released_early() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("one", Gesture::One, TriggerMode::Immediate)
            .with_first_trigger_delay(Duration::from_millis(300));
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        assert!(hold(&mut engine, &clock, 0, 300, right(Gesture::One)).is_empty());
        assert!(hold(&mut engine, &clock, 300, 400, right(Gesture::Two)).is_empty());
        // The timer restarts, so the pose has to be held for the full delay again.
        let events = hold(&mut engine, &clock, 400, 1000, right(Gesture::One));
        assert_eq!(events, [(700, TriggerKind::Enter)]);
    }

    #[test]
    fn periodic() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("trackbar", Gesture::Track, TriggerMode::Periodic)
            .with_first_trigger_delay(Duration::from_millis(500))
            .with_next_trigger_delay(Duration::from_millis(300));
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let events = hold(&mut engine, &clock, 0, 1200, right(Gesture::Track));
        let times: Vec<_> = events.iter().map(|&(ms, _)| ms).collect();
        assert_eq!(times, [500, 800, 1100]);
        assert!(events.iter().all(|&(_, t)| t == TriggerKind::Periodic));
    }

    #[test]
    fn periodic_restarts_after_loss() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("trackbar", Gesture::Track, TriggerMode::Periodic)
            .with_first_trigger_delay(Duration::from_millis(500))
            .with_next_trigger_delay(Duration::from_millis(300));
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let events = hold(&mut engine, &clock, 0, 900, right(Gesture::Track));
        assert_eq!(
            events,
            [(500, TriggerKind::Periodic), (800, TriggerKind::Periodic)]
        );
        assert!(hold(&mut engine, &clock, 900, 1000, None).is_empty());
        assert_eq!(engine.active_timers().count(), 0);

        let events = hold(&mut engine, &clock, 1000, 1600, right(Gesture::Track));
        assert_eq!(events, [(1500, TriggerKind::Periodic)]);
    }

    #[test]
    fn enter_leave() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("five", Gesture::Five, TriggerMode::EnterLeave)
            .with_first_trigger_delay(Duration::from_millis(200));
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let mut events = hold(&mut engine, &clock, 0, 500, right(Gesture::Five));
        events.extend(hold(&mut engine, &clock, 500, 700, None));
        assert_eq!(events, [(200, TriggerKind::Enter), (500, TriggerKind::Leave)]);
    }

    #[test]
    fn leave_reports_last_hand() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("five", Gesture::Five, TriggerMode::EnterLeave);
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let left = Some(Pose::new(Gesture::Five, Handedness::Left));
        let events = engine.process(clock.at(0), left);
        assert_eq!(events[0].hand, Handedness::Left);
        assert!(engine.process(clock.at(100), right(Gesture::Five)).is_empty());
        assert_eq!(
            engine.active_timers().next().map(|(_, t)| t.hand()),
            Some(Handedness::Right)
        );

        let events = engine.process(clock.at(200), None);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, TriggerKind::Leave);
        assert_eq!(events[0].hand, Handedness::Right);
    }

    #[test]
    fn leave_requires_enter() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("five", Gesture::Five, TriggerMode::EnterLeave)
            .with_first_trigger_delay(Duration::from_millis(200));
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let mut events = hold(&mut engine, &clock, 0, 200, right(Gesture::Five));
        events.extend(hold(&mut engine, &clock, 200, 400, right(Gesture::Fist)));
        assert!(events.is_empty());
    }

    #[test]
    fn continuous() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("point", Gesture::One, TriggerMode::Continuous)
            .with_first_trigger_delay(Duration::from_secs(10));
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let events = hold(&mut engine, &clock, 0, 300, right(Gesture::One));
        assert_eq!(
            events,
            [
                (0, TriggerKind::Continuous),
                (100, TriggerKind::Continuous),
                (200, TriggerKind::Continuous),
            ]
        );
    }

    #[test]
    fn hand_side() {
        let clock = Clock(Instant::now());
        let rules = vec![
            PoseActionRule::new("left", Gesture::Ok, TriggerMode::Immediate)
                .with_hand(HandSide::Left),
            PoseActionRule::new("right", Gesture::Ok, TriggerMode::Immediate)
                .with_hand(HandSide::Right),
            PoseActionRule::new("any", Gesture::Ok, TriggerMode::Immediate),
        ];
        let mut engine = PoseActionEngine::new(rules).unwrap();

        let events = engine.process(clock.at(0), Some(Pose::new(Gesture::Ok, Handedness::Left)));
        let names: Vec<_> = events.iter().map(|ev| ev.rule.as_str()).collect();
        assert_eq!(names, ["left", "any"]);
        assert!(events.iter().all(|ev| ev.hand == Handedness::Left));
    }

    #[test]
    fn hysteresis() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("five", Gesture::Five, TriggerMode::EnterLeave)
            .with_first_trigger_delay(Duration::from_millis(200))
            .with_max_missing_frames(2);
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let mut events = hold(&mut engine, &clock, 0, 100, right(Gesture::Five));
        // Two dropped frames are tolerated, and do not restart the timer.
        events.extend(hold(&mut engine, &clock, 100, 300, None));
        assert_eq!(engine.active_timers().next().unwrap().1.missed_frames(), 2);
        events.extend(hold(&mut engine, &clock, 300, 400, right(Gesture::Five)));
        assert_eq!(events, [(300, TriggerKind::Enter)]);

        // The third one ends the pose.
        events.extend(hold(&mut engine, &clock, 400, 700, None));
        assert_eq!(events, [(300, TriggerKind::Enter), (600, TriggerKind::Leave)]);
    }

    #[test]
    fn event_contents() {
        let clock = Clock(Instant::now());
        let rule = PoseActionRule::new("track", Gesture::Track, TriggerMode::Immediate)
            .with_callback("trackbar");
        let mut engine = PoseActionEngine::new(vec![rule]).unwrap();

        let pose = Pose {
            gesture: Gesture::Track,
            hand: Handedness::Left,
            thumb_index_distance: Some(0.25),
        };
        let events = engine.process(clock.at(40), Some(pose));
        assert_eq!(
            events,
            [PoseEvent {
                rule: "track".into(),
                callback: Some("trackbar".into()),
                gesture: Gesture::Track,
                hand: Handedness::Left,
                trigger: TriggerKind::Enter,
                timestamp: clock.at(40),
                thumb_index_distance: Some(0.25),
            }]
        );
    }

    #[test]
    fn overlapping_rules_all_fire() {
        let clock = Clock(Instant::now());
        let rules = vec![
            PoseActionRule::new("a", Gesture::Fist, TriggerMode::Immediate),
            PoseActionRule::new("b", Gesture::Fist, TriggerMode::Continuous),
        ];
        let mut engine = PoseActionEngine::new(rules).unwrap();
        assert_eq!(engine.process(clock.at(0), right(Gesture::Fist)).len(), 2);
    }

    #[test]
    fn invalid_rule_sets() {
        let rules = vec![
            PoseActionRule::new("a", Gesture::Fist, TriggerMode::Immediate),
            PoseActionRule::new("a", Gesture::Five, TriggerMode::Immediate),
        ];
        assert!(matches!(
            PoseActionEngine::new(rules),
            Err(ConfigError::DuplicateRule(name)) if name == "a"
        ));

        let rules = vec![PoseActionRule::new("p", Gesture::Fist, TriggerMode::Periodic)];
        assert!(matches!(
            PoseActionEngine::new(rules),
            Err(ConfigError::MissingInterval(_))
        ));
    }
}
