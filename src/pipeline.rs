//! The per-frame scheduler tying the tracker, the classifier and the pose-action engine together.

use std::time::Instant;

use crate::action::{dispatch::Dispatcher, PoseActionEngine, PoseEvent};
use crate::backend::{InferenceBackend, UpstreamError};
use crate::config::Config;
use crate::error::ConfigError;
use crate::hand::tracking::{CycleOutcome, HandTracker};
use crate::timer::{FpsCounter, Timer};

/// Everything that happened in one frame.
#[derive(Debug, Clone)]
pub struct Step {
    pub timestamp: Instant,
    pub outcome: CycleOutcome,
    pub events: Vec<PoseEvent>,
}

/// A tracking session over the frames of an [`InferenceBackend`].
///
/// Every [`Session::step`] processes one frame: it asks the tracker to run one cycle, feeds the
/// result into the pose-action engine, and dispatches the resulting events with the session state
/// `S`.
pub struct Session<B, S> {
    backend: B,
    tracker: HandTracker,
    engine: PoseActionEngine,
    dispatcher: Dispatcher<S>,
    state: S,
    fps: FpsCounter,
    t_track: Timer,
    t_actions: Timer,
}

impl<B: InferenceBackend, S> Session<B, S> {
    /// Creates a session from its parts.
    ///
    /// Fails if a rule's callback is not known to `dispatcher`.
    pub fn new(
        backend: B,
        tracker: HandTracker,
        engine: PoseActionEngine,
        dispatcher: Dispatcher<S>,
        state: S,
    ) -> Result<Self, ConfigError> {
        dispatcher.check_rules(engine.rules())?;
        Ok(Self {
            backend,
            tracker,
            engine,
            dispatcher,
            state,
            fps: FpsCounter::new("session"),
            t_track: Timer::new("track"),
            t_actions: Timer::new("actions"),
        })
    }

    /// Creates a session from a configuration.
    pub fn from_config(
        backend: B,
        config: &Config,
        dispatcher: Dispatcher<S>,
        state: S,
    ) -> Result<Self, ConfigError> {
        Self::new(backend, config.tracker(), config.engine()?, dispatcher, state)
    }

    pub fn tracker(&self) -> &HandTracker {
        &self.tracker
    }

    pub fn engine(&self) -> &PoseActionEngine {
        &self.engine
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }

    /// Processes the next frame.
    ///
    /// Errors from the backend end the session, and are returned as-is.
    pub fn step(&mut self) -> Result<Step, UpstreamError> {
        let timestamp = self.backend.next_frame()?;

        let (tracker, backend) = (&mut self.tracker, &mut self.backend);
        let outcome = self.t_track.time(|| tracker.cycle(backend))?;

        let (engine, dispatcher, state) = (&mut self.engine, &mut self.dispatcher, &mut self.state);
        let events = self.t_actions.time(|| {
            let events = engine.update(timestamp, outcome.observation());
            dispatcher.dispatch_all(state, &events);
            events
        });

        self.fps.tick_with(timestamp, [&self.t_track, &self.t_actions]);
        Ok(Step {
            timestamp,
            outcome,
            events,
        })
    }

    /// Processes frames until the backend runs out of them.
    ///
    /// Calls `on_step` after every frame. Returns the number of frames processed.
    pub fn run<F>(&mut self, mut on_step: F) -> Result<u64, UpstreamError>
    where
        F: FnMut(&Step),
    {
        let mut frames = 0;
        loop {
            match self.step() {
                Ok(step) => {
                    frames += 1;
                    on_step(&step);
                }
                Err(UpstreamError::Exhausted) => {
                    log::debug!("frame source exhausted after {frames} frames");
                    return Ok(frames);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
