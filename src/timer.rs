//! Performance measurement tools.

use std::{
    cell::Cell,
    fmt,
    time::{Duration, Instant},
};

/// Measures how long an operation takes, on average.
///
/// Collected timings are reset when the timer is displayed using `{}` ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    count: Cell<u32>,
    total: Cell<Duration>,
    max: Cell<Duration>,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            count: Cell::new(0),
            total: Cell::new(Duration::ZERO),
            max: Cell::new(Duration::ZERO),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&mut self, timee: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = timee();
        self.record(start.elapsed());
        result
    }

    /// Records an externally measured duration.
    pub fn record(&mut self, duration: Duration) {
        *self.count.get_mut() += 1;
        *self.total.get_mut() += duration;
        let max = self.max.get_mut();
        *max = (*max).max(duration);
    }

    /// Number of durations recorded since the timer was last displayed.
    pub fn count(&self) -> u32 {
        self.count.get()
    }

    /// Average of the durations recorded since the timer was last displayed.
    pub fn average(&self) -> Option<Duration> {
        match self.count.get() {
            0 => None,
            n => Some(self.total.get() / n),
        }
    }
}

/// Displays the average and maximum recorded time and resets them.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.count.replace(0);
        let total = self.total.replace(Duration::ZERO);
        let max = self.max.replace(Duration::ZERO);
        if count == 0 {
            return write!(f, "{}: -", self.name);
        }

        let avg_ms = total.as_secs_f32() * 1000.0 / count as f32;
        let max_ms = max.as_secs_f32() * 1000.0;
        write!(f, "{}: {count}x{avg_ms:.01}ms (max {max_ms:.01}ms)", self.name)
    }
}

/// Logs the frame rate of a stream, along with optional extra data.
///
/// The rate is computed from the frames' capture instants, so it reflects the rate of the stream
/// rather than the speed it is processed at.
pub struct FpsCounter {
    name: String,
    frames: u32,
    window_start: Option<Instant>,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            window_start: None,
        }
    }

    /// Counts a frame captured at `at` and logs the frame rate if a second has passed.
    pub fn tick(&mut self, at: Instant) {
        self.tick_with(at, std::iter::empty::<&Timer>());
    }

    /// Counts a frame captured at `at` and logs the frame rate and `extra` if a second has
    /// passed.
    pub fn tick_with<D, I>(&mut self, at: Instant, extra: I)
    where
        D: fmt::Display,
        I: IntoIterator<Item = D>,
    {
        let start = *self.window_start.get_or_insert(at);
        self.frames += 1;

        let elapsed = at.saturating_duration_since(start);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames as f32 / elapsed.as_secs_f32();
            let extra = extra
                .into_iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>();
            if extra.is_empty() {
                log::debug!("{}: {:.1} FPS", self.name, fps);
            } else {
                log::debug!("{}: {:.1} FPS ({})", self.name, fps, extra.join(", "));
            }

            self.frames = 0;
            self.window_start = Some(at);
        }
    }
}
