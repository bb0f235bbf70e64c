//! Reference clock implementations.

use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use framelock_core::{
    FrameRate, FrameTime, FrameTimeWithRate, SharedTimecodeSource, SourceId, StandardFrameRate,
    TimecodeSource,
};

use crate::SimulatedClock;

/// Reference clock that reports the local wall-clock time of day.
///
/// The reading restarts from zero at midnight, matching how timecode
/// generators free-run against a daily timeline.
pub struct SystemClockTimecodeSource {
    id: SourceId,
    name: String,
    frame_rate: FrameRate,
}

impl SystemClockTimecodeSource {
    /// Creates a wall clock counting at the given rate.
    pub fn new(name: impl Into<String>, frame_rate: FrameRate) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            frame_rate,
        }
    }
}

impl Default for SystemClockTimecodeSource {
    fn default() -> Self {
        Self::new("system clock", StandardFrameRate::Fps24.rate())
    }
}

impl TimecodeSource for SystemClockTimecodeSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn current_time(&self) -> Option<FrameTimeWithRate> {
        let now = chrono::Local::now();
        let seconds =
            f64::from(now.num_seconds_from_midnight()) + f64::from(now.nanosecond()) * 1e-9;
        Some(FrameTimeWithRate::from_seconds(seconds, self.frame_rate))
    }
}

/// Host-stepped reference clock for simulations and tests.
///
/// Reports whatever time it was last told; [`ManualTimecodeSource::advance`]
/// and friends move it forward. A cleared clock reports no signal.
pub struct ManualTimecodeSource {
    id: SourceId,
    name: String,
    frame_rate: FrameRate,
    time: Option<FrameTime>,
}

impl ManualTimecodeSource {
    /// Creates a clock with no signal yet.
    pub fn new(name: impl Into<String>, frame_rate: FrameRate) -> Self {
        Self {
            id: SourceId::new(),
            name: name.into(),
            frame_rate,
            time: None,
        }
    }

    /// Jumps the clock to `time`.
    pub fn set_time(&mut self, time: FrameTime) {
        self.time = Some(time);
    }

    /// Drops the signal; the clock reports no current time until set again.
    pub fn clear_time(&mut self) {
        self.time = None;
    }

    /// Moves the clock forward by a frame count. No-op without a signal.
    pub fn advance(&mut self, frames: FrameTime) {
        if let Some(time) = self.time {
            self.time = Some(time + frames);
        }
    }

    /// Moves the clock forward by wall seconds converted at the clock rate.
    pub fn advance_seconds(&mut self, seconds: f64) {
        if !self.frame_rate.is_valid() {
            return;
        }
        self.advance(FrameTime::from_f64(seconds * self.frame_rate.as_f64()));
    }
}

impl TimecodeSource for ManualTimecodeSource {
    fn id(&self) -> SourceId {
        self.id
    }

    fn display_name(&self) -> &str {
        &self.name
    }

    fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    fn current_time(&self) -> Option<FrameTimeWithRate> {
        self.time
            .map(|time| FrameTimeWithRate::new(time, self.frame_rate))
    }
}

/// Parameters for building a [`ManualClock`] from a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualClockConfig {
    /// Rate the clock counts in.
    #[serde(default = "default_manual_rate")]
    pub frame_rate: FrameRate,

    /// Frame the clock starts from.
    #[serde(default)]
    pub start_frame: i32,
}

fn default_manual_rate() -> FrameRate {
    StandardFrameRate::Fps30.rate()
}

impl Default for ManualClockConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_manual_rate(),
            start_frame: 0,
        }
    }
}

/// Parameters for building a [`SystemClock`] from a scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemClockConfig {
    /// Rate the clock counts in.
    #[serde(default = "default_system_rate")]
    pub frame_rate: FrameRate,
}

fn default_system_rate() -> FrameRate {
    StandardFrameRate::Fps24.rate()
}

impl Default for SystemClockConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_system_rate(),
        }
    }
}

/// Simulation driver that owns a shared [`ManualTimecodeSource`].
///
/// Each [`tick`](SimulatedClock::tick) advances the clock by the elapsed
/// seconds, so simulated runs finish as fast as the host can step them.
pub struct ManualClock {
    inner: Rc<RefCell<ManualTimecodeSource>>,
}

impl ManualClock {
    /// Creates a clock starting at frame zero.
    pub fn new(name: impl Into<String>, frame_rate: FrameRate) -> Self {
        Self::starting_at(name, frame_rate, FrameTime::new(0))
    }

    /// Creates a clock starting at `time`.
    pub fn starting_at(name: impl Into<String>, frame_rate: FrameRate, time: FrameTime) -> Self {
        let mut source = ManualTimecodeSource::new(name, frame_rate);
        source.set_time(time);
        Self {
            inner: Rc::new(RefCell::new(source)),
        }
    }

    /// Creates a clock from scenario parameters.
    pub fn from_config(name: impl Into<String>, config: ManualClockConfig) -> Self {
        Self::starting_at(name, config.frame_rate, FrameTime::new(config.start_frame))
    }

    /// Direct handle, for hosts that need to force or drop the signal.
    pub fn handle(&self) -> Rc<RefCell<ManualTimecodeSource>> {
        Rc::clone(&self.inner)
    }
}

impl SimulatedClock for ManualClock {
    fn timecode_source(&self) -> SharedTimecodeSource {
        Rc::clone(&self.inner) as SharedTimecodeSource
    }

    fn tick(&mut self, elapsed_seconds: f64) {
        self.inner.borrow_mut().advance_seconds(elapsed_seconds);
    }
}

/// Simulation driver that owns a shared [`SystemClockTimecodeSource`].
///
/// Time flows on its own here, so each tick sleeps until the elapsed
/// seconds have genuinely passed.
pub struct SystemClock {
    inner: Rc<RefCell<SystemClockTimecodeSource>>,
}

impl SystemClock {
    /// Creates a wall-clock driver counting at the given rate.
    pub fn new(name: impl Into<String>, frame_rate: FrameRate) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SystemClockTimecodeSource::new(
                name, frame_rate,
            ))),
        }
    }

    /// Creates a clock from scenario parameters.
    pub fn from_config(name: impl Into<String>, config: SystemClockConfig) -> Self {
        Self::new(name, config.frame_rate)
    }

    /// Direct handle to the underlying clock.
    pub fn handle(&self) -> Rc<RefCell<SystemClockTimecodeSource>> {
        Rc::clone(&self.inner)
    }
}

impl SimulatedClock for SystemClock {
    fn timecode_source(&self) -> SharedTimecodeSource {
        Rc::clone(&self.inner) as SharedTimecodeSource
    }

    fn tick(&mut self, elapsed_seconds: f64) {
        if elapsed_seconds > 0.0 {
            thread::sleep(Duration::from_secs_f64(elapsed_seconds));
        }
    }
}
