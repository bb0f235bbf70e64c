//! Synthetic sample generator with latency, jitter and dropout.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use framelock_core::{
    FrameRate, FrameTime, FrameTimeWithRate, SharedDataSource, StandardFrameRate, TimedDataSource,
};

use crate::{BufferedDataSource, SimulatedSource};

/// Configuration for a [`SyntheticDataSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticSourceConfig {
    /// Rate the source stamps samples in.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: FrameRate,

    /// Fixed delivery latency, in source frames.
    #[serde(default = "default_latency_frames")]
    pub latency_frames: u32,

    /// Uniform arrival jitter amplitude, in source frames.
    #[serde(default)]
    pub jitter_frames: f64,

    /// Probability in `[0, 1]` that a produced sample is lost in transit.
    #[serde(default)]
    pub dropout: f64,

    /// Seed for the jitter and dropout draws.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// First frame the generator produces.
    #[serde(default)]
    pub start_frame: i32,

    /// Offset applied when the source presents.
    #[serde(default)]
    pub presentation_offset_frames: i32,

    /// Smallest buffer size calibration may apply.
    #[serde(default)]
    pub min_buffer_size: Option<usize>,

    /// Largest buffer size calibration may apply.
    #[serde(default)]
    pub max_buffer_size: Option<usize>,
}

fn default_frame_rate() -> FrameRate {
    StandardFrameRate::Fps30.rate()
}

fn default_latency_frames() -> u32 {
    3
}

fn default_seed() -> u64 {
    7
}

impl Default for SyntheticSourceConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            latency_frames: default_latency_frames(),
            jitter_frames: 0.0,
            dropout: 0.0,
            seed: default_seed(),
            start_frame: 0,
            presentation_offset_frames: 0,
            min_buffer_size: None,
            max_buffer_size: None,
        }
    }
}

/// Generates one sample per source frame and delivers it after a simulated
/// transport delay.
///
/// A frame `f` arrives at source time `f + latency ± jitter`. Deliveries
/// happen in arrival order, so jitter above half a frame produces genuine
/// reordering and the buffer's monotonic policy discards the stamps that
/// show up late. Sample values are the stamped frame numbers.
pub struct SyntheticDataSource {
    config: SyntheticSourceConfig,
    inner: Rc<RefCell<BufferedDataSource<i64>>>,
    rng: StdRng,
    next_frame: i32,
    pending: Vec<PendingSample>,
}

struct PendingSample {
    arrival: f64,
    frame: i32,
}

impl SyntheticDataSource {
    /// Creates a generator from its configuration.
    pub fn new(name: impl Into<String>, config: SyntheticSourceConfig) -> Self {
        let mut source = BufferedDataSource::new(name, config.frame_rate)
            .with_buffer_bounds(config.min_buffer_size, config.max_buffer_size);
        source.set_presentation_offset(FrameTime::new(config.presentation_offset_frames));
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            next_frame: config.start_frame,
            pending: Vec::new(),
            inner: Rc::new(RefCell::new(source)),
            config,
        }
    }

    /// Direct handle to the chassis, for reading buffered values.
    pub fn handle(&self) -> Rc<RefCell<BufferedDataSource<i64>>> {
        Rc::clone(&self.inner)
    }
}

impl SimulatedSource for SyntheticDataSource {
    fn data_source(&self) -> SharedDataSource {
        Rc::clone(&self.inner) as SharedDataSource
    }

    fn advance(&mut self, now: &FrameTimeWithRate) {
        let local_now = now.remap(self.config.frame_rate).time.to_f64();
        let latency = f64::from(self.config.latency_frames);
        let jitter = self.config.jitter_frames.max(0.0);

        // Produce every frame whose earliest possible arrival has passed.
        while f64::from(self.next_frame) + latency - jitter <= local_now {
            let frame = self.next_frame;
            if frame == i32::MAX {
                break;
            }
            self.next_frame += 1;
            if self.config.dropout > 0.0 && self.rng.gen_bool(self.config.dropout.clamp(0.0, 1.0))
            {
                trace!(frame, "sample lost in transit");
                continue;
            }
            let spread = if jitter > 0.0 {
                self.rng.gen_range(-jitter..=jitter)
            } else {
                0.0
            };
            self.pending.push(PendingSample {
                arrival: f64::from(frame) + latency + spread,
                frame,
            });
        }

        // Deliver in arrival order; stale stamps fall to the monotonic policy.
        self.pending.sort_by(|a, b| a.arrival.total_cmp(&b.arrival));
        let arrived = self
            .pending
            .iter()
            .take_while(|sample| sample.arrival <= local_now)
            .count();
        let mut inner = self.inner.borrow_mut();
        for sample in self.pending.drain(..arrived) {
            inner.add_sample(FrameTime::new(sample.frame), i64::from(sample.frame));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_30(frame: i32) -> FrameTimeWithRate {
        FrameTimeWithRate::new(FrameTime::new(frame), FrameRate::new(30, 1))
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: SyntheticSourceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.frame_rate, FrameRate::new(30, 1));
        assert_eq!(config.latency_frames, 3);
        assert_eq!(config.jitter_frames, 0.0);
        assert_eq!(config.dropout, 0.0);
        assert_eq!(config.start_frame, 0);
        assert_eq!(config.presentation_offset_frames, 0);
        assert_eq!(config.min_buffer_size, None);
        assert_eq!(config.max_buffer_size, None);
    }

    #[test]
    fn test_latency_defers_arrival() {
        let mut source = SyntheticDataSource::new("cam", SyntheticSourceConfig::default());

        source.advance(&at_30(2));
        assert!(source.handle().borrow().buffer().is_empty());

        source.advance(&at_30(10));
        let handle = source.data_source();
        let range = handle.borrow().buffer_range().unwrap();
        assert_eq!(range, (FrameTime::new(3), FrameTime::new(7)));
    }

    #[test]
    fn test_advance_is_incremental() {
        let mut source = SyntheticDataSource::new("cam", SyntheticSourceConfig::default());
        for frame in 0..=20 {
            source.advance(&at_30(frame));
        }
        let mut single = SyntheticDataSource::new("cam", SyntheticSourceConfig::default());
        single.advance(&at_30(20));

        let a = source.handle();
        let b = single.handle();
        assert_eq!(
            a.borrow().buffer_range(),
            b.borrow().buffer_range(),
            "stepped and one-shot advances deliver the same frames"
        );
    }

    #[test]
    fn test_same_seed_reproduces_the_stream() {
        let config = SyntheticSourceConfig {
            latency_frames: 2,
            jitter_frames: 0.8,
            dropout: 0.25,
            seed: 42,
            ..Default::default()
        };
        let mut first = SyntheticDataSource::new("a", config.clone());
        let mut second = SyntheticDataSource::new("b", config);

        for frame in [10, 25, 40] {
            first.advance(&at_30(frame));
            second.advance(&at_30(frame));
        }

        let a = first.handle();
        let b = second.handle();
        let frames_of = |source: &BufferedDataSource<i64>| {
            source
                .buffer()
                .iter()
                .map(|sample| sample.time)
                .collect::<Vec<_>>()
        };
        assert!(!a.borrow().buffer().is_empty());
        assert_eq!(frames_of(&a.borrow()), frames_of(&b.borrow()));
    }

    #[test]
    fn test_total_dropout_loses_everything() {
        let config = SyntheticSourceConfig {
            latency_frames: 0,
            dropout: 1.0,
            ..Default::default()
        };
        let mut source = SyntheticDataSource::new("cam", config);
        source.advance(&at_30(20));
        assert!(source.handle().borrow().buffer().is_empty());
    }

    #[test]
    fn test_advance_remaps_the_clock_rate() {
        let mut source = SyntheticDataSource::new("cam", SyntheticSourceConfig::default());
        let now = FrameTimeWithRate::new(FrameTime::new(20), FrameRate::new(60, 1));
        source.advance(&now);

        let handle = source.handle();
        let newest = handle.borrow().buffer().newest().map(|sample| sample.time);
        assert_eq!(newest, Some(FrameTime::new(7)), "local now is frame 10");
    }

    #[test]
    fn test_config_flows_to_the_chassis() {
        let config = SyntheticSourceConfig {
            presentation_offset_frames: 2,
            min_buffer_size: Some(2),
            max_buffer_size: Some(4),
            ..Default::default()
        };
        let source = SyntheticDataSource::new("cam", config);
        let handle = source.data_source();
        let source = handle.borrow();
        assert_eq!(source.presentation_offset(), FrameTime::new(2));
        assert_eq!(source.min_buffer_size(), Some(2));
        assert_eq!(source.max_buffer_size(), Some(4));
        assert_eq!(source.buffer_size(), 4, "default capacity clamped to max");
    }
}
