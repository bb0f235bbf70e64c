//! Scripted sample deliveries for deterministic scenarios.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use framelock_core::{
    FrameRate, FrameTime, FrameTimeWithRate, SharedDataSource, StandardFrameRate, TimedDataSource,
};

use crate::{BufferedDataSource, SimulatedSource};

/// One scripted delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedSample {
    /// Source-rate frame at which the sample arrives.
    pub arrival: i32,

    /// Frame the sample is stamped with.
    pub frame: i32,
}

/// Configuration for a [`ScriptedDataSource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedSourceConfig {
    /// Rate the source stamps samples in.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: FrameRate,

    /// The deliveries to replay.
    #[serde(default)]
    pub samples: Vec<ScriptedSample>,

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

impl Default for ScriptedSourceConfig {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            samples: Vec::new(),
            presentation_offset_frames: 0,
            min_buffer_size: None,
            max_buffer_size: None,
        }
    }
}

/// Replays an explicit list of deliveries as time advances.
///
/// Deliveries happen in arrival order regardless of how the script was
/// written; a stamp older than what the buffer already holds is discarded
/// by the monotonic-write policy, exactly as a reordered network packet
/// would be. Sample values are the stamped frame numbers.
pub struct ScriptedDataSource {
    inner: Rc<RefCell<BufferedDataSource<i64>>>,
    samples: Vec<ScriptedSample>,
    cursor: usize,
}

impl ScriptedDataSource {
    /// Creates a source that will replay the configured script.
    pub fn new(name: impl Into<String>, config: ScriptedSourceConfig) -> Self {
        let mut source = BufferedDataSource::new(name, config.frame_rate)
            .with_buffer_bounds(config.min_buffer_size, config.max_buffer_size);
        source.set_presentation_offset(FrameTime::new(config.presentation_offset_frames));
        let mut samples = config.samples;
        samples.sort_by_key(|sample| sample.arrival);
        Self {
            inner: Rc::new(RefCell::new(source)),
            samples,
            cursor: 0,
        }
    }

    /// Direct handle to the chassis, for reading buffered values.
    pub fn handle(&self) -> Rc<RefCell<BufferedDataSource<i64>>> {
        Rc::clone(&self.inner)
    }

    /// True once every scripted delivery has happened.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.samples.len()
    }
}

impl SimulatedSource for ScriptedDataSource {
    fn data_source(&self) -> SharedDataSource {
        Rc::clone(&self.inner) as SharedDataSource
    }

    fn advance(&mut self, now: &FrameTimeWithRate) {
        let local = now.remap(self.inner.borrow().frame_rate());
        let mut inner = self.inner.borrow_mut();
        while let Some(sample) = self.samples.get(self.cursor) {
            if FrameTime::new(sample.arrival) > local.time {
                break;
            }
            inner.add_sample(FrameTime::new(sample.frame), i64::from(sample.frame));
            self.cursor += 1;
        }
    }
}
