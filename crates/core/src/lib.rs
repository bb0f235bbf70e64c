//! Framelock Core - Multi-source timecode synchronization engine
//!
//! This crate aligns independently-clocked sample streams against one
//! reference clock so a host can read a temporally coherent set of samples
//! once per tick.
//!
//! # Architecture
//!
//! Framelock-core is a pure, single-threaded library built from small layers:
//! - [`timecode`] holds the frame-time primitives: rational [`FrameRate`]s,
//!   positions ([`FrameTime`], [`FrameTimeWithRate`]) and SMPTE
//!   [`Timecode`] labels with drop-frame support
//! - [`buffer`] provides [`TimedDataBuffer`], a monotonic ring of timed
//!   samples with a four-way lookup status
//! - [`source`] defines the [`TimedDataSource`] and [`TimecodeSource`]
//!   contracts device adapters implement
//! - [`synchronizer`] drives every registered source to present one
//!   delay-compensated time per tick
//! - [`calibration`] discovers the delay and per-source buffer sizes from
//!   live source behavior, one resumable step at a time
//!
//! Device adapters and clocks live in separate crates that depend on this
//! one and implement the [`source`] traits.
//!
//! # Example
//!
//! ```
//! use framelock_core::{FrameRate, FrameTime, TimedDataBuffer, TimedSampleStatus};
//!
//! let mut buffer = TimedDataBuffer::new(FrameRate::new(30, 1));
//! for frame in 10..=12 {
//!     buffer.add_in_rate(FrameTime::new(frame), frame);
//! }
//!
//! let (status, value) = buffer.try_get_sample(FrameTime::new(11));
//! assert_eq!(status, TimedSampleStatus::Ok);
//! assert_eq!(value, Some(&11));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod calibration;
pub mod error;
pub mod source;
pub mod synchronizer;
pub mod timecode;

pub use buffer::{TimedDataBuffer, TimedSample, TimedSampleStatus, DEFAULT_BUFFER_CAPACITY};
pub use calibration::{CalibrationConfig, CalibrationResult, CalibrationStatus, Calibrator};
pub use error::{Error, Result};
pub use source::{
    SharedDataSource, SharedTimecodeSource, SourceId, SynchronizerId, TimecodeSource,
    TimedDataSource,
};
pub use synchronizer::{StatusSummary, Synchronizer};
pub use timecode::{
    FrameRate, FrameTime, FrameTimeWithRate, StandardFrameRate, Subframe, Timecode,
    DEFAULT_SUBFRAME_RESOLUTION,
};

/// Initialize logging for hosts that have no tracing subscriber of their own.
///
/// This should be called once at startup.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("framelock core initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        // Should not panic
        init().ok();
    }
}
