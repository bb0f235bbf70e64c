//! Framelock Sources - Reference clocks and data sources
//!
//! Ready-made implementations of the `framelock-core` source traits, for
//! hosts that want working clocks and sample streams without writing a
//! device adapter first.
//!
//! # Architecture
//!
//! - [`buffered`] provides [`BufferedDataSource`], the buffer-backed chassis
//!   every source in this crate delegates to
//! - [`clock`] provides the wall-clock and host-stepped reference clocks
//! - [`synthetic`] generates samples with configurable latency, jitter and
//!   dropout
//! - [`scripted`] replays an explicit list of deliveries
//! - [`registry`] maps source kind names to factories so scenario files can
//!   build all of the above from JSON parameters
//!
//! Simulated time is driven through two small traits defined here:
//! [`SimulatedClock`] steps a reference clock, [`SimulatedSource`] delivers
//! the samples that would have arrived by the clock's current position. A
//! host ticks the clock, advances every source, then lets the synchronizer
//! present or calibrate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffered;
pub mod clock;
pub mod registry;
pub mod scripted;
pub mod synthetic;

pub use buffered::BufferedDataSource;
pub use clock::{
    ManualClock, ManualClockConfig, ManualTimecodeSource, SystemClock, SystemClockConfig,
    SystemClockTimecodeSource,
};
pub use registry::SourceRegistry;
pub use scripted::{ScriptedDataSource, ScriptedSample, ScriptedSourceConfig};
pub use synthetic::{SyntheticDataSource, SyntheticSourceConfig};

use std::fmt;

use framelock_core::{FrameTimeWithRate, SharedDataSource, SharedTimecodeSource};

/// A reference clock a host can drive through simulated or real time.
pub trait SimulatedClock {
    /// Shared handle to hand to a synchronizer.
    fn timecode_source(&self) -> SharedTimecodeSource;

    /// Advances the clock by one tick of `elapsed_seconds`.
    ///
    /// Host-stepped clocks move their reported time forward; wall clocks
    /// wait for the time to pass on its own.
    fn tick(&mut self, elapsed_seconds: f64);
}

impl fmt::Debug for dyn SimulatedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn SimulatedClock")
    }
}

/// A data source that produces samples as time advances.
pub trait SimulatedSource {
    /// Shared handle to register with a synchronizer.
    fn data_source(&self) -> SharedDataSource;

    /// Delivers every sample that would have arrived by `now`.
    fn advance(&mut self, now: &FrameTimeWithRate);
}

impl fmt::Debug for dyn SimulatedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn SimulatedSource")
    }
}
