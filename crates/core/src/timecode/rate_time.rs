//! Rate-tagged frame times

use std::fmt;
use std::ops::{Add, Sub};

use super::{FrameRate, FrameTime, Timecode};

/// A [`FrameTime`] together with the [`FrameRate`] it is expressed in.
///
/// Reference clocks report their current position in this form so consumers
/// can remap it into their own rate without guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimeWithRate {
    /// The position.
    pub time: FrameTime,
    /// The rate the position is expressed in.
    pub rate: FrameRate,
}

impl FrameTimeWithRate {
    /// Tags a frame time with its rate.
    pub const fn new(time: FrameTime, rate: FrameRate) -> Self {
        Self { time, rate }
    }

    /// Builds a position from elapsed seconds at the given rate.
    pub fn from_seconds(seconds: f64, rate: FrameRate) -> Self {
        Self {
            time: FrameTime::from_f64(seconds * rate.as_f64()),
            rate,
        }
    }

    /// The position as elapsed seconds. Not meaningful for invalid rates.
    pub fn to_seconds(&self) -> f64 {
        self.time.to_f64() * self.rate.frame_interval()
    }

    /// Re-expresses the position in another rate.
    pub fn remap(&self, dst_rate: FrameRate) -> FrameTimeWithRate {
        FrameTimeWithRate {
            time: FrameTime::remap(self.time, self.rate, dst_rate),
            rate: dst_rate,
        }
    }

    /// The position as an absolute timecode label.
    pub fn to_timecode(&self) -> Timecode {
        Timecode::from_frame_time(self.rate, self.time)
    }
}

impl Add<FrameTime> for FrameTimeWithRate {
    type Output = FrameTimeWithRate;

    fn add(self, rhs: FrameTime) -> FrameTimeWithRate {
        FrameTimeWithRate {
            time: self.time + rhs,
            rate: self.rate,
        }
    }
}

impl Sub<FrameTime> for FrameTimeWithRate {
    type Output = FrameTimeWithRate;

    fn sub(self, rhs: FrameTime) -> FrameTimeWithRate {
        FrameTimeWithRate {
            time: self.time - rhs,
            rate: self.rate,
        }
    }
}

impl fmt::Display for FrameTimeWithRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {} fps", self.time, self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seconds() {
        let time = FrameTimeWithRate::from_seconds(2.0, FrameRate::new(30, 1));
        assert_eq!(time.time, FrameTime::new(60));
        assert!((time.to_seconds() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_remap_changes_rate_tag() {
        let time = FrameTimeWithRate::new(FrameTime::new(10), FrameRate::new(30, 1));
        let remapped = time.remap(FrameRate::new(60, 1));
        assert_eq!(remapped.rate, FrameRate::new(60, 1));
        assert_eq!(remapped.time, FrameTime::new(20));
    }

    #[test]
    fn test_delay_subtraction_keeps_rate() {
        let current = FrameTimeWithRate::new(FrameTime::new(105), FrameRate::new(30, 1));
        let present = current - FrameTime::new(7);
        assert_eq!(present.time, FrameTime::new(98));
        assert_eq!(present.rate, FrameRate::new(30, 1));
    }

    #[test]
    fn test_display() {
        let time = FrameTimeWithRate::new(FrameTime::new(42), FrameRate::new(25, 1));
        assert_eq!(time.to_string(), "42 @ 25 fps");
    }
}
