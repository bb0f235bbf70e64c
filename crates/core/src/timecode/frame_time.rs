//! Signed frame positions with sub-frame precision

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use super::subframe::DEFAULT_SUBFRAME_RESOLUTION;
use super::{FrameRate, Subframe};

/// A position on a frame timeline: a signed frame number plus a sub-frame
/// fraction.
///
/// The value is only meaningful relative to a [`FrameRate`]; converting a
/// position between rates goes through [`FrameTime::remap`]. Frame numbers
/// saturate at the `i32` range instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameTime {
    frame_number: i32,
    subframe: Subframe,
}

impl FrameTime {
    /// A whole-frame position with a zero subframe.
    pub const fn new(frame_number: i32) -> Self {
        Self {
            frame_number,
            subframe: Subframe::zero(DEFAULT_SUBFRAME_RESOLUTION),
        }
    }

    /// A position with an explicit subframe.
    pub const fn with_subframe(frame_number: i32, subframe: Subframe) -> Self {
        Self {
            frame_number,
            subframe,
        }
    }

    /// Builds a position from a fractional frame value at the default
    /// subframe resolution.
    pub fn from_f64(frame_value: f64) -> Self {
        Self::from_f64_at(frame_value, DEFAULT_SUBFRAME_RESOLUTION)
    }

    /// Builds a position from a fractional frame value, quantizing the
    /// fraction to `resolution` subdivisions. The frame number is the floor
    /// of the value; a fraction that rounds up to a whole frame carries.
    pub fn from_f64_at(frame_value: f64, resolution: u32) -> Self {
        if frame_value.is_nan() {
            return Self::default();
        }
        let floor = frame_value.floor();
        let subframe = Subframe::from_f64(frame_value - floor, resolution);
        let mut frame_number = saturate_frame(floor);
        let subframe = if subframe.value() == subframe.resolution() {
            frame_number = frame_number.saturating_add(1);
            Subframe::zero(resolution)
        } else {
            subframe
        };
        Self {
            frame_number,
            subframe,
        }
    }

    /// The position as a fractional frame count.
    pub fn to_f64(&self) -> f64 {
        f64::from(self.frame_number) + self.subframe.as_f64()
    }

    /// The whole-frame part (floor of the position).
    pub const fn frame_number(&self) -> i32 {
        self.frame_number
    }

    /// The sub-frame part.
    pub const fn subframe(&self) -> Subframe {
        self.subframe
    }

    /// Drops the subframe, keeping the frame number.
    pub const fn floor(&self) -> Self {
        Self {
            frame_number: self.frame_number,
            subframe: Subframe::zero(self.subframe.resolution()),
        }
    }

    /// The smallest whole-frame position not less than this one.
    pub const fn ceil(&self) -> Self {
        if self.subframe.is_zero() {
            return self.floor();
        }
        Self {
            frame_number: self.frame_number.saturating_add(1),
            subframe: Subframe::zero(self.subframe.resolution()),
        }
    }

    /// The nearest whole-frame position. A subframe at or below the half
    /// point rounds down.
    pub const fn round(&self) -> Self {
        if self.subframe.value() * 2 <= self.subframe.resolution() {
            self.floor()
        } else {
            self.ceil()
        }
    }

    /// Converts a position from `src_rate` to `dst_rate`.
    ///
    /// Returns the identity when the rates are equal and the zero position
    /// when either rate is invalid. The subframe resolution of `time` is
    /// preserved.
    pub fn remap(time: FrameTime, src_rate: FrameRate, dst_rate: FrameRate) -> FrameTime {
        if !src_rate.is_valid() || !dst_rate.is_valid() {
            return FrameTime::default();
        }
        if src_rate == dst_rate {
            return time;
        }
        let numerator = u64::from(dst_rate.numerator()) * u64::from(src_rate.denominator());
        let denominator = u64::from(dst_rate.denominator()) * u64::from(src_rate.numerator());
        if denominator == 0 {
            return FrameTime::default();
        }
        let scaled = time.to_f64() * numerator as f64 / denominator as f64;
        FrameTime::from_f64_at(scaled, time.subframe().resolution())
    }
}

fn saturate_frame(value: f64) -> i32 {
    if value <= f64::from(i32::MIN) {
        i32::MIN
    } else if value >= f64::from(i32::MAX) {
        i32::MAX
    } else {
        value as i32
    }
}

fn saturate_frame_i64(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

impl Add for FrameTime {
    type Output = FrameTime;

    fn add(self, rhs: FrameTime) -> FrameTime {
        let resolution = self.subframe.resolution();
        if resolution != rhs.subframe.resolution() {
            return FrameTime::from_f64_at(self.to_f64() + rhs.to_f64(), resolution);
        }
        let total = i64::from(self.subframe.value()) + i64::from(rhs.subframe.value());
        let carry = total / i64::from(resolution);
        let value = (total % i64::from(resolution)) as u32;
        let frame = i64::from(self.frame_number) + i64::from(rhs.frame_number) + carry;
        FrameTime {
            frame_number: saturate_frame_i64(frame),
            subframe: Subframe::new(value, resolution),
        }
    }
}

impl Sub for FrameTime {
    type Output = FrameTime;

    fn sub(self, rhs: FrameTime) -> FrameTime {
        let resolution = self.subframe.resolution();
        if resolution != rhs.subframe.resolution() {
            return FrameTime::from_f64_at(self.to_f64() - rhs.to_f64(), resolution);
        }
        let mut value = i64::from(self.subframe.value()) - i64::from(rhs.subframe.value());
        let mut borrow = 0;
        if value < 0 {
            value += i64::from(resolution);
            borrow = 1;
        }
        let frame = i64::from(self.frame_number) - i64::from(rhs.frame_number) - borrow;
        FrameTime {
            frame_number: saturate_frame_i64(frame),
            subframe: Subframe::new(value as u32, resolution),
        }
    }
}

impl PartialOrd for FrameTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frame_number
            .cmp(&other.frame_number)
            .then_with(|| self.subframe.cmp(&other.subframe))
    }
}

impl fmt::Display for FrameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subframe.is_zero() {
            write!(f, "{}", self.frame_number)
        } else {
            write!(f, "{:.2}", self.to_f64())
        }
    }
}
