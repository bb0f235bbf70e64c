//! Sub-frame fractions of a frame interval

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::gcd_u32;

/// Resolution used when no explicit subdivision is requested.
pub const DEFAULT_SUBFRAME_RESOLUTION: u32 = 80;

/// A position within a single frame interval, expressed as `value / resolution`.
///
/// `value` is clamped into `[0, resolution]`. Two subframes at different
/// resolutions compare by their fractional value, not their raw fields, so
/// `40/80` equals `1/2`.
#[derive(Debug, Clone, Copy)]
pub struct Subframe {
    value: u32,
    resolution: u32,
}

impl Subframe {
    /// Creates a subframe, clamping `value` into `[0, resolution]`.
    ///
    /// A zero `resolution` is bumped to 1 so the fraction stays meaningful.
    pub const fn new(value: u32, resolution: u32) -> Self {
        let resolution = if resolution == 0 { 1 } else { resolution };
        let value = if value > resolution { resolution } else { value };
        Self { value, resolution }
    }

    /// The zero subframe at the given resolution.
    pub const fn zero(resolution: u32) -> Self {
        Self::new(0, resolution)
    }

    /// The half-frame position at the given resolution.
    pub const fn mid(resolution: u32) -> Self {
        let resolution = if resolution == 0 { 1 } else { resolution };
        Self::new(resolution / 2, resolution)
    }

    /// Builds a subframe from a fraction in `[0, 1]`, rounding to the nearest
    /// representable value. Out-of-range inputs are clamped.
    pub fn from_f64(fraction: f64, resolution: u32) -> Self {
        let resolution = resolution.max(1);
        let fraction = fraction.clamp(0.0, 1.0);
        let value = (fraction * f64::from(resolution)).round() as u32;
        Self::new(value, resolution)
    }

    /// The numerator of the fraction.
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// The denominator of the fraction.
    pub const fn resolution(&self) -> u32 {
        self.resolution
    }

    /// The fraction as a float in `[0, 1]`.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.value) / f64::from(self.resolution)
    }

    /// True when the fraction is exactly zero.
    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }
}

impl Default for Subframe {
    fn default() -> Self {
        Self::zero(DEFAULT_SUBFRAME_RESOLUTION)
    }
}

impl PartialEq for Subframe {
    fn eq(&self, other: &Self) -> bool {
        u64::from(self.value) * u64::from(other.resolution)
            == u64::from(other.value) * u64::from(self.resolution)
    }
}

impl Eq for Subframe {}

impl PartialOrd for Subframe {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Subframe {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u64::from(self.value) * u64::from(other.resolution);
        let rhs = u64::from(other.value) * u64::from(self.resolution);
        lhs.cmp(&rhs)
    }
}

impl Hash for Subframe {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the reduced fraction so equal values hash alike.
        let divisor = gcd_u32(self.value, self.resolution).max(1);
        (self.value / divisor).hash(state);
        (self.resolution / divisor).hash(state);
    }
}

impl fmt::Display for Subframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.resolution)
    }
}
