//! Rational frame rates

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::gcd_u32;

/// A frames-per-second value held as a reduced rational number.
///
/// The numerator/denominator pair is reduced at construction, so `60/2`
/// and `30/1` are the same rate. A zero denominator marks the rate invalid;
/// arithmetic built on an invalid rate yields defaults rather than panicking.
///
/// The drop-frame flag only sticks for NTSC rates (denominator 1001 with a
/// numerator of 24000, 30000 or 60000); it is cleared for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "RawFrameRate", into = "RawFrameRate")]
pub struct FrameRate {
    numerator: u32,
    denominator: u32,
    is_drop_frame: bool,
}

impl FrameRate {
    /// Creates a non-drop-frame rate of `numerator / denominator` fps.
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self::with_drop_frame(numerator, denominator, false)
    }

    /// Creates a rate, keeping the drop-frame flag only when the pair is an
    /// NTSC rate.
    pub const fn with_drop_frame(numerator: u32, denominator: u32, is_drop_frame: bool) -> Self {
        let is_drop_frame = is_drop_frame && is_ntsc_pair(numerator, denominator);
        let divisor = gcd_u32(numerator, denominator);
        if divisor == 0 {
            return Self {
                numerator,
                denominator,
                is_drop_frame,
            };
        }
        Self {
            numerator: numerator / divisor,
            denominator: denominator / divisor,
            is_drop_frame,
        }
    }

    /// The reduced numerator.
    pub const fn numerator(&self) -> u32 {
        self.numerator
    }

    /// The reduced denominator.
    pub const fn denominator(&self) -> u32 {
        self.denominator
    }

    /// True when this rate drops timecode labels to track wall time.
    pub const fn is_drop_frame(&self) -> bool {
        self.is_drop_frame
    }

    /// False when the denominator is zero.
    pub const fn is_valid(&self) -> bool {
        self.denominator != 0
    }

    /// True for the NTSC fractional rates (23.976, 29.97, 59.94).
    pub const fn is_ntsc(&self) -> bool {
        is_ntsc_pair(self.numerator, self.denominator)
    }

    /// Frames per second as a float. Not meaningful for invalid rates.
    pub fn as_f64(&self) -> f64 {
        f64::from(self.numerator) / f64::from(self.denominator)
    }

    /// Seconds per frame. Not meaningful for invalid or zero rates.
    pub fn frame_interval(&self) -> f64 {
        f64::from(self.denominator) / f64::from(self.numerator)
    }
}

const fn is_ntsc_pair(numerator: u32, denominator: u32) -> bool {
    denominator == 1001 && matches!(numerator, 24000 | 30000 | 60000)
}

impl PartialOrd for FrameRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrameRate {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u64::from(self.numerator) * u64::from(other.denominator);
        let rhs = u64::from(other.numerator) * u64::from(self.denominator);
        lhs.cmp(&rhs).then_with(|| {
            // Degenerate (invalid) rates and the drop-frame flag still need a
            // total order consistent with field equality.
            (self.numerator, self.denominator, self.is_drop_frame).cmp(&(
                other.numerator,
                other.denominator,
                other.is_drop_frame,
            ))
        })
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "invalid");
        }
        if self.numerator % self.denominator == 0 {
            write!(f, "{}", self.numerator / self.denominator)?;
        } else {
            write!(f, "{:.2}", self.as_f64())?;
        }
        if self.is_drop_frame {
            write!(f, " DF")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct RawFrameRate {
    numerator: u32,
    denominator: u32,
    #[serde(default)]
    drop_frame: bool,
}

impl From<RawFrameRate> for FrameRate {
    fn from(raw: RawFrameRate) -> Self {
        FrameRate::with_drop_frame(raw.numerator, raw.denominator, raw.drop_frame)
    }
}

impl From<FrameRate> for RawFrameRate {
    fn from(rate: FrameRate) -> Self {
        RawFrameRate {
            numerator: rate.numerator,
            denominator: rate.denominator,
            drop_frame: rate.is_drop_frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduces_at_construction() {
        let rate = FrameRate::new(60, 2);
        assert_eq!(rate.numerator(), 30);
        assert_eq!(rate.denominator(), 1);
        assert_eq!(rate, FrameRate::new(30, 1));
    }

    #[test]
    fn test_zero_denominator_is_invalid() {
        assert!(!FrameRate::new(30, 0).is_valid());
        assert!(!FrameRate::default().is_valid());
        assert!(FrameRate::new(30, 1).is_valid());
    }

    #[test]
    fn test_drop_frame_only_sticks_for_ntsc() {
        assert!(FrameRate::with_drop_frame(30000, 1001, true).is_drop_frame());
        assert!(FrameRate::with_drop_frame(60000, 1001, true).is_drop_frame());
        assert!(!FrameRate::with_drop_frame(30, 1, true).is_drop_frame());
        assert!(!FrameRate::with_drop_frame(25, 1, true).is_drop_frame());
    }

    #[test]
    fn test_ntsc_detection() {
        assert!(FrameRate::new(24000, 1001).is_ntsc());
        assert!(FrameRate::new(30000, 1001).is_ntsc());
        assert!(!FrameRate::new(30, 1).is_ntsc());
        assert!(!FrameRate::new(25000, 1001).is_ntsc());
    }

    #[test]
    fn test_ordering_crosses_denominators() {
        assert!(FrameRate::new(24000, 1001) < FrameRate::new(24, 1));
        assert!(FrameRate::new(30, 1) < FrameRate::new(60000, 1001));
        assert!(FrameRate::new(50, 1) > FrameRate::new(30000, 1001));
    }

    #[test]
    fn test_drop_frame_breaks_equality() {
        let ndf = FrameRate::new(30000, 1001);
        let df = FrameRate::with_drop_frame(30000, 1001, true);
        assert_ne!(ndf, df);
    }

    #[test]
    fn test_display() {
        assert_eq!(FrameRate::new(30, 1).to_string(), "30");
        assert_eq!(FrameRate::new(24000, 1001).to_string(), "23.98");
        assert_eq!(
            FrameRate::with_drop_frame(30000, 1001, true).to_string(),
            "29.97 DF"
        );
        assert_eq!(FrameRate::new(30, 0).to_string(), "invalid");
    }

    #[test]
    fn test_frame_interval() {
        assert!((FrameRate::new(25, 1).frame_interval() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_serde_round_trip() {
        let rate = FrameRate::with_drop_frame(30000, 1001, true);
        let json = serde_json::to_string(&rate).unwrap();
        let back: FrameRate = serde_json::from_str(&json).unwrap();
        assert_eq!(rate, back);
    }

    #[test]
    fn test_serde_defaults_drop_frame_and_normalizes() {
        let rate: FrameRate =
            serde_json::from_str(r#"{"numerator": 60, "denominator": 2}"#).unwrap();
        assert_eq!(rate, FrameRate::new(30, 1));
        assert!(!rate.is_drop_frame());
    }
}
